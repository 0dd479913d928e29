use crate::subst::{walk, Bindings};
use crate::term::{Statement, Term, TermId, TermStore};
use crate::trace::trace;

/// Unify two statements, returning the binding set that makes them
/// syntactically identical, or None if they cannot be unified.
///
/// Returning None is an expected branch outcome during forward chaining,
/// not an error.
pub fn unify(a: &Statement, b: &Statement, terms: &TermStore) -> Option<Bindings> {
    if a.pred != b.pred {
        trace!("unify_predicate_mismatch");
        return None;
    }
    if a.args.len() != b.args.len() {
        trace!("unify_arity_mismatch");
        return None;
    }

    let mut bindings = Bindings::new();
    for (&x, &y) in a.args.iter().zip(b.args.iter()) {
        if !unify_terms(x, y, &mut bindings, terms) {
            return None;
        }
    }

    trace!(bindings = bindings.len(), "unify_success");
    Some(bindings)
}

/// Unify one argument pair against the accumulating binding set.
fn unify_terms(a: TermId, b: TermId, bindings: &mut Bindings, terms: &TermStore) -> bool {
    // Dereference both sides through the bindings accumulated so far.
    let a = walk(a, bindings, terms);
    let b = walk(b, bindings, terms);

    if a == b {
        // Hashconsing makes this the structural-equality check.
        return true;
    }

    match (terms.resolve(a), terms.resolve(b)) {
        (Some(Term::Var(var)), Some(_)) => {
            bindings.bind(var, b);
            true
        }
        (Some(Term::Const(_)), Some(Term::Var(var))) => {
            bindings.bind(var, a);
            true
        }
        // Distinct ids with both sides constant means different constants.
        (Some(Term::Const(_)), Some(Term::Const(_))) => false,
        _ => false,
    }
}
