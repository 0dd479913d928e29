use crate::symbol::SymId;
use crate::term::{Statement, Term, TermId, TermStore};
use hashbrown::HashMap;
use smallvec::SmallVec;

/// A set of bindings: a finite map from variable name to term.
/// Produced by unification; used to instantiate statement templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    map: HashMap<SymId, TermId>,
}

impl Bindings {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Bind a variable to a term, replacing any previous binding.
    pub fn bind(&mut self, var: SymId, term: TermId) {
        self.map.insert(var, term);
    }

    /// Get the binding for a variable, if any.
    pub fn get(&self, var: SymId) -> Option<TermId> {
        self.map.get(&var).copied()
    }

    /// Check if a variable is bound.
    pub fn is_bound(&self, var: SymId) -> bool {
        self.map.contains_key(&var)
    }

    /// Check if the binding set is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Iterator over (variable, term) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (SymId, TermId)> + '_ {
        self.map.iter().map(|(&var, &term)| (var, term))
    }
}

/// Follow a chain of variable-to-variable bindings to its end.
/// Returns the final term: a constant, an unbound variable, or (on a cycle)
/// the variable where the cycle closed.
pub fn walk(term: TermId, bindings: &Bindings, terms: &TermStore) -> TermId {
    let mut current = term;
    let mut visited: SmallVec<[SymId; 8]> = SmallVec::new();

    loop {
        match terms.resolve(current) {
            Some(Term::Var(name)) => {
                if visited.contains(&name) {
                    return current;
                }
                visited.push(name);
                match bindings.get(name) {
                    Some(bound) => current = bound,
                    None => return current,
                }
            }
            _ => return current,
        }
    }
}

/// Apply a binding set to a statement template.
/// Bound variables are replaced by (the walk of) their bound terms; unbound
/// variables and constants pass through unchanged. Pure; never fails.
pub fn instantiate(stmt: &Statement, bindings: &Bindings, terms: &TermStore) -> Statement {
    let args = stmt
        .args
        .iter()
        .map(|&arg| match terms.resolve(arg) {
            Some(Term::Var(_)) => walk(arg, bindings, terms),
            _ => arg,
        })
        .collect::<SmallVec<[TermId; 4]>>();
    Statement::new(stmt.pred, args)
}
