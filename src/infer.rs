//! Forward-chaining inference.
//!
//! One inference step pairs a fact with a rule: the fact is unified against
//! the rule's first premise only. A rule with a single premise produces a
//! fact; a longer rule produces a narrower rule with the first premise
//! consumed. Premises are never reordered and the derived rule's premise
//! list is strictly shorter, which is what guarantees termination of the
//! insertion-driven closure.

use crate::kb::{FactId, KnowledgeBase, RuleId, Support};
use crate::subst::instantiate;
use crate::trace::trace;
use crate::unify::unify;

/// Attempt a single forward-chaining step for one (fact, rule) pair.
///
/// On success the derived item is handed back to the store, which may
/// recursively trigger further steps. The store invokes this once per
/// (new fact, existing rule) and (existing fact, new rule) pairing;
/// already-processed pairs are never retried.
pub(crate) fn infer(kb: &mut KnowledgeBase, fact_id: FactId, rule_id: RuleId) {
    kb.metrics.inference_attempts += 1;

    let (fact_stmt, first, rest, rhs) = {
        let Some(fact) = kb.fact(fact_id) else {
            return;
        };
        let Some(rule) = kb.rule(rule_id) else {
            return;
        };
        let Some(first) = rule.lhs().first() else {
            return;
        };
        (
            fact.statement().clone(),
            first.clone(),
            rule.lhs()[1..].to_vec(),
            rule.rhs().clone(),
        )
    };

    let Some(bindings) = unify(&fact_stmt, &first, kb.terms()) else {
        return;
    };
    kb.metrics.inference_successes += 1;

    let support = Support {
        fact: fact_id,
        rule: rule_id,
    };

    if rest.is_empty() {
        // The rule is fully satisfied; its consequent becomes a fact.
        let derived = instantiate(&rhs, &bindings, kb.terms());
        trace!(fact = fact_id.raw(), rule = rule_id.raw(), "infer_fact");
        kb.add_fact(derived, Some(support));
    } else {
        // Consume the first premise and specialize the remainder.
        let lhs: Vec<_> = rest
            .iter()
            .map(|premise| instantiate(premise, &bindings, kb.terms()))
            .collect();
        let derived_rhs = instantiate(&rhs, &bindings, kb.terms());
        trace!(fact = fact_id.raw(), rule = rule_id.raw(), "infer_rule");
        kb.add_rule(lhs, derived_rhs, Some(support));
    }
}
