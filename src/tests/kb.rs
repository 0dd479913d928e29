use super::*;

/// Build a knowledge base from a textual listing, asserting each item in
/// order.
fn kb_from(listing: &str) -> KnowledgeBase {
    KnowledgeBase::from_listing(listing).expect("listing parses")
}

fn st(kb: &KnowledgeBase, text: &str) -> Statement {
    kb.parse_statement(text).expect("statement parses")
}

// ========== ASSERTION TESTS ==========

#[test]
fn new_kb_is_empty() {
    let kb = KnowledgeBase::new();
    assert_eq!(kb.fact_count(), 0);
    assert_eq!(kb.rule_count(), 0);
    kb.check_invariants().unwrap();
}

#[test]
fn assert_fact_stores_it_asserted() {
    let mut kb = KnowledgeBase::new();
    let on_ab = st(&kb, "(on A B)");
    let id = kb.assert_fact(on_ab.clone());

    assert_eq!(kb.fact_count(), 1);
    let fact = kb.fact(id).unwrap();
    assert!(fact.is_asserted());
    assert!(fact.supported_by().is_empty());
    assert_eq!(fact.statement(), &on_ab);
    kb.check_invariants().unwrap();
}

#[test]
fn assert_same_fact_twice_is_idempotent() {
    let mut kb = KnowledgeBase::new();
    let on_ab = st(&kb, "(on A B)");
    let first = kb.assert_fact(on_ab.clone());
    let second = kb.assert_fact(on_ab);

    assert_eq!(first, second, "re-assertion should merge, not duplicate");
    assert_eq!(kb.fact_count(), 1);
    assert!(kb.fact(first).unwrap().is_asserted());
    kb.check_invariants().unwrap();
}

#[test]
fn assert_rule_stores_it_asserted() {
    let mut kb = KnowledgeBase::new();
    let premise = st(&kb, "(on ?x ?y)");
    let rhs = st(&kb, "(above ?x ?y)");
    let id = kb.assert_rule(vec![premise.clone()], rhs.clone());

    assert_eq!(kb.rule_count(), 1);
    let rule = kb.rule(id).unwrap();
    assert!(rule.is_asserted());
    assert_eq!(rule.lhs(), &[premise]);
    assert_eq!(rule.rhs(), &rhs);
    kb.check_invariants().unwrap();
}

#[test]
fn assert_same_rule_twice_merges() {
    let mut kb = KnowledgeBase::new();
    let premise = st(&kb, "(on ?x ?y)");
    let rhs = st(&kb, "(above ?x ?y)");
    let first = kb.assert_rule(vec![premise.clone()], rhs.clone());
    let second = kb.assert_rule(vec![premise], rhs);

    assert_eq!(first, second);
    assert_eq!(kb.rule_count(), 1);
    kb.check_invariants().unwrap();
}

#[test]
fn with_items_runs_closure_over_seeds() {
    let symbols = Arc::new(SymbolStore::new());
    let terms = TermStore::new();
    let items = parser::parse_items(
        "fact: (on A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)",
        &symbols,
        &terms,
    )
    .unwrap();

    let kb = KnowledgeBase::with_items(symbols, terms, items);
    assert!(kb.contains_fact(&st(&kb, "(above A B)")));
    assert_eq!(kb.fact_count(), 2);
    kb.check_invariants().unwrap();
}

#[test]
fn reassert_of_derived_fact_marks_it_asserted() {
    let mut kb = kb_from(
        "fact: (on A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)",
    );
    let above_ab = st(&kb, "(above A B)");
    let id = kb.fact_id(&above_ab).expect("derived");
    assert!(!kb.fact(id).unwrap().is_asserted());

    kb.assert_fact(above_ab);
    let fact = kb.fact(id).unwrap();
    assert!(fact.is_asserted(), "external assertion flips the flag");
    assert_eq!(
        fact.supported_by().len(),
        1,
        "the derivation support survives re-assertion"
    );
    kb.check_invariants().unwrap();
}

// ========== INFERENCE TESTS ==========

#[test]
fn rule_inserted_after_fact_derives() {
    let mut kb = KnowledgeBase::new();
    kb.assert_fact(st(&kb, "(on A B)"));
    kb.assert_rule(vec![st(&kb, "(on ?x ?y)")], st(&kb, "(above ?x ?y)"));

    assert!(kb.contains_fact(&st(&kb, "(above A B)")));
    kb.check_invariants().unwrap();
}

#[test]
fn fact_inserted_after_rule_derives() {
    let mut kb = KnowledgeBase::new();
    kb.assert_rule(vec![st(&kb, "(on ?x ?y)")], st(&kb, "(above ?x ?y)"));
    kb.assert_fact(st(&kb, "(on A B)"));

    assert!(kb.contains_fact(&st(&kb, "(above A B)")));
    kb.check_invariants().unwrap();
}

#[test]
fn derived_fact_has_one_support_and_back_references() {
    let mut kb = KnowledgeBase::new();
    let fact_id = kb.assert_fact(st(&kb, "(on A B)"));
    let rule_id = kb.assert_rule(vec![st(&kb, "(on ?x ?y)")], st(&kb, "(above ?x ?y)"));

    let derived = kb.fact_id(&st(&kb, "(above A B)")).expect("derived");
    let fact = kb.fact(derived).unwrap();
    assert!(!fact.is_asserted());
    assert_eq!(
        fact.supported_by(),
        &[Support {
            fact: fact_id,
            rule: rule_id
        }]
    );
    assert!(kb.fact(fact_id).unwrap().supports_facts().contains(&derived));
    assert!(kb.rule(rule_id).unwrap().supports_facts().contains(&derived));
    kb.check_invariants().unwrap();
}

#[test]
fn multi_premise_rule_derives_narrower_rule() {
    let mut kb = KnowledgeBase::new();
    let fact_id = kb.assert_fact(st(&kb, "(parent A B)"));
    let rule_id = kb.assert_rule(
        vec![st(&kb, "(parent ?x ?y)"), st(&kb, "(parent ?y ?z)")],
        st(&kb, "(grandparent ?x ?z)"),
    );

    assert_eq!(kb.rule_count(), 2, "a specialized rule should be derived");
    let lhs = vec![st(&kb, "(parent B ?z)")];
    let rhs = st(&kb, "(grandparent A ?z)");
    let derived = kb.rule_id(&lhs, &rhs).expect("specialized rule");

    let rule = kb.rule(derived).unwrap();
    assert!(!rule.is_asserted());
    assert_eq!(
        rule.supported_by(),
        &[Support {
            fact: fact_id,
            rule: rule_id
        }]
    );
    assert!(kb.fact(fact_id).unwrap().supports_rules().contains(&derived));
    assert!(kb.rule(rule_id).unwrap().supports_rules().contains(&derived));
    kb.check_invariants().unwrap();
}

#[test]
fn two_premise_rule_completes_with_both_facts() {
    let kb = kb_from(
        "fact: (parent A B)\n\
         fact: (parent B C)\n\
         rule: ((parent ?x ?y) (parent ?y ?z)) -> (grandparent ?x ?z)",
    );
    assert!(kb.contains_fact(&st(&kb, "(grandparent A C)")));
    assert!(!kb.contains_fact(&st(&kb, "(grandparent B A)")));
    kb.check_invariants().unwrap();
}

#[test]
fn closure_chains_through_derived_facts() {
    let kb = kb_from(
        "fact: (p A)\n\
         rule: ((p ?x)) -> (q ?x)\n\
         rule: ((q ?x)) -> (r ?x)",
    );
    assert!(kb.contains_fact(&st(&kb, "(q A)")));
    assert!(kb.contains_fact(&st(&kb, "(r A)")));
    kb.check_invariants().unwrap();
}

#[test]
fn no_derivation_when_unification_fails() {
    let kb = kb_from(
        "fact: (under A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)",
    );
    assert_eq!(kb.fact_count(), 1);
    kb.check_invariants().unwrap();
}

#[test]
fn only_first_premise_is_consumed() {
    // (q A) matches the second premise but chaining never reorders, so
    // nothing is derived.
    let kb = kb_from(
        "fact: (q A)\n\
         rule: ((p ?x) (q ?x)) -> (r ?x)",
    );
    assert_eq!(kb.fact_count(), 1);
    assert_eq!(kb.rule_count(), 1);
    kb.check_invariants().unwrap();
}

#[test]
fn independent_rederivation_adds_second_support() {
    let kb = kb_from(
        "fact: (on A B)\n\
         fact: (stacked A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)\n\
         rule: ((stacked ?x ?y)) -> (above ?x ?y)",
    );
    let derived = kb.fact_id(&st(&kb, "(above A B)")).expect("derived");
    assert_eq!(
        kb.fact(derived).unwrap().supported_by().len(),
        2,
        "each derivation path contributes one support"
    );
    assert_eq!(kb.fact_count(), 3, "the derived fact is not duplicated");
    kb.check_invariants().unwrap();
}

// ========== ASK TESTS ==========

#[test]
fn ask_ground_query_is_membership() {
    let kb = kb_from("fact: (on A B)");
    let answers = kb.ask_statement(&st(&kb, "(on A B)"));
    assert_eq!(answers.len(), 1);
    assert!(answers[0].bindings.is_empty());
}

#[test]
fn ask_variable_query_returns_all_bindings() {
    let kb = kb_from(
        "fact: (on A B)\n\
         fact: (on C D)",
    );
    let answers = kb.ask_statement(&st(&kb, "(on ?x ?y)"));
    assert_eq!(answers.len(), 2);

    let x = kb.intern("x");
    let bound_xs: Vec<_> = answers
        .iter()
        .map(|answer| answer.bindings.get(x).unwrap())
        .collect();
    assert!(bound_xs.contains(&kb.constant("A")));
    assert!(bound_xs.contains(&kb.constant("C")));
}

#[test]
fn ask_reaches_derived_facts() {
    let kb = kb_from(
        "fact: (on A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)",
    );
    let answers = kb.ask_statement(&st(&kb, "(above ?x ?y)"));
    assert_eq!(answers.len(), 1);
    assert_eq!(
        answers[0].bindings.get(kb.intern("x")),
        Some(kb.constant("A"))
    );
}

#[test]
fn ask_no_match_is_empty_not_error() {
    let kb = kb_from("fact: (on A B)");
    assert!(kb.ask_statement(&st(&kb, "(under ?x ?y)")).is_empty());
}

#[test]
fn ask_rule_shaped_query_is_invalid() {
    let kb = KnowledgeBase::new();
    let query = Item::Rule {
        lhs: vec![st(&kb, "(on ?x ?y)")],
        rhs: st(&kb, "(above ?x ?y)"),
    };
    assert_eq!(kb.ask(&query), Err(KbError::InvalidQuery));
}

#[test]
fn ask_fact_item_succeeds() {
    let kb = kb_from("fact: (on A B)");
    let query = Item::Fact(st(&kb, "(on ?x ?y)"));
    let answers = kb.ask(&query).unwrap();
    assert_eq!(answers.len(), 1);
}

#[test]
fn answers_reference_the_matched_fact() {
    let kb = kb_from("fact: (on A B)");
    let answers = kb.ask_statement(&st(&kb, "(on ?x ?y)"));
    let matched = kb.fact(answers[0].fact).unwrap();
    assert_eq!(matched.statement(), &st(&kb, "(on A B)"));
}

// ========== RETRACTION TESTS ==========

#[test]
fn retract_absent_fact_is_silent() {
    let mut kb = KnowledgeBase::new();
    kb.retract(&st(&kb, "(on A B)"));
    assert_eq!(kb.fact_count(), 0);
    assert_eq!(kb.metrics().retractions_ignored, 1);
}

#[test]
fn retract_derived_only_fact_is_silent() {
    let mut kb = kb_from(
        "fact: (on A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)",
    );
    let above_ab = st(&kb, "(above A B)");
    kb.retract(&above_ab);

    assert!(kb.contains_fact(&above_ab), "derived facts cannot be retracted");
    assert_eq!(kb.metrics().retractions_ignored, 1);
    kb.check_invariants().unwrap();
}

#[test]
fn retract_sole_asserted_fact_removes_it() {
    let mut kb = KnowledgeBase::new();
    let on_ab = st(&kb, "(on A B)");
    kb.assert_fact(on_ab.clone());
    kb.retract(&on_ab);

    assert_eq!(kb.fact_count(), 0);
    assert_eq!(kb.metrics().retractions, 1);
    assert_eq!(kb.metrics().fact_removals, 1);
    kb.check_invariants().unwrap();
}

#[test]
fn retract_keeps_fact_with_remaining_derivation() {
    let mut kb = kb_from(
        "fact: (on A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)",
    );
    let above_ab = st(&kb, "(above A B)");
    kb.assert_fact(above_ab.clone());

    kb.retract(&above_ab);
    let id = kb.fact_id(&above_ab).expect("still present");
    assert!(!kb.fact(id).unwrap().is_asserted());
    assert_eq!(kb.fact(id).unwrap().supported_by().len(), 1);

    // Second retraction is no longer a direct assertion: ignored.
    kb.retract(&above_ab);
    assert!(kb.contains_fact(&above_ab));
    assert_eq!(kb.metrics().retractions_ignored, 1);
    kb.check_invariants().unwrap();
}

#[test]
fn reassert_after_retract_restores_fact() {
    let mut kb = KnowledgeBase::new();
    let on_ab = st(&kb, "(on A B)");
    kb.assert_fact(on_ab.clone());
    kb.retract(&on_ab);
    assert_eq!(kb.fact_count(), 0);

    let id = kb.assert_fact(on_ab);
    assert!(kb.fact(id).unwrap().is_asserted());
    assert_eq!(kb.fact_count(), 1);
    kb.check_invariants().unwrap();
}

#[test]
fn retract_item_ignores_rules() {
    let mut kb = KnowledgeBase::new();
    let premise = st(&kb, "(on ?x ?y)");
    let rhs = st(&kb, "(above ?x ?y)");
    kb.assert_rule(vec![premise.clone()], rhs.clone());

    kb.retract_item(&Item::Rule {
        lhs: vec![premise],
        rhs,
    });
    assert_eq!(kb.rule_count(), 1, "rules are never retractable");
    assert_eq!(kb.metrics().retractions_ignored, 1);
}

// ========== CASCADE TESTS ==========

#[test]
fn cascade_scenario_on_above() {
    let mut kb = kb_from(
        "fact: (on A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)",
    );
    let above_ab = st(&kb, "(above A B)");
    let on_ab = st(&kb, "(on A B)");

    let answers = kb.ask_statement(&above_ab);
    assert_eq!(answers.len(), 1, "closure should expose the derived fact");
    let derived = answers[0].fact;
    assert!(!kb.fact(derived).unwrap().is_asserted());
    assert_eq!(kb.fact(derived).unwrap().supported_by().len(), 1);

    kb.retract(&on_ab);

    assert!(!kb.contains_fact(&on_ab));
    assert!(!kb.contains_fact(&above_ab));
    assert!(kb.ask_statement(&above_ab).is_empty());
    assert_eq!(kb.rule_count(), 1, "the asserted rule survives");
    kb.check_invariants().unwrap();
}

#[test]
fn cascade_runs_through_chained_derivations() {
    let mut kb = kb_from(
        "fact: (p A)\n\
         rule: ((p ?x)) -> (q ?x)\n\
         rule: ((q ?x)) -> (r ?x)",
    );
    assert_eq!(kb.fact_count(), 3);

    kb.retract(&st(&kb, "(p A)"));
    assert_eq!(kb.fact_count(), 0, "the whole chain collapses");
    assert_eq!(kb.rule_count(), 2);
    kb.check_invariants().unwrap();
}

#[test]
fn fact_with_two_supports_survives_losing_one() {
    let mut kb = kb_from(
        "fact: (on A B)\n\
         fact: (stacked A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)\n\
         rule: ((stacked ?x ?y)) -> (above ?x ?y)",
    );
    let above_ab = st(&kb, "(above A B)");

    kb.retract(&st(&kb, "(on A B)"));
    let id = kb.fact_id(&above_ab).expect("second support keeps it alive");
    assert_eq!(kb.fact(id).unwrap().supported_by().len(), 1);
    kb.check_invariants().unwrap();

    kb.retract(&st(&kb, "(stacked A B)"));
    assert!(!kb.contains_fact(&above_ab));
    kb.check_invariants().unwrap();
}

#[test]
fn cascade_removes_derived_rules_and_their_conclusions() {
    let mut kb = kb_from(
        "fact: (on A B)\n\
         fact: (above B C)\n\
         rule: ((on ?x ?y) (above ?y ?z)) -> (above ?x ?z)",
    );
    // The partial match specializes the rule; the second premise then
    // completes against (above B C).
    assert_eq!(kb.rule_count(), 2);
    assert!(kb.contains_fact(&st(&kb, "(above A C)")));

    kb.retract(&st(&kb, "(on A B)"));

    assert_eq!(kb.rule_count(), 1, "the specialized rule loses its support");
    assert!(!kb.contains_fact(&st(&kb, "(above A C)")));
    assert!(kb.contains_fact(&st(&kb, "(above B C)")));
    kb.check_invariants().unwrap();
}

#[test]
fn cascade_leaves_no_orphaned_links() {
    let mut kb = kb_from(
        "fact: (on A B)\n\
         fact: (above B C)\n\
         rule: ((on ?x ?y) (above ?y ?z)) -> (above ?x ?z)",
    );
    kb.retract(&st(&kb, "(on A B)"));

    // The surviving fact and rule must not reference anything removed.
    let survivor = kb.fact_id(&st(&kb, "(above B C)")).unwrap();
    assert!(kb.fact(survivor).unwrap().supports_facts().is_empty());
    assert!(kb.fact(survivor).unwrap().supports_rules().is_empty());
    for (_, rule) in kb.rules() {
        assert!(rule.supports_facts().is_empty());
        assert!(rule.supports_rules().is_empty());
    }
    kb.check_invariants().unwrap();
}

#[test]
fn retract_with_interleaved_asserted_layer_stops_cascade() {
    let mut kb = kb_from(
        "fact: (p A)\n\
         rule: ((p ?x)) -> (q ?x)\n\
         rule: ((q ?x)) -> (r ?x)",
    );
    // (q A) is both derived and directly asserted.
    kb.assert_fact(st(&kb, "(q A)"));

    kb.retract(&st(&kb, "(p A)"));

    assert!(!kb.contains_fact(&st(&kb, "(p A)")));
    assert!(
        kb.contains_fact(&st(&kb, "(q A)")),
        "an asserted layer keeps itself and its consequences"
    );
    assert!(kb.contains_fact(&st(&kb, "(r A)")));
    kb.check_invariants().unwrap();
}

// ========== METRICS TESTS ==========

#[test]
fn metrics_track_the_lifecycle() {
    let mut kb = kb_from(
        "fact: (on A B)\n\
         rule: ((on ?x ?y)) -> (above ?x ?y)",
    );
    assert_eq!(kb.metrics().assertions, 2);
    assert_eq!(kb.metrics().derived_facts, 1);
    assert!(kb.metrics().inference_attempts >= 2);
    assert_eq!(kb.metrics().inference_successes, 1);

    kb.retract(&st(&kb, "(on A B)"));
    assert_eq!(kb.metrics().retractions, 1);
    assert_eq!(kb.metrics().fact_removals, 2);
}
