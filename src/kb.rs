//! Justification-tracked knowledge store.
//!
//! The store owns deduplicated collections of facts and rules together with
//! the support graph between them. Inserting a fact or rule runs one round
//! of forward chaining against the existing rules or facts; each successful
//! derivation re-enters the store, so insertion computes the transitive
//! closure. Retracting an asserted fact withdraws its derived consequences
//! once their justifications are exhausted.
//!
//! All cross-references in the support graph are arena ids resolved through
//! the store, never aliasing pointers, so removal is a single deletion plus
//! edge cleanup.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::infer::infer;
use crate::metrics::KbMetrics;
use crate::parser::{self, ParseError};
use crate::subst::Bindings;
use crate::symbol::{SymId, SymbolStore};
use crate::term::{format_statement, Statement, TermId, TermStore};
use crate::trace::{debug, trace};
use crate::unify::unify;

/// Identifier for a fact stored in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactId(u32);

impl FactId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Identifier for a rule stored in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(u32);

impl RuleId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// One justification for a derived item: the premise fact and the rule it
/// satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Support {
    pub fact: FactId,
    pub rule: RuleId,
}

/// A stored fact: a statement plus truth-maintenance bookkeeping.
///
/// `asserted` records whether an external caller directly stated the fact,
/// independently of whether it is also derivable. `supported_by` holds one
/// entry per distinct derivation currently active.
#[derive(Debug, Clone)]
pub struct Fact {
    statement: Statement,
    asserted: bool,
    supported_by: Vec<Support>,
    supports_facts: Vec<FactId>,
    supports_rules: Vec<RuleId>,
}

impl Fact {
    /// The fact's statement.
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Whether an external caller directly asserted this fact.
    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    /// Every derivation currently justifying this fact.
    pub fn supported_by(&self) -> &[Support] {
        &self.supported_by
    }

    /// Facts derived using this fact as a premise.
    pub fn supports_facts(&self) -> &[FactId] {
        &self.supports_facts
    }

    /// Rules derived using this fact as a premise.
    pub fn supports_rules(&self) -> &[RuleId] {
        &self.supports_rules
    }
}

impl PartialEq for Fact {
    fn eq(&self, other: &Self) -> bool {
        self.statement == other.statement
    }
}

impl Eq for Fact {}

/// A stored rule: ordered premises, a consequent, and the same bookkeeping
/// as [`Fact`]. Premise order matters: chaining consumes the first premise.
#[derive(Debug, Clone)]
pub struct Rule {
    lhs: Vec<Statement>,
    rhs: Statement,
    asserted: bool,
    supported_by: Vec<Support>,
    supports_facts: Vec<FactId>,
    supports_rules: Vec<RuleId>,
}

impl Rule {
    /// The rule's premises, in consumption order.
    pub fn lhs(&self) -> &[Statement] {
        &self.lhs
    }

    /// The rule's consequent.
    pub fn rhs(&self) -> &Statement {
        &self.rhs
    }

    /// Whether an external caller directly asserted this rule.
    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    /// Every derivation currently justifying this rule.
    pub fn supported_by(&self) -> &[Support] {
        &self.supported_by
    }

    /// Facts derived using this rule.
    pub fn supports_facts(&self) -> &[FactId] {
        &self.supports_facts
    }

    /// Rules derived using this rule.
    pub fn supports_rules(&self) -> &[RuleId] {
        &self.supports_rules
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.lhs == other.lhs && self.rhs == other.rhs
    }
}

impl Eq for Rule {}

/// Externally authored knowledge: what [`KnowledgeBase::assert_item`]
/// ingests and [`KnowledgeBase::ask`] accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A fact-shaped statement.
    Fact(Statement),
    /// A rule: premises and a consequent.
    Rule {
        lhs: Vec<Statement>,
        rhs: Statement,
    },
}

/// One query answer: the substitution that matched, plus the matched fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub bindings: Bindings,
    pub fact: FactId,
}

/// Errors surfaced by the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KbError {
    /// The query argument was rule-shaped; only facts can be asked.
    InvalidQuery,
}

impl fmt::Display for KbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KbError::InvalidQuery => {
                write!(f, "invalid query: rules cannot be asked as fact queries")
            }
        }
    }
}

impl std::error::Error for KbError {}

/// Which member of a support pair is being removed during a cascade.
#[derive(Clone, Copy)]
enum Removed {
    Fact(FactId),
    Rule(RuleId),
}

impl Removed {
    fn matches(self, support: &Support) -> bool {
        match self {
            Removed::Fact(id) => support.fact == id,
            Removed::Rule(id) => support.rule == id,
        }
    }
}

/// A deductive in-memory knowledge base with forward chaining and truth
/// maintenance.
#[derive(Debug)]
pub struct KnowledgeBase {
    symbols: Arc<SymbolStore>,
    terms: TermStore,
    facts: FxHashMap<FactId, Fact>,
    rules: FxHashMap<RuleId, Rule>,
    fact_index: HashMap<Statement, FactId>,
    rule_index: HashMap<(Vec<Statement>, Statement), RuleId>,
    next_fact: u32,
    next_rule: u32,
    pub(crate) metrics: KbMetrics,
}

impl KnowledgeBase {
    /// Create a new empty knowledge base.
    pub fn new() -> Self {
        Self {
            symbols: Arc::new(SymbolStore::new()),
            terms: TermStore::new(),
            facts: FxHashMap::default(),
            rules: FxHashMap::default(),
            fact_index: HashMap::new(),
            rule_index: HashMap::new(),
            next_fact: 0,
            next_rule: 0,
            metrics: KbMetrics::new(),
        }
    }

    /// Create an empty knowledge base over existing symbol and term stores.
    ///
    /// Seed items must be built against the same interners as the store
    /// that will hold them; this constructor makes that sharing explicit.
    pub fn with_stores(symbols: Arc<SymbolStore>, terms: TermStore) -> Self {
        Self {
            symbols,
            terms,
            facts: FxHashMap::default(),
            rules: FxHashMap::default(),
            fact_index: HashMap::new(),
            rule_index: HashMap::new(),
            next_fact: 0,
            next_rule: 0,
            metrics: KbMetrics::new(),
        }
    }

    /// Create a knowledge base seeded with the given items, which must have
    /// been built against the supplied stores.
    ///
    /// Every seed item is routed through [`Self::assert_item`] in input
    /// order, so construction performs the full forward-chaining closure
    /// over the seeds.
    pub fn with_items(
        symbols: Arc<SymbolStore>,
        terms: TermStore,
        items: impl IntoIterator<Item = Item>,
    ) -> Self {
        let mut kb = Self::with_stores(symbols, terms);
        for item in items {
            kb.assert_item(item);
        }
        kb
    }

    /// Parse a knowledge listing and seed a new store with it, running the
    /// closure as each item is asserted.
    pub fn from_listing(input: &str) -> Result<Self, ParseError> {
        let mut kb = Self::new();
        let items = kb.parse_items(input)?;
        for item in items {
            kb.assert_item(item);
        }
        Ok(kb)
    }

    // ========== builders ==========

    /// Get a reference to the symbol store.
    pub fn symbols(&self) -> &SymbolStore {
        &self.symbols
    }

    /// Get a reference to the term store.
    pub fn terms(&self) -> &TermStore {
        &self.terms
    }

    /// Intern a name (predicate, constant, or variable).
    pub fn intern(&self, name: &str) -> SymId {
        self.symbols.intern(name)
    }

    /// Create a constant term by name.
    pub fn constant(&self, name: &str) -> TermId {
        self.terms.constant(self.symbols.intern(name))
    }

    /// Create a variable term by name (without the `?` sigil).
    pub fn variable(&self, name: &str) -> TermId {
        self.terms.variable(self.symbols.intern(name))
    }

    /// Build a statement from a predicate name and argument terms.
    pub fn statement(&self, pred: &str, args: impl IntoIterator<Item = TermId>) -> Statement {
        let args: SmallVec<[TermId; 4]> = args.into_iter().collect();
        Statement::new(self.symbols.intern(pred), args)
    }

    /// Parse a statement like `(on A ?x)` against this store's interners.
    pub fn parse_statement(&self, input: &str) -> Result<Statement, ParseError> {
        parser::parse_statement(input, &self.symbols, &self.terms)
    }

    /// Parse a `fact:`/`rule:` item against this store's interners.
    pub fn parse_item(&self, input: &str) -> Result<Item, ParseError> {
        parser::parse_item(input, &self.symbols, &self.terms)
    }

    /// Parse a whole knowledge listing (many items) against this store.
    pub fn parse_items(&self, input: &str) -> Result<Vec<Item>, ParseError> {
        parser::parse_items(input, &self.symbols, &self.terms)
    }

    /// Render a statement using this store's interners.
    pub fn format_statement(&self, stmt: &Statement) -> Result<String, String> {
        format_statement(stmt, &self.terms, &self.symbols)
    }

    // ========== accessors ==========

    /// Look up a fact by id.
    pub fn fact(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(&id)
    }

    /// Look up a rule by id.
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// The id of the fact with this statement, if stored.
    pub fn fact_id(&self, statement: &Statement) -> Option<FactId> {
        self.fact_index.get(statement).copied()
    }

    /// The id of the rule with these premises and consequent, if stored.
    pub fn rule_id(&self, lhs: &[Statement], rhs: &Statement) -> Option<RuleId> {
        self.rule_index.get(&(lhs.to_vec(), rhs.clone())).copied()
    }

    /// Whether a fact with this statement is stored.
    pub fn contains_fact(&self, statement: &Statement) -> bool {
        self.fact_index.contains_key(statement)
    }

    /// Number of stored facts.
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Number of stored rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Iterate over all stored facts.
    pub fn facts(&self) -> impl Iterator<Item = (FactId, &Fact)> {
        self.facts.iter().map(|(&id, fact)| (id, fact))
    }

    /// Iterate over all stored rules.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().map(|(&id, rule)| (id, rule))
    }

    /// Snapshot of the store's operation counters.
    pub fn metrics(&self) -> &KbMetrics {
        &self.metrics
    }

    // ========== assertion ==========

    /// Ingest externally authored knowledge.
    ///
    /// The item becomes (or stays) asserted, and insertion runs the forward
    /// chaining closure against the rest of the store.
    pub fn assert_item(&mut self, item: Item) {
        match item {
            Item::Fact(statement) => {
                self.assert_fact(statement);
            }
            Item::Rule { lhs, rhs } => {
                self.assert_rule(lhs, rhs);
            }
        }
    }

    /// Assert a fact. Returns the id of the stored (possibly merged) fact.
    pub fn assert_fact(&mut self, statement: Statement) -> FactId {
        self.metrics.assertions += 1;
        debug!(fact = ?statement, "assert_fact");
        self.add_fact(statement, None)
    }

    /// Assert a rule. Returns the id of the stored (possibly merged) rule.
    ///
    /// A rule with no premises never fires; the parser rejects such rules
    /// at the syntax boundary.
    pub fn assert_rule(&mut self, lhs: Vec<Statement>, rhs: Statement) -> RuleId {
        self.metrics.assertions += 1;
        debug!(rule = ?rhs, premises = lhs.len(), "assert_rule");
        self.add_rule(lhs, rhs, None)
    }

    /// Merge-or-insert a fact.
    ///
    /// With provenance this is the derivation path: an equal stored fact
    /// gains the support pair; a new fact is inserted unasserted. Without
    /// provenance it is the external-assertion path: an equal stored fact
    /// becomes asserted; a new fact is inserted asserted. Insertion runs
    /// one inference round against every existing rule.
    pub(crate) fn add_fact(&mut self, statement: Statement, provenance: Option<Support>) -> FactId {
        if let Some(&id) = self.fact_index.get(&statement) {
            match provenance {
                Some(support) => {
                    self.metrics.fact_merges += 1;
                    trace!(fact = id.0, "merge_fact_support");
                    self.attach_fact_support(id, support);
                }
                None => {
                    if let Some(fact) = self.facts.get_mut(&id) {
                        fact.asserted = true;
                    }
                }
            }
            return id;
        }

        let id = FactId(self.next_fact);
        self.next_fact += 1;
        if provenance.is_some() {
            self.metrics.derived_facts += 1;
        }
        self.facts.insert(
            id,
            Fact {
                statement: statement.clone(),
                asserted: provenance.is_none(),
                supported_by: Vec::new(),
                supports_facts: Vec::new(),
                supports_rules: Vec::new(),
            },
        );
        self.fact_index.insert(statement, id);
        if let Some(support) = provenance {
            self.attach_fact_support(id, support);
        }

        let mut rule_ids: Vec<RuleId> = self.rules.keys().copied().collect();
        rule_ids.sort_by_key(|rule| rule.0);
        for rule_id in rule_ids {
            infer(self, id, rule_id);
        }
        id
    }

    /// Merge-or-insert a rule; the mirror image of [`Self::add_fact`].
    /// Insertion runs one inference round against every existing fact.
    pub(crate) fn add_rule(
        &mut self,
        lhs: Vec<Statement>,
        rhs: Statement,
        provenance: Option<Support>,
    ) -> RuleId {
        if let Some(&id) = self.rule_index.get(&(lhs.clone(), rhs.clone())) {
            match provenance {
                Some(support) => {
                    self.metrics.rule_merges += 1;
                    trace!(rule = id.0, "merge_rule_support");
                    self.attach_rule_support(id, support);
                }
                None => {
                    if let Some(rule) = self.rules.get_mut(&id) {
                        rule.asserted = true;
                    }
                }
            }
            return id;
        }

        let id = RuleId(self.next_rule);
        self.next_rule += 1;
        if provenance.is_some() {
            self.metrics.derived_rules += 1;
        }
        self.rules.insert(
            id,
            Rule {
                lhs: lhs.clone(),
                rhs: rhs.clone(),
                asserted: provenance.is_none(),
                supported_by: Vec::new(),
                supports_facts: Vec::new(),
                supports_rules: Vec::new(),
            },
        );
        self.rule_index.insert((lhs, rhs), id);
        if let Some(support) = provenance {
            self.attach_rule_support(id, support);
        }

        let mut fact_ids: Vec<FactId> = self.facts.keys().copied().collect();
        fact_ids.sort_by_key(|fact| fact.0);
        for fact_id in fact_ids {
            infer(self, fact_id, id);
        }
        id
    }

    /// Record a support pair on a fact and register the back-references on
    /// both supporters. Duplicate pairs and direct self-support are dropped.
    fn attach_fact_support(&mut self, id: FactId, support: Support) {
        if support.fact == id {
            return;
        }
        let fresh = match self.facts.get_mut(&id) {
            Some(fact) if !fact.supported_by.contains(&support) => {
                fact.supported_by.push(support);
                true
            }
            _ => false,
        };
        if !fresh {
            return;
        }
        if let Some(premise) = self.facts.get_mut(&support.fact) {
            if !premise.supports_facts.contains(&id) {
                premise.supports_facts.push(id);
            }
        }
        if let Some(rule) = self.rules.get_mut(&support.rule) {
            if !rule.supports_facts.contains(&id) {
                rule.supports_facts.push(id);
            }
        }
    }

    /// Record a support pair on a rule; mirror of
    /// [`Self::attach_fact_support`].
    fn attach_rule_support(&mut self, id: RuleId, support: Support) {
        if support.rule == id {
            return;
        }
        let fresh = match self.rules.get_mut(&id) {
            Some(rule) if !rule.supported_by.contains(&support) => {
                rule.supported_by.push(support);
                true
            }
            _ => false,
        };
        if !fresh {
            return;
        }
        if let Some(premise) = self.facts.get_mut(&support.fact) {
            if !premise.supports_rules.contains(&id) {
                premise.supports_rules.push(id);
            }
        }
        if let Some(rule) = self.rules.get_mut(&support.rule) {
            if !rule.supports_rules.contains(&id) {
                rule.supports_rules.push(id);
            }
        }
    }

    // ========== queries ==========

    /// Answer a membership/unification query.
    ///
    /// Rule-shaped items are rejected with [`KbError::InvalidQuery`]. A
    /// fact-shaped query unifies against every stored fact; no match is an
    /// empty answer set, not an error.
    pub fn ask(&self, query: &Item) -> Result<Vec<Answer>, KbError> {
        match query {
            Item::Fact(statement) => Ok(self.ask_statement(statement)),
            Item::Rule { .. } => Err(KbError::InvalidQuery),
        }
    }

    /// Answer a statement query; the infallible form of [`Self::ask`].
    /// Answers come back ordered by fact id.
    pub fn ask_statement(&self, query: &Statement) -> Vec<Answer> {
        let mut answers = Vec::new();
        for (&id, fact) in &self.facts {
            if let Some(bindings) = unify(query, &fact.statement, &self.terms) {
                answers.push(Answer { bindings, fact: id });
            }
        }
        answers.sort_by_key(|answer| answer.fact.0);
        answers
    }

    // ========== retraction ==========

    /// Withdraw a directly asserted fact.
    ///
    /// Retraction is defined only for direct assertions: if the fact is
    /// absent, derived-only, or already retracted, this is a silent no-op.
    /// Clearing the last justification removes the fact and cascades
    /// through everything it supported.
    pub fn retract(&mut self, statement: &Statement) {
        let Some(&id) = self.fact_index.get(statement) else {
            self.metrics.retractions_ignored += 1;
            debug!(fact = ?statement, "retract_ignored_absent");
            return;
        };
        let Some(fact) = self.facts.get_mut(&id) else {
            return;
        };
        if !fact.asserted {
            self.metrics.retractions_ignored += 1;
            debug!(fact = id.0, "retract_ignored_not_asserted");
            return;
        }
        fact.asserted = false;
        self.metrics.retractions += 1;
        debug!(fact = id.0, "retract");
        if fact.supported_by.is_empty() {
            self.remove_fact(id);
        }
    }

    /// Item-level retraction: rules are never retractable and are ignored.
    pub fn retract_item(&mut self, item: &Item) {
        match item {
            Item::Fact(statement) => self.retract(statement),
            Item::Rule { .. } => {
                self.metrics.retractions_ignored += 1;
                debug!("retract_ignored_rule");
            }
        }
    }

    // ========== removal cascade ==========

    /// Delete a fact that has lost its last justification, then cascade
    /// through its dependents.
    fn remove_fact(&mut self, id: FactId) {
        let Some(fact) = self.facts.remove(&id) else {
            return;
        };
        debug_assert!(!fact.asserted && fact.supported_by.is_empty());
        self.fact_index.remove(&fact.statement);
        self.metrics.fact_removals += 1;
        trace!(fact = id.0, "remove_fact");

        for dep in fact.supports_facts {
            self.detach_fact_dep(dep, Removed::Fact(id));
        }
        for dep in fact.supports_rules {
            self.detach_rule_dep(dep, Removed::Fact(id));
        }
    }

    /// Delete a rule that has lost its last justification, then cascade
    /// through its dependents.
    fn remove_rule(&mut self, id: RuleId) {
        let Some(rule) = self.rules.remove(&id) else {
            return;
        };
        debug_assert!(!rule.asserted && rule.supported_by.is_empty());
        let Rule {
            lhs,
            rhs,
            supports_facts,
            supports_rules,
            ..
        } = rule;
        self.rule_index.remove(&(lhs, rhs));
        self.metrics.rule_removals += 1;
        trace!(rule = id.0, "remove_rule");

        for dep in supports_facts {
            self.detach_fact_dep(dep, Removed::Rule(id));
        }
        for dep in supports_rules {
            self.detach_rule_dep(dep, Removed::Rule(id));
        }
    }

    /// Drop every support pair naming the removed item from a dependent
    /// fact, clean up co-supporter back-references for pairs that vanished,
    /// and recursively remove the dependent if it is left unjustified.
    fn detach_fact_dep(&mut self, dep: FactId, removed: Removed) {
        let (dropped, kept, asserted) = {
            let Some(fact) = self.facts.get_mut(&dep) else {
                return;
            };
            let (dropped, kept): (Vec<Support>, Vec<Support>) = fact
                .supported_by
                .drain(..)
                .partition(|support| removed.matches(support));
            fact.supported_by = kept.clone();
            (dropped, kept, fact.asserted)
        };
        if dropped.is_empty() {
            return;
        }

        for support in &dropped {
            match removed {
                Removed::Fact(_) => {
                    if !kept.iter().any(|k| k.rule == support.rule) {
                        if let Some(rule) = self.rules.get_mut(&support.rule) {
                            rule.supports_facts.retain(|&d| d != dep);
                        }
                    }
                }
                Removed::Rule(_) => {
                    if !kept.iter().any(|k| k.fact == support.fact) {
                        if let Some(fact) = self.facts.get_mut(&support.fact) {
                            fact.supports_facts.retain(|&d| d != dep);
                        }
                    }
                }
            }
        }

        if kept.is_empty() && !asserted {
            self.remove_fact(dep);
        }
    }

    /// Mirror of [`Self::detach_fact_dep`] for dependent rules.
    fn detach_rule_dep(&mut self, dep: RuleId, removed: Removed) {
        let (dropped, kept, asserted) = {
            let Some(rule) = self.rules.get_mut(&dep) else {
                return;
            };
            let (dropped, kept): (Vec<Support>, Vec<Support>) = rule
                .supported_by
                .drain(..)
                .partition(|support| removed.matches(support));
            rule.supported_by = kept.clone();
            (dropped, kept, rule.asserted)
        };
        if dropped.is_empty() {
            return;
        }

        for support in &dropped {
            match removed {
                Removed::Fact(_) => {
                    if !kept.iter().any(|k| k.rule == support.rule) {
                        if let Some(rule) = self.rules.get_mut(&support.rule) {
                            rule.supports_rules.retain(|&d| d != dep);
                        }
                    }
                }
                Removed::Rule(_) => {
                    if !kept.iter().any(|k| k.fact == support.fact) {
                        if let Some(fact) = self.facts.get_mut(&support.fact) {
                            fact.supports_rules.retain(|&d| d != dep);
                        }
                    }
                }
            }
        }

        if kept.is_empty() && !asserted {
            self.remove_rule(dep);
        }
    }

    // ========== invariant verification ==========

    /// Verify the store's structural invariants, returning the first
    /// violation found. Intended for tests and debugging.
    ///
    /// Checks: the support invariant (asserted or non-empty support), index
    /// consistency, back-reference symmetry for every support pair, no
    /// dangling ids, and no direct self-support.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (&id, fact) in &self.facts {
            if !fact.asserted && fact.supported_by.is_empty() {
                return Err(format!("fact {} is unasserted and unsupported", id.0));
            }
            if self.fact_index.get(&fact.statement) != Some(&id) {
                return Err(format!("fact {} missing from statement index", id.0));
            }
            for support in &fact.supported_by {
                self.check_support(support, &format!("fact {}", id.0))?;
                if support.fact == id {
                    return Err(format!("fact {} supports itself", id.0));
                }
                let Some(premise) = self.facts.get(&support.fact) else {
                    return Err(format!("fact {} supported by missing fact", id.0));
                };
                if !premise.supports_facts.contains(&id) {
                    return Err(format!(
                        "fact {} lacks back-reference from fact {}",
                        id.0, support.fact.0
                    ));
                }
                let Some(rule) = self.rules.get(&support.rule) else {
                    return Err(format!("fact {} supported by missing rule", id.0));
                };
                if !rule.supports_facts.contains(&id) {
                    return Err(format!(
                        "fact {} lacks back-reference from rule {}",
                        id.0, support.rule.0
                    ));
                }
            }
            for dep in &fact.supports_facts {
                if !self.facts.contains_key(dep) {
                    return Err(format!("fact {} supports missing fact {}", id.0, dep.0));
                }
            }
            for dep in &fact.supports_rules {
                if !self.rules.contains_key(dep) {
                    return Err(format!("fact {} supports missing rule {}", id.0, dep.0));
                }
            }
        }

        for (&id, rule) in &self.rules {
            if !rule.asserted && rule.supported_by.is_empty() {
                return Err(format!("rule {} is unasserted and unsupported", id.0));
            }
            if self.rule_index.get(&(rule.lhs.clone(), rule.rhs.clone())) != Some(&id) {
                return Err(format!("rule {} missing from rule index", id.0));
            }
            for support in &rule.supported_by {
                self.check_support(support, &format!("rule {}", id.0))?;
                if support.rule == id {
                    return Err(format!("rule {} supports itself", id.0));
                }
                let Some(premise) = self.facts.get(&support.fact) else {
                    return Err(format!("rule {} supported by missing fact", id.0));
                };
                if !premise.supports_rules.contains(&id) {
                    return Err(format!(
                        "rule {} lacks back-reference from fact {}",
                        id.0, support.fact.0
                    ));
                }
                let Some(parent) = self.rules.get(&support.rule) else {
                    return Err(format!("rule {} supported by missing rule", id.0));
                };
                if !parent.supports_rules.contains(&id) {
                    return Err(format!(
                        "rule {} lacks back-reference from rule {}",
                        id.0, support.rule.0
                    ));
                }
            }
            for dep in &rule.supports_facts {
                if !self.facts.contains_key(dep) {
                    return Err(format!("rule {} supports missing fact {}", id.0, dep.0));
                }
            }
            for dep in &rule.supports_rules {
                if !self.rules.contains_key(dep) {
                    return Err(format!("rule {} supports missing rule {}", id.0, dep.0));
                }
            }
        }

        Ok(())
    }

    fn check_support(&self, support: &Support, owner: &str) -> Result<(), String> {
        if !self.facts.contains_key(&support.fact) {
            return Err(format!(
                "{owner} has support pair naming removed fact {}",
                support.fact.0
            ));
        }
        if !self.rules.contains_key(&support.rule) {
            return Err(format!(
                "{owner} has support pair naming removed rule {}",
                support.rule.0
            ));
        }
        Ok(())
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/kb.rs"]
mod tests;
