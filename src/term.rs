use crate::symbol::{SymId, SymbolStore};
use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

/// Unique identifier for a term in the term store.
/// TermIds are stable; because terms are hashconsed, two TermIds are equal
/// iff the terms they denote are structurally equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TermId(u32);

impl TermId {
    /// Get the raw u32 value (for debugging/display).
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A term is either an opaque constant or a named variable.
/// Terms are flat; composition happens at the statement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// An atomic constant, identified by its interned name.
    Const(SymId),
    /// A named placeholder, implicitly universally quantified.
    Var(SymId),
}

/// Hashconsing arena for terms.
///
/// Guarantees:
/// - Structurally equal terms get the same TermId
/// - A TermId can be resolved back to its term
#[derive(Debug)]
pub struct TermStore {
    /// Central storage of all terms, indexed by TermId.
    nodes: RwLock<Vec<Term>>,
    /// Hashcons map from term to its canonical id.
    interned: RwLock<HashMap<Term, TermId>>,
}

impl TermStore {
    /// Create a new empty term store.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(Vec::new()),
            interned: RwLock::new(HashMap::new()),
        }
    }

    /// Intern a term, returning its TermId.
    /// If the term already exists, returns the existing TermId.
    fn intern(&self, term: Term) -> TermId {
        // Fast path: already interned (read lock).
        {
            let map = self.interned.read();
            if let Some(&id) = map.get(&term) {
                return id;
            }
        }

        let mut map = self.interned.write();

        // Double-check after acquiring the write lock.
        if let Some(&id) = map.get(&term) {
            return id;
        }

        let mut nodes = self.nodes.write();
        let id = TermId(nodes.len() as u32);
        nodes.push(term);
        map.insert(term, id);
        id
    }

    /// Create a constant term from an interned name.
    pub fn constant(&self, name: SymId) -> TermId {
        self.intern(Term::Const(name))
    }

    /// Create a variable term from an interned name.
    pub fn variable(&self, name: SymId) -> TermId {
        self.intern(Term::Var(name))
    }

    /// Resolve a TermId to its term.
    /// Returns None if the TermId is invalid.
    pub fn resolve(&self, id: TermId) -> Option<Term> {
        let nodes = self.nodes.read();
        nodes.get(id.0 as usize).copied()
    }

    /// The variable name if the term is a variable.
    pub fn as_var(&self, id: TermId) -> Option<SymId> {
        match self.resolve(id)? {
            Term::Var(name) => Some(name),
            Term::Const(_) => None,
        }
    }

    /// The constant name if the term is a constant.
    pub fn as_const(&self, id: TermId) -> Option<SymId> {
        match self.resolve(id)? {
            Term::Const(name) => Some(name),
            Term::Var(_) => None,
        }
    }

    /// Number of distinct terms interned so far.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

impl Default for TermStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A statement: a predicate symbol applied to an ordered sequence of terms.
/// Arity is fixed at construction. Equality and hashing are structural;
/// hashconsed argument ids make the comparison id-wise and cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    pub pred: SymId,
    pub args: SmallVec<[TermId; 4]>,
}

impl Statement {
    /// Create a statement from a predicate symbol and arguments.
    pub fn new(pred: SymId, args: impl Into<SmallVec<[TermId; 4]>>) -> Self {
        Self {
            pred,
            args: args.into(),
        }
    }

    /// Number of arguments.
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// A statement is ground when none of its arguments is a variable.
    pub fn is_ground(&self, terms: &TermStore) -> bool {
        self.args.iter().all(|&arg| terms.as_var(arg).is_none())
    }
}

/// Render a statement as `(pred arg ...)`, variables prefixed with `?`.
pub fn format_statement(
    stmt: &Statement,
    terms: &TermStore,
    symbols: &SymbolStore,
) -> Result<String, String> {
    let mut out = String::new();
    out.push('(');
    let pred = symbols
        .resolve(stmt.pred)
        .ok_or_else(|| format!("unknown predicate id {:?}", stmt.pred))?;
    out.push_str(pred);
    for &arg in stmt.args.iter() {
        out.push(' ');
        match terms.resolve(arg) {
            Some(Term::Const(name)) => {
                let name = symbols
                    .resolve(name)
                    .ok_or_else(|| format!("unknown constant id {:?}", name))?;
                out.push_str(name);
            }
            Some(Term::Var(name)) => {
                let name = symbols
                    .resolve(name)
                    .ok_or_else(|| format!("unknown variable id {:?}", name))?;
                out.push('?');
                out.push_str(name);
            }
            None => return Err(format!("unknown term id {:?}", arg)),
        }
    }
    out.push(')');
    Ok(out)
}
