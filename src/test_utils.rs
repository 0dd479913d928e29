use crate::symbol::SymbolStore;
use crate::term::TermStore;

/// Create a fresh symbol and term store pair for tests.
pub(crate) fn setup() -> (SymbolStore, TermStore) {
    (SymbolStore::new(), TermStore::new())
}
