//! String interning.
//!
//! Every blackboard key, predicate name and parameter name is a [`Symbol`]: a small
//! copyable handle into a [`SymbolTable`]. The table is an explicit context object; share it
//! between blackboards and registries with an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{CoreError, Result};

/// Returned by [`SymbolTable::resolve`] for ids the table never handed out.
pub const MISSING_NAME: &str = "## Missing ID ##";

const NONE_NAME: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol(u32);

impl Symbol {
    /// Reserved id 0, resolves to `"None"`.
    pub const NONE: Symbol = Symbol(0);

    pub fn id(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Interned {
    ids: HashMap<Arc<str>, Symbol>,
    names: Vec<Arc<str>>,
}

#[derive(Debug)]
pub struct SymbolTable {
    inner: RwLock<Interned>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let none: Arc<str> = Arc::from(NONE_NAME);
        let mut ids = HashMap::new();
        ids.insert(none.clone(), Symbol::NONE);
        Self {
            inner: RwLock::new(Interned {
                ids,
                names: vec![none],
            }),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the handle for `name`, allocating the next sequential id on first sight.
    pub fn intern(&self, name: &str) -> Symbol {
        if let Some(symbol) = self.lookup(name) {
            return symbol;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have interned it between the read and write locks.
        if let Some(symbol) = inner.ids.get(name) {
            return *symbol;
        }
        let symbol = Symbol(inner.names.len() as u32);
        let name: Arc<str> = Arc::from(name);
        inner.names.push(name.clone());
        inner.ids.insert(name, symbol);
        symbol
    }

    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.ids.get(name).copied()
    }

    /// Resolves a handle back to its string, yielding [`MISSING_NAME`] for unknown ids.
    pub fn resolve(&self, symbol: Symbol) -> Arc<str> {
        match self.try_resolve(symbol) {
            Ok(name) => name,
            Err(_) => {
                tracing::warn!(id = symbol.id(), "Resolving unknown symbol");
                Arc::from(MISSING_NAME)
            }
        }
    }

    pub fn try_resolve(&self, symbol: Symbol) -> Result<Arc<str>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .names
            .get(symbol.0 as usize)
            .cloned()
            .ok_or(CoreError::UnknownSymbol(symbol.0))
    }

    /// Number of interned names, including the reserved `None`.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}
