use crate::error::{CoreError, Result};
use crate::predicate::Predicate;
use crate::symbol::{Symbol, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateKind {
    Precondition,
    Effect,
}

/// A named set of predicates, keyed by symbol in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    kind: StateKind,
    name: Symbol,
    predicates: Vec<(Symbol, Predicate)>,
}

impl State {
    pub fn new(kind: StateKind, name: Symbol) -> Self {
        Self {
            kind,
            name,
            predicates: Vec::new(),
        }
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    /// Fails when `key` is already present.
    pub fn add(&mut self, key: Symbol, predicate: Predicate, symbols: &SymbolTable) -> Result<()> {
        if self.contains(key) {
            return Err(CoreError::DuplicateStateEntry {
                state: symbols.resolve(self.name).to_string(),
                key: symbols.resolve(key).to_string(),
            });
        }
        self.predicates.push((key, predicate));
        Ok(())
    }

    pub fn remove(&mut self, key: Symbol) -> Option<Predicate> {
        let index = self.predicates.iter().position(|(k, _)| *k == key)?;
        Some(self.predicates.remove(index).1)
    }

    pub fn contains(&self, key: Symbol) -> bool {
        self.predicates.iter().any(|(k, _)| *k == key)
    }

    pub fn get(&self, key: Symbol) -> Option<&Predicate> {
        self.predicates
            .iter()
            .find_map(|(k, p)| (*k == key).then_some(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Predicate)> {
        self.predicates.iter().map(|(k, p)| (*k, p))
    }

    pub fn keys(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.predicates.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn clear(&mut self) {
        self.predicates.clear();
    }
}
