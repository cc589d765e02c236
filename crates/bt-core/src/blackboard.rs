//! The shared fact store read and written by actions, predicates and decorators.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::entity::{Entity, EntityCategory, EntityRef};
use crate::error::{CoreError, Result};
use crate::predicate::{ParamValue, Predicate};
use crate::sink::{PredicateRecord, PredicateSink};
use crate::state::State;
use crate::symbol::{Symbol, SymbolTable};

/// Typed key for an extension slot.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

/// Scalar types with a dedicated typed map on the blackboard.
pub trait BlackboardValue: Clone + Sized + 'static {
    const KIND: &'static str;

    fn slot(blackboard: &Blackboard) -> &HashMap<Symbol, Self>;
    fn slot_mut(blackboard: &mut Blackboard) -> &mut HashMap<Symbol, Self>;
}

macro_rules! blackboard_value {
    ($ty:ty, $field:ident, $kind:literal) => {
        impl BlackboardValue for $ty {
            const KIND: &'static str = $kind;

            fn slot(blackboard: &Blackboard) -> &HashMap<Symbol, Self> {
                &blackboard.$field
            }

            fn slot_mut(blackboard: &mut Blackboard) -> &mut HashMap<Symbol, Self> {
                &mut blackboard.$field
            }
        }
    };
}

blackboard_value!(i64, ints, "int");
blackboard_value!(f64, doubles, "double");
blackboard_value!(bool, bools, "bool");
blackboard_value!(String, strings, "string");

/// A materialised action instance: its type and the entities bound to each parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInstanceRecord {
    pub action_type: Symbol,
    pub params: Vec<(Symbol, EntityRef)>,
}

/// Facts asserted under one key, with their signatures in the same order.
#[derive(Debug, Clone, Default)]
struct PredicateSet {
    facts: Vec<Predicate>,
    signatures: Vec<String>,
}

#[derive(Debug, Default)]
struct RegisteredTypes {
    entities: BTreeMap<EntityCategory, BTreeSet<Symbol>>,
    predicates: BTreeSet<Symbol>,
    actions: BTreeSet<Symbol>,
}

pub struct Blackboard {
    symbols: Arc<SymbolTable>,
    ints: HashMap<Symbol, i64>,
    doubles: HashMap<Symbol, f64>,
    bools: HashMap<Symbol, bool>,
    strings: HashMap<Symbol, String>,
    entities: BTreeMap<EntityCategory, BTreeMap<Symbol, Entity>>,
    predicates: BTreeMap<Symbol, PredicateSet>,
    signatures: HashMap<String, Symbol>,
    actions: BTreeMap<Symbol, ActionInstanceRecord>,
    states: BTreeMap<Symbol, State>,
    registered: RegisteredTypes,
    extensions: BTreeMap<u64, Box<dyn Any + Send + Sync>>,
    sink: Option<Box<dyn PredicateSink>>,
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blackboard")
            .field("ints", &self.ints.len())
            .field("doubles", &self.doubles.len())
            .field("bools", &self.bools.len())
            .field("strings", &self.strings.len())
            .field("entities", &self.entity_count())
            .field("predicates", &self.predicate_count())
            .field("actions", &self.actions.len())
            .field("extensions", &self.extensions.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Blackboard {
    pub fn new(symbols: Arc<SymbolTable>) -> Self {
        Self {
            symbols,
            ints: HashMap::new(),
            doubles: HashMap::new(),
            bools: HashMap::new(),
            strings: HashMap::new(),
            entities: BTreeMap::new(),
            predicates: BTreeMap::new(),
            signatures: HashMap::new(),
            actions: BTreeMap::new(),
            states: BTreeMap::new(),
            registered: RegisteredTypes::default(),
            extensions: BTreeMap::new(),
            sink: None,
        }
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn intern(&self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    /// Clears every store. The symbol table, registered types and the sink are kept.
    pub fn clear(&mut self) {
        self.ints.clear();
        self.doubles.clear();
        self.bools.clear();
        self.strings.clear();
        self.entities.clear();
        self.predicates.clear();
        self.signatures.clear();
        self.actions.clear();
        self.states.clear();
        self.extensions.clear();
    }

    pub fn set_predicate_sink(&mut self, sink: Box<dyn PredicateSink>) {
        self.sink = Some(sink);
    }

    pub fn take_predicate_sink(&mut self) -> Option<Box<dyn PredicateSink>> {
        self.sink.take()
    }

    // Typed values

    pub fn set<T: BlackboardValue>(&mut self, key: Symbol, value: T) {
        T::slot_mut(self).insert(key, value);
    }

    pub fn get<T: BlackboardValue>(&self, key: Symbol) -> Result<T> {
        self.get_ref(key).cloned()
    }

    pub fn get_ref<T: BlackboardValue>(&self, key: Symbol) -> Result<&T> {
        T::slot(self)
            .get(&key)
            .ok_or_else(|| CoreError::not_found(T::KIND, self.symbols.resolve(key).to_string()))
    }

    pub fn try_get<T: BlackboardValue>(&self, key: Symbol) -> Option<T> {
        T::slot(self).get(&key).cloned()
    }

    pub fn contains<T: BlackboardValue>(&self, key: Symbol) -> bool {
        T::slot(self).contains_key(&key)
    }

    pub fn remove<T: BlackboardValue>(&mut self, key: Symbol) -> Option<T> {
        T::slot_mut(self).remove(&key)
    }

    // Entities

    /// Stores `entity` under `key` in its category's registry, back-writing `entity.name`.
    pub fn set_entity(&mut self, key: Symbol, mut entity: Entity) {
        entity.name = key;
        self.entities
            .entry(entity.category)
            .or_default()
            .insert(key, entity);
    }

    pub fn set_agent(&mut self, key: Symbol, entity: Entity) {
        self.set_in_category(EntityCategory::Agent, key, entity);
    }

    pub fn set_element(&mut self, key: Symbol, entity: Entity) {
        self.set_in_category(EntityCategory::Element, key, entity);
    }

    pub fn set_location(&mut self, key: Symbol, entity: Entity) {
        self.set_in_category(EntityCategory::Location, key, entity);
    }

    pub fn set_tool(&mut self, key: Symbol, entity: Entity) {
        self.set_in_category(EntityCategory::Tool, key, entity);
    }

    pub fn set_layer(&mut self, key: Symbol, entity: Entity) {
        self.set_in_category(EntityCategory::Layer, key, entity);
    }

    pub fn set_module(&mut self, key: Symbol, entity: Entity) {
        self.set_in_category(EntityCategory::Module, key, entity);
    }

    fn set_in_category(&mut self, category: EntityCategory, key: Symbol, mut entity: Entity) {
        entity.category = category;
        self.set_entity(key, entity);
    }

    /// Stores `entity` under its own name unless that key is already taken.
    pub fn register_entity_if_absent(&mut self, entity: Entity) -> bool {
        if entity.name.is_none() || self.has_entity(entity.category, entity.name) {
            return false;
        }
        self.set_entity(entity.name, entity);
        true
    }

    pub fn get_entity(&self, category: EntityCategory, key: Symbol) -> Result<&Entity> {
        self.entities
            .get(&category)
            .and_then(|registry| registry.get(&key))
            .ok_or_else(|| {
                CoreError::not_found(category.as_str(), self.symbols.resolve(key).to_string())
            })
    }

    pub fn get_entity_mut(&mut self, category: EntityCategory, key: Symbol) -> Result<&mut Entity> {
        let symbols = &self.symbols;
        self.entities
            .get_mut(&category)
            .and_then(|registry| registry.get_mut(&key))
            .ok_or_else(|| CoreError::not_found(category.as_str(), symbols.resolve(key).to_string()))
    }

    pub fn get_agent(&self, key: Symbol) -> Result<&Entity> {
        self.get_entity(EntityCategory::Agent, key)
    }

    pub fn get_element(&self, key: Symbol) -> Result<&Entity> {
        self.get_entity(EntityCategory::Element, key)
    }

    pub fn get_location(&self, key: Symbol) -> Result<&Entity> {
        self.get_entity(EntityCategory::Location, key)
    }

    pub fn get_tool(&self, key: Symbol) -> Result<&Entity> {
        self.get_entity(EntityCategory::Tool, key)
    }

    pub fn get_layer(&self, key: Symbol) -> Result<&Entity> {
        self.get_entity(EntityCategory::Layer, key)
    }

    pub fn get_module(&self, key: Symbol) -> Result<&Entity> {
        self.get_entity(EntityCategory::Module, key)
    }

    pub fn has_entity(&self, category: EntityCategory, key: Symbol) -> bool {
        self.entities
            .get(&category)
            .is_some_and(|registry| registry.contains_key(&key))
    }

    /// Finds an entity by key in any category, in [`EntityCategory::ALL`] order.
    pub fn find_entity(&self, key: Symbol) -> Option<&Entity> {
        EntityCategory::ALL
            .iter()
            .find_map(|category| self.entities.get(category)?.get(&key))
    }

    pub fn entities(&self, category: EntityCategory) -> impl Iterator<Item = &Entity> {
        self.entities
            .get(&category)
            .into_iter()
            .flat_map(|registry| registry.values())
    }

    pub fn entity_count(&self) -> usize {
        self.entities.values().map(BTreeMap::len).sum()
    }

    // Predicates

    /// Asserts `predicate` under `key`, next to any facts already stored there.
    ///
    /// Returns `false` without touching the store when a predicate with the same signature is
    /// present under any key. Accepted predicates are handed to the persistence sink, if any.
    pub fn set_predicate(&mut self, key: Symbol, predicate: Predicate) -> bool {
        let signature = predicate.signature(&self.symbols);
        if self.signatures.contains_key(&signature) {
            tracing::debug!(signature = %signature, "Predicate already asserted");
            return false;
        }

        let record = self.record_for(key, &predicate, &signature);
        if let Some(sink) = self.sink.as_mut() {
            if let Err(err) = sink.persist(&record) {
                tracing::warn!(signature = %signature, error = %err, "Failed to persist predicate");
            }
        }

        self.signatures.insert(signature.clone(), key);
        let set = self.predicates.entry(key).or_default();
        set.facts.push(predicate);
        set.signatures.push(signature);
        true
    }

    pub fn has_similar_predicate(&self, predicate: &Predicate) -> bool {
        self.signatures
            .contains_key(&predicate.signature(&self.symbols))
    }

    /// Every fact stored under `key`, in assertion order.
    pub fn predicates(&self, key: Symbol) -> Result<&[Predicate]> {
        self.predicates
            .get(&key)
            .map(|set| set.facts.as_slice())
            .ok_or_else(|| CoreError::not_found("predicate", self.symbols.resolve(key).to_string()))
    }

    pub fn has_predicate(&self, key: Symbol) -> bool {
        self.predicates.contains_key(&key)
    }

    /// Removes every fact stored under `key`; their signatures may be asserted again.
    pub fn remove_predicate(&mut self, key: Symbol) -> Option<Vec<Predicate>> {
        let set = self.predicates.remove(&key)?;
        for signature in &set.signatures {
            self.signatures.remove(signature);
        }
        Some(set.facts)
    }

    /// Removes the one stored fact that shares `predicate`'s signature, wherever it lives.
    pub fn retract_similar(&mut self, predicate: &Predicate) -> bool {
        let signature = predicate.signature(&self.symbols);
        let Some(key) = self.signatures.remove(&signature) else {
            return false;
        };
        if let Some(set) = self.predicates.get_mut(&key) {
            if let Some(index) = set.signatures.iter().position(|s| *s == signature) {
                set.signatures.remove(index);
                set.facts.remove(index);
            }
            if set.facts.is_empty() {
                self.predicates.remove(&key);
            }
        }
        true
    }

    /// All stored facts with their keys, ordered by key and then by assertion.
    pub fn all_predicates(&self) -> impl Iterator<Item = (Symbol, &Predicate)> {
        self.predicates
            .iter()
            .flat_map(|(key, set)| set.facts.iter().map(move |fact| (*key, fact)))
    }

    pub fn predicate_count(&self) -> usize {
        self.signatures.len()
    }

    /// Signatures of the facts stored under `key`, in assertion order.
    pub fn signatures_of(&self, key: Symbol) -> impl Iterator<Item = &str> {
        self.predicates
            .get(&key)
            .into_iter()
            .flat_map(|set| set.signatures.iter().map(String::as_str))
    }

    fn record_for(&self, key: Symbol, predicate: &Predicate, signature: &str) -> PredicateRecord {
        let params = predicate
            .params()
            .iter()
            .map(|(param, value)| {
                let rendered = match value {
                    ParamValue::Entity(entity) => self.symbols.resolve(entity.key).to_string(),
                    ParamValue::Value(value) => value.to_string(),
                };
                (self.symbols.resolve(*param).to_string(), rendered)
            })
            .collect();
        PredicateRecord {
            key: self.symbols.resolve(key).to_string(),
            signature: signature.to_string(),
            name: self.symbols.resolve(predicate.name()).to_string(),
            negated: predicate.is_negated(),
            params,
        }
    }

    // Action instances and named states

    pub fn register_action_instance(&mut self, key: Symbol, record: ActionInstanceRecord) {
        self.actions.insert(key, record);
    }

    pub fn action_instance(&self, key: Symbol) -> Result<&ActionInstanceRecord> {
        self.actions
            .get(&key)
            .ok_or_else(|| CoreError::not_found("action", self.symbols.resolve(key).to_string()))
    }

    pub fn action_instances(&self) -> impl Iterator<Item = (Symbol, &ActionInstanceRecord)> {
        self.actions.iter().map(|(k, r)| (*k, r))
    }

    pub fn set_state(&mut self, key: Symbol, state: State) {
        self.states.insert(key, state);
    }

    pub fn get_state(&self, key: Symbol) -> Result<&State> {
        self.states
            .get(&key)
            .ok_or_else(|| CoreError::not_found("state", self.symbols.resolve(key).to_string()))
    }

    // Registered type names (append-only)

    pub fn register_entity_type(&mut self, category: EntityCategory, name: Symbol) {
        self.registered
            .entities
            .entry(category)
            .or_default()
            .insert(name);
    }

    pub fn register_predicate_type(&mut self, name: Symbol) {
        self.registered.predicates.insert(name);
    }

    pub fn register_action_type(&mut self, name: Symbol) {
        self.registered.actions.insert(name);
    }

    pub fn entity_types(&self, category: EntityCategory) -> impl Iterator<Item = Symbol> + '_ {
        self.registered
            .entities
            .get(&category)
            .into_iter()
            .flat_map(|names| names.iter().copied())
    }

    pub fn predicate_types(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.registered.predicates.iter().copied()
    }

    pub fn action_types(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.registered.actions.iter().copied()
    }

    // Extension slots

    pub fn contains_ext<T: Send + Sync + 'static>(&self, key: BbKey<T>) -> bool {
        self.extensions.contains_key(&key.id)
    }

    pub fn set_ext<T: Send + Sync + 'static>(&mut self, key: BbKey<T>, value: T) {
        self.extensions.insert(key.id, Box::new(value));
    }

    pub fn get_ext<T: Send + Sync + 'static>(&self, key: BbKey<T>) -> Option<&T> {
        let value = self.extensions.get(&key.id)?;
        value.downcast_ref::<T>().or_else(|| {
            panic!(
                "blackboard type mismatch for extension id={} (stored type differs from requested)",
                key.id
            )
        })
    }

    pub fn get_ext_mut<T: Send + Sync + 'static>(&mut self, key: BbKey<T>) -> Option<&mut T> {
        let value = self.extensions.get_mut(&key.id)?;
        value.downcast_mut::<T>().or_else(|| {
            panic!(
                "blackboard type mismatch for extension id={} (stored type differs from requested)",
                key.id
            )
        })
    }

    pub fn remove_ext<T: Send + Sync + 'static>(&mut self, key: BbKey<T>) -> Option<T> {
        let value = self.extensions.remove(&key.id)?;
        value.downcast::<T>().map(|b| *b).ok().or_else(|| {
            panic!(
                "blackboard type mismatch for extension id={} (stored type differs from requested)",
                key.id
            )
        })
    }
}
