//! Data-driven type registry for entities, predicates and actions.
//!
//! A [`SchemaRegistry`] describes which entity types exist, which parameters each predicate
//! takes, and how an action's preconditions and effects are built from its parameters. It
//! also produces the matching instances.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::blackboard::Blackboard;
use crate::call::CallExpr;
use crate::entity::{Entity, EntityCategory, EntityRef};
use crate::error::{CoreError, Result};
use crate::predicate::{ParamValue, Predicate};
use crate::symbol::{Symbol, SymbolTable};
use crate::value::{Value, ValueKind};

/// Reserved template argument carrying the negation flag.
pub const NEGATION_ARG: &str = "isNegated";

/// Logic run by an action node each tick. `Ok(true)` succeeds, `Ok(false)` fails.
pub type ActionLogic = Arc<dyn Fn(&Bindings, f32) -> anyhow::Result<bool> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Entity(EntityCategory),
    Value(ValueKind),
}

impl FromStr for ParamKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if let Ok(category) = s.parse::<EntityCategory>() {
            return Ok(ParamKind::Entity(category));
        }
        s.parse::<ValueKind>()
            .map(ParamKind::Value)
            .map_err(|_| CoreError::invalid(format!("unsupported parameter type '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: Symbol,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    pub name: Symbol,
    pub category: EntityCategory,
    pub properties: Vec<(String, ValueKind)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateSchema {
    pub name: Symbol,
    pub params: Vec<ParamSpec>,
}

/// One precondition or effect of an action type, e.g.
/// `holding(agent = client, myObject = obj, isNegated = false)`.
///
/// Argument values naming an action parameter are bound to that parameter's entity at
/// instantiation time; other values are literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateTemplate {
    pub predicate: String,
    pub args: Vec<(String, String)>,
    pub negated: bool,
}

impl PredicateTemplate {
    /// Parses a template, with or without a leading `PredicateInstance:` tag.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let body = text
            .strip_prefix("PredicateInstance:")
            .unwrap_or(text);
        let call = CallExpr::parse(body, '=')?;

        let mut negated = false;
        let mut args = Vec::with_capacity(call.args.len());
        for (key, value) in call.args {
            if key == NEGATION_ARG {
                negated = value.parse::<bool>().map_err(|_| {
                    CoreError::invalid(format!("{NEGATION_ARG} expects true/false, got '{value}'"))
                })?;
            } else {
                args.push((key, value));
            }
        }

        Ok(Self {
            predicate: call.name,
            args,
            negated,
        })
    }
}

#[derive(Clone)]
pub struct ActionSchema {
    pub name: Symbol,
    pub params: Vec<ParamSpec>,
    pub preconditions: Vec<PredicateTemplate>,
    pub effects: Vec<PredicateTemplate>,
    pub logic: ActionLogic,
}

impl fmt::Debug for ActionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSchema")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("preconditions", &self.preconditions)
            .field("effects", &self.effects)
            .finish_non_exhaustive()
    }
}

/// Entities bound to an action's named parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    entries: Vec<(Symbol, EntityRef)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, param: Symbol, entity: EntityRef) {
        match self.entries.iter_mut().find(|(p, _)| *p == param) {
            Some(slot) => slot.1 = entity,
            None => self.entries.push((param, entity)),
        }
    }

    pub fn get(&self, param: Symbol) -> Option<EntityRef> {
        self.entries
            .iter()
            .find_map(|(p, e)| (*p == param).then_some(*e))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, EntityRef)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Argument supplied when building a predicate instance.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateArg {
    /// An entity by blackboard key.
    Entity(Symbol),
    /// A literal. For entity parameters a string literal is read as an entity name.
    Literal(Value),
}

#[derive(Debug)]
pub struct SchemaRegistry {
    symbols: Arc<SymbolTable>,
    entities: BTreeMap<String, EntitySchema>,
    predicates: BTreeMap<String, PredicateSchema>,
    actions: BTreeMap<String, ActionSchema>,
}

// Type names are matched case-insensitively.
fn type_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl SchemaRegistry {
    pub fn new(symbols: Arc<SymbolTable>) -> Self {
        Self {
            symbols,
            entities: BTreeMap::new(),
            predicates: BTreeMap::new(),
            actions: BTreeMap::new(),
        }
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    /// Registers (or replaces) an entity type.
    pub fn register_entity_type(
        &mut self,
        name: &str,
        category: EntityCategory,
        properties: Vec<(String, ValueKind)>,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(CoreError::invalid("entity type name is empty"));
        }
        let schema = EntitySchema {
            name: self.symbols.intern(name.trim()),
            category,
            properties,
        };
        tracing::debug!(entity_type = name, category = %category, "Registered entity type");
        self.entities.insert(type_key(name), schema);
        Ok(())
    }

    /// Registers (or replaces) a predicate type. Parameter names must be unique.
    pub fn register_predicate_type(&mut self, name: &str, params: &[(&str, ParamKind)]) -> Result<()> {
        if name.trim().is_empty() {
            return Err(CoreError::invalid("predicate type name is empty"));
        }
        let params = self.param_specs(name, params)?;
        let schema = PredicateSchema {
            name: self.symbols.intern(name.trim()),
            params,
        };
        tracing::debug!(predicate_type = name, arity = schema.params.len(), "Registered predicate type");
        self.predicates.insert(type_key(name), schema);
        Ok(())
    }

    /// Registers (or replaces) an action type. Action parameters must be entity-typed.
    ///
    /// Every template must name a registered predicate and supply each of its parameters
    /// exactly once. Entity parameters must be bound to an action parameter of the same
    /// category; value parameters take literals.
    pub fn register_action_type(
        &mut self,
        name: &str,
        params: &[(&str, ParamKind)],
        preconditions: Vec<PredicateTemplate>,
        effects: Vec<PredicateTemplate>,
        logic: ActionLogic,
    ) -> Result<()> {
        if name.trim().is_empty() {
            return Err(CoreError::invalid("action type name is empty"));
        }
        if let Some((param, kind)) = params
            .iter()
            .find(|(_, kind)| matches!(kind, ParamKind::Value(_)))
        {
            return Err(CoreError::invalid(format!(
                "unsupported parameter type {kind:?} for '{param}' of action '{name}'"
            )));
        }
        let params = self.param_specs(name, params)?;
        for template in preconditions.iter().chain(&effects) {
            self.check_template(name, &params, template)?;
        }
        let schema = ActionSchema {
            name: self.symbols.intern(name.trim()),
            params,
            preconditions,
            effects,
            logic,
        };
        tracing::debug!(action_type = name, arity = schema.params.len(), "Registered action type");
        self.actions.insert(type_key(name), schema);
        Ok(())
    }

    fn check_template(
        &self,
        action: &str,
        params: &[ParamSpec],
        template: &PredicateTemplate,
    ) -> Result<()> {
        let schema = self.predicate_type(&template.predicate)?;
        let mut seen = Vec::with_capacity(template.args.len());
        for (arg, value) in &template.args {
            let spec = self
                .symbols
                .lookup(arg.trim())
                .and_then(|sym| schema.params.iter().find(|p| p.name == sym))
                .ok_or_else(|| {
                    CoreError::invalid(format!(
                        "action '{action}': predicate '{}' has no parameter '{arg}'",
                        template.predicate
                    ))
                })?;
            if seen.contains(&spec.name) {
                return Err(CoreError::invalid(format!(
                    "action '{action}': '{arg}' is bound twice in '{}'",
                    template.predicate
                )));
            }
            seen.push(spec.name);

            let ParamKind::Entity(category) = spec.kind else {
                continue;
            };
            let bound = self
                .symbols
                .lookup(value.trim())
                .and_then(|sym| params.iter().find(|p| p.name == sym));
            match bound {
                Some(param) if param.kind == ParamKind::Entity(category) => {}
                Some(param) => {
                    return Err(CoreError::invalid(format!(
                        "action '{action}': '{value}' is {:?} but '{arg}' of '{}' needs {category}",
                        param.kind, template.predicate
                    )))
                }
                None => {
                    return Err(CoreError::invalid(format!(
                        "action '{action}': '{value}' in '{}' is not an action parameter",
                        template.predicate
                    )))
                }
            }
        }
        if seen.len() != schema.params.len() {
            return Err(CoreError::invalid(format!(
                "action '{action}': predicate '{}' expects {} arguments, got {}",
                template.predicate,
                schema.params.len(),
                seen.len()
            )));
        }
        Ok(())
    }

    fn param_specs(&self, owner: &str, params: &[(&str, ParamKind)]) -> Result<Vec<ParamSpec>> {
        let mut specs: Vec<ParamSpec> = Vec::with_capacity(params.len());
        for (param, kind) in params {
            let param = param.trim();
            if param.is_empty() || param == NEGATION_ARG {
                return Err(CoreError::invalid(format!(
                    "invalid parameter name '{param}' on '{owner}'"
                )));
            }
            let name = self.symbols.intern(param);
            if specs.iter().any(|s| s.name == name) {
                return Err(CoreError::invalid(format!(
                    "duplicate parameter '{param}' on '{owner}'"
                )));
            }
            specs.push(ParamSpec { name, kind: *kind });
        }
        Ok(specs)
    }

    pub fn entity_type(&self, name: &str) -> Result<&EntitySchema> {
        self.entities
            .get(&type_key(name))
            .ok_or_else(|| CoreError::invalid(format!("unknown entity type '{name}'")))
    }

    pub fn predicate_type(&self, name: &str) -> Result<&PredicateSchema> {
        self.predicates
            .get(&type_key(name))
            .ok_or_else(|| CoreError::invalid(format!("unknown predicate type '{name}'")))
    }

    pub fn action_type(&self, name: &str) -> Result<&ActionSchema> {
        self.actions
            .get(&type_key(name))
            .ok_or_else(|| CoreError::invalid(format!("unknown action type '{name}'")))
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    pub fn predicate_types(&self) -> impl Iterator<Item = &PredicateSchema> {
        self.predicates.values()
    }

    pub fn action_types(&self) -> impl Iterator<Item = &ActionSchema> {
        self.actions.values()
    }

    /// Writes every registered type name into the blackboard's type lists.
    pub fn publish(&self, blackboard: &mut Blackboard) {
        for schema in self.entities.values() {
            blackboard.register_entity_type(schema.category, schema.name);
        }
        for schema in self.predicates.values() {
            blackboard.register_predicate_type(schema.name);
        }
        for schema in self.actions.values() {
            blackboard.register_action_type(schema.name);
        }
    }

    /// Builds an entity of `type_name` named `instance`, with zeroed properties.
    pub fn create_entity(&self, type_name: &str, instance: &str) -> Result<Entity> {
        let schema = self.entity_type(type_name)?;
        let mut entity = Entity::new(schema.name, schema.category);
        entity.name = self.symbols.intern(instance.trim());
        for (property, kind) in &schema.properties {
            let value = match kind {
                ValueKind::Bool => Value::Bool(false),
                ValueKind::Int => Value::Int(0),
                ValueKind::Double => Value::Double(0.0),
                ValueKind::Str => Value::Str(String::new()),
            };
            entity.properties.insert(property.clone(), value);
        }
        Ok(entity)
    }

    /// Builds a predicate instance, binding every declared parameter in declaration order.
    ///
    /// Unknown or missing parameters and kind mismatches are `InvalidArgument`; entity
    /// arguments absent from the blackboard are `NotFound`.
    pub fn create_predicate(
        &self,
        name: &str,
        args: &[(&str, PredicateArg)],
        negated: bool,
        blackboard: &Blackboard,
    ) -> Result<Predicate> {
        let schema = self.predicate_type(name)?;

        for (arg, _) in args {
            let declared = self
                .symbols
                .lookup(arg.trim())
                .is_some_and(|sym| schema.params.iter().any(|p| p.name == sym));
            if !declared {
                return Err(CoreError::invalid(format!(
                    "predicate '{name}' has no parameter '{arg}'"
                )));
            }
        }
        if args.len() != schema.params.len() {
            return Err(CoreError::invalid(format!(
                "predicate '{name}' expects {} arguments, got {}",
                schema.params.len(),
                args.len()
            )));
        }

        let mut predicate = Predicate::new(schema.name).negated(negated);
        for spec in &schema.params {
            let param_name = self.symbols.resolve(spec.name);
            let (_, arg) = args
                .iter()
                .find(|(arg, _)| arg.trim() == &*param_name)
                .ok_or_else(|| {
                    CoreError::invalid(format!("predicate '{name}' is missing '{param_name}'"))
                })?;
            let value = self.bind_arg(name, &param_name, spec.kind, arg, blackboard)?;
            predicate.set_param(spec.name, value);
        }
        Ok(predicate)
    }

    fn bind_arg(
        &self,
        predicate: &str,
        param: &str,
        kind: ParamKind,
        arg: &PredicateArg,
        blackboard: &Blackboard,
    ) -> Result<ParamValue> {
        match (kind, arg) {
            (ParamKind::Entity(category), PredicateArg::Entity(key)) => {
                let entity = blackboard.get_entity(category, *key)?;
                Ok(ParamValue::Entity(entity.reference()))
            }
            (ParamKind::Entity(category), PredicateArg::Literal(Value::Str(name))) => {
                let key = self
                    .symbols
                    .lookup(name)
                    .ok_or_else(|| CoreError::not_found(category.as_str(), name.clone()))?;
                let entity = blackboard.get_entity(category, key)?;
                Ok(ParamValue::Entity(entity.reference()))
            }
            (ParamKind::Value(ValueKind::Str), PredicateArg::Entity(key)) => Ok(ParamValue::Value(
                Value::Str(self.symbols.resolve(*key).to_string()),
            )),
            (ParamKind::Value(expected), PredicateArg::Literal(value)) if value.fits(expected) => {
                let value = match (expected, value) {
                    (ValueKind::Double, Value::Int(i)) => Value::Double(*i as f64),
                    _ => value.clone(),
                };
                Ok(ParamValue::Value(value))
            }
            _ => Err(CoreError::invalid(format!(
                "argument {arg:?} does not fit parameter '{param}' ({kind:?}) of '{predicate}'"
            ))),
        }
    }
}
