use crate::entity::EntityRef;
use crate::symbol::{Symbol, SymbolTable};
use crate::value::Value;

/// What a predicate parameter is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Entity(EntityRef),
    Value(Value),
}

/// A named, optionally negated fact over an ordered list of bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    name: Symbol,
    negated: bool,
    params: Vec<(Symbol, ParamValue)>,
}

impl Predicate {
    pub fn new(name: Symbol) -> Self {
        Self {
            name,
            negated: false,
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: Symbol, value: ParamValue) -> Self {
        self.set_param(param, value);
        self
    }

    pub fn with_entity(self, param: Symbol, entity: EntityRef) -> Self {
        self.with_param(param, ParamValue::Entity(entity))
    }

    pub fn with_value(self, param: Symbol, value: impl Into<Value>) -> Self {
        self.with_param(param, ParamValue::Value(value.into()))
    }

    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    /// Binds `param`, replacing an earlier binding in place so parameter order is stable.
    pub fn set_param(&mut self, param: Symbol, value: ParamValue) {
        match self.params.iter_mut().find(|(p, _)| *p == param) {
            Some(slot) => slot.1 = value,
            None => self.params.push((param, value)),
        }
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn params(&self) -> &[(Symbol, ParamValue)] {
        &self.params
    }

    pub fn param(&self, param: Symbol) -> Option<&ParamValue> {
        self.params
            .iter()
            .find_map(|(p, v)| (*p == param).then_some(v))
    }

    /// Canonical `name(v1,v2,...)` identity used for de-duplication.
    ///
    /// Entity parameters render as their instance name and literals in display form. String
    /// literals holding a separator, a bracket or a quote are quoted and escaped so they cannot
    /// alias another parameter list. The negation flag is not part of the signature.
    pub fn signature(&self, symbols: &SymbolTable) -> String {
        let values = self
            .params
            .iter()
            .map(|(_, value)| render(symbols, value))
            .collect::<Vec<_>>();
        format!("{}({})", symbols.resolve(self.name), values.join(","))
    }
}

fn render(symbols: &SymbolTable, value: &ParamValue) -> String {
    match value {
        ParamValue::Entity(entity) => symbols.resolve(entity.key).to_string(),
        ParamValue::Value(Value::Str(text)) if text.contains([',', '(', ')', '"', '\\']) => {
            format!("{text:?}")
        }
        ParamValue::Value(value) => value.to_string(),
    }
}
