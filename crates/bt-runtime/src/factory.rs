use bt_core::{
    ActionInstanceRecord, Bindings, Blackboard, CoreError, PredicateArg, PredicateTemplate, Result,
    SchemaRegistry, State, StateKind, Symbol, Value,
};

use crate::action::ActionNode;
use crate::node::Node;

/// Instantiates action nodes from registered action types.
#[derive(Debug, Clone, Copy)]
pub struct ActionFactory {
    store_predicates: bool,
}

impl Default for ActionFactory {
    fn default() -> Self {
        Self {
            store_predicates: true,
        }
    }
}

impl ActionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether precondition and effect predicates are asserted on the blackboard when an
    /// action is created. On by default.
    pub fn store_predicates(mut self, store: bool) -> Self {
        self.store_predicates = store;
        self
    }

    /// Binds `args` (parameter name, entity instance name) to blackboard entities and builds
    /// the action node. The node and its blackboard record are keyed `type_inst1_inst2...`.
    pub fn create(
        &self,
        registry: &SchemaRegistry,
        blackboard: &mut Blackboard,
        action_type: &str,
        args: &[(&str, &str)],
    ) -> Result<Node> {
        let schema = registry.action_type(action_type)?;
        let symbols = registry.symbols().clone();
        let type_name = symbols.resolve(schema.name);

        for (param, _) in args {
            let declared = symbols
                .lookup(param.trim())
                .is_some_and(|sym| schema.params.iter().any(|p| p.name == sym));
            if !declared {
                return Err(CoreError::invalid(format!(
                    "action '{type_name}' has no parameter '{param}'"
                )));
            }
        }
        if args.len() != schema.params.len() {
            return Err(CoreError::invalid(format!(
                "action '{type_name}' expects {} arguments, got {}",
                schema.params.len(),
                args.len()
            )));
        }

        let mut bindings = Bindings::new();
        let mut instance_names = Vec::with_capacity(schema.params.len());
        for spec in &schema.params {
            let param = symbols.resolve(spec.name);
            let Some((_, value)) = args.iter().find(|(p, _)| p.trim() == &*param) else {
                return Err(CoreError::invalid(format!(
                    "action '{type_name}' is missing '{param}'"
                )));
            };
            let bt_core::ParamKind::Entity(category) = spec.kind else {
                return Err(CoreError::invalid(format!(
                    "unsupported parameter type for '{param}' of action '{type_name}'"
                )));
            };
            let value = value.trim();
            let key = symbols
                .lookup(value)
                .ok_or_else(|| CoreError::not_found(category.as_str(), value))?;
            let entity = blackboard.get_entity(category, key)?;
            bindings.insert(spec.name, entity.reference());
            instance_names.push(value);
        }

        let key = std::iter::once(&*type_name)
            .chain(instance_names.iter().copied())
            .collect::<Vec<_>>()
            .join("_");
        let instance = symbols.intern(&key);

        let preconditions = self.build_state(
            registry,
            blackboard,
            StateKind::Precondition,
            symbols.intern(&format!("{key}.pre")),
            &schema.preconditions,
            &bindings,
        )?;
        let effects = self.build_state(
            registry,
            blackboard,
            StateKind::Effect,
            symbols.intern(&format!("{key}.eff")),
            &schema.effects,
            &bindings,
        )?;

        if self.store_predicates {
            for (fact_key, predicate) in preconditions.iter().chain(effects.iter()) {
                blackboard.set_predicate(fact_key, predicate.clone());
            }
        }

        blackboard.register_action_instance(
            instance,
            ActionInstanceRecord {
                action_type: schema.name,
                params: bindings.iter().collect(),
            },
        );
        tracing::debug!(action = %key, "Created action instance");

        let action = ActionNode::new(
            schema.name,
            instance,
            bindings,
            preconditions,
            effects,
            schema.logic.clone(),
        );
        Ok(Node::action(key, action))
    }

    fn build_state(
        &self,
        registry: &SchemaRegistry,
        blackboard: &Blackboard,
        kind: StateKind,
        name: Symbol,
        templates: &[PredicateTemplate],
        bindings: &Bindings,
    ) -> Result<State> {
        let symbols = registry.symbols();
        let mut state = State::new(kind, name);
        for template in templates {
            let args = template
                .args
                .iter()
                .map(|(param, value)| {
                    let bound = symbols
                        .lookup(value.trim())
                        .and_then(|sym| bindings.get(sym));
                    let arg = match bound {
                        Some(entity) => PredicateArg::Entity(entity.key),
                        None => PredicateArg::Literal(Value::parse_literal(value)),
                    };
                    (param.as_str(), arg)
                })
                .collect::<Vec<_>>();
            let predicate =
                registry.create_predicate(&template.predicate, &args, template.negated, blackboard)?;
            let key = symbols.intern(&predicate.signature(symbols));
            state.add(key, predicate, symbols)?;
        }
        Ok(state)
    }
}
