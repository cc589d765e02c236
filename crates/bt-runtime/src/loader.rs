use bt_core::{Blackboard, CoreError, PredicateArg, SchemaRegistry, Symbol, Value};

use crate::error::LoadError;
use crate::factory::ActionFactory;
use crate::instance::{self, InstanceLine, ParsedLine};
use crate::node::Node;

/// What applying a set of instance lines produced.
#[derive(Debug, Default)]
pub struct Loaded {
    pub entities: Vec<Symbol>,
    /// Predicates accepted by the blackboard; duplicates are not counted.
    pub predicates: usize,
    pub actions: Vec<Node>,
}

/// Materialises instance definitions against a blackboard.
pub struct Loader<'a> {
    registry: &'a SchemaRegistry,
    factory: ActionFactory,
}

impl<'a> Loader<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            factory: ActionFactory::default(),
        }
    }

    pub fn with_factory(mut self, factory: ActionFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn load_str(&self, blackboard: &mut Blackboard, text: &str) -> Result<Loaded, LoadError> {
        let lines = instance::parse_document(text)?;
        self.apply(blackboard, &lines)
    }

    /// Applies lines in order: entities first become available to later predicate and action
    /// lines.
    pub fn apply(&self, blackboard: &mut Blackboard, lines: &[ParsedLine]) -> Result<Loaded, LoadError> {
        let mut loaded = Loaded::default();
        for parsed in lines {
            let at = |source: CoreError| LoadError::Apply {
                line: parsed.line,
                source,
            };
            match &parsed.instance {
                InstanceLine::Parameter { type_name, name } => {
                    let entity = self.registry.create_entity(type_name, name).map_err(at)?;
                    let key = entity.name;
                    blackboard.set_entity(key, entity);
                    loaded.entities.push(key);
                }
                InstanceLine::Predicate(template) => {
                    let args = template
                        .args
                        .iter()
                        .map(|(param, value)| {
                            (param.as_str(), PredicateArg::Literal(Value::parse_literal(value)))
                        })
                        .collect::<Vec<_>>();
                    let predicate = self
                        .registry
                        .create_predicate(&template.predicate, &args, template.negated, blackboard)
                        .map_err(at)?;
                    let key = blackboard.intern(&predicate.signature(blackboard.symbols()));
                    if blackboard.set_predicate(key, predicate) {
                        loaded.predicates += 1;
                    }
                }
                InstanceLine::Action { action_type, args } => {
                    let args = args
                        .iter()
                        .map(|(p, v)| (p.as_str(), v.as_str()))
                        .collect::<Vec<_>>();
                    let node = self
                        .factory
                        .create(self.registry, blackboard, action_type, &args)
                        .map_err(at)?;
                    loaded.actions.push(node);
                }
            }
        }

        tracing::info!(
            entities = loaded.entities.len(),
            predicates = loaded.predicates,
            actions = loaded.actions.len(),
            "Applied instance definitions"
        );
        Ok(loaded)
    }
}
