//! Turns a [`Scenario`] into a registry, a populated blackboard and a ready tree.

use std::sync::Arc;

use anyhow::{Context, Result};
use bt_core::{
    ActionLogic, Bindings, Blackboard, ParamKind, PredicateTemplate, SchemaRegistry, SymbolTable,
    ValueKind,
};
use bt_runtime::{trace, BehaviorTree, FlowNode, Loaded, Loader, Plan};

use crate::config::{FieldDecl, LogicKind, Scenario};
use crate::sink::JsonlSink;

/// Registers every type declared in the scenario's domain section.
pub fn build_registry(scenario: &Scenario, symbols: Arc<SymbolTable>) -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new(symbols.clone());

    for entity in &scenario.domain.entities {
        let properties = entity
            .properties
            .iter()
            .map(|field| {
                let kind = field
                    .kind
                    .parse::<ValueKind>()
                    .with_context(|| format!("property '{}' of entity '{}'", field.name, entity.name))?;
                Ok((field.name.clone(), kind))
            })
            .collect::<Result<Vec<_>>>()?;
        registry
            .register_entity_type(&entity.name, entity.category, properties)
            .with_context(|| format!("entity type '{}'", entity.name))?;
    }

    for predicate in &scenario.domain.predicates {
        let params = param_kinds(&predicate.params)
            .with_context(|| format!("predicate type '{}'", predicate.name))?;
        registry
            .register_predicate_type(&predicate.name, &borrowed(&params))
            .with_context(|| format!("predicate type '{}'", predicate.name))?;
    }

    for action in &scenario.domain.actions {
        let context = || format!("action type '{}'", action.name);
        let params = param_kinds(&action.params).with_context(context)?;
        let preconditions = templates(&action.preconditions).with_context(context)?;
        let effects = templates(&action.effects).with_context(context)?;
        registry
            .register_action_type(
                &action.name,
                &borrowed(&params),
                preconditions,
                effects,
                logic_for(&action.name, action.logic, symbols.clone()),
            )
            .with_context(context)?;
    }

    Ok(registry)
}

fn param_kinds(fields: &[FieldDecl]) -> Result<Vec<(String, ParamKind)>> {
    fields
        .iter()
        .map(|field| {
            let kind = field
                .kind
                .parse::<ParamKind>()
                .with_context(|| format!("parameter '{}'", field.name))?;
            Ok((field.name.clone(), kind))
        })
        .collect()
}

fn borrowed(params: &[(String, ParamKind)]) -> Vec<(&str, ParamKind)> {
    params.iter().map(|(name, kind)| (name.as_str(), *kind)).collect()
}

fn templates(lines: &[String]) -> Result<Vec<PredicateTemplate>> {
    lines
        .iter()
        .map(|line| PredicateTemplate::parse(line).with_context(|| format!("template '{line}'")))
        .collect()
}

fn logic_for(action: &str, kind: LogicKind, symbols: Arc<SymbolTable>) -> ActionLogic {
    match kind {
        LogicKind::Succeed => Arc::new(|_: &Bindings, _: f32| Ok(true)),
        LogicKind::Fail => Arc::new(|_: &Bindings, _: f32| Ok(false)),
        LogicKind::Log => {
            let action = action.to_string();
            Arc::new(move |bindings: &Bindings, dt: f32| {
                let bound = bindings
                    .iter()
                    .map(|(param, entity)| {
                        format!("{}={}", symbols.resolve(param), symbols.resolve(entity.key))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::info!(action = %action, dt, bindings = %bound, "Action executed");
                Ok(true)
            })
        }
    }
}

/// A scenario materialised into a tree, plus what the loader produced.
pub struct Prepared {
    pub tree: BehaviorTree,
    pub entities: usize,
    pub predicates: usize,
    pub actions: usize,
}

/// Builds the registry, loads the instance lines and wires the loaded actions into the root
/// flow node according to the scenario's ordering.
pub fn prepare(scenario: &Scenario, with_trace: bool) -> Result<Prepared> {
    let symbols = SymbolTable::shared();
    let registry = build_registry(scenario, symbols.clone())?;

    let mut blackboard = Blackboard::new(symbols);
    registry.publish(&mut blackboard);
    if with_trace {
        trace::install(&mut blackboard);
    }
    if let Some(path) = &scenario.persist_predicates {
        blackboard.set_predicate_sink(Box::new(JsonlSink::new(path)));
    }

    let Loaded {
        entities,
        predicates,
        actions,
    } = Loader::new(&registry)
        .load_str(&mut blackboard, &scenario.instances)
        .context("Failed to load instances")?;

    let action_count = actions.len();
    let mut flow = FlowNode::new(scenario.flow.success_criteria);
    let orders = vec![scenario.flow.ordering; action_count.saturating_sub(1)];
    flow.load_plan(Plan::new(actions, orders))
        .context("Failed to schedule loaded actions")?;

    Ok(Prepared {
        tree: BehaviorTree::new(scenario.name.clone(), blackboard, flow),
        entities: entities.len(),
        predicates,
        actions: action_count,
    })
}

#[cfg(test)]
mod tests {
    use bt_runtime::{NodeStatus, OrderType, SuccessCriteria};

    use super::*;
    use crate::config::{ActionDecl, EntityDecl, PredicateDecl};

    fn field(name: &str, kind: &str) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }

    fn scenario(logic: LogicKind) -> Scenario {
        let mut scenario = Scenario::default();
        scenario.domain.entities = vec![
            EntityDecl {
                name: "Robot".into(),
                category: bt_core::EntityCategory::Agent,
                properties: vec![field("battery", "double")],
            },
            EntityDecl {
                name: "Box".into(),
                category: bt_core::EntityCategory::Element,
                properties: Vec::new(),
            },
        ];
        scenario.domain.predicates = vec![PredicateDecl {
            name: "holding".into(),
            params: vec![field("agent", "agent"), field("myObject", "element")],
        }];
        scenario.domain.actions = vec![ActionDecl {
            name: "PickUp".into(),
            params: vec![field("client", "agent"), field("obj", "element")],
            preconditions: Vec::new(),
            effects: vec!["holding(agent = client, myObject = obj)".into()],
            logic,
        }];
        scenario.instances = "\
ParameterInstance: Robot {r1}
ParameterInstance: Box {box1}
ParameterInstance: Box {box2}
ActionInstance: PickUp(client : r1, obj : box1)
ActionInstance: PickUp(client : r1, obj : box2)
"
        .to_string();
        scenario
    }

    #[test]
    fn total_ordering_runs_one_action_per_tick() {
        let mut scenario = scenario(LogicKind::Log);
        scenario.flow.ordering = OrderType::Total;

        let mut prepared = prepare(&scenario, true).unwrap();

        assert_eq!((prepared.entities, prepared.actions), (3, 2));
        assert_eq!(prepared.predicates, 0);
        assert_eq!(prepared.tree.run(0.1, 10), NodeStatus::Succeeded);
        assert_eq!(prepared.tree.tick_count(), 2);
        let log = trace::take(prepared.tree.blackboard_mut());
        assert_eq!(log.subjects("graph.complete"), vec!["PickUp_r1_box1", "PickUp_r1_box2"]);
    }

    #[test]
    fn failing_logic_respects_criteria() {
        let mut scenario = scenario(LogicKind::Fail);
        assert_eq!(prepare(&scenario, false).unwrap().tree.run(0.1, 10), NodeStatus::Failed);

        scenario.flow.success_criteria = SuccessCriteria::Percentage(0.0);
        assert_eq!(prepare(&scenario, false).unwrap().tree.run(0.1, 10), NodeStatus::Succeeded);
    }

    #[test]
    fn persisted_predicates_land_in_the_jsonl_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predicates.jsonl");
        let mut scenario = scenario(LogicKind::Succeed);
        scenario.persist_predicates = Some(path.clone());

        prepare(&scenario, false).unwrap();

        let persisted = JsonlSink::new(&path).read_recent(10);
        let signatures = persisted
            .iter()
            .map(|p| p.record.signature.as_str())
            .collect::<Vec<_>>();
        assert_eq!(signatures, vec!["holding(r1,box1)", "holding(r1,box2)"]);
    }

    #[test]
    fn unknown_param_kind_names_the_type() {
        let mut scenario = scenario(LogicKind::Succeed);
        scenario.domain.predicates[0].params[0].kind = "spaceship".into();

        let err = build_registry(&scenario, SymbolTable::shared()).err().unwrap();

        assert!(format!("{err:#}").contains("predicate type 'holding'"));
    }
}
