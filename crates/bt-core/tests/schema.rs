use std::sync::Arc;

use bt_core::{
    ActionLogic, Blackboard, CallExpr, CoreError, EntityCategory, ParamKind, ParamValue,
    PredicateArg, PredicateTemplate, SchemaRegistry, SymbolTable, Value, ValueKind,
};

fn succeed() -> ActionLogic {
    Arc::new(|_, _| Ok(true))
}

fn registry() -> (SchemaRegistry, Blackboard) {
    let symbols = SymbolTable::shared();
    let mut registry = SchemaRegistry::new(symbols.clone());
    registry
        .register_entity_type("Robot", EntityCategory::Agent, vec![("battery".into(), ValueKind::Double)])
        .unwrap();
    registry
        .register_entity_type("Box", EntityCategory::Element, Vec::new())
        .unwrap();
    registry
        .register_predicate_type(
            "holding",
            &[
                ("agent", ParamKind::Entity(EntityCategory::Agent)),
                ("myObject", ParamKind::Entity(EntityCategory::Element)),
            ],
        )
        .unwrap();
    registry
        .register_predicate_type("charge", &[("level", ParamKind::Value(ValueKind::Double))])
        .unwrap();
    (registry, Blackboard::new(symbols))
}

#[test]
fn entity_types_are_case_insensitive() {
    let (registry, _) = registry();

    let entity = registry.create_entity("robot", "r1").unwrap();

    assert_eq!(&*registry.symbols().resolve(entity.type_name), "Robot");
    assert_eq!(entity.category, EntityCategory::Agent);
    assert_eq!(entity.property("battery"), Some(&Value::Double(0.0)));
    assert!(matches!(
        registry.create_entity("Drone", "d1"),
        Err(CoreError::InvalidArgument(_))
    ));
}

#[test]
fn predicates_bind_entities_in_declaration_order() {
    let (registry, mut bb) = registry();
    let r1 = registry.create_entity("Robot", "r1").unwrap();
    let box1 = registry.create_entity("Box", "box1").unwrap();
    bb.set_entity(r1.name, r1);
    bb.set_entity(box1.name, box1);

    let predicate = registry
        .create_predicate(
            "holding",
            &[
                ("myObject", PredicateArg::Literal(Value::from("box1"))),
                ("agent", PredicateArg::Entity(bb.intern("r1"))),
            ],
            false,
            &bb,
        )
        .unwrap();

    assert_eq!(predicate.signature(bb.symbols()), "holding(r1,box1)");
    assert!(matches!(predicate.params()[0].1, ParamValue::Entity(_)));
}

#[test]
fn predicate_arity_and_entities_are_checked() {
    let (registry, bb) = registry();

    let missing = registry.create_predicate(
        "holding",
        &[("agent", PredicateArg::Literal(Value::from("r1")))],
        false,
        &bb,
    );
    assert!(matches!(missing, Err(CoreError::InvalidArgument(_))));

    let unknown_param = registry.create_predicate(
        "charge",
        &[("voltage", PredicateArg::Literal(Value::Double(1.0)))],
        false,
        &bb,
    );
    assert!(matches!(unknown_param, Err(CoreError::InvalidArgument(_))));

    let absent_entity = registry.create_predicate(
        "holding",
        &[
            ("agent", PredicateArg::Literal(Value::from("ghost"))),
            ("myObject", PredicateArg::Literal(Value::from("box9"))),
        ],
        false,
        &bb,
    );
    assert!(matches!(absent_entity, Err(CoreError::NotFound { .. })));
}

#[test]
fn integer_literals_widen_for_double_parameters() {
    let (registry, bb) = registry();

    let predicate = registry
        .create_predicate("charge", &[("level", PredicateArg::Literal(Value::Int(3)))], true, &bb)
        .unwrap();

    assert!(predicate.is_negated());
    assert_eq!(predicate.signature(bb.symbols()), "charge(3)");
    assert_eq!(
        predicate.params()[0].1,
        ParamValue::Value(Value::Double(3.0))
    );
}

#[test]
fn action_parameters_must_be_entities() {
    let (mut registry, _) = registry();

    let err = registry
        .register_action_type(
            "Wait",
            &[("seconds", ParamKind::Value(ValueKind::Double))],
            Vec::new(),
            Vec::new(),
            succeed(),
        )
        .unwrap_err();

    assert!(matches!(err, CoreError::InvalidArgument(_)));
}

#[test]
fn action_templates_are_checked_at_registration() {
    let (mut registry, _) = registry();
    let params = [
        ("client", ParamKind::Entity(EntityCategory::Agent)),
        ("obj", ParamKind::Entity(EntityCategory::Element)),
    ];
    let mut register = |effect: &str| {
        registry.register_action_type(
            "PickUp",
            &params,
            Vec::new(),
            vec![PredicateTemplate::parse(effect).unwrap()],
            succeed(),
        )
    };

    assert!(register("holding(agent = client, myObject = obj)").is_ok());
    assert!(register("charge(level = 0.5)").is_ok());

    for bad in [
        "carrying(agent = client, myObject = obj)",
        "holding(agent = client, myObject = obj, speed = 3)",
        "holding(agent = client)",
        "holding(agent = client, myObject = crate7)",
        "holding(agent = obj, myObject = client)",
        "holding(agent = client, agent = client)",
    ] {
        assert!(
            matches!(register(bad), Err(CoreError::InvalidArgument(_))),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn publish_writes_type_lists() {
    let (mut registry, mut bb) = registry();
    registry
        .register_action_type(
            "PickUp",
            &[("client", ParamKind::Entity(EntityCategory::Agent))],
            Vec::new(),
            Vec::new(),
            succeed(),
        )
        .unwrap();

    registry.publish(&mut bb);

    assert_eq!(bb.entity_types(EntityCategory::Agent).count(), 1);
    assert_eq!(bb.predicate_types().count(), 2);
    assert_eq!(bb.action_types().collect::<Vec<_>>(), vec![bb.intern("PickUp")]);
}

#[test]
fn templates_parse_negation_and_prefix() {
    let template = PredicateTemplate::parse(
        "PredicateInstance: holding(agent = client, myObject = obj, isNegated = true)",
    )
    .unwrap();

    assert_eq!(template.predicate, "holding");
    assert!(template.negated);
    assert_eq!(
        template.args,
        vec![
            ("agent".to_string(), "client".to_string()),
            ("myObject".to_string(), "obj".to_string()),
        ]
    );
    assert!(PredicateTemplate::parse("holding(agent = a, isNegated = maybe)").is_err());
}

#[test]
fn call_expressions_keep_quoted_commas() {
    let call = CallExpr::parse(r#"say(text = "hi, there", times = 2)"#, '=').unwrap();

    assert_eq!(call.arg("text"), Some(r#""hi, there""#));
    assert_eq!(call.arg("times"), Some("2"));
    assert!(CallExpr::parse("broken(a = 1", '=').is_err());
    assert!(CallExpr::parse("noargs()", '=').unwrap().args.is_empty());
}

#[test]
fn literals_convert_in_order() {
    assert_eq!(Value::parse_literal("true"), Value::Bool(true));
    assert_eq!(Value::parse_literal("42"), Value::Int(42));
    assert_eq!(Value::parse_literal("4.5"), Value::Double(4.5));
    assert_eq!(Value::parse_literal("\"quoted\""), Value::from("quoted"));
    assert_eq!(Value::parse_literal("bare"), Value::from("bare"));
}
