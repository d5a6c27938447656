use rowfold::error::RowfoldError;
use rowfold::template::{TemplateKind, TemplateValue};
use rowfold::value::Value;

#[test]
fn registry_lookup() {
    assert_eq!(TemplateKind::lookup("in"), Some(TemplateKind::In));
    assert_eq!(TemplateKind::lookup("not_in"), Some(TemplateKind::NotIn));
    assert_eq!(TemplateKind::lookup("values"), Some(TemplateKind::Values));
    assert_eq!(TemplateKind::lookup("drop"), None);
}

#[test]
fn empty_in_list_matches_nothing() {
    let (fragment, bindings) = TemplateKind::In
        .render("name", &TemplateValue::list(Vec::<Value>::new()), "name")
        .expect("render ok");
    assert_eq!(fragment, "1 <> 1");
    assert!(bindings.is_empty());
}

#[test]
fn empty_not_in_list_excludes_nothing() {
    let (fragment, bindings) = TemplateKind::NotIn
        .render("name", &TemplateValue::list(Vec::<Value>::new()), "name")
        .expect("render ok");
    assert_eq!(fragment, "1 = 1");
    assert!(bindings.is_empty());
}

#[test]
fn empty_values_payload_fails() {
    let err = TemplateKind::Values
        .render("tag", &TemplateValue::rows(Vec::<Vec<Value>>::new()), "tag")
        .unwrap_err();
    assert!(matches!(err, RowfoldError::EmptyValues(_)));
    assert!(format!("{}", err).contains("Must have values for tag template"));
}

#[test]
fn in_list_parameterizes_each_element() {
    let (fragment, bindings) = TemplateKind::In
        .render("name", &TemplateValue::list(["bob", "tom", "chic"]), "name")
        .expect("render ok");
    assert_eq!(fragment, "name IN ( :name_0, :name_1, :name_2 )");
    assert_eq!(bindings.len(), 3);
    assert_eq!(bindings[0], ("name_0".to_string(), Value::Text("bob".to_string())));
    assert_eq!(bindings[2], ("name_2".to_string(), Value::Text("chic".to_string())));
}

#[test]
fn lone_scalar_normalizes_to_one_element() {
    let (fragment, bindings) = TemplateKind::NotIn
        .render("name", &TemplateValue::single("bob"), "name")
        .expect("render ok");
    assert_eq!(fragment, "name NOT IN ( :name_0 )");
    assert_eq!(bindings, vec![("name_0".to_string(), Value::Text("bob".to_string()))]);
}

#[test]
fn dotted_target_yields_valid_parameter_names() {
    let (fragment, bindings) = TemplateKind::In
        .render("actor.name", &TemplateValue::list(["bob"]), "actor.name")
        .expect("render ok");
    assert_eq!(fragment, "actor.name IN ( :actor_name_0 )");
    assert_eq!(bindings[0].0, "actor_name_0");
}

#[test]
fn in_with_row_tuples_joins_the_groups_bare() {
    let rows = TemplateValue::rows(vec![
        vec![Value::Integer(1), Value::Integer(2)],
        vec![Value::Integer(3), Value::Integer(4)],
    ]);
    let (fragment, bindings) = TemplateKind::In
        .render("x", &rows, "x")
        .expect("render ok");
    // row groups are joined as-is, with no extra enclosing paren
    assert_eq!(fragment, "x IN ( :x_0_0, :x_0_1 ), ( :x_1_0, :x_1_1 )");
    assert_eq!(bindings.len(), 4);
}

#[test]
fn values_rows_expand_as_row_constructors() {
    let rows = TemplateValue::rows(vec![
        vec![Value::Integer(1), Value::Text("red".to_string())],
        vec![Value::Integer(2), Value::Text("blue".to_string())],
    ]);
    let (fragment, bindings) = TemplateKind::Values
        .render("tag", &rows, "tag")
        .expect("render ok");
    assert_eq!(fragment, "VALUES ( :tag_0_0, :tag_0_1 ), ( :tag_1_0, :tag_1_1 )");
    assert_eq!(bindings.len(), 4);
    assert_eq!(bindings[3], ("tag_1_1".to_string(), Value::Text("blue".to_string())));
}

#[test]
fn values_flat_list_groups_every_scalar() {
    let (fragment, bindings) = TemplateKind::Values
        .render("tag", &TemplateValue::list([10i64, 20, 30]), "tag")
        .expect("render ok");
    assert_eq!(fragment, "VALUES ( :tag_0 ), ( :tag_1 ), ( :tag_2 )");
    assert_eq!(bindings.len(), 3);
    assert_eq!(bindings[1], ("tag_1".to_string(), Value::Integer(20)));
}
