use rowfold::error::RowfoldError;
use rowfold::template::{QueryData, TemplateValue, assemble};
use rowfold::value::Value;

#[test]
fn in_template_rewrites_query_and_binds_parameters() {
    let data = QueryData::new("SELECT * FROM t WHERE {in__x}")
        .template_param("in__x", TemplateValue::list([1i64, 2]));
    let (sql, params) = assemble(&data).expect("assemble ok");
    assert_eq!(sql, "SELECT * FROM t WHERE x IN ( :x_0, :x_1 ) ");
    assert_eq!(params.len(), 2);
    assert_eq!(params.get("x_0"), Some(&Value::Integer(1)));
    assert_eq!(params.get("x_1"), Some(&Value::Integer(2)));
}

#[test]
fn surrounding_space_runs_collapse_to_one() {
    let data = QueryData::new("SELECT * FROM t WHERE   {in__x}   AND y = 1")
        .template_param("in__x", TemplateValue::list([1i64]));
    let (sql, _) = assemble(&data).expect("assemble ok");
    assert_eq!(sql, "SELECT * FROM t WHERE x IN ( :x_0 ) AND y = 1");
}

#[test]
fn table_qualified_target_keeps_the_qualifier_in_sql() {
    let data = QueryData::new("SELECT * FROM actor WHERE {not_in__actor.name}")
        .template_param("not_in__actor.name", TemplateValue::list(["bob"]));
    let (sql, params) = assemble(&data).expect("assemble ok");
    assert!(sql.contains("actor.name NOT IN ( :actor_name_0 )"));
    assert_eq!(params.get("actor_name_0"), Some(&Value::Text("bob".to_string())));
}

#[test]
fn missing_key_fails_naming_the_key() {
    let data = QueryData::new("SELECT * FROM t WHERE {in__missing}");
    let err = assemble(&data).unwrap_err();
    match err {
        RowfoldError::MissingTemplateKeys(keys) => assert_eq!(keys, vec!["in__missing"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn validation_collects_every_missing_key() {
    let data = QueryData::new("SELECT * FROM t WHERE {in__a} OR {not_in__b}");
    let err = assemble(&data).unwrap_err();
    match err {
        RowfoldError::MissingTemplateKeys(keys) => {
            assert_eq!(keys, vec!["in__a", "not_in__b"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_values_payload_is_reported_with_missing_keys() {
    let data = QueryData::new("INSERT INTO t (a) {values__t} WHERE {in__gone}")
        .template_param("values__t", TemplateValue::rows(Vec::<Vec<Value>>::new()));
    let err = assemble(&data).unwrap_err();
    match err {
        RowfoldError::MissingTemplateKeys(keys) => {
            assert_eq!(keys, vec!["values__t", "in__gone"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn direct_query_params_take_precedence() {
    let data = QueryData::new("SELECT * FROM t WHERE {in__x}")
        .template_param("in__x", TemplateValue::list([1i64, 2]))
        .query_param("x_0", 99i64)
        .query_param("limit", 10i64);
    let (_, params) = assemble(&data).expect("assemble ok");
    assert_eq!(params.get("x_0"), Some(&Value::Integer(99)));
    assert_eq!(params.get("limit"), Some(&Value::Integer(10)));
}

#[test]
fn repeated_placeholder_renders_once_per_key() {
    let data = QueryData::new("SELECT * FROM t WHERE {in__x} OR {in__x}")
        .template_param("in__x", TemplateValue::list([1i64, 2]));
    let (sql, params) = assemble(&data).expect("assemble ok");
    assert_eq!(sql.matches("x IN ( :x_0, :x_1 )").count(), 2);
    assert_eq!(params.len(), 2);
}

#[test]
fn colliding_seeds_fall_back_to_the_full_key() {
    let data = QueryData::new("SELECT * FROM t WHERE {in__x} AND {not_in__x}")
        .template_param("in__x", TemplateValue::list([1i64, 2]))
        .template_param("not_in__x", TemplateValue::list([3i64]));
    let (sql, params) = assemble(&data).expect("assemble ok");
    assert!(sql.contains("x IN ( :x_0, :x_1 )"));
    assert!(sql.contains("x NOT IN ( :not_in__x_0 )"));
    assert_eq!(params.get("x_0"), Some(&Value::Integer(1)));
    assert_eq!(params.get("not_in__x_0"), Some(&Value::Integer(3)));
}

#[test]
fn unresolvable_collision_fails_loudly() {
    // both targets normalize to the seed a_b, and so do the fallback keys
    let data = QueryData::new("SELECT * FROM t WHERE {in__a.b} AND {in__a_b}")
        .template_param("in__a.b", TemplateValue::list([1i64]))
        .template_param("in__a_b", TemplateValue::list([2i64]));
    let err = assemble(&data).unwrap_err();
    assert!(matches!(err, RowfoldError::ParameterCollision(_)));
}

#[test]
fn tokens_outside_the_grammar_are_opaque() {
    let data = QueryData::new("SELECT '{json}' FROM t WHERE {maybe__x} AND {in__1x}");
    let (sql, params) = assemble(&data).expect("assemble ok");
    assert_eq!(sql, "SELECT '{json}' FROM t WHERE {maybe__x} AND {in__1x}");
    assert!(params.is_empty());
}

#[test]
fn blank_query_is_not_query_data() {
    let err = assemble(&QueryData::new("   ")).unwrap_err();
    assert!(matches!(err, RowfoldError::QueryData(_)));
}
