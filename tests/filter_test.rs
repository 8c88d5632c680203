use catalog_worker::Error;
use catalog_worker::filter::Filter;
use catalog_worker::model::ApplyFilter;
use serde_json::{Value, json};

fn field_map(value: Value) -> ApplyFilter {
    ApplyFilter::FieldMap(value.as_object().unwrap().clone())
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[test]
fn expression_filter_replaces_results_only() {
    let filter = Filter::parse(&ApplyFilter::Expression(
        "results[].{id:id, url:url}".to_string(),
    ))
    .unwrap();

    let body = json!({
        "count": 2,
        "next": "/page/2",
        "results": [
            {"id": 1, "url": "url1", "name": "jt1"},
            {"id": 2, "url": "url2", "name": "jt2"}
        ]
    });
    let filtered = filter.apply(body).unwrap();

    assert_eq!(
        filtered,
        json!({
            "count": 2,
            "next": "/page/2",
            "results": [{"id": 1, "url": "url1"}, {"id": 2, "url": "url2"}]
        })
    );
}

#[test]
fn field_map_filter_becomes_whole_body() {
    let filter = Filter::parse(&field_map(json!({"job_id": "id", "state": "status"}))).unwrap();

    let filtered = filter
        .apply(json!({"id": 15, "status": "successful", "elapsed": 3.2}))
        .unwrap();
    assert_eq!(filtered, json!({"job_id": 15, "state": "successful"}));
}

#[test]
fn field_map_ignores_non_string_values() {
    let filter = Filter::parse(&field_map(json!({"id": "id", "n": 3, "flag": true}))).unwrap();
    let filtered = filter.apply(json!({"id": 4, "n": 9})).unwrap();
    assert_eq!(filtered, json!({"id": 4}));
}

#[test]
fn field_map_output_keys_may_need_quoting() {
    let filter = Filter::parse(&field_map(json!({"catalog id": "id"}))).unwrap();
    let filtered = filter.apply(json!({"id": 4})).unwrap();
    assert_eq!(filtered, json!({"catalog id": 4}));
}

#[test]
fn field_map_without_strings_is_rejected() {
    let result = Filter::parse(&field_map(json!({"id": 1})));
    assert!(matches!(result, Err(Error::Filter(_))));
}

#[test]
fn bad_expression_is_rejected_at_parse() {
    let result = Filter::parse(&ApplyFilter::Expression("results[".to_string()));
    assert!(matches!(result, Err(Error::Filter(_))));
}

#[test]
fn replacing_results_needs_an_object_body() {
    let filter = Filter::new("[].id", true);
    let result = filter.apply(json!([{"id": 1}]));
    assert!(matches!(result, Err(Error::Filter(_))));
}

#[test]
fn whole_body_filter_needs_an_object_result() {
    let filter = Filter::new("id", false);
    let result = filter.apply(json!({"id": 1}));
    assert!(matches!(result, Err(Error::Filter(_))));
}

#[test]
fn filtered_numbers_keep_full_precision() {
    let body = parse(
        r#"{"count": 1, "results": [{"id": 123456789012345678901234567890, "cost": 0.30000000000000000001, "name": "jt1"}]}"#,
    );

    let filter = Filter::parse(&ApplyFilter::Expression("results[].{id:id, cost:cost}".to_string())).unwrap();
    let filtered = filter.apply(body.clone()).unwrap();
    assert_eq!(
        filtered["results"],
        parse(r#"[{"cost": 0.30000000000000000001, "id": 123456789012345678901234567890}]"#)
    );

    let filter = Filter::parse(&field_map(json!({"total": "count", "first": "results[0].id"}))).unwrap();
    let filtered = filter.apply(body).unwrap();
    assert_eq!(
        filtered,
        parse(r#"{"first": 123456789012345678901234567890, "total": 1}"#)
    );
    assert!(serde_json::to_string(&filtered).unwrap().contains("123456789012345678901234567890"));
}
