// tests/query_options_tests.rs

use std::sync::{Arc, Mutex};

use query_expr::{
    CompileError, Expression, FieldNameValidator, QueryOptionParser, QueryOptions,
    odata::{MemberResolvingEvent, MethodResolvingEvent},
    parse_query_options,
};
use serde_json::{Value as JsonValue, json};

fn filter(text: &str) -> JsonValue {
    QueryOptionParser::new()
        .parse_filter(text)
        .unwrap()
        .serialize()
        .unwrap()
}

fn filter_err(text: &str) -> CompileError {
    QueryOptionParser::new().parse_filter(text).unwrap_err()
}

fn list(items: Vec<Expression>) -> Vec<JsonValue> {
    items.iter().map(|e| e.serialize().unwrap()).collect()
}

// ============================================================================
// $filter
// ============================================================================

#[test]
fn test_simple_comparison() {
    assert_eq!(
        filter("id eq 355"),
        json!({ "$eq": [ { "$name": "id" }, 355 ] })
    );
}

#[test]
fn test_or_matches_parenthesized_form() {
    let plain = filter("category eq 'Laptops' or category eq 'Desktops'");
    let grouped = filter("(category eq 'Laptops') or (category eq 'Desktops')");
    assert_eq!(plain, grouped);
    assert_eq!(
        plain,
        json!({ "$or": [
            { "$eq": [ { "$name": "category" }, "Laptops" ] },
            { "$eq": [ { "$name": "category" }, "Desktops" ] }
        ] })
    );
}

#[test]
fn test_and_chain_is_flat() {
    let expected = json!({ "$and": [
        { "$ge": [ { "$name": "price" }, 400 ] },
        { "$lt": [ { "$name": "price" }, 500 ] },
        { "$eq": [ { "$name": "active" }, true ] }
    ] });
    assert_eq!(filter("price ge 400 and price lt 500 and active eq true"), expected);
    assert_eq!(
        filter("(price ge 400) and ((price lt 500) and (active eq true))"),
        expected
    );
}

#[test]
fn test_grouped_left_chain_is_flat() {
    let chain = filter("a eq 1 and b eq 2 and c eq 3");
    assert_eq!(filter("(a eq 1 and b eq 2) and c eq 3"), chain);
    assert_eq!(filter("a eq 1 and (b eq 2 and c eq 3)"), chain);
    assert_eq!(chain["$and"].as_array().map(Vec::len), Some(3));

    // Different operators stay nested
    assert_eq!(
        filter("(a eq 1 or b eq 2) and c eq 3"),
        json!({ "$and": [
            { "$or": [
                { "$eq": [ { "$name": "a" }, 1 ] },
                { "$eq": [ { "$name": "b" }, 2 ] }
            ] },
            { "$eq": [ { "$name": "c" }, 3 ] }
        ] })
    );
}

#[test]
fn test_logical_chain_threads_right() {
    assert_eq!(
        filter("a eq 1 and b eq 2 or c eq 3"),
        json!({ "$and": [
            { "$eq": [ { "$name": "a" }, 1 ] },
            { "$or": [
                { "$eq": [ { "$name": "b" }, 2 ] },
                { "$eq": [ { "$name": "c" }, 3 ] }
            ] }
        ] })
    );
}

#[test]
fn test_arithmetic_operand() {
    assert_eq!(
        filter("price mul 2 gt 100"),
        json!({ "$gt": [ { "$multiply": [ { "$name": "price" }, 2 ] }, 100 ] })
    );
    assert_eq!(
        filter("qty sub 1 le stock div 2"),
        json!({ "$le": [
            { "$subtract": [ { "$name": "qty" }, 1 ] },
            { "$divide": [ { "$name": "stock" }, 2 ] }
        ] })
    );
}

#[test]
fn test_bare_member_is_filter() {
    assert_eq!(filter("active"), json!({ "$name": "active" }));
}

#[test]
fn test_member_path() {
    assert_eq!(
        filter("category/name eq 'Laptops'"),
        json!({ "$eq": [ { "$name": "category.name" }, "Laptops" ] })
    );
    assert_eq!(
        filter("$it/price gt 5"),
        json!({ "$gt": [ { "$name": "price" }, 5 ] })
    );
}

#[test]
fn test_literals() {
    assert_eq!(
        filter("name eq 'O''Brien'"),
        json!({ "$eq": [ { "$name": "name" }, "O'Brien" ] })
    );
    assert_eq!(
        filter("balance gt -10.5"),
        json!({ "$gt": [ { "$name": "balance" }, -10.5 ] })
    );
    assert_eq!(
        filter("deleted eq null"),
        json!({ "$eq": [ { "$name": "deleted" }, null ] })
    );
}

#[test]
fn test_functions() {
    assert_eq!(
        filter("year(dateCreated) eq 2019"),
        json!({ "$eq": [ { "$year": { "$name": "dateCreated" } }, 2019 ] })
    );
    assert_eq!(
        filter("startswith(name, 'A')"),
        json!({ "$startsWith": [ { "$name": "name" }, "A" ] })
    );
    assert_eq!(
        filter("tolower(name) eq 'abc'"),
        json!({ "$eq": [ { "$toLower": { "$name": "name" } }, "abc" ] })
    );
    assert_eq!(
        filter("round(price) gt 10"),
        json!({ "$gt": [ { "$round": [ { "$name": "price" } ] }, 10 ] })
    );
}

#[test]
fn test_unknown_function_is_generic() {
    assert_eq!(
        filter("soundex(name) eq 'A500'"),
        json!({ "$eq": [ { "$soundex": [ { "$name": "name" } ] }, "A500" ] })
    );
}

#[test]
fn test_case_expression() {
    assert_eq!(
        filter("case(price gt 1000 : 'high', price gt 100 : 'mid', true : 'low') eq 'mid'"),
        json!({ "$eq": [
            { "$switch": {
                "branches": [
                    { "case": { "$gt": [ { "$name": "price" }, 1000 ] }, "then": "high" },
                    { "case": { "$gt": [ { "$name": "price" }, 100 ] }, "then": "mid" }
                ],
                "default": "low"
            } },
            "mid"
        ] })
    );
}

#[test]
fn test_case_without_default() {
    assert_eq!(
        filter("case(active eq true : 1) eq 1"),
        json!({ "$eq": [
            { "$switch": { "branches": [
                { "case": { "$eq": [ { "$name": "active" }, true ] }, "then": 1 }
            ] } },
            1
        ] })
    );
}

#[test]
fn test_case_requires_colon() {
    assert!(matches!(
        filter_err("case(price gt 1000, 'high')"),
        CompileError::ExpectedSyntax { .. }
    ));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_operator() {
    assert!(matches!(
        filter_err("price foo 1"),
        CompileError::UnexpectedToken { position: 6, .. }
    ));
}

#[test]
fn test_unmatched_parenthesis() {
    assert!(matches!(
        filter_err("(price gt 1"),
        CompileError::ExpectedSyntax { .. }
    ));
    assert!(matches!(
        filter_err("price gt 1)"),
        CompileError::UnexpectedToken { .. }
    ));
}

#[test]
fn test_unary_negative_fails_fast() {
    assert!(matches!(
        filter_err("-price gt 1"),
        CompileError::UnexpectedToken { position: 0, .. }
    ));
}

#[test]
fn test_empty_filter() {
    assert!(matches!(filter_err(""), CompileError::UnexpectedToken { .. }));
}

#[test]
fn test_invalid_member_name() {
    let parser = QueryOptionParser::new().on_member_resolving(|event| {
        event.member = format!("{} 1", event.member);
    });
    assert_eq!(
        parser.parse_filter("field eq 1"),
        Err(CompileError::InvalidFieldName("field 1".into()))
    );
}

// ============================================================================
// $select / $groupby / $orderby
// ============================================================================

#[test]
fn test_order_by() {
    let parser = QueryOptionParser::new();
    assert_eq!(
        list(parser.parse_order_by("price asc, category desc").unwrap()),
        vec![
            json!({ "$asc": { "$name": "price" } }),
            json!({ "$desc": { "$name": "category" } }),
        ]
    );
    assert_eq!(
        list(parser.parse_order_by("name DESC, id").unwrap()),
        vec![
            json!({ "$desc": { "$name": "name" } }),
            json!({ "$asc": { "$name": "id" } }),
        ]
    );
}

#[test]
fn test_select_with_aliases() {
    let parser = QueryOptionParser::new();
    assert_eq!(
        list(parser.parse_select("id, familyName as lastName, year(dateCreated) AS year").unwrap()),
        vec![
            json!({ "$name": "id" }),
            json!({ "lastName": { "$name": "familyName" } }),
            json!({ "year": { "$year": { "$name": "dateCreated" } } }),
        ]
    );
}

#[test]
fn test_select_alias_is_validated() {
    let parser = QueryOptionParser::new().with_validator(FieldNameValidator::with_class("a-z").unwrap());
    assert!(matches!(
        parser.parse_select("id as Total"),
        Err(CompileError::InvalidFieldName(_))
    ));
    assert!(matches!(
        QueryOptionParser::new().parse_select("id as"),
        Err(CompileError::ExpectedSyntax { .. })
    ));
}

#[test]
fn test_group_by() {
    let parser = QueryOptionParser::new();
    assert_eq!(
        list(parser.parse_group_by("category, count(id) as total").unwrap()),
        vec![
            json!({ "$name": "category" }),
            json!({ "total": { "$count": { "$name": "id" } } }),
        ]
    );
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
fn test_member_hook_fires_in_parse_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let parser = QueryOptionParser::new().on_member_resolving(move |event: &mut MemberResolvingEvent| {
        log.lock().unwrap().push(event.member.clone());
    });
    parser.parse_filter("b eq 1 and a eq c").unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["b", "a", "c"]);
}

#[test]
fn test_method_hook_replaces_result() {
    let parser = QueryOptionParser::new().on_method_resolving(|event: &mut MethodResolvingEvent| {
        if event.method == "now" {
            event.result = Some(Expression::literal("2020-01-01"));
        }
    });
    assert_eq!(
        parser.parse_filter("dateCreated lt now()").unwrap().serialize().unwrap(),
        json!({ "$lt": [ { "$name": "dateCreated" }, "2020-01-01" ] })
    );
}

// ============================================================================
// parseQueryOptions
// ============================================================================

#[test]
fn test_only_present_options() {
    let options = QueryOptions {
        filter: Some("price gt 10".into()),
        order_by: Some("price desc".into()),
        top: Some(25),
        ..Default::default()
    };
    assert_eq!(
        parse_query_options(&options).unwrap().serialize().unwrap(),
        json!({
            "$where": { "$gt": [ { "$name": "price" }, 10 ] },
            "$orderBy": [ { "$desc": { "$name": "price" } } ],
            "$take": 25
        })
    );
}

#[test]
fn test_empty_option_set() {
    let query = parse_query_options(&QueryOptions::default()).unwrap();
    assert_eq!(query.serialize().unwrap(), json!({}));
}

#[test]
fn test_deserialized_options() {
    let options: QueryOptions = serde_json::from_value(json!({
        "$select": "id, name",
        "$groupBy": "category",
        "$skip": "10",
        "$top": 5
    }))
    .unwrap();
    assert_eq!(
        serde_json::to_value(parse_query_options(&options).unwrap()).unwrap(),
        json!({
            "$select": [ { "$name": "id" }, { "$name": "name" } ],
            "$groupBy": [ { "$name": "category" } ],
            "$take": 5,
            "$skip": 10
        })
    );
}

#[test]
fn test_invalid_count() {
    let result: Result<QueryOptions, _> = serde_json::from_value(json!({ "$top": "ten" }));
    assert!(result.is_err());
    assert!(matches!(
        QueryOptions::from_pairs([("$top", "ten")]),
        Err(CompileError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_expand() {
    let options = QueryOptions::from_pairs([(
        "$expand",
        "orders($select=id,total;$filter=total gt 100;$orderby=total desc;$top=5),customer",
    )])
    .unwrap();
    assert_eq!(
        parse_query_options(&options).unwrap().serialize().unwrap(),
        json!({
            "$expand": [
                {
                    "name": "orders",
                    "options": {
                        "$where": { "$gt": [ { "$name": "total" }, 100 ] },
                        "$select": [ { "$name": "id" }, { "$name": "total" } ],
                        "$orderBy": [ { "$desc": { "$name": "total" } } ],
                        "$take": 5
                    }
                },
                { "name": "customer" }
            ]
        })
    );
}

#[test]
fn test_expand_hook_target() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let parser = QueryOptionParser::new().on_member_resolving(move |event| {
        log.lock()
            .unwrap()
            .push((event.target.clone(), event.member.clone()));
    });
    let options = QueryOptions::from_pairs([
        ("$select", "id"),
        ("$expand", "orders($select=total)"),
    ])
    .unwrap();
    parser.parse_query_options(&options).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (None, "id".to_string()),
            (Some("orders".to_string()), "total".to_string()),
        ]
    );
}

#[test]
fn test_expand_errors() {
    let parser = QueryOptionParser::new();
    assert!(parser.parse_expand("orders($top=1").is_err());
    assert!(matches!(
        parser.parse_expand("orders($top)"),
        Err(CompileError::ExpectedSyntax { .. })
    ));
    assert!(matches!(
        parser.parse_expand("bad name"),
        Err(CompileError::InvalidFieldName(_))
    ));
}

#[test]
fn test_fresh_parsers_agree() {
    let options = QueryOptions::from_pairs([
        ("$filter", "price ge 400 and (category eq 'Laptops' or category eq 'Desktops')"),
        ("$select", "id, name as title"),
        ("$orderby", "price desc"),
    ])
    .unwrap();
    let first = serde_json::to_string(&parse_query_options(&options).unwrap()).unwrap();
    let second = serde_json::to_string(&parse_query_options(&options).unwrap()).unwrap();
    assert_eq!(first, second);
}
