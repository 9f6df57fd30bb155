// tests/compiler_tests.rs

use query_expr::{
    ClosureCompiler, CompileError, Expression, FieldNameValidator, MethodResolverChain, Params,
    Value, resolver::StringMethodResolver,
};
use serde_json::{Value as JsonValue, json};

fn filter(source: &str) -> JsonValue {
    ClosureCompiler::new()
        .compile_filter(source, None)
        .unwrap()
        .unwrap()
}

fn filter_with(source: &str, params: &Params) -> JsonValue {
    ClosureCompiler::new()
        .compile_filter(source, Some(params))
        .unwrap()
        .unwrap()
}

fn filter_err(source: &str) -> CompileError {
    ClosureCompiler::new()
        .compile_filter(source, None)
        .unwrap_err()
}

fn select(source: &str) -> Vec<JsonValue> {
    ClosureCompiler::new().compile_select(source, None).unwrap()
}

fn contains_arithmetic(expr: &Expression) -> bool {
    match expr {
        Expression::Arithmetic { .. } => true,
        Expression::Comparison { left, right, .. }
        | Expression::AggregateComparison { left, right, .. } => {
            contains_arithmetic(left) || contains_arithmetic(right)
        }
        Expression::Logical { args, .. }
        | Expression::MethodCall { args, .. }
        | Expression::SimpleMethodCall { args, .. }
        | Expression::Sequence(args) => args.iter().any(contains_arithmetic),
        Expression::Object(pairs) => pairs.iter().any(|(_, e)| contains_arithmetic(e)),
        _ => false,
    }
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_equality() {
    assert_eq!(
        filter("x => x.id === 355"),
        json!({ "$eq": [ { "$name": "id" }, 355 ] })
    );
}

#[test]
fn test_range_conjunction() {
    assert_eq!(
        filter("x => x.price >= 400 && x.price < 500"),
        json!({ "$and": [
            { "$ge": [ { "$name": "price" }, 400 ] },
            { "$lt": [ { "$name": "price" }, 500 ] }
        ] })
    );
}

#[test]
fn test_closure_chains_are_not_flattened() {
    assert_eq!(
        filter("x => x.a === 1 || x.b === 2 || x.c === 3"),
        json!({ "$or": [
            { "$or": [
                { "$eq": [ { "$name": "a" }, 1 ] },
                { "$eq": [ { "$name": "b" }, 2 ] }
            ] },
            { "$eq": [ { "$name": "c" }, 3 ] }
        ] })
    );
}

#[test]
fn test_absent_closure() {
    let compiler = ClosureCompiler::new();
    assert_eq!(compiler.compile_filter(None::<&str>, None), Ok(None));
}

#[test]
fn test_block_and_function_bodies() {
    let expected = json!({ "$ne": [ { "$name": "status" }, "archived" ] });
    assert_eq!(filter("x => { return x.status !== 'archived'; }"), expected);
    assert_eq!(filter("function (x) { return x.status != 'archived' }"), expected);
}

#[test]
fn test_nested_member_path_is_pseudo_accessor() {
    assert_eq!(
        filter("x => x.category.name === 'Laptops'"),
        json!({ "$eq": [ { "$name": [ { "$name": "category" } ] }, "Laptops" ] })
    );
}

#[test]
fn test_trailing_property_is_pseudo_call() {
    assert_eq!(
        filter("x => x.name.length > 3"),
        json!({ "$gt": [ { "$length": [ { "$name": "name" } ] }, 3 ] })
    );
}

// ============================================================================
// Constant folding
// ============================================================================

#[test]
fn test_arithmetic_is_folded() {
    let compiler = ClosureCompiler::new();
    let expr = compiler
        .filter_expression("x => x.price > (2 + 3)", None)
        .unwrap();
    assert!(!contains_arithmetic(&expr));
    assert_eq!(
        expr.serialize().unwrap(),
        json!({ "$gt": [ { "$name": "price" }, 5 ] })
    );
}

#[test]
fn test_folding_mixes_numbers_exactly() {
    assert_eq!(
        filter("x => x.price < 1 + 0.2"),
        json!({ "$lt": [ { "$name": "price" }, 1.2 ] })
    );
    assert_eq!(
        filter("x => x.price > 10 / 4"),
        json!({ "$gt": [ { "$name": "price" }, 2.5 ] })
    );
    assert_eq!(
        filter("x => x.qty === 7 % 4"),
        json!({ "$eq": [ { "$name": "qty" }, 3 ] })
    );
}

#[test]
fn test_member_arithmetic_is_kept() {
    assert_eq!(
        filter("x => x.price * 2 > 100"),
        json!({ "$gt": [ { "$multiply": [ { "$name": "price" }, 2 ] }, 100 ] })
    );
}

#[test]
fn test_comparison_never_folds() {
    assert_eq!(filter("x => 1 === 1"), json!({ "$eq": [1, 1] }));
}

#[test]
fn test_negative_literal() {
    assert_eq!(
        filter("x => x.balance > -10"),
        json!({ "$gt": [ { "$name": "balance" }, -10 ] })
    );
}

#[test]
fn test_division_by_zero() {
    assert!(matches!(
        filter_err("x => x.price > 1 / 0"),
        CompileError::ArithmeticError(_)
    ));
}

#[test]
fn test_string_concatenation_folds() {
    assert_eq!(
        filter("x => x.code === 'A' + 1"),
        json!({ "$eq": [ { "$name": "code" }, "A1" ] })
    );
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_named_params() {
    let params = Params::new().bind("minPrice", 400).bind("category", "Laptops");
    assert_eq!(
        filter_with(
            "x => x.price >= minPrice && x.category === category",
            &params
        ),
        json!({ "$and": [
            { "$ge": [ { "$name": "price" }, 400 ] },
            { "$eq": [ { "$name": "category" }, "Laptops" ] }
        ] })
    );
}

#[test]
fn test_positional_params() {
    let params = Params::new().push(400);
    assert_eq!(
        filter_with("(x, minPrice) => x.price >= minPrice", &params),
        json!({ "$ge": [ { "$name": "price" }, 400 ] })
    );
}

#[test]
fn test_params_from_json() {
    let params = Params::from_json(json!({ "filter": { "ids": [1, 2] } })).unwrap();
    assert_eq!(
        filter_with("x => filter.ids.includes(x.id)", &params),
        json!({ "$in": [ { "$name": "id" }, [1, 2] ] })
    );
}

#[test]
fn test_params_from_json_requires_object() {
    assert!(matches!(
        Params::from_json(json!([400, "Laptops"])),
        Err(CompileError::Configuration(_))
    ));
}

#[test]
fn test_captured_property_length() {
    let params = Params::new().bind("name", "abcd");
    assert_eq!(
        filter_with("x => x.size === name.length", &params),
        json!({ "$eq": [ { "$name": "size" }, 4 ] })
    );
}

#[test]
fn test_param_arithmetic_folds() {
    let params = Params::new().bind("base", 100);
    assert_eq!(
        filter_with("x => x.price > base * 2", &params),
        json!({ "$gt": [ { "$name": "price" }, 200 ] })
    );
}

#[test]
fn test_unresolved_identifier() {
    let err = filter_err("x => x.price > minPrice");
    assert_eq!(err, CompileError::UnresolvedIdentifier("minPrice".into()));
    assert!(err.to_string().contains("pass parameters"));
}

#[test]
fn test_missing_closure_parameter() {
    assert!(matches!(
        filter_err("() => x.price > 1"),
        CompileError::MissingClosureParameter(_)
    ));
    let params = Params::new().bind("limits", json!({ "max": 1 }));
    assert!(matches!(
        ClosureCompiler::new().compile_filter("() => limits.max > 0", Some(&params)),
        Err(CompileError::MissingClosureParameter(_))
    ));
}

// ============================================================================
// Methods
// ============================================================================

#[test]
fn test_date_accessor() {
    assert_eq!(
        filter("x => x.dateCreated.getFullYear() === 2019"),
        json!({ "$eq": [ { "$year": { "$name": "dateCreated" } }, 2019 ] })
    );
}

#[test]
fn test_string_method() {
    assert_eq!(
        filter("x => x.name.startsWith('A')"),
        json!({ "$startsWith": [ { "$name": "name" }, "A" ] })
    );
    assert_eq!(
        filter("x => x.name.toLowerCase() === 'abc'"),
        json!({ "$eq": [ { "$toLower": { "$name": "name" } }, "abc" ] })
    );
}

#[test]
fn test_math_method() {
    assert_eq!(
        filter("x => Math.round(x.price) > 10"),
        json!({ "$gt": [ { "$round": [ { "$name": "price" } ] }, 10 ] })
    );
    assert_eq!(
        filter("x => Math.ceil(x.price) > 10"),
        json!({ "$gt": [ { "$ceiling": { "$name": "price" } }, 10 ] })
    );
}

#[test]
fn test_builtin_evaluated_at_compile_time() {
    assert_eq!(
        filter("x => x.price > Math.floor(10.7)"),
        json!({ "$gt": [ { "$name": "price" }, 10 ] })
    );
    assert_eq!(
        filter("x => x.code === 'abc'.toUpperCase()"),
        json!({ "$eq": [ { "$name": "code" }, "ABC" ] })
    );
}

#[test]
fn test_substr_with_huge_count_clamps() {
    assert_eq!(
        filter("x => x.name === 'abc'.substr(1, 9223372036854775807)"),
        json!({ "$eq": [ { "$name": "name" }, "bc" ] })
    );
    assert_eq!(
        filter("x => x.name === 'abcdef'.substr(-2)"),
        json!({ "$eq": [ { "$name": "name" }, "ef" ] })
    );
}

#[test]
fn test_math_round_halves() {
    assert_eq!(
        filter("x => x.n === Math.round(0.49999999999999994)"),
        json!({ "$eq": [ { "$name": "n" }, 0 ] })
    );
    assert_eq!(
        filter("x => x.n === Math.round(2.5)"),
        json!({ "$eq": [ { "$name": "n" }, 3 ] })
    );
    assert_eq!(
        filter("x => x.n === Math.round(-2.5)"),
        json!({ "$eq": [ { "$name": "n" }, -2 ] })
    );
}

#[test]
fn test_non_whitelisted_builtin_rejected() {
    assert!(matches!(
        filter_err("x => x.price > parseInt('10')"),
        CompileError::UnsupportedMethod(_)
    ));
}

#[test]
fn test_zero_argument_call_is_not_evaluated() {
    assert_eq!(
        filter("x => x.createdAt < Date.now()"),
        json!({ "$lt": [ { "$name": "createdAt" }, { "$now": [] } ] })
    );
}

#[test]
fn test_unknown_entity_method_is_generic() {
    assert_eq!(
        filter("x => x.name.soundex() === 'A500'"),
        json!({ "$eq": [ { "$soundex": [ { "$name": "name" } ] }, "A500" ] })
    );
}

#[test]
fn test_includes_on_literal_array() {
    assert_eq!(
        filter("x => ['Laptops', 'Desktops'].includes(x.category)"),
        json!({ "$in": [ { "$name": "category" }, ["Laptops", "Desktops"] ] })
    );
    assert_eq!(
        filter("x => !['Laptops'].includes(x.category)"),
        json!({ "$nin": [ { "$name": "category" }, ["Laptops"] ] })
    );
}

#[test]
fn test_custom_resolver_chain() {
    let compiler = ClosureCompiler::new().with_resolvers(
        MethodResolverChain::empty().with(StringMethodResolver),
    );
    let result = compiler
        .compile_filter("x => x.dateCreated.getFullYear() === 2019", None)
        .unwrap()
        .unwrap();
    assert_eq!(
        result,
        json!({ "$eq": [ { "$getFullYear": [ { "$name": "dateCreated" } ] }, 2019 ] })
    );
}

// ============================================================================
// Validation and errors
// ============================================================================

#[test]
fn test_invalid_member_name_is_rejected() {
    let compiler = ClosureCompiler::new().with_member_resolver(|name| Ok(format!("{} 1", name)));
    assert_eq!(
        compiler.compile_filter("x => x.field === 1", None),
        Err(CompileError::InvalidFieldName("field 1".into()))
    );
}

#[test]
fn test_member_resolver_hook() {
    let compiler = ClosureCompiler::new()
        .with_member_resolver(|name| Ok(format!("Product.{}", name)));
    assert_eq!(
        compiler.compile_filter("x => x.id === 1", None).unwrap(),
        Some(json!({ "$eq": [ { "$name": "Product.id" }, 1 ] }))
    );
}

#[test]
fn test_injected_validator() {
    let validator = FieldNameValidator::with_class("a-z").unwrap();
    let compiler = ClosureCompiler::new().with_validator(validator);
    assert!(matches!(
        compiler.compile_filter("x => x.Price > 1", None),
        Err(CompileError::InvalidFieldName(_))
    ));
}

#[test]
fn test_invalid_operator() {
    assert_eq!(
        filter_err("x => x.flags | 2"),
        CompileError::InvalidOperator("|".into())
    );
}

#[test]
fn test_unknown_unary() {
    assert!(matches!(
        filter_err("x => !x.active"),
        CompileError::UnknownExpressionType(_)
    ));
}

#[test]
fn test_block_errors() {
    assert!(matches!(filter_err("x => {}"), CompileError::MissingClosureBody(_)));
    assert!(matches!(
        filter_err("x => { return; }"),
        CompileError::MissingReturnStatement(_)
    ));
    assert!(matches!(
        filter_err("x => { x.a === 1; x.b === 2 }"),
        CompileError::MissingReturnStatement(_)
    ));
    assert!(matches!(
        filter_err("x => { x.a === 1 }"),
        CompileError::UnknownExpressionType(_)
    ));
}

// ============================================================================
// Select
// ============================================================================

#[test]
fn test_select_object_preserves_order() {
    assert_eq!(
        select("x => ({ id: x.id, lastName: x.familyName })"),
        vec![
            json!({ "id": { "$name": "id" } }),
            json!({ "lastName": { "$name": "familyName" } }),
        ]
    );
}

#[test]
fn test_select_return_object() {
    assert_eq!(
        select("x => { return { year: x.dateCreated.getFullYear(), total: x.price * 2 }; }"),
        vec![
            json!({ "year": { "$year": { "$name": "dateCreated" } } }),
            json!({ "total": { "$multiply": [ { "$name": "price" }, 2 ] } }),
        ]
    );
}

#[test]
fn test_select_single_member() {
    assert_eq!(select("x => x.familyName"), vec![json!({ "$name": "familyName" })]);
}

#[test]
fn test_select_sequence() {
    assert_eq!(
        select("x => { x.id, x.familyName }"),
        vec![json!({ "$name": "id" }), json!({ "$name": "familyName" })]
    );
}

#[test]
fn test_select_sequence_expression_serializes_as_inclusion() {
    let expr = ClosureCompiler::new()
        .select_expression("x => { x.id, x.dateCreated.getFullYear() }", None)
        .unwrap();
    assert_eq!(
        expr.serialize().unwrap(),
        json!({ "id": 1, "year1": { "$year": { "$name": "dateCreated" } } })
    );
}

#[test]
fn test_select_captured_field_name() {
    let params = Params::new().bind("columns", json!({ "last": "familyName" }));
    let result = ClosureCompiler::new()
        .compile_select("x => { x.id, columns.last }", Some(&params))
        .unwrap();
    assert_eq!(
        result,
        vec![json!({ "$name": "id" }), json!({ "$name": "familyName" })]
    );
}

#[test]
fn test_select_rejects_other_shapes() {
    assert!(matches!(
        ClosureCompiler::new().compile_select("x => x.price > 1", None),
        Err(CompileError::InvalidSelectClosure(_))
    ));
}

#[test]
fn test_select_object_keys() {
    assert!(matches!(
        ClosureCompiler::new().compile_select("x => ({ [x.id]: x.id })", None),
        Err(CompileError::InvalidObjectKey(_))
    ));
    assert!(matches!(
        ClosureCompiler::new().compile_select("x => ({ 'bad key': x.id })", None),
        Err(CompileError::InvalidFieldName(_))
    ));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_fresh_instances_agree() {
    let source = "x => x.price >= 400 && x.category.name === 'Laptops' && x.name.includes('Pro')";
    let first = ClosureCompiler::new().compile_filter(source, None).unwrap();
    let second = ClosureCompiler::new().compile_filter(source, None).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_shared_instance_across_threads() {
    let compiler = ClosureCompiler::new();
    std::thread::scope(|s| {
        for limit in 0..4 {
            let compiler = &compiler;
            s.spawn(move || {
                let params = Params::new().push(limit);
                let result = compiler
                    .compile_filter("(x, limit) => x.qty > limit", Some(&params))
                    .unwrap();
                assert_eq!(result, Some(json!({ "$gt": [ { "$name": "qty" }, limit ] })));
            });
        }
    });
}

#[test]
fn test_value_conversion() {
    assert_eq!(Value::from(json!([1, "a"])), Value::Array(vec![1.into(), "a".into()]));
}
