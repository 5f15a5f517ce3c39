//! Query Composition Tests
//!
//! Operator chains fold fragments with a fixed precedence:
//! - later operators win on colliding criteria keys
//! - required element sets from different operators accumulate
//! - overriding criteria win over every operator
//! - pages never overlap and together cover the result set
//! - too many sort fields is an error, disallowed sort fields are dropped
//! - hints depend only on the composed query

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};

use matapi::document::into_document;
use matapi::query::operators::{
    ChemsysQuery, ElementsQuery, FormulaQuery, NumericQuery, PaginationQuery, SortQuery,
};
use matapi::query::{
    HintScheme, OperatorChain, QueryError, QueryOperator, RequestParams, RuleHintScheme,
};
use matapi::store::{Collection, MemoryCollection, SortSpec};
use matapi::Document;

fn doc(value: Value) -> Document {
    into_document(value).unwrap()
}

fn chain(operators: Vec<Arc<dyn QueryOperator>>) -> OperatorChain {
    OperatorChain::new(operators)
}

// =============================================================================
// Merge Precedence
// =============================================================================

#[test]
fn test_later_operator_wins_on_collision() {
    let params = RequestParams::from_pairs([("formula", "Cr2O3"), ("chemsys", "*-*-*")]);

    let formula_first = chain(vec![Arc::new(FormulaQuery), Arc::new(ChemsysQuery)]);
    let query = formula_first.compose(&params, None).unwrap();
    assert_eq!(query.criteria["nelements"], json!(3));
    assert_eq!(query.criteria["composition_reduced.Cr"], json!(2.0));

    let chemsys_first = chain(vec![Arc::new(ChemsysQuery), Arc::new(FormulaQuery)]);
    let query = chemsys_first.compose(&params, None).unwrap();
    assert_eq!(query.criteria["nelements"], json!(2));
}

#[test]
fn test_ranges_on_one_field_combine() {
    let ops = chain(vec![
        Arc::new(NumericQuery::new(["band_gap"])),
        Arc::new(NumericQuery::default().with_alias("gap", "band_gap")),
    ]);
    let params = RequestParams::from_pairs([("band_gap_min", "1"), ("gap_max", "2.5")]);
    let query = ops.compose(&params, None).unwrap();
    assert_eq!(
        Value::Object(query.criteria),
        json!({"band_gap": {"$gte": 1.0, "$lte": 2.5}})
    );
}

#[test]
fn test_element_requirements_accumulate() {
    let ops = chain(vec![Arc::new(ChemsysQuery), Arc::new(ElementsQuery)]);
    let params = RequestParams::from_pairs([("chemsys", "Si-*"), ("elements", "O")]);
    let query = ops.compose(&params, None).unwrap();
    assert_eq!(
        Value::Object(query.criteria),
        json!({"elements": {"$all": ["Si", "O"]}, "nelements": 2})
    );
}

#[test]
fn test_overriding_criteria_win() {
    let ops = chain(vec![Arc::new(FormulaQuery)]);
    let params = RequestParams::from_pairs([("formula", "A2B3")]);
    let query = ops
        .compose(
            &params,
            Some(doc(json!({"formula_anonymous": "AB", "builder_meta.license": "BY-C"}))),
        )
        .unwrap();
    assert_eq!(
        Value::Object(query.criteria),
        json!({"formula_anonymous": "AB", "builder_meta.license": "BY-C"})
    );
}

#[test]
fn test_unknown_parameters_are_rejected() {
    let ops = chain(vec![Arc::new(FormulaQuery), Arc::new(PaginationQuery::default())]);
    let params = RequestParams::from_pairs([("formula", "SiO2"), ("colour", "red"), ("size", "3")]);
    match ops.compose(&params, None) {
        Err(QueryError::UnknownParameters(names)) => {
            assert_eq!(names, vec!["colour".to_string(), "size".to_string()])
        }
        other => panic!("expected unknown parameters, got {:?}", other),
    }
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_pages_partition_the_result_set() {
    let docs: Vec<Document> = (0..23)
        .map(|i| doc(json!({"material_id": format!("mp-{:02}", i), "nelements": i % 4})))
        .collect();
    let collection = MemoryCollection::with_documents("materials", "material_id", docs);
    let ops = chain(vec![
        Arc::new(SortQuery::new(1)),
        Arc::new(PaginationQuery::new(10, 50)),
    ]);

    for per_page in [1u64, 4, 7, 23, 50] {
        let mut seen = BTreeSet::new();
        let mut page = 1;
        loop {
            let params = RequestParams::from_pairs([
                ("_page", page.to_string()),
                ("_per_page", per_page.to_string()),
                ("_sort_fields", "material_id".to_string()),
            ]);
            let query = ops.compose(&params, None).unwrap();
            let found = collection
                .find(&query.criteria, &query.find_options(None))
                .await
                .unwrap();
            if found.is_empty() {
                break;
            }
            assert!(found.len() as u64 <= per_page);
            for d in found {
                let id = d["material_id"].as_str().unwrap().to_string();
                assert!(seen.insert(id), "page {} overlaps", page);
            }
            page += 1;
        }
        assert_eq!(seen.len(), 23, "per_page {}", per_page);
    }
}

#[test]
fn test_page_and_offset_forms_agree() {
    let ops = chain(vec![Arc::new(PaginationQuery::new(10, 50))]);
    let paged = ops
        .compose(&RequestParams::from_pairs([("_page", "3"), ("_per_page", "7")]), None)
        .unwrap();
    let offset = ops
        .compose(&RequestParams::from_pairs([("_skip", "14"), ("_limit", "7")]), None)
        .unwrap();
    assert_eq!((paged.skip, paged.limit), (Some(14), Some(7)));
    assert_eq!((paged.skip, paged.limit), (offset.skip, offset.limit));
}

// =============================================================================
// Sorting
// =============================================================================

#[test]
fn test_sort_limit_is_an_error_but_unknown_fields_are_dropped() {
    let ops = chain(vec![Arc::new(
        SortQuery::new(2).with_allowed_fields(["band_gap", "density", "volume"]),
    )]);

    let err = ops
        .compose(
            &RequestParams::from_pairs([("_sort_fields", "band_gap,density,volume")]),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, QueryError::TooManySortFields { requested: 3, max: 2 }));
    assert!(err.to_string().contains('2'));

    let query = ops
        .compose(
            &RequestParams::from_pairs([("_sort_fields", "-band_gap,formula_pretty")]),
            None,
        )
        .unwrap();
    assert_eq!(query.sort, vec![SortSpec::desc("band_gap")]);
}

// =============================================================================
// Hints
// =============================================================================

#[test]
fn test_hints_are_deterministic() {
    let ops = chain(vec![
        Arc::new(FormulaQuery),
        Arc::new(ChemsysQuery),
        Arc::new(NumericQuery::new(["band_gap"])),
    ]);
    let scheme = RuleHintScheme::materials();

    let forward = RequestParams::from_pairs([("formula", "Cr2O3"), ("band_gap_min", "1")]);
    let reverse = RequestParams::from_pairs([("band_gap_min", "1"), ("formula", "Cr2O3")]);

    let first = scheme.generate_hints(&ops.compose(&forward, None).unwrap());
    for _ in 0..10 {
        assert_eq!(scheme.generate_hints(&ops.compose(&forward, None).unwrap()), first);
        assert_eq!(scheme.generate_hints(&ops.compose(&reverse, None).unwrap()), first);
    }
    assert_eq!(first.hint, Some(doc(json!({"nelements": 1}))));

    let anonymous = ops
        .compose(&RequestParams::from_pairs([("formula", "A2B3")]), None)
        .unwrap();
    assert_eq!(
        scheme.generate_hints(&anonymous).hint,
        Some(doc(json!({"deprecated": 1, "builder_meta.license": 1})))
    );
}
