//! Criteria Compiler Tests
//!
//! Formula and chemical-system inputs compile to the documented criteria:
//! - reduction makes equivalent formulas compile identically
//! - lists collapse into `$in`
//! - wildcard and anonymous forms
//! - malformed input is always a client error

use matapi::chem::{chemsys_to_criteria, formula_to_criteria, parse_elements, ChemError};
use matapi::Document;
use serde_json::{json, Value};

fn value(doc: Document) -> Value {
    Value::Object(doc)
}

// =============================================================================
// Formulas
// =============================================================================

#[test]
fn test_formula_reduces() {
    assert_eq!(
        value(formula_to_criteria("Cr2O3").unwrap()),
        json!({"composition_reduced.Cr": 2.0, "composition_reduced.O": 3.0, "nelements": 2})
    );
}

#[test]
fn test_equivalent_formulas_compile_identically() {
    let expected = formula_to_criteria("Cr2O3").unwrap();
    for formula in ["Cr4O6", "O3Cr2", "Cr2O3 ", "(CrO1.5)2"] {
        assert_eq!(formula_to_criteria(formula).unwrap(), expected, "{}", formula);
    }
}

#[test]
fn test_formula_list_becomes_in() {
    assert_eq!(
        value(formula_to_criteria("Cr2O3, O2Si").unwrap()),
        json!({"formula_pretty": {"$in": ["Cr2O3", "SiO2"]}})
    );
    // Duplicates after reduction collapse
    assert_eq!(
        value(formula_to_criteria("Cr2O3,Cr4O6").unwrap()),
        json!({"formula_pretty": {"$in": ["Cr2O3"]}})
    );
}

#[test]
fn test_wildcard_formula() {
    assert_eq!(
        value(formula_to_criteria("Cr2*3").unwrap()),
        json!({"composition_reduced.Cr": 2.0, "formula_anonymous": "A2B3"})
    );
}

#[test]
fn test_anonymous_formula() {
    assert_eq!(
        value(formula_to_criteria("A2B3").unwrap()),
        json!({"formula_anonymous": "A2B3"})
    );
    assert_eq!(
        value(formula_to_criteria("B3A2,AB2").unwrap()),
        json!({"formula_anonymous": {"$in": ["A2B3", "AB2"]}})
    );
}

#[test]
fn test_mixed_formula_list_becomes_or() {
    let crit = value(formula_to_criteria("SiO2,A2B3").unwrap());
    let clauses = crit["$or"].as_array().unwrap();
    assert_eq!(clauses.len(), 2);
    assert_eq!(clauses[1], json!({"formula_anonymous": "A2B3"}));
}

#[test]
fn test_formula_errors() {
    assert!(matches!(
        formula_to_criteria("Cr2*3,SiO2"),
        Err(ChemError::WildcardInList(_))
    ));
    assert!(matches!(
        formula_to_criteria("Cr*2*3"),
        Err(ChemError::MultipleWildcards(_))
    ));
    assert!(matches!(
        formula_to_criteria("Cr2Qq3"),
        Err(ChemError::UnknownElement { .. })
    ));
    assert!(matches!(formula_to_criteria("Cr2O3,,SiO2"), Err(ChemError::EmptyEntry(_))));
    for bad in ["", "Cr2(O3", "Cr2O3)", "2Cr", "cr2o3"] {
        assert!(formula_to_criteria(bad).is_err(), "{:?}", bad);
    }
}

#[test]
fn test_deeply_nested_formula_is_a_client_error() {
    // Runs on a small stack so unbounded recursion would abort the test binary
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            let open = "(".repeat(100_000);
            let balanced = format!("{}Fe{}", "(".repeat(50), ")".repeat(50));
            (
                matches!(formula_to_criteria(&open), Err(ChemError::MalformedFormula { .. })),
                matches!(formula_to_criteria(&balanced), Err(ChemError::MalformedFormula { .. })),
            )
        })
        .unwrap();
    assert_eq!(handle.join().unwrap(), (true, true));
}

// =============================================================================
// Chemical Systems
// =============================================================================

#[test]
fn test_chemsys_is_sorted() {
    assert_eq!(
        value(chemsys_to_criteria("O-Li-Fe").unwrap()),
        json!({"chemsys": "Fe-Li-O"})
    );
    assert_eq!(
        value(chemsys_to_criteria("Si-O,O-Cr").unwrap()),
        json!({"chemsys": {"$in": ["O-Si", "Cr-O"]}})
    );
}

#[test]
fn test_chemsys_wildcards() {
    assert_eq!(
        value(chemsys_to_criteria("Si-*").unwrap()),
        json!({"elements": {"$all": ["Si"]}, "nelements": 2})
    );
    assert_eq!(
        value(chemsys_to_criteria("*-*-*").unwrap()),
        json!({"nelements": 3})
    );
    assert_eq!(
        value(chemsys_to_criteria("*-*,*-*-*").unwrap()),
        json!({"nelements": {"$in": [2, 3]}})
    );
}

#[test]
fn test_chemsys_errors() {
    assert!(matches!(
        chemsys_to_criteria("Fe-Xy"),
        Err(ChemError::UnknownElement { .. })
    ));
    assert!(matches!(
        chemsys_to_criteria("Fe--O"),
        Err(ChemError::MalformedChemsys { .. })
    ));
}

#[test]
fn test_repeated_symbols_count_every_slot() {
    assert_eq!(
        value(chemsys_to_criteria("Si-*-Si").unwrap()),
        json!({"elements": {"$all": ["Si"]}, "nelements": 3})
    );
    assert_eq!(
        value(chemsys_to_criteria("O-Si-O").unwrap()),
        json!({"chemsys": "O-Si"})
    );
}

#[test]
fn test_parse_elements() {
    assert_eq!(parse_elements("Fe, O,Fe").unwrap(), vec!["Fe", "O"]);
    assert!(parse_elements("Fe,Zz").is_err());
}
