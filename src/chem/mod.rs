//! # Criteria Compiler
//!
//! Pure translation of chemical formulas and chemical systems into store
//! criteria. Used by the formula, chemsys and elements query operators.
//!
//! ```ignore
//! use matapi::chem::formula_to_criteria;
//!
//! let crit = formula_to_criteria("Cr2O3")?;
//! // {"composition_reduced.Cr": 2.0, "composition_reduced.O": 3.0, "nelements": 2}
//! ```

pub mod composition;
pub mod criteria;
pub mod element;
pub mod errors;

pub use criteria::{chemsys_to_criteria, formula_to_criteria, parse_elements, ChemsysEntry, FormulaEntry};
pub use errors::{ChemError, ChemResult};
