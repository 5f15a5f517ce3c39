//! # Query Composition
//!
//! Operators compile request parameters into fragments; a resource folds
//! the fragments of its ordered operator chain into one `ComposedQuery`,
//! asks its hint scheme for planner hints and hands the result to the
//! store.

pub mod chain;
pub mod errors;
pub mod fragment;
pub mod hint;
pub mod operator;
pub mod operators;
pub mod params;

pub use chain::OperatorChain;
pub use errors::{QueryError, QueryResult};
pub use fragment::{merge_criteria, ComposedQuery, Filter, QueryFragment};
pub use hint::{HintCondition, HintRule, HintScheme, Hints, RuleHintScheme};
pub use operator::{IndexSpec, PayloadOperator, Processed, QueryOperator};
pub use params::RequestParams;
