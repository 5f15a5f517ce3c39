//! Skip/limit and page-based pagination

use super::super::errors::{QueryError, QueryResult};
use super::super::fragment::QueryFragment;
use super::super::operator::QueryOperator;
use super::super::params::RequestParams;
use crate::document::Document;

pub const SKIP: &str = "_skip";
pub const LIMIT: &str = "_limit";
pub const PAGE: &str = "_page";
pub const PER_PAGE: &str = "_per_page";

/// Pagination by `_skip`/`_limit` or by 1-based `_page`/`_per_page`
#[derive(Debug, Clone)]
pub struct PaginationQuery {
    default_limit: u64,
    max_limit: u64,
}

impl PaginationQuery {
    pub fn new(default_limit: u64, max_limit: u64) -> Self {
        Self {
            default_limit: default_limit.min(max_limit),
            max_limit,
        }
    }

    fn check_limit(&self, param: &str, value: u64) -> QueryResult<u64> {
        if value == 0 {
            return Err(QueryError::invalid(param, "must be at least 1"));
        }
        if value > self.max_limit {
            return Err(QueryError::LimitExceeded {
                param: param.to_string(),
                value,
                max: self.max_limit,
            });
        }
        Ok(value)
    }
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self::new(100, 1000)
    }
}

impl QueryOperator for PaginationQuery {
    fn name(&self) -> &str {
        "pagination"
    }

    fn parameters(&self) -> Vec<String> {
        [SKIP, LIMIT, PAGE, PER_PAGE].iter().map(|p| p.to_string()).collect()
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        let offset_style = params.contains(SKIP) || params.contains(LIMIT);
        let page_style = params.contains(PAGE) || params.contains(PER_PAGE);

        if offset_style && page_style {
            return Err(QueryError::AmbiguousParameters(format!(
                "use either {}/{} or {}/{}, not both",
                SKIP, LIMIT, PAGE, PER_PAGE
            )));
        }

        let (skip, limit) = if page_style {
            let page = params.get_u64(PAGE)?.unwrap_or(1);
            if page == 0 {
                return Err(QueryError::invalid(PAGE, "pages start at 1"));
            }
            let per_page = self.check_limit(
                PER_PAGE,
                params.get_u64(PER_PAGE)?.unwrap_or(self.default_limit),
            )?;
            let skip = (page - 1)
                .checked_mul(per_page)
                .ok_or_else(|| QueryError::invalid(PAGE, "page is out of range"))?;
            (skip, per_page)
        } else {
            let skip = params.get_u64(SKIP)?.unwrap_or(0);
            let limit = self.check_limit(
                LIMIT,
                params.get_u64(LIMIT)?.unwrap_or(self.default_limit),
            )?;
            (skip, limit)
        };

        Ok(QueryFragment::empty().with_skip(skip).with_limit(limit))
    }

    fn meta(&self) -> Document {
        let mut meta = Document::new();
        meta.insert("max_limit".to_string(), self.max_limit.into());
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pairs: &[(&str, &str)]) -> QueryResult<QueryFragment> {
        PaginationQuery::new(10, 100).compile(&RequestParams::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let fragment = compile(&[]).unwrap();
        assert_eq!((fragment.skip, fragment.limit), (Some(0), Some(10)));
    }

    #[test]
    fn test_page_style() {
        let fragment = compile(&[("_page", "3"), ("_per_page", "20")]).unwrap();
        assert_eq!((fragment.skip, fragment.limit), (Some(40), Some(20)));
    }

    #[test]
    fn test_limit_over_max_names_max() {
        let err = compile(&[("_limit", "500")]).unwrap_err();
        assert!(matches!(err, QueryError::LimitExceeded { max: 100, .. }));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_mixed_styles_are_ambiguous() {
        let err = compile(&[("_skip", "0"), ("_page", "1")]).unwrap_err();
        assert!(matches!(err, QueryError::AmbiguousParameters(_)));
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(compile(&[("_limit", "0")]).is_err());
        assert!(compile(&[("_page", "0")]).is_err());
    }
}
