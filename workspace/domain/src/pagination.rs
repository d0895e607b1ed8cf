//! Normalization of the `paginate`, `page` and `perPage` query parameters.

use crate::error::field_error;
use std::collections::HashMap;
use validator::ValidationErrors;

pub const DEFAULT_PER_PAGE: u64 = 15;
pub const MAX_PER_PAGE: u64 = 100;

/// Page size used when `perPage` is absent, and the largest one accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub per_page: u64,
    pub max_per_page: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            max_per_page: MAX_PER_PAGE,
        }
    }
}

/// Raw query string parameters as received.
pub type QueryMap = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub paginate: bool,
    pub page: u64,
    pub per_page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            paginate: true,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// Reads the pagination parameters, recording a field error for every
    /// malformed value into `errors`. Missing parameters take their defaults.
    pub fn parse(query: &QueryMap, limits: PageLimits, errors: &mut ValidationErrors) -> Self {
        let paginate = match query.get("paginate").map(|value| value.trim()) {
            None => true,
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            Some(_) => {
                errors.add(
                    "paginate",
                    field_error("boolean", "The paginate field must be true or false."),
                );
                true
            }
        };

        let mut page = parse_positive::<u64>(query, "page", errors).unwrap_or(1);
        let mut per_page = parse_positive(query, "perPage", errors).unwrap_or(limits.per_page);

        if per_page > limits.max_per_page {
            errors.add(
                "perPage",
                field_error(
                    "max",
                    format!(
                        "The perPage field must not be greater than {}.",
                        limits.max_per_page
                    ),
                ),
            );
            per_page = limits.per_page;
        }
        // The row offset is bound as a signed 64-bit integer
        let offset = (page - 1).checked_mul(per_page);
        if offset.map_or(true, |offset| offset > i64::MAX as u64) {
            errors.add(
                "page",
                field_error("max", "The page field is too large."),
            );
            page = 1;
        }

        Self {
            paginate,
            page,
            per_page,
        }
    }

    /// Standalone variant of [`PageRequest::parse`].
    pub fn from_query(query: &QueryMap, limits: PageLimits) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let request = Self::parse(query, limits, &mut errors);
        if errors.is_empty() {
            Ok(request)
        } else {
            Err(errors)
        }
    }

    /// Query parameters to carry into page links.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("paginate".to_string(), if self.paginate { "1" } else { "0" }.to_string()),
            ("perPage".to_string(), self.per_page.to_string()),
        ]
    }
}

/// Parses an integer parameter that must be at least 1.
pub(crate) fn parse_positive<T>(
    query: &QueryMap,
    field: &'static str,
    errors: &mut ValidationErrors,
) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    let raw = query.get(field)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value >= T::from(1) => Some(value),
        Ok(_) => {
            errors.add(
                field,
                field_error("min", format!("The {} field must be at least 1.", field)),
            );
            None
        }
        Err(_) => {
            errors.add(
                field,
                field_error("integer", format!("The {} field must be an integer.", field)),
            );
            None
        }
    }
}

/// One page of results together with the totals needed for pagination meta.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn last_page(&self) -> u64 {
        common::pagination::last_page(self.total, self.per_page)
    }
}

/// Result of a listing: a single page, or every row when pagination is off.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    Paginated(Page<T>),
    All(Vec<T>),
}

impl<T> Listing<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        match self {
            Listing::Paginated(page) => Listing::Paginated(Page {
                items: page.items.into_iter().map(f).collect(),
                total: page.total,
                page: page.page,
                per_page: page.per_page,
            }),
            Listing::All(items) => Listing::All(items.into_iter().map(f).collect()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Listing::Paginated(page) => page.items.len(),
            Listing::All(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
