//! Pagination metadata attached to paginated listings.
//!
//! `meta.links` is a windowed list of page links: every page when there are
//! few of them, otherwise the first and last two pages around a sliding
//! window of [`ON_EACH_SIDE`] pages, separated by `...` placeholders and
//! wrapped in previous/next links.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use utoipa::ToSchema;

/// Pages shown on each side of the current page in `meta.links`.
pub const ON_EACH_SIDE: u64 = 3;

pub const PREVIOUS_LABEL: &str = "« Previous";
pub const NEXT_LABEL: &str = "Next »";
pub const GAP_LABEL: &str = "...";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: u64,
    pub from: Option<u64>,
    pub last_page: u64,
    pub total: u64,
    pub per_page: u64,
    pub to: Option<u64>,
    pub path: String,
    pub links: Vec<PageLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageLink {
    pub url: Option<String>,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaginationLinks {
    pub first: Option<String>,
    pub last: Option<String>,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Builds page URLs from a base path and the query parameters to preserve.
#[derive(Debug, Clone)]
pub struct PageUrls {
    path: String,
    query: Vec<(String, String)>,
}

impl PageUrls {
    /// `query` must not contain the `page` parameter; it is appended per link.
    pub fn new(path: impl Into<String>, query: Vec<(String, String)>) -> Self {
        let query = query.into_iter().filter(|(key, _)| key != "page").collect();
        Self {
            path: path.into(),
            query,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self, page: u64) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .append_pair("page", &page.to_string())
            .finish();
        let separator = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.path, separator, query)
    }
}

/// Number of the last page, never less than 1.
pub fn last_page(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 1;
    }
    total.div_ceil(per_page).max(1)
}

impl PaginationMeta {
    /// `count` is the number of items actually returned for `current_page`.
    pub fn new(urls: &PageUrls, current_page: u64, per_page: u64, total: u64, count: u64) -> Self {
        let last_page = last_page(total, per_page);
        let (from, to) = if count == 0 {
            (None, None)
        } else {
            let from = (current_page - 1) * per_page + 1;
            (Some(from), Some(from + count - 1))
        };

        Self {
            current_page,
            from,
            last_page,
            total,
            per_page,
            to,
            path: urls.path().to_string(),
            links: link_window(urls, current_page, last_page),
        }
    }
}

impl PaginationLinks {
    pub fn new(urls: &PageUrls, current_page: u64, last_page: u64) -> Self {
        Self {
            first: Some(urls.url(1)),
            last: Some(urls.url(last_page)),
            prev: (current_page > 1).then(|| urls.url(current_page - 1)),
            next: (current_page < last_page).then(|| urls.url(current_page + 1)),
        }
    }
}

fn page_range(urls: &PageUrls, current_page: u64, start: u64, end: u64) -> Vec<PageLink> {
    (start..=end)
        .map(|page| PageLink {
            url: Some(urls.url(page)),
            label: page.to_string(),
            active: page == current_page,
        })
        .collect()
}

fn gap() -> PageLink {
    PageLink {
        url: None,
        label: GAP_LABEL.to_string(),
        active: false,
    }
}

fn link_window(urls: &PageUrls, current_page: u64, last_page: u64) -> Vec<PageLink> {
    let window = ON_EACH_SIDE + 4;
    let mut links = vec![PageLink {
        url: (current_page > 1).then(|| urls.url(current_page - 1)),
        label: PREVIOUS_LABEL.to_string(),
        active: false,
    }];

    if last_page < ON_EACH_SIDE * 2 + 8 {
        links.extend(page_range(urls, current_page, 1, last_page));
    } else if current_page <= window {
        links.extend(page_range(urls, current_page, 1, window + ON_EACH_SIDE));
        links.push(gap());
        links.extend(page_range(urls, current_page, last_page - 1, last_page));
    } else if current_page > last_page - window {
        links.extend(page_range(urls, current_page, 1, 2));
        links.push(gap());
        let start = last_page - (window + ON_EACH_SIDE - 1);
        links.extend(page_range(urls, current_page, start, last_page));
    } else {
        links.extend(page_range(urls, current_page, 1, 2));
        links.push(gap());
        links.extend(page_range(
            urls,
            current_page,
            current_page - ON_EACH_SIDE,
            current_page + ON_EACH_SIDE,
        ));
        links.push(gap());
        links.extend(page_range(urls, current_page, last_page - 1, last_page));
    }

    links.push(PageLink {
        url: (current_page < last_page).then(|| urls.url(current_page + 1)),
        label: NEXT_LABEL.to_string(),
        active: false,
    });
    links
}
