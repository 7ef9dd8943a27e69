//! Pagination: pages, page requests, continuation tokens and lazy traversal.

use std::iter::FusedIterator;

use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::engine::{MockEngine, Request};
use crate::error::{MockError, Result};
use crate::kind::ResourceKind;
use crate::record::{value_as_u64, value_to_string, Record};

/// Default page size for list operations.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A page of results.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of matching items across all pages.
    pub count: usize,
    /// Continuation token for the following page.
    pub next_page: Option<String>,
    /// Continuation token for the preceding page.
    pub previous_page: Option<String>,
}

impl<T> Page<T> {
    /// Map the items to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            count: self.count,
            next_page: self.next_page,
            previous_page: self.previous_page,
        }
    }

    /// Whether a following page exists.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Returns true if this page has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns an iterator over the items in this page.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Which page to return and how large pages are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number (1-indexed).
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
}

impl PageRequest {
    /// Create a page request; zero values are raised to 1.
    #[must_use]
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// First page with the given size.
    #[must_use]
    pub fn first(per_page: usize) -> Self {
        Self::new(1, per_page)
    }

    /// Number of items skipped before this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Read `page`/`per_page` from request parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is present but not a number.
    pub fn from_params(params: &Map<String, Value>, default_per_page: usize) -> Result<Self> {
        let read = |key: &str, default: usize| -> Result<usize> {
            match params.get(key) {
                None | Some(Value::Null) => Ok(default),
                Some(value) => value_as_u64(value)
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        MockError::InvalidRequest(format!(
                            "{key} must be a positive integer, got {value}"
                        ))
                    }),
            }
        };
        Ok(Self::new(read("page", 1)?, read("per_page", default_per_page)?))
    }

    fn with_page(self, page: usize) -> Self {
        Self::new(page, self.per_page)
    }
}

/// One page cut out of an ordered result set.
#[derive(Debug)]
pub(crate) struct Slice<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub next: Option<PageRequest>,
    pub previous: Option<PageRequest>,
}

/// Cut the page described by `request` out of `items`.
pub(crate) fn slice<T>(items: Vec<T>, request: PageRequest) -> Slice<T> {
    let count = items.len();
    let offset = request.offset();
    let end = offset.saturating_add(request.per_page).min(count);

    let next = (end < count).then(|| request.with_page(request.page + 1));
    let previous = (request.page > 1).then(|| request.with_page(request.page - 1));

    let items = items
        .into_iter()
        .skip(offset)
        .take(request.per_page)
        .collect();

    Slice {
        items,
        count,
        next,
        previous,
    }
}

/// Everything needed to resume a list or search at a given page.
///
/// Tokens travel as absolute URLs, e.g.
/// `https://host/api/v2/users/search.json?page=2&per_page=100&query=ann&scope%5Borganization_id%5D=4`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken {
    pub kind: ResourceKind,
    pub search: bool,
    pub scope: Map<String, Value>,
    pub params: Map<String, Value>,
    pub page: PageRequest,
}

impl ContinuationToken {
    /// Render the token as a URL under `base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    pub fn encode(&self, base: &Url) -> Result<String> {
        let suffix = if self.search { "/search" } else { "" };
        let mut url = base.join(&format!("{}{suffix}.json", self.kind.path()))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &self.page.page.to_string());
            query.append_pair("per_page", &self.page.per_page.to_string());
            for (key, value) in &self.params {
                if key == "page" || key == "per_page" || value.is_null() {
                    continue;
                }
                query.append_pair(key, &value_to_string(value));
            }
            for (key, value) in &self.scope {
                query.append_pair(&format!("scope[{key}]"), &value_to_string(value));
            }
        }

        Ok(url.into())
    }

    /// Parse a token produced by [`ContinuationToken::encode`] with the same base.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::InvalidToken`] if the URL does not point at a
    /// collection under `base` or carries malformed paging values.
    pub fn decode(token: &str, base: &Url) -> Result<Self> {
        let invalid = || MockError::InvalidToken(token.to_string());

        let url = Url::parse(token).map_err(|_| invalid())?;
        if url.origin() != base.origin() {
            return Err(invalid());
        }

        let path = url
            .path()
            .strip_prefix(base.path())
            .and_then(|p| p.strip_suffix(".json"))
            .ok_or_else(invalid)?;
        let (path, search) = match path.strip_suffix("/search") {
            Some(rest) => (rest, true),
            None => (path, false),
        };
        let kind = ResourceKind::from_path(path).ok_or_else(invalid)?;

        let mut scope = Map::new();
        let mut params = Map::new();
        for (key, value) in url.query_pairs() {
            let scoped = key
                .strip_prefix("scope[")
                .and_then(|k| k.strip_suffix(']'))
                .map(str::to_string);
            match scoped {
                Some(field) => {
                    scope.insert(field, Value::String(value.into_owned()));
                }
                None => {
                    params.insert(key.into_owned(), Value::String(value.into_owned()));
                }
            }
        }

        let page = PageRequest::from_params(&params, DEFAULT_PAGE_SIZE).map_err(|_| invalid())?;
        params.remove("page");
        params.remove("per_page");

        Ok(Self {
            kind,
            search,
            scope,
            params,
            page,
        })
    }
}

/// Lazy, forward-only traversal of pages.
///
/// Each step runs a fresh query against the engine's current state, so later
/// pages reflect mutations made while iterating. Iteration stops after the
/// last page or the first error; start a new traversal to read again.
pub struct Pages<'e> {
    engine: &'e MockEngine,
    next: Option<Request>,
}

impl<'e> Pages<'e> {
    pub(crate) fn new(engine: &'e MockEngine, first: Request) -> Self {
        Self {
            engine,
            next: Some(first),
        }
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Page<Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        let request = self.next.take()?;
        let page = self.engine.fetch_page(&request);
        if let Ok(page) = &page {
            self.next = page
                .next_page
                .clone()
                .map(|token| Request::page(request.kind, token));
        }
        Some(page)
    }
}

impl FusedIterator for Pages<'_> {}

/// Lazy traversal of individual records across pages.
pub struct Entries<'e> {
    pages: Pages<'e>,
    current: std::vec::IntoIter<Record>,
}

impl<'e> Entries<'e> {
    pub(crate) fn new(pages: Pages<'e>) -> Self {
        Self {
            pages,
            current: Vec::new().into_iter(),
        }
    }
}

impl Iterator for Entries<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.current.next() {
                return Some(Ok(record));
            }
            match self.pages.next()? {
                Ok(page) => self.current = page.items.into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl FusedIterator for Entries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://mock.example.com/api/v2/").unwrap()
    }

    #[test]
    fn test_slice_middle_page() {
        let s = slice((1..=250).collect::<Vec<_>>(), PageRequest::new(2, 100));
        assert_eq!(s.items.first(), Some(&101));
        assert_eq!(s.items.len(), 100);
        assert_eq!(s.count, 250);
        assert_eq!(s.next, Some(PageRequest::new(3, 100)));
        assert_eq!(s.previous, Some(PageRequest::new(1, 100)));
    }

    #[test]
    fn test_slice_last_and_past_end() {
        let s = slice((1..=250).collect::<Vec<_>>(), PageRequest::new(3, 100));
        assert_eq!(s.items.len(), 50);
        assert!(s.next.is_none());

        let s = slice((1..=5).collect::<Vec<_>>(), PageRequest::new(9, 10));
        assert!(s.items.is_empty());
        assert_eq!(s.count, 5);
        assert!(s.next.is_none());
    }

    #[test]
    fn test_page_request_from_params() {
        let params = json!({"page": "3", "per_page": 25});
        let req = PageRequest::from_params(params.as_object().unwrap(), 100).unwrap();
        assert_eq!(req, PageRequest::new(3, 25));
        assert_eq!(req.offset(), 50);

        let bad = json!({"page": "two"});
        assert!(PageRequest::from_params(bad.as_object().unwrap(), 100).is_err());
    }

    #[test]
    fn test_token_encode_decode() {
        let mut scope = Map::new();
        scope.insert("user_id".to_string(), json!(7));
        let mut params = Map::new();
        params.insert("query".to_string(), json!("ann smith"));

        let token = ContinuationToken {
            kind: ResourceKind::HelpCenterArticles,
            search: true,
            scope,
            params,
            page: PageRequest::new(2, 10),
        };

        let url = token.encode(&base()).unwrap();
        assert!(url.starts_with("https://mock.example.com/api/v2/help_center/articles/search.json?page=2"));

        let decoded = ContinuationToken::decode(&url, &base()).unwrap();
        assert_eq!(decoded.kind, ResourceKind::HelpCenterArticles);
        assert!(decoded.search);
        assert_eq!(decoded.page, PageRequest::new(2, 10));
        assert_eq!(decoded.scope["user_id"], json!("7"));
        assert_eq!(decoded.params["query"], json!("ann smith"));
    }

    #[test]
    fn test_decode_rejects_foreign_urls() {
        assert!(ContinuationToken::decode("https://elsewhere.com/api/v2/users.json", &base()).is_err());
        assert!(ContinuationToken::decode("https://mock.example.com/api/v2/widgets.json", &base()).is_err());
        assert!(ContinuationToken::decode("not a url", &base()).is_err());
    }

    #[test]
    fn test_page_map() {
        let page = Page {
            items: vec![1, 2, 3],
            count: 3,
            next_page: None,
            previous_page: None,
        };
        let mapped = page.map(|x| x * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert!(!mapped.has_more());
    }
}
