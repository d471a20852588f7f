//! Paging request and result types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::identifiers::ItemId;

/// Restricts a page query to, or away from, a set of ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdFilter {
    #[default]
    None,
    /// Only these ids may appear
    Only(Vec<ItemId>),
    /// These ids never appear (e.g. children already in a collection)
    Except(Vec<ItemId>),
}

impl IdFilter {
    pub fn is_none(&self) -> bool {
        matches!(self, IdFilter::None)
    }

    /// Returns a predicate answering whether an id passes the filter
    pub fn matcher(&self) -> impl Fn(&ItemId) -> bool + '_ {
        let set: HashSet<ItemId> = match self {
            IdFilter::None => HashSet::new(),
            IdFilter::Only(ids) | IdFilter::Except(ids) => ids.iter().copied().collect(),
        };
        move |id| match self {
            IdFilter::None => true,
            IdFilter::Only(_) => set.contains(id),
            IdFilter::Except(_) => !set.contains(id),
        }
    }
}

/// Query parameters for a page of items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub descending: bool,
    /// 1-based; 0 disables paging
    pub page: usize,
    /// 0 disables paging
    pub rows_per_page: usize,
    #[serde(skip_serializing_if = "IdFilter::is_none")]
    pub id_filter: IdFilter,
}

impl PageRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    pub fn page(mut self, page: usize, rows_per_page: usize) -> Self {
        self.page = page;
        self.rows_per_page = rows_per_page;
        self
    }

    pub fn only(mut self, ids: Vec<ItemId>) -> Self {
        self.id_filter = IdFilter::Only(ids);
        self
    }

    pub fn except(mut self, ids: Vec<ItemId>) -> Self {
        self.id_filter = IdFilter::Except(ids);
        self
    }

    /// Search text, lowercased, when it is present and not blank
    pub fn normalized_search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// `(skip, take)` when paging is enabled
    pub fn window(&self) -> Option<(usize, usize)> {
        if self.page > 0 && self.rows_per_page > 0 {
            Some(((self.page - 1).saturating_mul(self.rows_per_page), self.rows_per_page))
        } else {
            None
        }
    }
}

/// One page of items plus the total the caller is authorized to see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    #[serde(rename = "pageItems")]
    pub items: Vec<T>,
    #[serde(rename = "totalItems")]
    pub total: usize,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self { items: Vec::new(), total: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window() {
        assert_eq!(PageRequest::new().window(), None);
        assert_eq!(PageRequest::new().page(1, 5).window(), Some((0, 5)));
        assert_eq!(PageRequest::new().page(3, 10).window(), Some((20, 10)));
        assert_eq!(PageRequest::new().page(0, 10).window(), None);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        assert_eq!(PageRequest::new().search("  ").normalized_search(), None);
        assert_eq!(
            PageRequest::new().search(" Oslo ").normalized_search().as_deref(),
            Some("oslo")
        );
    }

    #[test]
    fn test_id_filter_matcher() {
        let a = ItemId::new();
        let b = ItemId::new();

        let only = IdFilter::Only(vec![a]);
        let matches = only.matcher();
        assert!(matches(&a));
        assert!(!matches(&b));

        let except = IdFilter::Except(vec![a]);
        let matches = except.matcher();
        assert!(!matches(&a));
        assert!(matches(&b));

        assert!(IdFilter::None.matcher()(&a));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: PageRequest =
            serde_json::from_str(r#"{"sortBy":"name","page":2,"rowsPerPage":5}"#).unwrap();
        assert_eq!(request.sort_by.as_deref(), Some("name"));
        assert!(!request.descending);
        assert_eq!(request.window(), Some((5, 5)));
        assert!(request.id_filter.is_none());
    }
}
