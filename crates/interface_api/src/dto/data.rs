//! Data endpoint DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ItemId, PageRequest};

/// Largest page a client may request
pub const MAX_ROWS_PER_PAGE: usize = 1000;

/// `?childProp=` naming the navigation an operation goes through
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChildPropQuery {
    #[validate(length(min = 1, max = 100))]
    pub child_prop: String,
}

/// Query of `Add`: both parts are needed to attach the new item
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddQuery {
    #[validate(length(min = 1, max = 100))]
    pub child_prop: Option<String>,
    pub parent_id: Option<ItemId>,
}

/// Body of `GetPage` and `GetChildPage`
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct GetPageRequest {
    #[validate(length(max = 200))]
    pub search: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub sort_by: Option<String>,
    pub descending: bool,
    pub page: usize,
    #[validate(range(max = 1000))]
    pub rows_per_page: usize,
    /// Ids to leave out, such as the children already in a collection
    pub except: Vec<ItemId>,
}

impl From<GetPageRequest> for PageRequest {
    fn from(request: GetPageRequest) -> Self {
        let mut page = PageRequest::new()
            .descending(request.descending)
            .page(request.page, request.rows_per_page);
        page.search = request.search;
        page.sort_by = request.sort_by;
        if !request.except.is_empty() {
            page = page.except(request.except);
        }
        page
    }
}

/// Result of `RemoveFromParent`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedResponse {
    pub removed: bool,
}

/// Result of collection membership changes
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: usize,
}

/// Result of `ReplaceChild`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceChildResponse {
    /// The child that was detached or deleted to make room
    pub displaced: Option<ItemId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::IdFilter;
    use serde_json::json;

    #[test]
    fn test_page_request_conversion() {
        let id = ItemId::new();
        let request: GetPageRequest = serde_json::from_value(json!({
            "search": "os",
            "sortBy": "name",
            "descending": true,
            "page": 2,
            "rowsPerPage": 10,
            "except": [id],
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let page = PageRequest::from(request);
        assert_eq!(page.search.as_deref(), Some("os"));
        assert_eq!(page.sort_by.as_deref(), Some("name"));
        assert!(page.descending);
        assert_eq!(page.window(), Some((10, 10)));
        assert_eq!(page.id_filter, IdFilter::Except(vec![id]));
    }

    #[test]
    fn test_empty_body_means_everything() {
        let request: GetPageRequest = serde_json::from_value(json!({})).unwrap();
        let page = PageRequest::from(request);
        assert_eq!(page.window(), None);
        assert!(page.id_filter.is_none());
    }

    #[test]
    fn test_oversized_page_is_rejected() {
        let request = GetPageRequest {
            rows_per_page: MAX_ROWS_PER_PAGE + 1,
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_blank_child_prop_is_rejected() {
        let query = ChildPropQuery {
            child_prop: String::new(),
        };
        assert!(query.validate().is_err());
    }
}
