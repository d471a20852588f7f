//! Custom Test Assertions
//!
//! Assertion helpers for repository results that give more meaningful
//! failure messages than matching on error variants inline.

use std::fmt::Debug;

use serde_json::Value;

use core_kernel::{CoreError, FieldValue, ItemView, PageResult, Placeholder};

/// Asserts that a result failed with `NotFound`
pub fn assert_not_found<T: Debug>(result: Result<T, CoreError>) {
    match result {
        Err(CoreError::NotFound(_)) => {}
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

/// Asserts that a result failed with `Validation`
pub fn assert_validation_error<T: Debug>(result: Result<T, CoreError>) {
    match result {
        Err(CoreError::Validation(_)) => {}
        other => panic!("Expected Validation error, got {:?}", other),
    }
}

/// Asserts that a result failed with `Conflict`
pub fn assert_conflict<T: Debug>(result: Result<T, CoreError>) {
    match result {
        Err(CoreError::Conflict(_)) => {}
        other => panic!("Expected Conflict, got {:?}", other),
    }
}

/// Asserts that a result failed with `Schema`
pub fn assert_schema_error<T: Debug>(result: Result<T, CoreError>) {
    match result {
        Err(CoreError::Schema(_)) => {}
        other => panic!("Expected Schema error, got {:?}", other),
    }
}

/// Asserts that a view holds a concrete value for `name`
pub fn assert_view_value(view: &ItemView, name: &str, expected: &Value) {
    assert_eq!(
        view.value(name),
        Some(expected),
        "{}.{} mismatch in {:?}",
        view.data_type,
        name,
        view.values
    );
}

/// Asserts that a view holds a placeholder for `name`
pub fn assert_view_placeholder(view: &ItemView, name: &str, expected: Placeholder) {
    assert_eq!(
        view.get(name),
        Some(&FieldValue::Placeholder(expected)),
        "{}.{} should be the {} placeholder",
        view.data_type,
        name,
        expected
    );
}

/// Asserts that page items are ordered by a text field, case-insensitively
pub fn assert_sorted_by_text(page: &PageResult<ItemView>, field: &str, descending: bool) {
    let values: Vec<String> = page
        .items
        .iter()
        .map(|v| {
            v.value(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase()
        })
        .collect();

    for pair in values.windows(2) {
        let ordered = if descending {
            pair[0] >= pair[1]
        } else {
            pair[0] <= pair[1]
        };
        assert!(ordered, "Page not sorted by {}: {:?}", field, values);
    }
}

/// Asserts page size and total
pub fn assert_page_shape<T>(page: &PageResult<T>, items: usize, total: usize) {
    assert_eq!(page.items.len(), items, "Unexpected page size");
    assert_eq!(page.total, total, "Unexpected page total");
}
