//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::ports::PortError;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_item_not_found_names_type_and_id() {
    let error = CoreError::item_not_found("Country", "42");

    assert!(error.is_not_found());
    let display = error.to_string();
    assert!(display.contains("Country"));
    assert!(display.contains("42"));
}

#[test]
fn test_port_not_found_converts() {
    let core_error: CoreError = PortError::not_found("City", "abc").into();
    assert!(core_error.is_not_found());
}

#[test]
fn test_port_conflict_converts() {
    let core_error: CoreError = PortError::conflict("version 3 is stale").into();
    assert!(core_error.is_conflict());
    assert!(core_error.to_string().contains("stale"));
}

#[test]
fn test_port_rejection_is_validation() {
    let core_error: CoreError = PortError::Rejected("null value in column".to_string()).into();
    assert!(matches!(core_error, CoreError::Validation(_)));
}

#[test]
fn test_unavailable_port_error_stays_retryable() {
    let core_error: CoreError = PortError::unavailable("connection refused").into();
    assert!(matches!(core_error, CoreError::Unavailable(_)));
    assert!(core_error.is_retryable());
    assert!(core_error.to_string().contains("connection refused"));
}

#[test]
fn test_internal_port_error_becomes_storage() {
    let core_error: CoreError = PortError::internal("row decode failed").into();
    assert!(matches!(core_error, CoreError::Storage(_)));
    assert!(!core_error.is_retryable());
}

#[test]
fn test_core_error_display() {
    let error = CoreError::schema("Country has no navigation property 'mayor'");
    let display = format!("{}", error);

    assert!(display.contains("Schema error"));
}

#[test]
fn test_core_error_configuration() {
    let error = CoreError::Configuration("Missing config".to_string());

    match error {
        CoreError::Configuration(msg) => assert_eq!(msg, "Missing config"),
        _ => panic!("Expected Configuration error"),
    }
}
