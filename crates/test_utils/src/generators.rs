//! Property-Based Test Generators
//!
//! Provides proptest strategies for claims and page requests, and `fake`
//! helpers for realistic sample names.

use fake::faker::address::en::{CityName, CountryName};
use fake::faker::name::en::Name;
use fake::Fake;
use proptest::prelude::*;
use uuid::Uuid;

use core_kernel::{Claim, ItemId, PageRequest, PermissionLevel};

/// A random country name
pub fn fake_country_name() -> String {
    CountryName().fake()
}

/// A random city name
pub fn fake_city_name() -> String {
    CityName().fake()
}

/// A random person name
pub fn fake_person_name() -> String {
    Name().fake()
}

/// Strategy for generating permission levels, including `none`
pub fn permission_level_strategy() -> impl Strategy<Value = PermissionLevel> {
    prop_oneof![
        Just(PermissionLevel::None),
        Just(PermissionLevel::View),
        Just(PermissionLevel::Edit),
        Just(PermissionLevel::Add),
        Just(PermissionLevel::All),
    ]
}

/// Strategy for identifiers
pub fn item_id_strategy() -> impl Strategy<Value = ItemId> {
    any::<u128>().prop_map(|n| ItemId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for a claim on `data_type`, either type-wide or on one of `ids`
pub fn claim_strategy(data_type: &'static str, ids: Vec<ItemId>) -> impl Strategy<Value = Claim> {
    let scoped = if ids.is_empty() {
        Just(None).boxed()
    } else {
        prop_oneof![Just(None), prop::sample::select(ids).prop_map(Some)].boxed()
    };
    (permission_level_strategy(), scoped).prop_map(move |(level, id)| match id {
        Some(id) => Claim::for_item(data_type, id, level),
        None => Claim::for_type(data_type, level),
    })
}

/// Strategy for a set of claims on `data_type`
pub fn claims_strategy(
    data_type: &'static str,
    ids: Vec<ItemId>,
) -> impl Strategy<Value = Vec<Claim>> {
    prop::collection::vec(claim_strategy(data_type, ids), 0..4)
}

/// Strategy for page requests over a type with a `name` field
pub fn page_request_strategy() -> impl Strategy<Value = PageRequest> {
    (
        prop::option::of("[a-z]{0,2}"),
        prop::option::of(prop_oneof![Just("name".to_string()), Just("id".to_string())]),
        any::<bool>(),
        0usize..5,
        0usize..6,
    )
        .prop_map(|(search, sort_by, descending, page, rows_per_page)| PageRequest {
            search,
            sort_by,
            descending,
            page,
            rows_per_page,
            ..PageRequest::default()
        })
}
