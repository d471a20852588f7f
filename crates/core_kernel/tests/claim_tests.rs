//! Property tests for claims and the default authorization filter

use core_kernel::{AuthorizationFilter, Claim, ClaimAuthorizer, ItemId, PermissionLevel};
use proptest::prelude::*;
use uuid::Uuid;

fn level_strategy() -> impl Strategy<Value = PermissionLevel> {
    prop_oneof![
        Just(PermissionLevel::None),
        Just(PermissionLevel::View),
        Just(PermissionLevel::Edit),
        Just(PermissionLevel::Add),
        Just(PermissionLevel::All),
    ]
}

fn claim_strategy() -> impl Strategy<Value = Claim> {
    let data_type = prop_oneof![Just("Country"), Just("City"), Just("*")];
    let item = prop::option::of(any::<u128>().prop_map(|n| ItemId::from_uuid(Uuid::from_u128(n))));
    (data_type, level_strategy(), item).prop_map(|(data_type, level, item)| match item {
        Some(id) => Claim::for_item(data_type, id, level),
        None => Claim::for_type(data_type, level),
    })
}

proptest! {
    #[test]
    fn claim_string_form_parses_back(claim in claim_strategy()) {
        let parsed: Claim = claim.to_string().parse().unwrap();
        prop_assert_eq!(parsed, claim);
    }

    #[test]
    fn type_permission_never_exceeds_item_permission(
        claims in prop::collection::vec(claim_strategy(), 0..8),
        n in any::<u128>(),
    ) {
        let id = ItemId::from_uuid(Uuid::from_u128(n));
        let on_type = ClaimAuthorizer.permission(&claims, "Country", None);
        let on_item = ClaimAuthorizer.permission(&claims, "Country", Some(id));
        prop_assert!(on_type <= on_item);
    }

    #[test]
    fn adding_a_claim_never_lowers_permission(
        claims in prop::collection::vec(claim_strategy(), 0..8),
        extra in claim_strategy(),
    ) {
        let before = ClaimAuthorizer.permission(&claims, "City", None);
        let mut more = claims.clone();
        more.push(extra);
        prop_assert!(ClaimAuthorizer.permission(&more, "City", None) >= before);
    }
}
