//! HTTP tests for the data and authorization endpoints
//!
//! Every test runs the full router over a seeded in-memory store.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use core_kernel::{Claim, DataItem, ItemId, PermissionLevel};
use domain_sample::{AIRLINE, CITY, COUNTRY, LEADER};
use infra_db::MemoryShareStore;
use interface_api::auth::{create_token, roles, TokenClaims};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{ContextFixtures, SampleFixtures};

struct Harness {
    server: TestServer,
    items: Vec<DataItem>,
}

impl Harness {
    async fn new() -> Self {
        let (context, items) = ContextFixtures::seeded().await;
        let state = AppState::new(context, Arc::new(MemoryShareStore::new()), ApiConfig::default());
        let server = TestServer::new(create_router(state)).expect("router builds");
        Self { server, items }
    }

    fn id(&self, data_type: &str, name: &str) -> ItemId {
        SampleFixtures::named(&self.items, data_type, name).id
    }
}

fn token(claims: TokenClaims) -> String {
    create_token(&claims, &ApiConfig::default().jwt_secret).expect("token signs")
}

fn admin() -> String {
    token(TokenClaims::new("root", 600).with_role(roles::ADMIN))
}

fn user_with(name: &str, claims: &[Claim]) -> String {
    let token_claims = claims
        .iter()
        .fold(TokenClaims::new(name, 600), |t, c| t.with_claim(c));
    token(token_claims)
}

fn viewer(data_type: &str) -> String {
    user_with("viewer", &[Claim::for_type(data_type, PermissionLevel::View)])
}

fn data(data_type: &str, action: &str) -> String {
    format!("/api/Data/{}/{}", data_type, action)
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let h = Harness::new().await;

        let response = h.server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_checks_stores() {
        let h = Harness::new().await;

        let response = h.server.get("/health/ready").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Value>()["checks"].as_array().map(Vec::len), Some(2));
    }
}

mod authentication {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        let h = Harness::new().await;

        let response = h.server.get(&data(COUNTRY, "GetTotal")).await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_foreign_signature_is_rejected() {
        let h = Harness::new().await;
        let forged = create_token(&TokenClaims::new("root", 600).with_role(roles::ADMIN), "wrong")
            .unwrap();

        let response = h
            .server
            .get(&data(COUNTRY, "GetTotal"))
            .authorization_bearer(forged)
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }
}

mod data_endpoints {
    use super::*;

    #[tokio::test]
    async fn test_total_respects_claims() {
        let h = Harness::new().await;
        let oslo = h.id(CITY, "Oslo");

        let total = h.server.get(&data(CITY, "GetTotal")).authorization_bearer(admin()).await;
        assert_eq!(total.json::<usize>(), 4);

        let one = user_with("ann", &[Claim::for_item(CITY, oslo, PermissionLevel::View)]);
        let total = h.server.get(&data(CITY, "GetTotal")).authorization_bearer(one).await;
        assert_eq!(total.json::<usize>(), 1);
    }

    #[tokio::test]
    async fn test_find_requires_view() {
        let h = Harness::new().await;
        let oslo = h.id(CITY, "Oslo");
        let path = data(CITY, &format!("Find/{}", oslo));

        let found = h.server.get(&path).authorization_bearer(viewer(CITY)).await;
        assert_eq!(found.status_code(), StatusCode::OK);
        let body = found.json::<Value>();
        assert_eq!(body["name"], "Oslo");
        assert_eq!(body["dataType"], "City");
        assert_eq!(body["primaryKeyProperty"], "id");

        let denied = h.server.get(&path).authorization_bearer(viewer(COUNTRY)).await;
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_find_missing_and_unknown() {
        let h = Harness::new().await;

        let missing = h
            .server
            .get(&data(CITY, &format!("Find/{}", ItemId::new())))
            .authorization_bearer(admin())
            .await;
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let unknown = h
            .server
            .get(&data("Planet", &format!("Find/{}", ItemId::new())))
            .authorization_bearer(admin())
            .await;
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_update_and_page() {
        let h = Harness::new().await;

        let added = h.server.post(&data(COUNTRY, "Add")).authorization_bearer(admin()).await;
        assert_eq!(added.status_code(), StatusCode::CREATED);
        let mut view = added.json::<Value>();
        assert_eq!(view["name"], "");
        assert_eq!(view["cities"], "[...]");

        view["name"] = json!("Finland");
        view["epiIndex"] = json!(76.5);
        let updated = h
            .server
            .post(&data(COUNTRY, "Update"))
            .authorization_bearer(admin())
            .json(&view)
            .await;
        assert_eq!(updated.status_code(), StatusCode::OK);
        assert_eq!(updated.json::<Value>()["name"], "Finland");

        let page = h
            .server
            .post(&data(COUNTRY, "GetPage"))
            .authorization_bearer(admin())
            .json(&json!({ "search": "FIN", "page": 1, "rowsPerPage": 10 }))
            .await;
        let page = page.json::<Value>();
        assert_eq!(page["totalItems"], 1);
        assert_eq!(page["pageItems"][0]["name"], "Finland");
    }

    #[tokio::test]
    async fn test_update_rejections() {
        let h = Harness::new().await;
        let oslo = h.id(CITY, "Oslo");

        let too_long = json!({ "id": oslo, "name": "x".repeat(101) });
        let response = h
            .server
            .post(&data(CITY, "Update"))
            .authorization_bearer(admin())
            .json(&too_long)
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["error"], "validation_error");

        let stale = json!({ "id": oslo, "rowVersion": 7, "name": "Christiania" });
        let response = h
            .server
            .post(&data(CITY, "Update"))
            .authorization_bearer(admin())
            .json(&stale)
            .await;
        assert_eq!(response.status_code(), StatusCode::CONFLICT);

        let response = h
            .server
            .post(&data(CITY, "Update"))
            .authorization_bearer(viewer(CITY))
            .json(&json!({ "id": oslo, "name": "Christiania" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_placeholders_keep_stored_values() {
        let h = Harness::new().await;
        let oslo = h.id(CITY, "Oslo");

        let response = h
            .server
            .post(&data(CITY, "Update"))
            .authorization_bearer(admin())
            .json(&json!({ "id": oslo, "name": "[None]", "population": 700000 }))
            .await;
        let body = response.json::<Value>();
        assert_eq!(body["name"], "Oslo");
        assert_eq!(body["population"], 700000);
    }

    #[tokio::test]
    async fn test_remove_requires_all() {
        let h = Harness::new().await;
        let bergen = h.id(CITY, "Bergen");
        let path = data(CITY, &format!("Remove/{}", bergen));

        let editor = user_with("ed", &[Claim::for_type(CITY, PermissionLevel::Edit)]);
        let denied = h.server.post(&path).authorization_bearer(editor).await;
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);

        let removed = h.server.post(&path).authorization_bearer(admin()).await;
        assert_eq!(removed.status_code(), StatusCode::NO_CONTENT);

        let gone = h
            .server
            .get(&data(CITY, &format!("Find/{}", bergen)))
            .authorization_bearer(admin())
            .await;
        assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_remove_range_skips_missing() {
        let h = Harness::new().await;
        let oslo = h.id(CITY, "Oslo");

        let response = h
            .server
            .post(&data(CITY, "RemoveRange"))
            .authorization_bearer(admin())
            .json(&json!([oslo, ItemId::new()]))
            .await;
        assert_eq!(response.json::<Vec<ItemId>>(), vec![oslo]);
    }

    #[tokio::test]
    async fn test_remove_from_parent_deletes_child() {
        let h = Harness::new().await;

        let country = h.server.post(&data(COUNTRY, "Add")).authorization_bearer(admin()).await;
        let country_id = country.json::<Value>()["id"].as_str().unwrap().to_string();

        let city = h
            .server
            .post(&data(CITY, "Add"))
            .add_query_param("childProp", "country")
            .add_query_param("parentId", &country_id)
            .authorization_bearer(admin())
            .await;
        assert_eq!(city.status_code(), StatusCode::CREATED);
        let city = city.json::<Value>();
        assert_eq!(city["country"], json!(country_id));

        let removed = h
            .server
            .post(&data(CITY, &format!("RemoveFromParent/{}", city["id"].as_str().unwrap())))
            .add_query_param("childProp", "country")
            .authorization_bearer(admin())
            .await;
        assert_eq!(removed.json::<Value>(), json!({ "removed": true }));

        let total = h
            .server
            .get(&data(COUNTRY, &format!("GetChildTotal/{}", country_id)))
            .add_query_param("childProp", "cities")
            .authorization_bearer(admin())
            .await;
        assert_eq!(total.json::<usize>(), 0);
    }

    #[tokio::test]
    async fn test_deleting_child_operations_require_all() {
        let h = Harness::new().await;
        let norway = h.id(COUNTRY, "Norway");
        let oslo = h.id(CITY, "Oslo");
        let norwegian = h.id(AIRLINE, "Norwegian");
        let editor = user_with(
            "ed",
            &[
                Claim::for_type(COUNTRY, PermissionLevel::Edit),
                Claim::for_type(CITY, PermissionLevel::Edit),
                Claim::for_type(LEADER, PermissionLevel::Add),
                Claim::for_type(AIRLINE, PermissionLevel::Edit),
            ],
        );

        let removed = h
            .server
            .post(&data(CITY, &format!("RemoveFromParent/{}", oslo)))
            .add_query_param("childProp", "country")
            .authorization_bearer(editor.clone())
            .await;
        assert_eq!(removed.status_code(), StatusCode::FORBIDDEN);

        let unlinked = h
            .server
            .post(&data(COUNTRY, &format!("RemoveChildrenFromCollection/{}", norway)))
            .add_query_param("childProp", "cities")
            .authorization_bearer(editor.clone())
            .json(&json!([oslo]))
            .await;
        assert_eq!(unlinked.status_code(), StatusCode::FORBIDDEN);

        // join records go, the airline stays
        let unlinked = h
            .server
            .post(&data(COUNTRY, &format!("RemoveChildrenFromCollection/{}", norway)))
            .add_query_param("childProp", "airlines")
            .authorization_bearer(editor.clone())
            .json(&json!([norwegian]))
            .await;
        assert_eq!(unlinked.json::<Value>(), json!({ "count": 1 }));

        let added = h.server.post(&data(LEADER, "Add")).authorization_bearer(editor.clone()).await;
        let new_leader = added.json::<Value>()["id"].as_str().unwrap().to_string();
        let replaced = h
            .server
            .post(&data(LEADER, &format!("ReplaceChild/{}/{}", norway, new_leader)))
            .add_query_param("childProp", "country")
            .authorization_bearer(editor)
            .await;
        assert_eq!(replaced.status_code(), StatusCode::FORBIDDEN);

        let city = h
            .server
            .get(&data(CITY, &format!("Find/{}", oslo)))
            .authorization_bearer(admin())
            .await;
        assert_eq!(city.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_child_queries() {
        let h = Harness::new().await;
        let norway = h.id(COUNTRY, "Norway");
        let store = h.id(LEADER, "Jonas Gahr Støre");

        let leader = h
            .server
            .get(&data(COUNTRY, &format!("GetChildId/{}", norway)))
            .add_query_param("childProp", "leader")
            .authorization_bearer(admin())
            .await;
        assert_eq!(leader.json::<Option<ItemId>>(), Some(store));

        let page = h
            .server
            .post(&data(COUNTRY, &format!("GetChildPage/{}", norway)))
            .add_query_param("childProp", "cities")
            .authorization_bearer(admin())
            .json(&json!({ "sortBy": "name" }))
            .await;
        let page = page.json::<Value>();
        assert_eq!(page["totalItems"], 2);
        assert_eq!(page["pageItems"][0]["name"], "Bergen");
        assert_eq!(page["pageItems"][1]["name"], "Oslo");
    }

    #[tokio::test]
    async fn test_child_prop_errors() {
        let h = Harness::new().await;
        let norway = h.id(COUNTRY, "Norway");

        let unknown = h
            .server
            .get(&data(COUNTRY, &format!("GetChildTotal/{}", norway)))
            .add_query_param("childProp", "rivers")
            .authorization_bearer(admin())
            .await;
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);

        let blank = h
            .server
            .get(&data(COUNTRY, &format!("GetChildTotal/{}", norway)))
            .add_query_param("childProp", "")
            .authorization_bearer(admin())
            .await;
        assert_eq!(blank.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_replace_child_detaches_owned_leader() {
        let h = Harness::new().await;
        let norway = h.id(COUNTRY, "Norway");
        let store = h.id(LEADER, "Jonas Gahr Støre");

        let added = h.server.post(&data(LEADER, "Add")).authorization_bearer(admin()).await;
        let new_leader = added.json::<Value>()["id"].as_str().unwrap().to_string();

        let replaced = h
            .server
            .post(&data(LEADER, &format!("ReplaceChild/{}/{}", norway, new_leader)))
            .add_query_param("childProp", "country")
            .authorization_bearer(admin())
            .await;
        assert_eq!(replaced.status_code(), StatusCode::OK);
        assert_eq!(replaced.json::<Value>(), json!({ "displaced": store }));

        // Still referenced through its hometown, so only detached
        let previous = h
            .server
            .get(&data(LEADER, &format!("Find/{}", store)))
            .authorization_bearer(admin())
            .await;
        assert_eq!(previous.status_code(), StatusCode::OK);
        assert_eq!(previous.json::<Value>()["country"], "[None]");

        let leader = h
            .server
            .get(&data(COUNTRY, &format!("GetChildId/{}", norway)))
            .add_query_param("childProp", "leader")
            .authorization_bearer(admin())
            .await;
        assert_eq!(leader.json::<Value>(), json!(new_leader));
    }

    #[tokio::test]
    async fn test_collection_membership() {
        let h = Harness::new().await;
        let denmark = h.id(COUNTRY, "Denmark");
        let norwegian = h.id(AIRLINE, "Norwegian");
        let path = |action: &str| data(COUNTRY, &format!("{}/{}", action, denmark));

        let added = h
            .server
            .post(&path("AddChildrenToCollection"))
            .add_query_param("childProp", "airlines")
            .authorization_bearer(admin())
            .json(&json!([norwegian]))
            .await;
        assert_eq!(added.json::<Value>(), json!({ "count": 1 }));

        let total = h
            .server
            .get(&path("GetChildTotal"))
            .add_query_param("childProp", "airlines")
            .authorization_bearer(admin())
            .await;
        assert_eq!(total.json::<usize>(), 2);

        let removed = h
            .server
            .post(&path("RemoveChildrenFromCollection"))
            .add_query_param("childProp", "airlines")
            .authorization_bearer(admin())
            .json(&json!([norwegian]))
            .await;
        assert_eq!(removed.json::<Value>(), json!({ "count": 1 }));
    }

    #[tokio::test]
    async fn test_duplicate_copies_fields() {
        let h = Harness::new().await;
        let oslo = h.id(CITY, "Oslo");

        let copy = h
            .server
            .post(&data(CITY, &format!("Duplicate/{}", oslo)))
            .authorization_bearer(admin())
            .await;
        assert_eq!(copy.status_code(), StatusCode::CREATED);
        let copy = copy.json::<Value>();
        assert_eq!(copy["name"], "Oslo");
        assert_ne!(copy["id"], json!(oslo));

        let viewer_copy = h
            .server
            .post(&data(CITY, &format!("Duplicate/{}", oslo)))
            .authorization_bearer(viewer(CITY))
            .await;
        assert_eq!(viewer_copy.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_field_definitions() {
        let h = Harness::new().await;

        let response = h
            .server
            .get(&data(COUNTRY, "GetFieldDefinitions"))
            .authorization_bearer(viewer(COUNTRY))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(!response.json::<Vec<Value>>().is_empty());

        let response = h
            .server
            .get(&data(COUNTRY, "GetFieldDefinitions"))
            .authorization_bearer(user_with("nobody", &[]))
            .await;
        assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_oversized_page_is_rejected() {
        let h = Harness::new().await;

        let response = h
            .server
            .post(&data(CITY, "GetPage"))
            .authorization_bearer(admin())
            .json(&json!({ "page": 1, "rowsPerPage": 5000 }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

mod authorization_endpoints {
    use super::*;

    #[tokio::test]
    async fn test_authorize_reports_level() {
        let h = Harness::new().await;

        let response = h
            .server
            .get("/api/Authorization/Authorize")
            .add_query_param("dataType", COUNTRY)
            .add_query_param("operation", "edit")
            .authorization_bearer(viewer(COUNTRY))
            .await;
        assert_eq!(
            response.json::<Value>(),
            json!({
                "authorization": "unauthorized",
                "canShare": "",
                "username": "viewer",
                "isAdmin": false,
            })
        );

        let response = h
            .server
            .get("/api/Authorization/Authorize")
            .authorization_bearer(admin())
            .await;
        let body = response.json::<Value>();
        assert_eq!(body["authorization"], "authorized");
        assert_eq!(body["canShare"], "any");
        assert_eq!(body["isAdmin"], true);

        let owner = user_with("olga", &[Claim::for_type(COUNTRY, PermissionLevel::All)]);
        let response = h
            .server
            .get("/api/Authorization/Authorize")
            .add_query_param("dataType", COUNTRY)
            .authorization_bearer(owner)
            .await;
        assert_eq!(response.json::<Value>()["canShare"], "group");
    }

    #[tokio::test]
    async fn test_shareable_groups_come_from_token() {
        let h = Harness::new().await;
        let member = token(
            TokenClaims::new("gus", 600)
                .with_group("pilots")
                .with_group("crew")
                .with_group("pilots"),
        );

        let response = h
            .server
            .get("/api/Authorization/GetShareableGroupSubset")
            .authorization_bearer(member)
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.json::<Vec<String>>(), vec!["crew", "pilots"]);

        let loner = h
            .server
            .get("/api/Authorization/GetShareableGroupSubset")
            .authorization_bearer(user_with("lou", &[]))
            .await;
        assert!(loner.json::<Vec<String>>().is_empty());
    }

    #[tokio::test]
    async fn test_authorize_rejects_unknown_operation() {
        let h = Harness::new().await;

        let response = h
            .server
            .get("/api/Authorization/Authorize")
            .add_query_param("dataType", COUNTRY)
            .add_query_param("operation", "delete")
            .authorization_bearer(admin())
            .await;
        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_share_and_hide_with_user() {
        let h = Harness::new().await;
        let bob = user_with("bob", &[]);

        let before = h.server.get(&data(CITY, "GetTotal")).authorization_bearer(bob.clone()).await;
        assert_eq!(before.json::<usize>(), 0);

        let shared = h
            .server
            .post("/api/Authorization/ShareDataWithUser/bob/City")
            .add_query_param("operation", "view")
            .authorization_bearer(admin())
            .await;
        assert_eq!(shared.status_code(), StatusCode::OK);
        assert!(shared.json::<Value>()["response"].is_string());

        let after = h.server.get(&data(CITY, "GetTotal")).authorization_bearer(bob.clone()).await;
        assert_eq!(after.json::<usize>(), 4);

        let shares = h
            .server
            .get("/api/Authorization/GetCurrentShares/City")
            .authorization_bearer(admin())
            .await;
        assert_eq!(
            shares.json::<Value>(),
            json!([{ "type": "user", "name": "bob", "level": "view" }])
        );

        let hidden = h
            .server
            .post("/api/Authorization/HideDataFromUser/bob/City")
            .authorization_bearer(admin())
            .await;
        assert_eq!(hidden.status_code(), StatusCode::OK);

        let again = h
            .server
            .post("/api/Authorization/HideDataFromUser/bob/City")
            .authorization_bearer(admin())
            .await;
        assert_eq!(again.status_code(), StatusCode::NOT_FOUND);
        assert!(again.json::<Value>()["error"].is_string());

        let last = h.server.get(&data(CITY, "GetTotal")).authorization_bearer(bob).await;
        assert_eq!(last.json::<usize>(), 0);
    }

    #[tokio::test]
    async fn test_item_share_grants_one_item() {
        let h = Harness::new().await;
        let oslo = h.id(CITY, "Oslo");
        let owner = user_with("olga", &[Claim::for_item(CITY, oslo, PermissionLevel::All)]);

        let shared = h
            .server
            .post("/api/Authorization/ShareDataWithUser/bob/City")
            .add_query_param("operation", "edit")
            .add_query_param("id", oslo.to_string())
            .authorization_bearer(owner)
            .await;
        assert_eq!(shared.status_code(), StatusCode::OK);

        let bob = user_with("bob", &[]);
        let found = h
            .server
            .get(&data(CITY, &format!("Find/{}", oslo)))
            .authorization_bearer(bob.clone())
            .await;
        assert_eq!(found.status_code(), StatusCode::OK);

        let other = h.id(CITY, "Bergen");
        let denied = h
            .server
            .get(&data(CITY, &format!("Find/{}", other)))
            .authorization_bearer(bob)
            .await;
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_sharing_rules() {
        let h = Harness::new().await;
        let owner = || {
            token(
                TokenClaims::new("olga", 600)
                    .with_group("pilots")
                    .with_claim(&Claim::for_type(AIRLINE, PermissionLevel::All)),
            )
        };

        let all = h
            .server
            .post("/api/Authorization/ShareDataWithAll/Airline")
            .add_query_param("operation", "view")
            .authorization_bearer(owner())
            .await;
        assert_eq!(all.status_code(), StatusCode::FORBIDDEN);
        assert!(all.json::<Value>()["error"].is_string());

        let foreign_group = h
            .server
            .post("/api/Authorization/ShareDataWithGroup/crew/Airline")
            .add_query_param("operation", "view")
            .authorization_bearer(owner())
            .await;
        assert_eq!(foreign_group.status_code(), StatusCode::FORBIDDEN);

        let own_group = h
            .server
            .post("/api/Authorization/ShareDataWithGroup/pilots/Airline")
            .add_query_param("operation", "view")
            .authorization_bearer(owner())
            .await;
        assert_eq!(own_group.status_code(), StatusCode::OK);

        let editor = user_with("ed", &[Claim::for_type(AIRLINE, PermissionLevel::Edit)]);
        let not_owner = h
            .server
            .post("/api/Authorization/ShareDataWithUser/bob/Airline")
            .add_query_param("operation", "view")
            .authorization_bearer(editor.clone())
            .await;
        assert_eq!(not_owner.status_code(), StatusCode::FORBIDDEN);

        let listing = h
            .server
            .get("/api/Authorization/GetCurrentShares/Airline")
            .authorization_bearer(editor)
            .await;
        assert_eq!(listing.status_code(), StatusCode::FORBIDDEN);

        let member = token(TokenClaims::new("pia", 600).with_group("pilots"));
        let total = h.server.get(&data(AIRLINE, "GetTotal")).authorization_bearer(member).await;
        assert_eq!(total.json::<usize>(), 2);
    }

    #[tokio::test]
    async fn test_share_validation() {
        let h = Harness::new().await;

        let missing = h
            .server
            .post("/api/Authorization/ShareDataWithUser/bob/City")
            .authorization_bearer(admin())
            .await;
        assert_eq!(missing.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let none = h
            .server
            .post("/api/Authorization/ShareDataWithUser/bob/City")
            .add_query_param("operation", "none")
            .authorization_bearer(admin())
            .await;
        assert_eq!(none.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let unknown_item = h
            .server
            .post("/api/Authorization/ShareDataWithUser/bob/City")
            .add_query_param("operation", "view")
            .add_query_param("id", ItemId::new().to_string())
            .authorization_bearer(admin())
            .await;
        assert_eq!(unknown_item.status_code(), StatusCode::NOT_FOUND);
    }
}
