//! Integration tests for the portal HTTP client

mod common;

use common::{alice, client, signed_in};
use portal_core::CredentialStore;
use portal_http::client::directory::RoleType;
use portal_http::client::{ApiClient, ApiRequest, ClientError, ErrorKind, SessionAction};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_client_builder() {
    let client = ApiClient::builder()
        .base_url("http://localhost:8080/api/admin-center/")
        .user_agent("portal-tests")
        .build();

    assert!(client.is_ok());
    let client = client.unwrap();
    assert_eq!(client.base_url(), "http://localhost:8080/api/admin-center");
    assert_eq!(client.config().user_agent, "portal-tests");
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = ApiClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_client_builder_rejects_bad_header_name() {
    let result = ApiClient::builder()
        .base_url("http://localhost")
        .user_id_header("X User")
        .build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_credentials_are_injected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/processes"))
        .and(header("authorization", "Bearer T1"))
        .and(header("x-user-id", "u-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _listener) = client(&server, signed_in());
    let processes: Vec<Value> = client.get("processes").await.unwrap();
    assert!(processes.is_empty());
}

#[tokio::test]
async fn test_custom_user_id_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("x-operator", "u-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::builder()
        .base_url(server.uri())
        .user_id_header("X-Operator")
        .credentials(signed_in())
        .build()
        .unwrap();
    let body: Value = client.get("/me").await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_anonymous_request_has_no_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("hello")))
        .mount(&server)
        .await;

    let (client, _listener) = client(&server, CredentialStore::in_memory());
    let greeting: String = client.get("/public").await.unwrap();
    assert_eq!(greeting, "hello");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert!(requests[0].headers.get("x-user-id").is_none());
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Draft {
    process_key: String,
    version: u32,
}

#[tokio::test]
async fn test_json_verbs() {
    let server = MockServer::start().await;
    let draft = Draft {
        process_key: "leave".into(),
        version: 2,
    };
    for verb in ["POST", "PUT", "PATCH"] {
        Mock::given(method(verb))
            .and(path("/drafts/leave"))
            .and(body_json(json!({"processKey": "leave", "version": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&draft))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("DELETE"))
        .and(path("/drafts/leave"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _listener) = client(&server, signed_in());

    let created: Draft = client.post("/drafts/leave", &draft).await.unwrap();
    assert_eq!(created, draft);
    let updated: Draft = client.put("/drafts/leave", &draft).await.unwrap();
    assert_eq!(updated.version, 2);
    let patched: Draft = client.patch("/drafts/leave", &draft).await.unwrap();
    assert_eq!(patched.process_key, "leave");
    client.delete::<()>("/drafts/leave").await.unwrap();
}

#[tokio::test]
async fn test_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks"))
        .and(query_param("status", "OPEN"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
        .expect(1)
        .mount(&server)
        .await;

    #[derive(Serialize)]
    struct TaskQuery {
        status: &'static str,
        page: u32,
        assignee: Option<String>,
    }

    let (client, _listener) = client(&server, signed_in());
    let body: Value = client
        .get_with_query(
            "/tasks",
            &TaskQuery {
                status: "OPEN",
                page: 1,
                assignee: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_upload_and_download() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/processes/import"))
        .and(header("content-type", "application/xml"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"imported": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/processes/leave/export"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<bpmn/>".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _listener) = client(&server, signed_in());

    let imported: Value = client
        .upload("/processes/import", b"<bpmn/>".to_vec(), "application/xml")
        .await
        .unwrap();
    assert_eq!(imported["imported"], 1);

    let exported = client
        .download(ApiRequest::get("/processes/leave/export"))
        .await
        .unwrap();
    assert_eq!(&exported[..], b"<bpmn/>");
}

#[tokio::test]
async fn test_non_json_success_body_is_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let (client, _listener) = client(&server, signed_in());
    let body = client.send_value(ApiRequest::get("/health")).await.unwrap();
    assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn test_decode_error_is_not_a_session_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drafts/leave"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let (client, listener) = client(&server, signed_in());
    let err = client.get::<Draft>("/drafts/leave").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    assert_eq!(listener.count(), 0);
}

#[tokio::test]
async fn test_login_persists_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"username": "alice", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "T1",
            "refreshToken": "R1",
            "tokenType": "Bearer",
            "expiresIn": 3600,
            "user": serde_json::to_value(alice()).unwrap()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    let (client, _listener) = client(&server, store.clone());
    let response = client.login("alice", "secret").await.unwrap();

    assert_eq!(response.access_token, "T1");
    assert!(client.is_authenticated());
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));
    assert!(store.expires_at().is_some());
    assert_eq!(client.identity().unwrap().username, "alice");
    assert!(client.has_permission("process:design"));
    assert!(!client.has_permission("user:delete"));
}

#[tokio::test]
async fn test_rejected_login_keeps_existing_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Invalid username or password"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "T2"})))
        .expect(0)
        .mount(&server)
        .await;

    let store = signed_in();
    let (client, listener) = client(&server, store.clone());
    let err = client.login("alice", "wrong").await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Unauthenticated));
    assert_eq!(err.api().unwrap().message, "Invalid username or password");
    assert!(err.is_handled());
    assert_eq!(
        listener.actions(),
        vec![SessionAction::Notify {
            message: "Invalid username or password".into()
        }]
    );
    assert_eq!(store.access_token().as_deref(), Some("T1"));
    assert_eq!(store.refresh_token().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_login_with_unbounded_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "T1",
            "refreshToken": "R1",
            "expiresIn": i64::MAX
        })))
        .mount(&server)
        .await;

    let store = CredentialStore::in_memory();
    let (client, _listener) = client(&server, store.clone());
    client.login("alice", "secret").await.unwrap();

    assert!(client.is_authenticated());
    assert_eq!(store.expires_at(), None);
}

#[tokio::test]
async fn test_current_user_updates_stored_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "userId": "u-1",
            "username": "alice",
            "displayName": "Alice",
            "roles": ["DEVELOPER", "ADMIN"]
        })))
        .mount(&server)
        .await;

    let store = signed_in();
    let (client, _listener) = client(&server, store.clone());
    let user = client.current_user().await.unwrap();

    assert!(user.has_role("ADMIN"));
    assert_eq!(store.user().unwrap().display(), "Alice");
}

#[tokio::test]
async fn test_validate_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/validate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let (signed_in_client, _) = client(&server, signed_in());
    assert!(signed_in_client.validate_token().await.unwrap());

    // No token, no request
    let (anonymous, _) = client(&server, CredentialStore::in_memory());
    assert!(!anonymous.validate_token().await.unwrap());
}

#[tokio::test]
async fn test_directory_lists_accept_both_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/departments/tree"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "d-1", "name": "Engineering", "children": [{"id": "d-2", "name": "Platform"}]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/roles"))
        .and(query_param("type", "BU_BOUNDED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "r-1", "name": "Reviewer", "code": "REVIEWER", "type": "BU_BOUNDED"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/business-units"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/virtual-groups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 0})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/departments/search"))
        .and(query_param("keyword", "plat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (client, _listener) = client(&server, signed_in());
    let directory = client.directory();

    let tree = directory.department_tree().await.unwrap();
    assert_eq!(tree[0].children[0].name, "Platform");

    let roles = directory.roles(Some(RoleType::BuBounded)).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].role_type, RoleType::BuBounded);

    assert!(directory.business_units().await.unwrap().is_empty());
    assert!(directory.virtual_groups(None, None).await.unwrap().is_empty());
    assert!(directory.search_departments("plat").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_directory_detail_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/virtual-groups/g-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "g-7",
            "name": "Release managers",
            "type": "SYSTEM",
            "memberCount": 4
        })))
        .mount(&server)
        .await;

    let (client, _listener) = client(&server, signed_in());
    let group = client.directory().virtual_group("g-7").await.unwrap();
    assert_eq!(group.member_count, Some(4));
    assert_eq!(group.group_type.as_deref(), Some("SYSTEM"));
}

#[tokio::test]
async fn test_clones_share_the_coordinator() {
    let client = ApiClient::new("http://localhost").unwrap();
    let clone = client.clone();
    assert!(std::ptr::eq(
        client.refresh_coordinator(),
        clone.refresh_coordinator()
    ));

    let other = ApiClient::new("http://localhost").unwrap();
    assert!(!std::ptr::eq(
        client.refresh_coordinator(),
        other.refresh_coordinator()
    ));
}
