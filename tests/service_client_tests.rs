use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use rls_repair::client::{ReadQuery, ResourceClient, ServiceClient};
use rls_repair::config::RpcConfig;
use rls_repair::error::ClientError;
use rls_repair::executor::SqlExecutor;

const KEY: &str = "service-key";

fn client(server: &ServerGuard) -> ServiceClient {
    ServiceClient::new(&server.url(), KEY, Duration::from_secs(5), RpcConfig::default()).unwrap()
}

#[tokio::test]
async fn execute_posts_sql_to_rpc_endpoint() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/v1/rpc/exec_sql")
        .match_header("apikey", KEY)
        .match_header("authorization", "Bearer service-key")
        .match_body(Matcher::Json(json!({ "sql": "DROP POLICY p0 ON t;" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("null")
        .create_async()
        .await;

    let result = client(&server).execute("DROP POLICY p0 ON t;").await;

    assert_eq!(result, Ok(serde_json::Value::Null));
    mock.assert_async().await;
}

#[tokio::test]
async fn execute_uses_configured_function_and_parameter() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/v1/rpc/query")
        .match_body(Matcher::Json(json!({ "query": "SELECT 1;" })))
        .with_status(204)
        .create_async()
        .await;

    let rpc = RpcConfig {
        function: "query".to_string(),
        parameter: "query".to_string(),
    };
    let client = ServiceClient::new(&server.url(), KEY, Duration::from_secs(5), rpc).unwrap();

    assert!(client.execute("SELECT 1;").await.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn execute_error_carries_sqlstate() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/rest/v1/rpc/exec_sql")
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"code":"42710","details":null,"hint":null,"message":"policy \"users_select_fixed\" for table \"users\" already exists"}"#,
        )
        .create_async()
        .await;

    let err = client(&server).execute("CREATE POLICY ...;").await.unwrap_err();

    assert_eq!(err.code.as_deref(), Some("42710"));
    assert!(err.message.contains("already exists"));
}

#[tokio::test]
async fn execute_error_without_json_body_uses_status() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/rest/v1/rpc/exec_sql")
        .with_status(502)
        .create_async()
        .await;

    let err = client(&server).execute("SELECT 1;").await.unwrap_err();

    assert_eq!(err.code, None);
    assert!(err.message.contains("502"));
}

#[tokio::test]
async fn read_collection_sends_select_filters_and_limit() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/businesses")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("select".into(), "id, name".into()),
            Matcher::UrlEncoded("active".into(), "eq.true".into()),
            Matcher::UrlEncoded("limit".into(), "3".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":1,"name":"Cafe"},{"id":2,"name":"Bakery"}]"#)
        .create_async()
        .await;

    let query = ReadQuery::new("id, name").filter("active", "true").limit(3);
    let rows = client(&server).read_collection("businesses", &query).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["name"], "Bakery");
    mock.assert_async().await;
}

#[tokio::test]
async fn read_collection_surfaces_recursion_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/rest/v1/users")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"code":"42P17","details":null,"hint":null,"message":"infinite recursion detected in policy for relation \"users\""}"#,
        )
        .create_async()
        .await;

    let err = client(&server)
        .read_collection("users", &ReadQuery::new("id").limit(1))
        .await
        .unwrap_err();

    match err {
        ClientError::Query {
            status,
            message,
            code,
        } => {
            assert_eq!(status, 500);
            assert!(message.contains("infinite recursion"));
            assert_eq!(code.as_deref(), Some("42P17"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn insert_returns_created_record_and_delete_filters_by_id() {
    let mut server = Server::new_async().await;
    let insert = server
        .mock("POST", "/rest/v1/businesses")
        .match_header("prefer", "return=representation")
        .match_body(Matcher::PartialJson(json!({ "name": "Probe" })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"3f1c","name":"Probe"}]"#)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/rest/v1/businesses")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.3f1c".into()))
        .with_status(204)
        .create_async()
        .await;

    let client = client(&server);
    let record = client
        .insert_record("businesses", &json!({ "name": "Probe", "active": true }))
        .await
        .unwrap();
    client.delete_record("businesses", &record["id"]).await.unwrap();

    assert_eq!(record["id"], "3f1c");
    insert.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn insert_with_empty_representation_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/rest/v1/businesses")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let err = client(&server)
        .insert_record("businesses", &json!({ "name": "Probe" }))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn register_identity_reads_nested_or_top_level_user() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/v1/signup")
        .match_body(Matcher::PartialJson(json!({ "email": "a@example.com" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"t","user":{"id":"u-1","email":"a@example.com"}}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/v1/signup")
        .match_body(Matcher::PartialJson(json!({ "email": "b@example.com" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"u-2","email":"b@example.com","confirmation_sent_at":"2024-01-01T00:00:00Z"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/auth/v1/signup")
        .match_body(Matcher::PartialJson(json!({ "email": "c@example.com" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"user":null,"session":null}"#)
        .create_async()
        .await;

    let client = client(&server);

    let nested = client.register_identity("a@example.com", "secret").await.unwrap();
    let top_level = client.register_identity("b@example.com", "secret").await.unwrap();
    let missing = client.register_identity("c@example.com", "secret").await.unwrap();

    assert_eq!(nested.map(|identity| identity.id), Some("u-1".to_string()));
    assert_eq!(top_level.map(|identity| identity.id), Some("u-2".to_string()));
    assert_eq!(missing, None);
}

#[tokio::test]
async fn register_identity_failure_is_an_auth_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/v1/signup")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":429,"error_code":"over_email_send_rate_limit","msg":"email rate limit exceeded"}"#)
        .create_async()
        .await;

    let err = client(&server)
        .register_identity("a@example.com", "secret")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::Auth {
            status: 429,
            message: "email rate limit exceeded".to_string()
        }
    );
}
