//! End-to-end repository workflows over HTTP, with in-memory doubles
//! standing in for PostgreSQL and the Git gateway.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use common::TestServer;
use devhub_gateway::adapters::{GatewayOp, LocalStore, StoreOp};
use devhub_gateway::domain::ProjectId;
use devhub_gateway::error::StepError;
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn call(request: reqwest::RequestBuilder) -> (StatusCode, Value) {
    let response = tokio_test::assert_ok!(request.send().await);
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

async fn create(server: &TestServer, client: &reqwest::Client, project: i64, name: &str) -> (StatusCode, Value) {
    call(
        client
            .post(server.url(&format!("/api/v1/projects/{project}/repositories")))
            .json(&json!({"name": name, "description": "service code"})),
    )
    .await
}

#[tokio::test]
async fn create_links_local_row_and_remote_repository() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (status, body) = create(&server, &client, 3, "billing-api").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["project_id"], 3);
    assert_eq!(body["name"], "billing-api");
    assert_eq!(body["default_branch"], "main");
    let Some(remote_id) = body["remote_id"].as_str() else {
        panic!("repository should be linked: {body}");
    };
    assert!(server.gateway.repository(remote_id).is_some());
    assert_eq!(server.store.len().await, 1);

    let id = &body["id"];
    let (status, fetched) = call(client.get(server.url(&format!("/api/v1/repositories/{id}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);
}

#[tokio::test]
async fn remote_failure_rolls_back_the_local_row() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let (status, _) = create(&server, &client, 3, "web").await;
    assert_eq!(status, StatusCode::CREATED);
    server
        .gateway
        .fail_on(GatewayOp::CreateRepository, StepError::remote("gateway down"));

    let (status, body) = create(&server, &client, 3, "billing-api").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], 3002);
    let remaining = tokio_test::assert_ok!(server.store.count_repositories(ProjectId::new(3)).await);
    assert_eq!(remaining, 1);
    assert_eq!(server.gateway.call_count(GatewayOp::DeleteRepository), 0);
}

#[tokio::test]
async fn failed_compensation_is_reported_with_details() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    server
        .store
        .fail_on(StoreOp::SetRemoteId, StepError::local("disk full"));
    server
        .gateway
        .fail_on(GatewayOp::DeleteRepository, StepError::remote("gateway down"));

    let (status, body) = create(&server, &client, 3, "billing-api").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], 3004);
    let Some(details) = body["error"]["details"].as_array() else {
        panic!("details should list compensations: {body}");
    };
    let failed: Vec<&str> = details
        .iter()
        .filter(|c| c.get("error").is_some())
        .filter_map(|c| c["step"].as_str())
        .collect();
    assert_eq!(failed, ["create_remote_repository"]);
    // Local compensation still ran.
    assert!(server.store.is_empty().await);
    assert_eq!(server.gateway.repository_count(), 1);
}

#[tokio::test]
async fn invalid_and_conflicting_requests_have_no_effect() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (status, body) = create(&server, &client, 3, ".hidden").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
    assert!(server.gateway.calls().is_empty());

    let (status, _) = create(&server, &client, 3, "web").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = create(&server, &client, 3, "web").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 2003);
    assert_eq!(server.store.len().await, 1);
    assert_eq!(server.gateway.repository_count(), 1);
}

#[tokio::test]
async fn update_branch_and_delete_lifecycle() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let (_, created) = create(&server, &client, 4, "docs").await;
    let id = &created["id"];
    let Some(remote_id) = created["remote_id"].as_str().map(str::to_string) else {
        panic!("repository should be linked");
    };

    let (status, updated) = call(
        client
            .patch(server.url(&format!("/api/v1/repositories/{id}")))
            .json(&json!({"description": "user guide", "private": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "user guide");
    assert_eq!(updated["private"], true);
    let Some(remote) = server.gateway.repository(&remote_id) else {
        panic!("remote repository should exist");
    };
    assert!(remote.private);

    let (status, branch) = call(
        client
            .post(server.url(&format!("/api/v1/repositories/{id}/branches")))
            .json(&json!({"name": "release", "make_default": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(branch["name"], "release");
    assert_eq!(branch["repository"]["default_branch"], "release");
    assert!(server.gateway.branches(&remote_id).contains(&"release".to_string()));

    let (status, _) = call(client.delete(server.url(&format!("/api/v1/repositories/{id}")))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(server.gateway.repository(&remote_id).is_none());

    let (status, body) = call(client.get(server.url(&format!("/api/v1/repositories/{id}")))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], 2001);
}

#[tokio::test]
async fn failed_remote_delete_restores_the_row() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let (_, created) = create(&server, &client, 4, "infra").await;
    let id = &created["id"];
    server
        .gateway
        .fail_on(GatewayOp::DeleteRepository, StepError::remote("gateway down"));

    let (status, _) = call(client.delete(server.url(&format!("/api/v1/repositories/{id}")))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, restored) = call(client.get(server.url(&format!("/api/v1/repositories/{id}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["name"], "infra");
    assert_eq!(restored["remote_id"], created["remote_id"]);
}
