//! Full binary runs against a mock identity and management endpoint

use assert_cmd::Command;
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::process::Output;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GROUP_PATH: &str = "/subscriptions/sub-1/resourcegroups/postgresql-sample";
const SERVER_PATH: &str =
    "/subscriptions/sub-1/resourceGroups/postgresql-sample/providers/Microsoft.DBforPostgreSQL/servers/rustrocks";

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

async fn mount_group(server: &MockServer, status: u16) {
    let body = if status < 300 {
        json!({"id": GROUP_PATH, "name": "postgresql-sample", "location": "westus"})
    } else {
        json!({"error": {"code": "AuthorizationFailed", "message": "no access"}})
    };
    Mock::given(method("PUT"))
        .and(path(GROUP_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(GROUP_PATH))
        .respond_with(ResponseTemplate::new(202))
        .mount(server)
        .await;
}

async fn mount_server(server: &MockServer, final_status: &str) {
    Mock::given(method("PUT"))
        .and(path(SERVER_PATH))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Azure-AsyncOperation", format!("{}/operations/op-1", server.uri())),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": final_status,
            "error": {"code": "InternalServerError", "message": "provisioning failed"}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(SERVER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": SERVER_PATH,
            "name": "rustrocks",
            "location": "westus",
            "properties": {
                "version": "11",
                "userVisibleState": "Ready",
                "fullyQualifiedDomainName": "rustrocks.postgres.database.azure.com"
            }
        })))
        .mount(server)
        .await;
}

/// Run the binary against `server` with the given extra arguments
async fn run_against(server: &MockServer, args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("pgprovision").unwrap();
    cmd.env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .env("PGPROVISION_CONFIG_FILE", dir.path().join("absent.toml"))
        .env("AZURE_TENANT_ID", "tenant-1")
        .env("AZURE_CLIENT_ID", "client-1")
        .env("AZURE_CLIENT_SECRET", "shh")
        .env("AZURE_SUBSCRIPTION_ID", "sub-1")
        .env("AZURE_AUTHORITY_HOST", server.uri())
        .env("AZURE_RESOURCE_MANAGER_URL", server.uri())
        .args(["--poll-interval-ms", "5"])
        .args(args);

    let output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap();
    drop(dir);
    output
}

#[tokio::test(flavor = "multi_thread")]
async fn test_success_prints_text_summary() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_group(&server, 201).await;
    mount_server(&server, "Succeeded").await;

    run_against(&server, &[])
        .await
        .assert()
        .success()
        .stdout(predicate::str::contains("Server:   rustrocks"))
        .stdout(predicate::str::contains(
            "Host:     rustrocks.postgres.database.azure.com",
        ))
        .stdout(predicate::str::contains("State:    Ready"))
        .stderr(predicate::str::contains("Create resource group..."))
        .stderr(predicate::str::contains("Create server..."))
        .stderr(predicate::str::contains("Delete resource group..."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_success_prints_json() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_group(&server, 200).await;
    mount_server(&server, "Succeeded").await;

    let output = run_against(&server, &["-o", "json"]).await;
    output.clone().assert().success();

    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["name"], "rustrocks");
    assert_eq!(
        body["properties"]["fullyQualifiedDomainName"],
        "rustrocks.postgres.database.azure.com"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_group_failure_still_reports_step() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_group(&server, 403).await;

    run_against(&server, &[])
        .await
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Create resource group..."))
        .stderr(predicate::str::contains(
            "Failed to create or update resource group",
        ))
        .stderr(predicate::str::contains("Create server...").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_failure_exits_one_after_cleanup() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_group(&server, 200).await;
    mount_server(&server, "Failed").await;

    run_against(&server, &[])
        .await
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Failed to create server"))
        .stderr(predicate::str::contains("provisioning failed"))
        .stderr(predicate::str::contains("Delete resource group..."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_quiet_hides_steps() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_group(&server, 200).await;
    mount_server(&server, "Succeeded").await;

    run_against(&server, &["--quiet"])
        .await
        .assert()
        .success()
        .stderr(predicate::str::contains("Create resource group...").not());
}
