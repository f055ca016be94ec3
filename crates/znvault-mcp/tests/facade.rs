//! Secret tool behaviour against the in-memory backend.

#![allow(clippy::unwrap_used)]

use serde_json::{Map, Value, json};
use znvault_client::{
    BackendCall, BackendOp, Fault, MemoryBackend, NewSecret, Secret, SecretType,
};
use znvault_mcp::tools::{CREATE_SECRET, DECRYPT_SECRET, GET_SECRET, LIST_SECRETS};
use znvault_mcp::{SecretTools, ToolError, ValidationError};

fn new_secret(alias: &str, secret_type: SecretType, tags: &[&str]) -> NewSecret {
    let mut data = Map::new();
    data.insert("password".into(), json!(format!("pw-for-{alias}")));
    NewSecret {
        alias: alias.to_owned(),
        secret_type,
        sub_type: None,
        data,
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        expires_at: None,
    }
}

async fn tools_with(secrets: &[NewSecret]) -> (SecretTools<MemoryBackend>, Vec<Secret>) {
    let backend = MemoryBackend::new();
    let mut seeded = Vec::with_capacity(secrets.len());
    for s in secrets {
        seeded.push(backend.seed(s.clone()).await.unwrap());
    }
    (SecretTools::new(backend), seeded)
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

// ── get_secret ──────────────────────────────────────────────────────

#[tokio::test]
async fn alias_hit_returns_metadata_without_data() {
    let (tools, _) =
        tools_with(&[new_secret("api/production/db", SecretType::Credential, &[])]).await;

    let out = tools
        .call(GET_SECRET, &json!({"name": "api/production/db"}))
        .await;
    assert!(!out.is_error);
    let meta = parse(out.text());
    assert_eq!(meta["alias"], "api/production/db");
    assert_eq!(meta["type"], "credential");
    assert!(meta.get("data").is_none());

    assert_eq!(
        tools.backend().calls().await,
        vec![BackendCall::SecretByAlias("api/production/db".into())]
    );
}

#[tokio::test]
async fn id_is_tried_only_after_alias_fails() {
    let (tools, seeded) = tools_with(&[new_secret("svc/token", SecretType::Opaque, &[])]).await;
    let id = seeded[0].id.clone();

    let meta = tools.fetch_metadata(&json!({"name": id})).await.unwrap();
    assert_eq!(meta.alias, "svc/token");
    assert_eq!(
        tools.backend().calls().await,
        vec![
            BackendCall::SecretByAlias(id.clone()),
            BackendCall::SecretById(id),
        ]
    );
}

#[tokio::test]
async fn both_lookups_failing_reports_the_id_attempt() {
    let (tools, _) = tools_with(&[]).await;
    tools
        .backend()
        .fail(BackendOp::SecretByAlias, Fault::Unavailable)
        .await;

    let err = tools
        .fetch_metadata(&json!({"name": "no-such-secret"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
    assert_eq!(err.to_string(), r#"secret "no-such-secret" not found"#);

    let out = tools
        .call(GET_SECRET, &json!({"name": "no-such-secret"}))
        .await;
    assert!(out.is_error);
    assert!(!out.text().contains("unavailable"));
}

#[tokio::test]
async fn empty_name_never_reaches_backend() {
    let (tools, _) = tools_with(&[]).await;
    let out = tools.call(GET_SECRET, &json!({"name": ""})).await;
    assert!(out.is_error);
    assert!(out.text().starts_with("Error: invalid input:"));
    assert!(tools.backend().calls().await.is_empty());
}

#[tokio::test]
async fn dot_segment_names_never_reach_backend() {
    let (tools, _) = tools_with(&[new_secret("health", SecretType::Opaque, &[])]).await;
    for name in ["../../health", "api/../health", "%2e%2e/health"] {
        let err = tools
            .fetch_metadata(&json!({ "name": name }))
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ToolError::Validation(ValidationError::DotSegment { field: "name" })
            ),
            "{name}: {err}"
        );
    }
    assert!(tools.backend().calls().await.is_empty());
}

// ── decrypt_secret ──────────────────────────────────────────────────

#[tokio::test]
async fn empty_id_never_reaches_backend() {
    let (tools, _) = tools_with(&[new_secret("a", SecretType::Opaque, &[])]).await;
    for args in [json!({"id": ""}), json!({})] {
        let out = tools.call(DECRYPT_SECRET, &args).await;
        assert!(out.is_error);
        assert!(out.text().starts_with("Error: invalid input:"));
    }
    assert!(tools.backend().calls().await.is_empty());
}

#[tokio::test]
async fn dot_segment_ids_never_reach_backend() {
    let (tools, _) = tools_with(&[]).await;
    for id in ["..", ".", "%2E%2E"] {
        let out = tools.call(DECRYPT_SECRET, &json!({ "id": id })).await;
        assert!(out.is_error);
        assert!(out.text().contains("path segments"), "{}", out.text());
    }
    assert!(tools.backend().calls().await.is_empty());
}

#[tokio::test]
async fn decrypt_returns_data() {
    let (tools, seeded) =
        tools_with(&[new_secret("api/production/db", SecretType::Credential, &[])]).await;

    let out = tools
        .call(DECRYPT_SECRET, &json!({"id": seeded[0].id}))
        .await;
    assert!(!out.is_error);
    let payload = parse(out.text());
    assert_eq!(payload["id"], seeded[0].id.as_str());
    assert_eq!(payload["data"]["password"], "pw-for-api/production/db");
}

#[tokio::test]
async fn decrypt_does_not_resolve_aliases() {
    let (tools, _) =
        tools_with(&[new_secret("api/production/db", SecretType::Credential, &[])]).await;

    let out = tools
        .call(DECRYPT_SECRET, &json!({"id": "api/production/db"}))
        .await;
    assert!(out.is_error);
    assert_eq!(
        tools.backend().calls().await,
        vec![BackendCall::Decrypt("api/production/db".into())]
    );
}

#[tokio::test]
async fn decrypt_not_found_references_key_and_no_plaintext() {
    let (tools, _) = tools_with(&[new_secret("a", SecretType::Opaque, &[])]).await;

    let out = tools
        .call(DECRYPT_SECRET, &json!({"id": "not-a-real-key"}))
        .await;
    assert!(out.is_error);
    assert!(out.text().contains("not-a-real-key"));
    assert!(!out.text().contains("pw-for-"));
}

#[tokio::test]
async fn decrypt_permission_denial_is_backend_failure() {
    let (tools, seeded) = tools_with(&[new_secret("a", SecretType::Opaque, &[])]).await;
    tools
        .backend()
        .fail(BackendOp::Decrypt, Fault::Forbidden)
        .await;

    let err = tools
        .decrypt(&json!({"id": seeded[0].id}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "backend");
}

// ── list_secrets ────────────────────────────────────────────────────

#[tokio::test]
async fn list_second_page_of_fifteen() {
    let mut secrets: Vec<NewSecret> = (0..15)
        .map(|i| new_secret(&format!("cred/{i:02}"), SecretType::Credential, &[]))
        .collect();
    secrets.push(new_secret("setting/theme", SecretType::Setting, &[]));
    let (tools, _) = tools_with(&secrets).await;

    let page = tools
        .list(&json!({"type": "credential", "page": 2, "pageSize": 10}))
        .await
        .unwrap();
    assert_eq!(page.total, 15);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 10);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.items[0].alias, "cred/10");
}

#[tokio::test]
async fn list_items_never_carry_data() {
    let (tools, _) = tools_with(&[
        new_secret("a", SecretType::Opaque, &["prod"]),
        new_secret("b", SecretType::Setting, &["prod"]),
    ])
    .await;

    let out = tools.call(LIST_SECRETS, &json!({})).await;
    let result = parse(out.text());
    let items = result["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    for item in items {
        assert!(item.get("data").is_none());
    }
    assert!(!out.text().contains("pw-for-"));
}

#[tokio::test]
async fn list_page_size_out_of_range_makes_no_call() {
    let (tools, _) = tools_with(&[]).await;
    for bad in [0, 101] {
        let err = tools.list(&json!({"pageSize": bad})).await.unwrap_err();
        assert!(matches!(
            err,
            ToolError::Validation(ValidationError::OutOfRange {
                field: "pageSize",
                ..
            })
        ));
    }
    assert!(tools.backend().calls().await.is_empty());
}

#[tokio::test]
async fn list_filters_by_tags_and_prefix() {
    let (tools, _) = tools_with(&[
        new_secret("api/a", SecretType::Opaque, &["prod", "db"]),
        new_secret("api/b", SecretType::Opaque, &["prod"]),
        new_secret("web/c", SecretType::Opaque, &["prod", "db"]),
    ])
    .await;

    let page = tools
        .list(&json!({"aliasPrefix": "api/", "tags": ["db", "prod"]}))
        .await
        .unwrap();
    let aliases: Vec<_> = page.items.iter().map(|m| m.alias.as_str()).collect();
    assert_eq!(aliases, vec!["api/a"]);
}

#[tokio::test]
async fn list_backend_failure_is_envelope() {
    let (tools, _) = tools_with(&[]).await;
    tools.backend().fail(BackendOp::List, Fault::Timeout).await;
    let out = tools.call(LIST_SECRETS, &json!({})).await;
    assert!(out.is_error);
    assert!(out.text().starts_with("Error: "));
}

// ── create_secret ───────────────────────────────────────────────────

#[tokio::test]
async fn create_then_fetch_by_id_round_trips() {
    let (tools, _) = tools_with(&[]).await;

    let out = tools
        .call(
            CREATE_SECRET,
            &json!({
                "alias": "ci/deploy",
                "type": "credential",
                "subType": "ssh_key",
                "data": {"privateKey": "k"},
                "tags": ["ci"]
            }),
        )
        .await;
    assert!(!out.is_error);
    let created = parse(out.text());
    assert_eq!(created["success"], true);
    assert_eq!(created["version"], 1);
    assert!(created.get("data").is_none());

    let id = created["id"].as_str().unwrap();
    let meta = tools.fetch_metadata(&json!({"name": id})).await.unwrap();
    assert_eq!(meta.alias, "ci/deploy");
    assert_eq!(meta.secret_type, SecretType::Credential);
    assert_eq!(meta.version, 1);
}

#[tokio::test]
async fn create_with_empty_data_makes_no_call() {
    let (tools, _) = tools_with(&[]).await;
    let out = tools
        .call(
            CREATE_SECRET,
            &json!({"alias": "x", "type": "setting", "data": {}}),
        )
        .await;
    assert!(out.is_error);
    assert!(tools.backend().calls().await.is_empty());
}

#[tokio::test]
async fn create_alias_conflict_is_failure() {
    let (tools, _) = tools_with(&[new_secret("taken", SecretType::Opaque, &[])]).await;
    let err = tools
        .create(&json!({"alias": "taken", "type": "opaque", "data": {"k": "v"}}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "backend");
    assert!(err.to_string().contains("taken"));
}

#[tokio::test]
async fn repeated_validation_failures_match() {
    let (tools, _) = tools_with(&[]).await;
    let input = json!({"alias": "x", "type": "blob", "data": {"k": "v"}});
    let first = tools.call(CREATE_SECRET, &input).await;
    let second = tools.call(CREATE_SECRET, &input).await;
    assert_eq!(first, second);
}
