use std::time::Duration;

use serde_json::json;
use studiosync_feishu::{
    Block, BlockConverter, DescendantPayload, DocumentPublisher, FeishuClient, TokenProvider,
};
use studiosync_shared::{AccessToken, Credential, DocumentHandle, DocumentTarget, StudioSyncError};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> FeishuClient {
    FeishuClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
}

fn credential() -> Credential {
    Credential {
        app_id: "cli_test".into(),
        app_secret: "secret".into(),
    }
}

#[tokio::test]
async fn test_acquire_token_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v3/tenant_access_token/internal/"))
        .and(body_json(json!({"app_id": "cli_test", "app_secret": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "msg": "ok",
            "tenant_access_token": "t-abc",
            "expire": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client(&server).acquire(&credential()).await.unwrap();
    assert_eq!(token.as_str(), "t-abc");
}

#[tokio::test]
async fn test_acquire_token_non_ok_code_with_http_200() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v3/tenant_access_token/internal/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 10014,
            "msg": "app secret invalid"
        })))
        .mount(&server)
        .await;

    let err = client(&server).acquire(&credential()).await.unwrap_err();
    assert!(matches!(err, StudioSyncError::Auth(_)));
}

#[tokio::test]
async fn test_acquire_token_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v3/tenant_access_token/internal/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server).acquire(&credential()).await.unwrap_err();
    assert!(matches!(err, StudioSyncError::Auth(_)));
}

#[tokio::test]
async fn test_acquire_token_unreachable() {
    // Nothing listens on port 9 of localhost.
    let client = FeishuClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = client.acquire(&credential()).await.unwrap_err();
    assert!(matches!(err, StudioSyncError::Auth(_)));
}

#[tokio::test]
async fn test_create_document() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wiki/v2/spaces/space42/nodes"))
        .and(header("Authorization", "Bearer t-abc"))
        .and(body_json(json!({
            "obj_type": "docx",
            "node_type": "origin",
            "title": "My chat"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"node": {"obj_token": "doxcnXYZ", "node_token": "wikcn1"}}
        })))
        .mount(&server)
        .await;

    let target = DocumentTarget {
        parent_folder_token: "space42".into(),
    };
    let handle = client(&server)
        .create(&AccessToken::new("t-abc"), &target, "My chat")
        .await
        .unwrap();
    assert_eq!(handle.object_token, "doxcnXYZ");
    assert_eq!(handle.root_block_id(), "doxcnXYZ");
}

#[tokio::test]
async fn test_create_document_escapes_folder_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wiki/v2/spaces/space%2F42%3Fx=1/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"node": {"obj_token": "doxcnXYZ"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let target = DocumentTarget {
        parent_folder_token: "space/42?x=1".into(),
    };
    let handle = client(&server)
        .create(&AccessToken::new("t-abc"), &target, "My chat")
        .await
        .unwrap();
    assert_eq!(handle.object_token, "doxcnXYZ");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_create_document_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wiki/v2/spaces/space42/nodes"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 131006,
            "msg": "permission denied"
        })))
        .mount(&server)
        .await;

    let target = DocumentTarget {
        parent_folder_token: "space42".into(),
    };
    let err = client(&server)
        .create(&AccessToken::new("t-abc"), &target, "My chat")
        .await
        .unwrap_err();
    match err {
        StudioSyncError::PlatformRejected { code, .. } => assert_eq!(code, 131006),
        other => panic!("expected PlatformRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_document_missing_token_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wiki/v2/spaces/space42/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
        .mount(&server)
        .await;

    let target = DocumentTarget {
        parent_folder_token: "space42".into(),
    };
    let err = client(&server)
        .create(&AccessToken::new("t-abc"), &target, "My chat")
        .await
        .unwrap_err();
    assert!(matches!(err, StudioSyncError::Transport(_)));
}

#[tokio::test]
async fn test_convert_markdown() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/docx/v1/documents/blocks/convert"))
        .and(header("Authorization", "Bearer t-abc"))
        .and(body_json(json!({"content_type": "markdown", "content": "---\nhi\n---\n"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "first_level_block_ids": ["b1", "b2"],
                "blocks": [
                    {"block_id": "b2", "block_type": 2, "text": {"elements": []}},
                    {"block_id": "b1", "block_type": 22, "divider": {}}
                ]
            }
        })))
        .mount(&server)
        .await;

    let converted = client(&server)
        .convert_markdown(&AccessToken::new("t-abc"), "---\nhi\n---\n")
        .await
        .unwrap();
    assert_eq!(converted.first_level_block_ids, vec!["b1", "b2"]);
    assert_eq!(converted.blocks.len(), 2);
    assert_eq!(converted.blocks[0].id(), Some("b2"));
}

#[tokio::test]
async fn test_write_descendants_targets_latest_revision() {
    let server = MockServer::start().await;

    let payload = DescendantPayload {
        index: 0,
        children_id: vec!["tmp-1".into()],
        descendants: vec![Block::text("tmp-1", "hello")],
    };

    Mock::given(method("POST"))
        .and(path("/docx/v1/documents/doxA/blocks/doxA/descendant"))
        .and(query_param("document_revision_id", "-1"))
        .and(header("Authorization", "Bearer t-abc"))
        .and(body_json(serde_json::to_value(&payload).unwrap()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let handle = DocumentHandle {
        object_token: "doxA".into(),
    };
    client(&server)
        .write(&AccessToken::new("t-abc"), &handle, handle.root_block_id(), &payload)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_write_token_cannot_override_revision() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(
            "/docx/v1/documents/dox%3Fdocument_revision_id=7/blocks/dox%3Fdocument_revision_id=7/descendant",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let payload = DescendantPayload {
        index: 0,
        children_id: vec![],
        descendants: vec![],
    };
    let handle = DocumentHandle {
        object_token: "dox?document_revision_id=7".into(),
    };
    client(&server)
        .write(&AccessToken::new("t-abc"), &handle, handle.root_block_id(), &payload)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("document_revision_id=-1"));
}

#[tokio::test]
async fn test_write_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/docx/v1/documents/doxA/blocks/doxA/descendant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1770001,
            "msg": "invalid param"
        })))
        .mount(&server)
        .await;

    let handle = DocumentHandle {
        object_token: "doxA".into(),
    };
    let payload = DescendantPayload {
        index: 0,
        children_id: vec![],
        descendants: vec![],
    };
    let result = client(&server)
        .write(&AccessToken::new("t-abc"), &handle, "doxA", &payload)
        .await;
    assert!(matches!(
        result,
        Err(StudioSyncError::PlatformRejected { code: 1770001, .. })
    ));
}
