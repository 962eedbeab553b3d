//! Facade behavior over a scripted HTTP transport, plus `.env` resolution.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::StatusCode;
use parking_lot::Mutex;

use glint::model::message::CreateMessage;
use glint::model::Snowflake;
use glint::rest::{HttpRequest, HttpResponse, Transport};
use glint::{Client, Config, ErrorKind, FileUpload};

struct MockTransport {
    responses: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<(String, String, Option<Vec<u8>>)>>,
}

impl MockTransport {
    fn new(responses: Vec<(u16, &str)>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_owned()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        })
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, glint::Result<HttpResponse>> {
        self.requests.lock().push((
            request.method.to_string(),
            request.url.clone(),
            request.body.clone(),
        ));
        let (status, body) = self
            .responses
            .lock()
            .pop_front()
            .expect("transport called more times than scripted");
        Box::pin(async move {
            Ok(HttpResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers: http::HeaderMap::new(),
                body: body.into_bytes(),
            })
        })
    }
}

fn config() -> Config {
    Config::new("token")
}

#[tokio::test]
async fn gateway_bot_handshake_hits_the_canonical_url() {
    let transport = MockTransport::new(vec![(
        200,
        r#"{"url":"wss://gateway.discord.gg","shards":1,"session_start_limit":{"total":1000,"remaining":999,"reset_after":0,"max_concurrency":1}}"#,
    )]);
    let client = Client::with_transport(config(), transport.clone()).unwrap();

    let gateway = client.get_gateway_bot().await.unwrap();
    assert_eq!(gateway.url, "wss://gateway.discord.gg");
    assert_eq!(gateway.shards, 1);

    let requests = transport.requests.lock();
    assert_eq!(requests[0].0, "GET");
    assert_eq!(requests[0].1, "https://discord.com/api/v10/gateway/bot");
}

#[tokio::test]
async fn create_message_uploads_files_as_multipart() {
    let transport = MockTransport::new(vec![(
        200,
        r#"{"id":"2","channel_id":"1","content":"","type":0}"#,
    )]);
    let client = Client::with_transport(config(), transport.clone()).unwrap();

    let mut message = CreateMessage::default();
    message.content = Some("with a file".into());
    message.attachments.push(Default::default()); // id 0 -> files[0]
    client
        .create_message(
            Snowflake(1),
            message,
            vec![FileUpload {
                filename: "file.png".into(),
                content_type: "image/png".into(),
                data: b"DATA".to_vec(),
            }],
        )
        .await
        .unwrap();

    let requests = transport.requests.lock();
    let body = String::from_utf8(requests[0].2.clone().unwrap()).unwrap();
    assert!(body.contains("name=\"payload_json\""));
    assert!(body.contains("name=\"files[0]\"; filename=\"file.png\""));
    assert!(body.contains("DATA"));
}

#[tokio::test]
async fn create_message_rejects_mixed_attachment_ids() {
    let transport = MockTransport::new(vec![]);
    let client = Client::with_transport(config(), transport).unwrap();

    let mut message = CreateMessage::default();
    // a real attachment snowflake cannot index a one-element upload list
    message.attachments.push(glint::model::message::AttachmentDescriptor {
        id: Snowflake(41771983429993937),
        ..Default::default()
    });
    let err = client
        .create_message(
            Snowflake(1),
            message,
            vec![FileUpload {
                filename: "file.png".into(),
                content_type: "image/png".into(),
                data: b"DATA".to_vec(),
            }],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);
}

#[test]
fn env_chain_resolves_from_parent_directories() {
    use glint::env::{resolve_token_from, EnvOptions};

    let root = tempfile::tempdir().unwrap();
    let nested = root.path().join("services").join("bot");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(root.path().join(".env"), "DISCORD_TOKEN=from-root\n").unwrap();

    let token =
        resolve_token_from(&nested, "DISCORD_TOKEN", &EnvOptions::default()).unwrap();
    assert_eq!(token, "from-root");

    // the nearest file wins over an ancestor
    std::fs::write(nested.join(".env"), "DISCORD_TOKEN=from-nested\n").unwrap();
    let token =
        resolve_token_from(&nested, "DISCORD_TOKEN", &EnvOptions::default()).unwrap();
    assert_eq!(token, "from-nested");

    let missing = resolve_token_from(&nested, "OTHER_TOKEN", &EnvOptions::default());
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::NotFound);
}

#[cfg(unix)]
#[test]
fn owner_only_flag_rejects_lax_env_permissions() {
    use glint::env::{resolve_token_from, EnvOptions};
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().unwrap();
    let path = root.path().join(".env");
    std::fs::write(&path, "DISCORD_TOKEN=secret\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let options = EnvOptions {
        require_owner_only: true,
        ..Default::default()
    };
    let err = resolve_token_from(root.path(), "DISCORD_TOKEN", &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
    let token = resolve_token_from(root.path(), "DISCORD_TOKEN", &options).unwrap();
    assert_eq!(token, "secret");
}
