//! Bot provider client against a mocked HTTP server: request shape,
//! success decoding, and the two failure classes.

use meetscribe::components::meeting_dispatch::dispatcher::transcription_options;
use meetscribe::error::Error;
use meetscribe::providers::{BotApiClient, BotProvider, CreateBotRequest};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request() -> CreateBotRequest {
    CreateBotRequest {
        meeting_url: "https://meet.example.com/abc/xyz123".to_string(),
        join_at: "2023-11-14T17:12:50-05:00".to_string(),
        bot_name: "Meetscribe Notetaker".to_string(),
        transcription_options: transcription_options("Zoom Meeting"),
    }
}

#[tokio::test]
async fn test_create_bot_decodes_success_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/bot/"))
        .and(header("Authorization", "Token test-key"))
        .and(body_partial_json(json!({
            "meeting_url": "https://meet.example.com/abc/xyz123",
            "bot_name": "Meetscribe Notetaker",
            "join_at": "2023-11-14T17:12:50-05:00",
            "transcription_options": { "provider": "deepgram" },
            "automatic_leave": { "waiting_room_timeout": 530 },
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "bot-42",
            "join_url": "https://bot.example.com/join/bot-42",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BotApiClient::new(server.uri(), "test-key".to_string());
    let bot = client.create_bot(&request()).await.unwrap();

    assert_eq!(bot.bot_id, "bot-42");
    assert_eq!(
        bot.join_url.as_deref(),
        Some("https://bot.example.com/join/bot-42")
    );
}

#[tokio::test]
async fn test_rejection_surfaces_structured_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/bot/"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({ "detail": [{ "msg": "invalid url" }] })),
        )
        .mount(&server)
        .await;

    let client = BotApiClient::new(server.uri(), "test-key".to_string());
    let err = client.create_bot(&request()).await.unwrap_err();

    match err {
        Error::BotRejected { status, detail } => {
            assert_eq!(status, 422);
            assert_eq!(detail, "invalid url");
        }
        other => panic!("expected BotRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejection_without_json_body_uses_reason_phrase() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/bot/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = BotApiClient::new(server.uri(), "test-key".to_string());
    let err = client.create_bot(&request()).await.unwrap_err();

    match err {
        Error::BotRejected { status, detail } => {
            assert_eq!(status, 502);
            assert_eq!(detail, "Bad Gateway");
        }
        other => panic!("expected BotRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_provider_is_a_transport_error() {
    // Nothing listens on port 1
    let client = BotApiClient::new("http://127.0.0.1:1".to_string(), "test-key".to_string());
    let err = client.create_bot(&request()).await.unwrap_err();

    assert!(matches!(err, Error::BotTransport(_)));
}
