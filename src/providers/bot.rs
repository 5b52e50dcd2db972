use super::{BotProvider, CreateBotRequest};
use crate::components::meeting_dispatch::models::BotHandle;
use crate::error::{BotResult, Error};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// Greeting posted to the meeting chat when the bot joins
const JOIN_GREETING: &str =
    "Hello! I am a virtual assistant that will be taking notes during this call.";

/// Seconds of silence before the bot leaves on its own
const SILENCE_TIMEOUT_SECS: u32 = 300;
/// Seconds after join before silence detection activates
const SILENCE_ACTIVATE_AFTER_SECS: u32 = 400;
/// Hard cap on time spent in a waiting room
const WAITING_ROOM_TIMEOUT_SECS: u32 = 530;

/// HTTP client for the bot provider API
pub struct BotApiClient {
    api_base: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct WireBot {
    id: String,
    #[serde(default)]
    join_url: Option<String>,
}

impl BotApiClient {
    pub fn new(api_base: String, api_key: String) -> Self {
        Self {
            api_base,
            api_key,
            client: Client::new(),
        }
    }

    fn request_body(&self, request: &CreateBotRequest) -> Value {
        json!({
            "transcription_options": request.transcription_options,
            "chat": {
                "on_bot_join": {
                    "send_to": "everyone",
                    "message": JOIN_GREETING,
                }
            },
            "automatic_leave": {
                "silence_detection": {
                    "timeout": SILENCE_TIMEOUT_SECS,
                    "activate_after": SILENCE_ACTIVATE_AFTER_SECS,
                },
                "bot_detection": {
                    "using_participant_events": {
                        "timeout": SILENCE_TIMEOUT_SECS,
                        "activate_after": SILENCE_ACTIVATE_AFTER_SECS,
                    }
                },
                "waiting_room_timeout": WAITING_ROOM_TIMEOUT_SECS,
            },
            "meeting_url": request.meeting_url,
            "bot_name": request.bot_name,
            "join_at": request.join_at,
        })
    }
}

/// Pull the provider's structured failure reason out of an error body.
/// `detail` may be a plain string or a list of `{ "msg": ... }` entries;
/// anything else falls back to the HTTP reason phrase.
fn rejection_detail(body: &str, reason_phrase: &str) -> String {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return reason_phrase.to_string(),
    };

    match parsed.get("detail") {
        Some(Value::String(detail)) => detail.clone(),
        Some(Value::Array(entries)) => entries
            .first()
            .and_then(|entry| entry.get("msg"))
            .and_then(|msg| msg.as_str())
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| reason_phrase.to_string()),
        _ => reason_phrase.to_string(),
    }
}

#[async_trait]
impl BotProvider for BotApiClient {
    async fn create_bot(&self, request: &CreateBotRequest) -> BotResult<BotHandle> {
        let url = format!("{}/v1/bot/", self.api_base);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| Error::BotTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown error");
            let body = response.text().await.unwrap_or_default();
            return Err(Error::BotRejected {
                status: status.as_u16(),
                detail: rejection_detail(&body, reason),
            });
        }

        let bot: WireBot = response
            .json()
            .await
            .map_err(|e| Error::BotTransport(format!("Failed to decode response: {}", e)))?;

        Ok(BotHandle {
            bot_id: bot.id,
            join_url: bot.join_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_from_message_list() {
        let body = r#"{"detail":[{"msg":"invalid url"}]}"#;
        assert_eq!(rejection_detail(body, "Unprocessable Entity"), "invalid url");
    }

    #[test]
    fn test_detail_from_plain_string() {
        let body = r#"{"detail":"meeting already ended"}"#;
        assert_eq!(rejection_detail(body, "Conflict"), "meeting already ended");
    }

    #[test]
    fn test_detail_falls_back_to_reason_phrase() {
        assert_eq!(rejection_detail("not json", "Bad Gateway"), "Bad Gateway");
        assert_eq!(rejection_detail(r#"{"error":"x"}"#, "Bad Gateway"), "Bad Gateway");
        assert_eq!(rejection_detail(r#"{"detail":[]}"#, "Bad Gateway"), "Bad Gateway");
    }
}
