use super::{Messenger, ReminderMessage};
use crate::error::{messaging_error, BotResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack Web API client used for reminder delivery and name lookups
pub struct SlackMessenger {
    token: String,
    api_base: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<SlackUser>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    profile: Option<SlackProfile>,
}

#[derive(Debug, Deserialize)]
struct SlackProfile {
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackMessenger {
    pub fn new(token: String) -> Self {
        Self::with_api_base(token, SLACK_API_BASE.to_string())
    }

    pub fn with_api_base(token: String, api_base: String) -> Self {
        Self {
            token,
            api_base,
            client: Client::new(),
        }
    }

    async fn lookup_by_email(&self, email: &str) -> BotResult<SlackUser> {
        let url = format!("{}/users.lookupByEmail", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| messaging_error(&format!("Lookup request failed: {}", e)))?
            .json::<LookupResponse>()
            .await
            .map_err(|e| messaging_error(&format!("Failed to decode lookup response: {}", e)))?;

        if !response.ok {
            let reason = response.error.unwrap_or_else(|| "unknown".to_string());
            return Err(messaging_error(&format!(
                "Error fetching Slack user by email: {}",
                reason
            )));
        }

        response
            .user
            .ok_or_else(|| messaging_error("Lookup response missing user"))
    }

    /// Block-kit layout of one reminder message
    fn reminder_blocks(message: &ReminderMessage) -> Value {
        json!([
            { "type": "divider" },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*:bell: Upcoming Meeting :bell:*\n\n{}", message.intro_line),
                },
            },
            {
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!(
                        "*<{}|{}>*\n{} - {}  |  {}",
                        message.event_url,
                        message.title,
                        message.start_time,
                        message.end_time,
                        message.provider,
                    ),
                },
            },
            {
                "type": "actions",
                "elements": [
                    {
                        "type": "button",
                        "text": { "type": "plain_text", "text": "Join Video Call", "emoji": true },
                        "style": "primary",
                        "url": message.event_url,
                    },
                    {
                        "type": "button",
                        "text": { "type": "plain_text", "text": "Do not record", "emoji": true },
                        "style": "danger",
                        "value": "disable_bot",
                    },
                ],
            },
            {
                "type": "context",
                "elements": [
                    {
                        "type": "mrkdwn",
                        "text": format!(
                            "This call happens on {}. You will have meeting preparation available. Click on the meeting name for an early preview.",
                            message.provider
                        ),
                    },
                ],
            },
        ])
    }
}

#[async_trait]
impl Messenger for SlackMessenger {
    async fn lookup_user_id(&self, email: &str) -> BotResult<String> {
        Ok(self.lookup_by_email(email).await?.id)
    }

    async fn lookup_first_name(&self, email: &str) -> BotResult<String> {
        let user = self.lookup_by_email(email).await?;
        user.profile
            .and_then(|profile| profile.first_name)
            .ok_or_else(|| messaging_error(&format!("No first name on profile for {}", email)))
    }

    async fn post_reminder(&self, recipient_id: &str, message: &ReminderMessage) -> BotResult<()> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let body = json!({
            "channel": recipient_id,
            "blocks": Self::reminder_blocks(message),
            "text": "You have an upcoming meeting.",
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| messaging_error(&format!("postMessage request failed: {}", e)))?
            .json::<PostMessageResponse>()
            .await
            .map_err(|e| messaging_error(&format!("Failed to decode postMessage response: {}", e)))?;

        if !response.ok {
            let reason = response.error.unwrap_or_else(|| "unknown".to_string());
            return Err(messaging_error(&format!(
                "Error sending meeting reminder: {}",
                reason
            )));
        }

        Ok(())
    }
}
