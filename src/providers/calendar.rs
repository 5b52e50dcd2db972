use super::CalendarProvider;
use crate::components::meeting_dispatch::models::{
    Calendar, CalendarEvent, EventWhen, Participant,
};
use crate::error::{calendar_error, BotResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// HTTP client for the calendar provider API
pub struct CalendarApiClient {
    api_key: String,
    api_uri: String,
    client: Client,
}

/// Wire shape of a provider event. Decoded strictly here so missing fields
/// fail fast with a decoding error instead of surfacing deep in matching.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    ical_uid: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    conferencing: Option<WireConferencing>,
    organizer: WireParticipant,
    #[serde(default)]
    participants: Vec<WireParticipant>,
    when: WireWhen,
}

#[derive(Debug, Deserialize)]
struct WireConferencing {
    provider: String,
    #[serde(default)]
    details: Option<WireConferencingDetails>,
}

#[derive(Debug, Deserialize)]
struct WireConferencingDetails {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireParticipant {
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireWhen {
    start_time: i64,
    #[serde(default)]
    end_time: Option<i64>,
    #[serde(default = "default_timezone")]
    start_timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Deserialize)]
struct WireList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl From<WireParticipant> for Participant {
    fn from(wire: WireParticipant) -> Self {
        Participant {
            email: wire.email,
            name: wire.name,
            status: wire.status,
        }
    }
}

impl From<WireEvent> for CalendarEvent {
    fn from(wire: WireEvent) -> Self {
        let (provider, conferencing_url) = match wire.conferencing {
            Some(conf) => (
                Some(conf.provider),
                conf.details.and_then(|details| details.url),
            ),
            None => (None, None),
        };

        CalendarEvent {
            ical_uid: wire.ical_uid,
            title: wire.title.unwrap_or_default(),
            provider,
            conferencing_url,
            organizer: wire.organizer.into(),
            participants: wire.participants.into_iter().map(Into::into).collect(),
            when: EventWhen {
                start_time: wire.when.start_time,
                end_time: wire.when.end_time,
                start_timezone: wire.when.start_timezone,
            },
        }
    }
}

impl CalendarApiClient {
    pub fn new(api_key: String, api_uri: String) -> Self {
        Self {
            api_key,
            api_uri,
            client: Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        grant_id: &str,
        query: &[(&str, String)],
    ) -> BotResult<T> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Calendar-Grant", grant_id)
            .query(query)
            .send()
            .await
            .map_err(|e| calendar_error(&format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(calendar_error(&format!(
                "HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| calendar_error(&format!("Failed to decode response: {}", e)))
    }
}

#[async_trait]
impl CalendarProvider for CalendarApiClient {
    async fn list_calendars(&self, grant_id: &str) -> BotResult<Vec<Calendar>> {
        let url = format!("{}/calendars", self.api_uri);
        let list: WireList<Calendar> = self.get_json(&url, grant_id, &[]).await?;
        Ok(list.data)
    }

    async fn list_events(
        &self,
        grant_id: &str,
        calendar_id: &str,
        start: i64,
        end: i64,
    ) -> BotResult<Vec<CalendarEvent>> {
        let url = format!("{}/events", self.api_uri);
        let query = [
            ("calendarId", calendar_id.to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
        ];
        let list: WireList<WireEvent> = self.get_json(&url, grant_id, &query).await?;
        Ok(list.data.into_iter().map(Into::into).collect())
    }
}
