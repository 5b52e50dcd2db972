use serde::{Deserialize, Serialize};

/// A user whose calendar may be watched for dispatchable meetings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    /// Opaque calendar credential handle; `None` means "not connected"
    pub grant_id: Option<String>,
    pub bot_config: BotConfig,
    /// IANA timezone name used when formatting reminder times
    pub timezone: Option<String>,
}

/// Per-user bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    pub bot_name: Option<String>,
    #[serde(default)]
    pub is_disabled: bool,
    /// Start of the disabled window, epoch seconds
    pub start_time: Option<i64>,
    /// End of the disabled window, epoch seconds
    pub end_time: Option<i64>,
}

/// Bot lifecycle state on a persisted meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotStatus {
    NotAdded,
    Added,
    Removed,
}

impl Default for BotStatus {
    fn default() -> Self {
        BotStatus::NotAdded
    }
}

/// Whether a persisted meeting is a single occurrence or part of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceType {
    OneTime,
    Recurring,
}

/// A persisted meeting occurrence. Created and deleted by the external
/// calendar sync; the dispatcher only ever sets `bot_id`/`bot_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub user_id: i64,
    /// Provider-stable id for this occurrence's series
    pub calendar_uid: String,
    pub master_cal_uid: Option<String>,
    pub event_url: String,
    pub title: String,
    pub participants: Vec<Participant>,
    pub organizer: Option<Participant>,
    /// Start time, epoch seconds
    pub start_time: i64,
    /// End time, epoch seconds
    pub end_time: Option<i64>,
    pub timezone: String,
    pub provider: String,
    pub disable_bot: bool,
    #[serde(rename = "type")]
    pub occurrence_type: OccurrenceType,
    /// Derived idempotency identifier; `None` until first derivation is stored
    pub uniq_identifier: Option<String>,
    pub bot_id: Option<String>,
    pub bot_status: BotStatus,
}

/// A meeting participant or organizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Participant {
    /// Synthesized entry for an organizer missing from the participant list
    pub fn noreply(email: &str, name: Option<&str>) -> Self {
        Self {
            email: email.to_string(),
            name: name.map(|n| n.to_string()),
            status: Some("noreply".to_string()),
        }
    }
}

/// A calendar known to the calendar provider; the first listed is primary
#[derive(Debug, Clone, Deserialize)]
pub struct Calendar {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One event fetched from the calendar provider for the current cycle.
/// Never persisted; decoded strictly at the provider boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub ical_uid: String,
    pub title: String,
    /// Conferencing provider name, e.g. "Zoom Meeting"
    pub provider: Option<String>,
    /// Conferencing join URL; events without one carry no bot target
    pub conferencing_url: Option<String>,
    pub organizer: Participant,
    pub participants: Vec<Participant>,
    pub when: EventWhen,
}

/// Occurrence window of a calendar event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventWhen {
    /// Epoch seconds
    pub start_time: i64,
    /// Epoch seconds
    pub end_time: Option<i64>,
    /// IANA name of the event's declared start timezone
    pub start_timezone: String,
}

/// Successful bot-provider response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotHandle {
    pub bot_id: String,
    pub join_url: Option<String>,
}

/// Payload stored under the event gate key once a bot has been dispatched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub bot_id: String,
    pub join_url: Option<String>,
    /// Epoch seconds of the cycle that dispatched the bot
    pub event_last_checked_time: i64,
}

/// Snapshot stored under `botmeta:{bot_id}` for downstream consumers,
/// e.g. a disable-bot action triggered from a reminder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotMetadata {
    /// Organizer's user id when the organizer is a known user, else the
    /// processed user's id
    pub user_id: i64,
    pub ical_uid: String,
    pub identifier: String,
    pub title: String,
    pub provider: String,
    /// Ids of every known user appearing in the participant list
    pub user_ids: Vec<i64>,
    /// Epoch seconds of the occurrence as last observed
    pub last_start_time: i64,
    /// ISO-8601 join time handed to the bot provider
    pub event_start_time: String,
    pub user_time_zone: String,
    pub participants: Vec<Participant>,
    pub organizer: Participant,
    /// Persisted meeting ids connected to this dispatch
    pub meeting_ids: Vec<i64>,
}
