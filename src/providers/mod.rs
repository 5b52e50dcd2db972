//! External collaborator boundary: the relational store, the calendar,
//! bot, and messaging providers, and the TTL'd dispatch cache. The core
//! only ever talks to these traits; concrete clients live in the
//! submodules and mocks live under `tests/`.

mod bot;
mod calendar;
mod postgres;
mod slack;

pub use bot::BotApiClient;
pub use calendar::CalendarApiClient;
pub use postgres::PostgresRepository;
pub use slack::SlackMessenger;

use crate::components::meeting_dispatch::models::{
    BotHandle, Calendar, CalendarEvent, Meeting, User,
};
use crate::error::BotResult;
use async_trait::async_trait;
use serde::Serialize;

/// Reads and the single permitted write against the persisted meeting store
#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// All users holding a calendar grant, i.e. eligible for a cycle
    async fn users_with_calendar_grant(&self) -> BotResult<Vec<User>>;

    /// Meetings for the given users whose occurrence falls inside the window
    /// (epoch-second bounds, inclusive)
    async fn meetings_in_window(
        &self,
        user_ids: &[i64],
        window_start: i64,
        window_end: i64,
    ) -> BotResult<Vec<Meeting>>;

    /// Record a successful dispatch on a meeting: bot id set, status ADDED
    async fn set_meeting_bot(&self, meeting_id: i64, bot_id: &str) -> BotResult<()>;
}

/// Read-only calendar provider access scoped by a user's grant
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Calendars visible through the grant; the first entry is primary
    async fn list_calendars(&self, grant_id: &str) -> BotResult<Vec<Calendar>>;

    /// Events on a calendar between the epoch-second bounds
    async fn list_events(
        &self,
        grant_id: &str,
        calendar_id: &str,
        start: i64,
        end: i64,
    ) -> BotResult<Vec<CalendarEvent>>;
}

/// Request handed to the bot provider when dispatching
#[derive(Debug, Clone, Serialize)]
pub struct CreateBotRequest {
    pub meeting_url: String,
    /// ISO-8601 join time (event start minus the pre-roll)
    pub join_at: String,
    pub bot_name: String,
    pub transcription_options: serde_json::Value,
}

/// The recording/transcription bot provider
#[async_trait]
pub trait BotProvider: Send + Sync {
    /// Dispatch a bot. Provider rejections surface as
    /// [`Error::BotRejected`](crate::error::Error::BotRejected) carrying the
    /// provider's structured detail; transport failures as
    /// [`Error::BotTransport`](crate::error::Error::BotTransport).
    async fn create_bot(&self, request: &CreateBotRequest) -> BotResult<BotHandle>;
}

/// A reminder message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub intro_line: String,
    pub title: String,
    pub event_url: String,
    /// Start time formatted in the recipient's timezone
    pub start_time: String,
    /// End time formatted in the recipient's timezone
    pub end_time: String,
    pub provider: String,
}

/// The messaging channel reminders are delivered through
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Resolve the channel-internal recipient id for an email address
    async fn lookup_user_id(&self, email: &str) -> BotResult<String>;

    /// Resolve a display first name for an email address
    async fn lookup_first_name(&self, email: &str) -> BotResult<String>;

    /// Deliver one reminder to a recipient
    async fn post_reminder(&self, recipient_id: &str, message: &ReminderMessage) -> BotResult<()>;
}

/// Key/value store with TTLs backing the idempotency gates. TTLs are always
/// seconds. Gate checks and sets are separate calls; `set_if_absent` is the
/// stronger primitive used for the event gate.
#[async_trait]
pub trait DispatchCache: Send + Sync {
    async fn get(&self, key: &str) -> BotResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> BotResult<()>;

    /// Atomically set the key only when absent; returns whether this call
    /// won the slot
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: u64) -> BotResult<bool>;
}
