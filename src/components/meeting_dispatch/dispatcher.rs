use super::models::{
    BotConfig, BotHandle, BotMetadata, CalendarEvent, DispatchRecord, Meeting, Participant, User,
};
use crate::components::cache_service::keys;
use crate::config::DEFAULT_BOT_NAME;
use crate::error::{calendar_error, BotResult};
use crate::providers::{BotProvider, CreateBotRequest, DispatchCache, MeetingRepository};
use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Seconds the bot joins ahead of the event start
const JOIN_PRE_ROLL_SECS: i64 = 30;

/// Transcription configuration for a conferencing provider. Zoom and Slack
/// calls get the high-accuracy profile, everything else meeting captions.
pub fn transcription_options(provider: &str) -> serde_json::Value {
    if provider == "Zoom Meeting" || provider == "Slack" {
        json!({
            "provider": "deepgram",
            "deepgram": {
                "model": "nova-2",
                "smart_format": true,
                "numerals": true,
            },
        })
    } else {
        json!({ "provider": "meeting_captions" })
    }
}

/// Event start expressed in the event's declared timezone, minus the
/// pre-roll, as an ISO-8601 instant for the bot provider
pub fn effective_start_time(start_epoch: i64, start_timezone: &str) -> BotResult<String> {
    let tz: Tz = start_timezone
        .parse()
        .map_err(|_| calendar_error(&format!("Unknown event timezone: {}", start_timezone)))?;

    let start = Utc
        .timestamp_opt(start_epoch, 0)
        .single()
        .ok_or_else(|| calendar_error(&format!("Invalid event start time: {}", start_epoch)))?;

    Ok((start.with_timezone(&tz) - Duration::seconds(JOIN_PRE_ROLL_SECS)).to_rfc3339())
}

/// The bot configuration governing a dispatch: the organizer's when the
/// organizer is a known user, otherwise the processed user's
pub fn effective_bot_config<'a>(
    organizer_email: &str,
    users: &'a [User],
    current_user: &'a User,
) -> (&'a BotConfig, &'a User) {
    let organizer_user = users
        .iter()
        .find(|candidate| candidate.email.eq_ignore_ascii_case(organizer_email));

    match organizer_user {
        Some(user) => (&user.bot_config, user),
        None => (&current_user.bot_config, current_user),
    }
}

/// Result of one successful dispatch
pub struct DispatchOutcome {
    pub bot: BotHandle,
    /// Connected meetings whose bot-id update was committed; only these get
    /// reminders this cycle
    pub updated_meetings: Vec<Meeting>,
}

/// Invokes the bot provider for an eligible event and records the result in
/// the cache and the meeting store
pub struct BotDispatcher {
    bot_provider: Arc<dyn BotProvider>,
    repository: Arc<dyn MeetingRepository>,
    cache: Arc<dyn DispatchCache>,
}

impl BotDispatcher {
    pub fn new(
        bot_provider: Arc<dyn BotProvider>,
        repository: Arc<dyn MeetingRepository>,
        cache: Arc<dyn DispatchCache>,
    ) -> Self {
        Self {
            bot_provider,
            repository,
            cache,
        }
    }

    /// Dispatch a bot to one event. Provider failures propagate to the
    /// caller without any cache write or persisted mutation.
    pub async fn dispatch(
        &self,
        event: &CalendarEvent,
        identifier: &str,
        connected_meetings: Vec<Meeting>,
        participants: &[Participant],
        users: &[User],
        current_user: &User,
    ) -> BotResult<DispatchOutcome> {
        let provider = event.provider.as_deref().unwrap_or_default();
        let conferencing_url = event
            .conferencing_url
            .as_deref()
            .ok_or_else(|| calendar_error("Event has no conferencing URL"))?;

        let (bot_config, _) = effective_bot_config(&event.organizer.email, users, current_user);
        let bot_name = bot_config
            .bot_name
            .clone()
            .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());

        let join_at = effective_start_time(event.when.start_time, &event.when.start_timezone)?;

        let request = CreateBotRequest {
            meeting_url: conferencing_url.to_string(),
            join_at: join_at.clone(),
            bot_name,
            transcription_options: transcription_options(provider),
        };

        let bot = self.bot_provider.create_bot(&request).await?;
        info!(
            bot_id = %bot.bot_id,
            identifier,
            title = %event.title,
            "Dispatched bot to meeting"
        );

        self.record_dispatch(event, identifier, &bot, &join_at, participants, users, current_user, &connected_meetings)
            .await;

        let updated_meetings = self.update_meetings(connected_meetings, &bot.bot_id).await;

        Ok(DispatchOutcome {
            bot,
            updated_meetings,
        })
    }

    /// Write the event gate and bot metadata. Cache failures are logged and
    /// swallowed: the bot is already dispatched, failing the event now would
    /// only cause a duplicate next cycle.
    #[allow(clippy::too_many_arguments)]
    async fn record_dispatch(
        &self,
        event: &CalendarEvent,
        identifier: &str,
        bot: &BotHandle,
        join_at: &str,
        participants: &[Participant],
        users: &[User],
        current_user: &User,
        connected_meetings: &[Meeting],
    ) {
        let record = DispatchRecord {
            bot_id: bot.bot_id.clone(),
            join_url: bot.join_url.clone(),
            event_last_checked_time: Utc::now().timestamp(),
        };

        match serde_json::to_string(&record) {
            Ok(payload) => {
                match self
                    .cache
                    .set_if_absent(&keys::event_gate(identifier), &payload, keys::EVENT_GATE_TTL_SECS)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(identifier, "Event gate was already set by a concurrent cycle");
                    }
                    Err(e) => warn!(identifier, "Failed to write event gate: {}", e),
                }
            }
            Err(e) => warn!(identifier, "Failed to serialize dispatch record: {}", e),
        }

        let participant_emails: Vec<String> =
            participants.iter().map(|p| p.email.to_lowercase()).collect();
        let user_ids: Vec<i64> = users
            .iter()
            .filter(|user| participant_emails.contains(&user.email.to_lowercase()))
            .map(|user| user.id)
            .collect();

        let (_, config_owner) = effective_bot_config(&event.organizer.email, users, current_user);
        let metadata = BotMetadata {
            user_id: config_owner.id,
            ical_uid: event.ical_uid.clone(),
            identifier: identifier.to_string(),
            title: event.title.clone(),
            provider: event.provider.clone().unwrap_or_default(),
            user_ids,
            last_start_time: event.when.start_time,
            event_start_time: join_at.to_string(),
            user_time_zone: event.when.start_timezone.clone(),
            participants: participants.to_vec(),
            organizer: event.organizer.clone(),
            meeting_ids: connected_meetings.iter().map(|m| m.id).collect(),
        };

        match serde_json::to_string(&metadata) {
            Ok(payload) => {
                if let Err(e) = self
                    .cache
                    .set(
                        &keys::bot_metadata(&bot.bot_id),
                        &payload,
                        keys::BOT_METADATA_TTL_SECS,
                    )
                    .await
                {
                    warn!(bot_id = %bot.bot_id, "Failed to write bot metadata: {}", e);
                }
            }
            Err(e) => warn!(bot_id = %bot.bot_id, "Failed to serialize bot metadata: {}", e),
        }
    }

    /// Persist the bot id on every connected meeting. A failed update drops
    /// that meeting from this cycle's reminders; the event gate is already
    /// set by now, so the retry only comes with a redispatch after the gate
    /// expires, and the still-unset reminder gate keeps it eligible then.
    async fn update_meetings(&self, connected_meetings: Vec<Meeting>, bot_id: &str) -> Vec<Meeting> {
        let mut updated = Vec::with_capacity(connected_meetings.len());

        for mut meeting in connected_meetings {
            match self.repository.set_meeting_bot(meeting.id, bot_id).await {
                Ok(()) => {
                    meeting.bot_id = Some(bot_id.to_string());
                    meeting.bot_status = super::models::BotStatus::Added;
                    updated.push(meeting);
                }
                Err(e) => {
                    warn!(
                        meeting_id = meeting.id,
                        "Failed to record bot id on meeting: {}", e
                    );
                }
            }
        }

        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_bot_name(id: i64, email: &str, bot_name: Option<&str>) -> User {
        User {
            id,
            email: email.to_string(),
            display_name: email.to_string(),
            grant_id: Some(format!("grant-{}", id)),
            bot_config: BotConfig {
                bot_name: bot_name.map(|n| n.to_string()),
                ..Default::default()
            },
            timezone: None,
        }
    }

    #[test]
    fn test_known_organizer_config_governs_dispatch() {
        let organizer = user_with_bot_name(8, "olivia@acme.com", Some("Olivia's Scribe"));
        let current = user_with_bot_name(7, "alice@acme.com", Some("Alice's Scribe"));
        let users = vec![current.clone(), organizer];

        let (config, owner) = effective_bot_config("Olivia@ACME.com", &users, &current);
        assert_eq!(config.bot_name.as_deref(), Some("Olivia's Scribe"));
        assert_eq!(owner.id, 8);
    }

    #[test]
    fn test_unknown_organizer_falls_back_to_current_user() {
        let current = user_with_bot_name(7, "alice@acme.com", Some("Alice's Scribe"));
        let users = vec![current.clone()];

        let (config, owner) = effective_bot_config("outsider@other.io", &users, &current);
        assert_eq!(config.bot_name.as_deref(), Some("Alice's Scribe"));
        assert_eq!(owner.id, 7);
    }

    #[test]
    fn test_zoom_selects_high_accuracy_profile() {
        let options = transcription_options("Zoom Meeting");
        assert_eq!(options["provider"], "deepgram");
        assert_eq!(options["deepgram"]["model"], "nova-2");
        assert_eq!(options["deepgram"]["smart_format"], true);
        assert_eq!(options["deepgram"]["numerals"], true);
    }

    #[test]
    fn test_slack_selects_high_accuracy_profile() {
        assert_eq!(transcription_options("Slack")["provider"], "deepgram");
    }

    #[test]
    fn test_other_providers_use_meeting_captions() {
        let options = transcription_options("Google Meet");
        assert_eq!(options["provider"], "meeting_captions");
        assert!(options.get("deepgram").is_none());
    }

    #[test]
    fn test_effective_start_applies_pre_roll_and_timezone() {
        // 2023-11-14 22:13:20 UTC
        let formatted = effective_start_time(1_700_000_000, "America/New_York").unwrap();
        // 17:13:20 EST minus the 30 second pre-roll
        assert_eq!(formatted, "2023-11-14T17:12:50-05:00");
    }

    #[test]
    fn test_effective_start_rejects_unknown_timezone() {
        assert!(effective_start_time(1_700_000_000, "Not/AZone").is_err());
    }
}
