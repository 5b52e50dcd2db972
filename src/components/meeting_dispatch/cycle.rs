use super::dispatcher::BotDispatcher;
use super::matcher::{match_event, normalize_participants, EventMatch};
use super::models::{CalendarEvent, Meeting, User};
use super::reminder::ReminderNotifier;
use super::window::{compute_fetch_window, FetchWindow};
use crate::components::cache_service::keys;
use crate::error::{calendar_error, BotResult};
use crate::providers::{BotProvider, CalendarProvider, DispatchCache, MeetingRepository, Messenger};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One full dispatch pass over all connected users. Bulk fetch failures
/// abort the cycle; anything scoped to a single user or event is isolated.
pub struct DispatchCycle {
    repository: Arc<dyn MeetingRepository>,
    calendar: Arc<dyn CalendarProvider>,
    cache: Arc<dyn DispatchCache>,
    dispatcher: BotDispatcher,
    notifier: ReminderNotifier,
}

impl DispatchCycle {
    pub fn new(
        repository: Arc<dyn MeetingRepository>,
        calendar: Arc<dyn CalendarProvider>,
        bot_provider: Arc<dyn BotProvider>,
        messenger: Arc<dyn Messenger>,
        cache: Arc<dyn DispatchCache>,
    ) -> Self {
        let dispatcher = BotDispatcher::new(
            Arc::clone(&bot_provider),
            Arc::clone(&repository),
            Arc::clone(&cache),
        );
        let notifier = ReminderNotifier::new(Arc::clone(&messenger), Arc::clone(&cache));

        Self {
            repository,
            calendar,
            cache,
            dispatcher,
            notifier,
        }
    }

    /// Run one cycle: load users and meetings, then process each user
    /// independently
    pub async fn run(&self) -> BotResult<()> {
        let now = Utc::now().timestamp();
        let base = FetchWindow::base(now);

        let users = self.repository.users_with_calendar_grant().await?;
        if users.is_empty() {
            debug!("No users with a calendar grant, nothing to do");
            return Ok(());
        }

        let user_ids: Vec<i64> = users.iter().map(|user| user.id).collect();
        let meetings = self
            .repository
            .meetings_in_window(&user_ids, base.start, base.end)
            .await?;

        info!(
            users = users.len(),
            meetings = meetings.len(),
            "Starting dispatch cycle"
        );

        for user in &users {
            if let Err(e) = self.process_user(now, user, &users, &meetings).await {
                warn!(user = %user.email, "User processing failed: {}", e);
            }
        }

        Ok(())
    }

    async fn process_user(
        &self,
        now: i64,
        user: &User,
        users: &[User],
        meetings: &[Meeting],
    ) -> BotResult<()> {
        let grant_id = match user.grant_id.as_deref() {
            Some(grant_id) => grant_id,
            None => return Ok(()),
        };

        let window = match compute_fetch_window(now, &user.bot_config) {
            Some(window) => window,
            None => {
                debug!(user = %user.email, "Bot disabled for the whole window, skipping user");
                return Ok(());
            }
        };

        let calendars = self.calendar.list_calendars(grant_id).await?;
        let primary = calendars
            .first()
            .ok_or_else(|| calendar_error("Grant has no calendars"))?;

        let events = self
            .calendar
            .list_events(grant_id, &primary.id, window.start, window.end)
            .await?;

        for event in &events {
            if let Err(e) = self.process_event(event, user, users, meetings).await {
                warn!(
                    user = %user.email,
                    ical_uid = %event.ical_uid,
                    "Event processing failed: {}", e
                );
            }
        }

        Ok(())
    }

    async fn process_event(
        &self,
        event: &CalendarEvent,
        user: &User,
        users: &[User],
        meetings: &[Meeting],
    ) -> BotResult<()> {
        let (identifier, connected_meeting_ids) =
            match match_event(event, meetings, &user.email) {
                EventMatch::NoConferencing => return Ok(()),
                EventMatch::Suppressed { identifier } => {
                    debug!(identifier, "Bot disabled for this occurrence, skipping event");
                    return Ok(());
                }
                EventMatch::Eligible {
                    identifier,
                    connected_meeting_ids,
                } => (identifier, connected_meeting_ids),
            };

        // Event gate: presence means another cycle already dispatched.
        // A cache fault reads as absent, so we fail open toward re-dispatch.
        let gate_present = match self.cache.get(&keys::event_gate(&identifier)).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                warn!(identifier, "Event gate read failed, assuming absent: {}", e);
                false
            }
        };
        if gate_present {
            debug!(identifier, "Bot already dispatched for this occurrence");
            return Ok(());
        }

        let connected_meetings: Vec<Meeting> = meetings
            .iter()
            .filter(|meeting| connected_meeting_ids.contains(&meeting.id))
            .cloned()
            .collect();
        let participants = normalize_participants(event);

        let outcome = self
            .dispatcher
            .dispatch(event, &identifier, connected_meetings, &participants, users, user)
            .await?;

        self.notifier
            .send_reminders(
                &outcome.updated_meetings,
                users,
                &participants,
                &event.organizer,
            )
            .await;

        Ok(())
    }
}
