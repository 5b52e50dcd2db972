use super::models::{Meeting, Participant, User};
use crate::components::cache_service::keys;
use crate::error::BotResult;
use crate::providers::{DispatchCache, Messenger, ReminderMessage};
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{info, warn};

/// Sends at most one reminder per (meeting, user) pair for the meetings a
/// successful dispatch just updated
pub struct ReminderNotifier {
    messenger: Arc<dyn Messenger>,
    cache: Arc<dyn DispatchCache>,
}

/// A non-recipient participant with a resolved display name
#[derive(Debug, Clone)]
struct NamedParticipant {
    name: String,
    domain: String,
}

/// Assemble the introductory sentence. `lead_name` is the organizer's first
/// name when the organizer is not the recipient; otherwise the first other
/// participant leads, defaulting to "Someone".
fn compose_intro(
    lead_name: Option<String>,
    others: &[NamedParticipant],
    recipient_domain: &str,
) -> String {
    let first_name = lead_name
        .or_else(|| others.first().map(|p| p.name.clone()))
        .unwrap_or_else(|| "Someone".to_string());

    // Group the other participants by email domain, preserving first-seen
    // order; the recipient's own domain never counts as external
    let mut domains: Vec<(String, usize)> = Vec::new();
    for participant in others {
        if participant.domain.eq_ignore_ascii_case(recipient_domain) {
            continue;
        }
        match domains.iter_mut().find(|(d, _)| *d == participant.domain) {
            Some((_, count)) => *count += 1,
            None => domains.push((participant.domain.clone(), 1)),
        }
    }

    let external_domains: Vec<&str> = domains
        .iter()
        .filter(|(_, count)| *count == 1)
        .map(|(domain, _)| domain.as_str())
        .collect();
    let external_info = match external_domains.first() {
        Some(first_domain) => format!(
            ", including {} external users from {}",
            external_domains.len(),
            first_domain
        ),
        None => String::new(),
    };

    let others_count = others.len().saturating_sub(1);
    if others_count > 0 {
        format!(
            "You have a meeting with {} and {} others{}.",
            first_name, others_count, external_info
        )
    } else {
        format!("You have a meeting with {}{}.", first_name, external_info)
    }
}

/// Epoch seconds rendered as a clock time in the recipient's timezone
fn format_in_timezone(epoch: i64, tz: Tz) -> String {
    match Utc.timestamp_opt(epoch, 0).single() {
        Some(instant) => instant.with_timezone(&tz).format("%I:%M %p").to_string(),
        None => String::new(),
    }
}

fn email_domain(email: &str) -> &str {
    email.split('@').nth(1).unwrap_or_default()
}

fn first_word(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or(name)
        .to_string()
}

impl ReminderNotifier {
    pub fn new(messenger: Arc<dyn Messenger>, cache: Arc<dyn DispatchCache>) -> Self {
        Self { messenger, cache }
    }

    /// Send reminders for every meeting updated by a dispatch, each gated by
    /// the reminder cache key. Failures are logged and never block siblings.
    pub async fn send_reminders(
        &self,
        meetings: &[Meeting],
        users: &[User],
        participants: &[Participant],
        organizer: &Participant,
    ) {
        for meeting in meetings {
            let gate = keys::reminder_gate(meeting.id, meeting.user_id);

            match self.cache.get(&gate).await {
                Ok(Some(_)) => {
                    info!(
                        meeting_id = meeting.id,
                        user_id = meeting.user_id,
                        "Reminder already sent, skipping"
                    );
                    continue;
                }
                Ok(None) => {}
                // Fail open: a cache fault means at worst a duplicate reminder
                Err(e) => warn!("Reminder gate read failed, assuming absent: {}", e),
            }

            let recipient = match users.iter().find(|user| user.id == meeting.user_id) {
                Some(user) => user,
                None => {
                    warn!(
                        meeting_id = meeting.id,
                        user_id = meeting.user_id,
                        "Meeting owner is not a known user, skipping reminder"
                    );
                    continue;
                }
            };

            if let Err(e) = self
                .send_one(meeting, recipient, participants, organizer)
                .await
            {
                warn!(
                    meeting_id = meeting.id,
                    user_id = meeting.user_id,
                    "Failed to send reminder: {}", e
                );
                continue;
            }

            if let Err(e) = self.cache.set(&gate, "1", keys::REMINDER_GATE_TTL_SECS).await {
                warn!(
                    meeting_id = meeting.id,
                    user_id = meeting.user_id,
                    "Failed to set reminder gate: {}", e
                );
            }
        }
    }

    async fn send_one(
        &self,
        meeting: &Meeting,
        recipient: &User,
        participants: &[Participant],
        organizer: &Participant,
    ) -> BotResult<()> {
        let intro_line = self
            .build_intro(recipient, participants, organizer)
            .await?;

        let tz: Tz = recipient
            .timezone
            .as_deref()
            .unwrap_or("UTC")
            .parse()
            .unwrap_or(chrono_tz::UTC);

        let start_time = format_in_timezone(meeting.start_time, tz);
        let end_time = format_in_timezone(meeting.end_time.unwrap_or(meeting.start_time), tz);

        let message = ReminderMessage {
            intro_line,
            title: meeting.title.clone(),
            event_url: meeting.event_url.clone(),
            start_time,
            end_time,
            provider: meeting.provider.clone(),
        };

        let recipient_id = self.messenger.lookup_user_id(&recipient.email).await?;
        self.messenger.post_reminder(&recipient_id, &message).await?;

        info!(
            meeting_id = meeting.id,
            user_id = recipient.id,
            "Sent meeting reminder"
        );

        Ok(())
    }

    /// Resolve display names (locally known names first, provider lookup as
    /// fallback) and compose the intro sentence
    async fn build_intro(
        &self,
        recipient: &User,
        participants: &[Participant],
        organizer: &Participant,
    ) -> BotResult<String> {
        let recipient_email = recipient.email.to_lowercase();

        let lead_name = if organizer.email.to_lowercase() != recipient_email {
            Some(match &organizer.name {
                Some(name) => first_word(name),
                None => self.messenger.lookup_first_name(&organizer.email).await?,
            })
        } else {
            None
        };

        let mut others = Vec::new();
        for participant in participants {
            if participant.email.to_lowercase() == recipient_email {
                continue;
            }
            let name = match &participant.name {
                Some(name) => first_word(name),
                None => self.messenger.lookup_first_name(&participant.email).await?,
            };
            others.push(NamedParticipant {
                name,
                domain: email_domain(&participant.email).to_string(),
            });
        }

        Ok(compose_intro(
            lead_name,
            &others,
            email_domain(&recipient.email),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, domain: &str) -> NamedParticipant {
        NamedParticipant {
            name: name.to_string(),
            domain: domain.to_string(),
        }
    }

    #[test]
    fn test_intro_with_organizer_lead() {
        let others = [named("Alice", "acme.com")];
        let intro = compose_intro(Some("Olivia".to_string()), &others, "acme.com");
        assert_eq!(intro, "You have a meeting with Olivia.");
    }

    #[test]
    fn test_intro_falls_back_to_first_participant() {
        let others = [named("Alice", "acme.com"), named("Bob", "acme.com")];
        let intro = compose_intro(None, &others, "acme.com");
        assert_eq!(intro, "You have a meeting with Alice and 1 others.");
    }

    #[test]
    fn test_intro_defaults_to_someone() {
        let intro = compose_intro(None, &[], "acme.com");
        assert_eq!(intro, "You have a meeting with Someone.");
    }

    #[test]
    fn test_intro_notes_single_member_external_domain() {
        let others = [named("Alice", "acme.com"), named("Eve", "other.io")];
        let intro = compose_intro(Some("Olivia".to_string()), &others, "acme.com");
        assert_eq!(
            intro,
            "You have a meeting with Olivia and 1 others, including 1 external users from other.io."
        );
    }

    #[test]
    fn test_intro_ignores_multi_member_external_domains() {
        let others = [
            named("Eve", "other.io"),
            named("Mallory", "other.io"),
            named("Alice", "acme.com"),
        ];
        let intro = compose_intro(None, &others, "acme.com");
        assert_eq!(intro, "You have a meeting with Eve and 2 others.");
    }

    #[test]
    fn test_intro_recipient_domain_is_never_external() {
        // A lone colleague from the recipient's own domain is not "external"
        let others = [named("Alice", "acme.com")];
        let intro = compose_intro(None, &others, "acme.com");
        assert_eq!(intro, "You have a meeting with Alice.");
    }

    #[test]
    fn test_format_in_timezone() {
        // 2023-11-14 22:13:20 UTC is 05:13 PM in New York
        let tz: Tz = "America/New_York".parse().unwrap();
        assert_eq!(format_in_timezone(1_700_000_000, tz), "05:13 PM");
    }

    #[test]
    fn test_first_word() {
        assert_eq!(first_word("Olivia Smith"), "Olivia");
        assert_eq!(first_word("Olivia"), "Olivia");
    }
}
