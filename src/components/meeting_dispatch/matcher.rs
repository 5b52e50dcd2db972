use super::models::{CalendarEvent, Meeting, Participant};
use url::Url;

/// Outcome of correlating one fetched event with the persisted meetings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventMatch {
    /// Event carries no conferencing URL, so there is nothing to dispatch to
    NoConferencing,
    /// A persisted meeting disabled the bot for this occurrence
    Suppressed { identifier: String },
    /// Event is eligible for dispatch
    Eligible {
        identifier: String,
        /// Ids of persisted meetings tied to this occurrence
        connected_meeting_ids: Vec<i64>,
    },
}

/// Ensure the organizer appears in the participant list, synthesizing a
/// `noreply` entry when absent (case-insensitive email comparison).
pub fn normalize_participants(event: &CalendarEvent) -> Vec<Participant> {
    let mut participants = event.participants.clone();
    let organizer_email = event.organizer.email.to_lowercase();

    if !participants
        .iter()
        .any(|p| p.email.to_lowercase() == organizer_email)
    {
        participants.push(Participant::noreply(
            &event.organizer.email,
            event.organizer.name.as_deref(),
        ));
    }

    participants
}

/// Derive the stable unique identifier for a meeting URL. Microsoft Teams
/// URLs have no generic rule and yield nothing; everything else takes the
/// last non-empty path segment of the percent-decoded URL. Callers fall
/// back to the event's series UID when this returns `None`.
pub fn identifier_from_url(meeting_url: &str, provider: &str) -> Option<String> {
    if provider == "Microsoft Teams" {
        return None;
    }

    let decoded = urlencoding::decode(meeting_url).ok()?;
    let parsed = Url::parse(&decoded).ok()?;
    parsed
        .path()
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(|segment| segment.to_string())
}

/// Correlate one event with the persisted meetings for the current user.
/// Pure: no side effects, no provider calls.
pub fn match_event(event: &CalendarEvent, meetings: &[Meeting], user_email: &str) -> EventMatch {
    let conferencing_url = match &event.conferencing_url {
        Some(url) => url,
        None => return EventMatch::NoConferencing,
    };
    let provider = event.provider.as_deref().unwrap_or_default();

    let participants = normalize_participants(event);
    let participant_emails: Vec<String> =
        participants.iter().map(|p| p.email.to_lowercase()).collect();

    let identifier = identifier_from_url(conferencing_url, provider)
        .unwrap_or_else(|| event.ical_uid.clone());

    let user_email = user_email.to_lowercase();
    let suppressed = meetings.iter().any(|meeting| {
        meeting.disable_bot
            && meeting.calendar_uid == event.ical_uid
            && meeting.start_time == event.when.start_time
            && participant_emails.contains(&user_email)
    });
    if suppressed {
        return EventMatch::Suppressed { identifier };
    }

    let connected_meeting_ids = connected_meetings(event, meetings, &identifier)
        .map(|meeting| meeting.id)
        .collect();

    EventMatch::Eligible {
        identifier,
        connected_meeting_ids,
    }
}

/// Persisted meetings tied to this event: matched by identifier when one is
/// stored, by series UID otherwise, always at the same start time.
pub fn connected_meetings<'a>(
    event: &'a CalendarEvent,
    meetings: &'a [Meeting],
    identifier: &'a str,
) -> impl Iterator<Item = &'a Meeting> {
    meetings.iter().filter(move |meeting| {
        let id_matches = match &meeting.uniq_identifier {
            Some(stored) => stored == identifier,
            None => meeting.calendar_uid == event.ical_uid,
        };
        id_matches && meeting.start_time == event.when.start_time
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::meeting_dispatch::models::{
        BotStatus, EventWhen, OccurrenceType,
    };

    fn participant(email: &str, name: Option<&str>) -> Participant {
        Participant {
            email: email.to_string(),
            name: name.map(|n| n.to_string()),
            status: Some("yes".to_string()),
        }
    }

    fn event(url: Option<&str>) -> CalendarEvent {
        CalendarEvent {
            ical_uid: "uid-1".to_string(),
            title: "Weekly sync".to_string(),
            provider: Some("Generic".to_string()),
            conferencing_url: url.map(|u| u.to_string()),
            organizer: participant("organizer@acme.com", Some("Olivia")),
            participants: vec![participant("alice@acme.com", Some("Alice"))],
            when: EventWhen {
                start_time: 1_700_000_000,
                end_time: Some(1_700_003_600),
                start_timezone: "UTC".to_string(),
            },
        }
    }

    fn meeting(id: i64, uniq: Option<&str>) -> Meeting {
        Meeting {
            id,
            user_id: 7,
            calendar_uid: "uid-1".to_string(),
            master_cal_uid: None,
            event_url: "https://meet.example.com/abc/xyz123".to_string(),
            title: "Weekly sync".to_string(),
            participants: vec![],
            organizer: None,
            start_time: 1_700_000_000,
            end_time: Some(1_700_003_600),
            timezone: "UTC".to_string(),
            provider: "Generic".to_string(),
            disable_bot: false,
            occurrence_type: OccurrenceType::OneTime,
            uniq_identifier: uniq.map(|u| u.to_string()),
            bot_id: None,
            bot_status: BotStatus::NotAdded,
        }
    }

    #[test]
    fn test_identifier_from_generic_url() {
        assert_eq!(
            identifier_from_url("https://meet.example.com/abc/xyz123", "Generic"),
            Some("xyz123".to_string())
        );
    }

    #[test]
    fn test_identifier_percent_decodes_path() {
        assert_eq!(
            identifier_from_url("https://meet.example.com/j/abc%2D123", "Generic"),
            Some("abc-123".to_string())
        );
    }

    #[test]
    fn test_identifier_skips_trailing_slash() {
        assert_eq!(
            identifier_from_url("https://meet.example.com/abc/xyz123/", "Generic"),
            Some("xyz123".to_string())
        );
    }

    #[test]
    fn test_teams_urls_yield_nothing() {
        assert_eq!(
            identifier_from_url(
                "https://teams.microsoft.com/l/meetup-join/19%3ameeting",
                "Microsoft Teams"
            ),
            None
        );
    }

    #[test]
    fn test_identifier_falls_back_to_ical_uid() {
        let mut ev = event(Some("https://teams.microsoft.com/l/meetup-join/x"));
        ev.provider = Some("Microsoft Teams".to_string());
        match match_event(&ev, &[], "alice@acme.com") {
            EventMatch::Eligible { identifier, .. } => assert_eq!(identifier, "uid-1"),
            other => panic!("unexpected match outcome: {:?}", other),
        }
    }

    #[test]
    fn test_missing_conferencing_url_is_noop() {
        let ev = event(None);
        assert_eq!(match_event(&ev, &[], "alice@acme.com"), EventMatch::NoConferencing);
    }

    #[test]
    fn test_organizer_synthesized_once_with_noreply() {
        let ev = event(Some("https://meet.example.com/abc/xyz123"));
        let participants = normalize_participants(&ev);
        let organizer_entries: Vec<_> = participants
            .iter()
            .filter(|p| p.email.eq_ignore_ascii_case("organizer@acme.com"))
            .collect();
        assert_eq!(organizer_entries.len(), 1);
        assert_eq!(organizer_entries[0].status.as_deref(), Some("noreply"));
    }

    #[test]
    fn test_organizer_already_present_is_not_duplicated() {
        let mut ev = event(Some("https://meet.example.com/abc/xyz123"));
        ev.participants
            .push(participant("Organizer@ACME.com", Some("Olivia")));
        let participants = normalize_participants(&ev);
        assert_eq!(participants.len(), 2);
        assert!(participants.iter().all(|p| p.status.as_deref() != Some("noreply")));
    }

    #[test]
    fn test_disable_bot_meeting_suppresses_event() {
        let ev = event(Some("https://meet.example.com/abc/xyz123"));
        let mut suppressing = meeting(1, None);
        suppressing.disable_bot = true;
        match match_event(&ev, &[suppressing], "alice@acme.com") {
            EventMatch::Suppressed { identifier } => assert_eq!(identifier, "xyz123"),
            other => panic!("unexpected match outcome: {:?}", other),
        }
    }

    #[test]
    fn test_disable_bot_for_other_start_time_does_not_suppress() {
        let ev = event(Some("https://meet.example.com/abc/xyz123"));
        let mut other = meeting(1, None);
        other.disable_bot = true;
        other.start_time += 3600;
        assert!(matches!(
            match_event(&ev, &[other], "alice@acme.com"),
            EventMatch::Eligible { .. }
        ));
    }

    #[test]
    fn test_connected_by_identifier_and_by_calendar_uid() {
        let ev = event(Some("https://meet.example.com/abc/xyz123"));
        let by_identifier = meeting(1, Some("xyz123"));
        let by_uid = meeting(2, None);
        let wrong_identifier = meeting(3, Some("other"));
        let mut wrong_start = meeting(4, Some("xyz123"));
        wrong_start.start_time += 60;

        match match_event(
            &ev,
            &[by_identifier, by_uid, wrong_identifier, wrong_start],
            "alice@acme.com",
        ) {
            EventMatch::Eligible {
                connected_meeting_ids,
                ..
            } => assert_eq!(connected_meeting_ids, vec![1, 2]),
            other => panic!("unexpected match outcome: {:?}", other),
        }
    }
}
