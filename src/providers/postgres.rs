use super::MeetingRepository;
use crate::components::meeting_dispatch::models::{
    BotConfig, BotStatus, Meeting, OccurrenceType, Participant, User,
};
use crate::error::{repository_error, BotResult};
use async_trait::async_trait;
use serde_json::Value;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, warn};

/// Postgres-backed meeting/user store adapter
pub struct PostgresRepository {
    client: Client,
}

impl PostgresRepository {
    /// Connect to the store and drive the connection on a background task
    pub async fn connect(database_url: &str) -> BotResult<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| repository_error(&format!("Failed to connect: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("Postgres connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    fn user_from_row(row: &Row) -> User {
        let bot_config: Option<Value> = row.get("bot_config");
        let bot_config = bot_config
            .and_then(|value| serde_json::from_value::<BotConfig>(value).ok())
            .unwrap_or_default();

        User {
            id: row.get("id"),
            email: row.get("email"),
            display_name: row.get("displayname"),
            grant_id: row.get("grant_id"),
            bot_config,
            timezone: row.get("timezone"),
        }
    }

    fn meeting_from_row(row: &Row) -> Meeting {
        let participants: String = row.get("participants");
        let participants = match serde_json::from_str::<Vec<Participant>>(&participants) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unparseable participants column, treating as empty: {}", e);
                Vec::new()
            }
        };

        let organizer: Option<Value> = row.get("organizer");
        let organizer =
            organizer.and_then(|value| serde_json::from_value::<Participant>(value).ok());

        let occurrence_type: String = row.get("type");
        let occurrence_type = if occurrence_type == "one_time" {
            OccurrenceType::OneTime
        } else {
            OccurrenceType::Recurring
        };

        let bot_status: String = row.get("bot_status");
        let bot_status = match bot_status.as_str() {
            "ADDED" => BotStatus::Added,
            "REMOVED" => BotStatus::Removed,
            _ => BotStatus::NotAdded,
        };

        Meeting {
            id: row.get("id"),
            user_id: row.get("user_id"),
            calendar_uid: row.get("calendar_uid"),
            master_cal_uid: row.get("master_cal_uid"),
            event_url: row.get("event_url"),
            title: row.get("title"),
            participants,
            organizer,
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            timezone: row.get("timezone"),
            provider: row.get("provider"),
            disable_bot: row.get("disable_bot"),
            occurrence_type,
            uniq_identifier: row.get("uniq_identifier"),
            bot_id: row.get("bot_id"),
            bot_status,
        }
    }
}

#[async_trait]
impl MeetingRepository for PostgresRepository {
    async fn users_with_calendar_grant(&self) -> BotResult<Vec<User>> {
        let rows = self
            .client
            .query(
                "SELECT id, email, displayname, grant_id, bot_config, timezone \
                 FROM users WHERE grant_id IS NOT NULL",
                &[],
            )
            .await
            .map_err(|e| repository_error(&format!("Failed to fetch users: {}", e)))?;

        Ok(rows.iter().map(Self::user_from_row).collect())
    }

    async fn meetings_in_window(
        &self,
        user_ids: &[i64],
        window_start: i64,
        window_end: i64,
    ) -> BotResult<Vec<Meeting>> {
        let rows = self
            .client
            .query(
                "SELECT id, user_id, calendar_uid, master_cal_uid, event_url, title, \
                        participants, organizer, start_time, end_time, timezone, provider, \
                        disable_bot, type, uniq_identifier, bot_id, bot_status \
                 FROM user_meetings \
                 WHERE user_id = ANY($1) AND start_time >= $2 AND end_time <= $3",
                &[&user_ids, &window_start, &window_end],
            )
            .await
            .map_err(|e| repository_error(&format!("Failed to fetch meetings: {}", e)))?;

        Ok(rows.iter().map(Self::meeting_from_row).collect())
    }

    async fn set_meeting_bot(&self, meeting_id: i64, bot_id: &str) -> BotResult<()> {
        self.client
            .execute(
                "UPDATE user_meetings SET bot_id = $1, bot_status = 'ADDED' WHERE id = $2",
                &[&bot_id, &meeting_id],
            )
            .await
            .map_err(|e| repository_error(&format!("Failed to update meeting: {}", e)))?;

        Ok(())
    }
}
