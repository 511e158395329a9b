//! Calendar tool: two-way sync between local tasks and the external
//! calendar.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::calendar::CalendarProvider;
use crate::domain::{CalendarEvent, EventDraft, Task};
use crate::error::HandlerError;
use crate::store::Repository;
use crate::tools::handler::{parse_input, ToolDefinition, ToolHandler};
use crate::tools::schema::{FieldKind, FieldSpec, InputSchema};

pub const SYNC_CALENDAR: &str = "syncCalendar";

/// How far ahead the sync looks.
const SYNC_WINDOW_DAYS: i64 = 7;

pub struct SyncCalendar {
    repo: Arc<dyn Repository>,
    calendar: Arc<dyn CalendarProvider>,
}

impl SyncCalendar {
    pub fn definition(
        repo: Arc<dyn Repository>,
        calendar: Arc<dyn CalendarProvider>,
    ) -> ToolDefinition {
        ToolDefinition::new(
            SYNC_CALENDAR,
            "Performs a two-way synchronization between the app and the user's calendar.",
            InputSchema::new(vec![FieldSpec::required("userId", FieldKind::String)
                .describe("The ID of the user to sync for.")]),
            Self { repo, calendar },
        )
        .with_output_schema(json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
        }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncCalendarInput {
    user_id: String,
}

#[async_trait]
impl ToolHandler for SyncCalendar {
    async fn call(&self, input: Value) -> Result<Value, HandlerError> {
        let input: SyncCalendarInput = parse_input(input)?;
        let now = Utc::now();
        let horizon = now + Duration::days(SYNC_WINDOW_DAYS);

        let tasks = self.repo.tasks(&input.user_id).await?;
        let events = self
            .calendar
            .list_events(&input.user_id, now, horizon)
            .await?;

        // Push: dated local tasks with no same-titled event become events.
        let mut pushed = 0;
        for task in &tasks {
            if task.is_completed {
                continue;
            }
            let Some(due) = task.due_date else { continue };
            if due < now || due >= horizon {
                continue;
            }
            if events.iter().any(|e| e.summary == task.title) {
                continue;
            }
            self.calendar
                .create_event(&input.user_id, event_draft(task, due))
                .await?;
            pushed += 1;
        }

        // Pull: events with no same-titled task become tasks.
        let mut pulled = 0;
        for event in &events {
            if tasks.iter().any(|t| t.title == event.summary) {
                continue;
            }
            self.repo
                .add_task(task_from_event(&input.user_id, event, now))
                .await?;
            pulled += 1;
        }

        info!(user = %input.user_id, pushed, pulled, "calendar sync complete");
        Ok(json!({
            "message": format!(
                "Calendar sync complete: {pushed} task(s) pushed to the calendar, \
                 {pulled} event(s) pulled into tasks."
            ),
        }))
    }
}

fn event_draft(task: &Task, due: DateTime<Utc>) -> EventDraft {
    let start = task
        .time
        .as_deref()
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
        .map(|t| Utc.from_utc_datetime(&due.date_naive().and_time(t)))
        .unwrap_or(due);
    EventDraft {
        summary: task.title.clone(),
        description: task.description.clone(),
        start,
        end: start + Duration::minutes(i64::from(task.duration_minutes)),
    }
}

fn task_from_event(user_id: &str, event: &CalendarEvent, now: DateTime<Utc>) -> Task {
    let duration = event
        .end
        .signed_duration_since(event.start)
        .num_minutes()
        .max(0) as u32;
    Task {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: event.summary.clone(),
        description: event.description.clone(),
        due_date: Some(event.start),
        time: Some(event.start.format("%H:%M").to_string()),
        duration_minutes: if duration == 0 { 60 } else { duration },
        is_completed: false,
        created_at: now,
    }
}
