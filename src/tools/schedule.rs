//! Schedule tool: fetch the user's weekly schedule.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::HandlerError;
use crate::store::Repository;
use crate::tools::handler::{parse_input, ToolDefinition, ToolHandler};
use crate::tools::schema::{FieldKind, FieldSpec, InputSchema};

pub const GET_SCHEDULE: &str = "getSchedule";

pub struct GetSchedule {
    repo: Arc<dyn Repository>,
}

impl GetSchedule {
    pub fn definition(repo: Arc<dyn Repository>) -> ToolDefinition {
        ToolDefinition::new(
            GET_SCHEDULE,
            "Retrieves the user's weekly schedule, if one has been generated.",
            InputSchema::new(vec![FieldSpec::required("userId", FieldKind::String)
                .describe("The ID of the user whose schedule to fetch.")]),
            Self { repo },
        )
        .with_output_schema(json!({
            "type": "object",
            "description": "The weekly schedule record, or null when none exists.",
            "nullable": true,
        }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetScheduleInput {
    user_id: String,
}

#[async_trait]
impl ToolHandler for GetSchedule {
    async fn call(&self, input: Value) -> Result<Value, HandlerError> {
        let input: GetScheduleInput = parse_input(input)?;
        match self.repo.weekly_schedule(&input.user_id).await? {
            Some(schedule) => {
                serde_json::to_value(schedule).map_err(|e| HandlerError::Other(e.to_string()))
            }
            None => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailySchedule, ScheduledItem, WeeklySchedule};
    use crate::store::MemoryRepository;

    #[tokio::test]
    async fn missing_schedule_is_null() {
        let repo = Arc::new(MemoryRepository::new());
        let def = GetSchedule::definition(repo);

        let validated = def
            .input_schema
            .validate(&json!({ "userId": "u1" }))
            .unwrap();
        let result = def.handler.call(validated).await.unwrap();
        assert!(result.is_null());
    }

    #[tokio::test]
    async fn stored_schedule_is_returned() {
        let repo = Arc::new(MemoryRepository::new());
        repo.save_schedule(
            "u1",
            WeeklySchedule {
                days: vec![DailySchedule {
                    date: "2025-03-03".parse().unwrap(),
                    items: vec![ScheduledItem {
                        title: "Piano practice".into(),
                        start_time: "09:00".into(),
                        end_time: "10:00".into(),
                        duration_minutes: 60,
                    }],
                }],
            },
        )
        .await
        .unwrap();

        let def = GetSchedule::definition(repo);
        let validated = def
            .input_schema
            .validate(&json!({ "userId": "u1" }))
            .unwrap();
        let result = def.handler.call(validated).await.unwrap();
        assert_eq!(result["days"][0]["items"][0]["title"], "Piano practice");
        assert_eq!(result["days"][0]["date"], "2025-03-03");
    }
}
