//! Typed, model-free entry points for UI code.
//!
//! Every function routes through the same executor (and therefore the same
//! input schema and handler) as the model-driven path, so "AI-invoked" and
//! "directly invoked" behavior cannot drift apart.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Goal, GoalPriority, GoalStatus, WeeklySchedule};
use crate::error::ToolError;
use crate::tools::goals::{CREATE_GOAL, FIND_GOALS, UPDATE_GOAL};
use crate::tools::calendar::SYNC_CALENDAR;
use crate::tools::schedule::GET_SCHEDULE;
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::types::{CallerContext, ToolInvocationRequest, ToolOutcome};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalParams {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<GoalPriority>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalParams {
    pub goal_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<GoalPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GoalStatus>,
}

/// The trimmed record `findGoals` returns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
}

/// One method per tool, bypassing the model entirely.
#[derive(Clone)]
pub struct Actions {
    executor: ToolExecutor,
}

impl Actions {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            executor: ToolExecutor::new(registry),
        }
    }

    pub async fn create_goal(
        &self,
        context: &CallerContext,
        params: CreateGoalParams,
    ) -> Result<Goal, ToolError> {
        let outcome = self.invoke(CREATE_GOAL, &params, context).await?;
        decode(outcome.result)
    }

    pub async fn update_goal(
        &self,
        context: &CallerContext,
        params: UpdateGoalParams,
    ) -> Result<bool, ToolError> {
        let outcome = self.invoke(UPDATE_GOAL, &params, context).await?;
        Ok(outcome.result["success"].as_bool().unwrap_or(false))
    }

    pub async fn find_goals(
        &self,
        context: &CallerContext,
        query: &str,
    ) -> Result<Vec<GoalSummary>, ToolError> {
        let params = serde_json::json!({ "query": query });
        let outcome = self.invoke(FIND_GOALS, &params, context).await?;
        decode(outcome.result)
    }

    pub async fn get_schedule(
        &self,
        context: &CallerContext,
    ) -> Result<Option<WeeklySchedule>, ToolError> {
        let outcome = self
            .invoke(GET_SCHEDULE, &serde_json::json!({}), context)
            .await?;
        match outcome.result {
            Value::Null => Ok(None),
            other => decode(other).map(Some),
        }
    }

    /// Runs the sync and returns its message. Expired credentials surface as
    /// [`ToolError::AuthRequired`] so the caller can start the consent flow.
    pub async fn sync_calendar(&self, context: &CallerContext) -> Result<String, ToolError> {
        let outcome = self
            .invoke(SYNC_CALENDAR, &serde_json::json!({}), context)
            .await?;
        Ok(outcome.result["message"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn invoke<P: Serialize>(
        &self,
        name: &'static str,
        params: &P,
        context: &CallerContext,
    ) -> Result<ToolOutcome, ToolError> {
        let input = serde_json::to_value(params)
            .map_err(|e| ToolError::ResultShape(format!("params encode: {e}")))?;
        self.executor
            .execute(
                &ToolInvocationRequest {
                    name: name.into(),
                    input,
                },
                context,
            )
            .await
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ToolError> {
    serde_json::from_value(value).map_err(|e| ToolError::ResultShape(e.to_string()))
}
