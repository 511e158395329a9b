//! Goal tools: create, update, find.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::{Goal, GoalPriority, GoalStatus};
use crate::error::HandlerError;
use crate::store::{Repository, RepositoryError};
use crate::tools::handler::{parse_input, ToolDefinition, ToolHandler};
use crate::tools::schema::{FieldKind, FieldSpec, InputSchema};

pub const CREATE_GOAL: &str = "createGoal";
pub const UPDATE_GOAL: &str = "updateGoal";
pub const FIND_GOALS: &str = "findGoals";

const PRIORITIES: &[&str] = &["low", "medium", "high"];
const STATUSES: &[&str] = &["todo", "inprogress", "done", "ongoing"];

// --- createGoal ---

pub struct CreateGoal {
    repo: Arc<dyn Repository>,
}

impl CreateGoal {
    pub fn definition(repo: Arc<dyn Repository>) -> ToolDefinition {
        ToolDefinition::new(
            CREATE_GOAL,
            "Creates a new goal for the user.",
            InputSchema::new(vec![
                FieldSpec::required("userId", FieldKind::String)
                    .describe("The ID of the user for whom to create the goal."),
                FieldSpec::required("title", FieldKind::String)
                    .describe("The title of the goal."),
                FieldSpec::optional("description", FieldKind::String)
                    .describe("A detailed description of the goal."),
                FieldSpec::optional("category", FieldKind::String)
                    .with_default(json!("General"))
                    .describe("The category for this goal (e.g. Work, Health)."),
                FieldSpec::optional("priority", FieldKind::Enum(PRIORITIES))
                    .with_default(json!("medium"))
                    .describe("The priority of the goal."),
            ]),
            Self { repo },
        )
        .with_output_schema(json!({
            "type": "object",
            "description": "The created goal record.",
        }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGoalInput {
    user_id: String,
    title: String,
    description: Option<String>,
    category: String,
    priority: GoalPriority,
}

#[async_trait]
impl ToolHandler for CreateGoal {
    async fn call(&self, input: Value) -> Result<Value, HandlerError> {
        let input: CreateGoalInput = parse_input(input)?;
        let goal = Goal {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            title: input.title,
            description: input.description,
            status: GoalStatus::Todo,
            priority: input.priority,
            category: input.category,
            created_at: Utc::now(),
        };
        let created = self.repo.add_goal(goal).await?;
        serde_json::to_value(created).map_err(|e| HandlerError::Other(e.to_string()))
    }
}

// --- updateGoal ---

pub struct UpdateGoal {
    repo: Arc<dyn Repository>,
}

impl UpdateGoal {
    pub fn definition(repo: Arc<dyn Repository>) -> ToolDefinition {
        ToolDefinition::new(
            UPDATE_GOAL,
            "Updates an existing user goal. Requires the goal's ID.",
            InputSchema::new(vec![
                FieldSpec::required("userId", FieldKind::String)
                    .describe("The ID of the user whose goal is being updated."),
                FieldSpec::required("goalId", FieldKind::String)
                    .describe("The ID of the goal to update."),
                FieldSpec::optional("title", FieldKind::String)
                    .describe("The new title for the goal."),
                FieldSpec::optional("description", FieldKind::String)
                    .describe("The new description for the goal."),
                FieldSpec::optional("category", FieldKind::String)
                    .describe("The new category for the goal."),
                FieldSpec::optional("priority", FieldKind::Enum(PRIORITIES))
                    .describe("The new priority."),
                FieldSpec::optional("status", FieldKind::Enum(STATUSES))
                    .describe("The new status."),
            ]),
            Self { repo },
        )
        .with_output_schema(json!({
            "type": "object",
            "properties": { "success": { "type": "boolean" } },
        }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateGoalInput {
    user_id: String,
    goal_id: String,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    priority: Option<GoalPriority>,
    status: Option<GoalStatus>,
}

#[async_trait]
impl ToolHandler for UpdateGoal {
    async fn call(&self, input: Value) -> Result<Value, HandlerError> {
        let input: UpdateGoalInput = parse_input(input)?;

        let goals = self.repo.goals(&input.user_id).await?;
        let mut goal = goals
            .into_iter()
            .find(|g| g.id == input.goal_id)
            .ok_or(RepositoryError::NotFound {
                entity: "goal",
                id: input.goal_id,
            })?;

        if let Some(title) = input.title {
            goal.title = title;
        }
        if let Some(description) = input.description {
            goal.description = Some(description);
        }
        if let Some(category) = input.category {
            goal.category = category;
        }
        if let Some(priority) = input.priority {
            goal.priority = priority;
        }
        if let Some(status) = input.status {
            goal.status = status;
        }

        self.repo.update_goal(goal).await?;
        Ok(json!({ "success": true }))
    }
}

// --- findGoals ---

pub struct FindGoals {
    repo: Arc<dyn Repository>,
}

impl FindGoals {
    pub fn definition(repo: Arc<dyn Repository>) -> ToolDefinition {
        ToolDefinition::new(
            FIND_GOALS,
            "Finds user goals based on a search query to get their details and IDs.",
            InputSchema::new(vec![
                FieldSpec::required("userId", FieldKind::String)
                    .describe("The ID of the user whose goals are being searched."),
                FieldSpec::required("query", FieldKind::String).describe(
                    "A search query to find relevant goals based on their title or description.",
                ),
            ]),
            Self { repo },
        )
        .with_output_schema(json!({
            "type": "array",
            "items": { "type": "object" },
        }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindGoalsInput {
    user_id: String,
    query: String,
}

#[async_trait]
impl ToolHandler for FindGoals {
    async fn call(&self, input: Value) -> Result<Value, HandlerError> {
        let input: FindGoalsInput = parse_input(input)?;
        let query = input.query.to_lowercase();

        let goals = self.repo.goals(&input.user_id).await?;
        let matches: Vec<Value> = goals
            .iter()
            .filter(|goal| {
                goal.title.to_lowercase().contains(&query)
                    || goal
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&query))
            })
            // Only the fields the model needs to reference a goal; the full
            // record stays in the repository.
            .map(|goal| {
                json!({
                    "id": goal.id,
                    "title": goal.title,
                    "description": goal.description,
                    "category": goal.category,
                })
            })
            .collect();

        Ok(Value::Array(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRepository;

    async fn call(definition: &ToolDefinition, input: Value) -> Result<Value, HandlerError> {
        // mirror the executor: validate (filling defaults), then dispatch
        let validated = definition.input_schema.validate(&input).expect("valid input");
        definition.handler.call(validated).await
    }

    fn seeded_repo() -> Arc<MemoryRepository> {
        Arc::new(MemoryRepository::new())
    }

    #[tokio::test]
    async fn create_goal_fills_defaults() {
        let repo = seeded_repo();
        let def = CreateGoal::definition(repo.clone());

        let result = call(&def, json!({ "userId": "u1", "title": "learn piano" }))
            .await
            .unwrap();
        assert_eq!(result["title"], "learn piano");
        assert_eq!(result["status"], "todo");
        assert_eq!(result["priority"], "medium");
        assert_eq!(result["category"], "General");

        let stored = repo.goals("u1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, result["id"].as_str().unwrap());
    }

    #[tokio::test]
    async fn update_goal_merges_changes() {
        let repo = seeded_repo();
        let created = call(
            &CreateGoal::definition(repo.clone()),
            json!({ "userId": "u1", "title": "learn piano" }),
        )
        .await
        .unwrap();

        let result = call(
            &UpdateGoal::definition(repo.clone()),
            json!({
                "userId": "u1",
                "goalId": created["id"],
                "status": "inprogress",
                "priority": "high",
            }),
        )
        .await
        .unwrap();
        assert_eq!(result, json!({ "success": true }));

        let stored = repo.goals("u1").await.unwrap();
        assert_eq!(stored[0].status, GoalStatus::InProgress);
        assert_eq!(stored[0].priority, GoalPriority::High);
        assert_eq!(stored[0].title, "learn piano");
    }

    #[tokio::test]
    async fn update_missing_goal_fails() {
        let repo = seeded_repo();
        let err = call(
            &UpdateGoal::definition(repo),
            json!({ "userId": "u1", "goalId": "nonexistent", "title": "x" }),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("nonexistent"));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn find_goals_matches_title_and_description() {
        let repo = seeded_repo();
        let create = CreateGoal::definition(repo.clone());
        call(&create, json!({ "userId": "u1", "title": "Learn Piano" }))
            .await
            .unwrap();
        call(
            &create,
            json!({ "userId": "u1", "title": "Fitness", "description": "practice piano daily" }),
        )
        .await
        .unwrap();
        call(&create, json!({ "userId": "u1", "title": "Read books" }))
            .await
            .unwrap();

        let result = call(
            &FindGoals::definition(repo),
            json!({ "userId": "u1", "query": "piano" }),
        )
        .await
        .unwrap();
        let matches = result.as_array().unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn find_goals_trims_result_fields() {
        let repo = seeded_repo();
        call(
            &CreateGoal::definition(repo.clone()),
            json!({ "userId": "u1", "title": "learn piano" }),
        )
        .await
        .unwrap();

        let result = call(
            &FindGoals::definition(repo),
            json!({ "userId": "u1", "query": "piano" }),
        )
        .await
        .unwrap();
        let first = &result.as_array().unwrap()[0];
        let mut keys: Vec<_> = first.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["category", "description", "id", "title"]);
        assert!(first.get("userId").is_none());
        assert!(first.get("createdAt").is_none());
    }

    #[tokio::test]
    async fn find_goals_is_scoped_to_the_user() {
        let repo = seeded_repo();
        call(
            &CreateGoal::definition(repo.clone()),
            json!({ "userId": "u1", "title": "learn piano" }),
        )
        .await
        .unwrap();

        let result = call(
            &FindGoals::definition(repo),
            json!({ "userId": "u2", "query": "piano" }),
        )
        .await
        .unwrap();
        assert!(result.as_array().unwrap().is_empty());
    }
}
