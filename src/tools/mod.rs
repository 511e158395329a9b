pub mod calendar;
pub mod executor;
pub mod goals;
pub mod handler;
pub mod registry;
pub mod schedule;
pub mod schema;

use std::sync::Arc;

pub use executor::ToolExecutor;
pub use handler::{parse_input, ToolDefinition, ToolHandler};
pub use registry::ToolRegistry;

use crate::calendar::CalendarProvider;
use crate::error::ToolError;
use crate::store::Repository;

/// The coach's standard tool catalog, wired against the given collaborators.
pub fn standard_registry(
    repo: Arc<dyn Repository>,
    calendar: Arc<dyn CalendarProvider>,
) -> Result<ToolRegistry, ToolError> {
    ToolRegistry::new()
        .register(goals::CreateGoal::definition(repo.clone()))?
        .register(goals::UpdateGoal::definition(repo.clone()))?
        .register(goals::FindGoals::definition(repo.clone()))?
        .register(schedule::GetSchedule::definition(repo.clone()))?
        .register(calendar::SyncCalendar::definition(repo, calendar))
}
