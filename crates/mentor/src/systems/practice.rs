use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indoc::indoc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::System;
use crate::errors::{AgentError, AgentResult};
use crate::models::content::Content;
use crate::models::tool::{Tool, ToolCall};
use crate::store::{Collection, Store};

pub const STUDENT_NOT_FOUND: &str = "Student not found. Ask the user to double-check their ID.";
pub const NO_TASKS_FOUND: &str = "No tasks recorded for this student this week.";

/// The tools offered to the model, looked up by their wire name
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PracticeTool {
    GetStudentProfile,
    ListWeekTasks,
    CreateFollowupTask,
}

impl PracticeTool {
    pub fn name(&self) -> &str {
        self.as_ref()
    }

    pub fn tool(&self) -> Tool {
        match self {
            PracticeTool::GetStudentProfile => Tool::new(
                self.name(),
                "Gets the student's profile (name, company, tutor) for a student ID.",
                json!({
                    "type": "object",
                    "required": ["student_id"],
                    "properties": {
                        "student_id": {"type": "string", "description": "The student ID (e.g. A12)"}
                    }
                }),
            ),
            PracticeTool::ListWeekTasks => Tool::new(
                self.name(),
                "Lists ALL tasks for a student in a week: course tasks and personal tasks created earlier.",
                json!({
                    "type": "object",
                    "required": ["student_id", "week_id"],
                    "properties": {
                        "student_id": {"type": "string"},
                        "week_id": {"type": "string", "description": "Week identifier (e.g. 2026-W02)"}
                    }
                }),
            ),
            PracticeTool::CreateFollowupTask => Tool::new(
                self.name(),
                "Creates and SAVES a new task or reminder for the student.",
                json!({
                    "type": "object",
                    "required": ["student_id", "title", "priority"],
                    "properties": {
                        "student_id": {"type": "string"},
                        "title": {"type": "string", "description": "Descriptive title of the task"},
                        "priority": {
                            "type": "string",
                            "enum": Priority::iter().map(|p| p.to_string()).collect::<Vec<_>>(),
                            "description": "Priority of the task"
                        }
                    }
                }),
            ),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A task created through the assistant, as stored in the follow-ups collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Followup {
    pub id: i64,
    pub student_id: String,
    pub title: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// A follow-up as shown next to the course tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedFollowup {
    pub id: String,
    pub title: String,
    pub status: String,
    pub is_custom: bool,
}

impl From<&Followup> for ListedFollowup {
    fn from(followup: &Followup) -> Self {
        Self {
            id: format!("custom-{}", followup.id),
            title: format!("{} (Priority: {})", followup.title, followup.priority),
            status: "pending".to_string(),
            is_custom: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeekTasks {
    student_id: String,
    week_id: String,
    #[serde(default)]
    tasks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ProfileArgs {
    student_id: String,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    student_id: String,
    week_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateArgs {
    student_id: String,
    title: String,
    priority: Priority,
}

static LAST_FOLLOWUP_ID: AtomicI64 = AtomicI64::new(0);

/// Millisecond timestamp id, strictly above every id handed out before in this
/// process and above `floor`
fn next_followup_id(floor: i64) -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_FOLLOWUP_ID.load(Ordering::SeqCst);
    loop {
        let candidate = now.max(last + 1).max(floor + 1);
        match LAST_FOLLOWUP_ID.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: PracticeTool, arguments: Value) -> AgentResult<T> {
    serde_json::from_value(arguments)
        .map_err(|e| AgentError::InvalidParameters(format!("{}: {}", tool.name(), e)))
}

fn to_json<T: Serialize>(value: &T) -> AgentResult<String> {
    serde_json::to_string(value).map_err(|e| AgentError::Internal(e.to_string()))
}

/// Student profiles, weekly course tasks and personal follow-up tasks
pub struct PracticeSystem {
    store: Arc<dyn Store>,
    tools: Vec<Tool>,
}

impl PracticeSystem {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            tools: PracticeTool::iter().map(|tool| tool.tool()).collect(),
        }
    }

    async fn read(&self, collection: Collection) -> AgentResult<Vec<Value>> {
        self.store.read_all(collection).await.map_err(|e| {
            AgentError::ExecutionError(format!("could not read {}: {}", collection.as_ref(), e))
        })
    }

    async fn get_student_profile(&self, args: ProfileArgs) -> AgentResult<String> {
        let students = self.read(Collection::Students).await?;
        let student = students
            .iter()
            .find(|s| s.get("id").and_then(Value::as_str) == Some(args.student_id.as_str()));

        match student {
            Some(student) => to_json(student),
            None => Ok(STUDENT_NOT_FOUND.to_string()),
        }
    }

    async fn followups_for(&self, student_id: &str) -> AgentResult<Vec<Followup>> {
        let records = self.read(Collection::Followups).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Followup>(record) {
                Ok(followup) => Some(followup),
                Err(e) => {
                    tracing::warn!("skipping malformed follow-up record: {}", e);
                    None
                }
            })
            .filter(|followup| followup.student_id == student_id)
            .collect())
    }

    async fn list_week_tasks(&self, args: ListArgs) -> AgentResult<String> {
        let baseline = self.read(Collection::WeekTasks).await?;
        let mut tasks: Vec<Value> = baseline
            .into_iter()
            .filter_map(|record| serde_json::from_value::<WeekTasks>(record).ok())
            .find(|record| record.student_id == args.student_id && record.week_id == args.week_id)
            .map(|record| record.tasks)
            .unwrap_or_default();

        for followup in self.followups_for(&args.student_id).await? {
            let listed = serde_json::to_value(ListedFollowup::from(&followup))
                .map_err(|e| AgentError::Internal(e.to_string()))?;
            tasks.push(listed);
        }

        if tasks.is_empty() {
            return Ok(NO_TASKS_FOUND.to_string());
        }
        to_json(&tasks)
    }

    async fn create_followup_task(&self, args: CreateArgs) -> AgentResult<String> {
        // A corrupted collection is rewritten from scratch by the store, so it has no ids to avoid
        let highest = self
            .store
            .read_all(Collection::Followups)
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|record| record.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0);

        let followup = Followup {
            id: next_followup_id(highest),
            student_id: args.student_id,
            title: args.title,
            priority: args.priority,
            created_at: Utc::now(),
        };
        let record =
            serde_json::to_value(&followup).map_err(|e| AgentError::Internal(e.to_string()))?;

        self.store
            .append(Collection::Followups, record)
            .await
            .map_err(|e| AgentError::ExecutionError(format!("could not save the task: {}", e)))?;

        tracing::info!(
            id = followup.id,
            student_id = %followup.student_id,
            "created follow-up task"
        );
        Ok(format!(
            "Task saved with ID {}. It will now show up in your task list.",
            followup.id
        ))
    }
}

#[async_trait]
impl System for PracticeSystem {
    fn name(&self) -> &str {
        "practice"
    }

    fn description(&self) -> &str {
        "Student profiles, weekly course tasks and personal follow-up tasks"
    }

    fn instructions(&self) -> &str {
        indoc! {r#"
            Always look up the student's profile before giving personal advice.
            When asked about pending work, list the week's tasks; weeks look like 2026-W02.
            Only create a follow-up task when the student asks for a reminder or agrees to one,
            and choose its priority from low, medium or high.
        "#}
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Vec<Content>> {
        let tool = PracticeTool::from_str(&tool_call.name)
            .map_err(|_| AgentError::ToolNotFound(tool_call.name.clone()))?;

        let output = match tool {
            PracticeTool::GetStudentProfile => {
                self.get_student_profile(parse_args(tool, tool_call.arguments)?)
                    .await?
            }
            PracticeTool::ListWeekTasks => {
                self.list_week_tasks(parse_args(tool, tool_call.arguments)?)
                    .await?
            }
            PracticeTool::CreateFollowupTask => {
                self.create_followup_task(parse_args(tool, tool_call.arguments)?)
                    .await?
            }
        };

        Ok(vec![Content::text(output)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::contents_to_text;
    use crate::store::{JsonFileStore, MemoryStore};
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn practice_store() -> MemoryStore {
        MemoryStore::new()
            .with_records(
                Collection::Students,
                vec![json!({"id": "A12", "name": "Ana", "company": "Acme", "tutor": "Luis"})],
            )
            .with_records(
                Collection::WeekTasks,
                vec![
                    json!({
                        "student_id": "A12",
                        "week_id": "2026-W02",
                        "tasks": [
                            {"id": "t1", "title": "Weekly report", "status": "pending"},
                            {"id": "t2", "title": "Meet tutor", "status": "done"}
                        ]
                    }),
                    json!({
                        "student_id": "B7",
                        "week_id": "2026-W02",
                        "tasks": [{"id": "t9", "title": "Other", "status": "pending"}]
                    }),
                ],
            )
    }

    async fn call_text(system: &PracticeSystem, name: &str, args: Value) -> AgentResult<String> {
        let contents = system.call(ToolCall::new(name, args)).await?;
        Ok(contents_to_text(&contents))
    }

    #[test]
    fn test_tool_names() {
        let system = PracticeSystem::new(Arc::new(MemoryStore::new()));
        let names: Vec<&str> = system.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["get_student_profile", "list_week_tasks", "create_followup_task"]
        );
        assert_eq!(
            PracticeTool::from_str("list_week_tasks").unwrap(),
            PracticeTool::ListWeekTasks
        );
        assert!(system.has_tool("create_followup_task"));
        assert!(!system.has_tool("delete_everything"));
    }

    #[test]
    fn test_priority_enum_in_schema() {
        let tool = PracticeTool::CreateFollowupTask.tool();
        assert_eq!(
            tool.input_schema["properties"]["priority"]["enum"],
            json!(["low", "medium", "high"])
        );
    }

    #[tokio::test]
    async fn test_profile_found() -> anyhow::Result<()> {
        let system = PracticeSystem::new(Arc::new(practice_store()));
        let text = call_text(&system, "get_student_profile", json!({"student_id": "A12"})).await?;
        let profile: Value = serde_json::from_str(&text)?;
        assert_eq!(profile["name"], "Ana");
        assert_eq!(profile["tutor"], "Luis");
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_not_found_is_not_an_error() -> anyhow::Result<()> {
        let system = PracticeSystem::new(Arc::new(practice_store()));
        let text = call_text(&system, "get_student_profile", json!({"student_id": "X9"})).await?;
        assert_eq!(text, STUDENT_NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_merges_baseline_and_followups() -> anyhow::Result<()> {
        let store = practice_store().with_records(
            Collection::Followups,
            vec![
                json!({"id": 1, "student_id": "A12", "title": "Call HR", "priority": "high", "created_at": "2026-01-05T10:00:00Z"}),
                json!({"id": 2, "student_id": "B7", "title": "Not mine", "priority": "low", "created_at": "2026-01-05T10:00:00Z"}),
                json!({"id": 3, "student_id": "A12", "title": "Update CV", "priority": "low", "created_at": "2026-01-06T10:00:00Z"}),
            ],
        );
        let system = PracticeSystem::new(Arc::new(store));

        let text = call_text(
            &system,
            "list_week_tasks",
            json!({"student_id": "A12", "week_id": "2026-W02"}),
        )
        .await?;
        let tasks: Vec<Value> = serde_json::from_str(&text)?;

        // 2 baseline + 2 follow-ups for A12
        assert_eq!(tasks.len(), 4);
        assert_eq!(tasks[0]["id"], "t1");
        assert!(tasks[0].get("is_custom").is_none());
        assert_eq!(
            tasks[2],
            json!({"id": "custom-1", "title": "Call HR (Priority: high)", "status": "pending", "is_custom": true})
        );
        assert_eq!(tasks[3]["title"], "Update CV (Priority: low)");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_followups_apply_to_any_week() -> anyhow::Result<()> {
        let store = practice_store().with_records(
            Collection::Followups,
            vec![json!({"id": 1, "student_id": "A12", "title": "Call HR", "priority": "medium", "created_at": "2026-01-05T10:00:00Z"})],
        );
        let system = PracticeSystem::new(Arc::new(store));

        let text = call_text(
            &system,
            "list_week_tasks",
            json!({"student_id": "A12", "week_id": "2026-W09"}),
        )
        .await?;
        let tasks: Vec<Value> = serde_json::from_str(&text)?;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["id"], "custom-1");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_nothing_found() -> anyhow::Result<()> {
        let system = PracticeSystem::new(Arc::new(practice_store()));
        let text = call_text(
            &system,
            "list_week_tasks",
            json!({"student_id": "Z1", "week_id": "2026-W02"}),
        )
        .await?;
        assert_eq!(text, NO_TASKS_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_then_list() -> anyhow::Result<()> {
        let system = PracticeSystem::new(Arc::new(practice_store()));

        let mut ids = HashSet::new();
        for title in ["Prepare demo", "Send timesheet"] {
            let text = call_text(
                &system,
                "create_followup_task",
                json!({"student_id": "A12", "title": title, "priority": "medium"}),
            )
            .await?;
            assert!(text.starts_with("Task saved with ID "));
            let id: i64 = text
                .trim_start_matches("Task saved with ID ")
                .split('.')
                .next()
                .unwrap()
                .parse()?;
            assert!(ids.insert(id), "ids must be unique");
        }

        let text = call_text(
            &system,
            "list_week_tasks",
            json!({"student_id": "A12", "week_id": "2026-W02"}),
        )
        .await?;
        let tasks: Vec<Value> = serde_json::from_str(&text)?;
        assert_eq!(tasks.len(), 4);
        for id in ids {
            let expected = format!("custom-{}", id);
            assert!(tasks.iter().any(|t| t["id"] == expected.as_str()));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_id_above_existing_ids() -> anyhow::Result<()> {
        let far_future = Utc::now().timestamp_millis() + 1_000_000;
        let store = MemoryStore::new().with_records(
            Collection::Followups,
            vec![json!({"id": far_future, "student_id": "A12", "title": "x", "priority": "low", "created_at": "2026-01-05T10:00:00Z"})],
        );
        let store = Arc::new(store);
        let system = PracticeSystem::new(store.clone());
        call_text(
            &system,
            "create_followup_task",
            json!({"student_id": "A12", "title": "y", "priority": "low"}),
        )
        .await?;

        let records = store.read_all(Collection::Followups).await?;
        let created: Followup = serde_json::from_value(records[1].clone())?;
        assert!(created.id > far_future);
        assert_eq!(created.priority, Priority::Low);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_priority() {
        let system = PracticeSystem::new(Arc::new(MemoryStore::new()));
        let err = system
            .call(ToolCall::new(
                "create_followup_task",
                json!({"student_id": "A12", "title": "x", "priority": "urgent"}),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_create_tolerates_corrupted_store() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("followups.json"), "not json at all")?;
        let system = PracticeSystem::new(Arc::new(JsonFileStore::new(dir.path())));

        let text = call_text(
            &system,
            "create_followup_task",
            json!({"student_id": "A12", "title": "Fix laptop", "priority": "high"}),
        )
        .await?;
        assert!(text.starts_with("Task saved with ID "));

        let text = call_text(
            &system,
            "list_week_tasks",
            json!({"student_id": "A12", "week_id": "2026-W02"}),
        )
        .await?;
        let tasks: Vec<Value> = serde_json::from_str(&text)?;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["title"], "Fix laptop (Priority: high)");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let system = PracticeSystem::new(Arc::new(MemoryStore::new()));
        let err = system
            .call(ToolCall::new("drop_tables", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err, AgentError::ToolNotFound("drop_tables".to_string()));
    }

    #[test]
    fn test_next_followup_id_is_monotonic() {
        let first = next_followup_id(0);
        let second = next_followup_id(0);
        assert!(second > first);
        assert!(next_followup_id(second + 500) > second + 500);
    }
}
