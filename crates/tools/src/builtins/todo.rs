//! Todo management tools.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use super::TodoContext;
use crate::agent::{AgentContext, ConfirmationDecision, ConfirmationRequest};
use crate::store::{NewTodo, StatusFilter, Tag};
use crate::{
    ParamType, Tool, ToolAnnotations, ToolError, ToolOutput, ToolParam, ToolSpec, parse_args,
};

pub const ADD_TODO: &str = "add_todo";
pub const LIST_TODOS: &str = "list_todos";
pub const SEARCH_TODOS: &str = "search_todos";
pub const MARK_TODO_COMPLETE: &str = "mark_todo_complete";
pub const DELETE_TODO: &str = "delete_todo";
pub const GET_TODO_STATS: &str = "get_todo_stats";

fn tag_labels() -> Vec<&'static str> {
    Tag::ALL.iter().map(|t| t.label()).collect()
}

/// Treat `""` as "no tag" so form-style callers can send an empty selection.
fn empty_tag_as_none<'de, D>(deserializer: D) -> Result<Option<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(label) => Tag::from_label(label).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown tag '{label}', expected one of {}",
                tag_labels().join(", ")
            ))
        }),
    }
}

// ── add_todo ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AddTodoInput {
    title: String,
    content: String,
    #[serde(default, deserialize_with = "empty_tag_as_none")]
    tag: Option<Tag>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    due: Option<NaiveDate>,
}

pub struct AddTodoTool {
    pub ctx: TodoContext,
}

impl AddTodoTool {
    async fn run(&self, args: &Value) -> Result<(ToolOutput, Value), ToolError> {
        let input: AddTodoInput = parse_args(ADD_TODO, args)?;
        if input.title.trim().is_empty() {
            return Err(ToolError::invalid_input(ADD_TODO, "title must not be empty"));
        }

        let todo = self.ctx.store.create(NewTodo {
            title: input.title,
            content: input.content,
            tag: input.tag,
            due: input.due,
            completed: input.completed,
        });

        let output = ToolOutput::text(format!(
            "Todo \"{}\" created with ID {}.",
            todo.title, todo.id
        ));
        Ok((output, serde_json::to_value(&todo)?))
    }
}

#[async_trait]
impl Tool for AddTodoTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: ADD_TODO.to_string(),
            description: "Add a new todo to the todo manager. Returns the created todo with its assigned ID.".to_string(),
            params: vec![
                ToolParam::required("title", "The title of the todo"),
                ToolParam::required("content", "The description/content of the todo"),
                ToolParam::optional("tag", "Optional priority tag for the todo").one_of(tag_labels()),
                ToolParam::optional("completed", "Whether the todo is completed (default: false)")
                    .of_type(ParamType::Boolean),
                ToolParam::optional("due", "Optional due date (YYYY-MM-DD)"),
            ],
            annotations: ToolAnnotations::default(),
        }
    }

    async fn execute(&self, args: &Value, _agent: &AgentContext) -> Result<ToolOutput, ToolError> {
        let outcome = self.run(args).await;
        self.ctx.finish(ADD_TODO, args, outcome)
    }
}

// ── list_todos ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListTodosInput {
    #[serde(default)]
    filter: StatusFilter,
}

pub struct ListTodosTool {
    pub ctx: TodoContext,
}

impl ListTodosTool {
    async fn run(&self, args: &Value) -> Result<(ToolOutput, Value), ToolError> {
        let input: ListTodosInput = parse_args(LIST_TODOS, args)?;
        let todos = self.ctx.store.filter_by_status(input.filter);
        Ok((ToolOutput::json(&todos)?, json!({ "count": todos.len() })))
    }
}

#[async_trait]
impl Tool for ListTodosTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: LIST_TODOS.to_string(),
            description: "List all todos currently stored in the todo manager. Optionally filter by completion status.".to_string(),
            params: vec![
                ToolParam::optional("filter", "Filter todos by completion status (default: all)")
                    .one_of(["all", "pending", "completed"]),
            ],
            annotations: ToolAnnotations::default(),
        }
    }

    async fn execute(&self, args: &Value, _agent: &AgentContext) -> Result<ToolOutput, ToolError> {
        let outcome = self.run(args).await;
        self.ctx.finish(LIST_TODOS, args, outcome)
    }
}

// ── search_todos ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchTodosInput {
    query: String,
}

pub struct SearchTodosTool {
    pub ctx: TodoContext,
}

impl SearchTodosTool {
    async fn run(&self, args: &Value) -> Result<(ToolOutput, Value), ToolError> {
        let input: SearchTodosInput = parse_args(SEARCH_TODOS, args)?;
        let results = self.ctx.store.search(&input.query);
        Ok((ToolOutput::json(&results)?, json!({ "matchCount": results.len() })))
    }
}

#[async_trait]
impl Tool for SearchTodosTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: SEARCH_TODOS.to_string(),
            description: "Search todos by a query string. Matches against title, content, and tags.".to_string(),
            params: vec![ToolParam::required("query", "The search query to filter todos by")],
            annotations: ToolAnnotations::default(),
        }
    }

    async fn execute(&self, args: &Value, _agent: &AgentContext) -> Result<ToolOutput, ToolError> {
        let outcome = self.run(args).await;
        self.ctx.finish(SEARCH_TODOS, args, outcome)
    }
}

// ── mark_todo_complete ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MarkTodoCompleteInput {
    id: u64,
    completed: bool,
}

pub struct MarkTodoCompleteTool {
    pub ctx: TodoContext,
}

impl MarkTodoCompleteTool {
    async fn run(&self, args: &Value) -> Result<(ToolOutput, Value), ToolError> {
        let input: MarkTodoCompleteInput = parse_args(MARK_TODO_COMPLETE, args)?;
        let todo = self
            .ctx
            .store
            .set_completed(input.id, input.completed)
            .ok_or_else(|| ToolError::not_found(MARK_TODO_COMPLETE, input.id))?;

        let state = if input.completed { "completed" } else { "incomplete" };
        let output = ToolOutput::text(format!(
            "Todo \"{}\" (ID {}) marked as {state}.",
            todo.title, todo.id
        ));
        Ok((output, serde_json::to_value(&todo)?))
    }
}

#[async_trait]
impl Tool for MarkTodoCompleteTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: MARK_TODO_COMPLETE.to_string(),
            description: "Mark a todo as completed or incomplete by its ID. Returns the updated todo.".to_string(),
            params: vec![
                ToolParam::required("id", "The ID of the todo to update").of_type(ParamType::Integer),
                ToolParam::required(
                    "completed",
                    "Whether to mark as completed (true) or incomplete (false)",
                )
                .of_type(ParamType::Boolean),
            ],
            annotations: ToolAnnotations::default(),
        }
    }

    async fn execute(&self, args: &Value, _agent: &AgentContext) -> Result<ToolOutput, ToolError> {
        let outcome = self.run(args).await;
        self.ctx.finish(MARK_TODO_COMPLETE, args, outcome)
    }
}

// ── delete_todo ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DeleteTodoInput {
    id: u64,
}

/// Removes a todo.  When the agent offers a user-interaction capability the
/// user is asked first; the store is not touched while the question is open.
pub struct DeleteTodoTool {
    pub ctx: TodoContext,
}

impl DeleteTodoTool {
    async fn run(&self, args: &Value, agent: &AgentContext) -> Result<(ToolOutput, Value), ToolError> {
        let input: DeleteTodoInput = parse_args(DELETE_TODO, args)?;

        if let Some(interaction) = agent.interaction() {
            let request = ConfirmationRequest {
                tool_name: DELETE_TODO.to_string(),
                message: format!("Allow AI agent to delete todo #{}?", input.id),
            };
            let decision = interaction.confirm(request).await.map_err(|err| {
                ToolError::Interaction { tool: DELETE_TODO.to_string(), message: err.to_string() }
            })?;
            if decision == ConfirmationDecision::Deny {
                return Err(ToolError::user_denied(DELETE_TODO, input.id));
            }
        }

        let removed = self
            .ctx
            .store
            .delete_by_id(input.id)
            .ok_or_else(|| ToolError::not_found(DELETE_TODO, input.id))?;

        let output = ToolOutput::text(format!(
            "Todo \"{}\" (ID {}) deleted.",
            removed.title, removed.id
        ));
        Ok((output, serde_json::to_value(&removed)?))
    }
}

#[async_trait]
impl Tool for DeleteTodoTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: DELETE_TODO.to_string(),
            description: "Delete a todo by its ID. Returns the deleted todo if found.".to_string(),
            params: vec![
                ToolParam::required("id", "The ID of the todo to delete").of_type(ParamType::Integer),
            ],
            annotations: ToolAnnotations::destructive(),
        }
    }

    async fn execute(&self, args: &Value, agent: &AgentContext) -> Result<ToolOutput, ToolError> {
        let outcome = self.run(args, agent).await;
        self.ctx.finish(DELETE_TODO, args, outcome)
    }
}

// ── get_todo_stats ───────────────────────────────────────────────────────────

pub struct TodoStatsTool {
    pub ctx: TodoContext,
}

impl TodoStatsTool {
    async fn run(&self) -> Result<(ToolOutput, Value), ToolError> {
        let stats = self.ctx.store.stats();
        Ok((ToolOutput::json(&stats)?, serde_json::to_value(&stats)?))
    }
}

#[async_trait]
impl Tool for TodoStatsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: GET_TODO_STATS.to_string(),
            description: "Get statistics about the todos collection: total count, completed/pending breakdown, and breakdown by tag.".to_string(),
            params: vec![],
            annotations: ToolAnnotations::read_only(),
        }
    }

    async fn execute(&self, args: &Value, _agent: &AgentContext) -> Result<ToolOutput, ToolError> {
        let outcome = self.run().await;
        self.ctx.finish(GET_TODO_STATS, args, outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::agent::UserInteraction;
    use crate::builtins::todo_registry;
    use crate::store::{Todo, TodoStats};
    use crate::{CallOutcome, ToolRegistry};

    /// Answers every confirmation with a fixed decision and counts the asks.
    struct FixedAnswer {
        decision: ConfirmationDecision,
        asked: std::sync::Mutex<Vec<ConfirmationRequest>>,
    }

    impl FixedAnswer {
        fn new(decision: ConfirmationDecision) -> Arc<Self> {
            Arc::new(Self { decision, asked: std::sync::Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl UserInteraction for FixedAnswer {
        async fn confirm(&self, request: ConfirmationRequest) -> Result<ConfirmationDecision> {
            self.asked.lock().unwrap().push(request);
            Ok(self.decision)
        }
    }

    struct BrokenInteraction;

    #[async_trait]
    impl UserInteraction for BrokenInteraction {
        async fn confirm(&self, _request: ConfirmationRequest) -> Result<ConfirmationDecision> {
            anyhow::bail!("prompt window closed")
        }
    }

    fn setup() -> (TodoContext, ToolRegistry) {
        let ctx = TodoContext::default();
        let registry = todo_registry(&ctx);
        (ctx, registry)
    }

    async fn call(reg: &ToolRegistry, name: &str, args: Value) -> Result<ToolOutput, ToolError> {
        reg.execute(name, &args, &AgentContext::headless()).await
    }

    fn text(out: &ToolOutput) -> &str {
        out.first_text().unwrap()
    }

    #[test]
    fn catalog_order_and_annotations() {
        let (_ctx, reg) = setup();
        assert_eq!(
            reg.names(),
            vec![ADD_TODO, LIST_TODOS, SEARCH_TODOS, MARK_TODO_COMPLETE, DELETE_TODO, GET_TODO_STATS]
        );

        let manifest = reg.manifest();
        let by_name = |n: &str| manifest.tools.iter().find(|t| t.name == n).unwrap().clone();
        assert_eq!(by_name(GET_TODO_STATS).annotations, Some(ToolAnnotations::read_only()));
        assert_eq!(by_name(DELETE_TODO).annotations, Some(ToolAnnotations::destructive()));
        assert!(by_name(ADD_TODO).annotations.is_none());

        let add = by_name(ADD_TODO).input_schema;
        assert_eq!(add["required"], json!(["title", "content"]));
        assert_eq!(add["properties"]["tag"]["enum"], json!(["low", "medium", "high"]));
        assert_eq!(add["properties"]["completed"]["type"], "boolean");

        let mark = by_name(MARK_TODO_COMPLETE).input_schema;
        assert_eq!(mark["required"], json!(["id", "completed"]));
        assert_eq!(mark["properties"]["id"]["type"], "integer");

        let list = by_name(LIST_TODOS).input_schema;
        assert!(list.get("required").is_none());
        assert_eq!(list["properties"]["filter"]["enum"], json!(["all", "pending", "completed"]));
    }

    #[tokio::test]
    async fn add_todo_assigns_ids_and_defaults() {
        let (ctx, reg) = setup();
        let out = call(&reg, ADD_TODO, json!({"title": "Buy milk", "content": "2%", "tag": "low"}))
            .await
            .unwrap();
        assert_eq!(text(&out), "Todo \"Buy milk\" created with ID 1.");

        let out = call(&reg, ADD_TODO, json!({"title": "Walk dog", "content": ""})).await.unwrap();
        assert_eq!(text(&out), "Todo \"Walk dog\" created with ID 2.");

        let first = ctx.store.get(1).unwrap();
        assert!(!first.completed);
        assert_eq!(first.tag, Some(Tag::Low));
        assert!(ctx.store.get(2).unwrap().tag.is_none());
    }

    #[tokio::test]
    async fn add_todo_honours_completed_and_due() {
        let (ctx, reg) = setup();
        call(
            &reg,
            ADD_TODO,
            json!({"title": "Done already", "content": "", "completed": true, "due": "2026-11-01"}),
        )
        .await
        .unwrap();
        let todo = ctx.store.get(1).unwrap();
        assert!(todo.completed);
        assert_eq!(todo.due, NaiveDate::from_ymd_opt(2026, 11, 1));
    }

    #[tokio::test]
    async fn add_todo_treats_empty_tag_as_untagged() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "x", "content": "", "tag": ""})).await.unwrap();
        assert!(ctx.store.get(1).unwrap().tag.is_none());
    }

    #[tokio::test]
    async fn add_todo_rejects_invalid_input_without_mutating() {
        let (ctx, reg) = setup();
        for args in [
            json!({"title": "x", "content": "", "tag": "urgent"}),
            json!({"title": "x"}),
            json!({"title": "   ", "content": "blank"}),
            json!({"title": "x", "content": "", "completed": "yes"}),
            json!({"title": "x", "content": "", "due": "next week"}),
        ] {
            let err = call(&reg, ADD_TODO, args.clone()).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidInput { .. }), "{args} gave {err:?}");
        }
        assert!(ctx.store.is_empty());
        assert_eq!(ctx.journal.len(), 5);
    }

    #[tokio::test]
    async fn add_todo_keeps_title_as_given() {
        let (ctx, reg) = setup();
        let out = call(&reg, ADD_TODO, json!({"title": "  Buy milk ", "content": ""})).await.unwrap();
        assert_eq!(text(&out), "Todo \"  Buy milk \" created with ID 1.");
        assert_eq!(ctx.store.get(1).unwrap().title, "  Buy milk ");
    }

    #[tokio::test]
    async fn add_todo_tag_must_match_exactly() {
        let (ctx, reg) = setup();
        for tag in ["HIGH", " low ", "Medium"] {
            let err = call(&reg, ADD_TODO, json!({"title": "x", "content": "", "tag": tag}))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidInput { .. }), "{tag:?} gave {err:?}");
        }
        assert!(ctx.store.is_empty());
    }

    #[tokio::test]
    async fn list_todos_filters_by_status() {
        let (_ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "a", "content": ""})).await.unwrap();
        call(&reg, ADD_TODO, json!({"title": "b", "content": ""})).await.unwrap();
        call(&reg, MARK_TODO_COMPLETE, json!({"id": 2, "completed": true})).await.unwrap();

        let titles = |out: ToolOutput| -> Vec<String> {
            let todos: Vec<Todo> = serde_json::from_str(text(&out)).unwrap();
            todos.into_iter().map(|t| t.title).collect()
        };
        assert_eq!(titles(call(&reg, LIST_TODOS, json!({})).await.unwrap()), vec!["a", "b"]);
        assert_eq!(titles(call(&reg, LIST_TODOS, Value::Null).await.unwrap()), vec!["a", "b"]);
        assert_eq!(titles(call(&reg, LIST_TODOS, json!({"filter": "pending"})).await.unwrap()), vec!["a"]);
        assert_eq!(titles(call(&reg, LIST_TODOS, json!({"filter": "completed"})).await.unwrap()), vec!["b"]);

        let err = call(&reg, LIST_TODOS, json!({"filter": "someday"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn search_todos_matches_title_content_and_tag() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "Buy milk", "content": "2%", "tag": "low"})).await.unwrap();
        call(&reg, ADD_TODO, json!({"title": "Fix bike", "content": "rear brake"})).await.unwrap();
        call(&reg, ADD_TODO, json!({"title": "Email", "content": "ask about MILK order", "tag": "high"})).await.unwrap();

        let ids = |out: ToolOutput| -> Vec<u64> {
            let todos: Vec<Todo> = serde_json::from_str(text(&out)).unwrap();
            todos.into_iter().map(|t| t.id).collect()
        };
        assert_eq!(ids(call(&reg, SEARCH_TODOS, json!({"query": "milk"})).await.unwrap()), vec![1, 3]);
        assert_eq!(ids(call(&reg, SEARCH_TODOS, json!({"query": "HIGH"})).await.unwrap()), vec![3]);
        assert!(ids(call(&reg, SEARCH_TODOS, json!({"query": "zebra"})).await.unwrap()).is_empty());

        let record = &ctx.journal.entries()[0];
        assert_eq!(record.tool, SEARCH_TODOS);
        assert_eq!(record.outcome, CallOutcome::Ok { result: json!({"matchCount": 0}) });
    }

    #[tokio::test]
    async fn mark_todo_complete_toggles_both_ways() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "Buy milk", "content": ""})).await.unwrap();

        let out = call(&reg, MARK_TODO_COMPLETE, json!({"id": 1, "completed": true})).await.unwrap();
        assert_eq!(text(&out), "Todo \"Buy milk\" (ID 1) marked as completed.");
        assert!(ctx.store.get(1).unwrap().completed);

        let out = call(&reg, MARK_TODO_COMPLETE, json!({"id": 1, "completed": false})).await.unwrap();
        assert_eq!(text(&out), "Todo \"Buy milk\" (ID 1) marked as incomplete.");
        assert!(!ctx.store.get(1).unwrap().completed);
    }

    #[tokio::test]
    async fn mark_todo_complete_missing_id_is_not_found() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "a", "content": ""})).await.unwrap();
        let before = ctx.store.snapshot();

        let err = call(&reg, MARK_TODO_COMPLETE, json!({"id": 7, "completed": true})).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "mark_todo_complete: todo with ID 7 not found.");
        assert_eq!(ctx.store.snapshot(), before);

        let record = &ctx.journal.entries()[0];
        assert!(record.is_error());
        assert_eq!(record.input, json!({"id": 7, "completed": true}));
    }

    #[tokio::test]
    async fn delete_without_interaction_proceeds() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "a", "content": ""})).await.unwrap();

        let out = call(&reg, DELETE_TODO, json!({"id": 1})).await.unwrap();
        assert_eq!(text(&out), "Todo \"a\" (ID 1) deleted.");
        assert!(ctx.store.is_empty());

        let err = call(&reg, DELETE_TODO, json!({"id": 1})).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_asks_and_proceeds_on_approval() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "a", "content": ""})).await.unwrap();

        let answer = FixedAnswer::new(ConfirmationDecision::Approve);
        let agent = AgentContext::with_interaction(answer.clone());
        reg.execute(DELETE_TODO, &json!({"id": 1}), &agent).await.unwrap();

        assert!(ctx.store.is_empty());
        let asked = answer.asked.lock().unwrap();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].message, "Allow AI agent to delete todo #1?");
    }

    #[tokio::test]
    async fn delete_denied_leaves_store_unchanged() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "a", "content": ""})).await.unwrap();
        let before = ctx.store.snapshot();

        let agent = AgentContext::with_interaction(FixedAnswer::new(ConfirmationDecision::Deny));
        let err = reg.execute(DELETE_TODO, &json!({"id": 1}), &agent).await.unwrap_err();

        assert!(err.is_user_denied());
        assert!(!err.is_not_found());
        assert_eq!(ctx.store.snapshot(), before);
        assert!(ctx.journal.entries()[0].is_error());
    }

    #[tokio::test]
    async fn delete_approved_but_missing_is_not_found() {
        let (_ctx, reg) = setup();
        let agent = AgentContext::with_interaction(FixedAnswer::new(ConfirmationDecision::Approve));
        let err = reg.execute(DELETE_TODO, &json!({"id": 5}), &agent).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_interaction_failure_is_reported() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "a", "content": ""})).await.unwrap();

        let agent = AgentContext::with_interaction(Arc::new(BrokenInteraction));
        let err = reg.execute(DELETE_TODO, &json!({"id": 1}), &agent).await.unwrap_err();
        assert!(matches!(err, ToolError::Interaction { .. }));
        assert!(err.to_string().contains("prompt window closed"));
        assert_eq!(ctx.store.len(), 1);
    }

    #[tokio::test]
    async fn pending_confirmation_does_not_block_other_calls() {
        let (ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "a", "content": ""})).await.unwrap();
        call(&reg, ADD_TODO, json!({"title": "b", "content": ""})).await.unwrap();

        let (tx, mut rx) = crate::agent::confirmation_channel();
        let agent = AgentContext::with_interaction(Arc::new(crate::agent::ChannelInteraction::new(tx)));
        let reg = Arc::new(reg);

        let pending = {
            let reg = reg.clone();
            tokio::spawn(async move { reg.execute(DELETE_TODO, &json!({"id": 1}), &agent).await })
        };

        // While the question is open, other tools keep working.
        let (request, reply) = rx.recv().await.unwrap();
        assert_eq!(request.tool_name, DELETE_TODO);
        call(&reg, MARK_TODO_COMPLETE, json!({"id": 2, "completed": true})).await.unwrap();
        assert!(ctx.store.get(2).unwrap().completed);
        assert_eq!(ctx.store.len(), 2);

        reply.send(ConfirmationDecision::Approve).unwrap();
        pending.await.unwrap().unwrap();
        assert_eq!(ctx.store.len(), 1);
    }

    #[tokio::test]
    async fn stats_reflect_store() {
        let (_ctx, reg) = setup();
        call(&reg, ADD_TODO, json!({"title": "a", "content": "", "tag": "low"})).await.unwrap();
        call(&reg, ADD_TODO, json!({"title": "b", "content": "", "tag": "low"})).await.unwrap();
        call(&reg, ADD_TODO, json!({"title": "c", "content": ""})).await.unwrap();
        call(&reg, MARK_TODO_COMPLETE, json!({"id": 3, "completed": true})).await.unwrap();

        let out = call(&reg, GET_TODO_STATS, json!({})).await.unwrap();
        let stats: TodoStats = serde_json::from_str(text(&out)).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.by_tag.get("low"), Some(&2));
        assert_eq!(stats.by_tag.get("untagged"), Some(&1));

        let raw: Value = serde_json::from_str(text(&out)).unwrap();
        assert!(raw.get("byTag").is_some());
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let (_ctx, reg) = setup();

        let out = call(&reg, ADD_TODO, json!({"title": "Buy milk", "content": "2%", "tag": "low"}))
            .await
            .unwrap();
        assert_eq!(text(&out), "Todo \"Buy milk\" created with ID 1.");

        let listed = |out: ToolOutput| -> Vec<Todo> { serde_json::from_str(text(&out)).unwrap() };
        let pending = listed(call(&reg, LIST_TODOS, json!({"filter": "pending"})).await.unwrap());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, 1);
        assert!(!pending[0].completed);

        call(&reg, MARK_TODO_COMPLETE, json!({"id": 1, "completed": true})).await.unwrap();
        let completed = listed(call(&reg, LIST_TODOS, json!({"filter": "completed"})).await.unwrap());
        assert_eq!(completed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1]);
        assert!(listed(call(&reg, LIST_TODOS, json!({"filter": "pending"})).await.unwrap()).is_empty());

        call(&reg, DELETE_TODO, json!({"id": 1})).await.unwrap();
        let out = call(&reg, GET_TODO_STATS, json!({})).await.unwrap();
        let stats: TodoStats = serde_json::from_str(text(&out)).unwrap();
        assert_eq!(stats.total, 0);
    }
}
