//! Built-in tool implementations.

mod todo;

pub use todo::{
    ADD_TODO, AddTodoTool, DELETE_TODO, DeleteTodoTool, GET_TODO_STATS, LIST_TODOS,
    ListTodosTool, MARK_TODO_COMPLETE, MarkTodoCompleteTool, SEARCH_TODOS, SearchTodosTool,
    TodoStatsTool,
};

use std::sync::Arc;

use serde_json::Value;

use crate::journal::CallJournal;
use crate::store::SharedTodoStore;
use crate::{ToolError, ToolOutput, ToolRegistry};

/// State shared by every todo tool: the store they operate on and the
/// journal they report to.
#[derive(Debug, Clone, Default)]
pub struct TodoContext {
    pub store: SharedTodoStore,
    pub journal: CallJournal,
}

impl TodoContext {
    pub fn new(store: SharedTodoStore, journal: CallJournal) -> Self {
        Self { store, journal }
    }

    /// Journal the outcome of one call and hand the result back to the caller.
    /// `summary` is what gets logged on success; it is usually smaller than
    /// the output itself (a count instead of the full list).
    fn finish(
        &self,
        tool: &str,
        args: &Value,
        outcome: Result<(ToolOutput, Value), ToolError>,
    ) -> Result<ToolOutput, ToolError> {
        match outcome {
            Ok((output, summary)) => {
                self.journal.record_ok(tool, args.clone(), summary);
                Ok(output)
            }
            Err(err) => {
                self.journal.record_error(tool, args.clone(), err.to_string());
                Err(err)
            }
        }
    }
}

/// Build the fixed todo catalog, in publication order.
pub fn todo_registry(ctx: &TodoContext) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    let tools: Vec<Arc<dyn crate::Tool>> = vec![
        Arc::new(AddTodoTool { ctx: ctx.clone() }),
        Arc::new(ListTodosTool { ctx: ctx.clone() }),
        Arc::new(SearchTodosTool { ctx: ctx.clone() }),
        Arc::new(MarkTodoCompleteTool { ctx: ctx.clone() }),
        Arc::new(DeleteTodoTool { ctx: ctx.clone() }),
        Arc::new(TodoStatsTool { ctx: ctx.clone() }),
    ];
    for tool in tools {
        registry.register(tool);
    }
    registry
}
