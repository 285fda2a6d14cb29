use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod agent;
pub mod journal;
pub mod store;

pub use agent::{
    AgentContext, ChannelInteraction, ConfirmationDecision, ConfirmationReceiver,
    ConfirmationRequest, ConfirmationSender, UserInteraction, confirmation_channel,
};
pub use journal::{CallJournal, CallOutcome, ToolCallRecord};
pub use store::{NewTodo, SharedTodoStore, StatusFilter, Tag, Todo, TodoStats, TodoStore};

// ── Errors ───────────────────────────────────────────────────────────────────

/// Failure raised by a tool handler and propagated to the invoking agent.
///
/// An agent tells a missing todo (`NotFound`) from a refusal by the human
/// (`UserDenied`) by variant, not by message text.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool}: todo with ID {id} not found.")]
    NotFound { tool: String, id: u64 },
    #[error("{tool}: user declined the action on todo #{id}.")]
    UserDenied { tool: String, id: u64 },
    #[error("{tool}: invalid input: {message}")]
    InvalidInput { tool: String, message: String },
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("{tool}: user interaction failed: {message}")]
    Interaction { tool: String, message: String },
    #[error("failed to render tool result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    pub fn not_found(tool: &str, id: u64) -> Self {
        Self::NotFound { tool: tool.to_string(), id }
    }

    pub fn user_denied(tool: &str, id: u64) -> Self {
        Self::UserDenied { tool: tool.to_string(), id }
    }

    pub fn invalid_input(tool: &str, message: impl Into<String>) -> Self {
        Self::InvalidInput { tool: tool.to_string(), message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_user_denied(&self) -> bool {
        matches!(self, Self::UserDenied { .. })
    }
}

// ── Tool trait and registry ──────────────────────────────────────────────────

/// JSON Schema type for a tool parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

/// Describes a single parameter that a tool accepts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(default)]
    pub param_type: ParamType,
    /// Allowed values when the parameter is an enum.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl ToolParam {
    /// Convenience constructor for the most common case (required string param).
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            ..Default::default()
        }
    }

    /// Convenience constructor for an optional string param.
    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            ..Default::default()
        }
    }

    pub fn of_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }
}

/// Side-effect hints published alongside a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
}

impl ToolAnnotations {
    pub fn read_only() -> Self {
        Self { read_only_hint: Some(true), destructive_hint: None }
    }

    pub fn destructive() -> Self {
        Self { read_only_hint: Some(false), destructive_hint: Some(true) }
    }

    pub fn is_empty(&self) -> bool {
        self.read_only_hint.is_none() && self.destructive_hint.is_none()
    }
}

/// Static metadata about a tool, used by the agent to decide which tool to call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
    #[serde(default)]
    pub annotations: ToolAnnotations,
}

impl ToolSpec {
    /// Generate the JSON Schema object describing this tool's input.
    ///
    /// ```json
    /// {
    ///   "type": "object",
    ///   "properties": { "id": { "type": "integer", "description": "..." } },
    ///   "required": ["id"]
    /// }
    /// ```
    ///
    /// `required` is omitted when no parameter is required.
    pub fn input_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required: Vec<String> = Vec::new();

        for p in &self.params {
            let mut prop = serde_json::json!({
                "type": p.param_type.as_str(),
                "description": p.description,
            });
            if !p.enum_values.is_empty() {
                prop["enum"] = serde_json::json!(p.enum_values);
            }
            properties.insert(p.name.clone(), prop);
            if p.required {
                required.push(p.name.clone());
            }
        }

        let mut schema = serde_json::json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = serde_json::json!(required);
        }
        schema
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
            annotations: (!self.annotations.is_empty()).then_some(self.annotations),
        }
    }

    /// Comma-separated parameter names, in declaration order.
    pub fn param_list(&self) -> String {
        self.params
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One entry of the registration manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// The `{ "tools": [...] }` payload handed to a tool host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogManifest {
    pub tools: Vec<ToolDescriptor>,
}

/// A single block of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// The result returned after a tool runs: `{ "content": [{ "type": "text", ... }] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Pretty-printed JSON snapshot of `value` as a single text block.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ToolError> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }

    /// Text of the first block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().map(|block| match block {
            ContentBlock::Text { text } => text.as_str(),
        }).next()
    }
}

/// Deserialize a tool's arguments into its typed input struct.
///
/// A missing object (`null`) is treated as `{}` so tools without required
/// parameters can be called with no input at all.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> Result<T, ToolError> {
    let args = if args.is_null() { Value::Object(Default::default()) } else { args.clone() };
    serde_json::from_value(args).map_err(|err| ToolError::invalid_input(tool, err.to_string()))
}

/// Trait implemented by every tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn execute(&self, args: &Value, agent: &AgentContext) -> Result<ToolOutput, ToolError>;
}

/// Ordered, name-unique set of tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Append a tool.  Returns `false` (and leaves the registry untouched)
    /// when a tool with the same name is already registered.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let name = tool.spec().name;
        if self.get(&name).is_some() {
            return false;
        }
        self.tools.push(tool);
        true
    }

    pub fn list_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.spec().name).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.spec().name == name).cloned()
    }

    pub fn manifest(&self) -> CatalogManifest {
        CatalogManifest {
            tools: self.tools.iter().map(|t| t.spec().descriptor()).collect(),
        }
    }

    /// Look a tool up by name and run it.  Handler errors pass through as-is.
    pub async fn execute(
        &self,
        name: &str,
        args: &Value,
        agent: &AgentContext,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(args, agent).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ── Built-in tools ───────────────────────────────────────────────────────────

pub mod builtins;
pub use builtins::{TodoContext, todo_registry};

// ── ToolRegistry tests ───────────────────────────────────────────────────────
