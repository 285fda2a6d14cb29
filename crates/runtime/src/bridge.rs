//! One-shot publication of the tool catalog to whatever host is available.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use webtodo_tools::{AgentContext, ToolError, ToolOutput, ToolRegistry};

use crate::host::HostEnvironment;

/// Terminal outcome of registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Supported,
    Polyfill,
    Unsupported,
}

impl RegistrationStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Supported => "supported",
            Self::Polyfill => "polyfill",
            Self::Unsupported => "unsupported",
        }
    }

    /// Human-readable status line for a front end.
    pub fn message(self) -> &'static str {
        match self {
            Self::Supported => "Tool host supported natively",
            Self::Polyfill => "Tool host available via polyfill",
            Self::Unsupported => "No tool host available; catalog exposed for inspection only",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Diagnostic surface ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRow {
    pub name: String,
    pub description: String,
    pub params: String,
}

/// What would have been registered, in tabular form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticTable {
    pub rows: Vec<DiagnosticRow>,
}

impl DiagnosticTable {
    pub fn from_registry(registry: &ToolRegistry) -> Self {
        let rows = registry
            .list_specs()
            .into_iter()
            .map(|spec| DiagnosticRow {
                params: spec.param_list(),
                name: spec.name,
                description: spec.description,
            })
            .collect();
        Self { rows }
    }

    /// Render as an aligned plain-text table with a header row.
    pub fn render(&self) -> String {
        const HEADERS: [&str; 3] = ["name", "description", "params"];
        let mut widths = HEADERS.map(str::len);
        for row in &self.rows {
            widths[0] = widths[0].max(row.name.chars().count());
            widths[1] = widths[1].max(row.description.chars().count());
            widths[2] = widths[2].max(row.params.chars().count());
        }

        let line = |cells: [&str; 3]| -> String {
            let [a, b, c] = cells;
            format!(
                "{a:<w0$} | {b:<w1$} | {c:<w2$}",
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2]
            )
            .trim_end()
            .to_string()
        };

        let mut out = vec![line(HEADERS)];
        out.push(widths.map(|w| "-".repeat(w)).join("-+-"));
        for row in &self.rows {
            out.push(line([&row.name, &row.description, &row.params]));
        }
        out.join("\n")
    }
}

// ── Manual invocation ────────────────────────────────────────────────────────

/// Execute functions keyed by tool name, for scripts and developers poking at
/// the catalog directly.
#[derive(Clone)]
pub struct ManualInvoker {
    registry: Arc<ToolRegistry>,
}

impl ManualInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn invoke(
        &self,
        name: &str,
        args: &Value,
        agent: &AgentContext,
    ) -> Result<ToolOutput, ToolError> {
        self.registry.execute(name, args, agent).await
    }
}

// ── Bridge ───────────────────────────────────────────────────────────────────

pub struct Registration {
    pub status: RegistrationStatus,
    /// Name of the host the catalog went to, if any.
    pub host: Option<String>,
    pub invoker: ManualInvoker,
    /// Present only when `status` is `Unsupported`.
    pub diagnostics: Option<DiagnosticTable>,
}

/// Publishes the catalog once.  `register` consumes the bridge, so a second
/// registration cannot happen.
pub struct RegistrationBridge {
    env: HostEnvironment,
}

impl RegistrationBridge {
    pub fn new(env: HostEnvironment) -> Self {
        Self { env }
    }

    /// Try the native host, then the polyfill, then fall back to the
    /// diagnostic surface.  A failing publish is returned as-is; the next
    /// host is not tried.
    pub fn register(self, registry: Arc<ToolRegistry>) -> Result<Registration> {
        let invoker = ManualInvoker::new(registry.clone());
        info!("tools exposed for manual invocation: {}", invoker.names().join(", "));

        let candidates = [
            (self.env.native, RegistrationStatus::Supported),
            (self.env.polyfill, RegistrationStatus::Polyfill),
        ];
        for (host, status) in candidates {
            let Some(host) = host else { continue };
            host.provide_context(registry.clone())?;
            info!(
                host = host.name(),
                status = status.label(),
                tools = ?registry.names(),
                "tools registered"
            );
            return Ok(Registration {
                status,
                host: Some(host.name().to_string()),
                invoker,
                diagnostics: None,
            });
        }

        let table = DiagnosticTable::from_registry(&registry);
        info!("no tool host available; tools that would be registered:");
        for line in table.render().lines() {
            info!("{line}");
        }
        Ok(Registration {
            status: RegistrationStatus::Unsupported,
            host: None,
            invoker,
            diagnostics: Some(table),
        })
    }
}
