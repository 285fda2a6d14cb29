//! Tool host adapters: the things a catalog can be published to.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info};

use webtodo_config::{HostAdapterKind, HostConfig, HostMode};
use webtodo_tools::{AgentContext, CatalogManifest, ToolError, ToolOutput, ToolRegistry};

/// An environment facility that accepts a published tool catalog.
pub trait ToolHost: Send + Sync {
    /// Short label used in logs and status lines.
    fn name(&self) -> &str;

    /// Receive the catalog.  Called at most once per host by the bridge.
    fn provide_context(&self, catalog: Arc<ToolRegistry>) -> Result<()>;
}

// ── In-process host ──────────────────────────────────────────────────────────

/// Keeps the published catalog and dispatches agent calls into it.
#[derive(Default)]
pub struct InProcessHost {
    catalog: RwLock<Option<Arc<ToolRegistry>>>,
}

impl InProcessHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn published(&self) -> Option<Arc<ToolRegistry>> {
        self.catalog
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn is_published(&self) -> bool {
        self.published().is_some()
    }

    pub fn manifest(&self) -> Option<CatalogManifest> {
        self.published().map(|c| c.manifest())
    }

    /// Dispatch one agent call.  Before anything is published every name is
    /// unknown.
    pub async fn call(
        &self,
        name: &str,
        args: &Value,
        agent: &AgentContext,
    ) -> Result<ToolOutput, ToolError> {
        let catalog = self
            .published()
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        catalog.execute(name, args, agent).await
    }
}

impl ToolHost for InProcessHost {
    fn name(&self) -> &str {
        "in-process"
    }

    fn provide_context(&self, catalog: Arc<ToolRegistry>) -> Result<()> {
        debug!(tools = catalog.len(), "in-process host received catalog");
        *self.catalog.write().unwrap_or_else(|p| p.into_inner()) = Some(catalog);
        Ok(())
    }
}

// ── Manifest file host ───────────────────────────────────────────────────────

/// Writes the `{ "tools": [...] }` manifest to a file so an external host
/// process can pick it up.
pub struct ManifestFileHost {
    path: PathBuf,
}

impl ManifestFileHost {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ToolHost for ManifestFileHost {
    fn name(&self) -> &str {
        "manifest-file"
    }

    fn provide_context(&self, catalog: Arc<ToolRegistry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = serde_json::to_string_pretty(&catalog.manifest())?;
        fs::write(&self.path, rendered)?;
        info!(path = %self.path.display(), tools = catalog.len(), "wrote tool manifest");
        Ok(())
    }
}

// ── Host environment ─────────────────────────────────────────────────────────

/// The hosts the bridge may find at startup: a native one, a polyfill, both
/// or neither.
#[derive(Clone, Default)]
pub struct HostEnvironment {
    pub native: Option<Arc<dyn ToolHost>>,
    pub polyfill: Option<Arc<dyn ToolHost>>,
}

impl HostEnvironment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_native(mut self, host: Arc<dyn ToolHost>) -> Self {
        self.native = Some(host);
        self
    }

    pub fn with_polyfill(mut self, host: Arc<dyn ToolHost>) -> Self {
        self.polyfill = Some(host);
        self
    }

    /// Build the environment selected by `[host]`.  `in_process` is used
    /// when the adapter is `in-process`, so the caller keeps a handle to it.
    pub fn from_config(config: &HostConfig, in_process: Arc<InProcessHost>) -> Self {
        let adapter: Arc<dyn ToolHost> = match config.adapter {
            HostAdapterKind::InProcess => in_process,
            HostAdapterKind::ManifestFile => Arc::new(ManifestFileHost::new(&config.manifest_path)),
        };
        match config.mode {
            HostMode::Native => Self::empty().with_native(adapter),
            HostMode::Polyfill => Self::empty().with_polyfill(adapter),
            HostMode::Absent => Self::empty(),
        }
    }
}
