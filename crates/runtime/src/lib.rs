pub mod bridge;
pub mod host;

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::watch;
use tracing::info;

use webtodo_config::AppConfig;
use webtodo_tools::{
    AgentContext, CallJournal, SharedTodoStore, TodoContext, ToolError, ToolOutput, ToolRegistry,
    todo_registry,
};

pub use bridge::{
    DiagnosticRow, DiagnosticTable, ManualInvoker, Registration, RegistrationBridge,
    RegistrationStatus,
};
pub use host::{HostEnvironment, InProcessHost, ManifestFileHost, ToolHost};

/// One running todo application: the store, the journal, the published
/// catalog and the outcome of registering it.
pub struct TodoSession {
    pub store: SharedTodoStore,
    pub journal: CallJournal,
    pub registry: Arc<ToolRegistry>,
    pub registration: Registration,
    in_process: Arc<InProcessHost>,
}

impl TodoSession {
    /// Build a session from configuration and register its catalog once.
    pub fn start(config: &AppConfig) -> Result<Self> {
        let in_process = Arc::new(InProcessHost::new());
        let env = HostEnvironment::from_config(&config.host, in_process.clone());
        Self::start_with(env, in_process, config.tools.journal_capacity)
    }

    /// Like [`start`](Self::start) with an explicit host environment.
    pub fn start_with(
        env: HostEnvironment,
        in_process: Arc<InProcessHost>,
        journal_capacity: usize,
    ) -> Result<Self> {
        let store = SharedTodoStore::default();
        let journal = CallJournal::with_capacity(journal_capacity);
        let registry = Arc::new(todo_registry(&TodoContext::new(store.clone(), journal.clone())));

        let registration = RegistrationBridge::new(env).register(registry.clone())?;
        info!(status = %registration.status, "{}", registration.status.message());

        Ok(Self { store, journal, registry, registration, in_process })
    }

    pub fn status(&self) -> RegistrationStatus {
        self.registration.status
    }

    /// Invoke a tool by name through the manual-invocation surface.
    pub async fn call(
        &self,
        name: &str,
        args: &Value,
        agent: &AgentContext,
    ) -> Result<ToolOutput, ToolError> {
        self.registration.invoker.invoke(name, args, agent).await
    }

    /// Invoke a tool the way a connected agent would: through the in-process
    /// host.  Fails with `UnknownTool` unless the catalog was published there.
    pub async fn agent_call(
        &self,
        name: &str,
        args: &Value,
        agent: &AgentContext,
    ) -> Result<ToolOutput, ToolError> {
        self.in_process.call(name, args, agent).await
    }

    /// Revision counter that ticks on every store mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe()
    }
}
