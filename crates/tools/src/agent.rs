//! Per-call agent context and the optional user-confirmation capability.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// A yes/no question routed to the human behind an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub tool_name: String,
    pub message: String,
}

/// The user's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationDecision {
    Approve,
    Deny,
}

/// A channel through which a tool can ask the user before doing something
/// destructive.  Implementations may suspend indefinitely.
#[async_trait]
pub trait UserInteraction: Send + Sync {
    async fn confirm(&self, request: ConfirmationRequest) -> Result<ConfirmationDecision>;
}

/// What the invoking agent offers to a tool call.
///
/// A context without an interaction capability (`AgentContext::headless`)
/// means destructive tools proceed without asking.
#[derive(Clone, Default)]
pub struct AgentContext {
    interaction: Option<Arc<dyn UserInteraction>>,
}

impl fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentContext")
            .field("interaction", &self.interaction.is_some())
            .finish()
    }
}

impl AgentContext {
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn with_interaction(interaction: Arc<dyn UserInteraction>) -> Self {
        Self {
            interaction: Some(interaction),
        }
    }

    pub fn interaction(&self) -> Option<&dyn UserInteraction> {
        self.interaction.as_deref()
    }

    pub fn supports_interaction(&self) -> bool {
        self.interaction.is_some()
    }
}

// ── Channel-backed interaction ───────────────────────────────────────────────

/// The tool sends a `ConfirmationRequest`, and the UI side responds with a
/// `ConfirmationDecision` via the oneshot.
pub type ConfirmationSender =
    mpsc::Sender<(ConfirmationRequest, oneshot::Sender<ConfirmationDecision>)>;
pub type ConfirmationReceiver =
    mpsc::Receiver<(ConfirmationRequest, oneshot::Sender<ConfirmationDecision>)>;

/// Create a new confirmation channel pair.
pub fn confirmation_channel() -> (ConfirmationSender, ConfirmationReceiver) {
    mpsc::channel(16)
}

/// `UserInteraction` that forwards every question over a confirmation channel.
pub struct ChannelInteraction {
    tx: ConfirmationSender,
}

impl ChannelInteraction {
    pub fn new(tx: ConfirmationSender) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl UserInteraction for ChannelInteraction {
    async fn confirm(&self, request: ConfirmationRequest) -> Result<ConfirmationDecision> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| anyhow::anyhow!("confirmation channel closed"))?;

        reply_rx
            .await
            .map_err(|_| anyhow::anyhow!("confirmation response channel dropped"))
    }
}
