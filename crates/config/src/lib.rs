use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

// ── Tool host selection ──────────────────────────────────────────────────────

/// Which tool-hosting capability the registration bridge should find at startup.
///
/// | Mode       | Behaviour                                                       |
/// |------------|-----------------------------------------------------------------|
/// | `native`   | The configured adapter is offered as the native host.           |
/// | `polyfill` | The configured adapter is offered as a fallback (polyfill) host.|
/// | `none`     | No host; the catalog is only exposed for inspection.            |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostMode {
    #[default]
    Native,
    Polyfill,
    #[serde(rename = "none", alias = "absent")]
    Absent,
}

impl HostMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Some(Self::Native),
            "polyfill" => Some(Self::Polyfill),
            "none" | "absent" | "off" => Some(Self::Absent),
            _ => None,
        }
    }
}

/// Concrete adapter used for whichever host slot `HostMode` selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostAdapterKind {
    /// Keep the published catalog in-process and dispatch calls to it.
    #[default]
    InProcess,
    /// Write the registration manifest to `manifest_path` on publish.
    ManifestFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub mode: HostMode,
    pub adapter: HostAdapterKind,
    /// Destination for the `manifest-file` adapter.
    pub manifest_path: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mode: HostMode::Native,
            adapter: HostAdapterKind::InProcess,
            manifest_path: ".webtodo/manifest.json".to_string(),
        }
    }
}

// ── Tools config ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Maximum number of tool calls kept in the call journal.  Oldest
    /// entries are dropped first.
    pub journal_capacity: usize,
    /// Offer the interactive confirmation capability to tool calls made from
    /// the REPL, so `delete_todo` asks before removing anything.
    pub confirm_deletes: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            journal_capacity: 256,
            confirm_deletes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    /// Optional file that receives log output in addition to stderr.
    /// Empty (the default) disables the file sink.
    pub log_file: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub host: HostConfig,
    pub tools: ToolsConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }

        config.apply_env_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides.  `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        // Host mode env override (takes precedence over config file).
        if let Some(value) = lookup("WEBTODO_HOST_MODE") {
            if !value.is_empty() {
                let Some(mode) = HostMode::parse(&value) else {
                    bail!("WEBTODO_HOST_MODE must be one of native, polyfill, none (got '{value}')");
                };
                self.host.mode = mode;
            }
        }
        Ok(())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }

    pub fn log_file(&self) -> Option<&Path> {
        let trimmed = self.telemetry.log_file.trim();
        (!trimmed.is_empty()).then(|| Path::new(trimmed))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
