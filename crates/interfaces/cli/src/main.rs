mod interactive;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use webtodo_config::AppConfig;
use webtodo_runtime::TodoSession;
use webtodo_tools::{
    AgentContext, ParamType, TodoContext, ToolOutput, ToolRegistry, ToolSpec, todo_registry,
};

#[derive(Debug, Parser)]
#[command(
    name = "webtodo",
    version,
    about = "A todo list exposed to AI agents as a tool catalog"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the tool catalog with parameters.
    Tools,
    /// Print the registration manifest as JSON.
    Manifest,
    /// Invoke one tool on a fresh store (key=value arguments).
    /// Example: webtodo call add_todo title="Buy milk" content=2% tag=low
    Call {
        /// Tool name to invoke
        name: String,
        /// Arguments as key=value pairs; non-string parameters are read as JSON
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Interactive session over one store.
    Repl,
    /// Register the catalog with the configured host and report the outcome.
    Register,
    /// Run the add / complete / delete walkthrough.
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;
    let _log_guard = init_logging(&config)?;

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Tools => {
            print_tools(&inspection_registry().list_specs());
        }
        Commands::Manifest => {
            println!("{}", serde_json::to_string_pretty(&inspection_registry().manifest())?);
        }
        Commands::Call { name, args } => {
            let session = TodoSession::start(&config)?;
            let spec = session.registry.get(&name).map(|tool| tool.spec());
            let args = parse_key_values(spec.as_ref(), &args)?;
            let output = session.call(&name, &args, &AgentContext::headless()).await;
            print_outcome(&name, output);
        }
        Commands::Repl => {
            let session = TodoSession::start(&config)?;
            interactive::run_repl(&session, config.tools.confirm_deletes).await?;
        }
        Commands::Register => {
            let session = TodoSession::start(&config)?;
            print_registration(&session);
        }
        Commands::Demo => {
            let session = TodoSession::start(&config)?;
            run_demo(&session).await?;
        }
    }

    Ok(())
}

/// stderr logging filtered by `RUST_LOG`, falling back to the configured
/// level, plus an optional plain-text file sink.
fn init_logging(config: &AppConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.telemetry.log_level))?;

    let (file_layer, guard) = match config.log_file() {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let dir = dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            let Some(file_name) = path.file_name() else {
                bail!("telemetry.log_file has no file name: {}", path.display());
            };
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(&dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

/// The catalog on its own, for commands that only inspect it.
fn inspection_registry() -> ToolRegistry {
    todo_registry(&TodoContext::default())
}

/// Turn `key=value` pairs into a JSON object.  Values of parameters that
/// `spec` declares as strings are kept verbatim; any other value that parses
/// as JSON (`3`, `true`) keeps that type, and the rest are strings.
pub(crate) fn parse_key_values(spec: Option<&ToolSpec>, items: &[String]) -> Result<Value> {
    let mut map = Map::new();
    for item in items {
        let Some((key, raw)) = item.split_once('=') else {
            bail!("malformed argument '{item}' (expected key=value)");
        };
        let declared = spec
            .and_then(|spec| spec.params.iter().find(|p| p.name == key))
            .map(|p| p.param_type);
        let value = match declared {
            Some(ParamType::String) => Value::String(raw.to_string()),
            _ => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        };
        map.insert(key.to_string(), value);
    }
    Ok(Value::Object(map))
}

pub(crate) fn print_tools(specs: &[ToolSpec]) {
    println!("── registered tools ─────────────────────────────────");
    for spec in specs {
        let hint = match (spec.annotations.read_only_hint, spec.annotations.destructive_hint) {
            (_, Some(true)) => " (destructive)",
            (Some(true), _) => " (read-only)",
            _ => "",
        };
        println!("  {}{hint} — {}", spec.name, spec.description);
        for p in &spec.params {
            let choices = if p.enum_values.is_empty() {
                String::new()
            } else {
                format!(" one of: {}", p.enum_values.join("|"))
            };
            println!(
                "      {} [{}, {}] — {}{choices}",
                p.name,
                p.param_type.as_str(),
                if p.required { "required" } else { "optional" },
                p.description
            );
        }
    }
    println!("  ({} tools total)", specs.len());
}

pub(crate) fn print_outcome(name: &str, outcome: Result<ToolOutput, webtodo_tools::ToolError>) {
    match outcome {
        Ok(output) => {
            println!("tool '{name}' succeeded:");
            println!("{}", output.first_text().unwrap_or_default());
        }
        Err(err) => eprintln!("tool '{name}' failed: {err}"),
    }
}

fn print_registration(session: &TodoSession) {
    let registration = &session.registration;
    println!("── registration ─────────────────────────────────────");
    println!("  status : {}", registration.status);
    println!("  detail : {}", registration.status.message());
    println!("  host   : {}", registration.host.as_deref().unwrap_or("(none)"));
    println!("  tools  : {}", registration.invoker.names().join(", "));
    if let Some(table) = &registration.diagnostics {
        println!();
        println!("{}", table.render());
    }
}

async fn run_demo(session: &TodoSession) -> Result<()> {
    // Only an in-process host can be driven as an agent from here.
    let via_host = session.registration.host.as_deref() == Some("in-process");
    let agent = AgentContext::headless();

    let steps = [
        ("add_todo", json!({"title": "Buy milk", "content": "2%", "tag": "low"})),
        ("list_todos", json!({"filter": "pending"})),
        ("mark_todo_complete", json!({"id": 1, "completed": true})),
        ("list_todos", json!({"filter": "completed"})),
        ("delete_todo", json!({"id": 1})),
        ("get_todo_stats", json!({})),
    ];
    for (name, args) in steps {
        println!("> {name} {args}");
        let output = if via_host {
            session.agent_call(name, &args, &agent).await
        } else {
            session.call(name, &args, &agent).await
        };
        match output {
            Ok(output) => println!("{}", output.first_text().unwrap_or_default()),
            Err(err) => bail!("demo step {name} failed: {err}"),
        }
    }

    println!();
    println!("── tool log ─────────────────────────────────────────");
    for record in session.journal.entries().iter().rev() {
        println!("  {}", record.summary_line());
    }
    Ok(())
}
