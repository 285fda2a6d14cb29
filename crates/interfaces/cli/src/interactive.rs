use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use webtodo_runtime::TodoSession;
use webtodo_tools::{AgentContext, ConfirmationDecision, ConfirmationRequest, UserInteraction};

use crate::{parse_key_values, print_outcome, print_tools};

/// Asks the person at the terminal.  Anything other than `y`/`yes` denies.
struct StdinInteraction;

#[async_trait]
impl UserInteraction for StdinInteraction {
    async fn confirm(&self, request: ConfirmationRequest) -> Result<ConfirmationDecision> {
        let answer = tokio::task::spawn_blocking(move || -> Result<String> {
            print!("{} [y/N] ", request.message);
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .context("confirmation prompt task failed")??;
        Ok(decision_from_answer(&answer))
    }
}

fn decision_from_answer(answer: &str) -> ConfirmationDecision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => ConfirmationDecision::Approve,
        _ => ConfirmationDecision::Deny,
    }
}

/// Split a line on whitespace, keeping double-quoted runs together and
/// dropping the quotes: `title="Buy milk"` is one word.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_word = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

pub(crate) async fn run_repl(session: &TodoSession, confirm_deletes: bool) -> Result<()> {
    let agent = if confirm_deletes {
        AgentContext::with_interaction(Arc::new(StdinInteraction))
    } else {
        AgentContext::headless()
    };
    let mut changes = session.subscribe();

    println!("webtodo session ({})", session.status().message());
    println!("commands: <tool> [key=value ...], :tools, :log, :help, :quit");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        let bytes = stdin.read_line(&mut line)?;
        if bytes == 0 {
            println!("session closed");
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            ":quit" | ":exit" => {
                println!("session closed");
                break;
            }
            ":help" => {
                println!(":tools            list the catalog");
                println!(":log              recent tool calls, newest first");
                println!(":quit             leave the session");
                println!("<tool> k=v ...    invoke a tool, e.g. add_todo title=\"Buy milk\" content=2%");
                continue;
            }
            ":tools" => {
                print_tools(&session.registry.list_specs());
                continue;
            }
            ":log" => {
                let entries = session.journal.entries();
                if entries.is_empty() {
                    println!("(no tool calls yet)");
                }
                for record in entries.iter().take(20) {
                    println!("  {}", record.summary_line());
                }
                continue;
            }
            _ => {}
        }

        let words = split_words(line);
        let Some((name, rest)) = words.split_first() else {
            continue;
        };
        let spec = session.registry.get(name).map(|tool| tool.spec());
        let args = match parse_key_values(spec.as_ref(), rest) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        print_outcome(name, session.call(name, &args, &agent).await);

        if changes.has_changed().unwrap_or(false) {
            let revision = *changes.borrow_and_update();
            println!("(store revision {revision}, {} todos)", session.store.len());
        }
    }

    Ok(())
}
