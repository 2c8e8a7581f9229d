//! Line-oriented control surface
//!
//! Stands in for the tray menu: reads commands from a line source, applies
//! them through the [`Controller`], and renders snapshots as text.

use anyhow::Result;
use log::{debug, warn};
use std::fmt::Write as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::controller::{AgentSnapshot, Controller};
use crate::status::Indicator;

pub const HELP: &str = "\
Commands:
  toggle <name>    Toggle enforcement for a service (name or display name)
  pause            Pause enforcement (status keeps refreshing)
  resume           Resume enforcement
  status [--json]  Show monitored services
  help             Show this help
  exit             Shut down the agent
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Toggle(String),
    Pause,
    Resume,
    Status { json: bool },
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Missing service name, usage: toggle <name>")]
    MissingServiceName,

    #[error("Unknown command: {0} (type 'help')")]
    UnknownCommand(String),
}

/// Parse one input line; blank lines yield `None`
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_lowercase().as_str() {
        "toggle" | "t" => {
            if rest.is_empty() {
                return Err(ParseError::MissingServiceName);
            }
            ConsoleCommand::Toggle(rest.to_string())
        }
        "pause" => ConsoleCommand::Pause,
        "resume" => ConsoleCommand::Resume,
        "status" | "s" => ConsoleCommand::Status { json: rest == "--json" },
        "help" | "?" => ConsoleCommand::Help,
        "exit" | "quit" | "q" => ConsoleCommand::Exit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

fn indicator_glyph(indicator: Indicator) -> &'static str {
    match indicator {
        Indicator::Shielded => "[shield]",
        Indicator::Warning => "[warn]",
        Indicator::Error => "[error]",
        Indicator::None => "",
    }
}

/// Render a snapshot as the menu would show it
pub fn render_snapshot(snapshot: &AgentSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", snapshot.title());
    for entry in &snapshot.services {
        let _ = writeln!(
            out,
            "  [{}] {:<24} {:<18} {}",
            if entry.enforced { "x" } else { " " },
            entry.display_name,
            entry.last_known_status.status_line(),
            indicator_glyph(entry.indicator())
        );
    }
    out
}

/// Resolve a user-supplied name against service names, then display names
fn resolve_name(snapshot: &AgentSnapshot, input: &str) -> Option<String> {
    snapshot
        .services
        .iter()
        .find(|e| e.name == input)
        .or_else(|| {
            snapshot
                .services
                .iter()
                .find(|e| e.display_name.eq_ignore_ascii_case(input))
        })
        .map(|e| e.name.clone())
}

/// Execute one command; returns `false` once the console should stop
pub fn execute<W: std::fmt::Write>(controller: &Controller, command: ConsoleCommand, out: &mut W) -> bool {
    match command {
        ConsoleCommand::Toggle(input) => {
            let snapshot = controller.current_snapshot();
            let name = resolve_name(&snapshot, &input).unwrap_or(input);
            match controller.toggle_enforcement(&name) {
                Ok(enforced) => {
                    let _ = writeln!(out, "{}: enforcement {}", name, if enforced { "on" } else { "off" });
                }
                Err(e) => {
                    let _ = writeln!(out, "{}", e);
                }
            }
        }
        ConsoleCommand::Pause => {
            controller.pause();
            let _ = writeln!(out, "Monitoring paused");
        }
        ConsoleCommand::Resume => {
            controller.resume();
            let _ = writeln!(out, "Monitoring resumed");
        }
        ConsoleCommand::Status { json } => {
            let snapshot = controller.current_snapshot();
            if json {
                match serde_json::to_string_pretty(&snapshot) {
                    Ok(text) => {
                        let _ = writeln!(out, "{}", text);
                    }
                    Err(e) => warn!("Failed to serialize snapshot: {}", e),
                }
            } else {
                let _ = write!(out, "{}", render_snapshot(&snapshot));
            }
        }
        ConsoleCommand::Help => {
            let _ = write!(out, "{}", HELP);
        }
        ConsoleCommand::Exit => {
            controller.shutdown();
            return false;
        }
    }
    true
}

/// Read commands until `exit`, end of input, or an external shutdown
pub async fn run<R, W>(controller: &Controller, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if controller.is_shutdown_requested() {
            break;
        }

        let mut reply = String::new();
        let keep_going = match parse_command(&line) {
            Ok(Some(command)) => {
                debug!("Console command: {:?}", command);
                execute(controller, command, &mut reply)
            }
            Ok(None) => true,
            Err(e) => {
                reply = format!("{}\n", e);
                true
            }
        };

        output.write_all(reply.as_bytes()).await?;
        output.flush().await?;
        if !keep_going {
            break;
        }
    }
    Ok(())
}
