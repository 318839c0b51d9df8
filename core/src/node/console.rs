//! Node console: line commands read off the scheduler thread
//!
//! Every reply line starts with `(cmd: <command>)` so a monitoring tool on
//! the serial link can tell which request produced it.

use crate::packet::MacAddress;
use crate::routing::RoutingTable;
use crate::signal::CrossContextSignal;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

pub const PROMPT: &str = "AetherMesh> ";

/// One console read: a line, or `None` at end of input
pub type LineResult = io::Result<Option<String>>;

type LineSource = Arc<dyn Fn() -> LineResult + Send + Sync>;

/// Recognized console commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ShowRouting,
    ShowMac,
    ShowNeighbors,
    ShowTopology,
    /// Originate a UDP packet; executed by the node, not against the table
    Send { dest: MacAddress, text: String },
    Usage(&'static str),
    Empty,
    Unknown(String),
}

const SEND_USAGE: &str = "Usage: send <mac|broadcast> <text>";

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Command::Empty,
            "show routing" => Command::ShowRouting,
            "show mac" => Command::ShowMac,
            "show neighbors" => Command::ShowNeighbors,
            "show topology" => Command::ShowTopology,
            other => match other.strip_prefix("send ") {
                Some(rest) => Self::parse_send(rest),
                None if other == "send" => Command::Usage(SEND_USAGE),
                None => Command::Unknown(other.to_string()),
            },
        }
    }

    fn parse_send(rest: &str) -> Self {
        let (dest, text) = match rest.trim_start().split_once(' ') {
            Some((dest, text)) if !text.trim().is_empty() => (dest, text.trim()),
            _ => return Command::Usage(SEND_USAGE),
        };
        let dest = if dest.eq_ignore_ascii_case("broadcast") {
            MacAddress::BROADCAST
        } else {
            match dest.parse() {
                Ok(dest) => dest,
                Err(_) => return Command::Usage(SEND_USAGE),
            }
        };
        Command::Send {
            dest,
            text: text.to_string(),
        }
    }

    /// Reply lines for this command against `routes`
    pub fn execute(&self, routes: &RoutingTable) -> Vec<String> {
        match self {
            Command::ShowRouting => routes
                .entries()
                .map(|(dest, route)| {
                    format!(
                        "(cmd: show routing) {} via {} distance {}",
                        dest, route.next_hop, route.distance
                    )
                })
                .collect(),
            Command::ShowMac => vec![format!("(cmd: show mac) {}", routes.local())],
            Command::ShowNeighbors => {
                vec![format!("(cmd: show neighbors) {}", quoted_neighbors(routes))]
            }
            Command::ShowTopology => vec![format!(
                "(cmd: show topology) {} {}",
                routes.local(),
                quoted_neighbors(routes)
            )],
            Command::Usage(usage) => vec![usage.to_string()],
            Command::Send { .. } | Command::Empty => Vec::new(),
            Command::Unknown(_) => vec!["Unknown command".to_string()],
        }
    }
}

/// One line from `reader` without its line ending. Invalid UTF-8 is
/// replaced rather than reported so a stray byte cannot kill the console.
fn read_line_lossy<B: BufRead>(reader: &mut B) -> LineResult {
    let mut raw = Vec::new();
    if reader.read_until(b'\n', &mut raw)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&raw);
    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

/// `['a', 'b']`, the list form the visualizer parses
fn quoted_neighbors(routes: &RoutingTable) -> String {
    let quoted: Vec<String> = routes
        .neighbors()
        .iter()
        .map(|n| format!("'{}'", n))
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Reads lines on a dedicated thread and hands them to the node's scheduler
/// through a `CrossContextSignal`.
///
/// `next_line` is cancel-safe: if the future is dropped while the read is
/// outstanding, the next call picks up the same read instead of starting a
/// second one.
pub struct Console {
    signal: CrossContextSignal<LineResult>,
    source: LineSource,
    pending: bool,
}

impl Console {
    /// Console on the process stdin, printing the prompt before each read
    pub fn stdin() -> Self {
        Self::from_source(|| {
            print!("{}", PROMPT);
            io::stdout().flush()?;

            read_line_lossy(&mut io::stdin().lock())
        })
    }

    /// Console over any blocking line source
    pub fn from_source<F>(source: F) -> Self
    where
        F: Fn() -> LineResult + Send + Sync + 'static,
    {
        Self {
            signal: CrossContextSignal::new(),
            source: Arc::new(source),
            pending: false,
        }
    }

    /// Wait for the next line without blocking the scheduler
    pub async fn next_line(&mut self) -> LineResult {
        if !self.pending {
            let source = Arc::clone(&self.source);
            self.signal.run_blocking_and_notify(move || source())?;
            self.pending = true;
        }

        let line = self.signal.wait().await;
        self.pending = false;
        line
    }
}
