//! Interactive send/receive loop
//!
//! Lines typed on stdin are queued on the handler; anything the worker has
//! received is echoed on every poll tick. `q` or Ctrl+C ends the session.

use anyhow::Result;
use colored::Colorize;
use sercom_core::ConsoleConfig;
use sercom_hardware::SerialHandler;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info, warn};

use crate::input::InputLines;

/// What the console should do with one line of user input
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Quit,
    Send(String),
}

/// Interpret a line typed by the user
pub fn parse_input(line: &str, line_ending: &str) -> Input {
    let trimmed = line.trim_end_matches(&['\r', '\n'][..]);
    if trimmed.eq_ignore_ascii_case("q") {
        Input::Quit
    } else {
        Input::Send(format!("{}{}", trimmed, line_ending))
    }
}

/// Run the console until the user quits or input closes
pub async fn run(
    handler: Arc<SerialHandler>,
    input: &mut InputLines,
    config: &ConsoleConfig,
) -> Result<()> {
    let mut poll = tokio::time::interval(Duration::from_millis(config.poll_interval_ms.max(1)));

    println!("{}", "Type a line to send it, 'q' to quit.".dimmed());

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    debug!("input closed");
                    break;
                };
                match parse_input(&line, &config.line_ending) {
                    Input::Quit => break,
                    Input::Send(data) => {
                        if let Err(e) = handler.send_data(&data) {
                            eprintln!("{} {}", "Not sent:".red(), e);
                        }
                    }
                }
            }
            _ = poll.tick() => {
                if handler.is_available() {
                    let data = handler.receive_data();
                    print!("{}", String::from_utf8_lossy(&data));
                    std::io::stdout().flush()?;
                }
                if let Some(e) = handler.last_error() {
                    warn!("Device error: {}", e);
                }
            }
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}
