//! Interactive prompts for port and baud rate selection
//!
//! Answers come from an [`InputLines`] so the prompts can be driven from tests.

use anyhow::{bail, Result};
use colored::Colorize;
use std::io::Write;

use crate::input::InputLines;

/// Print `ports` as a numbered list starting at 1
pub fn print_ports<W: Write>(out: &mut W, ports: &[String]) -> Result<()> {
    writeln!(out, "{}", "Available serial ports:".bold())?;
    for (i, port) in ports.iter().enumerate() {
        writeln!(out, "  [{}] {}", (i + 1).to_string().cyan(), port)?;
    }
    Ok(())
}

async fn read_answer<W: Write>(
    input: &mut InputLines,
    out: &mut W,
    question: &str,
) -> Result<String> {
    write!(out, "{}", question)?;
    out.flush()?;

    match input.next_line().await? {
        Some(line) => Ok(line.trim().to_string()),
        None => bail!("Input closed before a selection was made"),
    }
}

/// Ask for a port by its number, re-prompting until the answer is in range.
///
/// Returns the zero-based index into `ports`.
pub async fn select_port<W: Write>(
    input: &mut InputLines,
    out: &mut W,
    ports: &[String],
) -> Result<usize> {
    if ports.is_empty() {
        bail!("No serial ports available");
    }

    loop {
        let question = format!("Select port [1-{}]: ", ports.len());
        let answer = read_answer(input, out, &question).await?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=ports.len()).contains(&n) => return Ok(n - 1),
            _ => writeln!(
                out,
                "{}",
                format!("'{}' is not a number between 1 and {}", answer, ports.len()).red()
            )?,
        }
    }
}

/// Ask for a baud rate; an empty answer keeps `default`
pub async fn select_baud_rate<W: Write>(
    input: &mut InputLines,
    out: &mut W,
    default: u32,
) -> Result<u32> {
    loop {
        let question = format!("Baud rate [{}]: ", default);
        let answer = read_answer(input, out, &question).await?;
        if answer.is_empty() {
            return Ok(default);
        }
        match answer.parse::<u32>() {
            Ok(rate) if rate > 0 => return Ok(rate),
            _ => writeln!(out, "{}", format!("'{}' is not a valid baud rate", answer).red())?,
        }
    }
}
