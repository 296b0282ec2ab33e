//! Line input for the console
//!
//! Stdin is read on a dedicated thread that forwards each line over a
//! channel. Waiting on the channel can be cancelled, so Ctrl+C never leaves
//! the runtime blocked on a pending read. Prompts and the send loop share the
//! same reader, so no buffered input is lost between them.

use anyhow::Result;
use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc;
use tracing::debug;

const LINE_CHANNEL_CAPACITY: usize = 16;

/// Source of input lines
pub struct InputLines {
    rx: mpsc::Receiver<io::Result<String>>,
}

impl InputLines {
    /// Start a background thread reading lines from stdin.
    ///
    /// The thread is detached; it ends when stdin closes, when the receiver
    /// is dropped, or with the process.
    pub fn stdin() -> Result<Self> {
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);

        thread::Builder::new()
            .name("sercom-stdin".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                debug!("stdin reader finished");
            })?;

        Ok(Self { rx })
    }

    /// A fixed sequence of lines, followed by end of input
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let (tx, rx) = mpsc::channel(lines.len().max(1));
        for line in lines {
            // Capacity matches the line count, so this cannot fail.
            let _ = tx.try_send(Ok(line));
        }
        Self { rx }
    }

    /// Next line without its terminator; `None` once input has closed
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        match self.rx.recv().await {
            Some(line) => Ok(Some(line?)),
            None => Ok(None),
        }
    }
}
