// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Interactive terminal prompts: printer selection and print confirmation.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;

use voxcomm_core::error::VoxcommError;
use voxcomm_core::types::PrinterInfo;
use voxcomm_print::discovery;
use voxcomm_print::{PrintConfirm, Shutdown};

/// Terminal input, read line by line on a detached thread.
///
/// A blocking stdin read cannot be cancelled, so it must never run on the
/// runtime's own blocking pool: the runtime would wait for it on shutdown.
/// One reader serves every prompt so typed-ahead lines are not lost.
pub struct LineReader {
    lines: Option<mpsc::Receiver<io::Result<String>>>,
}

impl LineReader {
    /// Reads stdin. The reader thread starts on the first prompt.
    pub fn stdin() -> Self {
        Self { lines: None }
    }

    #[cfg(test)]
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        Self {
            lines: Some(spawn_reader(reader)),
        }
    }

    /// Next line without its line break, or `None` at end of input.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let lines = self
            .lines
            .get_or_insert_with(|| spawn_reader(io::BufReader::new(io::stdin())));
        lines.recv().await.transpose()
    }
}

fn spawn_reader<R>(reader: R) -> mpsc::Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in reader.lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Redraw the running candidate list on one terminal line.
pub fn show_candidates(printers: &[PrinterInfo]) {
    print!(
        "\x1b[2K\rPrinters discovered: {} - {}",
        printers.len(),
        candidate_list(printers)
    );
    let _ = io::stdout().flush();
}

fn candidate_list(printers: &[PrinterInfo]) -> String {
    printers
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{i}: {p}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ask for an index until a valid one is entered.
pub async fn choose_printer(
    printers: &[PrinterInfo],
    input: &mut LineReader,
    mut shutdown: Shutdown,
) -> Result<PrinterInfo, VoxcommError> {
    loop {
        print!("Please select desired printer via index: ");
        let _ = io::stdout().flush();

        let line = tokio::select! {
            line = input.next_line() => line?,
            _ = shutdown.wait() => return Err(VoxcommError::Cancelled),
        };
        let Some(line) = line else {
            return Err(VoxcommError::InvalidSelection("no selection made".into()));
        };
        match parse_index(&line, printers) {
            Ok(printer) => return Ok(printer.clone()),
            Err(_) => println!("Invalid input."),
        }
    }
}

fn parse_index<'a>(
    input: &str,
    printers: &'a [PrinterInfo],
) -> Result<&'a PrinterInfo, VoxcommError> {
    let input = input.trim();
    let index = input
        .parse::<usize>()
        .map_err(|_| VoxcommError::InvalidSelection(format!("{input:?} is not a number")))?;
    discovery::select(printers, index)
}

/// How the start-print question is answered.
pub enum Confirm {
    Fixed(bool),
    Ask(LineReader),
}

impl PrintConfirm for Confirm {
    async fn confirm_print(&mut self, file_name: &str) -> bool {
        match self {
            Self::Fixed(answer) => *answer,
            Self::Ask(input) => {
                print!("Would you like to start printing {file_name}? Y/N: ");
                let _ = io::stdout().flush();
                matches!(input.next_line().await, Ok(Some(line)) if is_yes(&line))
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    answer.to_lowercase().contains('y')
}
