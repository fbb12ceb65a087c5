// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Response framing for the textual side of the control channel.
//
// The printer answers every command or frame with one or more CRLF lines.
// Lines are accumulated until the buffered text ends in a terminator; the
// whole accumulation is one response. Nothing is assumed about the interior
// lines.

/// Terminator suffixes, checked after stripping trailing CR/LF.
///
/// `ok.` and `ok` close normal replies. A negative chunk acknowledgement
/// (`"<n> error."`) carries no `ok` line, so `error.` also closes a reply.
const TERMINATORS: [&str; 3] = ["ok.", "ok", "error."];

/// One complete reply from the printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    text: String,
}

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.text.contains(marker)
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text.trim_end())
    }
}

/// Whether `text` ends a response.
pub fn is_terminated(text: &str) -> bool {
    let trimmed = text.trim_end_matches(['\r', '\n']);
    TERMINATORS.iter().any(|t| trimmed.ends_with(t))
}

/// Accumulates raw lines into responses.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    pending: String,
}

impl ResponseBuffer {
    /// Append a line. Returns the completed response, and resets the
    /// buffer, once a terminator is seen.
    pub fn push(&mut self, line: &str) -> Option<Response> {
        self.pending.push_str(line);
        if is_terminated(&self.pending) {
            Some(Response::new(std::mem::take(&mut self.pending)))
        } else {
            None
        }
    }

    /// Text received since the last completed response.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
