// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Voxcomm upload client.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::error::{Result, VoxcommError};

/// A printer that answered a discovery probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterInfo {
    /// Source address of the advertisement datagram.
    pub addr: Ipv4Addr,
    /// Name advertised by the printer (NUL padding stripped).
    pub name: String,
}

impl std::fmt::Display for PrinterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.addr)
    }
}

/// States of the upload session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Waiting for the printer to grant control (`~M601`).
    Authenticating,
    /// Waiting for the printer to open the destination file (`~M28`).
    AwaitFileOpen,
    /// Streaming binary chunk frames.
    SendingChunks,
    /// Waiting for the printer to close and save the file (`~M29`).
    Finalizing,
    /// Waiting for the printer to open the file for printing (`~M23`).
    PrintRequested,
    /// Session completed successfully.
    Done,
    /// Session aborted.
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Authenticating => "authentication",
            Self::AwaitFileOpen => "file open",
            Self::SendingChunks => "chunk transfer",
            Self::Finalizing => "file save",
            Self::PrintRequested => "print start",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A file staged for upload: destination name plus its full contents.
#[derive(Debug, Clone)]
pub struct UploadFile {
    name: String,
    data: Vec<u8>,
}

impl UploadFile {
    /// Stage `data` for upload as `name` in the printer's user directory.
    ///
    /// The name travels inside a line-oriented command, so it must be
    /// non-empty and free of line breaks. Empty payloads are rejected since
    /// they would produce a zero-chunk upload.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(VoxcommError::Usage("destination file name is empty".into()));
        }
        if name.contains(['\n', '\r']) {
            return Err(VoxcommError::Usage(format!(
                "destination file name {name:?} contains a line break"
            )));
        }
        if data.is_empty() {
            return Err(VoxcommError::Usage(format!("{name} is empty")));
        }
        Ok(Self { name, data })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; empty uploads are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Summary of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Final state reached (always `Done` for a returned report).
    pub state: SessionState,
    /// Number of chunk frames acknowledged by the printer.
    pub chunks_sent: u32,
    /// Logical (unpadded) bytes acknowledged by the printer.
    pub bytes_acknowledged: u64,
    /// Whether the printer accepted a start-print request.
    pub print_started: bool,
}
