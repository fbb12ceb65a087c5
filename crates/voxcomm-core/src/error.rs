// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Voxcomm.

use thiserror::Error;

/// Top-level error type for all Voxcomm operations.
#[derive(Debug, Error)]
pub enum VoxcommError {
    // -- Usage errors (raised before any network activity) --
    #[error("usage error: {0}")]
    Usage(String),

    #[error("configuration error: {0}")]
    Config(String),

    // -- Connection errors --
    #[error("could not connect to printer at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection to printer closed unexpectedly")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // -- Protocol violations --
    /// The printer answered a chunk with its error marker.
    #[error("printer reported an error receiving chunk {sequence}: {response:?}")]
    DataTransfer { sequence: u32, response: String },

    /// The printer answered with text that matches no expected marker.
    #[error("unexpected response from printer during {stage}: {response:?}")]
    UnexpectedResponse { stage: String, response: String },

    // -- Discovery --
    #[error("printer discovery failed: {0}")]
    Discovery(String),

    #[error("no printer found on the network")]
    NoPrinterFound,

    #[error("invalid printer selection: {0}")]
    InvalidSelection(String),

    // -- Lifecycle --
    #[error("session cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, VoxcommError>;
