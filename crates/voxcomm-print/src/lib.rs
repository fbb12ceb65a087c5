// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Voxcomm Print: the port 8899 printer control protocol: chunk framing,
// the command/response channel, the upload state machine, and UDP printer
// discovery.

pub mod checksum;
pub mod command;
pub mod connection;
pub mod discovery;
pub mod frame;
pub mod response;
pub mod shutdown;
pub mod transfer;

pub use connection::Connection;
pub use discovery::PrinterDiscovery;
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use transfer::{NoProgress, PrintConfirm, ProgressSink, TransferEngine};
