// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload session state machine.
//
//   Authenticating -> AwaitFileOpen -> SendingChunks -> Finalizing
//     -> [PrintRequested] -> Done
//
// Any failed exchange moves the session to Error. Every step enqueues one
// command or frame and waits for exactly one response before moving on.
// There is no resend primitive in the protocol: a single bad acknowledgement
// ends the session.

use std::future::Future;

use tracing::{debug, error, info, warn};

use voxcomm_core::config::ClientConfig;
use voxcomm_core::error::{Result, VoxcommError};
use voxcomm_core::types::{SessionReport, SessionState, UploadFile};

use crate::command::{Command, Outbound, chunk_ack, marker};
use crate::connection::Connection;
use crate::frame;
use crate::response::Response;
use crate::shutdown::Shutdown;

/// Receives upload progress. Rendering is up to the implementor.
pub trait ProgressSink {
    /// Called once before the first chunk with the total logical size.
    fn begin(&mut self, _total_bytes: u64) {}
    /// Called after each acknowledged chunk with its logical length.
    fn advance(&mut self, bytes: u64);
    /// Called once after the last chunk is acknowledged.
    fn finish(&mut self) {}
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&mut self, _bytes: u64) {}
}

/// Decides whether to start printing once the file is saved.
pub trait PrintConfirm {
    fn confirm_print(&mut self, file_name: &str) -> impl Future<Output = bool> + Send;
}

/// A fixed answer, for non-interactive use.
impl PrintConfirm for bool {
    async fn confirm_print(&mut self, _file_name: &str) -> bool {
        *self
    }
}

/// Drives one upload session over an open connection.
pub struct TransferEngine {
    conn: Connection,
    config: ClientConfig,
    shutdown: Shutdown,
    state: SessionState,
}

impl TransferEngine {
    pub fn new(conn: Connection, config: ClientConfig, shutdown: Shutdown) -> Self {
        Self {
            conn,
            config,
            shutdown,
            state: SessionState::Authenticating,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to a terminal state.
    ///
    /// Whatever the outcome, a disconnect is sent best-effort and the
    /// connection is closed before returning.
    pub async fn run<P, C>(
        mut self,
        file: &UploadFile,
        progress: &mut P,
        confirm: &mut C,
    ) -> Result<SessionReport>
    where
        P: ProgressSink,
        C: PrintConfirm,
    {
        let outcome = self.drive(file, progress, confirm).await;

        match &outcome {
            Ok(report) => {
                self.transition(SessionState::Done);
                info!(
                    peer = self.conn.peer(),
                    file = file.name(),
                    chunks = report.chunks_sent,
                    bytes = report.bytes_acknowledged,
                    print_started = report.print_started,
                    "session complete"
                );
            }
            Err(e) => {
                let failed_in = self.state;
                self.transition(SessionState::Error);
                match e {
                    VoxcommError::DataTransfer { sequence, .. } => {
                        error!(sequence, error = %e, "printer rejected chunk")
                    }
                    VoxcommError::UnexpectedResponse { .. } => {
                        error!(state = %failed_in, error = %e, "unexpected response")
                    }
                    VoxcommError::Cancelled => warn!(state = %failed_in, "session cancelled"),
                    _ => error!(state = %failed_in, error = %e, "session failed"),
                }
            }
        }

        let final_state = self.state;
        self.disconnect().await;
        outcome.map(|report| SessionReport {
            state: final_state,
            ..report
        })
    }

    async fn drive<P, C>(
        &mut self,
        file: &UploadFile,
        progress: &mut P,
        confirm: &mut C,
    ) -> Result<SessionReport>
    where
        P: ProgressSink,
        C: PrintConfirm,
    {
        let remote_path = self.config.remote_path(file.name());

        self.transition(SessionState::Authenticating);
        self.command(Command::Authenticate).await?;

        self.transition(SessionState::AwaitFileOpen);
        self.command(Command::BeginFile {
            size: file.len(),
            path: remote_path.clone(),
        })
        .await?;

        self.transition(SessionState::SendingChunks);
        let (chunks_sent, bytes_acknowledged) = self.send_chunks(file.data(), progress).await?;

        self.transition(SessionState::Finalizing);
        self.command(Command::EndFile).await?;
        info!(file = file.name(), "file saved on printer");

        let wants_print = tokio::select! {
            answer = confirm.confirm_print(file.name()) => answer,
            _ = self.shutdown.wait() => return Err(VoxcommError::Cancelled),
        };
        if wants_print {
            self.transition(SessionState::PrintRequested);
            self.command(Command::StartPrint { path: remote_path }).await?;
            info!(file = file.name(), "printing started");
        }

        Ok(SessionReport {
            state: self.state,
            chunks_sent,
            bytes_acknowledged,
            print_started: wants_print,
        })
    }

    async fn send_chunks<P: ProgressSink>(
        &mut self,
        data: &[u8],
        progress: &mut P,
    ) -> Result<(u32, u64)> {
        let total = frame::chunk_count(data.len());
        progress.begin(data.len() as u64);
        debug!(chunks = total, bytes = data.len(), "sending chunks");

        let mut sent = 0u32;
        let mut acknowledged = 0u64;
        for chunk in frame::chunks(data) {
            let response = self
                .exchange(Outbound::Frame {
                    sequence: chunk.sequence,
                    bytes: chunk.encode(),
                })
                .await?;
            check_chunk_ack(chunk.sequence, response)?;

            sent += 1;
            acknowledged += chunk.logical_len() as u64;
            progress.advance(chunk.logical_len() as u64);
            debug!(sequence = chunk.sequence, of = total, "chunk acknowledged");
        }
        progress.finish();
        Ok((sent, acknowledged))
    }

    /// Send a command and check its reply for the command's success marker.
    async fn command(&mut self, command: Command) -> Result<Response> {
        let expected = command.success_marker();
        let response = self.exchange(command.into()).await?;
        match expected {
            Some(marker) if !response.contains(marker) => Err(VoxcommError::UnexpectedResponse {
                stage: self.state.to_string(),
                response: response.into_text(),
            }),
            _ => Ok(response),
        }
    }

    /// One request/response rendezvous, abandoned on shutdown.
    async fn exchange(&mut self, item: Outbound) -> Result<Response> {
        debug!(state = %self.state, item = %item, "sending");
        tokio::select! {
            response = self.conn.request(item) => response,
            _ = self.shutdown.wait() => Err(VoxcommError::Cancelled),
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "session state");
            self.state = next;
        }
    }

    async fn disconnect(self) {
        if let Err(e) = self.conn.send(Command::Disconnect).await {
            warn!(error = %e, "could not enqueue disconnect");
        }
        self.conn.close(self.config.disconnect_grace()).await;
        info!("disconnected from printer");
    }
}

/// Accept only the literal `"<sequence> ok."` acknowledgement.
fn check_chunk_ack(sequence: u32, response: Response) -> Result<()> {
    if response.contains(&chunk_ack(sequence)) {
        Ok(())
    } else if response.contains(marker::CHUNK_ERROR) {
        Err(VoxcommError::DataTransfer {
            sequence,
            response: response.into_text(),
        })
    } else {
        Err(VoxcommError::UnexpectedResponse {
            stage: format!("{} (chunk {sequence})", SessionState::SendingChunks),
            response: response.into_text(),
        })
    }
}
