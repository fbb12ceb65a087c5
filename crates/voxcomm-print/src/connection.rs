// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TCP control channel to the printer (port 8899).
//
// The stream is split between two tasks. The writer loop is the only code
// that writes to it: it drains the outbound queue in order and writes each
// command or frame as one unit. The reader loop is the only code that reads
// from it: it groups lines into responses and publishes them, in arrival
// order, on the inbound queue. Transport errors from either loop travel on
// the inbound queue too, so the caller sees them at its next receive.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use voxcomm_core::error::{Result, VoxcommError};

use crate::command::Outbound;
use crate::response::{Response, ResponseBuffer};
use crate::shutdown::Shutdown;

type Inbound = Result<Response>;

/// An open control channel with its writer and reader loops running.
pub struct Connection {
    peer: String,
    outbound: mpsc::Sender<Outbound>,
    inbound: mpsc::Receiver<Inbound>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl Connection {
    /// Dial the printer and start the I/O loops.
    pub async fn connect(
        addr: SocketAddr,
        queue_depth: usize,
        grace: Duration,
        mut shutdown: Shutdown,
    ) -> Result<Self> {
        info!(addr = %addr, "connecting to printer");

        let stream = tokio::select! {
            stream = TcpStream::connect(addr) => stream.map_err(|source| VoxcommError::Connect {
                addr: addr.to_string(),
                source,
            })?,
            _ = shutdown.wait() => return Err(VoxcommError::Cancelled),
        };
        stream.set_nodelay(true)?;

        info!(addr = %addr, "connected to printer");
        Ok(Self::from_stream(stream, addr.to_string(), queue_depth, grace, shutdown))
    }

    /// Start the I/O loops over an already-open stream.
    pub fn from_stream<S>(
        stream: S,
        peer: impl Into<String>,
        queue_depth: usize,
        grace: Duration,
        shutdown: Shutdown,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbound, outbound_rx) = mpsc::channel(queue_depth.max(1));
        let (inbound_tx, inbound) = mpsc::channel(queue_depth.max(1));

        let writer = tokio::spawn(writer_loop(
            write_half,
            outbound_rx,
            inbound_tx.clone(),
            shutdown.clone(),
            grace,
        ));
        let reader = tokio::spawn(reader_loop(read_half, inbound_tx, shutdown));

        Self {
            peer: peer.into(),
            outbound,
            inbound,
            writer,
            reader,
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Enqueue an item for the writer loop.
    pub async fn send(&self, item: impl Into<Outbound>) -> Result<()> {
        self.outbound
            .send(item.into())
            .await
            .map_err(|_| VoxcommError::ConnectionClosed)
    }

    /// Wait for the next response, or the transport error that ended the
    /// stream.
    pub async fn recv(&mut self) -> Result<Response> {
        match self.inbound.recv().await {
            Some(inbound) => inbound,
            None => Err(VoxcommError::ConnectionClosed),
        }
    }

    /// Send one item and wait for the reply to it.
    ///
    /// The protocol carries no request identifiers, so a reply can only be
    /// attributed by keeping exactly one request outstanding.
    pub async fn request(&mut self, item: impl Into<Outbound>) -> Result<Response> {
        self.send(item).await?;
        self.recv().await
    }

    /// Close the channel.
    ///
    /// Items already queued are written first, for up to `grace`; then the
    /// write half is shut down and the reader stopped.
    pub async fn close(self, grace: Duration) {
        let Self {
            peer,
            outbound,
            inbound,
            writer,
            reader,
        } = self;
        drop(outbound);
        if tokio::time::timeout(grace, writer).await.is_err() {
            warn!(peer = %peer, "writer did not drain before close");
        }
        reader.abort();
        drop(inbound);
        info!(peer = %peer, "connection closed");
    }
}

async fn write_item<W>(writer: &mut W, item: &Outbound) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match item {
        Outbound::Command(command) => writer.write_all(command.to_wire().as_bytes()).await?,
        Outbound::Frame { bytes, .. } => writer.write_all(bytes).await?,
    }
    writer.flush().await
}

/// Sole writer of the stream.
async fn writer_loop<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Outbound>,
    errors: mpsc::Sender<Inbound>,
    mut shutdown: Shutdown,
    grace: Duration,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let item = tokio::select! {
            item = outbound.recv() => item,
            _ = shutdown.wait() => {
                debug!("shutdown: writer draining queued items");
                drain(&mut writer, &mut outbound, grace).await;
                break;
            }
        };
        let Some(item) = item else { break };

        trace!(item = %item, "writing");
        if let Err(e) = write_item(&mut writer, &item).await {
            warn!(error = %e, item = %item, "write to printer failed");
            let _ = errors.send(Err(VoxcommError::Io(e))).await;
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "write half shutdown failed");
    }
}

/// Write whatever is still queued, bounded by `grace`, so that a final
/// disconnect enqueued during shutdown reaches the printer.
async fn drain<W>(writer: &mut W, outbound: &mut mpsc::Receiver<Outbound>, grace: Duration)
where
    W: AsyncWrite + Unpin,
{
    let drained = tokio::time::timeout(grace, async {
        while let Some(item) = outbound.recv().await {
            if write_item(writer, &item).await.is_err() {
                break;
            }
        }
    })
    .await;
    if drained.is_err() {
        debug!("writer drain grace period elapsed");
    }
}

/// Sole reader of the stream.
async fn reader_loop<R>(reader: R, inbound: mpsc::Sender<Inbound>, mut shutdown: Shutdown)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut responses = ResponseBuffer::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = tokio::select! {
            read = reader.read_until(b'\n', &mut line) => read,
            _ = shutdown.wait() => {
                debug!("shutdown: reader stopping");
                return;
            }
        };

        match read {
            Ok(0) => {
                if !responses.is_empty() {
                    warn!(pending = responses.pending(), "stream ended mid-response");
                }
                let _ = inbound.send(Err(VoxcommError::ConnectionClosed)).await;
                return;
            }
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                trace!(line = %text.trim_end(), "read");
                if let Some(response) = responses.push(&text) {
                    debug!(response = %response, "response received");
                    if inbound.send(Ok(response)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "read from printer failed");
                let _ = inbound.send(Err(VoxcommError::Io(e))).await;
                return;
            }
        }
    }
}
