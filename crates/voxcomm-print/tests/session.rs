// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end upload sessions against an in-process printer over loopback
// TCP.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use voxcomm_core::config::ClientConfig;
use voxcomm_core::error::VoxcommError;
use voxcomm_core::types::{SessionState, UploadFile};
use voxcomm_print::checksum::checksum;
use voxcomm_print::frame::{FRAME_LEN, FRAME_MAGIC, FrameHeader, HEADER_LEN};
use voxcomm_print::{Connection, NoProgress, Shutdown, TransferEngine};

/// How long the fake printer waits to make sure nothing else is in flight
/// before it replies.
const QUIET_WINDOW: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, PartialEq)]
enum Received {
    Command(String),
    Frame { header: FrameHeader, crc_ok: bool },
}

/// Minimal firmware stand-in. Replies to `~M601`, `~M28`, `~M29`, `~M23`
/// and to every frame; `fail_chunk` makes that chunk's ack an error.
/// Panics if the client sends a second item before the first is answered.
async fn fake_printer(listener: TcpListener, fail_chunk: Option<u32>) -> Vec<Received> {
    let (stream, _) = listener.accept().await.unwrap();
    let mut reader = BufReader::new(stream);
    let mut received = Vec::new();

    loop {
        let Some(item) = read_item(&mut reader).await else {
            break;
        };

        let reply = match &item {
            Received::Command(line) if line.starts_with("~M601") => {
                "CMD M601 Received.\r\nControl Success.\r\nok\r\n".to_owned()
            }
            Received::Command(line) if line.starts_with("~M28") => {
                "CMD M28 Received.\r\nWriting to file: 0:/user/part.gcode\r\nok\r\n".to_owned()
            }
            Received::Command(line) if line.starts_with("~M29") => {
                "CMD M29 Received.\r\nDone saving file.\r\nok\r\n".to_owned()
            }
            Received::Command(line) if line.starts_with("~M23") => {
                "CMD M23 Received.\r\nFile opened: part.gcode Size: 9000\r\nFile selected\r\nok\r\n"
                    .to_owned()
            }
            Received::Command(_) => String::new(),
            Received::Frame { header, .. } if Some(header.sequence) == fail_chunk => {
                format!("{} error.\r\n", header.sequence)
            }
            Received::Frame { header, .. } => format!("{} ok.\r\n", header.sequence),
        };
        received.push(item);

        if !reply.is_empty() {
            // One request at a time: nothing else may be on the wire yet.
            let pipelined = tokio::time::timeout(QUIET_WINDOW, reader.fill_buf()).await;
            if let Ok(Ok(buf)) = pipelined {
                assert!(buf.is_empty(), "client sent before reply was received");
            }
            reader.get_mut().write_all(reply.as_bytes()).await.unwrap();
        }
    }
    received
}

async fn read_item(reader: &mut BufReader<TcpStream>) -> Option<Received> {
    let first = *reader.fill_buf().await.ok()?.first()?;
    if first == FRAME_MAGIC[0] {
        let mut frame = vec![0u8; FRAME_LEN];
        reader.read_exact(&mut frame).await.ok()?;
        let header = FrameHeader::parse(&frame)?;
        let crc_ok = header.checksum == checksum(&frame[HEADER_LEN..]);
        Some(Received::Frame { header, crc_ok })
    } else {
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        Some(Received::Command(line))
    }
}

async fn start_printer(
    fail_chunk: Option<u32>,
) -> (SocketAddr, tokio::task::JoinHandle<Vec<Received>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, tokio::spawn(fake_printer(listener, fail_chunk)))
}

async fn connect(addr: SocketAddr, config: &ClientConfig) -> TransferEngine {
    let conn = Connection::connect(
        addr,
        config.queue_depth,
        config.disconnect_grace(),
        Shutdown::never(),
    )
    .await
    .unwrap();
    TransferEngine::new(conn, config.clone(), Shutdown::never())
}

fn frames(received: &[Received]) -> Vec<(u32, u32, bool)> {
    received
        .iter()
        .filter_map(|r| match r {
            Received::Frame { header, crc_ok } => {
                Some((header.sequence, header.logical_len, *crc_ok))
            }
            Received::Command(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn full_session_with_print_over_tcp() {
    let (addr, printer) = start_printer(None).await;
    let config = ClientConfig::default();
    let file = UploadFile::new("part.gcode", vec![b';'; 9000]).unwrap();

    let report = connect(addr, &config)
        .await
        .run(&file, &mut NoProgress, &mut true)
        .await
        .unwrap();

    assert_eq!(report.state, SessionState::Done);
    assert_eq!(report.chunks_sent, 3);
    assert!(report.print_started);

    let received = printer.await.unwrap();
    assert_eq!(
        frames(&received),
        vec![(0, 4096, true), (1, 4096, true), (2, 808, true)]
    );
    let commands: Vec<&str> = received
        .iter()
        .filter_map(|r| match r {
            Received::Command(line) => Some(line.trim_end()),
            Received::Frame { .. } => None,
        })
        .collect();
    assert_eq!(
        commands,
        vec![
            "~M601 S1",
            "~M28 9000 0:/user/part.gcode",
            "~M29",
            "~M23 0:/user/part.gcode",
            "~M602",
        ]
    );
}

#[tokio::test]
async fn chunk_error_over_tcp_never_sends_later_chunks() {
    let (addr, printer) = start_printer(Some(1)).await;
    let config = ClientConfig::default();
    let file = UploadFile::new("part.gcode", vec![b';'; 9000]).unwrap();

    let err = connect(addr, &config)
        .await
        .run(&file, &mut NoProgress, &mut true)
        .await
        .unwrap_err();
    assert!(matches!(err, VoxcommError::DataTransfer { sequence: 1, .. }));

    let received = printer.await.unwrap();
    assert_eq!(frames(&received), vec![(0, 4096, true), (1, 4096, true)]);
    assert_eq!(
        received.last(),
        Some(&Received::Command("~M602\n".into()))
    );
}

#[tokio::test]
async fn printer_hanging_up_is_connection_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let printer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let config = ClientConfig::default();
    let file = UploadFile::new("part.gcode", vec![1; 10]).unwrap();
    let err = connect(addr, &config)
        .await
        .run(&file, &mut NoProgress, &mut false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VoxcommError::ConnectionClosed | VoxcommError::Io(_)
    ));
    printer.await.unwrap();
}
