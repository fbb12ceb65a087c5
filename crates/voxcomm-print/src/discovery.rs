// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// UDP printer discovery.
//
// We bind a UDP socket on our preferred LAN address at the discovery port,
// then send a probe to the printer multicast group once per interval for a
// fixed number of rounds. The probe carries our address and port so printers
// can answer directly. A background task collects the answers: any datagram
// longer than the name field is an advertisement whose first bytes hold the
// printer's NUL-padded name. Candidates are deduplicated by address.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use voxcomm_core::config::DiscoveryConfig;
use voxcomm_core::error::{Result, VoxcommError};
use voxcomm_core::types::PrinterInfo;

use crate::shutdown::Shutdown;

/// Receive buffer size for advertisements.
const RECV_BUF_LEN: usize = 1024;

/// Thread-safe, address-deduplicated list of discovered printers, in
/// discovery order.
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    printers: Arc<Mutex<Vec<PrinterInfo>>>,
}

impl CandidateList {
    /// Add a candidate unless one with the same address is known.
    /// Returns whether it was added.
    pub fn insert(&self, printer: PrinterInfo) -> bool {
        let mut printers = self.printers.lock().expect("candidate list lock poisoned");
        if printers.iter().any(|p| p.addr == printer.addr) {
            return false;
        }
        printers.push(printer);
        true
    }

    /// A snapshot of the current candidates.
    pub fn snapshot(&self) -> Vec<PrinterInfo> {
        self.printers
            .lock()
            .expect("candidate list lock poisoned")
            .clone()
    }

    pub fn len(&self) -> usize {
        self.printers.lock().expect("candidate list lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Probe/listen discovery engine.
pub struct PrinterDiscovery {
    config: DiscoveryConfig,
}

impl PrinterDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Run all probe rounds and return the printers that answered.
    ///
    /// `on_round` is called after every round with the candidates found so
    /// far, for display. Fails with `NoPrinterFound` when nobody answered.
    pub async fn discover<F>(
        &self,
        mut shutdown: Shutdown,
        mut on_round: F,
    ) -> Result<Vec<PrinterInfo>>
    where
        F: FnMut(u32, &[PrinterInfo]),
    {
        let local_ip = preferred_local_addr(&self.config.route_probe).await?;
        let bind = SocketAddrV4::new(local_ip, self.config.listen_port);
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| VoxcommError::Discovery(format!("bind {bind}: {e}")))?;
        let socket = Arc::new(socket);
        info!(local = %bind, rounds = self.config.probe_rounds, "searching for printers");

        let candidates = CandidateList::default();
        let listener = tokio::spawn(listen_loop(
            Arc::clone(&socket),
            candidates.clone(),
            self.config.advert_name_len,
        ));

        let payload = probe_payload(local_ip, self.config.listen_port);
        let group = SocketAddrV4::new(self.config.probe_group, self.config.probe_port);

        for round in 1..=self.config.probe_rounds {
            match socket.send_to(&payload, group).await {
                Ok(n) => debug!(round, bytes = n, group = %group, "probe sent"),
                Err(e) => warn!(round, error = %e, "probe send failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.probe_interval()) => {}
                _ = shutdown.wait() => {
                    listener.abort();
                    return Err(VoxcommError::Cancelled);
                }
            }

            on_round(round, &candidates.snapshot());
        }

        listener.abort();
        let found = candidates.snapshot();
        info!(count = found.len(), "discovery finished");
        if found.is_empty() {
            return Err(VoxcommError::NoPrinterFound);
        }
        Ok(found)
    }
}

/// Collect advertisements into `candidates` until the socket fails or the
/// task is aborted.
async fn listen_loop(socket: Arc<UdpSocket>, candidates: CandidateList, name_len: usize) {
    let mut buf = vec![0u8; RECV_BUF_LEN];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "discovery receive failed; listener stopping");
                return;
            }
        };

        match parse_advertisement(from, &buf[..len], name_len) {
            Some(printer) => {
                let name = printer.name.clone();
                if candidates.insert(printer) {
                    info!(addr = %from.ip(), name = %name, "printer discovered");
                }
            }
            None => debug!(from = %from, bytes = len, "ignoring datagram"),
        }
    }
}

/// The local IPv4 address the OS would route public traffic through.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub async fn preferred_local_addr(route_probe: &str) -> Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(|e| VoxcommError::Discovery(format!("route probe socket: {e}")))?;
    socket
        .connect(route_probe)
        .await
        .map_err(|e| VoxcommError::Discovery(format!("no route to {route_probe}: {e}")))?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) => Ok(ip),
        IpAddr::V6(ip) => Err(VoxcommError::Discovery(format!(
            "preferred address {ip} is not IPv4"
        ))),
    }
}

/// Probe payload: our IPv4 address, our port big-endian, two zero bytes.
pub fn probe_payload(ip: Ipv4Addr, port: u16) -> [u8; 8] {
    let mut payload = [0u8; 8];
    payload[..4].copy_from_slice(&ip.octets());
    payload[4..6].copy_from_slice(&port.to_be_bytes());
    payload
}

/// Interpret a datagram as a printer advertisement.
///
/// Only datagrams from IPv4 senders that are strictly longer than
/// `name_len` qualify.
pub fn parse_advertisement(
    from: SocketAddr,
    payload: &[u8],
    name_len: usize,
) -> Option<PrinterInfo> {
    let SocketAddr::V4(from) = from else {
        return None;
    };
    if payload.len() <= name_len {
        return None;
    }
    let name = String::from_utf8_lossy(&payload[..name_len])
        .trim_end_matches('\0')
        .to_owned();
    Some(PrinterInfo {
        addr: *from.ip(),
        name,
    })
}

/// Pick a candidate by its displayed index.
pub fn select(candidates: &[PrinterInfo], index: usize) -> Result<&PrinterInfo> {
    candidates.get(index).ok_or_else(|| {
        VoxcommError::InvalidSelection(format!(
            "index {index} out of range (0..{})",
            candidates.len()
        ))
    })
}
