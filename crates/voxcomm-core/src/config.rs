// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client configuration.
//
// Only deployment parameters live here. Wire constants (chunk size, frame
// magic, command text) are fixed by the printer firmware and are defined in
// `voxcomm-print`.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxcommError};

/// Name of the config file inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Persistent client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// TCP port of the printer control channel (default 8899).
    pub control_port: u16,
    /// Capacity of the outbound command queue and inbound response queue.
    pub queue_depth: usize,
    /// Directory prefix prepended to the destination file name.
    pub remote_dir: String,
    /// How long to wait for the writer to flush the disconnect command.
    pub disconnect_grace_ms: u64,
    /// UDP discovery settings.
    pub discovery: DiscoveryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            control_port: 8899,
            queue_depth: 100,
            remote_dir: "0:/user/".into(),
            disconnect_grace_ms: 500,
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Settings for the UDP probe/listen exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Local UDP port the listener binds and advertises in the probe.
    pub listen_port: u16,
    /// Multicast group the probe is sent to.
    pub probe_group: Ipv4Addr,
    /// Destination port of the probe.
    pub probe_port: u16,
    /// Number of probe rounds before the candidate list is finalised.
    pub probe_rounds: u32,
    /// Delay between probe rounds.
    pub probe_interval_ms: u64,
    /// Public address used only to learn the preferred outbound interface.
    /// No packet is sent to it.
    pub route_probe: String,
    /// Advertisements must be strictly longer than this; it is also the
    /// length of the name field at the start of the payload.
    pub advert_name_len: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            listen_port: 18002,
            probe_group: Ipv4Addr::new(225, 0, 0, 9),
            probe_port: 19000,
            probe_rounds: 5,
            probe_interval_ms: 1000,
            route_probe: "8.8.8.8:80".into(),
            advert_name_len: 128,
        }
    }
}

impl DiscoveryConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

impl ClientConfig {
    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }

    /// Full remote path for a destination file name, e.g. `0:/user/cube.gcode`.
    pub fn remote_path(&self, file_name: &str) -> String {
        format!("{}{}", self.remote_dir, file_name)
    }

    /// Read a config file. Missing fields take their default values.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            VoxcommError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Resolve the effective configuration from `--config` or the default
    /// location.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        Self::resolve(explicit, default_path())
    }

    /// An explicit file that cannot be read or parsed is a usage error. The
    /// fallback yields defaults when absent and a configuration error when
    /// present but invalid.
    fn resolve(explicit: Option<&Path>, fallback: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path).map_err(|e| {
                VoxcommError::Usage(format!("invalid config file {}: {e}", path.display()))
            });
        }
        match fallback.filter(|p| p.is_file()) {
            Some(path) => Self::load(&path).map_err(|e| match e {
                VoxcommError::Config(_) => e,
                other => VoxcommError::Config(format!("{}: {other}", path.display())),
            }),
            None => Ok(Self::default()),
        }
    }
}

/// Default config file location: `$XDG_CONFIG_HOME/voxcomm/config.json`,
/// falling back to `$HOME/.config/voxcomm/config.json`.
pub fn default_path() -> Option<PathBuf> {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg)
    } else {
        PathBuf::from(std::env::var("HOME").ok()?).join(".config")
    };
    Some(base.join("voxcomm").join(CONFIG_FILE))
}
