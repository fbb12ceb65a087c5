// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload progress bar on stderr.

use indicatif::{ProgressBar, ProgressStyle};

use voxcomm_print::ProgressSink;

const TEMPLATE: &str = "{msg} [{bar:15}] {bytes}/{total_bytes}";

/// Byte-count progress bar. indicatif draws to stderr and stays hidden when
/// stderr is not a terminal.
pub struct UploadProgress {
    bar: ProgressBar,
}

impl UploadProgress {
    pub fn new(label: &'static str) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(0).with_style(style).with_message(label);
        Self { bar }
    }
}

impl ProgressSink for UploadProgress {
    fn begin(&mut self, total_bytes: u64) {
        self.bar.set_length(total_bytes);
        self.bar.set_position(0);
    }

    fn advance(&mut self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&mut self) {
        self.bar.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_acknowledged_bytes() {
        let mut progress = UploadProgress::new("upload");
        progress.begin(9000);
        progress.advance(4096);
        progress.advance(4096);
        assert_eq!(progress.bar.position(), 8192);
        progress.advance(808);
        progress.finish();
        assert_eq!(progress.bar.position(), 9000);
        assert_eq!(progress.bar.length(), Some(9000));
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn begin_resets_position() {
        let mut progress = UploadProgress::new("upload");
        progress.begin(10);
        progress.advance(10);
        progress.begin(20);
        assert_eq!(progress.bar.position(), 0);
        assert_eq!(progress.bar.length(), Some(20));
    }
}
