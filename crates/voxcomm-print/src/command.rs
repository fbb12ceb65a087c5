// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Textual control commands and the markers that acknowledge them.

/// Substrings whose presence in a response acknowledges a command.
pub mod marker {
    /// Reply to `~M601 S1`.
    pub const CONTROL_SUCCESS: &str = "Control Success.";
    /// Reply to `~M28`: the destination file is open for writing.
    pub const WRITING_TO_FILE: &str = "Writing to file";
    /// Reply to `~M29`.
    pub const DONE_SAVING: &str = "Done saving file";
    /// Reply to `~M23`: the file is open for printing.
    pub const FILE_OPENED: &str = "File opened";
    /// Present in a negative chunk acknowledgement.
    pub const CHUNK_ERROR: &str = "error";
}

/// Positive acknowledgement text for chunk `sequence`, e.g. `"3 ok."`.
pub fn chunk_ack(sequence: u32) -> String {
    format!("{sequence} ok.")
}

/// An outbound line-oriented instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Request control of the printer.
    Authenticate,
    /// Open `path` for writing `size` bytes.
    BeginFile { size: usize, path: String },
    /// Close and save the file being written.
    EndFile,
    /// Select and start printing `path`.
    StartPrint { path: String },
    /// Release control of the printer. Not acknowledged.
    Disconnect,
}

impl Command {
    /// The exact text written to the stream, line break included.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Authenticate => "~M601 S1\n".into(),
            Self::BeginFile { size, path } => format!("~M28 {size} {path}\n"),
            Self::EndFile => "~M29\n".into(),
            Self::StartPrint { path } => format!("~M23 {path}\n"),
            Self::Disconnect => "~M602\n".into(),
        }
    }

    /// Marker the reply must contain, or `None` when no reply is awaited.
    pub fn success_marker(&self) -> Option<&'static str> {
        match self {
            Self::Authenticate => Some(marker::CONTROL_SUCCESS),
            Self::BeginFile { .. } => Some(marker::WRITING_TO_FILE),
            Self::EndFile => Some(marker::DONE_SAVING),
            Self::StartPrint { .. } => Some(marker::FILE_OPENED),
            Self::Disconnect => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_wire().trim_end())
    }
}

/// One item on the outbound queue, written to the stream as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Command(Command),
    /// An encoded chunk frame.
    Frame { sequence: u32, bytes: Vec<u8> },
}

impl From<Command> for Outbound {
    fn from(command: Command) -> Self {
        Self::Command(command)
    }
}

impl std::fmt::Display for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(command) => std::fmt::Display::fmt(command, f),
            Self::Frame { sequence, bytes } => {
                write!(f, "frame #{sequence} ({} bytes)", bytes.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_text_matches_firmware() {
        assert_eq!(Command::Authenticate.to_wire(), "~M601 S1\n");
        assert_eq!(
            Command::BeginFile {
                size: 9000,
                path: "0:/user/cube.gcode".into()
            }
            .to_wire(),
            "~M28 9000 0:/user/cube.gcode\n"
        );
        assert_eq!(Command::EndFile.to_wire(), "~M29\n");
        assert_eq!(
            Command::StartPrint {
                path: "0:/user/cube.gcode".into()
            }
            .to_wire(),
            "~M23 0:/user/cube.gcode\n"
        );
        assert_eq!(Command::Disconnect.to_wire(), "~M602\n");
    }

    #[test]
    fn open_for_writing_and_open_for_printing_are_distinct() {
        let begin = Command::BeginFile {
            size: 1,
            path: "x".into(),
        };
        let print = Command::StartPrint { path: "x".into() };
        assert_ne!(begin.success_marker(), print.success_marker());
        assert_eq!(Command::Disconnect.success_marker(), None);
    }

    #[test]
    fn chunk_ack_text() {
        assert_eq!(chunk_ack(0), "0 ok.");
        assert_eq!(chunk_ack(41), "41 ok.");
    }

    #[test]
    fn display_omits_line_break() {
        assert_eq!(Command::EndFile.to_string(), "~M29");
        let frame = Outbound::Frame {
            sequence: 3,
            bytes: vec![0; 4112],
        };
        assert_eq!(frame.to_string(), "frame #3 (4112 bytes)");
    }
}
