// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command-line client.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Nothing here retries on the user's behalf: the printer protocol has no
// resend primitive, so `rerun` only tells the user whether running the
// command again is worth a try.

use crate::error::VoxcommError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or printer hiccup; running again will likely work.
    Transient,
    /// The user must change something (arguments, file, network, printer).
    ActionRequired,
    /// Rerunning will hit the same wall; likely a bug or firmware mismatch.
    Permanent,
}

/// A human-readable error with a plain English message and suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether simply running the command again may succeed.
    pub rerun: bool,
    pub severity: Severity,
}

/// Convert a `VoxcommError` into a `HumanError`.
pub fn humanize_error(err: &VoxcommError) -> HumanError {
    match err {
        VoxcommError::Usage(detail) => HumanError {
            message: format!("Can't start the upload: {detail}."),
            suggestion: "Run `voxcomm --help` to see how to call this tool.".into(),
            rerun: false,
            severity: Severity::ActionRequired,
        },

        VoxcommError::Config(detail) => HumanError {
            message: "The configuration file couldn't be used.".into(),
            suggestion: format!("Fix or remove the config file. ({detail})"),
            rerun: false,
            severity: Severity::ActionRequired,
        },

        VoxcommError::Connect { addr, source } => humanize_connect(addr, source),

        VoxcommError::ConnectionClosed => HumanError {
            message: "The printer closed the connection.".into(),
            suggestion: "The printer may have been busy or restarted. Check its screen, then try again.".into(),
            rerun: true,
            severity: Severity::Transient,
        },

        VoxcommError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "Check the path and try again.".into(),
                rerun: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Permission denied.".into(),
                suggestion: "Check the file permissions, or copy the file somewhere readable first.".into(),
                rerun: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => HumanError {
                message: "The connection to the printer was interrupted.".into(),
                suggestion: "This sometimes happens on Wi-Fi. The printer may keep a partial file; upload it again.".into(),
                rerun: true,
                severity: Severity::Transient,
            },
            _ => HumanError {
                message: "A network or file error occurred.".into(),
                suggestion: format!("Try again. ({io_err})"),
                rerun: true,
                severity: Severity::Transient,
            },
        },

        VoxcommError::DataTransfer { sequence, .. } => HumanError {
            message: format!("The printer reported an error receiving part {sequence} of the file."),
            suggestion: "This should rarely happen. If it happens regularly, or with a specific .gcode file, please open an issue.".into(),
            rerun: true,
            severity: Severity::Transient,
        },

        VoxcommError::UnexpectedResponse { stage, response } => HumanError {
            message: format!("The printer gave an unexpected answer during {stage}."),
            suggestion: format!("Please open an issue and include the printer's reply: {response:?}"),
            rerun: false,
            severity: Severity::Permanent,
        },

        VoxcommError::Discovery(detail) => HumanError {
            message: "We can't search for printers right now.".into(),
            suggestion: format!("Make sure you're connected to a network, or pass the printer's address directly. ({detail})"),
            rerun: true,
            severity: Severity::Transient,
        },

        VoxcommError::NoPrinterFound => HumanError {
            message: "No printer found on the network.".into(),
            suggestion: "Make sure the printer is on and on the same network, or pass its address as the second argument.".into(),
            rerun: true,
            severity: Severity::Transient,
        },

        VoxcommError::InvalidSelection(detail) => HumanError {
            message: "That printer choice isn't valid.".into(),
            suggestion: format!("Pick one of the listed indices. ({detail})"),
            rerun: false,
            severity: Severity::ActionRequired,
        },

        VoxcommError::Cancelled => HumanError {
            message: "Upload cancelled.".into(),
            suggestion: "The printer may keep a partial file. Upload it again before printing.".into(),
            rerun: true,
            severity: Severity::ActionRequired,
        },

        VoxcommError::Serialization(_) => HumanError {
            message: "The configuration file isn't valid JSON.".into(),
            suggestion: "Fix or remove the config file, then try again.".into(),
            rerun: false,
            severity: Severity::ActionRequired,
        },
    }
}

fn humanize_connect(addr: &str, source: &std::io::Error) -> HumanError {
    match source.kind() {
        std::io::ErrorKind::ConnectionRefused => HumanError {
            message: format!("The printer at {addr} refused our connection."),
            suggestion: "Another program may already be connected, or network control is disabled on the printer.".into(),
            rerun: true,
            severity: Severity::Transient,
        },
        std::io::ErrorKind::TimedOut => HumanError {
            message: format!("The printer at {addr} didn't respond."),
            suggestion: "Check the printer is on and the address is right, then try again.".into(),
            rerun: true,
            severity: Severity::Transient,
        },
        _ => HumanError {
            message: format!("Couldn't reach the printer at {addr}."),
            suggestion: format!("Check the address and your network connection. ({source})"),
            rerun: true,
            severity: Severity::Transient,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_error_is_transient() {
        let err = VoxcommError::DataTransfer {
            sequence: 1,
            response: "1 error.\r\n".into(),
        };
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.message.contains("part 1"));
    }

    #[test]
    fn unexpected_response_is_permanent_and_quotes_reply() {
        let err = VoxcommError::UnexpectedResponse {
            stage: "file save".into(),
            response: "weird".into(),
        };
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Permanent);
        assert!(!human.rerun);
        assert!(human.suggestion.contains("weird"));
    }

    #[test]
    fn refused_connection_names_address() {
        let err = VoxcommError::Connect {
            addr: "192.168.0.136:8899".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        let human = humanize_error(&err);
        assert!(human.message.contains("192.168.0.136:8899"));
        assert!(human.rerun);
    }

    #[test]
    fn missing_file_is_action_required() {
        let err = VoxcommError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }

    #[test]
    fn usage_error_does_not_suggest_rerun() {
        let human = humanize_error(&VoxcommError::Usage("missing file".into()));
        assert!(!human.rerun);
        assert_eq!(human.severity, Severity::ActionRequired);
    }
}
