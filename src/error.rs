//! Error taxonomy for a tcpclient run.
//!
//! Every failure is terminal. The variant decides which class it belongs to,
//! and the class decides the process exit status.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Broad class of a failure, used for exit codes and log wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad flags, address, encoding or config. Raised before any network activity.
    Argument,
    /// Name resolution or connection establishment failed.
    Connect,
    /// Send or receive failed on an established connection.
    Io,
    /// The user pressed Ctrl+C while we were blocked.
    Interrupted,
}

impl ErrorKind {
    /// Process exit status for this class of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Argument => 2,
            ErrorKind::Connect => 3,
            ErrorKind::Io => 4,
            ErrorKind::Interrupted => 130,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("connection to {target} timed out after {timeout:?}")]
    ConnectTimeout { target: String, timeout: Duration },

    #[error("failed to send payload: {0}")]
    Send(#[source] io::Error),

    #[error("payload not accepted by peer within {0:?}")]
    SendTimeout(Duration),

    #[error("failed to receive response: {0}")]
    Receive(#[source] io::Error),

    #[error("no response within {0:?}")]
    ReceiveTimeout(Duration),

    #[error("connection closed by peer before any response")]
    PeerClosed,

    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),

    #[error("interrupted")]
    Interrupted,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Argument(_) | ClientError::UnknownEncoding(_) | ClientError::Config(_) => {
                ErrorKind::Argument
            }
            ClientError::Resolve { .. }
            | ClientError::Connect { .. }
            | ClientError::ConnectTimeout { .. } => ErrorKind::Connect,
            ClientError::Send(_)
            | ClientError::SendTimeout(_)
            | ClientError::Receive(_)
            | ClientError::ReceiveTimeout(_)
            | ClientError::PeerClosed
            | ClientError::Terminal(_) => ErrorKind::Io,
            ClientError::Interrupted => ErrorKind::Interrupted,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}
