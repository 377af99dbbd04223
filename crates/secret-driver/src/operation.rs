//! Requests the host delivers to the driver, and the replies it sends back.

use crate::host::{Endpoint, GrantHandle};

/// The closed set of operations the device supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Open with the host's access flags word.
    Open { flags: u32 },
    /// Release one handle.
    Close,
    /// Drain up to `len` bytes into the caller region `handle`.
    Read { handle: GrantHandle, len: usize },
    /// Append up to `len` bytes from the caller region `handle`.
    Write { handle: GrantHandle, len: usize },
    /// Control request; `handle` names the caller's argument.
    Grant { request: u32, handle: GrantHandle },
}

impl Operation {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Open { .. } => "open",
            Operation::Close => "close",
            Operation::Read { .. } => "read",
            Operation::Write { .. } => "write",
            Operation::Grant { .. } => "grant",
        }
    }
}

/// One request from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub endpoint: Endpoint,
    pub op: Operation,
}

impl Request {
    pub fn new(endpoint: Endpoint, op: Operation) -> Self {
        Self { endpoint, op }
    }
}

/// The driver's answer to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Success with nothing to report.
    Ok,
    /// Success; this many bytes moved.
    Transferred(usize),
    /// Failure with a positive errno.
    Error { errno: i32 },
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        !matches!(self, Reply::Error { .. })
    }

    /// The errno, if this is an error reply.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Reply::Error { errno } => Some(*errno),
            _ => None,
        }
    }

    /// Bytes transferred; zero for non-transfer replies.
    pub fn transferred(&self) -> usize {
        match self {
            Reply::Transferred(n) => *n,
            _ => 0,
        }
    }

    /// The status a C caller would see: bytes moved, 0, or `-errno`.
    pub fn status(&self) -> i64 {
        match self {
            Reply::Ok => 0,
            Reply::Transferred(n) => *n as i64,
            Reply::Error { errno } => -(*errno as i64),
        }
    }
}
