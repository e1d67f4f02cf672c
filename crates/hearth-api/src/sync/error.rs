//! Transport error classification for controller connections.
//!
//! Classification walks the error's `source()` chain looking for a
//! websocket protocol error or an [`io::Error`] and decides from its
//! variant or [`io::ErrorKind`]. Message text is never inspected.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;
use tungstenite::error::ProtocolError;

/// Boxed transport error kept for diagnostics.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Why reading from (or writing to) a controller connection stopped.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The controller went away: close frame, end of stream or a reset.
    #[error("peer closed the connection")]
    PeerClosed,

    /// No message arrived before the idle deadline, or the transport timed out.
    #[error("connection timed out")]
    TimedOut,

    /// The server is shutting down.
    #[error("connection cancelled")]
    Cancelled,

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(#[source] BoxError),
}

impl ConnectionError {
    /// Classify a transport error by the first websocket or I/O error found
    /// in its source chain.
    pub fn from_transport<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        match classify_chain(&err) {
            Some(Cause::PeerGone) => ConnectionError::PeerClosed,
            Some(Cause::TimedOut) => ConnectionError::TimedOut,
            None => ConnectionError::Other(Box::new(err)),
        }
    }
}

enum Cause {
    PeerGone,
    TimedOut,
}

/// Walk the chain starting with `err` itself and stop at the first error
/// with a known type.
fn classify_chain(err: &(dyn StdError + 'static)) -> Option<Cause> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(ws_err) = e.downcast_ref::<tungstenite::Error>() {
            return classify_websocket(ws_err);
        }
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return classify_io(io_err.kind());
        }
        current = e.source();
    }
    None
}

fn classify_websocket(err: &tungstenite::Error) -> Option<Cause> {
    match err {
        tungstenite::Error::ConnectionClosed
        | tungstenite::Error::AlreadyClosed
        | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            Some(Cause::PeerGone)
        }
        tungstenite::Error::Io(io_err) => classify_io(io_err.kind()),
        _ => None,
    }
}

fn classify_io(kind: io::ErrorKind) -> Option<Cause> {
    if is_peer_gone(kind) {
        Some(Cause::PeerGone)
    } else if kind == io::ErrorKind::TimedOut {
        Some(Cause::TimedOut)
    } else {
        None
    }
}

fn is_peer_gone(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}
