//! Per-transport connection state machine.
//!
//! States: `Created → Connecting → Connected | Failed`, with `Closed`
//! terminal and reachable from every state via explicit close. `Failed`
//! is reachable only from `Connecting`; nothing leaves `Closed` or
//! re-enters `Created`.

use thiserror::Error;

/// Direction of the media path a transport negotiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportDirection {
    Send,
    Recv,
}

impl std::fmt::Display for TransportDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Recv => write!(f, "recv"),
        }
    }
}

/// Connection state of one transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Server-issued parameters received, local negotiation not started.
    Created,
    /// Local negotiation started, link handshake in flight.
    Connecting,
    /// Link handshake completed.
    Connected,
    /// Link handshake failed. Only reachable from `Connecting`.
    Failed,
    /// Explicitly torn down. Terminal.
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid transport transition from {from:?} on {event}")]
    InvalidTransition {
        from: TransportState,
        event: &'static str,
    },
}

/// Pure transition table for one transport's connection state.
///
/// The owning session drives this from link state-change events; the
/// machine itself never performs I/O.
#[derive(Debug, Clone)]
pub struct TransportMachine {
    state: TransportState,
}

impl TransportMachine {
    pub fn new() -> Self {
        Self {
            state: TransportState::Created,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == TransportState::Closed
    }

    /// Local negotiation started.
    pub fn on_connect(&mut self) -> Result<(), TransportError> {
        match self.state {
            TransportState::Created => {
                self.state = TransportState::Connecting;
                Ok(())
            }
            from => Err(TransportError::InvalidTransition {
                from,
                event: "connect",
            }),
        }
    }

    /// Underlying link reported connected.
    pub fn on_connected(&mut self) -> Result<(), TransportError> {
        match self.state {
            TransportState::Connecting => {
                self.state = TransportState::Connected;
                Ok(())
            }
            from => Err(TransportError::InvalidTransition {
                from,
                event: "connected",
            }),
        }
    }

    /// Underlying link reported failure.
    pub fn on_failed(&mut self) -> Result<(), TransportError> {
        match self.state {
            TransportState::Connecting => {
                self.state = TransportState::Failed;
                Ok(())
            }
            from => Err(TransportError::InvalidTransition {
                from,
                event: "failed",
            }),
        }
    }

    /// Explicit teardown. Idempotent: closing a closed machine is a no-op.
    pub fn on_close(&mut self) {
        self.state = TransportState::Closed;
    }
}

impl Default for TransportMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut machine = TransportMachine::new();
        assert_eq!(machine.state(), TransportState::Created);
        machine.on_connect().unwrap();
        assert_eq!(machine.state(), TransportState::Connecting);
        machine.on_connected().unwrap();
        assert_eq!(machine.state(), TransportState::Connected);
    }

    #[test]
    fn failed_only_from_connecting() {
        let mut machine = TransportMachine::new();
        assert!(machine.on_failed().is_err());
        machine.on_connect().unwrap();
        machine.on_failed().unwrap();
        assert_eq!(machine.state(), TransportState::Failed);

        let mut connected = TransportMachine::new();
        connected.on_connect().unwrap();
        connected.on_connected().unwrap();
        assert!(connected.on_failed().is_err());
    }

    #[test]
    fn closed_is_terminal() {
        let mut machine = TransportMachine::new();
        machine.on_connect().unwrap();
        machine.on_close();
        assert!(machine.is_closed());

        // No transition leaves Closed.
        assert!(machine.on_connect().is_err());
        assert!(machine.on_connected().is_err());
        assert!(machine.on_failed().is_err());
        assert_eq!(machine.state(), TransportState::Closed);
    }

    #[test]
    fn close_from_every_state() {
        for setup in 0..4 {
            let mut machine = TransportMachine::new();
            match setup {
                0 => {}
                1 => {
                    machine.on_connect().unwrap();
                }
                2 => {
                    machine.on_connect().unwrap();
                    machine.on_connected().unwrap();
                }
                _ => {
                    machine.on_connect().unwrap();
                    machine.on_failed().unwrap();
                }
            }
            machine.on_close();
            assert!(machine.is_closed());
            // Idempotent.
            machine.on_close();
            assert!(machine.is_closed());
        }
    }

    #[test]
    fn no_reentry_into_created() {
        let mut machine = TransportMachine::new();
        machine.on_connect().unwrap();
        machine.on_connected().unwrap();
        // Connect from Connected is refused; the machine never goes back.
        let err = machine.on_connect().unwrap_err();
        assert_eq!(
            err,
            TransportError::InvalidTransition {
                from: TransportState::Connected,
                event: "connect",
            }
        );
    }
}
