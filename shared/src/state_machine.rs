//! Connection State Machine
//!
//! Defines the states a duplex connection moves through and which events may
//! move it between them. The connection manager holds one machine behind its
//! state lock so every transition is serialized.

use std::fmt;

/// Status of a live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Initial state, and the state after giving up or disconnecting
    #[default]
    Disconnected,
    /// Handshake in flight
    Connecting,
    /// Handshake complete, transport usable
    Connected,
    /// Link failed, reconnect loop running
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Caller asked to connect
    ConnectRequested,
    /// Handshake (initial or reconnect) succeeded
    HandshakeSucceeded,
    /// Initial handshake failed
    HandshakeFailed,
    /// Keep-alive or read failure on a live link
    LinkFailed,
    /// Reconnect attempts exhausted, or reconnect disabled
    RetriesExhausted,
    /// Caller asked to disconnect
    DisconnectRequested,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition was valid and state changed (or stayed, for idempotent events)
    Success(ConnectionState),
    /// Transition was invalid from current state
    Invalid {
        from: ConnectionState,
        event: LinkEvent,
    },
}

impl TransitionResult {
    /// True if the event was accepted
    pub fn is_success(&self) -> bool {
        matches!(self, TransitionResult::Success(_))
    }
}

/// The state machine for one connection instance
#[derive(Debug, Default)]
pub struct ConnectionStateMachine {
    current_state: ConnectionState,
}

impl ConnectionStateMachine {
    /// Create a new state machine in Disconnected state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.current_state
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: LinkEvent) -> TransitionResult {
        // Disconnect always wins
        if event == LinkEvent::DisconnectRequested {
            self.current_state = ConnectionState::Disconnected;
            return TransitionResult::Success(self.current_state);
        }

        match self.get_next_state(event) {
            Some(state) => {
                self.current_state = state;
                TransitionResult::Success(state)
            }
            None => TransitionResult::Invalid {
                from: self.current_state,
                event,
            },
        }
    }

    /// Get the next state for a given event, if the transition is valid
    fn get_next_state(&self, event: LinkEvent) -> Option<ConnectionState> {
        use ConnectionState::*;
        use LinkEvent::*;

        match (self.current_state, event) {
            // From Disconnected
            (Disconnected, ConnectRequested) => Some(Connecting),

            // From Connecting
            (Connecting, HandshakeSucceeded) => Some(Connected),
            (Connecting, HandshakeFailed) => Some(Disconnected),

            // From Connected
            (Connected, LinkFailed) => Some(Reconnecting),
            // Reconnect disabled: skip straight to Disconnected
            (Connected, RetriesExhausted) => Some(Disconnected),

            // From Reconnecting
            (Reconnecting, HandshakeSucceeded) => Some(Connected),
            (Reconnecting, RetriesExhausted) => Some(Disconnected),

            // Invalid transition
            _ => None,
        }
    }
}

/// Check if a transition from one state to another is generally valid
pub fn is_valid_transition(from: ConnectionState, to: ConnectionState) -> bool {
    use ConnectionState::*;

    match (from, to) {
        // Same state is always valid
        (a, b) if a == b => true,

        // Disconnected can be reached from anywhere
        (_, Disconnected) => true,

        (Disconnected, Connecting) => true,
        (Connecting, Connected) => true,
        (Connected, Reconnecting) => true,
        (Reconnecting, Connected) => true,

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let fsm = ConnectionStateMachine::new();
        assert_eq!(fsm.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connect_reconnect_flow() {
        let mut fsm = ConnectionStateMachine::new();

        let result = fsm.process_event(LinkEvent::ConnectRequested);
        assert_eq!(result, TransitionResult::Success(ConnectionState::Connecting));

        let result = fsm.process_event(LinkEvent::HandshakeSucceeded);
        assert_eq!(result, TransitionResult::Success(ConnectionState::Connected));

        let result = fsm.process_event(LinkEvent::LinkFailed);
        assert_eq!(result, TransitionResult::Success(ConnectionState::Reconnecting));

        let result = fsm.process_event(LinkEvent::HandshakeSucceeded);
        assert_eq!(result, TransitionResult::Success(ConnectionState::Connected));
    }

    #[test]
    fn test_second_connect_is_invalid() {
        let mut fsm = ConnectionStateMachine::new();
        fsm.process_event(LinkEvent::ConnectRequested);

        let result = fsm.process_event(LinkEvent::ConnectRequested);
        assert!(matches!(
            result,
            TransitionResult::Invalid {
                from: ConnectionState::Connecting,
                ..
            }
        ));
        assert_eq!(fsm.state(), ConnectionState::Connecting);
    }

    fn machine_in(events: &[LinkEvent]) -> ConnectionStateMachine {
        let mut fsm = ConnectionStateMachine::new();
        for event in events {
            fsm.process_event(*event);
        }
        fsm
    }

    #[test]
    fn test_disconnect_from_any_state() {
        use LinkEvent::*;
        let paths: [&[LinkEvent]; 4] = [
            &[],
            &[ConnectRequested],
            &[ConnectRequested, HandshakeSucceeded],
            &[ConnectRequested, HandshakeSucceeded, LinkFailed],
        ];

        for path in paths {
            let mut fsm = machine_in(path);
            let result = fsm.process_event(DisconnectRequested);
            assert_eq!(result, TransitionResult::Success(ConnectionState::Disconnected));
        }
    }

    #[test]
    fn test_exhaustion_returns_to_disconnected() {
        let mut fsm = ConnectionStateMachine::new();
        fsm.process_event(LinkEvent::ConnectRequested);
        fsm.process_event(LinkEvent::HandshakeSucceeded);
        fsm.process_event(LinkEvent::LinkFailed);

        let result = fsm.process_event(LinkEvent::RetriesExhausted);
        assert_eq!(result, TransitionResult::Success(ConnectionState::Disconnected));

        // Reusable after giving up
        let result = fsm.process_event(LinkEvent::ConnectRequested);
        assert!(result.is_success());
    }

    #[test]
    fn test_link_failure_ignored_when_not_connected() {
        let mut fsm = ConnectionStateMachine::new();
        let result = fsm.process_event(LinkEvent::LinkFailed);
        assert!(!result.is_success());
        assert_eq!(fsm.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_valid_transitions() {
        use ConnectionState::*;
        assert!(is_valid_transition(Disconnected, Connecting));
        assert!(is_valid_transition(Reconnecting, Disconnected));
        assert!(!is_valid_transition(Disconnected, Connected));
        assert!(!is_valid_transition(Connecting, Reconnecting));
    }
}
