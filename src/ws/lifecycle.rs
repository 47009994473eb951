//! Connection state machine.
//!
//! Pure: [`Lifecycle::apply`] takes an input, moves to the next state and
//! returns what the transport should do. The transport owns the socket and the
//! timers; this type owns every decision.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Reconnecting = 3,
}

impl From<u8> for ConnectionState {
    fn from(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Reconnecting,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// Something that happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Caller asked to connect.
    Connect,
    /// The socket opened.
    Opened,
    /// A connect attempt failed or timed out.
    Failed,
    /// An open socket closed or errored.
    Closed,
    /// The reconnect delay ran out.
    BackoffElapsed,
    /// Caller asked to disconnect.
    Disconnect,
}

/// What the transport must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    OpenSocket,
    /// Send every tracked subscription, in order, on the new socket.
    ReplaySubscriptions,
    /// Wait out the backoff for `failures` consecutive failures, then report
    /// [`Input::BackoffElapsed`].
    ScheduleReconnect { failures: u32 },
    CloseSocket,
    /// Terminal for this lifecycle; surface `MaxRetriesExceeded`.
    GiveUp { attempts: u32 },
    None,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ConnectionState,
    failures: u32,
    max_attempts: u32,
}

impl Lifecycle {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            failures: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive failed connect attempts so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn apply(&mut self, input: Input) -> Action {
        use ConnectionState::*;

        match (self.state, input) {
            (Disconnected, Input::Connect) => {
                self.failures = 0;
                self.state = Connecting;
                Action::OpenSocket
            }
            (Connecting, Input::Opened) => {
                self.failures = 0;
                self.state = Connected;
                Action::ReplaySubscriptions
            }
            (Connecting, Input::Failed) => {
                self.failures += 1;
                if self.failures >= self.max_attempts {
                    let attempts = self.failures;
                    self.failures = 0;
                    self.state = Disconnected;
                    Action::GiveUp { attempts }
                } else {
                    self.state = Reconnecting;
                    Action::ScheduleReconnect {
                        failures: self.failures,
                    }
                }
            }
            (Connected, Input::Closed) => {
                self.state = Reconnecting;
                Action::ScheduleReconnect { failures: 0 }
            }
            (Reconnecting, Input::BackoffElapsed) => {
                self.state = Connecting;
                Action::OpenSocket
            }
            (Disconnected, Input::Disconnect) => Action::None,
            (Connected, Input::Disconnect) => {
                self.failures = 0;
                self.state = Disconnected;
                Action::CloseSocket
            }
            (Connecting | Reconnecting, Input::Disconnect) => {
                self.failures = 0;
                self.state = Disconnected;
                Action::None
            }
            _ => Action::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut lc = Lifecycle::new(5);
        assert_eq!(lc.apply(Input::Connect), Action::OpenSocket);
        assert_eq!(lc.state(), ConnectionState::Connecting);
        assert_eq!(lc.apply(Input::Opened), Action::ReplaySubscriptions);
        assert_eq!(lc.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut lc = Lifecycle::new(5);
        lc.apply(Input::Connect);
        assert_eq!(lc.apply(Input::Connect), Action::None);
        lc.apply(Input::Opened);
        assert_eq!(lc.apply(Input::Connect), Action::None);
        assert_eq!(lc.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut lc = Lifecycle::new(5);
        assert_eq!(lc.apply(Input::Disconnect), Action::None);
        assert_eq!(lc.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_from_connected_closes_socket() {
        let mut lc = Lifecycle::new(5);
        lc.apply(Input::Connect);
        lc.apply(Input::Opened);
        assert_eq!(lc.apply(Input::Disconnect), Action::CloseSocket);
        assert_eq!(lc.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_during_backoff() {
        let mut lc = Lifecycle::new(5);
        lc.apply(Input::Connect);
        lc.apply(Input::Failed);
        assert_eq!(lc.state(), ConnectionState::Reconnecting);
        assert_eq!(lc.apply(Input::Disconnect), Action::None);
        assert_eq!(lc.state(), ConnectionState::Disconnected);
        assert_eq!(lc.apply(Input::BackoffElapsed), Action::None);
    }

    #[test]
    fn test_close_schedules_reconnect() {
        let mut lc = Lifecycle::new(5);
        lc.apply(Input::Connect);
        lc.apply(Input::Opened);
        assert_eq!(
            lc.apply(Input::Closed),
            Action::ScheduleReconnect { failures: 0 }
        );
        assert_eq!(lc.state(), ConnectionState::Reconnecting);
        assert_eq!(lc.apply(Input::BackoffElapsed), Action::OpenSocket);
        assert_eq!(lc.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut lc = Lifecycle::new(5);
        let mut action = lc.apply(Input::Connect);
        let mut opens = 0;
        loop {
            match action {
                Action::OpenSocket => {
                    opens += 1;
                    action = lc.apply(Input::Failed);
                }
                Action::ScheduleReconnect { failures } => {
                    assert_eq!(failures, lc.failures());
                    action = lc.apply(Input::BackoffElapsed);
                }
                Action::GiveUp { attempts } => {
                    assert_eq!(attempts, 5);
                    break;
                }
                other => panic!("unexpected action {:?}", other),
            }
        }
        assert_eq!(opens, 5);
        assert_eq!(lc.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_success_resets_failures() {
        let mut lc = Lifecycle::new(5);
        lc.apply(Input::Connect);
        lc.apply(Input::Failed);
        lc.apply(Input::BackoffElapsed);
        lc.apply(Input::Failed);
        assert_eq!(lc.failures(), 2);
        lc.apply(Input::BackoffElapsed);
        lc.apply(Input::Opened);
        assert_eq!(lc.failures(), 0);
    }

    #[test]
    fn test_state_u8_roundtrip() {
        for s in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
        ] {
            assert_eq!(ConnectionState::from(s as u8), s);
        }
    }
}
