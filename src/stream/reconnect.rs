//! Client-side reconnection policy for the room stream
//!
//! A dropped stream is recovered by reconnecting; the server keeps nothing
//! per client beyond the subscription. This is the retry loop as an explicit
//! state machine, `Connecting → Open → Backoff → Connecting …`, ending in
//! `Closed` on cancel or when the attempts run out.

use std::time::Duration;

/// Delay between a failure and the next attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    /// Attempt number `attempt` (1-based) in progress
    Connecting { attempt: u32 },
    Open,
    /// Waiting `delay` before attempt `next_attempt`
    Backoff { next_attempt: u32, delay: Duration },
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectInput {
    /// The stream answered and sent its `connected` frame
    Connected,
    /// The connection attempt failed
    Failed,
    /// An open stream ended or errored
    Disconnected,
    /// The backoff delay is over
    BackoffElapsed,
    /// The client gave up (page closed, user left the room)
    Cancel,
}

/// Fixed backoff, optionally bounded in consecutive failed attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    state: ReconnectState,
}

impl Reconnector {
    /// Starts in `Connecting { attempt: 1 }`
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ReconnectState::Connecting { attempt: 1 },
        }
    }

    pub fn state(&self) -> ReconnectState {
        self.state
    }

    /// Applies one input and returns the new state. Inputs that make no sense
    /// in the current state leave it unchanged; `Closed` is final.
    pub fn on(&mut self, input: ReconnectInput) -> ReconnectState {
        use ReconnectInput::*;
        use ReconnectState::*;

        self.state = match (self.state, input) {
            (Closed, _) => Closed,
            (_, Cancel) => Closed,

            (Connecting { .. }, Connected) => Open,
            (Connecting { attempt }, Failed) => match self.policy.max_attempts {
                Some(max) if attempt >= max => Closed,
                _ => Backoff {
                    next_attempt: attempt + 1,
                    delay: self.policy.delay,
                },
            },

            // una connessione riuscita azzera il conteggio dei tentativi
            (Open, Disconnected) => Backoff {
                next_attempt: 1,
                delay: self.policy.delay,
            },

            (Backoff { next_attempt, .. }, BackoffElapsed) => Connecting {
                attempt: next_attempt,
            },

            (state, _) => state,
        };
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReconnectInput::*;

    #[test]
    fn happy_path_reconnects_after_a_drop() {
        let mut r = Reconnector::new(ReconnectPolicy::default());
        assert_eq!(r.on(Connected), ReconnectState::Open);
        assert_eq!(
            r.on(Disconnected),
            ReconnectState::Backoff {
                next_attempt: 1,
                delay: DEFAULT_RECONNECT_DELAY
            }
        );
        assert_eq!(r.on(BackoffElapsed), ReconnectState::Connecting { attempt: 1 });
        assert_eq!(r.on(Connected), ReconnectState::Open);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut r = Reconnector::new(ReconnectPolicy::fixed(Duration::from_secs(1)).with_max_attempts(2));
        assert!(matches!(r.on(Failed), ReconnectState::Backoff { next_attempt: 2, .. }));
        assert_eq!(r.on(BackoffElapsed), ReconnectState::Connecting { attempt: 2 });
        assert_eq!(r.on(Failed), ReconnectState::Closed);
    }

    #[test]
    fn unlimited_policy_keeps_retrying() {
        let mut r = Reconnector::new(ReconnectPolicy::default());
        for attempt in 1..50 {
            assert_eq!(r.state(), ReconnectState::Connecting { attempt });
            r.on(Failed);
            r.on(BackoffElapsed);
        }
    }

    #[test]
    fn cancel_is_final_from_any_state() {
        let mut r = Reconnector::new(ReconnectPolicy::default());
        r.on(Connected);
        assert_eq!(r.on(Cancel), ReconnectState::Closed);
        assert_eq!(r.on(BackoffElapsed), ReconnectState::Closed);
        assert_eq!(r.on(Connected), ReconnectState::Closed);
    }

    #[test]
    fn irrelevant_inputs_are_ignored() {
        let mut r = Reconnector::new(ReconnectPolicy::default());
        assert_eq!(r.on(BackoffElapsed), ReconnectState::Connecting { attempt: 1 });
        r.on(Connected);
        assert_eq!(r.on(Connected), ReconnectState::Open);
    }
}
