//! Stop-to-kill escalation for the combined stop control.

use shared::{PowerAction, PowerState};

/// Converts the single user-facing stop control into the right underlying
/// command based on history, without making the user pick explicitly.
///
/// The first press requests a graceful `stop` and arms the policy; while
/// armed, further presses request `kill` (re-issuing kill is intentionally
/// idempotent). Every observed lifecycle value re-derives the armed flag:
/// it stays armed only while the server reports `stopping`, so the flag is
/// guaranteed clear once the server reaches `offline` and a future stop
/// starts gracefully again. Observing `stopping` arms the policy even
/// without a local press, covering stops initiated elsewhere.
pub struct StopEscalationPolicy {
    armed: bool,
}

impl StopEscalationPolicy {
    pub fn new() -> Self {
        Self { armed: false }
    }

    /// Whether the next press escalates to `kill`.
    pub fn armed(&self) -> bool {
        self.armed
    }

    /// Resolves one press of the stop control and arms the policy.
    pub fn on_press(&mut self) -> PowerAction {
        let action = if self.armed {
            PowerAction::Kill
        } else {
            PowerAction::Stop
        };
        self.armed = true;
        action
    }

    /// Re-derives the armed flag from an observed lifecycle value.
    pub fn observe(&mut self, state: PowerState) {
        self.armed = state == PowerState::Stopping;
    }
}

impl Default for StopEscalationPolicy {
    fn default() -> Self {
        Self::new()
    }
}
