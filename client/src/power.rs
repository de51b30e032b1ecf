//! Lifecycle state machine and power command validation.

use crate::channel::EventChannel;
use log::debug;
use shared::{Overlay, PowerAction, PowerState, Request};

/// Single authoritative mapping from inbound `status` messages to the
/// server's lifecycle state, plus validation of outbound power commands.
///
/// The cycle states (`offline → starting → running → stopping → offline`)
/// and the installing/transferring overlay arrive on the same wire field but
/// are tracked independently: an overlay value does not disturb the last
/// known cycle state, and a cycle value clears the overlay. The overlay
/// takes display precedence.
///
/// State is mutated only by inbound status messages, never optimistically
/// by a command. A transport disconnect leaves the last known value in
/// place so a transient drop does not flicker the controls.
pub struct PowerStateMachine {
    cycle: PowerState,
    overlay: Option<Overlay>,
}

impl PowerStateMachine {
    pub fn new() -> Self {
        Self {
            cycle: PowerState::Unknown,
            overlay: None,
        }
    }

    /// Processes one raw `status` payload. Unrecognized payloads are
    /// dropped without a state change; malformed telemetry must never
    /// surface as an error.
    pub fn on_status(&mut self, raw: &str) {
        match PowerState::from_wire(raw.trim()) {
            Some(PowerState::Installing) => self.overlay = Some(Overlay::Installing),
            Some(PowerState::Transferring) => self.overlay = Some(Overlay::Transferring),
            Some(state) => {
                self.cycle = state;
                self.overlay = None;
            }
            None => debug!("ignoring unrecognized status payload {:?}", raw),
        }
    }

    /// Current lifecycle state, with the overlay taking precedence over the
    /// cycle state.
    pub fn current(&self) -> PowerState {
        match self.overlay {
            Some(overlay) => overlay.as_state(),
            None => self.cycle,
        }
    }

    pub fn overlay(&self) -> Option<Overlay> {
        self.overlay
    }

    /// Whether `action` may be issued in the current state. The control
    /// surface renders disabled controls from the same predicate, so a
    /// violation here is a defensive invariant rather than a user error.
    pub fn permits(&self, action: PowerAction) -> bool {
        match action {
            PowerAction::Start => self.current() == PowerState::Offline,
            PowerAction::Restart => self.current() != PowerState::Unknown,
            PowerAction::Stop | PowerAction::Kill => self.current() != PowerState::Offline,
        }
    }

    /// Forwards `action` verbatim as a `set state` command when its
    /// precondition holds. Returns whether the command was sent; a refused
    /// command is a silent no-op.
    pub fn issue(&self, action: PowerAction, channel: &dyn EventChannel) -> bool {
        if !self.permits(action) {
            debug!("dropping {} command in state {}", action, self.current());
            return false;
        }

        channel.send(Request::SetState, Some(action.as_str()));
        true
    }
}

impl Default for PowerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Listener, ListenerId};
    use shared::Event;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingChannel {
        sent: RefCell<Vec<(Request, Option<String>)>>,
    }

    impl EventChannel for RecordingChannel {
        fn subscribe(&self, _event: Event, _listener: Listener) -> ListenerId {
            0
        }

        fn unsubscribe(&self, _event: Event, _id: ListenerId) {}

        fn send(&self, request: Request, payload: Option<&str>) {
            self.sent
                .borrow_mut()
                .push((request, payload.map(str::to_string)));
        }

        fn connected(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_initial_state_is_unknown() {
        let machine = PowerStateMachine::new();
        assert_eq!(machine.current(), PowerState::Unknown);
        assert_eq!(machine.overlay(), None);
    }

    #[test]
    fn test_status_messages_drive_state() {
        let mut machine = PowerStateMachine::new();

        for (raw, expected) in [
            ("offline", PowerState::Offline),
            ("starting", PowerState::Starting),
            ("running", PowerState::Running),
            ("stopping", PowerState::Stopping),
            ("offline", PowerState::Offline),
        ] {
            machine.on_status(raw);
            assert_eq!(machine.current(), expected);
        }
    }

    #[test]
    fn test_unrecognized_status_leaves_state_unchanged() {
        let mut machine = PowerStateMachine::new();
        machine.on_status("running");

        machine.on_status("rebooting");
        machine.on_status("");
        machine.on_status("{\"not\":\"a status\"}");

        assert_eq!(machine.current(), PowerState::Running);
    }

    #[test]
    fn test_overlay_takes_display_precedence() {
        let mut machine = PowerStateMachine::new();
        machine.on_status("running");
        machine.on_status("installing");

        assert_eq!(machine.current(), PowerState::Installing);
        assert_eq!(machine.overlay(), Some(Overlay::Installing));

        // A cycle value clears the overlay again.
        machine.on_status("running");
        assert_eq!(machine.current(), PowerState::Running);
        assert_eq!(machine.overlay(), None);
    }

    #[test]
    fn test_overlay_does_not_lose_cycle_state() {
        let mut machine = PowerStateMachine::new();
        machine.on_status("stopping");
        machine.on_status("transferring");
        assert_eq!(machine.current(), PowerState::Transferring);

        machine.on_status("offline");
        assert_eq!(machine.current(), PowerState::Offline);
    }

    #[test]
    fn test_start_requires_offline() {
        let mut machine = PowerStateMachine::new();
        assert!(!machine.permits(PowerAction::Start));

        machine.on_status("offline");
        assert!(machine.permits(PowerAction::Start));

        machine.on_status("running");
        assert!(!machine.permits(PowerAction::Start));
    }

    #[test]
    fn test_restart_requires_a_known_state() {
        let mut machine = PowerStateMachine::new();
        assert!(!machine.permits(PowerAction::Restart));

        machine.on_status("offline");
        assert!(machine.permits(PowerAction::Restart));

        machine.on_status("running");
        assert!(machine.permits(PowerAction::Restart));
    }

    #[test]
    fn test_stop_and_kill_require_not_offline() {
        let mut machine = PowerStateMachine::new();
        machine.on_status("offline");
        assert!(!machine.permits(PowerAction::Stop));
        assert!(!machine.permits(PowerAction::Kill));

        machine.on_status("running");
        assert!(machine.permits(PowerAction::Stop));
        assert!(machine.permits(PowerAction::Kill));

        machine.on_status("stopping");
        assert!(machine.permits(PowerAction::Kill));
    }

    #[test]
    fn test_issue_sends_permitted_command_verbatim() {
        let channel = RecordingChannel::default();
        let mut machine = PowerStateMachine::new();
        machine.on_status("offline");

        assert!(machine.issue(PowerAction::Start, &channel));
        assert_eq!(
            *channel.sent.borrow(),
            vec![(Request::SetState, Some("start".to_string()))]
        );
    }

    #[test]
    fn test_issue_refused_command_sends_nothing() {
        let channel = RecordingChannel::default();
        let mut machine = PowerStateMachine::new();
        machine.on_status("offline");

        assert!(!machine.issue(PowerAction::Stop, &channel));
        assert!(!machine.issue(PowerAction::Kill, &channel));
        assert!(channel.sent.borrow().is_empty());
        assert_eq!(machine.current(), PowerState::Offline);
    }
}
