//! Per-server console facade wiring the core components to a channel.

use crate::channel::{EventChannel, Subscription};
use crate::escalation::StopEscalationPolicy;
use crate::power::PowerStateMachine;
use crate::stats::StatsTracker;
use log::{debug, warn};
use shared::{Event, PowerAction, PowerState, Request, UsageSnapshot};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct ConsoleState {
    power: PowerStateMachine,
    stats: StatsTracker,
    escalation: StopEscalationPolicy,
}

/// Live control surface for exactly one server.
///
/// Owns the server's state machine, telemetry snapshot and stop-escalation
/// policy, and holds one listener registration per relevant event stream.
/// Constructed once per server context and handed to the views that need
/// it; there is no process-wide registry. Dropping the console deregisters
/// every listener, so teardown is guaranteed on all exit paths.
pub struct ServerConsole {
    inner: Rc<RefCell<ConsoleState>>,
    channel: Rc<dyn EventChannel>,
    _subscriptions: Vec<Subscription>,
}

impl ServerConsole {
    /// Attaches a console to `channel`, registering listeners for the
    /// `status`, `stats` and connection streams.
    ///
    /// If the channel is already connected the periodic stats push is
    /// requested immediately; otherwise it is requested on every
    /// connect, including reconnects. Reconnection never resets the
    /// lifecycle state or the usage snapshot.
    pub fn attach(channel: Rc<dyn EventChannel>) -> ServerConsole {
        let inner = Rc::new(RefCell::new(ConsoleState::default()));
        let mut subscriptions = Vec::with_capacity(4);

        subscriptions.push(Subscription::new(Rc::clone(&channel), Event::Status, {
            let inner = Rc::clone(&inner);
            Box::new(move |raw| {
                let mut state = inner.borrow_mut();
                state.power.on_status(raw);
                // The escalation policy observes the state the machine
                // settled on, keeping the armed flag consistent with it.
                let current = state.power.current();
                state.escalation.observe(current);
            })
        }));

        subscriptions.push(Subscription::new(Rc::clone(&channel), Event::Stats, {
            let inner = Rc::clone(&inner);
            Box::new(move |raw| inner.borrow_mut().stats.on_message(raw))
        }));

        subscriptions.push(Subscription::new(Rc::clone(&channel), Event::Connected, {
            let channel = Rc::clone(&channel);
            Box::new(move |_| {
                debug!("channel connected; requesting periodic stats");
                channel.send(Request::SendStats, None);
            })
        }));

        subscriptions.push(Subscription::new(
            Rc::clone(&channel),
            Event::Disconnected,
            Box::new(|_| warn!("channel disconnected; keeping last known server state")),
        ));

        if channel.connected() {
            channel.send(Request::SendStats, None);
        }

        ServerConsole {
            inner,
            channel,
            _subscriptions: subscriptions,
        }
    }

    /// Current lifecycle state (overlay states take display precedence).
    pub fn state(&self) -> PowerState {
        self.inner.borrow().power.current()
    }

    /// Latest usage snapshot; all-zero until the first telemetry message.
    pub fn usage(&self) -> UsageSnapshot {
        self.inner.borrow().stats.snapshot()
    }

    pub fn uptime_display(&self) -> Option<String> {
        self.inner.borrow().stats.uptime_display()
    }

    /// Whether the control for `action` should render enabled.
    pub fn power_enabled(&self, action: PowerAction) -> bool {
        self.inner.borrow().power.permits(action)
    }

    /// Whether the combined stop/kill control should render enabled.
    /// There is nothing to stop before the first status or while offline.
    pub fn stop_control_enabled(&self) -> bool {
        !matches!(self.state(), PowerState::Unknown | PowerState::Offline)
    }

    /// Whether the next press of the stop control would escalate to kill.
    pub fn escalation_armed(&self) -> bool {
        self.inner.borrow().escalation.armed()
    }

    /// Requests a power action. A request whose precondition does not hold
    /// is dropped silently; returns whether the command went out.
    pub fn request_power(&self, action: PowerAction) -> bool {
        self.inner.borrow().power.issue(action, &*self.channel)
    }

    /// Single entry point for the escalating stop control: the first press
    /// requests a graceful stop, repeated presses before the stop completes
    /// request a kill. Returns the action issued, or `None` when the
    /// control has nothing to act on.
    pub fn request_stop_or_kill(&self) -> Option<PowerAction> {
        let mut state = self.inner.borrow_mut();
        if matches!(
            state.power.current(),
            PowerState::Unknown | PowerState::Offline
        ) {
            return None;
        }

        let action = state.escalation.on_press();
        state.power.issue(action, &*self.channel);
        Some(action)
    }
}
