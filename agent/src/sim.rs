//! Simulated game-server process lifecycle and resource model.

use log::info;
use rand::Rng;
use shared::{PowerAction, StatsMessage};
use std::time::{Duration, Instant};

const MIB: u64 = 1024 * 1024;
const BASE_DISK_BYTES: u64 = 512 * MIB;

/// Daemon-side process state. The agent reports these on the `status`
/// stream using the shared wire vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Offline,
    Starting,
    Running,
    Stopping,
}

impl SimState {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SimState::Offline => "offline",
            SimState::Starting => "starting",
            SimState::Running => "running",
            SimState::Stopping => "stopping",
        }
    }
}

/// Models one game-server process: timed boot and shutdown transitions,
/// restart queuing, and a jittered resource-usage profile.
///
/// All methods take the current instant explicitly so tests can drive the
/// clock deterministically.
pub struct ServerSim {
    state: SimState,
    boot_delay: Duration,
    stop_delay: Duration,
    transition_at: Option<Instant>,
    started_at: Option<Instant>,
    restart_queued: bool,
    disk_bytes: u64,
}

impl ServerSim {
    pub fn new(boot_delay: Duration, stop_delay: Duration) -> Self {
        Self {
            state: SimState::Offline,
            boot_delay,
            stop_delay,
            transition_at: None,
            started_at: None,
            restart_queued: false,
            disk_bytes: BASE_DISK_BYTES,
        }
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// Applies a power command the way a real daemon validates it.
    /// Returns whether the reported state changed.
    pub fn apply_power(&mut self, action: PowerAction, now: Instant) -> bool {
        match action {
            PowerAction::Start => match self.state {
                SimState::Offline => {
                    self.begin_boot(now);
                    true
                }
                _ => false,
            },
            PowerAction::Stop => match self.state {
                SimState::Starting | SimState::Running => {
                    self.begin_shutdown(now);
                    self.restart_queued = false;
                    true
                }
                _ => false,
            },
            PowerAction::Restart => match self.state {
                SimState::Offline => {
                    self.begin_boot(now);
                    true
                }
                SimState::Starting | SimState::Running => {
                    self.begin_shutdown(now);
                    self.restart_queued = true;
                    true
                }
                SimState::Stopping => {
                    self.restart_queued = true;
                    false
                }
            },
            PowerAction::Kill => match self.state {
                SimState::Offline => false,
                _ => {
                    self.restart_queued = false;
                    self.go_offline();
                    true
                }
            },
        }
    }

    /// Advances timed transitions. Returns the new state when one fired.
    pub fn tick(&mut self, now: Instant) -> Option<SimState> {
        let due = matches!(self.transition_at, Some(at) if now >= at);
        if !due {
            return None;
        }
        self.transition_at = None;

        match self.state {
            SimState::Starting => {
                self.state = SimState::Running;
                self.started_at = Some(now);
            }
            SimState::Stopping => {
                self.go_offline();
                if self.restart_queued {
                    self.restart_queued = false;
                    self.begin_boot(now);
                }
            }
            _ => return None,
        }

        info!("server is now {}", self.state.wire_name());
        Some(self.state)
    }

    /// Samples the current resource usage. Uptime is measured from the
    /// instant the server reached `running` and reported in milliseconds.
    pub fn sample_stats(&mut self, now: Instant) -> StatsMessage {
        let mut rng = rand::thread_rng();

        let uptime = self
            .started_at
            .map(|at| now.duration_since(at).as_millis() as u64)
            .unwrap_or(0);

        let (memory_bytes, cpu_absolute) = match self.state {
            SimState::Offline => (0, 0.0),
            // Boot loads a full core and ramps memory up.
            SimState::Starting => (
                rng.gen_range(200 * MIB..400 * MIB),
                rng.gen_range(80.0..120.0),
            ),
            SimState::Running => (
                rng.gen_range(480 * MIB..560 * MIB),
                rng.gen_range(5.0..25.0),
            ),
            SimState::Stopping => (
                rng.gen_range(100 * MIB..200 * MIB),
                rng.gen_range(1.0..5.0),
            ),
        };

        if self.state == SimState::Running {
            // World saves accrete slowly.
            self.disk_bytes += rng.gen_range(0..64 * 1024);
        }

        StatsMessage {
            memory_bytes,
            cpu_absolute,
            disk_bytes: self.disk_bytes,
            uptime,
        }
    }

    fn begin_boot(&mut self, now: Instant) {
        self.state = SimState::Starting;
        self.transition_at = Some(now + self.boot_delay);
    }

    fn begin_shutdown(&mut self, now: Instant) {
        self.state = SimState::Stopping;
        self.transition_at = Some(now + self.stop_delay);
    }

    fn go_offline(&mut self) {
        self.state = SimState::Offline;
        self.started_at = None;
        self.transition_at = None;
    }
}
