use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROTOCOL_VERSION: u32 = 1;

/// Named inbound event streams delivered over a server's persistent channel.
///
/// `Status` and `Stats` arrive on the wire; `Connected` and `Disconnected`
/// are synthesized locally by the channel adapter when the link comes up or
/// goes down, so consumers can observe the connection signal the same way
/// they observe any other event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    Status,
    Stats,
    Connected,
    Disconnected,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Status => "status",
            Event::Stats => "stats",
            Event::Connected => "connected",
            Event::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named outbound commands a client may send to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Request {
    SetState,
    SendStats,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::SetState => "set state",
            Request::SendStats => "send stats",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Power command payloads carried by a `SetState` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerAction {
    Start,
    Stop,
    Restart,
    Kill,
}

impl PowerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerAction::Start => "start",
            PowerAction::Stop => "stop",
            PowerAction::Restart => "restart",
            PowerAction::Kill => "kill",
        }
    }

    pub fn from_wire(raw: &str) -> Option<PowerAction> {
        match raw {
            "start" => Some(PowerAction::Start),
            "stop" => Some(PowerAction::Stop),
            "restart" => Some(PowerAction::Restart),
            "kill" => Some(PowerAction::Kill),
            _ => None,
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse operational phase of a server as reported on the `status` stream.
///
/// `Unknown` is the client-side initial value before the first status
/// message and never appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Unknown,
    Offline,
    Starting,
    Running,
    Stopping,
    Installing,
    Transferring,
}

impl PowerState {
    /// Parses a raw status payload. Unrecognized payloads yield `None` and
    /// are expected to be ignored by the consumer.
    pub fn from_wire(raw: &str) -> Option<PowerState> {
        match raw {
            "offline" => Some(PowerState::Offline),
            "starting" => Some(PowerState::Starting),
            "running" => Some(PowerState::Running),
            "stopping" => Some(PowerState::Stopping),
            "installing" => Some(PowerState::Installing),
            "transferring" => Some(PowerState::Transferring),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::Unknown => "unknown",
            PowerState::Offline => "offline",
            PowerState::Starting => "starting",
            PowerState::Running => "running",
            PowerState::Stopping => "stopping",
            PowerState::Installing => "installing",
            PowerState::Transferring => "transferring",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maintenance overlay carried on the same wire field as the lifecycle
/// cycle states. Takes display precedence over the cycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    Installing,
    Transferring,
}

impl Overlay {
    pub fn as_state(&self) -> PowerState {
        match self {
            Overlay::Installing => PowerState::Installing,
            Overlay::Transferring => PowerState::Transferring,
        }
    }
}

/// JSON shape of the periodic usage telemetry pushed on the `stats` stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsMessage {
    pub memory_bytes: u64,
    pub cpu_absolute: f64,
    pub disk_bytes: u64,
    #[serde(default)]
    pub uptime: u64,
}

/// Latest decoded resource usage for one server.
///
/// Replaced wholesale on every telemetry message; all-zero before the
/// first one arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageSnapshot {
    pub memory_bytes: u64,
    pub cpu_percent: f64,
    pub disk_bytes: u64,
    pub uptime_millis: u64,
}

impl From<StatsMessage> for UsageSnapshot {
    fn from(msg: StatsMessage) -> Self {
        Self {
            memory_bytes: msg.memory_bytes,
            cpu_percent: msg.cpu_absolute,
            disk_bytes: msg.disk_bytes,
            uptime_millis: msg.uptime,
        }
    }
}

impl UsageSnapshot {
    pub fn uptime_seconds(&self) -> u64 {
        self.uptime_millis / 1000
    }
}

/// Formats a byte count for dashboard display ("512 B", "1.50 MB", ...).
pub fn bytes_to_human(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}

/// Datagram framing between a panel client and a per-server agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Packet {
    Hello { client_version: u32 },
    Command { request: Request, payload: Option<String> },
    Goodbye { reason: String },

    Welcome,
    Event { event: Event, payload: String },
}
