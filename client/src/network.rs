//! UDP-backed channel adapter and the interactive session loop.

use crate::channel::{Dispatcher, EventChannel, Listener, ListenerId};
use crate::console::ServerConsole;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{bytes_to_human, Event, Packet, PowerAction, Request, PROTOCOL_VERSION};
use std::cell::Cell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::interval;

/// [`EventChannel`] implementation speaking the shared packet protocol to a
/// per-server agent.
///
/// Outbound commands are queued on an unbounded channel and drained by the
/// session loop, so `send` never blocks a delivery callback. The connected
/// flag is maintained from `Welcome`/`Goodbye` packets, and flips are
/// re-published to listeners as the synthetic `Connected`/`Disconnected`
/// events.
pub struct AgentLink {
    dispatcher: Dispatcher,
    outbound: mpsc::UnboundedSender<Packet>,
    connected: Cell<bool>,
}

impl AgentLink {
    fn new(outbound: mpsc::UnboundedSender<Packet>) -> Self {
        Self {
            dispatcher: Dispatcher::new(),
            outbound,
            connected: Cell::new(false),
        }
    }

    fn dispatch_event(&self, event: Event, payload: &str) {
        self.dispatcher.dispatch(event, payload);
    }

    fn set_connected(&self, connected: bool) {
        if self.connected.get() == connected {
            return;
        }
        self.connected.set(connected);

        let event = if connected {
            Event::Connected
        } else {
            Event::Disconnected
        };
        self.dispatcher.dispatch(event, "");
    }
}

impl EventChannel for AgentLink {
    fn subscribe(&self, event: Event, listener: Listener) -> ListenerId {
        self.dispatcher.add(event, listener)
    }

    fn unsubscribe(&self, event: Event, id: ListenerId) {
        self.dispatcher.remove(event, id);
    }

    fn send(&self, request: Request, payload: Option<&str>) {
        let packet = Packet::Command {
            request,
            payload: payload.map(str::to_string),
        };
        if self.outbound.send(packet).is_err() {
            warn!("session loop gone; dropping {} command", request);
        }
    }

    fn connected(&self) -> bool {
        self.connected.get()
    }
}

/// Interactive session against one agent: owns the socket, the channel
/// adapter and the server console, and multiplexes inbound datagrams, the
/// outbound command queue and operator input on a single thread.
pub struct Session {
    socket: UdpSocket,
    agent_addr: SocketAddr,
    link: Rc<AgentLink>,
    console: ServerConsole,
    outbound_rx: mpsc::UnboundedReceiver<Packet>,
}

impl Session {
    pub async fn new(agent_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let agent_addr = agent_addr.parse()?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let link = Rc::new(AgentLink::new(outbound_tx));
        let console = ServerConsole::attach(Rc::clone(&link) as Rc<dyn EventChannel>);

        Ok(Session {
            socket,
            agent_addr,
            link,
            console,
            outbound_rx,
        })
    }

    pub fn console(&self) -> &ServerConsole {
        &self.console
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.agent_addr).await?;
        Ok(())
    }

    fn handle_packet(&self, packet: Packet) {
        match packet {
            Packet::Welcome => {
                info!("agent acknowledged connection");
                self.link.set_connected(true);
            }
            Packet::Event { event, payload } => {
                debug!("{} event: {}", event, payload);
                self.link.dispatch_event(event, &payload);
            }
            Packet::Goodbye { reason } => {
                warn!("agent closed the session: {}", reason);
                self.link.set_connected(false);
            }
            _ => warn!("unexpected packet from agent"),
        }
    }

    fn request_and_log(&self, action: PowerAction) {
        if self.console.request_power(action) {
            info!("requested {}", action);
        } else {
            info!("{} not available while {}", action, self.console.state());
        }
    }

    fn handle_command_line(&self, line: &str) {
        match line.trim() {
            "" => {}
            "start" => self.request_and_log(PowerAction::Start),
            "restart" => self.request_and_log(PowerAction::Restart),
            "kill" => self.request_and_log(PowerAction::Kill),
            // The escalating stop control: stop first, kill on repeat.
            "x" | "stop" => match self.console.request_stop_or_kill() {
                Some(action) => info!("requested {}", action),
                None => info!("nothing to stop while {}", self.console.state()),
            },
            "status" => {
                let usage = self.console.usage();
                info!(
                    "state={} cpu={:.2}% memory={} disk={} uptime={}",
                    self.console.state(),
                    usage.cpu_percent,
                    bytes_to_human(usage.memory_bytes),
                    bytes_to_human(usage.disk_bytes),
                    self.console.uptime_display().as_deref().unwrap_or("-"),
                );
            }
            other => info!("unknown command {:?} (start/stop/restart/kill/status/quit)", other),
        }
    }

    /// Runs the session until stdin closes or the operator quits.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.send_packet(&Packet::Hello {
            client_version: PROTOCOL_VERSION,
        })
        .await?;

        let mut outbound_rx =
            std::mem::replace(&mut self.outbound_rx, mpsc::unbounded_channel().1);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut hello_retry = interval(Duration::from_secs(3));
        let mut buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) if addr == self.agent_addr => {
                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => self.handle_packet(packet),
                                Err(_) => warn!("dropping malformed datagram from {}", addr),
                            }
                        }
                        Ok((_, addr)) => debug!("ignoring datagram from unexpected peer {}", addr),
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                maybe_packet = outbound_rx.recv() => {
                    if let Some(packet) = maybe_packet {
                        self.send_packet(&packet).await?;
                    }
                },

                _ = hello_retry.tick() => {
                    if !self.link.connected() {
                        debug!("not connected yet; re-sending hello");
                        self.send_packet(&Packet::Hello {
                            client_version: PROTOCOL_VERSION,
                        })
                        .await?;
                    }
                },

                line = lines.next_line() => {
                    match line? {
                        Some(line) if line.trim() == "quit" => break,
                        Some(line) => self.handle_command_line(&line),
                        None => break,
                    }
                },
            }
        }

        let _ = self
            .send_packet(&Packet::Goodbye {
                reason: "client closed".to_string(),
            })
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PowerState;

    fn link() -> (Rc<AgentLink>, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Rc::new(AgentLink::new(tx)), rx)
    }

    #[test]
    fn test_send_queues_a_command_packet() {
        let (link, mut rx) = link();
        link.send(Request::SetState, Some("start"));

        match rx.try_recv().unwrap() {
            Packet::Command { request, payload } => {
                assert_eq!(request, Request::SetState);
                assert_eq!(payload.as_deref(), Some("start"));
            }
            _ => panic!("Wrong packet type queued"),
        }
    }

    #[test]
    fn test_connected_flips_publish_synthetic_events() {
        let (link, _rx) = link();
        let connects = Rc::new(Cell::new(0u32));
        let disconnects = Rc::new(Cell::new(0u32));

        {
            let connects = Rc::clone(&connects);
            link.subscribe(Event::Connected, Box::new(move |_| {
                connects.set(connects.get() + 1)
            }));
        }
        {
            let disconnects = Rc::clone(&disconnects);
            link.subscribe(Event::Disconnected, Box::new(move |_| {
                disconnects.set(disconnects.get() + 1)
            }));
        }

        link.set_connected(true);
        link.set_connected(true); // duplicate Welcome, no extra event
        link.set_connected(false);
        link.set_connected(true);

        assert!(link.connected());
        assert_eq!(connects.get(), 2);
        assert_eq!(disconnects.get(), 1);
    }

    #[tokio::test]
    async fn test_console_over_link_drives_state_from_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = Rc::new(AgentLink::new(tx));
        let console = ServerConsole::attach(Rc::clone(&link) as Rc<dyn EventChannel>);

        link.set_connected(true);
        // Connecting requests the periodic stats push.
        match rx.try_recv().unwrap() {
            Packet::Command { request, .. } => assert_eq!(request, Request::SendStats),
            _ => panic!("Wrong packet type queued"),
        }

        link.dispatch_event(Event::Status, "running");
        assert_eq!(console.state(), PowerState::Running);

        link.dispatch_event(
            Event::Stats,
            r#"{"memory_bytes":1024,"cpu_absolute":5.0,"disk_bytes":2048,"uptime":61000}"#,
        );
        assert_eq!(console.usage().memory_bytes, 1024);
        assert_eq!(console.uptime_display().as_deref(), Some("0:01:01"));
    }
}
