//! Agent network layer: datagram handling, event broadcasting, stats push.

use crate::sim::ServerSim;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Event, Packet, PowerAction, Request, PROTOCOL_VERSION};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::interval;

const SUBSCRIBER_TIMEOUT: Duration = Duration::from_secs(30);
const SIM_TICK: Duration = Duration::from_millis(100);
pub const STATS_PUSH_INTERVAL: Duration = Duration::from_secs(1);

/// One connected panel client.
struct Subscriber {
    /// Last time we received any packet from this client
    last_seen: Instant,
    /// Whether the client asked for the periodic stats push
    wants_stats: bool,
}

/// Per-server agent: answers power commands against the simulated process
/// and pushes `status`/`stats` events to every subscribed client.
pub struct Agent {
    socket: UdpSocket,
    sim: ServerSim,
    subscribers: HashMap<SocketAddr, Subscriber>,
}

impl Agent {
    pub async fn bind(
        addr: &str,
        boot_delay: Duration,
        stop_delay: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Agent listening on {}", socket.local_addr()?);

        Ok(Agent {
            socket,
            sim: ServerSim::new(boot_delay, stop_delay),
            subscribers: HashMap::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        match serialize(packet) {
            Ok(data) => {
                if let Err(e) = self.socket.send_to(&data, addr).await {
                    error!("Failed to send packet to {}: {}", addr, e);
                }
            }
            Err(e) => error!("Failed to serialize packet: {}", e),
        }
    }

    async fn broadcast_status(&self) {
        let payload = self.sim.state().wire_name().to_string();
        for addr in self.subscribers.keys() {
            self.send_packet(
                &Packet::Event {
                    event: Event::Status,
                    payload: payload.clone(),
                },
                *addr,
            )
            .await;
        }
    }

    async fn push_stats(&mut self, now: Instant) {
        let targets: Vec<SocketAddr> = self
            .subscribers
            .iter()
            .filter(|(_, sub)| sub.wants_stats)
            .map(|(addr, _)| *addr)
            .collect();
        if targets.is_empty() {
            return;
        }

        let stats = self.sim.sample_stats(now);
        let payload = match serde_json::to_string(&stats) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode stats payload: {}", e);
                return;
            }
        };

        for addr in targets {
            self.send_packet(
                &Packet::Event {
                    event: Event::Stats,
                    payload: payload.clone(),
                },
                addr,
            )
            .await;
        }
    }

    fn evict_stale(&mut self, now: Instant) {
        let stale: Vec<SocketAddr> = self
            .subscribers
            .iter()
            .filter(|(_, sub)| now.duration_since(sub.last_seen) > SUBSCRIBER_TIMEOUT)
            .map(|(addr, _)| *addr)
            .collect();

        for addr in stale {
            info!("Client {} timed out", addr);
            self.subscribers.remove(&addr);
        }
    }

    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr, now: Instant) {
        match packet {
            Packet::Hello { client_version } => {
                if client_version != PROTOCOL_VERSION {
                    warn!(
                        "Client {} speaks protocol {}, expected {}",
                        addr, client_version, PROTOCOL_VERSION
                    );
                    self.send_packet(
                        &Packet::Goodbye {
                            reason: "unsupported protocol version".to_string(),
                        },
                        addr,
                    )
                    .await;
                    return;
                }

                info!("Client {} connected", addr);
                self.subscribers.insert(
                    addr,
                    Subscriber {
                        last_seen: now,
                        wants_stats: false,
                    },
                );
                self.send_packet(&Packet::Welcome, addr).await;
                // New subscribers learn the current state right away.
                self.send_packet(
                    &Packet::Event {
                        event: Event::Status,
                        payload: self.sim.state().wire_name().to_string(),
                    },
                    addr,
                )
                .await;
            }

            Packet::Command { request, payload } => {
                match self.subscribers.get_mut(&addr) {
                    Some(sub) => sub.last_seen = now,
                    None => {
                        debug!("ignoring command from unknown peer {}", addr);
                        return;
                    }
                }

                match request {
                    Request::SetState => {
                        match payload.as_deref().and_then(PowerAction::from_wire) {
                            Some(action) => {
                                info!("Client {} requested {}", addr, action);
                                if self.sim.apply_power(action, now) {
                                    self.broadcast_status().await;
                                }
                            }
                            None => warn!(
                                "dropping set state command with invalid payload {:?}",
                                payload
                            ),
                        }
                    }
                    Request::SendStats => {
                        if let Some(sub) = self.subscribers.get_mut(&addr) {
                            sub.wants_stats = true;
                        }
                        // Answer immediately; the interval keeps pushing.
                        let stats = self.sim.sample_stats(now);
                        match serde_json::to_string(&stats) {
                            Ok(payload) => {
                                self.send_packet(
                                    &Packet::Event {
                                        event: Event::Stats,
                                        payload,
                                    },
                                    addr,
                                )
                                .await;
                            }
                            Err(e) => error!("Failed to encode stats payload: {}", e),
                        }
                    }
                }
            }

            Packet::Goodbye { .. } => {
                info!("Client {} disconnected", addr);
                self.subscribers.remove(&addr);
            }

            _ => warn!("unexpected packet from {}", addr),
        }
    }

    /// Runs the agent loop: inbound datagrams, simulated process
    /// transitions, the periodic stats push and subscriber eviction.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut sim_tick = interval(SIM_TICK);
        let mut stats_tick = interval(STATS_PUSH_INTERVAL);
        let mut sweep_tick = interval(Duration::from_secs(5));
        let mut buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, addr)) => {
                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => self.handle_packet(packet, addr, Instant::now()).await,
                                Err(_) => warn!("Failed to deserialize packet from {}", addr),
                            }
                        }
                        Err(e) => {
                            error!("Error receiving packet: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                },

                _ = sim_tick.tick() => {
                    if self.sim.tick(Instant::now()).is_some() {
                        self.broadcast_status().await;
                    }
                },

                _ = stats_tick.tick() => {
                    self.push_stats(Instant::now()).await;
                },

                _ = sweep_tick.tick() => {
                    self.evict_stale(Instant::now());
                },
            }
        }
    }
}
