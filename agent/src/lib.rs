//! # Server Agent Library
//!
//! A simulated per-server backend agent for the panel client. It stands in
//! for the daemon that supervises one game-server process: it answers
//! power commands against a modeled process lifecycle and pushes `status`
//! and `stats` events to every subscribed panel client.
//!
//! ## Core Responsibilities
//!
//! ### Process Lifecycle Simulation
//! The agent models the boot and shutdown timing of a real server process:
//! `start` enters `starting` and reaches `running` after a boot delay,
//! `stop` enters `stopping` and reaches `offline` after a stop delay,
//! `kill` drops to `offline` immediately, and `restart` queues a boot
//! behind a graceful stop. Every reported transition is broadcast on the
//! `status` stream.
//!
//! ### Telemetry Push
//! Clients that send a `send stats` command receive a JSON usage payload
//! (memory, CPU, disk, uptime in milliseconds) once immediately and then
//! on a fixed interval. The resource profile is jittered to look like a
//! live process.
//!
//! ### Subscriber Management
//! Clients announce themselves with a hello packet and are evicted after a
//! silence timeout, so a crashed client cannot accumulate stale push
//! targets.
//!
//! ## Module Organization
//!
//! ### Sim Module (`sim`)
//! The deterministic process model: state transitions are driven by an
//! explicit clock so tests control time.
//!
//! ### Network Module (`network`)
//! The UDP loop: datagram decode, command handling, event broadcast and
//! the periodic stats/eviction intervals.

pub mod network;
pub mod sim;
