//! # Panel Client Library
//!
//! This library implements the live server state synchronization core of a
//! game-server hosting panel: the logic that turns one persistent event
//! stream per server into an authoritative lifecycle state machine, a
//! periodically refreshed resource-usage snapshot, and an escalating
//! stop/kill control policy.
//!
//! ## Architecture Overview
//!
//! Everything is event-driven and single-threaded. Messages delivered by
//! the channel and user-initiated commands run synchronously inside their
//! callbacks; no component blocks or suspends, and no locking is needed
//! because each server's state has exactly one owner.
//!
//! ### Authoritative Lifecycle State
//! The server's lifecycle state is mutated only by inbound `status`
//! messages, never optimistically by the UI. It is the single source of
//! truth for which power controls are enabled. A transport disconnect
//! keeps the last known value rather than resetting, so a transient drop
//! does not flicker the controls.
//!
//! ### Graceful Telemetry Degradation
//! Usage telemetry is advisory and high-frequency. A payload that fails to
//! decode is dropped silently and the previous snapshot stays in place;
//! there is no fatal error condition anywhere in the core.
//!
//! ### Stop Escalation
//! A single stop control covers both the graceful and the forceful path:
//! the first press requests `stop`, a repeated press before the stop takes
//! effect requests `kill`. The policy re-derives itself from every
//! observed lifecycle value so it can never stay armed once the server is
//! offline.
//!
//! ## Module Organization
//!
//! ### Channel Module (`channel`)
//! The transport contract and listener bookkeeping:
//! - The [`channel::EventChannel`] trait the core consumes
//! - RAII [`channel::Subscription`] guards for scoped listener teardown
//! - The [`channel::Dispatcher`] registry shared by implementations
//!
//! ### Power Module (`power`)
//! The lifecycle state machine:
//! - Status message decoding with the installing/transferring overlay
//! - Power command preconditions and silent no-op refusal
//!
//! ### Stats Module (`stats`)
//! Telemetry decoding and display:
//! - JSON usage messages decoded into wholesale-replaced snapshots
//! - Uptime conversion from milliseconds and human formatting
//!
//! ### Escalation Module (`escalation`)
//! The stop-to-kill policy described above.
//!
//! ### Console Module (`console`)
//! The per-server facade that owns one instance of each component, wires
//! them to a channel, and exposes the state and command surface consumed
//! by presentation views.
//!
//! ### Network Module (`network`)
//! A UDP-backed channel adapter plus the interactive session loop used by
//! the `client` binary and the integration tests.

pub mod channel;
pub mod console;
pub mod escalation;
pub mod network;
pub mod power;
pub mod stats;
