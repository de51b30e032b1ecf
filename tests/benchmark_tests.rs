//! Performance benchmarks for hot paths in the synchronization core

use client::channel::Dispatcher;
use client::power::PowerStateMachine;
use client::stats::StatsTracker;
use shared::{Event, Packet, PowerState};
use std::time::Instant;

/// Benchmarks status message processing through the state machine
#[test]
fn benchmark_status_processing() {
    let mut machine = PowerStateMachine::new();
    let statuses = ["offline", "starting", "running", "stopping"];

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        machine.on_status(statuses[i % statuses.len()]);
    }

    let duration = start.elapsed();
    println!(
        "Status processing: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(machine.current(), PowerState::Stopping);
    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks telemetry JSON decoding
#[test]
fn benchmark_stats_decoding() {
    let mut tracker = StatsTracker::new();
    let payload =
        r#"{"memory_bytes":104857600,"cpu_absolute":12.5,"disk_bytes":52428800,"uptime":125000}"#;

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        tracker.on_message(payload);
    }

    let duration = start.elapsed();
    println!(
        "Stats decoding: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(tracker.snapshot().memory_bytes, 104857600);
    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks event dispatch through the listener registry
#[test]
fn benchmark_event_dispatch() {
    let dispatcher = Dispatcher::new();
    for _ in 0..4 {
        dispatcher.add(Event::Status, Box::new(|_| {}));
    }

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        dispatcher.dispatch(Event::Status, "running");
    }

    let duration = start.elapsed();
    println!(
        "Event dispatch: {} iterations × 4 listeners in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks wire packet serialization performance
#[test]
fn benchmark_packet_serialization() {
    use bincode::{deserialize, serialize};

    let packet = Packet::Event {
        event: Event::Stats,
        payload:
            r#"{"memory_bytes":104857600,"cpu_absolute":12.5,"disk_bytes":52428800,"uptime":125000}"#
                .to_string(),
    };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        let _: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Packet serialization: {} round-trips in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}
