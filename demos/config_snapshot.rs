//! Shared configuration example
//!
//! Several worker threads read feature flags from a shared map while an admin
//! thread updates them, takes a JSON snapshot, and later restores it. A bad
//! payload is rejected without disturbing what the workers see.
//!
//! Run with `RUST_LOG=lockmap=trace cargo run --example config_snapshot` to see
//! the library's tracing events.

use lockmap::{ConcurrentMap, MetricsCollector};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("lockmap Shared Configuration Example");
    println!("====================================");

    let flags: Arc<ConcurrentMap<String, bool>> = Arc::new(ConcurrentMap::new());
    flags.set("dark_mode".to_string(), false);
    flags.set("beta_search".to_string(), true);

    println!("\n1. Snapshot:");
    let snapshot = flags.to_json()?;
    println!("   {}", snapshot);

    println!("\n2. Workers reading while flags change:");
    let workers: Vec<_> = (0..3)
        .map(|id| {
            let flags = Arc::clone(&flags);
            thread::spawn(move || {
                let mut enabled = 0;
                for _ in 0..100 {
                    if flags.get("dark_mode").unwrap_or(false) {
                        enabled += 1;
                    }
                    thread::sleep(Duration::from_micros(50));
                }
                println!("   Worker {} saw dark_mode enabled {} times", id, enabled);
            })
        })
        .collect();

    flags.set("dark_mode".to_string(), true);
    flags.delete("beta_search");

    for worker in workers {
        worker.join().expect("worker panicked");
    }
    println!("   Current flags: {}", flags);

    println!("\n3. Rejecting a bad payload:");
    match flags.load_json(r#"{"dark_mode": "yes"}"#) {
        Ok(()) => println!("   unexpectedly accepted"),
        Err(e) => println!("   rejected: {}", e),
    }
    println!("   Flags unchanged: {}", flags);

    println!("\n4. Restoring the snapshot:");
    flags.load_json(&snapshot)?;
    println!("   Restored flags: {}", flags);

    let metrics = flags.metrics();
    println!("\n5. Metrics:");
    println!("   reads: {}, hit rate: {:.1}%", metrics.reads, metrics.hit_rate());
    println!("   writes: {}, removals: {}", metrics.writes, metrics.removals);
    println!(
        "   decode failures: {}, replacements: {}",
        metrics.decode_failures, metrics.replacements
    );
    println!("   contention: {:.1}%", metrics.contention_rate());

    Ok(())
}
