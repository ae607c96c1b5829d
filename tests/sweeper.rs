use keylimit::LimiterRegistry;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

const SWEEP: Duration = Duration::from_secs(60);
const IDLE: Duration = Duration::from_secs(150);

fn registry() -> LimiterRegistry {
    LimiterRegistry::new(SWEEP, 5.0, 10, IDLE).expect("valid registry")
}

#[tokio::test(start_paused = true)]
async fn idle_key_is_evicted_by_background_sweep() {
    let registry = registry();
    while !registry.limit("rotating-client") {}
    assert!(registry.limit("rotating-client"));

    // Sweeps run every 60s; the one at 180s is the first to see > 150s idle.
    tokio::time::sleep(Duration::from_secs(170)).await;
    assert!(registry.contains("rotating-client"));
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(!registry.contains("rotating-client"));

    let granted = (0..11).filter(|_| !registry.limit("rotating-client")).count();
    assert_eq!(granted, 10, "evicted key starts over with a full burst");
}

#[tokio::test(start_paused = true)]
async fn recently_used_key_survives_sweep() {
    let registry = registry();
    registry.limit("active");
    registry.limit("idle");

    tokio::time::sleep(Duration::from_secs(100)).await;
    registry.limit("active");

    tokio::time::sleep(Duration::from_secs(81)).await;
    assert!(registry.contains("active"));
    assert!(!registry.contains("idle"));
    assert_eq!(registry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_background_eviction() {
    let registry = registry();
    registry.limit("k");

    registry.shutdown().await;
    assert!(!registry.is_sweeping());

    tokio::time::sleep(IDLE * 3).await;
    assert!(registry.contains("k"), "no sweeper left to evict");
    assert_eq!(registry.sweep(), 1);
}

#[derive(Clone)]
struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedGuard;
    fn make_writer(&'a self) -> Self::Writer {
        SharedGuard(self.0.clone())
    }
}

struct SharedGuard(Arc<Mutex<Vec<u8>>>);
impl std::io::Write for SharedGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_registry_stops_sweeper() {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(BoxMakeWriter::new(SharedWriter(buffer.clone())))
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(true)
        .without_time()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let registry = registry();
    registry.limit("k");
    tokio::time::sleep(Duration::from_millis(1)).await;
    drop(registry);
    tokio::time::sleep(Duration::from_millis(1)).await;

    let logs = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("sweeper started"), "logs: {logs}");
    assert!(logs.contains("admitted new key"), "logs: {logs}");
    assert!(logs.contains("sweeper stopped"), "sweeper should exit once the registry is dropped");
}
