//! The status bar's control loop
//!
//! Each iteration waits briefly for a notification, runs a notification cycle
//! when one arrived, then runs a full refresh once the tick deadline passes.

use anyhow::Result;
use log::{debug, error, info, trace, warn};
use sbar_core::constants::{DEFAULT_TICK_INTERVAL, DEFAULT_WAIT_TIMEOUT};
use sbar_core::{next_dirty_set, FieldProvider, RefreshSource, StatusAssembler, Template};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::publisher::Publisher;
use crate::watcher::NotificationWatcher;

/// Pause between the two samples of a one-shot render, so usage figures
/// have something to compare against
const ONE_SHOT_SAMPLE_DELAY: Duration = Duration::from_millis(250);

/// Owns everything a running status bar needs
pub struct StatusRunner<P, B> {
    template: Template,
    assembler: StatusAssembler,
    provider: P,
    publisher: B,
    watcher: Option<NotificationWatcher>,
    tick_interval: Duration,
    wait_timeout: Duration,
}

impl<P: FieldProvider, B: Publisher> StatusRunner<P, B> {
    pub fn new(template: Template, provider: P, publisher: B) -> Self {
        Self {
            template,
            assembler: StatusAssembler::new(),
            provider,
            publisher,
            watcher: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn with_watcher(mut self, watcher: NotificationWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn with_timing(mut self, tick_interval: Duration, wait_timeout: Duration) -> Self {
        self.tick_interval = tick_interval;
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn publisher(&self) -> &B {
        &self.publisher
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn assemble(&mut self, source: &RefreshSource) -> String {
        let start = Instant::now();
        let dirty = next_dirty_set(source);
        let status = self
            .assembler
            .assemble(&self.template, dirty, &mut self.provider);

        let stats = self.assembler.last_stats();
        trace!("Cycle ({}) took {:?}: {:?}", source, start.elapsed(), stats);
        if stats.evicted > 0 {
            debug!("Evicted {} cached values of removed entities", stats.evicted);
        }
        status
    }

    /// Run one cycle and publish its result
    pub fn run_cycle(&mut self, source: &RefreshSource) -> String {
        let status = self.assemble(source);
        if let Err(e) = self.publisher.publish(&status) {
            error!("Failed to publish status: {:#}", e);
        }
        status
    }

    /// Render a single full status without publishing it
    pub async fn render_once(&mut self) -> String {
        self.assemble(&RefreshSource::Tick);
        tokio::time::sleep(ONE_SHOT_SAMPLE_DELAY).await;
        self.assemble(&RefreshSource::Tick)
    }

    /// Run until `shutdown` is set.
    ///
    /// The first full refresh happens immediately.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        info!(
            "Status loop started (tick {:?}, wait {:?})",
            self.tick_interval, self.wait_timeout
        );
        let mut next_tick = Instant::now();

        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested, leaving status loop");
                return Ok(());
            }

            if let Some(payload) = self.wait_for_notification().await {
                self.run_cycle(&RefreshSource::Notification(payload));
            }

            let now = Instant::now();
            if now >= next_tick {
                self.run_cycle(&RefreshSource::Tick);
                next_tick += self.tick_interval;
                if next_tick <= now {
                    // Fell behind; skip the missed ticks
                    warn!("Status loop fell behind by {:?}", now - next_tick);
                    next_tick = now + self.tick_interval;
                }
            }
        }
    }

    /// Payload of the next notification, `None` on timeout
    async fn wait_for_notification(&mut self) -> Option<String> {
        let Some(watcher) = self.watcher.as_mut() else {
            tokio::time::sleep(self.wait_timeout).await;
            return None;
        };
        if !watcher.wait(self.wait_timeout).await {
            return None;
        }
        match watcher.read_payload() {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::send_notification;
    use anyhow::anyhow;
    use sbar_core::{compile, Entity, Scope, Segment};
    use sbar_types::{Field, FieldSet};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Provider whose values tests change between cycles, even while running
    #[derive(Default)]
    struct ValueProvider {
        values: Arc<Mutex<HashMap<Field, String>>>,
        reads: usize,
    }

    impl ValueProvider {
        fn set(&self, field: Field, value: &str) {
            self.values.lock().unwrap().insert(field, value.to_string());
        }
    }

    impl FieldProvider for ValueProvider {
        fn get(&mut self, field: Field, _entity: Option<&Entity>) -> anyhow::Result<String> {
            self.reads += 1;
            self.values
                .lock()
                .unwrap()
                .get(&field)
                .cloned()
                .ok_or_else(|| anyhow!("no {}", field))
        }

        fn discover(
            &mut self,
            _composite: Field,
            _parent: Option<&Entity>,
        ) -> anyhow::Result<Vec<Entity>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        lines: Vec<String>,
    }

    impl Publisher for RecordingPublisher {
        fn publish(&mut self, status: &str) -> anyhow::Result<()> {
            self.lines.push(status.to_string());
            Ok(())
        }
    }

    struct FailingPublisher;

    impl Publisher for FailingPublisher {
        fn publish(&mut self, _status: &str) -> anyhow::Result<()> {
            Err(anyhow!("display is gone"))
        }
    }

    fn template(format: &str) -> Template {
        compile(Scope::Status, format, |c| Scope::Status.lookup(c).map(Segment::Leaf))
    }

    fn provider(cpu: &str, memory: &str) -> ValueProvider {
        let provider = ValueProvider::default();
        provider.set(Field::Cpu, cpu);
        provider.set(Field::Memory, memory);
        provider
    }

    #[test]
    fn test_tick_then_notification() {
        let mut runner = StatusRunner::new(
            template("CPU:/c Mem:/m"),
            provider("12", "40"),
            RecordingPublisher::default(),
        );
        assert_eq!(runner.run_cycle(&RefreshSource::Tick), "CPU:12 Mem:40");

        runner.provider().set(Field::Cpu, "99");
        runner.provider().set(Field::Memory, "41");
        let payload = FieldSet::from(Field::Memory).to_string();
        let status = runner.run_cycle(&RefreshSource::Notification(payload));
        assert_eq!(status, "CPU:12 Mem:41");
        assert_eq!(runner.publisher().lines, vec!["CPU:12 Mem:40", "CPU:12 Mem:41"]);
    }

    #[test]
    fn test_garbage_notification_changes_nothing() {
        let mut runner = StatusRunner::new(
            template("/c"),
            provider("1", "2"),
            RecordingPublisher::default(),
        );
        runner.run_cycle(&RefreshSource::Tick);
        let reads = runner.provider().reads;
        let status = runner.run_cycle(&RefreshSource::Notification("garbage".to_string()));
        assert_eq!(status, "1");
        assert_eq!(runner.provider().reads, reads);
    }

    #[test]
    fn test_publish_failure_is_not_fatal() {
        let mut runner = StatusRunner::new(template("/c"), provider("7", "0"), FailingPublisher);
        assert_eq!(runner.run_cycle(&RefreshSource::Tick), "7");
        assert_eq!(runner.run_cycle(&RefreshSource::Tick), "7");
    }

    #[tokio::test]
    async fn test_run_stops_when_shutdown_already_set() {
        let mut runner = StatusRunner::new(
            template("/c"),
            provider("1", "2"),
            RecordingPublisher::default(),
        );
        let shutdown = Arc::new(AtomicBool::new(true));
        runner.run(shutdown).await.unwrap();
        assert!(runner.publisher().lines.is_empty());
    }

    #[tokio::test]
    async fn test_run_ticks_until_shutdown() {
        let mut runner = StatusRunner::new(
            template("/c"),
            provider("3", "4"),
            RecordingPublisher::default(),
        )
        .with_timing(Duration::from_millis(10), Duration::from_millis(5));

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
        });

        runner.run(shutdown).await.unwrap();
        let lines = &runner.publisher().lines;
        assert!(lines.len() >= 2, "only {} cycles ran", lines.len());
        assert!(lines.iter().all(|line| line == "3"));
        assert!(runner.provider().reads >= 2);
    }

    #[tokio::test]
    async fn test_run_reacts_to_notifications() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("status_bar");
        let watcher = NotificationWatcher::new(&path).unwrap();
        let mut runner = StatusRunner::new(
            template("/c /m"),
            provider("5", "6"),
            RecordingPublisher::default(),
        )
        .with_watcher(watcher)
        // Ticks far apart so only the notification can refresh memory
        .with_timing(Duration::from_secs(3600), Duration::from_millis(5));

        let values = runner.provider().values.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let notify_path = path.clone();
        tokio::spawn(async move {
            // Let the first tick render "5 6" before anything changes
            tokio::time::sleep(Duration::from_millis(50)).await;
            {
                let mut values = values.lock().unwrap();
                values.insert(Field::Cpu, "50".to_string());
                values.insert(Field::Memory, "60".to_string());
            }
            send_notification(&notify_path, Field::Memory.into()).unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            flag.store(true, Ordering::SeqCst);
        });

        runner.run(shutdown).await.unwrap();
        let lines = &runner.publisher().lines;
        assert_eq!(lines.first().map(String::as_str), Some("5 6"));
        assert!(lines.contains(&"5 60".to_string()), "got {:?}", lines);
    }

    #[tokio::test]
    async fn test_render_once_does_not_publish() {
        let mut runner = StatusRunner::new(
            template("cpu /c"),
            provider("9", "0"),
            RecordingPublisher::default(),
        );
        assert_eq!(runner.render_once().await, "cpu 9");
        assert!(runner.publisher().lines.is_empty());
    }
}
