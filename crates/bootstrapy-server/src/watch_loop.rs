//! Watch loop: source changes in, rebuilds and reloads out.
//!
//! Rebuilds never overlap. Changes that arrive while a rebuild is running
//! are coalesced into exactly one follow-up rebuild.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::watcher::WatchEvent;
use crate::websocket::{LiveReloadHub, ReloadMessage};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Something that can rebuild the site. Runs on a blocking thread.
pub trait Rebuild: Send + Sync + 'static {
    fn rebuild(&self) -> Result<(), BoxError>;
}

impl<F, E> Rebuild for F
where
    F: Fn() -> Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn rebuild(&self) -> Result<(), BoxError> {
        self().map_err(Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running {
        pending: bool,
    },
}

/// What to do with a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnChange {
    StartNow,
    Deferred,
}

/// What to do once a rebuild has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFinished {
    RunAgain,
    Idle,
}

/// Decides when rebuilds start. Holds no I/O so it can be tested alone.
#[derive(Debug, Default)]
pub struct RebuildScheduler {
    phase: Phase,
}

impl RebuildScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn on_change(&mut self) -> OnChange {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Running { pending: false };
                OnChange::StartNow
            }
            Phase::Running { .. } => {
                self.phase = Phase::Running { pending: true };
                OnChange::Deferred
            }
        }
    }

    pub fn on_finished(&mut self) -> OnFinished {
        match self.phase {
            Phase::Running { pending: true } => {
                self.phase = Phase::Running { pending: false };
                OnFinished::RunAgain
            }
            Phase::Running { pending: false } | Phase::Idle => {
                self.phase = Phase::Idle;
                OnFinished::Idle
            }
        }
    }
}

/// Counters returned when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Rebuilds started, successful or not
    pub rebuilds: usize,
    pub failures: usize,
}

pub struct WatchLoop<R> {
    rebuild: Arc<R>,
    hub: LiveReloadHub,
    debounce: Duration,
}

impl<R: Rebuild> WatchLoop<R> {
    pub fn new(rebuild: R, hub: LiveReloadHub) -> Self {
        Self {
            rebuild: Arc::new(rebuild),
            hub,
            debounce: Duration::from_millis(100),
        }
    }

    /// Length of the window that absorbs a burst of changes. Zero disables it.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Process events until the channel closes, then finish any in-flight
    /// or pending rebuild.
    pub async fn run(self, mut events: mpsc::Receiver<WatchEvent>) -> WatchStats {
        let mut scheduler = RebuildScheduler::new();
        let mut stats = WatchStats::default();
        let mut closed = false;

        while !closed {
            let Some(event) = events.recv().await else {
                break;
            };
            log_event(&event);
            closed = self.debounce(&mut events).await;

            if scheduler.on_change() == OnChange::Deferred {
                continue;
            }

            loop {
                let start = Instant::now();
                let mut task = self.spawn();

                let result = loop {
                    tokio::select! {
                        result = &mut task => break result,
                        event = events.recv(), if !closed => match event {
                            Some(event) => {
                                log_event(&event);
                                scheduler.on_change();
                            }
                            None => closed = true,
                        },
                    }
                };

                self.finish(result, start, &mut stats);

                if scheduler.on_finished() == OnFinished::Idle {
                    break;
                }
                tracing::debug!("changes arrived during rebuild, running again");
            }
        }

        tracing::debug!("watch loop stopped: {:?}", stats);
        stats
    }

    /// Absorb events for one window. Returns whether the channel closed.
    async fn debounce(&self, events: &mut mpsc::Receiver<WatchEvent>) -> bool {
        if self.debounce.is_zero() {
            return false;
        }

        let deadline = tokio::time::Instant::now() + self.debounce;
        loop {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Some(event)) => log_event(&event),
                Ok(None) => return true,
                Err(_) => return false,
            }
        }
    }

    fn spawn(&self) -> JoinHandle<Result<(), BoxError>> {
        let rebuild = Arc::clone(&self.rebuild);
        tokio::task::spawn_blocking(move || rebuild.rebuild())
    }

    fn finish(
        &self,
        result: Result<Result<(), BoxError>, tokio::task::JoinError>,
        start: Instant,
        stats: &mut WatchStats,
    ) {
        stats.rebuilds += 1;

        match result {
            Ok(Ok(())) => {
                tracing::info!(
                    "Rebuilt in {}ms, reloading {} client(s)",
                    start.elapsed().as_millis(),
                    self.hub.subscriber_count()
                );
                self.hub.send(ReloadMessage::Reload);
            }
            Ok(Err(e)) => {
                stats.failures += 1;
                tracing::error!("Rebuild failed: {}", e);
            }
            Err(e) => {
                stats.failures += 1;
                tracing::error!("Rebuild task aborted: {}", e);
            }
        }
    }
}

fn log_event(event: &WatchEvent) {
    match event {
        WatchEvent::Created(p) => tracing::info!("File {} was added", p.display()),
        WatchEvent::Modified(p) => tracing::info!("File {} was changed", p.display()),
        WatchEvent::Removed(p) => tracing::info!("File {} was deleted", p.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn changed(path: &str) -> WatchEvent {
        WatchEvent::Modified(PathBuf::from(path))
    }

    fn counting(
        delay: Duration,
    ) -> (Arc<AtomicUsize>, impl Fn() -> Result<(), BoxError> + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let rebuild = move || -> Result<(), BoxError> {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(delay);
            Ok(())
        };
        (count, rebuild)
    }

    #[test]
    fn scheduler_coalesces_changes() {
        let mut scheduler = RebuildScheduler::new();

        assert_eq!(scheduler.on_change(), OnChange::StartNow);
        assert_eq!(scheduler.on_change(), OnChange::Deferred);
        assert_eq!(scheduler.on_change(), OnChange::Deferred);
        assert_eq!(scheduler.phase(), Phase::Running { pending: true });

        assert_eq!(scheduler.on_finished(), OnFinished::RunAgain);
        assert_eq!(scheduler.phase(), Phase::Running { pending: false });
        assert_eq!(scheduler.on_finished(), OnFinished::Idle);
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn rebuilds_and_reloads() {
        let hub = LiveReloadHub::new();
        let mut browser = hub.subscribe();
        let (count, rebuild) = counting(Duration::ZERO);
        let (tx, rx) = mpsc::channel(8);

        tx.send(changed("src/index.html")).await.unwrap();
        drop(tx);

        let stats = WatchLoop::new(rebuild, hub)
            .with_debounce(Duration::ZERO)
            .run(rx)
            .await;

        assert_eq!(stats, WatchStats { rebuilds: 1, failures: 0 });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(browser.try_recv().unwrap(), ReloadMessage::Reload);
    }

    #[tokio::test]
    async fn failed_rebuild_does_not_reload() {
        let hub = LiveReloadHub::new();
        let mut browser = hub.subscribe();
        let (tx, rx) = mpsc::channel(8);

        tx.send(changed("src/assets/scss/main.scss")).await.unwrap();
        drop(tx);

        let stats = WatchLoop::new(|| Err::<(), _>("undefined variable"), hub)
            .with_debounce(Duration::ZERO)
            .run(rx)
            .await;

        assert_eq!(stats, WatchStats { rebuilds: 1, failures: 1 });
        assert!(browser.try_recv().is_err());
    }

    #[tokio::test]
    async fn changes_during_rebuild_run_once_more() {
        let hub = LiveReloadHub::new();
        let (count, rebuild) = counting(Duration::from_millis(200));
        let (tx, rx) = mpsc::channel(8);

        let handle = tokio::spawn(
            WatchLoop::new(rebuild, hub)
                .with_debounce(Duration::ZERO)
                .run(rx),
        );

        tx.send(changed("src/a.html")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(changed("src/b.html")).await.unwrap();
        tx.send(changed("src/c.html")).await.unwrap();
        tx.send(changed("src/d.html")).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap();

        assert_eq!(stats.rebuilds, 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn debounce_absorbs_bursts() {
        let hub = LiveReloadHub::new();
        let (count, rebuild) = counting(Duration::ZERO);
        let (tx, rx) = mpsc::channel(8);

        for path in ["src/a.js", "src/b.js", "src/c.js"] {
            tx.send(changed(path)).await.unwrap();
        }
        drop(tx);

        let stats = WatchLoop::new(rebuild, hub)
            .with_debounce(Duration::from_millis(50))
            .run(rx)
            .await;

        assert_eq!(stats.rebuilds, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
