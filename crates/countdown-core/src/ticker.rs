use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

/// A repeating tick source for live views. Ticks arrive on a channel so
/// the receiving side processes them one at a time; a slow pass delays
/// the next one instead of overlapping it. `stop` is idempotent and a
/// stopped ticker can be replaced by starting a new one.
#[derive(Debug)]
pub struct Ticker {
    stop: StopSignal,
    ticks: Receiver<Instant>,
    thread: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Ticker {
    pub fn start(interval: Duration) -> Self {
        let stop = StopSignal(Arc::new(AtomicBool::new(false)));
        let (tx, rx) = channel();

        let flag = stop.clone();
        let thread = std::thread::spawn(move || run_loop(interval, &flag, &tx));

        debug!(interval_ms = interval.as_millis() as u64, "ticker started");
        Self {
            stop,
            ticks: rx,
            thread: Some(thread),
        }
    }

    /// Blocks until the next tick; `None` once the ticker is stopped.
    pub fn wait(&self) -> Option<Instant> {
        self.ticks.recv().ok()
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_raised()
    }

    pub fn stop(&mut self) {
        self.stop.raise();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            debug!("ticker stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(interval: Duration, stop: &StopSignal, tx: &Sender<Instant>) {
    // first tick fires immediately so a fresh view renders without delay
    loop {
        if stop.is_raised() || tx.send(Instant::now()).is_err() {
            return;
        }

        // sleep in short slices so stop() is not held up by a long interval
        let deadline = Instant::now() + interval;
        while Instant::now() < deadline {
            if stop.is_raised() {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            std::thread::sleep(remaining.min(Duration::from_millis(25)));
        }
    }
}
