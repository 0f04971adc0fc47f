//! Async ticker around a [`TimerController`].
//!
//! One background task drives `tick()` at a fixed period while the countdown
//! runs. Every intent that moves the controller's generation wakes the task,
//! which drops its interval and arms a fresh one, so there is never more than
//! one live interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use super::controller::{Intent, Snapshot, TimerController};
use crate::events::Event;
use crate::storage::KvStore;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

const EVENT_CAPACITY: usize = 64;

/// Ticker periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub tick: Duration,
    /// Pause between a completion and the automate-mode auto-start.
    pub settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            settle: DEFAULT_SETTLE_DELAY,
        }
    }
}

type Shared<S> = Arc<Mutex<TimerController<S>>>;

/// Owns the controller and its ticker task.
pub struct TimerService<S: KvStore + Send + 'static> {
    controller: Shared<S>,
    generation_tx: watch::Sender<u64>,
    events_tx: broadcast::Sender<Event>,
    ticker: JoinHandle<()>,
}

impl<S: KvStore + Send + 'static> TimerService<S> {
    /// Spawn the ticker on the current tokio runtime.
    pub fn spawn(controller: TimerController<S>, timing: Timing) -> Self {
        let (generation_tx, generation_rx) = watch::channel(controller.generation());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let controller = Arc::new(Mutex::new(controller));
        let ticker = tokio::spawn(run_ticker(
            controller.clone(),
            generation_rx,
            events_tx.clone(),
            timing,
        ));
        Self {
            controller,
            generation_tx,
            events_tx,
            ticker,
        }
    }

    /// Receive every event produced by intents and by the ticker.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events_tx.subscribe()
    }

    pub async fn dispatch(&self, intent: Intent) -> Option<Event> {
        let mut controller = self.controller.lock().await;
        let event = controller.apply(intent);
        self.publish(controller.generation(), event.as_ref());
        event
    }

    /// Run `f` against the controller under the lock, then wake the ticker
    /// if anything it watches changed.
    pub async fn with_controller<R>(&self, f: impl FnOnce(&mut TimerController<S>) -> R) -> R {
        let mut controller = self.controller.lock().await;
        let out = f(&mut controller);
        self.publish(controller.generation(), None);
        out
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.controller.lock().await.snapshot()
    }

    /// Stop the ticker and hand the controller back.
    pub async fn shutdown(self) -> Option<TimerController<S>> {
        let Self {
            controller,
            generation_tx,
            events_tx,
            ticker,
        } = self;
        drop(generation_tx);
        drop(events_tx);
        let _ = ticker.await;
        Arc::try_unwrap(controller).ok().map(Mutex::into_inner)
    }

    fn publish(&self, generation: u64, event: Option<&Event>) {
        self.generation_tx.send_if_modified(|current| {
            if *current == generation {
                false
            } else {
                *current = generation;
                true
            }
        });
        if let Some(event) = event {
            let _ = self.events_tx.send(event.clone());
        }
    }
}

async fn run_ticker<S: KvStore + Send + 'static>(
    controller: Shared<S>,
    mut generation_rx: watch::Receiver<u64>,
    events_tx: broadcast::Sender<Event>,
    timing: Timing,
) {
    loop {
        generation_rx.borrow_and_update();
        let (running, mut armed) = {
            let ctl = controller.lock().await;
            (ctl.is_running(), ctl.generation())
        };

        if !running {
            if generation_rx.changed().await.is_err() {
                break;
            }
            continue;
        }

        trace!(period = ?timing.tick, "arming ticker");
        let mut interval = time::interval_at(Instant::now() + timing.tick, timing.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let (event, rearm) = {
                        let mut ctl = controller.lock().await;
                        let before = ctl.generation();
                        let event = ctl.tick();
                        armed = ctl.generation();
                        (event, armed != before)
                    };
                    if let Some(event) = event {
                        let auto_start = event.wants_auto_start();
                        let _ = events_tx.send(event);
                        if auto_start {
                            time::sleep(timing.settle).await;
                            if let Some(started) = controller.lock().await.settle() {
                                let _ = events_tx.send(started);
                            }
                        }
                    }
                    if rearm {
                        break;
                    }
                }
                changed = generation_rx.changed() => {
                    if changed.is_err() {
                        debug!("ticker stopped");
                        return;
                    }
                    // The watched value can lag behind generations the ticker
                    // produced itself. Catching up to those keeps the period.
                    if *generation_rx.borrow_and_update() == armed {
                        continue;
                    }
                    break;
                }
            }
        }
    }
    debug!("ticker stopped");
}
