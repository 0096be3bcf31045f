//! Tick source and tick-denominated waits.
//!
//! A [`TickSource`] fires at a fixed interval and invokes the handler
//! registered for each timer identity. Handlers are synchronous, so they
//! cannot await I/O; the only handler the nodes install is [`TickCounter`],
//! which bumps a shared counter. Every wait in the application computes a
//! [`TimeoutDeadline`] from the counter's current value and suspends until
//! the counter reaches it.
//!
//! # Example
//!
//! ```
//! use gatekeep_hardware::timer::{TimerConfig, spawn_tick_counter};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> gatekeep_hardware::Result<()> {
//! let (ticks, _source) = spawn_tick_counter(&TimerConfig::default())?;
//! let start = ticks.now();
//! ticks.wait(5).await?;
//! assert!(ticks.now().as_u64() >= start.as_u64() + 5);
//! # Ok(())
//! # }
//! ```

use gatekeep_core::{TickCount, TimeoutDeadline, constants::DEFAULT_TICK_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace};

use crate::error::{HardwareError, Result};

/// Tick source parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Interval between two ticks in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl TimerConfig {
    pub fn with_tick_interval_ms(mut self, interval_ms: u64) -> Self {
        self.tick_interval_ms = interval_ms;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Identity of a hardware timer. Each identity accepts one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u8);

impl TimerId {
    pub const TIMER0: TimerId = TimerId(0);
    pub const TIMER1: TimerId = TimerId(1);
    pub const TIMER2: TimerId = TimerId(2);
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer{}", self.0)
    }
}

/// Callback invoked on every tick.
///
/// # Contract
///
/// `on_tick` runs on the tick task at a fixed interval. It must return
/// promptly and must not touch the link or the credential store. The
/// signature is synchronous so it cannot await.
pub trait TickHandler: Send + Sync + 'static {
    fn on_tick(&self);
}

/// Periodic tick generator.
pub struct TickSource {
    interval: Duration,
    handlers: BTreeMap<TimerId, Arc<dyn TickHandler>>,
}

impl TickSource {
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            interval: config.tick_interval(),
            handlers: BTreeMap::new(),
        }
    }

    /// Register the handler for `timer`.
    ///
    /// # Errors
    /// Returns `HardwareError::AlreadyRegistered` if `timer` already has one.
    pub fn register(&mut self, timer: TimerId, handler: Arc<dyn TickHandler>) -> Result<()> {
        if self.handlers.contains_key(&timer) {
            return Err(HardwareError::already_registered(timer.to_string()));
        }
        debug!(%timer, "Tick handler registered");
        self.handlers.insert(timer, handler);
        Ok(())
    }

    /// Start firing. The returned guard stops the source when dropped.
    pub fn start(self) -> TickSourceGuard {
        let TickSource { interval, handlers } = self;
        info!(
            interval_ms = interval.as_millis() as u64,
            handlers = handlers.len(),
            "Tick source started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for handler in handlers.values() {
                    handler.on_tick();
                }
            }
        });

        TickSourceGuard { task }
    }
}

/// Keeps a started [`TickSource`] running.
#[derive(Debug)]
pub struct TickSourceGuard {
    task: JoinHandle<()>,
}

impl Drop for TickSourceGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Tick handler that increments a shared counter.
#[derive(Debug)]
pub struct TickCounter {
    count: watch::Sender<TickCount>,
}

impl TickCounter {
    /// Create the counter and a reader for it.
    pub fn new() -> (Arc<Self>, Ticks) {
        let (count, rx) = watch::channel(TickCount::ZERO);
        (Arc::new(Self { count }), Ticks { rx })
    }
}

impl TickHandler for TickCounter {
    fn on_tick(&self) {
        self.count.send_modify(|count| {
            *count = count.next();
            trace!(count = %count, "Tick");
        });
    }
}

/// Read-only view of the tick counter.
#[derive(Debug, Clone)]
pub struct Ticks {
    rx: watch::Receiver<TickCount>,
}

impl Ticks {
    /// Current counter value.
    pub fn now(&self) -> TickCount {
        *self.rx.borrow()
    }

    /// Deadline `ticks` ticks from now.
    pub fn deadline(&self, ticks: u32) -> TimeoutDeadline {
        TimeoutDeadline::after(self.now(), ticks)
    }

    /// Suspend until the counter reaches `deadline`.
    ///
    /// # Errors
    /// Returns `HardwareError::Disconnected` if the tick source is gone.
    pub async fn wait_until(&self, deadline: TimeoutDeadline) -> Result<()> {
        let mut rx = self.rx.clone();
        rx.wait_for(|now| deadline.is_reached(*now))
            .await
            .map_err(|_| HardwareError::disconnected("tick source"))?;
        Ok(())
    }

    /// Suspend for `ticks` ticks.
    pub async fn wait(&self, ticks: u32) -> Result<()> {
        self.wait_until(self.deadline(ticks)).await
    }
}

/// Start a tick source on [`TimerId::TIMER0`] with a [`TickCounter`] installed.
pub fn spawn_tick_counter(config: &TimerConfig) -> Result<(Ticks, TickSourceGuard)> {
    let (counter, ticks) = TickCounter::new();
    let mut source = TickSource::new(config);
    source.register(TimerId::TIMER0, counter)?;
    Ok((ticks, source.start()))
}
