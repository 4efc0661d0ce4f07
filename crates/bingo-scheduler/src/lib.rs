//! Fixed-interval draw scheduler for the bingo hall.
//!
//! One [`DrawScheduler`] runs per active game, as its own Tokio task.
//! Each iteration it asks a [`DrawSource`] (the room) for the next draw,
//! then sleeps for the draw interval. It stops when:
//!
//! - the source reports the pool is exhausted → [`SchedulerExit::Exhausted`]
//! - the source refuses to draw (game over, room gone) → [`SchedulerExit::Stopped`]
//! - its [`CancellationToken`] fires (someone won) → [`SchedulerExit::Cancelled`]
//!
//! Cancellation is observed at the top of every iteration, while waiting
//! on the source, and during the sleep, so a win stops drawing without
//! waiting out the interval.
//!
//! # Integration
//!
//! The scheduler never touches game state itself. The room implements
//! [`DrawSource`] by sending a command to its own actor, so every draw is
//! serialized with joins and claims:
//!
//! ```ignore
//! let handle = DrawScheduler::new(config, room_source).spawn();
//! // on a win:
//! handle.cancel();
//! ```

use std::future::Future;
use std::time::Duration;

use bingo_protocol::Draw;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the draw scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pause between two draws.
    pub interval: Duration,
}

impl SchedulerConfig {
    /// Interval used by a real game.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    /// Shortest interval accepted. Anything lower is clamped.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`DrawScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_secs_f64() * 1000.0,
                min_ms = Self::MIN_INTERVAL.as_secs_f64() * 1000.0,
                "draw interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

// ---------------------------------------------------------------------------
// Draw source
// ---------------------------------------------------------------------------

/// What the source did when asked for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStep {
    /// A number was drawn, recorded, and published.
    Drawn(Draw),
    /// Nothing left to draw. The source has already ended the game.
    Exhausted,
    /// The source will not draw any more (game over or shut down).
    Stopped,
}

/// Something the scheduler can pull draws from.
///
/// Implemented by the room. The source is responsible for recording and
/// publishing each draw atomically with respect to other room operations.
pub trait DrawSource: Send + Sync + 'static {
    /// Draws, records, and publishes one number.
    fn next_draw(&self) -> impl Future<Output = DrawStep> + Send;
}

// ---------------------------------------------------------------------------
// Exit reason
// ---------------------------------------------------------------------------

/// Why a scheduler task ended. None of these is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    /// The pool ran dry.
    Exhausted { draws: u64 },
    /// The token was cancelled, normally because someone won.
    Cancelled { draws: u64 },
    /// The source refused to draw or went away.
    Stopped { draws: u64 },
}

impl SchedulerExit {
    /// Number of draws made by this scheduler before it ended.
    pub fn draws(&self) -> u64 {
        match *self {
            Self::Exhausted { draws } | Self::Cancelled { draws } | Self::Stopped { draws } => {
                draws
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The draw loop for a single game.
pub struct DrawScheduler<S: DrawSource> {
    config: SchedulerConfig,
    source: S,
    token: CancellationToken,
    draws: u64,
    late_wakeups: u64,
}

impl<S: DrawSource> DrawScheduler<S> {
    pub fn new(config: SchedulerConfig, source: S) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_secs_f64() * 1000.0,
            "draw scheduler created"
        );
        Self {
            config,
            source,
            token: CancellationToken::new(),
            draws: 0,
            late_wakeups: 0,
        }
    }

    /// A clone of the token that stops this scheduler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawns the loop on the current Tokio runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let token = self.token.clone();
        let task = tokio::spawn(self.run());
        SchedulerHandle { token, task }
    }

    /// Runs the loop to completion on the current task.
    ///
    /// The first draw happens immediately; the interval separates draws.
    pub async fn run(mut self) -> SchedulerExit {
        let interval = self.config.interval;

        let exit = loop {
            if self.token.is_cancelled() {
                break SchedulerExit::Cancelled { draws: self.draws };
            }

            let step = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    break SchedulerExit::Cancelled { draws: self.draws };
                }
                step = self.source.next_draw() => step,
            };

            match step {
                DrawStep::Drawn(draw) => {
                    self.draws += 1;
                    trace!(%draw, draws = self.draws, "draw made");
                }
                DrawStep::Exhausted => break SchedulerExit::Exhausted { draws: self.draws },
                DrawStep::Stopped => break SchedulerExit::Stopped { draws: self.draws },
            }

            let deadline = Instant::now() + interval;
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    break SchedulerExit::Cancelled { draws: self.draws };
                }
                _ = time::sleep_until(deadline) => {}
            }

            // >10% late = the runtime is starved.
            let late_by = Instant::now().saturating_duration_since(deadline);
            if late_by > interval / 10 {
                self.late_wakeups += 1;
                warn!(
                    draws = self.draws,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    late_wakeups = self.late_wakeups,
                    "draw scheduler woke up late"
                );
            }
        };

        match exit {
            SchedulerExit::Exhausted { draws } => {
                info!(draws, "draw scheduler finished: pool exhausted");
            }
            SchedulerExit::Cancelled { draws } => {
                debug!(draws, "draw scheduler cancelled");
            }
            SchedulerExit::Stopped { draws } => {
                debug!(draws, "draw scheduler stopped by source");
            }
        }
        exit
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner's handle to a spawned scheduler task.
#[derive(Debug)]
pub struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<SchedulerExit>,
}

impl SchedulerHandle {
    /// Asks the scheduler to stop.
    ///
    /// Safe to call any number of times, including after the task ended.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            debug!("draw scheduler cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the task has returned.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the task to end. `None` if it panicked or was aborted.
    pub async fn join(self) -> Option<SchedulerExit> {
        self.task.await.ok()
    }
}
