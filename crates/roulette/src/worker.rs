use crate::angle::Precise;
use crate::speed::SpeedProfile;
use derive_more::Display;
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

/// Identifies one run of a [`RotationWorker`]. Ticks carry the id of the run
/// they were scheduled for, so ticks of a cancelled run are recognisably stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("run#{_0}")]
pub struct RunId(u64);

/// A cancellable periodic callback source.
pub trait TickSource {
    fn schedule(&mut self, run: RunId, interval: Duration);
    fn cancel(&mut self);
}

/// A tick source for hosts that pump ticks themselves (a frame loop, a test).
#[derive(Debug, Default)]
pub struct ManualTicks {
    pending: Option<RunId>,
    interval: Option<Duration>,
}

impl ManualTicks {
    pub fn pending(&self) -> Option<RunId> {
        self.pending
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl TickSource for ManualTicks {
    fn schedule(&mut self, run: RunId, interval: Duration) {
        self.pending = Some(run);
        self.interval = Some(interval);
    }

    fn cancel(&mut self) {
        self.pending = None;
        self.interval = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Tick { angle: Precise, speed: SpeedProfile },
    End { angle: Precise, speed: SpeedProfile },
}

#[derive(Debug, Clone, Copy)]
struct Run {
    id: RunId,
    angle: Precise,
    speed: SpeedProfile,
    elapsed: Duration,
    auto_stop: Option<Duration>,
    scheduled: bool,
}

pub struct RotationWorker<S> {
    source: S,
    interval: Duration,
    next_id: u64,
    run: Option<Run>,
}

impl<S: TickSource> RotationWorker<S> {
    pub fn new(source: S) -> Self {
        Self::with_interval(source, DEFAULT_TICK_INTERVAL)
    }

    pub fn with_interval(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            next_id: 0,
            run: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Continuation is done by passing the last delivered angle as `start`.
    pub fn begin(
        &mut self,
        speed: SpeedProfile,
        start: Precise,
        auto_stop: Option<Duration>,
    ) -> RunId {
        self.source.cancel();

        self.next_id += 1;
        let id = RunId(self.next_id);
        self.run = Some(Run {
            id,
            angle: start,
            speed,
            elapsed: Duration::ZERO,
            auto_stop,
            scheduled: true,
        });
        self.source.schedule(id, self.interval);

        log::debug!("Began {} at {}° ({:?})", id, start, speed);
        id
    }

    pub fn advance(&mut self, run: RunId) -> Option<Progress> {
        let interval = self.interval;
        let current = self
            .run
            .as_mut()
            .filter(|r| r.id == run && r.scheduled)?;

        current.angle = current.angle + current.speed.velocity();
        current.speed = current.speed.decayed();
        current.elapsed += interval;

        let timed_out = current
            .auto_stop
            .is_some_and(|limit| current.elapsed >= limit);

        if current.speed.is_exhausted() || timed_out {
            current.scheduled = false;
            let (angle, speed) = (current.angle, current.speed);
            self.source.cancel();
            log::debug!("{} ended at {}°", run, angle);
            Some(Progress::End { angle, speed })
        } else {
            Some(Progress::Tick {
                angle: current.angle,
                speed: current.speed,
            })
        }
    }

    pub fn pause(&mut self) {
        self.source.cancel();
        if let Some(run) = self.run.as_mut() {
            run.scheduled = false;
        }
    }

    pub fn stop(&mut self) {
        self.source.cancel();
        self.run = None;
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.run.filter(|r| r.scheduled).map(|r| r.id)
    }

    pub fn current(&self) -> Option<(Precise, SpeedProfile)> {
        self.run.map(|r| (r.angle, r.speed))
    }
}
