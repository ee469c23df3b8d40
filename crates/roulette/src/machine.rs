use crate::angle::{Angle, FULL_TURN, Precise};
use crate::layout::{Layout, LayoutError, PartLabel, PartRef};
use crate::speed::SpeedProfile;
use crate::worker::{Progress, RotationWorker, RunId, TickSource};
use async_channel::{Receiver, Sender};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use thiserror::Error;

/// Where the pointer sits, in degrees from the top of the wheel.
pub const POINTER: f64 = 270.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WheelError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("Cannot continue a paused spin and schedule an auto-stop at the same time")]
    ContinueWithAutoStop,
    #[error("No part lies under the pointer at {angle}°")]
    NoLandedPart { angle: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Landed {
    pub index: usize,
    pub label: PartLabel,
}

impl From<PartRef<'_>> for Landed {
    fn from(part: PartRef<'_>) -> Self {
        Self {
            index: part.index(),
            label: part.label().clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RotationState {
    #[default]
    Idle,
    Running {
        angle: Precise,
        speed: SpeedProfile,
    },
    Paused {
        angle: Precise,
        speed: SpeedProfile,
    },
    Stopped {
        landed: Option<Landed>,
        angle: Precise,
    },
}

impl RotationState {
    pub fn is_rotating(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn angle(&self) -> Option<Precise> {
        match self {
            Self::Idle => None,
            Self::Running { angle, .. }
            | Self::Paused { angle, .. }
            | Self::Stopped { angle, .. } => Some(*angle),
        }
    }

    pub fn landed(&self) -> Option<&Landed> {
        match self {
            Self::Stopped { landed, .. } => landed.as_ref(),
            _ => None,
        }
    }
}

/// How a spin should begin. `Continue` resumes a paused spin and has no
/// auto-stop; when nothing is paused it starts fresh at `speed`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spin {
    Fresh {
        speed: Option<SpeedProfile>,
        auto_stop: Option<Duration>,
    },
    Continue {
        speed: Option<SpeedProfile>,
    },
}

impl Default for Spin {
    fn default() -> Self {
        Self::Fresh {
            speed: None,
            auto_stop: None,
        }
    }
}

impl Spin {
    pub fn with_speed(speed: impl Into<SpeedProfile>) -> Self {
        Self::Fresh {
            speed: Some(speed.into()),
            auto_stop: None,
        }
    }

    pub fn auto_stop(self, after: Duration) -> Self {
        match self {
            Self::Fresh { speed, .. } => Self::Fresh {
                speed,
                auto_stop: Some(after),
            },
            Self::Continue { speed } => Self::Continue { speed },
        }
    }

    pub fn from_flags(
        speed: Option<SpeedProfile>,
        resume: bool,
        auto_stop: Option<Duration>,
    ) -> Result<Self, WheelError> {
        match (resume, auto_stop) {
            (true, Some(_)) => Err(WheelError::ContinueWithAutoStop),
            (true, None) => Ok(Self::Continue { speed }),
            (false, auto_stop) => Ok(Self::Fresh { speed, auto_stop }),
        }
    }
}

/// Finds the part under the pointer after the wheel turned `accumulated`
/// degrees. The first match in index order wins.
pub fn landed_index(layout: &Layout, accumulated: Precise) -> Option<usize> {
    let offset = accumulated.reduced(FULL_TURN);

    layout.ranges().iter().position(|range| {
        let start = range.start + offset;
        let end = range.end + offset;
        let lap = (start.value() / FULL_TURN).floor();
        let mut reference = Precise::new(POINTER + FULL_TURN * lap);
        // the pointer may sit in the next lap of a part that straddles one
        if reference < start {
            reference = reference + FULL_TURN;
        }
        start <= reference && reference <= end
    })
}

pub fn part_at(layout: &Layout, degrees: f64) -> Option<usize> {
    let reduced = Precise::new(degrees).reduced(FULL_TURN).value();
    layout.ranges().iter().position(|r| r.contains(reduced))
}

/// Owns the rotation of one wheel. Every transition is published to
/// subscribers.
pub struct Roulette<S> {
    layout: Layout,
    worker: RotationWorker<S>,
    state: RotationState,
    rng: StdRng,
    subscribers: Mutex<Vec<Sender<RotationState>>>,
}

impl<S: TickSource> Roulette<S> {
    pub fn new(layout: Layout, source: S) -> Self {
        Self::with_rng(layout, RotationWorker::new(source), StdRng::from_os_rng())
    }

    pub fn with_rng(layout: Layout, worker: RotationWorker<S>, rng: StdRng) -> Self {
        Self {
            layout,
            worker,
            state: RotationState::Idle,
            rng,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    pub fn is_rotating(&self) -> bool {
        self.state.is_rotating()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn worker(&self) -> &RotationWorker<S> {
        &self.worker
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.worker.active_run()
    }

    // a spin in progress keeps its angle and lands against the new layout
    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    pub fn set_tick_interval(&mut self, interval: Duration) {
        self.worker.set_interval(interval);
    }

    pub fn subscribe(&self) -> Receiver<RotationState> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn start(&mut self, spin: Spin) {
        if self.is_rotating() {
            return;
        }

        let paused = match (spin, &self.state) {
            (Spin::Continue { .. }, RotationState::Paused { angle, speed }) => {
                Some((*angle, *speed))
            }
            _ => None,
        };

        let (angle, speed) = match (paused, spin) {
            (Some((angle, speed)), _) => {
                self.worker.begin(speed, angle, None);
                (angle, speed)
            }
            (None, Spin::Fresh { speed, auto_stop }) => self.begin_fresh(speed, auto_stop),
            (None, Spin::Continue { speed }) => self.begin_fresh(speed, None),
        };

        self.transition(RotationState::Running { angle, speed });
    }

    fn begin_fresh(
        &mut self,
        speed: Option<SpeedProfile>,
        auto_stop: Option<Duration>,
    ) -> (Precise, SpeedProfile) {
        let speed = speed.unwrap_or_else(|| SpeedProfile::random(&mut self.rng));
        self.worker.begin(speed, Precise::ZERO, auto_stop);
        (Precise::ZERO, speed)
    }

    pub fn pause(&mut self) {
        if let RotationState::Running { angle, speed } = self.state {
            self.worker.pause();
            self.transition(RotationState::Paused { angle, speed });
        }
    }

    pub fn restart(&mut self) {
        if matches!(self.state, RotationState::Paused { .. }) {
            self.start(Spin::Continue { speed: None });
        }
    }

    pub fn stop(&mut self) -> Result<(), WheelError> {
        match self.state {
            RotationState::Running { angle, .. } => {
                self.worker.stop();
                self.land(angle)
            }
            _ => Ok(()),
        }
    }

    pub fn stop_at(&mut self, at: Angle) -> Result<(), WheelError> {
        self.worker.stop();

        let angle = Precise::new(at.degrees()).reduced(FULL_TURN);
        let landed = part_at(&self.layout, angle.value())
            .and_then(|index| self.layout.get(index))
            .map(Landed::from);
        self.finish(landed, angle)
    }

    pub fn tick(&mut self, run: RunId) -> Result<(), WheelError> {
        if !self.is_rotating() {
            return Ok(());
        }

        match self.worker.advance(run) {
            Some(Progress::Tick { angle, speed }) => {
                self.transition(RotationState::Running { angle, speed });
                Ok(())
            }
            Some(Progress::End { angle, speed }) => {
                self.transition(RotationState::Running { angle, speed });
                self.worker.stop();
                self.land(angle)
            }
            None => Ok(()),
        }
    }

    fn land(&mut self, angle: Precise) -> Result<(), WheelError> {
        let landed = landed_index(&self.layout, angle)
            .and_then(|index| self.layout.get(index))
            .map(Landed::from);
        self.finish(landed, angle)
    }

    fn finish(&mut self, landed: Option<Landed>, angle: Precise) -> Result<(), WheelError> {
        let result = match &landed {
            Some(l) => {
                log::info!("Landed on '{}' at {}°", l.label, angle);
                Ok(())
            }
            None => {
                log::error!("No part under the pointer at {}°, layout is broken", angle);
                Err(WheelError::NoLandedPart {
                    angle: angle.value(),
                })
            }
        };
        self.transition(RotationState::Stopped { landed, angle });
        result
    }

    fn transition(&mut self, next: RotationState) {
        self.state = next;
        self.subscribers
            .lock()
            .retain(|tx| tx.try_send(self.state.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Part;
    use crate::speed::SpeedPreset;
    use crate::worker::ManualTicks;

    fn abc() -> Layout {
        Layout::new(vec![
            Part::degrees("A", 90.0),
            Part::degrees("B", 180.0),
            Part::degrees("C", 90.0),
        ])
        .unwrap()
    }

    fn roulette() -> Roulette<ManualTicks> {
        Roulette::with_rng(
            abc(),
            RotationWorker::new(ManualTicks::default()),
            StdRng::seed_from_u64(1),
        )
    }

    fn tick(r: &mut Roulette<ManualTicks>) -> Result<(), WheelError> {
        let run = r.worker().source().pending().expect("no tick scheduled");
        r.tick(run)
    }

    fn label_at(layout: &Layout, degrees: f64) -> Option<String> {
        landed_index(layout, Precise::new(degrees))
            .and_then(|i| layout.get(i))
            .map(|p| p.label().to_string())
    }

    #[test]
    fn test_two_laps_land_on_b() {
        assert_eq!(label_at(&abc(), 720.0).as_deref(), Some("B"));
    }

    #[test]
    fn test_detection_ignores_whole_laps() {
        let layout = abc();
        for d in [0.0, 15.5, 100.0, 180.0, 200.0, 269.0, 359.9] {
            let base = landed_index(&layout, Precise::new(d));
            assert!(base.is_some(), "nothing landed at {d}");
            for k in 1..5 {
                let laps = Precise::new(d + FULL_TURN * k as f64);
                assert_eq!(landed_index(&layout, laps), base, "{d} + {k} laps");
            }
        }
    }

    #[test]
    fn test_detection_follows_rotation() {
        let layout = abc();
        // rotating by d moves the part at 270 - d under the pointer
        assert_eq!(label_at(&layout, 10.0).as_deref(), Some("B"));
        assert_eq!(label_at(&layout, 200.0).as_deref(), Some("A"));
        assert_eq!(label_at(&layout, 300.0).as_deref(), Some("C"));
    }

    #[test]
    fn test_wide_part_straddling_a_lap() {
        let layout =
            Layout::new(vec![Part::degrees("wide", 300.0), Part::flex("rest", 1.0)]).unwrap();
        // shifted range [340, 640] covers the pointer at 630
        assert_eq!(label_at(&layout, 340.0).as_deref(), Some("wide"));
        assert_eq!(label_at(&layout, 320.0 + 720.0).as_deref(), Some("rest"));
    }

    #[test]
    fn test_stop_at_uses_unrotated_ranges() {
        let mut r = roulette();
        r.stop_at(Angle::from_degrees(359.0, true)).unwrap();
        assert_eq!(r.state().landed().map(|l| l.label.as_str()), Some("C"));
        assert_eq!(r.state().angle(), Some(Precise::new(359.0)));

        r.stop_at(Angle::from_degrees(360.0 + 45.0, true)).unwrap();
        assert_eq!(r.state().landed().map(|l| l.index), Some(0));
    }

    #[test]
    fn test_stop_at_interrupts_a_spin() {
        let mut r = roulette();
        r.start(Spin::with_speed(SpeedPreset::Fast));
        tick(&mut r).unwrap();
        r.stop_at(Angle::from_degrees(100.0, true)).unwrap();

        assert!(!r.is_rotating());
        assert!(r.worker().source().pending().is_none());
        assert_eq!(r.state().landed().map(|l| l.index), Some(1));
    }

    #[test]
    fn test_spin_runs_to_a_landed_part() {
        let mut r = roulette();
        let rx = r.subscribe();
        r.start(Spin::with_speed(SpeedProfile::new(10.0, 0.9)));

        while r.is_rotating() {
            tick(&mut r).unwrap();
        }

        let mut angles = Vec::new();
        let mut last = RotationState::Idle;
        while let Ok(state) = rx.try_recv() {
            if let RotationState::Running { angle, .. } = state {
                angles.push(angle);
            }
            last = state;
        }
        assert!(angles.windows(2).all(|w| w[0] <= w[1]));
        let RotationState::Stopped { landed, angle } = last else {
            panic!("expected a stopped state");
        };
        assert_eq!(angle, *angles.last().unwrap());
        assert_eq!(landed.map(|l| l.index), landed_index(r.layout(), angle));
    }

    #[test]
    fn test_auto_stop() {
        let mut r = roulette();
        r.start(
            Spin::with_speed(SpeedProfile::new(10.0, 0.9999)).auto_stop(Duration::from_millis(100)),
        );

        for _ in 0..4 {
            tick(&mut r).unwrap();
        }
        assert!(r.is_rotating());

        tick(&mut r).unwrap();
        assert!(matches!(
            r.state(),
            RotationState::Stopped { landed: Some(_), .. }
        ));
        assert!(r.active_run().is_none());
    }

    #[test]
    fn test_pause_and_continue_resume_exactly() {
        let mut r = roulette();
        r.start(Spin::with_speed(SpeedProfile::new(10.0, 0.9)));
        tick(&mut r).unwrap();
        tick(&mut r).unwrap();
        r.pause();

        let RotationState::Paused { angle, speed } = *r.state() else {
            panic!("expected paused");
        };
        assert_eq!(angle, Precise::new(19.0));
        assert!(r.worker().source().pending().is_none());

        r.start(Spin::Continue {
            speed: Some(SpeedPreset::Fast.profile()),
        });
        assert_eq!(*r.state(), RotationState::Running { angle, speed });
        tick(&mut r).unwrap();
        assert_eq!(
            r.state().angle(),
            Some(angle + speed.velocity())
        );
    }

    #[test]
    fn test_restart_only_from_paused() {
        let mut r = roulette();
        r.restart();
        assert_eq!(*r.state(), RotationState::Idle);

        r.start(Spin::with_speed(SpeedPreset::Slow));
        tick(&mut r).unwrap();
        r.pause();
        let paused_at = r.state().angle();
        r.restart();

        assert!(r.is_rotating());
        assert_eq!(r.state().angle(), paused_at);
    }

    #[test]
    fn test_stale_tick_after_pause_is_ignored() {
        let mut r = roulette();
        r.start(Spin::with_speed(SpeedPreset::Normal));
        let run = r.active_run().unwrap();
        r.pause();
        let paused = r.state().clone();

        r.tick(run).unwrap();
        assert_eq!(*r.state(), paused);

        r.restart();
        r.tick(run).unwrap();
        assert_eq!(r.state().angle(), paused.angle());
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let mut r = roulette();
        r.start(Spin::with_speed(SpeedPreset::Slow));
        let run = r.active_run();
        r.start(Spin::with_speed(SpeedPreset::Fast));

        assert_eq!(r.active_run(), run);
        assert!(matches!(
            r.state(),
            RotationState::Running { speed, .. } if *speed == SpeedPreset::Slow.profile()
        ));
    }

    #[test]
    fn test_continue_without_pause_starts_fresh() {
        let mut r = roulette();
        r.stop_at(Angle::from_degrees(10.0, true)).unwrap();
        r.start(Spin::Continue {
            speed: Some(SpeedPreset::Fast.profile()),
        });

        assert_eq!(
            *r.state(),
            RotationState::Running {
                angle: Precise::ZERO,
                speed: SpeedPreset::Fast.profile(),
            }
        );
        assert_eq!(r.worker().current(), Some((Precise::ZERO, SpeedPreset::Fast.profile())));
    }

    #[test]
    fn test_idle_commands_are_noops() {
        let mut r = roulette();
        let rx = r.subscribe();
        r.pause();
        r.restart();
        r.stop().unwrap();

        assert_eq!(*r.state(), RotationState::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_manual_stop_lands() {
        let mut r = roulette();
        r.start(Spin::with_speed(SpeedProfile::new(100.0, 0.99)));
        tick(&mut r).unwrap();
        r.stop().unwrap();

        // 100 degrees of rotation puts B (90..270 shifted to 190..370) under 270
        assert_eq!(r.state().landed().map(|l| l.label.as_str()), Some("B"));
        assert!(r.active_run().is_none());
    }

    #[test]
    fn test_each_transition_notifies_once() {
        let mut r = roulette();
        let rx = r.subscribe();
        r.start(Spin::with_speed(SpeedPreset::Normal));
        tick(&mut r).unwrap();
        r.pause();
        r.restart();
        r.stop().unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| match s {
                RotationState::Idle => "idle",
                RotationState::Running { .. } => "running",
                RotationState::Paused { .. } => "paused",
                RotationState::Stopped { .. } => "stopped",
            })
            .collect();
        assert_eq!(kinds, ["running", "running", "paused", "running", "stopped"]);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut r = roulette();
        drop(r.subscribe());
        r.start(Spin::default());
        assert!(r.subscribers.lock().is_empty());
    }

    #[test]
    fn test_zero_width_part_wins_only_exact_ties() {
        let layout = Layout::new(vec![
            Part::flex("empty", 0.0),
            Part::degrees("only", 360.0),
        ])
        .unwrap();

        assert_eq!(landed_index(&layout, Precise::new(270.0)), Some(0));
        assert_eq!(landed_index(&layout, Precise::new(271.0)), Some(1));
        assert_eq!(part_at(&layout, 0.0), Some(0));
        assert_eq!(part_at(&layout, 1.0), Some(1));
    }

    #[test]
    fn test_trailing_zero_width_part_loses_to_earlier_part() {
        let layout = Layout::new(vec![
            Part::degrees("only", 360.0),
            Part::flex("empty", 0.0),
        ])
        .unwrap();
        let mut r = Roulette::with_rng(
            layout,
            RotationWorker::new(ManualTicks::default()),
            StdRng::seed_from_u64(3),
        );
        r.start(Spin::default());
        tick(&mut r).unwrap();
        r.stop().unwrap();

        assert_eq!(r.state().landed().map(|l| l.index), Some(0));
    }

    #[test]
    fn test_unplaceable_angle_is_reported() {
        let mut r = roulette();
        let err = r.stop_at(Angle::from_degrees(f64::NAN, true)).unwrap_err();

        assert!(matches!(err, WheelError::NoLandedPart { .. }));
        assert!(matches!(
            r.state(),
            RotationState::Stopped { landed: None, .. }
        ));
    }

    #[test]
    fn test_flags() {
        assert_eq!(
            Spin::from_flags(None, true, Some(Duration::from_secs(1))),
            Err(WheelError::ContinueWithAutoStop)
        );
        let fast = Some(SpeedPreset::Fast.profile());
        assert_eq!(
            Spin::from_flags(fast, true, None),
            Ok(Spin::Continue { speed: fast })
        );
        assert_eq!(Spin::from_flags(None, false, None), Ok(Spin::default()));
    }
}
