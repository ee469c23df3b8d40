use async_channel::Receiver;
use roulette::{FULL_TURN, RotationState};

/// Turns the wheel's state stream into log lines. Stands in for a renderer:
/// running updates are only reported once per lap.
#[derive(Debug, Default)]
pub struct Presenter {
    lap: Option<u64>,
}

impl Presenter {
    pub fn describe(&mut self, state: &RotationState) -> Option<String> {
        match state {
            RotationState::Idle => None,
            RotationState::Running { angle, speed } => {
                let lap = (angle.value() / FULL_TURN) as u64 + 1;
                (self.lap.replace(lap) != Some(lap))
                    .then(|| format!("Spinning, lap {} at {:.2}°/tick", lap, speed.velocity()))
            }
            RotationState::Paused { angle, .. } => {
                Some(format!("Paused after {:.1}°", angle.value()))
            }
            RotationState::Stopped { landed, angle } => {
                self.lap = None;
                Some(match landed {
                    Some(landed) => format!("Landed on '{}'", landed.label),
                    None => format!(
                        "Stopped at {:.1}° with nothing under the pointer",
                        angle.value()
                    ),
                })
            }
        }
    }
}

pub async fn run(rx: Receiver<RotationState>) {
    let mut presenter = Presenter::default();
    while let Ok(state) = rx.recv().await {
        log::trace!("{:?}", state);
        if let Some(line) = presenter.describe(&state) {
            log::info!("{}", line);
        }
    }
}
