use crate::config::{self, Config};
use crate::events::{AppEvent, Command};
use crate::presenter;
use async_channel::Receiver;
use roulette::{Angle, LayoutError, Roulette, Spin, SpeedPreset, TickSource, WheelError};

/// The daemon's single event loop: owns the wheel and applies commands, ticks
/// and config reloads to it one at a time.
pub struct App<S> {
    roulette: Roulette<S>,
    config: Config,
}

impl<S: TickSource> App<S> {
    pub fn new(config: Config, ticks: S) -> Result<Self, LayoutError> {
        let mut roulette = Roulette::new(config.layout()?, ticks);
        roulette.set_tick_interval(config.tick_interval());
        Ok(Self { roulette, config })
    }

    pub fn roulette(&self) -> &Roulette<S> {
        &self.roulette
    }

    pub fn update(&mut self, event: AppEvent) {
        match event {
            AppEvent::Command(command) => {
                log::debug!("Handling '{}'", command);
                if let Err(e) = self.handle(command) {
                    log::error!("Command failed: {}", e);
                }
            }
            AppEvent::Tick(run) => {
                if let Err(e) = self.roulette.tick(run) {
                    log::error!("Spin ended badly: {}", e);
                }
            }
            AppEvent::ConfigReload => match config::load_config() {
                Ok(new_config) => self.apply_config(new_config),
                Err(e) => log::error!("Failed to reload config: {}", e),
            },
        }
    }

    fn handle(&mut self, command: Command) -> Result<(), WheelError> {
        match command {
            Command::Start {
                speed,
                auto_stop,
                resume,
            } => {
                let speed = speed.or(self.config.speed).map(SpeedPreset::profile);
                let auto_stop = if resume {
                    auto_stop
                } else {
                    auto_stop.or_else(|| self.config.auto_stop())
                };
                self.roulette.start(Spin::from_flags(speed, resume, auto_stop)?);
                Ok(())
            }
            Command::Pause => {
                self.roulette.pause();
                Ok(())
            }
            Command::Restart => {
                self.roulette.restart();
                Ok(())
            }
            Command::Stop => self.roulette.stop(),
            Command::StopAt(degrees) => self.roulette.stop_at(Angle::from_degrees(degrees, true)),
        }
    }

    /// Keeps the current config when the new one cannot be laid out.
    pub fn apply_config(&mut self, config: Config) {
        match config.layout() {
            Ok(layout) => {
                if layout != *self.roulette.layout() {
                    log::info!("Wheel now has {} parts", layout.len());
                    self.roulette.set_layout(layout);
                }
                self.roulette.set_tick_interval(config.tick_interval());
                self.config = config;
                log::info!("Configuration reloaded");
            }
            Err(e) => log::error!("Ignoring config with unusable parts: {}", e),
        }
    }

    pub async fn run(mut self, rx: Receiver<AppEvent>) {
        tokio::spawn(presenter::run(self.roulette.subscribe()));

        while let Ok(event) = rx.recv().await {
            self.update(event);
        }
    }
}
