use roulette::{RunId, SpeedPreset};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    Tick(RunId),
    ConfigReload,
}

/// A control command, as sent over the socket one per line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start {
        speed: Option<SpeedPreset>,
        auto_stop: Option<Duration>,
        resume: bool,
    },
    Pause,
    Restart,
    Stop,
    StopAt(f64),
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command '{0}'")]
    Unknown(String),
    #[error("Invalid argument '{0}'")]
    InvalidArgument(String),
}

fn parse_auto_stop(word: &str, secs: &str) -> Result<Duration, CommandError> {
    secs.parse::<f64>()
        .ok()
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .ok_or_else(|| CommandError::InvalidArgument(word.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?.to_ascii_lowercase();

        match verb.as_str() {
            "start" | "continue" => {
                let mut resume = verb == "continue";
                let mut speed = None;
                let mut auto_stop = None;

                for word in words {
                    if word.eq_ignore_ascii_case("continue") {
                        resume = true;
                    } else if let Some(secs) = word.strip_prefix("auto=") {
                        auto_stop = Some(parse_auto_stop(word, secs)?);
                    } else {
                        let preset = word
                            .parse()
                            .map_err(|_| CommandError::InvalidArgument(word.to_string()))?;
                        speed = Some(preset);
                    }
                }

                Ok(Self::Start {
                    speed,
                    auto_stop,
                    resume,
                })
            }
            "pause" => Ok(Self::Pause),
            "restart" => Ok(Self::Restart),
            "stop" => Ok(Self::Stop),
            "stop-at" => {
                let word = words
                    .next()
                    .ok_or_else(|| CommandError::InvalidArgument("stop-at".to_string()))?;
                word.parse()
                    .map(Self::StopAt)
                    .map_err(|_| CommandError::InvalidArgument(word.to_string()))
            }
            _ => Err(CommandError::Unknown(verb)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start {
                speed,
                auto_stop,
                resume,
            } => {
                write!(f, "start")?;
                if *resume {
                    write!(f, " continue")?;
                }
                if let Some(speed) = speed {
                    write!(f, " {}", speed)?;
                }
                if let Some(after) = auto_stop {
                    write!(f, " auto={}", after.as_secs_f64())?;
                }
                Ok(())
            }
            Self::Pause => write!(f, "pause"),
            Self::Restart => write!(f, "restart"),
            Self::Stop => write!(f, "stop"),
            Self::StopAt(degrees) => write!(f, "stop-at {}", degrees),
        }
    }
}
