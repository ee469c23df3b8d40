pub mod angle;
pub mod layout;
pub mod machine;
pub mod macros;
pub mod speed;
pub mod worker;

pub use angle::{Angle, FULL_TURN, Precise};
pub use layout::{Layout, LayoutError, Part, PartLabel, PartRange, PartRef, PartSize};
pub use machine::{Landed, POINTER, RotationState, Roulette, Spin, WheelError};
pub use speed::{SpeedPreset, SpeedProfile};
pub use worker::{ManualTicks, Progress, RotationWorker, RunId, TickSource};
