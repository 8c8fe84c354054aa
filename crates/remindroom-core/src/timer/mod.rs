mod clock;
mod queue;

pub use clock::{to_datetime, Clock, ManualClock, TimerSource, WallClock};
pub use queue::{Fired, TimerHandle, TimerKind, TimerQueue, Wakeup};
