//! Control module: flat-state bookkeeping and trajectory trackers
pub mod flat_state;
pub mod line_tracker;
pub mod trajectory;

pub use self::flat_state::FlatState;
pub use self::line_tracker::LineTrackerTrapezoid;
pub use self::trajectory::{Phase, ProfileSample, TrapezoidalProfile};
