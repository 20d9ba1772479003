//! Delayed auto-transitions.
//!
//! Entering a stage arms one timer per transition that declares a delay.
//! Timers owned by a stage are cancelled when the stage is left. An elapsed
//! timer is routed back through the engine like a direct navigation, so
//! middleware and plugins still see it and may cancel it.

mod manager;
mod record;
pub mod state;

pub use manager::{TimerCallback, TimerFiring, TimerManager};
pub use record::TimerRecord;
pub use state::{SerializedTimer, TIMER_STATE_VERSION};
