//! Machine model - status values, readings and the transition state machine

mod state;
mod status;
mod transitions;

pub use state::MachineState;
pub use status::{Reading, Status};
pub use transitions::{TransitionRule, TransitionTable};
