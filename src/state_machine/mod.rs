mod state;

pub use state::{SessionState, StateMachine};
