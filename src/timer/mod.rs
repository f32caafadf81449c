mod clock;
mod record;
mod scheduler;
mod service;

pub use clock::{Clock, SystemClock};
pub use scheduler::{Scheduler, TokioScheduler};
pub use service::{CountdownDisplay, ExpiryHook, ResumeOutcome, TimerService};

#[cfg(test)]
pub use clock::FixedClock;
#[cfg(test)]
pub use record::TimerRecord;
#[cfg(test)]
pub use scheduler::ManualScheduler;
