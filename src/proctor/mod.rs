mod event;
mod fingerprint;
mod recorder;
mod session;
mod signals;

pub use event::{ProctorEvent, ProctorEventKind};
pub use recorder::{ProctorRecorder, RecorderConfig};
pub use session::SessionLog;
pub use signals::{EditorSignal, SignalBus};
