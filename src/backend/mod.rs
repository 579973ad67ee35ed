pub mod actor;
pub mod messages;
pub mod prompt;
pub mod worker;

pub use actor::{BackendActor, BackendConfig};
pub use messages::{BackendCommand, BackendEvent, Operation, WorkerMessage};
pub use prompt::{PlaylistDecision, Prompter};
