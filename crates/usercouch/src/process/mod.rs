//! Supervision of the external server process.

mod errors;
mod launcher;
mod schedule;
mod supervisor;

pub use errors::SupervisorError;
pub use launcher::{Launcher, SystemLauncher, terminate};
pub use schedule::StartSchedule;
pub use supervisor::{Collaborators, UserCouch};
