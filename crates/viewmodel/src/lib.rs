mod loader;
mod merge;
mod runtime;
mod state;
mod submit;

pub use loader::{LoadOutcome, PageRequest};
pub use merge::MergeOutcome;
pub use runtime::{Command, Controller};
pub use state::{Diagnostic, ViewModel};
pub use submit::{SubmitOutcome, GENERIC_SUBMIT_ERROR};
