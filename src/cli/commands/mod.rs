//! Command implementation modules

pub mod context;
pub mod plans;
pub mod preflight;
pub mod run;

pub use context::{Collaborators, Selection};
pub use plans::run_plans_command;
pub use preflight::run_preflight_command;
pub use run::{run_optimize_command, RunParams};
