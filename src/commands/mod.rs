//! Self-chat command handling.

pub mod interpreter;
pub mod wizard;

pub use interpreter::CommandInterpreter;
pub use wizard::{GroupWizard, WizardState, spawn_sweep_task};
