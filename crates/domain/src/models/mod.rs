pub mod identity;
pub mod outcome;
pub mod shell;

pub use identity::Identity;
pub use outcome::{ExecOutcome, OutcomeStatus, RunReport};
pub use shell::{Identities, Shell, ShellType, Shells};
