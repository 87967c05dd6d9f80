pub mod local;
mod process;
pub mod ssh;

pub use local::LocalSession;
pub use ssh::{SshSession, SshTarget};
