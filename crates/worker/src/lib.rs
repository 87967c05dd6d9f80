pub mod factory;
pub mod runner;
pub mod sessions;

pub use factory::DefaultSessionFactory;
pub use runner::ShellRunner;
pub use sessions::{LocalSession, SshSession, SshTarget};
