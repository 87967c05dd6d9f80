pub mod session;
pub mod store;

pub use session::{CommandOutput, Session, SessionFactory};
pub use store::{Inventory, ShellStore};
