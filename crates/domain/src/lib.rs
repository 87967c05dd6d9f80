pub mod filter;
pub mod models;
pub mod ports;

pub use filter::{comma_split, ShellFilter, SELECT_ALL};
pub use models::*;
pub use ports::*;
pub use shellz_core::{ShellzError, ShellzResult};
