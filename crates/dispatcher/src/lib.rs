//! 并发任务分发器
//!
//! 将任意数量的任务交给调用方提供的处理函数执行，支持两种并发策略：
//! 每个任务一个 worker（无界），或固定大小的 worker 池（有界）。
//! 调用 [`Dispatcher::wait`] 阻塞直到所有已提交的任务处理完毕。

pub mod concurrency;
pub mod dispatcher;
pub mod stats;

pub use concurrency::{Concurrency, DispatcherConfig};
pub use dispatcher::Dispatcher;
pub use stats::DispatchStats;
