use std::fmt;
use std::num::NonZeroUsize;

/// 并发策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Concurrency {
    /// 每个提交的任务启动一个 worker，无上限
    #[default]
    Unbounded,
    /// 固定数量的长期 worker 共享一个队列
    Bounded(NonZeroUsize),
}

impl Concurrency {
    /// 正数为有界，`<= 0` 表示无界
    pub fn from_limit(limit: i64) -> Self {
        usize::try_from(limit)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(Concurrency::Unbounded, Concurrency::Bounded)
    }

    pub fn bounded(workers: usize) -> Self {
        NonZeroUsize::new(workers).map_or(Concurrency::Unbounded, Concurrency::Bounded)
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, Concurrency::Bounded(_))
    }

    /// 同时运行的 worker 上限，无界时为 `None`
    pub fn limit(&self) -> Option<usize> {
        match self {
            Concurrency::Unbounded => None,
            Concurrency::Bounded(workers) => Some(workers.get()),
        }
    }
}

impl From<i64> for Concurrency {
    fn from(limit: i64) -> Self {
        Concurrency::from_limit(limit)
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Unbounded => f.write_str("unbounded"),
            Concurrency::Bounded(workers) => write!(f, "bounded({workers})"),
        }
    }
}

/// 分发器配置，构造后不可变
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub concurrency: Concurrency,
    /// 有界模式的队列容量，`None` 时为 worker 数的两倍
    pub queue_capacity: Option<NonZeroUsize>,
}

impl DispatcherConfig {
    pub fn new(concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            queue_capacity: None,
        }
    }

    pub fn from_limit(limit: i64) -> Self {
        Self::new(Concurrency::from_limit(limit))
    }

    /// 0 表示使用默认容量
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = NonZeroUsize::new(capacity);
        self
    }

    /// 实际使用的队列容量，无界模式没有队列
    pub fn effective_queue_capacity(&self) -> Option<usize> {
        match self.concurrency {
            Concurrency::Unbounded => None,
            Concurrency::Bounded(workers) => Some(
                self.queue_capacity
                    .map_or_else(|| workers.get().saturating_mul(2), NonZeroUsize::get),
            ),
        }
    }
}
