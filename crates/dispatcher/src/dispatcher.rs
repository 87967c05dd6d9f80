use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use shellz_core::{ShellzError, ShellzResult};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, debug_span, error, Instrument};

use crate::concurrency::{Concurrency, DispatcherConfig};
use crate::stats::{Counters, DispatchStats};

type Handler<J> = Arc<dyn Fn(J) -> BoxFuture<'static, ()> + Send + Sync>;

type SharedReceiver<J> = Arc<Mutex<mpsc::Receiver<Envelope<J>>>>;

struct Envelope<J> {
    seq: u64,
    job: J,
}

enum Mode<J> {
    /// 每个任务一个 task
    Unbounded { jobs: Vec<JoinHandle<()>> },
    /// 固定 worker 池，`sender` 在 wait 时关闭
    Bounded {
        sender: Option<mpsc::Sender<Envelope<J>>>,
        workers: Vec<JoinHandle<()>>,
    },
}

/// 并发任务分发器
///
/// 处理函数的返回类型是 `()`：任务自身负责处理和记录错误，分发器只跟踪完成情况。
/// 任务之间没有顺序保证。
///
/// `submit` 和 `wait` 都需要 `&mut self`，因此同一时间只有一个提交方。
/// 必须在 Tokio 运行时内创建，有界模式会立即启动所有 worker。
///
/// 未调用 `wait` 就丢弃分发器时，已提交的任务仍会在后台执行完毕。
pub struct Dispatcher<J> {
    config: DispatcherConfig,
    handler: Handler<J>,
    counters: Arc<Counters>,
    mode: Mode<J>,
    next_seq: u64,
    closed: bool,
}

impl<J: Send + 'static> Dispatcher<J> {
    /// `limit <= 0` 为无界模式，正数为 worker 池大小
    pub fn new<F, Fut>(limit: i64, handler: F) -> Self
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::with_config(DispatcherConfig::from_limit(limit), handler)
    }

    pub fn with_config<F, Fut>(config: DispatcherConfig, handler: F) -> Self
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler<J> = Arc::new(move |job: J| handler(job).boxed());
        let counters = Arc::new(Counters::default());

        let mode = match (config.concurrency, config.effective_queue_capacity()) {
            (Concurrency::Bounded(size), Some(capacity)) => {
                let (sender, receiver) = mpsc::channel(capacity);
                let receiver: SharedReceiver<J> = Arc::new(Mutex::new(receiver));
                let workers: Vec<JoinHandle<()>> = (0..size.get())
                    .map(|id| {
                        tokio::spawn(worker_loop(
                            id,
                            Arc::clone(&receiver),
                            Arc::clone(&handler),
                            Arc::clone(&counters),
                        ))
                    })
                    .collect();
                debug!(
                    "Dispatcher started {} workers, queue capacity {}",
                    size, capacity
                );
                Mode::Bounded {
                    sender: Some(sender),
                    workers,
                }
            }
            _ => {
                debug!("Dispatcher running in unbounded mode");
                Mode::Unbounded { jobs: Vec::new() }
            }
        };

        Self {
            config,
            handler,
            counters,
            mode,
            next_seq: 0,
            closed: false,
        }
    }

    /// 提交一个任务
    ///
    /// 无界模式立即为任务启动一个 worker；有界模式在队列满时等待，形成背压。
    /// 在 `wait` 之后调用返回 [`ShellzError::DispatcherClosed`]。
    /// 取消安全：future 在入队前被丢弃时，任务不会被计数也不会执行。
    pub async fn submit(&mut self, job: J) -> ShellzResult<()> {
        if self.closed {
            return Err(ShellzError::DispatcherClosed);
        }

        let seq = self.next_seq;
        match &mut self.mode {
            Mode::Unbounded { jobs } => {
                self.counters.record_submitted();
                jobs.push(tokio::spawn(run_job(
                    seq,
                    job,
                    Arc::clone(&self.handler),
                    Arc::clone(&self.counters),
                )));
            }
            Mode::Bounded { sender, .. } => {
                let sender = sender.as_ref().ok_or(ShellzError::DispatcherClosed)?;
                let permit = sender
                    .reserve()
                    .await
                    .map_err(|_| ShellzError::DispatcherClosed)?;
                self.counters.record_submitted();
                permit.send(Envelope { seq, job });
            }
        }

        self.next_seq += 1;
        Ok(())
    }

    /// 依次提交所有任务，返回提交数量
    pub async fn submit_all<I>(&mut self, jobs: I) -> ShellzResult<usize>
    where
        I: IntoIterator<Item = J>,
    {
        let mut count = 0;
        for job in jobs {
            self.submit(job).await?;
            count += 1;
        }
        Ok(count)
    }

    /// 停止接收新任务，并等待所有已提交任务的处理函数返回
    ///
    /// 返回后没有 worker 仍在运行。重复调用不会产生任何效果。
    pub async fn wait(&mut self) {
        self.closed = true;

        let handles = match &mut self.mode {
            Mode::Unbounded { jobs } => std::mem::take(jobs),
            Mode::Bounded { sender, workers } => {
                // 丢弃发送端即关闭队列，worker 取完剩余任务后退出
                sender.take();
                std::mem::take(workers)
            }
        };

        if handles.is_empty() {
            return;
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Dispatcher task terminated abnormally: {e}");
            }
        }

        let stats = self.stats();
        debug!(
            submitted = stats.submitted,
            completed = stats.completed,
            panicked = stats.panicked,
            peak_in_flight = stats.peak_in_flight,
            "All dispatched jobs completed"
        );
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn concurrency(&self) -> Concurrency {
        self.config.concurrency
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    pub fn is_drained(&self) -> bool {
        self.stats().is_drained()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// 有界模式的 worker：不断从共享队列取任务，直到队列关闭且为空
async fn worker_loop<J: Send + 'static>(
    id: usize,
    receiver: SharedReceiver<J>,
    handler: Handler<J>,
    counters: Arc<Counters>,
) {
    debug!(worker = id, "Worker started");
    loop {
        let next = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(Envelope { seq, job }) = next else {
            break;
        };
        run_job(seq, job, Arc::clone(&handler), Arc::clone(&counters)).await;
    }
    debug!(worker = id, "Queue closed and drained, worker exiting");
}

/// 执行一次处理函数
///
/// 处理函数在独立的 task 中运行：panic 只终止该任务，不会带走 worker 或队列中的其他任务。
async fn run_job<J: Send + 'static>(
    seq: u64,
    job: J,
    handler: Handler<J>,
    counters: Arc<Counters>,
) {
    counters.record_started();
    let result = tokio::spawn(handler(job).instrument(debug_span!("job", seq))).await;
    let panicked = match result {
        Ok(()) => false,
        Err(e) => {
            error!(job = seq, "Job handler terminated abnormally: {e}");
            true
        }
    };
    counters.record_finished(panicked);
}
