use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use shellz_core::ShellzError;
use shellz_dispatcher::{Concurrency, Dispatcher, DispatcherConfig};
use tokio::sync::{Barrier, Mutex, Semaphore};

/// 记录当前并发数和峰值
#[derive(Default)]
struct ConcurrencyTracker {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyTracker {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

fn recording_dispatcher(limit: i64, seen: Arc<Mutex<Vec<u64>>>) -> Dispatcher<u64> {
    Dispatcher::new(limit, move |job: u64| {
        let seen = Arc::clone(&seen);
        async move {
            let delay = rand::rng().random_range(0..3);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            seen.lock().await.push(job);
        }
    })
}

async fn assert_each_job_once(limit: i64, n: u64) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = recording_dispatcher(limit, Arc::clone(&seen));

    let submitted = dispatcher.submit_all(0..n).await.unwrap();
    assert_eq!(submitted as u64, n);
    dispatcher.wait().await;

    let mut seen = seen.lock().await.clone();
    seen.sort_unstable();
    assert_eq!(seen, (0..n).collect::<Vec<_>>(), "limit={limit}, n={n}");

    let stats = dispatcher.stats();
    assert_eq!(stats.submitted, n);
    assert_eq!(stats.completed, n);
    assert_eq!(stats.in_flight, 0);
    assert!(dispatcher.is_drained());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_job_processed_exactly_once() {
    for limit in [-1, 0, 1, 3, 16] {
        for n in [0, 1, 7, 100] {
            assert_each_job_once(limit, n).await;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bounded_never_exceeds_limit() {
    let tracker = Arc::new(ConcurrencyTracker::default());
    let completed = Arc::new(AtomicUsize::new(0));

    let mut dispatcher = {
        let tracker = Arc::clone(&tracker);
        let completed = Arc::clone(&completed);
        Dispatcher::new(2, move |_job: usize| {
            let tracker = Arc::clone(&tracker);
            let completed = Arc::clone(&completed);
            async move {
                tracker.enter();
                tokio::time::sleep(Duration::from_millis(20)).await;
                tracker.leave();
                completed.fetch_add(1, Ordering::SeqCst);
            }
        })
    };
    assert_eq!(dispatcher.concurrency(), Concurrency::bounded(2));

    for job in 0..10 {
        dispatcher.submit(job).await.unwrap();
    }
    dispatcher.wait().await;

    assert_eq!(completed.load(Ordering::SeqCst), 10);
    assert!(tracker.max() <= 2, "observed {} concurrent jobs", tracker.max());
    assert!(tracker.max() >= 1);
    assert!(dispatcher.stats().peak_in_flight <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unbounded_runs_all_jobs_simultaneously() {
    const JOBS: usize = 8;
    // 所有任务同时到达屏障才能继续，否则超时
    let barrier = Arc::new(Barrier::new(JOBS));
    let tracker = Arc::new(ConcurrencyTracker::default());

    let mut dispatcher = {
        let barrier = Arc::clone(&barrier);
        let tracker = Arc::clone(&tracker);
        Dispatcher::new(-1, move |_job: usize| {
            let barrier = Arc::clone(&barrier);
            let tracker = Arc::clone(&tracker);
            async move {
                tracker.enter();
                barrier.wait().await;
                tracker.leave();
            }
        })
    };

    for job in 0..JOBS {
        dispatcher.submit(job).await.unwrap();
    }
    tokio::time::timeout(Duration::from_secs(5), dispatcher.wait())
        .await
        .expect("unbounded jobs should not wait on each other");

    assert_eq!(tracker.max(), JOBS);
    assert_eq!(dispatcher.stats().peak_in_flight, JOBS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failing_job_does_not_affect_siblings() {
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut dispatcher = {
        let log = Arc::clone(&log);
        Dispatcher::new(-1, move |job: u32| {
            let log = Arc::clone(&log);
            async move {
                let result: Result<u32, String> = if job == 3 {
                    Err(format!("job {job} failed"))
                } else {
                    Ok(job)
                };
                match result {
                    Ok(value) => log.lock().await.push(format!("ok {value}")),
                    Err(e) => log.lock().await.push(format!("error {e}")),
                }
            }
        })
    };

    dispatcher.submit_all(0..6).await.unwrap();
    dispatcher.wait().await;

    let log = log.lock().await;
    assert_eq!(log.len(), 6);
    assert!(log.contains(&"error job 3 failed".to_string()));
    assert_eq!(log.iter().filter(|l| l.starts_with("ok")).count(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_job_is_contained() {
    for limit in [-1, 1] {
        let done = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = {
            let done = Arc::clone(&done);
            Dispatcher::new(limit, move |job: u32| {
                let done = Arc::clone(&done);
                async move {
                    if job == 0 {
                        panic!("handler bug");
                    }
                    done.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        dispatcher.submit_all(0..5).await.unwrap();
        dispatcher.wait().await;

        // 单 worker 时 panic 之后的任务也必须执行
        assert_eq!(done.load(Ordering::SeqCst), 4, "limit={limit}");
        let stats = dispatcher.stats();
        assert_eq!(stats.completed, 5);
        assert_eq!(stats.panicked, 1);
        assert!(stats.is_drained());
    }
}

#[tokio::test]
async fn test_wait_is_idempotent() {
    for limit in [-1, 2] {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = {
            let calls = Arc::clone(&calls);
            Dispatcher::new(limit, move |_job: ()| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        dispatcher.submit(()).await.unwrap();
        dispatcher.submit(()).await.unwrap();
        dispatcher.wait().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        dispatcher.wait().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.stats().completed, 2);
    }
}

#[tokio::test]
async fn test_wait_without_jobs_returns() {
    let mut dispatcher = Dispatcher::new(4, |_job: ()| async {});
    tokio::time::timeout(Duration::from_secs(5), dispatcher.wait())
        .await
        .expect("idle workers should exit once the queue is closed");
    assert_eq!(dispatcher.stats().submitted, 0);
    assert!(dispatcher.is_drained());
}

#[tokio::test]
async fn test_submit_after_wait_is_rejected() {
    for limit in [-1, 3] {
        let mut dispatcher = Dispatcher::new(limit, |_job: u8| async {});
        dispatcher.submit(1).await.unwrap();
        dispatcher.wait().await;
        assert!(dispatcher.is_closed());

        let err = dispatcher.submit(2).await.unwrap_err();
        assert!(matches!(err, ShellzError::DispatcherClosed));
        assert_eq!(dispatcher.stats().submitted, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bounded_queue_applies_backpressure() {
    let gate = Arc::new(Semaphore::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    let config = DispatcherConfig::new(Concurrency::bounded(1)).with_queue_capacity(1);
    let mut dispatcher = {
        let gate = Arc::clone(&gate);
        let done = Arc::clone(&done);
        Dispatcher::with_config(config, move |_job: u32| {
            let gate = Arc::clone(&gate);
            let done = Arc::clone(&done);
            async move {
                let _permit = gate.acquire().await.unwrap();
                done.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    // 第一个任务被 worker 取走并阻塞，第二个占满队列
    dispatcher.submit(1).await.unwrap();
    dispatcher.submit(2).await.unwrap();

    let blocked = tokio::time::timeout(Duration::from_millis(100), dispatcher.submit(3)).await;
    assert!(blocked.is_err(), "submit should wait while the queue is full");
    assert_eq!(dispatcher.stats().submitted, 2);

    gate.add_permits(10);
    dispatcher.submit(3).await.unwrap();
    dispatcher.wait().await;

    assert_eq!(done.load(Ordering::SeqCst), 3);
    assert_eq!(dispatcher.stats().completed, 3);
}
