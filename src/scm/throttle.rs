use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// 串行执行队列：任务按提交顺序逐个运行
#[derive(Default)]
pub struct Sequencer {
    queue: Mutex<()>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn queue<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let _turn = self.queue.lock().await;
        task.await
    }
}

/// 合并触发：运行期间到达的多次触发只会再执行一次
#[derive(Default)]
pub struct Throttler {
    pending: AtomicBool,
    running: Mutex<()>,
}

impl Throttler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回本次调用实际执行任务的次数；被合并的调用立即返回 0
    pub async fn trigger<F, Fut>(&self, mut task: F) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        self.pending.store(true, Ordering::SeqCst);

        let mut runs = 0;
        loop {
            let Ok(_running) = self.running.try_lock() else {
                return runs;
            };

            while self.pending.swap(false, Ordering::SeqCst) {
                task().await;
                runs += 1;
            }

            drop(_running);

            // 释放锁与新触发之间存在竞争窗口，重新检查一次
            if !self.pending.load(Ordering::SeqCst) {
                return runs;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::Semaphore;

    #[tokio::test]
    async fn test_sequencer_runs_tasks_in_order() {
        let sequencer = Arc::new(Sequencer::new());
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = {
            let sequencer = sequencer.clone();
            let log = log.clone();
            tokio::spawn(async move {
                sequencer
                    .queue(async {
                        tokio::task::yield_now().await;
                        log.lock().unwrap().push("first");
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        sequencer
            .queue(async {
                log.lock().unwrap().push("second");
            })
            .await;
        first.await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_throttler_coalesces_triggers_during_run() {
        let throttler = Arc::new(Throttler::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));

        let task = {
            let runs = runs.clone();
            let gate = gate.clone();
            move || {
                let runs = runs.clone();
                let gate = gate.clone();
                async move {
                    gate.acquire().await.unwrap().forget();
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            }
        };

        let first = {
            let throttler = throttler.clone();
            let task = task.clone();
            tokio::spawn(async move { throttler.trigger(task).await })
        };
        tokio::task::yield_now().await;

        // 第一次运行被阻塞时到达的触发全部合并
        assert_eq!(throttler.trigger(task.clone()).await, 0);
        assert_eq!(throttler.trigger(task.clone()).await, 0);
        assert_eq!(throttler.trigger(task.clone()).await, 0);

        gate.add_permits(2);
        assert_eq!(first.await.unwrap(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_throttler_runs_once_when_idle() {
        let throttler = Throttler::new();
        let runs = AtomicUsize::new(0);
        let counter = &runs;
        let executed = throttler
            .trigger(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(executed, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
