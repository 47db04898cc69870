//! Named, cancelable one-shot timers.
//!
//! Each timer is a tokio task. Scheduling a name that is already pending
//! aborts the old task first. Dropping the set aborts everything, so no
//! callback can run after its owner is gone.
//!
//! The set keeps the runtime handle that was current when it was created,
//! so timers can be scheduled from threads outside the runtime.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

#[derive(Debug)]
pub struct TimerSet {
    runtime: Option<Handle>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Default for TimerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerSet {
    /// Creates a set bound to the current runtime, if there is one.
    pub fn new() -> Self {
        Self {
            runtime: Handle::try_current().ok(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a set that spawns its timers on `runtime`.
    pub fn with_runtime(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `callback` after `delay` unless canceled first.
    ///
    /// Returns false, without scheduling, when neither a captured nor a
    /// current runtime is available.
    pub fn schedule<F>(&self, name: impl Into<String>, delay: Duration, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_async(name, delay, async move { callback() })
    }

    /// Async variant of [`schedule`](Self::schedule).
    pub fn schedule_async<Fut>(&self, name: impl Into<String>, delay: Duration, callback: Fut) -> bool
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(timer = %name, "No tokio runtime available, timer not scheduled");
            return false;
        };
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback.await;
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = tasks.insert(name.clone(), task) {
            previous.abort();
            trace!(timer = %name, "Replaced pending timer");
        }
        true
    }

    /// Cancels a timer. Returns true if it was still pending.
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.lock().remove(name) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let mut tasks = self.tasks.lock();
        let count = tasks.len();
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
        if count > 0 {
            trace!(count, "Canceled timers");
        }
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .get(name)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn pending_count(&self) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.get_mut().drain() {
            handle.abort();
        }
    }
}
