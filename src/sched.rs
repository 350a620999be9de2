//! Admission control and queueing, shared by the download and upload
//! dispatchers.
//!
//! A task is in exactly one of: the bounded `running` deque, the FIFO
//! `ready` deque, or neither (terminal/cancelled). Callers hold the
//! containing mutex for every operation here, so each method is a single
//! critical section over both queues.

use std::collections::VecDeque;
use std::sync::Arc;

/// What the queues need from a task to stop or cancel it in place.
pub(crate) trait Schedulable {
    fn url(&self) -> &str;
    fn tag(&self) -> Option<&str>;
    /// Request a cooperative stop: set the task's stop flag and signal its
    /// workers. Must not block and must be idempotent.
    fn signal_stop(&self);
}

/// Outcome of admitting a new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Added to the running set; the caller starts it.
    Running,
    /// Running set full; enqueued at the tail of the ready queue.
    Waiting,
}

pub(crate) struct TaskQueues<T> {
    running: VecDeque<Arc<T>>,
    ready: VecDeque<Arc<T>>,
    max_task_size: usize,
}

impl<T: Schedulable> TaskQueues<T> {
    pub(crate) fn new(max_task_size: usize) -> Self {
        TaskQueues {
            running: VecDeque::new(),
            ready: VecDeque::new(),
            max_task_size: max_task_size.clamp(1, 5),
        }
    }

    /// Affects only future admission decisions; running tasks are never evicted.
    pub(crate) fn set_max_task_size(&mut self, max_task_size: usize) {
        self.max_task_size = max_task_size.clamp(1, 5);
    }

    pub(crate) fn admit(&mut self, task: Arc<T>) -> Admission {
        if self.running.len() < self.max_task_size {
            self.running.push_back(task);
            Admission::Running
        } else {
            self.ready.push_back(task);
            Admission::Waiting
        }
    }

    /// Remove a terminated task from the running set and pop the oldest
    /// ready task into it, if any. The returned task must be started by the
    /// caller (outside the queue lock).
    pub(crate) fn recycle(&mut self, task: &Arc<T>) -> Option<Arc<T>> {
        self.running.retain(|t| !Arc::ptr_eq(t, task));
        if self.running.len() >= self.max_task_size {
            return None;
        }
        let next = self.ready.pop_front()?;
        self.running.push_back(Arc::clone(&next));
        Some(next)
    }

    /// Signal stop on every task whose URL matches (`None` matches all),
    /// in both queues. Ready tasks keep their queue position; when promoted
    /// they report pause without starting work.
    pub(crate) fn stop_matching(&mut self, url: Option<&str>) {
        for task in self.running.iter().chain(self.ready.iter()) {
            if url.map_or(true, |u| task.url() == u) {
                task.signal_stop();
            }
        }
    }

    /// Signal stop on every task whose tag matches (`None` matches all) and
    /// remove it from its queue, so it is never promoted again.
    pub(crate) fn cancel_matching(&mut self, tag: Option<&str>) {
        let matches = |task: &Arc<T>| match tag {
            Some(tag) => task.tag() == Some(tag),
            None => true,
        };
        for queue in [&mut self.running, &mut self.ready] {
            queue.retain(|task| {
                if matches(task) {
                    task.signal_stop();
                    false
                } else {
                    true
                }
            });
        }
    }

    #[cfg(test)]
    pub(crate) fn running_len(&self) -> usize {
        self.running.len()
    }
}
