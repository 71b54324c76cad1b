use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::AbortHandle;

/// Coalesces bursts of calls into one deferred task.
///
/// Each [`call`](Debouncer::call) cancels the task scheduled by the previous
/// call, if it has not started yet, and schedules its own after the quiet
/// window. Once a task's window has elapsed it runs to completion and is no
/// longer cancellable.
///
/// Tasks run on the current thread via [`tokio::task::spawn_local`], so
/// callers must be inside a [`tokio::task::LocalSet`].
#[derive(Debug)]
pub struct Debouncer {
    wait: Duration,
    scheduled: Rc<RefCell<Option<AbortHandle>>>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            scheduled: Rc::new(RefCell::new(None)),
        }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Schedule `task` to run once the window passes without another call.
    pub fn call(&self, task: impl Future<Output = ()> + 'static) {
        self.cancel();
        let wait = self.wait;
        let scheduled = Rc::clone(&self.scheduled);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(wait).await;
            scheduled.borrow_mut().take();
            task.await;
        });
        *self.scheduled.borrow_mut() = Some(handle.abort_handle());
    }

    /// Drop the scheduled task, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.scheduled.borrow_mut().take() {
            handle.abort();
        }
    }

    /// Whether a task is waiting for its window to pass.
    pub fn is_pending(&self) -> bool {
        self.scheduled.borrow().is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
