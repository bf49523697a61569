use std::io;
use tokio::runtime::Handle;

/// Handle to the worker pool that runs blocking reads.
///
/// The pool is owned by whoever built the runtime; an `Executor` only
/// borrows it. Dropping every clone leaves the runtime running.
#[derive(Debug, Clone)]
pub struct Executor {
    handle: Handle,
}

impl Executor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Borrows the pool of the runtime this is called from.
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Runs `f` on the pool's blocking threads and waits for its result.
    pub async fn run_blocking<F, T>(&self, f: F) -> io::Result<T>
    where
        F: FnOnce() -> io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.handle
            .spawn_blocking(f)
            .await
            .map_err(|e| io::Error::other(format!("blocking task failed: {e}")))?
    }

    /// Drops `value` on a blocking thread, for resources whose destructor
    /// may block (open connections, file handles).
    pub fn release<T: Send + 'static>(&self, value: T) {
        drop(self.handle.spawn_blocking(move || drop(value)));
    }
}

impl From<Handle> for Executor {
    fn from(handle: Handle) -> Self {
        Self::new(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn run_blocking_returns_closure_result() {
        let executor = Executor::current();
        let caller = std::thread::current().id();

        let worker = executor
            .run_blocking(|| Ok(std::thread::current().id()))
            .await
            .unwrap();
        assert_ne!(worker, caller);

        let err = executor
            .run_blocking(|| -> io::Result<()> { Err(io::Error::from(io::ErrorKind::NotFound)) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn executor_does_not_own_the_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let executor = Executor::new(runtime.handle().clone());
        drop(executor.clone());
        drop(executor);

        let value = runtime.block_on(async {
            Executor::current()
                .run_blocking(|| Ok(7))
                .await
                .unwrap()
        });
        assert_eq!(value, 7);
    }
}
