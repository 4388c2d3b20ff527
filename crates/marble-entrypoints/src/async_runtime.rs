//! Tokio runtime helpers
//!
//! Downloads run as tasks on a multi-threaded tokio runtime while the caller keeps the tile
//! caches on its own thread. These helpers build that runtime and spawn tasks onto it with a
//! profiling scope attached.

pub use tokio::runtime::{Handle, Runtime};

/// Build the multi-threaded runtime used by Marble tools.
pub fn build_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("marble-worker")
        .on_thread_start(|| {
            #[cfg(feature = "profiling")]
            crate::register_profiling_thread!("marble-worker");
        })
        .build()
}

/// Spawn an async task on the current runtime.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    #[cfg(feature = "profiling")]
    {
        tokio::spawn(async move {
            // Tag with the future type so traces can be filtered by task kind
            profiling::scope!(
                "async_runtime::spawn",
                format!("task_type={}", std::any::type_name::<F>()).as_str()
            );
            future.await
        })
    }
    #[cfg(not(feature = "profiling"))]
    {
        tokio::spawn(future)
    }
}

/// Yield execution to allow other tasks to run.
pub async fn yield_now() {
    tokio::task::yield_now().await
}

/// Check if we're running inside a tokio runtime context.
pub fn in_runtime_context() -> bool {
    Handle::try_current().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_spawns_tasks() {
        assert!(!in_runtime_context());
        let runtime = build_runtime().unwrap();
        let value = runtime.block_on(async {
            assert!(in_runtime_context());
            yield_now().await;
            spawn(async { 21 * 2 }).await.unwrap()
        });
        assert_eq!(value, 42);
    }
}
