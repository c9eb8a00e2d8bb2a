//! Bridge for running async futures from the synchronous executor.
//!
//! Action handlers are invoked from a blocking loop but the HTTP client is
//! async, so handlers hop onto the current Tokio runtime when one exists.

use anyhow::anyhow;
use std::future::Future;
use tokio::{runtime::Handle, task};

/// Execute an async future from synchronous code.
///
/// Inside a multi-threaded Tokio runtime the future runs on the current handle
/// via `block_in_place`; outside any runtime a throwaway current-thread
/// runtime is built for the call.
pub fn block_on_future<F, T>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        task::block_in_place(|| handle.block_on(future))
    } else {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| anyhow!("could not start a runtime for handler I/O: {error}"))?
            .block_on(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_without_ambient_runtime() {
        let value = block_on_future(async { Ok::<_, anyhow::Error>(41 + 1) }).expect("future resolves");
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reuses_current_runtime() {
        let value = block_on_future(async { Ok::<_, anyhow::Error>("ok") }).expect("future resolves");
        assert_eq!(value, "ok");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn runs_inside_spawn_blocking() {
        let value = tokio::task::spawn_blocking(|| block_on_future(async { Ok::<_, anyhow::Error>(7) }))
            .await
            .expect("blocking task joins")
            .expect("future resolves");
        assert_eq!(value, 7);
    }
}
