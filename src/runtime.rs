//! Runtime abstraction layer for async operations
//!
//! Tile fetches and content loads are plain futures. The renderer hands them
//! to an injected [`AsyncSpawner`] and picks their results up from a channel,
//! so the crate works with a tokio runtime, a `futures` local pool, or any
//! executor the host provides.

use crate::{MapError, Result};
use futures::executor::LocalSpawner;
use futures::future::BoxFuture;
use futures::task::LocalSpawnExt;
use log::warn;

/// A trait for spawning fire-and-forget tasks (object-safe)
pub trait AsyncSpawner {
    /// Spawn a future; its output is delivered through the future itself
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Result<()>;
}

/// Spawns onto a `futures::executor::LocalPool`.
///
/// The host drives the pool (for example with `run_until_stalled`) from the
/// same loop that calls `MapRenderer::update`.
#[derive(Clone)]
pub struct LocalPoolSpawner {
    spawner: LocalSpawner,
}

impl LocalPoolSpawner {
    pub fn new(spawner: LocalSpawner) -> Self {
        Self { spawner }
    }
}

impl AsyncSpawner for LocalPoolSpawner {
    fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Result<()> {
        self.spawner.spawn_local(future).map_err(|err| {
            warn!("local pool rejected a task: {}", err);
            MapError::Runtime(err.to_string())
        })
    }
}

#[cfg(feature = "tokio-runtime")]
pub use tokio_impl::TokioSpawner;

#[cfg(feature = "tokio-runtime")]
mod tokio_impl {
    use super::*;
    use ::tokio::runtime::Handle;

    /// Tokio-based async spawner
    #[derive(Clone)]
    pub struct TokioSpawner {
        handle: Handle,
    }

    impl TokioSpawner {
        pub fn new(handle: Handle) -> Self {
            Self { handle }
        }

        /// Spawner for the runtime the caller is running inside
        pub fn current() -> Result<Self> {
            Handle::try_current()
                .map(Self::new)
                .map_err(|err| MapError::Runtime(err.to_string()))
        }
    }

    impl AsyncSpawner for TokioSpawner {
        fn spawn_boxed(&self, future: BoxFuture<'static, ()>) -> Result<()> {
            // detached; results come back over the renderer's channel
            drop(self.handle.spawn(future));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_local_pool_spawner_runs_tasks() {
        let mut pool = LocalPool::new();
        let spawner = LocalPoolSpawner::new(pool.spawner());
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = counter.clone();
            spawner
                .spawn_boxed(
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                    .boxed(),
                )
                .unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        pool.run_until_stalled();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_tokio_spawner_runs_tasks() {
        let spawner = TokioSpawner::current().unwrap();
        let (tx, rx) = ::tokio::sync::oneshot::channel();
        spawner
            .spawn_boxed(
                async move {
                    let _ = tx.send(42);
                }
                .boxed(),
            )
            .unwrap();
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_tokio_spawner_requires_runtime() {
        assert!(matches!(TokioSpawner::current(), Err(MapError::Runtime(_))));
    }
}
