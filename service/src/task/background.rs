//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use derive_more::Display;
use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Background environment for running long-living [`Task`]s.
///
/// Resolves once any of the spawned [`Task`]s fails, or once all of them
/// stop.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set of tasks.
    set: task::LocalSet,

    /// Handles of spawned tasks.
    handles: Vec<task::JoinHandle<Result<(), Failure>>>,
}

impl Background {
    /// Spawns a new [`Task`] with the provided `name` inside the
    /// [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        log::info!("spawning `task::{name}`");
        self.handles.push(self.set.spawn_local(future.map(move |res| {
            log::warn!("`task::{name}` stopped");
            res.map_err(|e| Failure {
                task: name,
                source: Box::new(e),
            })
        })));
    }

    /// Returns the number of [`Task`]s spawned in this [`Background`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Indicates whether no [`Task`]s are spawned in this [`Background`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Failure>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        future::try_join_all(iter::once(set.map(Ok).boxed_local()).chain(
            handles.into_iter().map(|h| {
                h.map(|r| match r {
                    Ok(res) => res,
                    Err(e) => Err(Failure {
                        task: "unknown",
                        source: Box::new(e),
                    }),
                })
                .boxed_local()
            }),
        ))
        .map_ok(drop)
        .boxed_local()
    }
}

/// Failure of a [`Task`] running in a [`Background`].
#[derive(Debug, Display)]
#[display("`task::{task}` failed: {source}")]
pub struct Failure {
    /// Name of the failed [`Task`].
    pub task: &'static str,

    /// Error the [`Task`] failed with.
    pub source: Box<dyn Error + 'static>,
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

#[cfg(test)]
mod spec {
    use std::{fmt, io};

    use super::Background;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[tokio::test]
    async fn resolves_when_all_tasks_stop() {
        let mut bg = Background::default();
        bg.spawn("First", async { Ok::<_, io::Error>(()) });
        bg.spawn("Second", async { Ok::<_, io::Error>(()) });
        assert_eq!(bg.len(), 2);

        bg.await.unwrap();
    }

    #[tokio::test]
    async fn names_failed_task() {
        let mut bg = Background::default();
        bg.spawn("Failing", async { Err(Boom) });

        let err = bg.await.unwrap_err();
        assert_eq!(err.task, "Failing");
        assert_eq!(err.to_string(), "`task::Failing` failed: boom");
    }
}
