//! [`Tx`] client definitions.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{connection, Connection},
};

use super::NonTx;

/// Transactional Postgres database client.
///
/// Clones share the same transaction.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Open [`connection::Tx`], or [`None`] once committed.
    tx: Arc<Mutex<Option<connection::Tx>>>,
}

impl Tx {
    /// Begins a new [`Tx`] client in a [`Connection`] of the provided
    /// [`NonTx`] client.
    ///
    /// # Errors
    ///
    /// If failed to take a [`Connection`] or to begin a transaction in it.
    pub async fn begin(
        client: &NonTx,
    ) -> Result<Self, Traced<database::Error>> {
        let conn = client.connection().await.map_err(tracerr::wrap!())?;
        let tx = connection::Tx::begin(conn)
            .await
            .map_err(tracerr::wrap!())?;
        Ok(Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        })
    }

    /// Commits this [`Tx`] client.
    ///
    /// Committing an already committed [`Tx`] client is a no-op.
    ///
    /// # Errors
    ///
    /// If failed to commit transaction of this [`Tx`] client.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let tx = self.tx.lock().await.take();
        if let Some(tx) = tx {
            tx.commit().await.map_err(tracerr::wrap!())
        } else {
            Ok(())
        }
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let guard = self.tx.lock().await;
        guard
            .as_ref()
            .ok_or_else(|| tracerr::new!(database::Error::Committed))?
            .query(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let guard = self.tx.lock().await;
        guard
            .as_ref()
            .ok_or_else(|| tracerr::new!(database::Error::Committed))?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let guard = self.tx.lock().await;
        guard
            .as_ref()
            .ok_or_else(|| tracerr::new!(database::Error::Committed))?
            .exec(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }
}
