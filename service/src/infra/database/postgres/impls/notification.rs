//! [`Notification`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use tracerr::Traced;

use crate::{
    domain::{contract, Notification},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<Notification>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO notifications (contract_id, reference, message, date) \
            VALUES ($1, $2, $3, $4)";
        self.exec(
            SQL,
            &[
                &notification.contract_id,
                &notification.reference,
                &notification.message,
                &notification.date,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<Notification>, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Notification>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let contract_id = by.into_inner();

        const SQL: &str = "\
            SELECT reference, message, date \
            FROM notifications \
            WHERE contract_id = $1::UUID \
            ORDER BY id";
        Ok(self
            .query(SQL, &[&contract_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| Notification {
                contract_id,
                reference: row.get("reference"),
                message: row.get("message"),
                date: row.get("date"),
            })
            .collect())
    }
}
