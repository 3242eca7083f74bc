//! [`billing::Entry`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Select},
    Money, Period,
};
use tracerr::Traced;

use crate::{
    domain::{billing, contract},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<billing::Entry>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<billing::Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            INSERT INTO billing_entries (\
                key, contract_id, fee, period_start, period_end, \
                currency, amount, document_id\
            ) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
            ON CONFLICT (key) DO NOTHING";
        self.exec(
            SQL,
            &[
                &entry.key,
                &entry.contract_id,
                &entry.fee,
                &entry.period.start,
                &entry.period.end,
                &entry.amount.currency,
                &entry.amount.amount,
                &entry.document,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<billing::Entry>, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<billing::Entry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<billing::Entry>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let contract_id = by.into_inner();

        const SQL: &str = "\
            SELECT key, fee, period_start, period_end, \
                   currency, amount, document_id \
            FROM billing_entries \
            WHERE contract_id = $1::UUID \
            ORDER BY period_start, fee";
        Ok(self
            .query(SQL, &[&contract_id])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| billing::Entry {
                key: row.get("key"),
                contract_id,
                fee: row.get("fee"),
                period: Period {
                    start: row.get("period_start"),
                    end: row.get("period_end"),
                },
                amount: Money::new(row.get("amount"), row.get("currency")),
                document: row.get("document_id"),
            })
            .collect())
    }
}
