//! [`Postgres`]-backed [`Accounting`] implementation.
//!
//! Documents are stored in the `accounting_documents` journal tables, which
//! are exported to the accounting system.

use common::operations::{Commit, Post, Transact};
use tracerr::Traced;

use crate::{
    domain::billing::{DocumentRef, Event},
    infra::{
        accounting::{self, Accounting},
        database::{
            postgres::{Connection as _, NonTx},
            Postgres,
        },
        Database as _,
    },
};

impl Accounting<Post<Event>> for Postgres<NonTx> {
    type Ok = DocumentRef;
    type Err = Traced<accounting::Error>;

    async fn execute(
        &self,
        Post(event): Post<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        let total = event
            .total()
            .ok_or_else(|| tracerr::new!(accounting::Error::MixedCurrencies))?;

        let tx = self
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> accounting::Error))?;

        #[expect(clippy::items_after_statements, reason = "more readable")]
        const INSERT_DOCUMENT: &str = "\
            WITH inserted AS (\
                INSERT INTO accounting_documents (\
                    id, idempotency_key, contract_id, reference, journal, \
                    direction, payer_id, payee_id, \
                    period_start, period_end, due_date, \
                    currency, total\
                ) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, \
                        $9, $10, $11, $12, $13) \
                ON CONFLICT (idempotency_key) DO NOTHING \
                RETURNING id\
            ) \
            SELECT id, TRUE AS created FROM inserted \
            UNION ALL \
            SELECT id, FALSE AS created \
            FROM accounting_documents \
            WHERE idempotency_key = $2 \
            LIMIT 1";
        let row = tx
            .query_opt(
                INSERT_DOCUMENT,
                &[
                    &DocumentRef::new(),
                    &event.key,
                    &event.contract_id,
                    &event.reference,
                    &event.journal,
                    &event.flow.direction,
                    &event.flow.payer,
                    &event.flow.payee,
                    &event.period.start,
                    &event.period.end,
                    &event.due_date,
                    &total.currency,
                    &total.amount,
                ],
            )
            .await
            .map_err(tracerr::map_from_and_wrap!(=> accounting::Error))?
            .ok_or_else(|| tracerr::new!(accounting::Error::Conflict))?;
        let document: DocumentRef = row.get("id");
        if !row.get::<_, bool>("created") {
            // Already posted, so the existing document is reused.
            return Ok(document);
        }

        #[expect(clippy::items_after_statements, reason = "more readable")]
        const INSERT_LINE: &str = "\
            INSERT INTO accounting_document_lines (\
                document_id, position, fee, label, amount\
            ) \
            VALUES ($1, $2::INT2, $3, $4, $5)";
        for (position, line) in (1_i16..).zip(&event.lines) {
            _ = tx
                .exec(
                    INSERT_LINE,
                    &[
                        &document,
                        &position,
                        &line.kind,
                        &line.kind.label(),
                        &line.amount.amount,
                    ],
                )
                .await
                .map_err(tracerr::map_from_and_wrap!(=> accounting::Error))?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> accounting::Error))?;

        Ok(document)
    }
}
