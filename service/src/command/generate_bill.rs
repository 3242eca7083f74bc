//! [`Command`] for billing the next period of a [`Contract`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Post, Select, Transact, Transacted, Update,
    },
    Date, Period,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        billing::{
            self,
            fee::{self, Assembly, NothingToBill},
            DocumentRef, IdempotencyKey, Ratio,
        },
        contract::{self, State},
        Contract,
    },
    infra::{accounting, database, Accounting, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::{
    billing::{Journal, Schedule},
    contract::Lease,
};

use super::Command;

/// [`Command`] for billing the next period of a [`Contract`] whose bill is
/// due.
///
/// The whole billing happens inside a single [`Database`] transaction
/// holding the [`Contract`] locked, so a failed posting leaves the
/// [`Schedule`] untouched.
#[derive(Clone, Copy, Debug)]
pub struct GenerateBill {
    /// ID of the [`Contract`] to bill.
    pub contract_id: contract::Id,

    /// [`Date`] the billing happens on.
    pub today: Date,
}

/// Outcome of a [`GenerateBill`] [`Command`].
#[derive(Clone, Debug)]
pub enum Outcome {
    /// [`billing::Event`] has been posted to the [`Accounting`] system.
    Billed {
        /// [`DocumentRef`] of the posted accounting document.
        document: DocumentRef,

        /// Posted [`billing::Event`].
        event: billing::Event,
    },

    /// Rent-free period has been skipped without billing.
    Skipped {
        /// Skipped [`Period`].
        period: Period,
    },
}

impl<Db, Acc> Command<GenerateBill> for Service<Db, Acc>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Contract, contract::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<billing::Entry>, contract::Id>>,
            Ok = Vec<billing::Entry>,
            Err = Traced<database::Error>,
        > + Database<Insert<billing::Entry>, Err = Traced<database::Error>>
        + Database<Update<Contract>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Acc: Accounting<
        Post<billing::Event>,
        Ok = DocumentRef,
        Err = Traced<accounting::Error>,
    >,
{
    type Ok = Outcome;
    type Err = Traced<ExecutionError>;

    #[expect(clippy::too_many_lines, reason = "still readable")]
    async fn execute(&self, cmd: GenerateBill) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let GenerateBill { contract_id, today } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent billing of the same `Contract`.
        tx.execute(Lock(By::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        let lease = match contract.lease {
            Some(lease) if contract.state == State::Active => lease,
            Some(_) | None => {
                return Err(tracerr::new!(E::InvalidState(
                    contract.reference,
                    contract.state,
                )));
            }
        };
        let period = contract
            .schedule
            .next_period(&lease, &contract.terms)
            .filter(|_| contract.is_due(today))
            .ok_or_else(|| E::NotYetDue(contract.reference.clone()))
            .map_err(tracerr::wrap!())?;

        let first_period = period.start == lease.start;
        let ratio = match contract.schedule.first_period_ratio {
            Some(ratio) if first_period => ratio,
            Some(_) | None => Ratio::of(period, lease.free_rent.as_ref()),
        };

        if let Some(esc) = &mut contract.escalation {
            if let Some(rent) = esc.apply(period.start, contract.terms.rent) {
                log::info!(
                    "`Contract({})` rent escalated from {} to {rent}",
                    contract.reference,
                    contract.terms.rent,
                );
                contract.terms.rent = rent;
            }
        }

        let cleanup_fee_billed = tx
            .execute(Select(By::<Vec<billing::Entry>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .iter()
            .any(|e| e.fee == fee::Kind::CleanupFee);

        let assembled = Assembly {
            terms: &contract.terms,
            schedule: &contract.schedule,
            first_period,
            ratio,
            cleanup_fee: self.config().billing.cleanup_fee,
            cleanup_fee_billed,
        }
        .lines();
        let lines = match assembled {
            Ok(lines) => lines,
            // Fully rent-free period without pending one-time fees.
            Err(NothingToBill) if ratio.is_zero() => {
                contract.schedule.advance(&lease, &contract.terms);

                tx.execute(Update(contract.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                tx.execute(Commit)
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;

                log::info!(
                    "`Contract({})` period {period} is rent-free, skipped",
                    contract.reference,
                );
                return Ok(Outcome::Skipped { period });
            }
            Err(NothingToBill) => {
                return Err(tracerr::new!(E::NothingToBill(
                    contract.reference.clone(),
                )));
            }
        };

        let flow = contract
            .flow()
            .ok_or(E::ConfigurationMissing("payee party"))
            .map_err(tracerr::wrap!())?;
        let journal = self
            .config()
            .billing
            .journal(flow.direction)
            .cloned()
            .ok_or(E::ConfigurationMissing(match flow.direction {
                billing::Direction::Receivable => "receivable journal",
                billing::Direction::Payable => "payable journal",
            }))
            .map_err(tracerr::wrap!())?;

        let due_date = contract.terms.payment_day.on_or_after(period.start);
        let event = billing::Event {
            key: IdempotencyKey::of_bill(contract.id, period.start),
            contract_id,
            reference: contract.reference.clone(),
            facade_id: contract.facade_id,
            flow,
            journal,
            period,
            due_date: due_date.coerce(),
            lines,
        };

        let document = self
            .accounting()
            .execute(Post(event.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        for line in &event.lines {
            tx.execute(Insert(billing::Entry {
                key: event.line_key(line),
                contract_id,
                fee: line.kind,
                period,
                amount: line.amount,
                document,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        }

        contract.schedule.record(&event.lines, first_period);
        contract.schedule.advance(&lease, &contract.terms);

        tx.execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Contract({})` billed for {period} with `Document({document})`",
            contract.reference,
        );

        Ok(Outcome::Billed { document, event })
    }
}

/// Error of [`GenerateBill`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Accounting`] system failed to post the bill.
    #[display("`Accounting` posting failed: {_0}")]
    #[from]
    Accounting(accounting::Error),

    /// Billing configuration lacks a required value.
    #[display("Cannot bill: {_0} is not configured")]
    ConfigurationMissing(#[error(not(source))] &'static str),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] cannot be billed in its current [`State`].
    #[display(
        "Cannot bill `Contract({_0})` in `{_1}` state, required: `active` \
         with a `Lease`"
    )]
    InvalidState(
        #[error(not(source))] contract::Reference,
        #[error(not(source))] State,
    ),

    /// There is no positive amount to bill.
    #[display("`Contract({_0})` has nothing to bill")]
    NothingToBill(#[error(not(source))] contract::Reference),

    /// Next bill of the [`Contract`] is not due yet.
    #[display("`Contract({_0})` bill is not due yet")]
    NotYetDue(#[error(not(source))] contract::Reference),
}
