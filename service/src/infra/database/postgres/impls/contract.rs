//! [`Contract`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Date, Money, Percent,
};
use rust_decimal::Decimal;
use tokio_postgres::{types::ToSql, Row};
use tracerr::Traced;

use crate::{
    domain::{
        billing::{Escalation, Schedule},
        contract::{
            self, AdvanceDays, FreeRent, Lease, PaymentDay, PropertyFee,
            TermYears, Terms,
        },
        facade, Contract,
    },
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
    read,
};

/// Columns of the `contracts` table, in the order [`contract_from_row()`]
/// expects them.
const COLUMNS: &str = "\
    id, reference, kind, state, \
    facade_id, operator_id, counterparty_id, \
    property_company_id, landlord_id, \
    currency, rent, first_rent, deposit, decoration_deposit, \
    property_fee, property_area, property_unit_rate, \
    service_fee, cleanup_fee, \
    frequency, payment_day, advance_days, \
    lease_start, lease_term_years, free_rent_first, free_rent_last, \
    escalation_rate, escalation_start_year, escalation_cycle_years, \
    escalation_next_at, escalation_applied_at, escalation_version, \
    next_period_start, next_bill_date, next_period_offset, \
    first_period_ratio, \
    first_rent_billed, deposit_billed, decoration_deposit_billed, \
    created_at, terminated_at";

/// Returns [`postgres::Error::Malformed`] for the provided `column`.
fn malformed(column: &'static str) -> Traced<database::Error> {
    tracerr::new!(database::Error::from(postgres::Error::Malformed(column)))
}

/// Reconstructs a [`Contract`] from the provided `contracts` table [`Row`].
fn contract_from_row(row: &Row) -> Result<Contract, Traced<database::Error>> {
    let currency = row.get("currency");
    let money = |amount: Decimal| Money::new(amount, currency);
    let opt_money =
        |column: &str| row.get::<_, Option<Decimal>>(column).map(money);

    let property_fee = match (
        row.get::<_, Option<Decimal>>("property_fee"),
        row.get::<_, Option<Decimal>>("property_area"),
        row.get::<_, Option<Decimal>>("property_unit_rate"),
    ) {
        (Some(fixed), _, _) => Some(PropertyFee::Fixed(money(fixed))),
        (None, Some(area), Some(rate)) => Some(PropertyFee::PerArea {
            area,
            unit_rate: money(rate),
        }),
        (None, _, _) => None,
    };

    let terms = Terms {
        rent: money(row.get("rent")),
        first_rent: opt_money("first_rent"),
        deposit: opt_money("deposit"),
        decoration_deposit: opt_money("decoration_deposit"),
        property_fee,
        service_fee: opt_money("service_fee"),
        cleanup_fee: opt_money("cleanup_fee"),
        frequency: row.get("frequency"),
        payment_day: u8::try_from(row.get::<_, i16>("payment_day"))
            .ok()
            .and_then(PaymentDay::new)
            .ok_or_else(|| malformed("payment_day"))?,
        advance_days: u16::try_from(row.get::<_, i32>("advance_days"))
            .map(AdvanceDays::from)
            .map_err(|_| malformed("advance_days"))?,
    };

    let lease = match row.get::<_, Option<Date>>("lease_start") {
        Some(start) => Some(Lease {
            start,
            term: row
                .get::<_, Option<i16>>("lease_term_years")
                .and_then(|y| u8::try_from(y).ok())
                .and_then(TermYears::new)
                .ok_or_else(|| malformed("lease_term_years"))?,
            free_rent: match (
                row.get::<_, Option<Date>>("free_rent_first"),
                row.get::<_, Option<Date>>("free_rent_last"),
            ) {
                (Some(first), Some(last)) => Some(
                    FreeRent::new(first, last)
                        .ok_or_else(|| malformed("free_rent_last"))?,
                ),
                (_, _) => None,
            },
        }),
        None => None,
    };

    let escalation = match row.get::<_, Option<Percent>>("escalation_rate") {
        Some(rate) => {
            let year = |column: &'static str| {
                row.get::<_, Option<i32>>(column)
                    .and_then(|y| u16::try_from(y).ok())
                    .ok_or_else(|| malformed(column))
            };
            let mut esc = Escalation::new(
                rate,
                year("escalation_start_year")?,
                year("escalation_cycle_years")?,
            )
            .ok_or_else(|| malformed("escalation_cycle_years"))?;
            esc.next_at = row.get("escalation_next_at");
            esc.applied_at = row.get("escalation_applied_at");
            esc.version = u32::try_from(row.get::<_, i64>("escalation_version"))
                .map_err(|_| malformed("escalation_version"))?;
            Some(esc)
        }
        None => None,
    };

    Ok(Contract {
        id: row.get("id"),
        reference: row.get("reference"),
        kind: row.get("kind"),
        facade_id: row.get("facade_id"),
        operator_id: row.get("operator_id"),
        counterparty_id: row.get("counterparty_id"),
        property_company_id: row.get("property_company_id"),
        landlord_id: row.get("landlord_id"),
        terms,
        lease,
        escalation,
        schedule: Schedule {
            next_period_start: row.get("next_period_start"),
            next_bill_date: row.get("next_bill_date"),
            next_period_offset: u32::try_from(
                row.get::<_, i64>("next_period_offset"),
            )
            .map_err(|_| malformed("next_period_offset"))?,
            first_period_ratio: row.get("first_period_ratio"),
            first_rent_billed: row.get("first_rent_billed"),
            deposit_billed: row.get("deposit_billed"),
            decoration_deposit_billed: row.get("decoration_deposit_billed"),
        },
        state: row.get("state"),
        created_at: row.get("created_at"),
        terminated_at: row.get("terminated_at"),
    })
}

impl<C> Database<Select<By<Option<Contract>, contract::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM contracts \
             WHERE id = $1::UUID"
        );
        self.query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(contract_from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<Contract>, facade::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Contract>, facade::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM contracts \
             WHERE facade_id = $1::UUID \
             ORDER BY created_at DESC, reference"
        );
        self.query(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(contract_from_row)
            .collect()
    }
}

impl<C> Database<Select<By<Vec<read::contract::Due>, read::contract::DueOn>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<read::contract::Due>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<read::contract::Due>, read::contract::DueOn>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::DueOn(today) = by.into_inner();

        const SQL: &str = "\
            SELECT id, reference \
            FROM contracts \
            WHERE state = $1::INT2 \
              AND lease_start IS NOT NULL \
              AND next_bill_date <= $2::DATE \
            ORDER BY next_bill_date, reference";
        Ok(self
            .query(SQL, &[&contract::State::Active, &today])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| read::contract::Due {
                id: row.get("id"),
                reference: row.get("reference"),
            })
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Contract>, read::contract::ExpiringOn>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Contract>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Contract>, read::contract::ExpiringOn>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::contract::ExpiringOn(date) = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM contracts \
             WHERE state = $1::INT2 \
               AND lease_end = $2::DATE \
             ORDER BY reference"
        );
        self.query(sql.as_str(), &[&contract::State::Active, &date])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(contract_from_row)
            .collect()
    }
}

impl Database<Lock<By<Contract, contract::Id>>> for Postgres<postgres::Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Contract, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM contracts \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<contract::Reference, contract::Kind>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = contract::Reference;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<contract::Reference, contract::Kind>>,
    ) -> Result<Self::Ok, Self::Err> {
        let kind = by.into_inner();

        const SQL: &str = "\
            INSERT INTO contract_sequences (kind, value) \
            VALUES ($1::INT2, 1) \
            ON CONFLICT (kind) DO UPDATE \
            SET value = contract_sequences.value + 1 \
            RETURNING value";
        let row = self
            .query_opt(SQL, &[&kind])
            .await
            .map_err(tracerr::wrap!())?
            .ok_or_else(|| malformed("value"))?;
        let seq = u32::try_from(row.get::<_, i32>("value"))
            .map_err(|_| malformed("value"))?;
        Ok(contract::Reference::generate(kind, seq))
    }
}

impl<C> Database<Insert<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(contract))
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Contract>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(contract): Update<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!(
            "INSERT INTO contracts ({WRITTEN_COLUMNS}) \
             VALUES ({WRITTEN_VALUES}) \
             ON CONFLICT (id) DO UPDATE SET \
                reference = EXCLUDED.reference, \
                kind = EXCLUDED.kind, \
                state = EXCLUDED.state, \
                facade_id = EXCLUDED.facade_id, \
                operator_id = EXCLUDED.operator_id, \
                counterparty_id = EXCLUDED.counterparty_id, \
                property_company_id = EXCLUDED.property_company_id, \
                landlord_id = EXCLUDED.landlord_id, \
                currency = EXCLUDED.currency, \
                rent = EXCLUDED.rent, \
                first_rent = EXCLUDED.first_rent, \
                deposit = EXCLUDED.deposit, \
                decoration_deposit = EXCLUDED.decoration_deposit, \
                property_fee = EXCLUDED.property_fee, \
                property_area = EXCLUDED.property_area, \
                property_unit_rate = EXCLUDED.property_unit_rate, \
                service_fee = EXCLUDED.service_fee, \
                cleanup_fee = EXCLUDED.cleanup_fee, \
                frequency = EXCLUDED.frequency, \
                payment_day = EXCLUDED.payment_day, \
                advance_days = EXCLUDED.advance_days, \
                lease_start = EXCLUDED.lease_start, \
                lease_term_years = EXCLUDED.lease_term_years, \
                lease_end = EXCLUDED.lease_end, \
                free_rent_first = EXCLUDED.free_rent_first, \
                free_rent_last = EXCLUDED.free_rent_last, \
                escalation_rate = EXCLUDED.escalation_rate, \
                escalation_start_year = EXCLUDED.escalation_start_year, \
                escalation_cycle_years = EXCLUDED.escalation_cycle_years, \
                escalation_next_at = EXCLUDED.escalation_next_at, \
                escalation_applied_at = EXCLUDED.escalation_applied_at, \
                escalation_version = EXCLUDED.escalation_version, \
                next_period_start = EXCLUDED.next_period_start, \
                next_bill_date = EXCLUDED.next_bill_date, \
                next_period_offset = EXCLUDED.next_period_offset, \
                first_period_ratio = EXCLUDED.first_period_ratio, \
                first_rent_billed = EXCLUDED.first_rent_billed, \
                deposit_billed = EXCLUDED.deposit_billed, \
                decoration_deposit_billed = \
                    EXCLUDED.decoration_deposit_billed, \
                created_at = EXCLUDED.created_at, \
                terminated_at = EXCLUDED.terminated_at"
        );
        write_contract(self, &sql, &contract, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Insert<contract::Version>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(version): Insert<contract::Version>,
    ) -> Result<Self::Ok, Self::Err> {
        let contract::Version {
            contract,
            change,
            actor_id,
            date,
        } = version;

        let sql = format!(
            "INSERT INTO contract_versions (\
                {WRITTEN_COLUMNS}, transition, actor_id, changed_on\
             ) \
             VALUES ({WRITTEN_VALUES}, $43, $44, $45)"
        );
        write_contract(
            self,
            &sql,
            &contract,
            &[&change.transition(), &actor_id, &date],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Vec<contract::Version>, contract::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<contract::Version>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<contract::Version>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS}, transition, actor_id, changed_on \
             FROM contract_versions \
             WHERE id = $1::UUID \
             ORDER BY seq"
        );
        self.query(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| -> Result<_, Traced<database::Error>> {
                Ok(contract::Version {
                    contract: contract_from_row(row)?,
                    change: row
                        .get::<_, Option<contract::Transition>>("transition")
                        .into(),
                    actor_id: row.get("actor_id"),
                    date: row.get("changed_on"),
                })
            })
            .collect()
    }
}

/// Columns written by [`write_contract()`], bound as [`WRITTEN_VALUES`].
const WRITTEN_COLUMNS: &str = "\
    id, reference, kind, state, \
    facade_id, operator_id, counterparty_id, \
    property_company_id, landlord_id, \
    currency, rent, first_rent, deposit, decoration_deposit, \
    property_fee, property_area, property_unit_rate, \
    service_fee, cleanup_fee, \
    frequency, payment_day, advance_days, \
    lease_start, lease_term_years, lease_end, \
    free_rent_first, free_rent_last, \
    escalation_rate, escalation_start_year, \
    escalation_cycle_years, escalation_next_at, \
    escalation_applied_at, escalation_version, \
    next_period_start, next_bill_date, next_period_offset, \
    first_period_ratio, \
    first_rent_billed, deposit_billed, decoration_deposit_billed, \
    created_at, terminated_at";

/// Parameters of [`WRITTEN_COLUMNS`].
const WRITTEN_VALUES: &str = "\
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, \
    $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, \
    $31, $32, $33, $34, $35, $36, $37, $38, $39, $40, \
    $41, $42";

/// Executes the provided `sql` binding the [`WRITTEN_COLUMNS`] of the
/// provided [`Contract`], followed by the `extra` parameters.
async fn write_contract<C: Connection>(
    db: &Postgres<C>,
    sql: &str,
    contract: &Contract,
    extra: &[&(dyn ToSql + Sync)],
) -> Result<u64, Traced<database::Error>> {
    let Contract {
        id,
        reference,
        kind,
        facade_id,
        operator_id,
        counterparty_id,
        property_company_id,
        landlord_id,
        terms,
        lease,
        escalation,
        schedule,
        state,
        created_at,
        terminated_at,
    } = contract;

    let amount = |m: Option<Money>| m.map(|m| m.amount);
    let (property_fee, property_area, property_unit_rate) =
        match &terms.property_fee {
            Some(PropertyFee::Fixed(m)) => (Some(m.amount), None, None),
            Some(PropertyFee::PerArea { area, unit_rate }) => {
                (None, Some(*area), Some(unit_rate.amount))
            }
            None => (None, None, None),
        };
    let currency = terms.currency();
    let first_rent = amount(terms.first_rent);
    let deposit = amount(terms.deposit);
    let decoration_deposit = amount(terms.decoration_deposit);
    let service_fee = amount(terms.service_fee);
    let cleanup_fee = amount(terms.cleanup_fee);
    let payment_day = i16::from(terms.payment_day.get());
    let advance_days = i32::from(u16::from(terms.advance_days));
    let lease_start = lease.map(|l| l.start);
    let lease_term_years = lease.map(|l| i16::from(l.term.get()));
    let lease_end = lease.map(|l| l.end());
    let free_rent = lease.and_then(|l| l.free_rent);
    let free_rent_first = free_rent.map(|f| f.first());
    let free_rent_last = free_rent.map(|f| f.last());
    let escalation_rate = escalation.map(|e| e.rate);
    let escalation_start_year = escalation.map(|e| i32::from(e.start_year));
    let escalation_cycle_years =
        escalation.map(|e| i32::from(e.cycle_years));
    let escalation_next_at = escalation.and_then(|e| e.next_at);
    let escalation_applied_at = escalation.and_then(|e| e.applied_at);
    let escalation_version = escalation.map_or(0, |e| i64::from(e.version));
    let next_period_offset = i64::from(schedule.next_period_offset);

    let mut params: Vec<&(dyn ToSql + Sync)> = vec![
        id,
        reference,
        kind,
        state,
        facade_id,
        operator_id,
        counterparty_id,
        property_company_id,
        landlord_id,
        &currency,
        &terms.rent.amount,
        &first_rent,
        &deposit,
        &decoration_deposit,
        &property_fee,
        &property_area,
        &property_unit_rate,
        &service_fee,
        &cleanup_fee,
        &terms.frequency,
        &payment_day,
        &advance_days,
        &lease_start,
        &lease_term_years,
        &lease_end,
        &free_rent_first,
        &free_rent_last,
        &escalation_rate,
        &escalation_start_year,
        &escalation_cycle_years,
        &escalation_next_at,
        &escalation_applied_at,
        &escalation_version,
        &schedule.next_period_start,
        &schedule.next_bill_date,
        &next_period_offset,
        &schedule.first_period_ratio,
        &schedule.first_rent_billed,
        &schedule.deposit_billed,
        &schedule.decoration_deposit_billed,
        created_at,
        terminated_at,
    ];
    params.extend_from_slice(extra);

    db.exec(sql, &params).await.map_err(tracerr::wrap!())
}
