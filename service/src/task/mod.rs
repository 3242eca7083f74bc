//! Background [`Task`]s definitions.

mod background;
pub mod bill_due_contracts;
pub mod remind_expiring_contracts;

pub use common::Handler as Task;

pub use self::{
    background::{Background, Failure as BackgroundFailure},
    bill_due_contracts::BillDueContracts,
    remind_expiring_contracts::RemindExpiringContracts,
};
