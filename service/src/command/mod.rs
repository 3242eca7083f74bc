//! [`Command`] definition.

pub mod create_contract;
pub mod generate_bill;
pub mod transit_contract;
pub mod update_contract;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    create_contract::CreateContract, generate_bill::GenerateBill,
    transit_contract::TransitContract, update_contract::UpdateContract,
};
