//! Domain definitions.

pub mod actor;
pub mod billing;
pub mod contract;
pub mod facade;
pub mod notification;
pub mod party;

pub use self::{
    actor::Actor, contract::Contract, facade::Facade,
    notification::Notification,
};
