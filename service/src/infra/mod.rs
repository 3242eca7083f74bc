//! Infrastructure layer.

pub mod accounting;
pub mod database;

pub use self::{accounting::Accounting, database::Database};
#[cfg(any(test, feature = "memory"))]
pub use self::database::{memory, Memory};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
