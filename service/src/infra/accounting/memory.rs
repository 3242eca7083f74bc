//! In-memory [`Accounting`] implementation.

use std::sync::Arc;

use common::operations::Post;
use tokio::sync::Mutex;
use tracerr::Traced;

use crate::{
    domain::billing::{DocumentRef, Event},
    infra::accounting::{self, Accounting},
};

/// In-memory [`Accounting`] ledger.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Shared [`Ledger`].
    ledger: Arc<Mutex<Ledger>>,
}

/// Contents of a [`Memory`] [`Accounting`] ledger.
#[derive(Debug, Default)]
struct Ledger {
    /// Posted [`Document`]s.
    documents: Vec<Document>,

    /// Indicator whether postings fail with [`accounting::Error::Unavailable`].
    unavailable: bool,
}

/// Document posted to a [`Memory`] [`Accounting`] ledger.
#[derive(Clone, Debug)]
pub struct Document {
    /// [`DocumentRef`] of this [`Document`].
    pub reference: DocumentRef,

    /// Posted [`Event`].
    pub event: Event,
}

impl Memory {
    /// Creates a new empty [`Memory`] ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes further postings to fail (or succeed again).
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.ledger.lock().await.unavailable = unavailable;
    }

    /// Returns all the posted [`Document`]s.
    pub async fn documents(&self) -> Vec<Document> {
        self.ledger.lock().await.documents.clone()
    }
}

impl Accounting<Post<Event>> for Memory {
    type Ok = DocumentRef;
    type Err = Traced<accounting::Error>;

    async fn execute(
        &self,
        Post(event): Post<Event>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut ledger = self.ledger.lock().await;
        if ledger.unavailable {
            return Err(tracerr::new!(accounting::Error::Unavailable));
        }
        if let Some(existing) =
            ledger.documents.iter().find(|d| d.event.key == event.key)
        {
            return Ok(existing.reference);
        }

        let reference = DocumentRef::new();
        ledger.documents.push(Document { reference, event });
        Ok(reference)
    }
}
