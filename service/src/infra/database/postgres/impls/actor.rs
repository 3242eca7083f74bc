//! [`actor::Grant`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::actor,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<actor::Grant>, (actor::Id, actor::Role)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<actor::Grant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<actor::Grant>, (actor::Id, actor::Role)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (actor_id, role) = by.into_inner();

        const SQL: &str = "\
            SELECT actor_id \
            FROM actor_grants \
            WHERE actor_id = $1::UUID \
              AND role = $2::INT2";
        Ok(self
            .query_opt(SQL, &[&actor_id, &role])
            .await
            .map_err(tracerr::wrap!())?
            .map(|_| actor::Grant { actor_id, role }))
    }
}
