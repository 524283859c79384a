use tracing::instrument;

use crate::driver::{Connection, SqlValue};
use crate::error::Result;
use crate::model::{Authorization, Query};
use crate::statement::{AggregateFn, Outcome};
use crate::Adapter;

fn total(outcome: &Outcome) -> Option<&SqlValue> {
    outcome.rows.first().and_then(|row| row.get("total"))
}

impl<C: Connection> Adapter<C> {
    fn aggregate(
        &mut self,
        collection: &str,
        function: AggregateFn,
        authorization: &Authorization,
        queries: &[Query],
        max: Option<u64>,
    ) -> Result<Outcome> {
        let table = self.table(collection)?;
        let conditions = self.read_conditions(authorization, queries)?;

        self.run(|stmt| {
            stmt.aggregate(table, function)?;
            for condition in conditions {
                stmt.filter(condition);
            }
            if let Some(max) = max {
                stmt.limit(max);
            }
            Ok(())
        })
    }

    /// Number of readable documents matching `queries`.
    ///
    /// With `max`, at most that many rows are scanned: the result is exact up
    /// to the cap and never larger than it.
    #[instrument(skip_all, fields(collection = %collection, max = ?max))]
    pub fn count(
        &mut self,
        collection: &str,
        authorization: &Authorization,
        queries: &[Query],
        max: Option<u64>,
    ) -> Result<u64> {
        let outcome = self.aggregate(collection, AggregateFn::Count, authorization, queries, max)?;
        Ok(total(&outcome).and_then(SqlValue::as_i64).unwrap_or(0).max(0) as u64)
    }

    /// Sum of `attribute` over readable documents matching `queries`; 0 for
    /// an empty set. `max` caps the scanned rows as in [`Adapter::count`].
    #[instrument(skip_all, fields(collection = %collection, attribute = %attribute, max = ?max))]
    pub fn sum(
        &mut self,
        collection: &str,
        attribute: &str,
        authorization: &Authorization,
        queries: &[Query],
        max: Option<u64>,
    ) -> Result<f64> {
        let function = AggregateFn::Sum(attribute.to_string());
        let outcome = self.aggregate(collection, function, authorization, queries, max)?;
        Ok(total(&outcome).and_then(SqlValue::as_f64).unwrap_or(0.0))
    }
}
