use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::{EngineError, ReservationStore, TableStore, validate_table};
use crate::model::*;

use super::run_detached;

pub struct TableService<S> {
    store: Arc<S>,
}

impl<S> Clone for TableService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> TableService<S>
where
    S: TableStore + ReservationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create_table(&self, new: NewTable) -> Result<Table, EngineError> {
        validate_table(&new)?;
        let store = Arc::clone(&self.store);
        let table = run_detached(async move { store.insert_table(new).await }).await?;
        info!(table_id = table.id, name = %table.name, seats = table.seats, "table created");
        Ok(table)
    }

    pub async fn get_table(&self, id: TableId) -> Result<Table, EngineError> {
        self.store
            .get_table(id)
            .await?
            .ok_or(EngineError::TableNotFound(id))
    }

    pub async fn list_tables(&self) -> Result<Vec<Table>, EngineError> {
        self.store.list_tables().await
    }

    /// Delete a table that no reservation references. The store repeats the
    /// guard under the table lock, covering admissions that land in between.
    pub async fn delete_table(&self, id: TableId) -> Result<(), EngineError> {
        let reservations = self
            .store
            .reservations_for_table(id)
            .await?
            .ok_or(EngineError::TableNotFound(id))?;
        if !reservations.is_empty() {
            debug!(table_id = id, count = reservations.len(), "delete refused: active reservations");
            return Err(EngineError::TableHasReservations {
                table_id: id,
                count: reservations.len(),
            });
        }

        let store = Arc::clone(&self.store);
        run_detached(async move { store.delete_table(id).await }).await?;
        info!(table_id = id, "table deleted");
        Ok(())
    }
}
