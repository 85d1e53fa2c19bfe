use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::{EngineError, ReservationStore, TableStore, validate_reservation};
use crate::model::*;

use super::run_detached;

pub struct ReservationService<S> {
    store: Arc<S>,
}

impl<S> Clone for ReservationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ReservationService<S>
where
    S: TableStore + ReservationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Admit a reservation. Nothing is written unless the table exists and
    /// the interval is free; the store re-runs both checks atomically with
    /// the insert.
    pub async fn create_reservation(&self, new: NewReservation) -> Result<Reservation, EngineError> {
        let new = validate_reservation(new)?;

        if self.store.get_table(new.table_id).await?.is_none() {
            debug!(table_id = new.table_id, "admission refused: unknown table");
            return Err(EngineError::TableNotFound(new.table_id));
        }
        let conflicting = self.store.find_conflicting(new.table_id, new.span()).await?;
        if let Some(existing) = conflicting.first() {
            debug!(
                table_id = new.table_id,
                conflicting = existing.id,
                "admission refused: interval overlaps"
            );
            return Err(EngineError::Overlap {
                table_id: new.table_id,
                conflicting: existing.id,
            });
        }

        let store = Arc::clone(&self.store);
        let reservation = run_detached(async move { store.insert_reservation(new).await }).await?;
        info!(
            reservation_id = reservation.id,
            table_id = reservation.table_id,
            start = %reservation.reservation_time,
            minutes = reservation.duration_minutes,
            "reservation created"
        );
        Ok(reservation)
    }

    pub async fn get_reservation(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        self.store
            .get_reservation(id)
            .await?
            .ok_or(EngineError::ReservationNotFound(id))
    }

    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, EngineError> {
        self.store.list_reservations().await
    }

    pub async fn list_table_reservations(
        &self,
        table_id: TableId,
    ) -> Result<Vec<Reservation>, EngineError> {
        self.store
            .reservations_for_table(table_id)
            .await?
            .ok_or(EngineError::TableNotFound(table_id))
    }

    pub async fn delete_reservation(&self, id: ReservationId) -> Result<(), EngineError> {
        if self.store.get_reservation(id).await?.is_none() {
            return Err(EngineError::ReservationNotFound(id));
        }
        let store = Arc::clone(&self.store);
        run_detached(async move { store.delete_reservation(id).await }).await?;
        info!(reservation_id = id, "reservation deleted");
        Ok(())
    }
}
