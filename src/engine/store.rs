use async_trait::async_trait;

use crate::model::*;

use super::{Engine, EngineError};

/// Persistence capabilities for tables.
///
/// `insert_table` and `delete_table` enforce the table constraints themselves:
/// attribute bounds on insert, and on delete the referential guard (no
/// reservation may point at a deleted table).
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn get_table(&self, id: TableId) -> Result<Option<Table>, EngineError>;

    async fn list_tables(&self) -> Result<Vec<Table>, EngineError>;

    async fn insert_table(&self, new: NewTable) -> Result<Table, EngineError>;

    async fn delete_table(&self, id: TableId) -> Result<(), EngineError>;
}

/// Persistence capabilities for reservations.
///
/// `insert_reservation` re-checks table existence and interval overlap
/// atomically with the write, so a concurrent conflicting insert surfaces as
/// `EngineError::Overlap` instead of succeeding.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>, EngineError>;

    async fn list_reservations(&self) -> Result<Vec<Reservation>, EngineError>;

    /// `None` when the table does not exist.
    async fn reservations_for_table(
        &self,
        table_id: TableId,
    ) -> Result<Option<Vec<Reservation>>, EngineError>;

    async fn insert_reservation(&self, new: NewReservation) -> Result<Reservation, EngineError>;

    async fn delete_reservation(&self, id: ReservationId) -> Result<(), EngineError>;

    async fn find_conflicting(
        &self,
        table_id: TableId,
        span: Span,
    ) -> Result<Vec<Reservation>, EngineError>;
}

#[async_trait]
impl TableStore for Engine {
    async fn get_table(&self, id: TableId) -> Result<Option<Table>, EngineError> {
        Ok(self.table(id).await)
    }

    async fn list_tables(&self) -> Result<Vec<Table>, EngineError> {
        Ok(self.tables().await)
    }

    async fn insert_table(&self, new: NewTable) -> Result<Table, EngineError> {
        self.create_table(new).await
    }

    async fn delete_table(&self, id: TableId) -> Result<(), EngineError> {
        self.remove_table(id).await
    }
}

#[async_trait]
impl ReservationStore for Engine {
    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>, EngineError> {
        Ok(self.reservation(id).await)
    }

    async fn list_reservations(&self) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.reservations().await)
    }

    async fn reservations_for_table(
        &self,
        table_id: TableId,
    ) -> Result<Option<Vec<Reservation>>, EngineError> {
        Ok(self.table_reservations(table_id).await)
    }

    async fn insert_reservation(&self, new: NewReservation) -> Result<Reservation, EngineError> {
        self.admit_reservation(new).await
    }

    async fn delete_reservation(&self, id: ReservationId) -> Result<(), EngineError> {
        self.cancel_reservation(id).await.map(|_| ())
    }

    async fn find_conflicting(
        &self,
        table_id: TableId,
        span: Span,
    ) -> Result<Vec<Reservation>, EngineError> {
        Ok(self.conflicts(table_id, span).await)
    }
}
