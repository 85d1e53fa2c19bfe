use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::{RwLock, oneshot};

use crate::model::*;

use super::conflict::check_no_conflict;
use super::validate::{validate_reservation, validate_table};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    pub async fn create_table(&self, new: NewTable) -> Result<Table, EngineError> {
        validate_table(&new)?;
        let _gate = self.commit_gate.read().await;

        let table = Table {
            id: self.next_table_id.fetch_add(1, Ordering::Relaxed),
            name: new.name,
            seats: new.seats,
            location: new.location,
        };
        self.wal_append(&Event::table_created(&table)).await?;
        self.tables
            .insert(table.id, Arc::new(RwLock::new(TableState::new(table.clone()))));
        metrics::gauge!(crate::observability::TABLES_ACTIVE).set(self.tables.len() as f64);
        Ok(table)
    }

    /// Delete a table. Refuses while any reservation still references it;
    /// reservations are never cascaded.
    pub async fn remove_table(&self, id: TableId) -> Result<(), EngineError> {
        let _gate = self.commit_gate.read().await;
        let state = self.table_state(id).ok_or(EngineError::TableNotFound(id))?;
        let mut guard = state.write().await;
        if guard.deleted {
            return Err(EngineError::TableNotFound(id));
        }
        if !guard.reservations.is_empty() {
            return Err(EngineError::TableHasReservations {
                table_id: id,
                count: guard.reservations.len(),
            });
        }

        self.wal_append(&Event::TableDeleted { id }).await?;
        guard.deleted = true;
        self.tables.remove(&id);
        metrics::gauge!(crate::observability::TABLES_ACTIVE).set(self.tables.len() as f64);
        Ok(())
    }

    /// Admit a reservation: table existence, overlap check and insert all run
    /// under the table's write lock, so two admissions for overlapping
    /// intervals can never both succeed.
    pub async fn admit_reservation(&self, new: NewReservation) -> Result<Reservation, EngineError> {
        let new = validate_reservation(new)?;
        let span = new.span();

        let _gate = self.commit_gate.read().await;
        let state = self
            .table_state(new.table_id)
            .ok_or(EngineError::TableNotFound(new.table_id))?;
        let mut guard = state.write().await;
        if guard.deleted {
            return Err(EngineError::TableNotFound(new.table_id));
        }
        check_no_conflict(&guard, span)?;

        let reservation = Reservation {
            id: self.next_reservation_id.fetch_add(1, Ordering::Relaxed),
            customer_name: new.customer_name,
            table_id: new.table_id,
            reservation_time: new.reservation_time,
            duration_minutes: new.duration_minutes,
        };
        self.persist_and_apply(&mut guard, &Event::reservation_created(&reservation))
            .await?;
        Ok(reservation)
    }

    /// Remove a reservation, returning it. Unknown ids are NotFound every time.
    pub async fn cancel_reservation(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        let _gate = self.commit_gate.read().await;
        let table_id = self
            .reservation_index
            .get(&id)
            .map(|e| *e.value())
            .ok_or(EngineError::ReservationNotFound(id))?;
        let state = self
            .table_state(table_id)
            .ok_or(EngineError::ReservationNotFound(id))?;
        let mut guard = state.write().await;
        let existing = guard
            .reservations
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(EngineError::ReservationNotFound(id))?;

        self.persist_and_apply(&mut guard, &Event::ReservationDeleted { id, table_id })
            .await?;
        Ok(existing)
    }

    /// Rewrite the WAL as an id watermark plus the live tables and reservations.
    /// Holds the commit gate exclusively, so the snapshot matches the log.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _exclusive = self.commit_gate.write().await;

        let mut events = vec![Event::IdWatermark {
            next_table_id: self.next_table_id.load(Ordering::Relaxed),
            next_reservation_id: self.next_reservation_id.load(Ordering::Relaxed),
        }];
        for (_, state) in self.table_states() {
            let guard = state.read().await;
            events.push(Event::table_created(&guard.table));
            events.extend(guard.reservations.iter().map(Event::reservation_created));
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
