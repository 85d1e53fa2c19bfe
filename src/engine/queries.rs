use crate::model::*;

use super::Engine;

impl Engine {
    pub async fn table(&self, id: TableId) -> Option<Table> {
        let state = self.table_state(id)?;
        let guard = state.read().await;
        (!guard.deleted).then(|| guard.table.clone())
    }

    /// All tables, ascending by id.
    pub async fn tables(&self) -> Vec<Table> {
        let mut tables = Vec::with_capacity(self.tables.len());
        for (_, state) in self.table_states() {
            let guard = state.read().await;
            if !guard.deleted {
                tables.push(guard.table.clone());
            }
        }
        tables
    }

    pub async fn reservation(&self, id: ReservationId) -> Option<Reservation> {
        let table_id = *self.reservation_index.get(&id)?.value();
        let state = self.table_state(table_id)?;
        let guard = state.read().await;
        guard.reservations.iter().find(|r| r.id == id).cloned()
    }

    /// All reservations across all tables, ascending by id.
    pub async fn reservations(&self) -> Vec<Reservation> {
        let mut all = Vec::new();
        for (_, state) in self.table_states() {
            let guard = state.read().await;
            all.extend(guard.reservations.iter().cloned());
        }
        all.sort_by_key(|r| r.id);
        all
    }

    /// Reservations on one table, ascending by id. `None` if the table is absent.
    pub async fn table_reservations(&self, table_id: TableId) -> Option<Vec<Reservation>> {
        let state = self.table_state(table_id)?;
        let guard = state.read().await;
        if guard.deleted {
            return None;
        }
        let mut reservations = guard.reservations.clone();
        reservations.sort_by_key(|r| r.id);
        Some(reservations)
    }

    /// Reservations on `table_id` overlapping `span`, in start order.
    pub async fn conflicts(&self, table_id: TableId, span: Span) -> Vec<Reservation> {
        let Some(state) = self.table_state(table_id) else {
            return Vec::new();
        };
        let guard = state.read().await;
        guard.overlapping(span).cloned().collect()
    }
}
