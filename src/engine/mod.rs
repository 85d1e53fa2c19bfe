mod conflict;
mod error;
mod mutations;
mod queries;
mod store;
mod validate;
#[cfg(test)]
mod tests;

pub use conflict::overlaps;
pub use error::{EngineError, ErrorKind};
pub use store::{ReservationStore, TableStore};
pub use validate::{validate_reservation, validate_table};

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::{RwLock, mpsc, oneshot};

use crate::config::Config;
use crate::model::*;
use crate::wal::Wal;

pub type SharedTableState = Arc<RwLock<TableState>>;

const WAL_CHANNEL_CAPACITY: usize = 4096;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Drain every Append already queued behind it.
/// 3. One flush_sync for the whole batch, then answer every sender.
/// A non-append command ends the batch; it runs after the batch is flushed.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_non_append(&mut wal, other);
                continue;
            }
        };

        let mut batch = vec![(event, response)];
        let mut deferred = None;
        while let Ok(next) = rx.try_recv() {
            match next {
                WalCommand::Append { event, response } => batch.push((event, response)),
                other => {
                    deferred = Some(other);
                    break;
                }
            }
        }

        commit_batch(&mut wal, &mut batch);
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<PendingAppend>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::error!(error = %e, batch = batch.len(), "WAL flush failed");
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[PendingAppend]) -> io::Result<()> {
    let append_err = batch
        .iter()
        .find_map(|(event, _)| wal.append_buffered(event).err());
    // Flush even after an append error so a half-buffered batch does not
    // leak into the next one; every sender in this batch is told it failed.
    let flush_err = wal.flush_sync().err();
    match append_err.or(flush_err) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// The entity store: tables and their reservations, durable through the WAL.
///
/// Every table's state sits behind its own lock, so the overlap check and the
/// insert that follows it run as one critical section per table while other
/// tables proceed untouched.
pub struct Engine {
    tables: DashMap<TableId, SharedTableState>,
    /// Reverse lookup: reservation id → table id.
    reservation_index: DashMap<ReservationId, TableId>,
    next_table_id: AtomicU64,
    next_reservation_id: AtomicU64,
    /// Held shared by every write, exclusively by compaction.
    /// Always taken before any table lock.
    commit_gate: RwLock<()>,
    wal_tx: mpsc::Sender<WalCommand>,
}

/// Apply a reservation event to its table (caller holds the table lock).
fn apply_to_table(
    ts: &mut TableState,
    event: &Event,
    index: &DashMap<ReservationId, TableId>,
) {
    match event {
        Event::ReservationCreated {
            id,
            table_id,
            customer_name,
            reservation_time,
            duration_minutes,
        } => {
            ts.insert_reservation(Reservation {
                id: *id,
                customer_name: customer_name.clone(),
                table_id: *table_id,
                reservation_time: *reservation_time,
                duration_minutes: *duration_minutes,
            });
            index.insert(*id, *table_id);
        }
        Event::ReservationDeleted { id, .. } => {
            ts.remove_reservation(*id);
            index.remove(id);
        }
        // Table rows and id watermarks are handled at the map level
        Event::TableCreated { .. } | Event::TableDeleted { .. } | Event::IdWatermark { .. } => {}
    }
}

impl Engine {
    /// Open the store from the WAL at `wal_path`, replaying it into memory.
    /// Must be called inside a tokio runtime (spawns the WAL writer).
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(WAL_CHANNEL_CAPACITY);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            tables: DashMap::new(),
            reservation_index: DashMap::new(),
            next_table_id: AtomicU64::new(1),
            next_reservation_id: AtomicU64::new(1),
            commit_gate: RwLock::new(()),
            wal_tx,
        };

        // Replay into plain state first; nothing else can see it yet.
        let mut replayed: HashMap<TableId, TableState> = HashMap::new();
        for event in &events {
            match event {
                Event::TableCreated {
                    id,
                    name,
                    seats,
                    location,
                } => {
                    let table = Table {
                        id: *id,
                        name: name.clone(),
                        seats: *seats,
                        location: location.clone(),
                    };
                    replayed.insert(*id, TableState::new(table));
                    engine.next_table_id.fetch_max(id + 1, Ordering::Relaxed);
                }
                Event::TableDeleted { id } => {
                    replayed.remove(id);
                }
                Event::IdWatermark {
                    next_table_id,
                    next_reservation_id,
                } => {
                    engine.next_table_id.fetch_max(*next_table_id, Ordering::Relaxed);
                    engine
                        .next_reservation_id
                        .fetch_max(*next_reservation_id, Ordering::Relaxed);
                }
                Event::ReservationCreated { id, table_id, .. }
                | Event::ReservationDeleted { id, table_id } => {
                    engine.next_reservation_id.fetch_max(id + 1, Ordering::Relaxed);
                    match replayed.get_mut(table_id) {
                        Some(ts) => apply_to_table(ts, event, &engine.reservation_index),
                        None => tracing::warn!(
                            reservation_id = id,
                            table_id,
                            "replay: reservation event for unknown table, skipped"
                        ),
                    }
                }
            }
        }

        for (id, ts) in replayed {
            engine.tables.insert(id, Arc::new(RwLock::new(ts)));
        }
        metrics::gauge!(crate::observability::TABLES_ACTIVE).set(engine.tables.len() as f64);

        Ok(engine)
    }

    /// Open the store under `config.data_dir`, creating the directory.
    pub fn open(config: &Config) -> io::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        Self::new(config.wal_path())
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append, then apply. A failed append leaves memory untouched.
    pub(super) async fn persist_and_apply(
        &self,
        ts: &mut TableState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.wal_append(event).await?;
        apply_to_table(ts, event, &self.reservation_index);
        Ok(())
    }

    pub(super) fn table_state(&self, id: TableId) -> Option<SharedTableState> {
        self.tables.get(&id).map(|e| e.value().clone())
    }

    /// Snapshot of every table's shared state, ordered by table id.
    /// The map guard is released before any table lock is awaited.
    pub(super) fn table_states(&self) -> Vec<(TableId, SharedTableState)> {
        let mut states: Vec<_> = self
            .tables
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        states.sort_by_key(|(id, _)| *id);
        states
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}
