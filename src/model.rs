use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Unix milliseconds, UTC. All interval arithmetic happens in this unit.
pub type Ms = i64;

pub const MS_PER_MINUTE: Ms = 60_000;

pub type TableId = u64;
pub type ReservationId = u64;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// The span occupied by a booking of `minutes` starting at `start`.
    pub fn starting_at(start: DateTime<Utc>, minutes: u32) -> Self {
        let start = start.timestamp_millis();
        Self::new(start, start + Ms::from(minutes) * MS_PER_MINUTE)
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub seats: u32,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTable {
    pub name: String,
    pub seats: u32,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub customer_name: String,
    pub table_id: TableId,
    pub reservation_time: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl Reservation {
    /// Exclusive end of the occupied interval.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.reservation_time + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn span(&self) -> Span {
        Span::starting_at(self.reservation_time, self.duration_minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    pub customer_name: String,
    pub table_id: TableId,
    #[serde(deserialize_with = "deserialize_utc")]
    pub reservation_time: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl NewReservation {
    pub fn span(&self) -> Span {
        Span::starting_at(self.reservation_time, self.duration_minutes)
    }
}

/// Accept RFC 3339 with any offset, or a naive ISO 8601 datetime read as UTC.
pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp {raw:?}: expected RFC 3339 or ISO 8601"))
}

fn deserialize_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_utc(&raw).map_err(serde::de::Error::custom)
}

// ── Per-table state ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TableState {
    pub table: Table,
    /// Reservations on this table, sorted by `reservation_time`.
    pub reservations: Vec<Reservation>,
    /// Set under the write lock when the table is deleted, so writers that
    /// were queued on the lock see the deletion.
    pub deleted: bool,
}

impl TableState {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            reservations: Vec::new(),
            deleted: false,
        }
    }

    /// Insert reservation maintaining sort order by start.
    pub fn insert_reservation(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .binary_search_by_key(&reservation.reservation_time, |r| r.reservation_time)
            .unwrap_or_else(|e| e);
        self.reservations.insert(pos, reservation);
    }

    pub fn remove_reservation(&mut self, id: ReservationId) -> Option<Reservation> {
        let pos = self.reservations.iter().position(|r| r.id == id)?;
        Some(self.reservations.remove(pos))
    }

    pub fn contains_reservation(&self, id: ReservationId) -> bool {
        self.reservations.iter().any(|r| r.id == id)
    }

    /// Reservations whose span overlaps the query window.
    /// Binary search skips everything starting at or after `query.end`.
    pub fn overlapping(&self, query: Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.reservation_time.timestamp_millis() < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.span().end > query.start)
    }
}

/// The WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    TableCreated {
        id: TableId,
        name: String,
        seats: u32,
        location: String,
    },
    TableDeleted {
        id: TableId,
    },
    ReservationCreated {
        id: ReservationId,
        table_id: TableId,
        customer_name: String,
        reservation_time: DateTime<Utc>,
        duration_minutes: u32,
    },
    ReservationDeleted {
        id: ReservationId,
        table_id: TableId,
    },
    /// Written at the head of a compacted log so ids of deleted rows are
    /// never handed out again.
    IdWatermark {
        next_table_id: TableId,
        next_reservation_id: ReservationId,
    },
}

impl Event {
    pub fn table_created(table: &Table) -> Self {
        Event::TableCreated {
            id: table.id,
            name: table.name.clone(),
            seats: table.seats,
            location: table.location.clone(),
        }
    }

    pub fn reservation_created(r: &Reservation) -> Self {
        Event::ReservationCreated {
            id: r.id,
            table_id: r.table_id,
            customer_name: r.customer_name.clone(),
            reservation_time: r.reservation_time,
            duration_minutes: r.duration_minutes,
        }
    }
}
