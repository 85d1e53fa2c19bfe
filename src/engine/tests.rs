use super::*;
use chrono::{DateTime, TimeZone, Utc};

const H: i64 = 60; // 1 hour in minutes

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

/// `base()` shifted by `minutes`.
fn t(minutes: i64) -> DateTime<Utc> {
    base() + chrono::Duration::minutes(minutes)
}

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("tablebook_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn new_table(name: &str) -> NewTable {
    NewTable {
        name: name.into(),
        seats: 4,
        location: "Main Hall".into(),
    }
}

fn booking(table_id: TableId, start: DateTime<Utc>, minutes: u32) -> NewReservation {
    NewReservation {
        customer_name: "Test User".into(),
        table_id,
        reservation_time: start,
        duration_minutes: minutes,
    }
}

/// No two reservations on the same table may overlap.
async fn assert_no_overlaps(engine: &Engine) {
    let all = engine.reservations().await;
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            if a.table_id == b.table_id {
                assert!(!a.span().overlaps(&b.span()), "{a:?} overlaps {b:?}");
            }
        }
    }
}

// ── Overlap checker ──────────────────────────────────────

#[test]
fn overlaps_matches_half_open_formula() {
    for s1 in 0..12i64 {
        for d1 in 1..6u32 {
            for s2 in 0..12i64 {
                for d2 in 1..6u32 {
                    let expected = s1 < s2 + i64::from(d2) && s2 < s1 + i64::from(d1);
                    assert_eq!(
                        overlaps(t(s1), d1, t(s2), d2),
                        expected,
                        "[{s1}, +{d1}) vs [{s2}, +{d2})"
                    );
                }
            }
        }
    }
}

#[test]
fn overlaps_touching_intervals_do_not_conflict() {
    assert!(!overlaps(t(0), 60, t(60), 30));
    assert!(!overlaps(t(60), 30, t(0), 60));
    assert!(overlaps(t(0), 60, t(59), 30));
}

#[test]
fn overlaps_containment_conflicts() {
    assert!(overlaps(t(0), 180, t(60), 15));
    assert!(overlaps(t(60), 15, t(0), 180));
    assert!(overlaps(t(0), 60, t(0), 60));
}

// ── Tables ───────────────────────────────────────────────

#[tokio::test]
async fn table_round_trip() {
    let engine = Engine::new(test_wal_path("table_round_trip.wal")).unwrap();

    let created = engine.create_table(new_table("T1")).await.unwrap();
    assert_eq!(created.id, 1);

    let tables = engine.tables().await;
    assert_eq!(
        tables,
        vec![Table {
            id: created.id,
            name: "T1".into(),
            seats: 4,
            location: "Main Hall".into(),
        }]
    );
    assert_eq!(engine.table(created.id).await, Some(created));
}

#[tokio::test]
async fn tables_may_share_name_and_location() {
    let engine = Engine::new(test_wal_path("table_duplicates.wal")).unwrap();
    let a = engine.create_table(new_table("Window")).await.unwrap();
    let b = engine.create_table(new_table("Window")).await.unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(engine.tables().await.len(), 2);
}

#[tokio::test]
async fn invalid_table_rejected_without_write() {
    let path = test_wal_path("table_invalid.wal");
    let engine = Engine::new(path).unwrap();
    let mut bad = new_table("T1");
    bad.seats = 0;
    let err = engine.create_table(bad).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(engine.tables().await.is_empty());
    assert_eq!(engine.wal_appends_since_compact().await, 0);
}

#[tokio::test]
async fn delete_empty_table_succeeds() {
    let engine = Engine::new(test_wal_path("delete_empty_table.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();

    engine.remove_table(table.id).await.unwrap();
    assert!(engine.tables().await.is_empty());
    assert_eq!(engine.table(table.id).await, None);

    let again = engine.remove_table(table.id).await;
    assert!(matches!(again, Err(EngineError::TableNotFound(id)) if id == table.id));
}

#[tokio::test]
async fn delete_missing_table_not_found() {
    let engine = Engine::new(test_wal_path("delete_missing_table.wal")).unwrap();
    let result = engine.remove_table(99_999).await;
    assert!(matches!(result, Err(EngineError::TableNotFound(99_999))));
}

#[tokio::test]
async fn delete_table_with_reservations_conflicts() {
    let engine = Engine::new(test_wal_path("delete_guarded_table.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();
    let r = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();

    let err = engine.remove_table(table.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::TableHasReservations { table_id, count: 1 } if table_id == table.id
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    // Nothing changed
    assert_eq!(engine.tables().await.len(), 1);
    assert_eq!(engine.reservations().await, vec![r.clone()]);

    // Once the reservation is gone the table can go too
    engine.cancel_reservation(r.id).await.unwrap();
    engine.remove_table(table.id).await.unwrap();
}

// ── Reservations ─────────────────────────────────────────

#[tokio::test]
async fn conflict_scenario_overlap_and_touching() {
    let engine = Engine::new(test_wal_path("conflict_scenario.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();

    let a = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();

    let b = engine.admit_reservation(booking(table.id, t(30), 30)).await;
    assert!(matches!(
        b,
        Err(EngineError::Overlap { table_id, conflicting }) if table_id == table.id && conflicting == a.id
    ));

    let c = engine.admit_reservation(booking(table.id, t(60), 30)).await.unwrap();
    assert_eq!(c.reservation_time, t(60));

    let ids: Vec<_> = engine.reservations().await.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![a.id, c.id]);
}

#[tokio::test]
async fn reservation_ending_at_start_of_existing_is_admitted() {
    let engine = Engine::new(test_wal_path("touching_before.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();
    engine.admit_reservation(booking(table.id, t(2 * H), 60)).await.unwrap();
    engine.admit_reservation(booking(table.id, t(H), 60)).await.unwrap();
    assert!(engine.admit_reservation(booking(table.id, t(H + 1), 30)).await.is_err());
}

#[tokio::test]
async fn same_interval_on_other_table_is_independent() {
    let engine = Engine::new(test_wal_path("other_table.wal")).unwrap();
    let t1 = engine.create_table(new_table("T1")).await.unwrap();
    let t2 = engine.create_table(new_table("T2")).await.unwrap();
    engine.admit_reservation(booking(t1.id, t(0), 60)).await.unwrap();
    engine.admit_reservation(booking(t2.id, t(0), 60)).await.unwrap();
    assert_eq!(engine.reservations().await.len(), 2);
}

#[tokio::test]
async fn reservation_for_missing_table_leaves_no_record() {
    let engine = Engine::new(test_wal_path("missing_table.wal")).unwrap();
    let result = engine.admit_reservation(booking(99_999, t(0), 60)).await;
    assert!(matches!(result, Err(EngineError::TableNotFound(99_999))));
    assert!(engine.reservations().await.is_empty());
    assert_eq!(engine.wal_appends_since_compact().await, 0);
}

#[tokio::test]
async fn zero_duration_rejected() {
    let engine = Engine::new(test_wal_path("zero_duration.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();
    let err = engine.admit_reservation(booking(table.id, t(0), 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(engine.reservations().await.is_empty());
}

#[tokio::test]
async fn offsets_normalized_before_comparison() {
    let engine = Engine::new(test_wal_path("offsets.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();
    engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();

    // 15:30 at +03:00 is 12:30 UTC, inside the first reservation
    let shifted = crate::model::parse_utc("2026-05-01T15:30:00+03:00").unwrap();
    let result = engine.admit_reservation(booking(table.id, shifted, 30)).await;
    assert!(matches!(result, Err(EngineError::Overlap { .. })));

    // 16:00 at +03:00 is 13:00 UTC, touching the end
    let touching = crate::model::parse_utc("2026-05-01T16:00:00+03:00").unwrap();
    engine.admit_reservation(booking(table.id, touching, 30)).await.unwrap();
}

#[tokio::test]
async fn delete_reservation_twice_is_not_found() {
    let engine = Engine::new(test_wal_path("double_delete.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();
    let r = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();

    let removed = engine.cancel_reservation(r.id).await.unwrap();
    assert_eq!(removed, r);
    let second = engine.cancel_reservation(r.id).await;
    assert!(matches!(second, Err(EngineError::ReservationNotFound(id)) if id == r.id));
    assert_eq!(engine.reservation(r.id).await, None);
}

#[tokio::test]
async fn cancelled_slot_can_be_rebooked() {
    let engine = Engine::new(test_wal_path("rebook.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();
    let r = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();
    engine.cancel_reservation(r.id).await.unwrap();
    let again = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();
    assert_ne!(again.id, r.id);
}

#[tokio::test]
async fn conflicts_query_filters_by_interval() {
    let engine = Engine::new(test_wal_path("conflicts_query.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();
    let early = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();
    let late = engine.admit_reservation(booking(table.id, t(3 * H), 60)).await.unwrap();

    let window = Span::starting_at(t(30), 3 * 60);
    let hits: Vec<_> = engine.conflicts(table.id, window).await.iter().map(|r| r.id).collect();
    assert_eq!(hits, vec![early.id, late.id]);

    let gap = Span::starting_at(t(H), 2 * 60);
    assert!(engine.conflicts(table.id, gap).await.is_empty());
    assert!(engine.conflicts(404, window).await.is_empty());
}

#[tokio::test]
async fn table_reservations_sorted_by_id() {
    let engine = Engine::new(test_wal_path("table_reservations.wal")).unwrap();
    let table = engine.create_table(new_table("T1")).await.unwrap();
    let late = engine.admit_reservation(booking(table.id, t(5 * H), 60)).await.unwrap();
    let early = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();

    let listed = engine.table_reservations(table.id).await.unwrap();
    assert_eq!(listed, vec![late, early]);
    assert_eq!(engine.table_reservations(404).await, None);
}

// ── Concurrency ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_interval_admits_exactly_one() {
    let engine = Arc::new(Engine::new(test_wal_path("concurrent_same.wal")).unwrap());
    let table_id = engine.create_table(new_table("T1")).await.unwrap().id;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let eng = engine.clone();
        handles.push(tokio::spawn(async move {
            eng.admit_reservation(booking(table_id, t(0), 60)).await
        }));
    }

    let mut ok = 0;
    let mut conflicts = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => ok += 1,
            Err(EngineError::Overlap { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(engine.reservations().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_staggered_admissions_never_overlap() {
    let engine = Arc::new(Engine::new(test_wal_path("concurrent_staggered.wal")).unwrap());
    let table_id = engine.create_table(new_table("T1")).await.unwrap().id;

    let mut handles = Vec::new();
    for i in 0..24 {
        let eng = engine.clone();
        handles.push(tokio::spawn(async move {
            eng.admit_reservation(booking(table_id, t(i * 20), 60)).await
        }));
    }
    let admitted = futures::future::join_all(handles)
        .await
        .into_iter()
        .filter(|r| r.as_ref().unwrap().is_ok())
        .count();

    // Each admitted slot blocks at most its two neighbours on either side
    assert!(admitted >= 5, "too few admissions: {admitted}");
    assert_no_overlaps(&engine).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admissions_on_different_tables_all_succeed() {
    let engine = Arc::new(Engine::new(test_wal_path("concurrent_tables.wal")).unwrap());
    let mut table_ids = Vec::new();
    for i in 0..8 {
        table_ids.push(engine.create_table(new_table(&format!("T{i}"))).await.unwrap().id);
    }

    let handles: Vec<_> = table_ids
        .iter()
        .map(|&id| {
            let eng = engine.clone();
            tokio::spawn(async move { eng.admit_reservation(booking(id, t(0), 90)).await })
        })
        .collect();
    for h in handles {
        h.await.unwrap().unwrap();
    }
    assert_eq!(engine.reservations().await.len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delete_table_racing_admission_keeps_references_valid() {
    let engine = Arc::new(Engine::new(test_wal_path("race_delete_admit.wal")).unwrap());

    for round in 0..20 {
        let table_id = engine.create_table(new_table(&format!("R{round}"))).await.unwrap().id;
        let admit = {
            let eng = engine.clone();
            tokio::spawn(async move { eng.admit_reservation(booking(table_id, t(0), 60)).await })
        };
        let delete = {
            let eng = engine.clone();
            tokio::spawn(async move { eng.remove_table(table_id).await })
        };
        let admitted = admit.await.unwrap();
        let deleted = delete.await.unwrap();

        match (&admitted, &deleted) {
            (Ok(r), Err(EngineError::TableHasReservations { .. })) => {
                engine.cancel_reservation(r.id).await.unwrap();
                engine.remove_table(table_id).await.unwrap();
            }
            (Err(EngineError::TableNotFound(_)), Ok(())) => {}
            other => panic!("round {round}: inconsistent outcome {other:?}"),
        }
    }

    assert!(engine.tables().await.is_empty());
    assert!(engine.reservations().await.is_empty());
}

// ── Durability ───────────────────────────────────────────

#[tokio::test]
async fn replay_restores_tables_and_reservations() {
    let path = test_wal_path("replay.wal");
    let (table, kept) = {
        let engine = Engine::new(path.clone()).unwrap();
        let table = engine.create_table(new_table("T1")).await.unwrap();
        let gone = engine.create_table(new_table("T2")).await.unwrap();
        engine.remove_table(gone.id).await.unwrap();
        let kept = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();
        let cancelled = engine.admit_reservation(booking(table.id, t(H), 60)).await.unwrap();
        engine.cancel_reservation(cancelled.id).await.unwrap();
        (table, kept)
    };

    let engine = Engine::new(path).unwrap();
    assert_eq!(engine.tables().await, vec![table.clone()]);
    assert_eq!(engine.reservations().await, vec![kept.clone()]);
    assert_eq!(engine.reservation(kept.id).await, Some(kept));

    // Replayed reservations still guard their interval
    let clash = engine.admit_reservation(booking(table.id, t(30), 30)).await;
    assert!(matches!(clash, Err(EngineError::Overlap { .. })));
}

#[tokio::test]
async fn ids_not_reused_after_restart() {
    let path = test_wal_path("ids_after_restart.wal");
    {
        let engine = Engine::new(path.clone()).unwrap();
        let t1 = engine.create_table(new_table("T1")).await.unwrap();
        let r = engine.admit_reservation(booking(t1.id, t(0), 60)).await.unwrap();
        assert_eq!((t1.id, r.id), (1, 1));
    }
    let engine = Engine::new(path).unwrap();
    let t2 = engine.create_table(new_table("T2")).await.unwrap();
    let r2 = engine.admit_reservation(booking(t2.id, t(0), 60)).await.unwrap();
    assert_eq!((t2.id, r2.id), (2, 2));
}

#[tokio::test]
async fn compact_wal_preserves_state() {
    let path = test_wal_path("compact_state.wal");
    let engine = Engine::new(path.clone()).unwrap();

    let table = engine.create_table(new_table("T1")).await.unwrap();
    // Churn: tables and reservations that come and go
    for i in 0..10 {
        let tmp = engine.create_table(new_table(&format!("tmp{i}"))).await.unwrap();
        engine.remove_table(tmp.id).await.unwrap();
        let r = engine.admit_reservation(booking(table.id, t(10 * H), 60)).await.unwrap();
        engine.cancel_reservation(r.id).await.unwrap();
    }
    let kept = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();

    let tables_before = engine.tables().await;
    let reservations_before = engine.reservations().await;
    let size_before = std::fs::metadata(&path).unwrap().len();

    engine.compact_wal().await.unwrap();

    let size_after = std::fs::metadata(&path).unwrap().len();
    assert!(size_after < size_before, "compacted WAL ({size_after}) should be smaller than before ({size_before})");
    assert_eq!(engine.tables().await, tables_before);
    assert_eq!(engine.reservations().await, reservations_before);
    assert_eq!(engine.wal_appends_since_compact().await, 0);
    assert_eq!(reservations_before, vec![kept]);
}

#[tokio::test]
async fn compact_wal_survives_restart() {
    let path = test_wal_path("compact_restart.wal");
    let (table, kept, last_table_id, last_reservation_id) = {
        let engine = Engine::new(path.clone()).unwrap();
        let table = engine.create_table(new_table("T1")).await.unwrap();
        let kept = engine.admit_reservation(booking(table.id, t(0), 60)).await.unwrap();
        let tmp_table = engine.create_table(new_table("tmp")).await.unwrap();
        let tmp_res = engine.admit_reservation(booking(table.id, t(H), 60)).await.unwrap();
        engine.cancel_reservation(tmp_res.id).await.unwrap();
        engine.remove_table(tmp_table.id).await.unwrap();

        engine.compact_wal().await.unwrap();

        // Append after compaction
        let after = engine.admit_reservation(booking(table.id, t(2 * H), 30)).await.unwrap();
        (table, kept, tmp_table.id, after.id)
    };

    let engine = Engine::new(path).unwrap();
    assert_eq!(engine.tables().await, vec![table.clone()]);
    let reservations = engine.reservations().await;
    assert_eq!(reservations.len(), 2);
    assert_eq!(reservations[0], kept);

    // Watermark keeps the deleted rows' ids retired
    let next_table = engine.create_table(new_table("T3")).await.unwrap();
    assert!(next_table.id > last_table_id);
    let next_res = engine.admit_reservation(booking(table.id, t(5 * H), 30)).await.unwrap();
    assert!(next_res.id > last_reservation_id);
}

#[tokio::test]
async fn group_commit_batches_appends() {
    let path = test_wal_path("group_commit_batch.wal");
    let engine = Arc::new(Engine::new(path.clone()).unwrap());

    let n = 20;
    let mut handles = Vec::new();
    for i in 0..n {
        let eng = engine.clone();
        handles.push(tokio::spawn(async move {
            eng.create_table(new_table(&format!("T{i}"))).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }
    assert_eq!(engine.tables().await.len(), n);
    assert_eq!(engine.wal_appends_since_compact().await, n as u64);

    // Replay WAL from disk, should reconstruct the same N tables
    let engine2 = Engine::new(path).unwrap();
    assert_eq!(engine2.tables().await.len(), n);
}

#[tokio::test]
async fn concurrent_compaction_loses_no_writes() {
    let path = test_wal_path("compact_concurrent.wal");
    let engine = Arc::new(Engine::new(path.clone()).unwrap());
    let table_id = engine.create_table(new_table("T1")).await.unwrap().id;

    let writer = {
        let eng = engine.clone();
        tokio::spawn(async move {
            for i in 0..40 {
                eng.admit_reservation(booking(table_id, t(i * 60), 60)).await.unwrap();
            }
        })
    };
    for _ in 0..5 {
        engine.compact_wal().await.unwrap();
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();

    let live = engine.reservations().await;
    assert_eq!(live.len(), 40);
    let replayed = Engine::new(path).unwrap();
    assert_eq!(replayed.reservations().await, live);
}
