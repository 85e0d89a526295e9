//! Several connections to one database file race for the same slot. Each
//! thread owns its own connection, as separate server processes would.

use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::NaiveDateTime;

use servicebay::db::{self, queries};
use servicebay::errors::AppError;
use servicebay::models::{ApprovalStatus, Booking, Interval, Role, Service, User, VehicleSpec};
use servicebay::services::admission::{admit, AdmissionRequest};
use servicebay::services::workflow::{decide, Decision};

const WORKERS: usize = 8;
const RETRIES: u32 = 50;

struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("servicebay-{}.db", uuid::Uuid::new_v4()));
        let conn = db::init_db(path.to_str().unwrap()).unwrap();
        for (id, role) in [
            ("client", Role::Client),
            ("mechanic", Role::ServiceEmployee),
        ] {
            queries::create_user(
                &conn,
                &User {
                    id: id.to_string(),
                    email: format!("{id}@example.com"),
                    role,
                    created_at: "2030-01-01 00:00:00".to_string(),
                },
            )
            .unwrap();
        }
        queries::create_service(
            &conn,
            &Service {
                id: "brakes".to_string(),
                title: "Brakes".to_string(),
                description: None,
                duration_minutes: 60,
                price: 120.0,
            },
        )
        .unwrap();
        Self { path }
    }

    fn path(&self) -> String {
        self.path.to_str().unwrap().to_string()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

fn request(start: &str) -> AdmissionRequest {
    AdmissionRequest {
        requester_id: "client".to_string(),
        vehicle: VehicleSpec {
            brand: "Volvo".to_string(),
            model: "240".to_string(),
            year: Some(1990),
        },
        service_ids: vec!["brakes".to_string()],
        start_time: NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap(),
        remember_vehicle: false,
        description: None,
    }
}

fn approved_intervals(path: &str) -> Vec<Interval> {
    let conn = db::init_db(path).unwrap();
    queries::list_bookings(&conn, Some(ApprovalStatus::Approved), 1000)
        .unwrap()
        .iter()
        .map(Booking::interval)
        .collect()
}

fn assert_no_overlap(intervals: &[Interval]) {
    for (i, a) in intervals.iter().enumerate() {
        for b in &intervals[i + 1..] {
            assert!(!a.overlaps(b), "approved bookings overlap: {a:?} and {b:?}");
        }
    }
}

#[test]
fn test_concurrent_approvals_commit_exactly_one() {
    let temp = TempDb::new();

    // pending bookings never block each other, so all of these are admitted
    let ids: Vec<String> = {
        let mut conn = db::init_db(&temp.path()).unwrap();
        (0..WORKERS)
            .map(|i| {
                let start = if i % 2 == 0 { "2030-06-17 10:00" } else { "2030-06-17 10:30" };
                admit(&mut conn, &request(start), 0).unwrap().0.id
            })
            .collect()
    };

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let path = temp.path();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut conn = db::init_db(&path).unwrap();
                barrier.wait();
                decide(&mut conn, &id, Decision::Approve, Some("mechanic"), RETRIES)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let approved = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();
    assert_eq!(approved, 1, "results: {results:?}");
    assert_eq!(conflicts, WORKERS - 1, "results: {results:?}");

    let intervals = approved_intervals(&temp.path());
    assert_eq!(intervals.len(), 1);
}

#[test]
fn test_concurrent_admit_and_approve_never_overlap() {
    let temp = TempDb::new();

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let path = temp.path();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut conn = db::init_db(&path).unwrap();
                barrier.wait();

                // staggered starts so neighbours partially overlap
                let start = format!("2030-06-17 {:02}:{:02}", 9 + (i * 20) / 60, (i * 20) % 60);
                let (booking, _) = admit(&mut conn, &request(&start), RETRIES)?;
                decide(&mut conn, &booking.id, Decision::Approve, Some("mechanic"), RETRIES)
            })
        })
        .collect();

    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) | Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    let intervals = approved_intervals(&temp.path());
    assert!(!intervals.is_empty());
    assert_no_overlap(&intervals);
}
