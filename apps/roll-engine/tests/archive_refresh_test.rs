//! Archive Refresh Integration Tests
//!
//! Incremental EOD refresh against the scripted gateway, persisted through
//! both the in-memory store and the CSV store on a temp directory.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod support;

use std::sync::Arc;

use rust_decimal_macros::dec;

use roll_engine::application::ports::InMemoryArchiveStore;
use roll_engine::domain::shared::Symbol;
use roll_engine::{ArchiveSettings, ArchiveStorePort, CsvArchiveStore, RefreshArchiveUseCase};

use support::{MockGateway, bar, date, put};

fn gateway_with_bars(days: &[&str]) -> MockGateway {
    let bars = days
        .iter()
        .map(|day| bar(day, dec!(12.5), dec!(10.25), dec!(11.4), dec!(120)))
        .collect();
    MockGateway::new().with_history(
        vec![put("2025-02-21", dec!(310)), put("2025-02-21", dec!(300))],
        bars,
    )
}

fn settings() -> ArchiveSettings {
    ArchiveSettings::new(Symbol::new("MSTR"))
}

#[tokio::test]
async fn first_refresh_backfills_lookback_window() {
    let gateway = Arc::new(gateway_with_bars(&["2025-01-10", "2025-01-13"]));
    let store = Arc::new(InMemoryArchiveStore::new());

    let report = RefreshArchiveUseCase::new(Arc::clone(&gateway), Arc::clone(&store), settings())
        .execute(date("2025-01-13"))
        .await
        .unwrap();

    assert_eq!(report.start, date("2023-01-13"));
    assert_eq!(report.end, date("2025-01-13"));
    assert_eq!(report.contracts, 2);
    assert_eq!(report.fetched, 4);
    assert_eq!(report.added, 4);
    assert_eq!(store.save_count(), 1);

    let table = store.snapshot();
    let keys: Vec<_> = table
        .rows()
        .iter()
        .map(|r| (r.strike, r.date))
        .collect();
    assert_eq!(
        keys,
        vec![
            (dec!(300), date("2025-01-10")),
            (dec!(300), date("2025-01-13")),
            (dec!(310), date("2025-01-10")),
            (dec!(310), date("2025-01-13")),
        ]
    );

    let calls = gateway.calls();
    assert!(
        calls
            .history_requests
            .iter()
            .all(|(_, start, _)| *start == date("2023-01-13"))
    );
}

#[tokio::test]
async fn refresh_without_data_skips_contracts_and_does_not_save() {
    let gateway = Arc::new(gateway_with_bars(&[]));
    let store = Arc::new(InMemoryArchiveStore::new());

    let report = RefreshArchiveUseCase::new(gateway, Arc::clone(&store), settings())
        .execute(date("2025-01-13"))
        .await
        .unwrap();

    assert_eq!(report.contracts, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.message(), "No new EOD data to append.");
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn csv_archive_refresh_is_incremental_and_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("mstr_eod.csv");
    let store = Arc::new(CsvArchiveStore::new(&path));

    // First run creates the file.
    let gateway = Arc::new(gateway_with_bars(&["2025-01-10", "2025-01-13"]));
    let report = RefreshArchiveUseCase::new(gateway, Arc::clone(&store), settings())
        .execute(date("2025-01-13"))
        .await
        .unwrap();
    assert_eq!(report.added, 4);
    assert_eq!(
        report.message(),
        format!("Appended 4 rows to {}", path.display())
    );

    let first = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = first.lines().collect();
    assert_eq!(lines[0], "contract,expiry,strike,right,date,bid,ask,last,volume");
    assert_eq!(
        lines[1],
        "MSTR  250221P00300000,20250221,300,P,2025-01-10,12.5,10.25,11.4,120"
    );
    assert_eq!(lines.len(), 5);

    // Rerun on the same day: nothing to fetch, file untouched.
    let gateway = Arc::new(gateway_with_bars(&["2025-01-10", "2025-01-13"]));
    let report = RefreshArchiveUseCase::new(Arc::clone(&gateway), Arc::clone(&store), settings())
        .execute(date("2025-01-13"))
        .await
        .unwrap();
    assert_eq!(report.fetched, 0);
    assert_eq!(report.message(), "No new EOD data to append.");
    assert!(gateway.calls().history_requests.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), first);

    // Next session: only the new day is requested and appended.
    let gateway = Arc::new(gateway_with_bars(&["2025-01-10", "2025-01-13", "2025-01-14"]));
    let report = RefreshArchiveUseCase::new(Arc::clone(&gateway), Arc::clone(&store), settings())
        .execute(date("2025-01-14"))
        .await
        .unwrap();
    assert_eq!(report.start, date("2025-01-14"));
    assert_eq!(report.fetched, 2);
    assert_eq!(report.added, 2);

    let table = store.load().await.unwrap();
    assert_eq!(table.len(), 6);
    assert_eq!(table.latest_date(), Some(date("2025-01-14")));
    assert!(
        !path.with_file_name("mstr_eod.csv.tmp").exists(),
        "temp file must be renamed away"
    );
}
