mod support;

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use workbook_sync_lambda::handlers::export::handle_export;
use workbook_sync_lambda::testing::{InMemoryWorkbookStore, RecordingObjectStore, StoreCall};

use support::{export_config, seeded_workbook, CONTACT_HISTORY};

fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 6, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn seed_history(store: &InMemoryWorkbookStore, count: usize) {
    for index in 0..count {
        store.insert_row(
            CONTACT_HISTORY,
            &[&format!("Customer {index}"), "Called", ""],
        );
    }
}

#[test]
fn page_count_matches_ceiling_and_rows_are_marked_once() {
    for (total, page_size) in [(0usize, 3usize), (3, 3), (7, 3), (10, 1), (5, 100)] {
        let store = seeded_workbook();
        seed_history(&store, total);
        let objects = RecordingObjectStore::new();

        let outcome = handle_export(&export_config(page_size), run_time(), &store, &objects)
            .expect("export should run");

        let expected_pages = total.div_ceil(page_size);
        assert_eq!(outcome.object_keys.len(), expected_pages, "total {total}");
        assert_eq!(objects.keys("contact-exports").len(), expected_pages);
        assert_eq!(outcome.rows_exported, total);

        let mut marks: BTreeMap<String, usize> = BTreeMap::new();
        for call in store.write_calls() {
            if let StoreCall::Update { row_ids, .. } = call {
                for row_id in row_ids {
                    *marks.entry(row_id).or_default() += 1;
                }
            }
        }
        assert_eq!(marks.len(), total);
        assert!(marks.values().all(|count| *count == 1));
        assert!(store
            .rows(CONTACT_HISTORY)
            .iter()
            .all(|row| row.cells[2] == "10/16/2026"));
    }
}

#[test]
fn second_run_finds_nothing_new() {
    let store = seeded_workbook();
    seed_history(&store, 4);
    let objects = RecordingObjectStore::new();
    let config = export_config(2);

    handle_export(&config, run_time(), &store, &objects).expect("first export");
    let outcome = handle_export(&config, run_time(), &store, &objects).expect("second export");

    assert_eq!(outcome.message, "No contact history records to export");
    assert_eq!(objects.keys("contact-exports").len(), 2);
}

#[test]
fn every_page_gets_its_own_object_with_header() {
    let store = seeded_workbook();
    seed_history(&store, 3);
    let objects = RecordingObjectStore::new();

    let outcome = handle_export(&export_config(2), run_time(), &store, &objects)
        .expect("export should run");

    assert_eq!(outcome.message, "Exported 3 row(s) of contact history");
    let millis = run_time().timestamp_millis();
    assert_eq!(
        outcome.object_keys,
        vec![
            format!("history/2026/10/16/{millis}-0000.csv"),
            format!("history/2026/10/16/{millis}-0001.csv"),
        ]
    );
    let last_page = objects
        .body("contact-exports", &outcome.object_keys[1])
        .expect("object written");
    assert_eq!(
        String::from_utf8(last_page).expect("utf-8"),
        "Customer,Notes,Exported\nCustomer 2,Called,10/16/2026\n"
    );
}
