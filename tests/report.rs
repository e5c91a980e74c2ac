mod common;

use std::fs;

use common::{PLANT_CSV, TestWorkspace};

fn report_text(ws: &TestWorkspace) -> String {
    let output = ws.path().join("report.pdf");
    ws.command()
        .args(["report", "-o", output.to_str().unwrap()])
        .assert()
        .success();
    let bytes = fs::read(&output).expect("read report");
    assert!(bytes.starts_with(b"%PDF-"));
    String::from_utf8_lossy(&bytes).into_owned()
}

#[test]
fn report_on_empty_store_says_no_data() {
    let ws = TestWorkspace::new();
    let text = report_text(&ws);
    assert_eq!(text.matches("(No data available.)").count(), 1);
    assert!(text.contains("/Count 1"));
    assert!(text.contains("(Chemical Equipment Parameter Report)"));
    assert!(text.trim_end().ends_with("%%EOF"));
}

#[test]
fn report_lists_records_most_recent_first() {
    let ws = TestWorkspace::new();
    ws.ingest("older.csv", PLANT_CSV);
    ws.ingest("newer.csv", "Flowrate,Status\n1,ok\n");

    let text = report_text(&ws);
    let newer = text.find("(Dataset 1: newer.csv)").expect("newer first");
    let older = text.find("(Dataset 2: older.csv)").expect("older second");
    assert!(newer < older);
    assert!(text.contains("(Avg Pressure: 110.00)"));
    assert!(text.contains("(Distribution: Pump: 2, Valve: 1)"));
    assert!(text.contains("(Distribution: ok: 1)"));
    assert!(!text.contains("No data available."));
}

#[test]
fn report_renders_only_retained_records_on_one_page() {
    let ws = TestWorkspace::new();
    for idx in 0..7 {
        ws.ingest(&format!("batch{idx}.csv"), PLANT_CSV);
    }
    let text = report_text(&ws);
    assert_eq!(text.matches("(Dataset ").count(), 5);
    assert!(text.contains("/Count 1"));
    assert!(!text.contains("batch1.csv"));
    assert!(text.contains("(Dataset 1: batch6.csv)"));
}

#[test]
fn report_supports_letter_pages() {
    let ws = TestWorkspace::new();
    ws.ingest("plant.csv", PLANT_CSV);
    let output = ws.path().join("letter.pdf");
    ws.command()
        .args([
            "report",
            "-o",
            output.to_str().unwrap(),
            "--page-size",
            "letter",
        ])
        .assert()
        .success();
    let text = String::from_utf8_lossy(&fs::read(&output).expect("read")).into_owned();
    assert!(text.contains("/MediaBox [0 0 612 792]"));
}
