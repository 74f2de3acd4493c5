//! Integration tests against a real LibreOffice.
//!
//! These need a LibreOffice listening on 127.0.0.1:2002:
//!
//!    soffice --headless --accept="socket,host=127.0.0.1,port=2002;urp;StarOffice.ServiceManager"
//!
//! If nothing is listening, every test is skipped.

use std::path::Path;

use pagefit_libreoffice::{
    export_one_page_per_sheet, FitStrategy, ScaleMode, SessionConfig, SessionManager,
};

/// Check if a LibreOffice URP listener is available on localhost:2002.
fn urp_available() -> bool {
    std::net::TcpStream::connect_timeout(
        &"127.0.0.1:2002".parse().unwrap(),
        std::time::Duration::from_secs(2),
    )
    .is_ok()
}

/// Skip this test if URP is not available.
macro_rules! skip_if_no_urp {
    () => {
        if !urp_available() {
            eprintln!(
                "SKIP: LibreOffice URP not available on 127.0.0.1:2002.\n\
                 Start LibreOffice with:\n  \
                 soffice --headless --accept=\"socket,host=127.0.0.1,port=2002;urp;StarOffice.ServiceManager\""
            );
            return;
        }
    };
}

/// Ten columns by fifty rows of numbers.
fn write_report_csv(path: &Path) {
    let mut body = String::new();
    for row in 0..50 {
        let cells: Vec<String> = (0..10).map(|col| (row * 10 + col).to_string()).collect();
        body.push_str(&cells.join(","));
        body.push('\n');
    }
    std::fs::write(path, body).unwrap();
}

#[tokio::test]
async fn test_connect_to_running_engine_is_borrowed() {
    skip_if_no_urp!();

    let mut manager = SessionManager::new(SessionConfig::default());
    let session = manager.acquire_session().await.expect("acquire");
    assert!(!session.owns_engine());
    manager.release_session(session).await;
}

#[tokio::test]
async fn test_export_fits_each_sheet() {
    skip_if_no_urp!();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.csv");
    let output = dir.path().join("report.pdf");
    write_report_csv(&input);

    let mut manager = SessionManager::new(SessionConfig::default());
    let mut session = manager.acquire_session().await.expect("acquire");
    let report = export_one_page_per_sheet(&mut session, &input, &output, FitStrategy::Automatic).await;
    manager.release_session(session).await;

    let report = report.expect("export");
    assert_eq!(report.sheets.len(), 1);
    let spec = report.sheets[0].outcome.as_ref().expect("normalized");
    assert_eq!(spec.scale, ScaleMode::FitToPages { wide: 1, tall: 1 });
    // Column count depends on the engine's CSV separator defaults; rows do not.
    let area = spec.print_area.expect("print area");
    assert_eq!((area.start_row, area.end_row), (0, 49));
    assert!(std::fs::metadata(&output).unwrap().len() > 0);
}
