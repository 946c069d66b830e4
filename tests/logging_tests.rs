use std::fs;
use std::path::Path;

use webintel::logging::{self, ERROR_FILE_PREFIX, LOG_FILE_PREFIX};

fn read_log(dir: &Path, prefix: &str) -> String {
    let prefix = format!("{prefix}.");
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| fs::read_to_string(e.path()).unwrap())
        .collect()
}

// One test per binary: the subscriber is process-global.
#[test]
fn test_detailed_and_error_logs_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let guards = logging::init(Some(dir.path())).unwrap();

    tracing::debug!(target: "webintel::pipeline", url = "http://a.example", "scraped");
    tracing::info!(target: "webintel::pipeline", ok = 2, "scraping finished");
    tracing::error!(target: "webintel::pipeline", model = "m", "extraction failed");
    drop(guards);

    let detailed = read_log(dir.path(), LOG_FILE_PREFIX);
    assert!(detailed.contains("scraped"), "{detailed}");
    assert!(detailed.contains("scraping finished"));
    assert!(detailed.contains("extraction failed"));
    assert!(!detailed.contains("\u{1b}["), "file log must not carry ANSI colours");

    let errors = read_log(dir.path(), ERROR_FILE_PREFIX);
    assert!(errors.contains("extraction failed"), "{errors}");
    assert!(!errors.contains("scraping finished"));
    assert!(!errors.contains("scraped"));

    assert!(logging::init(None).is_err());
}
