// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup and project fixtures shared by integration tests.

use std::path::Path;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("kagglelab=debug".parse().unwrap())
            .add_directive("bollard=info".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Lay out a small competition project: credentials, one Python task and
/// one R script.
#[allow(dead_code)]
pub fn write_project(root: &Path) {
    std::fs::write(root.join("kaggle.json"), r#"{"username":"u","key":"k"}"#).unwrap();
    let features = root.join("features");
    std::fs::create_dir_all(&features).unwrap();
    std::fs::write(features.join("requirements.txt"), "pandas\n").unwrap();
    std::fs::write(features.join("main.py"), "print('ok')\n").unwrap();
    std::fs::write(root.join("report.R"), "cat('ok\\n')\n").unwrap();
}
