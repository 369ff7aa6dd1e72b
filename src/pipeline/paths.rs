// ABOUTME: Fixed locations inside the notebook image.
// ABOUTME: Task-specific paths are derived from the validated task name.

use crate::types::TaskName;

/// Home of the notebook user.
pub const HOME: &str = "/home/jovyan";

/// Where the host working directory is mounted.
pub const WORK_ROOT: &str = "/home/jovyan/work";

/// Where the Kaggle API credentials file is mounted.
pub const KAGGLE_CREDENTIALS: &str = "/home/jovyan/.kaggle/kaggle.json";

/// Install target for the analytics CLI.
pub const LOCAL_BIN: &str = "/home/jovyan/.local/bin";

pub const ANALYTICS_CLI_ARCHIVE: &str = "/tmp/duckdb_cli.zip";

pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const ENTRY_SCRIPT: &str = "main.py";
pub const R_SCRIPT: &str = "script.R";

pub const NOTEBOOK_PORT: u16 = 8888;

pub const SHELL: &str = "/bin/bash";

/// `/home/jovyan/work/{name}`
pub fn task_dir(name: &TaskName) -> String {
    format!("{}/{}", WORK_ROOT, name)
}

/// `/opt/process_{name}/{file}`
pub fn process_file(name: &TaskName, file: &str) -> String {
    format!("/opt/process_{}/{}", name, file)
}

/// `/opt/script_{name}/script.R`
pub fn script_file(name: &TaskName) -> String {
    format!("/opt/script_{}/{}", name, R_SCRIPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths() {
        let name = TaskName::new("eda").unwrap();
        assert_eq!(task_dir(&name), "/home/jovyan/work/eda");
        assert_eq!(
            process_file(&name, ENTRY_SCRIPT),
            "/opt/process_eda/main.py"
        );
        assert_eq!(script_file(&name), "/opt/script_eda/script.R");
        assert!(WORK_ROOT.starts_with(HOME));
    }
}
