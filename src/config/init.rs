// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates kagglelab.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::DEFAULT_BASE_IMAGE;

use super::CONFIG_FILENAME;

const DEFAULT_COMPETITION: &str = "titanic";

pub fn init_config(dir: &Path, competition: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let competition = competition.unwrap_or(DEFAULT_COMPETITION);
    if competition.is_empty()
        || !competition
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(Error::InvalidConfig(format!(
            "invalid competition slug: {:?}",
            competition
        )));
    }

    std::fs::write(&config_path, generate_template_yaml(competition))?;
    tracing::debug!(path = %config_path.display(), "wrote configuration template");

    Ok(())
}

fn generate_template_yaml(competition: &str) -> String {
    format!(
        r#"# project: {competition}
image: {DEFAULT_BASE_IMAGE}
# runtime: docker            # docker | podman; detected when omitted
# tag: kagglelab/{competition}:latest
step_timeout: 1h
script_failure: tolerate      # tolerate | halt

steps:
  - import_data:
      api_keys: ~/.kaggle/kaggle.json
      competition: {competition}
  # - preprocess:
  #     name: features
  #     task_dir: ./features
  # - preprocess_scripted:
  #     name: report
  #     script: ./report.R
  #     token: {{ env: MOTHERDUCK_TOKEN }}

service:
  token: {{ env: JUPYTER_TOKEN }}
  host_port: 8888
  host_ip: 127.0.0.1
"#
    )
}
