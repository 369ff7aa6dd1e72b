// ABOUTME: Integration tests for configuration parsing and validation.
// ABOUTME: Tests discovery, path resolution, and mapping steps onto a pipeline.

mod support;

use kagglelab::config::*;
use kagglelab::error::Error;
use kagglelab::pipeline::{FailurePolicy, ScriptFailure, Step};
use std::time::Duration;

const FULL: &str = r#"
project: titanic
image: quay.io/jupyter/scipy-notebook:2024-10-07
tag: kagglelab/titanic:latest
step_timeout: 20m
keep_layers: true
steps:
  - import_data: { api_keys: kaggle.json, competition: titanic }
  - preprocess: { name: features, task_dir: ./features }
  - preprocess_scripted:
      name: report
      script: report.R
      token: { env: MOTHERDUCK_TOKEN }
service:
  token: { file: secrets/jupyter_token }
  host_port: 9999
  host_ip: 0.0.0.0
"#;

mod discovery {
    use super::*;

    #[test]
    fn finds_each_filename() {
        for name in [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR] {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "project: found\n").unwrap();

            let config = Config::discover(dir.path()).unwrap();
            assert_eq!(config.project_name(), "found");
            assert_eq!(config.root(), dir.path());
        }
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::discover(dir.path()),
            Err(Error::ConfigNotFound(_))
        ));
    }

    #[test]
    fn project_defaults_to_directory_name() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("House Prices");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILENAME), "steps: []\n").unwrap();

        let config = Config::discover(&dir).unwrap();
        assert_eq!(config.project_name(), "house-prices");
    }
}

mod parsing {
    use super::*;

    #[test]
    fn full_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_yaml(FULL, dir.path()).unwrap();

        assert_eq!(config.step_timeout, Duration::from_secs(20 * 60));
        assert!(config.keep_layers);
        assert_eq!(config.steps.len(), 3);

        let options = config.executor_options();
        assert_eq!(options.project, "titanic");
        assert_eq!(options.step_timeout, Duration::from_secs(20 * 60));
        assert_eq!(
            options.tag.map(|t| t.to_string()).as_deref(),
            Some("kagglelab/titanic:latest")
        );

        let (token, service) = config.service_options(None);
        assert_eq!(service.host_port, 9999);
        assert!(service.host_ip.is_unspecified());
        assert_eq!(
            token.to_string(),
            format!("file:{}", dir.path().join("secrets/jupyter_token").display())
        );
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = Config::from_yaml("step_timeout: soon\n", std::path::Path::new("/p")).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn inline_secret_is_rejected() {
        let yaml = r#"
steps:
  - preprocess_scripted: { name: r, script: r.R, token: plaintext-token }
"#;
        assert!(Config::from_yaml(yaml, std::path::Path::new("/p")).is_err());
    }
}

mod pipeline_mapping {
    use super::*;

    #[test]
    fn steps_map_one_to_one_in_order() {
        let dir = tempfile::tempdir().unwrap();
        support::write_project(dir.path());
        let config = Config::from_yaml(FULL, dir.path()).unwrap();

        let pipeline = config.to_pipeline().unwrap();
        assert_eq!(
            pipeline.container().base().to_string(),
            "quay.io/jupyter/scipy-notebook:2024-10-07"
        );
        assert_eq!(
            pipeline.working_dir().path(),
            dir.path().canonicalize().unwrap()
        );

        let commands: Vec<_> = pipeline
            .container()
            .exec_steps()
            .map(|e| e.command_line())
            .collect();
        assert_eq!(commands.len(), 3 + 2 + 4);
        assert_eq!(commands[2], "unzip titanic.zip");
        assert_eq!(commands[3], "pip3 install -r /home/jovyan/work/features/requirements.txt");
        assert_eq!(commands[8], "Rscript /opt/script_report/script.R");
    }

    #[test]
    fn script_failure_setting_controls_masking() {
        let dir = tempfile::tempdir().unwrap();
        support::write_project(dir.path());

        for (setting, tolerated) in [(ScriptFailure::Tolerate, true), (ScriptFailure::Halt, false)] {
            let mut config = Config::from_yaml(FULL, dir.path()).unwrap();
            config.script_failure = setting;
            let spec = config.to_pipeline().unwrap().into_spec();
            let last = spec.steps().last().unwrap();
            let Step::Exec(exec) = last else {
                panic!("last step should run the script, got {last}");
            };
            assert_eq!(
                matches!(exec.on_failure, FailurePolicy::Tolerate { .. }),
                tolerated
            );
        }
    }

    #[test]
    fn missing_task_dir_fails_before_any_engine_call() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kaggle.json"), "{}").unwrap();
        let yaml = "steps:\n  - preprocess: { name: features, task_dir: ./nope }\n";
        let config = Config::from_yaml(yaml, dir.path()).unwrap();
        assert!(matches!(config.to_pipeline(), Err(Error::Handle(_))));
    }

    #[test]
    fn separate_sources_are_mounted() {
        let dir = tempfile::tempdir().unwrap();
        support::write_project(dir.path());
        std::fs::write(dir.path().join("main.py"), "print(1)\n").unwrap();
        let yaml = r#"
steps:
  - preprocess: { name: features, task_dir: features, entry_script: main.py }
"#;
        let config = Config::from_yaml(yaml, dir.path()).unwrap();
        let spec = config.to_pipeline().unwrap().into_spec();
        let commands: Vec<_> = spec.exec_steps().map(|e| e.command_line()).collect();
        assert_eq!(commands[1], "python3 /opt/process_features/main.py");
    }
}
