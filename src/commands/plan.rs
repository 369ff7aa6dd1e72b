// ABOUTME: Plan command implementation.
// ABOUTME: Prints the configured steps without contacting the engine.

use kagglelab::config::Config;
use kagglelab::error::Result;
use kagglelab::output::{Output, OutputMode};
use serde::Serialize;

#[derive(Serialize)]
struct PlanDocument {
    project: String,
    image: String,
    working_dir: String,
    steps: Vec<String>,
    service: ServicePlan,
}

#[derive(Serialize)]
struct ServicePlan {
    token: String,
    bind: String,
}

pub fn plan(config: &Config, output: &Output) -> Result<()> {
    let pipeline = config.to_pipeline()?;
    let (token, options) = config.service_options(None);

    let document = PlanDocument {
        project: config.project_name(),
        image: pipeline.container().base().to_string(),
        working_dir: pipeline.working_dir().to_string(),
        steps: pipeline
            .container()
            .steps()
            .iter()
            .map(ToString::to_string)
            .collect(),
        service: ServicePlan {
            token: token.to_string(),
            bind: format!("{}:{}", options.host_ip, options.host_port),
        },
    };

    if output.mode() == OutputMode::Json {
        println!("{}", serde_json::to_string(&document).map_err(std::io::Error::other)?);
        return Ok(());
    }

    println!("project  {}", document.project);
    println!("image    {}", document.image);
    println!("workdir  {}", document.working_dir);
    println!();
    for (i, step) in document.steps.iter().enumerate() {
        println!("{:>3}. {}", i + 1, step);
    }
    println!();
    println!(
        "serve    {} (token from {})",
        document.service.bind, document.service.token
    );
    Ok(())
}
