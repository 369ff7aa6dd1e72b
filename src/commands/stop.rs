// ABOUTME: Stop command implementation.
// ABOUTME: Stops and removes this project's service and shell containers.

use super::progress::report_diagnostics;
use super::runtime_connection::connect_to_runtime;
use kagglelab::config::Config;
use kagglelab::diagnostics::Diagnostics;
use kagglelab::error::Result;
use kagglelab::output::Output;
use kagglelab::pipeline::Executor;

pub async fn stop(config: &Config, output: Output) -> Result<()> {
    let runtime = connect_to_runtime(config, &output).await?;

    let mut diag = Diagnostics::default();
    let stopped = Executor::new(&runtime, config.executor_options())
        .stop_services(&mut diag)
        .await?;
    report_diagnostics(&output, &diag);

    for name in &stopped {
        output.progress(&format!("→ Removed {}", name));
    }
    output.success(&format!(
        "Stopped {} container(s) for {}",
        stopped.len(),
        config.project_name()
    ));
    Ok(())
}
