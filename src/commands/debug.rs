// ABOUTME: Debug command implementation.
// ABOUTME: Builds the pipeline and starts a shell container to attach to.

use super::progress::{report_diagnostics, spawn_reporter};
use super::runtime_connection::connect_to_runtime;
use kagglelab::config::Config;
use kagglelab::diagnostics::Diagnostics;
use kagglelab::error::Result;
use kagglelab::output::Output;
use kagglelab::pipeline::Executor;

pub async fn debug(config: &Config, mut output: Output) -> Result<()> {
    output.start_timer();
    let spec = config.to_pipeline()?.debug();
    let runtime = connect_to_runtime(config, &output).await?;

    let mut diag = Diagnostics::default();
    let (events, reporter) = spawn_reporter(output.clone());
    let result = Executor::new(&runtime, config.executor_options())
        .with_events(events)
        .open_shell(&spec, &mut diag)
        .await;
    let _ = reporter.await;
    report_diagnostics(&output, &diag);

    let shell = result?;
    let attach = shell.attach_command(runtime.runtime_type().cli()).join(" ");
    output.progress("→ Shell is running; attach with:");
    output.success(&attach);
    Ok(())
}
