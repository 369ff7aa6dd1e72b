// ABOUTME: Serve command implementation.
// ABOUTME: Builds the pipeline and starts the notebook server.

use super::progress::{report_diagnostics, spawn_reporter};
use super::runtime_connection::connect_to_runtime;
use kagglelab::config::Config;
use kagglelab::diagnostics::Diagnostics;
use kagglelab::error::Result;
use kagglelab::output::Output;
use kagglelab::pipeline::Executor;

pub async fn serve(config: &Config, port: Option<u16>, mut output: Output) -> Result<()> {
    output.start_timer();
    let (token, options) = config.service_options(port);
    let service = config.to_pipeline()?.start_service(&token).await?;
    let runtime = connect_to_runtime(config, &output).await?;

    let mut diag = Diagnostics::default();
    let (events, reporter) = spawn_reporter(output.clone());
    let result = Executor::new(&runtime, config.executor_options())
        .with_events(events)
        .start_service(&service, &options, &mut diag)
        .await;
    let _ = reporter.await;
    report_diagnostics(&output, &diag);

    let handle = result?;
    output.progress(&format!("→ Container {} is running", handle.name));
    output.progress(&format!("→ Log in with the token from {}", token));
    output.success(&format!("Notebook at {}", handle.url));
    Ok(())
}
