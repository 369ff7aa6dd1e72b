// ABOUTME: Build command implementation.
// ABOUTME: Runs every configured step and prints the resulting image.

use super::progress::{report_diagnostics, spawn_reporter};
use super::runtime_connection::connect_to_runtime;
use kagglelab::config::Config;
use kagglelab::diagnostics::Diagnostics;
use kagglelab::error::Result;
use kagglelab::output::Output;
use kagglelab::pipeline::Executor;

pub async fn build(config: &Config, mut output: Output) -> Result<()> {
    output.start_timer();
    let spec = config.to_pipeline()?.into_spec();
    let runtime = connect_to_runtime(config, &output).await?;

    let mut diag = Diagnostics::default();
    let (events, reporter) = spawn_reporter(output.clone());
    let result = Executor::new(&runtime, config.executor_options())
        .with_events(events)
        .build(&spec, &mut diag)
        .await;
    let _ = reporter.await;
    report_diagnostics(&output, &diag);

    let built = result?;
    let image = match &config.tag {
        Some(tag) => tag.to_string(),
        None => built.image.clone(),
    };
    output.success(&format!("Built {} ({} step(s))", image, built.layers.len()));
    Ok(())
}
