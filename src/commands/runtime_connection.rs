// ABOUTME: Shared helper for connecting to the local container engine.
// ABOUTME: Used by every command that needs an engine.

use kagglelab::config::Config;
use kagglelab::error::Result;
use kagglelab::output::Output;
use kagglelab::runtime::{BollardRuntime, connect_local};

/// Detect the engine named by `config` (or the first one found) and
/// verify it answers.
pub async fn connect_to_runtime(config: &Config, output: &Output) -> Result<BollardRuntime> {
    output.progress("→ Connecting to container engine...");
    let runtime = connect_local(Some(&config.runtime)).await?;
    output.progress(&format!("→ Using {}", runtime.runtime_type()));
    Ok(runtime)
}
