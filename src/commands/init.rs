// ABOUTME: Init command implementation.
// ABOUTME: Writes a kagglelab.yml template into the current directory.

use kagglelab::config::{self, CONFIG_FILENAME};
use kagglelab::error::Result;
use kagglelab::output::Output;
use std::env;

pub fn init(competition: Option<&str>, force: bool, output: &Output) -> Result<()> {
    let cwd = env::current_dir()?;
    config::init_config(&cwd, competition, force)?;
    output.success(&format!("Created {}", CONFIG_FILENAME));
    Ok(())
}
