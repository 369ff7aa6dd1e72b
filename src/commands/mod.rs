// ABOUTME: Command module aggregator for the kagglelab CLI.
// ABOUTME: Re-exports one handler per subcommand.

mod build;
mod debug;
mod init;
mod plan;
mod progress;
mod runtime_connection;
mod serve;
mod stop;

pub use build::build;
pub use debug::debug;
pub use init::init;
pub use plan::plan;
pub use serve::serve;
pub use stop::stop;
