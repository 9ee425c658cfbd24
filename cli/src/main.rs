use clap::Parser;
use filesync_cli::{Cli, logging};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let log_guard = match logging::init(&cli.log_level, cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("filesync: {e:#}");
            std::process::exit(1);
        }
    };

    let code = match filesync_cli::run(&cli).await {
        Ok(_) => 0,
        Err(e) => {
            error!("{e:#}");
            1
        }
    };

    // A pending stdin read sits on a blocking thread that runtime shutdown
    // would wait on, so leave without tearing the runtime down.
    drop(log_guard);
    std::process::exit(code);
}
