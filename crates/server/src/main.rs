use clap::Parser;
use tracing::error;
use tunelink_server::{app, cli::Cli, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = app::run(cli.into_config()).await {
		error!(target = "tl", error = %err, "server failed");
		std::process::exit(1);
	}
}
