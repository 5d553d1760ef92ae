use clap::Parser;

use docket_worker::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	docket_worker::run(Args::parse()).await
}
