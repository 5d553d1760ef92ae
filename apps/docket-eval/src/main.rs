use clap::Parser;

use docket_eval::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	docket_eval::run(Args::parse()).await
}
