//! docdigest CLI: ingest text documents and produce sized summaries.
//!
//! Documents are chunked into provenance-tagged fragments, stored locally, and
//! summarized batch by batch through an OpenAI-compatible model endpoint.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
