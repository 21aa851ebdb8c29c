//! Emit the OpenAPI document as pretty-printed JSON.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::path::PathBuf;

use carbon_tracker::doc::ApiDoc;
use clap::Parser;
use color_eyre::eyre::WrapErr;
use utoipa::OpenApi;

/// `openapi-dump` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "openapi-dump",
    about = "Write the carbon tracker OpenAPI document",
    version
)]
struct CliArgs {
    /// Write to this file instead of stdout.
    #[arg(long, short, value_name = "path")]
    output: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let document = ApiDoc::openapi().to_pretty_json()?;
    match args.output {
        Some(path) => std::fs::write(&path, format!("{document}\n"))
            .wrap_err_with(|| format!("failed to write {}", path.display()))?,
        None => println!("{document}"),
    }
    Ok(())
}
