//! Query command implementation

use anyhow::Result;
use clap::Args;

use super::utils::open_store;
use crate::domain::Config;

#[derive(Args)]
pub struct QueryArgs {
    /// A single read-only SQL statement
    #[arg(value_name = "SQL")]
    pub sql: String,
}

/// Prints a header line and one tab-separated line per row.
pub fn run(args: QueryArgs, config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let output = store.run_query(&args.sql)?;

    println!("{}", output.columns.join("\t"));
    for row in &output.rows {
        println!("{}", row.join("\t"));
    }
    tracing::debug!("{} rows", output.rows.len());
    Ok(())
}
