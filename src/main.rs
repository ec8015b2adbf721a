//! thoth: archive browser tab snapshots and email into SQLite

use anyhow::Result;

fn main() -> Result<()> {
    thoth::cli::run()
}
