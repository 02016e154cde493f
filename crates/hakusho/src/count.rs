use std::path::{Path, PathBuf};

use colored::Colorize;
use hakusho_core::corpus::{text_stats, TextStats};

use crate::files::{display_name, read_text_lossy, require_files};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct CountOptions {
    /// Directory holding the *.clean.txt corpora
    #[arg(long, env = "HAKUSHO_CLEAN_DIR", default_value = "txt_clean")]
    pub in_dir: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CountRow {
    pub file: String,
    #[serde(flatten)]
    pub stats: TextStats,
}

pub async fn run(options: CountOptions, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Input: {}", options.in_dir.display());
        println!();
    }

    let rows = count_dir(&options.in_dir)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = new_table();
    table.add_row(prettytable::row![
        "File".bold().cyan(),
        "Chars".bold().cyan(),
        "Words".bold().cyan()
    ]);
    for row in &rows {
        table.add_row(prettytable::row![row.file, row.stats.chars, row.stats.words]);
    }
    table.printstd();

    Ok(())
}

pub fn count_dir(dir: &Path) -> Result<Vec<CountRow>> {
    require_files(dir, ".clean.txt")?
        .iter()
        .map(|path| {
            Ok(CountRow {
                file: display_name(path),
                stats: text_stats(&read_text_lossy(path)?),
            })
        })
        .collect()
}
