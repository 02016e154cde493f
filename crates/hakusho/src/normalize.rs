use std::path::{Path, PathBuf};

use hakusho_core::normalize::normalize_breaks;

use crate::files::{display_name, read_text_lossy, require_files, write_file};
use crate::prelude::{println, *};

const INPUT_SUFFIX: &str = ".clean.txt";
const OUTPUT_SUFFIX: &str = ".norm.txt";

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct NormalizeOptions {
    /// Directory holding the *.clean.txt corpora
    #[arg(long, env = "HAKUSHO_CLEAN_DIR", default_value = "txt_clean")]
    pub in_dir: PathBuf,

    /// Output directory for the *.norm.txt corpora
    #[arg(long, env = "HAKUSHO_NORM_DIR", default_value = "txt_clean_norm")]
    pub out_dir: PathBuf,
}

pub async fn run(options: NormalizeOptions, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("Input: {}", options.in_dir.display());
        println!("Output: {}", options.out_dir.display());
        println!();
    }

    for path in require_files(&options.in_dir, INPUT_SUFFIX)? {
        let out = normalize_file(&path, &options.out_dir)?;
        println!("wrote {}", out.display());
    }

    Ok(())
}

/// `2017.clean.txt` -> `2017.norm.txt`
pub fn output_name(input: &Path) -> String {
    let name = display_name(input);
    match name.strip_suffix(INPUT_SUFFIX) {
        Some(stem) => f!("{stem}{OUTPUT_SUFFIX}"),
        None => f!("{name}{OUTPUT_SUFFIX}"),
    }
}

pub fn normalize_file(path: &Path, out_dir: &Path) -> Result<PathBuf> {
    let text = read_text_lossy(path)?;
    let out = out_dir.join(output_name(path));
    write_file(&out, normalize_breaks(&text))?;
    log::info!("normalized {} -> {}", path.display(), out.display());
    Ok(out)
}
