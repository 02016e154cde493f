use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use colored::Colorize;
use hakusho_core::clean::{clean_text, CleanConfig};
use hakusho_core::corpus::{append_source, assemble_document, text_stats, year_from_path};
use hakusho_core::reader::{render_page, ReaderConfig, DEFAULT_COLUMN_THRESHOLD};

use crate::files::{display_name, find_files, write_file};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct ExtractOptions {
    /// Directory searched recursively for PDFs (e.g. pdf/2017/*.pdf)
    #[arg(long, env = "HAKUSHO_PDF_ROOT", default_value = "corpus/pdf")]
    pub pdf_root: PathBuf,

    /// Output directory for year-level raw text
    #[arg(long, env = "HAKUSHO_RAW_DIR", default_value = "txt_raw")]
    pub raw_dir: PathBuf,

    /// Output directory for year-level cleaned text
    #[arg(long, env = "HAKUSHO_CLEAN_DIR", default_value = "txt_clean")]
    pub clean_dir: PathBuf,

    /// A page is read as two columns when both halves hold more fragments than this
    #[arg(long, env = "HAKUSHO_COLUMN_THRESHOLD", default_value_t = DEFAULT_COLUMN_THRESHOLD)]
    pub column_threshold: usize,
}

/// What one year produced.
#[derive(Debug, serde::Serialize)]
pub struct YearOutput {
    pub year: String,
    pub pdfs: usize,
    pub failed: usize,
    pub raw_path: PathBuf,
    pub clean_path: PathBuf,
    pub clean_chars: usize,
}

pub async fn run(options: ExtractOptions, global: crate::Global) -> Result<()> {
    if global.verbose {
        println!("PDF root: {}", options.pdf_root.display());
        println!("Column threshold: {}", options.column_threshold);
        println!();
    }

    let spinner = new_spinner()?;
    let outputs = tokio::task::spawn_blocking({
        let spinner = spinner.clone();
        move || extract_all(&options, &spinner)
    })
    .await??;
    spinner.finish_and_clear();

    let mut table = new_table();
    table.add_row(prettytable::row![
        "Year".bold().cyan(),
        "PDFs".bold().cyan(),
        "Failed".bold().cyan(),
        "Clean chars".bold().cyan(),
        "Output".bold().cyan()
    ]);
    for out in &outputs {
        let failed = if out.failed > 0 {
            out.failed.to_string().red().to_string()
        } else {
            out.failed.to_string()
        };
        table.add_row(prettytable::row![
            out.year,
            out.pdfs,
            failed,
            out.clean_chars,
            out.clean_path.display()
        ]);
    }
    table.printstd();

    let failed: usize = outputs.iter().map(|o| o.failed).sum();
    if failed > 0 {
        eprintln!(
            "{}",
            f!("{failed} PDF(s) could not be read; see the log for details").yellow()
        );
    }

    Ok(())
}

/// Group PDFs by the year inferred from their path below `root`.
pub fn group_by_year(root: &Path, pdfs: Vec<PathBuf>) -> BTreeMap<String, Vec<PathBuf>> {
    let mut by_year: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for pdf in pdfs {
        let relative = pdf.strip_prefix(root).unwrap_or(&pdf);
        by_year.entry(year_from_path(relative)).or_default().push(pdf);
    }
    by_year
}

/// Text of one PDF: every page read in column order under a page marker.
pub fn extract_document(path: &Path, config: &ReaderConfig) -> Result<String> {
    let pages = pdf::read_pages(path).map_err(|e| eyre!("{}: {e}", path.display()))?;
    Ok(assemble_document(
        pages.iter().map(|page| render_page(page, config)),
    ))
}

fn extract_all(options: &ExtractOptions, spinner: &indicatif::ProgressBar) -> Result<Vec<YearOutput>> {
    let pdfs = find_files(&options.pdf_root, ".pdf")?;
    if pdfs.is_empty() {
        return Err(Error::NoInputs(f!("no PDFs under {}", options.pdf_root.display())).into());
    }

    let config = ReaderConfig {
        column_threshold: options.column_threshold,
    };
    let clean_config = CleanConfig::default();
    let mut outputs = Vec::new();

    for (year, year_pdfs) in group_by_year(&options.pdf_root, pdfs) {
        log::info!("year {year}: {} PDF(s)", year_pdfs.len());

        let mut raw = String::new();
        let mut failed = 0;
        for (index, pdf) in year_pdfs.iter().enumerate() {
            spinner.set_message(f!(
                "[{year}] {}/{} {}",
                index + 1,
                year_pdfs.len(),
                display_name(pdf)
            ));
            match extract_document(pdf, &config) {
                Ok(document) => append_source(&mut raw, &display_name(pdf), &document),
                Err(err) => {
                    log::warn!("skipping {err}");
                    failed += 1;
                }
            }
        }

        let raw_path = options.raw_dir.join(f!("{year}.txt"));
        write_file(&raw_path, &raw)?;
        log::info!("wrote {}", raw_path.display());

        let cleaned = clean_text(&raw, &clean_config);
        let clean_path = options.clean_dir.join(f!("{year}.clean.txt"));
        write_file(&clean_path, &cleaned)?;
        log::info!("wrote {}", clean_path.display());

        outputs.push(YearOutput {
            year,
            pdfs: year_pdfs.len(),
            failed,
            raw_path,
            clean_path,
            clean_chars: text_stats(&cleaned).chars,
        });
    }

    Ok(outputs)
}
