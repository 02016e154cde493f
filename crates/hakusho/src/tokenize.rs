use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use hakusho_core::chunk::{chunk, ChunkerConfig, DEFAULT_MAX_BYTES};
use hakusho_core::corpus::year_from_filename;
use hakusho_core::tokens::{parse_stopwords, tokenize_chunk, ScriptTokenizer, TokenFilter, Tokenizer};

use crate::files::{display_name, read_text_lossy, require_files};
use crate::prelude::{println, *};

#[derive(Debug, clap::Args, serde::Serialize, serde::Deserialize, Clone)]
pub struct TokenizeOptions {
    /// Directory holding the year corpora (*.txt)
    #[arg(long, env = "HAKUSHO_CLEAN_DIR", default_value = "txt_clean")]
    pub in_dir: PathBuf,

    /// Output directory for the *.tokens.txt files
    #[arg(long, env = "HAKUSHO_TOKENS_DIR", default_value = "tokens")]
    pub out_dir: PathBuf,

    /// Largest chunk handed to the tokenizer, in UTF-8 bytes
    #[arg(long, env = "HAKUSHO_MAX_BYTES", default_value_t = DEFAULT_MAX_BYTES)]
    pub max_bytes: usize,

    /// Tokens shorter than this many characters are dropped
    #[arg(long, env = "HAKUSHO_MIN_TOKEN_LEN", default_value_t = 1)]
    pub min_token_len: usize,

    /// Drop stopwords and punctuation-only tokens
    #[arg(long, env = "HAKUSHO_STOPWORDS")]
    pub stopwords: bool,

    /// Stopword list replacing the built-in one (one word per line)
    #[arg(long, env = "HAKUSHO_STOPWORD_FILE", requires = "stopwords")]
    pub stopword_file: Option<PathBuf>,
}

impl TokenizeOptions {
    fn filter(&self) -> Result<TokenFilter> {
        let mut filter = TokenFilter {
            min_token_len: self.min_token_len,
            use_stopwords: self.stopwords,
            ..TokenFilter::default()
        };
        if let Some(path) = &self.stopword_file {
            filter.stopwords = parse_stopwords(&read_text_lossy(path)?);
        }
        Ok(filter)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TokenizeOutput {
    pub input: PathBuf,
    pub output: PathBuf,
    pub tokens: usize,
}

pub async fn run(options: TokenizeOptions, global: crate::Global) -> Result<()> {
    let tokenizer = ScriptTokenizer::default();
    check_chunk_size(options.max_bytes, &tokenizer)?;

    if global.verbose {
        println!(
            "Max bytes: {} Stopwords: {} Min token length: {}",
            options.max_bytes, options.stopwords, options.min_token_len
        );
        println!();
    }

    let files = require_files(&options.in_dir, ".txt")?;
    let spinner = new_spinner()?;
    let outputs = tokio::task::spawn_blocking({
        let spinner = spinner.clone();
        move || -> Result<Vec<TokenizeOutput>> {
            let chunker = ChunkerConfig {
                max_bytes: options.max_bytes,
            };
            let filter = options.filter()?;
            files
                .iter()
                .map(|path| {
                    spinner.set_message(f!("tokenizing {}", display_name(path)));
                    tokenize_file(path, &options.out_dir, &tokenizer, &chunker, &filter)
                })
                .collect()
        }
    })
    .await??;
    spinner.finish_and_clear();

    for out in &outputs {
        println!(
            "wrote {} tokens={}",
            out.output.display().to_string().green(),
            out.tokens.to_string().bright_cyan().bold()
        );
    }

    Ok(())
}

fn check_chunk_size<T: Tokenizer + ?Sized>(max_bytes: usize, tokenizer: &T) -> Result<()> {
    if max_bytes == 0 {
        return Err(Error::Generic("--max-bytes must be positive".into()).into());
    }
    if max_bytes > tokenizer.max_input_bytes() {
        return Err(Error::Generic(f!(
            "--max-bytes {max_bytes} exceeds the tokenizer input limit of {} bytes",
            tokenizer.max_input_bytes()
        ))
        .into());
    }
    Ok(())
}

/// Tokenize `text` chunk by chunk, writing surfaces separated by single
/// spaces. Returns the number of tokens written.
pub fn write_tokens<T, W>(
    text: &str,
    tokenizer: &T,
    chunker: &ChunkerConfig,
    filter: &TokenFilter,
    out: &mut W,
) -> Result<usize>
where
    T: Tokenizer + ?Sized,
    W: Write,
{
    let mut count = 0;
    for piece in chunk(text, chunker) {
        for surface in tokenize_chunk(&piece, tokenizer, filter)? {
            if count > 0 {
                out.write_all(b" ")?;
            }
            out.write_all(surface.as_bytes())?;
            count += 1;
        }
    }
    Ok(count)
}

pub fn tokenize_file<T: Tokenizer + ?Sized>(
    path: &Path,
    out_dir: &Path,
    tokenizer: &T,
    chunker: &ChunkerConfig,
    filter: &TokenFilter,
) -> Result<TokenizeOutput> {
    let text = read_text_lossy(path)?;

    std::fs::create_dir_all(out_dir)
        .wrap_err_with(|| f!("Failed to create {}", out_dir.display()))?;
    let output = out_dir.join(f!("{}.tokens.txt", year_from_filename(path)));
    let file = std::fs::File::create(&output)
        .wrap_err_with(|| f!("Failed to create {}", output.display()))?;

    let mut writer = BufWriter::new(file);
    let tokens = write_tokens(&text, tokenizer, chunker, filter, &mut writer)
        .wrap_err_with(|| f!("Failed to tokenize {}", path.display()))?;
    writer.flush()?;

    log::info!("wrote {} tokens={tokens}", output.display());
    Ok(TokenizeOutput {
        input: path.to_path_buf(),
        output,
        tokens,
    })
}
