use crate::prelude::*;
use clap::Parser;

mod collect;
mod count;
mod error;
mod extract;
mod files;
mod normalize;
mod prelude;
mod tokenize;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Builds year-level Japanese whitepaper corpora: collect archived HTML, \
                  extract PDFs in column order, normalize line breaks and tokenize"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "HAKUSHO_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Download numbered or index-linked HTML pages from a web archive
    Collect(crate::collect::CollectOptions),

    /// Extract PDFs into year-level raw and cleaned text
    Extract(crate::extract::ExtractOptions),

    /// Rejoin wrapped lines of the cleaned corpora
    Normalize(crate::normalize::NormalizeOptions),

    /// Tokenize year corpora into space-separated token files
    Tokenize(crate::tokenize::TokenizeOptions),

    /// Character and word counts of the cleaned corpora
    Count(crate::count::CountOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Collect(options) => crate::collect::run(options, app.global).await,
        SubCommands::Extract(options) => crate::extract::run(options, app.global).await,
        SubCommands::Normalize(options) => crate::normalize::run(options, app.global).await,
        SubCommands::Tokenize(options) => crate::tokenize::run(options, app.global).await,
        SubCommands::Count(options) => crate::count::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
