//! Webdown main entry point
//!
//! This is the command-line interface for converting single pages and crawling sites.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use webdown::config::{
    load_config_with_hash, CrawlerConfig, CrawlerConfigBuilder, FetchOptions, FormatOptions,
    OutputFormat, ScopePolicy,
};
use webdown::crawler::{convert_page, crawl, crawl_from_sitemap};
use webdown::output::format_summary;

/// Webdown: web pages to Markdown
///
/// Converts a single page, or crawls a site breadth-first (or from its sitemap) and
/// writes one Markdown or Claude XML file per page plus an `index.json` manifest.
#[derive(Parser, Debug)]
#[command(name = "webdown")]
#[command(version)]
#[command(about = "Convert web pages and whole sites to Markdown", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one URL or local HTML file
    Convert {
        /// URL or path of the page
        #[arg(value_name = "URL|PATH")]
        target: String,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        format: FormatArgs,
    },

    /// Crawl from seed URLs or a sitemap
    Crawl(CrawlArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed URLs or local paths
    #[arg(value_name = "SEEDS")]
    seeds: Vec<String>,

    /// Fetch the pages listed in this sitemap instead of following links
    #[arg(long, value_name = "URL")]
    sitemap: Option<String>,

    /// Directory receiving the converted pages and the manifest
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Maximum link depth from the seeds
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Seconds to wait between requests
    #[arg(long, value_name = "SECONDS")]
    delay: Option<f64>,

    /// Follow links anywhere on the seed's registrable domain
    #[arg(long, conflicts_with_all = ["same_subdomain", "path_prefix"])]
    same_domain: bool,

    /// Follow links on the seed's exact host (default)
    #[arg(long, conflicts_with = "path_prefix")]
    same_subdomain: bool,

    /// Follow links on the seed's host whose path starts with PREFIX
    #[arg(long, value_name = "PREFIX")]
    path_prefix: Option<String>,

    /// Stop after this many pages (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// TOML file with defaults; flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    format: FormatArgs,
}

/// Content and format flags shared by both subcommands
#[derive(Args, Debug, Default)]
struct FormatArgs {
    /// Prepend a table of contents
    #[arg(short = 't', long = "toc")]
    toc: bool,

    /// Replace links with their text
    #[arg(short = 'L', long)]
    no_links: bool,

    /// Remove images
    #[arg(short = 'I', long)]
    no_images: bool,

    /// Convert only elements matching this CSS selector
    #[arg(short = 's', long = "css", value_name = "SELECTOR")]
    css: Option<String>,

    /// Collapse runs of blank lines
    #[arg(short = 'c', long)]
    compact: bool,

    /// Wrap paragraphs at this many columns
    #[arg(short = 'w', long, value_name = "N")]
    width: Option<usize>,

    /// Emit Claude XML instead of Markdown
    #[arg(long)]
    claude_xml: bool,

    /// Leave out the XML metadata block
    #[arg(long)]
    no_metadata: bool,

    /// Leave out the date in the XML metadata
    #[arg(long)]
    no_date: bool,
}

impl FormatArgs {
    /// Applies the flags that were given; absent flags keep the current value
    fn apply(&self, options: &mut FormatOptions) {
        if self.toc {
            options.include_toc = true;
        }
        if self.no_links {
            options.include_links = false;
        }
        if self.no_images {
            options.include_images = false;
        }
        if let Some(css) = &self.css {
            options.css_selector = Some(css.clone());
        }
        if self.compact {
            options.compact = true;
        }
        if let Some(width) = self.width {
            options.width = width;
        }
        if self.claude_xml {
            options.format = OutputFormat::ClaudeXml;
        }
        if self.no_metadata {
            options.include_metadata = false;
        }
        if self.no_date {
            options.add_date = false;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let outcome = match cli.command {
        Command::Convert {
            target,
            output,
            format,
        } => handle_convert(&target, output, &format).await,
        Command::Crawl(args) => handle_crawl(args, cli.quiet).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("webdown=info,warn")),
            1 => EnvFilter::new("webdown=debug,info"),
            _ => EnvFilter::new("webdown=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the `convert` subcommand
async fn handle_convert(
    target: &str,
    output: Option<PathBuf>,
    format: &FormatArgs,
) -> anyhow::Result<()> {
    let mut options = FormatOptions::default();
    format.apply(&mut options);

    let page = convert_page(target, &options, &FetchOptions::default())
        .await
        .with_context(|| format!("failed to convert {}", target))?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, &page.content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", page.content),
    }

    Ok(())
}

/// Handles the `crawl` subcommand
async fn handle_crawl(args: CrawlArgs, quiet: bool) -> anyhow::Result<()> {
    let CrawlArgs {
        seeds,
        sitemap,
        output,
        max_depth,
        delay,
        same_domain,
        same_subdomain,
        path_prefix,
        max_pages,
        config,
        format,
    } = args;

    let mut builder = CrawlerConfig::builder(output).seeds(seeds).quiet(quiet);

    // File values first, then flags on top
    if let Some(path) = &config {
        tracing::info!("Loading configuration from: {}", path.display());
        let (file, hash) = load_config_with_hash(path)?;
        tracing::debug!("Configuration hash: {}", hash);
        builder = file.apply(builder)?.config_hash(hash);
    }

    builder = apply_crawl_flags(builder, max_depth, delay, max_pages);
    if same_domain {
        builder = builder.scope(ScopePolicy::SameDomain);
    } else if same_subdomain {
        builder = builder.scope(ScopePolicy::SameSubdomain);
    } else if let Some(prefix) = path_prefix {
        builder = builder.scope(ScopePolicy::PathPrefix(prefix));
    }
    format.apply(builder.format_mut());

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let config = match sitemap {
        Some(_) => builder.build_for_sitemap()?,
        None => builder.build()?,
    };
    let quiet = config.quiet();

    let result = match sitemap {
        Some(sitemap_url) => crawl_from_sitemap(&sitemap_url, config, cancel).await?,
        None => crawl(config, cancel).await?,
    };

    if !quiet {
        println!("{}", format_summary(&result));
    }

    Ok(())
}

fn apply_crawl_flags(
    mut builder: CrawlerConfigBuilder,
    max_depth: Option<u32>,
    delay: Option<f64>,
    max_pages: Option<usize>,
) -> CrawlerConfigBuilder {
    if let Some(depth) = max_depth {
        builder = builder.max_depth(depth);
    }
    if let Some(delay) = delay {
        builder = builder.delay_seconds(delay);
    }
    if let Some(pages) = max_pages {
        builder = builder.max_pages(pages);
    }
    builder
}

/// Cancels the crawl on the first Ctrl-C
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current page and writing manifest");
            cancel.cancel();
        }
    });
}
