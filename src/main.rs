//! Webpluck main entry point
//!
//! This is the command-line interface for the webpluck extraction engine.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use webpluck::presets::{Preset, PresetStore};
use webpluck::scrape::ScrapeContext;
use webpluck::{export, Engine, ProgressEvent, ScrapeRequest, ScrapeResult, SelectorKind, Transport};

fn parse_kind(s: &str) -> Result<SelectorKind, String> {
    s.parse()
}

/// Webpluck: a selector-driven web extraction engine
///
/// Webpluck pulls structured records out of HTML pages with CSS selectors,
/// optionally following pagination links and enriching records from detail
/// pages, while respecting robots.txt.
#[derive(Parser, Debug)]
#[command(name = "webpluck")]
#[command(version = "1.0.0")]
#[command(about = "A selector-driven web extraction engine", long_about = None)]
struct Cli {
    /// URL of the page to scrape (omit when running a preset)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// CSS selector matching the target elements
    #[arg(short, long)]
    selector: Option<String>,

    /// Selector dialect (css, selector, and query are aliases)
    #[arg(long, value_name = "KIND", default_value = "css", value_parser = parse_kind)]
    kind: SelectorKind,

    /// Attribute to pull from each matched element
    #[arg(short, long)]
    attribute: Option<String>,

    /// Explicit User-Agent string (otherwise one is generated per run)
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Bias generated identities toward mobile browsers
    #[arg(long)]
    mobile: bool,

    /// Stop after collecting this many records
    #[arg(long, value_name = "N")]
    max_items: Option<usize>,

    /// Stop after visiting this many pages
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// CSS selector for the "next page" link
    #[arg(long, value_name = "SELECTOR")]
    next_selector: Option<String>,

    /// CSS selector locating each record's detail link
    #[arg(long, value_name = "SELECTOR")]
    detail_url_selector: Option<String>,

    /// Attribute holding the detail link (default: href)
    #[arg(long, value_name = "ATTR")]
    detail_url_attribute: Option<String>,

    /// CSS selector for the image on each detail page
    #[arg(long, value_name = "SELECTOR")]
    detail_image_selector: Option<String>,

    /// Attribute holding the detail image (default: src)
    #[arg(long, value_name = "ATTR")]
    detail_image_attribute: Option<String>,

    /// Use shorter retry backoff
    #[arg(long)]
    fast: bool,

    /// Skip the robots.txt check
    #[arg(long)]
    no_robots: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: Format,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Fetch every record's image into a ZIP archive at this path
    #[arg(long, value_name = "FILE")]
    images: Option<PathBuf>,

    /// Path of the preset file
    #[arg(long, value_name = "FILE", default_value = "presets.json")]
    presets_file: PathBuf,

    /// Run a saved preset by id or name
    #[arg(long, value_name = "ID", conflicts_with = "url")]
    preset: Option<String>,

    /// List saved presets and exit
    #[arg(long, conflicts_with_all = ["url", "preset", "save_preset", "delete_preset"])]
    list_presets: bool,

    /// Save the given flags as a named preset and exit
    #[arg(long, value_name = "NAME", conflicts_with = "preset")]
    save_preset: Option<String>,

    /// Delete the preset with the given id and exit
    #[arg(long, value_name = "ID", conflicts_with_all = ["url", "preset", "save_preset"])]
    delete_preset: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let store = PresetStore::new(&cli.presets_file);

    if cli.list_presets {
        handle_list_presets(&store);
        return Ok(());
    }
    if let Some(id) = &cli.delete_preset {
        handle_delete_preset(&store, id)?;
        return Ok(());
    }
    if let Some(name) = &cli.save_preset {
        handle_save_preset(&store, name, &cli)?;
        return Ok(());
    }

    let request = build_request(&cli, &store)?;
    handle_scrape(&cli, request).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webpluck=info,warn"),
            1 => EnvFilter::new("webpluck=debug,info"),
            2 => EnvFilter::new("webpluck=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Resolves the scrape request from a preset or from the command line
fn build_request(cli: &Cli, store: &PresetStore) -> anyhow::Result<ScrapeRequest> {
    let mut request = if let Some(wanted) = &cli.preset {
        let preset = store
            .load()
            .into_iter()
            .find(|p| &p.id == wanted || &p.name == wanted)
            .ok_or_else(|| anyhow::anyhow!("no preset matching '{}'", wanted))?;
        tracing::info!("Running preset '{}' ({})", preset.name, preset.id);
        preset.to_request()
    } else {
        let url = cli
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("a URL or --preset is required"))?;
        let selector = cli
            .selector
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--selector is required"))?;
        let mut request = ScrapeRequest::new(url, selector);
        request.selector_kind = cli.kind;
        request.attribute = cli.attribute.clone();
        request.max_items = cli.max_items;
        request.max_pages = cli.max_pages;
        request.next_selector = cli.next_selector.clone();
        request.detail_url_selector = cli.detail_url_selector.clone();
        if let Some(attr) = &cli.detail_url_attribute {
            request.detail_url_attribute = attr.clone();
        }
        request.detail_image_selector = cli.detail_image_selector.clone();
        if let Some(attr) = &cli.detail_image_attribute {
            request.detail_image_attribute = attr.clone();
        }
        request
    };

    // Flags that make sense on top of a preset too
    request.identity = cli.user_agent.clone().or(request.identity);
    request.prefer_mobile = cli.mobile || request.prefer_mobile;
    request.fast_mode = cli.fast;
    if cli.no_robots {
        request.respect_robots = false;
    }
    if let Some(secs) = cli.timeout {
        request.timeout = Some(std::time::Duration::from_secs(secs));
    }

    Ok(request)
}

/// Handles the main scrape operation
async fn handle_scrape(cli: &Cli, request: ScrapeRequest) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping");
            signal_token.cancel();
        }
    });

    let observer = |event: ProgressEvent| {
        tracing::info!(
            "{:?}: {} records so far ({})",
            event.stage,
            event.items_so_far,
            event.current_url
        );
    };
    let ctx = ScrapeContext::new(&cancel).with_observer(&observer);

    let engine = Engine::new();
    tracing::info!("Scraping {} with selector '{}'", request.url, request.selector);
    let result = match engine.scrape(&request, &ctx).await {
        Ok(result) => {
            tracing::info!(
                "Extracted {} records in {}ms",
                result.records.len(),
                result.elapsed_ms
            );
            result
        }
        Err(e) => {
            tracing::error!("Scrape failed: {}", e);
            return Err(e.into());
        }
    };

    let rendered = match cli.format {
        Format::Table => render_table(&result),
        Format::Csv => export::to_csv(&result.records)?,
        Format::Json => export::to_json(&result.records)?,
    };
    match &cli.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            println!("✓ Wrote {} records to {}", result.records.len(), path.display());
        }
        None => print!("{}", rendered),
    }

    if let Some(path) = &cli.images {
        let transport = Transport::for_request(&request)?;
        tracing::info!("Bundling images for {} records", result.records.len());
        let archive = export::bundle_images(&transport, &result.records, &ctx).await?;
        std::fs::write(path, archive)?;
        println!("✓ Image archive written to {}", path.display());
    }

    Ok(())
}

/// Renders records as a human-readable table
fn render_table(result: &ScrapeResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} records from {} ({}ms)\n\n",
        result.records.len(),
        result.url,
        result.elapsed_ms
    ));
    for record in &result.records {
        out.push_str(&format!("[{}] <{}> {}\n", record.index, record.tag, record.text));
        if let Some(href) = &record.href {
            out.push_str(&format!("      href: {}\n", href));
        }
        if let Some(value) = &record.attribute_value {
            out.push_str(&format!("      attr: {}\n", value));
        }
        if let Some(image) = &record.image_url {
            out.push_str(&format!("      image: {}\n", image));
        }
    }
    out
}

/// Handles --list-presets
fn handle_list_presets(store: &PresetStore) {
    let presets = store.load();
    if presets.is_empty() {
        println!("No presets in {}", store.path().display());
        return;
    }
    println!("Presets in {}:\n", store.path().display());
    for preset in presets {
        println!("  {} {}", preset.id, preset.name);
        println!("      url: {}", preset.url);
        println!("      selector: {}", preset.selector);
    }
}

/// Handles --save-preset
fn handle_save_preset(store: &PresetStore, name: &str, cli: &Cli) -> anyhow::Result<()> {
    let url = cli
        .url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("a URL is required to save a preset"))?;
    let selector = cli
        .selector
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--selector is required to save a preset"))?;

    let preset = Preset {
        id: String::new(),
        name: name.to_string(),
        url: url.to_string(),
        selector: selector.to_string(),
        attribute: cli.attribute.clone(),
        identity: cli.user_agent.clone(),
        max_items: cli.max_items,
        next_selector: cli.next_selector.clone(),
        max_pages: cli.max_pages,
        respect_robots: !cli.no_robots,
        detail_url_selector: cli.detail_url_selector.clone(),
        detail_url_attribute: cli.detail_url_attribute.clone(),
        detail_image_selector: cli.detail_image_selector.clone(),
        detail_image_attribute: cli.detail_image_attribute.clone(),
    };
    let saved = store.save(preset)?;
    println!("✓ Saved preset '{}' as {}", saved.name, saved.id);
    Ok(())
}

/// Handles --delete-preset
fn handle_delete_preset(store: &PresetStore, id: &str) -> anyhow::Result<()> {
    if store.delete(id)? {
        println!("✓ Deleted preset {}", id);
    } else {
        println!("No preset with id {}", id);
    }
    Ok(())
}
