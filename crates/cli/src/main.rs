mod echo;

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, bail};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use owo_colors::OwoColorize;
use storescope_core::dataset::{DEFAULT_SAMPLES, DEFAULT_SEED};
use storescope_core::{
    JsonConfig, JsonFormatter, ProductOptions, SeoAnalyzer, SeoModel, Settings, TextConfig, TextFormatter,
    TrainConfig, fetch_file, find_products, generate, parse_http_url, read_csv, rmse, train, train_test_split,
    write_csv,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use echo::{print_banner, print_detail, print_error, print_info, print_step, print_success, print_warning};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_DATA_PATH: &str = "data/seo_dataset.csv";

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: text, json", s)),
        }
    }
}

/// Score web pages for SEO and find storefronts for product photos
#[derive(Parser, Debug)]
#[command(name = "storescope")]
#[command(version)]
#[command(about = "Score web pages for SEO and find storefronts for product photos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text", value_name = "FORMAT")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging and step output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one page: URL, local HTML file, or "-" for stdin
    Analyze {
        #[arg(value_name = "INPUT")]
        input: String,

        /// Keyword to measure density for (default: the page's top keyword)
        #[arg(short, long, value_name = "KEYWORD")]
        keyword: Option<String>,

        #[command(flatten)]
        lookups: LookupArgs,
    },

    /// Analyze several URLs and rank them by SEO score
    Rank {
        #[arg(value_name = "URL", required = true, num_args = 1..)]
        urls: Vec<String>,

        /// Keyword to measure density for on every page
        #[arg(short, long, value_name = "KEYWORD")]
        keyword: Option<String>,

        #[command(flatten)]
        lookups: LookupArgs,
    },

    /// Label a product photo, search for storefronts and rank them
    Products {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Number of image labels to search for (1-5)
        #[arg(long, default_value_t = 3, value_name = "NUM")]
        top_k: usize,

        /// Maximum storefront URLs to collect (5-30)
        #[arg(long, default_value_t = 12, value_name = "NUM")]
        max_urls: usize,

        /// Rank the collected URLs by SEO score
        #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
        rank: bool,

        /// Comma-separated candidate labels (default: built-in product list)
        #[arg(long, value_delimiter = ',', value_name = "LABELS")]
        labels: Vec<String>,

        /// Local CLIP safetensors weights (default: download from the Hugging Face hub)
        #[arg(long, value_name = "FILE", requires = "tokenizer")]
        weights: Option<PathBuf>,

        /// Local CLIP tokenizer.json, used with --weights
        #[arg(long, value_name = "FILE", requires = "weights")]
        tokenizer: Option<PathBuf>,

        #[command(flatten)]
        lookups: LookupArgs,
    },

    /// Generate a synthetic SEO training dataset
    GenerateData {
        /// Number of rows
        #[arg(long, default_value_t = DEFAULT_SAMPLES, value_name = "NUM")]
        samples: usize,

        /// Random seed
        #[arg(long, default_value_t = DEFAULT_SEED, value_name = "SEED")]
        seed: u64,

        /// Destination CSV
        #[arg(long, default_value = DEFAULT_DATA_PATH, value_name = "FILE")]
        out: PathBuf,
    },

    /// Train the SEO score model from a CSV dataset
    Train {
        /// Training CSV
        #[arg(long, default_value = DEFAULT_DATA_PATH, value_name = "FILE")]
        data: PathBuf,

        /// Where to write the model (default: $STORESCOPE_MODEL_PATH or model/seo_model.txt)
        #[arg(long, value_name = "FILE")]
        model_out: Option<PathBuf>,

        /// Boosting rounds
        #[arg(long, default_value_t = 100, value_name = "NUM")]
        estimators: usize,

        /// Shrinkage per tree
        #[arg(long, default_value_t = 0.1, value_name = "RATE")]
        learning_rate: f64,

        /// Maximum tree depth
        #[arg(long, default_value_t = 5, value_name = "NUM")]
        max_depth: usize,

        /// Maximum leaves per tree
        #[arg(long, default_value_t = 31, value_name = "NUM")]
        max_leaves: usize,

        /// Minimum rows per leaf
        #[arg(long, default_value_t = 20, value_name = "NUM")]
        min_samples_leaf: usize,

        /// Fraction of rows held out to report RMSE on (0 = train on everything)
        #[arg(long, default_value_t = 0.0, value_name = "FRACTION")]
        holdout: f64,
    },

    /// Generate a shell completion script
    Completions {
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

/// Options shared by the page-analysis commands
#[derive(Args, Debug, Clone)]
struct LookupArgs {
    /// Skip the trending-keywords feed
    #[arg(long)]
    no_trends: bool,

    /// Skip the PageSpeed Insights lookup
    #[arg(long)]
    no_pagespeed: bool,

    /// SEO model file (default: $STORESCOPE_MODEL_PATH or model/seo_model.txt)
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// HTTP timeout in seconds for page fetches
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Custom User-Agent for page fetches
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

impl LookupArgs {
    /// Builds an analyzer from settings with command-line overrides applied.
    fn analyzer(&self, settings: &Settings) -> SeoAnalyzer {
        let mut settings = settings.clone();
        if let Some(model) = &self.model {
            settings.model_path = model.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.http_timeout = timeout;
        }

        let mut fetch = settings.fetch_config();
        if let Some(ua) = &self.user_agent {
            fetch.user_agent = ua.clone();
        }

        debug!(
            model = %settings.model_path.display(),
            timeout = fetch.timeout,
            trends = !self.no_trends,
            pagespeed = !self.no_pagespeed,
            "building analyzer"
        );

        let model = settings.load_model();
        if model.is_none() {
            print_warning(&format!(
                "No usable SEO model at {}; scores will be n/a (run `storescope train`)",
                settings.model_path.display()
            ));
        }

        let mut builder = SeoAnalyzer::builder().fetch_config(fetch).maybe_model(model);
        if !self.no_trends {
            builder = builder.trends(settings.trends_client());
        }
        if !self.no_pagespeed {
            if settings.pagespeed_api_key.is_none() {
                print_info("GOOGLE_PAGESPEED_API_KEY not set; skipping PageSpeed");
            }
            builder = builder.pagespeed(settings.pagespeed_client());
        }
        builder.build()
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,storescope=debug,storescope_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Writes rendered output to the chosen file or stdout.
fn emit(output: Option<&Path>, rendered: &str, format: OutputFormat) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None if format == OutputFormat::Text && io::stdout().is_terminal() => {
            println!("{}", echo::colorize_report(rendered));
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn text_formatter() -> TextFormatter {
    TextFormatter::new(TextConfig::default())
}

fn json_formatter() -> JsonFormatter {
    JsonFormatter::new(JsonConfig { pretty: true })
}

/// Reads a page from stdin or a file and returns `(label, html)`.
fn read_local_page(input: &str) -> anyhow::Result<(String, String)> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read from stdin")?;
        Ok(("stdin".to_string(), buffer))
    } else {
        let html = fetch_file(input).with_context(|| format!("Failed to read file: {}", input))?;
        Ok((input.to_string(), html))
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

async fn run_analyze(cli: &Cli, input: &str, keyword: Option<&str>, lookups: &LookupArgs) -> anyhow::Result<()> {
    let settings = Settings::from_env();

    if cli.verbose {
        print_step(1, 3, "Preparing analyzer");
    }
    let analyzer = lookups.analyzer(&settings);

    let report = if is_url(input) {
        if cli.verbose {
            print_step(2, 3, &format!("Fetching and analyzing {}", input.bright_white().underline()));
        }
        analyzer
            .analyze_website(input, keyword)
            .await
            .with_context(|| format!("Failed to analyze {}", input))?
    } else {
        if cli.verbose {
            print_step(2, 3, &format!("Reading and analyzing {}", input.bright_white()));
        }
        let (label, html) = read_local_page(input)?;
        if cli.verbose {
            print_detail("Size", &echo::format_size(html.len()));
        }
        let trends = analyzer.trending_keywords().await;
        analyzer.build_report(&label, &html, keyword, &trends, None)
    };

    if cli.verbose {
        print_step(3, 3, "Writing report");
    }

    let rendered = match cli.format {
        OutputFormat::Text => text_formatter().report(&report),
        OutputFormat::Json => json_formatter().report(&report).context("Failed to serialize report")?,
    };
    emit(cli.output.as_deref(), &rendered, cli.format)
}

async fn run_rank(cli: &Cli, urls: &[String], keyword: Option<&str>, lookups: &LookupArgs) -> anyhow::Result<()> {
    for url in urls {
        if let Err(e) = parse_http_url(url) {
            print_warning(&format!("Not an http(s) URL, skipping {}: {}", url, e));
        }
    }

    let settings = Settings::from_env();
    if cli.verbose {
        print_step(1, 2, &format!("Analyzing {} URLs", urls.len()));
    }

    let analyzer = lookups.analyzer(&settings);
    let reports = analyzer.rank_urls(urls, keyword).await;

    if reports.len() < urls.len() {
        print_warning(&format!("{} of {} URLs could not be analyzed", urls.len() - reports.len(), urls.len()));
    }
    if cli.verbose {
        print_step(2, 2, "Writing ranking");
    }

    let rendered = match cli.format {
        OutputFormat::Text => text_formatter().ranking(&reports),
        OutputFormat::Json => json_formatter().ranking(&reports).context("Failed to serialize ranking")?,
    };
    emit(cli.output.as_deref(), &rendered, cli.format)
}

async fn run_products(
    cli: &Cli,
    image: &Path,
    options: ProductOptions,
    weights: Option<&Path>,
    tokenizer: Option<&Path>,
    lookups: &LookupArgs,
) -> anyhow::Result<()> {
    let settings = Settings::from_env();
    let search = settings.search_client();
    if !search.has_api_key() {
        bail!("SERPAPI_KEY is not set; product search needs a SerpApi key");
    }

    let bytes = fs::read(image).with_context(|| format!("Failed to read image: {}", image.display()))?;

    if cli.verbose {
        print_step(1, 3, "Loading CLIP model");
        print_detail("Image", &format!("{} ({})", image.display(), echo::format_size(bytes.len())));
    }
    let classifier = match (weights, tokenizer) {
        (Some(weights), Some(tokenizer)) => storescope_core::ClipClassifier::from_files(weights, tokenizer),
        _ => storescope_core::ClipClassifier::from_hub().await,
    }
    .context("Failed to load CLIP model")?;

    if cli.verbose {
        print_step(2, 3, "Classifying image and searching for storefronts");
    }
    let analyzer = lookups.analyzer(&settings);
    let report = find_products(&classifier, &search, &analyzer, &bytes, &options)
        .await
        .context("Failed to find products")?;

    if cli.verbose {
        print_step(3, 3, "Writing results");
    }

    let rendered = match cli.format {
        OutputFormat::Text => text_formatter().products(&report),
        OutputFormat::Json => json_formatter().products(&report).context("Failed to serialize products")?,
    };
    emit(cli.output.as_deref(), &rendered, cli.format)
}

fn run_generate(cli: &Cli, samples: usize, seed: u64, out: &Path) -> anyhow::Result<()> {
    if cli.verbose {
        print_step(1, 1, &format!("Generating {} rows (seed {})", samples, seed));
    }

    let rows = generate(samples, seed);
    write_csv(out, &rows).with_context(|| format!("Failed to write dataset: {}", out.display()))?;

    print_success(&format!("SEO dataset generated at {}", out.display().bright_white()));
    Ok(())
}

fn run_train(cli: &Cli, data: &Path, model_out: &Path, config: &TrainConfig, holdout: f64) -> anyhow::Result<()> {
    if !(0.0..1.0).contains(&holdout) {
        bail!("--holdout must be in [0, 1), got {}", holdout);
    }

    if cli.verbose {
        print_step(1, 3, &format!("Loading {}", data.display()));
    }
    let samples = read_csv(data).with_context(|| format!("Failed to load dataset: {}", data.display()))?;
    if samples.is_empty() {
        bail!("Dataset {} has no rows", data.display());
    }
    print_info(&format!("Loaded dataset with {} rows", samples.len()));

    let (train_rows, test_rows) = train_test_split(&samples, holdout, DEFAULT_SEED);

    if cli.verbose {
        print_step(2, 3, "Training gradient-boosted trees");
        print_detail("Rounds", &config.n_estimators.to_string());
        print_detail("Learning rate", &config.learning_rate.to_string());
    }
    let model = train(&train_rows, config).context("Training failed")?;

    let (eval_set, eval_name) =
        if test_rows.is_empty() { (&train_rows, "training") } else { (&test_rows, "held-out") };
    let error = rmse(&model, eval_set).context("Failed to evaluate model")?;

    if cli.verbose {
        print_step(3, 3, &format!("Saving model to {}", model_out.display()));
    }
    if let Some(parent) = model_out.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    model.save(model_out).with_context(|| format!("Failed to save model: {}", model_out.display()))?;
    SeoModel::load(model_out).context("Saved model does not load back")?;

    print_success(&format!("Model saved to {}", model_out.display().bright_white()));

    let rendered = match cli.format {
        OutputFormat::Text => format!("{} RMSE: {:.3} ({} rows)", eval_name, error, eval_set.len()),
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "model_path": model_out.display().to_string(),
                "train_rows": train_rows.len(),
                "test_rows": test_rows.len(),
                "rmse": error,
                "rmse_on": eval_name,
                "trees": model.trees.len(),
            });
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        }
    };
    emit(cli.output.as_deref(), &rendered, cli.format)
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Analyze { input, keyword, lookups } => run_analyze(cli, input, keyword.as_deref(), lookups).await,
        Command::Rank { urls, keyword, lookups } => run_rank(cli, urls, keyword.as_deref(), lookups).await,
        Command::Products { image, top_k, max_urls, rank, labels, weights, tokenizer, lookups } => {
            let options = ProductOptions { top_k: *top_k, max_urls: *max_urls, rank: *rank, labels: labels.clone() };
            run_products(cli, image, options, weights.as_deref(), tokenizer.as_deref(), lookups).await
        }
        Command::GenerateData { samples, seed, out } => run_generate(cli, *samples, *seed, out),
        Command::Train {
            data,
            model_out,
            estimators,
            learning_rate,
            max_depth,
            max_leaves,
            min_samples_leaf,
            holdout,
        } => {
            let model_out = model_out.clone().unwrap_or_else(|| Settings::from_env().model_path);
            let config = TrainConfig {
                n_estimators: *estimators,
                learning_rate: *learning_rate,
                max_depth: *max_depth,
                max_leaves: *max_leaves,
                min_samples_leaf: *min_samples_leaf,
            };
            run_train(cli, data, &model_out, &config, *holdout)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "storescope", &mut io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    if let Err(e) = run(&cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
