//! CLI parsing and orchestration. `auth` stores credentials and a fresh token; `export` runs
//! URLs through the exporter into the filesystem stores. Maps errors to exit codes.

use crate::config::{self, Config, CREDS_FILE_NAME, TOKEN_FILE_NAME};
use crate::encode::OutputFormat;
use crate::epub::EpubVersion;
use crate::export::{ExportFailure, ExportResponse, ExportStage, Exporter};
use crate::reddit::{
    AuthError, AuthManager, Credentials, Endpoints, FileTokenStore, HttpClientBuilder,
    RedditClient, UrlResolver,
};
use crate::store::jsonfile::{read_json, write_json};
use crate::store::{
    BasicBookStore, BookStore, FsImageStore, ImageStore, MultiStore, NoopImageStore, StoreError,
};
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Nesting limit for `@file` inputs that name other `@file`s.
const MAX_INPUT_FILE_DEPTH: usize = 8;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Export(#[from] ExportFailure),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Auth(_) => 2,
            CliRunError::Export(failure) => match failure.source.stage() {
                ExportStage::Parse => 1,
                ExportStage::FetchPost
                | ExportStage::FetchComment
                | ExportStage::DownloadImage => 2,
                ExportStage::Encode | ExportStage::SaveBook | ExportStage::SaveImage => 3,
            },
            CliRunError::Store(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "reddit-exporter")]
#[command(about = "Export Reddit posts as books and comment images as files")]
#[command(
    after_help = "Config file keys (data_dir, secrets_dir, user_agent, format, epub_version, export_images, mirror_dirs, timeout_secs, auth_url, api_base_url, images_base_url, device_id) are read from ./reddit-exporter.toml or ~/.config/reddit-exporter/config.toml. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging and the full error chain.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save Reddit app credentials and fetch a first token.
    Auth(AuthArgs),
    /// Export posts as books and comment images as files.
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct AuthArgs {
    /// Client id of the Reddit installed app.
    #[arg(long, env = "REDDIT_EXPORTER_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Client secret of the Reddit installed app.
    #[arg(long, env = "REDDIT_EXPORTER_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Directory for the creds and token files (overrides config; default ~/.reddit-exporter).
    #[arg(long)]
    pub secrets_dir: Option<PathBuf>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Post or comment URLs. `@FILE` reads one URL per line from FILE.
    #[arg(required = true, value_name = "URL|@FILE")]
    pub urls: Vec<String>,

    /// Data directory: books go to <dir>/books, images to <dir>/images (overrides config; default .).
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Directory for the creds and token files (overrides config; default ~/.reddit-exporter).
    #[arg(long)]
    pub secrets_dir: Option<PathBuf>,

    /// Book format: epub, html, markdown, or text (overrides config; default epub).
    #[arg(long, value_parser = OutputFormat::parse)]
    pub format: Option<OutputFormat>,

    /// Generate EPUB 2 instead of EPUB 3 (only when format is epub).
    #[arg(long)]
    pub epub_2: bool,

    /// Do not store comment images.
    #[arg(long)]
    pub no_images: bool,

    /// Also store every book in this directory. Repeatable.
    #[arg(long, value_name = "DIR")]
    pub mirror: Vec<PathBuf>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Timeout in seconds for Reddit calls (overrides config; default none).
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Everything `export` needs, after merging flags, config, and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub data_dir: PathBuf,
    pub secrets_dir: PathBuf,
    pub format: OutputFormat,
    pub epub_version: EpubVersion,
    pub export_images: bool,
    pub mirror_dirs: Vec<PathBuf>,
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
    pub endpoints: Endpoints,
    pub device_id: Option<String>,
}

impl ExportSettings {
    pub fn resolve(args: &ExportArgs, config: Option<&Config>) -> Result<Self, CliRunError> {
        let format = match (args.format, config.and_then(|c| c.format.as_deref())) {
            (Some(f), _) => f,
            (None, Some(s)) => OutputFormat::parse(s).map_err(CliRunError::InvalidInput)?,
            (None, None) => OutputFormat::Epub,
        };
        let epub_version = if args.epub_2 {
            EpubVersion::Epub2
        } else {
            match config.and_then(|c| c.epub_version) {
                Some(v) => EpubVersion::parse(&v.to_string()).map_err(CliRunError::InvalidInput)?,
                None => EpubVersion::Epub3,
            }
        };
        let mut mirror_dirs = config
            .and_then(|c| c.mirror_dirs.clone())
            .unwrap_or_default();
        mirror_dirs.extend(args.mirror.iter().cloned());

        Ok(Self {
            data_dir: args
                .dir
                .clone()
                .or_else(|| config.and_then(|c| c.data_dir.clone()))
                .unwrap_or_else(|| PathBuf::from(".")),
            secrets_dir: secrets_dir(args.secrets_dir.as_deref(), config),
            format,
            epub_version,
            export_images: !args.no_images
                && config.and_then(|c| c.export_images).unwrap_or(true),
            mirror_dirs,
            user_agent: user_agent(args.user_agent.as_deref(), config),
            timeout: args
                .timeout
                .or_else(|| config.and_then(|c| c.timeout_secs))
                .map(Duration::from_secs),
            endpoints: config.map(Config::endpoints).unwrap_or_default(),
            device_id: config.and_then(|c| c.device_id.clone()),
        })
    }
}

fn secrets_dir(flag: Option<&Path>, config: Option<&Config>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.and_then(|c| c.secrets_dir.clone()))
        .unwrap_or_else(config::default_secrets_dir)
}

fn user_agent(flag: Option<&str>, config: Option<&Config>) -> Option<String> {
    flag.map(str::to_string)
        .or_else(|| config.and_then(|c| c.user_agent.clone()))
}

fn http_client(
    user_agent: Option<&str>,
    timeout: Option<Duration>,
) -> Result<reqwest::blocking::Client, CliRunError> {
    let mut builder = HttpClientBuilder::new().timeout(timeout);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

fn auth_manager(
    credentials: Credentials,
    secrets_dir: &Path,
    http: reqwest::blocking::Client,
    endpoints: &Endpoints,
    device_id: Option<&str>,
) -> AuthManager {
    let store = Arc::new(FileTokenStore::new(secrets_dir.join(TOKEN_FILE_NAME)));
    let manager = AuthManager::new(credentials, store, http, endpoints.auth_url.clone());
    match device_id {
        Some(id) => manager.with_device_id(id),
        None => manager,
    }
}

/// Expand `@FILE` arguments into the file's lines, recursively. Other arguments pass through.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<String>, CliRunError> {
    let mut out = Vec::new();
    for input in inputs {
        expand_input(input, 0, &mut out)?;
    }
    Ok(out)
}

fn expand_input(input: &str, depth: usize, out: &mut Vec<String>) -> Result<(), CliRunError> {
    let Some(path) = input.trim().strip_prefix('@') else {
        out.push(input.to_string());
        return Ok(());
    };
    if depth >= MAX_INPUT_FILE_DEPTH {
        return Err(CliRunError::InvalidInput(format!(
            "Input file {} is nested more than {} levels deep.",
            path, MAX_INPUT_FILE_DEPTH
        )));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliRunError::InvalidInput(format!("Cannot read input file {}: {}", path, e)))?;
    for line in content.lines() {
        expand_input(line, depth + 1, out)?;
    }
    Ok(())
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    match &args.command {
        Command::Auth(auth_args) => run_auth(auth_args, config.as_ref(), args.quiet),
        Command::Export(export_args) => run_export(export_args, config.as_ref(), args.quiet),
    }
}

fn run_auth(args: &AuthArgs, config: Option<&Config>, quiet: bool) -> Result<(), CliRunError> {
    let credentials = Credentials::new(
        args.client_id.clone().unwrap_or_default(),
        args.client_secret.clone().unwrap_or_default(),
    );
    if !credentials.is_complete() {
        return Err(CliRunError::InvalidInput(
            "Client id and secret are required: pass --client-id and --client-secret or set REDDIT_EXPORTER_CLIENT_ID and REDDIT_EXPORTER_CLIENT_SECRET.".to_string(),
        ));
    }

    let secrets_dir = secrets_dir(args.secrets_dir.as_deref(), config);
    let creds_path = secrets_dir.join(CREDS_FILE_NAME);
    write_json(&creds_path, &credentials)?;
    debug!(path = %creds_path.display(), "saved credentials");

    let endpoints = config.map(Config::endpoints).unwrap_or_default();
    let http = http_client(
        user_agent(args.user_agent.as_deref(), config).as_deref(),
        config.and_then(|c| c.timeout_secs).map(Duration::from_secs),
    )?;
    let device_id = config.and_then(|c| c.device_id.as_deref());
    let manager = auth_manager(credentials, &secrets_dir, http, &endpoints, device_id);
    manager.force_auth()?;
    info!(secrets_dir = %secrets_dir.display(), "credentials verified and token stored");

    if !quiet {
        eprintln!("Authenticated. Secrets saved in {}", secrets_dir.display());
    }
    Ok(())
}

fn load_credentials(secrets_dir: &Path) -> Result<Credentials, CliRunError> {
    let path = secrets_dir.join(CREDS_FILE_NAME);
    match read_json::<Credentials>(&path)? {
        Some(creds) if creds.is_complete() => Ok(creds),
        _ => Err(CliRunError::InvalidInput(format!(
            "No credentials in {}. Run `reddit-exporter auth` first.",
            path.display()
        ))),
    }
}

fn book_store(settings: &ExportSettings) -> Result<Arc<dyn BookStore>, CliRunError> {
    let primary: Arc<dyn BookStore> = Arc::new(BasicBookStore::open(settings.data_dir.join("books"))?);
    if settings.mirror_dirs.is_empty() {
        return Ok(primary);
    }
    let mut multi = MultiStore::<dyn BookStore>::new().with("books", primary);
    for dir in &settings.mirror_dirs {
        let mirror: Arc<dyn BookStore> = Arc::new(BasicBookStore::open(dir)?);
        multi.push(dir.display().to_string(), mirror);
    }
    Ok(Arc::new(multi))
}

fn image_store(settings: &ExportSettings) -> Result<Arc<dyn ImageStore>, CliRunError> {
    if !settings.export_images {
        return Ok(Arc::new(NoopImageStore));
    }
    Ok(Arc::new(FsImageStore::open(settings.data_dir.join("images"))?))
}

fn print_ids(response: &ExportResponse) {
    for id in &response.book_ids {
        println!("book\t{}", id);
    }
    for id in &response.image_ids {
        println!("image\t{}", id);
    }
}

fn run_export(args: &ExportArgs, config: Option<&Config>, quiet: bool) -> Result<(), CliRunError> {
    let settings = ExportSettings::resolve(args, config)?;
    let urls = expand_inputs(&args.urls)?;
    let credentials = load_credentials(&settings.secrets_dir)?;

    let http = http_client(settings.user_agent.as_deref(), settings.timeout)?;
    let manager = auth_manager(
        credentials,
        &settings.secrets_dir,
        http.clone(),
        &settings.endpoints,
        settings.device_id.as_deref(),
    );
    let client = RedditClient::new(http, manager, settings.endpoints.clone());
    let resolver = UrlResolver::http(settings.user_agent.as_deref()).map_err(|e| {
        CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e))
    })?;

    let exporter = Exporter::new(
        resolver,
        Arc::new(client),
        settings.format.encoder(settings.epub_version),
        book_store(&settings)?,
        image_store(&settings)?,
    );
    info!(
        urls = urls.len(),
        format = exporter.book_format(),
        data_dir = %settings.data_dir.display(),
        "starting export"
    );

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            if let Ok(style) = indicatif::ProgressStyle::with_template(
                "{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})",
            ) {
                bar.set_style(
                    style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                        .progress_chars("█▉▊▋▌▍▎▏ "),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n as u64);
        pb.set_message(format!("Exported URL {}/{}", n, total));
    };
    let progress: Option<&dyn Fn(u32, u32)> = if quiet { None } else { Some(&progress_cb) };

    let result = exporter.export_urls_with_progress(urls.as_slice(), progress);

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    match result {
        Ok(response) => {
            print_ids(&response);
            if !quiet {
                eprintln!(
                    "Exported {} book(s) and {} image(s) into {}",
                    response.book_ids.len(),
                    response.image_ids.len(),
                    settings.data_dir.display()
                );
            }
            Ok(())
        }
        Err(failure) => {
            // Already stored artifacts stay valid; report them before the error.
            print_ids(&failure.partial);
            Err(CliRunError::Export(failure))
        }
    }
}
