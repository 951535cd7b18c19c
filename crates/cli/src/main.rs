use anyhow::{anyhow, Context, Result};
use chat_codec::{
    persist, try_restore, validate_for_encode, CodecConfig, DataReader, DataWriter,
    FormatVersion,
};
use chat_transcript::TranscriptStore;
use clap::{Args, Parser, Subcommand};
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

mod report;

use report::{render_text, TranscriptReport};

const FORMAT_VERSION_ENV: &str = "CHAT_TRANSCRIPT_FORMAT_VERSION";

#[derive(Parser)]
#[command(name = "chat-transcript")]
#[command(about = "Inspect and upgrade encoded chat transcripts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Decode limits (TOML file with CodecConfig fields)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a transcript and print its entries
    Inspect(InspectArgs),

    /// Re-encode a transcript in another format version
    Upgrade(UpgradeArgs),
}

#[derive(Args)]
struct InspectArgs {
    /// Encoded transcript
    file: PathBuf,

    /// Format version the file was written with (default: $CHAT_TRANSCRIPT_FORMAT_VERSION or latest)
    #[arg(long)]
    format_version: Option<u32>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct UpgradeArgs {
    /// Encoded transcript to read
    input: PathBuf,

    /// Where to write the re-encoded transcript
    output: PathBuf,

    /// Format version of the input (default: $CHAT_TRANSCRIPT_FORMAT_VERSION or latest)
    #[arg(long)]
    from: Option<u32>,

    /// Format version to write (default: latest)
    #[arg(long)]
    to: Option<u32>,
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    if matches!(&cli.command, Commands::Inspect(args) if args.json) {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Inspect(args) => run_inspect(&args, config),
        Commands::Upgrade(args) => run_upgrade(&args, config),
    }
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {}", path.display()))?;
    let config: CodecConfig =
        toml::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))?;
    config
        .validate()
        .map_err(|err| anyhow!("Invalid config {}: {err}", path.display()))?;
    Ok(config)
}

/// Explicit flag, then the environment, then the latest layout
fn resolve_version(flag: Option<u32>) -> Result<FormatVersion> {
    let raw = match flag {
        Some(version) => version,
        None => match env::var(FORMAT_VERSION_ENV) {
            Ok(value) => value
                .trim()
                .parse()
                .with_context(|| format!("{FORMAT_VERSION_ENV} is not a number: {value:?}"))?,
            Err(_) => return Ok(FormatVersion::LATEST),
        },
    };
    Ok(FormatVersion::new(raw)?)
}

fn load_store(path: &Path, version: FormatVersion, config: CodecConfig) -> Result<TranscriptStore> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut reader = DataReader::with_config(BufReader::new(file), config)?;
    let store = TranscriptStore::new();
    let added = try_restore(&store, &mut reader, version)
        .with_context(|| format!("Cannot decode {} as {version}", path.display()))?;
    log::info!("Loaded {added} entries from {}", path.display());
    Ok(store)
}

fn run_inspect(args: &InspectArgs, config: CodecConfig) -> Result<()> {
    let version = resolve_version(args.format_version)?;
    let store = load_store(&args.file, version, config)?;
    let report = TranscriptReport::new(version, &store.snapshot());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

fn run_upgrade(args: &UpgradeArgs, config: CodecConfig) -> Result<()> {
    let from = resolve_version(args.from)?;
    let to = match args.to {
        Some(version) => FormatVersion::new(version)?,
        None => FormatVersion::LATEST,
    };
    let store = load_store(&args.input, from, config)?;
    validate_for_encode(&store.snapshot(), to)
        .with_context(|| format!("Transcript cannot be written as {to}"))?;

    let tmp = args.output.with_extension("tmp");
    let file = File::create(&tmp).with_context(|| format!("Cannot create {}", tmp.display()))?;
    let mut writer = DataWriter::new(BufWriter::new(file));
    persist(&store, &mut writer, to).with_context(|| format!("Cannot encode as {to}"))?;
    writer
        .finish()
        .with_context(|| format!("Cannot write {}", tmp.display()))?;
    fs::rename(&tmp, &args.output)
        .with_context(|| format!("Cannot move {} into place", tmp.display()))?;

    log::info!(
        "Upgraded {} entries from {from} to {to}: {}",
        store.count(),
        args.output.display()
    );
    Ok(())
}
