use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use recbin_core::{find_deleted, AccountsConfig, IndexRecord, OutputRecord, ProgressSink, TextProgress};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "recbin", version, about = "Recover deleted cloud-synced items from a Windows recycle bin")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Scan a recycle bin for deleted items of tracked accounts
	Scan {
		/// Path to the recycle bin root (e.g. a mounted C:\$Recycle.Bin)
		recbin: PathBuf,
		/// JSON file listing account buckets and their root folders
		#[arg(long)]
		accounts: Option<PathBuf>,
		/// Extra account root as NAME=ROOT (repeatable)
		#[arg(long = "account", value_name = "NAME=ROOT")]
		extra_accounts: Vec<String>,
		/// Progress display
		#[arg(long, value_enum, default_value_t = ProgressKind::Auto)]
		progress: ProgressKind,
		/// Pretty-print the JSON output
		#[arg(long)]
		pretty: bool,
	},
	/// Decode a single $I index record
	Inspect {
		/// Path to a $I file
		index: PathBuf,
	},
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProgressKind {
	/// Bar when stderr is a terminal, otherwise none
	Auto,
	Bar,
	None,
}

fn progress_sink(kind: ProgressKind) -> Option<Box<dyn ProgressSink>> {
	let kind = match kind {
		ProgressKind::Auto if atty::is(atty::Stream::Stderr) => ProgressKind::Bar,
		ProgressKind::Auto => ProgressKind::None,
		other => other,
	};

	match kind {
		ProgressKind::Bar => Some(Box::new(TextProgress::stderr())),
		_ => None,
	}
}

fn load_accounts(file: Option<PathBuf>, extra: &[String]) -> Result<AccountsConfig> {
	let mut config = match file {
		Some(path) => AccountsConfig::load(&path)
			.with_context(|| format!("Failed to load accounts from {}", path.display()))?,
		None => AccountsConfig::default(),
	};

	for pair in extra {
		let (name, root) = AccountsConfig::parse_pair(pair)?;
		config.add_root(&name, &root);
	}

	if config.is_empty() {
		anyhow::bail!("No account roots given; use --accounts FILE or --account NAME=ROOT");
	}

	Ok(config)
}

#[derive(Serialize)]
struct InspectOutput {
	format: String,
	version: i64,
	size_bytes: u64,
	size: String,
	delete_timestamp_raw: i64,
	deleted: String,
	original_path: String,
}

impl From<IndexRecord> for InspectOutput {
	fn from(record: IndexRecord) -> Self {
		Self {
			format: record.format.to_string(),
			version: record.format.version(),
			size_bytes: record.size_bytes,
			size: record.size_display(),
			delete_timestamp_raw: record.delete_timestamp_raw,
			deleted: record.delete_time_display(),
			original_path: record.original_path,
		}
	}
}

fn write_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
	let stdout = std::io::stdout();
	let mut out = stdout.lock();
	if pretty {
		serde_json::to_writer_pretty(&mut out, value)?;
	} else {
		serde_json::to_writer(&mut out, value)?;
	}
	writeln!(out)?;
	Ok(())
}

fn main() -> Result<()> {
	// Logs go to stderr so stdout stays valid JSON
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	match cli.command {
		Commands::Scan { recbin, accounts, extra_accounts, progress, pretty } => {
			let accounts = load_accounts(accounts, &extra_accounts)?;

			let records: Vec<OutputRecord> = find_deleted(&recbin, accounts, progress_sink(progress))
				.with_context(|| format!("Failed to scan {}", recbin.display()))?
				.collect();

			tracing::info!("{} deleted items recovered from {}", records.len(), recbin.display());
			write_json(&records, pretty)?;
		}
		Commands::Inspect { index } => {
			let record = IndexRecord::read_from(&index)
				.with_context(|| format!("Failed to decode {}", index.display()))?;
			write_json(&InspectOutput::from(record), true)?;
		}
	}
	Ok(())
}
