use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use subweave::parsing::parse_generated_items;
use subweave::pipeline::DictionaryAnalyzer;
use subweave::report_io::{load_cues, load_prepared_run, save_mapping_report, save_prepared_run};
use subweave::{load_config_from_file, CancelFlag, Config, SubtitlePipeline};

#[derive(Parser, Debug)]
#[command(name = "subweave", version, about = "Subtitle vocabulary grouping and reconciliation")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Tokenize and interleave a cue file into word groups
    Prepare {
        /// JSON array of cues: {order_index, raw_text, start_time, end_time}
        #[arg(long)]
        cues: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        group_size: Option<usize>,
        #[arg(long)]
        sentences_per_batch: Option<usize>,
    },
    /// Map generated items back to the tokens of a prepared run
    Reconcile {
        #[arg(long)]
        run: PathBuf,
        /// JSON response from the generation step
        #[arg(long)]
        response: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => load_config_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Prepare {
            cues,
            out,
            group_size,
            sentences_per_batch,
        } => {
            if let Some(k) = group_size {
                config.group_size = k;
            }
            if sentences_per_batch.is_some() {
                config.sentences_per_batch = sentences_per_batch;
            }
            config.validate()?;

            let Some(dictionary_path) = config.analyzer.dictionary_path.clone() else {
                bail!("no analyzer dictionary configured (set analyzer.dictionary_path)");
            };
            if !dictionary_path.is_file() {
                bail!("analyzer.dictionary_path '{}' is not a file", dictionary_path.display());
            }
            let analyzer = DictionaryAnalyzer::from_path(&dictionary_path, config.analyzer.clone())?;
            let pipeline = SubtitlePipeline::new(&config, Box::new(analyzer))?;

            let cue_list = load_cues(&cues).with_context(|| format!("reading cues {}", cues.display()))?;
            let source_name = cues
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| cues.display().to_string());

            let run = pipeline.prepare(&source_name, &cue_list, &CancelFlag::new())?;
            save_prepared_run(&run, &out).with_context(|| format!("writing {}", out.display()))?;

            println!(
                "{}: {} sentences, {} buckets, {} tokens, {} groups, {} analysis failure(s)",
                run.source_name,
                run.sentences.len(),
                run.buckets.len(),
                run.buckets.token_count(),
                run.group_count(),
                run.analysis_failures()
            );
            info!("Prepared run written to {}", out.display());
        }
        Command::Reconcile { run, response, out } => {
            let prepared = load_prepared_run(&run).with_context(|| format!("reading run {}", run.display()))?;
            let body = fs::read_to_string(&response)
                .with_context(|| format!("reading response {}", response.display()))?;
            let parsed = parse_generated_items(&body, &config.response)?;
            if !parsed.malformed.is_empty() {
                warn!("{} response entries could not be parsed", parsed.malformed.len());
            }

            let report = prepared.reconcile(parsed.items);
            save_mapping_report(&report, &out).with_context(|| format!("writing {}", out.display()))?;

            println!(
                "{} resolved, {} issue(s), {} unresolved token(s)",
                report.resolved_count(),
                report.issues().len(),
                report.unresolved.len()
            );
            for issue in report.issues() {
                println!("  {}", issue);
            }
        }
    }

    Ok(())
}
