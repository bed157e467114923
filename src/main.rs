use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

use rorql::compiler::{describe, parse};
use rorql::engine::{Selection, SelectionMode, SelectEngine};
use rorql::optimizer::{load_config, RuleSearch, SearchConfig};

#[derive(Parser, Debug)]
#[command(name = "rorql")]
#[command(about = "Select image series from a study index with a small query language")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a select statement and explain it
    Parse {
        /// Select statement
        query: String,

        /// Print the parsed query as JSON
        #[arg(long)]
        json: bool,
    },

    /// Select series from an index file (JSON or gzipped JSON)
    Select {
        /// Index file
        #[arg(short, long)]
        index: PathBuf,

        /// Select statement, or a plain text filter
        query: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Search for a select statement that fits the index better
    Improve {
        /// Index file
        #[arg(short, long)]
        index: PathBuf,

        /// Starting select statement
        query: String,

        /// Search configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of iterations, overrides the configuration
        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        /// Random seed, overrides the configuration
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Parse { query, json } => run_parse(&query, json),
        Command::Select { index, query, format } => run_select(&index, &query, format),
        Command::Improve { index, query, config, iterations, seed, format } => {
            let mut search_config = match config {
                Some(path) => load_config(path)?,
                None => SearchConfig::default(),
            };
            if let Some(iterations) = iterations {
                search_config.iterations = iterations;
            }
            if seed.is_some() {
                search_config.seed = seed;
            }
            run_improve(&index, &query, search_config, format)
        }
    }
}

fn run_parse(text: &str, json: bool) -> Result<()> {
    let query = parse(text)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&query)?);
    } else {
        println!("{}", describe(&query));
    }
    Ok(())
}

fn run_select(index: &Path, text: &str, format: OutputFormat) -> Result<()> {
    let engine = SelectEngine::from_path(index)?;
    let selection = engine.select(text);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&selection)?),
        OutputFormat::Text => print_selection(&selection),
    }
    Ok(())
}

fn print_selection(selection: &Selection) {
    match &selection.mode {
        SelectionMode::Statement { query } => println!("{}", describe(query)),
        SelectionMode::PlainFilter { reason } => {
            println!("Not a select statement ({}), matched as a plain filter.", reason)
        }
    }
    for warning in &selection.result.warnings {
        eprintln!("Warning: {}", warning);
    }
    println!(
        "{} entries, {} series",
        selection.result.len(),
        selection.result.num_series()
    );
    for entry in &selection.result.entries {
        println!("[{}] {}", entry.order, entry.summary());
    }
}

fn run_improve(index: &Path, text: &str, config: SearchConfig, format: OutputFormat) -> Result<()> {
    config.validate()?;
    let query = parse(text)?;
    let engine = SelectEngine::from_path(index)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pb = ProgressBar::new(config.iterations as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message("Searching rules...");

    let search = RuleSearch::new(config);
    let outcome = search.run(&query, engine.index(), &mut rng, |stats| {
        pb.set_position(stats.iteration as u64 + 1);
        pb.set_message(format!("best {:.4}", stats.best));
    });
    pb.finish_and_clear();

    info!(
        "{} iterations, fitness {:.4} -> {:.4}",
        outcome.iterations(),
        outcome.initial_fitness,
        outcome.best_fitness
    );

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => {
            if outcome.stopped_early {
                println!("Stopped after {} iterations, no rule could be built from the index.", outcome.iterations());
            }
            println!("Fitness: {:.4} (started at {:.4})", outcome.best_fitness, outcome.initial_fitness);
            println!("{}", outcome.best);
        }
    }
    Ok(())
}
