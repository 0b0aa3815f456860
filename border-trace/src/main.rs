use anyhow::Result;
use border_trace::{LegacyTraceReader, TraceField, TraceReader};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect rollout traces.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize the fields recorded in a directory.
    Summary {
        /// Directory of the trace files.
        directory: PathBuf,

        /// Fields to load. All the fields having files if not given.
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// List the episodes of a directory in the per-episode layout.
    Legacy {
        /// Directory of the batch files.
        directory: PathBuf,

        /// Maximum number of episodes to list.
        #[arg(long)]
        max_episodes: Option<usize>,

        /// Accept episodes without observations and actions.
        #[arg(long)]
        only_reward: bool,
    },
}

fn summary(directory: PathBuf, fields: Vec<String>) -> Result<()> {
    let reader = TraceReader::new(&directory);
    let fields = if fields.is_empty() {
        reader.available_fields()?
    } else {
        fields
            .iter()
            .map(|f| f.parse::<TraceField>())
            .collect::<Result<Vec<_>, _>>()?
    };
    let batches = reader.list_batches(&fields)?;
    let recordings = reader.load_fields(&fields)?;

    for (field, array) in recordings.iter() {
        println!(
            "{:<20} batches = {:<5} shape = {:?}",
            field.as_str(),
            batches[field].len(),
            array.shape()
        );
    }
    Ok(())
}

fn legacy(directory: PathBuf, max_episodes: Option<usize>, only_reward: bool) -> Result<()> {
    let reader = LegacyTraceReader::new(&directory).only_reward(only_reward);
    let mut ix = 0;
    reader.scan_episodes(max_episodes, |episode| {
        println!(
            "episode {:<6} steps = {:<6} return = {}",
            ix,
            episode.len(),
            episode.total_reward()
        );
        ix += 1;
        Ok(())
    })?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Summary { directory, fields } => summary(directory, fields),
        Command::Legacy {
            directory,
            max_episodes,
            only_reward,
        } => legacy(directory, max_episodes, only_reward),
    }
}
