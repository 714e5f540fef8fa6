use std::path::PathBuf;

use clap::{Parser, Subcommand};

use image_reporter::config::log_path;
use image_reporter::version::filter::classify_update;
use image_reporter::version::prerelease::filter_pre_releases;
use image_reporter::version::select::{find_best_update_tag, sort_versions};
use image_reporter::version::suffix::{extract_version_suffix, filter_tags_by_suffix};

#[derive(Parser)]
#[command(name = "image-reporter")]
#[command(version, about = "Container image update detection")]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write logs to image-reporter.log in the data directory
    #[arg(long, global = true, conflicts_with = "log_file")]
    log_to_data_dir: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify the update from one tag to another
    Compare { current: String, candidate: String },
    /// Pick the best update for a tag among candidate tags
    CheckTags {
        current: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_file = cli
        .log_file
        .or_else(|| cli.log_to_data_dir.then(log_path));
    let _guard = image_reporter::logging::init(log_file.as_deref(), "info")?;

    match cli.command {
        Command::Compare { current, candidate } => {
            let details = classify_update(&current, &candidate);
            tracing::debug!(%current, %candidate, classification = %details.classification, "Compared tags");
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::CheckTags { current, tags } => {
            let stable = filter_pre_releases(&tags);
            let same_suffix = filter_tags_by_suffix(&tags, &current);
            let sorted = sort_versions(&stable);

            println!("current:      {}", current);
            println!("suffix:       {}", extract_version_suffix(&current).unwrap_or("-"));
            println!("stable tags:  {} of {}", stable.len(), tags.len());
            println!("same suffix:  {}", same_suffix.join(", "));
            println!("sorted:       {}", sorted.join(", "));
            match find_best_update_tag(&current, &sorted) {
                Some(best) => {
                    let details = classify_update(&current, &best);
                    println!("best update:  {} ({})", best, details.description);
                }
                None => println!("best update:  none"),
            }
        }
    }

    Ok(())
}
