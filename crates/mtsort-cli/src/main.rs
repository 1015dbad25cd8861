mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use mtsort_core::{FirmExtensions, LocalFs, SortError, SortOptions};

#[derive(Parser)]
#[command(name = "mtsort", version, about = "Media timeline sorter - fix file times per source and rename files in chronological order")]
struct Cli {
    /// Directory with media files (not recursive)
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Extension whose file time is trusted as-is (repeatable, replaces jpg/jpeg/raw)
    #[arg(long = "firm-ext", value_name = "EXT")]
    firm_ext: Vec<String>,

    /// Only log what would be renamed and retimed
    #[arg(long)]
    dry_run: bool,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;
    let t_total = std::time::Instant::now();

    let options = SortOptions {
        dir: cli.dir,
        firm_extensions: if cli.firm_ext.is_empty() {
            FirmExtensions::default()
        } else {
            FirmExtensions::new(&cli.firm_ext)
        },
        dry_run: cli.dry_run,
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {msg}")
            .context("invalid progress template")?,
    );

    let outcome = mtsort_core::run(&LocalFs, &options, &|stage, current, total, message| {
        pb.set_length(total);
        pb.set_position(current + 1);
        pb.set_message(format!("{stage}: {message}"));
    });
    pb.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(SortError::Timeline(conflict)) => {
            anyhow::bail!("Aborted, nothing was changed: {conflict}");
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("failed to process {}", options.dir.display())));
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    if result.dry_run {
        eprintln!(
            "Dry run: {} of {} files would change ({:.2}s)",
            result.changed,
            result.total,
            t_total.elapsed().as_secs_f64()
        );
    } else {
        eprintln!(
            "Saved {} of {} files, {} failed ({:.2}s)",
            result.saved,
            result.total,
            result.failed,
            t_total.elapsed().as_secs_f64()
        );
    }
    Ok(())
}
