use tracing::{info, warn};

use crate::date;
use crate::error::SaveError;
use crate::fs::FileSystem;
use crate::media::MediaFile;
use crate::ThrottledProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Unchanged,
    Saved,
}

/// Counts of the save phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub changed: u64,
    pub saved: u64,
    pub failed: u64,
}

/// Persist one file: rename first, then set the modification time.
///
/// A failed rename stops here so the retime never lands on another file.
/// A successful rename stays in place if the retime fails.
pub fn save_file(fs: &dyn FileSystem, file: &MediaFile) -> Result<SaveOutcome, SaveError> {
    if !file.changed() {
        return Ok(SaveOutcome::Unchanged);
    }
    if !fs.exists(&file.path) {
        return Err(SaveError::SourceMissing {
            path: file.path.clone(),
        });
    }
    let target = file.target_path();

    if file.name_changed() {
        if fs.exists(&target) {
            return Err(SaveError::TargetExists {
                path: file.path.clone(),
                target,
            });
        }
        fs.rename(&file.path, &target).map_err(|source| SaveError::Rename {
            path: file.path.clone(),
            target: target.clone(),
            source,
        })?;
        info!("Renamed {} to {}", file.name.name, file.target_name);
    }

    if file.time_changed() {
        if !fs.exists(&target) {
            return Err(SaveError::TargetMissing {
                path: file.path.clone(),
                target,
            });
        }
        fs.set_modified(&target, file.current_time)
            .map_err(|source| SaveError::SetTime {
                path: target.clone(),
                source,
            })?;
        info!(
            "Changed time of {}: {} to {}",
            file.target_name,
            file.time_difference(),
            date::display_local(file.current_time)
        );
    }
    Ok(SaveOutcome::Saved)
}

/// Save every changed file. Failures are logged and counted, never fatal.
pub fn save_changes(
    fs: &dyn FileSystem,
    files: &[MediaFile],
    dry_run: bool,
    progress: &ThrottledProgress<'_>,
) -> SaveSummary {
    let mut summary = SaveSummary::default();
    let total = files.len() as u64;

    for (ind, file) in files.iter().enumerate() {
        progress.report("save", ind as u64, total, &file.target_name);
        if file.changed() {
            summary.changed += 1;
        }
        if dry_run {
            describe_change(file);
            continue;
        }
        match save_file(fs, file) {
            Ok(SaveOutcome::Saved) => summary.saved += 1,
            Ok(SaveOutcome::Unchanged) => {}
            Err(err) => {
                warn!("{err}");
                summary.failed += 1;
            }
        }
    }
    summary
}

fn describe_change(file: &MediaFile) {
    if file.name_changed() {
        info!("Would rename {} to {}", file.name.name, file.target_name);
    }
    if file.time_changed() {
        info!(
            "Would change time of {}: {} to {}",
            file.name.name,
            file.time_difference(),
            date::display_local(file.current_time)
        );
    }
}
