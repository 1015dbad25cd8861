use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::date;
use crate::name::ParsedName;

/// Extensions (case-insensitive) of formats whose modification time is trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FirmExtensions(BTreeSet<String>);

impl FirmExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(&extension.to_lowercase())
    }
}

impl Default for FirmExtensions {
    fn default() -> Self {
        Self::new(["jpg", "jpeg", "raw"])
    }
}

impl From<Vec<String>> for FirmExtensions {
    fn from(extensions: Vec<String>) -> Self {
        Self::new(extensions)
    }
}

impl From<FirmExtensions> for Vec<String> {
    fn from(extensions: FirmExtensions) -> Self {
        extensions.0.into_iter().collect()
    }
}

/// Working record of one file for the duration of a run.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Location on disk when the directory was scanned
    pub path: PathBuf,
    pub name: ParsedName,
    /// Modification time observed at scan
    pub initial_time: DateTime<Utc>,
    /// Modification time to persist, adjusted by reconciliation
    pub current_time: DateTime<Utc>,
    /// File name to persist, assigned by sequencing
    pub target_name: String,
}

impl MediaFile {
    pub fn new(path: PathBuf, modified: DateTime<Utc>) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = ParsedName::parse(&file_name);
        Self {
            path,
            target_name: name.name.clone(),
            name,
            initial_time: modified,
            current_time: modified,
        }
    }

    pub fn has_firm_time(&self, firm: &FirmExtensions) -> bool {
        self.name.parsed_time.is_some() || firm.contains(&self.name.extension)
    }

    /// Time decoded from the name if any, else the working modification time.
    pub fn best_time(&self) -> DateTime<Utc> {
        self.name.parsed_time.unwrap_or(self.current_time)
    }

    pub fn try_set_time_from_name(&mut self) {
        if let Some(time) = self.name.parsed_time {
            self.current_time = time;
        }
    }

    pub fn name_changed(&self) -> bool {
        self.name.name != self.target_name
    }

    pub fn time_changed(&self) -> bool {
        self.current_time != self.initial_time
    }

    pub fn changed(&self) -> bool {
        self.name_changed() || self.time_changed()
    }

    pub fn target_path(&self) -> PathBuf {
        self.path.with_file_name(&self.target_name)
    }

    /// Human readable shift from the initial time.
    pub fn time_difference(&self) -> String {
        let shift = (self.current_time - self.initial_time).num_milliseconds();
        if shift.abs() > 10 * 60 * 1000 {
            format!("{} min", shift / 1000 / 60)
        } else if shift.abs() > 10 * 1000 {
            format!("{} sec", shift / 1000)
        } else {
            format!("{} ms", shift)
        }
    }
}

impl fmt::Display for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaFile{{{}, {}", self.name.name, date::display_local(self.current_time))?;
        if self.time_changed() {
            write!(f, ", {}", self.time_difference())?;
        }
        if self.name_changed() {
            write!(f, ", -> {}", self.target_name)?;
        }
        write!(f, "}}")
    }
}

/// Find the record that is the same logical file, i.e. has the same permanent name part.
pub fn find_same<'a>(files: &'a [MediaFile], permanent_part: &str) -> Option<&'a MediaFile> {
    files.iter().find(|f| f.name.permanent_part() == permanent_part)
}
