pub mod date;
pub mod error;
pub mod fs;
pub mod media;
pub mod name;
pub mod sequence;
pub mod timeline;
pub mod writer;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use error::{ReconcileError, SaveError, SortError};
pub use fs::{FileSystem, LocalFs};
pub use media::{FirmExtensions, MediaFile};
pub use name::ParsedName;

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortOptions {
    /// Directory to process, not recursive
    #[serde(default = "default_dir")]
    pub dir: PathBuf,
    /// Extensions whose modification time is trusted
    #[serde(default)]
    pub firm_extensions: FirmExtensions,
    /// Log planned changes without touching any file
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            firm_extensions: FirmExtensions::default(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortResult {
    pub total: u64,
    pub changed: u64,
    pub saved: u64,
    pub failed: u64,
    #[serde(default)]
    pub dry_run: bool,
}

/// Type alias for progress callback: (stage, current, total, message)
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + 'a;

/// Throttled progress reporter: emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: Cell<Option<Instant>>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: Cell::new(None),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            if let Some(last) = self.last_emit.get() {
                if last.elapsed() < Duration::from_millis(200) {
                    return;
                }
            }
            self.last_emit.set(Some(Instant::now()));
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Scan `dir` and build a record for every regular file, sorted by file name.
///
/// Files whose modification time cannot be read are logged and left out, and
/// so are names that are not valid UTF-8, since renaming them would lose bytes.
pub fn load_files(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<MediaFile>, SortError> {
    let mut paths = fs.list(dir).map_err(|source| SortError::ListDir {
        path: dir.to_path_buf(),
        source,
    })?;
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        if path.file_name().and_then(|n| n.to_str()).is_none() {
            warn!("Skipping {}: file name is not valid UTF-8", path.display());
            continue;
        }
        match fs.modified(&path) {
            Ok(modified) => {
                let file = MediaFile::new(path, modified);
                debug!("{file}");
                files.push(file);
            }
            Err(err) => warn!("Skipping {}: {err}", path.display()),
        }
    }
    Ok(files)
}

/// Run the whole pipeline: scan, reconcile times per source, sequence, save.
///
/// An ordering conflict aborts before any file is touched.
pub fn run(
    fs: &dyn FileSystem,
    options: &SortOptions,
    progress_callback: &ProgressCallback<'_>,
) -> Result<SortResult, SortError> {
    let tp = ThrottledProgress::new(progress_callback);
    info!("Processing the directory: {}", options.dir.display());

    let files = load_files(fs, &options.dir)?;
    let total = files.len() as u64;
    tp.report("scan", total.saturating_sub(1), total, "Files loaded");

    let mut files = timeline::reconcile_all(files, &options.firm_extensions)?;
    sequence::sequence(&mut files);

    let summary = writer::save_changes(fs, &files, options.dry_run, &tp);
    Ok(SortResult {
        total,
        changed: summary.changed,
        saved: summary.saved,
        failed: summary.failed,
        dry_run: options.dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::fs::File;
    use tempfile::tempdir;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap()
    }

    fn add_file(dir: &Path, name: &str, seconds: i64) {
        let path = dir.join(name);
        File::create(&path).unwrap();
        LocalFs
            .set_modified(&path, base() + TimeDelta::seconds(seconds))
            .unwrap();
    }

    fn seconds_of(files: &[MediaFile], permanent_part: &str) -> i64 {
        let file = media::find_same(files, permanent_part)
            .unwrap_or_else(|| panic!("{permanent_part} not found"));
        (file.current_time - base()).num_seconds()
    }

    fn order_of(files: &[MediaFile], permanent_part: &str) -> u64 {
        media::find_same(files, permanent_part).unwrap().name.global_order
    }

    fn no_progress(_: &str, _: u64, _: u64, _: &str) {}

    #[test]
    fn test_whole_process() {
        let dir = tempdir().unwrap();
        let d = dir.path();
        add_file(d, "yp0038.jpg", 0);
        add_file(d, "yp0039.mp4", -200);
        add_file(d, "yp0040.mp4", -200);
        add_file(d, "yp0045.jpg", 300);

        add_file(d, "yc019.jpg", -500);
        add_file(d, "yc021.mp4", -1000);
        add_file(d, "yc050.mp4", -850);

        add_file(d, "pa1.mp4", 0);
        add_file(d, "pa2.mp4", -200);
        add_file(d, "pa3.jpg", -1010);
        add_file(d, "pa4.jpg", 300);

        add_file(d, "s1468.jpg", 100);
        add_file(d, "s1469.mp4", 10000);
        add_file(d, "s1470.jpg", 150);

        add_file(d, "056-ri055-IMG_6392.JPG", -2);
        add_file(d, "057-ri058-IMG_6401.JPG", 98);
        add_file(d, "111-ri126-IMG_6831.JPG", 5000);
        add_file(d, "112-ri056-IMG_6394.MOV", 10000);
        add_file(d, "113-ri067-IMG_6475.MOV", 10100);
        add_file(d, "121-ri057-IMG_6395.MOV", 11000);
        add_file(d, "122-ri086-IMG_6627.MOV", 11010);
        add_file(d, "123-ri127-1ccf9068-ae59-40a2-848b-91b16244b4b3.jpg", 10100);

        let options = SortOptions {
            dir: d.to_path_buf(),
            ..SortOptions::default()
        };
        let result = run(&LocalFs, &options, &no_progress).unwrap();
        assert_eq!(result.total, 22);
        assert_eq!(result.failed, 0);
        assert_eq!(result.saved, result.changed);

        let files = load_files(&LocalFs, d).unwrap();
        assert_eq!(files.len(), 22);
        assert!(files.iter().all(|f| f.name.name.len() > 3 && f.name.name.as_bytes()[2] == b'-'));

        assert_eq!(seconds_of(&files, "yp0038.jpg"), 0);
        assert_eq!(seconds_of(&files, "yp0039.mp4"), 1);
        assert_eq!(seconds_of(&files, "yp0040.mp4"), 2);
        assert_eq!(seconds_of(&files, "yp0045.jpg"), 300);

        assert_eq!(seconds_of(&files, "yc019.jpg"), -500);
        assert_eq!(seconds_of(&files, "yc021.mp4"), -499);
        assert_eq!(seconds_of(&files, "yc050.mp4"), -349);

        assert_eq!(seconds_of(&files, "pa3.jpg"), -1010);
        assert_eq!(seconds_of(&files, "pa4.jpg"), 300);
        assert_eq!(seconds_of(&files, "pa1.mp4"), -1013);
        assert_eq!(seconds_of(&files, "pa2.mp4"), -1012);

        assert_eq!(seconds_of(&files, "s1468.jpg"), 100);
        assert_eq!(seconds_of(&files, "s1469.mp4"), 148);
        assert_eq!(seconds_of(&files, "s1470.jpg"), 150);
        assert!(order_of(&files, "s1469.mp4") < order_of(&files, "s1470.jpg"));

        assert!(order_of(&files, "ri057-IMG_6395.MOV") < order_of(&files, "ri058-IMG_6401.JPG"));
        assert!(order_of(&files, "ri055-IMG_6392.JPG") < order_of(&files, "ri056-IMG_6394.MOV"));

        // a second run over the renamed directory changes nothing
        let again = run(&LocalFs, &options, &no_progress).unwrap();
        assert_eq!(again.changed, 0);
    }

    #[test]
    fn test_conflict_aborts_before_saving() {
        let dir = tempdir().unwrap();
        let d = dir.path();
        add_file(d, "e1.jpg", 100);
        add_file(d, "e2.mp4", 0);
        add_file(d, "e3.jpg", 50);

        let options = SortOptions {
            dir: d.to_path_buf(),
            ..SortOptions::default()
        };
        let err = run(&LocalFs, &options, &no_progress).unwrap_err();
        assert!(matches!(err, SortError::Timeline(ReconcileError::OutOfOrder { .. })));

        let files = load_files(&LocalFs, d).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.name.as_str()).collect();
        assert_eq!(names, vec!["e1.jpg", "e2.mp4", "e3.jpg"]);
        assert_eq!(seconds_of(&files, "e2.mp4"), 0);
    }

    #[test]
    fn test_dry_run() {
        let dir = tempdir().unwrap();
        let d = dir.path();
        add_file(d, "yp0038.jpg", 0);
        add_file(d, "yp0039.mp4", -200);

        let options = SortOptions {
            dir: d.to_path_buf(),
            dry_run: true,
            ..SortOptions::default()
        };
        let result = run(&LocalFs, &options, &no_progress).unwrap();
        assert_eq!(result.changed, 2);
        assert_eq!(result.saved, 0);

        let files = load_files(&LocalFs, d).unwrap();
        assert_eq!(files[0].name.name, "yp0038.jpg");
        assert_eq!(seconds_of(&files, "yp0039.mp4"), -200);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempdir().unwrap();
        let options = SortOptions {
            dir: dir.path().join("missing"),
            ..SortOptions::default()
        };
        let err = run(&LocalFs, &options, &no_progress).unwrap_err();
        assert!(matches!(err, SortError::ListDir { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_left_alone() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let d = dir.path();
        add_file(d, "yp2.jpg", 0);
        let raw = d.join(OsStr::from_bytes(b"yp1-\xffx.mp4"));
        File::create(&raw).unwrap();

        let files = load_files(&LocalFs, d).unwrap();
        assert_eq!(files.len(), 1);

        let options = SortOptions {
            dir: d.to_path_buf(),
            ..SortOptions::default()
        };
        let result = run(&LocalFs, &options, &no_progress).unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.failed, 0);
        assert!(raw.exists());
        assert!(d.join("1-yp2.jpg").exists());
    }

    #[test]
    fn test_options_defaults_from_json() {
        let options: SortOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.dir, PathBuf::from("."));
        assert_eq!(options.firm_extensions, FirmExtensions::default());
        assert!(!options.dry_run);

        let options: SortOptions =
            serde_json::from_str(r#"{"firm_extensions": ["HEIC", ".jpg"]}"#).unwrap();
        assert!(options.firm_extensions.contains("heic"));
        assert!(options.firm_extensions.contains("JPG"));
        assert!(!options.firm_extensions.contains("raw"));
    }

    #[test]
    fn test_progress_throttling() {
        let calls = std::cell::RefCell::new(Vec::new());
        {
            let callback = |stage: &str, current: u64, _total: u64, _msg: &str| {
                calls.borrow_mut().push((stage.to_string(), current));
            };
            let tp = ThrottledProgress::new(&callback);
            for i in 0..100 {
                tp.report("save", i, 100, "");
            }
        }
        let calls = calls.into_inner();
        assert_eq!(calls.first(), Some(&("save".to_string(), 0)));
        assert_eq!(calls.last(), Some(&("save".to_string(), 99)));
        assert!(calls.len() < 100);
    }
}
