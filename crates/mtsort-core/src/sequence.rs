use std::cmp::Ordering;

use crate::media::MediaFile;

/// Width of the zero-padded order prefix: `ceil(log10(count + 1))`.
pub fn digit_width(count: usize) -> usize {
    count.checked_ilog10().map_or(0, |log| log as usize + 1)
}

pub fn target_name(order: usize, width: usize, permanent_part: &str) -> String {
    format!("{:0width$}-{}", order, permanent_part, width = width)
}

/// Global sort key: the best known time of each file.
pub fn by_best_time(a: &MediaFile, b: &MediaFile) -> Ordering {
    a.best_time().cmp(&b.best_time())
}

/// Sort all files by time and give each one its order prefix, starting at 1.
/// The sort is stable, so files with equal times keep their relative order.
pub fn sequence(files: &mut [MediaFile]) {
    files.sort_by(by_best_time);
    let width = digit_width(files.len());
    for (ind, file) in files.iter_mut().enumerate() {
        file.target_name = target_name(ind + 1, width, file.name.permanent_part());
    }
}
