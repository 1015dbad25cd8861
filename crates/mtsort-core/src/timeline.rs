//! Per-source time reconciliation.
//!
//! Files sharing a source key form a timeline ordered by source order. Firm
//! records (time decoded from the name, or a trusted format) are anchors and
//! never move. Soft records that break the increasing order between anchors
//! are shifted as a block and spread at one second or more apart, staying
//! inside the anchor bracket when there is one. A bracket too narrow for one
//! second per record gets its soft records at equal sub-second steps instead.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::error::ReconcileError;
use crate::media::{FirmExtensions, MediaFile};

/// Group files into source timelines, each sorted by source order.
///
/// Timelines come out in order of first appearance of their key. Files
/// without a source key are returned separately and are never reconciled.
pub fn split_timelines(files: Vec<MediaFile>) -> (Vec<Vec<MediaFile>>, Vec<MediaFile>) {
    let mut timelines: Vec<Vec<MediaFile>> = Vec::new();
    let mut keyless = Vec::new();
    for file in files {
        if !file.name.has_source_timeline() {
            keyless.push(file);
            continue;
        }
        match timelines
            .iter_mut()
            .find(|t| t[0].name.source_key == file.name.source_key)
        {
            Some(timeline) => timeline.push(file),
            None => timelines.push(vec![file]),
        }
    }
    for timeline in &mut timelines {
        timeline.sort_by_key(|f| f.name.source_order);
    }
    (timelines, keyless)
}

/// Reconcile every timeline, then hand all files back as one list.
///
/// Stops at the first ordering conflict, before anything is persisted.
pub fn reconcile_all(
    files: Vec<MediaFile>,
    firm: &FirmExtensions,
) -> Result<Vec<MediaFile>, ReconcileError> {
    let (timelines, keyless) = split_timelines(files);
    let mut all = Vec::with_capacity(timelines.iter().map(Vec::len).sum::<usize>() + keyless.len());
    for mut timeline in timelines {
        debug!(
            "Reconciling timeline '{}' ({} files)",
            timeline[0].name.source_key,
            timeline.len()
        );
        reconcile(&mut timeline, firm)?;
        all.extend(timeline);
    }
    all.extend(keyless);
    Ok(all)
}

/// Fix the times of soft records of one timeline, ordered by source order.
pub fn reconcile(timeline: &mut [MediaFile], firm: &FirmExtensions) -> Result<(), ReconcileError> {
    let mut prev_firm: Option<usize> = None;
    let mut next_firm: Option<usize> = None;
    let mut ind = 0;
    while ind < timeline.len() {
        if next_firm.map_or(true, |next| ind >= next) {
            next_firm = find_firm(timeline, prev_firm.map_or(0, |prev| prev + 1), firm);
        }
        if timeline[ind].has_firm_time(firm) {
            if let Some(prev) = prev_firm {
                check_order(&timeline[prev], &timeline[ind])?;
            }
            prev_firm = Some(ind);
        } else if breaks_order(timeline, ind, next_firm) {
            ind = fill_gap(timeline, prev_firm, next_firm);
            continue;
        } else {
            timeline[ind].try_set_time_from_name();
        }
        ind += 1;
    }
    Ok(())
}

fn find_firm(timeline: &[MediaFile], from: usize, firm: &FirmExtensions) -> Option<usize> {
    (from..timeline.len()).find(|&ind| timeline[ind].has_firm_time(firm))
}

fn check_order(earlier: &MediaFile, later: &MediaFile) -> Result<(), ReconcileError> {
    if earlier.best_time() > later.best_time() {
        return Err(ReconcileError::OutOfOrder {
            source_key: later.name.source_key.clone(),
            earlier: earlier.name.name.clone(),
            earlier_time: earlier.best_time(),
            later: later.name.name.clone(),
            later_time: later.best_time(),
        });
    }
    Ok(())
}

fn breaks_order(timeline: &[MediaFile], ind: usize, next_firm: Option<usize>) -> bool {
    let time = timeline[ind].current_time;
    (ind > 0 && timeline[ind - 1].best_time() > time)
        || next_firm.is_some_and(|next| timeline[next].best_time() < time)
}

/// Shift the soft records between two anchors (either may be missing).
/// Returns the index where the walk continues.
fn fill_gap(timeline: &mut [MediaFile], prev_firm: Option<usize>, next_firm: Option<usize>) -> usize {
    let start = prev_firm.map_or(0, |prev| prev + 1);
    let end = next_firm.unwrap_or(timeline.len());
    let second = TimeDelta::seconds(1);

    if let (Some(prev), Some(next)) = (prev_firm, next_firm) {
        let gap = timeline[next].best_time() - timeline[prev].best_time();
        if gap < TimeDelta::seconds((next - prev) as i64) {
            spread(timeline, prev, next);
            return end;
        }
    }

    let mut time_from = prev_firm.map(|prev| timeline[prev].best_time());
    let mut time_to = next_firm.and_then(|next| {
        // leave at least one second per step from the previous anchor
        let steps = next as i64 - prev_firm.map_or(-1, |prev| prev as i64);
        let to = timeline[next]
            .best_time()
            .checked_sub_signed(TimeDelta::seconds(steps))?;
        (to.timestamp_millis() > 0).then_some(to)
    });

    let shift_forward = prev_firm
        .filter(|&prev| prev + 1 < timeline.len())
        .map(|prev| timeline[prev].best_time() - timeline[prev + 1].best_time() + second);
    let shift_back = next_firm
        .filter(|&next| next > 0)
        .map(|next| timeline[next - 1].best_time() + second - timeline[next].best_time());

    let shift = match (shift_forward, shift_back) {
        (Some(forward), _) if forward > TimeDelta::zero() => Some(forward),
        (_, Some(back)) if back > TimeDelta::zero() => Some(-back),
        _ => None,
    };

    let Some(shift) = shift else {
        for file in &mut timeline[start..end] {
            file.try_set_time_from_name();
        }
        return end;
    };

    debug!(
        "Shifting {} files by {} ms (bracket {:?} .. {:?})",
        end - start,
        shift.num_milliseconds(),
        time_from,
        time_to
    );
    let mut time_prev = time_from;
    for file in &mut timeline[start..end] {
        let mut time = add(file.current_time, shift);
        if let Some(prev) = time_prev {
            if time <= prev {
                time = add(prev, second);
            }
        }
        if let Some(from) = time_from.as_mut() {
            if time <= *from {
                time = *from;
                *from = add(*from, second);
            }
        }
        if let Some(to) = time_to.as_mut() {
            if time >= *to {
                time = *to;
                *to = add(*to, second);
            }
        }
        file.current_time = time;
        time_prev = Some(time);
    }
    end
}

/// Anchors closer than one second per soft record: place the soft records at
/// equal steps strictly between them. Steps are whole milliseconds, so a gap
/// narrower than the record count leaves them on the earlier anchor's time.
fn spread(timeline: &mut [MediaFile], prev: usize, next: usize) {
    let from = timeline[prev].best_time();
    let gap = (timeline[next].best_time() - from).num_milliseconds();
    let step = gap / (next - prev) as i64;
    debug!(
        "Spreading {} files {} ms apart between anchors",
        next - prev - 1,
        step
    );
    for (ind, file) in timeline[prev + 1..next].iter_mut().enumerate() {
        file.current_time = add(from, TimeDelta::milliseconds(step * (ind as i64 + 1)));
    }
}

/// `time + delta`, or `time` unchanged when the sum leaves the representable range.
fn add(time: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    time.checked_add_signed(delta).unwrap_or(time)
}
