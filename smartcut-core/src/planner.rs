//! Cut Planner (C3): turns a resolved [`TimeInterval`] plus a [`GopIndex`]
//! into a per-interval [`SplicePlan`].

use crate::error::CutError;
use crate::gop::GopIndex;
use crate::types::{GopOpenness, SplicePlan, TimeInterval};

/// Computes the splice plan for one resolved interval against one video
/// stream's GOP index.
pub fn plan_interval(
    gop_index: &GopIndex,
    interval: TimeInterval,
    max_gop_frames: u32,
) -> Result<SplicePlan, CutError> {
    let kf = gop_index
        .keyframe_at_or_after(interval.start_pts)
        .ok_or_else(|| CutError::OutOfRange {
            value: interval.start_pts as f64,
            duration: f64::INFINITY,
        })?;

    // Step 2: interval starts exactly on a usable closed-GOP keyframe.
    if kf.keyframe_pts == interval.start_pts && kf.openness == GopOpenness::Closed {
        let copy_to_pts = tail_copy_pts(gop_index, interval.end_pts);
        let mut plan = SplicePlan::straight_passthrough(kf.keyframe_pts, copy_to_pts);
        plan.reencode_suffix = suffix_frames(gop_index, copy_to_pts, interval.end_pts);
        plan.boundary_parameter_sets = gop_index
            .extradata_for_epoch(kf.parameter_set_epoch)
            .map(|b| b.to_vec())
            .unwrap_or_default();
        return Ok(plan);
    }

    // Step 3: prefix must be re-encoded. Widen the decode window back to
    // the keyframe of the GOP containing `interval.start_pts` so the
    // decoder has valid references for the frames it must produce.
    let containing = gop_index
        .gop_containing(interval.start_pts)
        .unwrap_or(kf);
    let decode_window_start = containing.keyframe_pts;

    let decode_window = gop_index.decode_order_range(decode_window_start, kf.keyframe_pts);
    if decode_window.len() as u32 > max_gop_frames {
        return Err(CutError::GopTooLarge {
            frames: decode_window.len() as u32,
            limit: max_gop_frames,
        });
    }

    let reencode_prefix = gop_index.display_order_range(interval.start_pts, kf.keyframe_pts);

    let copy_to_pts = tail_copy_pts(gop_index, interval.end_pts);
    let reencode_suffix = suffix_frames(gop_index, copy_to_pts, interval.end_pts);

    Ok(SplicePlan {
        copy_from_pts: kf.keyframe_pts,
        copy_to_pts,
        reencode_prefix,
        reencode_suffix,
        boundary_parameter_sets: gop_index
            .extradata_for_epoch(kf.parameter_set_epoch)
            .map(|b| b.to_vec())
            .unwrap_or_default(),
    })
}

/// Finds the largest PTS `p <= end_pts` such that no frame with `pts > p`
/// and `dts <= p` would be needed — i.e. the latest point at which copied
/// packets can stop without leaving a dangling forward reference.
fn tail_copy_pts(gop_index: &GopIndex, end_pts: i64) -> i64 {
    let mut candidates = gop_index.display_order_range(i64::MIN, end_pts + 1);
    candidates.sort_unstable();
    while let Some(&p) = candidates.last() {
        let has_dangling_ref = gop_index
            .decode_order_range(p + 1, end_pts + 1)
            .iter()
            .any(|&decode_pts| decode_pts <= p);
        if !has_dangling_ref {
            return p;
        }
        candidates.pop();
    }
    end_pts
}

/// Frames in `(copy_to_pts, end_pts]` that must be re-encoded to close the
/// tail GOP when straight closed-GOP trimming isn't possible.
fn suffix_frames(gop_index: &GopIndex, copy_to_pts: i64, end_pts: i64) -> Vec<i64> {
    if copy_to_pts >= end_pts {
        return Vec::new();
    }
    gop_index.display_order_range(copy_to_pts + 1, end_pts + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gop::GopIndex;
    use crate::types::TimeInterval;

    // 30fps, 10-frame closed GOPs, pts == dts (no B-frames) at pts 0..300.
    fn closed_gop_index() -> GopIndex {
        let frames: Vec<(i64, i64)> = (0..300).step_by(10).map(|p| (p, p)).collect();
        let keyframes: Vec<i64> = (0..300).step_by(100).collect();
        GopIndex::for_test(&frames, &keyframes, GopOpenness::Closed)
    }

    #[test]
    fn interval_starting_on_keyframe_needs_no_prefix_reencode() {
        let idx = closed_gop_index();
        let plan = plan_interval(&idx, TimeInterval::new(100, 200), 1200).unwrap();
        assert!(!plan.needs_prefix_reencode());
        assert_eq!(plan.copy_from_pts, 100);
    }

    #[test]
    fn interval_starting_mid_gop_needs_prefix_reencode() {
        let idx = closed_gop_index();
        let plan = plan_interval(&idx, TimeInterval::new(150, 200), 1200).unwrap();
        assert!(plan.needs_prefix_reencode());
        assert_eq!(plan.copy_from_pts, 200);
        assert!(plan.reencode_prefix.contains(&150));
    }

    #[test]
    fn tail_copy_pts_trims_to_the_nearest_frame_at_or_before_the_cut() {
        // No frame exists exactly at pts 205; the planner must not invent
        // one, so copy stops at the last real frame before it.
        let idx = closed_gop_index();
        let plan = plan_interval(&idx, TimeInterval::new(100, 205), 1200).unwrap();
        assert_eq!(plan.copy_to_pts, 200);
    }

    #[test]
    fn oversized_prefix_decode_window_is_rejected() {
        let idx = closed_gop_index();
        let err = plan_interval(&idx, TimeInterval::new(150, 200), 1).unwrap_err();
        assert!(matches!(err, CutError::GopTooLarge { .. }));
    }
}
