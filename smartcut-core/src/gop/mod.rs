//! GOP Index (C2): builds, per video stream, an ordered list of keyframes
//! with open/closed classification and parameter-set epoch tracking.
//!
//! A cold scan is O(packets); once built, queries are O(log keyframes)
//! via binary search on the sorted keyframe list.

use crate::error::{CutError, FfmpegError};
use crate::nal::{self, NalCodec};
use crate::types::{GopEntry, GopOpenness, PicType};
use ffmpeg_next as ffmpeg;

/// One decoded frame's timing, as seen during the index scan.
#[derive(Debug, Clone, Copy)]
struct FrameRef {
    pts: i64,
    dts: i64,
}

/// Lazily-queryable GOP index for one video stream.
pub struct GopIndex {
    /// Sorted by `keyframe_pts`.
    entries: Vec<GopEntry>,
    /// Parameter sets observed per epoch, in emission order.
    epochs: Vec<Vec<u8>>,
    /// Every frame's timing, sorted by `pts` (display order).
    by_pts: Vec<FrameRef>,
    /// Every frame's timing, sorted by `dts` (decode order).
    by_dts: Vec<FrameRef>,
    codec: Box<dyn NalCodec + Send + Sync>,
}

impl GopIndex {
    /// Scans `stream_index`'s packets once, building the full keyframe list.
    pub fn build(
        input: &mut ffmpeg::format::context::Input,
        stream_index: usize,
        codec_id: ffmpeg::codec::Id,
    ) -> Result<Self, CutError> {
        let codec = nal::codec_for(codec_id);

        let mut keyframes: Vec<(i64, GopOpenness, u32)> = Vec::new();
        let mut epochs: Vec<Vec<u8>> = Vec::new();
        let mut current_epoch: Option<Vec<u8>> = None;
        let mut frames: Vec<FrameRef> = Vec::new();
        // Openness classification for an H.264 keyframe needs the frame_num
        // of the slice immediately following it, so the decision is deferred
        // by one packet rather than made the instant the keyframe is seen.
        let mut pending_keyframe: Option<(Vec<nal::NalUnit>, usize)> = None;

        for (stream, packet) in input.packets() {
            if stream.index() != stream_index {
                continue;
            }
            let Some(payload) = packet.data() else {
                continue;
            };
            let units = codec.parse_nal(payload);

            if let Some((kf_units, kf_slot)) = pending_keyframe.take() {
                keyframes[kf_slot].1 = codec.gop_openness_with_lookahead(&kf_units, Some(&units));
            }

            if let Some(params) = codec.extract_parameter_sets(&units) {
                if current_epoch.as_deref() != Some(params.as_slice()) {
                    current_epoch = Some(params.clone());
                    epochs.push(params);
                }
            }
            if epochs.is_empty() {
                epochs.push(Vec::new());
            }

            let pts = packet
                .pts()
                .ok_or_else(|| nal::malformed(packet.position().max(0) as u64, "packet missing pts"))?;
            let dts = packet.dts().unwrap_or(pts);
            frames.push(FrameRef { pts, dts });

            if packet.is_key() {
                let epoch = (epochs.len() - 1) as u32;
                keyframes.push((pts, codec.gop_openness_with_lookahead(&units, None), epoch));
                pending_keyframe = Some((units, keyframes.len() - 1));
            }
        }
        if let Some((kf_units, kf_slot)) = pending_keyframe.take() {
            keyframes[kf_slot].1 = codec.gop_openness_with_lookahead(&kf_units, None);
        }

        if keyframes.is_empty() {
            return Err(CutError::Ffmpeg(FfmpegError::FindStreamInfo(
                "video stream has no keyframes".to_string(),
            )));
        }
        keyframes.sort_by_key(|k| k.0);

        let mut entries = Vec::with_capacity(keyframes.len());
        for (i, &(pts, openness, epoch)) in keyframes.iter().enumerate() {
            let next = keyframes.get(i + 1).map(|k| k.0);
            entries.push(GopEntry {
                keyframe_pts: pts,
                next_keyframe_pts: next,
                openness,
                parameter_set_epoch: epoch,
            });
        }

        let mut by_pts = frames.clone();
        by_pts.sort_by_key(|f| f.pts);
        let mut by_dts = frames;
        by_dts.sort_by_key(|f| f.dts);

        Ok(Self {
            entries,
            epochs,
            by_pts,
            by_dts,
            codec,
        })
    }

    /// Returns the GOP entry whose keyframe is the first at or after `pts`.
    pub fn keyframe_at_or_after(&self, pts: i64) -> Option<GopEntry> {
        let idx = self.entries.partition_point(|e| e.keyframe_pts < pts);
        self.entries.get(idx).copied()
    }

    /// Frame PTS values in `[from_pts, to_pts)`, in display order.
    pub fn display_order_range(&self, from_pts: i64, to_pts: i64) -> Vec<i64> {
        let start = self.by_pts.partition_point(|f| f.pts < from_pts);
        self.by_pts[start..]
            .iter()
            .take_while(|f| f.pts < to_pts)
            .map(|f| f.pts)
            .collect()
    }

    /// Frame PTS values whose `dts` lies in `[from_pts, to_pts)`, in decode
    /// order — the order the Re-encode Segment Engine must feed frames to
    /// the decoder to reconstruct a reference-complete prefix.
    pub fn decode_order_range(&self, from_pts: i64, to_pts: i64) -> Vec<i64> {
        let start = self.by_dts.partition_point(|f| f.dts < from_pts);
        self.by_dts[start..]
            .iter()
            .take_while(|f| f.dts < to_pts)
            .map(|f| f.pts)
            .collect()
    }

    /// Returns the GOP entry whose span `[keyframe_pts, next_keyframe_pts)`
    /// contains `pts`, or the last entry if `pts` is at/after the final
    /// keyframe.
    pub fn gop_containing(&self, pts: i64) -> Option<GopEntry> {
        let idx = self.entries.partition_point(|e| e.keyframe_pts <= pts);
        if idx == 0 {
            return None;
        }
        self.entries.get(idx - 1).copied()
    }

    /// Whether the GOP index accepts `pic_type` as a zero-re-encode splice
    /// point, per the codec's own conservative rule for what counts as safe.
    pub fn is_splice_keyframe(&self, pic_type: PicType) -> bool {
        self.codec.is_splice_keyframe(pic_type)
    }

    pub fn extradata_for_epoch(&self, epoch: u32) -> Option<&[u8]> {
        self.epochs.get(epoch as usize).map(|v| v.as_slice())
    }

    pub fn entries(&self) -> &[GopEntry] {
        &self.entries
    }

    pub fn codec(&self) -> &(dyn NalCodec + Send + Sync) {
        self.codec.as_ref()
    }

    /// Builds a `GopIndex` from synthetic frame timings and keyframe PTS
    /// values, bypassing the packet scan in [`Self::build`]. Lets the Cut
    /// Planner's query logic be exercised against hand-authored GOP layouts
    /// (open GOPs, B-frame pts/dts divergence, epoch boundaries) without an
    /// actual media file on disk.
    #[cfg(test)]
    pub fn for_test(
        frames: &[(i64, i64)],
        keyframe_pts: &[i64],
        openness: GopOpenness,
    ) -> Self {
        let mut by_pts: Vec<FrameRef> = frames
            .iter()
            .map(|&(pts, dts)| FrameRef { pts, dts })
            .collect();
        by_pts.sort_by_key(|f| f.pts);
        let mut by_dts = by_pts.clone();
        by_dts.sort_by_key(|f| f.dts);

        let entries = keyframe_pts
            .iter()
            .enumerate()
            .map(|(i, &pts)| GopEntry {
                keyframe_pts: pts,
                next_keyframe_pts: keyframe_pts.get(i + 1).copied(),
                openness,
                parameter_set_epoch: 0,
            })
            .collect();

        Self {
            entries,
            epochs: vec![vec![0xAA, 0xBB]],
            by_pts,
            by_dts,
            codec: nal::codec_for(ffmpeg::codec::Id::H264),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kf: i64, next: Option<i64>, open: GopOpenness) -> GopEntry {
        GopEntry {
            keyframe_pts: kf,
            next_keyframe_pts: next,
            openness: open,
            parameter_set_epoch: 0,
        }
    }

    #[test]
    fn partition_point_semantics_for_keyframe_lookup() {
        let entries = vec![
            entry(0, Some(300), GopOpenness::Closed),
            entry(300, Some(600), GopOpenness::Closed),
            entry(600, None, GopOpenness::Closed),
        ];
        // Emulate keyframe_at_or_after without constructing a GopIndex (no
        // file I/O available in a unit test).
        let idx = entries.partition_point(|e| e.keyframe_pts < 301);
        assert_eq!(entries[idx].keyframe_pts, 600);
        let idx = entries.partition_point(|e| e.keyframe_pts < 300);
        assert_eq!(entries[idx].keyframe_pts, 300);
    }
}
