//! Passthrough Router (C7): for streams that never get re-encoded — audio,
//! subtitles, data, attachments, and the copied portion of the video stream
//! itself — selects which demuxed packets of an interval flow through
//! untouched.
//!
//! Non-video streams have no keyframe structure the Cut Planner can use, so
//! the router falls back to nearest-packet-at-or-before and flags the
//! pre-roll packets `discard`: the decoder on the playback side needs them
//! for reference, but they must not be presented before the interval start.

use ffmpeg_next as ffmpeg;

use crate::error::{CutError, FfmpegError};
use crate::ffmpeg_utils::utils;
use crate::types::{Packet, PacketFlags, StreamKind, TimeInterval};

/// One interval's worth of packets selected from a single non-video stream,
/// in decode order, with pre-roll packets flagged for discard.
///
/// `interval` and `pre_roll` are given in `video_timebase` (the reference
/// video stream's timebase, per [`TimeInterval`]'s contract) and rescaled
/// here into the target stream's own timebase before any packet comparison —
/// an audio/subtitle stream's timebase is rarely the same as the video's.
///
/// Seeks to its own start position on every call rather than assuming
/// demuxer-cursor continuity from a previous call: `Input::seek` repositions
/// every stream's read cursor, so a neighboring stream's earlier seek (or the
/// GOP Index's index scan) cannot be relied on to have left this stream's
/// cursor anywhere useful.
pub fn route_interval(
    input: &mut ffmpeg::format::context::Input,
    stream_index: usize,
    kind: StreamKind,
    interval: TimeInterval,
    pre_roll: i64,
    video_timebase: ffmpeg::Rational,
) -> Result<Vec<Packet>, CutError> {
    debug_assert!(
        !matches!(kind, StreamKind::Video),
        "video streams are routed by the planner/reencode engine, not passthrough"
    );

    let stream_timebase = input
        .stream(stream_index)
        .map(|s| s.time_base())
        .unwrap_or(video_timebase);

    let start_pts = utils::rescale_ts(interval.start_pts, video_timebase, stream_timebase);
    let end_pts = utils::rescale_ts(interval.end_pts, video_timebase, stream_timebase);
    let pre_roll = utils::rescale_ts(pre_roll, video_timebase, stream_timebase);

    let seek_pts = (start_pts - pre_roll).max(0);
    // `Input::seek` takes its target in AV_TIME_BASE (microsecond) units,
    // not the target stream's native timebase.
    let seek_us = utils::rescale_ts(seek_pts, stream_timebase, ffmpeg::Rational::new(1, 1_000_000));
    input.seek(seek_us, ..seek_us).map_err(|e| {
        CutError::Ffmpeg(FfmpegError::Seek(format!(
            "passthrough seek to pts {} failed: {}",
            seek_pts, e
        )))
    })?;

    let mut out = Vec::new();
    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        let pts = packet.pts().unwrap_or_else(|| packet.dts().unwrap_or(0));
        if pts >= end_pts {
            break;
        }
        if pts < start_pts {
            // Within the pre-roll window: keep decoding for reference state
            // (relevant to predictive subtitle/data codecs) but never present.
            if pts < seek_pts {
                continue;
            }
            out.push(to_packet(stream_index, &packet, true));
            continue;
        }
        out.push(to_packet(stream_index, &packet, false));
    }
    Ok(out)
}

fn to_packet(stream_index: usize, packet: &ffmpeg::codec::packet::Packet, discard: bool) -> Packet {
    Packet {
        stream_index,
        dts: packet.dts().unwrap_or(0),
        pts: packet.pts().unwrap_or(0),
        duration: packet.duration(),
        flags: PacketFlags {
            keyframe: packet.is_key(),
            discard,
            corrupt: false,
        },
        pic_type: None,
        payload: packet.data().map(|d| d.to_vec()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_packet_marks_discard() {
        let raw = ffmpeg::codec::packet::Packet::empty();
        let pkt = to_packet(2, &raw, true);
        assert!(pkt.flags.discard);
        assert_eq!(pkt.stream_index, 2);
    }

    #[test]
    fn to_packet_keeps_payload_empty_for_empty_packet() {
        let raw = ffmpeg::codec::packet::Packet::empty();
        let pkt = to_packet(0, &raw, false);
        assert!(pkt.payload.is_empty());
    }
}
