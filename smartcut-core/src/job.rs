//! Job (C8): drives one smart-cut invocation end to end — opens the input,
//! builds the GOP index, computes a splice plan per interval, and pulls
//! packets through the Re-encode Segment Engine, Passthrough Router, and
//! Muxing Scheduler in a single thread.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use ffmpeg_next as ffmpeg;

use crate::error::{CutError, FfmpegError};
use crate::ffmpeg_utils::context::InputContext;
use crate::ffmpeg_utils::utils;
use crate::gop::GopIndex;
use crate::mux::MuxingScheduler;
use crate::nal::NalCodec;
use crate::passthrough;
use crate::planner;
use crate::probe;
use crate::reencode;
use crate::types::{
    JobOptions, Packet, PacketFlags, PicType, SplicePlan, StreamDescriptor, TimeInterval,
};

/// One smart-cut invocation: a source file, a destination file, the
/// resolved intervals to keep, and the tunables that shape re-encode
/// decisions.
pub struct Job {
    input_path: PathBuf,
    output_path: PathBuf,
    intervals: Vec<TimeInterval>,
    options: JobOptions,
}

impl Job {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        intervals: Vec<TimeInterval>,
        options: JobOptions,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            intervals,
            options,
        }
    }

    /// Runs the job to completion. Checks `cancel` once per interval, which
    /// is also the unit a single re-encode window or copy run is committed
    /// in — cancelling mid-interval still leaves the output file openable up
    /// to the last interval flushed before the flag was observed.
    pub fn run(&self, cancel: &AtomicBool) -> Result<(), CutError> {
        let mut input = InputContext::open(&self.input_path)?;
        let descriptors = probe::describe_streams(input.inner());

        let video = descriptors
            .iter()
            .find(|d| d.is_video())
            .cloned()
            .ok_or_else(|| CutError::InputUnreadable("no video stream found".to_string()))?;

        let gop_index = GopIndex::build(input.inner_mut(), video.index, video.codec_id)?;

        let plans: Vec<SplicePlan> = self
            .intervals
            .iter()
            .map(|&interval| planner::plan_interval(&gop_index, interval, self.options.max_gop_frames))
            .collect::<Result<_, _>>()?;

        if self.options.dry_run {
            print_dry_run(&self.intervals, &plans);
            return Ok(());
        }

        let mut mux = open_muxer(&mut input, &descriptors, &self.output_path, &self.options)?;
        if let Some(first) = plans.first() {
            if !first.boundary_parameter_sets.is_empty() {
                mux.set_stream_extradata(video.index, &first.boundary_parameter_sets);
            }
        }
        mux.write_header()?;

        for (interval, plan) in self.intervals.iter().zip(plans.iter()) {
            if cancel.load(Ordering::Relaxed) {
                return Err(CutError::Cancelled);
            }

            if plan.needs_prefix_reencode() {
                let decode_from = gop_index
                    .gop_containing(interval.start_pts)
                    .map(|g| g.keyframe_pts)
                    .unwrap_or(interval.start_pts);
                reencode_and_write(
                    &mut input,
                    &video,
                    &gop_index,
                    decode_from,
                    &plan.reencode_prefix,
                    &mut mux,
                )?;
            }

            copy_video_range(
                input.inner_mut(),
                video.index,
                video.timebase,
                plan.copy_from_pts,
                plan.copy_to_pts,
                gop_index.codec(),
                plan.needs_prefix_reencode(),
                &mut mux,
            )?;

            for stream in descriptors.iter().filter(|d| !d.is_video()) {
                let packets = passthrough::route_interval(
                    input.inner_mut(),
                    stream.index,
                    stream.kind,
                    *interval,
                    0,
                    video.timebase,
                )?;
                for p in packets {
                    mux.write_packet(p)?;
                }
            }

            if plan.needs_suffix_reencode() {
                reencode_and_write(
                    &mut input,
                    &video,
                    &gop_index,
                    plan.copy_to_pts,
                    &plan.reencode_suffix,
                    &mut mux,
                )?;
            }
        }

        mux.finalize()
    }
}

fn open_muxer(
    input: &mut InputContext,
    descriptors: &[StreamDescriptor],
    output_path: &std::path::Path,
    options: &JobOptions,
) -> Result<MuxingScheduler, CutError> {
    let mut source_params = Vec::with_capacity(descriptors.len());
    for d in descriptors {
        let stream = input.stream(d.index).ok_or_else(|| {
            CutError::Ffmpeg(FfmpegError::StreamConfig(format!(
                "stream {} missing from input",
                d.index
            )))
        })?;
        source_params.push(stream.parameters());
    }
    MuxingScheduler::create(output_path, descriptors, &source_params, options.preserve_timestamps)
}

fn reencode_and_write(
    input: &mut InputContext,
    video: &StreamDescriptor,
    gop_index: &GopIndex,
    decode_from_pts: i64,
    emit_pts: &[i64],
    mux: &mut MuxingScheduler,
) -> Result<(), CutError> {
    let (packets, extradata) = reencode::reencode_frames(
        input.inner_mut(),
        video.index,
        video,
        gop_index,
        decode_from_pts,
        emit_pts,
    )?;
    if !extradata.is_empty() {
        mux.set_stream_extradata(video.index, &extradata);
    }
    for mut p in packets {
        p.stream_index = video.index;
        mux.write_packet(p)?;
    }
    Ok(())
}

/// Copies video packets whose decode timestamp falls in `[from_pts,
/// to_pts]` straight through, emitting only the ones whose presentation
/// timestamp also falls in that window. Bounding on `dts` rather than `pts`
/// keeps B-frames whose pts precedes their dts from being cut short.
///
/// Seeks to `from_pts` itself rather than relying on the demuxer cursor left
/// by a previous call: the GOP Index's one-time scan and any preceding
/// re-encode window both leave the cursor past this range's start.
///
/// When `rewrite_leading_cra` is set (the interval needed a re-encoded
/// prefix, so `from_pts` lands on whatever keyframe type the GOP actually
/// has rather than a chosen closed one), a CRA picture at `from_pts` is
/// rewritten to BLA_W_LP/BLA_N_LP and any RASL pictures immediately
/// following it are dropped, per the Bitstream Surgeon's splice-boundary
/// responsibilities.
fn copy_video_range(
    input: &mut ffmpeg::format::context::Input,
    stream_index: usize,
    timebase: ffmpeg::Rational,
    from_pts: i64,
    to_pts: i64,
    codec: &(dyn NalCodec + Send + Sync),
    rewrite_leading_cra: bool,
    mux: &mut MuxingScheduler,
) -> Result<(), CutError> {
    seek_to(input, from_pts, timebase)?;

    // A CRA at `from_pts` can't be rewritten until we know whether leading
    // RASL pictures follow it, so it's held back one step.
    let mut pending_cra: Option<Packet> = None;
    let mut pending_has_rasl = false;

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        let pts = packet.pts().unwrap_or(0);
        let dts = packet.dts().unwrap_or(pts);
        if dts > to_pts {
            break;
        }
        if pts < from_pts || pts > to_pts {
            continue;
        }

        let payload = packet.data().unwrap_or(&[]);
        let units = codec.parse_nal(payload);

        if rewrite_leading_cra
            && pending_cra.is_none()
            && pts == from_pts
            && codec.classify_pic_type(&units) == Some(PicType::Cra)
        {
            pending_cra = Some(Packet {
                stream_index,
                dts,
                pts,
                duration: packet.duration(),
                flags: PacketFlags {
                    keyframe: packet.is_key(),
                    discard: false,
                    corrupt: false,
                },
                pic_type: Some(PicType::Cra),
                payload: payload.to_vec(),
            });
            continue;
        }

        if pending_cra.is_some() && codec.is_discardable_leading_picture(&units) {
            pending_has_rasl = true;
            continue;
        }

        if let Some(mut cra) = pending_cra.take() {
            cra.payload = codec.rewrite_boundary(&cra.payload, pending_has_rasl);
            mux.write_packet(cra)?;
        }

        mux.write_packet(Packet {
            stream_index,
            dts,
            pts,
            duration: packet.duration(),
            flags: PacketFlags {
                keyframe: packet.is_key(),
                discard: false,
                corrupt: false,
            },
            pic_type: None,
            payload: payload.to_vec(),
        })?;
    }

    if let Some(mut cra) = pending_cra.take() {
        cra.payload = codec.rewrite_boundary(&cra.payload, pending_has_rasl);
        mux.write_packet(cra)?;
    }

    Ok(())
}

fn seek_to(
    input: &mut ffmpeg::format::context::Input,
    pts: i64,
    timebase: ffmpeg::Rational,
) -> Result<(), CutError> {
    // `Input::seek` takes its target in AV_TIME_BASE (microsecond) units
    // regardless of which stream's packets the caller cares about.
    let seek_us = utils::rescale_ts(pts, timebase, ffmpeg::Rational::new(1, 1_000_000));
    input.seek(seek_us, ..seek_us).map_err(|e| {
        CutError::Ffmpeg(FfmpegError::Seek(format!(
            "seek to pts {} failed: {}",
            pts, e
        )))
    })
}

fn print_dry_run(intervals: &[TimeInterval], plans: &[SplicePlan]) {
    let report: Vec<serde_json::Value> = intervals
        .iter()
        .zip(plans.iter())
        .map(|(interval, plan)| {
            serde_json::json!({
                "start_pts": interval.start_pts,
                "end_pts": interval.end_pts,
                "copy_from_pts": plan.copy_from_pts,
                "copy_to_pts": plan.copy_to_pts,
                "reencode_prefix_frames": plan.reencode_prefix.len(),
                "reencode_suffix_frames": plan.reencode_suffix.len(),
            })
        })
        .collect();
    println!("{}", serde_json::Value::Array(report));
}
