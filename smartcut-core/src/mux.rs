//! Muxing Scheduler (C6): assembles the output container from passthrough
//! and re-encoded packets across every stream, rebasing each stream's DTS to
//! a monotonic epoch starting at zero.

use std::collections::HashMap;
use std::path::Path;

use ffmpeg_next as ffmpeg;

use crate::error::{CutError, FfmpegError};
use crate::ffmpeg_utils::helpers;
use crate::types::{Packet, StreamDescriptor};

/// Per-stream bookkeeping the scheduler needs to keep DTS monotonic across a
/// splice boundary, where copied and re-encoded packet streams meet.
struct StreamState {
    out_index: usize,
    /// Raw `AVCodecParameters*` captured when the stream was added, used to
    /// patch extradata later without re-borrowing a `StreamMut` by index
    /// (the safe API only hands one out at `add_stream` time).
    codecpar: *mut ffmpeg::ffi::AVCodecParameters,
    /// Offset subtracted from every incoming pts/dts so the first packet
    /// written starts at (approximately) zero, unless `preserve_timestamps`.
    epoch_offset: Option<i64>,
    last_dts: Option<i64>,
}

/// Builds the output container and writes spliced packets to it in the
/// order the Job's pull loop produces them.
pub struct MuxingScheduler {
    output: ffmpeg::format::context::Output,
    streams: HashMap<usize, StreamState>,
    preserve_timestamps: bool,
    header_written: bool,
}

impl MuxingScheduler {
    /// Opens `output_path` and adds one output stream per entry in
    /// `descriptors`, copying codec parameters from `source_params` (indexed
    /// the same way as `descriptors`) and resetting `codec_tag` so the muxer
    /// picks the tag appropriate for the target container (e.g. `hev1` for
    /// H.265 in MP4).
    pub fn create(
        output_path: &Path,
        descriptors: &[StreamDescriptor],
        source_params: &[ffmpeg::codec::parameters::Parameters],
        preserve_timestamps: bool,
    ) -> Result<Self, CutError> {
        let mut output = ffmpeg::format::output(output_path).map_err(|e| {
            CutError::Ffmpeg(FfmpegError::MuxerCreate(format!(
                "failed to open output {:?}: {}",
                output_path, e
            )))
        })?;

        let mut streams = HashMap::with_capacity(descriptors.len());
        for (descriptor, params) in descriptors.iter().zip(source_params.iter()) {
            let mut out_stream = output
                .add_stream(ffmpeg::encoder::find(ffmpeg::codec::Id::None))
                .map_err(|e| {
                    CutError::Ffmpeg(FfmpegError::StreamConfig(format!(
                        "add_stream for input stream {}: {}",
                        descriptor.index, e
                    )))
                })?;
            out_stream.set_parameters(params.clone());
            // H.265 defaults to the `hvc1` tag from most decoders; MP4 in the
            // wild is split between `hvc1` and `hev1`. This engine prefers
            // `hev1` (inline parameter sets) since a splice boundary may
            // rewrite extradata mid-stream.
            if descriptor.codec_id == ffmpeg::codec::Id::HEVC {
                helpers::stream_set_codec_tag_fourcc(&mut out_stream, b"hev1");
            } else {
                helpers::stream_reset_codec_tag(&mut out_stream);
            }
            out_stream.set_time_base(descriptor.timebase);

            let out_index = out_stream.index();
            let codecpar = out_stream.parameters().as_mut_ptr();
            streams.insert(
                descriptor.index,
                StreamState {
                    out_index,
                    codecpar,
                    epoch_offset: None,
                    last_dts: None,
                },
            );
        }

        Ok(Self {
            output,
            streams,
            preserve_timestamps,
            header_written: false,
        })
    }

    /// Overwrites the extradata on one output stream's codec parameters —
    /// used when the Cut Planner's boundary parameter sets differ from the
    /// ones the source container carried at stream open.
    pub fn set_stream_extradata(&mut self, input_index: usize, extradata: &[u8]) {
        let Some(state) = self.streams.get(&input_index) else {
            return;
        };
        if extradata.is_empty() {
            return;
        }
        // SAFETY: `codecpar` was captured from a stream of `self.output`,
        // which is still open, and points at a live `AVCodecParameters`.
        unsafe { helpers::set_extradata_on_params(state.codecpar, extradata) };
    }

    pub fn write_header(&mut self) -> Result<(), CutError> {
        self.output
            .write_header()
            .map_err(|e| CutError::Ffmpeg(FfmpegError::WriteHeader(e.to_string())))?;
        self.header_written = true;
        Ok(())
    }

    /// Writes one spliced packet. DTS is rebased so the first packet on each
    /// stream starts near zero (unless `preserve_timestamps`), and bumped by
    /// one timebase unit if it would otherwise be non-monotonic — which can
    /// happen at a splice boundary where a re-encoded tail's first DTS lands
    /// exactly on the last copied packet's DTS.
    pub fn write_packet(&mut self, packet: Packet) -> Result<(), CutError> {
        let Some(state) = self.streams.get_mut(&packet.stream_index) else {
            return Ok(());
        };

        let offset = match state.epoch_offset {
            Some(o) => o,
            None => {
                let o = if self.preserve_timestamps { 0 } else { packet.dts };
                state.epoch_offset = Some(o);
                o
            }
        };

        let mut dts = packet.dts - offset;
        let pts = packet.pts - offset;
        if let Some(last) = state.last_dts {
            if dts <= last {
                dts = last + 1;
            }
        }
        state.last_dts = Some(dts);

        let mut out_packet = ffmpeg::codec::packet::Packet::copy(&packet.payload);
        out_packet.set_stream(state.out_index);
        out_packet.set_pts(Some(pts));
        out_packet.set_dts(Some(dts));
        out_packet.set_duration(packet.duration);
        out_packet.set_flags(if packet.flags.keyframe {
            ffmpeg::codec::packet::Flags::KEY
        } else {
            ffmpeg::codec::packet::Flags::empty()
        });
        out_packet.set_position(-1);

        out_packet
            .write_interleaved(&mut self.output)
            .map_err(|e| CutError::Ffmpeg(FfmpegError::WritePacket(e.to_string())))
    }

    pub fn finalize(mut self) -> Result<(), CutError> {
        if !self.header_written {
            return Ok(());
        }
        self.output
            .write_trailer()
            .map_err(|e| CutError::Ffmpeg(FfmpegError::WriteTrailer(e.to_string())))
    }
}
