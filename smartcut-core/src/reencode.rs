//! Re-encode Segment Engine (C5): decodes a bounded GOP window and produces
//! fresh packets for just the frames the Cut Planner marked as needing
//! surgery.
//!
//! The encoder is configured to match the source stream's codec, profile,
//! level, pixel format, timebase, frame rate, and sample aspect ratio as
//! closely as libavcodec allows, and is forced to close every GOP so the
//! re-encoded segment never references frames outside itself.

use std::collections::BTreeSet;

use ffmpeg_next as ffmpeg;

use crate::error::{CutError, FfmpegError};
use crate::ffmpeg_utils::{helpers, utils};
use crate::gop::GopIndex;
use crate::types::{Packet, PacketFlags, StreamDescriptor};

/// Decodes `source`'s stream starting at `decode_from_pts` and re-encodes
/// every frame whose presentation timestamp is in `emit_pts`, stopping once
/// all of them have been produced or the decoder reaches end of stream.
///
/// `emit_pts` need not be contiguous with `decode_from_pts`: frames decoded
/// before the first entry in `emit_pts` are fed to the encoder's reference
/// state implicitly by virtue of being decoded, but only frames whose pts is
/// in `emit_pts` are sent onward to the encoder.
///
/// If the window starting at `decode_from_pts` fails to produce every frame
/// named in `emit_pts` — the decoder couldn't resolve a reference inside it,
/// typically because `decode_from_pts` itself wasn't a real reference point —
/// the window is widened back to the previous GOP's keyframe in `gop_index`
/// and retried exactly once before giving up with `DecoderRefMissing`.
pub fn reencode_frames(
    input: &mut ffmpeg::format::context::Input,
    stream_index: usize,
    source: &StreamDescriptor,
    gop_index: &GopIndex,
    decode_from_pts: i64,
    emit_pts: &[i64],
) -> Result<(Vec<Packet>, Vec<u8>), CutError> {
    if emit_pts.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let first = reencode_window(input, stream_index, source, decode_from_pts, emit_pts);
    let needs_retry = match &first {
        Ok((packets, _)) => packets.len() < emit_pts.len(),
        Err(CutError::Ffmpeg(FfmpegError::DecodePacket(_))) => true,
        Err(_) => false,
    };
    if !needs_retry {
        return first;
    }

    let widened_pts = gop_index
        .gop_containing(decode_from_pts.saturating_sub(1))
        .map(|g| g.keyframe_pts)
        .filter(|&p| p < decode_from_pts)
        .ok_or(CutError::DecoderRefMissing { pts: decode_from_pts })?;

    tracing::warn!(
        decode_from_pts,
        widened_pts,
        "re-encode window missing a reference frame; widening decode window and retrying once"
    );
    let (packets, extradata) = reencode_window(input, stream_index, source, widened_pts, emit_pts)?;
    if packets.len() != emit_pts.len() {
        return Err(CutError::DecoderRefMissing { pts: decode_from_pts });
    }
    Ok((packets, extradata))
}

fn reencode_window(
    input: &mut ffmpeg::format::context::Input,
    stream_index: usize,
    source: &StreamDescriptor,
    decode_from_pts: i64,
    emit_pts: &[i64],
) -> Result<(Vec<Packet>, Vec<u8>), CutError> {
    let wanted: BTreeSet<i64> = emit_pts.iter().copied().collect();
    let last_wanted = *emit_pts.iter().max().unwrap();

    seek_to(input, stream_index, decode_from_pts, source.timebase)?;

    let mut decoder = VideoDecoder::open(input, stream_index)?;
    let mut encoder = VideoEncoder::open_matching(source)?;

    let mut out_packets = Vec::with_capacity(emit_pts.len());
    let mut reached_last = false;

    {
        let mut packets_iter = input.packets();
        while !reached_last {
            let Some((stream, packet)) = packets_iter.next() else {
                break;
            };
            if stream.index() != stream_index {
                continue;
            }
            decoder.send_packet(&packet)?;
            while let Some(frame) = decoder.receive_frame()? {
                let pts = frame.pts().unwrap_or(0);
                if wanted.contains(&pts) {
                    encoder.send_frame(&frame)?;
                    drain_encoder(&mut encoder, source.timebase, &mut out_packets)?;
                }
                if pts >= last_wanted {
                    reached_last = true;
                }
            }
        }
    }

    decoder.send_eof()?;
    while let Some(frame) = decoder.receive_frame()? {
        let pts = frame.pts().unwrap_or(0);
        if wanted.contains(&pts) {
            encoder.send_frame(&frame)?;
            drain_encoder(&mut encoder, source.timebase, &mut out_packets)?;
        }
    }

    encoder.send_eof()?;
    drain_encoder(&mut encoder, source.timebase, &mut out_packets)?;

    let extradata = encoder.extradata();
    Ok((out_packets, extradata))
}

fn drain_encoder(
    encoder: &mut VideoEncoder,
    out_timebase: ffmpeg::Rational,
    out_packets: &mut Vec<Packet>,
) -> Result<(), CutError> {
    while let Some(mut pkt) = encoder.receive_packet()? {
        pkt.rescale_ts(encoder.timebase(), out_timebase);
        let flags = PacketFlags {
            keyframe: pkt.is_key(),
            discard: false,
            corrupt: false,
        };
        out_packets.push(Packet {
            stream_index: 0,
            dts: pkt.dts().unwrap_or(0),
            pts: pkt.pts().unwrap_or(0),
            duration: pkt.duration(),
            flags,
            pic_type: None,
            payload: pkt.data().map(|d| d.to_vec()).unwrap_or_default(),
        });
    }
    Ok(())
}

fn seek_to(
    input: &mut ffmpeg::format::context::Input,
    stream_index: usize,
    pts: i64,
    timebase: ffmpeg::Rational,
) -> Result<(), CutError> {
    let _ = stream_index;
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

/// Stateful video decoder over one stream of an already-open input.
struct VideoDecoder {
    decoder: ffmpeg::decoder::Video,
    stream_index: usize,
}

impl VideoDecoder {
    fn open(input: &ffmpeg::format::context::Input, stream_index: usize) -> Result<Self, CutError> {
        let stream = input.stream(stream_index).ok_or_else(|| {
            CutError::Ffmpeg(FfmpegError::StreamConfig(format!(
                "stream {} not found",
                stream_index
            )))
        })?;
        let context = ffmpeg::codec::Context::from_parameters(stream.parameters())
            .map_err(|e| CutError::Ffmpeg(FfmpegError::DecoderCreate(e.to_string())))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| CutError::Ffmpeg(FfmpegError::DecoderCreate(e.to_string())))?;
        Ok(Self {
            decoder,
            stream_index,
        })
    }

    /// Feeds one compressed packet. `InvalidData` is tolerated and logged: a
    /// seek can land just before a partially-primed reference, and the
    /// decoder recovers once enough subsequent packets arrive.
    fn send_packet(&mut self, packet: &ffmpeg::codec::packet::Packet) -> Result<(), CutError> {
        match self.decoder.send_packet(packet) {
            Ok(()) => Ok(()),
            Err(ffmpeg::Error::InvalidData) => {
                tracing::debug!(
                    stream_index = self.stream_index,
                    "video decoder: skipping invalid packet during re-encode window"
                );
                Ok(())
            }
            Err(e) => Err(CutError::Ffmpeg(FfmpegError::DecodePacket(e.to_string()))),
        }
    }

    fn send_eof(&mut self) -> Result<(), CutError> {
        match self.decoder.send_eof() {
            Ok(()) => Ok(()),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(()),
            Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(CutError::Ffmpeg(FfmpegError::DecodePacket(e.to_string()))),
        }
    }

    fn receive_frame(&mut self) -> Result<Option<ffmpeg::util::frame::Video>, CutError> {
        let mut frame = ffmpeg::util::frame::Video::empty();
        match self.decoder.receive_frame(&mut frame) {
            Ok(()) => Ok(Some(frame)),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(None),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(CutError::Ffmpeg(FfmpegError::DecodePacket(e.to_string()))),
        }
    }
}

/// Video encoder configured to match a source stream as closely as
/// libavcodec allows.
struct VideoEncoder {
    encoder: ffmpeg::encoder::Video,
    timebase: ffmpeg::Rational,
}

impl VideoEncoder {
    fn open_matching(source: &StreamDescriptor) -> Result<Self, CutError> {
        let codec = ffmpeg::encoder::find(source.codec_id).ok_or_else(|| {
            CutError::Ffmpeg(FfmpegError::EncoderNotFound(format!("{:?}", source.codec_id)))
        })?;

        match Self::open_with_profile(codec, source, source.profile, source.level) {
            Ok(enc) => Ok(enc),
            Err(_) => {
                // Warn-and-fall-back: the source's exact profile/level isn't
                // one this build of libavcodec can produce, so retry with the
                // encoder's own default rather than fail the whole job.
                tracing::warn!(
                    "{}",
                    CutError::EncoderParamMismatch(format!(
                        "encoder {:?} rejected source profile={} level={}; falling back to encoder default",
                        source.codec_id, source.profile, source.level
                    ))
                );
                Self::open_with_profile(codec, source, -1, -1)
            }
        }
    }

    fn open_with_profile(
        codec: ffmpeg::codec::Codec,
        source: &StreamDescriptor,
        profile: i32,
        level: i32,
    ) -> Result<Self, CutError> {
        let mut context = ffmpeg::codec::context::Context::new_with_codec(codec);
        helpers::set_closed_gop(&mut context);
        helpers::set_profile_level(&mut context, profile, level);

        let mut enc = context
            .encoder()
            .video()
            .map_err(|e| CutError::Ffmpeg(FfmpegError::EncoderCreate(e.to_string())))?;

        let timebase = if source.frame_rate.numerator() > 0 {
            ffmpeg::Rational::new(source.frame_rate.denominator(), source.frame_rate.numerator())
        } else {
            source.timebase
        };

        enc.set_width(source.width);
        enc.set_height(source.height);
        enc.set_format(source.pix_fmt);
        enc.set_time_base(timebase);
        enc.set_frame_rate(Some(source.frame_rate));
        enc.set_bit_rate(source.bit_rate as usize);

        let opts = ffmpeg::Dictionary::new();
        let mut encoder = enc
            .open_as_with(codec, opts)
            .map_err(|e| CutError::Ffmpeg(FfmpegError::EncoderConfigure(e.to_string())))?;

        // Must be set after open_as_with: libavcodec resets sample_aspect_ratio
        // to 0:1 while initialising the encoder context, clobbering anything
        // set beforehand on the unopened context.
        encoder.set_aspect_ratio(source.sample_aspect_ratio);

        Ok(Self { encoder, timebase })
    }

    fn send_frame(&mut self, frame: &ffmpeg::util::frame::Video) -> Result<(), CutError> {
        self.encoder
            .send_frame(frame)
            .map_err(|e| CutError::Ffmpeg(FfmpegError::EncodeFrame(e.to_string())))
    }

    fn send_eof(&mut self) -> Result<(), CutError> {
        match self.encoder.send_eof() {
            Ok(()) => Ok(()),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(()),
            Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(CutError::Ffmpeg(FfmpegError::EncodeFrame(e.to_string()))),
        }
    }

    fn receive_packet(&mut self) -> Result<Option<ffmpeg::codec::packet::Packet>, CutError> {
        let mut packet = ffmpeg::codec::packet::Packet::empty();
        match self.encoder.receive_packet(&mut packet) {
            Ok(()) => Ok(Some(packet)),
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => Ok(None),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(CutError::EncoderExhausted(e.to_string())),
        }
    }

    fn timebase(&self) -> ffmpeg::Rational {
        self.timebase
    }

    /// Codec parameters extradata (SPS/PPS/VPS) for the boundary the Muxing
    /// Scheduler must emit ahead of the re-encoded packets.
    fn extradata(&self) -> Vec<u8> {
        use std::ops::Deref;
        let ctx: &ffmpeg::codec::Context = self.encoder.deref();
        let params = helpers::encoder_codec_parameters(ctx);
        // SAFETY: `params.as_ptr()` is valid; `extradata`/`extradata_size` are
        // populated by `avcodec_parameters_from_context` above.
        unsafe {
            let p = params.as_ptr();
            if (*p).extradata.is_null() || (*p).extradata_size <= 0 {
                return Vec::new();
            }
            std::slice::from_raw_parts((*p).extradata, (*p).extradata_size as usize).to_vec()
        }
    }
}
