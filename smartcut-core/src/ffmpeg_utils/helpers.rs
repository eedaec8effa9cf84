//! Safe wrappers around FFmpeg FFI calls.
//!
//! Every function in this module is `pub` and **safe** to call.  All `unsafe`
//! blocks are contained here with explicit safety arguments.  Callers outside
//! this module should never need to write `unsafe` for routine FFmpeg access.

use ffmpeg_next as ffmpeg;

// ── Codec-parameter field accessors ─────────────────────────────────────────

/// Read `sample_rate` from an `AVCodecParameters` struct. Used for descriptive
/// purposes only — audio streams are always passed through untouched.
pub fn codec_params_sample_rate(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    unsafe { (*params.as_ptr()).sample_rate as u32 }
}

/// Read `ch_layout.nb_channels` from an `AVCodecParameters` struct.
pub fn codec_params_channels(params: &ffmpeg::codec::parameters::Parameters) -> u16 {
    unsafe { (*params.as_ptr()).ch_layout.nb_channels as u16 }
}

/// Read `width` from an `AVCodecParameters` struct.
pub fn codec_params_width(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    unsafe { (*params.as_ptr()).width as u32 }
}

/// Read `height` from an `AVCodecParameters` struct.
pub fn codec_params_height(params: &ffmpeg::codec::parameters::Parameters) -> u32 {
    unsafe { (*params.as_ptr()).height as u32 }
}

/// Read `profile` from an `AVCodecParameters` struct.
pub fn codec_params_profile(params: &ffmpeg::codec::parameters::Parameters) -> i32 {
    unsafe { (*params.as_ptr()).profile }
}

/// Read `level` from an `AVCodecParameters` struct.
pub fn codec_params_level(params: &ffmpeg::codec::parameters::Parameters) -> i32 {
    unsafe { (*params.as_ptr()).level }
}

/// Read `bit_rate` from an `AVCodecParameters` struct.
pub fn codec_params_bit_rate(params: &ffmpeg::codec::parameters::Parameters) -> u64 {
    unsafe { (*params.as_ptr()).bit_rate as u64 }
}

/// Read the pixel format (`format`, an `AVPixelFormat`) from an
/// `AVCodecParameters` struct.
pub fn codec_params_pix_fmt(params: &ffmpeg::codec::parameters::Parameters) -> ffmpeg::format::Pixel {
    unsafe { (*params.as_ptr()).format.into() }
}

/// Read `sample_aspect_ratio` from an `AVCodecParameters` struct.
pub fn codec_params_sample_aspect_ratio(
    params: &ffmpeg::codec::parameters::Parameters,
) -> ffmpeg::Rational {
    unsafe { (*params.as_ptr()).sample_aspect_ratio.into() }
}

/// Read `extradata`/`extradata_size` from an `AVCodecParameters` struct.
pub fn codec_params_extradata(params: &ffmpeg::codec::parameters::Parameters) -> Vec<u8> {
    unsafe {
        let p = params.as_ptr();
        if (*p).extradata.is_null() || (*p).extradata_size <= 0 {
            return Vec::new();
        }
        std::slice::from_raw_parts((*p).extradata, (*p).extradata_size as usize).to_vec()
    }
}

/// Overwrite `extradata`/`extradata_size` on an output stream's
/// `AVCodecParameters`, replacing whatever the source container carried with
/// the parameter sets active at the start of the Muxing Scheduler's output.
///
/// Allocates with `av_malloc` (as `avcodec_parameters_from_context` does) so
/// `avformat_free_context` can free it normally; must be called after
/// `out_stream.set_parameters(...)` and before `write_header`.
pub fn stream_set_extradata(out_stream: &mut ffmpeg::format::stream::StreamMut, data: &[u8]) {
    unsafe { set_extradata_on_params(out_stream.parameters().as_mut_ptr(), data) }
}

/// Same as [`stream_set_extradata`] but against a raw `AVCodecParameters`
/// pointer captured at stream-creation time, for callers that no longer hold
/// a live `StreamMut` borrow (e.g. the Muxing Scheduler, which looks up
/// streams by input index after `add_stream` has already returned).
///
/// # Safety
/// `params` must point at a live `AVCodecParameters` owned by a stream of the
/// `AVFormatContext` that is still open.
pub unsafe fn set_extradata_on_params(params: *mut ffmpeg::ffi::AVCodecParameters, data: &[u8]) {
    if !(*params).extradata.is_null() {
        ffmpeg::ffi::av_free((*params).extradata as *mut std::ffi::c_void);
    }
    if data.is_empty() {
        (*params).extradata = std::ptr::null_mut();
        (*params).extradata_size = 0;
        return;
    }
    let padded = data.len() + ffmpeg::ffi::AV_INPUT_BUFFER_PADDING_SIZE as usize;
    let buf = ffmpeg::ffi::av_mallocz(padded) as *mut u8;
    std::ptr::copy_nonoverlapping(data.as_ptr(), buf, data.len());
    (*params).extradata = buf;
    (*params).extradata_size = data.len() as i32;
}

/// Zero out `codec_tag` on the `AVCodecParameters` attached to an output
/// stream, so the muxer picks the correct tag for the target container.
///
/// Must be called after `out_stream.set_parameters(...)` and before
/// `write_header`.
pub fn stream_reset_codec_tag(out_stream: &mut ffmpeg::format::stream::StreamMut) {
    // SAFETY: `out_stream.parameters()` is valid for the lifetime of the
    // stream.  Writing 0 to `codec_tag` is always safe — it is a plain u32
    // field.
    unsafe {
        (*out_stream.parameters().as_mut_ptr()).codec_tag = 0;
    }
}

/// Sets `codec_tag` to a specific fourcc (e.g. `hev1`/`hvc1` for H.265 in an
/// MP4 container) instead of clearing it to let the muxer pick a default.
pub fn stream_set_codec_tag_fourcc(out_stream: &mut ffmpeg::format::stream::StreamMut, fourcc: &[u8; 4]) {
    unsafe {
        (*out_stream.parameters().as_mut_ptr()).codec_tag = u32::from_le_bytes(*fourcc);
    }
}

/// Allocate a fresh `AVCodecParameters`, copy an open encoder context into
/// it, and return it as a safe `ffmpeg::codec::Parameters`.
///
/// Used to extract codec parameters (including extradata) from the
/// Re-encode Segment Engine's video encoder for the Muxing Scheduler.
pub fn encoder_codec_parameters(ctx: &ffmpeg::codec::Context) -> ffmpeg::codec::Parameters {
    use std::rc::Rc;
    // SAFETY: `avcodec_parameters_alloc` returns a valid pointer or null.
    // We check for null before use (the `wrap` call below would panic on null,
    // but in practice allocation only fails under OOM which is unrecoverable).
    // `avcodec_parameters_from_context` copies fields from a valid, open
    // encoder context — safe as long as `ctx.as_ptr()` is non-null (it is,
    // since `ctx` is a live object).
    unsafe {
        let params = ffmpeg::ffi::avcodec_parameters_alloc();
        ffmpeg::ffi::avcodec_parameters_from_context(params, ctx.as_ptr());
        ffmpeg::codec::Parameters::wrap(params, None::<Rc<dyn std::any::Any>>)
    }
}

/// Sets `AV_CODEC_FLAG_CLOSED_GOP` on an encoder context before it is
/// opened, so the Re-encode Segment Engine's output never references
/// frames before the re-encoded segment starts.
pub fn set_closed_gop(ctx: &mut ffmpeg::codec::context::Context) {
    const AV_CODEC_FLAG_CLOSED_GOP: i32 = 1 << 24;
    // SAFETY: `ctx.as_mut_ptr()` is valid for the lifetime of `ctx`. `flags`
    // is a plain i32 bitmask field with no ownership semantics. Must be
    // called before the context is opened as an encoder.
    unsafe {
        (*ctx.as_mut_ptr()).flags |= AV_CODEC_FLAG_CLOSED_GOP;
    }
}

/// Sets `profile`/`level` on an encoder context before it is opened, matching
/// the source stream's values so the re-encoded segment is bitstream-compatible
/// with the copied packets surrounding it.
pub fn set_profile_level(ctx: &mut ffmpeg::codec::context::Context, profile: i32, level: i32) {
    // SAFETY: `ctx.as_mut_ptr()` is valid for the lifetime of `ctx`. `profile`
    // and `level` are plain i32 fields with no ownership semantics. Must be
    // called before the context is opened as an encoder.
    unsafe {
        if profile >= 0 {
            (*ctx.as_mut_ptr()).profile = profile;
        }
        if level >= 0 {
            (*ctx.as_mut_ptr()).level = level;
        }
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Override codec fields on an `AVCodecParameters` for testing purposes.
///
/// Allows tests to simulate a different codec (e.g. HEVC) by patching the raw
/// struct fields that `ffmpeg-next` does not expose through safe setters.
#[cfg(test)]
pub fn codec_params_set_for_test(
    params: &mut ffmpeg::codec::parameters::Parameters,
    codec_id: ffmpeg::ffi::AVCodecID,
    width: i32,
    height: i32,
) {
    // SAFETY: `params.as_mut_ptr()` is valid for the lifetime of `params`.
    // These are plain scalar fields with no ownership semantics.  This
    // function is only compiled in test builds.
    unsafe {
        let p = params.as_mut_ptr();
        (*p).codec_id = codec_id;
        (*p).width = width;
        (*p).height = height;
    }
}
