//! FFmpeg module - provides wrappers and utilities for FFmpeg library access
//!
//! This module handles:
//! - FFmpeg initialization
//! - Input context management
//! - Timebase conversion and other utilities

pub mod context;
pub mod helpers;
pub mod utils;

pub use ffmpeg_next as ffmpeg;
#[allow(unused_imports)]
pub use utils::*;

/// Initialize the FFmpeg library.
///
/// This should be called exactly once at application startup before any other
/// FFmpeg-related functions (like `parse_file` or `generate_segment`) are used.
/// Returns an error if the underlying C library fails to initialize context structures.
pub fn init() -> Result<(), crate::error::FfmpegError> {
    ffmpeg::init().map_err(|e| {
        crate::error::FfmpegError::InitFailed(format!("ffmpeg::init() failed: {}", e))
    })?;

    tracing::info!("FFmpeg initialized");

    Ok(())
}

/// Install a custom FFmpeg log callback that suppresses known-noisy messages.
///
/// Splicing at a re-encoded boundary routinely produces a muxer warning about
/// non-monotonic DTS on the first packet after a cut, which is expected and
/// already accounted for by the Muxing Scheduler's DTS rebasing. This function
/// filters such messages out so they don't pollute the application log.
///
/// **Safety & Ordering:** Must be called after `init()` and before any threading begins,
/// because altering the global log callback is not thread-safe.
pub fn install_log_filter() {
    // SAFETY: both functions modify global FFmpeg state and are safe to call
    // after `ffmpeg::init()`.  They are called exactly once at startup, before
    // the Job's packet loop begins.
    unsafe {
        ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_WARNING as i32);
        ffmpeg_next::ffi::av_log_set_callback(Some(ffmpeg_log_callback));
    }
}

/// Messages that are expected side-effects of our splicing design and should be suppressed.
const SUPPRESSED_MESSAGES: &[&str] = &[
    "Application provided invalid, non monotonically increasing dts",
    "Timestamps are unset in a packet",
];

unsafe extern "C" fn ffmpeg_log_callback(
    avcl: *mut std::ffi::c_void,
    level: std::ffi::c_int,
    fmt: *const std::ffi::c_char,
    vl: ffmpeg_next::ffi::va_list,
) {
    use std::ffi::CStr;

    // Respect the configured log level
    if level > unsafe { ffmpeg_next::ffi::av_log_get_level() } {
        return;
    }

    // Format the message using FFmpeg's own vsnprintf helper
    let mut buf = [0i8; 1024];
    let mut print_prefix: std::ffi::c_int = 1;
    ffmpeg_next::ffi::av_log_format_line(
        avcl,
        level,
        fmt,
        vl,
        buf.as_mut_ptr(),
        buf.len() as std::ffi::c_int,
        &mut print_prefix,
    );

    let msg = CStr::from_ptr(buf.as_ptr()).to_string_lossy();

    // Drop messages that are known, benign side-effects of our design
    for suppressed in SUPPRESSED_MESSAGES {
        if msg.contains(suppressed) {
            return;
        }
    }

    eprint!("{}", msg);
}

/// Get the version information of the linked FFmpeg libraries.
/// Useful for debugging and reporting environment consistency.
pub fn version_info() -> String {
    // Return a simple version string since the API changed in FFmpeg 8.0
    "FFmpeg 8.0+".to_string()
}
