use thiserror::Error;

/// Main error type for the smart-cut engine.
#[derive(Error, Debug)]
pub enum CutError {
    /// An error originating from the underlying FFmpeg library
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] FfmpegError),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A time token from the CLI could not be parsed
    #[error("invalid time token: {0:?}")]
    InvalidTimeToken(String),

    /// An interval's end came before its start
    #[error("interval end ({end}) is before its start ({start})")]
    IntervalOrder { start: f64, end: f64 },

    /// A resolved time value fell outside the input's duration
    #[error("time value {value} is out of range (duration is {duration})")]
    OutOfRange { value: f64, duration: f64 },

    /// The input file could not be opened or demuxed
    #[error("input unreadable: {0}")]
    InputUnreadable(String),

    /// A NAL unit failed to parse or did not sequence correctly
    #[error("malformed bitstream at packet offset {offset}: {reason}")]
    BitstreamMalformed { offset: u64, reason: String },

    /// A re-encode window seek did not land on a usable reference frame
    #[error("decoder could not resolve a required reference near pts {pts}")]
    DecoderRefMissing { pts: i64 },

    /// The re-encoder could not exactly replicate the source codec parameters
    #[error("encoder parameters do not match source: {0}")]
    EncoderParamMismatch(String),

    /// The re-encoder failed in a way that cannot be worked around
    #[error("encoder exhausted: {0}")]
    EncoderExhausted(String),

    /// Writing the output container failed
    #[error("output write error: {0}")]
    OutputWriteError(String),

    /// A GOP exceeded the configured `max_gop_frames` resource cap
    #[error(
        "GOP too large ({frames} frames exceeds max_gop_frames={limit}); raise max_gop_frames in smartcut.toml"
    )]
    GopTooLarge { frames: u32, limit: u32 },

    /// The job was cancelled cooperatively
    #[error("cancelled")]
    Cancelled,
}

impl CutError {
    /// Maps a `CutError` to the process exit code defined by the CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            CutError::InvalidTimeToken(_) => 2,
            CutError::IntervalOrder { .. } => 2,
            CutError::OutOfRange { .. } => 2,
            CutError::InputUnreadable(_) => 3,
            CutError::Ffmpeg(FfmpegError::OpenInput(_) | FfmpegError::FindStreamInfo(_)) => 3,
            CutError::BitstreamMalformed { .. } => 4,
            CutError::DecoderRefMissing { .. } => 4,
            CutError::GopTooLarge { .. } => 4,
            CutError::EncoderParamMismatch(_) => 0,
            CutError::EncoderExhausted(_) => 5,
            CutError::OutputWriteError(_) => 6,
            CutError::Ffmpeg(_) => 5,
            CutError::Io(_) => 6,
            CutError::Cancelled => 130,
        }
    }
}

/// FFmpeg-specific errors, mirroring the libavformat/libavcodec failure surface.
#[derive(Error, Debug)]
pub enum FfmpegError {
    /// Failure during global FFmpeg initialization
    #[error("FFmpeg initialization failed: {0}")]
    InitFailed(String),

    /// Failure opening an input media file
    #[error("failed to open input file: {0}")]
    OpenInput(String),

    /// Failure locating stream information within a file
    #[error("failed to find stream info: {0}")]
    FindStreamInfo(String),

    /// The requested decoder for a specific codec ID was not found
    #[error("failed to find decoder: codec_id={0}")]
    DecoderNotFound(String),

    /// Failure instantiating a decoder
    #[error("failed to create decoder: {0}")]
    DecoderCreate(String),

    /// The requested encoder for a specific codec ID was not found
    #[error("failed to find encoder: codec_id={0}")]
    EncoderNotFound(String),

    /// Failure instantiating an encoder
    #[error("failed to create encoder: {0}")]
    EncoderCreate(String),

    /// Failure applying configuration parameters to an encoder
    #[error("failed to configure encoder: {0}")]
    EncoderConfigure(String),

    /// Failure creating an output format muxer
    #[error("failed to create muxer: {0}")]
    MuxerCreate(String),

    /// Failure writing the container header
    #[error("failed to write header: {0}")]
    WriteHeader(String),

    /// Failure writing a media packet to the container
    #[error("failed to write packet: {0}")]
    WritePacket(String),

    /// Failure writing the container trailer
    #[error("failed to write trailer: {0}")]
    WriteTrailer(String),

    /// Failure decoding a single packet into a frame
    #[error("failed to decode packet: {0}")]
    DecodePacket(String),

    /// Failure encoding a single frame into a packet
    #[error("failed to encode frame: {0}")]
    EncodeFrame(String),

    /// Failure reading a single frame from the input context
    #[error("failed to read frame: {0}")]
    ReadFrame(String),

    /// Failure seeking within the input context
    #[error("failed to seek: {0}")]
    Seek(String),

    /// An invalid or unexpected timebase was encountered
    #[error("invalid timebase")]
    InvalidTimebase,

    /// A required codec was not found
    #[error("codec not found: {0}")]
    CodecNotFound(String),

    /// Failure configuring stream contexts or parameters
    #[error("stream configuration failed: {0}")]
    StreamConfig(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CutError>;
