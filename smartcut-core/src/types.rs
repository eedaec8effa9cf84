use ffmpeg_next as ffmpeg;

/// A half-open presentation-time interval `[start_pts, end_pts)` in the
/// reference video stream's timebase. `end_pts` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeInterval {
    pub start_pts: i64,
    pub end_pts: i64,
}

impl TimeInterval {
    pub fn new(start_pts: i64, end_pts: i64) -> Self {
        Self { start_pts, end_pts }
    }

    pub fn contains(&self, pts: i64) -> bool {
        pts >= self.start_pts && pts < self.end_pts
    }

    pub fn duration(&self) -> i64 {
        self.end_pts - self.start_pts
    }
}

/// The media kind of a stream, mirroring `AVMediaType` but restricted to the
/// kinds the muxing scheduler routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
}

impl StreamKind {
    pub fn from_ffmpeg(media_type: ffmpeg::media::Type) -> Self {
        match media_type {
            ffmpeg::media::Type::Video => StreamKind::Video,
            ffmpeg::media::Type::Audio => StreamKind::Audio,
            ffmpeg::media::Type::Subtitle => StreamKind::Subtitle,
            ffmpeg::media::Type::Attachment => StreamKind::Attachment,
            _ => StreamKind::Data,
        }
    }
}

/// Static description of one stream, carried from input to output.
#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    /// Zero-based index of this stream in the source container
    pub index: usize,
    pub kind: StreamKind,
    pub codec_id: ffmpeg::codec::Id,
    pub timebase: ffmpeg::Rational,
    /// Opaque codec extradata (SPS/PPS/VPS for H.264/H.265, or codec-specific config)
    pub extradata: Vec<u8>,
    pub profile: i32,
    pub level: i32,
    pub pix_fmt: ffmpeg::format::Pixel,
    pub width: u32,
    pub height: u32,
    pub frame_rate: ffmpeg::Rational,
    pub sample_aspect_ratio: ffmpeg::Rational,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_rate: u64,
    pub language: Option<String>,
    /// Disposition bits copied verbatim (default, forced, hearing-impaired, ...)
    pub disposition: ffmpeg::format::stream::Disposition,
}

impl StreamDescriptor {
    pub fn is_video(&self) -> bool {
        matches!(self.kind, StreamKind::Video)
    }
}

/// Picture type classification used by open-GOP codecs (H.264/H.265).
/// `None` for streams whose keyframe flag alone is sufficient (MPEG-2, VP9, AV1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicType {
    I,
    P,
    B,
    Cra,
    Bla,
    Idr,
    Rasl,
    Radl,
    Trail,
}

/// Per-packet flags carried alongside demuxed/copied/encoded packets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFlags {
    pub keyframe: bool,
    /// Packet should be decoded for reference but not presented (e.g. pre-roll audio priming)
    pub discard: bool,
    /// Container flagged this sample as corrupt
    pub corrupt: bool,
}

/// A single compressed packet flowing through the engine.
#[derive(Debug, Clone)]
pub struct Packet {
    pub stream_index: usize,
    pub dts: i64,
    pub pts: i64,
    pub duration: i64,
    pub flags: PacketFlags,
    pub pic_type: Option<PicType>,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn is_keyframe(&self) -> bool {
        self.flags.keyframe
    }
}

/// Whether a GOP's non-keyframe pictures may reference the preceding GOP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GopOpenness {
    Closed,
    Open,
}

/// One entry of the per-video-stream GOP index: a keyframe, the PTS of the
/// next keyframe (or `None` at end of stream), its openness classification,
/// and the parameter-set epoch active at that point.
#[derive(Debug, Clone, Copy)]
pub struct GopEntry {
    pub keyframe_pts: i64,
    pub next_keyframe_pts: Option<i64>,
    pub openness: GopOpenness,
    pub parameter_set_epoch: u32,
}

impl GopEntry {
    /// Number of presentation-time units spanned by this GOP, if bounded.
    pub fn span(&self) -> Option<i64> {
        self.next_keyframe_pts.map(|next| next - self.keyframe_pts)
    }
}

/// Per-interval, per-video-stream splice plan computed by the Cut Planner.
#[derive(Debug, Clone, Default)]
pub struct SplicePlan {
    /// PTS of the first keyframe usable for straight passthrough
    pub copy_from_pts: i64,
    /// PTS of the last frame whose decode does not require samples beyond the interval end
    pub copy_to_pts: i64,
    /// Frames in `[interval.start_pts, copy_from_pts)`, in decode order, that must be re-encoded
    pub reencode_prefix: Vec<i64>,
    /// Frames in `(copy_to_pts, interval.end_pts]` that must be re-encoded to close the tail GOP
    pub reencode_suffix: Vec<i64>,
    /// SPS/PPS/VPS to emit ahead of the re-encoded segment
    pub boundary_parameter_sets: Vec<u8>,
}

impl SplicePlan {
    /// A plan with no re-encode work: the interval starts on a usable closed-GOP keyframe.
    pub fn straight_passthrough(from_pts: i64, to_pts: i64) -> Self {
        Self {
            copy_from_pts: from_pts,
            copy_to_pts: to_pts,
            reencode_prefix: Vec::new(),
            reencode_suffix: Vec::new(),
            boundary_parameter_sets: Vec::new(),
        }
    }

    pub fn needs_prefix_reencode(&self) -> bool {
        !self.reencode_prefix.is_empty()
    }

    pub fn needs_suffix_reencode(&self) -> bool {
        !self.reencode_suffix.is_empty()
    }
}

/// Per-Job tunables that are not part of the per-invocation interval list.
///
/// Populated from CLI flags and, for the rest, an optional `smartcut.toml`
/// (see [`crate::config`]).
#[derive(Debug, Clone)]
pub struct JobOptions {
    /// Cap on frames a single re-encode window may decode before `GopTooLarge`
    pub max_gop_frames: u32,
    /// If set, the first output DTS preserves the input's epoch instead of rebasing to 0
    pub preserve_timestamps: bool,
    /// Print the computed splice plan as JSON instead of writing output
    pub dry_run: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            max_gop_frames: 1200,
            preserve_timestamps: false,
            dry_run: false,
        }
    }
}
