//! # smartcut-core
//!
//! `smartcut-core` implements frame-accurate, minimal-re-encode video
//! cutting: given a source file and a set of keep/cut intervals, it copies
//! as many compressed packets straight through as GOP structure allows and
//! re-encodes only the handful of frames at each splice boundary that must
//! change to remain decodable.
//!
//! ## Pipeline
//!
//! - [`time`] resolves CLI time tokens into presentation-time intervals.
//! - [`gop`] scans a video stream once into a keyframe/parameter-set index.
//! - [`planner`] turns one interval plus the GOP index into a [`types::SplicePlan`].
//! - [`reencode`] decodes a bounded window and re-encodes the frames the plan marks.
//! - [`passthrough`] selects non-video packets for an interval.
//! - [`mux`] assembles the output container from both kinds of packet.
//! - [`job`] drives the whole pipeline for one invocation.
//!
//! ## Usage
//!
//! ```ignore
//! use smartcut_core::{ffmpeg_init, Job, JobOptions, TimeInterval};
//!
//! ffmpeg_init()?;
//!
//! let job = Job::new(
//!     "input.mp4",
//!     "output.mp4",
//!     vec![TimeInterval::new(0, 900_000)],
//!     JobOptions::default(),
//! );
//! job.run(&std::sync::atomic::AtomicBool::new(false))?;
//! ```
pub mod config;
pub mod error;
pub mod ffmpeg_utils;
pub mod gop;
pub mod job;
pub mod mux;
pub mod nal;
pub mod passthrough;
pub mod planner;
pub mod probe;
pub mod reencode;
pub mod time;
pub mod types;

pub use config::{load_job_options, ConfigFile};
pub use error::{CutError, FfmpegError, Result};
pub use ffmpeg_utils::version_info as ffmpeg_version_info;
pub use ffmpeg_utils::{init as ffmpeg_init, install_log_filter as ffmpeg_log_filter};
pub use job::Job;
pub use time::{parse_token, resolve_intervals, TimeContext};
pub use types::{JobOptions, PacketFlags, SplicePlan, StreamDescriptor, StreamKind, TimeInterval};
