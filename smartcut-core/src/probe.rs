//! Builds a [`StreamDescriptor`] for every stream in an opened input,
//! reading the fields the Cut Planner, Re-encode Segment Engine, and Muxing
//! Scheduler need from each one.

use ffmpeg_next as ffmpeg;

use crate::ffmpeg_utils::helpers;
use crate::types::{StreamDescriptor, StreamKind};

pub fn describe_streams(input: &ffmpeg::format::context::Input) -> Vec<StreamDescriptor> {
    input
        .streams()
        .map(|stream| describe_stream(&stream))
        .collect()
}

fn describe_stream(stream: &ffmpeg::Stream) -> StreamDescriptor {
    let params = stream.parameters();
    let kind = StreamKind::from_ffmpeg(params.medium());

    StreamDescriptor {
        index: stream.index(),
        kind,
        codec_id: params.id(),
        timebase: stream.time_base(),
        extradata: helpers::codec_params_extradata(&params),
        profile: helpers::codec_params_profile(&params),
        level: helpers::codec_params_level(&params),
        pix_fmt: helpers::codec_params_pix_fmt(&params),
        width: helpers::codec_params_width(&params),
        height: helpers::codec_params_height(&params),
        frame_rate: stream.avg_frame_rate(),
        sample_aspect_ratio: helpers::codec_params_sample_aspect_ratio(&params),
        sample_rate: helpers::codec_params_sample_rate(&params),
        channels: helpers::codec_params_channels(&params),
        bit_rate: helpers::codec_params_bit_rate(&params),
        language: stream.metadata().get("language").map(|s| s.to_string()),
        disposition: stream.disposition(),
    }
}
