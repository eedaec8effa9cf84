//! H.264 NAL classification and open-GOP detection.
//!
//! A GOP is open if its SPS sets
//! `gaps_in_frame_num_value_allowed_flag` and a non-IDR slice near the start
//! of the GOP references `frame_num` values that predate the keyframe.

use super::{BitReader, NalCodec, NalUnit};
use crate::types::PicType;

pub const NAL_SLICE_NON_IDR: u8 = 1;
pub const NAL_SLICE_IDR: u8 = 5;
pub const NAL_SEI: u8 = 6;
pub const NAL_SPS: u8 = 7;
pub const NAL_PPS: u8 = 8;
pub const NAL_AUD: u8 = 9;

pub fn nal_type(first_byte: u8) -> u8 {
    first_byte & 0x1F
}

pub fn is_vcl(nal_type: u8) -> bool {
    (1..=5).contains(&nal_type)
}

/// Parsed subset of an H.264 SPS relevant to open-GOP detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpsInfo {
    pub gaps_in_frame_num_allowed: bool,
    pub log2_max_frame_num: u32,
}

/// Parses just enough of an SPS RBSP to recover
/// `gaps_in_frame_num_value_allowed_flag` and `log2_max_frame_num_minus4`.
pub fn parse_sps(rbsp: &[u8]) -> Option<SpsInfo> {
    // rbsp[0] is the NAL header byte.
    let mut r = BitReader::new(&rbsp[1..]);
    let profile_idc = r.read_bits(8)?;
    let _constraint_flags = r.read_bits(8)?;
    let _level_idc = r.read_bits(8)?;
    let _sps_id = r.read_ue()?;

    if matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138 | 139 | 134 | 135
    ) {
        let chroma_format_idc = r.read_ue()?;
        if chroma_format_idc == 3 {
            let _separate_colour_plane_flag = r.read_bit()?;
        }
        let _bit_depth_luma_minus8 = r.read_ue()?;
        let _bit_depth_chroma_minus8 = r.read_ue()?;
        let _qpprime_y_zero_transform_bypass_flag = r.read_bit()?;
        let seq_scaling_matrix_present_flag = r.read_bit()?;
        if seq_scaling_matrix_present_flag == 1 {
            // Conservative: scaling-list parsing is not needed for our
            // purposes and we bail to "unknown" rather than get this wrong.
            return None;
        }
    }

    let log2_max_frame_num_minus4 = r.read_ue()?;
    let pic_order_cnt_type = r.read_ue()?;
    if pic_order_cnt_type == 0 {
        let _log2_max_pic_order_cnt_lsb_minus4 = r.read_ue()?;
    } else if pic_order_cnt_type == 1 {
        let _delta_pic_order_always_zero_flag = r.read_bit()?;
        let _offset_for_non_ref_pic = r.read_se()?;
        let _offset_for_top_to_bottom_field = r.read_se()?;
        let num_ref_frames_in_pic_order_cnt_cycle = r.read_ue()?;
        for _ in 0..num_ref_frames_in_pic_order_cnt_cycle {
            let _ = r.read_se()?;
        }
    }

    let _max_num_ref_frames = r.read_ue()?;
    let gaps_in_frame_num_allowed = r.read_bit()? == 1;

    Some(SpsInfo {
        gaps_in_frame_num_allowed,
        log2_max_frame_num: log2_max_frame_num_minus4 + 4,
    })
}

/// Reads just `first_mb_in_slice`, `slice_type`, and `frame_num` from a
/// slice header — enough to distinguish IDR from open-GOP leading
/// non-reference pictures without a full slice-header parse.
pub fn parse_slice_frame_num(rbsp: &[u8], log2_max_frame_num: u32) -> Option<u32> {
    let mut r = BitReader::new(&rbsp[1..]);
    let _first_mb_in_slice = r.read_ue()?;
    let _slice_type = r.read_ue()?;
    let _pic_parameter_set_id = r.read_ue()?;
    r.read_bits(log2_max_frame_num)
}

pub struct H264;

impl NalCodec for H264 {
    fn parse_nal(&self, payload: &[u8]) -> Vec<NalUnit> {
        super::split_length_prefixed(payload)
            .into_iter()
            .map(|rbsp| NalUnit {
                nal_type: nal_type(rbsp[0]),
                rbsp,
            })
            .collect()
    }

    fn classify_pic_type(&self, units: &[NalUnit]) -> Option<PicType> {
        for u in units {
            match u.nal_type {
                NAL_SLICE_IDR => return Some(PicType::Idr),
                NAL_SLICE_NON_IDR => return Some(PicType::P),
                _ => continue,
            }
        }
        None
    }

    fn is_splice_keyframe(&self, pic_type: PicType) -> bool {
        // Conservative: only a true IDR is accepted as a
        // zero-re-encode splice point; a container-flagged keyframe that
        // isn't an IDR is a non-IDR I-frame opening an open GOP.
        matches!(pic_type, PicType::Idr)
    }

    fn gop_openness(&self, units: &[NalUnit]) -> crate::types::GopOpenness {
        match self.classify_pic_type(units) {
            Some(PicType::Idr) => crate::types::GopOpenness::Closed,
            _ => crate::types::GopOpenness::Open,
        }
    }

    fn gop_openness_with_lookahead(
        &self,
        units: &[NalUnit],
        following: Option<&[NalUnit]>,
    ) -> crate::types::GopOpenness {
        // Container flagged this packet as a keyframe without an IDR slice:
        // an open-GOP recovery-point picture, no SPS re-evaluation needed.
        if !matches!(self.classify_pic_type(units), Some(PicType::Idr)) {
            return crate::types::GopOpenness::Open;
        }

        let Some(sps) = units
            .iter()
            .find(|u| u.nal_type == NAL_SPS)
            .and_then(|u| parse_sps(&u.rbsp))
        else {
            return crate::types::GopOpenness::Closed;
        };

        if !sps.gaps_in_frame_num_allowed {
            return crate::types::GopOpenness::Closed;
        }

        let keyframe_frame_num = units
            .iter()
            .find(|u| u.nal_type == NAL_SLICE_IDR)
            .and_then(|u| parse_slice_frame_num(&u.rbsp, sps.log2_max_frame_num));

        let (Some(start), Some(following)) = (keyframe_frame_num, following) else {
            // Can't establish the baseline frame_num, or no following slice
            // was available to check (last keyframe in the stream): the SPS
            // permits gaps, so treat as open rather than assume closed.
            return crate::types::GopOpenness::Open;
        };

        let Some(next_frame_num) = following
            .iter()
            .find(|u| u.nal_type == NAL_SLICE_NON_IDR)
            .and_then(|u| parse_slice_frame_num(&u.rbsp, sps.log2_max_frame_num))
        else {
            return crate::types::GopOpenness::Closed;
        };

        let max_frame_num = 1u32 << sps.log2_max_frame_num;
        let expected = (start + 1) % max_frame_num;
        if next_frame_num == expected {
            crate::types::GopOpenness::Closed
        } else {
            crate::types::GopOpenness::Open
        }
    }

    fn rewrite_boundary(&self, payload: &[u8], _has_leading_pictures: bool) -> Vec<u8> {
        // H.264 has no CRA/BLA distinction; splice boundaries always start
        // on an IDR and require no rewrite.
        payload.to_vec()
    }

    fn is_discardable_leading_picture(&self, _units: &[NalUnit]) -> bool {
        false
    }

    fn extract_parameter_sets(&self, units: &[NalUnit]) -> Option<Vec<u8>> {
        let sets: Vec<&NalUnit> = units
            .iter()
            .filter(|u| matches!(u.nal_type, NAL_SPS | NAL_PPS))
            .collect();
        if sets.is_empty() {
            return None;
        }
        let mut out = Vec::new();
        for u in sets {
            out.extend_from_slice(&[0, 0, 0, 1]);
            out.extend_from_slice(&super::insert_emulation_prevention(&u.rbsp));
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nal_type_masks_low_five_bits() {
        assert_eq!(nal_type(0x67), NAL_SPS);
        assert_eq!(nal_type(0x65), NAL_SLICE_IDR);
        assert_eq!(nal_type(0x41), NAL_SLICE_NON_IDR);
    }

    #[test]
    fn is_vcl_covers_slice_types() {
        assert!(is_vcl(NAL_SLICE_IDR));
        assert!(is_vcl(NAL_SLICE_NON_IDR));
        assert!(!is_vcl(NAL_SPS));
        assert!(!is_vcl(NAL_AUD));
    }
}
