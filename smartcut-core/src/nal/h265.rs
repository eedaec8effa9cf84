//! H.265/HEVC NAL classification, CRA→BLA splice rewriting, and RASL
//! discard.

use super::{NalCodec, NalUnit};
use crate::types::PicType;

pub const TRAIL_N: u8 = 0;
pub const TRAIL_R: u8 = 1;
pub const RADL_N: u8 = 6;
pub const RADL_R: u8 = 7;
pub const RASL_N: u8 = 8;
pub const RASL_R: u8 = 9;
pub const BLA_W_LP: u8 = 16;
pub const BLA_W_RADL: u8 = 17;
pub const BLA_N_LP: u8 = 18;
pub const IDR_W_RADL: u8 = 19;
pub const IDR_N_LP: u8 = 20;
pub const CRA_NUT: u8 = 21;
pub const VPS_NUT: u8 = 32;
pub const SPS_NUT: u8 = 33;
pub const PPS_NUT: u8 = 34;

/// Extracts the 6-bit `nal_unit_type` from a two-byte HEVC NAL header.
pub fn nal_type(header: &[u8]) -> u8 {
    (header[0] >> 1) & 0x3F
}

pub fn is_vcl(nal_type: u8) -> bool {
    nal_type <= 31
}

pub fn is_rasl(nal_type: u8) -> bool {
    matches!(nal_type, RASL_N | RASL_R)
}

pub fn is_radl(nal_type: u8) -> bool {
    matches!(nal_type, RADL_N | RADL_R)
}

pub fn is_cra(nal_type: u8) -> bool {
    nal_type == CRA_NUT
}

pub fn is_bla(nal_type: u8) -> bool {
    matches!(nal_type, BLA_W_LP | BLA_W_RADL | BLA_N_LP)
}

pub fn is_idr(nal_type: u8) -> bool {
    matches!(nal_type, IDR_W_RADL | IDR_N_LP)
}

pub fn pic_type_for(nal_type: u8) -> Option<PicType> {
    match nal_type {
        t if is_idr(t) => Some(PicType::Idr),
        t if is_bla(t) => Some(PicType::Bla),
        t if is_cra(t) => Some(PicType::Cra),
        t if is_rasl(t) => Some(PicType::Rasl),
        t if is_radl(t) => Some(PicType::Radl),
        TRAIL_N | TRAIL_R => Some(PicType::Trail),
        _ => None,
    }
}

/// Rewrites a CRA NAL unit type to BLA_W_LP (leading pictures present) or
/// BLA_N_LP (none). Leaves non-CRA units unchanged.
///
/// The NAL unit type occupies bits 1-6 of the first header byte; only that
/// byte needs patching, the rest of the RBSP (including its slice-header
/// `first_slice_segment_in_pic_flag` etc.) is untouched by this rewrite.
pub fn rewrite_cra_to_bla(nal: &[u8], has_leading_pictures: bool) -> Vec<u8> {
    let mut out = nal.to_vec();
    if out.is_empty() || nal_type(&out) != CRA_NUT {
        return out;
    }
    let new_type = if has_leading_pictures {
        BLA_W_LP
    } else {
        BLA_N_LP
    };
    out[0] = (out[0] & 0x01) | (new_type << 1);
    out
}

pub struct H265;

impl NalCodec for H265 {
    fn parse_nal(&self, payload: &[u8]) -> Vec<NalUnit> {
        super::split_length_prefixed(payload)
            .into_iter()
            .filter(|rbsp| rbsp.len() >= 2)
            .map(|rbsp| NalUnit {
                nal_type: nal_type(&rbsp),
                rbsp,
            })
            .collect()
    }

    fn classify_pic_type(&self, units: &[NalUnit]) -> Option<PicType> {
        units
            .iter()
            .filter(|u| is_vcl(u.nal_type))
            .find_map(|u| pic_type_for(u.nal_type))
    }

    fn is_splice_keyframe(&self, pic_type: PicType) -> bool {
        // CRA deliberately excluded: it opens a GOP, so a splice landing
        // on one is conservatively re-encoded instead of copied straight.
        matches!(pic_type, PicType::Idr | PicType::Bla)
    }

    fn gop_openness(&self, units: &[NalUnit]) -> crate::types::GopOpenness {
        match self.classify_pic_type(units) {
            Some(PicType::Cra) => crate::types::GopOpenness::Open,
            _ => crate::types::GopOpenness::Closed,
        }
    }

    fn rewrite_boundary(&self, payload: &[u8], has_leading_pictures: bool) -> Vec<u8> {
        let units = super::split_length_prefixed(payload);
        let mut out = Vec::with_capacity(payload.len());
        for unit in units {
            let rewritten = if nal_type(&unit) == CRA_NUT {
                rewrite_cra_to_bla(&unit, has_leading_pictures)
            } else {
                unit
            };
            out.extend_from_slice(&(rewritten.len() as u32).to_be_bytes());
            out.extend_from_slice(&rewritten);
        }
        out
    }

    fn is_discardable_leading_picture(&self, units: &[NalUnit]) -> bool {
        units.iter().any(|u| is_rasl(u.nal_type))
    }

    fn extract_parameter_sets(&self, units: &[NalUnit]) -> Option<Vec<u8>> {
        let sets: Vec<&NalUnit> = units
            .iter()
            .filter(|u| matches!(u.nal_type, VPS_NUT | SPS_NUT | PPS_NUT))
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
    fn extracts_nal_type_from_two_byte_header() {
        // nal_unit_type = 21 (CRA_NUT): byte0 = 0_010101_0 -> 0x2A
        let header = [0x2A, 0x01];
        assert_eq!(nal_type(&header), CRA_NUT);
    }

    #[test]
    fn rewrites_cra_to_bla_w_lp() {
        let cra = [0x2A, 0x01, 0xAB, 0xCD];
        let rewritten = rewrite_cra_to_bla(&cra, true);
        assert_eq!(nal_type(&rewritten), BLA_W_LP);
        assert_eq!(&rewritten[2..], &cra[2..]);
    }

    #[test]
    fn rewrites_cra_to_bla_n_lp_without_leading_pictures() {
        let cra = [0x2A, 0x01];
        let rewritten = rewrite_cra_to_bla(&cra, false);
        assert_eq!(nal_type(&rewritten), BLA_N_LP);
    }

    #[test]
    fn leaves_non_cra_untouched() {
        let idr = [(IDR_W_RADL << 1), 0x01];
        let rewritten = rewrite_cra_to_bla(&idr, true);
        assert_eq!(rewritten, idr);
    }

    #[test]
    fn classifies_rasl_as_discardable() {
        let units = vec![NalUnit {
            nal_type: RASL_R,
            rbsp: vec![(RASL_R << 1), 0x01],
        }];
        assert!(H265.is_discardable_leading_picture(&units));
    }
}
