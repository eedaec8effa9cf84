//! Time Resolver (C1): maps user time tokens to absolute presentation-time
//! intervals in the reference video stream's timebase.

use crate::error::CutError;
use crate::types::TimeInterval;
use ffmpeg_next as ffmpeg;
use regex::Regex;
use std::sync::OnceLock;

fn hhmmss_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2})(\.\d+)?$").unwrap())
}

fn mmss_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+):(\d{1,2})(\.\d+)?$").unwrap())
}

fn frame_index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)f$").unwrap())
}

/// The reference points a token needs to resolve against.
pub struct TimeContext {
    pub duration_secs: f64,
    pub frame_rate: ffmpeg::Rational,
}

/// Parses one raw token into an absolute number of seconds from file start.
///
/// Grammar: integer/decimal seconds, `HH:MM:SS[.fff]`,
/// `MM:SS[.fff]`, a frame index suffixed `f` (e.g. `"300f"`), the literals
/// `s`/`start`, `e`/`end`, any of the above prefixed with `-` meaning "from
/// end of file".
pub fn parse_token(raw: &str, ctx: &TimeContext) -> Result<f64, CutError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CutError::InvalidTimeToken(raw.to_string()));
    }

    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    let seconds = match body {
        "s" | "start" => 0.0,
        "e" | "end" => ctx.duration_secs,
        _ => {
            if let Some(caps) = hhmmss_re().captures(body) {
                let h: f64 = caps[1].parse().unwrap();
                let m: f64 = caps[2].parse().unwrap();
                let s: f64 = caps[3].parse().unwrap();
                let frac: f64 = caps
                    .get(4)
                    .map(|f| f.as_str().parse().unwrap_or(0.0))
                    .unwrap_or(0.0);
                h * 3600.0 + m * 60.0 + s + frac
            } else if let Some(caps) = mmss_re().captures(body) {
                let m: f64 = caps[1].parse().unwrap();
                let s: f64 = caps[2].parse().unwrap();
                let frac: f64 = caps
                    .get(3)
                    .map(|f| f.as_str().parse().unwrap_or(0.0))
                    .unwrap_or(0.0);
                m * 60.0 + s + frac
            } else if let Some(caps) = frame_index_re().captures(body) {
                let n: f64 = caps[1].parse().unwrap();
                let fps = ctx.frame_rate.numerator() as f64 / ctx.frame_rate.denominator() as f64;
                if fps <= 0.0 {
                    return Err(CutError::InvalidTimeToken(raw.to_string()));
                }
                n / fps
            } else if let Ok(v) = body.parse::<f64>() {
                v
            } else {
                return Err(CutError::InvalidTimeToken(raw.to_string()));
            }
        }
    };

    if negative {
        Ok((ctx.duration_secs - seconds).max(0.0))
    } else {
        Ok(seconds)
    }
}

/// Pairs consecutive tokens into `(start, end)` second pairs and validates
/// ordering/range.
fn pair_and_validate(
    seconds: Vec<f64>,
    duration_secs: f64,
) -> Result<Vec<(f64, f64)>, CutError> {
    if seconds.is_empty() || seconds.len() % 2 != 0 {
        return Err(CutError::InvalidTimeToken(
            "expected an even number of time tokens forming start,end pairs".to_string(),
        ));
    }
    let mut pairs = Vec::with_capacity(seconds.len() / 2);
    for chunk in seconds.chunks(2) {
        let (start, end) = (chunk[0], chunk[1]);
        // one frame of slack at the tail so a token landing exactly on
        let slack = 1.0 / 24.0;
        if start > duration_secs + slack || end > duration_secs + slack {
            return Err(CutError::OutOfRange {
                value: start.max(end),
                duration: duration_secs,
            });
        }
        if end < start {
            return Err(CutError::IntervalOrder { start, end });
        }
        pairs.push((start.min(duration_secs), end.min(duration_secs)));
    }
    Ok(pairs)
}

/// Complements a sorted, non-overlapping list of `(start, end)` second pairs
/// over `[0, duration]`, turning `--cut` ranges into the equivalent `--keep`
/// ranges.
fn complement(cuts: &[(f64, f64)], duration_secs: f64) -> Vec<(f64, f64)> {
    let mut kept = Vec::new();
    let mut cursor = 0.0;
    for &(start, end) in cuts {
        if start > cursor {
            kept.push((cursor, start));
        }
        cursor = cursor.max(end);
    }
    if cursor < duration_secs {
        kept.push((cursor, duration_secs));
    }
    kept
}

fn merge_sorted(mut pairs: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(pairs.len());
    for (start, end) in pairs {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

fn seconds_to_pts(seconds: f64, timebase: ffmpeg::Rational) -> i64 {
    let den = timebase.numerator() as f64 / timebase.denominator() as f64;
    (seconds / den).round() as i64
}

/// Resolves `--keep`/`--cut` raw token lists into a sorted, merged,
/// non-overlapping list of [`TimeInterval`]s in `timebase` units.
///
/// Exactly one of `keep_tokens`/`cut_tokens` should be `Some`; passing both
/// is a caller error surfaced as `InvalidTimeToken`.
pub fn resolve_intervals(
    keep_tokens: Option<&[String]>,
    cut_tokens: Option<&[String]>,
    timebase: ffmpeg::Rational,
    ctx: &TimeContext,
) -> Result<Vec<TimeInterval>, CutError> {
    let (tokens, is_cut) = match (keep_tokens, cut_tokens) {
        (Some(k), None) => (k, false),
        (None, Some(c)) => (c, true),
        _ => {
            return Err(CutError::InvalidTimeToken(
                "exactly one of --keep or --cut must be given".to_string(),
            ))
        }
    };

    if tokens.is_empty() {
        return Err(CutError::InvalidTimeToken(
            "at least one interval must be given".to_string(),
        ));
    }

    let seconds: Vec<f64> = tokens
        .iter()
        .map(|t| parse_token(t, ctx))
        .collect::<Result<_, _>>()?;

    let pairs = pair_and_validate(seconds, ctx.duration_secs)?;
    let merged = merge_sorted(pairs);
    let kept = if is_cut {
        complement(&merged, ctx.duration_secs)
    } else {
        merged
    };

    Ok(kept
        .into_iter()
        .map(|(s, e)| TimeInterval::new(seconds_to_pts(s, timebase), seconds_to_pts(e, timebase)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(duration_secs: f64) -> TimeContext {
        TimeContext {
            duration_secs,
            frame_rate: ffmpeg::Rational::new(30, 1),
        }
    }

    #[test]
    fn parses_plain_seconds() {
        assert_eq!(parse_token("10", &ctx(60.0)).unwrap(), 10.0);
        assert_eq!(parse_token("10.5", &ctx(60.0)).unwrap(), 10.5);
    }

    #[test]
    fn parses_hhmmss() {
        assert_eq!(parse_token("00:01:30", &ctx(600.0)).unwrap(), 90.0);
        assert_eq!(parse_token("1:30.5", &ctx(600.0)).unwrap(), 90.5);
    }

    #[test]
    fn parses_start_end_tokens() {
        assert_eq!(parse_token("start", &ctx(60.0)).unwrap(), 0.0);
        assert_eq!(parse_token("s", &ctx(60.0)).unwrap(), 0.0);
        assert_eq!(parse_token("end", &ctx(60.0)).unwrap(), 60.0);
        assert_eq!(parse_token("e", &ctx(60.0)).unwrap(), 60.0);
    }

    #[test]
    fn parses_negative_offsets() {
        assert_eq!(parse_token("-1:30", &ctx(60.0)).unwrap(), 0.0);
        assert_eq!(parse_token("-10", &ctx(60.0)).unwrap(), 50.0);
    }

    #[test]
    fn parses_frame_index() {
        assert_eq!(parse_token("300f", &ctx(60.0)).unwrap(), 10.0);
    }

    #[test]
    fn rejects_unparseable_token() {
        assert!(parse_token("banana", &ctx(60.0)).is_err());
    }

    #[test]
    fn resolve_keep_basic() {
        let intervals = resolve_intervals(
            Some(&["10".to_string(), "20".to_string(), "40".to_string(), "50".to_string()]),
            None,
            ffmpeg::Rational::new(1, 90000),
            &ctx(60.0),
        )
        .unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].start_pts, 900_000);
        assert_eq!(intervals[0].end_pts, 1_800_000);
    }

    #[test]
    fn resolve_cut_complements() {
        let keep = resolve_intervals(
            Some(&["5".to_string(), "15".to_string()]),
            None,
            ffmpeg::Rational::new(1, 1000),
            &ctx(20.0),
        )
        .unwrap();
        let cut = resolve_intervals(
            None,
            Some(&[
                "0".to_string(),
                "5".to_string(),
                "15".to_string(),
                "20".to_string(),
            ]),
            ffmpeg::Rational::new(1, 1000),
            &ctx(20.0),
        )
        .unwrap();
        assert_eq!(keep, cut);
    }

    #[test]
    fn rejects_end_before_start() {
        let err = resolve_intervals(
            Some(&["20".to_string(), "10".to_string()]),
            None,
            ffmpeg::Rational::new(1, 1000),
            &ctx(60.0),
        )
        .unwrap_err();
        assert!(matches!(err, CutError::IntervalOrder { .. }));
    }

    #[test]
    fn rejects_out_of_range() {
        let err = resolve_intervals(
            Some(&["0".to_string(), "1000".to_string()]),
            None,
            ffmpeg::Rational::new(1, 1000),
            &ctx(60.0),
        )
        .unwrap_err();
        assert!(matches!(err, CutError::OutOfRange { .. }));
    }
}
