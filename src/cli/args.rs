//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::error::{SeamcutError, SeamcutResult};
use crate::utils::time::parse_time;

/// Arguments for the cut command
#[derive(Args, Debug)]
pub struct CutArgs {
    /// Input media file
    pub input: PathBuf,

    /// Segment as START-END[:NAME]; either bound may be empty (e.g. "-1:30", "10:00-")
    #[arg(short, long = "segment", value_name = "SPEC", allow_hyphen_values = true)]
    pub segments: Vec<String>,

    /// Load segments from a project file instead
    #[arg(long, conflicts_with = "segments")]
    pub project: Option<PathBuf>,

    /// Save the final segments to a project file
    #[arg(long)]
    pub save_project: Option<PathBuf>,

    /// Output directory (default: next to the input)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Output container format (default: from the input's extension)
    #[arg(long)]
    pub format: Option<String>,

    /// Input stream indices to copy, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    pub streams: Vec<usize>,

    /// Re-encode only the lead-in of segments that do not start on a keyframe
    #[arg(long)]
    pub smart_cut: bool,

    /// Seek before the input (fast, keyframe aligned)
    #[arg(long, value_name = "BOOL")]
    pub keyframe_cut: Option<bool>,

    /// Replace existing outputs
    #[arg(long)]
    pub overwrite: bool,

    /// Metadata to carry over: default, non-global or none
    #[arg(long)]
    pub preserve_metadata: Option<String>,

    /// Negative timestamp handling: auto, make_zero, make_non_negative or disabled
    #[arg(long)]
    pub avoid_negative_ts: Option<String>,

    /// Output playback rate factor
    #[arg(long)]
    pub playback_rate: Option<f64>,

    /// Rotation written into the video stream metadata
    #[arg(long)]
    pub rotate: Option<i32>,

    /// Output metadata tag as KEY=VALUE
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Cut the gaps between the segments instead
    #[arg(long)]
    pub invert: bool,

    /// Snap segment bounds to keyframes: nearest, before or after
    #[arg(long)]
    pub align: Option<String>,
}

/// Arguments for the concat command
#[derive(Args, Debug)]
pub struct ConcatArgs {
    /// Files to merge, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Add one chapter per merged file
    #[arg(long)]
    pub chapters: bool,

    /// Output container format (default: from the output's extension)
    #[arg(long)]
    pub format: Option<String>,

    /// Replace an existing output
    #[arg(long)]
    pub overwrite: bool,
}

/// Arguments for the keyframes command
#[derive(Args, Debug)]
pub struct KeyframesArgs {
    /// Input media file
    pub input: PathBuf,

    /// Time to look around (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(long)]
    pub at: String,

    /// Search window in seconds on each side
    #[arg(long)]
    pub window: Option<f64>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Input media file
    pub input: PathBuf,

    /// What to detect
    #[arg(long, value_parser = ["black", "silence", "scene"])]
    pub kind: String,

    /// Start of the scanned range
    #[arg(long)]
    pub from: Option<String>,

    /// End of the scanned range (default: end of the file)
    #[arg(long)]
    pub to: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// A parsed `--segment` value
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpec {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub name: String,
}

/// Parse `START-END[:NAME]`.
///
/// Times never contain `-`, so the first one separates the bounds. The end
/// is the longest prefix of the remainder that parses as a time; whatever
/// follows the next `:` is the name.
pub fn parse_segment_spec(spec: &str) -> SeamcutResult<SegmentSpec> {
    let invalid = || SeamcutError::InvalidTimeFormat {
        time: spec.to_string(),
    };
    let (start, rest) = spec.split_once('-').ok_or_else(invalid)?;
    let start = parse_bound(start)?;

    let (end, name) = if rest.trim().is_empty() {
        (None, "")
    } else if let Ok(end) = parse_time(rest) {
        (Some(end), "")
    } else {
        let split = rest
            .char_indices()
            .filter(|(_, c)| *c == ':')
            .map(|(i, _)| i)
            .rev()
            .find(|i| rest[..*i].trim().is_empty() || parse_time(&rest[..*i]).is_ok())
            .ok_or_else(invalid)?;
        (parse_bound(&rest[..split])?, &rest[split + 1..])
    };

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(SeamcutError::invalid_range(format!(
                "segment '{}' ends before it starts",
                spec
            )));
        }
    }

    Ok(SegmentSpec {
        start,
        end,
        name: name.trim().to_string(),
    })
}

fn parse_bound(value: &str) -> SeamcutResult<Option<f64>> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_time(value).map(Some)
    }
}

/// Parse `KEY=VALUE`
pub fn parse_tag(tag: &str) -> Option<(String, String)> {
    let (key, value) = tag.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment_spec() {
        assert_eq!(
            parse_segment_spec("10-20").unwrap(),
            SegmentSpec {
                start: Some(10.0),
                end: Some(20.0),
                name: String::new()
            }
        );

        let named = parse_segment_spec("00:01:30-00:02:00:Intro: part 1").unwrap();
        assert_eq!(named.start, Some(90.0));
        assert_eq!(named.end, Some(120.0));
        assert_eq!(named.name, "Intro: part 1");

        let open = parse_segment_spec("-1:30").unwrap();
        assert_eq!(open.start, None);
        assert_eq!(open.end, Some(90.0));

        let to_end = parse_segment_spec("10:00-").unwrap();
        assert_eq!(to_end.start, Some(600.0));
        assert_eq!(to_end.end, None);

        let unbounded_named = parse_segment_spec("5-:Outro").unwrap();
        assert_eq!(unbounded_named.end, None);
        assert_eq!(unbounded_named.name, "Outro");
    }

    #[test]
    fn test_parse_segment_spec_rejects() {
        assert!(parse_segment_spec("10").is_err());
        assert!(parse_segment_spec("abc-20").is_err());
        assert!(matches!(
            parse_segment_spec("20-10"),
            Err(SeamcutError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("title=My clip"),
            Some(("title".to_string(), "My clip".to_string()))
        );
        assert_eq!(parse_tag("novalue"), None);
        assert_eq!(parse_tag("=x"), None);
    }
}
