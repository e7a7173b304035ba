//! Output naming and concat list helpers

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::SeamcutResult;
use crate::utils::time::format_file_timestamp;

/// Output path for one segment:
/// `<out_dir>/<stem>-<HH.MM.SS.mmm>-<HH.MM.SS.mmm>[-<name>].<ext>`
pub fn segment_output_path(
    input: &Path,
    out_dir: &Path,
    start: f64,
    end: f64,
    name: &str,
    extension: &str,
) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let mut file_name = format!(
        "{}-{}-{}",
        stem,
        format_file_timestamp(start),
        format_file_timestamp(end)
    );
    let name = sanitize_file_name(name);
    if !name.is_empty() {
        file_name.push('-');
        file_name.push_str(&name);
    }
    file_name.push('.');
    file_name.push_str(extension);
    out_dir.join(file_name)
}

/// Replace characters that are unsafe in file names on common filesystems
pub fn sanitize_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Lowercased extension of `path`
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Muxer name for a file extension
pub fn format_for_extension(extension: &str) -> Option<&'static str> {
    let format = match extension.to_lowercase().as_str() {
        "mp4" | "m4v" => "mp4",
        "mov" => "mov",
        "m4a" => "ipod",
        "mkv" | "mka" => "matroska",
        "webm" => "webm",
        "ts" | "mts" | "m2ts" => "mpegts",
        "avi" => "avi",
        "flv" => "flv",
        "mp3" => "mp3",
        "ogg" | "ogv" | "oga" => "ogg",
        "wav" => "wav",
        "flac" => "flac",
        _ => return None,
    };
    Some(format)
}

/// Unique sibling of `output` for an intermediate file, e.g. smart-cut parts
pub fn temp_sibling(output: &Path, label: &str) -> PathBuf {
    let extension = extension_of(output).unwrap_or_else(|| "mkv".to_string());
    let file_name = format!(".seamcut-{}-{}.{}", Uuid::new_v4().simple(), label, extension);
    match output.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Concat demuxer list: one `file 'file:<absolute path>'` line per input
pub fn concat_list(paths: &[PathBuf]) -> SeamcutResult<String> {
    let mut list = String::new();
    for path in paths {
        let absolute = if path.is_absolute() {
            path.clone()
        } else {
            std::env::current_dir()?.join(path)
        };
        list.push_str(&format!(
            "file 'file:{}'\n",
            escape_concat_path(&absolute.to_string_lossy())
        ));
    }
    Ok(list)
}

/// Escape single quotes for the concat demuxer's quoting rules
pub fn escape_concat_path(path: &str) -> String {
    path.replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_output_path() {
        let path = segment_output_path(
            Path::new("/videos/talk.mp4"),
            Path::new("/out"),
            61.5,
            3725.25,
            "Q&A: part 1",
            "mp4",
        );
        assert_eq!(
            path,
            PathBuf::from("/out/talk-00.01.01.500-01.02.05.250-Q&A_ part 1.mp4")
        );
    }

    #[test]
    fn test_segment_output_path_without_name() {
        let path = segment_output_path(Path::new("clip.mkv"), Path::new("."), 0.0, 1.0, "  ", "mkv");
        assert_eq!(path, PathBuf::from("./clip-00.00.00.000-00.00.01.000.mkv"));
    }

    #[test]
    fn test_escape_concat_path() {
        assert_eq!(escape_concat_path("/a/it's/b.mp4"), "/a/it'\\''s/b.mp4");
    }

    #[test]
    fn test_concat_list_makes_paths_absolute() {
        let list = concat_list(&[PathBuf::from("/abs/one.mp4"), PathBuf::from("rel.mp4")]).unwrap();
        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines[0], "file 'file:/abs/one.mp4'");
        assert!(lines[1].starts_with("file 'file:/"));
        assert!(lines[1].ends_with("rel.mp4'"));
    }

    #[test]
    fn test_format_for_extension() {
        assert_eq!(format_for_extension("MKV"), Some("matroska"));
        assert_eq!(format_for_extension("mp4"), Some("mp4"));
        assert_eq!(format_for_extension("xyz"), None);
    }

    #[test]
    fn test_temp_sibling_stays_in_output_dir() {
        let a = temp_sibling(Path::new("/out/seg.mp4"), "copy");
        let b = temp_sibling(Path::new("/out/seg.mp4"), "copy");
        assert_eq!(a.parent(), Some(Path::new("/out")));
        assert!(a.to_string_lossy().ends_with("-copy.mp4"));
        assert_ne!(a, b);
    }
}
