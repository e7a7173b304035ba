//! Chapter metadata resource in ffmetadata format

use std::io::Write;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::model::Chapter;
use crate::error::SeamcutResult;

/// Render chapters as an ffmetadata document with a millisecond timebase
pub fn render_ffmetadata(chapters: &[Chapter]) -> String {
    let mut out = String::from(";FFMETADATA1\n");
    for (i, chapter) in chapters.iter().enumerate() {
        let title = match chapter.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("Chapter {}", i + 1),
        };
        out.push_str("[CHAPTER]\n");
        out.push_str("TIMEBASE=1/1000\n");
        out.push_str(&format!("START={}\n", to_millis(chapter.start)));
        out.push_str(&format!("END={}\n", to_millis(chapter.end)));
        out.push_str(&format!("title={}\n", escape_value(&title)));
    }
    out
}

/// Write chapters to a temporary file that is deleted when dropped
pub fn write_chapter_file(chapters: &[Chapter]) -> SeamcutResult<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("seamcut-chapters-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(render_ffmetadata(chapters).as_bytes())?;
    file.flush()?;
    debug!(
        "Wrote {} chapter(s) to {}",
        chapters.len(),
        file.path().display()
    );
    Ok(file)
}

fn to_millis(seconds: f64) -> i64 {
    (seconds.max(0.0) * 1000.0).round() as i64
}

/// Escape `=`, `;`, `#`, `\` and newlines with a backslash
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_default_titles() {
        let chapters = vec![
            Chapter {
                start: 0.0,
                end: 12.3456,
                name: Some("Intro".to_string()),
            },
            Chapter {
                start: 12.3456,
                end: 30.0,
                name: None,
            },
        ];
        let rendered = render_ffmetadata(&chapters);
        assert_eq!(
            rendered,
            ";FFMETADATA1\n\
             [CHAPTER]\nTIMEBASE=1/1000\nSTART=0\nEND=12346\ntitle=Intro\n\
             [CHAPTER]\nTIMEBASE=1/1000\nSTART=12346\nEND=30000\ntitle=Chapter 2\n"
        );
    }

    #[test]
    fn test_escapes_special_characters() {
        assert_eq!(escape_value("a=b;c#d\\e"), "a\\=b\\;c\\#d\\\\e");
        assert_eq!(escape_value("two\nlines"), "two\\\nlines");
    }

    #[test]
    fn test_chapter_file_is_removed_on_drop() {
        let chapters = vec![Chapter {
            start: 0.0,
            end: 1.0,
            name: None,
        }];
        let file = write_chapter_file(&chapters).unwrap();
        let path = file.path().to_path_buf();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[CHAPTER]"));
        drop(file);
        assert!(!path.exists());
    }
}
