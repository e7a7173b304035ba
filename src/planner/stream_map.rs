//! Input stream to output stream index translation
//!
//! Streams are mapped to the output in file-then-stream copy order, so the
//! output index of a stream is the number of streams copied from earlier
//! files plus its position within its own file's copy list.

use std::path::Path;

use crate::planner::CopyFile;

/// Output index of `(file, stream)` for the given copy order.
///
/// Returns `None` when the file or the stream is not (or no longer) part of
/// the copy list.
pub fn output_stream_index(copy_files: &[CopyFile], file: &Path, stream: usize) -> Option<usize> {
    let file_position = copy_files.iter().position(|f| f.path == file)?;
    let preceding: usize = copy_files[..file_position]
        .iter()
        .map(|f| f.streams.len())
        .sum();
    let within = copy_files[file_position]
        .streams
        .iter()
        .position(|s| *s == stream)?;
    Some(preceding + within)
}

/// Total number of output streams
pub fn output_stream_count(copy_files: &[CopyFile]) -> usize {
    copy_files.iter().map(|f| f.streams.len()).sum()
}
