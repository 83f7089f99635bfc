//! Merge stage: consolidate the quarterly fragment files into `master.tsv`

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::IndexError;
use crate::models::{parse_fragment_name, MergeMode, MergeSummary};

/// Name of the consolidated output inside the save directory
pub const MASTER_FILE_NAME: &str = "master.tsv";

/// Leading descriptive lines in every `master.idx` before the first record
pub const HEADER_LINES: usize = 11;

/// Append the data lines of every fragment in `save_dir` to `master.tsv`.
///
/// Fragments are processed in (year, quarter) order. Any read or write error
/// aborts the whole merge.
pub fn merge_index_files(save_dir: &Path, mode: MergeMode) -> Result<MergeSummary, IndexError> {
    let fragments = list_fragments(save_dir)?;
    let output = save_dir.join(MASTER_FILE_NAME);
    info!(
        "Merging {} fragment files into {} ({:?})",
        fragments.len(),
        output.display(),
        mode
    );

    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        MergeMode::Truncate => options.write(true).truncate(true),
        MergeMode::Append => options.append(true),
    };
    let master = options.open(&output).map_err(|source| IndexError::WriteOutput {
        path: output.clone(),
        source,
    })?;
    let mut writer = BufWriter::new(master);

    let mut lines = 0;
    for fragment in &fragments {
        let written = append_fragment(fragment, &mut writer).map_err(|e| match e {
            MergeIoError::Read(source) => IndexError::ReadFragment {
                path: fragment.clone(),
                source,
            },
            MergeIoError::Write(source) => IndexError::WriteOutput {
                path: output.clone(),
                source,
            },
        })?;
        debug!("Appended {} lines from {}", written, fragment.display());
        lines += written;
    }

    info!("Merged {} records into {}", lines, output.display());
    Ok(MergeSummary {
        output,
        fragments: fragments.len(),
        lines,
    })
}

/// Fragment files in `save_dir`, sorted by (year, quarter).
///
/// Anything not named like `2021-QTR1.tsv` is ignored, including `master.tsv`.
pub fn list_fragments(save_dir: &Path) -> Result<Vec<PathBuf>, IndexError> {
    let mut fragments = Vec::new();
    for entry in std::fs::read_dir(save_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(key) = name.to_str().and_then(parse_fragment_name) else {
            debug!("Skipping non-fragment entry: {}", entry.path().display());
            continue;
        };
        fragments.push((key, entry.path()));
    }
    fragments.sort_by_key(|(key, _)| *key);
    Ok(fragments.into_iter().map(|(_, path)| path).collect())
}

enum MergeIoError {
    Read(std::io::Error),
    Write(std::io::Error),
}

/// Copy every line after the header of `path` into `writer`, normalising the
/// terminator to `\n`. Bytes are passed through untouched otherwise.
fn append_fragment<W: Write>(path: &Path, writer: &mut W) -> Result<u64, MergeIoError> {
    let file = File::open(path).map_err(MergeIoError::Read)?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut index = 0usize;
    let mut written = 0u64;

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).map_err(MergeIoError::Read)?;
        if read == 0 {
            break;
        }
        index += 1;
        if index <= HEADER_LINES {
            continue;
        }

        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        writer.write_all(&line).map_err(MergeIoError::Write)?;
        writer.write_all(b"\n").map_err(MergeIoError::Write)?;
        written += 1;
    }

    writer.flush().map_err(MergeIoError::Write)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header() -> String {
        (1..=HEADER_LINES).map(|i| format!("Header line {}\n", i)).collect()
    }

    fn write_fragment(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), format!("{}{}", header(), body)).unwrap();
    }

    fn read_master(dir: &Path) -> String {
        std::fs::read_to_string(dir.join(MASTER_FILE_NAME)).unwrap()
    }

    #[test]
    fn test_header_is_stripped() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(temp_dir.path(), "2021-QTR1.tsv", "X\nY\n");

        let summary = merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();

        assert_eq!(read_master(temp_dir.path()), "X\nY\n");
        assert_eq!(summary.fragments, 1);
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.output, temp_dir.path().join(MASTER_FILE_NAME));
    }

    #[test]
    fn test_short_fragment_contributes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("2021-QTR1.tsv"), "a\nb\nc\n").unwrap();
        std::fs::write(temp_dir.path().join("2021-QTR2.tsv"), "").unwrap();

        let summary = merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();

        assert_eq!(summary.fragments, 2);
        assert_eq!(summary.lines, 0);
        assert_eq!(read_master(temp_dir.path()), "");
    }

    #[test]
    fn test_fragments_merge_in_year_quarter_order() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(temp_dir.path(), "2021-QTR1.tsv", "2021q1\n");
        write_fragment(temp_dir.path(), "2020-QTR4.tsv", "2020q4\n");
        write_fragment(temp_dir.path(), "2020-QTR1.tsv", "2020q1a\n2020q1b\n");
        write_fragment(temp_dir.path(), "999-QTR2.tsv", "0999q2\n");

        merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();

        assert_eq!(
            read_master(temp_dir.path()),
            "0999q2\n2020q1a\n2020q1b\n2020q4\n2021q1\n"
        );
    }

    #[test]
    fn test_negative_year_fragment_is_merged() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(temp_dir.path(), "2020-QTR1.tsv", "later\n");
        write_fragment(temp_dir.path(), "-5-QTR1.tsv", "earlier\n");

        let summary = merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();

        assert_eq!(summary.fragments, 2);
        assert_eq!(read_master(temp_dir.path()), "earlier\nlater\n");
    }

    #[test]
    fn test_non_fragment_files_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(temp_dir.path(), "2021-QTR1.tsv", "kept\n");
        write_fragment(temp_dir.path(), "notes.txt", "ignored\n");
        std::fs::create_dir(temp_dir.path().join("archive")).unwrap();

        let fragments = list_fragments(temp_dir.path()).unwrap();
        assert_eq!(fragments, vec![temp_dir.path().join("2021-QTR1.tsv")]);

        merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();
        assert_eq!(read_master(temp_dir.path()), "kept\n");
    }

    #[test]
    fn test_line_terminators_are_normalised() {
        let temp_dir = TempDir::new().unwrap();
        let body = "CIK|Company\r\n1000045|NICHOLAS FINANCIAL INC\r\nlast-without-newline";
        write_fragment(temp_dir.path(), "2021-QTR1.tsv", body);

        merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();

        assert_eq!(
            read_master(temp_dir.path()),
            "CIK|Company\n1000045|NICHOLAS FINANCIAL INC\nlast-without-newline\n"
        );
    }

    #[test]
    fn test_non_utf8_bytes_pass_through() {
        let temp_dir = TempDir::new().unwrap();
        let mut content = header().into_bytes();
        content.extend_from_slice(b"1|SOCI\xc9T\xc9 G\xc9N\xc9RALE|10-K\n");
        std::fs::write(temp_dir.path().join("2021-QTR1.tsv"), &content).unwrap();

        merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();

        let merged = std::fs::read(temp_dir.path().join(MASTER_FILE_NAME)).unwrap();
        assert_eq!(merged, b"1|SOCI\xc9T\xc9 G\xc9N\xc9RALE|10-K\n");
    }

    #[test]
    fn test_truncate_mode_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(temp_dir.path(), "2020-QTR1.tsv", "A\n");
        write_fragment(temp_dir.path(), "2020-QTR2.tsv", "B\n");

        merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();
        let first = read_master(temp_dir.path());
        merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();

        assert_eq!(read_master(temp_dir.path()), first);
        assert_eq!(first, "A\nB\n");
    }

    #[test]
    fn test_append_mode_duplicates_records() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(temp_dir.path(), "2020-QTR1.tsv", "A\n");

        merge_index_files(temp_dir.path(), MergeMode::Append).unwrap();
        merge_index_files(temp_dir.path(), MergeMode::Append).unwrap();

        assert_eq!(read_master(temp_dir.path()), "A\nA\n");
    }

    #[test]
    fn test_duplicate_records_across_fragments_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(temp_dir.path(), "2020-QTR1.tsv", "same\n");
        write_fragment(temp_dir.path(), "2020-QTR2.tsv", "same\n");

        merge_index_files(temp_dir.path(), MergeMode::Truncate).unwrap();

        assert_eq!(read_master(temp_dir.path()), "same\nsame\n");
    }

    #[test]
    fn test_unreadable_fragment_aborts_merge() {
        let temp_dir = TempDir::new().unwrap();
        write_fragment(temp_dir.path(), "2020-QTR1.tsv", "A\n");
        // A directory with a fragment name opens but cannot be read
        std::fs::create_dir(temp_dir.path().join("2020-QTR2.tsv")).unwrap();

        let result = merge_index_files(temp_dir.path(), MergeMode::Truncate);

        match result {
            Err(IndexError::ReadFragment { path, .. }) => {
                assert_eq!(path, temp_dir.path().join("2020-QTR2.tsv"));
            }
            other => panic!("expected ReadFragment error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = merge_index_files(&temp_dir.path().join("absent"), MergeMode::Truncate);
        assert!(matches!(result, Err(IndexError::Io(_))));
    }
}
