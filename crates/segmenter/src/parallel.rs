//! Parallel segmentation of files over line-aligned byte ranges.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use rayon::prelude::*;
use tempfile::NamedTempFile;

use bpeel_core::{Mode, Result, SegmentError};

use crate::segmenter::Segmenter;

/// Segments the file at `path` across `workers` ranges.
///
/// The file is cut into byte ranges aligned on line boundaries, one per
/// worker. Each worker runs a [`fork`] of `segmenter` over its range
/// into a private temporary file; the temporaries are then concatenated
/// into `output` in range order, so the output is line for line the
/// same as a sequential run. Under seeded dropout each worker draws
/// from its own derived stream, making the output depend on the worker
/// count.
///
/// [`fork`]: Segmenter::fork
///
/// # Panics
///
/// Panics if `workers` is zero.
pub fn segment_file<M: Mode, W: Write>(
    segmenter: &Segmenter<M>,
    path: &Path,
    output: &mut W,
    workers: usize,
) -> Result<()> {
    assert!(workers > 0, "worker count must be positive");

    let offsets = compute_offsets(path, workers)?;
    let ranges: Vec<(usize, u64, u64)> = (0..workers)
        .map(|i| (i, offsets[i], offsets[i + 1]))
        .collect();

    let parts = ranges
        .into_par_iter()
        .map(|(index, begin, end)| run_range(segmenter, index, path, begin, end))
        .collect::<Result<Vec<NamedTempFile>>>()?;

    for mut part in parts {
        part.as_file_mut().seek(SeekFrom::Start(0))?;
        io::copy(part.as_file_mut(), output)?;
    }
    output.flush()?;
    Ok(())
}

/// Byte offsets cutting `path` into `workers` line-aligned ranges.
///
/// Returns `workers + 1` ascending offsets; each interior offset is the
/// start of a line. Ranges may be empty when lines are long relative to
/// the file.
fn compute_offsets(path: &Path, workers: usize) -> Result<Vec<u64>> {
    let file = File::open(path).map_err(|err| SegmentError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    let size = file
        .metadata()
        .map_err(|err| SegmentError::Io {
            path: path.to_path_buf(),
            err,
        })?
        .len();
    let mut reader = BufReader::new(file);

    let chunk = size / workers as u64;
    let mut offsets = Vec::with_capacity(workers + 1);
    offsets.push(0);
    let mut scratch = Vec::new();
    for i in 1..workers {
        let target = chunk * i as u64;
        reader.seek(SeekFrom::Start(target))?;
        scratch.clear();
        let skipped = reader.read_until(b'\n', &mut scratch)?;
        offsets.push(target + skipped as u64);
    }
    offsets.push(size);
    log::debug!("cut {} into ranges at {:?}", path.display(), offsets);
    Ok(offsets)
}

/// Segments the lines of one range into a fresh temporary file.
///
/// Reading starts at `begin`, which must be a line start, and stops
/// after the line that ends at or before `end`; a line straddling `end`
/// belongs to this range.
fn run_range<M: Mode>(
    segmenter: &Segmenter<M>,
    index: usize,
    path: &Path,
    begin: u64,
    end: u64,
) -> Result<NamedTempFile> {
    let mut worker = segmenter.fork(index as u64);
    let file = File::open(path).map_err(|err| SegmentError::Io {
        path: path.to_path_buf(),
        err,
    })?;
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(begin))?;

    let mut part = NamedTempFile::new()?;
    let mut writer = io::BufWriter::new(part.as_file_mut());
    let mut pos = begin;
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        pos += n as u64;
        if pos > end {
            break;
        }
        let segmented = worker.segment_line(&line)?;
        writer.write_all(&segmented)?;
    }
    writer.flush()?;
    drop(writer);
    Ok(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpeel_core::{MergeTable, TextMode, Version, WordEncoder};
    use compact_str::CompactString;

    fn s(text: &str) -> CompactString {
        CompactString::from(text)
    }

    fn segmenter() -> Segmenter<TextMode> {
        let rules = [("i", "r"), ("o", "n</w>"), ("c", "e"), ("ce", "m")]
            .map(|(l, r)| (s(l), s(r)));
        let table = MergeTable::from_pairs(rules, Version::V0_2);
        Segmenter::new(WordEncoder::new(table, s("@@")))
    }

    fn corpus() -> Vec<u8> {
        let mut text = Vec::new();
        for i in 0..23 {
            match i % 5 {
                0 => text.extend_from_slice(b"iron cement iron\n"),
                1 => text.extend_from_slice(b"  iron cement  \n"),
                2 => text.extend_from_slice(b"\n"),
                3 => text.extend_from_slice(b"a  b ceme\n"),
                _ => text.extend_from_slice(b"cem iron\n"),
            }
        }
        text
    }

    fn write_corpus(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_offsets_are_line_starts() {
        let file = write_corpus(&corpus());
        let data = corpus();
        let offsets = compute_offsets(file.path(), 4).unwrap();
        assert_eq!(offsets.len(), 5);
        assert_eq!(offsets[0], 0);
        assert_eq!(*offsets.last().unwrap(), data.len() as u64);
        for window in offsets.windows(2) {
            assert!(window[0] <= window[1]);
        }
        for &offset in &offsets[1..offsets.len() - 1] {
            assert_eq!(data[offset as usize - 1], b'\n');
        }
    }

    #[test]
    fn test_parallel_output_matches_sequential() {
        let file = write_corpus(&corpus());
        let mut expected = Vec::new();
        segmenter()
            .segment_stream(&corpus()[..], &mut expected)
            .unwrap();

        for workers in [1, 2, 4] {
            let mut out = Vec::new();
            segment_file(&segmenter(), file.path(), &mut out, workers).unwrap();
            assert_eq!(
                out, expected,
                "output diverged with {} workers",
                workers
            );
        }
    }

    #[test]
    fn test_more_workers_than_lines() {
        let file = write_corpus(b"iron\ncem\n");
        let mut out = Vec::new();
        segment_file(&segmenter(), file.path(), &mut out, 8).unwrap();
        assert_eq!(out, b"ir@@ on\nce@@ m\n");
    }

    #[test]
    fn test_file_without_final_newline() {
        let file = write_corpus(b"iron\ncem");
        let mut out = Vec::new();
        segment_file(&segmenter(), file.path(), &mut out, 3).unwrap();
        assert_eq!(out, b"ir@@ on\nce@@ m");
    }

    #[test]
    fn test_empty_file() {
        let file = write_corpus(b"");
        let mut out = Vec::new();
        segment_file(&segmenter(), file.path(), &mut out, 4).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_seeded_parallel_run_is_reproducible() {
        let file = write_corpus(&corpus());
        let mut first = Vec::new();
        let mut second = Vec::new();
        let seg = segmenter();
        segment_file(&seg.clone().with_dropout(0.5, Some(3)), file.path(), &mut first, 4)
            .unwrap();
        segment_file(&seg.with_dropout(0.5, Some(3)), file.path(), &mut second, 4)
            .unwrap();
        assert_eq!(first, second);
    }
}
