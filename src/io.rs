//! Reading trees and motif score tables, writing the score report.
//!
//! All inputs go through [`open_input`], which understands `-` for
//! standard input and transparently decompresses `.gz` files. When the
//! tree and the scores share one source (the combined-stdin convention),
//! the tree is the first non-blank line and every following line is a
//! score entry, so [`read_tree`] consumes only as much of the reader as
//! the tree needs.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{BblsError, BblsResult};
use crate::tree::MotifTree;

fn io_error_at(path: &Path, e: io::Error) -> BblsError {
    BblsError::Io(io::Error::new(e.kind(), format!("{}: {e}", path.display())))
}

/// Open a read source. `-` means standard input; a `.gz` suffix means the
/// file is read through gzip decompression.
pub fn open_input<P: AsRef<Path>>(path: P) -> BblsResult<Box<dyn BufRead>> {
    let p = path.as_ref();
    if p.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(p).map_err(|e| io_error_at(p, e))?;
    if p.to_string_lossy().ends_with(".gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Read the tree from the first non-blank line of `reader` and parse it.
/// The rest of the reader is left unread so a combined source can carry
/// the score table after the tree.
pub fn read_tree<R: BufRead>(reader: &mut R) -> BblsResult<MotifTree> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(BblsError::Format("tree input is empty".to_string()));
        }
        if !line.trim().is_empty() {
            return MotifTree::from_newick(line.trim());
        }
    }
}

/// Parse `<identifier> <score>` lines into a score table.
///
/// Blank lines are skipped. Anything else that does not parse as exactly
/// one identifier and one number fails the whole load; skipping a bad
/// line would silently desynchronize the table from the tree.
///
/// # Errors
/// [`BblsError::Format`] for malformed lines and duplicate identifiers,
/// [`BblsError::ScoreRange`] for scores outside [0, 1].
pub fn read_scores<R: BufRead>(reader: R) -> BblsResult<HashMap<String, f64>> {
    let mut scores = HashMap::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }
        let mut fields = entry.split_whitespace();
        let (Some(identifier), Some(value)) = (fields.next(), fields.next()) else {
            return Err(BblsError::Format(format!(
                "score line {}: expected '<identifier> <score>', got '{entry}'",
                index + 1
            )));
        };
        if fields.next().is_some() {
            return Err(BblsError::Format(format!(
                "score line {}: trailing fields after '{identifier} {value}'",
                index + 1
            )));
        }
        let score: f64 = value.parse().map_err(|_| {
            BblsError::Format(format!(
                "score line {}: '{value}' is not a number",
                index + 1
            ))
        })?;
        ensure_valid_score(identifier, score)?;
        if scores.insert(identifier.to_string(), score).is_some() {
            return Err(BblsError::Format(format!(
                "duplicate score entry for '{identifier}'"
            )));
        }
    }
    if scores.is_empty() {
        return Err(BblsError::Format("score input is empty".to_string()));
    }
    Ok(scores)
}

/// Scores are probabilities; anything outside [0, 1] (NaN included) is
/// rejected.
pub(crate) fn ensure_valid_score(identifier: &str, score: f64) -> BblsResult<()> {
    if !(0.0..=1.0).contains(&score) {
        return Err(BblsError::ScoreRange {
            identifier: identifier.to_string(),
            score,
        });
    }
    Ok(())
}

/// Load a tree and a score table from a pair of sources. When both name
/// the same source it is opened once and the tree line is read first.
pub fn load_tree_and_scores(
    tree_path: &str,
    scores_path: &str,
) -> BblsResult<(MotifTree, HashMap<String, f64>)> {
    if tree_path == scores_path {
        let mut input = open_input(tree_path)?;
        let tree = read_tree(&mut input)?;
        let scores = read_scores(input)?;
        return Ok((tree, scores));
    }
    let mut tree_input = open_input(tree_path)?;
    let tree = read_tree(&mut tree_input)?;
    let scores = read_scores(open_input(scores_path)?)?;
    Ok((tree, scores))
}

/// Write the two-line score report.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the report is written to stdout (uncompressed).
pub fn write_report<P: AsRef<Path>>(path: P, bbls: f64, bls: f64) -> BblsResult<()> {
    let p = path.as_ref();
    if p.as_os_str() == "-" {
        let mut out = io::stdout().lock();
        report_to(&mut out, bbls, bls)?;
        return Ok(());
    }

    let file = File::create(p).map_err(|e| io_error_at(p, e))?;
    let mut out: Box<dyn Write> = if p.to_string_lossy().ends_with(".gz") {
        Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
    } else {
        Box::new(BufWriter::new(file))
    };
    report_to(&mut out, bbls, bls)?;
    out.flush().map_err(|e| io_error_at(p, e))?;
    Ok(())
}

fn report_to<W: Write + ?Sized>(out: &mut W, bbls: f64, bls: f64) -> io::Result<()> {
    writeln!(out, "BBLS: {bbls}")?;
    writeln!(out, "BLS: {bls}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{Cursor, Read};

    const COMBINED: &str =
        "(((aa:1,bb:3)z:10,cc:5)y:100,dd:7)R:0;\naa 0.5\nbb 0.5\ncc 0.5\ndd 0.5\n";

    #[test]
    fn combined_reader_yields_tree_then_scores() {
        let mut reader = Cursor::new(COMBINED);
        let tree = read_tree(&mut reader).unwrap();
        assert_eq!(tree.num_leaves(), 4);

        let scores = read_scores(reader).unwrap();
        assert_eq!(scores.len(), 4);
        assert_eq!(scores["aa"], 0.5);
    }

    #[test]
    fn blank_lines_before_the_tree_are_skipped() {
        let mut reader = Cursor::new("\n\n(aa:1,bb:2)r;\n");
        let tree = read_tree(&mut reader).unwrap();
        assert_eq!(tree.num_leaves(), 2);
    }

    #[test]
    fn empty_tree_input_is_rejected() {
        let err = read_tree(&mut Cursor::new("")).unwrap_err();
        assert!(matches!(err, BblsError::Format(_)), "got {err:?}");
    }

    #[test]
    fn blank_score_lines_are_skipped() {
        let scores = read_scores(Cursor::new("aa 0.5\n\n  \nbb 1\n")).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores["bb"], 1.0);
    }

    #[test]
    fn score_line_without_a_value_is_rejected() {
        let err = read_scores(Cursor::new("aa\n")).unwrap_err();
        assert!(matches!(err, BblsError::Format(_)), "got {err:?}");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn unparsable_score_fails_the_whole_load() {
        let err = read_scores(Cursor::new("aa 0.5\nbb x\n")).unwrap_err();
        assert!(matches!(err, BblsError::Format(_)), "got {err:?}");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn trailing_fields_are_rejected() {
        let err = read_scores(Cursor::new("aa 0.5 extra\n")).unwrap_err();
        assert!(matches!(err, BblsError::Format(_)), "got {err:?}");
    }

    #[test]
    fn out_of_range_score_is_a_range_error() {
        let err = read_scores(Cursor::new("aa 1.5\n")).unwrap_err();
        assert!(matches!(err, BblsError::ScoreRange { .. }), "got {err:?}");
        assert!(err.to_string().contains("aa"));

        let err = read_scores(Cursor::new("aa -0.1\n")).unwrap_err();
        assert!(matches!(err, BblsError::ScoreRange { .. }), "got {err:?}");
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        let err = read_scores(Cursor::new("aa 0.5\naa 0.6\n")).unwrap_err();
        assert!(matches!(err, BblsError::Format(_)), "got {err:?}");
        assert!(err.to_string().contains("aa"));
    }

    #[test]
    fn empty_score_input_is_rejected() {
        let err = read_scores(Cursor::new("\n\n")).unwrap_err();
        assert!(matches!(err, BblsError::Format(_)), "got {err:?}");
    }

    #[test]
    fn missing_input_file_names_the_path() {
        // The boxed reader has no Debug impl; discard it before unwrapping.
        let err = open_input("definitely/not/here.txt").map(|_| ()).unwrap_err();
        assert!(matches!(err, BblsError::Io(_)), "got {err:?}");
        assert!(err.to_string().contains("definitely/not/here.txt"));
    }

    #[test]
    fn gzipped_input_is_read_transparently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.txt.gz");
        let file = fs::File::create(&path).unwrap();
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(b"aa 0.25\nbb 0.75\n").unwrap();
        enc.finish().unwrap();

        let reader = open_input(&path).unwrap();
        let scores = read_scores(reader).unwrap();
        assert_eq!(scores["aa"], 0.25);
        assert_eq!(scores["bb"], 0.75);
    }

    #[test]
    fn equal_paths_load_a_combined_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.txt");
        fs::write(&path, COMBINED).unwrap();

        let path = path.to_string_lossy();
        let (tree, scores) = load_tree_and_scores(&path, &path).unwrap();
        assert_eq!(tree.num_leaves(), 4);
        assert_eq!(scores.len(), 4);
    }

    #[test]
    fn distinct_paths_load_separately() {
        let dir = tempfile::tempdir().unwrap();
        let tree_path = dir.path().join("tree.nwk");
        let scores_path = dir.path().join("scores.txt");
        fs::write(&tree_path, "(aa:1,bb:2)r;\n").unwrap();
        fs::write(&scores_path, "aa 0.5\nbb 0.25\n").unwrap();

        let (tree, scores) = load_tree_and_scores(
            &tree_path.to_string_lossy(),
            &scores_path.to_string_lossy(),
        )
        .unwrap();
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(scores["bb"], 0.25);
    }

    #[test]
    fn report_is_two_labeled_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        write_report(&path, 56.375, 126.0).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "BBLS: 56.375\nBLS: 126\n"
        );
    }

    #[test]
    fn gzipped_report_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt.gz");
        write_report(&path, 1.5, 3.0).unwrap();

        let mut text = String::new();
        GzDecoder::new(fs::File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "BBLS: 1.5\nBLS: 3\n");
    }
}
