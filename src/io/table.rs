// SPDX-License-Identifier: AGPL-3.0-or-later
//! Count-table CSV reader for R-exported pseudo-text data.
//!
//! Streams from disk via `BufReader` — the file is never loaded into
//! memory. Gzip-compressed tables are detected by magic bytes and
//! decompressed transparently.
//!
//! Format (one file per bag, as exported by the R preprocessing):
//! ```text
//! "","fragment_119.0857","fragment_129.0653",...     header: term names
//! "301.1435_652.98",0,3,...                          rows: doc key, counts
//! ```
//!
//! [`load_bags`] merges one file per bag over a shared document-key set
//! into a single [`Corpus`] with a bag-tagged [`Vocabulary`].

use crate::error::{Error, Result};
use crate::lda::corpus::{Corpus, Term, Vocabulary};
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One parsed per-bag count table.
#[derive(Debug, Clone)]
pub struct CountTable {
    /// Term names from the header, in column order.
    pub terms: Vec<String>,
    /// Document keys, in row order.
    pub doc_keys: Vec<String>,
    /// Count rows, one per document, width `terms.len()`.
    pub rows: Vec<Vec<u32>>,
}

/// Parse a count table from any buffered reader.
///
/// `source` labels error messages (usually the file name).
///
/// # Errors
///
/// [`Error::Table`] on an empty table, ragged row, or non-integer count.
pub fn parse_count_table<R: BufRead>(reader: R, source: &str) -> Result<CountTable> {
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line.map_err(|e| Error::Table(format!("{source}: {e}")))?,
        None => return Err(Error::Table(format!("{source}: empty table"))),
    };
    let mut fields = split_fields(&header);
    if fields.len() < 2 {
        return Err(Error::Table(format!(
            "{source}: header needs a key column and at least one term"
        )));
    }
    // First header cell is the unnamed key column.
    fields.remove(0);
    let terms = fields;

    let mut doc_keys = Vec::new();
    let mut rows = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let line = line.map_err(|e| Error::Table(format!("{source}: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_fields(&line);
        if fields.len() != terms.len() + 1 {
            return Err(Error::Table(format!(
                "{source}: row {} has {} fields, expected {}",
                line_no + 2,
                fields.len(),
                terms.len() + 1
            )));
        }
        let mut row = Vec::with_capacity(terms.len());
        for field in &fields[1..] {
            row.push(parse_count(field).ok_or_else(|| {
                Error::Table(format!(
                    "{source}: row {} has non-count value '{field}'",
                    line_no + 2
                ))
            })?);
        }
        doc_keys.push(fields[0].clone());
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(Error::Table(format!("{source}: no document rows")));
    }
    Ok(CountTable { terms, doc_keys, rows })
}

/// Read a count table from a file, decompressing gzip when present.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be opened or read; [`Error::Table`]
/// on malformed content.
pub fn read_count_table(path: &Path) -> Result<CountTable> {
    let file = File::open(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut buffered = BufReader::new(file);
    let magic = buffered.fill_buf().map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let gzipped = magic.len() >= 2 && magic[0] == 0x1f && magic[1] == 0x8b;

    let label = path.display().to_string();
    if gzipped {
        parse_count_table(BufReader::new(GzDecoder::new(buffered)), &label)
    } else {
        parse_count_table(buffered, &label)
    }
}

/// Load one count table per bag and merge them into a corpus.
///
/// The first file fixes the document order; every other file must cover
/// exactly the same key set. Terms keep their file's column order and are
/// tagged with the file's position as bag index.
///
/// # Errors
///
/// [`Error::Table`] if no paths are given or the files disagree on
/// document keys, plus any per-file read/parse error.
pub fn load_bags<P: AsRef<Path>>(paths: &[P]) -> Result<(Corpus, Vocabulary)> {
    if paths.is_empty() {
        return Err(Error::Table("no bag files given".into()));
    }

    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        tables.push(read_count_table(path.as_ref())?);
    }

    let doc_keys = tables[0].doc_keys.clone();
    let key_index: HashMap<&str, usize> = doc_keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i))
        .collect();
    if key_index.len() != doc_keys.len() {
        return Err(Error::Table(format!(
            "{}: duplicate document keys",
            paths[0].as_ref().display()
        )));
    }

    let mut terms: Vec<Term> = Vec::new();
    let mut rows: Vec<Vec<u32>> = vec![Vec::new(); doc_keys.len()];
    for (bag, (path, table)) in paths.iter().zip(tables).enumerate() {
        let path = path.as_ref();
        if table.doc_keys.len() != doc_keys.len() {
            return Err(Error::Table(format!(
                "{}: {} documents, expected {}",
                path.display(),
                table.doc_keys.len(),
                doc_keys.len()
            )));
        }
        for name in table.terms {
            terms.push(Term { name, bag });
        }
        for (key, row) in table.doc_keys.iter().zip(table.rows) {
            let Some(&d) = key_index.get(key.as_str()) else {
                return Err(Error::Table(format!(
                    "{}: unknown document key '{key}'",
                    path.display()
                )));
            };
            rows[d].extend(row);
        }
    }

    let vocab = Vocabulary::new(terms);
    let width = vocab.len();
    if rows.iter().any(|r| r.len() != width) {
        // A key missing from a later bag leaves its row short.
        return Err(Error::Table("bag files disagree on document keys".into()));
    }
    Ok((Corpus::from_rows(doc_keys, rows), vocab))
}

/// Split one CSV line, honoring double-quoted fields.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.trim_end_matches(['\r', '\n']).chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse a non-negative integer count, tolerating R's `3` / `3.0` forms.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_count(field: &str) -> Option<u32> {
    let trimmed = field.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return Some(n);
    }
    let x = trimmed.parse::<f64>().ok()?;
    if x >= 0.0 && x.fract() == 0.0 && x <= f64::from(u32::MAX) {
        Some(x as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FRAGMENTS: &str = "\"\",\"frag_a\",\"frag_b\"\n\"doc1\",2,0\n\"doc2\",1,3\n";
    const LOSSES: &str = "\"\",\"loss_a\"\n\"doc1\",4\n\"doc2\",0\n";

    fn parse(text: &str) -> CountTable {
        parse_count_table(Cursor::new(text), "test").unwrap()
    }

    #[test]
    fn parses_header_and_rows() {
        let table = parse(FRAGMENTS);
        assert_eq!(table.terms, vec!["frag_a", "frag_b"]);
        assert_eq!(table.doc_keys, vec!["doc1", "doc2"]);
        assert_eq!(table.rows, vec![vec![2, 0], vec![1, 3]]);
    }

    #[test]
    fn tolerates_float_counts_and_blank_lines() {
        let table = parse("\"\",\"a\"\n\"d1\",2.0\n\n\"d2\",0\n");
        assert_eq!(table.rows, vec![vec![2], vec![0]]);
    }

    #[test]
    fn quoted_comma_stays_in_field() {
        let table = parse("\"\",\"a,b\"\n\"d1\",1\n");
        assert_eq!(table.terms, vec!["a,b"]);
    }

    #[test]
    fn ragged_row_rejected() {
        let err = parse_count_table(Cursor::new("\"\",\"a\",\"b\"\n\"d1\",1\n"), "test").unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn non_count_rejected() {
        for bad in ["\"\",\"a\"\n\"d1\",-1\n", "\"\",\"a\"\n\"d1\",1.5\n", "\"\",\"a\"\n\"d1\",x\n"] {
            assert!(parse_count_table(Cursor::new(bad), "test").is_err(), "{bad}");
        }
    }

    #[test]
    fn empty_inputs_rejected() {
        assert!(parse_count_table(Cursor::new(""), "test").is_err());
        assert!(parse_count_table(Cursor::new("\"\",\"a\"\n"), "test").is_err());
    }

    #[test]
    fn merges_two_bags() {
        let dir = tempfile::tempdir().unwrap();
        let frag = dir.path().join("fragments.csv");
        let loss = dir.path().join("losses.csv");
        std::fs::write(&frag, FRAGMENTS).unwrap();
        std::fs::write(&loss, LOSSES).unwrap();

        let (corpus, vocab) = load_bags(&[&frag, &loss]).unwrap();
        assert_eq!(corpus.n_docs(), 2);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.n_bags(), 2);
        assert_eq!(vocab.bag_of(0), 0);
        assert_eq!(vocab.bag_of(2), 1);
        assert_eq!(corpus.counts(0), &[2, 0, 4]);
        assert_eq!(corpus.counts(1), &[1, 3, 0]);
    }

    #[test]
    fn merge_reorders_rows_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let frag = dir.path().join("fragments.csv");
        let loss = dir.path().join("losses.csv");
        std::fs::write(&frag, FRAGMENTS).unwrap();
        // Same keys, reversed row order.
        std::fs::write(&loss, "\"\",\"loss_a\"\n\"doc2\",7\n\"doc1\",4\n").unwrap();

        let (corpus, _) = load_bags(&[&frag, &loss]).unwrap();
        assert_eq!(corpus.key(0), "doc1");
        assert_eq!(corpus.counts(0), &[2, 0, 4]);
        assert_eq!(corpus.counts(1), &[1, 3, 7]);
    }

    #[test]
    fn mismatched_keys_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let frag = dir.path().join("fragments.csv");
        let loss = dir.path().join("losses.csv");
        std::fs::write(&frag, FRAGMENTS).unwrap();
        std::fs::write(&loss, "\"\",\"loss_a\"\n\"doc1\",4\n\"docX\",0\n").unwrap();
        assert!(load_bags(&[&frag, &loss]).is_err());
    }

    #[test]
    fn gzip_round_trip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write as _;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fragments.csv.gz");
        let mut enc = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        enc.write_all(FRAGMENTS.as_bytes()).unwrap();
        enc.finish().unwrap();

        let table = read_count_table(&path).unwrap();
        assert_eq!(table.rows, vec![vec![2, 0], vec![1, 3]]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_count_table(Path::new("/nonexistent/table.csv")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
