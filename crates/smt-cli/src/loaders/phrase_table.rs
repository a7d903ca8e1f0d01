use std::io::BufRead;

use smt_core::logprob::LOG_ALMOST_0;
use smt_core::model::{MemoryPhraseTable, TmEntry};
use smt_core::Vocabulary;

use super::ReadError;

/// How the probability column of a phrase table is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Leading probabilities read as backward scores; the rest are forward.
    pub backward: usize,
    /// Store both sides reversed, for right-to-left decoding.
    pub reverse: bool,
}

fn shielded_ln(p: f64) -> f64 {
    if p <= 0.0 {
        LOG_ALMOST_0
    } else {
        p.ln()
    }
}

fn parse_probs(field: &str, line: usize) -> Result<Vec<f64>, ReadError> {
    field
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map(shielded_ln)
                .map_err(|_| ReadError::parse(line, format!("bad probability {tok:?}")))
        })
        .collect()
}

/// Reads `source ||| target ||| probs [a= adir...]` lines.
///
/// Probabilities are plain (not log) values. The first `layout.backward`
/// are p(source | target), any remaining ones p(target | source). The
/// optional `a=` group holds adirectional values. Blank lines are skipped.
pub fn read_phrase_table<R: BufRead>(
    reader: R,
    vocab: &Vocabulary,
    layout: &TableLayout,
) -> Result<MemoryPhraseTable, ReadError> {
    let mut table = MemoryPhraseTable::new();
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split("|||").collect();
        if fields.len() != 3 {
            return Err(ReadError::parse(line_no, "expected 3 fields separated by |||"));
        }
        let mut source: Vec<&str> = fields[0].split_whitespace().collect();
        let mut target: Vec<&str> = fields[1].split_whitespace().collect();
        if source.is_empty() {
            return Err(ReadError::parse(line_no, "empty source phrase"));
        }
        if layout.reverse {
            source.reverse();
            target.reverse();
        }

        let (probs, adir) = match fields[2].split_once("a=") {
            Some((probs, adir)) => (probs, adir),
            None => (fields[2], ""),
        };
        let mut backward = parse_probs(probs, line_no)?;
        if backward.len() < layout.backward {
            return Err(ReadError::parse(
                line_no,
                format!("{} probabilities, need at least {}", backward.len(), layout.backward),
            ));
        }
        let forward = backward.split_off(layout.backward);
        let entry = TmEntry {
            target: vocab.add_all(&target),
            backward,
            forward,
            adir: parse_probs(adir, line_no)?,
        };
        table
            .insert(&source, entry)
            .map_err(|e| ReadError::parse(line_no, e.to_string()))?;
    }
    Ok(table)
}
