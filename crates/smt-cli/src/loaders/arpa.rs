use std::f64::consts::LN_10;
use std::io::BufRead;

use smt_core::lm::NgramLm;
use smt_core::{Vocabulary, WordId};

use super::ReadError;

const UNK: &str = "<unk>";

enum Section {
    Preamble,
    Data,
    Ngrams(usize),
    End,
}

/// Reads an ARPA back-off model. Log10 values in the file become natural
/// logs; an `<unk>` unigram sets the score of unknown words.
pub fn read_arpa<R: BufRead>(reader: R, vocab: &Vocabulary) -> Result<NgramLm, ReadError> {
    let mut section = Section::Preamble;
    let mut declared: Vec<(usize, usize)> = Vec::new();
    let mut ngrams: Vec<(Vec<WordId>, f64, f64)> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut unk = None;

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "\\data\\" {
            section = Section::Data;
            continue;
        }
        if line == "\\end\\" {
            section = Section::End;
            break;
        }
        if let Some(n) = line
            .strip_prefix('\\')
            .and_then(|s| s.strip_suffix("-grams:"))
        {
            let n: usize = n
                .parse()
                .map_err(|_| ReadError::parse(line_no, format!("bad section header {line:?}")))?;
            if n == 0 {
                return Err(ReadError::parse(line_no, "0-gram section"));
            }
            section = Section::Ngrams(n);
            continue;
        }
        match section {
            Section::Preamble | Section::End => {}
            Section::Data => {
                let Some(rest) = line.strip_prefix("ngram ") else {
                    return Err(ReadError::parse(line_no, format!("unexpected {line:?} in \\data\\")));
                };
                let parsed = rest
                    .split_once('=')
                    .and_then(|(n, c)| Some((n.trim().parse().ok()?, c.trim().parse().ok()?)));
                let Some(entry) = parsed else {
                    return Err(ReadError::parse(line_no, format!("bad count line {line:?}")));
                };
                declared.push(entry);
            }
            Section::Ngrams(n) => {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() != n + 1 && fields.len() != n + 2 {
                    return Err(ReadError::parse(
                        line_no,
                        format!("{n}-gram line with {} fields", fields.len()),
                    ));
                }
                let number = |s: &str| {
                    s.parse::<f64>()
                        .map_err(|_| ReadError::parse(line_no, format!("bad number {s:?}")))
                };
                let log_prob = number(fields[0])? * LN_10;
                let backoff = match fields.get(n + 1) {
                    Some(b) => number(b)? * LN_10,
                    None => 0.0,
                };
                let words = &fields[1..=n];
                if n == 1 && words[0] == UNK {
                    unk = Some(log_prob);
                }
                if counts.len() < n {
                    counts.resize(n, 0);
                }
                counts[n - 1] += 1;
                ngrams.push((vocab.add_all(words), log_prob, backoff));
            }
        }
    }

    if !matches!(section, Section::End) {
        return Err(ReadError::parse(0, "missing \\end\\ marker"));
    }
    for &(n, expected) in &declared {
        let got = n.checked_sub(1).and_then(|k| counts.get(k)).copied().unwrap_or(0);
        if got != expected {
            return Err(ReadError::parse(
                0,
                format!("header declares {expected} {n}-grams, file has {got}"),
            ));
        }
    }

    let order = declared.iter().map(|&(n, _)| n).max().unwrap_or(counts.len());
    let mut lm = NgramLm::new(order);
    if let Some(log_prob) = unk {
        lm = lm.with_unknown_log_prob(log_prob);
    }
    for (words, log_prob, backoff) in &ngrams {
        lm.insert(words, *log_prob, *backoff);
    }
    Ok(lm)
}
