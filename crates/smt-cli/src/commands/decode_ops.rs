use std::io::{self, BufRead, BufWriter, Write};
use std::sync::Arc;

use serde::Serialize;
use smt_core::{translate, DecodeError, ModelGenerator, SourceSentence, Translation};
use smt_engine::BatchTranslator;

use super::die;
use crate::loaders::{load_generator, ModelPaths};
use crate::markup::parse_line;

#[derive(Debug, Serialize)]
struct JsonLine<'a> {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<&'a Translation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Outcome for one input line; markup errors are reported like decode
/// errors.
type LineResult = Result<Translation, String>;

fn decode_lines(gen: Arc<ModelGenerator>, lines: &[String], threads: usize) -> Vec<LineResult> {
    let parsed: Vec<Result<SourceSentence, String>> = lines
        .iter()
        .map(|l| parse_line(l).map_err(|e| format!("markup: {e}")))
        .collect();

    if threads <= 1 {
        return parsed
            .into_iter()
            .map(|p| translate(&gen, &p?).map_err(|e| e.to_string()))
            .collect();
    }

    // failed lines still take a slot so results stay aligned
    let sentences = parsed
        .iter()
        .map(|p| p.as_ref().cloned().unwrap_or_default())
        .collect();
    let batch = die!(BatchTranslator::new(gen, threads), "Error starting workers: {}");
    let decoded: Vec<Result<Translation, DecodeError>> =
        die!(batch.translate_all(sentences), "Error: {}");

    parsed
        .into_iter()
        .zip(decoded)
        .map(|(p, d)| {
            p?;
            d.map_err(|e| e.to_string())
        })
        .collect()
}

/// Decodes stdin line by line. A line that fails prints as an empty line
/// (or a JSON error object) and the rest carry on.
pub fn decode_cmd(paths: &ModelPaths, json: bool, threads: usize) {
    let gen = Arc::new(die!(load_generator(paths), "Error loading models: {}"));
    let stdin = io::stdin();
    let lines: Vec<String> = die!(
        stdin.lock().lines().collect::<Result<Vec<_>, _>>(),
        "Error reading input: {}"
    );

    let results = decode_lines(gen, &lines, threads);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut failures = 0;
    for (i, result) in results.iter().enumerate() {
        if let Err(e) = result {
            eprintln!("line {}: {e}", i + 1);
            failures += 1;
        }
        let written = if json {
            let record = JsonLine {
                line: i + 1,
                translation: result.as_ref().ok(),
                error: result.as_ref().err().cloned(),
            };
            serde_json::to_string(&record)
                .map_err(io::Error::from)
                .and_then(|s| writeln!(out, "{s}"))
        } else {
            match result {
                Ok(t) => writeln!(out, "{}", t.text()),
                Err(_) => writeln!(out),
            }
        };
        die!(written, "Error writing output: {}");
    }
    die!(out.flush(), "Error writing output: {}");
    if failures > 0 {
        eprintln!("{failures} of {} lines failed", lines.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smt_core::model::{MemoryPhraseTable, TmEntry};
    use smt_core::{DecoderConfig, Vocabulary};

    fn generator() -> Arc<ModelGenerator> {
        let vocab = Arc::new(Vocabulary::new());
        let mut table = MemoryPhraseTable::with_score_counts(1, 0, 0);
        for (src, tgt) in [("the", "le"), ("cat", "chat")] {
            let entry = TmEntry {
                target: vec![vocab.add(tgt)],
                backward: vec![-0.1],
                forward: Vec::new(),
                adir: Vec::new(),
            };
            table.insert(&[src], entry).unwrap();
        }
        let mut config = DecoderConfig::default();
        config.weights.lm.clear();
        config.distortion.limit = 0;
        Arc::new(ModelGenerator::new(config, vocab, Arc::new(table), Vec::new()).unwrap())
    }

    fn texts(results: &[LineResult]) -> Vec<Option<String>> {
        results.iter().map(|r| r.as_ref().ok().map(Translation::text)).collect()
    }

    #[test]
    fn lines_decode_in_order_with_either_driver() {
        let lines: Vec<String> = ["the cat", r#"<tr target="un">the</tr> cat"#, "<tr>", "cat"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for threads in [1, 3] {
            let results = decode_lines(generator(), &lines, threads);
            assert_eq!(
                texts(&results),
                vec![
                    Some("le chat".to_string()),
                    Some("un chat".to_string()),
                    None,
                    Some("chat".to_string())
                ],
                "threads = {threads}"
            );
            assert!(results[2].as_ref().unwrap_err().starts_with("markup:"));
        }
    }

    #[test]
    fn json_record_skips_missing_parts() {
        let ok = decode_lines(generator(), &["cat".to_string()], 1);
        let record = JsonLine {
            line: 1,
            translation: ok[0].as_ref().ok(),
            error: None,
        };
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["translation"]["tokens"][0], "chat");
        assert!(value.get("error").is_none());

        let failed = JsonLine {
            line: 2,
            translation: None,
            error: Some("boom".to_string()),
        };
        let value = serde_json::to_value(&failed).unwrap();
        assert!(value.get("translation").is_none());
        assert_eq!(value["error"], "boom");
    }
}
