//! Input-line markup: `<tr target="le|un" prob="0.5">the</tr>` fixes the
//! translation of the enclosed words, `<wall/>` puts a wall before the
//! next word. `&lt;`, `&gt;` and `&amp;` escape literal characters.

use smt_core::coverage::Range;
use smt_core::logprob::LOG_ALMOST_0;
use smt_core::{MarkedTranslation, SourceSentence};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarkupError {
    #[error("tag starting at byte {0} is never closed")]
    UnterminatedTag(usize),
    #[error("unknown tag <{0}>")]
    UnknownTag(String),
    #[error("malformed attributes in <{0}>")]
    BadAttribute(String),
    #[error("<tr> needs a non-empty target attribute")]
    MissingTarget,
    #[error("prob must be a non-negative number, got {0:?}")]
    BadProb(String),
    #[error("<tr> inside another <tr>")]
    Nested,
    #[error("</tr> without a matching <tr>")]
    UnmatchedClose,
    #[error("<tr> is never closed")]
    Unclosed,
    #[error("<tr> encloses no words")]
    EmptyMark,
}

struct OpenMark {
    start: usize,
    targets: Vec<Vec<String>>,
    log_prob: f64,
}

fn unescape(word: &str) -> String {
    word.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn push_words(text: &str, tokens: &mut Vec<String>) {
    tokens.extend(text.split_whitespace().map(unescape));
}

fn parse_attrs<'a>(tag: &str, mut s: &'a str) -> Result<Vec<(&'a str, &'a str)>, MarkupError> {
    let bad = || MarkupError::BadAttribute(tag.to_string());
    let mut attrs = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            return Ok(attrs);
        }
        let (key, rest) = s.split_once('=').ok_or_else(bad)?;
        let rest = rest.trim_start();
        let quote = rest.chars().next().filter(|&c| c == '"' || c == '\'').ok_or_else(bad)?;
        let rest = &rest[1..];
        let end = rest.find(quote).ok_or_else(bad)?;
        attrs.push((key.trim(), &rest[..end]));
        s = &rest[end + 1..];
    }
}

fn open_mark(attrs: &str, start: usize) -> Result<OpenMark, MarkupError> {
    let mut targets = None;
    let mut log_prob = 0.0;
    for (key, value) in parse_attrs("tr", attrs)? {
        match key {
            "target" => {
                let alternatives: Vec<Vec<String>> = value
                    .split('|')
                    .map(|alt| alt.split_whitespace().map(unescape).collect())
                    .collect();
                if alternatives.iter().any(Vec::is_empty) {
                    return Err(MarkupError::MissingTarget);
                }
                targets = Some(alternatives);
            }
            "prob" => {
                let p: f64 = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|p: &f64| p.is_finite() && *p >= 0.0)
                    .ok_or_else(|| MarkupError::BadProb(value.to_string()))?;
                log_prob = if p > 0.0 { p.ln() } else { LOG_ALMOST_0 };
            }
            _ => return Err(MarkupError::BadAttribute("tr".to_string())),
        }
    }
    Ok(OpenMark {
        start,
        targets: targets.ok_or(MarkupError::MissingTarget)?,
        log_prob,
    })
}

/// Parses one input line into tokens, marked translations and walls.
pub fn parse_line(line: &str) -> Result<SourceSentence, MarkupError> {
    let mut sentence = SourceSentence::default();
    let mut open: Option<OpenMark> = None;
    let mut pos = 0;

    while let Some(lt) = line[pos..].find('<') {
        let tag_start = pos + lt;
        push_words(&line[pos..tag_start], &mut sentence.tokens);
        let gt = line[tag_start..]
            .find('>')
            .ok_or(MarkupError::UnterminatedTag(tag_start))?;
        let body = line[tag_start + 1..tag_start + gt].trim();
        pos = tag_start + gt + 1;

        if let Some(name) = body.strip_prefix('/') {
            if name.trim() != "tr" {
                return Err(MarkupError::UnknownTag(body.to_string()));
            }
            let mark = open.take().ok_or(MarkupError::UnmatchedClose)?;
            let end = sentence.tokens.len();
            if end == mark.start {
                return Err(MarkupError::EmptyMark);
            }
            sentence.marks.push(MarkedTranslation {
                span: Range::new(mark.start, end),
                targets: mark.targets,
                log_prob: mark.log_prob,
            });
        } else if let Some(name) = body.strip_suffix('/') {
            if name.trim() != "wall" {
                return Err(MarkupError::UnknownTag(body.to_string()));
            }
            sentence.walls.push(sentence.tokens.len());
        } else {
            let (name, attrs) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
            if name != "tr" {
                return Err(MarkupError::UnknownTag(name.to_string()));
            }
            if open.is_some() {
                return Err(MarkupError::Nested);
            }
            open = Some(open_mark(attrs, sentence.tokens.len())?);
        }
    }
    push_words(&line[pos..], &mut sentence.tokens);

    if open.is_some() {
        return Err(MarkupError::Unclosed);
    }
    Ok(sentence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text() {
        let s = parse_line("  the  cat sat ").unwrap();
        assert_eq!(s.tokens, vec!["the", "cat", "sat"]);
        assert!(s.marks.is_empty());
        assert!(s.walls.is_empty());
    }

    #[test]
    fn marked_span_with_alternatives() {
        let s = parse_line(r#"see <tr target="le chat|un chat" prob="0.5">the cat</tr> run"#).unwrap();
        assert_eq!(s.tokens, vec!["see", "the", "cat", "run"]);
        assert_eq!(s.marks.len(), 1);
        let mark = &s.marks[0];
        assert_eq!(mark.span, Range::new(1, 3));
        assert_eq!(
            mark.targets,
            vec![vec!["le".to_string(), "chat".to_string()], vec!["un".to_string(), "chat".to_string()]]
        );
        assert!((mark.log_prob - 0.5f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn prob_defaults_to_certain() {
        let s = parse_line("<tr target='x'>a</tr>").unwrap();
        assert_eq!(s.marks[0].log_prob, 0.0);
        let s = parse_line(r#"<tr target="x" prob="0">a</tr>"#).unwrap();
        assert_eq!(s.marks[0].log_prob, LOG_ALMOST_0);
    }

    #[test]
    fn walls_sit_before_the_next_word() {
        let s = parse_line("a b <wall/> c <wall /> d").unwrap();
        assert_eq!(s.tokens.len(), 4);
        assert_eq!(s.walls, vec![2, 3]);
    }

    #[test]
    fn escaped_brackets_are_words() {
        let s = parse_line("x &lt; y &amp;&gt;").unwrap();
        assert_eq!(s.tokens, vec!["x", "<", "y", "&>"]);
    }

    #[test]
    fn malformed_markup_is_rejected() {
        let cases: &[(&str, MarkupError)] = &[
            ("a <tr target=\"x\">b", MarkupError::Unclosed),
            ("a </tr>", MarkupError::UnmatchedClose),
            ("<tr target=\"x\"></tr>", MarkupError::EmptyMark),
            ("<tr prob=\"1\">a</tr>", MarkupError::MissingTarget),
            ("<tr target=\"x|\">a</tr>", MarkupError::MissingTarget),
            ("<tr target=\"x\" prob=\"-1\">a</tr>", MarkupError::BadProb("-1".to_string())),
            ("<tr target=\"x\"><tr target=\"y\">a</tr></tr>", MarkupError::Nested),
            ("<b>a</b>", MarkupError::UnknownTag("b".to_string())),
            ("a <tr target=\"x\"", MarkupError::UnterminatedTag(2)),
            ("<tr target=x>a</tr>", MarkupError::BadAttribute("tr".to_string())),
        ];
        for (line, expected) in cases {
            assert_eq!(parse_line(line).unwrap_err(), *expected, "{line}");
        }
    }
}
