//! Upload decoding
//!
//! Log files arrive as raw bytes. Producers write NaN and infinities as the
//! bare tokens `NaN`, `Infinity` and `-Infinity`, which strict JSON rejects,
//! and may write number literals too large for an `f64`, which serde_json
//! rejects. Both are swapped for marker strings before serde_json sees the
//! text and restored as float nodes afterwards.

use crate::error::LogFileError;
use crate::value::Node;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Marker generations tried before giving up on a document whose own strings
/// keep colliding with the markers
const MAX_MARKER_GENERATIONS: u32 = 8;

/// Decode raw upload bytes into an untyped document
pub fn from_slice(bytes: &[u8]) -> Result<Node, LogFileError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|e| LogFileError::DecodeError(format!("log file is not valid UTF-8: {}", e)))?;
    from_str(text)
}

/// Decode JSON text into an untyped document
pub fn from_str(text: &str) -> Result<Node, LogFileError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let spans = scan_non_finite(text);
    if spans.is_empty() {
        return Ok(serde_json::from_str(text)?);
    }

    for generation in 0..MAX_MARKER_GENERATIONS {
        let markers = Markers::new(generation);
        let node: Node = serde_json::from_str(&markers.rewrite(text, &spans))?;

        let mut hits = MarkerHits::default();
        let node = markers.restore(node, &mut hits);
        if hits.values + hits.keys > spans.len() {
            // A string in the document equals a marker
            continue;
        }
        if hits.keys > 0 {
            return Err(LogFileError::DecodeError(
                "non-finite number used as a mapping key".to_string(),
            ));
        }
        return Ok(node);
    }

    Err(LogFileError::DecodeError(
        "could not isolate non-finite numbers from string content".to_string(),
    ))
}

/// A non-finite number written outside a string literal
#[derive(Debug, Clone, Copy, PartialEq)]
struct NonFiniteSpan {
    start: usize,
    end: usize,
    value: f64,
}

/// Find bare non-finite tokens and overflowing number literals outside
/// string literals
fn scan_non_finite(text: &str) -> Vec<NonFiniteSpan> {
    const TOKENS: [(&str, f64); 3] = [
        ("NaN", f64::NAN),
        ("Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ];

    let mut spans = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut pos = 0;

    while let Some(c) = text[pos..].chars().next() {
        let rest = &text[pos..];

        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            pos += c.len_utf8();
            continue;
        }

        if let Some((token, value)) = TOKENS.iter().find(|(token, _)| rest.starts_with(token)) {
            spans.push(NonFiniteSpan {
                start: pos,
                end: pos + token.len(),
                value: *value,
            });
            pos += token.len();
            continue;
        }

        if c == '-' || c.is_ascii_digit() {
            let len = rest
                .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
                .unwrap_or(rest.len());
            if let Ok(value) = rest[..len].parse::<f64>() {
                if value.is_infinite() {
                    spans.push(NonFiniteSpan {
                        start: pos,
                        end: pos + len,
                        value,
                    });
                }
            }
            pos += len;
            continue;
        }

        if c == '"' {
            in_string = true;
        }
        pos += c.len_utf8();
    }

    spans
}

/// Marker strings standing in for non-finite numbers during parsing
struct Markers {
    nan: String,
    pos_inf: String,
    neg_inf: String,
}

#[derive(Debug, Default)]
struct MarkerHits {
    values: usize,
    keys: usize,
}

impl Markers {
    fn new(generation: u32) -> Self {
        Self {
            nan: format!("\u{0}rgs{}:nan", generation),
            pos_inf: format!("\u{0}rgs{}:+inf", generation),
            neg_inf: format!("\u{0}rgs{}:-inf", generation),
        }
    }

    fn marker_for(&self, value: f64) -> &str {
        if value.is_nan() {
            &self.nan
        } else if value.is_sign_positive() {
            &self.pos_inf
        } else {
            &self.neg_inf
        }
    }

    fn value_of(&self, s: &str) -> Option<f64> {
        if s == self.nan {
            Some(f64::NAN)
        } else if s == self.pos_inf {
            Some(f64::INFINITY)
        } else if s == self.neg_inf {
            Some(f64::NEG_INFINITY)
        } else {
            None
        }
    }

    fn rewrite(&self, text: &str, spans: &[NonFiniteSpan]) -> String {
        let mut out = String::with_capacity(text.len() + spans.len() * 16);
        let mut copied = 0;
        for span in spans {
            out.push_str(&text[copied..span.start]);
            // Control characters must be escaped inside JSON strings
            out.push('"');
            out.push_str(&self.marker_for(span.value).replace('\u{0}', "\\u0000"));
            out.push('"');
            copied = span.end;
        }
        out.push_str(&text[copied..]);
        out
    }

    fn restore(&self, node: Node, hits: &mut MarkerHits) -> Node {
        match node {
            Node::String(s) => match self.value_of(&s) {
                Some(value) => {
                    hits.values += 1;
                    Node::Float(value)
                }
                None => Node::String(s),
            },
            Node::Array(items) => Node::Array(
                items
                    .into_iter()
                    .map(|item| self.restore(item, hits))
                    .collect(),
            ),
            Node::Object(map) => Node::Object(
                map.into_iter()
                    .map(|(k, v)| {
                        if self.value_of(&k).is_some() {
                            hits.keys += 1;
                        }
                        (k, self.restore(v, hits))
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_nan_tokens() {
        let node = from_str(r#"{"X": NaN, "Y": Infinity, "Z": -Infinity, "t": 3}"#).unwrap();
        assert!(matches!(node.get("X"), Some(Node::Float(f)) if f.is_nan()));
        assert_eq!(node.get("Y"), Some(&Node::Float(f64::INFINITY)));
        assert_eq!(node.get("Z"), Some(&Node::Float(f64::NEG_INFINITY)));
        assert_eq!(node.get("t"), Some(&Node::Integer(3)));
    }

    #[test]
    fn test_tokens_inside_strings_untouched() {
        let node = from_str(r#"{"label": "NaN and Infinity \" NaN", "arr": [NaN]}"#).unwrap();
        assert_eq!(
            node.get("label"),
            Some(&Node::from("NaN and Infinity \" NaN"))
        );
        let arr = node.get("arr").and_then(|n| n.as_array()).unwrap();
        assert!(matches!(arr[0], Node::Float(f) if f.is_nan()));
    }

    #[test]
    fn test_overflowing_literals_become_infinity() {
        let huge = "9".repeat(400);
        let text = format!(
            r#"{{"a": 1e400, "b": -1.5E+400, "c": 1e-400, "d": "1e400", "e": {}, "f": 2.5}}"#,
            huge
        );
        let node = from_str(&text).unwrap();
        assert_eq!(node.get("a"), Some(&Node::Float(f64::INFINITY)));
        assert_eq!(node.get("b"), Some(&Node::Float(f64::NEG_INFINITY)));
        assert_eq!(node.get("c"), Some(&Node::Float(0.0)));
        assert_eq!(node.get("d"), Some(&Node::from("1e400")));
        assert_eq!(node.get("e"), Some(&Node::Float(f64::INFINITY)));
        assert_eq!(node.get("f"), Some(&Node::Float(2.5)));
    }

    #[test]
    fn test_string_equal_to_marker_stays_a_string() {
        let text = r#"{"X": NaN, "label": "\u0000rgs0:nan", "Y": Infinity}"#;
        let node = from_str(text).unwrap();
        assert!(matches!(node.get("X"), Some(Node::Float(f)) if f.is_nan()));
        assert_eq!(node.get("Y"), Some(&Node::Float(f64::INFINITY)));
        assert_eq!(node.get("label"), Some(&Node::from("\u{0}rgs0:nan")));
    }

    #[test]
    fn test_marker_strings_without_tokens_are_plain_strings() {
        let node = from_str(r#"{"label": "\u0000rgs0:+inf"}"#).unwrap();
        assert_eq!(node.get("label"), Some(&Node::from("\u{0}rgs0:+inf")));
    }

    #[test]
    fn test_non_finite_key_is_rejected() {
        let result = from_str(r#"{NaN: 1}"#);
        assert!(matches!(result, Err(LogFileError::DecodeError(_))));
    }

    #[test]
    fn test_from_slice_strips_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(br#"{"a": 1}"#);
        let node = from_slice(&bytes).unwrap();
        assert_eq!(node.get("a"), Some(&Node::Integer(1)));
    }

    #[test]
    fn test_from_slice_rejects_invalid_utf8() {
        let result = from_slice(&[b'{', 0xff, b'}']);
        assert!(matches!(result, Err(LogFileError::DecodeError(_))));
    }

    #[test]
    fn test_malformed_json() {
        let result = from_str("{\"a\": ");
        assert!(matches!(result, Err(LogFileError::JsonError(_))));
    }
}
