//! Output encoding
//!
//! serde_json writes non-finite floats as `null`, which would turn a logged
//! infinity into an absent value on the next read. Values are lowered to a
//! `Node` first and then written with serde_json's formatters, emitting the
//! bare `Infinity` and `-Infinity` tokens that `decode` accepts.

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use std::io::{self, Write};

use crate::error::LogFileError;
use crate::value::{to_node, Node};

/// Encode a value as compact JSON
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, LogFileError> {
    write_with(value, CompactFormatter)
}

/// Encode a value as indented JSON
pub fn to_string_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, LogFileError> {
    write_with(value, PrettyFormatter::new())
}

fn write_with<T, F>(value: &T, mut formatter: F) -> Result<String, LogFileError>
where
    T: Serialize + ?Sized,
    F: Formatter,
{
    let node = to_node(value).map_err(|e| LogFileError::EncodingError(e.to_string()))?;

    let mut out = Vec::with_capacity(256);
    write_node(&mut out, &mut formatter, &node)
        .map_err(|e| LogFileError::EncodingError(e.to_string()))?;
    String::from_utf8(out).map_err(|e| LogFileError::EncodingError(e.to_string()))
}

fn write_node<W, F>(w: &mut W, f: &mut F, node: &Node) -> io::Result<()>
where
    W: Write,
    F: Formatter,
{
    match node {
        Node::Null => f.write_null(w),
        Node::Bool(b) => f.write_bool(w, *b),
        Node::Integer(i) => f.write_i64(w, *i),
        Node::Float(x) if x.is_nan() => f.write_null(w),
        Node::Float(x) if x.is_infinite() => {
            let token = if x.is_sign_positive() {
                "Infinity"
            } else {
                "-Infinity"
            };
            f.write_raw_fragment(w, token)
        }
        Node::Float(x) => f.write_f64(w, *x),
        Node::String(s) => write_str(w, s),
        Node::Array(items) => {
            f.begin_array(w)?;
            for (i, item) in items.iter().enumerate() {
                f.begin_array_value(w, i == 0)?;
                write_node(w, f, item)?;
                f.end_array_value(w)?;
            }
            f.end_array(w)
        }
        Node::Object(map) => {
            f.begin_object(w)?;
            for (i, (key, value)) in map.iter().enumerate() {
                f.begin_object_key(w, i == 0)?;
                write_str(w, key)?;
                f.end_object_key(w)?;
                f.begin_object_value(w)?;
                write_node(w, f, value)?;
                f.end_object_value(w)?;
            }
            f.end_object(w)
        }
    }
}

// String escaping is the same for every formatter
fn write_str<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    serde_json::to_writer(&mut *w, s).map_err(io::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_log;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_matches_serde_json_for_finite_values() {
        let log = sample_log();
        assert_eq!(to_string(&log).unwrap(), serde_json::to_string(&log).unwrap());
        assert_eq!(
            to_string_pretty(&log).unwrap(),
            serde_json::to_string_pretty(&log).unwrap()
        );
    }

    #[test]
    fn test_non_finite_floats() {
        let mut map = IndexMap::new();
        map.insert("up".to_string(), Node::Float(f64::INFINITY));
        map.insert("down".to_string(), Node::Float(f64::NEG_INFINITY));
        map.insert("nan".to_string(), Node::Float(f64::NAN));
        map.insert("none".to_string(), Node::Null);

        assert_eq!(
            to_string(&Node::Object(map)).unwrap(),
            r#"{"up":Infinity,"down":-Infinity,"nan":null,"none":null}"#
        );
    }

    #[test]
    fn test_pretty_layout_with_empty_containers() {
        let node = Node::Array(vec![
            Node::Array(vec![]),
            Node::Object(IndexMap::new()),
            Node::Float(f64::NEG_INFINITY),
        ]);
        assert_eq!(
            to_string_pretty(&node).unwrap(),
            "[\n  [],\n  {},\n  -Infinity\n]"
        );
    }

    #[test]
    fn test_strings_are_escaped() {
        let node = Node::from("say \"hi\"\n\u{0}");
        assert_eq!(to_string(&node).unwrap(), r#""say \"hi\"\n\u0000""#);
    }
}
