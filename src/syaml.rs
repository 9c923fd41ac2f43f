//! # YAML Path Updates
//!
//! Sets a single value inside a YAML document addressed by a dotted path.
//!
//! Path segments address mapping keys; when the value at a segment is a
//! sequence, the segment must be a numeric index into it. Missing mapping keys
//! along the path are created. Sequences are never extended: an index past the
//! end is an error.
//!
//! The document is parsed into a [`serde_yaml::Value`] and serialized again, so
//! comments and formatting are not preserved. Mapping key order is.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum YamlPathError {
    #[error("path cannot be empty")]
    EmptyPath,

    #[error("failed to parse YAML: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("failed to serialize YAML: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("index {index} out of range for sequence of length {len} at {path:?}")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        path: String,
    },

    #[error("segment {segment:?} is not a valid sequence index at {path:?}")]
    InvalidIndex { segment: String, path: String },

    #[error("cannot set a key inside a scalar value at {path:?}")]
    NotAContainer { path: String },
}

/// Set `path` in the YAML `document` to `value` and return the re-serialized
/// document.
///
/// ```
/// use image_updater::syaml::set_bytes;
///
/// let updated = set_bytes(b"name: testing\n", "name", "new name").unwrap();
/// assert_eq!(updated, b"name: new name\n");
/// ```
///
/// # Errors
///
/// Returns [`YamlPathError`] if the path is empty, the document does not
/// parse, or the path cannot be followed through the document.
pub fn set_bytes(
    document: &[u8],
    path: &str,
    value: impl Into<Value>,
) -> Result<Vec<u8>, YamlPathError> {
    if path.is_empty() {
        return Err(YamlPathError::EmptyPath);
    }

    let mut root = if document.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_yaml::from_slice(document).map_err(YamlPathError::Parse)?
    };

    set_value(&mut root, path, value.into())?;

    serde_yaml::to_string(&root)
        .map(String::into_bytes)
        .map_err(YamlPathError::Serialize)
}

/// Set `path` inside an already parsed YAML value.
///
/// # Errors
///
/// See [`set_bytes`].
pub fn set_value(root: &mut Value, path: &str, value: Value) -> Result<(), YamlPathError> {
    if path.is_empty() {
        return Err(YamlPathError::EmptyPath);
    }

    let segments: Vec<&str> = path.split('.').collect();
    let last = segments.len() - 1;
    let mut current = root;

    for (position, segment) in segments.iter().enumerate() {
        let traversed = || segments[..=position].join(".");

        if current.is_null() {
            *current = Value::Mapping(Mapping::new());
        }

        current = match current {
            Value::Mapping(map) => {
                let key = mapping_key(map, segment);
                if position == last {
                    map.insert(key, value);
                    return Ok(());
                }
                map.entry(key)
                    .or_insert_with(|| Value::Mapping(Mapping::new()))
            }
            Value::Sequence(items) => {
                let index: usize = segment.parse().map_err(|_| YamlPathError::InvalidIndex {
                    segment: (*segment).to_string(),
                    path: traversed(),
                })?;
                let len = items.len();
                let slot = items
                    .get_mut(index)
                    .ok_or_else(|| YamlPathError::IndexOutOfRange {
                        index,
                        len,
                        path: traversed(),
                    })?;
                if position == last {
                    *slot = value;
                    return Ok(());
                }
                slot
            }
            _ => {
                return Err(YamlPathError::NotAContainer {
                    path: segments[..position].join("."),
                })
            }
        };
    }

    Ok(())
}

/// Existing key of `map` that `segment` names, or a new string key.
///
/// Keys such as `8080` or `true` parse as numbers and booleans; they are
/// matched by their rendered form so they are overwritten rather than
/// duplicated.
fn mapping_key(map: &Mapping, segment: &str) -> Value {
    let key = Value::String(segment.to_string());
    if map.contains_key(&key) {
        return key;
    }
    map.keys()
        .find(|existing| match existing {
            Value::Number(number) => number.to_string() == segment,
            Value::Bool(flag) => flag.to_string() == segment,
            _ => false,
        })
        .cloned()
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_str(source: &str, path: &str, value: impl Into<Value>) -> String {
        let updated = set_bytes(source.as_bytes(), path, value).expect("update should succeed");
        String::from_utf8(updated).expect("output should be UTF-8")
    }

    #[test]
    fn test_set_top_level_key() {
        assert_eq!(set_str("name: testing\n", "name", "new name"), "name: new name\n");
    }

    #[test]
    fn test_set_nested_key() {
        assert_eq!(
            set_str("person:\n  age: 30\n  name: John\n", "person.name", "Anderson"),
            "person:\n  age: 30\n  name: Anderson\n"
        );
    }

    #[test]
    fn test_set_inside_sequence() {
        assert_eq!(
            set_str("items:\n- age: 30\n- age: 29\n", "items.1.age", 20),
            "items:\n- age: 30\n- age: 20\n"
        );
    }

    #[test]
    fn test_set_image_reference() {
        assert_eq!(
            set_str(
                "test:\n  image: old-image\n",
                "test.image",
                "quay.io/testorg/repo:production"
            ),
            "test:\n  image: quay.io/testorg/repo:production\n"
        );
    }

    #[test]
    fn test_set_container_image_in_deployment() {
        let source = "spec:\n  template:\n    spec:\n      containers:\n      - name: app\n        image: old\n";
        let updated = set_str(
            source,
            "spec.template.spec.containers.0.image",
            "quay.io/org/app:v2",
        );
        assert!(updated.contains("image: quay.io/org/app:v2"), "{updated}");
        assert!(updated.contains("name: app"), "{updated}");
    }

    #[test]
    fn test_missing_keys_are_created() {
        assert_eq!(
            set_str("name: testing\n", "metadata.labels.app", "web"),
            "name: testing\nmetadata:\n  labels:\n    app: web\n"
        );
    }

    #[test]
    fn test_key_order_is_preserved() {
        assert_eq!(
            set_str("zeta: 1\nalpha: 2\n", "zeta", 3),
            "zeta: 3\nalpha: 2\n"
        );
    }

    #[test]
    fn test_numeric_key_is_overwritten() {
        assert_eq!(
            set_str("ports:\n  8080: old\n", "ports.8080", "new"),
            "ports:\n  8080: new\n"
        );
    }

    #[test]
    fn test_boolean_key_is_overwritten() {
        assert_eq!(
            set_str("flags:\n  true: old\n", "flags.true", "new"),
            "flags:\n  true: new\n"
        );
    }

    #[test]
    fn test_numeric_key_on_path_is_followed() {
        assert_eq!(
            set_str("ports:\n  8080:\n    name: old\n", "ports.8080.name", "web"),
            "ports:\n  8080:\n    name: web\n"
        );
    }

    #[test]
    fn test_empty_document_becomes_mapping() {
        assert_eq!(set_str("", "image", "repo:tag"), "image: repo:tag\n");
    }

    #[test]
    fn test_empty_path_is_error() {
        let err = set_bytes(b"name: testing\n", "", "x").unwrap_err();
        assert!(matches!(err, YamlPathError::EmptyPath));
        assert_eq!(err.to_string(), "path cannot be empty");
    }

    #[test]
    fn test_out_of_range_index_is_error() {
        let err = set_bytes(b"items:\n- age: 30\n", "items.3.age", 20).unwrap_err();
        match err {
            YamlPathError::IndexOutOfRange { index, len, path } => {
                assert_eq!(index, 3);
                assert_eq!(len, 1);
                assert_eq!(path, "items.3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_numeric_sequence_segment_is_error() {
        let err = set_bytes(b"items:\n- age: 30\n", "items.first", 20).unwrap_err();
        assert!(matches!(err, YamlPathError::InvalidIndex { .. }), "{err}");
    }

    #[test]
    fn test_descending_into_scalar_is_error() {
        let err = set_bytes(b"name: testing\n", "name.first", "x").unwrap_err();
        match err {
            YamlPathError::NotAContainer { path } => assert_eq!(path, "name"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let err = set_bytes(b"key: [unclosed\n", "key", "x").unwrap_err();
        assert!(matches!(err, YamlPathError::Parse(_)), "{err}");
    }
}
