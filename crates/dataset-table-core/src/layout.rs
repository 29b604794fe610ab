//! Key layout conventions for dataset storage.
//!
//! This module centralizes every key-naming rule so the conventions can
//! evolve without touching the commit protocol or the garbage collector:
//!
//! - The dataset descriptor lives at `<uuid>.by-dataset-metadata.json`,
//!   outside the `<uuid>/` prefix that holds all other files. Listing the
//!   prefix therefore never reports the descriptor itself.
//! - Each table's schema marker lives at `<uuid>/<table>/_common_metadata`.
//! - Partition data lives at
//!   `<uuid>/<table>/[<col>=<escaped-value>/...]<label>.<ext>`.
//! - Each secondary index blob lives at
//!   `<uuid>/indices/<column>.by-dataset-index`.
//!
//! Partition values are percent-encoded so that any value, including ones
//! containing `/`, `=`, or `%`, maps to exactly one path segment and back.
//! Partition labels carry a zero-padded sequence number followed by a fresh
//! random suffix: the sequence keeps label order equal to append order, and
//! the suffix keeps every data-file key unique across the dataset lifetime
//! (a deleted label's key is never reused).

use uuid::Uuid;

/// Suffix of the dataset descriptor key.
pub const METADATA_DOCUMENT_SUFFIX: &str = ".by-dataset-metadata.json";

/// File name of the per-table schema marker.
pub const SCHEMA_MARKER_NAME: &str = "_common_metadata";

/// Directory component holding secondary index blobs.
pub const INDICES_DIR: &str = "indices";

/// Suffix of secondary index blob keys.
pub const INDEX_BLOB_SUFFIX: &str = ".by-dataset-index";

/// Number of digits in the zero-padded label sequence number.
pub const LABEL_SEQ_DIGITS: usize = 10;

/// Key of the dataset descriptor for `uuid`.
pub fn metadata_document_key(uuid: &str) -> String {
    format!("{uuid}{METADATA_DOCUMENT_SUFFIX}")
}

/// Prefix under which every non-descriptor file of `uuid` lives.
pub fn dataset_prefix(uuid: &str) -> String {
    format!("{uuid}/")
}

/// Key of the schema marker for `table`, relative to the dataset prefix.
pub fn schema_marker_rel_key(table: &str) -> String {
    format!("{table}/{SCHEMA_MARKER_NAME}")
}

/// Key of the index blob for `column`, relative to the dataset prefix.
pub fn index_blob_rel_key(column: &str) -> String {
    format!(
        "{INDICES_DIR}/{}{INDEX_BLOB_SUFFIX}",
        escape_partition_value(column)
    )
}

/// Turn a key relative to the dataset prefix into an absolute store key.
pub fn absolute_key(uuid: &str, rel_key: &str) -> String {
    format!("{uuid}/{rel_key}")
}

/// Escape a partition value for use as one path segment.
///
/// Percent-encodes every reserved character (`/`, `=`, `%`, spaces, ...)
/// so the segment round-trips losslessly via
/// [`unescape_partition_value`].
pub fn escape_partition_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Invert [`escape_partition_value`].
///
/// Returns `None` when the segment is not valid percent-encoded UTF-8.
pub fn unescape_partition_value(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|c| c.into_owned())
}

/// Generate a fresh partition label with sequence number `seq`.
pub fn partition_label(seq: u64) -> String {
    format!(
        "part-{seq:0width$}-{}",
        Uuid::new_v4().simple(),
        width = LABEL_SEQ_DIGITS
    )
}

/// Parse the sequence number out of a label built by [`partition_label`].
///
/// Returns `None` for labels in any other shape.
pub fn partition_label_seq(label: &str) -> Option<u64> {
    let rest = label.strip_prefix("part-")?;
    let (seq, _) = rest.split_once('-')?;
    if seq.len() != LABEL_SEQ_DIGITS {
        return None;
    }
    seq.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_key_sits_outside_the_dataset_prefix() {
        let key = metadata_document_key("d1");
        assert_eq!(key, "d1.by-dataset-metadata.json");
        assert!(!key.starts_with(&dataset_prefix("d1")));
    }

    #[test]
    fn marker_and_index_keys_follow_the_layout() {
        assert_eq!(schema_marker_rel_key("core"), "core/_common_metadata");
        assert_eq!(
            index_blob_rel_key("location"),
            "indices/location.by-dataset-index"
        );
        assert_eq!(
            absolute_key("d1", &schema_marker_rel_key("core")),
            "d1/core/_common_metadata"
        );
    }

    #[test]
    fn escaping_roundtrips_reserved_characters() {
        for value in ["plain", "a/b", "a=b", "100%", "with space", "snø", ""] {
            let escaped = escape_partition_value(value);
            assert!(!escaped.contains('/'), "{escaped} must be one segment");
            assert!(!escaped.contains('='), "{escaped} must not contain =");
            assert_eq!(unescape_partition_value(&escaped).as_deref(), Some(value));
        }
    }

    #[test]
    fn labels_sort_by_sequence_number() {
        let early = partition_label(1);
        let late = partition_label(20);
        assert!(early < late);
        assert_eq!(partition_label_seq(&early), Some(1));
        assert_eq!(partition_label_seq(&late), Some(20));
    }

    #[test]
    fn foreign_labels_have_no_sequence() {
        assert_eq!(partition_label_seq("custom-label"), None);
        assert_eq!(partition_label_seq("part-12-x"), None);
    }
}
