use crate::domain::models::Source;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenSet {
    ids: BTreeSet<String>,
}

impl HiddenSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn decode(raw: Option<&[u8]>) -> Self {
        let Some(raw) = raw.filter(|bytes| !bytes.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_slice::<Vec<String>>(raw) {
            Ok(ids) => Self::new(ids),
            Err(error) => {
                log::warn!("hidden source set is malformed, treating as empty: {error}");
                Self::default()
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let ids: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        serde_json::to_vec(&ids).unwrap_or_else(|_| b"[]".to_vec())
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.ids.contains(source_id)
    }

    pub fn set_hidden(&mut self, source_id: &str, hidden: bool) -> bool {
        if hidden {
            self.ids.insert(source_id.to_string())
        } else {
            self.ids.remove(source_id)
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub fn is_visible(source_id: &str, hidden: &HiddenSet) -> bool {
    !hidden.contains(source_id)
}

pub fn visible_sources(sources: &[Source], hidden: &HiddenSet) -> Vec<Source> {
    sources
        .iter()
        .filter(|source| is_visible(&source.id, hidden))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SourceKind;
    use proptest::prelude::*;

    fn source(id: &str) -> Source {
        Source {
            id: id.to_string(),
            title: format!("List {id}"),
            color: "#000000".to_string(),
            kind: SourceKind::Task,
        }
    }

    #[test]
    fn decode_absent_blob_is_empty() {
        assert!(HiddenSet::decode(None).is_empty());
        assert!(HiddenSet::decode(Some(b"")).is_empty());
    }

    #[test]
    fn decode_reads_json_array() {
        let hidden = HiddenSet::decode(Some(br#"["a","b"]"#));
        assert_eq!(hidden.len(), 2);
        assert!(hidden.contains("a"));
        assert!(!is_visible("b", &hidden));
        assert!(is_visible("c", &hidden));
    }

    #[test]
    fn encode_then_decode_preserves_ids() {
        let hidden = HiddenSet::new(["work", "home"]);
        assert_eq!(HiddenSet::decode(Some(&hidden.encode())), hidden);
    }

    #[test]
    fn set_hidden_reports_changes() {
        let mut hidden = HiddenSet::default();
        assert!(hidden.set_hidden("work", true));
        assert!(!hidden.set_hidden("work", true));
        assert!(hidden.set_hidden("work", false));
        assert!(hidden.is_empty());
    }

    // Property: malformed persisted blobs always decode to the empty set
    proptest! {
        #[test]
        fn property_malformed_blob_decodes_to_empty(raw in proptest::collection::vec(any::<u8>(), 0..64)) {
            let decoded = HiddenSet::decode(Some(&raw));
            if serde_json::from_slice::<Vec<String>>(&raw).is_err() {
                prop_assert!(decoded.is_empty());
            }
        }
    }

    // Property: the filter keeps exactly S \ H
    proptest! {
        #[test]
        fn property_visible_sources_is_set_difference(
            ids in proptest::collection::vec("[a-e]{1,2}", 0..12),
            hidden_ids in proptest::collection::vec("[a-e]{1,2}", 0..6)
        ) {
            let sources: Vec<Source> = ids.iter().map(|id| source(id)).collect();
            let hidden = HiddenSet::new(hidden_ids.clone());
            let visible = visible_sources(&sources, &hidden);

            let expected: Vec<&str> = ids
                .iter()
                .filter(|id| !hidden_ids.contains(id))
                .map(String::as_str)
                .collect();
            let actual: Vec<&str> = visible.iter().map(|source| source.id.as_str()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
