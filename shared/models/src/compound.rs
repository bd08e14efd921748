//! Compound-search wire models.
//!
//! Typed view of the PubChem PUG REST result envelope: either a `Waiting`
//! marker carrying a listkey, a `PC_Compounds` array, or a `Fault`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Classification map attached to a property (`urn` on the wire).
pub type Classification = BTreeMap<String, Value>;

/// Required classification pairs used to pick a property.
pub type Selector<'a> = &'a [(&'a str, &'a str)];

/// Preferred IUPAC name.
pub const IUPAC_PREFERRED: Selector<'static> = &[("label", "IUPAC Name"), ("name", "Preferred")];

/// Molecular formula.
pub const MOLECULAR_FORMULA: Selector<'static> = &[("label", "Molecular Formula")];

/// Result envelope returned by both the search and the listkey endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchEnvelope {
    #[serde(rename = "Waiting", default, skip_serializing_if = "Option::is_none")]
    pub waiting: Option<Waiting>,
    #[serde(rename = "PC_Compounds", default, skip_serializing_if = "Option::is_none")]
    pub pc_compounds: Option<Vec<CompoundRecord>>,
    #[serde(rename = "Fault", default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

/// Pending marker for an asynchronous search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waiting {
    #[serde(rename = "ListKey")]
    pub list_key: String,
    #[serde(rename = "Message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// Polling state derived from an envelope.
#[derive(Debug, Clone)]
pub enum PollState {
    Ready(Option<Vec<CompoundRecord>>),
    Pending(String),
}

impl SearchEnvelope {
    /// Consume the envelope into its polling state. A `Waiting` marker wins
    /// over any other field.
    pub fn into_state(self) -> PollState {
        match self.waiting {
            Some(waiting) => PollState::Pending(waiting.list_key),
            None => PollState::Ready(self.pc_compounds),
        }
    }
}

/// A single compound from `PC_Compounds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundRecord {
    #[serde(default)]
    pub id: CompoundId,
    #[serde(default)]
    pub props: Vec<PropertyEntry>,
}

/// `id.id.cid`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompoundId {
    #[serde(default)]
    pub id: CompoundIdInner,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompoundIdInner {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<u64>,
}

/// Classified attribute of a compound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub urn: Classification,
    pub value: PropertyValue,
}

/// Single-key payload container such as `{"sval": "..."}` or `{"fval": 180.16}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyValue(pub BTreeMap<String, Value>);

impl PropertyValue {
    /// The payload under whichever key is present.
    pub fn payload(&self) -> Option<&Value> {
        self.0.values().next()
    }
}

impl PropertyEntry {
    /// True when every selector pair is present in the classification with an
    /// identical string value.
    pub fn matches(&self, selector: Selector<'_>) -> bool {
        selector
            .iter()
            .all(|(key, expected)| self.urn.get(*key).and_then(Value::as_str) == Some(*expected))
    }
}

/// Return the payload of the first property whose classification matches
/// `selector`. Later matches are ignored.
pub fn extract_property<'a>(props: &'a [PropertyEntry], selector: Selector<'_>) -> Option<&'a Value> {
    props
        .iter()
        .find(|entry| entry.matches(selector))
        .and_then(|entry| entry.value.payload())
}

impl CompoundRecord {
    pub fn cid(&self) -> Option<u64> {
        self.id.id.cid
    }

    pub fn property(&self, selector: Selector<'_>) -> Option<&Value> {
        extract_property(&self.props, selector)
    }

    /// String-valued property, empty strings treated as absent.
    pub fn text_property(&self, selector: Selector<'_>) -> Option<String> {
        self.property(selector)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn summary(&self) -> CompoundSummary {
        CompoundSummary {
            cid: self.cid(),
            iupac_name: self.text_property(IUPAC_PREFERRED),
            molecular_formula: self.text_property(MOLECULAR_FORMULA),
        }
    }
}

/// Condensed compound view used by the IUPAC resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundSummary {
    pub cid: Option<u64>,
    pub iupac_name: Option<String>,
    pub molecular_formula: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(urn: Value, value: Value) -> PropertyEntry {
        serde_json::from_value(json!({ "urn": urn, "value": value })).unwrap()
    }

    fn aspirin_props() -> Vec<PropertyEntry> {
        vec![
            entry(
                json!({"label": "IUPAC Name", "name": "Traditional", "datatype": 1}),
                json!({"sval": "2-acetyloxybenzoic acid (traditional)"}),
            ),
            entry(
                json!({"label": "IUPAC Name", "name": "Preferred", "datatype": 1}),
                json!({"sval": "2-acetyloxybenzoic acid"}),
            ),
            entry(
                json!({"label": "IUPAC Name", "name": "Preferred", "datatype": 1}),
                json!({"sval": "shadowed"}),
            ),
            entry(json!({"label": "Molecular Formula", "datatype": 1}), json!({"sval": "C9H8O4"})),
            entry(json!({"label": "Molecular Weight", "datatype": 1}), json!({"fval": 180.16})),
        ]
    }

    #[test]
    fn extract_selects_exact_classification() {
        let props = aspirin_props();
        let value = extract_property(&props, IUPAC_PREFERRED);
        assert_eq!(value, Some(&json!("2-acetyloxybenzoic acid")));

        let traditional = extract_property(&props, &[("label", "IUPAC Name"), ("name", "Traditional")]);
        assert_eq!(traditional, Some(&json!("2-acetyloxybenzoic acid (traditional)")));
    }

    #[test]
    fn extract_requires_every_selector_key() {
        let props = aspirin_props();
        assert!(extract_property(&props, &[("label", "IUPAC Name"), ("name", "Systematic")]).is_none());
        assert!(extract_property(&props, &[("label", "IUPAC")]).is_none());
        assert_eq!(
            extract_property(&props, &[("label", "Molecular Weight")]),
            Some(&json!(180.16))
        );
    }

    #[test]
    fn extract_ignores_non_string_classification_values() {
        let props = vec![entry(json!({"label": 7}), json!({"ival": 1}))];
        assert!(extract_property(&props, &[("label", "7")]).is_none());
    }

    #[test]
    fn envelope_waiting_is_pending() {
        let envelope: SearchEnvelope = serde_json::from_value(json!({
            "Waiting": {"ListKey": "3046283612960124812", "Message": "Your request is running"}
        }))
        .unwrap();
        match envelope.into_state() {
            PollState::Pending(key) => assert_eq!(key, "3046283612960124812"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn envelope_with_compounds_summarises() {
        let envelope: SearchEnvelope = serde_json::from_value(json!({
            "PC_Compounds": [{
                "id": {"id": {"cid": 2244}},
                "atoms": {"aid": [1, 2, 3]},
                "props": [
                    {"urn": {"label": "IUPAC Name", "name": "Preferred"}, "value": {"sval": "2-acetyloxybenzoic acid"}},
                    {"urn": {"label": "Molecular Formula"}, "value": {"sval": "C9H8O4"}}
                ]
            }]
        }))
        .unwrap();

        let records = match envelope.into_state() {
            PollState::Ready(Some(records)) => records,
            other => panic!("unexpected state {:?}", other),
        };
        assert_eq!(
            records[0].summary(),
            CompoundSummary {
                cid: Some(2244),
                iupac_name: Some("2-acetyloxybenzoic acid".to_string()),
                molecular_formula: Some("C9H8O4".to_string()),
            }
        );
    }

    #[test]
    fn fault_envelope_has_no_compounds() {
        let envelope: SearchEnvelope = serde_json::from_value(json!({
            "Fault": {"Code": "PUGREST.NotFound", "Message": "No CID found"}
        }))
        .unwrap();
        assert_eq!(envelope.fault.as_ref().map(|f| f.code.as_str()), Some("PUGREST.NotFound"));
        assert!(matches!(envelope.into_state(), PollState::Ready(None)));
    }

    #[test]
    fn empty_iupac_name_is_absent() {
        let record: CompoundRecord = serde_json::from_value(json!({
            "id": {"id": {"cid": 1}},
            "props": [{"urn": {"label": "IUPAC Name", "name": "Preferred"}, "value": {"sval": ""}}]
        }))
        .unwrap();
        assert_eq!(record.summary().iupac_name, None);
    }
}
