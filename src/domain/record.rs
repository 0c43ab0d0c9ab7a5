//! Extracted record types.
//!
//! Field names on the wire follow the output schema handed to the agent
//! (`company_name`, `info_url`, `order_history`, ...). The Rust names are the
//! domain names.

use serde::{Deserialize, Serialize};

/// One extracted fact (one bill-of-lading line) for an entity.
///
/// Every field is independently optional. `None` means the agent did not
/// report the field, which is not the same as an empty string or zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubRecord {
    /// Arrival date marker as printed by the source ("2019-03-16")
    #[serde(rename = "arrival_time")]
    pub arrival_time: Option<String>,

    /// HS classification code
    #[serde(rename = "hs_code")]
    pub code: Option<String>,

    /// Product description
    #[serde(rename = "product_description")]
    pub description: Option<String>,

    /// Amount in USD
    #[serde(rename = "amount_usd")]
    pub amount: Option<f64>,
}

impl SubRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arrival_time(mut self, arrival_time: impl Into<String>) -> Self {
        self.arrival_time = Some(arrival_time.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// True when the agent reported none of the four fields.
    pub fn is_blank(&self) -> bool {
        self.arrival_time.is_none() && self.code.is_none() && self.description.is_none() && self.amount.is_none()
    }
}

/// Validated result of one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(rename = "company_name")]
    pub entity_name: String,

    #[serde(rename = "info_url")]
    pub source_reference: String,

    /// Sub-records in the order the agent returned them
    #[serde(rename = "order_history")]
    pub records: Vec<SubRecord>,
}

impl ExtractionResult {
    pub fn new(entity_name: impl Into<String>, source_reference: impl Into<String>, records: Vec<SubRecord>) -> Self {
        Self {
            entity_name: entity_name.into(),
            source_reference: source_reference.into(),
            records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of all reported amounts; records without an amount are skipped.
    pub fn total_amount(&self) -> f64 {
        self.records.iter().filter_map(|r| r.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sub_record_builder() {
        let record = SubRecord::new()
            .with_arrival_time("2019-03-16")
            .with_code("84818050")
            .with_description("VALVE")
            .with_amount(411.0);

        assert_eq!(record.arrival_time.as_deref(), Some("2019-03-16"));
        assert_eq!(record.code.as_deref(), Some("84818050"));
        assert_eq!(record.description.as_deref(), Some("VALVE"));
        assert_eq!(record.amount, Some(411.0));
        assert!(!record.is_blank());
    }

    #[test]
    fn test_sub_record_absent_distinct_from_empty() {
        let absent = SubRecord::new();
        let empty = SubRecord::new().with_description("").with_amount(0.0);
        assert!(absent.is_blank());
        assert!(!empty.is_blank());
        assert_ne!(absent, empty);
    }

    #[test]
    fn test_serialized_form_uses_wire_names() {
        let result = ExtractionResult::new(
            "MITTAL REFRIGERATIONS",
            "https://crm.example.com/d/9",
            vec![SubRecord::new().with_code("84181010")],
        );

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["company_name"], "MITTAL REFRIGERATIONS");
        assert_eq!(value["info_url"], "https://crm.example.com/d/9");
        assert_eq!(value["order_history"][0]["hs_code"], "84181010");
        assert!(value["order_history"][0]["amount_usd"].is_null());
    }

    #[test]
    fn test_deserialize_preserves_order() {
        let value = json!({
            "company_name": "X",
            "info_url": "u",
            "order_history": [
                {"arrival_time": "2020-01-01"},
                {"arrival_time": "2019-01-01"},
                {"arrival_time": "2021-01-01"}
            ]
        });
        let result: ExtractionResult = serde_json::from_value(value).unwrap();
        let dates: Vec<_> = result.records.iter().map(|r| r.arrival_time.clone().unwrap()).collect();
        assert_eq!(dates, vec!["2020-01-01", "2019-01-01", "2021-01-01"]);
    }

    #[test]
    fn test_total_amount_skips_missing() {
        let result = ExtractionResult::new(
            "X",
            "u",
            vec![
                SubRecord::new().with_amount(10.5),
                SubRecord::new(),
                SubRecord::new().with_amount(4.5),
            ],
        );
        assert_eq!(result.total_amount(), 15.0);
        assert!(!result.is_empty());
    }
}
