//! Instruction text for the automation agent
//!
//! The instruction starts with a fixed header (`Company:` / `URL:` lines) so
//! the entity an instruction is about can be recovered from the text alone.

use crate::agent::SchemaDescriptor;
use crate::domain::WorkItem;

const COMPANY_PREFIX: &str = "Company: ";
const URL_PREFIX: &str = "URL: ";

/// Build the agent instruction for one work item.
pub fn build_instruction(item: &WorkItem, schema: &SchemaDescriptor) -> String {
    let fields = schema
        .field_lines()
        .iter()
        .map(|line| format!("    - {}", line))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{company}{name}
{url}{source}

Extract the bill of lading history for the company {name}.

Workflow:
1. Open the URL {source}.
2. In the result list, click the first company. A detail panel opens on the right; continue there.
3. Scroll down the detail panel to the \"Trade Data\" tab and open it.
4. Scroll to the \"Bill of Lading Details\" table.
5. Below the table, change the page size from \"10 / page\" to \"100 / page\".
6. Extract every row of the table, top to bottom, keeping the table order. For each row record:
   - arrival_time: the arrival date
   - hs_code: the HS code
   - product_description: the product description
   - amount_usd: the amount in US dollars, as a number
   Use null for any value the row does not show. Do not guess.
7. Ignore pagination beyond the first page.

Return a single JSON object and nothing else, with exactly these fields:
{fields}

Set company_name to \"{name}\" and info_url to \"{source}\". If the table has no rows, return an empty order_history list.
",
        company = COMPANY_PREFIX,
        url = URL_PREFIX,
        name = item.entity_name,
        source = item.source_reference,
        fields = fields,
    )
}

/// Entity named at the top of an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionHeader {
    pub entity_name: String,
    pub source_reference: String,
}

impl InstructionHeader {
    /// Recover the header from an instruction built by `build_instruction`.
    pub fn parse(instruction: &str) -> Option<Self> {
        let mut lines = instruction.lines();
        let entity_name = lines.next()?.strip_prefix(COMPANY_PREFIX)?.to_string();
        let source_reference = lines.next()?.strip_prefix(URL_PREFIX)?.to_string();
        Some(Self {
            entity_name,
            source_reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> WorkItem {
        WorkItem::new("3", "RUKNUSSIHALAH EST", "https://crm.example.com/new_discovery/mining-v2?q=ruk")
    }

    #[test]
    fn test_instruction_names_entity_and_source() {
        let text = build_instruction(&item(), &SchemaDescriptor::order_history());
        assert!(text.contains("RUKNUSSIHALAH EST"));
        assert!(text.contains("https://crm.example.com/new_discovery/mining-v2?q=ruk"));
    }

    #[test]
    fn test_instruction_lists_schema_fields() {
        let text = build_instruction(&item(), &SchemaDescriptor::order_history());
        for field in ["company_name", "info_url", "order_history", "arrival_time", "hs_code", "product_description", "amount_usd"] {
            assert!(text.contains(field), "missing field {}", field);
        }
        assert!(text.contains("order_history[].amount_usd: number or null"));
    }

    #[test]
    fn test_header_round_trip() {
        let text = build_instruction(&item(), &SchemaDescriptor::order_history());
        let header = InstructionHeader::parse(&text).unwrap();
        assert_eq!(header.entity_name, "RUKNUSSIHALAH EST");
        assert_eq!(header.source_reference, "https://crm.example.com/new_discovery/mining-v2?q=ruk");
    }

    #[test]
    fn test_header_missing() {
        assert!(InstructionHeader::parse("open the page").is_none());
        assert!(InstructionHeader::parse("Company: X").is_none());
        assert!(InstructionHeader::parse("").is_none());
    }
}
