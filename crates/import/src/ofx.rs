use std::sync::OnceLock;

use regex::Regex;

use crate::util::decode_statement;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// A field runs from its opening marker to its closing marker, the next marker of
// any kind, or the end of the block, whichever comes first.
re!(re_inter_marker_ws, r">\s+<");
re!(re_record_start, r"(?i)<STMTTRN>");
re!(re_dtposted, r"(?is)<DTPOSTED>(.*?)(?:</DTPOSTED>|<|$)");
re!(re_trnamt, r"(?is)<TRNAMT>(.*?)(?:</TRNAMT>|<|$)");
re!(re_memo, r"(?is)<MEMO>(.*?)(?:</MEMO>|<|$)");
re!(re_name, r"(?is)<NAME>(.*?)(?:</NAME>|<|$)");
re!(re_fitid, r"(?is)<FITID>(.*?)(?:</FITID>|<|$)");

/// Raw field text of one statement record, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub date: String,
    pub amount: String,
    pub memo: Option<String>,
    pub name: Option<String>,
    pub fit_id: Option<String>,
}

pub struct RecordParser;

impl RecordParser {
    /// Splits decoded statement text into records. Blocks without both a posting
    /// date and an amount are dropped without error; header content before the
    /// first record marker is ignored.
    pub fn parse(text: &str) -> Vec<RawRecord> {
        let blocks = split_blocks(text);
        let total = blocks.len();

        let records: Vec<RawRecord> = blocks
            .iter()
            .enumerate()
            .filter_map(|(idx, block)| {
                let record = Self::parse_block(block);
                if record.is_none() {
                    tracing::debug!(block = idx, "skipping statement block without date/amount");
                }
                record
            })
            .collect();

        tracing::debug!(blocks = total, records = records.len(), "parsed statement");
        records
    }

    fn parse_block(block: &str) -> Option<RawRecord> {
        let date = extract_field(block, re_dtposted())?;
        let amount = extract_field(block, re_trnamt())?;

        Some(RawRecord {
            date,
            amount,
            memo: extract_field(block, re_memo()),
            name: extract_field(block, re_name()),
            fit_id: extract_field(block, re_fitid()),
        })
    }
}

/// Candidate record blocks, in file order.
pub fn split_blocks(text: &str) -> Vec<String> {
    let normalized = re_inter_marker_ws().replace_all(text, "><");
    re_record_start()
        .split(&normalized)
        .skip(1)
        .map(str::to_string)
        .collect()
}

fn extract_field(block: &str, re: &Regex) -> Option<String> {
    let value = re.captures(block)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn parse(data: &[u8]) -> Vec<RawRecord> {
    RecordParser::parse(&decode_statement(data))
}
