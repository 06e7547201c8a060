use caixa_core::{Direction, Money};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::ofx::RawRecord;
use crate::util::collapse_whitespace;

/// Description used when a record carries neither a memo nor a payee name.
pub const GENERIC_DESCRIPTION: &str = "Transação importada";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFields {
    /// `YYYY-MM-DD` when the raw field starts with 8 digits, otherwise the raw text.
    pub date: String,
    pub amount: Money,
    pub direction: Direction,
    pub description: String,
    pub external_ref: Option<String>,
}

pub struct FieldNormalizer;

impl FieldNormalizer {
    pub fn normalize(raw: &RawRecord) -> NormalizedFields {
        let (amount, direction) = split_direction(parse_signed_amount(&raw.amount));
        NormalizedFields {
            date: normalize_date(&raw.date),
            amount,
            direction,
            description: normalize_description(raw.memo.as_deref(), raw.name.as_deref()),
            external_ref: raw.fit_id.clone(),
        }
    }
}

/// Reads the first 8 characters positionally as `YYYYMMDD`. Time and timezone
/// suffixes are ignored and the result is not calendar-checked.
pub fn normalize_date(raw: &str) -> String {
    let s = raw.trim();
    match s.get(..8) {
        Some(head) if head.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{}-{}-{}", &head[..4], &head[4..6], &head[6..8])
        }
        _ => s.to_string(),
    }
}

/// Locale heuristic for statement amounts. When both `.` and `,` appear, `.` is
/// taken as grouping and `,` as the decimal separator; a lone `,` is a decimal
/// separator; anything else is parsed as-is. Never fails: a wrong guess yields a
/// wrong magnitude, and text without a numeric prefix yields zero. So does a
/// prefix beyond `Decimal` range (29+ integer digits), which then reads as an
/// inflow.
pub fn parse_signed_amount(raw: &str) -> Decimal {
    let s = raw.trim();
    let canonical = if s.contains('.') && s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else if s.contains(',') {
        s.replace(',', ".")
    } else {
        s.to_string()
    };
    leading_decimal(&canonical)
}

/// Parses the longest prefix of the form `[+-]digits[.digits]`.
fn leading_decimal(s: &str) -> Decimal {
    let mut negative = false;
    let mut digits = String::new();
    let mut seen_point = false;

    for (i, c) in s.chars().enumerate() {
        match c {
            '-' | '+' if i == 0 => negative = c == '-',
            '0'..='9' => digits.push(c),
            '.' if !seen_point => {
                seen_point = true;
                digits.push('.');
            }
            _ => break,
        }
    }

    let digits = digits.trim_end_matches('.');
    if !digits.bytes().any(|b| b.is_ascii_digit()) {
        return Decimal::ZERO;
    }
    let value = if digits.starts_with('.') {
        Decimal::from_str(&format!("0{digits}"))
    } else {
        Decimal::from_str(digits)
    }
    .unwrap_or(Decimal::ZERO);

    if negative {
        -value
    } else {
        value
    }
}

/// Derives the direction from the sign and discards it. Zero is an inflow.
pub fn split_direction(signed: Decimal) -> (Money, Direction) {
    let direction = if signed >= Decimal::ZERO {
        Direction::Inflow
    } else {
        Direction::Outflow
    };
    (Money::from_decimal(signed), direction)
}

pub fn normalize_description(memo: Option<&str>, name: Option<&str>) -> String {
    let cleaned = |s: &str| Some(collapse_whitespace(s)).filter(|d| !d.is_empty());
    memo.and_then(cleaned)
        .or_else(|| name.and_then(cleaned))
        .unwrap_or_else(|| GENERIC_DESCRIPTION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn amount_grouped_with_comma_decimal() {
        assert_eq!(parse_signed_amount("1.234,56"), dec("1234.56"));
    }

    #[test]
    fn amount_comma_decimal_only() {
        assert_eq!(parse_signed_amount("1234,56"), dec("1234.56"));
    }

    #[test]
    fn amount_dot_decimal() {
        assert_eq!(parse_signed_amount("1234.56"), dec("1234.56"));
    }

    #[test]
    fn amount_negative_is_outflow() {
        let (amount, direction) = split_direction(parse_signed_amount("-50.00"));
        assert_eq!(amount.as_decimal(), dec("50.00"));
        assert_eq!(direction, Direction::Outflow);
    }

    #[test]
    fn amount_integer_is_inflow() {
        let (amount, direction) = split_direction(parse_signed_amount("50"));
        assert_eq!(amount.as_decimal(), dec("50"));
        assert_eq!(direction, Direction::Inflow);
    }

    #[test]
    fn amount_single_comma_three_digits_is_fractional() {
        // Ambiguous with a thousands-grouped integer; resolved as fractional.
        assert_eq!(parse_signed_amount("1,234"), dec("1.234"));
    }

    #[test]
    fn amount_us_grouping_is_misread_silently() {
        // Both separators present: '.' is always treated as grouping.
        assert_eq!(parse_signed_amount("1,234.56"), dec("1.23456"));
    }

    #[test]
    fn amount_zero_and_negative_zero_are_inflow() {
        assert_eq!(split_direction(parse_signed_amount("0.00")).1, Direction::Inflow);
        assert_eq!(split_direction(parse_signed_amount("-0,00")).1, Direction::Inflow);
    }

    #[test]
    fn amount_lenient_prefix() {
        assert_eq!(parse_signed_amount("+12.50 BRL"), dec("12.50"));
        assert_eq!(parse_signed_amount(" -7, "), dec("-7"));
        assert_eq!(parse_signed_amount(".5"), dec("0.5"));
    }

    #[test]
    fn amount_garbage_is_zero() {
        assert_eq!(parse_signed_amount("abc"), Decimal::ZERO);
        assert_eq!(parse_signed_amount("-"), Decimal::ZERO);
        assert_eq!(parse_signed_amount(""), Decimal::ZERO);
    }

    #[test]
    fn amount_beyond_decimal_range_is_zero_inflow() {
        let huge = format!("-{}", "9".repeat(29));
        assert_eq!(parse_signed_amount(&huge), Decimal::ZERO);
        assert_eq!(split_direction(parse_signed_amount(&huge)).1, Direction::Inflow);

        let widest = format!("-{}", "9".repeat(28));
        assert_eq!(parse_signed_amount(&widest), dec(&widest));
    }

    #[test]
    fn date_positional_with_suffix() {
        assert_eq!(normalize_date("20240115120000[-3:BRT]"), "2024-01-15");
        assert_eq!(normalize_date(" 20240301 "), "2024-03-01");
    }

    #[test]
    fn date_not_calendar_checked() {
        assert_eq!(normalize_date("20241340"), "2024-13-40");
    }

    #[test]
    fn date_unreadable_kept_raw() {
        assert_eq!(normalize_date("15/01/2024"), "15/01/2024");
        assert_eq!(normalize_date("2024"), "2024");
    }

    #[test]
    fn description_prefers_memo_then_name_then_label() {
        assert_eq!(normalize_description(Some("  PAGTO   ENEL "), Some("ENEL")), "PAGTO ENEL");
        assert_eq!(normalize_description(None, Some("PIX\nRECEBIDO")), "PIX RECEBIDO");
        assert_eq!(normalize_description(None, None), GENERIC_DESCRIPTION);
    }

    #[test]
    fn normalize_full_record() {
        let raw = RawRecord {
            date: "20240115".into(),
            amount: "-189,90".into(),
            memo: None,
            name: None,
            fit_id: Some("TX9".into()),
        };
        let fields = FieldNormalizer::normalize(&raw);
        assert_eq!(fields.date, "2024-01-15");
        assert_eq!(fields.amount.to_cents(), 18990);
        assert_eq!(fields.direction, Direction::Outflow);
        assert_eq!(fields.description, GENERIC_DESCRIPTION);
        assert_eq!(fields.external_ref.as_deref(), Some("TX9"));
    }
}
