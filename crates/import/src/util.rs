use encoding_rs::WINDOWS_1252;

/// Collapses every run of whitespace into a single space and trims both ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes a statement export. UTF-8 when valid; otherwise Windows-1252, the
/// `CHARSET:1252` most bank exports declare.
pub fn decode_statement(data: &[u8]) -> String {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(data);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_inner_runs_and_trim() {
        assert_eq!(collapse_whitespace("  PIX   ENVIADO\t\n LOJA  "), "PIX ENVIADO LOJA");
    }

    #[test]
    fn collapse_empty_is_empty() {
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }

    #[test]
    fn decode_valid_utf8() {
        assert_eq!(decode_statement("Pagamento Água".as_bytes()), "Pagamento Água");
    }

    #[test]
    fn decode_strips_bom() {
        assert_eq!(decode_statement(b"\xEF\xBB\xBF<OFX>"), "<OFX>");
    }

    #[test]
    fn decode_single_byte_fallback() {
        // 0xC1 is 'Á' in Windows-1252 and invalid as a lone UTF-8 byte.
        assert_eq!(decode_statement(b"\xC1gua"), "Água");
    }

    #[test]
    fn decode_windows_1252_punctuation() {
        assert_eq!(decode_statement(b"\x93PIX\x94 \x80 5 \x96 loja"), "\u{201C}PIX\u{201D} \u{20AC} 5 \u{2013} loja");
    }
}
