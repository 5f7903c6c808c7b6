//! Text decoding under declared, missing, or bogus charsets.
//!
//! Neither function can fail: an unknown charset label degrades to
//! ISO-8859-1 (for bytes) or to the input unchanged (for text).

use encoding_rs::Encoding;

/// Encoding for a charset label, `None` when it cannot be decoded.
///
/// Labels of encodings `encoding_rs` refuses to implement (ISO-2022-KR,
/// HZ-GB-2312, ...) resolve to its replacement encoding, which turns the
/// whole input into a single U+FFFD. Those count as unknown.
pub fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).filter(|enc| *enc != encoding_rs::REPLACEMENT)
}

/// Decode `bytes` with the declared `charset`.
///
/// - no charset: UTF-8
/// - a label `encoding_rs` knows: that encoding
/// - anything else: ISO-8859-1, which maps every byte to a character
///
/// Labels follow the WHATWG Encoding Standard, so a declared `iso-8859-1`
/// (or `us-ascii`) is decoded as windows-1252 and 0x80 becomes `€`. Only the
/// unknown-label fallback maps bytes 0x80..=0x9F to the C1 controls.
pub fn decode_bytes(bytes: &[u8], charset: Option<&str>) -> String {
    match lookup(charset.unwrap_or("utf-8")) {
        Some(encoding) => {
            let (decoded, _) = encoding.decode_with_bom_removal(bytes);
            decoded.into_owned()
        }
        None => encoding_rs::mem::decode_latin1(bytes).into_owned(),
    }
}

/// Re-decode text that the loader already turned into a string.
///
/// The text is encoded back to UTF-8 bytes and those bytes are decoded with
/// `charset`. For a non-UTF-8 charset and non-ASCII text this double decode
/// changes the text (e.g. `é` becomes `Ã©` under ISO-8859-1); plain-text
/// bodies have always gone through it, so it stays. An unknown label returns
/// the text unchanged.
pub fn decode_text(text: &str, charset: Option<&str>) -> String {
    match lookup(charset.unwrap_or("utf-8")) {
        Some(encoding) => {
            let (decoded, _) = encoding.decode_with_bom_removal(text.as_bytes());
            decoded.into_owned()
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_charset_is_utf8() {
        assert_eq!(decode_bytes("café".as_bytes(), None), "café");
    }

    #[test]
    fn test_declared_charset() {
        assert_eq!(decode_bytes(b"caf\xE9", Some("iso-8859-1")), "café");
        assert_eq!(decode_bytes(b"\x93quoted\x94", Some("windows-1252")), "\u{201C}quoted\u{201D}");
        assert_eq!(decode_bytes(b"\x82\xA0", Some(" Shift_JIS ")), "あ");
    }

    #[test]
    fn test_unknown_charset_falls_back_to_latin1() {
        assert_eq!(decode_bytes(b"caf\xE9", Some("x-no-such-charset")), "café");
        // 0x93 is a C1 control in ISO-8859-1, not a curly quote
        assert_eq!(decode_bytes(b"\x93", Some("bogus")), "\u{93}");
    }

    #[test]
    fn test_decode_bytes_never_fails() {
        let all: Vec<u8> = (0..=255).collect();
        for label in [None, Some("utf-8"), Some("utf-16"), Some("gb2312"), Some("???")] {
            let decoded = decode_bytes(&all, label);
            assert!(!decoded.is_empty(), "empty result for {label:?}");
        }
        assert_eq!(decode_bytes(&all, Some("nope")).chars().count(), 256);
    }

    #[test]
    fn test_iso_8859_1_label_is_windows_1252() {
        assert_eq!(decode_bytes(b"\x80", Some("iso-8859-1")), "\u{20AC}");
        assert_eq!(decode_bytes(b"\x80", Some("x-unknown")), "\u{80}");
    }

    #[test]
    fn test_replacement_labels_fall_back_to_latin1() {
        for label in ["iso-2022-kr", "csiso2022kr", "hz-gb-2312"] {
            assert!(lookup(label).is_none(), "{label}");
            assert_eq!(
                decode_bytes(b"<p>Hello plain ASCII body</p>", Some(label)),
                "<p>Hello plain ASCII body</p>"
            );
        }
        assert_eq!(decode_bytes(b"caf\xE9", Some("iso-2022-kr")), "café");
    }

    #[test]
    fn test_decode_text_replacement_label_passes_through() {
        assert_eq!(decode_text("Grüße", Some("hz-gb-2312")), "Grüße");
    }

    #[test]
    fn test_decode_text_unknown_charset_passes_through() {
        assert_eq!(decode_text("Grüße", Some("x-unknown")), "Grüße");
    }

    #[test]
    fn test_decode_text_utf8_is_identity() {
        assert_eq!(decode_text("Grüße", None), "Grüße");
        assert_eq!(decode_text("Grüße", Some("UTF-8")), "Grüße");
    }

    #[test]
    fn test_decode_text_double_decodes_non_utf8() {
        assert_eq!(decode_text("é", Some("iso-8859-1")), "Ã©");
        assert_eq!(decode_text("plain ascii", Some("iso-8859-1")), "plain ascii");
    }
}
