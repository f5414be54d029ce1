//! Text helpers shared by the parser, sanitizer and EPUB writer.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// Tries UTF-8 first (BOM aware), then the `hint_encoding` label if one was
/// declared by the document, and finally Windows-1252, which is what
/// unlabelled legacy pages almost always are.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the charset label from a `<meta charset=...>` or
/// `<meta http-equiv content="...; charset=...">` in the first kilobyte.
pub fn sniff_html_charset(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(1024)];

    let pos = prefix
        .windows(8)
        .position(|w| w.eq_ignore_ascii_case(b"charset="))?;
    let mut value = &prefix[pos + 8..];

    if let Some((&quote, rest)) = value.split_first()
        && (quote == b'"' || quote == b'\'')
    {
        value = rest;
    }

    let end = value
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace())
        .unwrap_or(value.len());

    std::str::from_utf8(&value[..end])
        .ok()
        .filter(|label| !label.is_empty())
}

/// Whether `c` may appear in an XML 1.0 document.
///
/// HTML parsers pass C0 controls like form feed through, XML does not.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | ' '..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

/// Escape special XML characters for attribute values and metadata.
///
/// Characters XML cannot carry are dropped.
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape text content. Quotes are left alone, characters XML cannot carry
/// are dropped.
pub fn escape_xml_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Map typographic quotes and dashes to their ASCII forms.
///
/// Many e-readers ship fonts without these glyphs.
pub fn normalize_punctuation(s: &str) -> Cow<'_, str> {
    const MAP: &[(char, char)] = &[
        ('\u{2018}', '\''),
        ('\u{2019}', '\''),
        ('\u{00B4}', '\''),
        ('\u{201C}', '"'),
        ('\u{201D}', '"'),
        ('\u{2013}', '-'),
    ];

    if !s.chars().any(|c| MAP.iter().any(|&(from, _)| from == c)) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.chars()
            .map(|c| {
                MAP.iter()
                    .find(|&&(from, _)| from == c)
                    .map_or(c, |&(_, to)| to)
            })
            .collect(),
    )
}

/// Test helper: remove whitespace between markup: after every `>` and before every `<`.
#[cfg(test)]
pub fn condense(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut pending = String::new();
    let mut after_tag = false;

    for c in markup.chars() {
        if c.is_whitespace() {
            if !after_tag {
                pending.push(c);
            }
            continue;
        }
        if c != '<' {
            out.push_str(&pending);
        }
        pending.clear();
        out.push(c);
        after_tag = c == '>';
    }
    out
}

/// Capitalize the first letter of each word, lowercase the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("Hello, World!".as_bytes(), None), "Hello, World!");
    }

    #[test]
    fn test_decode_with_hint() {
        assert_eq!(decode_text(b"caf\xe9", Some("iso-8859-1")), "café");
    }

    #[test]
    fn test_decode_fallback_windows_1252() {
        // 0x93/0x94 are curly quotes in CP1252
        assert_eq!(decode_text(b"\x93hi\x94", None), "\u{201C}hi\u{201D}");
    }

    #[test]
    fn test_sniff_charset_forms() {
        assert_eq!(sniff_html_charset(br#"<meta charset="utf-8">"#), Some("utf-8"));
        assert_eq!(sniff_html_charset(b"<meta charset=latin1>"), Some("latin1"));
        assert_eq!(
            sniff_html_charset(
                br#"<meta http-equiv="Content-Type" content="text/html; charset=windows-1251">"#
            ),
            Some("windows-1251")
        );
        assert_eq!(sniff_html_charset(b"<p>no meta</p>"), None);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape_xml_text(r#"a<b>&"c'"#), r#"a&lt;b&gt;&amp;"c'"#);
    }

    #[test]
    fn test_escape_drops_xml_illegal_chars() {
        assert_eq!(escape_xml_text("page\u{0C}break\u{1}\u{FFFE}"), "pagebreak");
        assert_eq!(escape_xml("a\u{0B}b"), "ab");
        assert_eq!(escape_xml_text("tab\tline\n\r\u{1F600}"), "tab\tline\n\r\u{1F600}");
    }

    #[test]
    fn test_normalize_punctuation() {
        assert_eq!(
            normalize_punctuation("\u{201C}It\u{2019}s\u{201D} \u{2013} ok\u{00B4}"),
            "\"It's\" - ok'"
        );
        assert!(matches!(normalize_punctuation("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_condense() {
        assert_eq!(
            condense("<ul>\n  <li>a b</li>\n  <li> c </li>\n</ul>\n"),
            "<ul><li>a b</li><li>c</li></ul>"
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("the HITCHHIKER's guide"), "The Hitchhiker'S Guide");
        assert_eq!(title_case("war and peace"), "War And Peace");
    }
}
