//! Character classes used by the lexer.
//!
//! The name classes follow the XML 1.0 (Fifth Edition) `NameStartChar` and
//! `NameChar` productions (§2.3), evaluated one codepoint at a time inside
//! the hot loop. They are encoded as `matches!` range tables rather than
//! regular expressions.

/// Returns `true` if `c` is a whitespace character per XML 1.0 §2.3 `S`.
#[inline]
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Returns `true` if `c` is a quote character usable around attribute
/// values and inside doctype/SGML literals.
#[inline]
pub(crate) fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3 `[4]`.
#[inline]
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3 `[4a]`.
#[inline]
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Returns `true` if `c` may begin an entity name.
///
/// `#` is admitted so numeric character references share the accumulation
/// path with named entities.
#[inline]
pub(crate) fn is_entity_start_char(c: char) -> bool {
    c == '#' || is_name_start_char(c)
}

/// Returns `true` if `c` may continue an entity name.
#[inline]
pub(crate) fn is_entity_char(c: char) -> bool {
    c == '#' || is_name_char(c)
}

/// Returns `true` if `c` terminates an unquoted attribute value.
#[inline]
pub(crate) fn is_attribute_end(c: char) -> bool {
    c == '>' || is_whitespace(c)
}

/// Applies the configured whitespace handling to a text or comment payload.
///
/// `trim` strips leading and trailing ASCII whitespace; `normalize`
/// collapses internal runs of ASCII whitespace into single spaces. Trim is
/// applied first. An empty result suppresses the event at the call sites.
pub(crate) fn apply_text_options(text: &str, trim: bool, normalize: bool) -> String {
    let mut out = if trim {
        text.trim_matches(|c| is_whitespace(c)).to_string()
    } else {
        text.to_string()
    };
    if normalize {
        let mut collapsed = String::with_capacity(out.len());
        let mut in_run = false;
        for c in out.chars() {
            if is_whitespace(c) {
                if !in_run {
                    collapsed.push(' ');
                    in_run = true;
                }
            } else {
                collapsed.push(c);
                in_run = false;
            }
        }
        out = collapsed;
    }
    out
}
