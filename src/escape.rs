//! HTML escaping for report text.
//!
//! Every piece of user-controlled text that lands in the report goes through
//! [`escape_html`] unless a marker explicitly asserts the payload is trusted
//! HTML. Escaping covers attribute contexts too, so the same helper is safe
//! for `src`/`class` values.

/// Escape text for embedding in HTML element or attribute content.
pub fn escape_html(input: &str) -> String {
    // Fast path: nothing to escape.
    if !input
        .bytes()
        .any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\''))
    {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
