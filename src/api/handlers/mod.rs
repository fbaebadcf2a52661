//! Route handlers for both services.
//!
//! `health` is mounted by every service, `login` by the password service, and
//! `sso` by the single sign-on service.

pub mod health;
pub mod login;
pub mod sso;

/// Escape text for interpolation into an HTML fragment.
pub(crate) fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn escape_html_plain_text_unchanged() {
        assert_eq!(escape_html("user@example.com"), "user@example.com");
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn escape_html_markup() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }
}
