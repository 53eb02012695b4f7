//! Delimited-token scanning.
//!
//! [`TokenScanner`] finds `open ... close` spans (for example `${name}`) in a
//! template and replaces each with the output of a resolver callback. A
//! delimiter preceded by a backslash is emitted literally with the backslash
//! removed.
//!
//! # Example
//! ```
//! use sqlscript::token::TokenScanner;
//!
//! let scanner = TokenScanner::new("${", "}");
//! let out = scanner.scan("SELECT * FROM ${table}", |expr| expr.to_uppercase());
//! assert_eq!(out, "SELECT * FROM TABLE");
//! ```

/// Scanner for `open ... close` delimited expressions.
#[derive(Debug, Clone, Copy)]
pub struct TokenScanner<'a> {
    open: &'a str,
    close: &'a str,
}

/// Scanner for `${...}` placeholders.
pub const PLACEHOLDER: TokenScanner<'static> = TokenScanner::new("${", "}");

impl<'a> TokenScanner<'a> {
    /// Create a scanner for the given delimiters.
    ///
    /// A scanner with an empty delimiter matches nothing.
    pub const fn new(open: &'a str, close: &'a str) -> Self {
        Self { open, close }
    }

    /// Replace every unescaped `open expr close` span with `resolver(expr)`.
    ///
    /// An `open` without a matching unescaped `close` leaves the rest of the
    /// input untouched.
    pub fn scan<F>(&self, text: &str, mut resolver: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        if self.open.is_empty() || self.close.is_empty() {
            return text.to_string();
        }
        let Some(mut start) = text.find(self.open) else {
            return text.to_string();
        };

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut expression = String::new();
        let mut offset = 0;

        loop {
            if start > offset && bytes[start - 1] == b'\\' {
                // Escaped open: drop the backslash, keep the delimiter.
                out.push_str(&text[offset..start - 1]);
                out.push_str(self.open);
                offset = start + self.open.len();
            } else {
                expression.clear();
                out.push_str(&text[offset..start]);
                offset = start + self.open.len();

                let mut end = find_from(text, self.close, offset);
                while let Some(e) = end {
                    if e > offset && bytes[e - 1] == b'\\' {
                        expression.push_str(&text[offset..e - 1]);
                        expression.push_str(self.close);
                        offset = e + self.close.len();
                        end = find_from(text, self.close, offset);
                    } else {
                        expression.push_str(&text[offset..e]);
                        break;
                    }
                }

                match end {
                    None => {
                        out.push_str(&text[start..]);
                        offset = text.len();
                    }
                    Some(e) => {
                        out.push_str(&resolver(&expression));
                        offset = e + self.close.len();
                    }
                }
            }

            match find_from(text, self.open, offset) {
                Some(next) => start = next,
                None => break,
            }
        }

        if offset < text.len() {
            out.push_str(&text[offset..]);
        }
        out
    }

    /// Whether `text` contains at least one unescaped, terminated token.
    pub fn has_tokens(&self, text: &str) -> bool {
        let mut found = false;
        self.scan(text, |_| {
            found = true;
            String::new()
        });
        found
    }
}

fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack.get(from..)?.find(needle).map(|pos| pos + from)
}

/// Scan `text` with the given delimiters and resolver.
pub fn scan<F>(text: &str, open: &str, close: &str, resolver: F) -> String
where
    F: FnMut(&str) -> String,
{
    TokenScanner::new(open, close).scan(text, resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(expr: &str) -> String {
        expr.to_uppercase()
    }

    #[test]
    fn replaces_each_span() {
        let out = PLACEHOLDER.scan("a ${x} b ${yz} c", upper);
        assert_eq!(out, "a X b YZ c");
    }

    #[test]
    fn text_without_tokens_is_unchanged() {
        assert_eq!(PLACEHOLDER.scan("SELECT 1", upper), "SELECT 1");
        assert_eq!(PLACEHOLDER.scan("", upper), "");
    }

    #[test]
    fn identity_scan_is_idempotent_without_delimiters() {
        let text = "SELECT id, title FROM news WHERE id = :id";
        let once = PLACEHOLDER.scan(text, |e| e.to_string());
        let twice = PLACEHOLDER.scan(&once, |e| e.to_string());
        assert_eq!(once, text);
        assert_eq!(twice, once);
    }

    #[test]
    fn escaped_open_is_literal_and_resolver_not_called() {
        let mut calls = 0;
        let out = PLACEHOLDER.scan(r"\${x}", |e| {
            calls += 1;
            e.to_string()
        });
        assert_eq!(out, "${x}");
        assert_eq!(calls, 0);
    }

    #[test]
    fn escaped_close_stays_inside_expression() {
        let out = PLACEHOLDER.scan(r"${a\}b}", |e| format!("[{e}]"));
        assert_eq!(out, "[a}b]");
    }

    #[test]
    fn unterminated_open_is_emitted_verbatim() {
        let out = PLACEHOLDER.scan("x ${a} y ${b", upper);
        assert_eq!(out, "x A y ${b");
    }

    #[test]
    fn custom_delimiters() {
        let scanner = TokenScanner::new("#{", "}");
        assert_eq!(scanner.scan("v = #{id}", |e| format!(":{e}")), "v = :id");
    }

    #[test]
    fn empty_expression_is_passed_to_resolver() {
        let out = PLACEHOLDER.scan("${}", |e| format!("<{e}>"));
        assert_eq!(out, "<>");
    }

    #[test]
    fn has_tokens_detects_only_real_spans() {
        assert!(PLACEHOLDER.has_tokens("a ${b}"));
        assert!(!PLACEHOLDER.has_tokens(r"a \${b}"));
        assert!(!PLACEHOLDER.has_tokens("a ${b"));
    }

    #[test]
    fn empty_delimiters_leave_text_unchanged() {
        assert_eq!(scan("abc", "", "}", upper), "abc");
        assert_eq!(scan("a${b}c", "${", "", upper), "a${b}c");
        assert!(!TokenScanner::new("", "").has_tokens("${x}"));
    }

    #[test]
    fn multibyte_text_around_tokens() {
        let out = PLACEHOLDER.scan("标题 ${t} 内容", upper);
        assert_eq!(out, "标题 T 内容");
    }
}
