//! Parsing of `<script>` template text into a [`ScriptElement`] description.
//!
//! Only the dynamic-SQL tags are treated as markup. A `<` that does not open
//! or close one of them is plain text, so comparisons such as `a < b` need no
//! escaping. `<![CDATA[...]]>` sections and the five XML entities are decoded.

use crate::error::{BuildError, BuildResult};

/// Root tag of a script envelope.
pub const SCRIPT_TAG: &str = "script";

/// Tags recognized inside a script.
pub const KNOWN_TAGS: &[&str] = &[
    SCRIPT_TAG,
    "if",
    "where",
    "set",
    "trim",
    "foreach",
    "choose",
    "when",
    "otherwise",
    "bind",
    "include",
    "property",
];

/// One item of a script description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptItem {
    Text(String),
    Element(ScriptElement),
}

/// A tag with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<ScriptItem>,
}

impl ScriptElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a text child.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(ScriptItem::Text(text.into()));
        self
    }

    /// Add an element child.
    pub fn child(mut self, child: ScriptElement) -> Self {
        self.children.push(ScriptItem::Element(child));
        self
    }

    /// Attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Whether `text` is wrapped in a `<script>` envelope.
pub fn is_script(text: &str) -> bool {
    text.trim_start().starts_with("<script>")
}

/// Parse template text into a description rooted at a `script` element.
///
/// Text without an envelope is parsed as the body of an implicit one.
pub fn parse_script(text: &str) -> BuildResult<ScriptElement> {
    let mut stack: Vec<ScriptElement> = vec![ScriptElement::new(SCRIPT_TAG)];
    let mut envelope_open = false;
    let mut envelope_closed = false;
    let mut text_buf = String::new();
    let mut rest = text;

    while let Some(lt) = rest.find('<') {
        decode_entities_into(&rest[..lt], &mut text_buf);
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<![CDATA[") {
            let end = after.find("]]>").ok_or_else(|| {
                BuildError::configuration("Unterminated CDATA section in script")
            })?;
            text_buf.push_str(&after[..end]);
            rest = &after[end + 3..];
            continue;
        }

        if let Some((name, after)) = closing_tag(rest) {
            flush_text(&mut text_buf, &mut stack);
            if name == SCRIPT_TAG && stack.len() == 1 {
                if !envelope_open || envelope_closed {
                    return Err(BuildError::configuration("Unexpected </script>"));
                }
                envelope_closed = true;
            } else {
                let open = stack.pop().filter(|_| !stack.is_empty());
                match open {
                    Some(el) if el.tag == name => push_child(&mut stack, el),
                    Some(el) => {
                        return Err(BuildError::configuration(format!(
                            "Mismatched closing tag </{name}>, expected </{}>",
                            el.tag
                        )));
                    }
                    None => {
                        return Err(BuildError::configuration(format!(
                            "Unexpected closing tag </{name}>"
                        )));
                    }
                }
            }
            rest = after;
            continue;
        }

        if let Some(open) = opening_tag(rest)? {
            flush_text(&mut text_buf, &mut stack);
            rest = open.rest;
            if open.element.tag == SCRIPT_TAG && stack.len() == 1 && !envelope_open {
                envelope_open = true;
                continue;
            }
            if open.self_closing {
                push_child(&mut stack, open.element);
            } else {
                stack.push(open.element);
            }
            continue;
        }

        // A bare `<` is text.
        text_buf.push('<');
        rest = &rest[1..];
    }
    decode_entities_into(rest, &mut text_buf);
    flush_text(&mut text_buf, &mut stack);

    if stack.len() > 1 {
        let tag = stack.last().map(|el| el.tag.clone()).unwrap_or_default();
        return Err(BuildError::configuration(format!("Unclosed tag <{tag}>")));
    }
    if envelope_open && !envelope_closed {
        return Err(BuildError::configuration("Unclosed tag <script>"));
    }
    stack
        .pop()
        .ok_or_else(|| BuildError::configuration("Empty script"))
}

fn flush_text(buf: &mut String, stack: &mut [ScriptElement]) {
    if buf.is_empty() {
        return;
    }
    let text = std::mem::take(buf);
    if let Some(top) = stack.last_mut() {
        top.children.push(ScriptItem::Text(text));
    }
}

fn push_child(stack: &mut [ScriptElement], el: ScriptElement) {
    if let Some(top) = stack.last_mut() {
        top.children.push(ScriptItem::Element(el));
    }
}

fn tag_name(s: &str) -> (&str, &str) {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(s.len());
    (&s[..end], &s[end..])
}

/// `</name>` for a known tag.
fn closing_tag(s: &str) -> Option<(&str, &str)> {
    let after = s.strip_prefix("</")?;
    let (name, after) = tag_name(after);
    if !KNOWN_TAGS.contains(&name) {
        return None;
    }
    let after = after.trim_start().strip_prefix('>')?;
    Some((name, after))
}

struct OpeningTag<'a> {
    element: ScriptElement,
    self_closing: bool,
    rest: &'a str,
}

/// `<name attr="v" ...>` or `<name ... />` for a known tag.
fn opening_tag(s: &str) -> BuildResult<Option<OpeningTag<'_>>> {
    let Some(after) = s.strip_prefix('<') else {
        return Ok(None);
    };
    let (name, mut rest) = tag_name(after);
    if !KNOWN_TAGS.contains(&name) {
        return Ok(None);
    }
    if !rest.starts_with(|c: char| c.is_whitespace() || c == '>' || c == '/') {
        return Ok(None);
    }

    let mut element = ScriptElement::new(name);
    loop {
        rest = rest.trim_start();
        if let Some(r) = rest.strip_prefix("/>") {
            return Ok(Some(OpeningTag {
                element,
                self_closing: true,
                rest: r,
            }));
        }
        if let Some(r) = rest.strip_prefix('>') {
            return Ok(Some(OpeningTag {
                element,
                self_closing: false,
                rest: r,
            }));
        }

        let (attr, r) = tag_name(rest);
        if attr.is_empty() {
            return Err(BuildError::configuration(format!(
                "Malformed attribute in <{name}>"
            )));
        }
        let r = r.trim_start().strip_prefix('=').ok_or_else(|| {
            BuildError::configuration(format!("Attribute `{attr}` in <{name}> has no value"))
        })?;
        let r = r.trim_start();
        let quote = r
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| {
                BuildError::configuration(format!(
                    "Attribute `{attr}` in <{name}> must be quoted"
                ))
            })?;
        let r = &r[1..];
        let end = r.find(quote).ok_or_else(|| {
            BuildError::configuration(format!("Unterminated attribute `{attr}` in <{name}>"))
        })?;
        let mut value = String::new();
        decode_entities_into(&r[..end], &mut value);
        element.attributes.push((attr.to_string(), value));
        rest = &r[end + 1..];
    }
}

const ENTITIES: &[(&str, char)] = &[
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&amp;", '&'),
    ("&quot;", '"'),
    ("&apos;", '\''),
];

fn decode_entities_into(mut s: &str, out: &mut String) {
    while let Some(amp) = s.find('&') {
        out.push_str(&s[..amp]);
        s = &s[amp..];
        match ENTITIES.iter().find(|(e, _)| s.starts_with(e)) {
            Some((entity, c)) => {
                out.push(*c);
                s = &s[entity.len()..];
            }
            None => {
                out.push('&');
                s = &s[1..];
            }
        }
    }
    out.push_str(s);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_tags_and_attributes() {
        let root = parse_script(
            r#"<script>SELECT * FROM news <where><if test="title != null">AND title = :title</if></where></script>"#,
        )
        .unwrap();
        assert_eq!(root.tag, "script");
        assert_eq!(root.children.len(), 2);
        let ScriptItem::Element(where_el) = &root.children[1] else {
            panic!("expected <where>");
        };
        assert_eq!(where_el.tag, "where");
        let ScriptItem::Element(if_el) = &where_el.children[0] else {
            panic!("expected <if>");
        };
        assert_eq!(if_el.attribute("test"), Some("title != null"));
        assert_eq!(
            if_el.children,
            vec![ScriptItem::Text("AND title = :title".into())]
        );
    }

    #[test]
    fn single_quoted_attributes_with_spaces_around_equals() {
        let root = parse_script(
            "<script><foreach item = 'item' collection = 'list' open ='('  separator=',' close =')' >:item</foreach></script>",
        )
        .unwrap();
        let ScriptItem::Element(el) = &root.children[0] else {
            panic!("expected <foreach>");
        };
        assert_eq!(el.attribute("item"), Some("item"));
        assert_eq!(el.attribute("open"), Some("("));
        assert_eq!(el.attribute("separator"), Some(","));
        assert_eq!(el.attribute("close"), Some(")"));
    }

    #[test]
    fn bare_angle_brackets_are_text() {
        let root = parse_script("<script>SELECT * FROM t WHERE a < 3 AND b <> c</script>").unwrap();
        assert_eq!(
            root.children,
            vec![ScriptItem::Text("SELECT * FROM t WHERE a < 3 AND b <> c".into())]
        );
    }

    #[test]
    fn entities_and_cdata() {
        let root = parse_script(
            r#"<script><if test="n &lt; 3">a &gt;= 1</if><![CDATA[ AND x < 2 ]]></script>"#,
        )
        .unwrap();
        let ScriptItem::Element(el) = &root.children[0] else {
            panic!("expected <if>");
        };
        assert_eq!(el.attribute("test"), Some("n < 3"));
        assert_eq!(el.children, vec![ScriptItem::Text("a >= 1".into())]);
        assert_eq!(root.children[1], ScriptItem::Text(" AND x < 2 ".into()));
    }

    #[test]
    fn self_closing_bind() {
        let root =
            parse_script(r#"<script><bind name="p" value="'%' + t + '%'"/>x</script>"#).unwrap();
        let ScriptItem::Element(el) = &root.children[0] else {
            panic!("expected <bind>");
        };
        assert_eq!(el.tag, "bind");
        assert!(el.children.is_empty());
    }

    #[test]
    fn text_without_envelope_is_accepted() {
        let root = parse_script("SELECT 1").unwrap();
        assert_eq!(root.children, vec![ScriptItem::Text("SELECT 1".into())]);
    }

    #[test]
    fn structural_errors() {
        for bad in [
            "<script><if test='a'>x</script>",
            "<script><if test='a'>x</where></script>",
            "<script>x",
            "<script><if test=a>x</if></script>",
            "<script><![CDATA[x</script>",
        ] {
            assert!(parse_script(bad).unwrap_err().is_configuration(), "{bad}");
        }
    }
}
