//! Tolerant reader for the markup produced by [`crate::serialize`].
//!
//! Unknown tags are kept as-is, unmatched end tags are ignored and elements
//! left open at the end of input are closed implicitly. No implicit
//! reparenting is performed, so `serialize(parse(serialize(t)))` is stable.

use crate::error::{EditorError, Result};
use crate::tree::{Attrs, Document, NodeId};

/// Parses `html` and appends the resulting nodes to `parent`.
pub fn parse_into(doc: &mut Document, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
    let tokens = tokenize(html)?;
    let first_new = doc.children(parent).len();
    let mut stack: Vec<(String, NodeId)> = Vec::new();
    let mut last_text: Option<NodeId> = None;

    for token in tokens {
        let current = stack.last().map(|(_, id)| *id).unwrap_or(parent);
        match token {
            Token::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                match last_text.and_then(|leaf| doc.text_mut(leaf)) {
                    Some(existing) => existing.push_str(&text),
                    None => {
                        let leaf = doc.create_text(text);
                        doc.append(current, leaf)?;
                        last_text = Some(leaf);
                    }
                }
            }
            Token::Open {
                tag,
                attrs,
                self_closing,
            } => {
                last_text = None;
                let node = doc.create_element(tag.clone(), attrs);
                doc.append(current, node)?;
                if !self_closing && !doc.is_void_tag(&tag) {
                    stack.push((tag, node));
                }
            }
            Token::Close(tag) => {
                last_text = None;
                if let Some(depth) = stack.iter().rposition(|(open, _)| *open == tag) {
                    stack.truncate(depth);
                }
            }
        }
    }

    Ok(doc.children(parent)[first_new..].to_vec())
}

/// Parses `html` into a detached fragment container.
pub fn parse_fragment(doc: &mut Document, html: &str) -> Result<NodeId> {
    let fragment = doc.create_fragment();
    if let Err(err) = parse_into(doc, fragment, html) {
        doc.remove(fragment);
        return Err(err);
    }
    Ok(fragment)
}

#[derive(Debug, PartialEq)]
enum Token {
    Text(String),
    Open {
        tag: String,
        attrs: Attrs,
        self_closing: bool,
    },
    Close(String),
}

fn tokenize(html: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(decode_entities(rest)));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(decode_entities(&rest[..lt])));
        }
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| EditorError::MalformedFragment("unterminated comment".into()))?;
            rest = &after[end + 3..];
            continue;
        }

        let next = rest[1..].chars().next();
        let is_tag = matches!(next, Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!');
        if !is_tag {
            tokens.push(Token::Text("<".to_string()));
            rest = &rest[1..];
            continue;
        }

        let end = find_tag_end(rest)
            .ok_or_else(|| EditorError::MalformedFragment("unterminated tag".into()))?;
        let inner = &rest[1..end];
        rest = &rest[end + 1..];

        if inner.starts_with('!') || inner.starts_with('?') {
            continue;
        }
        if let Some(name) = inner.strip_prefix('/') {
            tokens.push(Token::Close(name.trim().to_ascii_lowercase()));
            continue;
        }
        tokens.push(parse_open_tag(inner));
    }

    Ok(tokens)
}

/// Index of the `>` closing the tag at the start of `s`, skipping quoted
/// attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (ix, c) in s.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(ix),
            None => {}
        }
    }
    None
}

fn parse_open_tag(inner: &str) -> Token {
    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(stripped) => (stripped, true),
        None => (inner, false),
    };
    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    let tag = inner[..name_end].to_ascii_lowercase();
    let attrs = parse_attrs(&inner[name_end..]);
    Token::Open {
        tag,
        attrs,
        self_closing,
    }
}

fn parse_attrs(mut s: &str) -> Attrs {
    let mut attrs = Attrs::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            break;
        }
        let name_end = s
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(s.len());
        let name = s[..name_end].to_ascii_lowercase();
        s = s[name_end..].trim_start();

        let value = if let Some(after_eq) = s.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(q @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let close = body.find(q).unwrap_or(body.len());
                    s = body.get(close + 1..).unwrap_or("");
                    decode_entities(&body[..close])
                }
                _ => {
                    let end = after_eq
                        .find(|c: char| c.is_whitespace())
                        .unwrap_or(after_eq.len());
                    s = &after_eq[end..];
                    decode_entities(&after_eq[..end])
                }
            }
        } else {
            String::new()
        };

        if !name.is_empty() {
            attrs.insert(name, value);
        }
    }
    attrs
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = rest
            .char_indices()
            .take(12)
            .find(|(_, c)| *c == ';')
            .map(|(ix, _)| ix);
        let Some(semi) = semi else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        match decode_entity(&rest[1..semi]) {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_markup_with_attributes() {
        let mut doc = Document::new();
        let root = doc.root();
        let nodes = parse_into(
            &mut doc,
            root,
            r#"<p class="x" data-a='1 &amp; 2'>a<b>b</b><br>c</p>"#,
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
        let p = nodes[0];
        assert_eq!(doc.attr(p, "class"), Some("x"));
        assert_eq!(doc.attr(p, "data-a"), Some("1 & 2"));
        assert_eq!(doc.children(p).len(), 4);
        assert_eq!(doc.tag(doc.child(p, 2).unwrap()), Some("br"));
        assert_eq!(doc.text_content(p), "abc");
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        let mut doc = Document::new();
        let root = doc.root();
        let nodes = parse_into(&mut doc, root, "<p>a</i>b</p></div>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(doc.text_content(nodes[0]), "ab");
    }

    #[test]
    fn unterminated_tag_is_malformed() {
        let mut doc = Document::new();
        assert!(matches!(
            parse_fragment(&mut doc, "<p class=\"x"),
            Err(EditorError::MalformedFragment(_))
        ));
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let mut doc = Document::new();
        let fragment = parse_fragment(&mut doc, "1 < 2 &#x41;").unwrap();
        assert_eq!(doc.text_content(fragment), "1 < 2 A");
    }
}
