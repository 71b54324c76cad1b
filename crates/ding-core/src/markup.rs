//! Minimal markup reader and writer for template fragments.
//!
//! Handles the subset templates use: elements with quoted, unquoted or bare
//! attributes, self-closing and void elements, text and comments. Text that
//! is only whitespace between tags is dropped.

use crate::element::Element;

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

/// A fragment could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),
    #[error("expected a tag name at byte {0}")]
    MissingTagName(usize),
    #[error("closing tag </{found}> at byte {at} does not match <{expected}>")]
    MismatchedClose {
        expected: String,
        found: String,
        at: usize,
    },
    #[error("closing tag </{0}> has no matching open tag")]
    UnexpectedClose(String),
    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// Read a fragment into a list of top-level nodes.
pub fn parse_fragment(input: &str) -> Result<Vec<Element>, MarkupError> {
    Parser { input, pos: 0 }.run()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<Vec<Element>, MarkupError> {
        let mut roots = Vec::new();
        // open elements, innermost last
        let mut stack: Vec<Element> = Vec::new();

        while self.pos < self.input.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let end = rest
                    .find("-->")
                    .ok_or(MarkupError::UnexpectedEnd(self.input.len()))?;
                self.pos += end + 3;
            } else if rest.starts_with("</") {
                let at = self.pos;
                self.pos += 2;
                let name = self.read_name();
                self.skip_whitespace();
                self.expect('>')?;
                let open = stack
                    .pop()
                    .ok_or_else(|| MarkupError::UnexpectedClose(name.clone()))?;
                let expected = open.tag().unwrap_or_default().to_string();
                if expected != name {
                    return Err(MarkupError::MismatchedClose {
                        expected,
                        found: name,
                        at,
                    });
                }
                Self::place(open, &mut stack, &mut roots);
            } else if rest.starts_with('<') {
                let (el, open) = self.read_start_tag()?;
                if open {
                    stack.push(el);
                } else {
                    Self::place(el, &mut stack, &mut roots);
                }
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = &rest[..end];
                self.pos += end;
                if !text.trim().is_empty() {
                    Self::place(Element::text(decode_entities(text)), &mut stack, &mut roots);
                }
            }
        }

        match stack.pop() {
            Some(open) => Err(MarkupError::Unclosed(
                open.tag().unwrap_or_default().to_string(),
            )),
            None => Ok(roots),
        }
    }

    fn place(node: Element, stack: &mut [Element], roots: &mut Vec<Element>) {
        match stack.last() {
            Some(parent) => parent.append_child(&node),
            None => roots.push(node),
        }
    }

    // Returns the element and whether it stays open for children.
    fn read_start_tag(&mut self) -> Result<(Element, bool), MarkupError> {
        self.pos += 1;
        let name = self.read_name();
        if name.is_empty() {
            return Err(MarkupError::MissingTagName(self.pos));
        }
        let el = Element::new(&name);
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok((el, false));
            }
            if rest.starts_with('>') {
                self.pos += 1;
                let open = !VOID_ELEMENTS.contains(&name.as_str());
                return Ok((el, open));
            }
            if rest.is_empty() {
                return Err(MarkupError::UnexpectedEnd(self.pos));
            }
            let attr = self.read_name();
            if attr.is_empty() {
                return Err(MarkupError::MissingTagName(self.pos));
            }
            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.read_value()?
            } else {
                String::new()
            };
            el.set_attribute(&attr, value);
        }
    }

    fn read_value(&mut self) -> Result<String, MarkupError> {
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body
                    .find(quote)
                    .ok_or(MarkupError::UnexpectedEnd(self.input.len()))?;
                self.pos += end + 2;
                Ok(decode_entities(&body[..end]))
            }
            Some(_) => {
                let mut end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                // `<i class=x/>` closes the tag; the slash is not part of the value
                if end > 1 && rest[end..].starts_with('>') && rest[..end].ends_with('/') {
                    end -= 1;
                }
                self.pos += end;
                Ok(decode_entities(&rest[..end]))
            }
            None => Err(MarkupError::UnexpectedEnd(self.pos)),
        }
    }

    fn read_name(&mut self) -> String {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
            .unwrap_or(rest.len());
        self.pos += end;
        rest[..end].to_lowercase()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn expect(&mut self, c: char) -> Result<(), MarkupError> {
        if self.rest().starts_with(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(MarkupError::UnexpectedEnd(self.pos))
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn encode_entities(text: &str, attribute: bool) -> String {
    let out = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    if attribute {
        out.replace('"', "&quot;")
    } else {
        out
    }
}

/// Serialize a node and its subtree.
pub fn render(node: &Element) -> String {
    let mut out = String::new();
    render_into(node, &mut out);
    out
}

fn render_into(node: &Element, out: &mut String) {
    let Some(tag) = node.tag() else {
        out.push_str(&encode_entities(&node.text_content(), false));
        return;
    };
    out.push('<');
    out.push_str(tag);
    for (name, value) in node.attributes() {
        out.push(' ');
        out.push_str(&name);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&encode_entities(&value, true));
            out.push('"');
        }
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&tag) {
        return;
    }
    for child in node.children() {
        render_into(&child, out);
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_elements_and_attributes() {
        let nodes = parse_fragment(
            r#"<div u-control="timer" class='card' hidden data-x=1>
                 <span u-text="waittime">${waittime}</span>
                 <input u-value="pulsetime"/>
                 <br>
               </div>"#,
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
        let div = &nodes[0];
        assert_eq!(div.tag(), Some("div"));
        assert_eq!(div.attribute("u-control").as_deref(), Some("timer"));
        assert_eq!(div.attribute("class").as_deref(), Some("card"));
        assert_eq!(div.attribute("hidden").as_deref(), Some(""));
        assert_eq!(div.attribute("data-x").as_deref(), Some("1"));

        let tags: Vec<_> = div
            .children()
            .iter()
            .map(|c| c.tag().unwrap().to_string())
            .collect();
        assert_eq!(tags, vec!["span", "input", "br"]);
        assert_eq!(div.text_content(), "${waittime}");
    }

    #[test]
    fn skips_comments_and_decodes_entities() {
        let nodes = parse_fragment("<!-- note --><p title=\"a&amp;b\">1 &lt; 2</p>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].attribute("title").as_deref(), Some("a&b"));
        assert_eq!(nodes[0].text_content(), "1 < 2");
    }

    #[test]
    fn unquoted_values_may_contain_slashes() {
        let nodes = parse_fragment("<a href=/x/y>go</a><i class=dot/><p data-u=/></p>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].attribute("href").as_deref(), Some("/x/y"));
        assert_eq!(nodes[0].text_content(), "go");
        assert_eq!(nodes[1].attribute("class").as_deref(), Some("dot"));
        assert!(nodes[1].children().is_empty());
        assert_eq!(nodes[2].attribute("data-u").as_deref(), Some("/"));
    }

    #[test]
    fn several_roots() {
        let nodes = parse_fragment("<a></a> <b></b>").unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn mismatched_close_is_an_error() {
        let err = parse_fragment("<div><span></div>").unwrap_err();
        assert!(matches!(err, MarkupError::MismatchedClose { ref expected, .. } if expected == "span"));
    }

    #[test]
    fn unclosed_and_stray_tags_are_errors() {
        assert_eq!(
            parse_fragment("<div>").unwrap_err(),
            MarkupError::Unclosed("div".into())
        );
        assert_eq!(
            parse_fragment("</div>").unwrap_err(),
            MarkupError::UnexpectedClose("div".into())
        );
    }

    #[test]
    fn render_writes_markup_back() {
        let nodes =
            parse_fragment(r#"<div class="x" hidden><span>a &amp; b</span><br></div>"#).unwrap();
        assert_eq!(
            render(&nodes[0]),
            r#"<div class="x" hidden><span>a &amp; b</span><br></div>"#
        );
    }
}
