//! Named markup templates and `${name}` placeholder substitution.

use crate::element::Element;
use indexmap::IndexMap;
use tracing::debug;

/// Flat property mapping used to fill placeholders.
pub type Props = IndexMap<String, String>;

/// Templates collected from a container, keyed by lower-cased name.
#[derive(Debug)]
pub struct TemplateRepository {
    attribute: String,
    templates: IndexMap<String, Element>,
}

impl TemplateRepository {
    /// `attribute` names the marker carrying a template's name (`u-control`).
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            templates: IndexMap::new(),
        }
    }

    /// Collect every node in `root`'s subtree that carries the template
    /// marker. A later template with the same name replaces an earlier one.
    pub fn load(&mut self, root: &Element) -> usize {
        let mut found = 0;
        for el in root.subtree() {
            if let Some(name) = el.attribute(&self.attribute) {
                self.templates.insert(name.to_lowercase(), el);
                found += 1;
            }
        }
        debug!(found, total = self.templates.len(), "templates loaded");
        found
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.templates.get(&name.to_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Clone the named template and fill its placeholders.
    pub fn instantiate(&self, name: &str, props: &Props) -> Option<Element> {
        let copy = self.get(name)?.deep_clone();
        set_placeholders(&copy, props);
        Some(copy)
    }
}

/// Replace every `${name}` in `text` with `props[name]`. Tokens without a
/// matching prop are left as they are.
pub fn fill(text: &str, props: &Props) -> String {
    if !text.contains("${") {
        return text.to_string();
    }
    props.iter().fold(text.to_string(), |acc, (name, value)| {
        acc.replace(&format!("${{{name}}}"), value)
    })
}

/// Fill placeholders in text nodes and attribute values of a subtree.
/// Filled attributes are mirrored onto same-named properties.
pub fn set_placeholders(node: &Element, props: &Props) {
    if node.is_text() {
        let text = node.text_content();
        let filled = fill(&text, props);
        if filled != text {
            node.set_text_content(filled);
        }
        return;
    }
    for (name, value) in node.attributes() {
        if value.contains("${") {
            let filled = fill(&value, props);
            node.set_attribute(&name, filled.clone());
            node.set_property(&name, filled);
        }
    }
    for child in node.children() {
        set_placeholders(&child, props);
    }
}
