use std::collections::HashMap;
use std::sync::Arc;

use crate::tree::{Document, NodeData, NodeId};

/// Attributes with this prefix are editor decoration and never persisted.
pub const UI_ATTR_PREFIX: &str = "data-ui-";

/// Contract implemented by content blocks (images, embeds) that need custom
/// persistence or are structurally childless.
pub trait ContentPlugin: Send + Sync {
    fn tag(&self) -> &'static str;

    /// Custom markup for `node`. When `Some`, the subtree is not visited.
    fn serialize(&self, _doc: &Document, _node: NodeId) -> Option<String> {
        None
    }

    fn is_void(&self) -> bool {
        false
    }
}

#[derive(Clone)]
pub struct Serializer {
    ui_only_tag: String,
    plugins: HashMap<&'static str, Arc<dyn ContentPlugin>>,
}

impl Serializer {
    pub fn new(ui_only_tag: impl Into<String>) -> Self {
        Self {
            ui_only_tag: ui_only_tag.into(),
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Arc<dyn ContentPlugin>) {
        self.plugins.insert(plugin.tag(), plugin);
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn ContentPlugin>> {
        self.plugins.values()
    }

    pub fn ui_only_tag(&self) -> &str {
        &self.ui_only_tag
    }

    /// Markup of the whole document (the root's children).
    pub fn serialize(&self, doc: &Document) -> String {
        self.serialize_fragment(doc, doc.children(doc.root()))
    }

    pub fn serialize_fragment(&self, doc: &Document, nodes: &[NodeId]) -> String {
        let mut out = String::new();
        for node in nodes {
            self.serialize_node_into(doc, *node, &mut out);
        }
        out
    }

    pub fn serialize_node(&self, doc: &Document, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize_node_into(doc, node, &mut out);
        out
    }

    fn serialize_node_into(&self, doc: &Document, node: NodeId, out: &mut String) {
        let Some(data) = doc.data(node) else {
            return;
        };
        let (tag, attrs) = match data {
            NodeData::Text(text) => {
                escape_into(text, out);
                return;
            }
            NodeData::Element { tag, attrs } => (tag, attrs),
        };
        if *tag == self.ui_only_tag {
            return;
        }
        if let Some(custom) = self
            .plugins
            .get(tag.as_str())
            .and_then(|plugin| plugin.serialize(doc, node))
        {
            out.push_str(&custom);
            return;
        }

        out.push('<');
        out.push_str(tag);
        for (key, value) in attrs {
            if key.starts_with(UI_ATTR_PREFIX) {
                continue;
            }
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(value, out);
            out.push('"');
        }

        let children = doc.children(node);
        if children.iter().all(|child| self.renders_nothing(doc, *child)) {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in children {
            self.serialize_node_into(doc, *child, out);
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    /// Children that leave no trace in the output. Their parent self-closes
    /// so that reading the markup back yields the same element.
    fn renders_nothing(&self, doc: &Document, node: NodeId) -> bool {
        match doc.data(node) {
            Some(NodeData::Text(text)) => text.is_empty(),
            Some(NodeData::Element { tag, .. }) => *tag == self.ui_only_tag,
            None => true,
        }
    }
}

pub(crate) fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_into;

    struct Embed;

    impl ContentPlugin for Embed {
        fn tag(&self) -> &'static str {
            "x-embed"
        }

        fn serialize(&self, doc: &Document, node: NodeId) -> Option<String> {
            Some(format!(
                "<x-embed src=\"{}\"/>",
                doc.attr(node, "src").unwrap_or_default()
            ))
        }
    }

    fn serializer() -> Serializer {
        let mut serializer = Serializer::new("editor-ui");
        serializer.register(Arc::new(Embed));
        serializer
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut doc = Document::new();
        let p = doc.element("p");
        doc.set_attr(p, "title", "a\"b");
        let t = doc.create_text("<&'>");
        doc.append(p, t).unwrap();
        let root = doc.root();
        doc.append(root, p).unwrap();
        assert_eq!(
            serializer().serialize(&doc),
            "<p title=\"a&quot;b\">&lt;&amp;&#39;&gt;</p>"
        );
    }

    #[test]
    fn skips_ui_nodes_and_ui_attributes() {
        let mut doc = Document::new();
        let root = doc.root();
        parse_into(
            &mut doc,
            root,
            "<p data-ui-selected=\"true\">a<editor-ui><b>hidden</b></editor-ui></p><br>",
        )
        .unwrap();
        assert_eq!(serializer().serialize(&doc), "<p>a</p><br/>");
    }

    #[test]
    fn element_with_only_ui_children_self_closes() {
        let mut doc = Document::new();
        let root = doc.root();
        parse_into(&mut doc, root, "<p>a<span><editor-ui>x</editor-ui></span></p>").unwrap();
        let out = serializer().serialize(&doc);
        assert_eq!(out, "<p>a<span/></p>");

        let mut reparsed = Document::new();
        let root = reparsed.root();
        parse_into(&mut reparsed, root, &out).unwrap();
        assert_eq!(serializer().serialize(&reparsed), out);
    }

    #[test]
    fn custom_serializer_replaces_subtree() {
        let mut doc = Document::new();
        let root = doc.root();
        parse_into(&mut doc, root, "<x-embed src=\"v\"><p>preview</p></x-embed>").unwrap();
        let out = serializer().serialize(&doc);
        assert_eq!(out, "<x-embed src=\"v\"/>");

        let mut reparsed = Document::new();
        let root = reparsed.root();
        parse_into(&mut reparsed, root, &out).unwrap();
        assert_eq!(serializer().serialize(&reparsed), out);
    }
}
