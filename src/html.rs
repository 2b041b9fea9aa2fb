const VOID_ELEMENTS: &[&str] = &["area", "br", "hr", "img", "input", "link", "meta", "source"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

/// Builds an element from a tag, attribute pairs and children.
pub fn el(tag: &str, attrs: &[(&str, &str)], children: Vec<Node>) -> Element {
    Element {
        tag: tag.to_string(),
        attrs: attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        children,
    }
}

pub fn text(s: impl Into<String>) -> Node {
    Node::Text(s.into())
}

impl From<Element> for Node {
    fn from(e: Element) -> Self {
        Node::Element(e)
    }
}

impl Element {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn append(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v));
            out.push('"');
        }
        out.push('>');
        if VOID_ELEMENTS.contains(&self.tag.as_str()) {
            return;
        }
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(&escape(t)),
                Node::Element(e) => e.write_to(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

// Text and attribute values always go through here
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_elements() {
        let e = el(
            "div",
            &[("class", "card-meta")],
            vec![
                el("div", &[("class", "card-title")], vec![text("Moths")]).into(),
                el("img", &[("src", "a.png")], vec![]).into(),
            ],
        );
        assert_eq!(
            r#"<div class="card-meta"><div class="card-title">Moths</div><img src="a.png"></div>"#,
            e.render()
        );
        assert_eq!("Moths", e.text_content());
    }

    #[test]
    fn escapes_text_and_attributes() {
        let e = el(
            "p",
            &[("title", "\"quoted\" & 'single'")],
            vec![text("<b>bold</b>")],
        );
        assert_eq!(
            "<p title=\"&quot;quoted&quot; &amp; &#39;single&#39;\">&lt;b&gt;bold&lt;/b&gt;</p>",
            e.render()
        );
    }

    #[test]
    fn append_and_lookup() {
        let mut e = el("section", &[("id", "rackGrid")], vec![]);
        e.append(text("x"));
        assert_eq!(Some("rackGrid"), e.attr("id"));
        assert_eq!(None, e.attr("class"));
        assert_eq!(1, e.children().len());
        assert_eq!("section", e.tag());
    }
}
