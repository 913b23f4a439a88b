use scraper::{Html, Node};

/// Elements whose text never reaches the reader
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Collects the visible text nodes of an HTML document
///
/// Each node is trimmed and blank nodes are left out. Nodes are kept apart so
/// a heading never runs into the paragraph after it.
pub fn text_nodes(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut nodes = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }

        let text = text.trim();
        if !text.is_empty() {
            nodes.push(text.to_string());
        }
    }

    nodes
}
