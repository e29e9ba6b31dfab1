// Rendering the tree for output

use crate::tree::{Node, WebTree};
use html_escape::encode_text;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    String,
    Html,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "string" | "text" | "txt" => Some(OutputFormat::String),
            "html" => Some(OutputFormat::Html),
            "json" | "object" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

pub fn render(tree: &WebTree, format: OutputFormat) -> String {
    match format {
        OutputFormat::String => tree.to_string(),
        OutputFormat::Html => html(tree),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&tree.to_object()).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

const STYLE: &str = r#"
body { font-family: monospace; }
.web-tree-btn { display: block; background: none; border: none; cursor: pointer; font: inherit; padding: 2px 0; }
.web-tree-btn::before { content: "+ "; }
.web-tree-btn.active::before { content: "- "; }
.web-tree-div { display: none; margin-left: 1.5em; }
.web-tree-leaf { display: block; padding: 2px 0 2px 1.2em; }
"#;

// Toggles a node open or closed. Closing a node also collapses everything
// beneath it.
const SCRIPT: &str = r#"
for (const btn of document.getElementsByClassName('web-tree-btn')) {
  btn.addEventListener('click', () => {
    const div = btn.nextElementSibling
    const opening = !btn.classList.contains('active')
    btn.classList.toggle('active', opening)
    div.style.display = opening ? 'block' : 'none'
    if (opening) return
    for (const inner of div.querySelectorAll('.web-tree-btn')) inner.classList.remove('active')
    for (const inner of div.querySelectorAll('.web-tree-div')) inner.style.display = 'none'
  })
}
"#;

/// Standalone page with a collapsible outline of the tree.
pub fn html(tree: &WebTree) -> String {
    let mut body = String::new();
    for (label, node) in tree.roots() {
        html_host(label, node, &mut body);
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>webtree</title>\n<style>{}</style>\n</head>\n<body>\n{}<script>{}</script>\n</body>\n</html>\n",
        STYLE, body, SCRIPT
    )
}

fn html_host(label: &str, node: &Node, out: &mut String) {
    let text = format!(".{}", encode_text(label));
    html_entry(&text, node.is_leaf(), out, |out| {
        for (segment, child) in &node.subpaths {
            html_path(segment, child, out);
        }
        for (label, child) in &node.subdomains {
            html_host(label, child, out);
        }
    });
}

fn html_path(segment: &str, node: &Node, out: &mut String) {
    let text = format!("/{}", encode_text(segment));
    html_entry(&text, node.subpaths.is_empty(), out, |out| {
        for (segment, child) in &node.subpaths {
            html_path(segment, child, out);
        }
    });
}

fn html_entry(text: &str, leaf: bool, out: &mut String, children: impl FnOnce(&mut String)) {
    if leaf {
        out.push_str(&format!("<span class=\"web-tree-leaf\">{}</span>\n", text));
        return;
    }

    out.push_str(&format!("<button class=\"web-tree-btn\">{}</button>\n", text));
    out.push_str("<div class=\"web-tree-div\">\n");
    children(out);
    out.push_str("</div>\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WebTree {
        let mut tree = WebTree::new();
        tree.set("https://foo.com");
        tree.set("http://bar.foo.com/a");
        tree
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from_str("HTML"), Some(OutputFormat::Html));
        assert_eq!(OutputFormat::from_str("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("string"), Some(OutputFormat::String));
        assert_eq!(OutputFormat::from_str("csv"), None);
    }

    #[test]
    fn test_html_structure() {
        let page = html(&sample());

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<button class=\"web-tree-btn\">.com</button>"));
        assert!(page.contains("<button class=\"web-tree-btn\">.bar</button>"));
        assert!(page.contains("<span class=\"web-tree-leaf\">/a</span>"));
        assert_eq!(
            page.matches("<div class=\"web-tree-div\">").count(),
            page.matches("<button").count()
        );
    }

    #[test]
    fn test_html_escapes_labels() {
        let mut tree = WebTree::new();
        tree.set("https://foo.com/%3Cscript%3E");
        tree.set("https://foo.com/a&b");

        let page = html(&tree);
        assert!(page.contains("/a&amp;b"));
        assert!(page.contains("/%3Cscript%3E"));
    }

    #[test]
    fn test_json_render_matches_object() {
        let tree = sample();
        let rendered: serde_json::Value =
            serde_json::from_str(&render(&tree, OutputFormat::Json)).unwrap();
        assert_eq!(rendered, tree.to_object());
    }
}
