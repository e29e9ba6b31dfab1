// Host/path tree of visited URLs

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;
use webtree_scanner::SiteMap;

/// One host label or one path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub subdomains: BTreeMap<String, Node>,
    pub subpaths: BTreeMap<String, Node>,
    /// This exact host + path was visited.
    pub visited: bool,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.subdomains.is_empty() && self.subpaths.is_empty()
    }
}

/// Every visited URL, keyed by reversed host labels and then path segments.
///
/// `https://bar.foo.com/a/b` lives at `com → foo → bar` (subdomains) and then
/// `a → b` (subpaths of `bar`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebTree {
    roots: BTreeMap<String, Node>,
}

impl WebTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &BTreeMap<String, Node> {
        &self.roots
    }

    /// Record a URL. Unparseable and host-less URLs are ignored.
    pub fn set(&mut self, url: &str) {
        let Some((labels, segments)) = split_url(url) else {
            return;
        };

        let mut labels = labels.into_iter();
        let Some(first) = labels.next() else {
            return;
        };

        let mut node = self.roots.entry(first).or_default();
        for label in labels {
            node = node.subdomains.entry(label).or_default();
        }
        for segment in segments {
            node = node.subpaths.entry(segment).or_default();
        }

        node.visited = true;
    }

    /// Look up the node for a URL, if it has been created.
    pub fn get(&self, url: &str) -> Option<&Node> {
        let (labels, segments) = split_url(url)?;

        let mut labels = labels.iter();
        let mut node = self.roots.get(labels.next()?)?;
        for label in labels {
            node = node.subdomains.get(label)?;
        }
        for segment in &segments {
            node = node.subpaths.get(segment)?;
        }

        Some(node)
    }

    /// Whether this exact URL was recorded with `set`.
    pub fn contains(&self, url: &str) -> bool {
        self.get(url).is_some_and(|node| node.visited)
    }

    /// Number of visited host + path combinations.
    pub fn len(&self) -> usize {
        fn count(node: &Node) -> usize {
            usize::from(node.visited)
                + node.subdomains.values().map(count).sum::<usize>()
                + node.subpaths.values().map(count).sum::<usize>()
        }

        self.roots.values().map(count).sum()
    }

    /// Nested-object view. Host nodes carry `subdomains` and `path.subpaths`,
    /// path nodes carry `subpaths`. Empty children are omitted.
    pub fn to_object(&self) -> Value {
        let mut root = Map::new();
        for (label, node) in &self.roots {
            root.insert(label.clone(), host_object(node));
        }
        Value::Object(root)
    }

    pub fn to_html(&self) -> String {
        crate::render::html(self)
    }
}

impl SiteMap for WebTree {
    fn set(&mut self, url: &str) {
        WebTree::set(self, url);
    }
}

impl Serialize for WebTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(serializer)
    }
}

/// Indented outline: two spaces per level, hosts as `.label`, paths as
/// `/segment`, each node's paths before its subdomains.
impl fmt::Display for WebTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        for (label, node) in &self.roots {
            outline_host(label, node, 0, &mut lines);
        }
        f.write_str(&lines.join("\n"))
    }
}

fn split_url(url: &str) -> Option<(Vec<String>, Vec<String>)> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    let labels: Vec<String> = host
        .split('.')
        .filter(|label| !label.is_empty())
        .rev()
        .map(str::to_string)
        .collect();

    let segments: Vec<String> = parsed
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();

    Some((labels, segments))
}

fn host_object(node: &Node) -> Value {
    let mut object = Map::new();

    if !node.subdomains.is_empty() {
        let subdomains = node
            .subdomains
            .iter()
            .map(|(label, child)| (label.clone(), host_object(child)))
            .collect();
        object.insert("subdomains".to_string(), Value::Object(subdomains));
    }

    if !node.subpaths.is_empty() {
        let mut path = Map::new();
        path.insert("subpaths".to_string(), subpaths_object(node));
        object.insert("path".to_string(), Value::Object(path));
    }

    Value::Object(object)
}

fn path_object(node: &Node) -> Value {
    let mut object = Map::new();
    if !node.subpaths.is_empty() {
        object.insert("subpaths".to_string(), subpaths_object(node));
    }
    Value::Object(object)
}

fn subpaths_object(node: &Node) -> Value {
    Value::Object(
        node.subpaths
            .iter()
            .map(|(segment, child)| (segment.clone(), path_object(child)))
            .collect(),
    )
}

fn outline_host(label: &str, node: &Node, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!("{}.{}", "  ".repeat(depth), label));
    for (segment, child) in &node.subpaths {
        outline_path(segment, child, depth + 1, lines);
    }
    for (label, child) in &node.subdomains {
        outline_host(label, child, depth + 1, lines);
    }
}

fn outline_path(segment: &str, node: &Node, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!("{}/{}", "  ".repeat(depth), segment));
    for (segment, child) in &node.subpaths {
        outline_path(segment, child, depth + 1, lines);
    }
}
