//! Diagnostic route listing.
//!
//! Walks the tree independently of the materializer but with the same
//! placement rules, so the listing is exactly the set of routes the
//! dispatcher ends up serving. Printing never touches the tree.

use std::fmt;
use std::io::{self, Write};

use crate::routing::tree::{Method, RouteNode, RouteTree};

/// How a node lands on the dispatcher given its concatenated path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Grouping node mounted as its own dispatcher scope.
    Mount,
    /// Handler-bearing node registered at the given path.
    Endpoint(Method),
    /// Grouping node that only forwards its path to the children.
    PassThrough,
}

pub(crate) fn placement<S>(node: &RouteNode<S>, current_path: &str) -> Placement {
    match node.method() {
        Some(method) => Placement::Endpoint(method),
        None if !node.children().is_empty() && !current_path.is_empty() && current_path != "/" => {
            Placement::Mount
        }
        None => Placement::PassThrough,
    }
}

/// Path an endpoint is registered under inside its scope.
pub(crate) fn endpoint_path(current_path: &str) -> &str {
    if current_path.is_empty() {
        "/"
    } else {
        current_path
    }
}

/// Full path of `path` registered inside a scope mounted at `prefix`.
///
/// Mirrors the dispatcher: a scope-root `/` collapses onto the prefix.
pub(crate) fn nested_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_owned()
    } else if prefix.ends_with('/') {
        format!("{prefix}{}", path.trim_start_matches('/'))
    } else if path == "/" {
        prefix.to_owned()
    } else {
        format!("{prefix}{path}")
    }
}

/// A concrete `(method, full path)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Every concrete route in the tree, in registration order.
pub fn collect_routes<S>(tree: &RouteTree<S>) -> Vec<RouteEntry> {
    let mut entries = Vec::new();
    collect_node(tree.root(), "", "", &mut entries);
    entries
}

fn collect_node<S>(node: &RouteNode<S>, base_path: &str, mount_prefix: &str, out: &mut Vec<RouteEntry>) {
    let current_path = format!("{base_path}{}", node.segment());

    match placement(node, &current_path) {
        Placement::Mount => {
            let prefix = nested_path(mount_prefix, &current_path);
            for child in node.children() {
                collect_node(child, "", &prefix, out);
            }
        }
        Placement::Endpoint(method) => out.push(RouteEntry {
            method,
            path: nested_path(mount_prefix, endpoint_path(&current_path)),
        }),
        Placement::PassThrough => {
            for child in node.children() {
                collect_node(child, &current_path, mount_prefix, out);
            }
        }
    }
}

/// Write one `  METHOD /full/path` line per route.
pub fn write_routes<S, W: Write>(tree: &RouteTree<S>, writer: &mut W) -> io::Result<()> {
    for entry in collect_routes(tree) {
        writeln!(writer, "  {entry}")?;
    }
    Ok(())
}

pub fn format_routes<S>(tree: &RouteTree<S>) -> String {
    collect_routes(tree)
        .iter()
        .map(|entry| format!("  {entry}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok() -> &'static str {
        "ok"
    }

    fn paths(tree: &RouteTree<()>) -> Vec<String> {
        collect_routes(tree).into_iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_nested_concatenation() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/a", |a| {
            a.route("/b", |b| {
                b.get("/c", ok);
            });
        });
        assert_eq!(paths(&tree), vec!["GET /a/b/c"]);
    }

    #[test]
    fn test_concatenation_independent_of_grouping() {
        let mut flat: RouteTree<()> = RouteTree::new();
        flat.root_mut().route("/a/b", |ab| {
            ab.get("/c", ok);
        });

        let mut split: RouteTree<()> = RouteTree::new();
        split.root_mut().route("/a", |a| {
            a.route("/b", |b| {
                b.get("/c", ok);
            });
        });

        assert_eq!(paths(&flat), paths(&split));
    }

    #[test]
    fn test_pass_through_groups_forward_path() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("", |organizing| {
            organizing.route("/x", |x| {
                x.post("/y", ok);
            });
            organizing.get("/z", ok);
        });
        tree.root_mut().route("/unused", |_| {});

        assert_eq!(paths(&tree), vec!["POST /x/y", "GET /z"]);
    }

    #[test]
    fn test_empty_segment_endpoint_lands_on_scope() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/items", |items| {
            items.get("", ok);
            items.delete("/", ok);
        });
        tree.root_mut().get("", ok);

        assert_eq!(paths(&tree), vec!["GET /items", "DELETE /items", "GET /"]);
    }

    #[test]
    fn test_printing_is_idempotent() {
        let mut tree: RouteTree<()> = RouteTree::new();
        tree.root_mut().route("/api/v1", |api| {
            api.get("/health", ok);
            api.put("/things/{id}", ok);
        });

        let mut first = Vec::new();
        let mut second = Vec::new();
        write_routes(&tree, &mut first).unwrap();
        write_routes(&tree, &mut second).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            String::from_utf8(first).unwrap(),
            "  GET /api/v1/health\n  PUT /api/v1/things/{id}\n"
        );
        assert_eq!(format_routes(&tree), String::from_utf8(second).unwrap());
    }

    #[test]
    fn test_nested_path_rules() {
        assert_eq!(nested_path("", "/a"), "/a");
        assert_eq!(nested_path("/api", "/"), "/api");
        assert_eq!(nested_path("/api", "/x"), "/api/x");
        assert_eq!(nested_path("/api/", "/x"), "/api/x");
    }
}
