//! JSON Canvas assembly: one file node, one text node, one edge.
//!
//! ```text
//!  ┌────────────┐        ┌────────────┐
//!  │ file node  │ ─────▶ │ text node  │
//!  │ (the PDF)  │ right  │ (summary)  │
//!  └────────────┘  left  └────────────┘
//! ```
//!
//! Node and edge ids come from an [`IdGenerator`] scoped to one build: a
//! random prefix shared by the canvas plus a counter, so ids within a canvas
//! can never collide.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FILE_NODE_WIDTH: i64 = 400;
pub const FILE_NODE_HEIGHT: i64 = 400;
pub const TEXT_NODE_WIDTH: i64 = 400;
pub const TEXT_NODE_HEIGHT: i64 = 400;
/// Horizontal space between the file node and the text node.
pub const NODE_GAP: i64 = 100;

/// A canvas document: top-level `nodes` and `edges`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
}

/// A positioned node. `kind` is flattened so the JSON reads
/// `{"id":…,"x":…,"type":"file","file":"…"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasNode {
    pub id: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Reference to a file in the vault.
    File { file: String },
    /// Inline Markdown text.
    Text { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasEdge {
    pub id: String,
    pub from_node: String,
    pub from_side: Side,
    pub to_node: String,
    pub to_side: Side,
}

/// Id source for a single canvas.
#[derive(Debug)]
pub struct IdGenerator {
    prefix: String,
    next: u16,
}

impl IdGenerator {
    pub fn new() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self {
            prefix: uuid[..12].to_string(),
            next: 0,
        }
    }

    /// 16 lowercase hex digits, distinct for every call on this generator.
    pub fn next_id(&mut self) -> String {
        let id = format!("{}{:04x}", self.prefix, self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the canvas linking `source_path` to its `summary`.
pub fn build_canvas(source_path: &str, summary: &str) -> Canvas {
    let mut ids = IdGenerator::new();

    let file_node = CanvasNode {
        id: ids.next_id(),
        x: 0,
        y: 0,
        width: FILE_NODE_WIDTH,
        height: FILE_NODE_HEIGHT,
        kind: NodeKind::File {
            file: source_path.to_string(),
        },
    };
    let text_node = CanvasNode {
        id: ids.next_id(),
        x: file_node.x + FILE_NODE_WIDTH + NODE_GAP,
        y: file_node.y,
        width: TEXT_NODE_WIDTH,
        height: TEXT_NODE_HEIGHT,
        kind: NodeKind::Text {
            text: summary.to_string(),
        },
    };
    let edge = CanvasEdge {
        id: ids.next_id(),
        from_node: file_node.id.clone(),
        from_side: Side::Right,
        to_node: text_node.id.clone(),
        to_side: Side::Left,
    };

    Canvas {
        nodes: vec![file_node, text_node],
        edges: vec![edge],
    }
}

impl Canvas {
    /// Serialise to the pretty-printed JSON written to disk.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn layout_places_summary_to_the_right() {
        let canvas = build_canvas("Papers/a.pdf", "A summary.");
        let [file, text] = [&canvas.nodes[0], &canvas.nodes[1]];
        assert_eq!(text.y, file.y);
        assert_eq!(text.x, file.x + file.width + NODE_GAP);
        assert_eq!(
            file.kind,
            NodeKind::File {
                file: "Papers/a.pdf".into()
            }
        );
        assert_eq!(
            text.kind,
            NodeKind::Text {
                text: "A summary.".into()
            }
        );
    }

    #[test]
    fn edge_links_file_right_to_text_left() {
        let canvas = build_canvas("a.pdf", "s");
        let edge = &canvas.edges[0];
        assert_eq!(edge.from_node, canvas.nodes[0].id);
        assert_eq!(edge.to_node, canvas.nodes[1].id);
        assert_eq!(edge.from_side, Side::Right);
        assert_eq!(edge.to_side, Side::Left);
    }

    #[test]
    fn ids_are_distinct() {
        let canvas = build_canvas("a.pdf", "s");
        let ids = [
            &canvas.nodes[0].id,
            &canvas.nodes[1].id,
            &canvas.edges[0].id,
        ];
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[0], ids[2]);
        assert_ne!(ids[1], ids[2]);
        assert!(ids.iter().all(|id| id.len() == 16));
    }

    #[test]
    fn json_shape_matches_canvas_format() {
        let canvas = build_canvas("Papers/a.pdf", "Sum");
        let v: Value = serde_json::from_str(&canvas.to_json().unwrap()).unwrap();

        let nodes = v["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["type"], "file");
        assert_eq!(nodes[0]["file"], "Papers/a.pdf");
        assert_eq!(nodes[1]["type"], "text");
        assert_eq!(nodes[1]["text"], "Sum");
        for key in ["id", "x", "y", "width", "height"] {
            assert!(nodes[0].get(key).is_some(), "missing {key}");
        }

        let edge = &v["edges"][0];
        assert_eq!(edge["fromSide"], "right");
        assert_eq!(edge["toSide"], "left");
        assert_eq!(edge["fromNode"], nodes[0]["id"]);
        assert_eq!(edge["toNode"], nodes[1]["id"]);
    }

    #[test]
    fn canvas_json_parses_back() {
        let canvas = build_canvas("a.pdf", "s");
        let back: Canvas = serde_json::from_str(&canvas.to_json().unwrap()).unwrap();
        assert_eq!(back, canvas);
    }
}
