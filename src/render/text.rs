//! Plain-text layout of a display tree for terminals

use super::DisplayNode;
use colored::Colorize;

const EMPTY_MARKER: &str = "None";
const EMPTY_LIST_MARKER: &str = "Empty list";
const TRUNCATED_MARKER: &str = "…";
/// Leaders opening each list element; the last element closes the branch
const ITEM_LEADER: &str = "├ ";
const LAST_ITEM_LEADER: &str = "└ ";
/// Continuation gutters for an element's remaining lines
const ITEM_GUTTER: &str = "│ ";
const LAST_ITEM_GUTTER: &str = "  ";
const INDENT: &str = "  ";

/// Lay a tree out as indented lines without styling
pub fn layout(node: &DisplayNode) -> String {
    lines(node, false).join("\n")
}

/// Lay a tree out with terminal colors (bold labels, dimmed markers)
pub fn layout_colored(node: &DisplayNode) -> String {
    lines(node, true).join("\n")
}

fn scalar_text(node: &DisplayNode, styled: bool) -> Option<String> {
    let marker = |s: &str| {
        if styled {
            s.dimmed().to_string()
        } else {
            s.to_string()
        }
    };
    match node {
        DisplayNode::Literal(s) => Some(s.clone()),
        DisplayNode::Bullet(s) => Some(format!("• {}", s)),
        DisplayNode::Empty => Some(marker(EMPTY_MARKER)),
        DisplayNode::EmptyList => Some(marker(EMPTY_LIST_MARKER)),
        DisplayNode::Truncated => Some(marker(TRUNCATED_MARKER)),
        DisplayNode::Items(_) | DisplayNode::Fields(_) => None,
    }
}

fn lines(node: &DisplayNode, styled: bool) -> Vec<String> {
    if let Some(text) = scalar_text(node, styled) {
        let mut out: Vec<String> = text.lines().map(str::to_string).collect();
        // An empty literal still occupies one line
        if out.is_empty() {
            out.push(String::new());
        }
        return out;
    }

    let mut out = Vec::new();
    match node {
        DisplayNode::Items(items) => {
            for (i, item) in items.iter().enumerate() {
                let last = i + 1 == items.len();
                let (leader, gutter) = if last {
                    (LAST_ITEM_LEADER, LAST_ITEM_GUTTER)
                } else {
                    (ITEM_LEADER, ITEM_GUTTER)
                };
                for (j, line) in lines(item, styled).into_iter().enumerate() {
                    let prefix = if j == 0 { leader } else { gutter };
                    let prefix = if styled {
                        prefix.dimmed().to_string()
                    } else {
                        prefix.to_string()
                    };
                    out.push(format!("{}{}", prefix, line));
                }
            }
        }
        DisplayNode::Fields(fields) => {
            for field in fields {
                let label = if styled {
                    format!("{}:", field.label).bold().to_string()
                } else {
                    format!("{}:", field.label)
                };

                match scalar_text(&field.value, styled) {
                    Some(text) if !text.contains('\n') => {
                        out.push(format!("{} {}", label, text));
                    }
                    _ => {
                        out.push(label);
                        for line in lines(&field.value, styled) {
                            out.push(format!("{}{}", INDENT, line));
                        }
                    }
                }
            }
        }
        _ => {}
    }
    out
}
