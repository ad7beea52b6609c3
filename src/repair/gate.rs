//! Parse gate
//!
//! Validates a candidate script by fully parsing it before it is ever handed
//! to the renderer. The gate is the only place that knows how "does this
//! parse" is answered, so the tree-sitter backend can be swapped for a
//! tokenizer-aware checker without touching the convergence loop.

use std::cell::RefCell;
use tree_sitter::{Node, Parser};

// Parsers are expensive to create but reusable; one per thread is plenty
// for the synchronous pipeline.
thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });
}

/// Outcome of gating one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseCheck {
    Clean,
    Broken {
        /// 1-based line of the first error node
        line: usize,
        /// Whether the error looks like an indentation problem rather than
        /// missing or stray tokens
        indentation_shaped: bool,
    },
}

impl ParseCheck {
    pub fn is_clean(&self) -> bool {
        matches!(self, ParseCheck::Clean)
    }
}

/// Parse the text and report the first structural error, if any.
pub fn check(text: &str) -> ParseCheck {
    let tree = PYTHON_PARSER.with(|p| p.borrow_mut().parse(text, None));
    let tree = match tree {
        Some(t) => t,
        None => {
            return ParseCheck::Broken {
                line: 1,
                indentation_shaped: false,
            }
        }
    };

    let root = tree.root_node();
    if !root.has_error() {
        return ParseCheck::Clean;
    }

    match first_error_node(root) {
        Some(node) => {
            let row = node.start_position().row;
            let module_level_indent = node
                .parent()
                .map(|p| p.kind() == "module")
                .unwrap_or(false)
                && node.start_position().column > 0;
            let indentation_shaped =
                module_level_indent || indent_jump(text, row) || missing_block(text);
            ParseCheck::Broken {
                line: row + 1,
                indentation_shaped,
            }
        }
        None => ParseCheck::Broken {
            line: 1,
            indentation_shaped: false,
        },
    }
}

/// Depth-first search for the first ERROR or MISSING node.
fn first_error_node(root: Node) -> Option<Node> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }

        if node.has_error() && cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// True when the offending line's leading whitespace jumps by more than one
/// 4-space level relative to the previous non-blank line.
fn indent_jump(text: &str, row: usize) -> bool {
    let lines: Vec<&str> = text.split('\n').collect();
    let Some(line) = lines.get(row) else {
        return false;
    };
    if line.trim().is_empty() {
        return false;
    }
    let indent = leading_spaces(line);
    let prev_indent = lines[..row]
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| leading_spaces(l))
        .unwrap_or(0);

    indent > prev_indent + 4
}

/// True when a block header (a line ending in `:`) is not followed by a
/// deeper-indented line; the body the header promises is missing or lost
/// its indentation.
fn missing_block(text: &str) -> bool {
    let lines: Vec<&str> = text.split('\n').collect();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() || !trimmed.ends_with(':') || trimmed.trim_start().starts_with('#') {
            continue;
        }
        let header_indent = leading_spaces(line);
        match lines[i + 1..].iter().find(|l| !l.trim().is_empty()) {
            Some(next) if leading_spaces(next) <= header_indent => return true,
            None => return true,
            _ => {}
        }
    }
    false
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_scene_is_clean() {
        let code = "from manim import *\n\nclass Demo(Scene):\n    def construct(self):\n        c = Circle()\n        self.play(Create(c))\n        self.wait(1)\n";
        assert_eq!(check(code), ParseCheck::Clean);
    }

    #[test]
    fn test_unbalanced_paren_is_broken() {
        let code = "x = (1 + 2\n";
        assert!(!check(code).is_clean());
    }

    #[test]
    fn test_orphaned_closer_is_broken() {
        let code = "x = 1\n)\n";
        assert!(!check(code).is_clean());
    }

    #[test]
    fn test_indent_jump_detected() {
        assert!(indent_jump("x = 1\n            y = 2", 1));
        assert!(!indent_jump("def f():\n    y = 2", 1));
    }

    #[test]
    fn test_missing_block_detected() {
        assert!(missing_block("class A(Scene):\ndef f(self):\n        pass"));
        assert!(missing_block("def f():\nx = 1"));
        assert!(!missing_block("def f():\n    x = 1"));
        assert!(missing_block("def f():"));
    }

    #[test]
    fn test_flat_class_body_is_indentation_shaped() {
        let code = "class A(Scene):\ndef f(self):\nself.wait(1)";
        match check(code) {
            ParseCheck::Broken {
                indentation_shaped, ..
            } => assert!(indentation_shaped),
            ParseCheck::Clean => panic!("expected parse failure"),
        }
    }

    #[test]
    fn test_empty_text_is_clean() {
        assert_eq!(check(""), ParseCheck::Clean);
    }

    #[test]
    fn test_gate_is_pure() {
        let code = "def f(:\n    pass\n";
        assert_eq!(check(code), check(code));
    }
}
