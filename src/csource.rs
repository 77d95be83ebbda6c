//! The C parser abstraction shared by the instrumenter and the seed
//! generator: parse a translation unit into an opaque syntax tree and walk
//! it by node kind.

use tree_sitter::{Node, Parser, Tree};

use crate::error::{Error, Result};

/// A parsed C source file.
pub struct CSource {
    text: String,
    tree: Tree,
}

impl CSource {
    pub fn parse(text: String) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(tree_sitter_c::language())
            .map_err(|err| Error::CParse(err.to_string()))?;
        let tree = parser
            .parse(&text, None)
            .ok_or_else(|| Error::CParse("parser produced no tree".to_string()))?;
        Ok(Self { text, tree })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Source text spanned by `node`.
    pub fn node_text(&self, node: Node) -> &str {
        &self.text[node.byte_range()]
    }
}

/// All direct children of `node`, detached from the walking cursor.
pub fn children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Depth-first search for the first descendant of the given kind.
pub fn find_descendant<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    for child in children(node) {
        if child.kind() == kind {
            return Some(child);
        }
        if let Some(found) = find_descendant(child, kind) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_program() {
        let src = CSource::parse("int main(void) { return 0; }".to_string()).unwrap();
        assert_eq!(src.root().kind(), "translation_unit");

        let func = children(src.root())
            .into_iter()
            .find(|n| n.kind() == "function_definition")
            .unwrap();
        let name = find_descendant(func, "identifier").unwrap();
        assert_eq!(src.node_text(name), "main");
    }

    #[test]
    fn finds_nested_statement_kinds() {
        let src = CSource::parse("void f(void) { if (1) return; }".to_string()).unwrap();
        assert!(find_descendant(src.root(), "if_statement").is_some());
        assert!(find_descendant(src.root(), "return_statement").is_some());
    }
}
