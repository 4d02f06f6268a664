//! bnlearn-style modelstring: `[A][B|A][C|A:B]`.
//!
//! Each bracket group declares one node and, after `|`, its parents joined by
//! `:`. Whitespace between tokens is ignored. Rendering sorts nodes and each
//! parent list by name, so equal structures render identically.

use crate::model::Edge;
use crate::network::Network;
use crate::storage::GraphBackend;
use crate::{Error, Result};

/// Structure read from a modelstring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelString {
    /// Declared nodes, sorted by name.
    pub nodes: Vec<String>,
    /// Edges in order of appearance.
    pub edges: Vec<Edge>,
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    LBracket,
    RBracket,
    Pipe,
    Colon,
    Name,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    span: Span,
    text: String,
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '[' | ']' | '|' | ':') || c.is_whitespace()
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        let kind = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '|' => TokenKind::Pipe,
            ':' => TokenKind::Colon,
            _ => {
                let mut end = pos;
                while let Some(&(i, c)) = chars.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Name,
                    span: Span { start: pos, end },
                    text: input[pos..end].to_string(),
                });
                continue;
            }
        };
        chars.next();
        tokens.push(Token {
            kind,
            span: Span { start: pos, end: pos + 1 },
            text: ch.to_string(),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });
    tokens
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::ParseError { position: self.peek().span.start, message: message.into() }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            let found = match self.peek().kind {
                TokenKind::Eof => "end of input".to_string(),
                _ => format!("'{}'", self.peek().text),
            };
            Err(self.error(format!("expected {what}, found {found}")))
        }
    }
}

/// Parse a modelstring. Every parent must be declared in its own group.
pub fn parse(input: &str) -> Result<ModelString> {
    let mut parser = Parser { tokens: tokenize(input), pos: 0 };
    let mut declared: Vec<Token> = Vec::new();
    let mut parent_refs: Vec<(Token, String)> = Vec::new();

    while parser.peek().kind != TokenKind::Eof {
        parser.expect(TokenKind::LBracket, "'['")?;
        let node = parser.expect(TokenKind::Name, "a node name")?;
        if declared.iter().any(|d| d.text == node.text) {
            return Err(Error::ParseError {
                position: node.span.start,
                message: format!("node '{}' declared twice", node.text),
            });
        }

        if parser.peek().kind == TokenKind::Pipe {
            parser.advance();
            let mut seen: Vec<String> = Vec::new();
            loop {
                let parent = parser.expect(TokenKind::Name, "a parent name")?;
                if seen.contains(&parent.text) {
                    return Err(Error::ParseError {
                        position: parent.span.start,
                        message: format!("parent '{}' listed twice for '{}'", parent.text, node.text),
                    });
                }
                seen.push(parent.text.clone());
                parent_refs.push((parent, node.text.clone()));
                if parser.peek().kind == TokenKind::Colon {
                    parser.advance();
                } else {
                    break;
                }
            }
        }
        parser.expect(TokenKind::RBracket, "']'")?;
        declared.push(node);
    }

    let mut edges = Vec::with_capacity(parent_refs.len());
    for (parent, child) in parent_refs {
        if !declared.iter().any(|d| d.text == parent.text) {
            return Err(Error::ParseError {
                position: parent.span.start,
                message: format!("parent '{}' of '{child}' is not declared", parent.text),
            });
        }
        edges.push(Edge::new(parent.text, child));
    }

    let mut nodes: Vec<String> = declared.into_iter().map(|t| t.text).collect();
    nodes.sort();
    Ok(ModelString { nodes, edges })
}

/// Render a network's structure. Domains and distributions are not part of
/// the format.
pub fn render<D, B: GraphBackend>(network: &Network<D, B>) -> String {
    let mut names = network.node_names();
    names.sort_unstable();
    let mut out = String::new();
    for name in names {
        out.push('[');
        out.push_str(name);
        let mut parents = network.parents(name).unwrap_or_default();
        if !parents.is_empty() {
            parents.sort_unstable();
            out.push('|');
            out.push_str(&parents.join(":"));
        }
        out.push(']');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Domain;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic() {
        let ms = parse("[A][B|C:D][C|D][D]").unwrap();
        assert_eq!(ms.nodes, vec!["A", "B", "C", "D"]);
        assert_eq!(
            ms.edges,
            vec![Edge::new("C", "B"), Edge::new("D", "B"), Edge::new("D", "C")]
        );
    }

    #[test]
    fn test_whitespace_and_unsorted_input() {
        let ms = parse("  [Z|A] [A]\n").unwrap();
        assert_eq!(ms.nodes, vec!["A", "Z"]);
        assert_eq!(ms.edges, vec![Edge::new("A", "Z")]);
    }

    #[test]
    fn test_empty_input() {
        let ms = parse("").unwrap();
        assert!(ms.nodes.is_empty() && ms.edges.is_empty());
    }

    #[test]
    fn test_error_positions() {
        let cases = [
            ("[A", 2),
            ("[A]]", 3),
            ("[A|]", 3),
            ("[A][A]", 4),
            ("[A|B]", 3),
            ("[B][A|B:B]", 8),
            ("A", 0),
        ];
        for (input, expected) in cases {
            match parse(input) {
                Err(Error::ParseError { position, .. }) => assert_eq!(position, expected, "input {input:?}"),
                other => panic!("expected parse error for {input:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_render_sorts() {
        let mut net: Network = Network::new();
        for name in ["C", "A", "B"] {
            net.add_node(name, Domain::binary()).unwrap();
        }
        net.add_edge("C", "A").unwrap();
        net.add_edge("B", "A").unwrap();
        assert_eq!(render(&net), "[A|B:C][B][C]");
    }

    #[test]
    fn test_render_parse_render() {
        let text = "[A][B|C:D][C|D][D]";
        let net: Network = Network::from_modelstring(text, Domain::binary()).unwrap();
        assert_eq!(net.to_modelstring(), text);
    }
}
