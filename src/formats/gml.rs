//! GML graph format.
//!
//! `graph [ node [ id N location L ] ... edge [ source A target B ]
//! ... ]`. The lexer tolerates `#` comments and quoted strings;
//! unknown keys are parsed and ignored.

use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::formats::{assemble, directed_edges, FormatError};
use crate::graph::Graph;

pub fn write(graph: &Graph, path: &Path) -> Result<(), FormatError> {
    let edges = directed_edges(graph);
    info!(
        "writing {} nodes and {} directed edges to {}",
        graph.size(),
        edges.len(),
        path.display()
    );

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "graph [")?;
    for node in graph.nodes() {
        writeln!(writer, "  node [")?;
        writeln!(writer, "    id {}", node.index)?;
        writeln!(writer, "    location {}", node.location)?;
        writeln!(writer, "  ]")?;
    }
    for (from, to) in edges {
        writeln!(writer, "  edge [")?;
        writeln!(writer, "    source {}", from)?;
        writeln!(writer, "    target {}", to)?;
        writeln!(writer, "  ]")?;
    }
    writeln!(writer, "]")?;
    writer.flush()?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Graph, FormatError> {
    let content = fs::read_to_string(path)?;
    let mut parser = Parser::new(Lexer::new(&content))?;
    let (nodes, edges) = parser.parse_graph()?;
    assemble("gml", nodes, &edges)
}

fn malformed(reason: impl Into<String>) -> FormatError {
    FormatError::malformed("gml", reason)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    Value(String),
    LeftBracket,
    RightBracket,
    Eof,
}

struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn read_quoted(&mut self) -> Result<String, FormatError> {
        let mut result = String::new();
        self.advance();
        while let Some(ch) = self.current() {
            self.advance();
            if ch == '"' {
                return Ok(result);
            }
            result.push(ch);
        }
        Err(malformed("unterminated string literal"))
    }

    fn read_bare(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || matches!(ch, '_' | '.' | '-' | '+') {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn next_token(&mut self) -> Result<Token, FormatError> {
        loop {
            match self.current() {
                None => return Ok(Token::Eof),
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('#') => {
                    while let Some(ch) = self.current() {
                        self.advance();
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                Some('[') => {
                    self.advance();
                    return Ok(Token::LeftBracket);
                }
                Some(']') => {
                    self.advance();
                    return Ok(Token::RightBracket);
                }
                Some('"') => return Ok(Token::Value(self.read_quoted()?)),
                Some(ch) if ch.is_alphabetic() || ch == '_' => {
                    return Ok(Token::Identifier(self.read_bare()))
                }
                Some(ch) if ch.is_numeric() || ch == '-' || ch == '+' || ch == '.' => {
                    return Ok(Token::Value(self.read_bare()))
                }
                Some(ch) => return Err(malformed(format!("unexpected character '{}'", ch))),
            }
        }
    }
}

struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    fn new(mut lexer: Lexer) -> Result<Self, FormatError> {
        let current = lexer.next_token()?;
        Ok(Parser { lexer, current })
    }

    fn advance(&mut self) -> Result<(), FormatError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<(), FormatError> {
        match &self.current {
            Token::Identifier(id) if id == expected => self.advance(),
            other => Err(malformed(format!(
                "expected '{}', found {:?}",
                expected, other
            ))),
        }
    }

    fn expect_left_bracket(&mut self) -> Result<(), FormatError> {
        match self.current {
            Token::LeftBracket => self.advance(),
            _ => Err(malformed(format!("expected '[', found {:?}", self.current))),
        }
    }

    /// Consume a scalar value; nested blocks under unknown keys are
    /// skipped wholesale.
    fn parse_value(&mut self) -> Result<String, FormatError> {
        match self.current.clone() {
            Token::Identifier(value) | Token::Value(value) => {
                self.advance()?;
                Ok(value)
            }
            Token::LeftBracket => {
                let mut depth = 0usize;
                loop {
                    match self.current {
                        Token::LeftBracket => depth += 1,
                        Token::RightBracket => {
                            depth -= 1;
                            if depth == 0 {
                                self.advance()?;
                                return Ok(String::new());
                            }
                        }
                        Token::Eof => return Err(malformed("unterminated block")),
                        _ => {}
                    }
                    self.advance()?;
                }
            }
            ref other => Err(malformed(format!("expected value, found {:?}", other))),
        }
    }

    /// Parse `key value` pairs until the closing bracket, returning
    /// the values of the requested keys.
    fn parse_fields(&mut self, keys: &[&str]) -> Result<Vec<Option<String>>, FormatError> {
        self.expect_left_bracket()?;
        let mut values: Vec<Option<String>> = vec![None; keys.len()];

        while self.current != Token::RightBracket {
            let key = match &self.current {
                Token::Identifier(key) => key.clone(),
                other => return Err(malformed(format!("expected key, found {:?}", other))),
            };
            self.advance()?;
            let value = self.parse_value()?;
            if let Some(slot) = keys.iter().position(|&k| k == key) {
                values[slot] = Some(value);
            }
        }
        self.advance()?;
        Ok(values)
    }

    fn parse_graph(&mut self) -> Result<(Vec<(usize, f64)>, Vec<(usize, usize)>), FormatError> {
        self.expect_identifier("graph")?;
        self.expect_left_bracket()?;

        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        while self.current != Token::RightBracket {
            match &self.current {
                Token::Identifier(keyword) if keyword == "node" => {
                    self.advance()?;
                    let fields = self.parse_fields(&["id", "location"])?;
                    let id = parse_field(&fields[0], "node id")?;
                    let location = parse_field(&fields[1], "node location")?;
                    nodes.push((id, location));
                }
                Token::Identifier(keyword) if keyword == "edge" => {
                    self.advance()?;
                    let fields = self.parse_fields(&["source", "target"])?;
                    let source = parse_field(&fields[0], "edge source")?;
                    let target = parse_field(&fields[1], "edge target")?;
                    edges.push((source, target));
                }
                Token::Identifier(_) => {
                    // Top-level graph attribute.
                    self.advance()?;
                    self.parse_value()?;
                }
                other => return Err(malformed(format!("expected keyword, found {:?}", other))),
            }
        }
        self.advance()?;

        Ok((nodes, edges))
    }
}

fn parse_field<T: std::str::FromStr>(
    value: &Option<String>,
    what: &str,
) -> Result<T, FormatError> {
    let text = value
        .as_ref()
        .ok_or_else(|| malformed(format!("missing {}", what)))?;
    text.parse()
        .map_err(|_| malformed(format!("bad {}: '{}'", what, text)))
}
