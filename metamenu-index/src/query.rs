//! Source queries used by the reference stores.
//!
//! A source query selects documents by tag or folder:
//!
//! ```text
//! #reading or "Library/Books"
//! (#book and -#archived) or "Inbox"
//! ```
//!
//! `and` binds tighter than `or`; `-` negates the following term. An empty
//! query selects every document.

use crate::error::{IndexError, Result};
use crate::tags::same_tag;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Or,
    And,
    Not,
    LParen,
    RParen,
    Tag(String),
    Folder(String),
}

/// A parsed source query.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceQuery {
    All,
    Tag(String),
    Folder(String),
    Not(Box<SourceQuery>),
    And(Box<SourceQuery>, Box<SourceQuery>),
    Or(Box<SourceQuery>, Box<SourceQuery>),
}

impl SourceQuery {
    /// Parse a query string.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(SourceQuery::All);
        }
        let mut parser = Parser {
            input,
            tokens,
            pos: 0,
        };
        let query = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(IndexError::query(input, "unexpected trailing input"));
        }
        Ok(query)
    }

    /// Whether a document with this path and tags is selected.
    pub fn matches(&self, path: &str, tags: &[String]) -> bool {
        match self {
            SourceQuery::All => true,
            SourceQuery::Tag(tag) => tags.iter().any(|t| {
                same_tag(t, tag)
                    || t.trim_start_matches('#')
                        .to_lowercase()
                        .starts_with(&format!("{}/", tag.trim_start_matches('#').to_lowercase()))
            }),
            SourceQuery::Folder(folder) => {
                let folder = folder.trim_matches('/');
                folder.is_empty()
                    || path == folder
                    || path.strip_suffix(".md") == Some(folder)
                    || path
                        .strip_prefix(folder)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            SourceQuery::Not(inner) => !inner.matches(path, tags),
            SourceQuery::And(a, b) => a.matches(path, tags) && b.matches(path, tags),
            SourceQuery::Or(a, b) => a.matches(path, tags) || b.matches(path, tags),
        }
    }
}

/// Build the disjunction `#a or #b` used to fetch every tagged page at once.
pub fn tag_disjunction<'a>(tags: impl IntoIterator<Item = &'a str>) -> String {
    tags.into_iter()
        .map(|t| format!("#{}", t.trim_start_matches('#')))
        .collect::<Vec<_>>()
        .join(" or ")
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '-' | '!' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '"' => {
                chars.next();
                let mut folder = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    folder.push(c);
                }
                if !closed {
                    return Err(IndexError::query(input, "unterminated folder string"));
                }
                tokens.push(Token::Folder(folder));
            }
            '#' => {
                chars.next();
                let mut tag = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    tag.push(c);
                    chars.next();
                }
                if tag.is_empty() {
                    return Err(IndexError::query(input, format!("empty tag at {i}")));
                }
                tokens.push(Token::Tag(tag));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                match word.to_ascii_lowercase().as_str() {
                    "or" => tokens.push(Token::Or),
                    "and" => tokens.push(Token::And),
                    _ => {
                        return Err(IndexError::query(
                            input,
                            format!("unexpected '{word}' at {i}"),
                        ))
                    }
                }
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<SourceQuery> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = SourceQuery::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<SourceQuery> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = SourceQuery::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<SourceQuery> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(SourceQuery::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<SourceQuery> {
        match self.next() {
            Some(Token::Tag(tag)) => Ok(SourceQuery::Tag(tag)),
            Some(Token::Folder(folder)) => Ok(SourceQuery::Folder(folder)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(IndexError::query(self.input, "missing closing parenthesis")),
                }
            }
            Some(other) => Err(IndexError::query(
                self.input,
                format!("unexpected {other:?}"),
            )),
            None => Err(IndexError::query(self.input, "unexpected end of query")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_query_matches_everything() {
        let q = SourceQuery::parse("  ").unwrap();
        assert_eq!(q, SourceQuery::All);
        assert!(q.matches("any.md", &[]));
    }

    #[test]
    fn tag_terms() {
        let q = SourceQuery::parse("#reading or #Book").unwrap();
        assert!(q.matches("a.md", &tags(&["#reading"])));
        assert!(q.matches("a.md", &tags(&["#book"])));
        assert!(q.matches("a.md", &tags(&["#book/fiction"])));
        assert!(!q.matches("a.md", &tags(&["#bookish"])));
    }

    #[test]
    fn folder_terms() {
        let q = SourceQuery::parse("\"Library/Books\"").unwrap();
        assert!(q.matches("Library/Books/dune.md", &[]));
        assert!(!q.matches("Library/BooksOld/dune.md", &[]));
        assert!(!q.matches("Other/dune.md", &[]));

        let exact = SourceQuery::parse("\"notes/today\"").unwrap();
        assert!(exact.matches("notes/today.md", &[]));
    }

    #[test]
    fn precedence_and_negation() {
        let q = SourceQuery::parse("#a or #b and -#c").unwrap();
        assert!(q.matches("x.md", &tags(&["#a", "#c"])));
        assert!(q.matches("x.md", &tags(&["#b"])));
        assert!(!q.matches("x.md", &tags(&["#b", "#c"])));

        let grouped = SourceQuery::parse("(#a or #b) and -\"Archive\"").unwrap();
        assert!(grouped.matches("x.md", &tags(&["#b"])));
        assert!(!grouped.matches("Archive/x.md", &tags(&["#b"])));
    }

    #[test]
    fn invalid_queries() {
        for bad in ["TABLE file", "\"open", "(#a", "#a or", "#a )", "#"] {
            let err = SourceQuery::parse(bad).unwrap_err();
            assert!(matches!(err, IndexError::Query { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn disjunction() {
        assert_eq!(tag_disjunction(["a", "#b"]), "#a or #b");
    }
}
