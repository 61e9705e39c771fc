use std::iter::Peekable;
use std::str::CharIndices;

use super::{ComplexType, UniqueType};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type tag `{tag}`: {reason}")]
pub struct TypeParseError {
    pub tag: String,
    pub reason: String,
}

/// Recursive descent over a YARD type list such as
/// `Array<String>, Hash{Symbol => Integer}, #to_s, nil`.
pub(super) struct TagParser<'a> {
    tag: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> TagParser<'a> {
    pub(super) fn new(tag: &'a str) -> Self {
        Self {
            tag,
            chars: tag.char_indices().peekable(),
        }
    }

    pub(super) fn parse(mut self) -> Result<ComplexType, TypeParseError> {
        let items = self.list(None)?;
        self.skip_whitespace();
        if let Some(&(_, c)) = self.chars.peek() {
            return Err(self.error(format!("unexpected `{c}`")));
        }
        Ok(ComplexType::from_unique(
            items.into_iter().flat_map(|t| t.items().to_vec()),
        ))
    }

    fn error(&self, reason: impl Into<String>) -> TypeParseError {
        TypeParseError {
            tag: self.tag.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    /// Comma separated alternatives up to (not including) `close`.
    fn list(&mut self, close: Option<char>) -> Result<Vec<ComplexType>, TypeParseError> {
        let mut out = Vec::new();
        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                None if close.is_none() => break,
                None => return Err(self.error("unterminated parameter list")),
                Some(&(_, c)) if Some(c) == close => break,
                Some(&(i, '=')) if close == Some('=') && self.tag[i..].starts_with("=>") => {
                    break;
                }
                _ => {}
            }
            out.push(self.unique()?);
            self.skip_whitespace();
            if self.chars.next_if(|(_, c)| *c == ',').is_none() {
                break;
            }
        }
        Ok(out)
    }

    fn unique(&mut self) -> Result<ComplexType, TypeParseError> {
        let name = self.name()?;
        if name == "undefined" {
            return Ok(ComplexType::undefined());
        }
        let mut unique = UniqueType::new(name);
        if !unique.is_duck() {
            match self.chars.peek().map(|(_, c)| *c) {
                Some('<') => {
                    self.chars.next();
                    unique.subtypes = self.list(Some('>'))?;
                    self.expect('>')?;
                }
                Some('(') => {
                    self.chars.next();
                    unique.subtypes = self.list(Some(')'))?;
                    self.expect(')')?;
                }
                Some('{') => {
                    self.chars.next();
                    unique.key_types = self.list(Some('='))?;
                    self.skip_whitespace();
                    self.expect('=')?;
                    self.expect('>')?;
                    unique.value_types = self.list(Some('}'))?;
                    self.expect('}')?;
                }
                _ => {}
            }
            if self.chars.next_if(|(_, c)| *c == '?').is_some() {
                unique.nullable = true;
            }
        }
        Ok(ComplexType::from_unique([unique]))
    }

    fn name(&mut self) -> Result<String, TypeParseError> {
        let mut name = String::new();
        if self.chars.next_if(|(_, c)| *c == '#').is_some() {
            name.push('#');
            // Operator ducks like `#<<` or `#[]=` may contain delimiters.
            loop {
                let started = name.len() > 2;
                let next = self.chars.next_if(|(_, c)| {
                    !c.is_whitespace() && *c != ',' && !(started && matches!(c, '>' | '}' | ')'))
                });
                match next {
                    Some((_, c)) => name.push(c),
                    None => break,
                }
            }
        } else {
            while let Some((_, c)) = self
                .chars
                .next_if(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == ':')
            {
                name.push(c);
            }
        }
        if name.is_empty() || name == "#" {
            let found = self
                .chars
                .peek()
                .map(|(_, c)| format!("`{c}`"))
                .unwrap_or_else(|| "end of input".to_string());
            return Err(self.error(format!("expected a type name, found {found}")));
        }
        Ok(name)
    }

    fn expect(&mut self, expected: char) -> Result<(), TypeParseError> {
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            Some((_, c)) => Err(self.error(format!("expected `{expected}`, found `{c}`"))),
            None => Err(self.error(format!("expected `{expected}`"))),
        }
    }
}
