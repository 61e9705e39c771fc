//! YARD documentation comments.
//!
//! Only the tags the checker reads are interpreted: `@return`, `@param`,
//! `@type`, `@yieldparam` and `@yieldreturn`. Other tags are kept verbatim.

use crate::complex_type::ComplexType;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Tag name without the `@`.
    pub name: String,
    /// Parameter name for `@param` style tags.
    pub param: Option<String>,
    /// Raw type strings from the bracketed list.
    pub types: Vec<String>,
    pub text: String,
}

impl Tag {
    pub fn has_types(&self) -> bool {
        !self.types.is_empty()
    }

    pub fn complex_type(&self) -> ComplexType {
        ComplexType::parse_all(self.types.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Docstring {
    pub text: String,
    pub tags: Vec<Tag>,
}

impl Docstring {
    pub fn parse(comments: &str) -> Self {
        let mut text = Vec::new();
        let mut tags = Vec::new();
        for line in comments.lines() {
            let trimmed = line.trim();
            match trimmed.strip_prefix('@') {
                Some(rest) => tags.push(parse_tag(rest)),
                None => text.push(trimmed),
            }
        }
        Self {
            text: text.join("\n").trim().to_string(),
            tags,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.tags.is_empty()
    }

    pub fn tags<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |t| t.name == name)
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// The documented return type. `None` when there is no typed `@return`.
    pub fn return_type(&self) -> Option<ComplexType> {
        self.tag("return")
            .filter(|t| t.has_types())
            .map(Tag::complex_type)
    }

    pub fn param_tag(&self, name: &str) -> Option<&Tag> {
        self.tags("param").find(|t| t.param.as_deref() == Some(name))
    }

    pub fn param_type(&self, name: &str) -> Option<ComplexType> {
        self.param_tag(name)
            .filter(|t| t.has_types())
            .map(Tag::complex_type)
    }

    /// `@type` hint attached to an assignment.
    pub fn type_hint(&self) -> Option<ComplexType> {
        self.tag("type").filter(|t| t.has_types()).map(Tag::complex_type)
    }
}

/// Parses `name [Types] text`, `[Types] name text` or `[Types] text`.
fn parse_tag(rest: &str) -> Tag {
    let (name, rest) = split_word(rest);
    let mut tag = Tag {
        name: name.to_string(),
        ..Tag::default()
    };
    let takes_param = matches!(name, "param" | "yieldparam" | "option");

    let mut rest = rest.trim_start();
    if takes_param && !rest.starts_with('[') {
        let (param, after) = split_word(rest);
        if !param.is_empty() {
            tag.param = Some(param.to_string());
        }
        rest = after.trim_start();
    }
    if let Some((types, after)) = bracketed(rest) {
        tag.types = split_types(types);
        rest = after.trim_start();
    }
    if takes_param && tag.param.is_none() {
        let (param, after) = split_word(rest);
        if !param.is_empty() {
            tag.param = Some(param.to_string());
        }
        rest = after.trim_start();
    }
    tag.text = rest.trim().to_string();
    tag
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

/// Splits off a leading `[...]` group, honoring nested brackets such as
/// `[#[]]`.
fn bracketed(s: &str) -> Option<(&str, &str)> {
    let inner = s.strip_prefix('[')?;
    let mut depth = 1usize;
    for (i, c) in inner.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&inner[..i], &inner[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a type list on top-level commas.
fn split_types(list: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '<' | '{' | '(' => depth += 1,
            '>' | '}' | ')' if depth > 0 && !current.ends_with('=') => depth -= 1,
            ',' if depth == 0 => {
                push_type(&mut out, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    push_type(&mut out, &current);
    out
}

fn push_type(out: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_return_and_params() {
        let doc = Docstring::parse(
            "Does things.\n@param foo [String] the foo\n@param [Integer] bar\n@return [Array<String>, nil]",
        );
        assert_eq!(doc.text, "Does things.");
        assert_eq!(doc.param_type("foo").unwrap().tag(), "String");
        assert_eq!(doc.param_type("bar").unwrap().tag(), "Integer");
        assert_eq!(doc.param_tag("foo").unwrap().text, "the foo");
        assert_eq!(doc.return_type().unwrap().tag(), "Array<String>, nil");
    }

    #[test]
    fn keeps_nested_commas_together() {
        let doc = Docstring::parse("@return [Hash{String, Symbol => Integer}, #[]]");
        let tag = doc.tag("return").unwrap();
        assert_eq!(tag.types, vec!["Hash{String, Symbol => Integer}", "#[]"]);
    }

    #[test]
    fn untyped_tags_have_no_type() {
        let doc = Docstring::parse("@param foo\n@return");
        assert!(doc.param_tag("foo").is_some());
        assert!(doc.param_type("foo").is_none());
        assert!(doc.return_type().is_none());
    }

    #[test]
    fn reads_type_hints() {
        let doc = Docstring::parse("@type [Array<Hash>]");
        assert_eq!(doc.type_hint().unwrap().tag(), "Array<Hash>");
    }
}
