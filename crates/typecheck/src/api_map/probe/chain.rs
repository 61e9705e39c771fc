//! Signature tokenizer.
//!
//! A signature is the textual form of a call chain such as
//! `Foo::Bar.new.baz(1)[0]`. Call arguments and blocks are skipped; only the
//! names along the chain and indexed accesses matter for resolution.

/// One step of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Segment {
    SelfRef,
    /// A literal head, carrying the name of its class.
    Literal(&'static str),
    Word(String),
    /// A constant path, possibly absolute (`::Foo`) or nested (`Foo::Bar`).
    Constant(String),
    InstanceVariable(String),
    ClassVariable(String),
    GlobalVariable(String),
    /// `[...]` after the previous segment.
    Index,
}

/// Splits a signature into segments. Returns `None` when the text is not a
/// well-formed chain.
pub(super) fn tokenize(signature: &str) -> Option<Vec<Segment>> {
    let signature = signature.trim();
    if signature.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    for (i, part) in split_parts(signature)?.iter().enumerate() {
        let (head, indexes) = strip_suffixes(part)?;
        if i == 0 {
            segments.push(head_segment(head)?);
        } else if is_word(head) {
            segments.push(Segment::Word(head.to_string()));
        } else {
            return None;
        }
        segments.extend(std::iter::repeat_n(Segment::Index, indexes));
    }
    Some(segments)
}

/// Splits on `.` and `&.` outside brackets, quotes and numeric literals.
fn split_parts(signature: &str) -> Option<Vec<&str>> {
    let bytes = signature.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == b'\\' {
                i += 1;
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            b'\'' | b'"' => quote = Some(c),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.checked_sub(1)?,
            b'.' if depth == 0 => {
                let current = &signature[start..i];
                let decimal = !current.is_empty()
                    && current.bytes().all(|b| b.is_ascii_digit() || b == b'_')
                    && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
                if !decimal {
                    parts.push(current.strip_suffix('&').unwrap_or(current).trim());
                    start = i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(signature[start..].trim());
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Removes a trailing argument list or block and counts trailing `[...]`
/// accesses.
fn strip_suffixes(part: &str) -> Option<(&str, usize)> {
    let mut rest = part;
    let mut indexes = 0;
    loop {
        let open = match rest.bytes().last()? {
            b')' => b'(',
            b'}' => b'{',
            b']' => b'[',
            _ => break,
        };
        let at = matching_open(rest, open)?;
        if at == 0 {
            break;
        }
        if open == b'[' {
            indexes += 1;
        }
        rest = rest[..at].trim_end();
    }
    Some((rest, indexes))
}

/// Byte offset of the bracket opening the one that closes `text`.
fn matching_open(text: &str, open: u8) -> Option<usize> {
    let close = *text.as_bytes().last()?;
    let mut depth = 0usize;
    for (i, b) in text.bytes().enumerate().rev() {
        if b == close {
            depth += 1;
        } else if b == open {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn head_segment(head: &str) -> Option<Segment> {
    let first = head.chars().next()?;
    let segment = if head == "self" {
        Segment::SelfRef
    } else if head == "nil" {
        Segment::Literal("NilClass")
    } else if head == "true" || head == "false" {
        Segment::Literal("Boolean")
    } else if let Some(name) = head.strip_prefix("@@") {
        is_word(name).then(|| Segment::ClassVariable(head.to_string()))?
    } else if let Some(name) = head.strip_prefix('@') {
        is_word(name).then(|| Segment::InstanceVariable(head.to_string()))?
    } else if let Some(name) = head.strip_prefix('$') {
        (!name.is_empty()).then(|| Segment::GlobalVariable(head.to_string()))?
    } else if first.is_ascii_uppercase() || head.starts_with("::") {
        let valid = head
            .trim_start_matches("::")
            .split("::")
            .all(|part| part.chars().next().is_some_and(|c| c.is_ascii_uppercase()) && is_word(part));
        valid.then(|| Segment::Constant(head.to_string()))?
    } else {
        Segment::Literal(match first {
            '\'' | '"' => "String",
            ':' => "Symbol",
            '[' => "Array",
            '{' => "Hash",
            '0'..='9' if head.contains('.') => "Float",
            '0'..='9' => "Integer",
            _ if is_word(head) => return Some(Segment::Word(head.to_string())),
            _ => return None,
        })
    };
    Some(segment)
}

/// Identifiers, including the `?`, `!` and `=` method suffixes.
fn is_word(text: &str) -> bool {
    let body = text.trim_end_matches(['?', '!', '=']);
    !body.is_empty()
        && body.len() + 1 >= text.len()
        && body
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
        && body.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(signature: &str) -> Vec<Segment> {
        tokenize(signature).unwrap()
    }

    #[test]
    fn splits_calls_and_constants() {
        assert_eq!(
            words("Foo::Bar.new.baz"),
            vec![
                Segment::Constant("Foo::Bar".into()),
                Segment::Word("new".into()),
                Segment::Word("baz".into()),
            ]
        );
    }

    #[test]
    fn skips_arguments_and_blocks() {
        assert_eq!(
            words("foo(1, bar(2)).baz { |x| x.y }&.qux?"),
            vec![
                Segment::Word("foo".into()),
                Segment::Word("baz".into()),
                Segment::Word("qux?".into()),
            ]
        );
    }

    #[test]
    fn counts_index_access() {
        assert_eq!(
            words("@things[0][1].first"),
            vec![
                Segment::InstanceVariable("@things".into()),
                Segment::Index,
                Segment::Index,
                Segment::Word("first".into()),
            ]
        );
    }

    #[test]
    fn recognizes_literal_heads() {
        assert_eq!(words("'a.b'.upcase")[0], Segment::Literal("String"));
        assert_eq!(words("1.5.round")[0], Segment::Literal("Float"));
        assert_eq!(words("[1, 2].first")[0], Segment::Literal("Array"));
        assert_eq!(words("self.bar")[0], Segment::SelfRef);
        assert_eq!(words("nil.to_s")[0], Segment::Literal("NilClass"));
        assert_eq!(words("true")[0], Segment::Literal("Boolean"));
        assert_eq!(words("false.to_s")[0], Segment::Literal("Boolean"));
        assert_eq!(words("@@count")[0], Segment::ClassVariable("@@count".into()));
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert!(tokenize("").is_none());
        assert!(tokenize("foo(").is_none());
        assert!(tokenize("foo..bar").is_none());
        assert!(tokenize("foo.Bar::").is_none());
    }
}
