use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use ruby_syntax::Position;
use typecheck::{Library, Probe, Source};

/// Prints the type `signature` infers to inside `file`, in the scope of
/// `line` (1-based) or at the top level.
pub fn run(file: &Path, signature: &str, line: Option<usize>, out: &mut impl Write) -> Result<()> {
    let source = Source::load(file)?;
    let filename = source.filename().to_string();
    let position = match line {
        Some(line) => {
            let text = source
                .code()
                .lines()
                .nth(line.saturating_sub(1))
                .with_context(|| format!("{} has no line {line}", file.display()))?;
            Position::new(line.saturating_sub(1), text.len())
        }
        None => end_of(source.code()),
    };

    let library = Library::load([source]);
    let api_map = library.snapshot();
    let map = api_map
        .source_map(&filename)
        .with_context(|| format!("{filename} was not mapped"))?;
    let context = map.closure_at(position);
    let locals = map.locals_at(position);

    let inference = Probe::new(&api_map).resolve(signature, context, &locals);
    if inference.ty.is_undefined() {
        match inference.unresolved {
            Some(segment) => writeln!(out, "undefined (unresolved `{segment}`)")?,
            None => writeln!(out, "undefined")?,
        }
    } else {
        writeln!(out, "{}", inference.ty)?;
    }
    for pin in &inference.pins {
        writeln!(out, "  {} ({})", pin.path, pin.location)?;
    }
    Ok(())
}

fn end_of(code: &str) -> Position {
    let lines: Vec<&str> = code.lines().collect();
    match lines.last() {
        Some(last) => Position::new(lines.len() - 1, last.len()),
        None => Position::default(),
    }
}
