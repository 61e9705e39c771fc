use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::info;
use typecheck::{CheckLevel, Library, Problem, Source};

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::files;

pub struct TypecheckArgs {
    pub paths: Vec<PathBuf>,
    pub level: Option<CheckLevel>,
    pub format: Option<OutputFormat>,
    pub config: Option<PathBuf>,
    pub threads: Option<usize>,
}

/// Checks every discovered file against one shared snapshot. Returns
/// whether any problem was found.
pub fn run(args: TypecheckArgs, out: &mut impl Write) -> Result<bool> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(level) = args.level {
        config.level = level;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.effective_threads())
        .build()
        .context("failed to start worker threads")?;

    let start = Instant::now();
    let paths = files::discover(&args.paths, &config.exclude)?;
    let problems = pool.install(|| check(&paths, config.level))?;
    info!(
        files = paths.len(),
        problems = problems.len(),
        level = %config.level,
        "checked in {:.2}s",
        start.elapsed().as_secs_f64()
    );

    match config.format {
        OutputFormat::Text => write_text(out, &problems, paths.len())?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &problems)?;
            writeln!(out)?;
        }
    }
    Ok(!problems.is_empty())
}

fn check(paths: &[PathBuf], level: CheckLevel) -> Result<Vec<Problem>> {
    let sources = paths
        .par_iter()
        .map(|path| Source::load(path).with_context(|| format!("failed to load {}", path.display())))
        .collect::<Result<Vec<_>>>()?;
    let filenames: Vec<String> = sources.iter().map(|s| s.filename().to_string()).collect();
    let library = Library::load(sources);

    let per_file: Vec<Vec<Problem>> = filenames
        .par_iter()
        .map(|filename| library.type_checker(filename).problems(level))
        .collect();
    Ok(per_file.into_iter().flatten().collect())
}

fn write_text(out: &mut impl Write, problems: &[Problem], files: usize) -> Result<()> {
    for problem in problems {
        writeln!(out, "{problem}")?;
    }
    if problems.is_empty() {
        writeln!(out, "No problems found in {files} files.")?;
    } else {
        writeln!(out, "{} problems found in {files} files.", problems.len())?;
    }
    Ok(())
}
