use std::path::PathBuf;

use thiserror::Error;

use crate::complex_type::TypeParseError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    TypeParse(#[from] TypeParseError),

    #[error(transparent)]
    Syntax(#[from] ruby_syntax::SyntaxError),
}

pub type Result<T> = std::result::Result<T, Error>;
