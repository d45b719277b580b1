use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("unknown example `{name}`")]
    #[diagnostic(
        code(vcide::session::unknown_example),
        help("available examples: {available}")
    )]
    UnknownExample { name: String, available: String },

    #[error("failed to load example catalog from {}: {message}", .path.display())]
    #[diagnostic(code(vcide::session::catalog))]
    Catalog { path: PathBuf, message: String },

    #[error("example catalog is empty")]
    #[diagnostic(code(vcide::session::empty_catalog))]
    EmptyCatalog,
}
