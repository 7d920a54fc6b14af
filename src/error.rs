use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("parsing error. details = `{0}`")]
    Parse(String),
    #[error("failed to find test methods. details = `{0}`")]
    NotFound(String),
    #[error("no framework detected for `{}`", .0.display())]
    Undetected(PathBuf),
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk `{}`", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
