use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShapeError {
    #[error("Failed to read shapes file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse shapes: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid pattern in rule {rule}: {source}")]
    Pattern {
        rule: String,
        source: regex::Error,
    },
}
