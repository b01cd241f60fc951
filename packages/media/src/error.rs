use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    /// The tool ran but rejected the input.
    #[error("probe failed: {0}")]
    Probe(String),

    /// The tool could not be run, or exited with an error while writing output.
    #[error("media tool error: {0}")]
    Tool(String),

    #[error("unexpected probe output: {0}")]
    Parse(String),

    #[error("no video stream found")]
    NoVideoStream,

    #[error("media IO error: {0}")]
    Io(#[from] std::io::Error),
}
