use thiserror::Error;

/// Errors that can occur while setting up a render cache
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Could not start render worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}
