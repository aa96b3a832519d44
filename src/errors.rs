use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),
    #[error("No data fetched for {0}")]
    Empty(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Upstream error {code}: {description}")]
    Upstream { code: String, description: String },
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum ComputationError {
    #[error("Not enough observations: needed {needed}, got {available}")]
    InsufficientData { needed: usize, available: usize },
    #[error("Degenerate series: {0}")]
    DegenerateSeries(String),
    #[error("Singular regression matrix")]
    SingularMatrix,
    #[error("Model fit did not converge after {0} iterations")]
    NonConvergence(usize),
    #[error("Distribution error: {0}")]
    Distribution(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("Render error: {0}")]
    Render(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Computation(#[from] ComputationError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl Error {
    /// Dialog-style title for the error kind.
    pub fn title(&self) -> &'static str {
        match self {
            Error::Fetch(_) => "Data Error",
            Error::Computation(_) => "Computation Error",
            Error::Export(_) => "Export Error",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
