use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("error walking data root: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T = ()> = std::result::Result<T, Error>;
