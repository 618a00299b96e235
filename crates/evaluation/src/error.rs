use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot access {}: {source}", path.display())]
    DataAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("malformed annotation file {}: {reason}", path.display())]
    MalformedAnnotation { path: PathBuf, reason: String },
    #[error("video {} contains no frames", .0.display())]
    EmptyVideo(PathBuf),
    #[error("{} is not a frame image: pass a directory of frames or a glob pattern such as videos/15/*.png", .0.display())]
    UnsupportedVideo(PathBuf),
    #[error("{videos} videos but {annotations} annotation files")]
    LengthMismatch { videos: usize, annotations: usize },
    #[error("part interval must be at least one frame")]
    InvalidInterval,
    #[error("object {obj_id} is missing from {missing_from}")]
    MissingObject {
        obj_id: String,
        missing_from: &'static str,
    },
    #[error("output directory {} already exists", .0.display())]
    OutputCollision(PathBuf),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
    #[error(transparent)]
    Model(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn data_access(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::DataAccess { path, source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Write { path, source }
    }
}
