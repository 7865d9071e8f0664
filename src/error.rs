use std::path::PathBuf;

/// Broad classes of failure, used by batch code to decide between
/// skipping one image and aborting the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable image or unusable file name. The image is skipped.
    Input,
    /// A caller handed an operation something it can never accept.
    InvalidArgument,
    /// Tables that must agree with each other do not.
    Consistency,
    /// Files or directories that cannot be opened or created.
    Resource,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown counting method '{0}' (expected 'watershed' or 'contour')")]
    UnknownCountMethod(String),

    #[error("no contours found, width/height ratio is undefined")]
    EmptyContourSet,

    #[error("feature vector has {actual} values, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("training dataset is empty")]
    EmptyDataset,

    #[error("unsupported feature dimension {0} (expected 1 or 2)")]
    UnsupportedFeatureDim(usize),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("training diverged at epoch {epoch}, lower the learning rate")]
    Diverged { epoch: usize },

    #[error("final kernel count does not exist for corn ID {ear} (image '{image}')")]
    MissingGroundTruth { ear: u32, image: String },

    #[error("duplicate image identifier '{0}' in batch")]
    DuplicateIdentifier(String),

    #[error("'{0}' has no leading corn ear number")]
    InvalidIdentifier(String),

    #[error("unsupported image file '{0}'")]
    UnsupportedImage(String),

    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("invalid model file {path}: {reason}")]
    InvalidModel { path: PathBuf, reason: String },

    #[error("cannot write {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownCountMethod(_)
            | Error::EmptyContourSet
            | Error::DimensionMismatch { .. }
            | Error::EmptyDataset
            | Error::UnsupportedFeatureDim(_)
            | Error::InvalidConfig(_)
            | Error::Diverged { .. } => ErrorKind::InvalidArgument,
            Error::MissingGroundTruth { .. }
            | Error::DuplicateIdentifier(_)
            | Error::MalformedRecord { .. }
            | Error::InvalidModel { .. } => ErrorKind::Consistency,
            Error::InvalidIdentifier(_) | Error::UnsupportedImage(_) | Error::Image(_) => {
                ErrorKind::Input
            }
            Error::Export { .. } | Error::Io(_) | Error::Json(_) => ErrorKind::Resource,
        }
    }

    /// Whether a batch may skip the offending image and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Input) || matches!(self, Error::EmptyContourSet)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy() {
        assert_eq!(Error::UnknownCountMethod("x".into()).kind(), ErrorKind::InvalidArgument);
        assert_eq!(Error::EmptyDataset.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            Error::MissingGroundTruth { ear: 3, image: "3-a.JPG".into() }.kind(),
            ErrorKind::Consistency
        );
        assert_eq!(Error::InvalidIdentifier("a.JPG".into()).kind(), ErrorKind::Input);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(Error::from(io).kind(), ErrorKind::Resource);
    }

    #[test]
    fn empty_contours_are_skipped_in_batches_but_dimension_errors_are_not() {
        assert!(Error::EmptyContourSet.is_recoverable());
        assert!(!Error::DimensionMismatch { expected: 2, actual: 1 }.is_recoverable());
    }
}
