use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Descriptor line {line}: {message}")]
    Descriptor { line: usize, message: String },
    #[error("Invalid output dimensions {width}x{height} (must be within {min}..={max})")]
    InvalidDimensions {
        width: u32,
        height: u32,
        min: u32,
        max: u32,
    },
    #[error("Sprite '{name}' is {width}x{height}, larger than the {max_width}x{max_height} sheet")]
    SpriteTooLarge {
        name: String,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("Out of space: packed {placed} of {total} sprites ({percent:.1}%), use a larger sheet")]
    OutOfSpace {
        placed: usize,
        total: usize,
        percent: f64,
    },
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },
    #[error("<{element}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("Unsupported map orientation '{0}', only orthogonal maps are supported")]
    UnsupportedOrientation(String),
    #[error("Unsupported layer data encoding '{0}'")]
    UnsupportedEncoding(String),
    #[error("Unsupported layer data compression '{0}'")]
    UnsupportedCompression(String),
    #[error("Layer '{layer}' has {actual} tiles, expected {expected}")]
    TileCountMismatch {
        layer: String,
        expected: usize,
        actual: usize,
    },
    #[error("Missing or unreadable dependency {path}")]
    MissingDependency { path: PathBuf },
    #[error("Duplicate layer name '{0}' (layer names must be unique, ignoring case)")]
    DuplicateLayerName(String),
    #[error("Corrupt data: {0}")]
    Corrupt(String),
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
    #[error("{path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ContentError>,
    },
}

impl ContentError {
    /// Attaches the file being compiled to an error, unless it already names one.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            e @ ContentError::InFile { .. } => e,
            e => ContentError::InFile {
                path: path.into(),
                source: Box::new(e),
            },
        }
    }

    pub(crate) fn missing(element: &str, attribute: &str) -> Self {
        ContentError::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub(crate) fn invalid(element: &str, attribute: &str, value: &str) -> Self {
        ContentError::InvalidAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;
