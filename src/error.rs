use thiserror::Error;

/// Errors raised by source-scene drivers.
#[derive(Debug, Clone, Error)]
pub enum SceneError {
    /// The input could not be opened or decoded
    #[error("Cannot open scene source {path}: {message}")]
    Open { path: String, message: String },

    /// No driver with the requested name exists
    #[error("Unknown scene driver: {0}")]
    UnknownDriver(String),

    /// Requested scene index does not exist in the source
    #[error("Scene index {index} out of range: source has {count} scene(s)")]
    SceneIndexOutOfRange { index: usize, count: usize },

    /// A channel index is not part of the scene
    #[error("Channel {channel} out of range: scene has {count} channel(s)")]
    ChannelOutOfRange { channel: usize, count: usize },

    /// A slice or frame range is not part of the scene
    #[error("Plane range {start}..{end} out of range for {axis}: scene has {count}")]
    PlaneOutOfRange {
        axis: &'static str,
        start: usize,
        end: usize,
        count: usize,
    },

    /// Channels in one block read must share a data type
    #[error("Channels {channels:?} have different data types")]
    MixedDataTypes { channels: Vec<usize> },

    /// Pixel buffer does not match the plane geometry
    #[error("Plane buffer holds {actual} bytes, expected {expected}")]
    PlaneSize { expected: usize, actual: usize },

    /// Block rectangle extends past the scene bounds
    #[error("Block ({x},{y},{width},{height}) lies outside the scene ({scene_width}x{scene_height})")]
    BlockOutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        scene_width: i32,
        scene_height: i32,
    },
}

/// Errors raised by the TIFF container writer.
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// Tile operation before `set_tags`
    #[error("No directory is open: call set_tags first")]
    NoOpenDirectory,

    /// `set_tags` while another directory is still open
    #[error("Directory is already open: call write_directory first")]
    DirectoryAlreadyOpen,

    /// Tile position does not fall on the directory tile grid
    #[error("Tile position ({x},{y}) is outside the tile grid of a {width}x{height} directory")]
    TileOutOfGrid {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    /// Tile raster does not match the directory's tile layout
    #[error("Tile is {actual}, directory expects {expected}")]
    TileShape { expected: String, actual: String },

    /// Directory descriptor is not usable
    #[error("Invalid directory: {0}")]
    InvalidDirectory(String),

    /// File does not start with a TIFF or BigTIFF header
    #[error("Invalid TIFF header: {0}")]
    InvalidHeader(String),

    /// A value does not fit a classic TIFF offset
    #[error("Offset {0} exceeds classic TIFF limits; use BigTIFF")]
    OffsetOverflow(u64),

    /// Writer I/O failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TiffError {
    fn from(e: std::io::Error) -> Self {
        TiffError::Io(e.to_string())
    }
}

/// Errors raised while encoding tiles.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// Tile buffer does not match its declared geometry
    #[error("Tile buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// Raster layout the codec cannot encode
    #[error("Unsupported raster for {codec}: {reason}")]
    UnsupportedRaster { codec: &'static str, reason: String },

    /// Encoder reported a failure
    #[error("Failed to encode tile: {message}")]
    EncodeError { message: String },

    /// No encoder is available for this codec
    #[error("{0} encoder is not available")]
    Unavailable(&'static str),
}

/// Category of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,
    UnsupportedOperation,
    Scene,
    Container,
    Codec,
    Io,
}

/// Top-level conversion error.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Malformed parameters or out-of-bounds geometry
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation called out of order or inconsistent intermediate state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Codec or layout constraint violated
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Source scene failure
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Container writer failure
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// Tile codec failure
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ConvertError::InvalidArgument(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ConvertError::InvalidState(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        ConvertError::UnsupportedOperation(message.into())
    }

    /// Error category, for callers that branch on the failure class.
    ///
    /// A missing codec is reported as `UnsupportedOperation`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ConvertError::InvalidState(_) => ErrorKind::InvalidState,
            ConvertError::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            ConvertError::Scene(_) => ErrorKind::Scene,
            ConvertError::Tiff(_) => ErrorKind::Container,
            ConvertError::Codec(CodecError::Unavailable(_)) => ErrorKind::UnsupportedOperation,
            ConvertError::Codec(_) => ErrorKind::Codec,
            ConvertError::Io(_) => ErrorKind::Io,
        }
    }
}
