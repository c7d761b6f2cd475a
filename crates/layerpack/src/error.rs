//! Error types for the layerpack crate.

use std::fmt;

use crate::types::ResourceId;

/// Result type for layerpack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to obtain the bytes of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The store has no resource with this id.
    NotFound {
        /// The requested resource.
        id: ResourceId,
    },
    /// The resource exists but could not be read.
    Io {
        /// The requested resource.
        id: ResourceId,
        /// The underlying error message.
        message: String,
    },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound { id } => write!(f, "resource {id} not found"),
            FetchError::Io { id, message } => write!(f, "reading resource {id} failed: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// A layer descriptor could not be parsed into a field tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The descriptor text is not valid input for the config source.
    MalformedInput {
        /// Parser message.
        detail: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MalformedInput { detail } => {
                write!(f, "malformed layer descriptor: {detail}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A parsed layer descriptor does not describe a valid set of draw groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// A record is missing a required field or has the wrong type.
    Malformed {
        /// Deserializer message.
        detail: String,
    },
    /// A draw group names neither or both of `texture` and `diffuse_color`.
    Material {
        /// Position of the draw group in the layer.
        group: usize,
    },
    /// A draw range reaches past the group's declared index count.
    RangeOutOfBounds {
        /// Position of the draw group in the layer.
        group: usize,
        /// Position of the draw within the group.
        draw: usize,
        /// First index of the range.
        offset: usize,
        /// Number of indices in the range.
        count: usize,
        /// Declared index count of the group.
        num_indices: usize,
    },
    /// A buffer locator key has no entry in the locator table.
    UnknownLocator {
        /// Position of the draw group in the layer.
        group: usize,
        /// The unresolved key.
        key: String,
    },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::Malformed { detail } => write!(f, "malformed draw groups: {detail}"),
            DescriptorError::Material { group } => write!(
                f,
                "draw group {group} must have exactly one of texture or diffuse_color"
            ),
            DescriptorError::RangeOutOfBounds {
                group,
                draw,
                offset,
                count,
                num_indices,
            } => write!(
                f,
                "draw {draw} of group {group} covers [{offset}, {offset} + {count}) \
                 but the group has {num_indices} indices"
            ),
            DescriptorError::UnknownLocator { group, key } => {
                write!(f, "draw group {group} references unknown buffer {key:?}")
            }
        }
    }
}

impl std::error::Error for DescriptorError {}

/// A texture or color could not be turned into an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// No asset is registered under this name, or it could not be read.
    MissingAsset {
        /// The texture name as written in the descriptor.
        name: String,
    },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::MissingAsset { name } => write!(f, "missing texture asset {name:?}"),
        }
    }
}

impl std::error::Error for TextureError {}

/// Errors that can occur in layerpack operations.
#[derive(Debug)]
pub enum Error {
    /// Resource bytes could not be fetched.
    Fetch(FetchError),
    /// Descriptor text could not be parsed.
    Config(ConfigError),
    /// Descriptor contents are invalid.
    Descriptor(DescriptorError),
    /// An encoded buffer could not be decoded.
    Decode(layerpack_decode::DecodeError),
    /// A texture could not be resolved.
    Texture(TextureError),
    /// Every color index has been handed out.
    AllocationOverflow {
        /// The largest representable color index.
        max: u16,
    },
    /// The loader worker thread could not be started or panicked.
    Worker {
        /// Description of the failure.
        message: String,
    },
}

impl Error {
    /// Whether this error ends the whole loading session.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::AllocationOverflow { .. } | Error::Worker { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Fetch(e) => write!(f, "fetch error: {e}"),
            Error::Config(e) => write!(f, "config error: {e}"),
            Error::Descriptor(e) => write!(f, "descriptor error: {e}"),
            Error::Decode(e) => write!(f, "decode error: {e}"),
            Error::Texture(e) => write!(f, "texture error: {e}"),
            Error::AllocationOverflow { max } => {
                write!(f, "selection color indices exhausted (max {max})")
            }
            Error::Worker { message } => write!(f, "loader worker failed: {message}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Fetch(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Descriptor(e) => Some(e),
            Error::Decode(e) => Some(e),
            Error::Texture(e) => Some(e),
            Error::AllocationOverflow { .. } | Error::Worker { .. } => None,
        }
    }
}

impl From<FetchError> for Error {
    fn from(e: FetchError) -> Self {
        Error::Fetch(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DescriptorError> for Error {
    fn from(e: DescriptorError) -> Self {
        Error::Descriptor(e)
    }
}

impl From<layerpack_decode::DecodeError> for Error {
    fn from(e: layerpack_decode::DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<TextureError> for Error {
    fn from(e: TextureError) -> Self {
        Error::Texture(e)
    }
}
