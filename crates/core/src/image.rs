//! Image identifiers and file names.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Extension every managed image is stored under.
pub const IMAGE_EXTENSION: &str = "webp";

/// Avatar shared by every account that never uploaded one. Never deleted.
pub const DEFAULT_AVATAR_FILE_NAME: &str = "vanilla.webp";

const IMAGE_ID_LEN: usize = 32;

/// Identifier handed to clients for a cached image.
///
/// The canonical form is a v4 UUID rendered as 32 lowercase hex digits
/// without hyphens. Parsing is strict so an identifier can never name a path
/// outside its directory.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageId(String);

impl ImageId {
    /// Generate a new random image ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Parse a client-supplied identifier.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let valid = s.len() == IMAGE_ID_LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(crate::Error::InvalidImageId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name this image is stored under in every managed directory.
    pub fn file_name(&self) -> ImageFileName {
        ImageFileName(format!("{}.{}", self.0, IMAGE_EXTENSION))
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ImageId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImageId> for String {
    fn from(id: ImageId) -> Self {
        id.0
    }
}

/// `<id>.<ext>` name of a file inside a managed directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageFileName(String);

impl ImageFileName {
    /// Validate an arbitrary stored file name.
    ///
    /// Only a single plain path component is accepted: no separators, no
    /// `.`/`..`, no leading dot.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let valid = !s.is_empty()
            && !s.starts_with('.')
            && !s.contains(['/', '\\', '\0'])
            && s != "..";
        if !valid {
            return Err(crate::Error::InvalidFileName(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier part, if this name follows the `<id>.webp` convention.
    pub fn image_id(&self) -> Option<ImageId> {
        let stem = self.0.strip_suffix(IMAGE_EXTENSION)?.strip_suffix('.')?;
        ImageId::parse(stem).ok()
    }
}

impl fmt::Display for ImageFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageFileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
