//! Directories whose contents the lifecycle manages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A managed directory, also used as the scope tag of a pending deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagedDirectory {
    /// Uploaded images not yet attached to a post.
    Cache,
    /// User avatars.
    Avatar,
    /// Images attached to published posts.
    PostImage,
}

impl ManagedDirectory {
    pub const ALL: [ManagedDirectory; 3] = [Self::Cache, Self::Avatar, Self::PostImage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Avatar => "avatar",
            Self::PostImage => "post_image",
        }
    }
}

impl fmt::Display for ManagedDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManagedDirectory {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "cache" => Ok(Self::Cache),
            "avatar" => Ok(Self::Avatar),
            "post_image" => Ok(Self::PostImage),
            other => Err(crate::Error::UnknownDirectory(other.to_string())),
        }
    }
}
