//! Package artifact URI resolution.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Location of a function package artifact (a zip of script sources).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum PackageUri {
    /// HTTP(S): https://releases.example.com/metrics-fn.zip
    Https { url: String },
    /// Local file: file:///srv/packages/metrics-fn.zip or ./relative/path.zip
    File { path: String },
}

#[derive(Debug, Error)]
pub enum PackageUriError {
    #[error("unsupported package URI scheme: {0}")]
    UnsupportedScheme(String),
}

impl PackageUri {
    pub fn parse(uri: &str) -> Result<Self, PackageUriError> {
        if uri.starts_with("https://") || uri.starts_with("http://") {
            Ok(PackageUri::Https {
                url: uri.to_string(),
            })
        } else if let Some(path) = uri.strip_prefix("file://") {
            Ok(PackageUri::File {
                path: path.to_string(),
            })
        } else if uri.starts_with("./") || uri.starts_with('/') || uri.ends_with(".zip") {
            Ok(PackageUri::File {
                path: uri.to_string(),
            })
        } else {
            Err(PackageUriError::UnsupportedScheme(uri.to_string()))
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            PackageUri::Https { .. } => "https",
            PackageUri::File { .. } => "file",
        }
    }
}

impl fmt::Display for PackageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageUri::Https { url } => write!(f, "{url}"),
            PackageUri::File { path } => write!(f, "file://{path}"),
        }
    }
}
