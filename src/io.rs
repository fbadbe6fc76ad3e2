use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::ConfigError;

/// Serializes an object to a pretty JSON file.
pub fn object_to_json<T: Serialize, P: AsRef<Path>>(output_path: P, object: &T) -> Result<(), ConfigError> {
    let path = output_path.as_ref();
    let j = serde_json::to_string_pretty(object).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })?;
    let io_err = |source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut file = std::fs::File::create(path).map_err(io_err)?;
    file.write_all(j.as_bytes()).map_err(io_err)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T, ConfigError> {
    let path = file_path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}
