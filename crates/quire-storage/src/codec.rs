//! Text and JSON adapters over [`DurableFile`]
//!
//! The durable file itself stores opaque bytes. These helpers add UTF-8 and
//! JSON encodings on top.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::durable::{DurableFile, ReadOutcome};
use crate::error::StorageError;

impl DurableFile {
    /// Store a UTF-8 string
    pub fn write_utf8(&self, text: &str) -> Result<(), StorageError> {
        self.write(text.as_bytes())
    }

    /// Read the payload as UTF-8 text
    ///
    /// Invalid UTF-8 counts as corruption.
    pub fn read_utf8(&self) -> ReadOutcome<String> {
        self.read_with(|bytes| String::from_utf8(bytes.to_vec()))
    }

    /// Store `value` as JSON
    ///
    /// The value is serialized before anything on disk is touched, so a
    /// serialization error leaves the stored versions as they were.
    pub fn write_json<T: Serialize>(&self, value: &T, pretty: bool) -> Result<(), StorageError> {
        let encoded = if pretty {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        self.write(&encoded)
    }

    /// Read and deserialize a JSON payload
    pub fn read_json<T: DeserializeOwned>(&self) -> ReadOutcome<T> {
        self.read_with(|bytes| serde_json::from_slice::<T>(bytes))
    }
}
