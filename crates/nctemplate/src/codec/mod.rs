//! Data object interchange.
//!
//! File collaborators (netCDF readers and writers, archival stores) plug in
//! through [`DataObjectReader`] and [`DataObjectWriter`]. A JSON
//! implementation of both is provided.

pub mod json;

pub use json::{decode_data_object, encode_data_object, JsonReader, JsonWriter};

use crate::error::CodecError;
use crate::model::DataObject;

/// Source of data objects.
pub trait DataObjectReader {
    fn read_data_object(&mut self) -> Result<DataObject, CodecError>;
}

/// Sink for data objects.
pub trait DataObjectWriter {
    fn write_data_object(&mut self, object: &DataObject) -> Result<(), CodecError>;
}
