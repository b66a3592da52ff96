//! JSON encoding of data objects.
//!
//! The layout mirrors [`DataObject`]: ordered name lists next to name-keyed
//! maps. Dense arrays use `ndarray`'s serde form (`v`, `dim`, `data`).
//! NaN and infinite floats are written as `"NaN"`, `"Infinity"` and
//! `"-Infinity"`.

use std::io::{Read, Write};

use crate::codec::{DataObjectReader, DataObjectWriter};
use crate::error::CodecError;
use crate::model::DataObject;

/// Writes data objects as JSON documents.
#[derive(Debug)]
pub struct JsonWriter<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    /// Enables indented output.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DataObjectWriter for JsonWriter<W> {
    fn write_data_object(&mut self, object: &DataObject) -> Result<(), CodecError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, object)?;
        } else {
            serde_json::to_writer(&mut self.writer, object)?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads a data object from a JSON document.
#[derive(Debug)]
pub struct JsonReader<R: Read> {
    reader: R,
}

impl<R: Read> JsonReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> DataObjectReader for JsonReader<R> {
    fn read_data_object(&mut self) -> Result<DataObject, CodecError> {
        Ok(serde_json::from_reader(&mut self.reader)?)
    }
}

/// Encodes a data object as pretty-printed JSON.
pub fn encode_data_object(object: &DataObject) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(object)?)
}

/// Decodes a data object from JSON text.
pub fn decode_data_object(text: &str) -> Result<DataObject, CodecError> {
    Ok(serde_json::from_str(text)?)
}
