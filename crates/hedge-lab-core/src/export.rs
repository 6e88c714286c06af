//! CSV persistence for any row type that derives serde.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use crate::HedgeResult;

/// Write `rows` as a CSV table with a header taken from the field names.
pub fn write_csv<T: Serialize, W: Write>(rows: &[T], writer: W) -> HedgeResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read every row of a CSV table written by [`write_csv`].
pub fn read_csv<T: DeserializeOwned, R: Read>(reader: R) -> HedgeResult<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn export_csv<T: Serialize>(rows: &[T], path: impl AsRef<Path>) -> HedgeResult<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), rows = rows.len(), "exporting csv");
    write_csv(rows, File::create(path)?)
}

pub fn import_csv<T: DeserializeOwned>(path: impl AsRef<Path>) -> HedgeResult<Vec<T>> {
    read_csv(File::open(path.as_ref())?)
}
