use log::debug;
use std::path::Path;

use tabfile_core::{reader::Reader, writer, Result, WriteOptions};

use crate::convert::{frame_to_table, table_to_frame};
use crate::frame::{Frame, Input};
use crate::validate::validated_frame;

/// Write a frame to `path`
///
/// The input is validated and fully converted before anything touches the
/// filesystem, and the file is replaced atomically, so a failed write never
/// leaves a file behind or alters an existing one.
pub fn write<P: AsRef<Path>>(input: &Input, path: P, options: &WriteOptions) -> Result<()> {
    let path = path.as_ref();
    let frame = validated_frame(input)?;
    let table = frame_to_table(frame)?;

    writer::write_table(&table, path, options)?;
    debug!(
        "Wrote {} rows x {} columns to {} ({})",
        table.num_rows(),
        table.num_columns(),
        path.display(),
        options.compression
    );
    Ok(())
}

/// Read the frame stored at `path`
pub fn read<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let table = Reader::open(path)?.read_table()?;
    table_to_frame(table)
}

/// Read only the named columns, in the order given
pub fn read_columns<P: AsRef<Path>>(path: P, columns: &[&str]) -> Result<Frame> {
    let table = Reader::open(path)?.read_columns(columns)?;
    table_to_frame(table)
}
