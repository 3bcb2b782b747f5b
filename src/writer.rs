//! JSON output. The document is written next to its destination and moved into place only once it
//! is complete, so a failed run never leaves a truncated file behind.

use crate::error::Result;
use crate::record::OutputRecord;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Serialize **records** into a single JSON array at **path**, replacing any existing file.
pub fn write_records(path: &Path, records: &[OutputRecord], pretty: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        if pretty {
            serde_json::to_writer_pretty(&mut writer, records)?;
        } else {
            serde_json::to_writer(&mut writer, records)?;
        }
        writer.flush()?;
    }
    file.persist(path)?;
    Ok(())
}
