use csv::Writer;
use std::{fs::File, path::Path};

use super::flatten::FlattenedRow;
use crate::error::AppError;

pub struct CsvGenerator;

impl CsvGenerator {
    /// Writes header and rows to `path`. A failure part-way leaves no usable
    /// output; the caller reruns from the records instead.
    pub fn generate(rows: &[FlattenedRow], path: &Path) -> Result<(), AppError> {
        let file = File::create(path).map_err(csv::Error::from)?;
        let mut wtr = Writer::from_writer(file);

        wtr.write_record(FlattenedRow::header())?;
        for row in rows {
            wtr.write_record(row.to_record())?;
        }

        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}
