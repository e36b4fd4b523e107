pub mod csv_generator;
pub mod flatten;
pub mod progress_tracker;

pub use csv_generator::CsvGenerator;
pub use flatten::{flatten, FlattenedRow};
pub use progress_tracker::ProgressTracker;

use std::path::Path;

use crate::error::AppError;
use crate::scraping::models::ProfileRecord;

/// Collects the records of one run and writes them out at the end.
#[derive(Debug, Default)]
pub struct ResultSink {
    records: Vec<ProfileRecord>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ProfileRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: ProfileRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ProfileRecord] {
        &self.records
    }

    pub fn rows(&self) -> Vec<FlattenedRow> {
        self.records.iter().map(flatten).collect()
    }

    /// Flattens every record and writes the output table to `destination`.
    pub fn flatten_and_write(&self, destination: &Path) -> Result<(), AppError> {
        CsvGenerator::generate(&self.rows(), destination)?;
        tracing::info!(
            "Saved {} flattened profiles to {}",
            self.records.len(),
            destination.display()
        );
        Ok(())
    }

    /// Keeps the unflattened records so the table can be rebuilt without scraping again.
    pub fn write_records(&self, destination: &Path) -> Result<(), AppError> {
        let json = serde_json::to_vec_pretty(&self.records)?;
        std::fs::write(destination, json)?;
        tracing::info!("Saved {} raw records to {}", self.records.len(), destination.display());
        Ok(())
    }

    pub fn read_records(source: &Path) -> Result<Self, AppError> {
        let bytes = std::fs::read(source)?;
        Ok(Self::from_records(serde_json::from_slice(&bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::models::{ExperienceEntry, ProfileSummary};

    #[test]
    fn records_survive_a_round_trip_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let records_path = dir.path().join("records.json");
        let table_path = dir.path().join("profiles.csv");

        let mut sink = ResultSink::new();
        sink.push(ProfileRecord::new(
            ProfileSummary {
                name: "Jane Doe".into(),
                profile_url: "https://www.linkedin.com/in/jane".into(),
                open_to_work: true,
                ..Default::default()
            },
            vec![ExperienceEntry {
                title: "Engineer".into(),
                company: "Acme".into(),
                ..Default::default()
            }],
            vec![],
        ));
        sink.write_records(&records_path).unwrap();

        let reloaded = ResultSink::read_records(&records_path).unwrap();
        assert_eq!(reloaded.records(), sink.records());

        reloaded.flatten_and_write(&table_path).unwrap();
        let table = std::fs::read_to_string(&table_path).unwrap();
        assert_eq!(table.lines().count(), 2);
        assert!(table.lines().nth(1).unwrap().starts_with("Jane Doe,"));
    }
}
