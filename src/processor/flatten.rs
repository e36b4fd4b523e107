use crate::scraping::models::{EducationEntry, ExperienceEntry, ProfileRecord};
use crate::scraping::text::collapse_whitespace;

pub const MAX_JOBS: usize = 3;
pub const MAX_EDUCATIONS: usize = 2;

const BASE_COLUMNS: [&str; 7] = [
    "Name",
    "Profile URL",
    "Image URL",
    "Location",
    "Description",
    "Skills",
    "Open to Work",
];
const JOB_COLUMNS: [&str; 4] = ["Title", "Company", "Duration", "Location"];
const EDU_COLUMNS: [&str; 3] = ["University", "Degree", "Duration"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobColumns {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub location: String,
}

impl From<&ExperienceEntry> for JobColumns {
    fn from(entry: &ExperienceEntry) -> Self {
        Self {
            title: collapse_whitespace(&entry.title),
            company: collapse_whitespace(&entry.company),
            duration: collapse_whitespace(&entry.duration),
            location: collapse_whitespace(&entry.location),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EduColumns {
    pub university: String,
    pub degree: String,
    pub duration: String,
}

impl From<&EducationEntry> for EduColumns {
    fn from(entry: &EducationEntry) -> Self {
        Self {
            university: collapse_whitespace(&entry.university),
            degree: collapse_whitespace(&entry.degree),
            duration: collapse_whitespace(&entry.duration),
        }
    }
}

/// A profile projected onto the fixed output columns: the first three jobs and
/// the first two educations, blanks where a profile has fewer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedRow {
    pub name: String,
    pub profile_url: String,
    pub image_url: String,
    pub location: String,
    pub description: String,
    pub skills: String,
    pub open_to_work: bool,
    pub jobs: [JobColumns; MAX_JOBS],
    pub educations: [EduColumns; MAX_EDUCATIONS],
}

impl FlattenedRow {
    pub fn header() -> Vec<String> {
        let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        for i in 1..=MAX_JOBS {
            header.extend(JOB_COLUMNS.iter().map(|c| format!("Job {} {}", i, c)));
        }
        for i in 1..=MAX_EDUCATIONS {
            header.extend(EDU_COLUMNS.iter().map(|c| format!("Edu {} {}", i, c)));
        }
        header
    }

    pub fn column_count() -> usize {
        BASE_COLUMNS.len() + MAX_JOBS * JOB_COLUMNS.len() + MAX_EDUCATIONS * EDU_COLUMNS.len()
    }

    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![
            self.name.clone(),
            self.profile_url.clone(),
            self.image_url.clone(),
            self.location.clone(),
            self.description.clone(),
            self.skills.clone(),
            if self.open_to_work { "Yes" } else { "No" }.to_string(),
        ];
        for job in &self.jobs {
            record.extend([
                job.title.clone(),
                job.company.clone(),
                job.duration.clone(),
                job.location.clone(),
            ]);
        }
        for edu in &self.educations {
            record.extend([edu.university.clone(), edu.degree.clone(), edu.duration.clone()]);
        }
        record
    }
}

fn cell(value: &Option<String>) -> String {
    value.as_deref().map(collapse_whitespace).unwrap_or_default()
}

pub fn flatten(record: &ProfileRecord) -> FlattenedRow {
    let summary = &record.summary;
    let mut row = FlattenedRow {
        name: collapse_whitespace(&summary.name),
        profile_url: summary.profile_url.trim().to_string(),
        image_url: cell(&summary.image_url),
        location: cell(&summary.location),
        description: cell(&summary.description),
        skills: cell(&summary.skills),
        open_to_work: summary.open_to_work,
        ..FlattenedRow::default()
    };

    for (slot, entry) in row.jobs.iter_mut().zip(&record.experience) {
        *slot = JobColumns::from(entry);
    }
    for (slot, entry) in row.educations.iter_mut().zip(&record.education) {
        *slot = EduColumns::from(entry);
    }
    row
}
