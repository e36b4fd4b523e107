use serde::{Deserialize, Serialize};

/// One search-result card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub name: String,
    pub profile_url: String,
    pub image_url: Option<String>,
    pub open_to_work: bool,
    pub description: Option<String>,
    pub location: Option<String>,
    pub skills: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub location: String,
    pub company_url: String,
}

impl ExperienceEntry {
    /// An entry without a title or company is never stored.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.company.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    pub university: String,
    pub degree: String,
    pub duration: String,
}

impl EducationEntry {
    /// An entry without a school or degree is never stored.
    pub fn is_complete(&self) -> bool {
        !self.university.is_empty() && !self.degree.is_empty()
    }
}

/// A search-result card enriched with the experience and education read from
/// the profile page, both most-recent-first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(flatten)]
    pub summary: ProfileSummary,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
}

impl ProfileRecord {
    pub fn new(
        summary: ProfileSummary,
        experience: Vec<ExperienceEntry>,
        education: Vec<EducationEntry>,
    ) -> Self {
        Self {
            summary,
            experience: experience.into_iter().filter(ExperienceEntry::is_complete).collect(),
            education: education.into_iter().filter(EducationEntry::is_complete).collect(),
        }
    }

    /// A record for a profile whose detail page could not be read.
    pub fn summary_only(summary: ProfileSummary) -> Self {
        Self::new(summary, Vec::new(), Vec::new())
    }
}
