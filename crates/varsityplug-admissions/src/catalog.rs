//! Static university catalog: thresholds, fees, due dates, faculties and
//! courses. Embedded at compile time and seeded into the database.

use crate::eligibility::Admissible;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

const EMBEDDED: &str = include_str!("../data/universities.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("catalog lists {0} more than once")]
    Duplicate(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacultyCourses {
    pub faculty: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogUniversity {
    pub name: String,
    pub minimum_aps: u32,
    pub province: String,
    pub description: String,
    pub application_fee: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub faculties: Vec<String>,
    #[serde(default)]
    pub courses: Vec<FacultyCourses>,
}

impl Admissible for CatalogUniversity {
    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_aps(&self) -> u32 {
        self.minimum_aps
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    university: Vec<CatalogUniversity>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    universities: Vec<CatalogUniversity>,
}

impl Catalog {
    /// The catalog shipped with the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_toml(EMBEDDED)
    }

    pub fn from_toml(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text)?;
        let mut seen = HashSet::new();
        for u in &file.university {
            if !seen.insert(u.name.as_str()) {
                return Err(CatalogError::Duplicate(u.name.clone()));
            }
        }
        tracing::debug!("Loaded university catalog with {} entries", file.university.len());
        Ok(Self { universities: file.university })
    }

    pub fn universities(&self) -> &[CatalogUniversity] {
        &self.universities
    }

    pub fn get(&self, name: &str) -> Option<&CatalogUniversity> {
        self.universities.iter().find(|u| u.name == name)
    }

    /// Faculties open for applications; empty when the catalog has none.
    pub fn faculties(&self, name: &str) -> &[String] {
        self.get(name).map(|u| u.faculties.as_slice()).unwrap_or(&[])
    }

    /// Course lists per faculty, where known.
    pub fn courses(&self, name: &str) -> &[FacultyCourses] {
        self.get(name).map(|u| u.courses.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::{eligible, SortOrder};

    #[test]
    fn test_embedded_catalog_loads() {
        let catalog = Catalog::embedded().unwrap();
        assert_eq!(catalog.universities().len(), 26);
        let uct = catalog.get("University of Cape Town (UCT)").unwrap();
        assert_eq!(uct.minimum_aps, 40);
        assert_eq!(uct.application_fee, "R100");
        assert_eq!(uct.due_date, NaiveDate::from_ymd_opt(2025, 7, 31).unwrap());
    }

    #[test]
    fn test_every_university_has_faculties() {
        let catalog = Catalog::embedded().unwrap();
        for u in catalog.universities() {
            assert!(!u.faculties.is_empty(), "{} has no faculties", u.name);
        }
        assert!(!catalog.courses("Durban University of Technology (DUT)").is_empty());
        assert!(catalog.faculties("Unknown University").is_empty());
    }

    #[test]
    fn test_filter_against_embedded_catalog() {
        let catalog = Catalog::embedded().unwrap();
        let matches = eligible(30, catalog.universities(), SortOrder::Threshold);
        assert!(!matches.is_empty());
        assert!(matches.iter().all(|u| u.minimum_aps <= 30));
        let expected = catalog.universities().iter().filter(|u| u.minimum_aps <= 30).count();
        assert_eq!(matches.len(), expected);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let text = r#"
            [[university]]
            name = "A"
            minimum_aps = 20
            province = "Gauteng"
            description = ""
            application_fee = "FREE"
            due_date = "2025-09-30"

            [[university]]
            name = "A"
            minimum_aps = 21
            province = "Gauteng"
            description = ""
            application_fee = "FREE"
            due_date = "2025-09-30"
        "#;
        assert!(matches!(Catalog::from_toml(text), Err(CatalogError::Duplicate(_))));
    }
}
