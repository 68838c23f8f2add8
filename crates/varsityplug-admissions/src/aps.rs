//! Admission Point Score.
//!
//! Each subject contributes a band from 1 to 7 based on its percentage;
//! Life Orientation is recorded but never counted. A mark sheet has to be
//! structurally valid before it gets a score at all.

use crate::subjects::{self, SubjectCategory, REQUIRED_SUBJECTS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMark {
    pub subject: String,
    pub mark: i32,
}

impl SubjectMark {
    pub fn new(subject: impl Into<String>, mark: i32) -> Self {
        Self { subject: subject.into(), mark }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarksError {
    #[error("Please enter exactly 7 unique subjects (including Life Orientation). You entered {0}.")]
    WrongCount(usize),

    #[error("Missing subject for entry {0}.")]
    MissingSubject(usize),

    #[error("Invalid subject selected: {0}. Please select a valid NSC subject.")]
    UnknownSubject(String),

    #[error("Duplicate subject selected: {0}. Please select unique subjects.")]
    DuplicateSubject(String),

    #[error("Mark for {subject} must be between 0 and 100.")]
    OutOfRange { subject: String, mark: i32 },

    #[error("Missing required subject types: {}.", .0.join(", "))]
    MissingCategories(Vec<&'static str>),

    #[error("Choose either Mathematics or Mathematical Literacy, not both.")]
    BothMathematics,
}

/// Points for a single percentage.
pub fn points_for_mark(mark: i32) -> u32 {
    match mark {
        80.. => 7,
        70..=79 => 6,
        60..=69 => 5,
        50..=59 => 4,
        40..=49 => 3,
        30..=39 => 2,
        _ => 1,
    }
}

/// A validated set of seven marks with canonical subject names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkSheet {
    marks: Vec<SubjectMark>,
}

impl MarkSheet {
    /// Validate structure: count, empty names, ranges, duplicates and the
    /// mandatory categories. Subject names outside the NSC list are allowed
    /// and classified as electives.
    pub fn new(entries: Vec<SubjectMark>) -> Result<Self, MarksError> {
        Self::validate(entries, false)
    }

    /// Like [`MarkSheet::new`] but every subject must be an NSC subject.
    /// Used for marks entered through the web form.
    pub fn new_strict(entries: Vec<SubjectMark>) -> Result<Self, MarksError> {
        Self::validate(entries, true)
    }

    pub fn from_map(map: &BTreeMap<String, i32>) -> Result<Self, MarksError> {
        Self::new(map.iter().map(|(s, &m)| SubjectMark::new(s.clone(), m)).collect())
    }

    fn validate(entries: Vec<SubjectMark>, strict: bool) -> Result<Self, MarksError> {
        let mut marks = Vec::with_capacity(entries.len());
        let mut seen = HashSet::new();

        for (i, entry) in entries.into_iter().enumerate() {
            let subject = subjects::canonical_name(&entry.subject);
            if subject.is_empty() {
                return Err(MarksError::MissingSubject(i + 1));
            }
            if strict && !subjects::is_nsc_subject(&subject) {
                return Err(MarksError::UnknownSubject(subject));
            }
            if !seen.insert(subject.to_ascii_lowercase()) {
                return Err(MarksError::DuplicateSubject(subject));
            }
            if !(0..=100).contains(&entry.mark) {
                return Err(MarksError::OutOfRange { subject, mark: entry.mark });
            }
            marks.push(SubjectMark { subject, mark: entry.mark });
        }

        if marks.len() != REQUIRED_SUBJECTS {
            return Err(MarksError::WrongCount(marks.len()));
        }

        let categories: Vec<SubjectCategory> = marks
            .iter()
            .map(|m| SubjectCategory::classify(&m.subject))
            .collect();

        let missing: Vec<&'static str> = SubjectCategory::MANDATORY
            .iter()
            .filter(|c| !categories.contains(c))
            .map(|c| c.label())
            .collect();
        if !missing.is_empty() {
            return Err(MarksError::MissingCategories(missing));
        }

        let maths = categories.iter().filter(|c| **c == SubjectCategory::Mathematics).count();
        if maths > 1 {
            return Err(MarksError::BothMathematics);
        }

        Ok(Self { marks })
    }

    pub fn marks(&self) -> &[SubjectMark] {
        &self.marks
    }

    /// Sum of bands over every subject except Life Orientation.
    pub fn aps(&self) -> u32 {
        self.marks
            .iter()
            .filter(|m| SubjectCategory::classify(&m.subject) != SubjectCategory::LifeOrientation)
            .map(|m| points_for_mark(m.mark))
            .sum()
    }

    /// Subject → mark, as persisted on the student profile.
    pub fn to_map(&self) -> BTreeMap<String, i32> {
        self.marks.iter().map(|m| (m.subject.clone(), m.mark)).collect()
    }
}

/// APS for a list of marks, or `None` when the list is malformed.
pub fn calculate_aps(marks: &[SubjectMark]) -> Option<u32> {
    MarkSheet::new(marks.to_vec()).ok().map(|sheet| sheet.aps())
}
