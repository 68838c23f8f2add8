//! NSC subject names, categories and the marks-form layout.

use serde::Serialize;
use std::collections::BTreeMap;

/// Subjects offered in the National Senior Certificate.
pub const NSC_SUBJECTS: [&str; 42] = [
    "Accounting",
    "Agricultural Sciences",
    "Business Studies",
    "Computer Applications Technology",
    "Consumer Studies",
    "Dramatic Arts",
    "Economics",
    "Engineering Graphics and Design",
    "Geography",
    "History",
    "Information Technology",
    "Life Sciences",
    "Mathematics",
    "Mathematical Literacy",
    "Music",
    "Physical Sciences",
    "Religion Studies",
    "Tourism",
    "Visual Arts",
    "Afrikaans Home Language",
    "Afrikaans First Additional Language",
    "English Home Language",
    "English First Additional Language",
    "IsiNdebele Home Language",
    "IsiNdebele First Additional Language",
    "IsiXhosa Home Language",
    "IsiXhosa First Additional Language",
    "IsiZulu Home Language",
    "IsiZulu First Additional Language",
    "Sepedi Home Language",
    "Sepedi First Additional Language",
    "Sesotho Home Language",
    "Sesotho First Additional Language",
    "Setswana Home Language",
    "Setswana First Additional Language",
    "Siswati Home Language",
    "Siswati First Additional Language",
    "Tshivenda Home Language",
    "Tshivenda First Additional Language",
    "Xitsonga Home Language",
    "Xitsonga First Additional Language",
    "Life Orientation",
];

pub const LIFE_ORIENTATION: &str = "Life Orientation";
pub const MATHEMATICS: &str = "Mathematics";
pub const MATHEMATICAL_LITERACY: &str = "Mathematical Literacy";

/// Number of subjects a complete NSC mark sheet carries.
pub const REQUIRED_SUBJECTS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SubjectCategory {
    HomeLanguage,
    FirstAdditionalLanguage,
    Mathematics,
    LifeOrientation,
    Elective,
}

impl SubjectCategory {
    /// Categories every mark sheet must contain at least once.
    pub const MANDATORY: [SubjectCategory; 4] = [
        SubjectCategory::HomeLanguage,
        SubjectCategory::FirstAdditionalLanguage,
        SubjectCategory::Mathematics,
        SubjectCategory::LifeOrientation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubjectCategory::HomeLanguage => "Home Language",
            SubjectCategory::FirstAdditionalLanguage => "First Additional Language",
            SubjectCategory::Mathematics => "Mathematics or Math Literacy",
            SubjectCategory::LifeOrientation => "Life Orientation",
            SubjectCategory::Elective => "Elective",
        }
    }

    /// Classify a subject by name. Abbreviations are expanded first, so
    /// "English HL" and "English Home Language" land in the same bucket.
    pub fn classify(subject: &str) -> SubjectCategory {
        let name = canonical_name(subject);
        let lower = name.to_ascii_lowercase();
        if lower.ends_with("home language") {
            SubjectCategory::HomeLanguage
        } else if lower.ends_with("first additional language") {
            SubjectCategory::FirstAdditionalLanguage
        } else if is_mathematics(&name) {
            SubjectCategory::Mathematics
        } else if name.eq_ignore_ascii_case(LIFE_ORIENTATION) {
            SubjectCategory::LifeOrientation
        } else {
            SubjectCategory::Elective
        }
    }
}

fn is_mathematics(name: &str) -> bool {
    name.eq_ignore_ascii_case(MATHEMATICS) || name.eq_ignore_ascii_case(MATHEMATICAL_LITERACY)
}

/// Expand HL/FAL/LO abbreviations and collapse whitespace. Names that match
/// an NSC subject case-insensitively take the official spelling.
pub fn canonical_name(subject: &str) -> String {
    let words: Vec<&str> = subject.split_whitespace().collect();
    let expanded = match words.split_last() {
        Some((last, rest)) if last.eq_ignore_ascii_case("HL") && !rest.is_empty() => {
            format!("{} Home Language", rest.join(" "))
        }
        Some((last, rest)) if last.eq_ignore_ascii_case("FAL") && !rest.is_empty() => {
            format!("{} First Additional Language", rest.join(" "))
        }
        Some((only, [])) if only.eq_ignore_ascii_case("LO") => LIFE_ORIENTATION.to_string(),
        _ => words.join(" "),
    };

    NSC_SUBJECTS
        .iter()
        .find(|s| s.eq_ignore_ascii_case(&expanded))
        .map(|s| s.to_string())
        .unwrap_or(expanded)
}

pub fn is_nsc_subject(subject: &str) -> bool {
    NSC_SUBJECTS.contains(&subject)
}

// ── Marks form layout ───────────────────────────────────────────────────────

/// One row of the marks form. The form posts `subject_{index}` and
/// `mark_{index}` for each slot.
#[derive(Debug, Clone, Serialize)]
pub struct MarkSlot {
    pub index: usize,
    pub label: &'static str,
    pub options: Vec<&'static str>,
    pub selected_subject: String,
    pub mark: Option<i32>,
    /// Fixed slots have exactly one subject and render it read-only.
    pub fixed: bool,
}

/// Slot index reserved for Life Orientation.
pub const LIFE_ORIENTATION_SLOT: usize = 3;

fn slot_kind(index: usize) -> SubjectCategory {
    match index {
        0 => SubjectCategory::HomeLanguage,
        1 => SubjectCategory::FirstAdditionalLanguage,
        2 => SubjectCategory::Mathematics,
        LIFE_ORIENTATION_SLOT => SubjectCategory::LifeOrientation,
        _ => SubjectCategory::Elective,
    }
}

fn slot_label(index: usize) -> &'static str {
    match index {
        0 => "Home Language",
        1 => "First Additional Language",
        2 => "Mathematics or Mathematical Literacy",
        LIFE_ORIENTATION_SLOT => "Life Orientation",
        4 => "Elective 1",
        5 => "Elective 2",
        _ => "Elective 3",
    }
}

fn options_for(kind: SubjectCategory) -> Vec<&'static str> {
    NSC_SUBJECTS
        .iter()
        .copied()
        .filter(|s| match kind {
            SubjectCategory::Elective => {
                !s.contains("Language") && !is_mathematics(s) && *s != LIFE_ORIENTATION
            }
            other => SubjectCategory::classify(s) == other,
        })
        .collect()
}

/// Build the seven form slots, pre-filled from stored marks when present.
/// Stored subjects fill their category slot; electives fill the elective
/// slots in name order.
pub fn mark_slots(stored: Option<&BTreeMap<String, i32>>) -> Vec<MarkSlot> {
    let mut slots: Vec<MarkSlot> = (0..REQUIRED_SUBJECTS)
        .map(|index| {
            let kind = slot_kind(index);
            let fixed = kind == SubjectCategory::LifeOrientation;
            MarkSlot {
                index,
                label: slot_label(index),
                options: options_for(kind),
                selected_subject: if fixed { LIFE_ORIENTATION.to_string() } else { String::new() },
                mark: None,
                fixed,
            }
        })
        .collect();

    let Some(marks) = stored else {
        return slots;
    };

    let mut next_elective = 4;
    for (subject, &mark) in marks {
        let kind = SubjectCategory::classify(subject);
        let target = if kind == SubjectCategory::Elective {
            if next_elective >= REQUIRED_SUBJECTS {
                continue;
            }
            next_elective += 1;
            Some(next_elective - 1)
        } else {
            slots.iter().position(|s| slot_kind(s.index) == kind && s.mark.is_none())
        };
        if let Some(i) = target {
            slots[i].selected_subject = canonical_name(subject);
            slots[i].mark = Some(mark);
        }
    }
    slots
}
