//! Eligibility of a student's APS against university thresholds.

/// Anything with a name and a minimum APS can be filtered for eligibility.
pub trait Admissible {
    fn name(&self) -> &str;
    fn minimum_aps(&self) -> u32;

    fn admits(&self, aps: u32) -> bool {
        self.minimum_aps() <= aps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending threshold, ties broken by name.
    Threshold,
    /// Alphabetical, as on the university list page.
    Name,
}

/// Entries whose minimum APS is at or below `aps`.
pub fn eligible<'a, T: Admissible>(aps: u32, catalog: &'a [T], order: SortOrder) -> Vec<&'a T> {
    let mut matches: Vec<&T> = catalog.iter().filter(|u| u.admits(aps)).collect();
    match order {
        SortOrder::Threshold => matches.sort_by(|a, b| {
            a.minimum_aps().cmp(&b.minimum_aps()).then_with(|| a.name().cmp(b.name()))
        }),
        SortOrder::Name => matches.sort_by(|a, b| a.name().cmp(b.name())),
    }
    matches
}

/// At most `limit` eligible entries, the most demanding thresholds the
/// student still meets first.
pub fn recommend<'a, T: Admissible>(aps: u32, catalog: &'a [T], limit: usize) -> Vec<&'a T> {
    let mut matches = eligible(aps, catalog, SortOrder::Name);
    matches.sort_by(|a, b| b.minimum_aps().cmp(&a.minimum_aps()));
    matches.truncate(limit);
    matches
}

/// Names of entries in `selected` that the APS does not meet.
pub fn above_threshold<T: Admissible>(aps: Option<u32>, selected: &[T]) -> Vec<String> {
    let Some(aps) = aps else {
        return Vec::new();
    };
    selected
        .iter()
        .filter(|u| !u.admits(aps))
        .map(|u| u.name().to_string())
        .collect()
}
