//! varsityplug-admissions: admission rules for South African universities.
//!
//! Everything here is pure: subject classification, APS banding, eligibility
//! against the university catalog, fee-string parsing and the subscription
//! gate. Persistence and HTTP live in other crates.

pub mod subjects;
pub mod aps;
pub mod eligibility;
pub mod fees;
pub mod subscription;
pub mod catalog;

pub use aps::{calculate_aps, points_for_mark, MarkSheet, MarksError, SubjectMark};
pub use catalog::{Catalog, CatalogError, CatalogUniversity};
pub use eligibility::{Admissible, SortOrder};
pub use fees::{FeeQuote, PaymentBreakdown};
pub use subjects::SubjectCategory;
pub use subscription::{ChangeKind, Feature, PackageChange, SelectionError, SubscriptionState};
