//! Subscription packages: prices, application ceilings and feature gates.

use serde::Serialize;
use thiserror::Error;
use varsityplug_common::SubscriptionPackage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    FeeGuidance,
    CourseAdvice,
    WhatsappChat,
    Concierge,
}

/// Static terms of a package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageTerms {
    pub package: SubscriptionPackage,
    pub name: &'static str,
    /// Whole rand.
    pub price: u32,
    /// `None` is unlimited.
    pub application_limit: Option<u32>,
    pub features: &'static [Feature],
    pub highlights: &'static [&'static str],
}

/// Per-application service fee in rand, waived for concierge packages.
pub const SERVICE_FEE: u32 = 50;

pub fn terms(package: SubscriptionPackage) -> PackageTerms {
    match package {
        SubscriptionPackage::Basic => PackageTerms {
            package,
            name: package.label(),
            price: 400,
            application_limit: Some(3),
            features: &[],
            highlights: &["Up to 3 university applications", "APS calculator", "Document uploads"],
        },
        SubscriptionPackage::Standard => PackageTerms {
            package,
            name: package.label(),
            price: 600,
            application_limit: Some(5),
            features: &[Feature::FeeGuidance],
            highlights: &["Up to 5 university applications", "Application fee guidance"],
        },
        SubscriptionPackage::Premium => PackageTerms {
            package,
            name: package.label(),
            price: 800,
            application_limit: Some(7),
            features: &[Feature::FeeGuidance, Feature::CourseAdvice, Feature::WhatsappChat],
            highlights: &[
                "Up to 7 university applications",
                "Application fee guidance",
                "Course advice",
                "WhatsApp support",
            ],
        },
        SubscriptionPackage::Ultimate => PackageTerms {
            package,
            name: package.label(),
            price: 1000,
            application_limit: None,
            features: &[
                Feature::FeeGuidance,
                Feature::CourseAdvice,
                Feature::WhatsappChat,
                Feature::Concierge,
            ],
            highlights: &[
                "Unlimited university applications",
                "Everything in Premium",
                "Concierge: we submit applications for you",
            ],
        },
    }
}

pub fn has_feature(package: SubscriptionPackage, feature: Feature) -> bool {
    terms(package).features.contains(&feature)
}

pub fn service_fee(package: SubscriptionPackage) -> u32 {
    if has_feature(package, Feature::Concierge) { 0 } else { SERVICE_FEE }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Please activate a subscription package before selecting universities.")]
    Inactive,

    #[error("You have reached the limit of {limit} applications for the {package}. Upgrade your package to apply to more universities.")]
    LimitReached { package: &'static str, limit: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// First activation.
    Subscribed,
    Upgraded,
    /// Same or lower tier.
    Changed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageChange {
    pub kind: ChangeKind,
    /// Selections must be cleared and the count zeroed.
    pub reset_selections: bool,
}

/// The subscription fields of a student profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionState {
    pub package: SubscriptionPackage,
    pub active: bool,
    pub application_count: u32,
}

impl SubscriptionState {
    pub fn terms(&self) -> PackageTerms {
        terms(self.package)
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.active && has_feature(self.package, feature)
    }

    /// Move to `next`. The subscription becomes active; a strictly higher
    /// tier starts the application count over.
    pub fn change_package(&mut self, next: SubscriptionPackage) -> PackageChange {
        let was_active = self.active;
        let higher = next.rank() > self.package.rank();

        self.package = next;
        self.active = true;
        if higher {
            self.application_count = 0;
        }

        let kind = match (was_active, higher) {
            (false, _) => ChangeKind::Subscribed,
            (true, true) => ChangeKind::Upgraded,
            (true, false) => ChangeKind::Changed,
        };
        PackageChange { kind, reset_selections: higher }
    }

    /// Whether one more university may be selected.
    pub fn check_selection(&self) -> Result<(), SelectionError> {
        self.check_total(self.application_count + 1)
    }

    /// Whether a selection set of `total` universities fits the package.
    pub fn check_total(&self, total: u32) -> Result<(), SelectionError> {
        if !self.active {
            return Err(SelectionError::Inactive);
        }
        match self.terms().application_limit {
            Some(limit) if total > limit => Err(SelectionError::LimitReached {
                package: self.package.label(),
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Applications left, `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        self.terms()
            .application_limit
            .map(|limit| limit.saturating_sub(self.application_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(package: SubscriptionPackage, active: bool, count: u32) -> SubscriptionState {
        SubscriptionState { package, active, application_count: count }
    }

    #[test]
    fn test_limits_and_prices() {
        let limits: Vec<Option<u32>> = SubscriptionPackage::ALL
            .iter()
            .map(|p| terms(*p).application_limit)
            .collect();
        assert_eq!(limits, vec![Some(3), Some(5), Some(7), None]);
        let prices: Vec<u32> = SubscriptionPackage::ALL.iter().map(|p| terms(*p).price).collect();
        assert_eq!(prices, vec![400, 600, 800, 1000]);
    }

    #[test]
    fn test_feature_gates() {
        assert!(!has_feature(SubscriptionPackage::Basic, Feature::FeeGuidance));
        assert!(has_feature(SubscriptionPackage::Standard, Feature::FeeGuidance));
        assert!(!has_feature(SubscriptionPackage::Standard, Feature::CourseAdvice));
        assert!(has_feature(SubscriptionPackage::Premium, Feature::WhatsappChat));
        assert!(has_feature(SubscriptionPackage::Ultimate, Feature::Concierge));
        assert_eq!(service_fee(SubscriptionPackage::Premium), 50);
        assert_eq!(service_fee(SubscriptionPackage::Ultimate), 0);
    }

    #[test]
    fn test_upgrade_resets_count() {
        let mut s = state(SubscriptionPackage::Basic, true, 3);
        let change = s.change_package(SubscriptionPackage::Premium);
        assert_eq!(change.kind, ChangeKind::Upgraded);
        assert!(change.reset_selections);
        assert_eq!(s.application_count, 0);
        assert_eq!(s.package, SubscriptionPackage::Premium);
    }

    #[test]
    fn test_same_tier_keeps_count() {
        let mut s = state(SubscriptionPackage::Basic, true, 2);
        let change = s.change_package(SubscriptionPackage::Basic);
        assert_eq!(change.kind, ChangeKind::Changed);
        assert!(!change.reset_selections);
        assert_eq!(s.application_count, 2);
    }

    #[test]
    fn test_downgrade_keeps_count() {
        let mut s = state(SubscriptionPackage::Ultimate, true, 9);
        assert!(!s.change_package(SubscriptionPackage::Standard).reset_selections);
        assert_eq!(s.application_count, 9);
    }

    #[test]
    fn test_first_subscription_activates() {
        let mut s = state(SubscriptionPackage::Basic, false, 0);
        let change = s.change_package(SubscriptionPackage::Basic);
        assert_eq!(change.kind, ChangeKind::Subscribed);
        assert!(s.active);
    }

    #[test]
    fn test_gate_rejects_over_ceiling() {
        assert_eq!(state(SubscriptionPackage::Basic, true, 2).check_selection(), Ok(()));
        let err = state(SubscriptionPackage::Basic, true, 3).check_selection().unwrap_err();
        assert_eq!(err, SelectionError::LimitReached { package: "Basic Package", limit: 3 });
        assert!(err.to_string().contains("Upgrade"));
        assert_eq!(state(SubscriptionPackage::Ultimate, true, 40).check_selection(), Ok(()));
    }

    #[test]
    fn test_gate_rejects_inactive() {
        assert_eq!(
            state(SubscriptionPackage::Premium, false, 0).check_selection(),
            Err(SelectionError::Inactive)
        );
    }

    #[test]
    fn test_remaining() {
        assert_eq!(state(SubscriptionPackage::Standard, true, 2).remaining(), Some(3));
        assert_eq!(state(SubscriptionPackage::Ultimate, true, 2).remaining(), None);
    }
}
