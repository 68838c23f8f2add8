//! Application fees: parsing the published fee strings, payment breakdowns
//! and bank-deposit references.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    Free,
    Fixed,
    /// On-time fee with a higher late fee.
    Tiered,
    Unavailable,
}

/// A fee string reduced to numbers. `on_time` is in whole rand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeQuote {
    pub on_time: u32,
    pub late: Option<u32>,
    pub kind: FeeKind,
    pub text: String,
}

impl FeeQuote {
    pub fn is_free(&self) -> bool {
        self.kind == FeeKind::Free
    }

    pub fn is_payable(&self) -> bool {
        self.on_time > 0
    }
}

const UNAVAILABLE_MARKERS: [&str; 4] = ["n/a", "not available", "not specified", "tbd"];

/// Parse a fee string such as "R250 (on-time), R470 (late)".
///
/// The first amount is the on-time fee. Strings starting with "free" cost
/// nothing even when a paper route is priced after the comma. Anything
/// without a usable amount is zero and marked unavailable.
pub fn parse_fee(text: &str) -> FeeQuote {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    let quote = |on_time, late, kind| FeeQuote { on_time, late, kind, text: trimmed.to_string() };

    if lower.is_empty() || UNAVAILABLE_MARKERS.iter().any(|m| lower.starts_with(m)) {
        return quote(0, None, FeeKind::Unavailable);
    }
    if lower.starts_with("free") {
        return quote(0, None, FeeKind::Free);
    }

    let mut parts = trimmed.split(',');
    let on_time = parts.next().and_then(first_amount);
    let late = parts
        .filter(|p| p.to_ascii_lowercase().contains("late"))
        .find_map(first_amount);

    match (on_time, late) {
        (Some(0), _) => quote(0, None, FeeKind::Free),
        (Some(fee), Some(late)) => quote(fee, Some(late), FeeKind::Tiered),
        (Some(fee), None) => quote(fee, None, FeeKind::Fixed),
        (None, _) => quote(0, None, FeeKind::Unavailable),
    }
}

/// Digit groups separated by single spaces, as in "R1 000".
static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?: \d{3})*").expect("amount pattern is valid"));

/// First amount in `part`, with thousands separators removed.
fn first_amount(part: &str) -> Option<u32> {
    let found = AMOUNT.find(part)?;
    found.as_str().replace(' ', "").parse().ok()
}

pub fn on_time_fee(text: &str) -> u32 {
    parse_fee(text).on_time
}

/// What the university list shows in the fee column. Priced fees are
/// hidden behind fee guidance; free and unknown fees are always shown.
pub fn fee_display(text: &str, has_fee_guidance: bool) -> String {
    let quote = parse_fee(text);
    match quote.kind {
        FeeKind::Fixed | FeeKind::Tiered if !has_fee_guidance => "Upgrade Required".to_string(),
        FeeKind::Unavailable if quote.text.is_empty() => "Not available".to_string(),
        _ => quote.text,
    }
}

// ── Breakdown ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FeeLine {
    pub university_id: i64,
    pub university: String,
    pub quote: FeeQuote,
}

/// University fees for a set of selections plus the package cost.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentBreakdown {
    pub lines: Vec<FeeLine>,
    pub university_total: u32,
    pub package_cost: u32,
    pub total: u32,
}

impl PaymentBreakdown {
    /// `selections` yields (university id, name, fee text).
    pub fn build<'a, I>(selections: I, package_cost: u32) -> Self
    where
        I: IntoIterator<Item = (i64, &'a str, &'a str)>,
    {
        let lines: Vec<FeeLine> = selections
            .into_iter()
            .map(|(university_id, name, fee)| FeeLine {
                university_id,
                university: name.to_string(),
                quote: parse_fee(fee),
            })
            .collect();
        let university_total = lines.iter().map(|l| l.quote.on_time).sum();
        Self {
            lines,
            university_total,
            package_cost,
            total: university_total + package_cost,
        }
    }

    /// Universities that actually need a deposit.
    pub fn payable(&self) -> impl Iterator<Item = &FeeLine> {
        self.lines.iter().filter(|l| l.quote.is_payable())
    }
}

// ── Bank deposit ────────────────────────────────────────────────────────────

/// Account details shown on every payment-instructions page.
#[derive(Debug, Clone, Serialize)]
pub struct BankDetails {
    pub bank_name: &'static str,
    pub account_holder: &'static str,
    pub account_number: &'static str,
    pub branch_code: &'static str,
    pub reference: String,
}

impl BankDetails {
    pub fn with_reference(reference: String) -> Self {
        Self {
            bank_name: "VarsityPlug Bank (Example)",
            account_holder: "Varsity Plug Applications",
            account_number: "9876543210",
            branch_code: "654321",
            reference,
        }
    }
}

pub fn single_fee_reference(user_id: i64, university_id: i64) -> String {
    format!("VP{user_id}U{university_id}")
}

/// `VPPKG…` when the deposit covers the package cost, `VPBULK…` otherwise.
pub fn bulk_reference(user_id: i64, university_ids: &[i64], includes_package: bool) -> String {
    let prefix = if includes_package { "VPPKG" } else { "VPBULK" };
    let mut reference = format!("{prefix}{user_id}");
    for id in university_ids {
        reference.push_str(&format!("-U{id}"));
    }
    reference
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_and_fixed() {
        assert_eq!(on_time_fee("FREE"), 0);
        assert!(parse_fee("FREE").is_free());
        assert_eq!(on_time_fee("R100"), 100);
        assert_eq!(parse_fee("R100").kind, FeeKind::Fixed);
    }

    #[test]
    fn test_tiered_keeps_late_fee() {
        let quote = parse_fee("R250 (on-time), R470 (late)");
        assert_eq!(quote.on_time, 250);
        assert_eq!(quote.late, Some(470));
        assert_eq!(quote.kind, FeeKind::Tiered);
    }

    #[test]
    fn test_free_online_route_wins() {
        let quote = parse_fee("FREE (online), R245 (manual via CAO)");
        assert_eq!(quote.on_time, 0);
        assert_eq!(quote.kind, FeeKind::Free);
    }

    #[test]
    fn test_unparseable_is_unavailable() {
        for text in ["N/A", "Not specified", "", "call the office"] {
            let quote = parse_fee(text);
            assert_eq!(quote.on_time, 0, "{text}");
            assert_eq!(quote.kind, FeeKind::Unavailable, "{text}");
        }
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(on_time_fee("R1 000"), 1000);
        assert_eq!(on_time_fee("R 150 (online)"), 150);
        assert_eq!(parse_fee("R1 000 (on-time), R1 500 (late)").late, Some(1500));
    }

    #[test]
    fn test_fee_display_gating() {
        assert_eq!(fee_display("R100", false), "Upgrade Required");
        assert_eq!(fee_display("R100", true), "R100");
        assert_eq!(fee_display("FREE", false), "FREE");
    }

    #[test]
    fn test_breakdown_totals() {
        let selections = vec![
            (1, "UCT", "R100"),
            (2, "UWC", "FREE"),
            (3, "DUT", "R250 (on-time), R470 (late)"),
        ];
        let breakdown = PaymentBreakdown::build(selections, 800);
        assert_eq!(breakdown.university_total, 350);
        assert_eq!(breakdown.total, 1150);
        let payable: Vec<i64> = breakdown.payable().map(|l| l.university_id).collect();
        assert_eq!(payable, vec![1, 3]);
    }

    #[test]
    fn test_references() {
        assert_eq!(single_fee_reference(12, 4), "VP12U4");
        assert_eq!(bulk_reference(12, &[4, 9], false), "VPBULK12-U4-U9");
        assert_eq!(bulk_reference(12, &[4], true), "VPPKG12-U4");
        assert_eq!(BankDetails::with_reference("VP1U1".into()).account_number, "9876543210");
    }
}
