//! Signal extraction: deriving normalized scoring inputs from a profile.
//!
//! Everything here is a pure function of the record and the policy's lists.
//! Extraction never fails; missing fields read as zero matches.

use serde::Serialize;

use makerscout_common::{CurationPolicy, ProfileRecord, UrlKind, UrlLists};

/// Derived facts about one record: which keywords matched per category, how
/// the external link classifies, and the business flag. Carried alongside the
/// record through the pipeline and serialized with the output for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalBundle {
    pub product_matches: Vec<String>,
    pub weak_matches: Vec<String>,
    pub aesthetic_matches: Vec<String>,
    pub negative_matches: Vec<String>,
    pub personal_matches: Vec<String>,
    pub url: UrlKind,
    pub is_business: bool,
}

impl SignalBundle {
    pub fn product_count(&self) -> usize {
        self.product_matches.len()
    }

    pub fn weak_count(&self) -> usize {
        self.weak_matches.len()
    }

    pub fn aesthetic_count(&self) -> usize {
        self.aesthetic_matches.len()
    }

    pub fn negative_count(&self) -> usize {
        self.negative_matches.len()
    }

    pub fn personal_count(&self) -> usize {
        self.personal_matches.len()
    }

    /// All positive evidence combined: product plus weak plus aesthetic.
    pub fn positive_count(&self) -> usize {
        self.product_count() + self.weak_count() + self.aesthetic_count()
    }
}

/// Derive the signal bundle for one record.
pub fn extract(record: &ProfileRecord, policy: &CurationPolicy) -> SignalBundle {
    let text = &record.combined_text;
    let keywords = &policy.keywords;
    SignalBundle {
        product_matches: keyword_matches(text, &keywords.product),
        weak_matches: keyword_matches(text, &keywords.weak),
        aesthetic_matches: keyword_matches(text, &keywords.aesthetic),
        negative_matches: keyword_matches(text, &keywords.negative),
        personal_matches: keyword_matches(text, &keywords.personal),
        url: classify_url(&record.external_url, &record.domain, &policy.urls),
        is_business: record.is_business_account,
    }
}

/// Distinct keywords contained in `text` (case-insensitive; `text` is already
/// lowercased combined text). Counting distinct keywords rather than
/// occurrences caps the influence of keyword stuffing.
fn keyword_matches(text: &str, keywords: &[String]) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    keywords
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .cloned()
        .collect()
}

/// Classify the external link. First match wins, and the order matters:
/// non-shop domains are checked before shop-path patterns, so a ticketing URL
/// that happens to contain `/shop` stays [`UrlKind::NonShop`]. Big-brand
/// domains are the rules engine's concern, not this function's.
pub fn classify_url(url: &str, domain: &str, lists: &UrlLists) -> UrlKind {
    if url.trim().is_empty() {
        return UrlKind::None;
    }
    let url_lower = url.to_lowercase();

    if lists.non_shop.iter().any(|entry| domain.contains(entry.as_str())) {
        return UrlKind::NonShop;
    }
    if lists.shop.iter().any(|entry| domain.contains(entry.as_str())) {
        return UrlKind::Shop;
    }
    if lists.aggregator.iter().any(|entry| domain.contains(entry.as_str())) {
        return UrlKind::Aggregator;
    }
    if lists.shop_paths.iter().any(|pattern| url_lower.contains(pattern.as_str())) {
        return UrlKind::Shop;
    }
    // A URL exists but matches nothing known: treat it as the account's own
    // domain even when the host looks odd.
    UrlKind::OwnDomain
}

#[cfg(test)]
mod tests {
    use super::*;
    use makerscout_common::RawProfile;

    fn record(bio: &str, url: &str) -> ProfileRecord {
        ProfileRecord::from_raw(RawProfile {
            username: "tester".to_string(),
            biography: bio.to_string(),
            external_url: url.to_string(),
            ..RawProfile::default()
        })
    }

    #[test]
    fn extraction_is_idempotent() {
        let policy = CurationPolicy::gated();
        let rec = record("Handmade beaded jewelry, DM for orders", "https://dnbeadz.com/");
        assert_eq!(extract(&rec, &policy), extract(&rec, &policy));
    }

    #[test]
    fn keyword_stuffing_counts_once() {
        let policy = CurationPolicy::gated();
        let stuffed = record("handmade handmade handmade handmade", "");
        let once = record("handmade", "");
        assert_eq!(
            extract(&stuffed, &policy).product_count(),
            extract(&once, &policy).product_count()
        );
    }

    #[test]
    fn empty_record_extracts_clean() {
        let policy = CurationPolicy::gated();
        let signals = extract(&record("", ""), &policy);
        assert_eq!(signals.positive_count(), 0);
        assert_eq!(signals.negative_count(), 0);
        assert_eq!(signals.url, UrlKind::None);
    }

    #[test]
    fn ticketing_url_with_shop_path_stays_non_shop() {
        let policy = CurationPolicy::gated();
        let rec = record("", "https://www.eventbrite.com/shop/festival-tickets");
        assert_eq!(extract(&rec, &policy).url, UrlKind::NonShop);
    }

    #[test]
    fn marketplace_domain_classifies_as_shop() {
        let policy = CurationPolicy::gated();
        let rec = record("", "http://kandibeanco.etsy.com/");
        assert_eq!(extract(&rec, &policy).url, UrlKind::Shop);
    }

    #[test]
    fn aggregator_and_own_domain() {
        let policy = CurationPolicy::gated();
        assert_eq!(
            extract(&record("", "https://linktr.ee/somevendor"), &policy).url,
            UrlKind::Aggregator
        );
        assert_eq!(
            extract(&record("", "https://dnbeadz.com/"), &policy).url,
            UrlKind::OwnDomain
        );
    }

    #[test]
    fn shop_path_on_own_domain_classifies_as_shop() {
        let policy = CurationPolicy::gated();
        let rec = record("", "https://coolcrafts.net/shop");
        assert_eq!(extract(&rec, &policy).url, UrlKind::Shop);
    }

    #[test]
    fn triage_profile_has_no_non_shop_class() {
        let policy = CurationPolicy::triage();
        let rec = record("", "https://www.universe.com/events/some-festival");
        // Triage predates the non-shop list; the link reads as an own domain.
        assert_eq!(extract(&rec, &policy).url, UrlKind::OwnDomain);
    }
}
