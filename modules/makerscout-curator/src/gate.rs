//! Post-LLM validation gate: hard business requirements.
//!
//! The model alone proved insufficiently strict about purchase paths, so the
//! gate re-checks every approval candidate deterministically. Each check is
//! an unconditional override regardless of score; the first failing check
//! wins and later checks are not evaluated.

use serde::Serialize;

use makerscout_common::{GatePolicy, LlmVerdict, ProfileRecord, UrlKind};

use crate::signals::SignalBundle;

/// Why the gate forced a record to `no`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRejection {
    /// LLM score below the approval threshold.
    LowScore,
    /// No shop-like URL and no DM-order phrase in the bio.
    NoPurchasePath,
    /// The model itself said the account sells no tangible products.
    NoProducts,
    /// The link is a ticketing/social/payment destination. Defense in depth
    /// against the model being charmed by aesthetic alone.
    NonShopUrl,
}

/// Per-check rejection counts for the run summary.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct GateTally {
    pub low_score: usize,
    pub no_shop: usize,
    pub no_products: usize,
    pub non_shop_url: usize,
}

impl GateTally {
    pub fn count(&mut self, rejection: GateRejection) {
        match rejection {
            GateRejection::LowScore => self.low_score += 1,
            GateRejection::NoPurchasePath => self.no_shop += 1,
            GateRejection::NoProducts => self.no_products += 1,
            GateRejection::NonShopUrl => self.non_shop_url += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low_score + self.no_shop + self.no_products + self.non_shop_url
    }
}

/// Run the four hard checks. `None` means the record passed them all.
pub fn evaluate(
    record: &ProfileRecord,
    signals: &SignalBundle,
    verdict: &LlmVerdict,
    approve_at: f64,
    gate: &GatePolicy,
) -> Option<GateRejection> {
    if verdict.score < approve_at {
        return Some(GateRejection::LowScore);
    }
    if !has_purchase_path(record, signals, gate) {
        return Some(GateRejection::NoPurchasePath);
    }
    if verdict.sells_products == Some(false) {
        return Some(GateRejection::NoProducts);
    }
    if signals.url == UrlKind::NonShop {
        return Some(GateRejection::NonShopUrl);
    }
    None
}

/// A verifiable way to buy: a shop-like link, or an explicit DM-order phrase
/// in the bio. Aggregators count; they usually front a shop the model has
/// already vouched for.
fn has_purchase_path(record: &ProfileRecord, signals: &SignalBundle, gate: &GatePolicy) -> bool {
    if signals.url.is_purchase_path() {
        return true;
    }
    let bio = record.biography.to_lowercase();
    gate.dm_order_phrases.iter().any(|phrase| bio.contains(phrase.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals;
    use makerscout_common::{CurationPolicy, RawProfile};

    fn gated_policy() -> CurationPolicy {
        CurationPolicy::gated()
    }

    fn record(bio: &str, url: &str) -> ProfileRecord {
        ProfileRecord::from_raw(RawProfile {
            username: "vendor".to_string(),
            biography: bio.to_string(),
            follower_count: 5_000,
            external_url: url.to_string(),
            ..RawProfile::default()
        })
    }

    fn verdict(score: f64, sells: bool) -> LlmVerdict {
        LlmVerdict {
            score,
            reason: "test".to_string(),
            sells_products: Some(sells),
            has_shop: Some(true),
            festival_aesthetic: Some(true),
        }
    }

    fn run_gate(rec: &ProfileRecord, v: &LlmVerdict) -> Option<GateRejection> {
        let policy = gated_policy();
        let bundle = signals::extract(rec, &policy);
        evaluate(
            rec,
            &bundle,
            v,
            policy.llm.approve_at,
            policy.gate.as_ref().expect("gated policy has a gate"),
        )
    }

    #[test]
    fn perfect_score_without_purchase_path_is_rejected() {
        let rec = record("Beautiful handmade art", "");
        let rejection = run_gate(&rec, &verdict(1.0, true));
        assert_eq!(rejection, Some(GateRejection::NoPurchasePath));
    }

    #[test]
    fn dm_order_phrase_counts_as_purchase_path() {
        let rec = record("Handmade art, DM for orders", "");
        assert_eq!(run_gate(&rec, &verdict(0.9, true)), None);
    }

    #[test]
    fn low_score_rejects_before_purchase_path() {
        // First failure wins: no purchase path either, but the score check
        // comes first and the tally must say so.
        let rec = record("Beautiful handmade art", "");
        assert_eq!(run_gate(&rec, &verdict(0.5, true)), Some(GateRejection::LowScore));
    }

    #[test]
    fn model_denied_products_rejects() {
        let rec = record("art page", "https://etsy.com/shop/vendor");
        assert_eq!(
            run_gate(&rec, &verdict(0.8, false)),
            Some(GateRejection::NoProducts)
        );
    }

    #[test]
    fn legacy_verdict_without_sub_verdicts_passes_product_check() {
        let rec = record("art page", "https://etsy.com/shop/vendor");
        let mut v = verdict(0.8, true);
        v.sells_products = None;
        assert_eq!(run_gate(&rec, &v), None);
    }

    #[test]
    fn non_shop_url_rejects_even_with_dm_phrase() {
        // The DM phrase satisfies check 2, but check 4 still fires on the
        // link itself.
        let rec = record(
            "Handmade art, DM for orders",
            "https://www.universe.com/events/fest-tickets",
        );
        assert_eq!(
            run_gate(&rec, &verdict(0.9, true)),
            Some(GateRejection::NonShopUrl)
        );
    }

    #[test]
    fn clean_vendor_passes_all_checks() {
        let rec = record("Handmade beaded jewelry", "https://etsy.com/shop/vendor");
        assert_eq!(run_gate(&rec, &verdict(0.85, true)), None);
    }

    #[test]
    fn tally_counts_by_rejection() {
        let mut tally = GateTally::default();
        tally.count(GateRejection::LowScore);
        tally.count(GateRejection::LowScore);
        tally.count(GateRejection::NoPurchasePath);
        assert_eq!(tally.low_score, 2);
        assert_eq!(tally.no_shop, 1);
        assert_eq!(tally.total(), 3);
    }
}
