//! Rules engine: cheap deterministic disposition of unambiguous records.
//!
//! An ordered list of instant-reject predicates runs first; each short-
//! circuits with a fixed low score. Earlier predicates use cheaper, more
//! certain evidence, so the order is load-bearing for the *reasons* but not
//! for the outcome: a record caught by predicate k stays rejected if an
//! earlier predicate would also match. Records that survive get a weighted
//! accumulation from a neutral base, clamped to [0, 1], and a classification
//! from the policy thresholds.

use std::ops::RangeInclusive;

use serde::Serialize;

use makerscout_common::{CurationPolicy, ProfileRecord, RulesClass, RulesMode, UrlKind};

use crate::signals::SignalBundle;

/// Festival language plus a big audience usually means a brand account.
const WORLDWIDE_SHIPPING_PHRASE: &str = "shipping worldwide";
const WORLDWIDE_FOLLOWER_FLOOR: u64 = 50_000;

/// Follower band where small working vendors actually live.
const SWEET_SPOT: RangeInclusive<u64> = 1_000..=50_000;

/// Rules-engine output for one record.
#[derive(Debug, Clone, Serialize)]
pub struct RulesVerdict {
    pub score: f64,
    pub classification: RulesClass,
    pub reasons: Vec<String>,
}

/// Score one record against the policy.
pub fn score(
    record: &ProfileRecord,
    signals: &SignalBundle,
    policy: &CurationPolicy,
) -> RulesVerdict {
    if let Some(rejection) = instant_reject(record, signals, policy) {
        return rejection;
    }
    match policy.mode {
        RulesMode::Triage => weighted_triage(record, signals, policy),
        RulesMode::RejectOnly => weighted_reject_only(record, signals, policy),
    }
}

fn rejected(score: f64, reason: String) -> Option<RulesVerdict> {
    Some(RulesVerdict {
        score,
        classification: RulesClass::No,
        reasons: vec![reason],
    })
}

fn instant_reject(
    record: &ProfileRecord,
    signals: &SignalBundle,
    policy: &CurationPolicy,
) -> Option<RulesVerdict> {
    let triage = policy.mode == RulesMode::Triage;
    let thresholds = &policy.thresholds;
    let followers = record.follower_count;

    // 1. Known big brand domain.
    if !record.domain.is_empty()
        && policy.urls.big_brand.iter().any(|brand| brand == &record.domain)
    {
        return rejected(0.0, format!("known big brand domain: {}", record.domain));
    }

    // 2. Audience too large for an independent maker.
    if followers > thresholds.brand_follower_ceiling {
        return rejected(
            if triage { 0.05 } else { 0.0 },
            format!(
                "followers ({followers}) exceed brand threshold ({})",
                thresholds.brand_follower_ceiling
            ),
        );
    }

    // 3. Audience too small to be an established vendor.
    if followers < thresholds.min_followers {
        return rejected(
            if triage { 0.10 } else { 0.05 },
            format!(
                "followers ({followers}) below minimum ({})",
                thresholds.min_followers
            ),
        );
    }

    // 4. Nothing to evaluate.
    if record.has_no_text() && record.external_url.is_empty() {
        return rejected(
            if triage { 0.05 } else { 0.0 },
            "no bio and no URL, nothing to evaluate".to_string(),
        );
    }

    // 5. No link, no business flag, no vendor vocabulary.
    let no_url = signals.url == UrlKind::None;
    if no_url && !signals.is_business && signals.positive_count() == 0 {
        return rejected(
            if triage { 0.12 } else { 0.05 },
            "no URL, not a business, no vendor keywords, likely personal account".to_string(),
        );
    }

    // 6. Policy-specific personal-account heuristics.
    match policy.mode {
        RulesMode::Triage => {
            let ratio = record.following_count as f64 / record.follower_count.max(1) as f64;
            if no_url
                && !signals.is_business
                && ratio > thresholds.max_following_ratio
                && signals.positive_count() == 0
            {
                return rejected(
                    0.10,
                    "personal account pattern (no URL, not business, high follow ratio, \
                     no vendor keywords)"
                        .to_string(),
                );
            }
        }
        RulesMode::RejectOnly => {
            if signals.personal_count() > 0 && signals.product_count() == 0 {
                return rejected(
                    0.10,
                    format!(
                        "personal account signals ({:?}) with no product keywords",
                        top(&signals.personal_matches, 3)
                    ),
                );
            }
            // 7. A link that can't sell anything, and no product vocabulary.
            if signals.url == UrlKind::NonShop && signals.product_count() == 0 {
                return rejected(
                    0.10,
                    format!("non-shop URL ({}) with no product keywords", record.domain),
                );
            }
        }
    }

    // 8. Heavy negative evidence with nothing positive.
    if signals.negative_count() >= 2 && signals.positive_count() == 0 {
        return rejected(
            0.10,
            format!(
                "multiple negative signals ({:?}) with no positives",
                top(&signals.negative_matches, 3)
            ),
        );
    }

    None
}

fn weighted_triage(
    record: &ProfileRecord,
    signals: &SignalBundle,
    policy: &CurationPolicy,
) -> RulesVerdict {
    let mut score = 0.5;
    let mut reasons = Vec::new();

    let strong = signals.product_count();
    if strong > 0 {
        let boost = (strong as f64 * 0.08).min(0.35);
        score += boost;
        reasons.push(format!(
            "+{boost:.2} strong positive keywords ({strong} matches)"
        ));
    }

    let weak = signals.weak_count();
    if weak > 0 {
        let boost = (weak as f64 * 0.03).min(0.15);
        score += boost;
        reasons.push(format!(
            "+{boost:.2} weak positive keywords ({weak} matches)"
        ));
    }

    let negative = signals.negative_count();
    if negative > 0 {
        let penalty = (negative as f64 * 0.12).min(0.40);
        score -= penalty;
        reasons.push(format!(
            "-{penalty:.2} negative keywords ({negative} matches)"
        ));
    }

    if signals.url == UrlKind::Shop {
        score += 0.15;
        reasons.push("+0.15 shop URL pattern detected".to_string());
    }

    if signals.is_business {
        score += 0.08;
        reasons.push("+0.08 business account flag".to_string());
    }

    if !record.external_url.is_empty() {
        score += 0.05;
        reasons.push("+0.05 has external URL".to_string());
    }

    if policy
        .urls
        .marketplace
        .iter()
        .any(|marketplace| record.domain.contains(marketplace.as_str()))
    {
        score += 0.15;
        reasons.push("+0.15 handmade marketplace URL".to_string());
    }

    if SWEET_SPOT.contains(&record.follower_count) {
        score += 0.05;
        reasons.push("+0.05 follower count in small business sweet spot".to_string());
    } else if record.follower_count > policy.thresholds.max_followers {
        score -= 0.15;
        reasons.push(format!(
            "-0.15 very high followers ({})",
            record.follower_count
        ));
    }

    if record.combined_text.contains(WORLDWIDE_SHIPPING_PHRASE)
        && record.follower_count > WORLDWIDE_FOLLOWER_FLOOR
    {
        score -= 0.20;
        reasons.push("-0.20 big brand shipping pattern".to_string());
    }

    if signals.url == UrlKind::Aggregator {
        score += 0.02;
        reasons.push("+0.02 has link aggregator".to_string());
    }

    let score = round3(score.clamp(0.0, 1.0));
    let classification = match policy.thresholds.auto_yes {
        Some(auto_yes) if score >= auto_yes => RulesClass::Yes,
        _ if score <= policy.thresholds.reject_below => RulesClass::No,
        _ => RulesClass::Maybe,
    };

    RulesVerdict {
        score,
        classification,
        reasons,
    }
}

fn weighted_reject_only(
    record: &ProfileRecord,
    signals: &SignalBundle,
    policy: &CurationPolicy,
) -> RulesVerdict {
    // The score ranks records for the model, it is not a judgment: survivors
    // start low and nothing here can approve them.
    let mut score = 0.3;
    let mut reasons = Vec::new();

    let product = signals.product_count();
    if product > 0 {
        score += (product as f64 * 0.06).min(0.25);
        reasons.push(format!(
            "+product signals: {:?}",
            top(&signals.product_matches, 3)
        ));
    }

    let aesthetic = signals.aesthetic_count();
    if aesthetic > 0 {
        score += (aesthetic as f64 * 0.04).min(0.15);
        reasons.push(format!(
            "+aesthetic signals: {:?}",
            top(&signals.aesthetic_matches, 3)
        ));
    }

    match signals.url {
        UrlKind::Shop => {
            score += 0.15;
            reasons.push(format!("+shop URL ({})", record.domain));
        }
        UrlKind::OwnDomain => {
            score += 0.10;
            reasons.push(format!("+own domain ({})", record.domain));
        }
        UrlKind::Aggregator => {
            score += 0.05;
            reasons.push(format!("+link aggregator ({})", record.domain));
        }
        UrlKind::NonShop => {
            score -= 0.10;
            reasons.push(format!("-non-shop URL ({})", record.domain));
        }
        UrlKind::None => {}
    }

    if signals.is_business {
        score += 0.05;
        reasons.push("+business account".to_string());
    }

    let negative = signals.negative_count();
    if negative > 0 {
        score -= (negative as f64 * 0.08).min(0.25);
        reasons.push(format!("-negative: {:?}", top(&signals.negative_matches, 3)));
    }

    let score = round3(score.clamp(0.0, 1.0));
    let classification = if score < policy.thresholds.reject_below {
        RulesClass::No
    } else {
        RulesClass::Review
    };

    RulesVerdict {
        score,
        classification,
        reasons,
    }
}

fn top(matches: &[String], count: usize) -> &[String] {
    &matches[..matches.len().min(count)]
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals;
    use makerscout_common::RawProfile;

    fn record(raw: RawProfile) -> ProfileRecord {
        ProfileRecord::from_raw(raw)
    }

    fn score_with(policy: &CurationPolicy, record: &ProfileRecord) -> RulesVerdict {
        let bundle = signals::extract(record, policy);
        score(record, &bundle, policy)
    }

    fn brand_record() -> ProfileRecord {
        record(RawProfile {
            username: "badinkastyle".to_string(),
            biography: "BADDIES Wardrobe Rave Gear Festival Trends Shipping Worldwide"
                .to_string(),
            follower_count: 135_038,
            following_count: 979,
            is_business_account: true,
            external_url: "https://badinka.com/".to_string(),
            ..RawProfile::default()
        })
    }

    #[test]
    fn big_brand_domain_rejects_in_lowest_band() {
        for policy in [CurationPolicy::triage(), CurationPolicy::gated()] {
            let verdict = score_with(&policy, &brand_record());
            assert_eq!(verdict.classification, RulesClass::No);
            assert!(verdict.score <= 0.05, "score was {}", verdict.score);
            assert!(verdict.reasons[0].contains("big brand"));
        }
    }

    #[test]
    fn rejection_is_stable_when_earlier_predicate_is_removed() {
        // Clearing the brand domain leaves the follower ceiling to catch it:
        // same outcome, different reason.
        let mut rec = brand_record();
        rec.external_url = String::new();
        rec.recompute_derived();

        for policy in [CurationPolicy::triage(), CurationPolicy::gated()] {
            let verdict = score_with(&policy, &rec);
            assert_eq!(verdict.classification, RulesClass::No);
            assert!(verdict.score <= 0.05);
            assert!(verdict.reasons[0].contains("exceed brand threshold"));
        }
    }

    #[test]
    fn bare_personal_account_rejects_with_documented_band() {
        let rec = record(RawProfile {
            username: "moonchilld36".to_string(),
            biography: "29 Dallas".to_string(),
            follower_count: 2_366,
            following_count: 767,
            ..RawProfile::default()
        });

        for policy in [CurationPolicy::triage(), CurationPolicy::gated()] {
            let verdict = score_with(&policy, &rec);
            assert_eq!(verdict.classification, RulesClass::No);
            assert!(
                (0.05..=0.12).contains(&verdict.score),
                "score was {}",
                verdict.score
            );
            assert!(verdict.reasons[0].contains("no vendor keywords"));
        }
    }

    #[test]
    fn own_domain_maker_escalates() {
        let rec = record(RawProfile {
            username: "dnbeadz".to_string(),
            biography: "HOLIDAY DROP - online now! Hand beaded and braided accessories"
                .to_string(),
            follower_count: 8_139,
            following_count: 728,
            is_business_account: true,
            external_url: "https://www.dnbeadz.com/".to_string(),
            website_title: "Jewelry and Rave Accessories | DNBeadz".to_string(),
            ..RawProfile::default()
        });

        let triage = score_with(&CurationPolicy::triage(), &rec);
        assert!(
            matches!(triage.classification, RulesClass::Maybe | RulesClass::Yes),
            "triage must not reject a real maker, got {:?}",
            triage.classification
        );

        let gated = score_with(&CurationPolicy::gated(), &rec);
        assert_eq!(gated.classification, RulesClass::Review);
    }

    #[test]
    fn triage_auto_approves_an_obvious_maker() {
        let rec = record(RawProfile {
            username: "mindfullmatters".to_string(),
            biography: "Handmade psychedelic one of a kind resin art, tie dye, stickers. \
                        Small batch artist, commissions open, shop link in bio"
                .to_string(),
            follower_count: 7_023,
            following_count: 227,
            is_business_account: true,
            external_url: "http://etsy.com/shop/mindfullmatters".to_string(),
            ..RawProfile::default()
        });

        let verdict = score_with(&CurationPolicy::triage(), &rec);
        assert_eq!(verdict.classification, RulesClass::Yes);
        assert!(verdict.score >= 0.70);
    }

    #[test]
    fn gated_never_classifies_yes_or_maybe() {
        let policy = CurationPolicy::gated();
        let records = [
            brand_record(),
            record(RawProfile {
                username: "maker".to_string(),
                biography: "Handmade psychedelic resin art, shop now, commissions open"
                    .to_string(),
                follower_count: 9_000,
                is_business_account: true,
                external_url: "https://etsy.com/shop/maker".to_string(),
                ..RawProfile::default()
            }),
        ];
        for rec in records {
            let verdict = score_with(&policy, &rec);
            assert!(
                matches!(verdict.classification, RulesClass::No | RulesClass::Review),
                "gated produced {:?}",
                verdict.classification
            );
        }
    }

    #[test]
    fn non_shop_link_without_products_rejects_under_gated() {
        let rec = record(RawProfile {
            username: "go.with.the.bo".to_string(),
            biography: "CLT NC breakaway carolina tix".to_string(),
            follower_count: 566,
            following_count: 800,
            external_url: "https://www.universe.com/events/breakaway-carolina-2026-tickets"
                .to_string(),
            ..RawProfile::default()
        });

        let verdict = score_with(&CurationPolicy::gated(), &rec);
        assert_eq!(verdict.classification, RulesClass::No);
        assert!(verdict.reasons[0].contains("non-shop URL"));
    }

    #[test]
    fn score_stays_in_unit_interval() {
        let positive_bio = "handmade hand sewn macrame crochet beadwork resin art ceramics \
                            one of a kind small batch wearable art psychedelic trippy neon \
                            tie dye sacred geometry shop now dm for orders commissions open";
        let negative_bio = "photographer dj music producer promoter influencer content creator \
                            brand ambassador use code wholesale dropship shipping worldwide \
                            realtor lawyer doctor yoga instructor";

        for policy in [CurationPolicy::triage(), CurationPolicy::gated()] {
            for followers in [200u64, 999, 1_000, 8_000, 49_999, 50_001, 79_999] {
                for bio in [positive_bio, negative_bio, "plain bio", ""] {
                    for url in ["", "https://etsy.com/shop/x", "https://own-site.com/shop"] {
                        let rec = record(RawProfile {
                            username: "fuzz".to_string(),
                            biography: bio.to_string(),
                            follower_count: followers,
                            external_url: url.to_string(),
                            ..RawProfile::default()
                        });
                        let verdict = score_with(&policy, &rec);
                        assert!(
                            (0.0..=1.0).contains(&verdict.score),
                            "{} followers, bio {:?}: score {}",
                            followers,
                            &bio[..bio.len().min(20)],
                            verdict.score
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn score_is_rounded_to_three_decimals() {
        let rec = record(RawProfile {
            username: "maker".to_string(),
            biography: "macrame studio, boho art".to_string(),
            follower_count: 5_000,
            is_business_account: true,
            external_url: "https://linktr.ee/maker".to_string(),
            ..RawProfile::default()
        });
        for policy in [CurationPolicy::triage(), CurationPolicy::gated()] {
            let verdict = score_with(&policy, &rec);
            let scaled = verdict.score * 1000.0;
            assert!(
                (scaled - scaled.round()).abs() < 1e-9,
                "score {} not rounded",
                verdict.score
            );
        }
    }
}
