use serde::{Deserialize, Serialize};

// --- URL classification ---

/// What kind of destination an account's external link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlKind {
    /// No external link at all.
    None,
    /// Marketplace or storefront platform, or a shop-style path.
    Shop,
    /// Link aggregator (Linktree and friends).
    Aggregator,
    /// Ticketing, social media, payment app, crowdfunding. Not a storefront.
    NonShop,
    /// The account's own domain.
    OwnDomain,
}

impl UrlKind {
    /// True when the link counts as a verifiable purchase path.
    pub fn is_purchase_path(self) -> bool {
        matches!(self, UrlKind::Shop | UrlKind::OwnDomain | UrlKind::Aggregator)
    }
}

impl std::fmt::Display for UrlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlKind::None => write!(f, "none"),
            UrlKind::Shop => write!(f, "shop"),
            UrlKind::Aggregator => write!(f, "aggregator"),
            UrlKind::NonShop => write!(f, "non_shop"),
            UrlKind::OwnDomain => write!(f, "own_domain"),
        }
    }
}

// --- Classification states ---

/// Rules-engine classification. `Yes`/`Maybe` are produced only by the triage
/// policy, `Review` only by the gated policy; `Maybe` and `Review` both mean
/// "escalate to the LLM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesClass {
    Yes,
    No,
    Maybe,
    Review,
}

impl RulesClass {
    pub fn escalates(self) -> bool {
        matches!(self, RulesClass::Maybe | RulesClass::Review)
    }
}

impl std::fmt::Display for RulesClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RulesClass::Yes => write!(f, "yes"),
            RulesClass::No => write!(f, "no"),
            RulesClass::Maybe => write!(f, "maybe"),
            RulesClass::Review => write!(f, "review"),
        }
    }
}

/// Terminal classification consumed downstream. `ReviewPending` marks an
/// escalated record that never received a model verdict (LLM stage skipped,
/// or its batch abandoned); nothing is approved without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalClass {
    Yes,
    No,
    ReviewPending,
}

impl std::fmt::Display for FinalClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinalClass::Yes => write!(f, "yes"),
            FinalClass::No => write!(f, "no"),
            FinalClass::ReviewPending => write!(f, "review_pending"),
        }
    }
}

// --- LLM verdict ---

/// A per-record verdict from the curation model. The sub-verdict booleans are
/// only asked for by the gated policy and stay `None` under triage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmVerdict {
    pub score: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sells_products: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_shop: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub festival_aesthetic: Option<bool>,
}

// --- Category taxonomy ---

/// The fixed directory taxonomy. Tagger output is validated against this set.
pub const CATEGORIES: &[&str] = &[
    "Festival Clothing",
    "Jewelry & Accessories",
    "Art & Prints",
    "Home Decor",
    "Toys & Sculptures",
    "Bags & Packs",
    "Body Art & Cosmetics",
    "Stickers & Patches",
    "Other Handmade",
];

/// Substituted whenever the tagger returns no valid category.
pub const FALLBACK_CATEGORY: &str = "Other Handmade";

pub fn is_known_category(name: &str) -> bool {
    CATEGORIES.contains(&name)
}
