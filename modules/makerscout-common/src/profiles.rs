//! Curation policy profiles: thresholds, weights, keyword and domain lists.
//!
//! Two built-in profiles exist. The **triage** profile lets the rules engine
//! settle records on its own at both ends (auto-yes and auto-no) and only
//! escalates the middle band. The **gated** profile is the audit-driven
//! revision: rules may only reject, every surviving record is judged by the
//! model, and a deterministic validation gate has the last word.
//!
//! The list contents are tuning artifacts from manual audits of real scrape
//! runs. They are data, not logic: adjust them here, nowhere else.

use std::time::Duration;

// --- Policy shape ---

/// How the rules engine is allowed to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesMode {
    /// Three-way: yes / no / maybe. Confident scores skip the LLM entirely.
    Triage,
    /// Two-way: no / review. The rules engine is a bouncer, not a judge.
    RejectOnly,
}

/// Keyword lists matched (case-insensitive substring) against a record's
/// combined text. Lists a policy doesn't use stay empty.
#[derive(Debug, Clone, Default)]
pub struct KeywordLists {
    /// They make or sell tangible products.
    pub product: Vec<String>,
    /// Suggestive but not definitive positives.
    pub weak: Vec<String>,
    /// The trippy/festival vibe.
    pub aesthetic: Vec<String>,
    /// Not a vendor: services, influencers, personal-life markers.
    pub negative: Vec<String>,
    /// Attends festivals rather than selling at them.
    pub personal: Vec<String>,
}

/// Domain and path lists driving URL classification.
#[derive(Debug, Clone, Default)]
pub struct UrlLists {
    /// Known big brands: instant reject, never escalated.
    pub big_brand: Vec<String>,
    /// Ticketing, social media, payment apps, crowdfunding.
    pub non_shop: Vec<String>,
    /// Marketplaces and storefront platforms.
    pub shop: Vec<String>,
    /// Handmade marketplaces that earn an extra bonus under triage.
    pub marketplace: Vec<String>,
    /// Link aggregators.
    pub aggregator: Vec<String>,
    /// Path fragments that suggest a storefront on an arbitrary domain.
    pub shop_paths: Vec<String>,
}

/// Follower and score thresholds for the rules engine.
#[derive(Debug, Clone)]
pub struct RulesThresholds {
    pub min_followers: u64,
    pub max_followers: u64,
    /// Above this, almost certainly a big brand.
    pub brand_follower_ceiling: u64,
    /// following/followers ratio above which an account reads as personal.
    pub max_following_ratio: f64,
    /// Score at or above which rules approve outright. `None` = never.
    pub auto_yes: Option<f64>,
    /// Score below which rules reject.
    pub reject_below: f64,
}

/// Arbitration settings: batching, sampling, retry cadence.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub batch_size: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Applied when the model omits a record from its response.
    pub neutral_score: f64,
    /// Minimum LLM score for approval.
    pub approve_at: f64,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    /// Courtesy pause between batches. Not a rate limiter.
    pub batch_delay: Duration,
}

/// Post-LLM hard requirements. Present only on the gated profile.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    /// Bio phrases that count as a purchase path without any shop URL.
    pub dm_order_phrases: Vec<String>,
}

/// A complete, immutable curation policy. Built once at startup and shared
/// by every stage; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct CurationPolicy {
    pub name: &'static str,
    pub mode: RulesMode,
    pub keywords: KeywordLists,
    pub urls: UrlLists,
    pub thresholds: RulesThresholds,
    pub llm: LlmSettings,
    pub gate: Option<GatePolicy>,
    /// Whether the tagger also collects free-text search tags.
    pub collect_tags: bool,
}

impl CurationPolicy {
    /// Three-way triage profile: rules may approve, reject, or escalate.
    pub fn triage() -> Self {
        Self {
            name: "triage",
            mode: RulesMode::Triage,
            keywords: KeywordLists {
                product: owned(TRIAGE_STRONG_KEYWORDS),
                weak: owned(TRIAGE_WEAK_KEYWORDS),
                aesthetic: Vec::new(),
                negative: owned(TRIAGE_NEGATIVE_KEYWORDS),
                personal: Vec::new(),
            },
            urls: UrlLists {
                big_brand: owned(BIG_BRAND_DOMAINS),
                non_shop: Vec::new(),
                shop: owned(TRIAGE_SHOP_DOMAINS),
                marketplace: owned(HANDMADE_MARKETPLACES),
                aggregator: owned(TRIAGE_AGGREGATOR_DOMAINS),
                shop_paths: owned(TRIAGE_SHOP_PATHS),
            },
            thresholds: RulesThresholds {
                min_followers: 200,
                max_followers: 500_000,
                brand_follower_ceiling: 100_000,
                max_following_ratio: 5.0,
                auto_yes: Some(0.70),
                reject_below: 0.25,
            },
            llm: LlmSettings {
                batch_size: 10,
                temperature: 0.1,
                max_tokens: 2000,
                neutral_score: 0.5,
                approve_at: 0.55,
                max_attempts: 3,
                backoff_base: Duration::from_secs(5),
                batch_delay: Duration::from_secs(1),
            },
            gate: None,
            collect_tags: false,
        }
    }

    /// Reject-only profile with the post-LLM validation gate. The default.
    pub fn gated() -> Self {
        Self {
            name: "gated",
            mode: RulesMode::RejectOnly,
            keywords: KeywordLists {
                product: owned(PRODUCT_KEYWORDS),
                weak: Vec::new(),
                aesthetic: owned(AESTHETIC_KEYWORDS),
                negative: owned(NEGATIVE_KEYWORDS),
                personal: owned(PERSONAL_ACCOUNT_SIGNALS),
            },
            urls: UrlLists {
                big_brand: owned(BIG_BRAND_DOMAINS),
                non_shop: owned(NON_SHOP_DOMAINS),
                shop: owned(SHOP_DOMAINS),
                marketplace: Vec::new(),
                aggregator: owned(AGGREGATOR_DOMAINS),
                shop_paths: owned(GATED_SHOP_PATHS),
            },
            thresholds: RulesThresholds {
                min_followers: 200,
                max_followers: 500_000,
                brand_follower_ceiling: 80_000,
                max_following_ratio: 5.0,
                auto_yes: None,
                reject_below: 0.30,
            },
            llm: LlmSettings {
                // Smaller batches trade cost for per-record accuracy.
                batch_size: 5,
                temperature: 0.05,
                max_tokens: 2000,
                neutral_score: 0.3,
                approve_at: 0.70,
                max_attempts: 3,
                backoff_base: Duration::from_secs(5),
                batch_delay: Duration::from_secs(1),
            },
            gate: Some(GatePolicy {
                dm_order_phrases: owned(DM_ORDER_PHRASES),
            }),
            collect_tags: true,
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// --- Shared domain lists ---

const BIG_BRAND_DOMAINS: &[&str] = &[
    "iheartraves.com",
    "dollskill.com",
    "ravewonderland.com",
    "badinka.com",
    "spirithoods.com",
    "edclv.com",
    "amazon.com",
    "shein.com",
    "romwe.com",
    "zaful.com",
    "fashionnova.com",
    "prettylittlething.com",
    "asos.com",
    "hottopic.com",
    "spencersonline.com",
    "electricfamily.com",
    "intotheam.com",
    "ravewithmi.com",
    "littleblackdiamond.com",
];

// --- Triage profile lists ---

const TRIAGE_STRONG_KEYWORDS: &[&str] = &[
    "handmade",
    "hand made",
    "hand-made",
    "handcrafted",
    "hand crafted",
    "one of a kind",
    "ooak",
    "one-of-a-kind",
    "small batch",
    "made to order",
    "custom order",
    "custom made",
    "artist",
    "artisan",
    "maker",
    "creator",
    "designer",
    "fiber art",
    "wearable art",
    "functional art",
    "psychedelic",
    "trippy",
    "tie dye",
    "tie-dye",
    "tiedye",
    "festival wear",
    "festival fashion",
    "festival clothing",
    "rave wear",
    "plur",
    "kandi",
    "resin art",
    "epoxy",
    "polymer clay",
    "macrame",
    "crochet",
    "knit",
    "sewn",
    "sewing",
    "beaded",
    "beadwork",
    "hand beaded",
    "woodwork",
    "leather craft",
    "metalwork",
    "crystal",
    "gemstone",
    "healing stones",
    "etsy.com/shop",
    "bigcartel.com",
    "storenvy.com",
    "dm for custom",
    "dm for orders",
    "commissions open",
    "shop link in bio",
    "shop now",
    "new drop",
    "one offs",
    "limited run",
    "small business",
];

const TRIAGE_WEAK_KEYWORDS: &[&str] = &[
    "art",
    "creative",
    "design",
    "studio",
    "boho",
    "bohemian",
    "vintage",
    "retro",
    "spiritual",
    "metaphysical",
    "mystical",
    "mushroom",
    "sacred geometry",
    "festival",
    "rave",
    "burning man",
    "playa",
    "colorful",
    "colourful",
    "vibrant",
    "neon",
    "unique",
    "original",
    "bespoke",
    "sustainable",
    "upcycled",
    "eco",
    "stickers",
    "patches",
    "pins",
    "jewelry",
    "jewellery",
    "earrings",
    "necklace",
    "clothing",
    "apparel",
    "fashion",
];

const TRIAGE_NEGATIVE_KEYWORDS: &[&str] = &[
    "shipping worldwide",
    "worldwide shipping",
    "fast fashion",
    "dropship",
    "wholesale",
    "free shipping on orders over",
    "ambassador",
    "brand rep",
    "affiliate link",
    "use code",
    "discount code",
    "promo code",
    "influencer",
    "content creator",
    "youtuber",
    "tiktok creator",
    "photographer",
    "photography",
    "photo shoot",
    // musical artists and performers, not vendors
    "dj ",
    "dj/",
    "producer",
    "music producer",
    "singer",
    "music",
    "song",
    "booking",
    "nightclub",
    "club promoter",
    "promoter",
    // services, not products
    "tattoo",
    "tattoo artist",
    "tattoo shop",
    "nail tech",
    "hair stylist",
    "barber",
    "speaker",
    "motivational speaker",
    "spiritual leader",
    "soul activator",
    "life coach",
    "healer",
    "yoga",
    "yoga teacher",
    "yoga instructor",
    "realtor",
    "real estate",
    "fitness",
    "personal trainer",
    "gym",
    "lawyer",
    "attorney",
    "legal",
    "doctor",
    "dentist",
    "therapist",
    "mom of",
    "dad of",
    "dog mom",
    "cat mom",
    "engineer",
    "developer",
    "software",
];

// Bare etsy.com is deliberately absent here: under triage only the
// `etsy.com/shop`-style path patterns count as shop evidence, while the
// marketplace list below earns the domain its own bonus.
const TRIAGE_SHOP_DOMAINS: &[&str] = &[
    "bigcartel.com",
    "storenvy.com",
    "gumroad.com",
    "shopify",
    "squarespace",
    "wix.com",
];

const HANDMADE_MARKETPLACES: &[&str] = &["etsy.com", "bigcartel.com", "storenvy.com"];

const TRIAGE_AGGREGATOR_DOMAINS: &[&str] =
    &["linktr.ee", "linkin.bio", "linkr.bio", "hihello.com"];

const TRIAGE_SHOP_PATHS: &[&str] = &[
    "etsy.com/shop",
    "etsy.com/listing",
    "/shop",
    "/store",
    "/products",
    "/collections",
];

// --- Gated profile lists ---

const PRODUCT_KEYWORDS: &[&str] = &[
    "handmade",
    "hand made",
    "hand-made",
    "handcrafted",
    "hand crafted",
    "hand sewn",
    "hand-sewn",
    "hand beaded",
    "hand-beaded",
    "hand painted",
    "hand-painted",
    "made to order",
    "custom order",
    "custom made",
    "made by me",
    "sewn by",
    "crafted by",
    "created by",
    "i make",
    "i create",
    "i sew",
    "i crochet",
    "i knit",
    "sewing",
    "crochet",
    "knitting",
    "macrame",
    "beadwork",
    "beading",
    "embroidery",
    "weaving",
    "woodwork",
    "woodworking",
    "metalwork",
    "leatherwork",
    "leather craft",
    "resin art",
    "epoxy art",
    "polymer clay",
    "ceramics",
    "pottery",
    "fiber art",
    "textile art",
    "one of a kind",
    "ooak",
    "one-of-a-kind",
    "1/1",
    "small batch",
    "limited run",
    "limited edition",
    "wearable art",
    "functional art",
    "shop now",
    "new drop",
    "restocked",
    "available now",
    "dm for orders",
    "dm for custom",
    "dm for pricing",
    "commissions open",
    "customs open",
    "taking orders",
    "shop link in bio",
];

const AESTHETIC_KEYWORDS: &[&str] = &[
    "psychedelic",
    "trippy",
    "tie dye",
    "tie-dye",
    "tiedye",
    "neon",
    "uv reactive",
    "blacklight",
    "glow in the dark",
    "sacred geometry",
    "fractal",
    "visionary art",
    "mushroom",
    "shroom",
    "bohemian",
    "boho",
    "cosmic",
    "celestial",
    "astral",
    "holographic",
    "iridescent",
    "prismatic",
    "kaleidoscope",
    "rainbow",
    "flow art",
    "flow toys",
    "plur",
    "kandi",
    "rave wear",
    "ravewear",
    "festival wear",
    "festival fashion",
    "festival clothing",
    "festival flare",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "photographer",
    "photography",
    "photo shoot",
    "tattoo artist",
    "tattoo shop",
    "tattoo studio",
    "nail tech",
    "nail artist",
    "hair stylist",
    "barber",
    "dj ",
    "dj/",
    "dj.",
    "deejay",
    "music producer",
    "beatmaker",
    "promoter",
    "club promoter",
    "event promoter",
    "yoga instructor",
    "yoga teacher",
    "personal trainer",
    "fitness coach",
    "realtor",
    "real estate",
    "lawyer",
    "attorney",
    "doctor",
    "dentist",
    "therapist",
    "counselor",
    "influencer",
    "content creator",
    "brand ambassador",
    "ambassador for",
    "affiliate",
    "use my code",
    "use code",
    "discount code",
    "promo code",
    "vibe curator",
    "youtuber",
    "tiktok creator",
    "streamer",
    "mom of",
    "dad of",
    "dog mom",
    "cat mom",
    "fur mom",
    "mom life",
    "dad life",
    "just a girl",
    "just living",
    "wanderlust",
    "travel blogger",
    "foodie",
    "food lover",
    "shipping worldwide",
    "worldwide shipping",
    "global shipping",
    "fast fashion",
    "wholesale",
    "dropship",
    "drop ship",
    "tag us to get featured",
    "tag to be featured",
    "as seen on",
    "as featured in",
    "event organizer",
    "event planner",
    "event production",
    "festival organizer",
    "festival producer",
    "nightclub",
    "night club",
    "club night",
    "haute couture",
    "high fashion",
    "luxury fashion",
    "luxury brand",
];

const PERSONAL_ACCOUNT_SIGNALS: &[&str] = &[
    "part-time raver",
    "full-time raver",
    "raver girl",
    "rave bae",
    "rave fam",
    "rave family",
    "festival goer",
    "festival lover",
    "festival junkie",
    "edm lover",
    "edm addict",
    "house head",
    "music lover",
    "concert lover",
    "living my best life",
    "good vibes only",
    "adventure",
    "adventurer",
    "wanderer",
    "insomniac gc",
    "ground control",
];

const SHOP_DOMAINS: &[&str] = &[
    "etsy.com",
    "bigcartel.com",
    "storenvy.com",
    "gumroad.com",
    "shopify.com",
    "squarespace.com",
    "wix.com",
    "depop.com",
    "poshmark.com",
    "mercari.com",
    "redbubble.com",
    "society6.com",
    "threadless.com",
    "ko-fi.com",
];

const AGGREGATOR_DOMAINS: &[&str] = &[
    "linktr.ee",
    "linkin.bio",
    "linkr.bio",
    "bio.fm",
    "allmylinks.com",
    "beacons.ai",
    "lnk.bio",
    "tap.bio",
    "hoo.be",
    "snipfeed.co",
    "carrd.co",
    "solo.to",
];

const NON_SHOP_DOMAINS: &[&str] = &[
    "universe.com",
    "eventbrite.com",
    "dice.fm",
    "ticketmaster.com",
    "seetickets.com",
    "axs.com",
    "stubhub.com",
    "ra.co",
    "youtube.com",
    "m.youtube.com",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "facebook.com",
    "m.facebook.com",
    "threads.net",
    "tumblr.com",
    "soundcloud.com",
    "on.soundcloud.com",
    "spotify.com",
    "open.spotify.com",
    "bandcamp.com",
    "venmo.com",
    "cash.app",
    "paypal.me",
    "paypal.com",
    "hihello.com",
    "blinq.me",
    "change.org",
    "gofundme.com",
    "patreon.com",
];

const GATED_SHOP_PATHS: &[&str] = &[
    "/shop", "/store", "/products", "/collections", "/listing", "/items", "/merch", "/order",
];

const DM_ORDER_PHRASES: &[&str] = &[
    "dm for orders",
    "dm for custom",
    "dm for pricing",
    "dm to order",
    "dm to purchase",
    "message for orders",
    "message for custom",
    "message to order",
];
