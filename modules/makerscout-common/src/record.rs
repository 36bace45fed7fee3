//! Profile records and the normalization applied at hand-off.
//!
//! The ingestion collaborator delivers raw scraped profiles as JSON mappings
//! with inconsistent key casing and plenty of absent fields. Everything in
//! here is about turning that into a [`ProfileRecord`] the pipeline can trust.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

/// A raw scraped profile as handed over by the ingestion collaborator.
///
/// Every field is optional in practice; aliases cover the scraper's
/// inconsistent key casing across export versions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProfile {
    pub username: String,
    pub biography: String,
    #[serde(alias = "followersCount", alias = "followers_count", alias = "followers")]
    pub follower_count: u64,
    #[serde(
        alias = "followsCount",
        alias = "follows_count",
        alias = "followingCount",
        alias = "following"
    )]
    pub following_count: u64,
    #[serde(alias = "postsCount", alias = "posts_count", alias = "posts")]
    pub post_count: u64,
    #[serde(alias = "isBusinessAccount", alias = "is_business")]
    pub is_business_account: bool,
    #[serde(alias = "isPrivate")]
    pub is_private: bool,
    #[serde(alias = "externalUrl", alias = "externalURL", alias = "website")]
    pub external_url: String,
    #[serde(alias = "profileUrl", alias = "profileURL")]
    pub profile_url: String,
    #[serde(alias = "websiteTitle", alias = "websiteOgTitle")]
    pub website_title: String,
    #[serde(
        alias = "websiteDescription",
        alias = "websiteOgDescription",
        alias = "websiteMetaDescription"
    )]
    pub website_description: String,
    pub tags: String,
}

/// A normalized vendor profile.
///
/// `domain` and `combined_text` are derived. Never mutate them directly;
/// after changing any contributing field, call
/// [`ProfileRecord::recompute_derived`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub username: String,
    pub biography: String,
    pub follower_count: u64,
    pub following_count: u64,
    pub post_count: u64,
    pub is_business_account: bool,
    pub is_private: bool,
    pub external_url: String,
    pub domain: String,
    pub profile_url: String,
    pub website_title: String,
    pub website_description: String,
    pub tags: String,
    pub combined_text: String,
}

impl ProfileRecord {
    pub fn from_raw(raw: RawProfile) -> Self {
        let username = raw.username.trim().to_lowercase();
        let profile_url = if raw.profile_url.trim().is_empty() {
            format!("https://www.instagram.com/{username}/")
        } else {
            raw.profile_url.trim().to_string()
        };

        let mut record = Self {
            username,
            biography: raw.biography.trim().to_string(),
            follower_count: raw.follower_count,
            following_count: raw.following_count,
            post_count: raw.post_count,
            is_business_account: raw.is_business_account,
            is_private: raw.is_private,
            external_url: clean_external_url(&raw.external_url),
            domain: String::new(),
            profile_url,
            website_title: raw.website_title.trim().to_string(),
            website_description: raw.website_description.trim().to_string(),
            tags: raw.tags.trim().to_string(),
            combined_text: String::new(),
        };
        record.recompute_derived();
        record
    }

    /// Re-derive `domain` and `combined_text` from the contributing fields.
    pub fn recompute_derived(&mut self) {
        self.domain = extract_domain(&self.external_url);
        self.combined_text = format!(
            "{} | {} | {} | {}",
            self.biography, self.website_description, self.website_title, self.tags
        )
        .to_lowercase();
    }

    /// True when there is no usable text content (separators don't count).
    pub fn has_no_text(&self) -> bool {
        self.combined_text.replace('|', " ").trim().is_empty()
    }
}

/// Normalize a batch of raw profiles: case-fold usernames, dedup keeping the
/// first occurrence, and drop private accounts (their content is invisible).
pub fn normalize_records(raw: Vec<RawProfile>) -> Vec<ProfileRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.into_iter()
        .map(ProfileRecord::from_raw)
        .filter(|record| !record.username.is_empty())
        .filter(|record| seen.insert(record.username.clone()))
        .filter(|record| !record.is_private)
        .collect()
}

/// Unwrap Instagram's redirect wrapper (`https://l.instagram.com/?u=…`) and
/// return a clean external URL, or an empty string when there is none.
pub fn clean_external_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(parsed) = Url::parse(raw) {
        let is_redirect = parsed
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case("l.instagram.com"));
        if is_redirect {
            // query_pairs percent-decodes the wrapped target for us
            if let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "u") {
                return target.into_owned();
            }
        }
    }
    if raw.starts_with("http") {
        raw.to_string()
    } else {
        String::new()
    }
}

/// Extract the bare domain from a URL: lowercase, `www.` stripped.
pub fn extract_domain(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let host = Url::parse(trimmed)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_owned))
        .unwrap_or_else(|| {
            // Tolerate bare "example.com/path" inputs
            trimmed
                .split("://")
                .last()
                .unwrap_or(trimmed)
                .split('/')
                .next()
                .unwrap_or("")
                .to_owned()
        });
    let host = host.to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_owned()
}
