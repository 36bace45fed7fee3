//! Category tagging of approved vendors.
//!
//! A second batching pass over final-yes records, reusing the arbitrator's
//! retry and array-parsing machinery against a closed taxonomy. Output is
//! validated hard: unknown categories are discarded, and an empty result is
//! replaced by the fallback category, so no approved record ever ends up
//! uncategorized. Tagging never fails the run: a batch that exhausts its retries
//! falls back to the default category for each of its records.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use deepseek_client::{truncate_chars, DeepSeek};
use makerscout_common::{
    is_known_category, CurationPolicy, ProfileRecord, CATEGORIES, FALLBACK_CATEGORY,
};

use crate::arbitrator::normalize_username;
use crate::error::CuratorError;
use crate::retry::RetryPolicy;

const TAGGER_BATCH_SIZE: usize = 10;
const TAGGER_TEMPERATURE: f32 = 0.1;
const TAGGER_MAX_TOKENS: u32 = 2000;
const MAX_CATEGORIES: usize = 2;
const MAX_TAGS: usize = 5;

/// One row of the model's tagging response.
#[derive(Debug, Deserialize)]
struct TagRow {
    #[serde(default)]
    username: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Validated categories and tags for one vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl Assignment {
    pub fn fallback() -> Self {
        Self {
            categories: vec![FALLBACK_CATEGORY.to_string()],
            tags: Vec::new(),
        }
    }

    fn from_row(row: &TagRow, collect_tags: bool) -> Self {
        let mut categories: Vec<String> = row
            .categories
            .iter()
            .filter(|category| is_known_category(category))
            .take(MAX_CATEGORIES)
            .cloned()
            .collect();
        if categories.is_empty() {
            categories.push(FALLBACK_CATEGORY.to_string());
        }
        let tags = if collect_tags {
            row.tags.iter().take(MAX_TAGS).cloned().collect()
        } else {
            Vec::new()
        };
        Self { categories, tags }
    }
}

pub struct Tagger<'a> {
    client: &'a DeepSeek,
    policy: &'a CurationPolicy,
}

impl<'a> Tagger<'a> {
    pub fn new(client: &'a DeepSeek, policy: &'a CurationPolicy) -> Self {
        Self { client, policy }
    }

    /// Assign categories (and, when the policy collects them, search tags)
    /// to approved vendors. Assignments replace any previous ones wholesale.
    pub async fn tag(&self, vendors: &[&ProfileRecord]) -> HashMap<String, Assignment> {
        let mut assignments = HashMap::new();
        if vendors.is_empty() {
            return assignments;
        }

        let collect_tags = self.policy.collect_tags;
        let retry = RetryPolicy::new(self.policy.llm.max_attempts, self.policy.llm.backoff_base);
        let system = system_prompt(collect_tags);
        let batches: Vec<&[&ProfileRecord]> = vendors.chunks(TAGGER_BATCH_SIZE).collect();
        let total = batches.len();

        for (index, batch) in batches.iter().enumerate() {
            info!(batch = index + 1, total, size = batch.len(), "tagging batch");
            let prompt = batch_prompt(batch, collect_tags);

            let outcome: Result<Vec<TagRow>, CuratorError> = retry
                .run("tagging", || async {
                    Ok(self
                        .client
                        .json_array(&system, &prompt, TAGGER_TEMPERATURE, TAGGER_MAX_TOKENS)
                        .await?)
                })
                .await;

            let by_username: HashMap<String, TagRow> = match outcome {
                Ok(rows) => rows
                    .into_iter()
                    .map(|row| (normalize_username(&row.username), row))
                    .collect(),
                Err(err) => {
                    warn!(
                        batch = index + 1,
                        error = %err,
                        "tagging batch failed, falling back to default category"
                    );
                    HashMap::new()
                }
            };

            for record in batch.iter() {
                let assignment = by_username
                    .get(&record.username)
                    .map(|row| Assignment::from_row(row, collect_tags))
                    .unwrap_or_else(Assignment::fallback);
                assignments.insert(record.username.clone(), assignment);
            }

            if index + 1 < total {
                tokio::time::sleep(self.policy.llm.batch_delay).await;
            }
        }

        assignments
    }
}

fn system_prompt(collect_tags: bool) -> String {
    let taxonomy = serde_json::to_string(CATEGORIES).expect("taxonomy serializes");
    if collect_tags {
        format!(
            "You categorize festival vendors. Assign 1-2 categories from this EXACT list:\n\
             {taxonomy}\n\n\
             Base your decision on what they SELL, not just vibes.\n\
             - Clothing/wearables -> \"Festival Clothing\"\n\
             - Jewelry, necklaces, bracelets, kandi, chains -> \"Jewelry & Accessories\"\n\
             - Paintings, prints, digital art, murals -> \"Art & Prints\"\n\
             - Lamps, furniture, tapestries -> \"Home Decor\"\n\
             - Figurines, plushies, sculptures, toys -> \"Toys & Sculptures\"\n\
             - Bags, fanny packs, hydration packs -> \"Bags & Packs\"\n\
             - Face gems, body paint, cosmetics -> \"Body Art & Cosmetics\"\n\
             - Stickers, patches, pins, enamel pins -> \"Stickers & Patches\"\n\
             - If unclear, use \"Other Handmade\"\n\n\
             Also generate 3-5 short search tags (2-3 words each) that describe what they sell.\n\
             Example tags: \"beaded jewelry\", \"tie dye shirts\", \"resin earrings\", \"crochet tops\"\n\n\
             Respond ONLY with JSON array. No markdown."
        )
    } else {
        format!(
            "You are a product categorizer for a festival vendor directory.\n\n\
             Given vendor information, assign 1-2 categories from this EXACT list:\n\
             {taxonomy}\n\n\
             Rules:\n\
             - Use ONLY categories from the list above (exact spelling)\n\
             - Assign 1 category minimum, 2 maximum\n\
             - If truly unclear, use \"Other Handmade\"\n\
             - Respond ONLY with valid JSON, no markdown or extra text"
        )
    }
}

fn batch_prompt(batch: &[&ProfileRecord], collect_tags: bool) -> String {
    let vendors = batch
        .iter()
        .enumerate()
        .map(|(index, record)| format!("{}. {}", index + 1, vendor_line(record, collect_tags)))
        .collect::<Vec<_>>()
        .join("\n");
    if collect_tags {
        format!(
            "Categorize and tag these vendors:\n\n{vendors}\n\n\
             Return JSON: [{{\"username\": \"x\", \"categories\": [\"Cat1\"], \
             \"tags\": [\"tag1\", \"tag2\", \"tag3\"]}}]"
        )
    } else {
        format!(
            "Categorize these vendors. Return a JSON array with objects:\n\
             - \"username\": the account username\n\
             - \"categories\": array of 1-2 category strings from the allowed list\n\n\
             Vendors:\n{vendors}\n\nJSON response:"
        )
    }
}

fn vendor_line(record: &ProfileRecord, collect_tags: bool) -> String {
    let mut parts = vec![format!("@{}", record.username)];
    let bio_budget = if collect_tags { 250 } else { 200 };
    if !record.biography.is_empty() {
        parts.push(format!("Bio: \"{}\"", truncate_chars(&record.biography, bio_budget)));
    }
    if !record.external_url.is_empty() {
        let link = if record.domain.is_empty() {
            truncate_chars(&record.external_url, 50)
        } else {
            record.domain.as_str()
        };
        parts.push(format!("URL: {link}"));
    }
    if !record.website_description.is_empty() {
        parts.push(format!(
            "Site: \"{}\"",
            truncate_chars(&record.website_description, 150)
        ));
    }
    if collect_tags && !record.website_title.is_empty() {
        parts.push(format!("Title: \"{}\"", truncate_chars(&record.website_title, 80)));
    }
    parts.join(" | ")
}
