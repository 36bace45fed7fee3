//! LLM arbitration of escalated records.
//!
//! Records the rules engine could not settle are batched into prompts and
//! judged by the model. Verdicts are cached per username and the cache is
//! persisted after every batch, so an interrupted run loses at most one
//! in-flight batch and re-spends no API budget on resume. A batch that fails
//! all retry attempts is skipped, never fatal: its records keep their rules
//! score and the failure is logged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use deepseek_client::{truncate_chars, DeepSeek};
use makerscout_common::{CurationPolicy, LlmVerdict, ProfileRecord, RulesMode};

use crate::cache::{VerdictMap, VerdictStore};
use crate::error::CuratorError;
use crate::retry::RetryPolicy;
use crate::signals::SignalBundle;

/// Reason string applied when the model omits a username it was sent.
pub const NOT_RETURNED_REASON: &str = "not returned by LLM";

const TRIAGE_SYSTEM_PROMPT: &str = "\
You are a festival vendor curator. Your job is to evaluate Instagram accounts and determine \
if they are SMALL, INDEPENDENT, HANDMADE/CREATIVE vendors that would be a good fit for a \
psychedelic/festival vendor directory.

IDEAL VENDORS (score 0.7-1.0):
- Handmade, one-of-a-kind products (clothing, jewelry, art, toys, decor)
- Small batch, artisan-crafted items
- Psychedelic, trippy, colorful, unique aesthetic
- Independent creators/makers (not resellers)
- Etsy shops, small Shopify stores, independent artists

REJECT (score 0.0-0.3):
- Big brands or mass-produced \"rave wear\" companies
- Drop-shipping or wholesale resellers
- Generic fast fashion marketed as \"festival\" wear
- Personal accounts (not selling anything)
- Photographers, DJs, promoters, service providers (not product vendors)
- Accounts with no clear product offering

BORDERLINE (score 0.3-0.7):
- Small businesses that sell festival-adjacent items but aren't particularly unique
- Artists who may sell prints but it's unclear from their bio
- Accounts that seem creative but have limited information

For each account, return a score from 0.0 to 1.0 and a brief reason.

IMPORTANT: Respond ONLY with valid JSON. No markdown, no extra text.";

const TRIAGE_USER_TEMPLATE: &str = "\
Evaluate these Instagram accounts for our festival vendor directory.

For each account, return a JSON array with objects containing:
- \"username\": the account username
- \"score\": float 0.0-1.0
- \"reason\": brief explanation (under 20 words)

Accounts to evaluate:
{accounts}

Respond with ONLY a JSON array. Example format:
[{\"username\": \"example\", \"score\": 0.85, \"reason\": \"Handmade beaded jewelry, clearly artisan-crafted\"}]";

const GATED_SYSTEM_PROMPT: &str = "\
You are a strict curator for a HANDMADE TRIPPY FESTIVAL VENDOR directory. You are the final \
gatekeeper. Only approve vendors you'd personally recommend to someone looking for unique, \
one-of-a-kind festival gear.

For each account, answer THREE questions:
1. SELLS PRODUCTS? Does this account sell tangible products (not services, events, or content)?
2. HAS SHOP? Is there a way to buy from them (shop URL, Etsy, marketplace, \"DM for orders\")?
3. FESTIVAL AESTHETIC? Is their style trippy, psychedelic, bohemian, rave, colorful, or \
uniquely creative? (NOT generic fashion, high fashion, or mass-produced)

SCORING GUIDE:
0.85-1.0: Perfect fit. Handmade + trippy/unique + clear shop. Examples: handmade beaded rave \
accessories, psychedelic tie-dye clothing, one-of-a-kind resin art, custom festival harnesses.
0.70-0.84: Good fit. Sells creative products, has a shop, festival-adjacent aesthetic.
0.50-0.69: Borderline. Missing one of: shop link, aesthetic fit, or unclear if they sell.
0.20-0.49: Probably not. Influencer, personal account, wrong aesthetic, or no products.
0.00-0.19: Definitely not. DJ, photographer, event promoter, big brand, personal account.

CRITICAL RULES - these override everything:
- NO SHOP/BUY PATH = max score 0.50 (even if everything else is perfect)
- Influencer/affiliate accounts (promote others' products) = max score 0.20
- Personal raver accounts (attend festivals, don't sell) = max score 0.15
- Event organizers/promoters (even with merch) = max score 0.30
- \"Slow fashion\" / \"minimalist\" / high fashion designers = max score 0.40 (wrong aesthetic)
- Photographers, DJs, performers, service providers = max score 0.15

RESPOND WITH ONLY A JSON ARRAY. No markdown, no explanation outside JSON.";

const GATED_USER_TEMPLATE: &str = "\
Score these accounts for the festival vendor directory.

Return JSON array:
[{\"username\": \"x\", \"sells_products\": true/false, \"has_shop\": true/false, \
\"festival_aesthetic\": true/false, \"score\": 0.0-1.0, \"reason\": \"brief explanation\"}]

Accounts:
{accounts}

JSON:";

/// One row of the model's JSON-array response. Every field defaults so a
/// sloppy row never fails the whole batch; omissions are resolved to safe
/// values, not retried, since re-asking cannot fix them deterministically.
#[derive(Debug, Deserialize)]
struct VerdictRow {
    #[serde(default)]
    username: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    sells_products: Option<bool>,
    #[serde(default)]
    has_shop: Option<bool>,
    #[serde(default)]
    festival_aesthetic: Option<bool>,
}

/// An escalated record together with its derived signals.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub record: &'a ProfileRecord,
    pub signals: &'a SignalBundle,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct ArbitrationStats {
    pub cached: usize,
    pub scored: usize,
    pub failed_batches: usize,
}

pub struct Arbitrator<'a> {
    client: &'a DeepSeek,
    policy: &'a CurationPolicy,
}

impl<'a> Arbitrator<'a> {
    pub fn new(client: &'a DeepSeek, policy: &'a CurationPolicy) -> Self {
        Self { client, policy }
    }

    /// Score `candidates` in batches, reusing cached verdicts and persisting
    /// the cache after every batch. Returns all verdicts, cached and fresh.
    pub async fn arbitrate(
        &self,
        candidates: &[Candidate<'_>],
        store: &dyn VerdictStore,
    ) -> Result<(VerdictMap, ArbitrationStats), CuratorError> {
        let llm = &self.policy.llm;
        let mut verdicts = store.load()?;
        let mut stats = ArbitrationStats::default();

        let pending: Vec<&Candidate<'_>> = candidates
            .iter()
            .filter(|candidate| !verdicts.contains_key(&candidate.record.username))
            .collect();
        stats.cached = candidates.len() - pending.len();
        if stats.cached > 0 {
            info!(
                cached = stats.cached,
                remaining = pending.len(),
                "resuming from verdict cache"
            );
        }
        if pending.is_empty() {
            return Ok((verdicts, stats));
        }

        let retry = RetryPolicy::new(llm.max_attempts, llm.backoff_base);
        let system = self.system_prompt();
        let batches: Vec<&[&Candidate<'_>]> = pending.chunks(llm.batch_size).collect();
        let total = batches.len();

        for (index, batch) in batches.iter().enumerate() {
            info!(batch = index + 1, total, size = batch.len(), "scoring batch");
            let prompt = self.batch_prompt(batch);

            let outcome: Result<Vec<VerdictRow>, CuratorError> = retry
                .run("arbitration", || async {
                    Ok(self
                        .client
                        .json_array(system, &prompt, llm.temperature, llm.max_tokens)
                        .await?)
                })
                .await;

            match outcome {
                Ok(rows) => {
                    let by_username: HashMap<String, VerdictRow> = rows
                        .into_iter()
                        .map(|row| (normalize_username(&row.username), row))
                        .collect();
                    for candidate in batch.iter() {
                        let username = &candidate.record.username;
                        verdicts.insert(username.clone(), self.verdict_for(username, &by_username));
                        stats.scored += 1;
                    }
                }
                Err(err) => {
                    stats.failed_batches += 1;
                    warn!(
                        batch = index + 1,
                        error = %err,
                        "batch abandoned after retries, its records keep their rules score"
                    );
                }
            }

            store.persist(&verdicts)?;

            if index + 1 < total {
                tokio::time::sleep(llm.batch_delay).await;
            }
        }

        Ok((verdicts, stats))
    }

    fn system_prompt(&self) -> &'static str {
        match self.policy.mode {
            RulesMode::Triage => TRIAGE_SYSTEM_PROMPT,
            RulesMode::RejectOnly => GATED_SYSTEM_PROMPT,
        }
    }

    fn batch_prompt(&self, batch: &[&Candidate<'_>]) -> String {
        let accounts = batch
            .iter()
            .enumerate()
            .map(|(index, candidate)| format!("{}. {}", index + 1, self.account_line(candidate)))
            .collect::<Vec<_>>()
            .join("\n");
        let template = match self.policy.mode {
            RulesMode::Triage => TRIAGE_USER_TEMPLATE,
            RulesMode::RejectOnly => GATED_USER_TEMPLATE,
        };
        template.replace("{accounts}", &accounts)
    }

    /// Render one record as a prompt line, truncating long fields so a single
    /// verbose profile can't blow the batch's token budget.
    fn account_line(&self, candidate: &Candidate<'_>) -> String {
        let record = candidate.record;
        let signals = candidate.signals;
        let mut parts = vec![format!("@{}", record.username)];

        if record.follower_count > 0 {
            parts.push(format!("({} followers)", record.follower_count));
        }
        if signals.is_business {
            parts.push("[business account]".to_string());
        }

        match self.policy.mode {
            RulesMode::Triage => {
                if !record.biography.is_empty() {
                    parts.push(format!("Bio: \"{}\"", truncate_chars(&record.biography, 200)));
                }
                if !record.external_url.is_empty() {
                    parts.push(format!("URL: {}", record.external_url));
                }
                if !record.website_description.is_empty() {
                    parts.push(format!(
                        "Site: \"{}\"",
                        truncate_chars(&record.website_description, 150)
                    ));
                }
            }
            RulesMode::RejectOnly => {
                parts.push(format!("[URL: {}]", signals.url));
                if !record.biography.is_empty() {
                    parts.push(format!("Bio: \"{}\"", truncate_chars(&record.biography, 250)));
                }
                if !record.external_url.is_empty() {
                    let link = if record.domain.is_empty() {
                        truncate_chars(&record.external_url, 60)
                    } else {
                        record.domain.as_str()
                    };
                    parts.push(format!("Link: {link}"));
                }
                if !record.website_description.is_empty() {
                    parts.push(format!(
                        "Site desc: \"{}\"",
                        truncate_chars(&record.website_description, 150)
                    ));
                }
                if !record.website_title.is_empty() {
                    parts.push(format!(
                        "Site title: \"{}\"",
                        truncate_chars(&record.website_title, 80)
                    ));
                }
                if !signals.product_matches.is_empty() {
                    parts.push(format!("Product signals: {:?}", top5(&signals.product_matches)));
                }
                if !signals.negative_matches.is_empty() {
                    parts.push(format!("Warning signals: {:?}", top5(&signals.negative_matches)));
                }
            }
        }

        parts.join(" | ")
    }

    /// Resolve one username against the parsed rows. Omitted usernames get
    /// the policy's neutral score and an explicit reason; under the gated
    /// policy the sub-verdicts default to false, which the validation gate
    /// treats as a failed check.
    fn verdict_for(&self, username: &str, rows: &HashMap<String, VerdictRow>) -> LlmVerdict {
        let neutral = self.policy.llm.neutral_score;
        let wants_sub_verdicts = self.policy.mode == RulesMode::RejectOnly;
        match rows.get(username) {
            Some(row) => LlmVerdict {
                score: row.score.unwrap_or(neutral).clamp(0.0, 1.0),
                reason: row.reason.clone().unwrap_or_default(),
                sells_products: wants_sub_verdicts
                    .then(|| row.sells_products.unwrap_or(false)),
                has_shop: wants_sub_verdicts.then(|| row.has_shop.unwrap_or(false)),
                festival_aesthetic: wants_sub_verdicts
                    .then(|| row.festival_aesthetic.unwrap_or(false)),
            },
            None => LlmVerdict {
                score: neutral,
                reason: NOT_RETURNED_REASON.to_string(),
                sells_products: wants_sub_verdicts.then_some(false),
                has_shop: wants_sub_verdicts.then_some(false),
                festival_aesthetic: wants_sub_verdicts.then_some(false),
            },
        }
    }
}

/// Usernames come back in whatever shape the model felt like: strip the `@`
/// and case-fold before matching.
pub(crate) fn normalize_username(username: &str) -> String {
    username.trim().trim_start_matches('@').to_lowercase()
}

fn top5(matches: &[String]) -> &[String] {
    &matches[..matches.len().min(5)]
}
