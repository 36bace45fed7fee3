//! Pipeline orchestration: rules → arbitration → gate → tagging.
//!
//! The only component that knows the stage order and owns the output shapes.
//! Every stage below it is independently testable; this module wires them
//! together and keeps the run summary honest.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use deepseek_client::DeepSeek;
use makerscout_common::{
    CurationPolicy, FinalClass, LlmVerdict, ProfileRecord, RulesClass, FALLBACK_CATEGORY,
};

use crate::arbitrator::{ArbitrationStats, Arbitrator, Candidate};
use crate::cache::VerdictStore;
use crate::error::CuratorError;
use crate::gate::{self, GateRejection, GateTally};
use crate::rules::{self, RulesVerdict};
use crate::signals::{self, SignalBundle};
use crate::tagger::{Assignment, Tagger};

/// One record's full scoring trail, serialized as-is into `full_scored.json`
/// for audit and review.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: ProfileRecord,
    pub signals: SignalBundle,
    pub rules: RulesVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmVerdict>,
    pub final_score: f64,
    pub final_classification: FinalClass,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Counts and timings for one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub policy: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub total: usize,
    pub rules_rejected: usize,
    pub rules_approved: usize,
    pub escalated: usize,
    pub llm_cached: usize,
    pub llm_scored: usize,
    pub failed_batches: usize,
    pub gate: GateTally,
    pub approved: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Leave escalated records pending instead of calling the model.
    pub skip_llm: bool,
    /// Skip category tagging.
    pub skip_categories: bool,
}

pub struct CurationPipeline<'a> {
    policy: &'a CurationPolicy,
    client: Option<&'a DeepSeek>,
    store: &'a dyn VerdictStore,
}

impl<'a> CurationPipeline<'a> {
    pub fn new(
        policy: &'a CurationPolicy,
        client: Option<&'a DeepSeek>,
        store: &'a dyn VerdictStore,
    ) -> Self {
        Self {
            policy,
            client,
            store,
        }
    }

    pub async fn run(
        &self,
        records: Vec<ProfileRecord>,
        options: RunOptions,
    ) -> Result<(Vec<ScoredRecord>, PipelineSummary), CuratorError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let total = records.len();

        // Stage 1: signals + rules. Final fields default to the rules output
        // and are only overwritten by the stages below.
        let mut scored: Vec<ScoredRecord> = records
            .into_iter()
            .map(|record| {
                let signals = signals::extract(&record, self.policy);
                let rules = rules::score(&record, &signals, self.policy);
                let final_score = rules.score;
                let final_classification = match rules.classification {
                    RulesClass::Yes => FinalClass::Yes,
                    RulesClass::No => FinalClass::No,
                    RulesClass::Maybe | RulesClass::Review => FinalClass::ReviewPending,
                };
                ScoredRecord {
                    record,
                    signals,
                    rules,
                    llm: None,
                    final_score,
                    final_classification,
                    categories: Vec::new(),
                    tags: Vec::new(),
                }
            })
            .collect();

        let rules_rejected = count_rules(&scored, RulesClass::No);
        let rules_approved = count_rules(&scored, RulesClass::Yes);
        let escalated = total - rules_rejected - rules_approved;
        info!(
            policy = self.policy.name,
            total,
            rejected = rules_rejected,
            approved = rules_approved,
            escalated,
            "rules pass complete"
        );

        // Stage 2: arbitration + gate.
        let mut stats = ArbitrationStats::default();
        let mut gate_tally = GateTally::default();
        match (self.client, options.skip_llm) {
            (Some(client), false) => {
                let (verdicts, arbitration_stats) = {
                    let candidates: Vec<Candidate<'_>> = scored
                        .iter()
                        .filter(|item| item.rules.classification.escalates())
                        .map(|item| Candidate {
                            record: &item.record,
                            signals: &item.signals,
                        })
                        .collect();
                    Arbitrator::new(client, self.policy)
                        .arbitrate(&candidates, self.store)
                        .await?
                };
                stats = arbitration_stats;
                self.merge_verdicts(&mut scored, &verdicts, &mut gate_tally);

                if self.policy.gate.is_some() {
                    info!(
                        low_score = gate_tally.low_score,
                        no_shop = gate_tally.no_shop,
                        no_products = gate_tally.no_products,
                        non_shop_url = gate_tally.non_shop_url,
                        "validation gate applied"
                    );
                }
            }
            _ => {
                info!("LLM stage skipped, escalated records left pending review");
            }
        }

        // Stage 3: tagging, only over approved records.
        if let (Some(client), false, false) =
            (self.client, options.skip_llm, options.skip_categories)
        {
            let assignments: HashMap<String, Assignment> = {
                let approved: Vec<&ProfileRecord> = scored
                    .iter()
                    .filter(|item| item.final_classification == FinalClass::Yes)
                    .map(|item| &item.record)
                    .collect();
                if approved.is_empty() {
                    HashMap::new()
                } else {
                    Tagger::new(client, self.policy).tag(&approved).await
                }
            };
            for item in scored
                .iter_mut()
                .filter(|item| item.final_classification == FinalClass::Yes)
            {
                let assignment = assignments
                    .get(&item.record.username)
                    .cloned()
                    .unwrap_or_else(Assignment::fallback);
                item.categories = assignment.categories;
                item.tags = assignment.tags;
            }
        }

        let approved = scored
            .iter()
            .filter(|item| item.final_classification == FinalClass::Yes)
            .count();
        let summary = PipelineSummary {
            policy: self.policy.name.to_string(),
            started_at,
            elapsed_seconds: start.elapsed().as_secs_f64(),
            total,
            rules_rejected,
            rules_approved,
            escalated,
            llm_cached: stats.cached,
            llm_scored: stats.scored,
            failed_batches: stats.failed_batches,
            gate: gate_tally,
            approved,
        };
        info!(approved, total, "curation pipeline complete");

        Ok((scored, summary))
    }

    /// Apply the merge policy: escalated records take the LLM score as their
    /// final score; everything else keeps the rules verdict. Classification
    /// goes through the gate when the policy has one, otherwise through the
    /// plain approval threshold. Records whose batch failed stay pending.
    fn merge_verdicts(
        &self,
        scored: &mut [ScoredRecord],
        verdicts: &HashMap<String, LlmVerdict>,
        gate_tally: &mut GateTally,
    ) {
        for item in scored
            .iter_mut()
            .filter(|item| item.rules.classification.escalates())
        {
            let Some(verdict) = verdicts.get(&item.record.username) else {
                item.final_classification = FinalClass::ReviewPending;
                continue;
            };
            let mut verdict = verdict.clone();
            item.final_score = verdict.score;

            match &self.policy.gate {
                Some(gate_policy) => {
                    match gate::evaluate(
                        &item.record,
                        &item.signals,
                        &verdict,
                        self.policy.llm.approve_at,
                        gate_policy,
                    ) {
                        None => item.final_classification = FinalClass::Yes,
                        Some(rejection) => {
                            gate_tally.count(rejection);
                            if rejection == GateRejection::NoPurchasePath {
                                verdict.reason = append_gate_reason(&verdict.reason);
                            }
                            item.final_classification = FinalClass::No;
                        }
                    }
                }
                None => {
                    item.final_classification = if verdict.score >= self.policy.llm.approve_at {
                        FinalClass::Yes
                    } else {
                        FinalClass::No
                    };
                }
            }
            item.llm = Some(verdict);
        }
    }
}

fn count_rules(scored: &[ScoredRecord], class: RulesClass) -> usize {
    scored
        .iter()
        .filter(|item| item.rules.classification == class)
        .count()
}

fn append_gate_reason(reason: &str) -> String {
    const GATE_REASON: &str = "GATE: rejected, no shop URL";
    if reason.is_empty() {
        GATE_REASON.to_string()
    } else {
        format!("{reason} | {GATE_REASON}")
    }
}

/// The record shape handed to the site-generation collaborator: final-yes
/// records sorted by confidence, categories guaranteed non-empty.
#[derive(Debug, Clone, Serialize)]
pub struct CuratedVendor {
    pub username: String,
    pub biography: String,
    pub followers: u64,
    pub is_business: bool,
    pub external_url: String,
    pub domain: String,
    pub profile_url: String,
    pub website_title: String,
    pub website_description: String,
    pub confidence_score: f64,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub llm_reason: String,
}

pub fn curated_vendors(scored: &[ScoredRecord]) -> Vec<CuratedVendor> {
    let mut vendors: Vec<CuratedVendor> = scored
        .iter()
        .filter(|item| item.final_classification == FinalClass::Yes)
        .map(|item| CuratedVendor {
            username: item.record.username.clone(),
            biography: item.record.biography.clone(),
            followers: item.record.follower_count,
            is_business: item.record.is_business_account,
            external_url: item.record.external_url.clone(),
            domain: item.record.domain.clone(),
            profile_url: item.record.profile_url.clone(),
            website_title: item.record.website_title.clone(),
            website_description: item.record.website_description.clone(),
            confidence_score: item.final_score,
            categories: if item.categories.is_empty() {
                vec![FALLBACK_CATEGORY.to_string()]
            } else {
                item.categories.clone()
            },
            tags: item.tags.clone(),
            llm_reason: item
                .llm
                .as_ref()
                .map(|verdict| verdict.reason.clone())
                .unwrap_or_default(),
        })
        .collect();
    vendors.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(Ordering::Equal)
    });
    vendors
}
