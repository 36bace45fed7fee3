//! Arbitrator tests against a mocked chat-completions endpoint.
//!
//! Covers the resumability contract (cached records issue no network calls),
//! the neutral default for usernames the model drops, per-batch cache
//! persistence, and the failed-batch isolation guarantee.
//!
//! Run with: cargo test -p makerscout-curator --test arbitration_test

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use deepseek_client::DeepSeek;
use makerscout_common::{CurationPolicy, LlmVerdict, ProfileRecord, RawProfile};
use makerscout_curator::arbitrator::{Arbitrator, Candidate, NOT_RETURNED_REASON};
use makerscout_curator::cache::{MemoryStore, VerdictMap, VerdictStore};
use makerscout_curator::error::CuratorError;
use makerscout_curator::signals::{self, SignalBundle};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Gated policy with the waits zeroed out so retries don't stall the suite.
fn fast_policy() -> CurationPolicy {
    let mut policy = CurationPolicy::gated();
    policy.llm.backoff_base = Duration::ZERO;
    policy.llm.batch_delay = Duration::ZERO;
    policy
}

fn record(username: &str) -> ProfileRecord {
    ProfileRecord::from_raw(RawProfile {
        username: username.to_string(),
        biography: "Handmade resin art, shop now".to_string(),
        follower_count: 5_000,
        is_business_account: true,
        external_url: format!("https://{username}.bigcartel.com/"),
        ..RawProfile::default()
    })
}

fn bundles(records: &[ProfileRecord], policy: &CurationPolicy) -> Vec<SignalBundle> {
    records.iter().map(|r| signals::extract(r, policy)).collect()
}

fn candidates<'a>(
    records: &'a [ProfileRecord],
    bundles: &'a [SignalBundle],
) -> Vec<Candidate<'a>> {
    records
        .iter()
        .zip(bundles)
        .map(|(record, signals)| Candidate { record, signals })
        .collect()
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

fn verdicts_content(usernames: &[&str], score: f64) -> String {
    let rows: Vec<serde_json::Value> = usernames
        .iter()
        .map(|username| {
            serde_json::json!({
                "username": username,
                "score": score,
                "reason": "solid maker",
                "sells_products": true,
                "has_shop": true,
                "festival_aesthetic": true,
            })
        })
        .collect();
    serde_json::to_string(&rows).unwrap()
}

fn cached_verdict(score: f64) -> LlmVerdict {
    LlmVerdict {
        score,
        reason: "cached".to_string(),
        sells_products: Some(true),
        has_shop: Some(true),
        festival_aesthetic: Some(true),
    }
}

/// Store wrapper that counts persist calls, to pin the after-every-batch
/// durability guarantee.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    persists: AtomicUsize,
}

impl VerdictStore for CountingStore {
    fn load(&self) -> Result<VerdictMap, CuratorError> {
        self.inner.load()
    }

    fn persist(&self, verdicts: &VerdictMap) -> Result<(), CuratorError> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        self.inner.persist(verdicts)
    }
}

// ---------------------------------------------------------------------------
// Resumability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cached_records_issue_no_network_calls() {
    let server = MockServer::start().await;
    let policy = fast_policy();

    // 7 escalated records, 3 already cached: exactly one batch of 4 goes out.
    let records: Vec<ProfileRecord> = (1..=7).map(|i| record(&format!("u{i}"))).collect();
    let bundles = bundles(&records, &policy);
    let candidates = candidates(&records, &bundles);

    let mut seeded = VerdictMap::new();
    for cached in ["u1", "u2", "u3"] {
        seeded.insert(cached.to_string(), cached_verdict(0.42));
    }
    let store = MemoryStore::with(seeded);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            &verdicts_content(&["u4", "u5", "u6", "u7"], 0.8),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeepSeek::new("k", "deepseek-chat").with_base_url(server.uri());
    let (verdicts, stats) = Arbitrator::new(&client, &policy)
        .arbitrate(&candidates, &store)
        .await
        .expect("arbitration succeeds");

    assert_eq!(stats.cached, 3);
    assert_eq!(stats.scored, 4);
    assert_eq!(verdicts.len(), 7);

    // Cached verdicts are applied unchanged.
    assert_eq!(verdicts["u1"].score, 0.42);
    assert_eq!(verdicts["u1"].reason, "cached");

    // The one request that went out mentioned no cached username.
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(body.contains("@u4"));
    assert!(!body.contains("@u1"));
}

#[tokio::test]
async fn fully_cached_run_is_offline() {
    let server = MockServer::start().await;
    let policy = fast_policy();

    let records = vec![record("u1"), record("u2")];
    let bundles = bundles(&records, &policy);
    let candidates = candidates(&records, &bundles);

    let mut seeded = VerdictMap::new();
    seeded.insert("u1".to_string(), cached_verdict(0.9));
    seeded.insert("u2".to_string(), cached_verdict(0.2));
    let store = MemoryStore::with(seeded);

    // No mock mounted: any request would 404 and fail the batch loudly.
    let client = DeepSeek::new("k", "deepseek-chat").with_base_url(server.uri());
    let (verdicts, stats) = Arbitrator::new(&client, &policy)
        .arbitrate(&candidates, &store)
        .await
        .expect("no network needed");

    assert_eq!(stats.cached, 2);
    assert_eq!(stats.scored, 0);
    assert_eq!(verdicts.len(), 2);
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_username_gets_neutral_default() {
    let server = MockServer::start().await;
    let policy = fast_policy();

    let records = vec![record("present"), record("dropped")];
    let bundles = bundles(&records, &policy);
    let candidates = candidates(&records, &bundles);
    let store = MemoryStore::default();

    // Model answers with a decorated username for one record and forgets the
    // other entirely.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            r#"[{"username": "@Present", "score": 0.88, "reason": "clear maker",
                 "sells_products": true, "has_shop": true, "festival_aesthetic": true}]"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeepSeek::new("k", "deepseek-chat").with_base_url(server.uri());
    let (verdicts, _) = Arbitrator::new(&client, &policy)
        .arbitrate(&candidates, &store)
        .await
        .unwrap();

    assert_eq!(verdicts["present"].score, 0.88);

    let dropped = &verdicts["dropped"];
    assert_eq!(dropped.score, policy.llm.neutral_score);
    assert_eq!(dropped.reason, NOT_RETURNED_REASON);
    assert_eq!(dropped.sells_products, Some(false));
}

#[tokio::test]
async fn fenced_response_still_parses() {
    let server = MockServer::start().await;
    let policy = fast_policy();

    let records = vec![record("maker")];
    let bundles = bundles(&records, &policy);
    let candidates = candidates(&records, &bundles);
    let store = MemoryStore::default();

    let fenced = format!("```json\n{}\n```", verdicts_content(&["maker"], 0.75));
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(&fenced)))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeepSeek::new("k", "deepseek-chat").with_base_url(server.uri());
    let (verdicts, _) = Arbitrator::new(&client, &policy)
        .arbitrate(&candidates, &store)
        .await
        .unwrap();

    assert_eq!(verdicts["maker"].score, 0.75);
}

// ---------------------------------------------------------------------------
// Failure isolation and durability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_batch_spares_the_others_and_persists_per_batch() {
    let server = MockServer::start().await;
    let policy = fast_policy();

    // 7 pending records: batch 1 = u1..u5 succeeds, batch 2 = u6..u7 hits a
    // persistent 500 and is abandoned after three attempts.
    let records: Vec<ProfileRecord> = (1..=7).map(|i| record(&format!("u{i}"))).collect();
    let bundles = bundles(&records, &policy);
    let candidates = candidates(&records, &bundles);
    let store = CountingStore::default();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("@u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            &verdicts_content(&["u1", "u2", "u3", "u4", "u5"], 0.8),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("@u6"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(3)
        .mount(&server)
        .await;

    let client = DeepSeek::new("k", "deepseek-chat").with_base_url(server.uri());
    let (verdicts, stats) = Arbitrator::new(&client, &policy)
        .arbitrate(&candidates, &store)
        .await
        .expect("a failed batch is not fatal");

    assert_eq!(stats.scored, 5);
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(verdicts.len(), 5, "failed batch contributes no verdicts");
    assert!(!verdicts.contains_key("u6"));

    // One persist per batch, including the failed one.
    assert_eq!(stats.cached, 0);
    assert_eq!(store.persists.load(Ordering::SeqCst), 2);
    assert_eq!(store.inner.snapshot().len(), 5);
}
