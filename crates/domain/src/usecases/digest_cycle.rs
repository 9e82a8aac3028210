//! Digest cycle use case - orchestrates collection, analytics, summarization and publication

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    analytics::{self, DEFAULT_TOP_HASHTAGS},
    model::{CycleOutcome, SkipReason, Stage},
    policy::DraftPolicy,
    ports::{Clock, PostSource, Publisher, StateStore, TextGenerator},
    usecases::{
        collect::{CollectConfig, CollectUseCase},
        publish::{PublishConfig, PublishUseCase},
        summarize::{SummarizeConfig, SummarizeUseCase},
    },
};

/// Configuration for the digest cycle
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Accounts to collect from, in order
    pub accounts: Vec<String>,
    /// Draft the report but don't publish or persist anything
    pub dry_run: bool,
    /// Hashtags kept in the analysis
    pub top_hashtags: usize,
    pub collect: CollectConfig,
    pub summarize: SummarizeConfig,
    pub publish: PublishConfig,
    pub draft_policy: DraftPolicy,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            accounts: vec![],
            dry_run: true,
            top_hashtags: DEFAULT_TOP_HASHTAGS,
            collect: CollectConfig::default(),
            summarize: SummarizeConfig::default(),
            publish: PublishConfig::default(),
            draft_policy: DraftPolicy::default(),
        }
    }
}

/// Digest pipeline orchestrator
///
/// At most one cycle runs per pipeline at a time; a cycle triggered while
/// another is in flight is dropped, not queued.
pub struct DigestPipeline<S, G, P, St, Cl>
where
    S: PostSource + ?Sized,
    G: TextGenerator + ?Sized,
    P: Publisher + ?Sized,
    St: StateStore + ?Sized,
    Cl: Clock + ?Sized,
{
    collect: CollectUseCase<Arc<S>>,
    generator: Arc<G>,
    publisher: Arc<P>,
    state_store: Arc<St>,
    clock: Arc<Cl>,
    config: DigestConfig,
    in_flight: AtomicBool,
}

impl<S, G, P, St, Cl> DigestPipeline<S, G, P, St, Cl>
where
    S: PostSource + ?Sized,
    G: TextGenerator + ?Sized,
    P: Publisher + ?Sized,
    St: StateStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        post_source: Arc<S>,
        generator: Arc<G>,
        publisher: Arc<P>,
        state_store: Arc<St>,
        clock: Arc<Cl>,
        config: DigestConfig,
    ) -> Self {
        let collect = CollectUseCase::new(post_source, config.collect.clone());
        Self {
            collect,
            generator,
            publisher,
            state_store,
            clock,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a cycle is currently in flight
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one full digest cycle
    pub async fn run_digest_cycle(&self) -> CycleOutcome {
        if self.config.accounts.is_empty() {
            tracing::info!("No accounts configured, skipping cycle");
            return CycleOutcome::Skipped {
                reason: SkipReason::NoAccounts,
            };
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("Digest cycle already in flight, dropping trigger");
            return CycleOutcome::Skipped {
                reason: SkipReason::AlreadyRunning,
            };
        };

        let outcome = self.run_stages().await;
        match &outcome {
            CycleOutcome::Failed { stage, error } => {
                tracing::error!(stage = %stage, error = %error, "Digest cycle failed");
            }
            CycleOutcome::Published { result } => {
                tracing::info!(post_id = %result.id, url = %result.url, "Digest cycle completed");
            }
            CycleOutcome::Drafted { report } => {
                tracing::info!(
                    chars = report.char_count(),
                    report = %report.text,
                    "[DRY RUN] Would publish"
                );
            }
            CycleOutcome::Skipped { reason } => {
                tracing::info!(reason = ?reason, "Digest cycle skipped");
            }
        }
        outcome
    }

    async fn run_stages(&self) -> CycleOutcome {
        let now = self.clock.now();

        let posts = self
            .collect
            .collect_recent_posts(&self.config.accounts, now)
            .await;

        let analysis = analytics::analyze(&posts, self.config.top_hashtags);
        tracing::info!(
            total_posts = analysis.total_posts,
            top_hashtags = ?analysis.top_hashtags.iter().map(|h| &h.tag).collect::<Vec<_>>(),
            positive = analysis.sentiment.positive,
            neutral = analysis.sentiment.neutral,
            negative = analysis.sentiment.negative,
            "Analyzed posts"
        );

        if analysis.total_posts == 0 {
            return CycleOutcome::Skipped {
                reason: SkipReason::NoPosts,
            };
        }

        let summarize =
            SummarizeUseCase::new(self.generator.as_ref(), self.config.summarize.clone());
        let report = match summarize.summarize(&analysis).await {
            Ok(report) => report,
            Err(e) => {
                return CycleOutcome::Failed {
                    stage: Stage::Summarization,
                    error: e.to_string(),
                };
            }
        };

        for violation in self.config.draft_policy.check(&report) {
            tracing::warn!(violation = %violation, "Draft report violates policy");
        }

        if self.config.dry_run {
            return CycleOutcome::Drafted { report };
        }

        if !self.publisher.is_enabled() {
            tracing::warn!("Publisher is disabled, keeping the report as a draft");
            return CycleOutcome::Drafted { report };
        }

        let publish = PublishUseCase::new(
            self.publisher.as_ref(),
            self.state_store.as_ref(),
            self.config.publish.clone(),
        );
        match publish.publish(&report.text, now).await {
            Ok(result) => CycleOutcome::Published { result },
            Err(e) => CycleOutcome::Failed {
                stage: Stage::Publication,
                error: e.to_string(),
            },
        }
    }
}

/// Holds the in-flight flag and clears it on drop, unwinding included
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Post;
    use crate::ports::GenerationError;
    use crate::usecases::fakes::{
        FakeClock, FakePostSource, FakePublisher, FakeStateStore, Reply, ScriptedGenerator,
    };
    use crate::usecases::publish::{agent_uuid, memory_uuid};
    use time::OffsetDateTime;
    use time::macros::datetime;
    use tokio::sync::Notify;

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

    const TRENDS_JSON: &str =
        r#"{"themes": [{"name": "AI", "count": 2}], "trends": ["AI keeps growing"]}"#;
    const DRAFT: &str = "📊 AI led the day, DeFi followed. #AI #DeFi";

    type TestPipeline = DigestPipeline<
        FakePostSource,
        ScriptedGenerator,
        FakePublisher,
        FakeStateStore,
        FakeClock,
    >;

    fn post(id: &str, author: &str, text: &str, hashtags: &[&str], likes: u64) -> Post {
        Post {
            id: id.to_string(),
            author: author.to_string(),
            text: text.to_string(),
            url: format!("https://x.com/{}/status/{}", author, id),
            created_at: NOW - time::Duration::hours(1),
            like_count: likes,
            repost_count: 0,
            hashtags: hashtags.iter().map(|t| t.to_string()).collect(),
            mentions: vec![],
            media_urls: vec![],
            is_repost: false,
            conversation_id: Some(id.to_string()),
        }
    }

    fn two_account_source() -> FakePostSource {
        FakePostSource::with_posts(vec![
            ("alice", vec![post("1", "alice", "Great #AI news", &["AI"], 5)]),
            (
                "bob",
                vec![post("2", "bob", "Bad day for #AI and #DeFi", &["AI", "DeFi"], 9)],
            ),
        ])
    }

    fn config(accounts: &[&str], dry_run: bool) -> DigestConfig {
        DigestConfig {
            accounts: accounts.iter().map(|a| a.to_string()).collect(),
            dry_run,
            ..Default::default()
        }
    }

    struct Harness {
        generator: Arc<ScriptedGenerator>,
        publisher: Arc<FakePublisher>,
        store: Arc<FakeStateStore>,
        pipeline: TestPipeline,
    }

    fn harness(
        source: FakePostSource,
        replies: Vec<Result<String, GenerationError>>,
        publisher: FakePublisher,
        config: DigestConfig,
    ) -> Harness {
        let generator = Arc::new(ScriptedGenerator::new(replies));
        let publisher = Arc::new(publisher);
        let store = Arc::new(FakeStateStore::default());
        let pipeline = DigestPipeline::new(
            Arc::new(source),
            Arc::clone(&generator),
            Arc::clone(&publisher),
            Arc::clone(&store),
            Arc::new(FakeClock { time: NOW }),
            config,
        );
        Harness {
            generator,
            publisher,
            store,
            pipeline,
        }
    }

    fn happy_replies() -> Vec<Result<String, GenerationError>> {
        vec![Ok(TRENDS_JSON.to_string()), Ok(DRAFT.to_string())]
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_two_accounts() {
        let h = harness(
            two_account_source(),
            happy_replies(),
            FakePublisher::default(),
            config(&["alice", "bob"], false),
        );

        let outcome = h.pipeline.run_digest_cycle().await;

        let CycleOutcome::Published { result } = outcome else {
            panic!("expected Published, got {:?}", outcome);
        };

        // The analysis handed to the extractor
        let requests = h.generator.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let extraction = &requests[0].prompt;
        assert!(extraction.contains("\"total_posts\": 2"));
        let ai = extraction.find("\"tag\": \"AI\"").unwrap();
        let defi = extraction.find("\"tag\": \"DeFi\"").unwrap();
        assert!(ai < defi);
        assert!(extraction.contains("\"positive\": 1"));
        assert!(extraction.contains("\"negative\": 1"));
        assert!(extraction.contains("@bob: \"Bad day for #AI and #DeFi\""));

        assert_eq!(h.publisher.standard.lock().unwrap().len(), 1);
        assert_eq!(h.publisher.standard.lock().unwrap()[0].text, DRAFT);

        let memories = h.store.memories.lock().unwrap();
        assert_eq!(memories.len(), 1);
        assert_eq!(
            memories[0].id,
            memory_uuid(&result.id, agent_uuid("Trend Digest"))
        );
        assert_eq!(memories[0].content.text, DRAFT);
        assert!(!h.pipeline.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_trigger_is_dropped() {
        let gate = Arc::new(Notify::new());
        let source = FakePostSource {
            gate: Some(Arc::clone(&gate)),
            ..FakePostSource::with_posts(vec![(
                "alice",
                vec![post("1", "alice", "Great #AI news", &["AI"], 5)],
            )])
        };
        let h = harness(
            source,
            happy_replies(),
            FakePublisher::default(),
            config(&["alice"], false),
        );

        let (first, second) = tokio::join!(h.pipeline.run_digest_cycle(), async {
            let outcome = h.pipeline.run_digest_cycle().await;
            gate.notify_one();
            outcome
        });

        assert!(matches!(first, CycleOutcome::Published { .. }));
        assert!(matches!(
            second,
            CycleOutcome::Skipped {
                reason: SkipReason::AlreadyRunning
            }
        ));
        assert_eq!(h.publisher.standard.lock().unwrap().len(), 1);
        assert!(!h.pipeline.is_running());
    }

    #[tokio::test]
    async fn test_no_accounts_skips_without_calls() {
        let h = harness(
            FakePostSource::default(),
            vec![],
            FakePublisher::default(),
            config(&[], false),
        );

        let outcome = h.pipeline.run_digest_cycle().await;

        assert!(matches!(
            outcome,
            CycleOutcome::Skipped {
                reason: SkipReason::NoAccounts
            }
        ));
        assert!(h.generator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_posts_skips_summarization() {
        let h = harness(
            FakePostSource::default(),
            happy_replies(),
            FakePublisher::default(),
            config(&["alice", "bob"], false),
        );

        let outcome = h.pipeline.run_digest_cycle().await;

        assert!(matches!(
            outcome,
            CycleOutcome::Skipped {
                reason: SkipReason::NoPosts
            }
        ));
        assert!(h.generator.requests.lock().unwrap().is_empty());
        assert!(h.publisher.standard.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_drafts_without_side_effects() {
        let h = harness(
            two_account_source(),
            happy_replies(),
            FakePublisher::default(),
            config(&["alice", "bob"], true),
        );

        let outcome = h.pipeline.run_digest_cycle().await;

        let CycleOutcome::Drafted { report } = outcome else {
            panic!("expected Drafted, got {:?}", outcome);
        };
        assert_eq!(report.text, DRAFT);
        assert!(h.publisher.standard.lock().unwrap().is_empty());
        assert!(h.publisher.long_form.lock().unwrap().is_empty());
        assert!(h.store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_publisher_drafts_without_side_effects() {
        let h = harness(
            two_account_source(),
            happy_replies(),
            FakePublisher {
                disabled: true,
                ..Default::default()
            },
            config(&["alice", "bob"], false),
        );

        let outcome = h.pipeline.run_digest_cycle().await;

        let CycleOutcome::Drafted { report } = outcome else {
            panic!("expected Drafted, got {:?}", outcome);
        };
        assert_eq!(report.text, DRAFT);
        assert!(h.publisher.standard.lock().unwrap().is_empty());
        assert!(h.publisher.long_form.lock().unwrap().is_empty());
        assert!(h.store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignore_patterns_compiled_once_per_pipeline() {
        let mut cfg = config(&["alice", "bob"], true);
        cfg.collect.ignore_patterns = vec!["^Bad day".to_string()];
        let mut replies = happy_replies();
        replies.extend(happy_replies());
        let h = harness(two_account_source(), replies, FakePublisher::default(), cfg);

        // The filter keeps applying across cycles of the same pipeline
        for _ in 0..2 {
            let outcome = h.pipeline.run_digest_cycle().await;
            assert!(matches!(outcome, CycleOutcome::Drafted { .. }));
        }

        let requests = h.generator.requests.lock().unwrap();
        assert_eq!(requests.len(), 4);
        for extraction in [&requests[0].prompt, &requests[2].prompt] {
            assert!(extraction.contains("\"total_posts\": 1"));
            assert!(!extraction.contains("Bad day"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_summarization_failure_releases_flag() {
        let mut replies = vec![Err(GenerationError::Timeout)];
        replies.extend(happy_replies());
        let h = harness(
            two_account_source(),
            replies,
            FakePublisher::default(),
            config(&["alice", "bob"], false),
        );

        let first = h.pipeline.run_digest_cycle().await;
        assert!(matches!(
            first,
            CycleOutcome::Failed {
                stage: Stage::Summarization,
                ..
            }
        ));
        assert!(!h.pipeline.is_running());

        let second = h.pipeline.run_digest_cycle().await;
        assert!(matches!(second, CycleOutcome::Published { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_publication_failure_is_reported() {
        let h = harness(
            two_account_source(),
            happy_replies(),
            FakePublisher {
                standard_reply: Reply::ServerError,
                ..Default::default()
            },
            config(&["alice", "bob"], false),
        );

        let outcome = h.pipeline.run_digest_cycle().await;

        assert!(matches!(
            outcome,
            CycleOutcome::Failed {
                stage: Stage::Publication,
                ..
            }
        ));
        assert!(h.store.calls.lock().unwrap().is_empty());
    }
}
