//! Router scenarios against recording fakes, plus snapshot tests

#[cfg(test)]
mod router_tests {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use qr_core::{
        Caption, ConversationTurn, Error, GenerationProvider, GenerationResult, Result,
        RetrievedChunk, Retriever, Role, VisionProvider,
    };
    use qr_rag::{HashingEmbedder, LocalRetriever, LocalVectorStore, builtin_documents};

    use crate::prompt::NO_CONTEXT_MARKER;
    use crate::router::{IMAGE_TURN_TEXT, NOTHING_TO_SUMMARIZE};
    use crate::{FailureKind, Intent, Router, RouterConfig, Services, TemplateKind};

    #[derive(Default)]
    struct FakeRetriever {
        chunks: Vec<RetrievedChunk>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Retriever for FakeRetriever {
        async fn search(&self, _query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Retrieval("index unavailable".to_string()));
            }
            Ok(self.chunks.iter().take(k).cloned().collect())
        }

        async fn count(&self) -> Result<usize> {
            Ok(self.chunks.len())
        }
    }

    /// Echoes the prompt back and records every call
    #[derive(Default)]
    struct FakeGenerator {
        fail: bool,
        delay: Option<Duration>,
        calls: Mutex<Vec<(String, Vec<ConversationTurn>)>>,
    }

    impl FakeGenerator {
        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_call(&self) -> (String, Vec<ConversationTurn>) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerationProvider for FakeGenerator {
        async fn generate(&self, prompt: &str, context: &[ConversationTurn]) -> Result<GenerationResult> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), context.to_vec()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::Generation("model not loaded".to_string()));
            }
            Ok(GenerationResult {
                text: format!("echo: {}", prompt),
                model_id: "fake-llm".to_string(),
                tokens_used: None,
            })
        }

        fn model_id(&self) -> &str {
            "fake-llm"
        }
    }

    #[derive(Default)]
    struct FakeVision {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VisionProvider for FakeVision {
        async fn caption(&self, image: &[u8]) -> Result<Caption> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail || image.is_empty() {
                return Err(Error::Vision("unrecognized image format".to_string()));
            }
            Ok(Caption::from_text("a cat sitting on a wooden table"))
        }

        fn model_id(&self) -> &str {
            "fake-vision"
        }
    }

    struct Harness {
        router: Router,
        retriever: Arc<FakeRetriever>,
        generator: Arc<FakeGenerator>,
        vision: Arc<FakeVision>,
    }

    fn harness_with(
        retriever: FakeRetriever,
        generator: FakeGenerator,
        vision: FakeVision,
        config: RouterConfig,
    ) -> Harness {
        let retriever = Arc::new(retriever);
        let generator = Arc::new(generator);
        let vision = Arc::new(vision);
        let services = Services {
            retriever: retriever.clone(),
            generator: generator.clone(),
            vision: vision.clone(),
        };
        Harness {
            router: Router::new(services, config).unwrap(),
            retriever,
            generator,
            vision,
        }
    }

    fn harness() -> Harness {
        harness_with(
            FakeRetriever::default(),
            FakeGenerator::default(),
            FakeVision::default(),
            RouterConfig::default(),
        )
    }

    fn chunk(source_id: &str, title: &str, text: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: format!("{}_0", source_id),
            source_id: source_id.to_string(),
            title: title.to_string(),
            category: "infrastructure".to_string(),
            text: text.to_string(),
            relevance_score: score,
        }
    }

    #[tokio::test]
    async fn test_greeting_uses_template_only() {
        let h = harness();
        let result = h.router.process_query(Some("hi"), None, "u1").await.unwrap();

        assert_eq!(result.intent, Intent::Greeting);
        assert!(TemplateKind::all_replies().contains(&result.answer_text.as_str()));
        assert_eq!(result.model_calls_made, 0);
        assert!(result.failure.is_none());
        assert!(result.elapsed < Duration::from_secs(1));
        assert_eq!(h.generator.call_count(), 0);
        assert_eq!(h.retriever.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.router.history("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_knowledge_search_over_builtin_corpus() {
        let local = LocalRetriever::new(
            Arc::new(LocalVectorStore::new()),
            Arc::new(HashingEmbedder::default()),
        );
        local.index(builtin_documents()).await.unwrap();

        let generator = Arc::new(FakeGenerator::default());
        let services = Services {
            retriever: Arc::new(local),
            generator: generator.clone(),
            vision: Arc::new(FakeVision::default()),
        };
        let router = Router::new(services, RouterConfig::default()).unwrap();

        let result = router.process_query(Some("What is Docker?"), None, "u1").await.unwrap();

        assert_eq!(result.intent, Intent::KnowledgeSearch);
        assert_eq!(result.sources[0], "docker_intro");
        assert!(result.sources.len() <= 3);
        assert_eq!(result.model_calls_made, 2);
        assert!(!result.retrieval_empty);

        let (prompt, _) = generator.last_call();
        assert!(prompt.contains("Document: Docker Containerization"));
        assert!(prompt.contains("Docker is a platform for developing, shipping, and running applications"));
        assert!(prompt.contains("Question: What is Docker?"));
    }

    #[tokio::test]
    async fn test_empty_retrieval_still_generates() {
        let h = harness();
        let result = h
            .router
            .process_query(Some("What is quantum physics?"), None, "u1")
            .await
            .unwrap();

        assert!(result.retrieval_empty);
        assert!(result.failure.is_none());
        assert!(result.sources.is_empty());
        assert_eq!(result.model_calls_made, 2);
        assert!(h.generator.last_call().0.contains(NO_CONTEXT_MARKER));
    }

    #[tokio::test]
    async fn test_calculation() {
        let h = harness();
        let result = h.router.process_query(Some("5+3"), None, "u1").await.unwrap();

        assert_eq!(result.intent, Intent::Calculation);
        assert_eq!(result.answer_text, "8");
        assert_eq!(result.model_calls_made, 0);
        assert_eq!(h.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unsafe_calculation_is_rejected() {
        let h = harness();
        let result = h
            .router
            .process_query(Some("5+3; rm -rf /"), None, "u1")
            .await
            .unwrap();

        assert_eq!(result.intent, Intent::Calculation);
        assert_eq!(result.failure, Some(FailureKind::CalculationError));
        assert!(result.answer_text.starts_with("Calculation error"));
        assert!(!result.is_degraded());
        assert_eq!(result.model_calls_made, 0);
        assert_eq!(h.generator.call_count(), 0);
        assert_eq!(h.router.history("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_unicode_operators_are_rejected() {
        let h = harness();
        let result = h
            .router
            .process_query(Some("calculate 3×4"), None, "u1")
            .await
            .unwrap();

        assert_eq!(result.intent, Intent::Calculation);
        assert_eq!(result.failure, Some(FailureKind::CalculationError));
        assert!(result.answer_text.contains('×'));
    }

    #[tokio::test]
    async fn test_image_caption() {
        let h = harness();
        let result = h
            .router
            .process_query(None, Some(&b"\x89PNG\r\n\x1a\nrest"[..]), "u1")
            .await
            .unwrap();

        assert_eq!(result.intent, Intent::ImageAnalysis);
        assert_eq!(result.answer_text, "a cat sitting on a wooden table");
        assert_eq!(result.tags, vec!["cat", "sitting", "wooden", "table"]);
        assert_eq!(result.model_calls_made, 1);
        assert_eq!(h.generator.call_count(), 0);
        assert_eq!(h.vision.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_vision_failure_is_degraded_and_recorded() {
        let h = harness_with(
            FakeRetriever::default(),
            FakeGenerator::default(),
            FakeVision {
                fail: true,
                ..Default::default()
            },
            RouterConfig::default(),
        );

        let result = h
            .router
            .process_query(None, Some(&[0x00u8, 0x13, 0x37][..]), "u1")
            .await
            .unwrap();

        assert_eq!(result.failure, Some(FailureKind::VisionFailure));
        assert!(result.is_degraded());
        assert_eq!(result.answer_text, FailureKind::VisionFailure.degraded_message());
        assert!(result.tags.is_empty());
        assert_eq!(h.generator.call_count(), 0);

        let history = h.router.history("u1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].text, IMAGE_TURN_TEXT);
        assert_eq!(history[1].text, result.answer_text);
    }

    #[tokio::test]
    async fn test_retrieval_failure_skips_generation() {
        let h = harness_with(
            FakeRetriever {
                fail: true,
                ..Default::default()
            },
            FakeGenerator::default(),
            FakeVision::default(),
            RouterConfig::default(),
        );

        let result = h.router.process_query(Some("explain docker"), None, "u1").await.unwrap();

        assert_eq!(result.failure, Some(FailureKind::RetrievalFailure));
        assert_eq!(result.model_calls_made, 1);
        assert_eq!(h.generator.call_count(), 0);
        assert_eq!(h.router.history("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_is_degraded() {
        let h = harness_with(
            FakeRetriever {
                chunks: vec![chunk("docker_intro", "Docker", "Docker runs containers.", 0.4)],
                ..Default::default()
            },
            FakeGenerator {
                fail: true,
                ..Default::default()
            },
            FakeVision::default(),
            RouterConfig::default(),
        );

        let result = h.router.process_query(Some("What is Docker?"), None, "u1").await.unwrap();

        assert_eq!(result.failure, Some(FailureKind::GenerationFailure));
        assert_eq!(result.answer_text, FailureKind::GenerationFailure.degraded_message());
        assert!(result.sources.is_empty());
        assert_eq!(result.model_calls_made, 2);
        assert_eq!(h.router.history("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_call_timeout_maps_to_failure() {
        let h = harness_with(
            FakeRetriever::default(),
            FakeGenerator {
                delay: Some(Duration::from_millis(500)),
                ..Default::default()
            },
            FakeVision::default(),
            RouterConfig {
                call_timeout: Some(Duration::from_millis(20)),
                ..Default::default()
            },
        );

        let result = h.router.process_query(Some("write a poem"), None, "u1").await.unwrap();

        assert_eq!(result.intent, Intent::GeneralChat);
        assert!(result.fallback_classification);
        assert_eq!(result.failure, Some(FailureKind::GenerationFailure));
        assert_eq!(h.router.history("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_input_records_nothing() {
        let h = harness();

        let neither = h.router.process_query(None, None, "u1").await;
        assert!(matches!(neither, Err(Error::InvalidInput(_))));

        let both = h.router.process_query(Some("hi"), Some(&[1u8, 2][..]), "u1").await;
        assert!(matches!(both, Err(Error::InvalidInput(_))));

        assert!(h.router.history("u1").await.is_empty());
        assert_eq!(h.router.stats().await.active_conversations, 0);
    }

    #[tokio::test]
    async fn test_summarize_without_history_skips_generation() {
        let h = harness();
        let result = h.router.process_query(Some("summarize"), None, "u1").await.unwrap();

        assert_eq!(result.intent, Intent::Summarization);
        assert_eq!(result.answer_text, NOTHING_TO_SUMMARIZE);
        assert_eq!(result.model_calls_made, 0);
        assert_eq!(h.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summarize_serializes_history() {
        let h = harness();
        h.router.process_query(Some("hi"), None, "u1").await.unwrap();
        h.router.process_query(Some("5+3"), None, "u1").await.unwrap();

        let result = h.router.process_query(Some("give me a recap"), None, "u1").await.unwrap();
        assert_eq!(result.model_calls_made, 1);

        let (prompt, context) = h.generator.last_call();
        assert!(prompt.contains("USER: hi\nASSISTANT: "));
        assert!(prompt.contains("USER: 5+3\nASSISTANT: 8"));
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_general_chat_gets_recent_turns() {
        let h = harness();
        for query in ["hi", "1+1", "2+2"] {
            h.router.process_query(Some(query), None, "u1").await.unwrap();
        }

        h.router.process_query(Some("tell a joke"), None, "u1").await.unwrap();
        let (prompt, context) = h.generator.last_call();

        assert_eq!(prompt, "tell a joke");
        let texts: Vec<_> = context.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["1+1", "2", "2+2", "4"]);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let h = harness_with(
            FakeRetriever::default(),
            FakeGenerator::default(),
            FakeVision::default(),
            RouterConfig {
                history_capacity: 4,
                ..Default::default()
            },
        );

        for query in ["1+1", "2+2", "3+3"] {
            h.router.process_query(Some(query), None, "u1").await.unwrap();
        }

        let texts: Vec<_> = h
            .router
            .history("u1")
            .await
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["2+2", "4", "3+3", "6"]);
    }

    #[tokio::test]
    async fn test_odd_history_capacity_keeps_whole_exchanges() {
        let h = harness_with(
            FakeRetriever::default(),
            FakeGenerator::default(),
            FakeVision::default(),
            RouterConfig {
                history_capacity: 3,
                ..Default::default()
            },
        );

        for query in ["1+1", "2+2"] {
            h.router.process_query(Some(query), None, "u1").await.unwrap();
        }

        let history = h.router.history("u1").await;
        let roles: Vec<_> = history.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(history[0].text, "2+2");
    }

    #[tokio::test]
    async fn test_clear_history() {
        let h = harness();
        h.router.process_query(Some("hi"), None, "u1").await.unwrap();
        h.router.process_query(Some("hi"), None, "u2").await.unwrap();

        h.router.clear_history("u1").await;
        assert!(h.router.history("u1").await.is_empty());
        assert_eq!(h.router.history("u2").await.len(), 2);

        h.router.clear_history("u1").await;
        h.router.clear_history("never-seen").await;
        assert!(h.router.history("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_explain_does_not_execute() {
        let h = harness();
        let plan = h.router.explain("What is Docker?");

        assert_eq!(plan.intent(), Intent::KnowledgeSearch);
        assert!(plan.needs_retrieval() && plan.needs_generation());
        assert_eq!(h.retriever.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.generator.call_count(), 0);
        assert!(h.router.history("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_users_keep_paired_history() {
        let h = harness_with(
            FakeRetriever::default(),
            FakeGenerator {
                delay: Some(Duration::from_millis(10)),
                ..Default::default()
            },
            FakeVision::default(),
            RouterConfig {
                history_capacity: 100,
                ..Default::default()
            },
        );

        let requests = (0..5).flat_map(|n| {
            ["alice", "bob"].map(|user| {
                let router = &h.router;
                async move {
                    let query = format!("message {} from {}", n, user);
                    router.process_query(Some(query.as_str()), None, user).await.unwrap()
                }
            })
        });
        let results = futures::future::join_all(requests).await;
        assert!(results.iter().all(|r| r.failure.is_none()));

        for user in ["alice", "bob"] {
            let history = h.router.history(user).await;
            assert_eq!(history.len(), 10);

            for pair in history.chunks(2) {
                assert_eq!(pair[0].role, Role::User);
                assert_eq!(pair[1].role, Role::Assistant);
                assert!(pair[0].text.ends_with(user));
                assert_eq!(pair[1].text, format!("echo: {}", pair[0].text));
            }

            let asked: Vec<_> = history
                .iter()
                .filter(|turn| turn.role == Role::User)
                .map(|turn| turn.text.clone())
                .collect();
            let expected: Vec<_> = (0..5).map(|n| format!("message {} from {}", n, user)).collect();
            assert_eq!(asked, expected);
        }

        let stats = h.router.stats().await;
        assert_eq!(stats.active_conversations, 2);
    }

    #[tokio::test]
    async fn test_stats() {
        let h = harness_with(
            FakeRetriever {
                chunks: vec![chunk("a", "A", "alpha", 0.5), chunk("b", "B", "beta", 0.4)],
                ..Default::default()
            },
            FakeGenerator::default(),
            FakeVision::default(),
            RouterConfig::default(),
        );

        let stats = h.router.stats().await;
        assert_eq!(stats.indexed_chunks, Some(2));
        assert_eq!(stats.retrieval_k, 3);
        assert_eq!(stats.active_conversations, 0);
    }
}

#[cfg(test)]
mod snapshot_tests {
    use insta::{assert_snapshot, assert_yaml_snapshot};
    use qr_core::RetrievedChunk;

    use crate::prompt::knowledge_prompt;
    use crate::{Intent, PlanBuilder};

    #[test]
    fn test_knowledge_prompt_layout() {
        let chunks = vec![
            RetrievedChunk {
                chunk_id: "docker_intro_0".to_string(),
                source_id: "docker_intro".to_string(),
                title: "Docker Containerization".to_string(),
                category: "infrastructure".to_string(),
                text: "Docker packages applications in containers.".to_string(),
                relevance_score: 0.41,
            },
            RetrievedChunk {
                chunk_id: "docker_benefits_0".to_string(),
                source_id: "docker_benefits".to_string(),
                title: "Benefits of Docker".to_string(),
                category: "infrastructure".to_string(),
                text: "Containers are portable.".to_string(),
                relevance_score: 0.29,
            },
        ];

        assert_snapshot!(knowledge_prompt("What is Docker?", &chunks), @r###"
        Context from knowledge base:
        Document: Docker Containerization
        Docker packages applications in containers.

        ---

        Document: Benefits of Docker
        Containers are portable.

        Question: What is Docker?

        Answer clearly and concisely using the context above. If the context does not contain the answer, say so.
        "###);
    }

    #[test]
    fn test_knowledge_plan_snapshot() {
        let plan = PlanBuilder::new(3).build_plan(Intent::KnowledgeSearch, "What is Docker?");

        assert_yaml_snapshot!(plan, {
            ".cost" => "[cost]",
        }, @r###"
        intent: KNOWLEDGE_SEARCH
        steps:
          - action: SEARCH_CORPUS
            query: What is Docker?
            k: 3
          - action: GENERATE
            context: retrieved
        needs_retrieval: true
        needs_generation: true
        needs_vision: false
        latency: slow
        cost: "[cost]"
        "###);
    }

    #[test]
    fn test_plan_explanation() {
        let builder = PlanBuilder::new(3);

        assert_snapshot!(builder.build_plan(Intent::KnowledgeSearch, "What is Docker?").explain(), @r###"
        Query Intent: Knowledge Search
        Execution Steps:
          1. Search knowledge base using retrieval
          2. Generate response using generation
        Estimated Time: 3.05s (slow)
        "###);

        assert_snapshot!(builder.build_plan(Intent::Greeting, "hello").explain(), @r###"
        Query Intent: Greeting
        Strategy: Template response (fastest)
        Estimated Time: 0.00s (instant)
        "###);
    }
}
