//! End-to-end dispatcher behavior with scripted collaborators.

use async_trait::async_trait;
use recall_dispatch::store::{DocumentStore, MemoryStore};
use recall_dispatch::upstream::ScriptedBackend;
use recall_dispatch::{
    CaptureDocument, CaptureSource, Dispatcher, DispatcherConfig, Error, Result,
};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn dispatcher(
    config: DispatcherConfig,
    backend: Arc<ScriptedBackend>,
    store: Arc<dyn DocumentStore>,
) -> Dispatcher {
    Dispatcher::builder()
        .with_config(config)
        .with_backend(backend)
        .with_store(store)
        .build()
        .unwrap()
}

/// A reply whose item `i` carries the positional title `T{i}`.
fn positional_reply(n: usize) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"title":"T{i}","summary":"summary {i}","keywords":["k"],"emotions":["calm"],"category":"note","source_url":null}}"#
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

/// Position (0-based) of each submitted text inside the combined payload.
/// Item delimiters start on their own line, which keeps the instruction's own
/// mention of the delimiter shape out of the count.
fn payload_position(payload: &str, text: &str) -> usize {
    let at = payload.find(text).expect("text missing from payload");
    payload[..at].matches("\n--- ITEM ").count() - 1
}

#[tokio::test]
async fn test_full_batch_flushes_on_size_with_positional_results() {
    init_tracing();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_reply(positional_reply(5));
    let store = Arc::new(MemoryStore::new());
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        Arc::clone(&backend),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
    );

    let texts = ["apple", "banana", "cherry", "damson", "elder"];
    let handles: Vec<_> = texts
        .iter()
        .map(|t| {
            let d = dispatcher.clone();
            let text = t.to_string();
            tokio::spawn(async move { d.submit(text, CaptureSource::Web, "caller").await })
        })
        .collect();

    let mut results = Vec::new();
    for h in handles {
        results.push(h.await.unwrap().unwrap());
    }

    // one combined upstream call for the whole batch
    assert_eq!(backend.call_count(), 1);
    let payload = backend.payloads().remove(0);

    // each caller got the analysis at its own position in the payload
    for (text, analysis) in texts.iter().zip(&results) {
        let pos = payload_position(&payload, text);
        assert_eq!(analysis.title, format!("T{pos}"));
    }

    assert_eq!(store.len(), 5);
    let snapshot = dispatcher.snapshot();
    assert_eq!(snapshot.admitted, 5);
    assert_eq!(snapshot.batches_dispatched, 1);
    assert_eq!(snapshot.documents_persisted, 5);
    assert_eq!(snapshot.current_batch_len, 0);
}

#[tokio::test(start_paused = true)]
async fn test_partial_batch_flushes_at_idle_deadline() {
    init_tracing();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_reply(positional_reply(3));
    let store = Arc::new(MemoryStore::new());
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        Arc::clone(&backend),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
    );

    let start = tokio::time::Instant::now();
    let handles: Vec<_> = ["one", "two", "three"]
        .iter()
        .map(|t| {
            let d = dispatcher.clone();
            let text = t.to_string();
            tokio::spawn(async move { d.submit(text, CaptureSource::Mobile, "caller").await })
        })
        .collect();

    for h in handles {
        assert!(h.await.unwrap().is_ok());
    }

    // 3 < 5, so nothing flushed before the 30s idle deadline
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert_eq!(backend.call_count(), 1);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_sixth_request_rejected_without_touching_full_batch() {
    init_tracing();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_reply(positional_reply(5));
    let store = Arc::new(MemoryStore::new());
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        Arc::clone(&backend),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
    );

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let d = dispatcher.clone();
            tokio::spawn(async move {
                d.submit(format!("text {i}"), CaptureSource::Web, "client-a").await
            })
        })
        .collect();

    // let the five earlier submissions claim their quota slots
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let err = dispatcher
        .submit("one too many", CaptureSource::Web, "client-a")
        .await
        .unwrap_err();
    match err {
        Error::ClientQuotaExceeded { client_id, limit } => {
            assert_eq!(client_id, "client-a");
            assert_eq!(limit, 5);
        }
        other => panic!("unexpected error: {other}"),
    }

    // the full batch was unaffected by the rejection
    for h in handles {
        assert!(h.await.unwrap().is_ok());
    }
    assert_eq!(store.len(), 5);
    assert_eq!(dispatcher.snapshot().rejected_client, 1);
}

#[tokio::test]
async fn test_global_quota_rejects_across_clients() {
    init_tracing();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_reply(positional_reply(3));
    let store = Arc::new(MemoryStore::new());
    let config = DispatcherConfig::new()
        .with_batch_size(3)
        .with_global_call_limit(6)
        .with_per_client_limit(10);
    let dispatcher = dispatcher(
        config,
        Arc::clone(&backend),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
    );

    // first batch: three clients admitted with headroom to spare
    let handles: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|c| {
            let d = dispatcher.clone();
            let client = c.to_string();
            tokio::spawn(async move { d.submit("text", CaptureSource::Web, client).await })
        })
        .collect();
    for h in handles {
        assert!(h.await.unwrap().is_ok());
    }

    // second batch uses up the window's remaining admissions, so it is turned
    // away at dispatch time without an upstream call
    let handles: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|c| {
            let d = dispatcher.clone();
            let client = c.to_string();
            tokio::spawn(async move { d.submit("more", CaptureSource::Web, client).await })
        })
        .collect();
    for h in handles {
        assert!(matches!(
            h.await.unwrap(),
            Err(Error::UpstreamQuotaExceeded { .. })
        ));
    }

    // a seventh submission is rejected at admission, whatever the client; the
    // per-client windows (2 of 10 each) play no part
    let err = dispatcher
        .submit("text", CaptureSource::Web, "d")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::GlobalQuotaExceeded { limit: 6 }));

    assert_eq!(backend.call_count(), 1);
    assert_eq!(store.len(), 3);
    assert_eq!(dispatcher.snapshot().rejected_global, 1);
}

#[tokio::test]
async fn test_short_reply_fails_whole_batch_with_no_inserts() {
    init_tracing();
    let backend = Arc::new(ScriptedBackend::new());
    // four analyses for a batch of five
    backend.push_reply(positional_reply(4));
    let store = Arc::new(MemoryStore::new());
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        Arc::clone(&backend),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
    );

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let d = dispatcher.clone();
            tokio::spawn(async move {
                d.submit(format!("text {i}"), CaptureSource::Web, format!("client-{i}")).await
            })
        })
        .collect();

    for h in handles {
        let outcome = h.await.unwrap();
        assert!(matches!(outcome, Err(Error::UpstreamParseFailure { .. })));
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_upstream_call_failure_fans_out_to_batch() {
    init_tracing();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_failure("connection refused");
    let store = Arc::new(MemoryStore::new());
    let config = DispatcherConfig::new().with_batch_size(2);
    let dispatcher = dispatcher(
        config,
        Arc::clone(&backend),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
    );

    let h1 = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.submit("x", CaptureSource::Web, "a").await })
    };
    let h2 = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.submit("y", CaptureSource::Web, "b").await })
    };

    for h in [h1, h2] {
        let outcome = h.await.unwrap();
        assert!(matches!(outcome, Err(Error::UpstreamCallFailure { .. })));
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_exhausted_headroom_rejects_batch_before_the_call() {
    init_tracing();
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    // both members admitted, but the window has only one slot left at
    // dispatch time
    let config = DispatcherConfig::new()
        .with_batch_size(2)
        .with_global_call_limit(3)
        .with_per_client_limit(10);
    let dispatcher = dispatcher(
        config,
        Arc::clone(&backend),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
    );

    let h1 = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.submit("x", CaptureSource::Web, "a").await })
    };
    let h2 = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.submit("y", CaptureSource::Web, "b").await })
    };

    for h in [h1, h2] {
        let outcome = h.await.unwrap();
        assert!(matches!(outcome, Err(Error::UpstreamQuotaExceeded { .. })));
    }
    // the batch was turned away before any upstream call
    assert_eq!(backend.call_count(), 0);
    assert!(store.is_empty());
}

struct FlakyStore {
    inner: MemoryStore,
    poison: &'static str,
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn insert(&self, doc: CaptureDocument) -> Result<()> {
        if doc.metadata.raw_text.contains(self.poison) {
            return Err(Error::PersistenceFailure {
                message: "simulated store outage".to_string(),
            });
        }
        self.inner.insert(doc).await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn test_persistence_failure_is_isolated_per_item() {
    init_tracing();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_reply(positional_reply(2));
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        poison: "poison",
    });
    let config = DispatcherConfig::new().with_batch_size(2);
    let dispatcher = dispatcher(
        config,
        Arc::clone(&backend),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
    );

    let good = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.submit("a fine capture", CaptureSource::Web, "a").await })
    };
    let bad = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.submit("a poison capture", CaptureSource::Web, "b").await })
    };

    assert!(good.await.unwrap().is_ok());
    let outcome = bad.await.unwrap();
    assert!(matches!(outcome, Err(Error::PersistenceFailure { .. })));
    // the sibling's document still landed
    assert_eq!(store.inner.len(), 1);
    assert_eq!(store.inner.documents()[0].metadata.raw_text, "a fine capture");
}
