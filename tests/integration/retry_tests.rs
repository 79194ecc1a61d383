//! Retry, timeout and dedup behavior with a scripted in-process renderer

use async_trait::async_trait;
use listing_crawl::config::CrawlerConfig;
use listing_crawl::crawler::{CrawlEvent, Crawler, RecordingObserver, RenderError, RenderedPage, Renderer};
use listing_crawl::model::{FailureKind, Portal, SearchOrigin};
use listing_crawl::storage::MemorySink;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

type Script = dyn Fn(&Url, usize) -> Result<String, RenderError> + Send + Sync;

/// Renders pages from a script of `(url, prior attempts) -> html | error`
struct ScriptedRenderer {
    script: Box<Script>,
    delay: Duration,
    attempts: Mutex<HashMap<String, usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRenderer {
    fn new(script: impl Fn(&Url, usize) -> Result<String, RenderError> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            attempts: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn total_calls(&self) -> usize {
        self.attempts.lock().unwrap().values().sum()
    }

    fn calls_for(&self, url: &str) -> usize {
        self.attempts.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let prior = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count - 1
        };

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        (self.script)(url, prior).map(|html| RenderedPage {
            url: url.clone(),
            status: Some(200),
            html,
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn listings_page(cards: usize) -> String {
    let body: String = (0..cards)
        .map(|i| {
            format!(
                r#"<article><h2>Apartamento {i}</h2><p>R$ {i}50.000</p><ul><li>2 quartos</li></ul>
                   <a href="/imovel/{i}/">ver</a></article>"#
            )
        })
        .collect();
    format!("<html><body>{}{}</body></html>", body, " ".repeat(600))
}

fn config(max_retries: u32) -> CrawlerConfig {
    CrawlerConfig {
        max_retries,
        retry_backoff_ms: 0,
        ..CrawlerConfig::default()
    }
}

fn seed_origin(url: &str) -> SearchOrigin {
    SearchOrigin::seed_url(Portal::ZapImoveis, Url::parse(url).unwrap())
}

#[tokio::test]
async fn test_persistent_timeout_exhausts_retries() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, _| {
        Err(RenderError::NavigationTimeout(Duration::from_secs(60)))
    }));
    let sink = Arc::new(MemorySink::new());
    let observer = Arc::new(RecordingObserver::new());

    let mut crawler = Crawler::with_observer(&config(2), renderer.clone(), sink.clone(), observer.clone());
    crawler
        .seed(vec![seed_origin("https://www.zapimoveis.com.br/venda/slow/")])
        .unwrap();
    let report = crawler.run().await;

    assert_eq!(renderer.total_calls(), 3);
    assert_eq!(report.pages_processed, 3);
    assert_eq!(report.retries, 2);

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::RequestExhausted);
    assert_eq!(failures[0].retry_count, 2);
    assert_eq!(failures[0].page, 1);
    assert!(failures[0].message.contains("navigation_timeout"));

    let events = observer.events();
    let retry_counts: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            CrawlEvent::Retrying { retry_count, .. } => Some(*retry_count),
            _ => None,
        })
        .collect();
    assert_eq!(retry_counts, vec![1, 2]);
    assert!(events.iter().any(|e| matches!(
        e,
        CrawlEvent::PageStarted { attempt: 3, .. }
    )));
}

#[tokio::test]
async fn test_transient_error_recovers() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, prior| {
        if prior == 0 {
            Err(RenderError::Navigation("connection reset".to_string()))
        } else {
            Ok(listings_page(4))
        }
    }));
    let sink = Arc::new(MemorySink::new());

    let mut crawler = Crawler::new(&config(2), renderer.clone(), sink.clone());
    crawler
        .seed(vec![seed_origin("https://www.zapimoveis.com.br/venda/flaky/")])
        .unwrap();
    let report = crawler.run().await;

    assert_eq!(renderer.total_calls(), 2);
    assert_eq!(report.retries, 1);
    assert_eq!(report.failures, 0);
    assert_eq!(sink.listings().len(), 4);
    assert_eq!(sink.listings()[0].rooms, Some(2));
}

#[tokio::test]
async fn test_non_retryable_error_fails_once() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, _| Err(RenderError::HttpStatus(410))));
    let sink = Arc::new(MemorySink::new());

    let mut crawler = Crawler::new(&config(2), renderer.clone(), sink.clone());
    crawler
        .seed(vec![seed_origin("https://www.zapimoveis.com.br/venda/gone/")])
        .unwrap();
    let report = crawler.run().await;

    assert_eq!(renderer.total_calls(), 1);
    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::HttpError);
    assert_eq!(failures[0].retry_count, 0);
    assert_eq!(report.retries, 0);
}

#[tokio::test]
async fn test_coinciding_urls_are_fetched_once() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, _| Ok(listings_page(3))));
    let sink = Arc::new(MemorySink::new());
    let observer = Arc::new(RecordingObserver::new());

    let mut crawler = Crawler::with_observer(&config(2), renderer.clone(), sink.clone(), observer.clone());
    let seeded = crawler
        .seed(vec![
            seed_origin("https://www.zapimoveis.com.br/venda/?b=2&a=1"),
            seed_origin("https://zapimoveis.com.br/venda?a=1&b=2#resultados"),
            seed_origin("http://www.ZapImoveis.com.br/venda/?a=1&b=2&utm_source=mail"),
        ])
        .unwrap();
    let report = crawler.run().await;

    assert_eq!(seeded, 1);
    assert_eq!(report.duplicates, 2);
    assert_eq!(renderer.total_calls(), 1);
    assert_eq!(sink.listings().len(), 3);
    assert_eq!(
        observer
            .events()
            .iter()
            .filter(|e| matches!(e, CrawlEvent::Duplicate { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_continuation_follows_extraction() {
    let renderer = Arc::new(ScriptedRenderer::new(|url, _| {
        match url.query_pairs().find(|(k, _)| k == "pagina") {
            None => Ok(listings_page(30)),
            Some(_) => Err(RenderError::HttpStatus(404)),
        }
    }));
    let sink = Arc::new(MemorySink::new());
    let observer = Arc::new(RecordingObserver::new());

    let mut crawler = Crawler::with_observer(&config(2), renderer.clone(), sink.clone(), observer.clone());
    crawler
        .seed(vec![seed_origin("https://www.zapimoveis.com.br/venda/barreiro/")])
        .unwrap();
    let report = crawler.run().await;

    assert_eq!(report.listings, 30);
    assert_eq!(renderer.calls_for("https://www.zapimoveis.com.br/venda/barreiro/?pagina=2"), 1);

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::HttpError);
    assert_eq!(failures[0].page, 2);
    assert_eq!(failures[0].origin, "https://www.zapimoveis.com.br/venda/barreiro/");

    let events = observer.events();
    let extracted = events
        .iter()
        .position(|e| matches!(e, CrawlEvent::PageExtracted { page: 1, .. }))
        .unwrap();
    let continued = events
        .iter()
        .position(|e| matches!(e, CrawlEvent::Continuation { page: 2, .. }))
        .unwrap();
    assert!(extracted < continued);
}

#[tokio::test]
async fn test_page_cap_stops_full_pages() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, _| Ok(listings_page(30))));
    let sink = Arc::new(MemorySink::new());

    let config = CrawlerConfig {
        max_pages_per_origin: 3,
        ..config(0)
    };
    let mut crawler = Crawler::new(&config, renderer.clone(), sink.clone());
    crawler
        .seed(vec![seed_origin("https://www.zapimoveis.com.br/venda/centro/")])
        .unwrap();
    let report = crawler.run().await;

    assert_eq!(renderer.total_calls(), 3);
    assert_eq!(report.listings, 90);
    let max_page = sink.listings().iter().map(|l| l.page).max();
    assert_eq!(max_page, Some(3));
}

#[tokio::test]
async fn test_handler_timeout_is_retryable() {
    let renderer = Arc::new(
        ScriptedRenderer::new(|_, _| Ok(listings_page(3))).with_delay(Duration::from_secs(3)),
    );
    let sink = Arc::new(MemorySink::new());

    let config = CrawlerConfig {
        request_handler_timeout_secs: 1,
        ..config(0)
    };
    let mut crawler = Crawler::new(&config, renderer.clone(), sink.clone());
    crawler
        .seed(vec![seed_origin("https://www.zapimoveis.com.br/venda/hangs/")])
        .unwrap();
    let report = crawler.run().await;

    assert_eq!(report.listings, 0);
    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::RequestExhausted);
    assert!(failures[0].message.contains("navigation_timeout"));
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let renderer = Arc::new(
        ScriptedRenderer::new(|_, _| Ok(listings_page(2))).with_delay(Duration::from_millis(50)),
    );
    let sink = Arc::new(MemorySink::new());

    let config = CrawlerConfig {
        max_concurrency: 2,
        ..config(0)
    };
    let mut crawler = Crawler::new(&config, renderer.clone(), sink.clone());
    let origins: Vec<SearchOrigin> = (0..6)
        .map(|i| seed_origin(&format!("https://www.zapimoveis.com.br/venda/bairro-{}/", i)))
        .collect();
    crawler.seed(origins).unwrap();
    let report = crawler.run().await;

    assert_eq!(report.origins_seeded, 6);
    assert_eq!(report.listings, 12);
    assert_eq!(renderer.total_calls(), 6);
    assert!(renderer.peak.load(Ordering::SeqCst) <= 2);
    assert!(renderer.peak.load(Ordering::SeqCst) >= 1);
}
