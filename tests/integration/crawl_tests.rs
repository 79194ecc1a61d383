//! Integration tests for the crawler
//!
//! These tests use wiremock to serve mock portal result pages and run the
//! full crawl cycle end-to-end through the HTTP renderer and the SQLite sink.

use listing_crawl::config::parse_config;
use listing_crawl::crawler::run_crawl;
use listing_crawl::model::FailureKind;
use listing_crawl::storage::SqliteSink;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Matches requests without a `pagina` query parameter (first result page)
struct FirstPage;

impl Match for FirstPage {
    fn matches(&self, request: &Request) -> bool {
        !request.url.query_pairs().any(|(key, _)| key == "pagina")
    }
}

/// Builds a zapimoveis-style result card
fn zap_card(page: u32, index: usize) -> String {
    format!(
        r#"<article data-testid="property-card-{page}-{index}">
             <h2 data-testid="card-title">Apartamento {index} no Barreiro</h2>
             <p data-testid="listing-price">R$ {price}</p>
             <p data-testid="card-address">Rua Barão de Monte Alto, {index}</p>
             <ul>
               <li>{area} m²</li>
               <li>3 quartos</li>
               <li>2 banheiros</li>
               <li>1 vaga</li>
             </ul>
             <a data-testid="card-link" href="/imovel/venda-{page}-{index}/">ver</a>
           </article>"#,
        price = 300 + index,
        area = 60 + index,
    )
}

fn zap_page(page: u32, cards: usize) -> String {
    let body: String = (0..cards).map(|i| zap_card(page, i)).collect();
    format!(
        "<html><head><title>Imóveis à venda</title></head><body><main>{}</main></body></html>",
        body
    )
}

/// Builds a vivareal-style result card
fn viva_card(page: u32, index: usize) -> String {
    format!(
        r#"<div data-cy="rp-property-cd">
             <a href="https://www.vivareal.com.br/imovel/{page}-{index}/">
               <h2>Casa {index}</h2>
               <div data-cy="rp-cardProperty-price-txt"><p>R$ 500.000</p></div>
               <span data-cy="rp-cardProperty-street-txt">Rua dos Inconfidentes</span>
             </a>
           </div>"#
    )
}

fn viva_page(page: u32, cards: usize, next: &str) -> String {
    let body: String = (0..cards).map(|i| viva_card(page, i)).collect();
    format!(
        "<html><body><section>{}</section><nav>{}</nav>{}</body></html>",
        body,
        next,
        " ".repeat(600)
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Writes a config pointing at the mock server and returns it with its hash
fn test_config(dir: &TempDir, portal: &str, seeds: &[String], max_retries: u32) -> listing_crawl::Config {
    let seeds = seeds
        .iter()
        .map(|s| format!("\"{}\"", s))
        .collect::<Vec<_>>()
        .join(", ");

    let toml = format!(
        r#"
[crawler]
max-concurrency = 2
max-retries = {max_retries}
max-pages-per-origin = 10
navigation-timeout-secs = 5
content-wait-timeout-secs = 5
request-handler-timeout-secs = 10
retry-backoff-ms = 0

[search]
portal = "{portal}"
seed-urls = [{seeds}]

[output]
database-path = "{db}"
jsonl-path = "{jsonl}"
"#,
        db = dir.path().join("listings.db").display(),
        jsonl = dir.path().join("listings.jsonl").display(),
    );

    parse_config(&toml).unwrap()
}

#[tokio::test]
async fn test_paginates_until_short_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/venda/apartamentos/"))
        .and(FirstPage)
        .respond_with(html(zap_page(1, 30)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/venda/apartamentos/"))
        .and(query_param("pagina", "2"))
        .respond_with(html(zap_page(2, 30)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/venda/apartamentos/"))
        .and(query_param("pagina", "3"))
        .respond_with(html(zap_page(3, 12)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seed = format!("{}/venda/apartamentos/?precoMinimo=100000", server.uri());
    let config = test_config(&dir, "zapimoveis", &[seed], 2);

    let report = run_crawl(config, "test-hash").await.unwrap();

    assert_eq!(report.origins_seeded, 1);
    assert_eq!(report.pages_processed, 3);
    assert_eq!(report.listings, 72);
    assert_eq!(report.failures, 0);

    let sink = SqliteSink::open(&dir.path().join("listings.db")).unwrap();
    let listings = sink.load_listings(report.run_id).unwrap();
    assert_eq!(listings.len(), 72);

    let first = &listings[0];
    assert_eq!(first.title.as_deref(), Some("Apartamento 0 no Barreiro"));
    assert_eq!(first.price.as_deref(), Some("R$ 300"));
    assert_eq!(first.rooms, Some(3));
    assert_eq!(first.baths, Some(2));
    assert_eq!(first.parking, Some(1));
    assert_eq!(first.area, Some(60.0));
    assert_eq!(first.url, "https://www.zapimoveis.com.br/imovel/venda-1-0/");
    assert_eq!(first.page, 1);

    assert!(listings.iter().any(|l| l.page == 3));

    let run = sink.get_latest_run().unwrap().unwrap();
    assert_eq!(run.config_hash, "test-hash");
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_failed_origin_does_not_stop_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/venda/savassi/"))
        .respond_with(html(zap_page(1, 5)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/venda/nowhere/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seeds = vec![
        format!("{}/venda/savassi/", server.uri()),
        format!("{}/venda/nowhere/", server.uri()),
    ];
    let config = test_config(&dir, "zapimoveis", &seeds, 2);

    let report = run_crawl(config, "hash").await.unwrap();

    assert_eq!(report.origins_seeded, 2);
    assert_eq!(report.listings, 5);
    assert_eq!(report.failures, 1);
    assert_eq!(report.failures_of(FailureKind::HttpError), 1);
    assert_eq!(report.retries, 0);

    let sink = SqliteSink::open(&dir.path().join("listings.db")).unwrap();
    let summary = sink.failure_summary(report.run_id).unwrap();
    assert_eq!(summary.get(&FailureKind::HttpError), Some(&1));

    let jsonl = std::fs::read_to_string(dir.path().join("listings.jsonl")).unwrap();
    let failure_lines: Vec<serde_json::Value> = jsonl
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .filter(|line| line["type"] == "failure")
        .collect();
    assert_eq!(failure_lines.len(), 1);
    assert_eq!(failure_lines[0]["kind"], "http_error");
    assert!(failure_lines[0]["url"]
        .as_str()
        .unwrap()
        .ends_with("/venda/nowhere/"));
}

#[tokio::test]
async fn test_blocked_page_is_retried_then_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/venda/blocked/"))
        .respond_with(html(
            "<html><body><div id=\"px-captcha\"></div></body></html>".to_string(),
        ))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seeds = vec![format!("{}/venda/blocked/", server.uri())];
    let config = test_config(&dir, "zapimoveis", &seeds, 1);

    let report = run_crawl(config, "hash").await.unwrap();

    assert_eq!(report.listings, 0);
    assert_eq!(report.retries, 1);
    assert_eq!(report.failures_of(FailureKind::RequestExhausted), 1);

    let jsonl = std::fs::read_to_string(dir.path().join("listings.jsonl")).unwrap();
    let failure: serde_json::Value = serde_json::from_str(jsonl.lines().next().unwrap()).unwrap();
    assert_eq!(failure["kind"], "request_exhausted");
    assert_eq!(failure["retry_count"], 1);
}

#[tokio::test]
async fn test_rate_limited_status_is_blocked() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seeds = vec![format!("{}/venda/", server.uri())];
    let config = test_config(&dir, "zapimoveis", &seeds, 0);

    let report = run_crawl(config, "hash").await.unwrap();

    assert_eq!(report.failures, 1);
    assert_eq!(report.failures_of(FailureKind::RequestExhausted), 1);
}

#[tokio::test]
async fn test_empty_first_page_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html(format!(
            "<html><body><p>Nenhum imóvel encontrado</p>{}</body></html>",
            " ".repeat(600)
        )))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seeds = vec![format!("{}/venda/vazio/", server.uri())];
    let config = test_config(&dir, "zapimoveis", &seeds, 2);

    let report = run_crawl(config, "hash").await.unwrap();

    assert_eq!(report.listings, 0);
    assert_eq!(report.failures_of(FailureKind::StructuralMiss), 1);
    assert_eq!(report.retries, 0);
}

#[tokio::test]
async fn test_follows_next_page_control() {
    let server = MockServer::start().await;

    let next_link = r#"<a aria-label="Próxima página" href="/busca/?pagina=2">›</a>"#;
    let last_button = r#"<button data-testid="next-page" disabled>›</button>"#;

    Mock::given(method("GET"))
        .and(path("/busca/"))
        .and(FirstPage)
        .respond_with(html(viva_page(1, 4, next_link)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busca/"))
        .and(query_param("pagina", "2"))
        .respond_with(html(viva_page(2, 36, last_button)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let seeds = vec![format!("{}/busca/", server.uri())];
    let config = test_config(&dir, "vivareal", &seeds, 2);

    let report = run_crawl(config, "hash").await.unwrap();

    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.listings, 40);
    assert_eq!(report.failures, 0);

    let sink = SqliteSink::open(&dir.path().join("listings.db")).unwrap();
    let listings = sink.load_listings(report.run_id).unwrap();
    assert_eq!(listings[0].url, "https://www.vivareal.com.br/imovel/1-0/");
    assert_eq!(listings[0].price.as_deref(), Some("R$ 500.000"));
    assert_eq!(listings[0].address.as_deref(), Some("Rua dos Inconfidentes"));
}
