use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use ct_client::{CachedScraperClient, RequestCache, ScraperClient};
use ct_core::config::DEFAULT_SIMILARITY_URL;
use ct_core::{ArticleGateway, Config, RequestError};
use serde_json::{json, Value};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

fn gateway_for(base_url: &str) -> CachedScraperClient {
    let config = Config::new(
        base_url,
        Duration::from_secs(5),
        DEFAULT_SIMILARITY_URL,
        String::new(),
    )
    .unwrap();
    let client = ScraperClient::new(&config).unwrap();
    CachedScraperClient::new(client, Arc::new(RequestCache::default()))
}

fn summary_json(index: usize) -> Value {
    json!({
        "newspaper": "Test Newspaper",
        "authors": [{"name": format!("Test Author{index}"), "url": format!("https://authors.test/{index}")}],
        "title": format!("Test title{index}"),
        "excerpt": format!("This is a test excerpt{index}"),
        "date_time": "2023-10-30T15:31:48Z",
        "url": format!("https://news.test/article{index}"),
        "is_premium": false
    })
}

#[tokio::test]
async fn search_articles_round_trip() {
    let app = Router::new().route(
        "/search_articles",
        get(|Query(params): Query<Vec<(String, String)>>| async move {
            let page = params
                .iter()
                .find(|(k, _)| k == "page")
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            let summaries: Vec<Value> = if page == "0" {
                vec![summary_json(0), summary_json(1)]
            } else {
                vec![summary_json(2)]
            };
            Json(json!([{"scraper": "el-pais", "results": summaries}]))
        }),
    );
    let gateway = gateway_for(&serve(app).await);

    let page0 = gateway.search_articles("testTopic", 0, 4).await.unwrap();
    assert_eq!(page0.len(), 1);
    let summaries = page0[0].outcome.as_ref().unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].title, "Test title0");
    assert_eq!(summaries[1].title, "Test title1");
    assert_eq!(summaries[0].date_time, "30/10/2023, 15:31:48");

    let page1 = gateway.search_articles("testTopic", 1, 4).await.unwrap();
    let summaries = page1[0].outcome.as_ref().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "Test title2");
}

#[tokio::test]
async fn non_2xx_surfaces_as_http_error() {
    let app = Router::new().route(
        "/search_articles",
        get(|| async {
            (
                axum::http::StatusCode::BAD_REQUEST,
                Json(json!({"error": "connection error"})),
            )
        }),
    );
    let gateway = gateway_for(&serve(app).await);

    let error = gateway
        .search_articles("testTopic", 0, 4)
        .await
        .unwrap_err();
    assert_eq!(error.status(), Some(400));
    assert_eq!(error.to_string(), "Request failed with status: 400");
}

#[tokio::test]
async fn get_article_round_trip() {
    let app = Router::new().route(
        "/get_article",
        get(|Query(params): Query<Vec<(String, String)>>| async move {
            let url = params
                .iter()
                .find(|(k, _)| k == "url")
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            Json(json!({
                "newspaper": "El País",
                "headline": "Test headline",
                "subheadline": "Test subheadline",
                "authors": [{"name": "Test Author"}],
                "last_date_time": "2023-12-13T14:05:00+01:00",
                "body": [{"h2": "Heading"}, {"p": "Body text."}],
                "url": url
            }))
        }),
    );
    let gateway = gateway_for(&serve(app).await);

    let article = gateway
        .get_article("https://news.test/article0")
        .await
        .unwrap();
    assert_eq!(article.headline, "Test headline");
    assert_eq!(article.url, "https://news.test/article0");
    assert_eq!(article.plain_text(), "HeadingBody text.");
}

#[tokio::test]
async fn concurrent_get_article_hits_backend_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/get_article",
            get(|State(calls): State<Arc<AtomicUsize>>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Json(json!({
                    "newspaper": "El País",
                    "headline": "Shared",
                    "subheadline": "",
                    "authors": [],
                    "last_date_time": "2023-12-13T14:05:00+01:00",
                    "body": [{"p": "text"}],
                    "url": "https://news.test/shared"
                }))
            }),
        )
        .with_state(Arc::clone(&calls));
    let gateway = gateway_for(&serve(app).await);

    let (a, b) = tokio::join!(
        gateway.get_article("https://news.test/shared"),
        gateway.get_article("https://news.test/shared"),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap(), b.unwrap());
}

#[tokio::test]
async fn unreachable_backend_is_no_response() {
    // Bind then drop a listener so the port is very likely closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = gateway_for(&format!("http://{}/", addr));
    let error = gateway
        .search_articles("testTopic", 0, 4)
        .await
        .unwrap_err();
    assert_eq!(error, RequestError::NoResponse);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let app = Router::new().route(
        "/get_article",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Json(json!({}))
        }),
    );
    let base = serve(app).await;

    let config = Config::new(
        &base,
        Duration::from_millis(100),
        DEFAULT_SIMILARITY_URL,
        String::new(),
    )
    .unwrap();
    let client = ScraperClient::new(&config).unwrap();
    let gateway = CachedScraperClient::new(client, Arc::new(RequestCache::default()));

    let error = gateway
        .get_article("https://news.test/slow")
        .await
        .unwrap_err();
    assert_eq!(error, RequestError::Timeout);
}
