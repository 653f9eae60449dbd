//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, down to the files and manifest on disk.

use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use webdown::config::{CrawlerConfig, CrawlerConfigBuilder, OutputFormat, ScopePolicy};
use webdown::output::PageStatus;
use webdown::{crawl, crawl_from_sitemap, ConfigError, CrawlResult, WebdownError};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// HTML response with the given body
fn html(body: impl Into<String>) -> ResponseTemplate {
    let page = format!("<html><body>{}</body></html>", body.into());
    ResponseTemplate::new(200).set_body_raw(page.into_bytes(), "text/html")
}

/// Page whose body is a heading plus one anchor per link
fn linking_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    html(format!("<h1>{}</h1><p>{}</p>", title, anchors))
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn builder(output: &Path, seed: String) -> CrawlerConfigBuilder {
    CrawlerConfig::builder(output).seed(seed).delay_seconds(0.0)
}

async fn run(config: CrawlerConfig) -> CrawlResult {
    crawl(config, CancellationToken::new())
        .await
        .expect("crawl should complete")
}

fn crawled_paths(result: &CrawlResult) -> Vec<String> {
    result
        .pages
        .iter()
        .map(|p| url::Url::parse(&p.url).unwrap().path().to_string())
        .collect()
}

fn read_manifest(output: &Path) -> serde_json::Value {
    let raw = std::fs::read_to_string(output.join("index.json")).expect("manifest exists");
    serde_json::from_str(&raw).expect("manifest is valid JSON")
}

/// Every `.md` file under a directory, recursively
fn markdown_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files.extend(markdown_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }
    files
}

#[tokio::test]
async fn test_breadth_first_order() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/a", "/b"])).await;
    mount(&server, "/a", linking_page("A", &["/c"])).await;
    mount(&server, "/b", linking_page("B", &["/d"])).await;
    mount(&server, "/c", linking_page("C", &[])).await;
    mount(&server, "/d", linking_page("D", &[])).await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .max_depth(2)
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(crawled_paths(&result), vec!["/", "/a", "/b", "/c", "/d"]);
    let depths: Vec<u32> = result.pages.iter().map(|p| p.depth).collect();
    assert_eq!(depths, vec![0, 1, 1, 2, 2]);
    assert_eq!(result.successful_count(), 5);
    assert_eq!(result.pages[3].discovered_from.as_deref(), Some(result.pages[1].url.as_str()));
}

#[tokio::test]
async fn test_depth_limit() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/l1"])).await;
    mount(&server, "/l1", linking_page("L1", &["/l2"])).await;
    Mock::given(method("GET"))
        .and(path("/l2"))
        .respond_with(linking_page("L2", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .max_depth(1)
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(crawled_paths(&result), vec!["/", "/l1"]);
}

#[tokio::test]
async fn test_depth_zero_fetches_only_seed() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/next"])).await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(linking_page("Next", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .max_depth(0)
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(result.attempted_count(), 1);
}

#[tokio::test]
async fn test_fragments_are_deduplicated() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/a#intro", "/a#usage", "/a", "/b"])).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(linking_page("A", &["/#top"]))
        .expect(1)
        .mount(&server)
        .await;
    mount(&server, "/b", linking_page("B", &[])).await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(result.attempted_count(), 3);
    assert_eq!(crawled_paths(&result), vec!["/", "/a", "/b"]);
}

#[tokio::test]
async fn test_failed_page_is_recorded_and_crawl_continues() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/a", "/broken", "/b", "/c"])).await;
    mount(&server, "/a", linking_page("A", &[])).await;
    mount(&server, "/b", linking_page("B", &[])).await;
    mount(&server, "/c", linking_page("C", &[])).await;
    mount(&server, "/broken", ResponseTemplate::new(500)).await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(result.successful_count(), 4);
    assert_eq!(result.failed_count(), 1);

    let failed = result.failed_pages().next().unwrap();
    assert!(failed.url.ends_with("/broken"));
    assert_eq!(failed.status, PageStatus::Failed);
    assert_eq!(failed.error_kind.as_deref(), Some("http_error"));
    assert_eq!(failed.http_status, Some(500));
    assert!(failed.output_path.is_none());

    let manifest = read_manifest(out.path());
    assert_eq!(manifest["failed_count"], 1);
    assert_eq!(manifest["successful_count"], 4);
}

#[tokio::test]
async fn test_not_found_kind() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/missing"])).await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .build()
        .unwrap();
    let result = run(config).await;

    let failed = result.failed_pages().next().unwrap();
    assert_eq!(failed.error_kind.as_deref(), Some("not_found"));
    assert_eq!(failed.http_status, Some(404));
}

#[tokio::test]
async fn test_non_html_content_is_a_failure() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/report.pdf"])).await;
    mount(
        &server,
        "/report.pdf",
        ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
    )
    .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(result.successful_count(), 1);
    let failed = result.failed_pages().next().unwrap();
    assert_eq!(failed.error_kind.as_deref(), Some("unsupported_content_type"));
}

#[tokio::test]
async fn test_max_pages_cap() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        linking_page("Home", &["/p1", "/p2", "/p3", "/p4", "/p5"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/p\d$"))
        .respond_with(linking_page("Page", &[]))
        .expect(2)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .max_pages(3)
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(result.attempted_count(), 3);
    assert!(!result.interrupted);
}

#[tokio::test]
async fn test_sitemap_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    let mut locs: Vec<String> = (1..=9).map(|i| format!("{}/page{}", base, i)).collect();
    locs.insert(4, "not a url".to_string());
    let entries: String = locs
        .iter()
        .map(|loc| format!("<url><loc>{}</loc></url>", loc))
        .collect();
    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    );
    mount(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_raw(sitemap.into_bytes(), "application/xml"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/page\d$"))
        .respond_with(linking_page("Page", &["/elsewhere"]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(linking_page("Elsewhere", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = CrawlerConfig::builder(out.path())
        .delay_seconds(0.0)
        .build_for_sitemap()
        .unwrap();
    let sitemap_url = format!("{}/sitemap.xml", base);
    let result = crawl_from_sitemap(&sitemap_url, config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.attempted_count(), 9);
    assert_eq!(result.successful_count(), 9);
    assert!(result.pages.iter().all(|p| p.depth == 0));

    let manifest = read_manifest(out.path());
    assert_eq!(manifest["sitemap_url"], sitemap_url);
}

#[tokio::test]
async fn test_sitemap_index_is_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    let index = format!(
        "<sitemapindex><sitemap><loc>{base}/a.xml</loc></sitemap><sitemap><loc>{base}/b.xml</loc></sitemap></sitemapindex>"
    );
    let child_a = format!("<urlset><url><loc>{base}/one</loc></url><url><loc>{base}/two</loc></url></urlset>");
    let child_b = format!("<urlset><url><loc>{base}/two</loc></url><url><loc>{base}/three</loc></url></urlset>");
    for (route, body) in [("/index.xml", index), ("/a.xml", child_a), ("/b.xml", child_b)] {
        mount(
            &server,
            route,
            ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "application/xml"),
        )
        .await;
    }
    for route in ["/one", "/two", "/three"] {
        mount(&server, route, linking_page(route, &[])).await;
    }

    let out = tempfile::tempdir().unwrap();
    let config = CrawlerConfig::builder(out.path())
        .delay_seconds(0.0)
        .build_for_sitemap()
        .unwrap();
    let result = crawl_from_sitemap(&format!("{}/index.xml", base), config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(crawled_paths(&result), vec!["/one", "/two", "/three"]);
}

#[tokio::test]
async fn test_unreachable_sitemap_is_an_error() {
    let server = MockServer::start().await;

    let out = tempfile::tempdir().unwrap();
    let config = CrawlerConfig::builder(out.path())
        .delay_seconds(0.0)
        .build_for_sitemap()
        .unwrap();
    let result = crawl_from_sitemap(
        &format!("{}/sitemap.xml", server.uri()),
        config,
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(WebdownError::Sitemap { .. })));
}

#[tokio::test]
async fn test_delay_between_requests() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/a", "/b"])).await;
    mount(&server, "/a", linking_page("A", &[])).await;
    mount(&server, "/b", linking_page("B", &[])).await;

    let out = tempfile::tempdir().unwrap();
    let config = CrawlerConfig::builder(out.path())
        .seed(format!("{}/", server.uri()))
        .delay_seconds(0.3)
        .build()
        .unwrap();

    let start = Instant::now();
    let result = run(config).await;
    let elapsed = start.elapsed();

    assert_eq!(result.attempted_count(), 3);
    // Two gaps between three requests
    assert!(elapsed >= Duration::from_millis(600), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_cancellation_writes_interrupted_manifest() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/a", "/b"])).await;
    mount(&server, "/a", linking_page("A", &[])).await;
    mount(&server, "/b", linking_page("B", &[])).await;

    let out = tempfile::tempdir().unwrap();
    let config = CrawlerConfig::builder(out.path())
        .seed(format!("{}/", server.uri()))
        .delay_seconds(30.0)
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let result = crawl(config, cancel).await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(result.interrupted);
    assert_eq!(result.attempted_count(), 1);

    let manifest = read_manifest(out.path());
    assert_eq!(manifest["interrupted"], true);
    assert_eq!(manifest["pages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_same_subdomain_rejects_other_host() {
    let server = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();
    let other_host = format!("http://localhost:{}/other", port);

    mount(&server, "/", linking_page("Home", &["/inside", other_host.as_str()])).await;
    mount(&server, "/inside", linking_page("Inside", &[])).await;
    Mock::given(method("GET"))
        .and(path("/other"))
        .respond_with(linking_page("Other", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .scope(ScopePolicy::SameSubdomain)
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(crawled_paths(&result), vec!["/", "/inside"]);
    assert_eq!(result.skipped_count, 1);
}

#[tokio::test]
async fn test_same_domain_follows_other_port_but_not_other_host() {
    let server = MockServer::start().await;
    let sibling = MockServer::start().await;
    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();
    let sibling_page = format!("{}/elsewhere", sibling.uri());
    let other_host = format!("http://localhost:{}/foreign", port);

    mount(
        &server,
        "/",
        linking_page("Home", &["/inside", sibling_page.as_str(), other_host.as_str()]),
    )
    .await;
    mount(&server, "/inside", linking_page("Inside", &[])).await;
    Mock::given(method("GET"))
        .and(path("/foreign"))
        .respond_with(linking_page("Foreign", &[]))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(linking_page("Elsewhere", &[]))
        .expect(1)
        .mount(&sibling)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .scope(ScopePolicy::SameDomain)
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(crawled_paths(&result), vec!["/", "/inside", "/elsewhere"]);
    assert_eq!(result.pages[2].url, sibling_page);
    assert_eq!(result.successful_count(), 3);
    assert_eq!(result.skipped_count, 1);
}

#[tokio::test]
async fn test_each_seed_scopes_its_own_links() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    let first_cross = format!("{}/b/cross", second.uri());
    let second_cross = format!("{}/a/cross", first.uri());

    mount(&first, "/a/", linking_page("A", &["/a/one", first_cross.as_str()])).await;
    mount(&first, "/a/one", linking_page("A one", &[])).await;
    mount(&second, "/b/", linking_page("B", &["/b/two", second_cross.as_str()])).await;
    mount(&second, "/b/two", linking_page("B two", &[])).await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .and(path_regex(r"/cross$"))
            .respond_with(linking_page("Cross", &[]))
            .expect(0)
            .mount(server)
            .await;
    }

    let out = tempfile::tempdir().unwrap();
    let config = CrawlerConfig::builder(out.path())
        .seeds(vec![format!("{}/a/", first.uri()), format!("{}/b/", second.uri())])
        .delay_seconds(0.0)
        .scope(ScopePolicy::SameSubdomain)
        .build()
        .unwrap();
    let result = run(config).await;

    let urls: Vec<&str> = result.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/a/", first.uri()),
            format!("{}/b/", second.uri()),
            format!("{}/a/one", first.uri()),
            format!("{}/b/two", second.uri()),
        ]
    );
    assert_eq!(result.successful_count(), 4);
    assert_eq!(result.skipped_count, 2);
}

#[tokio::test]
async fn test_path_prefix_scope() {
    let server = MockServer::start().await;
    mount(&server, "/docs/", linking_page("Docs", &["/docs/guide", "/blog/post"])).await;
    mount(&server, "/docs/guide", linking_page("Guide", &["/blog/post"])).await;
    Mock::given(method("GET"))
        .and(path("/blog/post"))
        .respond_with(linking_page("Post", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/docs/", server.uri()))
        .scope(ScopePolicy::PathPrefix("/docs".to_string()))
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(crawled_paths(&result), vec!["/docs/", "/docs/guide"]);
    // The same rejected URL is counted once
    assert_eq!(result.skipped_count, 1);
}

#[tokio::test]
async fn test_colliding_paths_get_distinct_files() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/docs/page", "/docs/page.html"])).await;
    mount(&server, "/docs/page", linking_page("Plain", &[])).await;
    mount(&server, "/docs/page.html", linking_page("Suffixed", &[])).await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(result.successful_count(), 3);
    let plain = result.pages[1].output_path.clone().unwrap();
    let suffixed = result.pages[2].output_path.clone().unwrap();
    assert!(plain.ends_with("docs/page.md"));
    assert_ne!(plain, suffixed);
    assert!(suffixed.contains("docs/page-"));

    let plain_text = std::fs::read_to_string(out.path().join(&plain)).unwrap();
    let suffixed_text = std::fs::read_to_string(out.path().join(&suffixed)).unwrap();
    assert!(plain_text.contains("Plain"));
    assert!(suffixed_text.contains("Suffixed"));
}

#[tokio::test]
async fn test_manifest_contents() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Welcome", &["/about"])).await;
    mount(&server, "/about", linking_page("About", &[])).await;

    let out = tempfile::tempdir().unwrap();
    let seed = format!("{}/", server.uri());
    let config = builder(out.path(), seed.clone()).build().unwrap();
    let result = run(config).await;
    assert_eq!(result.successful_count(), 2);

    let manifest = read_manifest(out.path());
    assert_eq!(manifest["version"], "1.0");
    assert_eq!(manifest["interrupted"], false);
    assert_eq!(manifest["output_format"], "markdown");
    assert_eq!(manifest["max_depth"], 3);
    assert_eq!(manifest["seed_urls"][0], seed);
    assert!(manifest["sitemap_url"].is_null());

    let pages = manifest["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["status"], "success");
    assert_eq!(pages[0]["depth"], 0);
    assert_eq!(pages[0]["title"], "Welcome");
    assert_eq!(pages[0]["http_status"], 200);
    assert!(pages[0]["discovered_from"].is_null());
    assert_eq!(pages[1]["discovered_from"], seed);

    let first_path = pages[0]["output_path"].as_str().unwrap();
    assert!(first_path.ends_with("/index.md"));
    let written = std::fs::read_to_string(out.path().join(first_path)).unwrap();
    assert!(written.contains("Welcome"));
}

#[tokio::test]
async fn test_claude_xml_output() {
    let server = MockServer::start().await;
    mount(&server, "/guide", linking_page("Guide", &[])).await;

    let out = tempfile::tempdir().unwrap();
    let mut config = builder(out.path(), format!("{}/guide", server.uri()));
    config.format_mut().format = OutputFormat::ClaudeXml;
    let result = run(config.build().unwrap()).await;

    let output_path = result.pages[0].output_path.clone().unwrap();
    assert!(output_path.ends_with("guide.xml"));
    let written = std::fs::read_to_string(out.path().join(output_path)).unwrap();
    assert!(written.starts_with("<claude_documentation>"));
    assert!(written.contains("<heading>Guide</heading>"));
}

#[tokio::test]
async fn test_redirect_target_not_fetched_twice() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/old"])).await;
    mount(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/new"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(linking_page("New", &["/new"]))
        .expect(1)
        .mount(&server)
        .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(crawled_paths(&result), vec!["/", "/old"]);
}

#[tokio::test]
async fn test_redirect_to_written_page_reuses_its_file() {
    let server = MockServer::start().await;
    mount(&server, "/", linking_page("Home", &["/old"])).await;
    mount(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/"),
    )
    .await;

    let out = tempfile::tempdir().unwrap();
    let config = builder(out.path(), format!("{}/", server.uri()))
        .build()
        .unwrap();
    let result = run(config).await;

    assert_eq!(crawled_paths(&result), vec!["/", "/old"]);
    assert!(result.pages.iter().all(|p| p.is_success()));
    assert_eq!(result.pages[1].output_path, result.pages[0].output_path);
    assert_eq!(result.pages[1].title.as_deref(), Some("Home"));
    assert_eq!(markdown_files(out.path()).len(), 1);
}

#[test]
fn test_empty_seeds_is_config_error() {
    let out = tempfile::tempdir().unwrap();
    let result = CrawlerConfig::builder(out.path()).build();
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[test]
fn test_output_dir_that_is_a_file_is_config_error() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let result = CrawlerConfig::builder(file.path())
        .seed("https://example.com/")
        .build();
    assert!(matches!(result, Err(ConfigError::OutputDir { .. })));
}
