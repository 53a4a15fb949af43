//! Integration tests for the crawler
//!
//! These tests drive the full coordinator against a scripted in-memory
//! browser engine: list pages, posts, redirect pages and downloads are all
//! served from memory, and delays are configured to zero.

mod scripted;

use scripted::{Doc, ScriptedEngine, Site};
use sluice::config::{parse_config, Config};
use sluice::crawler::{Coordinator, EntryOutcome};
use sluice::output::CrawlReport;
use sluice::state::{CrawlState, StopReason};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const LIST_TEMPLATE: &str = "https://forum.test/thread0806.php?fid=25&page={page}";

fn list_url(page: u32) -> String {
    LIST_TEMPLATE.replace("{page}", &page.to_string())
}

fn post_url(id: u32) -> String {
    format!("https://forum.test/htm_data/2404/25/{}.html", id)
}

fn redirect_url(id: u32) -> String {
    format!("http://rmdown.com/link.php?hash={}", id)
}

fn list_html(posts: &[(u32, &str)]) -> String {
    let rows: String = posts
        .iter()
        .map(|(id, title)| {
            format!(
                r#"<tr><td><a href="/htm_data/2404/25/{}.html">{}</a></td></tr>"#,
                id, title
            )
        })
        .collect();
    format!(
        r#"<html><body><table id="ajaxtable"><tr><th>Title</th></tr>{}</table></body></html>"#,
        rows
    )
}

fn post_html(id: u32) -> String {
    format!(
        r#"<html><body><div id="conttpc"><p>seed</p><a href="{0}">{0}</a></div></body></html>"#,
        redirect_url(id)
    )
}

const POST_WITHOUT_LINK: &str =
    r#"<html><body><div id="conttpc"><p>nothing to download</p></div></body></html>"#;

const REDIRECT_HTML: &str =
    r#"<html><body><form><button type="submit">Download</button></form></body></html>"#;

const LOGIN_WALL: &str = r#"<html><body><p>请先登录</p></body></html>"#;

/// Serves a post whose redirect page delivers `<id>.torrent`
fn serve_post(site: &Site, id: u32) {
    site.serve(&post_url(id), vec![Doc::ok(post_html(id))]);
    site.serve(
        &redirect_url(id),
        vec![Doc::ok(REDIRECT_HTML)
            .with_download(&format!("{}.torrent", id), format!("torrent-{}", id).as_bytes())],
    );
}

fn test_config(download_dir: &Path, page_max: u32, page_min: u32, keywords: &[&str]) -> Config {
    let keywords: Vec<String> = keywords.iter().map(|k| format!("\"{}\"", k)).collect();
    parse_config(&format!(
        r#"
        [site]
        list-url-template = "{}"

        [crawl]
        page-max = {}
        page-min = {}
        keywords = [{}]

        [download]
        directory = '{}'

        [timing]
        human-delay-min-ms = 0
        human-delay-max-ms = 0
        "#,
        LIST_TEMPLATE,
        page_max,
        page_min,
        keywords.join(", "),
        download_dir.display()
    ))
    .expect("test config should parse")
}

async fn crawl(site: &Arc<Site>, config: Config) -> CrawlReport {
    let coordinator = Coordinator::new(config, ScriptedEngine::new(Arc::clone(site)))
        .expect("coordinator should build");
    let report = coordinator
        .run_configured()
        .await
        .expect("crawl should run");
    coordinator.shutdown().await.expect("shutdown");
    report
}

fn titles(report: &CrawlReport) -> Vec<&str> {
    report.entries.iter().map(|r| r.title.as_str()).collect()
}

#[tokio::test]
async fn test_pages_visited_in_descending_order() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    for page in 2..=5 {
        site.serve(&list_url(page), vec![Doc::ok(list_html(&[]))]);
    }

    let report = crawl(&site, test_config(dir.path(), 5, 2, &[])).await;

    assert_eq!(report.pages_visited, vec![5, 4, 3, 2]);
    assert_eq!(report.state, CrawlState::Completed);
    assert_eq!(
        site.visits(),
        vec![list_url(5), list_url(4), list_url(3), list_url(2)]
    );
}

#[tokio::test]
async fn test_blocked_list_page_stops_traversal() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(&list_url(5), vec![Doc::ok(list_html(&[]))]);
    site.serve(&list_url(4), vec![Doc::ok(list_html(&[]))]);
    site.serve(
        &list_url(3),
        vec![Doc::ok("<html><body><p>访问受限</p></body></html>")],
    );
    site.serve(&list_url(2), vec![Doc::ok(list_html(&[]))]);

    let report = crawl(&site, test_config(dir.path(), 5, 2, &[])).await;

    assert_eq!(report.pages_visited, vec![5, 4, 3]);
    assert!(matches!(
        report.state,
        CrawlState::Stopped { page: 3, reason: StopReason::Blocked(_) }
    ));
    assert_eq!(site.visit_count(&list_url(2)), 0);
}

#[tokio::test]
async fn test_list_redirected_to_login_stops_traversal() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(
        &list_url(3),
        vec![Doc::ok(list_html(&[])).redirected_to("https://forum.test/login.php")],
    );

    let report = crawl(&site, test_config(dir.path(), 3, 1, &[])).await;

    assert_eq!(report.pages_visited, vec![3]);
    assert_eq!(
        report.state,
        CrawlState::Stopped {
            page: 3,
            reason: StopReason::Blocked("login URL".to_string())
        }
    );
}

#[tokio::test]
async fn test_http_status_stops_after_finishing_previous_page() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(&list_url(5), vec![Doc::ok(list_html(&[(1, "丝袜体验")]))]);
    serve_post(&site, 1);
    site.serve(&list_url(4), vec![Doc::status(503)]);

    let report = crawl(&site, test_config(dir.path(), 5, 2, &[])).await;

    assert_eq!(report.pages_visited, vec![5, 4]);
    assert_eq!(
        report.state,
        CrawlState::Stopped {
            page: 4,
            reason: StopReason::HttpStatus(Some(503))
        }
    );
    assert_eq!(report.downloaded_count(), 1);
    assert_eq!(site.visit_count(&list_url(3)), 0);
}

#[tokio::test]
async fn test_list_page_without_response_stops_traversal() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(&list_url(3), vec![Doc::no_response()]);

    let report = crawl(&site, test_config(dir.path(), 3, 1, &[])).await;

    assert_eq!(report.pages_visited, vec![3]);
    assert_eq!(
        report.state,
        CrawlState::Stopped {
            page: 3,
            reason: StopReason::HttpStatus(None)
        }
    );
    assert!(report.entries.is_empty());
    assert_eq!(site.visit_count(&list_url(2)), 0);
    assert_eq!(site.visit_count(&list_url(1)), 0);
}

#[tokio::test]
async fn test_missing_list_table_stops_traversal() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(
        &list_url(2),
        vec![Doc::ok("<html><body><p>maintenance</p></body></html>")],
    );

    let report = crawl(&site, test_config(dir.path(), 2, 1, &[])).await;

    match report.state {
        CrawlState::Stopped {
            page: 2,
            reason: StopReason::PageFailure(message),
        } => assert!(message.contains("#ajaxtable"), "{}", message),
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_keyword_filter_keeps_matching_posts_in_order() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(
        &list_url(1),
        vec![Doc::ok(list_html(&[
            (1, "丝袜体验"),
            (2, "旅行日记"),
            (3, "学习笔记"),
        ]))],
    );
    for id in 1..=3 {
        serve_post(&site, id);
    }

    let report = crawl(&site, test_config(dir.path(), 1, 1, &["丝", "学"])).await;

    assert_eq!(report.entries_found, 3);
    assert_eq!(report.entries_matched, 2);
    assert_eq!(titles(&report), vec!["丝袜体验", "学习笔记"]);
    assert_eq!(site.visit_count(&post_url(2)), 0);
}

#[tokio::test]
async fn test_empty_keywords_keep_every_post() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(
        &list_url(1),
        vec![Doc::ok(list_html(&[(1, "丝袜体验"), (2, "旅行日记")]))],
    );
    serve_post(&site, 1);
    serve_post(&site, 2);

    let report = crawl(&site, test_config(dir.path(), 1, 1, &[])).await;

    assert_eq!(titles(&report), vec!["丝袜体验", "旅行日记"]);
    assert_eq!(report.downloaded_count(), 2);
}

#[tokio::test]
async fn test_retry_exhaustion_does_not_block_next_post() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(
        &list_url(1),
        vec![Doc::ok(list_html(&[(1, "no link"), (2, "has link")]))],
    );
    site.serve(&post_url(1), vec![Doc::ok(POST_WITHOUT_LINK)]);
    serve_post(&site, 2);

    let report = crawl(&site, test_config(dir.path(), 1, 1, &[])).await;

    assert_eq!(site.visit_count(&post_url(1)), 3);
    match &report.entries[0].outcome {
        EntryOutcome::Abandoned {
            attempts,
            last_error,
        } => {
            assert_eq!(*attempts, 3);
            assert!(last_error.contains("No redirect link"), "{}", last_error);
        }
        other => panic!("expected abandonment, got {:?}", other),
    }

    assert!(matches!(
        report.entries[1].outcome,
        EntryOutcome::Downloaded { attempts: 1, .. }
    ));
    assert_eq!(report.state, CrawlState::Completed);
}

#[tokio::test]
async fn test_post_without_content_container_is_abandoned() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(
        &list_url(1),
        vec![Doc::ok(list_html(&[(5, "moved post"), (6, "next post")]))],
    );
    site.serve(
        &post_url(5),
        vec![Doc::ok("<html><body><p>moved</p></body></html>")],
    );
    serve_post(&site, 6);

    let report = crawl(&site, test_config(dir.path(), 1, 1, &[])).await;

    assert_eq!(site.visit_count(&post_url(5)), 3);
    match &report.entries[0].outcome {
        EntryOutcome::Abandoned {
            attempts,
            last_error,
        } => {
            assert_eq!(*attempts, 3);
            assert!(last_error.contains("#conttpc"), "{}", last_error);
        }
        other => panic!("expected abandonment, got {:?}", other),
    }
    assert!(matches!(
        report.entries[1].outcome,
        EntryOutcome::Downloaded { attempts: 1, .. }
    ));
    assert!(dir.path().join("6.torrent").exists());
    assert_eq!(report.state, CrawlState::Completed);
}

#[tokio::test]
async fn test_success_on_second_attempt_stops_retrying() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(&list_url(1), vec![Doc::ok(list_html(&[(7, "学习笔记")]))]);
    serve_post(&site, 7);
    site.serve(
        &post_url(7),
        vec![Doc::ok(LOGIN_WALL), Doc::ok(post_html(7))],
    );

    let report = crawl(&site, test_config(dir.path(), 1, 1, &[])).await;

    assert_eq!(site.visit_count(&post_url(7)), 2);
    assert_eq!(site.visit_count(&redirect_url(7)), 1);
    assert!(matches!(
        report.entries[0].outcome,
        EntryOutcome::Downloaded { attempts: 2, .. }
    ));
}

#[tokio::test]
async fn test_blocked_redirect_page_is_retried() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(&list_url(1), vec![Doc::ok(list_html(&[(4, "学习笔记")]))]);
    site.serve(&post_url(4), vec![Doc::ok(post_html(4))]);
    site.serve(
        &redirect_url(4),
        vec![
            Doc::ok("<html><body><p>输入验证码</p></body></html>"),
            Doc::ok(REDIRECT_HTML).with_download("4.torrent", b"payload"),
        ],
    );

    let report = crawl(&site, test_config(dir.path(), 1, 1, &[])).await;

    assert_eq!(site.visit_count(&redirect_url(4)), 2);
    assert_eq!(report.downloaded_count(), 1);
    assert_eq!(report.total_attempts(), 2);
}

#[tokio::test]
async fn test_transfer_that_never_starts_is_abandoned() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(&list_url(1), vec![Doc::ok(list_html(&[(9, "学习笔记")]))]);
    site.serve(&post_url(9), vec![Doc::ok(post_html(9))]);
    site.serve(&redirect_url(9), vec![Doc::ok(REDIRECT_HTML)]);

    let report = crawl(&site, test_config(dir.path(), 1, 1, &[])).await;

    match &report.entries[0].outcome {
        EntryOutcome::Abandoned { last_error, .. } => {
            assert!(last_error.contains("download to start"), "{}", last_error)
        }
        other => panic!("expected abandonment, got {:?}", other),
    }
}

#[tokio::test]
async fn test_download_saved_under_suggested_name() {
    let dir = TempDir::new().unwrap();
    let downloads = dir.path().join("downloads");
    let site = Site::new();
    site.serve(&list_url(1), vec![Doc::ok(list_html(&[(3, "丝袜体验")]))]);
    serve_post(&site, 3);

    let report = crawl(&site, test_config(&downloads, 1, 1, &[])).await;

    let saved = downloads.join("3.torrent");
    assert_eq!(std::fs::read(&saved).unwrap(), b"torrent-3");
    match &report.entries[0].outcome {
        EntryOutcome::Downloaded { result, .. } => {
            assert_eq!(result.path, saved);
            assert_eq!(result.suggested_filename, "3.torrent");
        }
        other => panic!("expected download, got {:?}", other),
    }
}

#[tokio::test]
async fn test_existing_file_is_replaced() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("3.torrent"), b"stale").unwrap();
    let site = Site::new();
    site.serve(&list_url(1), vec![Doc::ok(list_html(&[(3, "丝袜体验")]))]);
    serve_post(&site, 3);

    crawl(&site, test_config(dir.path(), 1, 1, &[])).await;

    assert_eq!(
        std::fs::read(dir.path().join("3.torrent")).unwrap(),
        b"torrent-3"
    );
}

#[tokio::test]
async fn test_every_opened_tab_is_closed() {
    let dir = TempDir::new().unwrap();
    let site = Site::new();
    site.serve(
        &list_url(1),
        vec![Doc::ok(list_html(&[(1, "no link"), (2, "blocked"), (3, "ok")]))],
    );
    site.serve(&post_url(1), vec![Doc::ok(POST_WITHOUT_LINK)]);
    site.serve(&post_url(2), vec![Doc::ok(LOGIN_WALL)]);
    serve_post(&site, 3);

    let report = crawl(&site, test_config(dir.path(), 1, 1, &[])).await;

    // One list tab plus one tab per attempt: 3 + 3 + 1.
    assert_eq!(report.total_attempts(), 7);
    assert_eq!(site.opened(), 8);
    assert_eq!(site.closed(), site.opened());
}
