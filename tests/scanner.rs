mod helper;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use helper::registry::StubRegistry;
use helper::{tags, task};
use image_reporter::config::ScanConfig;
use image_reporter::scanner::Scanner;
use image_reporter::types::UpdateClassification;
use image_reporter::version::cache::{CachedRegistryClient, RegistryCache};
use image_reporter::version::error::RegistryError;
use image_reporter::version::registry::RegistrySet;

fn config(max_concurrency: usize, registry_timeout_ms: u64) -> ScanConfig {
    ScanConfig {
        max_concurrency,
        registry_timeout_ms,
    }
}

#[tokio::test(start_paused = true)]
async fn scan_classifies_every_task() {
    let registry = StubRegistry::new("docker.io")
        .with_tags("nginx", vec!["1.24", "1.25", "1.26", "1.27-rc1"])
        .with_tags("redis", vec!["7.0.0", "7.2.4"])
        .with_tags("postgres", vec!["15", "16"])
        .with_error("missing", RegistryError::NotFound("missing".to_string()));
    let scanner = Scanner::new(
        RegistrySet::new().with_client(Arc::new(registry)),
        config(4, 1000),
    )
    .unwrap();

    let result = scanner
        .scan(
            vec![
                task("web", "nginx:1.25"),
                task("cache", "redis:7.2.4"),
                task("db", "postgres:15"),
                task("ghost", "missing:1.0"),
            ],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(result.total_tasks, 4);
    assert_eq!(result.completed(), 4);
    assert_eq!(result.up_to_date, vec!["cache"]);
    assert_eq!(
        result.errors,
        vec!["ghost: getting tags for missing:1.0: Image not found: missing"]
    );

    let mut updates: Vec<_> = result
        .updates
        .iter()
        .map(|u| {
            (
                u.service_name.as_str(),
                u.latest_image.tag.as_str(),
                u.update_type,
            )
        })
        .collect();
    updates.sort_by_key(|u| u.0);
    assert_eq!(
        updates,
        vec![
            ("db", "16", UpdateClassification::Major),
            ("web", "1.26", UpdateClassification::Minor),
        ]
    );
    assert_eq!(result.summary(), "2 updates available, 1 services up to date");
}

#[tokio::test(start_paused = true)]
async fn scan_bounds_concurrency_and_overlaps_queries() {
    let delay = Duration::from_millis(100);
    let registry = Arc::new(
        StubRegistry::new("docker.io")
            .with_tags("app", vec!["1.0.0", "1.1.0"])
            .with_delay(delay),
    );
    let scanner = Scanner::new(
        RegistrySet::new().with_client(registry.clone()),
        config(5, 10_000),
    )
    .unwrap();
    let tasks = (0..20)
        .map(|i| task(&format!("svc-{}", i), "app:1.0.0"))
        .collect();

    let started = Instant::now();
    let result = scanner.scan(tasks, &CancellationToken::new()).await;
    let elapsed = started.elapsed();

    assert_eq!(result.updates.len(), 20);
    assert_eq!(registry.calls(), 20);
    assert_eq!(registry.max_in_flight(), 5);
    assert!(elapsed >= delay * 4, "elapsed {:?}", elapsed);
    assert!(elapsed < delay * 5, "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn scan_returns_partial_results_when_cancelled() {
    let fast = StubRegistry::new("docker.io").with_tags("nginx", vec!["1.25", "1.26"]);
    let slow = StubRegistry::new("slow.example.com")
        .with_tags("app", vec!["2.0.0"])
        .with_delay(Duration::from_secs(60));
    let scanner = Scanner::new(
        RegistrySet::new()
            .with_client(Arc::new(fast))
            .with_client(Arc::new(slow)),
        config(10, 120_000),
    )
    .unwrap();

    let started = Instant::now();
    let result = scanner
        .scan_with_deadline(
            vec![
                task("web-1", "nginx:1.25"),
                task("web-2", "nginx:1.26"),
                task("app-1", "slow.example.com/app:1.0.0"),
                task("app-2", "slow.example.com/app:1.0.0"),
            ],
            Duration::from_secs(1),
        )
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.updates.len(), 1);
    assert_eq!(result.up_to_date, vec!["web-2"]);
    assert_eq!(result.errors, vec!["scan cancelled: 2 of 4 tasks completed"]);
}

#[tokio::test]
async fn scan_with_already_cancelled_token_reports_cancellation() {
    let registry = StubRegistry::new("docker.io")
        .with_tags("nginx", vec!["1.25"])
        .with_delay(Duration::from_secs(60));
    let scanner = Scanner::new(
        RegistrySet::new().with_client(Arc::new(registry)),
        ScanConfig::default(),
    )
    .unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = scanner.scan(vec![task("web", "nginx:1.25")], &cancel).await;

    assert!(result.updates.is_empty());
    assert!(result.up_to_date.is_empty());
    assert_eq!(result.errors, vec!["scan cancelled: 0 of 1 tasks completed"]);
}

#[tokio::test]
async fn scan_routes_tasks_by_registry() {
    let hub = Arc::new(StubRegistry::new("docker.io").with_tags("nginx", vec!["1.26"]));
    let ghcr = Arc::new(StubRegistry::new("ghcr.io").with_tags("owner/app", vec!["v2.0.0"]));
    let scanner = Scanner::new(
        RegistrySet::new()
            .with_client(hub.clone())
            .with_client(ghcr.clone()),
        ScanConfig::default(),
    )
    .unwrap();

    let result = scanner
        .scan(
            vec![
                task("implicit", "nginx:1.25"),
                task("explicit", "docker.io/nginx:1.25"),
                task("github", "ghcr.io/owner/app:v1.0.0"),
                task("unknown", "quay.io/org/tool:1.0"),
            ],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(hub.calls(), 2);
    assert_eq!(ghcr.calls(), 1);
    assert_eq!(result.updates.len(), 3);
    assert_eq!(
        result.errors,
        vec!["unknown: no registry client available for quay.io/org/tool:1.0 (registry: quay.io)"]
    );
}

#[tokio::test]
async fn scan_without_tasks_returns_empty_result() {
    let scanner = Scanner::new(RegistrySet::new(), ScanConfig::default()).unwrap();

    let result = scanner.scan(Vec::new(), &CancellationToken::new()).await;

    assert_eq!(result.total_tasks, 0);
    assert!(!result.has_updates());
    assert!(!result.has_errors());
    assert_eq!(result.summary(), "All 0 services are up to date");
}

#[tokio::test(start_paused = true)]
async fn scan_through_cache_queries_registry_once_per_image() {
    let registry = Arc::new(StubRegistry::new("docker.io").with_tags("nginx", vec!["1.25", "1.26"]));
    let cache = Arc::new(RegistryCache::new(Duration::from_secs(60), Duration::ZERO));
    let cached = Arc::new(CachedRegistryClient::new(registry.clone(), cache.clone()));
    let scanner = Scanner::new(RegistrySet::new().with_client(cached), config(1, 1000)).unwrap();

    let first = scanner
        .scan(vec![task("web", "nginx:1.25")], &CancellationToken::new())
        .await;
    let second = scanner
        .scan(vec![task("web", "nginx:1.25")], &CancellationToken::new())
        .await;

    assert_eq!(registry.calls(), 1);
    assert_eq!(first.updates[0].latest_image.tag, "1.26");
    assert_eq!(second.updates[0].latest_image.tag, "1.26");
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().misses, 1);
    assert_eq!(
        cache.get_tags(&task("web", "nginx:1.25").image),
        Some(tags(&["1.25", "1.26"]))
    );
}

#[test]
fn scanner_rejects_invalid_config() {
    assert!(Scanner::new(RegistrySet::new(), config(0, 1000)).is_err());
    assert!(Scanner::new(RegistrySet::new(), config(1, 0)).is_err());
}
