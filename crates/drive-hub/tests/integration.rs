mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use drive_hub::{
    DriveHub, DriveRegistry, DriveResolver, EventBroadcaster, HubConfig, HubError, HubEvent,
    ListingOptions,
};
use remote_drive_core::{ComparisonOp, Predicate, SortType};
use tempfile::{TempDir, tempdir};
use tokio_test::{assert_err, assert_ok};

use common::MockProvider;

fn resolver(provider: &MockProvider) -> (DriveResolver, Arc<EventBroadcaster>) {
    let events = Arc::new(EventBroadcaster::new(64));
    let resolver = DriveResolver::new(Arc::new(DriveRegistry::new()), events.clone())
        .with_provider(Arc::new(provider.clone()));
    (resolver, events)
}

fn mock_hub(provider: &MockProvider) -> DriveHub {
    DriveHub::with_providers(HubConfig::default(), vec![Arc::new(provider.clone())])
}

#[tokio::test]
async fn test_repeated_resolve_returns_same_drive() {
    let provider = MockProvider::new(&["media", "public"]);
    let (resolver, _) = resolver(&provider);

    let first = assert_ok!(resolver.resolve("mock://nas/media/movies/x.mp4", None).await)
        .expect("drive should be discovered");
    let second = assert_ok!(resolver.resolve("mock://nas/media/music", None).await)
        .expect("drive should be cached");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.discover_calls(), 1);
    assert_eq!(provider.connect_calls(), 1);
    assert_eq!(resolver.registry().len().await, 1);
}

#[tokio::test]
async fn test_share_is_selected_from_path() {
    let provider = MockProvider::new(&["media", "public"]);
    let (resolver, _) = resolver(&provider);

    let drive = assert_ok!(resolver.resolve("mock://alice:pw@nas:4455/media/movies/x.mp4", None).await)
        .expect("drive should be discovered");

    assert_eq!(provider.discovered_at(), vec!["mock://alice:pw@nas:4455".to_string()]);
    assert_eq!(provider.bound_shares(), vec!["media".to_string()]);
    assert_eq!(drive.active_share().as_deref(), Some("media"));
}

#[tokio::test]
async fn test_unmatched_path_falls_back_to_first_share() {
    let provider = MockProvider::new(&["media", "public"]);
    let (resolver, _) = resolver(&provider);

    assert_ok!(resolver.resolve("mock://nas/downloads/x.mp4", None).await);
    assert_eq!(provider.bound_shares(), vec!["media".to_string()]);
}

#[tokio::test]
async fn test_empty_share_list_uses_first_segment() {
    let provider = MockProvider::new(&[]);
    let (resolver, _) = resolver(&provider);

    assert_ok!(resolver.resolve("mock://nas/docs/readme.txt", None).await);
    assert_eq!(provider.bound_shares(), vec!["docs".to_string()]);

    let root_provider = MockProvider::new(&[]);
    let (root_resolver, _) = self::resolver(&root_provider);
    let drive = assert_ok!(root_resolver.resolve("mock://server", None).await)
        .expect("default namespace should connect");
    assert_eq!(root_provider.bound_shares(), vec![String::new()]);
    assert_eq!(drive.active_share(), None);
}

#[tokio::test]
async fn test_share_hint_strips_trailing_segment() {
    let provider = MockProvider::new(&["media", "public"]);
    let (resolver, _) = resolver(&provider);

    let drive = assert_ok!(resolver.resolve("mock://nas/public", Some("public")).await)
        .expect("drive should be discovered");

    assert_eq!(provider.discovered_at(), vec!["mock://nas".to_string()]);
    assert_eq!(provider.bound_shares(), vec!["public".to_string()]);
    assert_eq!(drive.base_url().as_str(), "mock://nas");
}

#[tokio::test]
async fn test_connect_failure_is_an_error() {
    let provider = MockProvider::new(&["media"]);
    let (resolver, events) = resolver(&provider);
    let mut stream = events.subscribe();

    let Err(err) = resolver.resolve("mock://nas/missing", Some("missing")).await else {
        panic!("connect failure should surface as an error");
    };
    assert!(matches!(err, HubError::ShareNotFound(name) if name == "missing"));
    assert!(resolver.registry().is_empty().await);

    let event = stream.recv().await.expect("failure event should be emitted");
    assert!(matches!(event, HubEvent::ResolutionFailed { .. }));
}

#[tokio::test]
async fn test_discovery_failure_is_absent() {
    let provider = MockProvider::unreachable();
    let (resolver, events) = resolver(&provider);
    let mut stream = events.subscribe();

    let resolved = assert_ok!(resolver.resolve("mock://offline/media", None).await);
    assert!(resolved.is_none());
    assert_eq!(provider.connect_calls(), 0);

    let unsupported = assert_ok!(resolver.resolve("ftp://nas/pub", None).await);
    assert!(unsupported.is_none());
    let malformed = assert_ok!(resolver.resolve("::not a url::", None).await);
    assert!(malformed.is_none());

    for _ in 0..3 {
        let event = stream.recv().await.expect("failure event should be emitted");
        assert!(matches!(event, HubEvent::ResolutionFailed { .. }));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_resolution_creates_one_drive() {
    let provider = MockProvider::new(&["media"]).with_delay(Duration::from_millis(20));
    let (resolver, _) = resolver(&provider);
    let resolver = Arc::new(resolver);

    let mut tasks = Vec::new();
    for index in 0..8 {
        let resolver = resolver.clone();
        tasks.push(tokio::spawn(async move {
            resolver
                .resolve(&format!("mock://nas/media/{index}.mp4"), None)
                .await
        }));
    }

    let mut drives = Vec::new();
    for task in tasks {
        let drive = task.await.unwrap().unwrap().expect("drive should resolve");
        drives.push(drive);
    }

    assert_eq!(provider.discover_calls(), 1);
    assert_eq!(resolver.registry().len().await, 1);
    assert!(drives.iter().all(|drive| Arc::ptr_eq(drive, &drives[0])));
}

#[tokio::test]
async fn test_resolution_events() {
    let provider = MockProvider::new(&["media"]);
    let (resolver, events) = resolver(&provider);
    let mut stream = events.subscribe();

    resolver.resolve("mock://nas/media/a.mp4", None).await.unwrap();
    resolver.resolve("mock://nas/media/b.mp4", None).await.unwrap();

    let HubEvent::DriveRegistered {
        drive_id,
        base_url,
        share,
    } = stream.recv().await.unwrap()
    else {
        panic!("first event should be DriveRegistered");
    };
    assert_eq!(base_url, "mock://nas");
    assert_eq!(share.as_deref(), Some("media"));

    assert!(matches!(
        stream.recv().await.unwrap(),
        HubEvent::DriveResolved { cached: false, drive_id: id, .. } if id == drive_id
    ));
    assert!(matches!(
        stream.recv().await.unwrap(),
        HubEvent::DriveResolved { cached: true, drive_id: id, .. } if id == drive_id
    ));
}

#[tokio::test]
async fn test_unregister_forces_rediscovery() {
    let provider = MockProvider::new(&["media"]);
    let hub = mock_hub(&provider);
    let mut stream = hub.subscribe_events();

    hub.resolve("mock://nas/media", None).await.unwrap();
    let drives = hub.drives().await;
    assert_eq!(drives.len(), 1);
    assert_eq!(drives[0].scheme, "mock");

    let removed = assert_ok!(hub.unregister(&drives[0].id).await);
    assert_eq!(removed.id, drives[0].id);
    assert!(hub.drives().await.is_empty());

    hub.resolve("mock://nas/media", None).await.unwrap();
    assert_eq!(provider.discover_calls(), 2);

    let mut unregistered = 0;
    while let Ok(event) = stream.try_recv() {
        if matches!(event, HubEvent::DriveUnregistered { .. }) {
            unregistered += 1;
        }
    }
    assert_eq!(unregistered, 1);
}

#[tokio::test]
async fn test_hub_listing_sorts_and_hides() {
    let provider = MockProvider::new(&["media"]);
    let hub = mock_hub(&provider);

    let entries = assert_ok!(hub.list_directory("mock://nas/media", hub.listing_defaults()).await);
    let names: Vec<&str> = entries.iter().map(|entry| entry.name()).collect();
    assert_eq!(names, vec!["dirA", "file2.mp4", "file10.mp4"]);

    let options = ListingOptions {
        sort: SortType::Size,
        ascending: false,
        directories_first: false,
        show_hidden: true,
    };
    let entries = assert_ok!(hub.list_directory("mock://nas/media", options).await);
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].name(), "file10.mp4");

    let err = assert_err!(hub.list_directory("mock://nas/media/x.mp4", options).await);
    assert!(matches!(err, HubError::NotADirectory(path) if path == "/media/x.mp4"));
}

#[tokio::test]
async fn test_hub_search_translates_resource_keys() {
    let provider = MockProvider::new(&["media"]);
    let hub = mock_hub(&provider);

    let large = Predicate::comparison("fileSize", ComparisonOp::Greater, 100);
    let found = assert_ok!(hub.search("mock://nas/media", &large, hub.listing_defaults()).await);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "file10.mp4");

    let query: Predicate = serde_json::from_value(serde_json::json!({
        "and": [
            {"key": "fileResourceType", "op": "==", "value": "regular"},
            {"key": "name", "op": "endsWith", "value": ".MP4", "caseInsensitive": true},
            {"not": [{"key": "contentModificationDate", "op": ">=", "value": "2024-01-03"}]}
        ]
    }))
    .expect("predicate should deserialize");
    let found = assert_ok!(hub.search("mock://nas/media", &query, hub.listing_defaults()).await);
    let names: Vec<&str> = found.iter().map(|entry| entry.name()).collect();
    assert_eq!(names, vec!["file2.mp4"]);

    let broken = Predicate::Compound {
        kind: remote_drive_core::CompoundKind::Not,
        operands: Vec::new(),
    };
    let err = assert_err!(hub.search("mock://nas/media", &broken, hub.listing_defaults()).await);
    assert!(matches!(err, HubError::Domain(_)));
}

#[tokio::test]
async fn test_hub_forwards_relative_paths() {
    let provider = MockProvider::new(&["media"]);
    let hub = mock_hub(&provider);

    let bytes = assert_ok!(hub.read_bytes("mock://nas/media/a%20b.mp4").await);
    assert_eq!(bytes, b"/media/a b.mp4");

    let handle = assert_ok!(hub.playback_handle("mock://nas/media/a.mp4").await)
        .expect("handle should be produced");
    assert_eq!(
        handle.options.get("relative_path").map(String::as_str),
        Some("/media/a.mp4")
    );
    assert!(assert_ok!(hub.playback_handle("mock://nas/media/cover.jpg").await).is_none());

    assert_ok!(hub.mkdir("mock://nas/media/new").await);
    let err = assert_err!(hub.remove("mock://nas/media/a.mp4").await);
    assert!(matches!(err, HubError::PermissionDenied(_)));
}

#[test]
fn test_sync_bridge_from_blocking_caller() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();
    let provider = MockProvider::new(&["media"]);
    let hub = mock_hub(&provider);
    let bridge = hub.sync_bridge(runtime.handle().clone());
    assert_eq!(bridge.timeout(), Duration::from_secs(30));

    let handle = bridge
        .play_by_url("mock://nas/media/movie.mp4")
        .expect("bridge should produce a handle");
    assert_eq!(handle.source.as_str(), "mock://nas/media/movie.mp4");

    assert!(bridge.play_by_url("mock://nas/media/cover.jpg").is_none());
    assert!(bridge.play_by_url("gopher://nowhere/x.mp4").is_none());
    assert_eq!(provider.discover_calls(), 1);
}

fn local_fixture() -> TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("media/series")).unwrap();
    std::fs::create_dir_all(root.join("media/.trash")).unwrap();
    std::fs::write(root.join("media/episode 10.mkv"), vec![0u8; 300]).unwrap();
    std::fs::write(root.join("media/episode 9.mkv"), vec![0u8; 30]).unwrap();
    dir
}

fn local_hub(root: &Path) -> DriveHub {
    let config = HubConfig::from_str(&format!(
        "[[local_roots]]\nname = \"nas\"\npath = {:?}\n\n[http]\nenabled = false\n",
        root.display().to_string()
    ))
    .expect("config should parse");
    DriveHub::new(config).expect("hub should initialize")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_local_hub_end_to_end() {
    let dir = local_fixture();
    let root = dir.path();
    let hub = local_hub(root);

    let shares = assert_ok!(hub.list_shares("local://nas/media").await);
    assert_eq!(shares, vec!["media".to_string()]);

    let entries = assert_ok!(hub.list_directory("local://nas/media", hub.listing_defaults()).await);
    let names: Vec<&str> = entries.iter().map(|entry| entry.name()).collect();
    assert_eq!(names, vec!["series", "episode 9.mkv", "episode 10.mkv"]);

    let big = Predicate::comparison("fileSize", ComparisonOp::GreaterOrEqual, 100);
    let found = assert_ok!(hub.search("local://nas/media", &big, hub.listing_defaults()).await);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "episode 10.mkv");

    let bytes = assert_ok!(hub.read_bytes("local://nas/media/episode%209.mkv").await);
    assert_eq!(bytes.len(), 30);

    assert_ok!(hub.mkdir("local://nas/media/specials").await);
    assert!(root.join("media/specials").is_dir());
    assert_ok!(hub.remove("local://nas/media/specials").await);
    assert!(!root.join("media/specials").exists());

    let handle = assert_ok!(hub.playback_handle("local://nas/media/episode%2010.mkv").await)
        .expect("local file should be playable");
    assert_eq!(handle.source.scheme(), "file");

    let bridge = hub.sync_bridge(tokio::runtime::Handle::current());
    let blocking = tokio::task::spawn_blocking(move || {
        bridge.play_by_url("local://nas/media/episode%209.mkv")
    })
    .await
    .unwrap();
    assert!(blocking.is_some());

    assert_eq!(hub.drives().await.len(), 1);
}

#[tokio::test]
async fn test_local_hub_stays_inside_configured_root() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(dir.path().join("SECRET.txt"), b"secret").unwrap();
    let hub = local_hub(&root);

    let listing = hub
        .list_directory("local://nas/%2E%2E%2F", hub.listing_defaults())
        .await;
    if let Ok(entries) = &listing {
        assert!(entries.iter().all(|entry| entry.name() != "SECRET.txt"));
    }
    assert_err!(hub.read_bytes("local://nas/%2E%2E%2FSECRET.txt").await);
    assert_err!(hub.read_bytes("local://nas/../SECRET.txt").await);

    let escaped = hub
        .drives()
        .await
        .into_iter()
        .filter_map(|info| info.share)
        .any(|share| share.contains(".."));
    assert!(!escaped);
}
