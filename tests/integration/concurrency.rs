//! Single-flight retrieval, the parallelism bound, and cancellation.

use kustgraph_cli::builder::{BuildOptions, CancellationToken, GraphBuilder};
use kustgraph_cli::core::{KustgraphError, NodeIdentity, NodeKind, RemoteLocator};
use kustgraph_cli::parser::YamlParser;
use kustgraph_cli::test_utils::MemoryFetcher;
use std::sync::Arc;
use std::time::Duration;

fn id(path: &str) -> NodeIdentity {
    NodeIdentity::local(path)
}

/// `count` overlays `/apps/o<i>` that all extend `/apps/shared`.
fn fan_in(count: usize) -> (MemoryFetcher, Vec<NodeIdentity>) {
    let mut fetcher = MemoryFetcher::new()
        .with_file("/apps/shared/kustomization.yaml", "resources:\n  - cm.yaml\n")
        .with_file("/apps/shared/cm.yaml", "kind: ConfigMap\nmetadata:\n  name: shared\n");
    let mut roots = Vec::new();
    for i in 0..count {
        fetcher = fetcher.with_file(
            &format!("/apps/o{i}/kustomization.yaml"),
            "bases:\n  - ../shared\nresources:\n  - ../shared/cm.yaml\n",
        );
        roots.push(id(&format!("/apps/o{i}")));
    }
    (fetcher, roots)
}

#[tokio::test]
async fn test_shared_target_is_fetched_once() {
    let (fetcher, roots) = fan_in(24);
    let fetcher = Arc::new(fetcher.with_delay(Duration::from_millis(5)));
    let builder = GraphBuilder::new(fetcher.clone(), Arc::new(YamlParser), BuildOptions::default());

    let graph = builder.build(&roots).await.unwrap();

    assert_eq!(graph.node_count(), 26);
    assert_eq!(fetcher.fetch_count(&id("/apps/shared/kustomization.yaml")), 1);
    assert_eq!(fetcher.fetch_count(&id("/apps/shared/cm.yaml")), 1);
    assert_eq!(graph.incoming_edges(&id("/apps/shared")).len(), 24);
    assert_eq!(graph.incoming_edges(&id("/apps/shared/cm.yaml")).len(), 25);
}

#[tokio::test]
async fn test_parallelism_is_bounded() {
    let (fetcher, roots) = fan_in(16);
    let fetcher = Arc::new(fetcher.with_delay(Duration::from_millis(5)));
    let options = BuildOptions::default().with_max_parallel(3);
    let builder = GraphBuilder::new(fetcher.clone(), Arc::new(YamlParser), options);

    builder.build(&roots).await.unwrap();

    assert!(fetcher.max_in_flight() <= 3, "saw {} concurrent fetches", fetcher.max_in_flight());
}

#[tokio::test]
async fn test_concurrent_builds_agree() {
    let (fetcher, roots) = fan_in(8);
    let builder = Arc::new(GraphBuilder::new(
        Arc::new(fetcher.with_delay(Duration::from_millis(1))),
        Arc::new(YamlParser),
        BuildOptions::default(),
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let builder = builder.clone();
        let roots = roots.clone();
        handles.push(tokio::spawn(async move { builder.build(&roots).await }));
    }

    let mut orders = Vec::new();
    for handle in handles {
        let graph = handle.await.unwrap().unwrap();
        orders.push(graph.nodes().map(|n| n.identity.clone()).collect::<Vec<_>>());
    }
    assert!(orders.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_cancel_before_build() {
    let (fetcher, roots) = fan_in(2);
    let token = CancellationToken::new();
    token.cancel();
    let builder = GraphBuilder::new(
        Arc::new(fetcher),
        Arc::new(YamlParser),
        BuildOptions::default().with_cancel(token),
    );

    let err = builder.build(&roots).await.unwrap_err();
    assert!(matches!(err, KustgraphError::BuildCancelled { .. }));
}

#[tokio::test]
async fn test_cancel_during_build() {
    let (fetcher, roots) = fan_in(4);
    let token = CancellationToken::new();
    let builder = GraphBuilder::new(
        Arc::new(fetcher.with_delay(Duration::from_millis(200))),
        Arc::new(YamlParser),
        BuildOptions::default().with_cancel(token.clone()),
    );

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let err = builder.build(&roots).await.unwrap_err();
    canceller.await.unwrap();

    match err {
        KustgraphError::BuildCancelled { reason } => assert_eq!(reason, "cancelled by caller"),
        other => panic!("expected cancellation, got {other}"),
    }
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let (fetcher, roots) = fan_in(4);
    let builder = GraphBuilder::new(
        Arc::new(fetcher.with_delay(Duration::from_millis(200))),
        Arc::new(YamlParser),
        BuildOptions::default().with_timeout(Duration::from_millis(20)),
    );

    let err = builder.build(&roots).await.unwrap_err();
    match err {
        KustgraphError::BuildCancelled { reason } => assert_eq!(reason, "deadline exceeded"),
        other => panic!("expected cancellation, got {other}"),
    }
}

#[tokio::test]
async fn test_remote_base_is_loaded_through_fetcher() {
    let fetcher = MemoryFetcher::new()
        .with_file(
            "/apps/prod/kustomization.yaml",
            "bases:\n  - https://github.com/acme/platform//base?ref=v1\n",
        )
        .with_remote_file(
            "https://github.com/acme/platform",
            "v1",
            "base/kustomization.yaml",
            "resources:\n  - deploy.yaml\n",
        )
        .with_remote_file(
            "https://github.com/acme/platform",
            "v1",
            "base/deploy.yaml",
            "kind: Deployment\nmetadata:\n  name: platform\n",
        );
    let builder = GraphBuilder::new(Arc::new(fetcher), Arc::new(YamlParser), BuildOptions::default());

    let graph = builder.build(&[id("/apps/prod")]).await.unwrap();

    let remote = |path: &str| {
        NodeIdentity::Remote(RemoteLocator {
            repository: "https://github.com/acme/platform".to_string(),
            revision: "v1".to_string(),
            path: path.to_string(),
        })
    };
    assert_eq!(graph.get_node(&remote("base")).unwrap().kind, NodeKind::Overlay);
    assert_eq!(
        graph.get_node(&remote("base/deploy.yaml")).unwrap().kind,
        NodeKind::ResourceFile
    );
}
