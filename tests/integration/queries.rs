//! Queries over graphs built from disk.

use crate::common::TestApps;
use kustgraph_cli::core::{KustgraphError, ReferenceType};
use kustgraph_cli::query::QueryEngine;
use kustgraph_cli::test_utils::KustomizationFixture;

#[tokio::test]
async fn test_root_overlays() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let graph = apps.build().await.unwrap();
    let roots = QueryEngine::new(&graph).root_overlays();

    assert_eq!(
        roots,
        vec![apps.id("apps/web/overlays/prod"), apps.id("apps/web/overlays/staging")]
    );
}

#[tokio::test]
async fn test_affected_roots_of_shared_file() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let graph = apps.build().await.unwrap();
    let engine = QueryEngine::new(&graph);

    assert_eq!(
        engine.affected_roots(&apps.id("apps/web/base/service.yaml")).unwrap(),
        vec![apps.id("apps/web/overlays/prod"), apps.id("apps/web/overlays/staging")]
    );
    assert_eq!(
        engine
            .affected_roots(&apps.id("apps/web/overlays/prod/replicas.yaml"))
            .unwrap(),
        vec![apps.id("apps/web/overlays/prod")]
    );
    // a root is affected by its own changes
    assert_eq!(
        engine.affected_roots(&apps.id("apps/web/overlays/staging")).unwrap(),
        vec![apps.id("apps/web/overlays/staging")]
    );
}

#[tokio::test]
async fn test_unknown_node_suggests_close_match() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let graph = apps.build().await.unwrap();
    let err = QueryEngine::new(&graph)
        .affected_roots(&apps.id("apps/web/base/deploymnt.yaml"))
        .unwrap_err();

    match err {
        KustgraphError::UnknownNode { suggestions, .. } => {
            let wanted = apps.id("apps/web/base/deployment.yaml").to_string();
            assert!(suggestions.contains(&wanted), "suggestions: {suggestions:?}");
        }
        other => panic!("expected UnknownNode, got {other}"),
    }
}

#[tokio::test]
async fn test_overlay_files_include_inherited_files() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let graph = apps.build().await.unwrap();
    let files = QueryEngine::new(&graph)
        .overlay_files(&apps.id("apps/web/overlays/prod"))
        .unwrap();

    let mut expected = vec![
        apps.id("apps/web/base/deployment.yaml"),
        apps.id("apps/web/base/kustomization.yaml"),
        apps.id("apps/web/base/service.yaml"),
        apps.id("apps/web/overlays/prod/kustomization.yaml"),
        apps.id("apps/web/overlays/prod/replicas.yaml"),
    ];
    expected.sort();
    assert_eq!(files, expected);
}

#[tokio::test]
async fn test_overlay_files_rejects_leaf() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let graph = apps.build().await.unwrap();
    let err = QueryEngine::new(&graph)
        .overlay_files(&apps.id("apps/web/base/service.yaml"))
        .unwrap_err();
    assert!(matches!(err, KustgraphError::NotAnOverlay { .. }));
}

#[tokio::test]
async fn test_application_order_layers_components() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/core", KustomizationFixture::new()).unwrap();
    apps.kustomization("apps/base", KustomizationFixture::new().base("../core")).unwrap();
    apps.kustomization("apps/monitoring", KustomizationFixture::new()).unwrap();
    apps.kustomization(
        "apps/prod",
        KustomizationFixture::new().base("../base").component("../monitoring").resource("../core"),
    )
    .unwrap();

    let graph = apps.build().await.unwrap();
    let order = QueryEngine::new(&graph)
        .application_order(&apps.id("apps/prod"))
        .unwrap();

    assert_eq!(
        order,
        vec![
            apps.id("apps/core"),
            apps.id("apps/base"),
            apps.id("apps/monitoring"),
            apps.id("apps/prod"),
        ]
    );
}

#[tokio::test]
async fn test_descendants_by_type() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let graph = apps.build().await.unwrap();
    let engine = QueryEngine::new(&graph);
    let prod = apps.id("apps/web/overlays/prod");

    let structural = engine.descendants(&prod, &ReferenceType::STRUCTURAL).unwrap();
    assert_eq!(structural.direct, vec![apps.id("apps/web/base")]);
    assert!(structural.transitive.is_empty());

    let all = engine.descendants(&prod, &ReferenceType::ALL).unwrap();
    assert_eq!(
        all.direct,
        vec![apps.id("apps/web/base"), apps.id("apps/web/overlays/prod/replicas.yaml")]
    );
    assert_eq!(
        all.transitive,
        vec![apps.id("apps/web/base/deployment.yaml"), apps.id("apps/web/base/service.yaml")]
    );
}

#[tokio::test]
async fn test_impact_spans_all_edge_types() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let graph = apps.build().await.unwrap();
    let impact = QueryEngine::new(&graph)
        .impact(&apps.id("apps/web/base/deployment.yaml"))
        .unwrap();

    assert_eq!(
        impact,
        vec![
            apps.id("apps/web/base"),
            apps.id("apps/web/overlays/prod"),
            apps.id("apps/web/overlays/staging"),
        ]
    );
}
