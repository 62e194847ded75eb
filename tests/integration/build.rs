//! Graph construction over overlay trees on disk.

use crate::common::TestApps;
use kustgraph_cli::core::{KustgraphError, NodeKind, ReferenceType};
use kustgraph_cli::query::QueryEngine;
use kustgraph_cli::test_utils::KustomizationFixture;

#[tokio::test]
async fn test_base_with_resource() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/r", KustomizationFixture::new().base("../b")).unwrap();
    apps.kustomization("apps/b", KustomizationFixture::new().resource("f.yaml")).unwrap();
    apps.manifest("apps/b/f.yaml", "ConfigMap").unwrap();

    let graph = apps.build_from(&[apps.id("apps/r")]).await.unwrap();

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    let r_edges = graph.outgoing_edges(&apps.id("apps/r"));
    assert_eq!(r_edges.len(), 1);
    assert_eq!(r_edges[0].target, apps.id("apps/b"));
    assert_eq!(r_edges[0].edge_type, ReferenceType::Base);
    let b_edges = graph.outgoing_edges(&apps.id("apps/b"));
    assert_eq!(b_edges[0].target, apps.id("apps/b/f.yaml"));
    assert_eq!(b_edges[0].edge_type, ReferenceType::Resource);

    let engine = QueryEngine::new(&graph);
    let users = engine
        .ancestors(&apps.id("apps/b/f.yaml"), &[ReferenceType::Resource])
        .unwrap();
    assert_eq!(users.direct, vec![apps.id("apps/b")]);
    assert!(users.transitive.is_empty());
    assert_eq!(
        engine.application_order(&apps.id("apps/r")).unwrap(),
        vec![apps.id("apps/b"), apps.id("apps/r")]
    );
}

#[tokio::test]
async fn test_shared_base_is_one_node() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/a", KustomizationFixture::new().base("../x")).unwrap();
    apps.kustomization("apps/b", KustomizationFixture::new().base("../x")).unwrap();
    apps.kustomization("apps/x", KustomizationFixture::new()).unwrap();

    let graph = apps.build_from(&[apps.id("apps/a"), apps.id("apps/b")]).await.unwrap();

    assert_eq!(graph.node_count(), 3);
    let incoming = graph.incoming_edges(&apps.id("apps/x"));
    let sources: Vec<_> = incoming.iter().map(|e| e.source.clone()).collect();
    assert_eq!(sources, vec![apps.id("apps/a"), apps.id("apps/b")]);
}

#[tokio::test]
async fn test_diamond_resource() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/left", KustomizationFixture::new().resource("../shared/cm.yaml"))
        .unwrap();
    apps.kustomization("apps/right", KustomizationFixture::new().resource("../shared/cm.yaml"))
        .unwrap();
    apps.kustomization("apps/top", KustomizationFixture::new().resource("../left").resource("../right"))
        .unwrap();
    apps.manifest("apps/shared/cm.yaml", "ConfigMap").unwrap();

    let graph = apps.build().await.unwrap();

    let shared = graph.get_node(&apps.id("apps/shared/cm.yaml")).unwrap();
    assert_eq!(shared.kind, NodeKind::ResourceFile);
    assert_eq!(graph.incoming_edges(&apps.id("apps/shared/cm.yaml")).len(), 2);

    let paths = QueryEngine::new(&graph)
        .paths_between(&apps.id("apps/top"), &apps.id("apps/shared/cm.yaml"))
        .unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0][1], apps.id("apps/left"));
    assert_eq!(paths[1][1], apps.id("apps/right"));
}

#[tokio::test]
async fn test_node_kinds_follow_declaration_field() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();

    let graph = apps.build().await.unwrap();

    let kind = |rel: &str| graph.get_node(&apps.id(rel)).unwrap().kind;
    assert_eq!(kind("apps/web/base"), NodeKind::Overlay);
    assert_eq!(kind("apps/web/base/deployment.yaml"), NodeKind::ResourceFile);
    assert_eq!(kind("apps/web/overlays/prod/replicas.yaml"), NodeKind::PatchFile);
    assert_eq!(kind("apps/web/overlays/staging/app.env"), NodeKind::GeneratorSpec);

    let base = graph.get_node(&apps.id("apps/web/base")).unwrap();
    assert_eq!(base.manifest, Some(apps.id("apps/web/base/kustomization.yaml")));
    let deployment = graph.get_node(&apps.id("apps/web/base/deployment.yaml")).unwrap();
    let resources = deployment.resources();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].kind.as_deref(), Some("Deployment"));
}

#[tokio::test]
async fn test_self_base_is_a_cycle() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/a", KustomizationFixture::new().base(".")).unwrap();

    let err = apps.build().await.unwrap_err();
    match err {
        KustgraphError::CycleDetected { cycle } => {
            assert_eq!(cycle, vec![apps.id("apps/a"), apps.id("apps/a")]);
        }
        other => panic!("expected a cycle, got {other}"),
    }
}

#[tokio::test]
async fn test_component_cycle_names_every_node() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/a", KustomizationFixture::new().base("../b")).unwrap();
    apps.kustomization("apps/b", KustomizationFixture::new().component("../c")).unwrap();
    apps.kustomization("apps/c", KustomizationFixture::new().base("../a")).unwrap();

    let err = apps.build_from(&[apps.id("apps/a")]).await.unwrap_err();
    match err {
        KustgraphError::CycleDetected { cycle } => assert_eq!(
            cycle,
            vec![apps.id("apps/a"), apps.id("apps/b"), apps.id("apps/c"), apps.id("apps/a")]
        ),
        other => panic!("expected a cycle, got {other}"),
    }
}

#[tokio::test]
async fn test_resource_loop_is_not_a_cycle() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/a", KustomizationFixture::new().resource("../b")).unwrap();
    apps.kustomization("apps/b", KustomizationFixture::new().resource("../a")).unwrap();

    let graph = apps.build_from(&[apps.id("apps/a")]).await.unwrap();
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 2);
}

#[tokio::test]
async fn test_missing_reference_names_declaring_node() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/prod", KustomizationFixture::new().base("../base")).unwrap();
    apps.kustomization("apps/base", KustomizationFixture::new().resource("missing.yaml"))
        .unwrap();

    let err = apps.build_from(&[apps.id("apps/prod")]).await.unwrap_err();
    match &err {
        KustgraphError::NodeNotFound {
            identity,
            reference,
            chain,
        } => {
            assert_eq!(identity, &apps.id("apps/base/missing.yaml"));
            assert_eq!(reference, "missing.yaml");
            assert_eq!(chain, &vec![apps.id("apps/prod"), apps.id("apps/base")]);
        }
        other => panic!("expected NodeNotFound, got {other}"),
    }
    assert!(err.to_string().contains("missing.yaml"));
}

#[tokio::test]
async fn test_directory_without_kustomization() {
    let apps = TestApps::new().unwrap();
    apps.kustomization("apps/prod", KustomizationFixture::new().base("../empty")).unwrap();
    std::fs::create_dir_all(apps.path("apps/empty")).unwrap();

    let err = apps.build_from(&[apps.id("apps/prod")]).await.unwrap_err();
    assert!(matches!(err, KustgraphError::NodeNotFound { reference, .. } if reference == "../empty"));

    apps.kustomization("apps/staging", KustomizationFixture::new().resource("../manifests")).unwrap();
    apps.manifest("apps/manifests/deployment.yaml", "Deployment").unwrap();
    let err = apps.build_from(&[apps.id("apps/staging")]).await.unwrap_err();
    assert!(matches!(err, KustgraphError::NodeNotFound { reference, .. } if reference == "../manifests"));
}

#[tokio::test]
async fn test_malformed_kustomization() {
    let apps = TestApps::new().unwrap();
    apps.raw_kustomization("apps/bad", "resources: deployment.yaml\n").unwrap();

    let err = apps.build().await.unwrap_err();
    match err {
        KustgraphError::NodeMalformed { identity, reason, .. } => {
            assert_eq!(identity, apps.id("apps/bad"));
            assert!(reason.contains("resources"), "reason: {reason}");
        }
        other => panic!("expected NodeMalformed, got {other}"),
    }
}

#[tokio::test]
async fn test_alternate_kustomization_names() {
    let apps = TestApps::new().unwrap();
    apps.write("apps/legacy/Kustomization", "resources:\n  - cm.yml\n").unwrap();
    apps.manifest("apps/legacy/cm.yml", "ConfigMap").unwrap();
    apps.write("apps/short/kustomization.yml", "bases:\n  - ../legacy\n").unwrap();

    let graph = apps.build().await.unwrap();
    assert_eq!(graph.node_count(), 3);
    assert_eq!(
        graph.get_node(&apps.id("apps/legacy")).unwrap().manifest,
        Some(apps.id("apps/legacy/Kustomization"))
    );
}

#[tokio::test]
async fn test_builds_are_deterministic() {
    let apps = TestApps::new().unwrap();
    apps.web_app().unwrap();
    apps.kustomization(
        "apps/api",
        KustomizationFixture::new().resource("../web/base").resource("api.yaml"),
    )
    .unwrap();
    apps.manifest("apps/api/api.yaml", "Deployment").unwrap();

    let first = apps.build().await.unwrap();
    let second = apps.build().await.unwrap();

    let nodes = |g: &kustgraph_cli::graph::Graph| g.nodes().map(|n| n.identity.clone()).collect::<Vec<_>>();
    assert_eq!(nodes(&first), nodes(&second));
    for node in first.nodes() {
        let a: Vec<_> = first.outgoing_edges(&node.identity).into_iter().cloned().collect();
        let b: Vec<_> = second.outgoing_edges(&node.identity).into_iter().cloned().collect();
        assert_eq!(a, b, "edge order differs for {}", node.identity);
    }
}

#[tokio::test]
async fn test_empty_apps_dir() {
    let apps = TestApps::new().unwrap();
    let graph = apps.build().await.unwrap();
    assert!(graph.is_empty());
}

#[tokio::test]
async fn test_missing_apps_dir() {
    let apps = TestApps::new().unwrap();
    let err = kustgraph_cli::discovery::discover_overlays(&apps.path("nope")).unwrap_err();
    assert!(matches!(err, KustgraphError::IoError(_)));
}
