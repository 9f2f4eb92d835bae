//! End-to-end scenarios from §8.

use uuid::Uuid;

use le_core::Version;
use le_plugin::{DependencyConfig, DependencyEdge, DependencyGraph, PluginKind, PluginMetadata, PluginRecord, ResolvedStatus, VersionPolicy};

fn versioned(name: &str, version: Version) -> PluginRecord {
    PluginRecord::new(PluginMetadata::new(name, version, PluginKind::Effect, Uuid::new_v4()))
}

#[test]
fn dependency_resolution_scenario() {
    let mut graph = DependencyGraph::new();
    graph.add(versioned("A", Version::new(1, 0, 0, 0)));
    graph.add(versioned("A", Version::new(1, 1, 0, 0)));
    let a_1_2_0 = graph.add(versioned("A", Version::new(1, 2, 0, 0)));

    let mut subject = versioned("S", Version::new(1, 0, 0, 0));
    subject.dependencies.push(DependencyEdge {
        target_name: "A".into(),
        min: Version::new(1, 0, 0, 0),
        max: Some(Version::new(1, 9, 9, 9)),
        required: true,
    });
    let subject_handle = graph.add(subject);

    let config = DependencyConfig {
        version_policy: VersionPolicy::Latest,
        ..DependencyConfig::default()
    };

    let results = graph.resolve(subject_handle, &config).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, ResolvedStatus::Resolved);
    assert_eq!(results[0].chosen, Some(Version::new(1, 2, 0, 0)));

    // Raise the range out of reach: Incompatible.
    let subject = graph.get_mut(subject_handle).unwrap();
    subject.dependencies[0].min = Version::new(2, 0, 0, 0);
    subject.dependencies[0].max = None;
    let results = graph.resolve(subject_handle, &config).unwrap();
    assert_eq!(results[0].status, ResolvedStatus::Incompatible);

    // Remove every version of A: Missing.
    for handle in graph.find_by_name("A") {
        graph.remove(handle);
    }
    let _ = a_1_2_0;
    let results = graph.resolve(subject_handle, &config).unwrap();
    assert_eq!(results[0].status, ResolvedStatus::Missing);
}

#[test]
fn cycle_detection_scenario() {
    let mut graph = DependencyGraph::new();

    let mut p1 = versioned("P1", Version::new(1, 0, 0, 0));
    p1.dependencies.push(DependencyEdge {
        target_name: "P2".into(),
        min: Version::new(1, 0, 0, 0),
        max: None,
        required: true,
    });
    let mut p2 = versioned("P2", Version::new(1, 0, 0, 0));
    p2.dependencies.push(DependencyEdge {
        target_name: "P1".into(),
        min: Version::new(1, 0, 0, 0),
        max: None,
        required: true,
    });
    graph.add(p1);
    graph.add(p2);

    let (has_cycle, _) = graph.check_circular();
    assert!(has_cycle);

    let results = graph.resolve_all(&DependencyConfig::default());
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.status == ResolvedStatus::Circular));

    let load_order = graph.load_order();
    let names: Vec<String> = load_order
        .order
        .iter()
        .map(|h| graph.get(*h).unwrap().name().to_string())
        .collect();
    assert!(!names.contains(&"P1".to_string()));
    assert!(!names.contains(&"P2".to_string()));
    assert_eq!(load_order.circular.len(), 2);
}
