//! Dependency graph (C8, §4.8): best-match version resolution, three-color
//! DFS cycle detection, and Kahn's-algorithm load ordering.
//!
//! Nodes are plugin records held in an `Arena` (design note 2); edges are
//! `(target_name, range, required)` triples carried on the dependent
//! record, not duplicated here. Grounded on `rf-realtime/graph.rs`'s
//! `would_create_cycle` (upgraded from a single-target reachability probe to
//! a full three-color DFS, since §4.8 asks for cycle *membership*, not just
//! a yes/no answer) and `update_processing_order` (upgraded from `Vec::pop`
//! arbitrary-order Kahn's algorithm to the ascending-name tie-break §4.8
//! requires).

use std::collections::{HashMap, HashSet};

use le_core::Version;
use uuid::Uuid;

use crate::arena::{Arena, Handle};
use crate::config::{DependencyConfig, VersionPolicy};
use crate::record::{DependencyEdge, PluginRecord};

#[derive(Clone, Copy, PartialEq, Eq)]
enum DfsColor {
    Gray,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedStatus {
    Resolved,
    Missing,
    Incompatible,
    Circular,
    Unresolved,
}

impl ResolvedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedStatus::Resolved => "resolved",
            ResolvedStatus::Missing => "missing",
            ResolvedStatus::Incompatible => "incompatible",
            ResolvedStatus::Circular => "circular",
            ResolvedStatus::Unresolved => "unresolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "resolved" => ResolvedStatus::Resolved,
            "missing" => ResolvedStatus::Missing,
            "incompatible" => ResolvedStatus::Incompatible,
            "circular" => ResolvedStatus::Circular,
            "unresolved" => ResolvedStatus::Unresolved,
            _ => return None,
        })
    }
}

/// One edge's resolution outcome (C10's in-memory counterpart; `le-plugin::cache`
/// serializes a `Vec<ResolvedResult>` per subject).
#[derive(Debug, Clone)]
pub struct ResolvedResult {
    pub subject: String,
    pub dependency: String,
    pub status: ResolvedStatus,
    pub min: Version,
    pub max: Option<Version>,
    pub chosen: Option<Version>,
    pub error: Option<String>,
}

/// Result of a full topological sort: the acyclic load order plus whichever
/// nodes were excluded because they participate in a cycle.
pub struct LoadOrder {
    pub order: Vec<Handle<PluginRecord>>,
    pub circular: Vec<Handle<PluginRecord>>,
}

pub struct DependencyGraph {
    arena: Arena<PluginRecord>,
    by_name: HashMap<String, Vec<Handle<PluginRecord>>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            by_name: HashMap::new(),
        }
    }

    /// Idempotent: a record already present by UUID is not re-added.
    pub fn add(&mut self, record: PluginRecord) -> Handle<PluginRecord> {
        if let Some(existing) = self.find_by_uuid(record.uuid()) {
            return existing;
        }
        let name = record.metadata.name.clone();
        let handle = self.arena.insert(record);
        self.by_name.entry(name).or_default().push(handle);
        handle
    }

    /// Drops the node and every edge pointing to it. Edges are stored by
    /// name on the *source* record, so "every edge pointing to it" is
    /// satisfied structurally: once the name's last version is gone,
    /// resolution of edges naming it reports `Missing` without any
    /// cascading rewrite of other records.
    pub fn remove(&mut self, handle: Handle<PluginRecord>) -> Option<PluginRecord> {
        let removed = self.arena.remove(handle)?;
        if let Some(versions) = self.by_name.get_mut(&removed.metadata.name) {
            versions.retain(|h| *h != handle);
            if versions.is_empty() {
                self.by_name.remove(&removed.metadata.name);
            }
        }
        Some(removed)
    }

    pub fn get(&self, handle: Handle<PluginRecord>) -> Option<&PluginRecord> {
        self.arena.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle<PluginRecord>) -> Option<&mut PluginRecord> {
        self.arena.get_mut(handle)
    }

    pub fn find_by_uuid(&self, uuid: Uuid) -> Option<Handle<PluginRecord>> {
        self.arena
            .iter()
            .find(|(_, rec)| rec.uuid() == uuid)
            .map(|(h, _)| h)
    }

    pub fn find_by_name(&self, name: &str) -> Vec<Handle<PluginRecord>> {
        self.by_name.get(name).cloned().unwrap_or_default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (Handle<PluginRecord>, &PluginRecord)> {
        self.arena.iter()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    fn eligible_candidates(&self, target_name: &str, config: &DependencyConfig) -> Vec<(Handle<PluginRecord>, &PluginRecord)> {
        let exclude_prerelease = matches!(config.version_policy, VersionPolicy::LatestStable) || !config.allow_prerelease;
        self.by_name
            .get(target_name)
            .into_iter()
            .flatten()
            .filter_map(|&h| {
                let rec = self.arena.get(h)?;
                if exclude_prerelease && rec.metadata.prerelease {
                    None
                } else {
                    Some((h, rec))
                }
            })
            .collect()
    }

    /// Best match = highest (or first, under `Compatible`) version of
    /// `edge.target_name` satisfying `edge`'s range and the active policy.
    fn best_match(&self, edge: &DependencyEdge, config: &DependencyConfig) -> Option<(Handle<PluginRecord>, Version)> {
        let candidates = self.eligible_candidates(&edge.target_name, config);
        match config.version_policy {
            VersionPolicy::Strict => {
                let pinned = edge.max.filter(|max| *max == edge.min)?;
                candidates
                    .into_iter()
                    .find(|(_, rec)| rec.metadata.version == pinned)
                    .map(|(h, rec)| (h, rec.metadata.version))
            }
            VersionPolicy::Compatible => candidates
                .into_iter()
                .find(|(_, rec)| rec.metadata.version.satisfies(&edge.min, edge.max.as_ref()))
                .map(|(h, rec)| (h, rec.metadata.version)),
            VersionPolicy::Latest | VersionPolicy::LatestStable => candidates
                .into_iter()
                .filter(|(_, rec)| rec.metadata.version.satisfies(&edge.min, edge.max.as_ref()))
                .max_by_key(|(_, rec)| rec.metadata.version)
                .map(|(h, rec)| (h, rec.metadata.version)),
        }
    }

    fn resolve_record(&self, record: &PluginRecord, cyclic: &HashSet<String>, config: &DependencyConfig) -> Vec<ResolvedResult> {
        record
            .dependencies
            .iter()
            .map(|edge| {
                if cyclic.contains(&record.metadata.name) && cyclic.contains(&edge.target_name) {
                    return ResolvedResult {
                        subject: record.metadata.name.clone(),
                        dependency: edge.target_name.clone(),
                        status: ResolvedStatus::Circular,
                        min: edge.min,
                        max: edge.max,
                        chosen: None,
                        error: Some("target is on the resolution stack for this subject".into()),
                    };
                }
                let has_any_version = self.by_name.get(&edge.target_name).is_some_and(|v| !v.is_empty());
                if !has_any_version {
                    return ResolvedResult {
                        subject: record.metadata.name.clone(),
                        dependency: edge.target_name.clone(),
                        status: ResolvedStatus::Missing,
                        min: edge.min,
                        max: edge.max,
                        chosen: None,
                        error: None,
                    };
                }
                match self.best_match(edge, config) {
                    Some((_, version)) => ResolvedResult {
                        subject: record.metadata.name.clone(),
                        dependency: edge.target_name.clone(),
                        status: ResolvedStatus::Resolved,
                        min: edge.min,
                        max: edge.max,
                        chosen: Some(version),
                        error: None,
                    },
                    None => ResolvedResult {
                        subject: record.metadata.name.clone(),
                        dependency: edge.target_name.clone(),
                        status: ResolvedStatus::Incompatible,
                        min: edge.min,
                        max: edge.max,
                        chosen: None,
                        error: None,
                    },
                }
            })
            .collect()
    }

    /// Resolve every outgoing edge of `handle`'s record.
    pub fn resolve(&self, handle: Handle<PluginRecord>, config: &DependencyConfig) -> Option<Vec<ResolvedResult>> {
        let record = self.get(handle)?;
        let (_, cyclic) = self.check_circular();
        Some(self.resolve_record(record, &cyclic, config))
    }

    /// Resolve every outgoing edge of every node in the graph.
    pub fn resolve_all(&self, config: &DependencyConfig) -> Vec<ResolvedResult> {
        let (_, cyclic) = self.check_circular();
        self.nodes()
            .flat_map(|(_, record)| self.resolve_record(record, &cyclic, config))
            .collect()
    }

    /// Standard three-color DFS from every unvisited node, over required
    /// edges only. Returns whether any cycle exists and the set of node
    /// names participating in at least one.
    pub fn check_circular(&self) -> (bool, HashSet<String>) {
        let mut color: HashMap<String, DfsColor> = HashMap::new();
        let mut in_cycle: HashSet<String> = HashSet::new();
        let mut found = false;
        let names: Vec<String> = self.by_name.keys().cloned().collect();

        for start in &names {
            if !color.contains_key(start) {
                let mut stack = Vec::new();
                self.dfs_visit(start, &mut color, &mut in_cycle, &mut found, &mut stack);
            }
        }
        (found, in_cycle)
    }

    fn dfs_visit(
        &self,
        name: &str,
        color: &mut HashMap<String, DfsColor>,
        in_cycle: &mut HashSet<String>,
        found: &mut bool,
        stack: &mut Vec<String>,
    ) {
        color.insert(name.to_string(), DfsColor::Gray);
        stack.push(name.to_string());

        if let Some(representative) = self.by_name.get(name).and_then(|hs| hs.first()) {
            if let Some(record) = self.arena.get(*representative) {
                for edge in record.dependencies.iter().filter(|e| e.required) {
                    match color.get(edge.target_name.as_str()) {
                        None => self.dfs_visit(&edge.target_name, color, in_cycle, found, stack),
                        Some(DfsColor::Gray) => {
                            *found = true;
                            if let Some(pos) = stack.iter().position(|n| n == &edge.target_name) {
                                for n in &stack[pos..] {
                                    in_cycle.insert(n.clone());
                                }
                            }
                        }
                        Some(DfsColor::Black) => {}
                    }
                }
            }
        }

        stack.pop();
        color.insert(name.to_string(), DfsColor::Black);
    }

    /// Topological sort over required edges, tie-broken by ascending plugin
    /// name (§4.8). Nodes participating in a cycle are excluded from `order`
    /// and reported in `circular` instead.
    pub fn load_order(&self) -> LoadOrder {
        let (_, cyclic_names) = self.check_circular();

        let acyclic: Vec<Handle<PluginRecord>> = self
            .arena
            .iter()
            .filter(|(_, rec)| !cyclic_names.contains(&rec.metadata.name))
            .map(|(h, _)| h)
            .collect();
        let circular: Vec<Handle<PluginRecord>> = self
            .arena
            .iter()
            .filter(|(_, rec)| cyclic_names.contains(&rec.metadata.name))
            .map(|(h, _)| h)
            .collect();

        let mut in_degree: HashMap<Handle<PluginRecord>, usize> =
            acyclic.iter().map(|&h| (h, 0)).collect();
        for &h in &acyclic {
            let rec = self.get(h).expect("handle from this graph's arena");
            let mut targets: HashSet<&str> = HashSet::new();
            for e in rec.dependencies.iter().filter(|e| e.required && !cyclic_names.contains(&e.target_name)) {
                if self.by_name.get(&e.target_name).is_some_and(|hs| hs.iter().any(|t| acyclic.contains(t))) {
                    targets.insert(e.target_name.as_str());
                }
            }
            in_degree.insert(h, targets.len());
        }

        let mut remaining: HashSet<Handle<PluginRecord>> = acyclic.iter().copied().collect();
        let mut order = Vec::with_capacity(acyclic.len());

        while !remaining.is_empty() {
            let mut ready: Vec<Handle<PluginRecord>> = remaining
                .iter()
                .copied()
                .filter(|h| in_degree.get(h).copied().unwrap_or(0) == 0)
                .collect();
            if ready.is_empty() {
                break; // shouldn't happen once cycle members are excluded
            }
            ready.sort_by(|a, b| {
                self.get(*a)
                    .expect("handle from this graph's arena")
                    .metadata
                    .name
                    .cmp(&self.get(*b).expect("handle from this graph's arena").metadata.name)
            });
            let next = ready[0];
            order.push(next);
            remaining.remove(&next);
            let next_name = self.get(next).expect("handle from this graph's arena").metadata.name.clone();

            for &h in &remaining {
                let dep_rec = self.get(h).expect("handle from this graph's arena");
                if dep_rec
                    .dependencies
                    .iter()
                    .any(|e| e.required && e.target_name == next_name)
                {
                    if let Some(d) = in_degree.get_mut(&h) {
                        *d = d.saturating_sub(1);
                    }
                }
            }
        }

        LoadOrder { order, circular }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PluginKind, PluginMetadata};
    use uuid::Uuid;

    fn record(name: &str, version: Version) -> PluginRecord {
        PluginRecord::new(PluginMetadata::new(name, version, PluginKind::Effect, Uuid::new_v4()))
    }

    fn edge(target: &str, min: Version, max: Option<Version>, required: bool) -> DependencyEdge {
        DependencyEdge {
            target_name: target.to_string(),
            min,
            max,
            required,
        }
    }

    #[test]
    fn resolves_best_match_among_versions() {
        let mut g = DependencyGraph::new();
        g.add(record("A", Version::new(1, 0, 0, 0)));
        g.add(record("A", Version::new(1, 1, 0, 0)));
        g.add(record("A", Version::new(1, 2, 0, 0)));
        let mut subject = record("S", Version::new(1, 0, 0, 0));
        subject.dependencies.push(edge(
            "A",
            Version::new(1, 0, 0, 0),
            Some(Version::new(1, 9, 9, 9)),
            true,
        ));
        let h = g.add(subject);

        let config = DependencyConfig {
            version_policy: VersionPolicy::Latest,
            ..DependencyConfig::default()
        };
        let results = g.resolve(h, &config).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ResolvedStatus::Resolved);
        assert_eq!(results[0].chosen, Some(Version::new(1, 2, 0, 0)));
    }

    #[test]
    fn out_of_range_is_incompatible() {
        let mut g = DependencyGraph::new();
        g.add(record("A", Version::new(1, 2, 0, 0)));
        let mut subject = record("S", Version::new(1, 0, 0, 0));
        subject.dependencies.push(edge(
            "A",
            Version::new(2, 0, 0, 0),
            None,
            true,
        ));
        let h = g.add(subject);

        let results = g.resolve(h, &DependencyConfig::default()).unwrap();
        assert_eq!(results[0].status, ResolvedStatus::Incompatible);
    }

    #[test]
    fn missing_dependency_is_reported() {
        let mut g = DependencyGraph::new();
        let mut subject = record("S", Version::new(1, 0, 0, 0));
        subject
            .dependencies
            .push(edge("Ghost", Version::new(1, 0, 0, 0), None, true));
        let h = g.add(subject);

        let results = g.resolve(h, &DependencyConfig::default()).unwrap();
        assert_eq!(results[0].status, ResolvedStatus::Missing);
    }

    #[test]
    fn two_node_cycle_is_detected_and_excluded_from_load_order() {
        let mut g = DependencyGraph::new();
        let mut p1 = record("P1", Version::new(1, 0, 0, 0));
        p1.dependencies
            .push(edge("P2", Version::new(1, 0, 0, 0), None, true));
        let mut p2 = record("P2", Version::new(1, 0, 0, 0));
        p2.dependencies
            .push(edge("P1", Version::new(1, 0, 0, 0), None, true));
        g.add(p1);
        g.add(p2);

        let (has_cycle, members) = g.check_circular();
        assert!(has_cycle);
        assert!(members.contains("P1"));
        assert!(members.contains("P2"));

        let results = g.resolve_all(&DependencyConfig::default());
        assert!(results.iter().all(|r| r.status == ResolvedStatus::Circular));

        let load_order = g.load_order();
        assert!(load_order.order.is_empty());
        assert_eq!(load_order.circular.len(), 2);
    }

    #[test]
    fn acyclic_load_order_respects_dependency_direction() {
        let mut g = DependencyGraph::new();
        let base = record("Base", Version::new(1, 0, 0, 0));
        let mut mid = record("Mid", Version::new(1, 0, 0, 0));
        mid.dependencies
            .push(edge("Base", Version::new(1, 0, 0, 0), None, true));
        let mut top = record("Top", Version::new(1, 0, 0, 0));
        top.dependencies
            .push(edge("Mid", Version::new(1, 0, 0, 0), None, true));

        let base_h = g.add(base);
        let mid_h = g.add(mid);
        let top_h = g.add(top);

        let order = g.load_order().order;
        let pos = |h| order.iter().position(|x| *x == h).unwrap();
        assert!(pos(base_h) < pos(mid_h));
        assert!(pos(mid_h) < pos(top_h));
    }

    #[test]
    fn add_is_idempotent_by_uuid() {
        let mut g = DependencyGraph::new();
        let rec = record("A", Version::new(1, 0, 0, 0));
        let uuid = rec.uuid();
        let h1 = g.add(rec);
        let mut dup = record("A", Version::new(1, 0, 0, 0));
        dup.metadata.uuid = uuid;
        let h2 = g.add(dup);
        assert_eq!(h1, h2);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn remove_drops_node_and_future_lookups_see_it_gone() {
        let mut g = DependencyGraph::new();
        let h = g.add(record("A", Version::new(1, 0, 0, 0)));
        assert!(g.remove(h).is_some());
        assert!(g.get(h).is_none());
        assert!(g.find_by_name("A").is_empty());
    }
}
