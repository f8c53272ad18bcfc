use crate::StoreError;
use daybreak_schema::{Manifest, Package, Server};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Merged view of every manifest applied so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub applications: BTreeMap<String, Package>,
    pub runtimes: BTreeMap<String, Package>,
    pub servers: BTreeMap<String, Server>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert every entry of `manifest`; a later manifest's entry for an id
    /// replaces the earlier one.
    pub fn apply(&mut self, manifest: Manifest) {
        self.applications.extend(manifest.applications);
        self.runtimes.extend(manifest.runtimes);
        self.servers.extend(manifest.servers);
    }

    /// Application or runtime by id. Applications shadow runtimes.
    pub fn package(&self, id: &str) -> Option<&Package> {
        self.applications.get(id).or_else(|| self.runtimes.get(id))
    }

    pub fn applications_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Package> {
        self.applications.values().filter(move |p| p.kind == kind)
    }

    /// Resolve `id` into install/launch order: deepest runtime first, `id` last.
    ///
    /// An unknown `id` yields an empty plan. A runtime reference that does not
    /// resolve ends the chain there. A reference back into the chain is an error.
    pub fn resolve(&self, id: &str) -> Result<Vec<Package>, StoreError> {
        let mut chain: Vec<Package> = Vec::new();
        let mut next = Some(id);

        while let Some(current) = next {
            let Some(package) = self.package(current) else {
                if chain.is_empty() {
                    debug!("failed to resolve {current}");
                } else {
                    warn!("missing runtime {current} required by {}", chain[chain.len() - 1].id);
                }
                break;
            };

            if chain.iter().any(|p| p.id == package.id) {
                let mut ids: Vec<String> = chain.iter().map(|p| p.id.clone()).collect();
                ids.push(package.id.clone());
                return Err(StoreError::CyclicDependency { chain: ids });
            }

            debug!("resolved {}", package.id);
            chain.push(package.clone());
            next = package.runtime.as_deref();
        }

        chain.reverse();
        Ok(chain)
    }

    /// The catalog as a self-authored manifest attributed to `source`.
    pub fn to_manifest(&self, name: &str, source: &str) -> Manifest {
        Manifest {
            source: source.to_owned(),
            name: name.to_owned(),
            applications: self.applications.clone(),
            runtimes: self.runtimes.clone(),
            servers: self.servers.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.runtimes.is_empty() && self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(name: &str, apps: &[Package], runtimes: &[Package]) -> Manifest {
        let mut m = Manifest::new(name, &format!("https://{name}"));
        for a in apps {
            m.insert_application(a.clone());
        }
        for r in runtimes {
            m.insert_runtime(r.clone());
        }
        m
    }

    fn ids(plan: &[Package]) -> Vec<&str> {
        plan.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn later_manifest_wins() {
        let mut c = Catalog::new();
        c.apply(manifest(
            "one",
            &[Package::new("game", "client").with_name("Old")],
            &[],
        ));
        c.apply(manifest(
            "two",
            &[Package::new("game", "client").with_name("New")],
            &[],
        ));
        assert_eq!(c.applications.len(), 1);
        assert_eq!(c.applications["game"].name.as_deref(), Some("New"));
    }

    #[test]
    fn merge_keeps_entries_absent_from_later_manifest() {
        let mut c = Catalog::new();
        c.apply(manifest("one", &[Package::new("a", "client")], &[]));
        c.apply(manifest("two", &[Package::new("b", "mod")], &[]));
        assert_eq!(c.applications.len(), 2);
    }

    #[test]
    fn three_link_chain_resolves_in_install_order() {
        let mut c = Catalog::new();
        c.apply(manifest(
            "m",
            &[Package::new("A", "client").with_runtime("B")],
            &[
                Package::new("B", "runtime").with_runtime("C"),
                Package::new("C", "runtime"),
            ],
        ));
        let plan = c.resolve("A").unwrap();
        assert_eq!(ids(&plan), vec!["C", "B", "A"]);
    }

    #[test]
    fn no_dependency_resolves_to_itself() {
        let mut c = Catalog::new();
        c.apply(manifest("m", &[], &[Package::new("C", "runtime")]));
        assert_eq!(ids(&c.resolve("C").unwrap()), vec!["C"]);
    }

    #[test]
    fn unknown_id_resolves_to_empty_plan() {
        let c = Catalog::new();
        assert!(c.resolve("unknown").unwrap().is_empty());
    }

    #[test]
    fn missing_runtime_ends_chain() {
        let mut c = Catalog::new();
        c.apply(manifest(
            "m",
            &[Package::new("A", "client").with_runtime("gone")],
            &[],
        ));
        assert_eq!(ids(&c.resolve("A").unwrap()), vec!["A"]);
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut c = Catalog::new();
        c.apply(manifest(
            "m",
            &[Package::new("A", "client").with_runtime("B")],
            &[Package::new("B", "runtime")],
        ));
        assert_eq!(c.resolve("A").unwrap(), c.resolve("A").unwrap());
    }

    #[test]
    fn cycle_is_reported() {
        let mut c = Catalog::new();
        c.apply(manifest(
            "m",
            &[Package::new("A", "client").with_runtime("B")],
            &[
                Package::new("B", "runtime").with_runtime("C"),
                Package::new("C", "runtime").with_runtime("B"),
            ],
        ));
        match c.resolve("A") {
            Err(StoreError::CyclicDependency { chain }) => {
                assert_eq!(chain, vec!["A", "B", "C", "B"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_loop_is_reported_as_cycle() {
        let mut c = Catalog::new();
        c.apply(manifest(
            "m",
            &[Package::new("game", "client")],
            &[Package::new("loop", "runtime").with_runtime("loop")],
        ));
        assert_eq!(ids(&c.resolve("game").unwrap()), vec!["game"]);
        match c.resolve("loop") {
            Err(StoreError::CyclicDependency { chain }) => {
                assert_eq!(chain, vec!["loop", "loop"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn applications_shadow_runtimes_with_same_id() {
        let mut c = Catalog::new();
        c.apply(manifest(
            "m",
            &[Package::new("x", "client")],
            &[Package::new("x", "runtime")],
        ));
        assert_eq!(c.package("x").unwrap().kind, "client");
    }

    #[test]
    fn filter_by_kind() {
        let mut c = Catalog::new();
        c.apply(manifest(
            "m",
            &[
                Package::new("a", "client"),
                Package::new("b", "mod"),
                Package::new("c", "mod"),
            ],
            &[],
        ));
        assert_eq!(c.applications_of_kind("mod").count(), 2);
        assert_eq!(c.applications_of_kind("client").count(), 1);
    }
}
