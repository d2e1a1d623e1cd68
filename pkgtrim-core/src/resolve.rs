use crate::dependency::{is_virtual_provide, parse_dependency, provided_name};
use crate::index::{
    HttpIndexSource, IndexRequest, IndexSource, PackageRecord, RepositoryIndex, fetch_indexes,
};
use crate::Result;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Package lookup tables built once from repository indexes.
#[derive(Debug, Default)]
pub struct PackageIndex {
    records: Vec<PackageRecord>,
    /// Name to the latest record with that name.
    by_name: BTreeMap<String, usize>,
    /// Package name or provided capability to every record supplying it.
    by_provider: BTreeMap<String, Vec<usize>>,
}

impl PackageIndex {
    pub fn from_indexes(indexes: Vec<RepositoryIndex>) -> Self {
        let mut index = PackageIndex::default();

        for repository in indexes {
            for record in repository.packages {
                index.insert(record);
            }
        }

        index
    }

    fn insert(&mut self, record: PackageRecord) {
        let position = self.records.len();

        let newer = match self.by_name.get(&record.name) {
            Some(&existing) => {
                compare_versions(&record.version, &self.records[existing].version)
                    == Ordering::Greater
            }
            None => true,
        };

        if newer {
            self.by_name.insert(record.name.clone(), position);
        }

        self.by_provider
            .entry(record.name.clone())
            .or_default()
            .push(position);

        for provide in &record.provides {
            self.by_provider
                .entry(provided_name(provide))
                .or_default()
                .push(position);
        }

        self.records.push(record);
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.by_name.get(name).map(|&idx| &self.records[idx])
    }

    pub fn providers_of(&self, name: &str) -> Vec<&PackageRecord> {
        self.by_provider
            .get(name)
            .map(|positions| positions.iter().map(|&idx| &self.records[idx]).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Every package reachable from `name` over concrete dependency edges,
    /// including `name` itself.
    fn reachable_from(&self, name: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![name.to_string()];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }

            let Some(record) = self.get(&current) else {
                continue;
            };

            for dep in &record.dependencies {
                let dep_name = parse_dependency(dep);
                if dep_name.is_empty() || is_virtual_provide(&dep_name) {
                    continue;
                }

                if self.by_name.contains_key(&dep_name) && !visited.contains(&dep_name) {
                    stack.push(dep_name);
                }
            }
        }

        visited
    }
}

/// Answers dependency questions against a fixed set of repository indexes.
///
/// Transitive closures are memoized for the lifetime of the resolver; the
/// underlying index never changes after construction.
#[derive(Debug)]
pub struct DependencyResolver {
    index: PackageIndex,
    closures: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyResolver {
    pub fn new(request: &IndexRequest) -> Result<Self> {
        let source = HttpIndexSource::new()?;
        Self::with_source(request, &source)
    }

    pub fn with_source(request: &IndexRequest, source: &dyn IndexSource) -> Result<Self> {
        let indexes = fetch_indexes(request, source)?;
        Ok(Self::from_indexes(indexes))
    }

    pub fn from_indexes(indexes: Vec<RepositoryIndex>) -> Self {
        let index = PackageIndex::from_indexes(indexes);
        debug!("dependency index holds {} packages", index.len());

        DependencyResolver {
            index,
            closures: BTreeMap::new(),
        }
    }

    pub fn index(&self) -> &PackageIndex {
        &self.index
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.index
            .get(name)
            .map(|record| record.dependencies.as_slice())
            .unwrap_or_default()
    }

    pub fn provides_of(&self, name: &str) -> &[String] {
        self.index
            .get(name)
            .map(|record| record.provides.as_slice())
            .unwrap_or_default()
    }

    /// All packages `name` pulls in, never including `name` itself.
    ///
    /// Conflict markers are skipped and virtual capabilities (`so:`, `cmd:`,
    /// `pc:`) end a branch, since several unrelated packages can satisfy
    /// them.
    pub fn transitive_closure_of(&mut self, name: &str) -> &BTreeSet<String> {
        if !self.closures.contains_key(name) {
            let mut reachable = self.index.reachable_from(name);
            reachable.remove(name);
            self.closures.insert(name.to_string(), reachable);
        }

        &self.closures[name]
    }

    /// Whether `candidate` is pulled in by `of`, either by name or through
    /// a provides entry of a package in the closure.
    pub fn is_transitive_dependency(&mut self, candidate: &str, of: &str) -> bool {
        self.transitive_closure_of(of);
        let closure = &self.closures[of];

        if closure.contains(candidate) {
            return true;
        }

        closure.iter().any(|dep| {
            self.provides_of(dep)
                .iter()
                .any(|provide| provided_name(provide) == candidate)
        })
    }
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    pkgtrim_version::compare(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, version: &str, deps: &[&str], provides: &[&str]) -> PackageRecord {
        let mut record = PackageRecord::new(name, version);
        record.dependencies = deps.iter().map(|d| d.to_string()).collect();
        record.provides = provides.iter().map(|p| p.to_string()).collect();
        record
    }

    fn resolver(records: Vec<PackageRecord>) -> DependencyResolver {
        DependencyResolver::from_indexes(vec![RepositoryIndex {
            url: "https://example.test/os".into(),
            packages: records,
        }])
    }

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn collects_transitive_dependencies() {
        let mut resolver = resolver(vec![
            record("app", "1.0", &["lib-a", "lib-b>=2"], &[]),
            record("lib-a", "1.0", &["lib-c"], &[]),
            record("lib-b", "2.0", &[], &[]),
            record("lib-c", "1.0", &[], &[]),
        ]);

        assert_eq!(
            names(resolver.transitive_closure_of("app")),
            vec!["lib-a", "lib-b", "lib-c"]
        );
        assert!(resolver.transitive_closure_of("lib-c").is_empty());
    }

    #[test]
    fn closure_is_memoized_and_stable() {
        let mut resolver = resolver(vec![
            record("app", "1.0", &["lib"], &[]),
            record("lib", "1.0", &[], &[]),
        ]);

        let first = resolver.transitive_closure_of("app").clone();
        let second = resolver.transitive_closure_of("app").clone();
        assert_eq!(first, second);
        assert!(resolver.closures.contains_key("app"));
    }

    #[test]
    fn tolerates_cycles_and_excludes_self() {
        let mut resolver = resolver(vec![
            record("a", "1.0", &["b"], &[]),
            record("b", "1.0", &["a"], &[]),
        ]);

        assert_eq!(names(resolver.transitive_closure_of("a")), vec!["b"]);
        assert_eq!(names(resolver.transitive_closure_of("b")), vec!["a"]);
    }

    #[test]
    fn skips_virtual_and_conflict_edges() {
        let mut resolver = resolver(vec![
            record(
                "app",
                "1.0",
                &["so:libc.musl-x86_64.so.1", "cmd:sh", "pc:zlib", "!legacy", "real"],
                &[],
            ),
            record("musl", "1.2", &[], &["so:libc.musl-x86_64.so.1"]),
            record("busybox", "1.36", &[], &["cmd:sh"]),
            record("legacy", "1.0", &[], &[]),
            record("real", "1.0", &[], &[]),
        ]);

        assert_eq!(names(resolver.transitive_closure_of("app")), vec!["real"]);
    }

    #[test]
    fn follows_pinned_dependencies() {
        let mut resolver = resolver(vec![
            record("app", "1.0", &["@local:lib=1.0"], &[]),
            record("lib", "1.0", &[], &[]),
        ]);

        assert_eq!(names(resolver.transitive_closure_of("app")), vec!["lib"]);
    }

    #[test]
    fn unknown_packages_have_empty_answers() {
        let mut resolver = resolver(vec![record("app", "1.0", &["ghost"], &[])]);

        assert!(resolver.dependencies_of("missing").is_empty());
        assert!(resolver.provides_of("missing").is_empty());
        assert!(resolver.transitive_closure_of("missing").is_empty());
        assert!(resolver.transitive_closure_of("app").is_empty());
    }

    #[test]
    fn keeps_latest_version_per_name() {
        let mut resolver = DependencyResolver::from_indexes(vec![
            RepositoryIndex {
                url: "https://one.test".into(),
                packages: vec![
                    record("lib", "1.10-r0", &["new-dep"], &[]),
                    record("lib", "1.9-r3", &["old-dep"], &[]),
                ],
            },
            RepositoryIndex {
                url: "https://two.test".into(),
                packages: vec![record("new-dep", "1.0", &[], &[])],
            },
        ]);

        assert_eq!(resolver.dependencies_of("lib"), ["new-dep".to_string()]);
        assert_eq!(names(resolver.transitive_closure_of("lib")), vec!["new-dep"]);
        assert_eq!(resolver.index().providers_of("lib").len(), 2);
    }

    #[test]
    fn unparsable_versions_fall_back_to_string_order() {
        let resolver = resolver(vec![
            record("tool", "snapshot-a", &["a"], &[]),
            record("tool", "snapshot-b", &["b"], &[]),
        ]);

        assert_eq!(resolver.dependencies_of("tool"), ["b".to_string()]);
    }

    #[test]
    fn transitive_dependency_through_provides() {
        let mut resolver = resolver(vec![
            record("app", "1.0", &["openssl"], &[]),
            record("openssl", "3.0", &["libcrypto3"], &[]),
            record("libcrypto3", "3.0", &[], &["openssl-libs=3.0", "so:libcrypto.so.3"]),
        ]);

        assert!(resolver.is_transitive_dependency("openssl", "app"));
        assert!(resolver.is_transitive_dependency("libcrypto3", "app"));
        assert!(resolver.is_transitive_dependency("openssl-libs", "app"));
        assert!(!resolver.is_transitive_dependency("app", "app"));
        assert!(!resolver.is_transitive_dependency("unrelated", "app"));
    }

    #[test]
    fn providers_map_includes_capabilities() {
        let resolver = resolver(vec![
            record("busybox", "1.36", &[], &["cmd:sh=1.36"]),
            record("bash", "5.2", &[], &["cmd:sh=5.2"]),
        ]);

        let providers: Vec<_> = resolver
            .index()
            .providers_of("cmd:sh")
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(providers, vec!["busybox", "bash"]);
    }
}
