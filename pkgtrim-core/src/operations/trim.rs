use crate::classify::{RedundancyFinding, find_redundant_packages, pipeline_scope};
use crate::index::{HttpIndexSource, IndexRequest, IndexSource, filter_repositories};
use crate::manifest::ManifestDocument;
use crate::pipelines::PipelineResolver;
use crate::resolve::DependencyResolver;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TrimOptions {
    pub dry_run: bool,
    pub pipeline_trim: bool,
    pub arch: String,
    /// Used for manifests that list no repositories of their own.
    pub default_repository: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub scope: String,
    #[serde(flatten)]
    pub finding: RedundancyFinding,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrimReport {
    pub file: String,
    pub redundant: Vec<ReportEntry>,
    pub total_removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrimReport {
    fn new(path: &Path) -> Self {
        TrimReport {
            file: path.display().to_string(),
            redundant: Vec::new(),
            total_removed: 0,
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Trims manifests one at a time, sharing fetched indexes between files
/// that use the same repositories.
pub struct Trimmer {
    options: TrimOptions,
    pipelines: Option<PipelineResolver>,
    source: Box<dyn IndexSource>,
    /// Keyed by the fetchable repository list; `None` records a failed load
    /// so it is not retried for every file.
    resolvers: BTreeMap<Vec<String>, Option<DependencyResolver>>,
}

impl Trimmer {
    pub fn new(
        options: TrimOptions,
        pipelines: Option<PipelineResolver>,
        source: Box<dyn IndexSource>,
    ) -> Self {
        let pipelines = if options.pipeline_trim {
            pipelines
        } else {
            None
        };

        Trimmer {
            options,
            pipelines,
            source,
            resolvers: BTreeMap::new(),
        }
    }

    pub fn trim_files(&mut self, paths: &[PathBuf]) -> Vec<TrimReport> {
        paths.iter().map(|path| self.trim_file(path)).collect()
    }

    /// Analyses one manifest and, unless this is a dry run, rewrites it
    /// without the redundant entries. Failures end up in the report.
    pub fn trim_file(&mut self, path: &Path) -> TrimReport {
        let mut report = TrimReport::new(path);

        let mut document = match ManifestDocument::open(path) {
            Ok(document) => document,
            Err(err) => {
                report.error = Some(err.to_string());
                return report;
            }
        };

        let package_lists = document.package_lists_by_scope();
        let pipeline_uses = document.pipeline_uses_by_scope();
        debug!(
            "{}: {} package lists, {} pipeline scopes",
            report.file,
            package_lists.len(),
            pipeline_uses.len()
        );

        let provided_by_scope: BTreeMap<&str, BTreeMap<String, String>> = match &self.pipelines
        {
            Some(pipelines) => package_lists
                .keys()
                .filter_map(|scope| {
                    let uses = pipeline_uses.get(&pipeline_scope(scope))?;
                    Some((scope.as_str(), pipelines.packages_from_pipeline_uses(uses)))
                })
                .collect(),
            None => BTreeMap::new(),
        };

        let mut repositories = document.repositories();
        if repositories.is_empty() {
            repositories.push(self.options.default_repository.clone());
        }
        let repositories = filter_repositories(&repositories);

        let mut resolver = resolver_for(
            &mut self.resolvers,
            self.source.as_ref(),
            repositories,
            &self.options.arch,
        );

        let mut findings_by_scope = Vec::new();
        for (scope, packages) in &package_lists {
            if packages.is_empty() {
                continue;
            }

            let findings = find_redundant_packages(
                scope,
                packages,
                resolver.as_deref_mut(),
                provided_by_scope.get(scope.as_str()),
            );

            if !findings.is_empty() {
                findings_by_scope.push((scope.clone(), findings));
            }
        }

        for (scope, findings) in findings_by_scope {
            let names: Vec<String> = findings.iter().map(|f| f.package.clone()).collect();

            report
                .redundant
                .extend(findings.into_iter().map(|finding| ReportEntry {
                    scope: scope.clone(),
                    finding,
                }));

            if self.options.dry_run {
                report.total_removed += names.len();
                continue;
            }

            match document.remove_packages(&scope, &names) {
                Ok(removed) => report.total_removed += removed.len(),
                Err(err) => {
                    report.error = Some(err.to_string());
                    return report;
                }
            }
        }

        if !self.options.dry_run
            && report.total_removed > 0
            && let Err(err) = document.write()
        {
            report.error = Some(err.to_string());
        }

        report
    }
}

fn resolver_for<'a>(
    resolvers: &'a mut BTreeMap<Vec<String>, Option<DependencyResolver>>,
    source: &dyn IndexSource,
    repositories: Vec<String>,
    arch: &str,
) -> Option<&'a mut DependencyResolver> {
    resolvers
        .entry(repositories)
        .or_insert_with_key(|repositories| {
            let request = IndexRequest::new(repositories.clone(), arch);
            match DependencyResolver::with_source(&request, source) {
                Ok(resolver) => Some(resolver),
                Err(err) => {
                    warn!(
                        "dependency analysis unavailable, trimming by pipelines only: {}",
                        err
                    );
                    None
                }
            }
        })
        .as_mut()
}

/// Trims every file in `paths` against indexes fetched over HTTP.
pub fn trim(
    paths: &[PathBuf],
    options: TrimOptions,
    pipelines: Option<PipelineResolver>,
) -> Result<Vec<TrimReport>> {
    let source = HttpIndexSource::new()?;
    let mut trimmer = Trimmer::new(options, pipelines, Box::new(source));
    Ok(trimmer.trim_files(paths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrimError;
    use crate::classify::RedundancyReason;
    use crate::index::{PackageRecord, RepositoryIndex};
    use crate::pipelines::{PipelineCatalog, PipelineDefinition};
    use std::cell::Cell;
    use std::fs;
    use std::rc::Rc;

    struct FixtureSource {
        packages: Vec<PackageRecord>,
        fetches: Rc<Cell<usize>>,
    }

    impl IndexSource for FixtureSource {
        fn fetch(&self, repository: &str, _arch: &str) -> Result<RepositoryIndex> {
            self.fetches.set(self.fetches.get() + 1);
            if repository.contains("offline") {
                return Err(TrimError::IndexFormat {
                    url: repository.to_string(),
                    reason: "offline".into(),
                });
            }
            Ok(RepositoryIndex {
                url: repository.to_string(),
                packages: self.packages.clone(),
            })
        }
    }

    fn record(name: &str, deps: &[&str]) -> PackageRecord {
        let mut record = PackageRecord::new(name, "1.0-r0");
        record.dependencies = deps.iter().map(|d| d.to_string()).collect();
        record
    }

    fn trimmer(dry_run: bool, fetches: Rc<Cell<usize>>) -> Trimmer {
        let source = FixtureSource {
            packages: vec![
                record("openssl", &["libcrypto3", "libssl3"]),
                record("libcrypto3", &[]),
                record("libssl3", &["libcrypto3"]),
                record("curl", &["libcurl"]),
                record("libcurl", &[]),
            ],
            fetches,
        };

        let catalog = PipelineCatalog::from_definitions([(
            "go/build".to_string(),
            PipelineDefinition::parse("needs:\n  packages: [go, busybox]\n").unwrap(),
        )]);

        Trimmer::new(
            TrimOptions {
                dry_run,
                pipeline_trim: true,
                arch: "x86_64".into(),
                default_repository: "https://packages.test/os".into(),
            },
            Some(PipelineResolver::with_catalog(catalog)),
            Box::new(source),
        )
    }

    const MANIFEST: &str = "\
package:
  name: demo
  dependencies:
    runtime:
      - openssl
      - libssl3
      - go

environment:
  contents:
    packages:
      - busybox
      - openssl
      - libcrypto3
      - jq

pipeline:
  - uses: go/build
";

    #[test]
    fn trims_and_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.yaml");
        fs::write(&path, MANIFEST).unwrap();

        let mut trimmer = trimmer(false, Rc::new(Cell::new(0)));
        let report = trimmer.trim_file(&path);

        assert!(report.error.is_none(), "{:?}", report.error);
        assert_eq!(report.total_removed, 3);

        let summary: Vec<_> = report
            .redundant
            .iter()
            .map(|e| {
                (
                    e.scope.as_str(),
                    e.finding.package.as_str(),
                    e.finding.reason,
                    e.finding.provided_by.as_str(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (
                    "environment.contents.packages",
                    "busybox",
                    RedundancyReason::PipelineProvided,
                    "go/build"
                ),
                (
                    "environment.contents.packages",
                    "libcrypto3",
                    RedundancyReason::TransitiveDependency,
                    "openssl"
                ),
                (
                    "package.dependencies.runtime",
                    "libssl3",
                    RedundancyReason::TransitiveDependency,
                    "openssl"
                ),
            ]
        );

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "\
package:
  name: demo
  dependencies:
    runtime:
      - openssl
      - go

environment:
  contents:
    packages:
      - openssl
      - jq

pipeline:
  - uses: go/build
"
        );
    }

    #[test]
    fn dry_run_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.yaml");
        fs::write(&path, MANIFEST).unwrap();

        let mut trimmer = trimmer(true, Rc::new(Cell::new(0)));
        let report = trimmer.trim_file(&path);

        assert_eq!(report.total_removed, 3);
        assert_eq!(fs::read_to_string(&path).unwrap(), MANIFEST);
    }

    #[test]
    fn falls_back_to_pipelines_when_indexes_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.yaml");
        fs::write(
            &path,
            "\
environment:
  contents:
    repositories:
      - https://offline.test/os
    packages:
      - busybox
      - openssl
      - libcrypto3
pipeline:
  - uses: go/build
",
        )
        .unwrap();

        let mut trimmer = trimmer(true, Rc::new(Cell::new(0)));
        let report = trimmer.trim_file(&path);

        assert!(report.error.is_none());
        assert_eq!(report.redundant.len(), 1);
        assert_eq!(report.redundant[0].finding.package, "busybox");
    }

    #[test]
    fn reuses_indexes_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.yaml");
        let second = dir.path().join("b.yaml");
        fs::write(&first, MANIFEST).unwrap();
        fs::write(&second, MANIFEST).unwrap();

        let fetches = Rc::new(Cell::new(0));
        let mut trimmer = trimmer(true, fetches.clone());
        let reports = trimmer.trim_files(&[first, second]);

        assert_eq!(reports.len(), 2);
        assert_eq!(fetches.get(), 1);
    }

    #[test]
    fn reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let invalid = dir.path().join("invalid.yaml");
        fs::write(&invalid, "package: [oops\n").unwrap();

        let mut trimmer = trimmer(false, Rc::new(Cell::new(0)));
        let reports = trimmer.trim_files(&[missing, invalid]);

        assert!(reports.iter().all(TrimReport::failed));
        assert!(reports.iter().all(|r| r.redundant.is_empty()));
    }

    #[test]
    fn pipeline_trim_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.yaml");
        fs::write(&path, MANIFEST).unwrap();

        let mut trimmer = trimmer(true, Rc::new(Cell::new(0)));
        trimmer.pipelines = None;
        let report = trimmer.trim_file(&path);

        assert!(
            report
                .redundant
                .iter()
                .all(|e| e.finding.reason == RedundancyReason::TransitiveDependency)
        );
    }

    #[test]
    fn serializes_report_shape() {
        let report = TrimReport {
            file: "demo.yaml".into(),
            redundant: vec![ReportEntry {
                scope: "environment.contents.packages".into(),
                finding: RedundancyFinding {
                    package: "busybox".into(),
                    provided_by: "go/build".into(),
                    reason: RedundancyReason::PipelineProvided,
                },
            }],
            total_removed: 1,
            error: None,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "file": "demo.yaml",
                "redundant": [{
                    "scope": "environment.contents.packages",
                    "package": "busybox",
                    "provided_by": "go/build",
                    "reason": "pipeline provides"
                }],
                "total_removed": 1
            })
        );
    }
}
