mod catalog;

pub use catalog::{Input, Needs, PipelineCatalog, PipelineDefinition};

use crate::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

const TEST_NAMESPACE: &str = "test/";

/// Looks up which packages the pipelines a manifest uses bring along.
#[derive(Debug, Clone)]
pub struct PipelineResolver {
    catalog: PipelineCatalog,
}

impl Default for PipelineResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineResolver {
    pub fn new() -> Self {
        Self::with_catalog(PipelineCatalog::embedded())
    }

    pub fn with_catalog(catalog: PipelineCatalog) -> Self {
        PipelineResolver { catalog }
    }

    pub fn catalog(&self) -> &PipelineCatalog {
        &self.catalog
    }

    pub fn packages_needed_by(&self, pipeline: &str) -> &[String] {
        self.catalog.packages_needed_by(pipeline)
    }

    /// Package name to the pipeline that supplies it, over every pipeline in
    /// `uses`. A later pipeline wins when two supply the same package.
    pub fn packages_from_pipeline_uses(&self, uses: &[String]) -> BTreeMap<String, String> {
        let mut provided = BTreeMap::new();

        for pipeline in uses {
            for package in self.packages_needed_by(pipeline) {
                provided.insert(package.clone(), pipeline.clone());
            }

            if pipeline.starts_with(TEST_NAMESPACE)
                && let Some(package) = infer_test_pipeline_package(pipeline)
            {
                provided.insert(package, pipeline.clone());
            }
        }

        provided
    }
}

/// The embedded catalog with each of `dirs` layered on top, later
/// directories overriding earlier ones.
pub fn load_catalog(dirs: &[PathBuf]) -> Result<PipelineCatalog> {
    let mut catalog = PipelineCatalog::embedded();
    for dir in dirs {
        catalog.load_dir(dir)?;
    }
    Ok(catalog)
}

/// Guesses the package a test pipeline exercises from its last path segment,
/// so `test/tw/ldd-check` maps to `ldd-check`. Nothing checks that the name
/// is a real package.
pub fn infer_test_pipeline_package(pipeline: &str) -> Option<String> {
    pipeline
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> PipelineResolver {
        let definition = |text: &str| PipelineDefinition::parse(text).unwrap();

        PipelineResolver::with_catalog(PipelineCatalog::from_definitions([
            (
                "go/build".to_string(),
                definition("needs:\n  packages: [go, busybox, git]\n"),
            ),
            (
                "autoconf/make".to_string(),
                definition("needs:\n  packages: [make, busybox]\n"),
            ),
            (
                "test/tw/ldd-check".to_string(),
                definition("needs:\n  packages: [busybox]\n"),
            ),
        ]))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merges_packages_last_write_wins() {
        let resolver = fixture();
        let provided =
            resolver.packages_from_pipeline_uses(&strings(&["go/build", "autoconf/make"]));

        assert_eq!(provided["go"], "go/build");
        assert_eq!(provided["git"], "go/build");
        assert_eq!(provided["make"], "autoconf/make");
        assert_eq!(provided["busybox"], "autoconf/make");
    }

    #[test]
    fn unknown_pipelines_contribute_nothing() {
        let resolver = fixture();
        assert!(resolver.packages_needed_by("does/not-exist").is_empty());
        assert!(
            resolver
                .packages_from_pipeline_uses(&strings(&["does/not-exist"]))
                .is_empty()
        );
    }

    #[test]
    fn test_pipelines_provide_their_last_segment() {
        let resolver = fixture();
        let provided = resolver
            .packages_from_pipeline_uses(&strings(&["test/tw/ldd-check", "test/uncatalogued"]));

        assert_eq!(provided["ldd-check"], "test/tw/ldd-check");
        assert_eq!(provided["busybox"], "test/tw/ldd-check");
        assert_eq!(provided["uncatalogued"], "test/uncatalogued");
    }

    #[test]
    fn infers_test_package_names() {
        assert_eq!(
            infer_test_pipeline_package("test/tw/foo-check").as_deref(),
            Some("foo-check")
        );
        assert_eq!(
            infer_test_pipeline_package("test/pkgconf").as_deref(),
            Some("pkgconf")
        );
        assert_eq!(infer_test_pipeline_package(""), None);
    }

    #[test]
    fn layers_local_directories() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("tool.yaml"), "needs:\n  packages: [a]\n").unwrap();
        std::fs::write(second.path().join("tool.yaml"), "needs:\n  packages: [b]\n").unwrap();

        let catalog =
            load_catalog(&[first.path().to_path_buf(), second.path().to_path_buf()]).unwrap();
        assert_eq!(catalog.packages_needed_by("tool"), ["b"]);
        assert!(catalog.contains("go/build"));
    }

    #[test]
    fn default_resolver_uses_embedded_catalog() {
        let resolver = PipelineResolver::new();
        assert!(resolver.catalog().contains("go/build"));
        assert!(!resolver.catalog().is_empty());
    }
}
