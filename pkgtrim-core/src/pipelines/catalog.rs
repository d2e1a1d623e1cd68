use crate::{Result, TrimError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};
use tracing::debug;

const EMBEDDED: &[(&str, &str)] = &[
    (
        "autoconf/configure",
        include_str!("../../pipelines/autoconf/configure.yaml"),
    ),
    (
        "autoconf/make",
        include_str!("../../pipelines/autoconf/make.yaml"),
    ),
    (
        "autoconf/make-install",
        include_str!("../../pipelines/autoconf/make-install.yaml"),
    ),
    ("cargo/build", include_str!("../../pipelines/cargo/build.yaml")),
    ("cmake/build", include_str!("../../pipelines/cmake/build.yaml")),
    (
        "cmake/configure",
        include_str!("../../pipelines/cmake/configure.yaml"),
    ),
    (
        "cmake/install",
        include_str!("../../pipelines/cmake/install.yaml"),
    ),
    ("fetch", include_str!("../../pipelines/fetch.yaml")),
    ("git-checkout", include_str!("../../pipelines/git-checkout.yaml")),
    ("go/build", include_str!("../../pipelines/go/build.yaml")),
    ("go/install", include_str!("../../pipelines/go/install.yaml")),
    (
        "meson/compile",
        include_str!("../../pipelines/meson/compile.yaml"),
    ),
    (
        "meson/configure",
        include_str!("../../pipelines/meson/configure.yaml"),
    ),
    ("patch", include_str!("../../pipelines/patch.yaml")),
    (
        "python/build-wheel",
        include_str!("../../pipelines/python/build-wheel.yaml"),
    ),
    (
        "python/import",
        include_str!("../../pipelines/python/import.yaml"),
    ),
    ("ruby/build", include_str!("../../pipelines/ruby/build.yaml")),
    ("split/dev", include_str!("../../pipelines/split/dev.yaml")),
    (
        "split/manpages",
        include_str!("../../pipelines/split/manpages.yaml"),
    ),
    ("strip", include_str!("../../pipelines/strip.yaml")),
    (
        "test/pkgconf",
        include_str!("../../pipelines/test/pkgconf.yaml"),
    ),
    (
        "test/tw/ldd-check",
        include_str!("../../pipelines/test/tw/ldd-check.yaml"),
    ),
];

/// The parts of a pipeline document that matter for package analysis.
#[derive(Debug, Default, Deserialize)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub needs: Option<Needs>,
    #[serde(default)]
    pub inputs: BTreeMap<String, Option<Input>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Needs {
    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Input {
    #[serde(default)]
    pub description: Option<String>,
    /// Kept as the scalar's source text, so `3.10` is not read as a float.
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl PipelineDefinition {
    pub fn parse(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// `needs.packages` with input defaults substituted. Entries that still
    /// reference an unresolved `${{...}}` expression are dropped.
    pub fn needed_packages(&self) -> Vec<String> {
        let Some(needs) = &self.needs else {
            return Vec::new();
        };

        let defaults: Vec<(String, String)> = self
            .inputs
            .iter()
            .filter_map(|(name, input)| {
                let value = input.as_ref()?.default.clone()?;
                Some((format!("${{{{inputs.{}}}}}", name), value))
            })
            .collect();

        needs
            .packages
            .iter()
            .filter_map(|package| {
                let mut resolved = package.clone();
                for (placeholder, value) in &defaults {
                    resolved = resolved.replace(placeholder, value);
                }

                let resolved = resolved.trim().to_string();
                if resolved.is_empty() || resolved.contains("${{") {
                    None
                } else {
                    Some(resolved)
                }
            })
            .collect()
    }
}

/// Pipeline identifier (`go/build`) to the packages that pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct PipelineCatalog {
    pipelines: BTreeMap<String, Vec<String>>,
}

impl PipelineCatalog {
    /// The pipelines compiled into this binary.
    pub fn embedded() -> Self {
        let mut catalog = PipelineCatalog::default();

        for (id, text) in EMBEDDED {
            match PipelineDefinition::parse(text) {
                Ok(definition) => catalog.insert(id, &definition),
                Err(err) => debug!("skipping embedded pipeline {}: {}", id, err),
            }
        }

        catalog
    }

    pub fn from_definitions<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = (String, PipelineDefinition)>,
    {
        let mut catalog = PipelineCatalog::default();
        for (id, definition) in definitions {
            catalog.insert(&id, &definition);
        }
        catalog
    }

    /// Records `definition` under `id`, replacing any earlier entry.
    /// Definitions that need no packages leave the catalog without an entry.
    pub fn insert(&mut self, id: &str, definition: &PipelineDefinition) {
        let declares_needs = definition
            .needs
            .as_ref()
            .is_some_and(|needs| !needs.packages.is_empty());

        if declares_needs {
            self.pipelines
                .insert(id.to_string(), definition.needed_packages());
        } else {
            self.pipelines.remove(id);
        }
    }

    /// Adds every `*.yaml` under `dir`, keyed by its path relative to `dir`.
    /// Returns how many definitions were loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let pattern = format!(
            "{}/**/*.yaml",
            glob::Pattern::escape(&dir.to_string_lossy())
        );

        let paths = glob::glob(&pattern).map_err(|err| TrimError::Configuration {
            reason: format!("invalid pipeline directory {}: {}", dir.display(), err),
        })?;

        let mut loaded = 0;

        for entry in paths {
            let path = entry.map_err(|err| TrimError::ReadFile {
                path: err.path().to_path_buf(),
                source: err.into_error(),
            })?;

            if !path.is_file() {
                continue;
            }

            let Some(id) = pipeline_id(dir, &path) else {
                continue;
            };

            let text = fs::read_to_string(&path).map_err(|source| TrimError::ReadFile {
                path: path.clone(),
                source,
            })?;

            match PipelineDefinition::parse(&text) {
                Ok(definition) => {
                    self.insert(&id, &definition);
                    loaded += 1;
                }
                Err(err) => debug!("skipping pipeline {}: {}", path.display(), err),
            }
        }

        debug!("loaded {} pipelines from {}", loaded, dir.display());
        Ok(loaded)
    }

    pub fn packages_needed_by(&self, id: &str) -> &[String] {
        self.pipelines
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.pipelines
            .iter()
            .map(|(id, packages)| (id.as_str(), packages.as_slice()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pipelines.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

fn pipeline_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
