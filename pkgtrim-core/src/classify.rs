use crate::resolve::DependencyResolver;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const BUILD_TIME_SUFFIX: &str = ".contents.packages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RedundancyReason {
    #[serde(rename = "transitive dependency")]
    TransitiveDependency,
    #[serde(rename = "pipeline provides")]
    PipelineProvided,
}

impl RedundancyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RedundancyReason::TransitiveDependency => "transitive dependency",
            RedundancyReason::PipelineProvided => "pipeline provides",
        }
    }
}

impl fmt::Display for RedundancyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedundancyFinding {
    pub package: String,
    pub provided_by: String,
    pub reason: RedundancyReason,
}

/// Whether a package list feeds a build environment. Only these lists may
/// be trimmed against pipeline needs; runtime dependencies never are.
pub fn is_build_time_scope(scope: &str) -> bool {
    scope.ends_with(BUILD_TIME_SUFFIX)
}

/// The pipeline list whose uses apply to the package list at `scope`.
///
/// ```text
/// environment.contents.packages                     -> pipeline
/// package.dependencies.runtime                      -> pipeline
/// test.environment.contents.packages                -> test.pipeline
/// subpackages[x].dependencies.runtime               -> subpackages[x].pipeline
/// subpackages[x].test.environment.contents.packages -> subpackages[x].test.pipeline
/// ```
pub fn pipeline_scope(scope: &str) -> String {
    if scope.starts_with("test.") {
        return "test.pipeline".to_string();
    }

    if scope.starts_with("subpackages[")
        && let Some(end) = closing_bracket(scope)
    {
        let (prefix, rest) = scope.split_at(end + 1);
        if rest.starts_with(".test.") {
            return format!("{}.test.pipeline", prefix);
        }
        return format!("{}.pipeline", prefix);
    }

    "pipeline".to_string()
}

fn closing_bracket(scope: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in scope.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds the entries of one package list that are already supplied by
/// something else.
///
/// For build-time scopes an entry needed by a pipeline in `pipeline_provided`
/// is reported first. Otherwise an entry is redundant when the closure of
/// another entry contains it. Its provider is the first entry in list order
/// whose closure does, which may sit later in the list than the entry.
pub fn find_redundant_packages(
    scope: &str,
    packages: &[String],
    resolver: Option<&mut DependencyResolver>,
    pipeline_provided: Option<&BTreeMap<String, String>>,
) -> Vec<RedundancyFinding> {
    let pipeline_provided = pipeline_provided
        .filter(|provided| !provided.is_empty() && is_build_time_scope(scope));

    let provided_by = match resolver {
        Some(resolver) => transitive_providers(packages, resolver),
        None => BTreeMap::new(),
    };

    let mut findings = Vec::new();

    for package in packages {
        if let Some(pipeline) = pipeline_provided.and_then(|provided| provided.get(package)) {
            findings.push(RedundancyFinding {
                package: package.clone(),
                provided_by: pipeline.clone(),
                reason: RedundancyReason::PipelineProvided,
            });
            continue;
        }

        if let Some(provider) = provided_by.get(package) {
            findings.push(RedundancyFinding {
                package: package.clone(),
                provided_by: provider.clone(),
                reason: RedundancyReason::TransitiveDependency,
            });
        }
    }

    findings
}

/// One pass over every entry's closure, recording for each listed package
/// the first entry (in list order) that pulls it in.
fn transitive_providers(
    packages: &[String],
    resolver: &mut DependencyResolver,
) -> BTreeMap<String, String> {
    let listed: BTreeSet<&str> = packages.iter().map(String::as_str).collect();
    let mut provided_by = BTreeMap::new();

    for package in packages {
        for dep in resolver.transitive_closure_of(package) {
            if listed.contains(dep.as_str()) && !provided_by.contains_key(dep) {
                provided_by.insert(dep.clone(), package.clone());
            }
        }
    }

    provided_by
}
