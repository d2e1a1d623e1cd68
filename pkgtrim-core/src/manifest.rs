mod model;
mod outline;
mod path;
mod style;

pub use path::{Segment, split_path_preserving_brackets};
pub use style::{FormatStyle, STYLE_FILE};

use crate::{Result, TrimError};
use model::{BuildManifest, PipelineStep, Subpackage};
use outline::{Node, Span};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A melange-style build manifest that can be edited without disturbing the
/// formatting of untouched lines.
#[derive(Debug)]
pub struct ManifestDocument {
    path: PathBuf,
    lines: Vec<String>,
    trailing_newline: bool,
    manifest: BuildManifest,
}

impl ManifestDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| TrimError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(path, &text)
    }

    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let manifest = parse_manifest(&path, text)?;

        Ok(ManifestDocument {
            path,
            lines: text.lines().map(str::to_string).collect(),
            trailing_newline: text.ends_with('\n'),
            manifest,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn render(&self) -> String {
        render_lines(&self.lines, self.trailing_newline)
    }

    /// Every package list in the manifest keyed by its scope path, including
    /// lists that are present but empty.
    pub fn package_lists_by_scope(&self) -> BTreeMap<String, Vec<String>> {
        let manifest = &self.manifest;
        let mut lists = BTreeMap::new();

        let mut record = |scope: String, list: Option<&Vec<String>>| {
            if let Some(list) = list {
                lists.insert(scope, list.clone());
            }
        };

        record(
            "environment.contents.packages".to_string(),
            manifest.environment.as_ref().and_then(|env| env.packages()),
        );
        record(
            "package.dependencies.runtime".to_string(),
            manifest
                .package
                .as_ref()
                .and_then(|package| package.dependencies.as_ref())
                .and_then(|deps| deps.runtime()),
        );
        record(
            "test.environment.contents.packages".to_string(),
            manifest.test.as_ref().and_then(|test| test.packages()),
        );

        for (label, subpackage) in self.subpackages() {
            record(
                format!("{}.dependencies.runtime", label),
                subpackage
                    .dependencies
                    .as_ref()
                    .and_then(|deps| deps.runtime()),
            );
            record(
                format!("{}.test.environment.contents.packages", label),
                subpackage.test.as_ref().and_then(|test| test.packages()),
            );
        }

        lists
    }

    /// `uses` references of each pipeline, in step order, including steps
    /// nested in other steps. Pipelines without any are left out.
    pub fn pipeline_uses_by_scope(&self) -> BTreeMap<String, Vec<String>> {
        let manifest = &self.manifest;
        let mut scopes = BTreeMap::new();

        let mut record = |scope: String, steps: Option<&Vec<PipelineStep>>| {
            let mut uses = Vec::new();
            if let Some(steps) = steps {
                collect_uses(steps, &mut uses);
            }
            if !uses.is_empty() {
                scopes.insert(scope, uses);
            }
        };

        record("pipeline".to_string(), manifest.pipeline.as_ref());
        record(
            "test.pipeline".to_string(),
            manifest.test.as_ref().and_then(|test| test.pipeline.as_ref()),
        );

        for (label, subpackage) in self.subpackages() {
            record(format!("{}.pipeline", label), subpackage.pipeline.as_ref());
            record(
                format!("{}.test.pipeline", label),
                subpackage
                    .test
                    .as_ref()
                    .and_then(|test| test.pipeline.as_ref()),
            );
        }

        scopes
    }

    pub fn repositories(&self) -> Vec<String> {
        self.manifest
            .environment
            .as_ref()
            .and_then(|env| env.repositories())
            .cloned()
            .unwrap_or_default()
    }

    fn subpackages(&self) -> Vec<(String, &Subpackage)> {
        let Some(subpackages) = &self.manifest.subpackages else {
            return Vec::new();
        };

        subpackages
            .iter()
            .enumerate()
            .map(|(position, subpackage)| {
                let label = match &subpackage.name {
                    Some(name) => format!("subpackages[{}]", name),
                    None => format!("subpackages[{}]", position),
                };
                (label, subpackage)
            })
            .collect()
    }

    /// Removes the entries named in `names` from the list at `scope` and
    /// returns what was removed, in list order.
    ///
    /// When the list ends up empty its key is dropped, then every parent
    /// mapping left empty by that, stopping at the first parent that still
    /// holds something or at a subpackage selector.
    pub fn remove_packages(&mut self, scope: &str, names: &[String]) -> Result<Vec<String>> {
        let segments = split_path_preserving_brackets(scope);
        let wanted: BTreeSet<&str> = names.iter().map(String::as_str).collect();

        let root = outline::parse(&self.lines);
        let mut removed = Vec::new();

        let remaining = match root.resolve(&segments) {
            Some(Node::Sequence(items)) => {
                let mut doomed = Vec::new();
                for item in items {
                    match &item.value {
                        Node::Scalar(value) if wanted.contains(value.as_str()) => {
                            removed.push(value.clone());
                            doomed.push(item.span);
                        }
                        _ => {}
                    }
                }

                for span in doomed.into_iter().rev() {
                    self.delete_lines(span);
                }

                items.len() - removed.len()
            }
            Some(Node::Flow {
                line,
                open,
                close,
                items,
            }) => {
                let mut kept = Vec::new();
                for item in items {
                    if wanted.contains(item.value.as_str()) {
                        removed.push(item.value.clone());
                    } else {
                        kept.push(item.raw.as_str());
                    }
                }

                if !removed.is_empty() {
                    let text = &self.lines[*line];
                    let rewritten = format!(
                        "{}[{}]{}",
                        &text[..*open],
                        kept.join(", "),
                        &text[*close + 1..]
                    );
                    self.lines[*line] = rewritten;
                }

                kept.len()
            }
            _ => {
                debug!("{}: no package list at {}", self.path.display(), scope);
                return Ok(removed);
            }
        };

        if removed.is_empty() {
            return Ok(removed);
        }

        if remaining == 0 {
            self.cleanup_empty_parents(&segments);
        }

        self.manifest = parse_manifest(&self.path, &self.render())?;
        debug!(
            "{}: removed {} entries from {}",
            self.path.display(),
            removed.len(),
            scope
        );

        Ok(removed)
    }

    fn cleanup_empty_parents(&mut self, segments: &[String]) {
        for depth in (0..segments.len()).rev() {
            let key = &segments[depth];
            if Segment::parse(key).is_none_or(|segment| segment.is_select()) {
                return;
            }

            let root = outline::parse(&self.lines);
            let parent = if depth == 0 {
                Some(&root)
            } else {
                root.resolve(&segments[..depth])
            };

            let Some(entry) = parent.and_then(|parent| parent.entry(key)) else {
                return;
            };

            if !entry.value.is_empty() {
                return;
            }

            let span = entry.span;
            self.delete_lines(span);
        }
    }

    /// Deletes `span` along with the comment lines directly above it, then
    /// folds a doubled blank line left at the seam.
    ///
    /// A comment indented deeper than the span's first line is the tail of
    /// whatever precedes it, such as a `runs: |` script, and stays.
    fn delete_lines(&mut self, span: Span) {
        let indent = outline::indentation(&self.lines[span.start]);
        let mut start = span.start;
        while start > 0
            && outline::is_comment(&self.lines[start - 1])
            && outline::indentation(&self.lines[start - 1]) <= indent
        {
            start -= 1;
        }

        self.lines.drain(start..span.end);

        let blank_at = |idx: usize, lines: &[String]| {
            lines.get(idx).is_some_and(|line| outline::is_blank(line))
        };

        let seam_blank = start > 0 && blank_at(start - 1, &self.lines);
        if seam_blank && (blank_at(start, &self.lines) || start == self.lines.len()) {
            self.lines.remove(start - 1);
        }
    }

    /// Writes the document back to its path, applying `.yam.yaml` from the
    /// same directory when present.
    pub fn write(&self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut lines = self.lines.clone();
        match FormatStyle::load(dir) {
            Ok(Some(style)) => style.apply(&mut lines),
            Ok(None) => {}
            Err(err) => warn!("ignoring formatting style: {}", err),
        }

        fs::write(&self.path, render_lines(&lines, self.trailing_newline)).map_err(
            |source| TrimError::WriteFile {
                path: self.path.clone(),
                source,
            },
        )?;

        debug!("wrote {}", self.path.display());
        Ok(())
    }
}

fn parse_manifest(path: &Path, text: &str) -> Result<BuildManifest> {
    if text.trim().is_empty() {
        return Ok(BuildManifest::default());
    }

    // A document holding only comments deserializes to `None`.
    let manifest: Option<BuildManifest> =
        serde_yaml::from_str(text).map_err(|err| TrimError::Parse {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

    Ok(manifest.unwrap_or_default())
}

fn render_lines(lines: &[String], trailing_newline: bool) -> String {
    let mut text = lines.join("\n");
    if trailing_newline && !lines.is_empty() {
        text.push('\n');
    }
    text
}

fn collect_uses(steps: &[PipelineStep], uses: &mut Vec<String>) {
    for step in steps {
        if let Some(name) = &step.uses {
            uses.push(name.clone());
        }

        if let Some(nested) = &step.pipeline {
            collect_uses(nested, uses);
        }
    }
}
