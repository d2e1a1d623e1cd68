/// One step of a scope path such as `subpackages[foo].dependencies.runtime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Key(&'a str),
    Select { base: &'a str, selector: &'a str },
}

impl<'a> Segment<'a> {
    /// `None` for a malformed selector like `foo]bar[`.
    pub fn parse(segment: &'a str) -> Option<Self> {
        let Some(open) = segment.find('[') else {
            return Some(Segment::Key(segment));
        };

        let close = segment.rfind(']')?;
        if close <= open {
            return None;
        }

        Some(Segment::Select {
            base: &segment[..open],
            selector: &segment[open + 1..close],
        })
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Segment::Select { .. })
    }
}

/// Splits on dots outside brackets, so template expressions inside a
/// subpackage selector stay whole.
pub fn split_path_preserving_brackets(path: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in path.chars() {
        match ch {
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            '.' if depth == 0 => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_paths() {
        let cases: [(&str, &[&str]); 5] = [
            (
                "environment.contents.packages",
                &["environment", "contents", "packages"],
            ),
            (
                "subpackages[foo].dependencies.runtime",
                &["subpackages[foo]", "dependencies", "runtime"],
            ),
            (
                "subpackages[${{package.name}}-foo].test.environment.contents.packages",
                &[
                    "subpackages[${{package.name}}-foo]",
                    "test",
                    "environment",
                    "contents",
                    "packages",
                ],
            ),
            ("pipeline", &["pipeline"]),
            ("", &[]),
        ];

        for (path, want) in cases {
            assert_eq!(split_path_preserving_brackets(path), want, "path {path}");
        }
    }

    #[test]
    fn parses_segments() {
        assert_eq!(Segment::parse("runtime"), Some(Segment::Key("runtime")));
        assert_eq!(
            Segment::parse("subpackages[${{package.name}}-dev]"),
            Some(Segment::Select {
                base: "subpackages",
                selector: "${{package.name}}-dev",
            })
        );
        assert_eq!(Segment::parse("broken]x["), None);
        assert!(Segment::parse("subpackages[0]").unwrap().is_select());
    }
}
