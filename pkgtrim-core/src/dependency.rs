use pkgtrim_version::Constraint;

const VIRTUAL_PREFIXES: [&str; 3] = ["so:", "cmd:", "pc:"];

/// Extracts the bare package name from a dependency string such as
/// `foo>=1.0` or `@pinned:foo`.
///
/// Conflict markers (`!foo`) yield an empty string.
pub fn parse_dependency(dep: &str) -> String {
    if dep.starts_with('!') {
        return String::new();
    }

    let mut dep = dep;
    if dep.starts_with('@')
        && let Some(idx) = dep.find(':')
    {
        dep = &dep[idx + 1..];
    }

    provided_name(dep)
}

/// Name part of a provides or dependency entry, keeping virtual prefixes.
pub fn provided_name(entry: &str) -> String {
    match Constraint::parse(entry) {
        Ok(constraint) => constraint.name,
        Err(_) => entry
            .split(['=', '<', '>', '~', '@'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Whether `name` is a shared-library, command or pkg-config capability
/// rather than a concrete package.
pub fn is_virtual_provide(name: &str) -> bool {
    VIRTUAL_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dependency_names() {
        let cases = [
            ("foo", "foo"),
            ("foo=1.0", "foo"),
            ("foo>=1.0", "foo"),
            ("!foo", ""),
            ("@pinned:foo", "foo"),
            ("@pinned:foo>=1.0", "foo"),
            ("foo~1.2@edge", "foo"),
        ];

        for (input, want) in cases {
            assert_eq!(parse_dependency(input), want, "input {input}");
        }
    }

    #[test]
    fn detects_virtual_provides() {
        for name in [
            "so:libc.musl-x86_64.so.1",
            "so:libcrypto.so.3",
            "cmd:python3",
            "cmd:openssl",
            "pc:openssl",
            "pc:libpq",
        ] {
            assert!(is_virtual_provide(name), "{name} should be virtual");
        }

        for name in ["busybox", "go-1.21", "python-3.11", "openssl"] {
            assert!(!is_virtual_provide(name), "{name} should not be virtual");
        }
    }

    #[test]
    fn provided_name_keeps_virtual_prefix() {
        assert_eq!(provided_name("cmd:go=1.21.0-r0"), "cmd:go");
        assert_eq!(provided_name("openssl-libs"), "openssl-libs");
    }
}
