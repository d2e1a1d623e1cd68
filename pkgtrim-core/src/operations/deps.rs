use crate::index::{IndexRequest, IndexSource};
use crate::resolve::DependencyResolver;
use crate::{Result, TrimError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PackageReport {
    pub name: String,
    pub version: String,
    pub dependencies: Vec<String>,
    pub provides: Vec<String>,
    pub transitive: Vec<String>,
}

/// What `name` depends on, directly and transitively, in the indexes of
/// `request`.
pub fn describe(
    name: &str,
    request: &IndexRequest,
    source: &dyn IndexSource,
) -> Result<PackageReport> {
    let mut resolver = DependencyResolver::with_source(request, source)?;
    describe_with(name, &mut resolver)
}

pub fn describe_with(name: &str, resolver: &mut DependencyResolver) -> Result<PackageReport> {
    let Some(record) = resolver.index().get(name) else {
        return Err(TrimError::Configuration {
            reason: format!("package {} not found in the configured repositories", name),
        });
    };

    let version = record.version.clone();
    let dependencies = resolver.dependencies_of(name).to_vec();
    let provides = resolver.provides_of(name).to_vec();
    let transitive = resolver.transitive_closure_of(name).iter().cloned().collect();

    Ok(PackageReport {
        name: name.to_string(),
        version,
        dependencies,
        provides,
        transitive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{PackageRecord, RepositoryIndex};

    fn resolver() -> DependencyResolver {
        let mut curl = PackageRecord::new("curl", "8.8.0-r0");
        curl.dependencies = vec!["libcurl-openssl4".into(), "so:libc.musl-x86_64.so.1".into()];
        curl.provides = vec!["cmd:curl=8.8.0-r0".into()];

        let mut libcurl = PackageRecord::new("libcurl-openssl4", "8.8.0-r0");
        libcurl.dependencies = vec!["libcrypto3".into()];

        DependencyResolver::from_indexes(vec![RepositoryIndex {
            url: "https://example.test/os".into(),
            packages: vec![curl, libcurl, PackageRecord::new("libcrypto3", "3.3.0-r0")],
        }])
    }

    #[test]
    fn describes_known_package() {
        let mut resolver = resolver();
        let report = describe_with("curl", &mut resolver).unwrap();

        assert_eq!(report.version, "8.8.0-r0");
        assert_eq!(
            report.dependencies,
            vec!["libcurl-openssl4", "so:libc.musl-x86_64.so.1"]
        );
        assert_eq!(report.provides, vec!["cmd:curl=8.8.0-r0"]);
        assert_eq!(report.transitive, vec!["libcrypto3", "libcurl-openssl4"]);
    }

    #[test]
    fn unknown_package_is_an_error() {
        let mut resolver = resolver();
        let err = describe_with("nope", &mut resolver).unwrap_err();
        assert!(matches!(err, TrimError::Configuration { .. }));
    }
}
