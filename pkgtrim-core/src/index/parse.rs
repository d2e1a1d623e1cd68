use super::PackageRecord;
use tracing::debug;

/// Parses the text of an `APKINDEX` file.
///
/// Records are separated by blank lines and every line is `X:value`.
/// Records missing a name or version are skipped.
pub fn parse_apkindex(text: &str) -> Vec<PackageRecord> {
    let mut packages = Vec::new();
    let mut current = RecordBuilder::default();

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if let Some(record) = current.finish() {
                packages.push(record);
            }
            current = RecordBuilder::default();
            continue;
        }

        let Some((field, value)) = line.split_once(':') else {
            continue;
        };

        match field {
            "P" => current.name = Some(value.to_string()),
            "V" => current.version = Some(value.to_string()),
            "A" => current.arch = Some(value.to_string()),
            "o" => current.origin = Some(value.to_string()),
            "D" => current.dependencies = split_list(value),
            "p" => current.provides = split_list(value),
            _ => {}
        }
    }

    if let Some(record) = current.finish() {
        packages.push(record);
    }

    packages
}

fn split_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

#[derive(Default)]
struct RecordBuilder {
    name: Option<String>,
    version: Option<String>,
    arch: Option<String>,
    origin: Option<String>,
    dependencies: Vec<String>,
    provides: Vec<String>,
}

impl RecordBuilder {
    fn finish(self) -> Option<PackageRecord> {
        match (self.name, self.version) {
            (Some(name), Some(version)) => Some(PackageRecord {
                name,
                version,
                arch: self.arch,
                origin: self.origin,
                dependencies: self.dependencies,
                provides: self.provides,
            }),
            (name, version) => {
                if name.is_some() || version.is_some() {
                    debug!(?name, ?version, "skipping incomplete index record");
                }
                None
            }
        }
    }
}
