use serde::Deserialize;

/// The parts of a build manifest that package analysis reads.
///
/// Scalars are deserialized as strings so they keep their source text:
/// `- 3.10` stays `3.10` rather than becoming a float.
#[derive(Debug, Default, Deserialize)]
pub struct BuildManifest {
    pub package: Option<Package>,
    pub environment: Option<Environment>,
    pub test: Option<TestSection>,
    pub subpackages: Option<Vec<Subpackage>>,
    pub pipeline: Option<Vec<PipelineStep>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Package {
    pub dependencies: Option<Dependencies>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Dependencies {
    pub runtime: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Environment {
    pub contents: Option<Contents>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Contents {
    pub packages: Option<Vec<String>>,
    pub repositories: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestSection {
    pub environment: Option<Environment>,
    pub pipeline: Option<Vec<PipelineStep>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Subpackage {
    pub name: Option<String>,
    pub dependencies: Option<Dependencies>,
    pub test: Option<TestSection>,
    pub pipeline: Option<Vec<PipelineStep>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PipelineStep {
    pub uses: Option<String>,
    pub pipeline: Option<Vec<PipelineStep>>,
}

impl Environment {
    pub fn packages(&self) -> Option<&Vec<String>> {
        self.contents.as_ref()?.packages.as_ref()
    }

    pub fn repositories(&self) -> Option<&Vec<String>> {
        self.contents.as_ref()?.repositories.as_ref()
    }
}

impl Dependencies {
    pub fn runtime(&self) -> Option<&Vec<String>> {
        self.runtime.as_ref()
    }
}

impl TestSection {
    pub fn packages(&self) -> Option<&Vec<String>> {
        self.environment.as_ref()?.packages()
    }
}
