pub mod deps;
pub mod pipelines;
pub mod trim;

use pkgtrim_core::console;
use pkgtrim_core::pipelines::{PipelineCatalog, load_catalog};
use std::path::PathBuf;

/// Embedded pipelines plus the configured local directories.
pub(crate) fn pipeline_catalog(dirs: &[PathBuf]) -> pkgtrim_core::Result<PipelineCatalog> {
    for dir in dirs.iter().filter(|dir| !dir.is_dir()) {
        console::warn(&format!(
            "pipeline directory {} does not exist",
            dir.display()
        ));
    }

    load_catalog(dirs)
}
