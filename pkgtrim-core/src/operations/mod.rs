pub mod deps;
pub mod trim;

pub use deps::{PackageReport, describe};
pub use trim::{ReportEntry, TrimOptions, TrimReport, Trimmer, trim};
