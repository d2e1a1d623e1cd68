use crate::index::normalize_arch;
use directories::BaseDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REPOSITORY: &str = "https://packages.wolfi.dev/os";

const RC_FILE: &str = ".pkgtrimrc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimConfig {
    /// Repository used when a manifest declares none.
    pub default_repository: String,
    pub arch: String,
    /// Extra pipeline definition directories, searched in order.
    pub pipeline_dirs: Vec<PathBuf>,
}

impl Default for TrimConfig {
    fn default() -> Self {
        TrimConfig {
            default_repository: DEFAULT_REPOSITORY.to_string(),
            arch: normalize_arch(env::consts::ARCH),
            pipeline_dirs: Vec::new(),
        }
    }
}

impl TrimConfig {
    pub fn from_env() -> Self {
        let mut config = TrimConfig::default();

        // 1) Global rc file in the user's home directory.
        if let Some(base) = BaseDirs::new() {
            config.apply_rc_file(&base.home_dir().join(RC_FILE));
        }

        // 2) Project rc file in the current working directory.
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        config.apply_rc_file(&cwd.join(RC_FILE));

        // 3) Environment wins over both.
        config.apply_env(|key| env::var(key).ok());

        config
    }

    fn apply_rc_file(&mut self, path: &Path) {
        if !path.is_file() {
            return;
        }

        if let Ok(data) = fs::read_to_string(path) {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            self.apply_rc(&data, base);
        }
    }

    /// Applies `key=value` lines. Relative pipeline directories are taken
    /// relative to `base`.
    pub fn apply_rc(&mut self, data: &str, base: &Path) {
        for line in data.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key {
                "repository" => {
                    self.default_repository = value.trim_end_matches('/').to_string();
                }
                "arch" => self.arch = normalize_arch(value),
                "pipeline-dir" => self.pipeline_dirs.push(base.join(value)),
                _ => {}
            }
        }
    }

    /// Applies `PKGTRIM_*` variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PKGTRIM_REPOSITORY") {
            let trimmed = value.trim().trim_end_matches('/');
            if !trimmed.is_empty() {
                self.default_repository = trimmed.to_string();
            }
        }

        if let Some(value) = lookup("PKGTRIM_ARCH") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.arch = normalize_arch(trimmed);
            }
        }

        if let Some(value) = lookup("PKGTRIM_PIPELINE_DIR") {
            for dir in value.split(':') {
                let dir = dir.trim();
                if !dir.is_empty() {
                    self.pipeline_dirs.push(PathBuf::from(dir));
                }
            }
        }
    }

    /// Applies command-line overrides.
    pub fn with_overrides(mut self, arch: Option<&str>, pipeline_dirs: &[PathBuf]) -> Self {
        if let Some(arch) = arch.map(str::trim).filter(|arch| !arch.is_empty()) {
            self.arch = normalize_arch(arch);
        }
        self.pipeline_dirs.extend(pipeline_dirs.iter().cloned());
        self
    }
}
