use std::fmt;
use std::path::{Path, PathBuf};

pub(crate) mod pylock;
pub(crate) mod requirements;
pub(crate) mod selection;

pub use pylock::{render_pylock, PYLOCK_VERSION};
pub use requirements::render_requirements;
pub use selection::{select_packages, ExportSelection, FilteredPackage};

pub const CREATED_BY: &str = "plx";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Requirements,
    Pylock,
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Requirements => "requirements.txt",
            Self::Pylock => "pylock.toml",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "requirements.txt" => Some(Self::Requirements),
            "pylock.toml" => Some(Self::Pylock),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Where the export runs: paths recorded relative to the lock resolve
/// against its directory, and absolute paths inside the destination
/// directory are written relative to it.
#[derive(Clone, Debug)]
pub struct ExportContext {
    pub lock_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ExportContext {
    pub fn new(lock_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub(crate) fn resolve_path(&self, raw: &str) -> String {
        let path = Path::new(raw);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.lock_dir.join(path)
        };
        let rendered = match absolute.strip_prefix(&self.output_dir) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => absolute,
        };
        rendered.to_string_lossy().replace('\\', "/")
    }
}
