use std::path::{Path, PathBuf};

use shopfront_protocol::ArchiveName;

/// A generated or uploaded theme archive: where it lives and where it is
/// served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRef {
    name: ArchiveName,
    path: PathBuf,
}

impl ArchiveRef {
    /// Archive `name` stored directly inside `dir`.
    pub fn in_dir(dir: &Path, name: ArchiveName) -> Self {
        let path = dir.join(name.as_str());
        Self { name, path }
    }

    pub fn name(&self) -> &ArchiveName {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Public URL path (`/<name>`).
    pub fn url(&self) -> String {
        self.name.url_path()
    }
}
