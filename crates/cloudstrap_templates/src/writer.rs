//! Writing the rendered definition to the provisioning working directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::TemplateResult;

/// File name of the generated definition inside the working directory.
pub const DEFINITION_FILE: &str = "main.tf";

/// Writes a rendered definition into a working directory.
pub struct DefinitionWriter {
    working_dir: PathBuf,
}

impl DefinitionWriter {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn definition_path(&self) -> PathBuf {
        self.working_dir.join(DEFINITION_FILE)
    }

    /// Create the working directory if needed and (over)write the definition.
    pub fn write(&self, definition: &str) -> TemplateResult<PathBuf> {
        fs::create_dir_all(&self.working_dir)?;
        let path = self.definition_path();
        fs::write(&path, definition)?;
        info!("Infrastructure definition written to {:?}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("terraform");

        let path = DefinitionWriter::new(&workdir).write("# definition").unwrap();

        assert_eq!(path, workdir.join("main.tf"));
        assert_eq!(fs::read_to_string(path).unwrap(), "# definition");
    }
}
