use crate::error::Result;
use crate::sphinx::{INPUT_FILE, STALE_EXTENSIONS, STALE_FILES, STRUCTURE_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory the solver runs in. Every per-sample file lives here.
#[derive(Debug, Clone)]
pub struct SolverWorkspace {
    dir: PathBuf,
}

impl SolverWorkspace {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Remove logs, restart files and results left by earlier runs.
    pub fn clean(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name();
            let name = name.to_string_lossy();
            let stale_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| STALE_EXTENSIONS.contains(&e));

            if stale_ext || STALE_FILES.contains(&name.as_ref()) {
                debug!("Removing stale {}", path.display());
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Copy the input template and the structure of the current tag in.
    pub fn stage_inputs(&self, input_template: &Path, structure: &Path) -> Result<()> {
        fs::copy(input_template, self.path(INPUT_FILE))?;
        fs::copy(structure, self.path(STRUCTURE_FILE))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_only_stale_files() {
        let dir = TempDir::new().unwrap();
        for name in [
            "energy.dat",
            "eps.dat",
            "waves.sxb",
            "output.sx",
            "forces.sx",
            "relaxHist.sx",
            "input.sx",
            "structure.sx",
            "notes.txt",
        ] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("old.dat")).unwrap();

        SolverWorkspace::new(dir.path()).clean().unwrap();

        let mut left: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["input.sx", "notes.txt", "old.dat", "structure.sx"]);
    }

    #[test]
    fn test_stage_inputs() {
        let dir = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("template.sx"), "format paw;").unwrap();
        fs::write(src.path().join("3_structure.sx"), "structure {}").unwrap();

        let ws = SolverWorkspace::new(dir.path());
        ws.stage_inputs(
            &src.path().join("template.sx"),
            &src.path().join("3_structure.sx"),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(ws.path(INPUT_FILE)).unwrap(), "format paw;");
        assert_eq!(
            fs::read_to_string(ws.path(STRUCTURE_FILE)).unwrap(),
            "structure {}"
        );
    }
}
