use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::errors::{ExtractError, Result};
use std::path::{Path, PathBuf};

/// Read-only handle on a repository: its object database and refs
///
/// Dropping the handle releases every open pack file.
#[derive(Debug)]
pub struct Repository {
    git_dir: Box<Path>,
    database: Database,
    refs: Refs,
}

impl Repository {
    /// Open the repository at `path`
    ///
    /// `path` may be a working tree containing `.git`, a bare repository, or a
    /// linked worktree whose `.git` file points elsewhere.
    pub fn open(path: impl AsRef<Path>, verify_objects: bool) -> Result<Self> {
        let path = path.as_ref();
        let git_dir = Self::discover_git_dir(path)?;
        let common_dir = Self::common_dir(&git_dir)?;

        tracing::debug!(
            git_dir = %git_dir.display(),
            common_dir = %common_dir.display(),
            "opening repository"
        );

        let database = Database::open(common_dir.join("objects").into_boxed_path(), verify_objects)?;
        let refs = Refs::new(common_dir.into_boxed_path());

        Ok(Repository {
            git_dir: git_dir.into_boxed_path(),
            database,
            refs,
        })
    }

    fn discover_git_dir(path: &Path) -> Result<PathBuf> {
        let not_found = || ExtractError::RepositoryNotFound {
            path: path.to_path_buf(),
        };

        let dot_git = path.join(".git");
        if dot_git.is_dir() {
            return Ok(dot_git);
        }

        if dot_git.is_file() {
            let content =
                std::fs::read_to_string(&dot_git).map_err(|e| ExtractError::io(&dot_git, e))?;
            let target = content
                .lines()
                .find_map(|line| line.strip_prefix("gitdir:"))
                .map(str::trim)
                .ok_or_else(not_found)?;

            let target = path.join(target);
            return if Self::is_git_dir(&target) {
                Ok(target)
            } else {
                Err(not_found())
            };
        }

        if Self::is_git_dir(path) {
            return Ok(path.to_path_buf());
        }

        Err(not_found())
    }

    fn is_git_dir(path: &Path) -> bool {
        path.join("HEAD").is_file()
            && (path.join("objects").is_dir() || path.join("commondir").is_file())
    }

    /// Directory that holds objects and refs shared between worktrees
    fn common_dir(git_dir: &Path) -> Result<PathBuf> {
        let commondir_file = git_dir.join("commondir");
        if !commondir_file.is_file() {
            return Ok(git_dir.to_path_buf());
        }

        let content = std::fs::read_to_string(&commondir_file)
            .map_err(|e| ExtractError::io(&commondir_file, e))?;

        Ok(git_dir.join(content.trim()))
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }
}
