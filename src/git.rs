//! Consulta da revisão do plugin via libgit2.
//!
//! O [`GitRevisionSource`] abre o repositório do plugin e retorna o hash do
//! commit mais recente da branch atual ou de uma branch nomeada.

use git2::Repository;
use std::path::PathBuf;
use tracing::debug;

use crate::error::PackError;

/// Quantidade de caracteres hexadecimais usados no nome da versão.
pub const SHORT_REVISION_LEN: usize = 7;

/// Fonte do identificador de revisão do código empacotado.
pub trait RevisionSource {
    /// Retorna o hash completo do commit mais recente em `branch` (ou no HEAD).
    fn latest_revision(&self, branch: Option<&str>) -> Result<String, PackError>;
}

/// Lê revisões de um repositório git no disco.
pub struct GitRevisionSource {
    path: PathBuf,
}

impl GitRevisionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RevisionSource for GitRevisionSource {
    fn latest_revision(&self, branch: Option<&str>) -> Result<String, PackError> {
        let repo = Repository::open(&self.path)?;
        let commit = match branch {
            Some(name) => repo
                .find_branch(name, git2::BranchType::Local)?
                .get()
                .peel_to_commit()?,
            None => repo.head()?.peel_to_commit()?,
        };
        let id = commit.id().to_string();
        debug!(repo = %self.path.display(), ?branch, revision = %id, "resolved revision");
        Ok(id)
    }
}

/// Primeiros sete caracteres do hash.
pub fn short_revision(revision: &str) -> Result<String, PackError> {
    revision
        .get(..SHORT_REVISION_LEN)
        .map(str::to_string)
        .ok_or_else(|| PackError::ShortRevision(revision.to_string()))
}
