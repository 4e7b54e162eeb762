//! Database models for project repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ProjectId;

/// A row from the `repositories` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Auto-increment row ID.
    pub id: i64,
    /// Owning project.
    pub project_id: ProjectId,
    /// Repository name, unique within the project.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Default branch name.
    pub default_branch: String,
    /// Whether the repository is private.
    pub private: bool,
    /// Identifier assigned by the Git gateway, once linked.
    pub remote_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl RepositoryRecord {
    /// Returns a patch that would restore this row's mutable fields.
    #[must_use]
    pub fn restoring_patch(&self) -> RepositoryPatch {
        RepositoryPatch {
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            default_branch: Some(self.default_branch.clone()),
            private: Some(self.private),
        }
    }
}

/// Values for a new `repositories` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRepository {
    /// Owning project.
    pub project_id: ProjectId,
    /// Repository name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Default branch name.
    pub default_branch: String,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
}

/// Partial update of a `repositories` row. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New default branch.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// New visibility.
    #[serde(default)]
    pub private: Option<bool>,
}

impl RepositoryPatch {
    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.default_branch.is_none()
            && self.private.is_none()
    }

    /// Applies the patch to `record` in place.
    pub fn apply_to(&self, record: &mut RepositoryRecord) {
        if let Some(name) = &self.name {
            record.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            record.description.clone_from(description);
        }
        if let Some(branch) = &self.default_branch {
            record.default_branch.clone_from(branch);
        }
        if let Some(private) = self.private {
            record.private = private;
        }
    }
}
