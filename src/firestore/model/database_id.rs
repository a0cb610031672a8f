use crate::app::FirebaseOptions;
use crate::firestore::constants::DEFAULT_DATABASE_ID;
use crate::firestore::error::{missing_project_id, FirestoreResult};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    project_id: String,
    database: String,
}

impl DatabaseId {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn default(project_id: impl Into<String>) -> Self {
        Self::new(project_id, DEFAULT_DATABASE_ID)
    }

    pub fn from_options(options: &FirebaseOptions) -> FirestoreResult<Self> {
        let project_id = options.project_id.clone().ok_or_else(missing_project_id)?;
        Ok(match options.database_id.as_deref() {
            Some(database) if !database.is_empty() => Self::new(project_id, database),
            _ => Self::default(project_id),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}
