use std::env;

use crate::app::errors::{AppError, AppResult};

/// Environment variable holding the Firebase project identifier.
pub const PROJECT_ID_ENV: &str = "FIREBASE_PROJECT_ID";
/// Environment variable naming a non-default Firestore database.
pub const DATABASE_ID_ENV: &str = "FIRESTORE_DATABASE_ID";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseOptions {
    pub project_id: Option<String>,
    /// Firestore database name; `None` targets `(default)`.
    pub database_id: Option<String>,
}

impl FirebaseOptions {
    /// Reads the options from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds options from an arbitrary variable source, e.g. a parsed `.env` file.
    ///
    /// The project identifier is required. Blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let project_id = read(PROJECT_ID_ENV).ok_or_else(|| AppError::MissingEnvironment {
            variables: vec![PROJECT_ID_ENV.to_string()],
        })?;
        let database_id = read(DATABASE_ID_ENV);
        if let Some(database) = database_id.as_deref() {
            if database.contains('/') {
                return Err(AppError::InvalidOption {
                    option: DATABASE_ID_ENV.to_string(),
                    message: "database identifiers cannot contain '/'".to_string(),
                });
            }
        }
        Ok(Self {
            project_id: Some(project_id),
            database_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn reads_project_and_database() {
        let options = FirebaseOptions::from_lookup(lookup(&[
            (PROJECT_ID_ENV, "reactfire-nextjs"),
            (DATABASE_ID_ENV, "orders"),
        ]))
        .unwrap();
        assert_eq!(options.project_id.as_deref(), Some("reactfire-nextjs"));
        assert_eq!(options.database_id.as_deref(), Some("orders"));
    }

    #[test]
    fn blank_project_is_missing() {
        let err = FirebaseOptions::from_lookup(lookup(&[(PROJECT_ID_ENV, "  ")])).unwrap_err();
        assert_eq!(err.code_str(), "app/missing-environment");
        assert_eq!(err.to_string(), "Missing environment variables: FIREBASE_PROJECT_ID");
    }

    #[test]
    fn rejects_database_paths() {
        let err = FirebaseOptions::from_lookup(lookup(&[
            (PROJECT_ID_ENV, "p"),
            (DATABASE_ID_ENV, "projects/p/databases/x"),
        ]))
        .unwrap_err();
        assert_eq!(err.code_str(), "app/invalid-option");
    }
}
