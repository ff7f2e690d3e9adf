//! Language repository.

use super::types::Language;
use crate::db::{map_unique_violation, DbPool};
use crate::Result;

/// Repository for supported languages.
pub struct LanguageRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> LanguageRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Add a language.
    pub async fn create(&self, code: &str, name: &str) -> Result<Language> {
        let language = sqlx::query_as::<_, Language>(
            "INSERT INTO languages (code, name) VALUES (?, ?) RETURNING id, code, name",
        )
        .bind(code)
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, |_| format!("language {code} already exists")))?;

        Ok(language)
    }

    /// Look up a language by code.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Language>> {
        let language =
            sqlx::query_as::<_, Language>("SELECT id, code, name FROM languages WHERE code = ?")
                .bind(code)
                .fetch_optional(self.pool)
                .await?;

        Ok(language)
    }

    /// All languages, ordered by code.
    pub async fn list(&self) -> Result<Vec<Language>> {
        let languages =
            sqlx::query_as::<_, Language>("SELECT id, code, name FROM languages ORDER BY code")
                .fetch_all(self.pool)
                .await?;

        Ok(languages)
    }
}
