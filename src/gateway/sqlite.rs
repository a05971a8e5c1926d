use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use tracing::warn;

use crate::error::AppError;
use crate::gateway::{DashboardGateway, ensure_own_rows};
use crate::models::{Completion, Course, Module, Profile, ProfilePatch, Theme};
use crate::session::Session;

/// Serves the same four resources from a SQLite database.
#[derive(Clone)]
pub struct SqliteGateway {
    db: SqlitePool,
}

impl SqliteGateway {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .map_err(|e| AppError::Database(e.into()))
    }

    pub async fn insert_course(&self, course: &Course) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO courses (id, title, description, category, icon, color) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.category)
        .bind(&course.icon)
        .bind(&course.color)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn insert_module(&self, module: &Module) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO modules (id, course_id, title, description, order_index, duration) VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(&module.id)
        .bind(&module.course_id)
        .bind(&module.title)
        .bind(&module.description)
        .bind(module.order_index)
        .bind(&module.duration)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO profiles
                (id, username, profile_photo, cover_image, tagline, theme,
                learning_mood, daily_journal, streak_days)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                profile_photo = excluded.profile_photo,
                cover_image = excluded.cover_image,
                tagline = excluded.tagline,
                theme = excluded.theme,
                learning_mood = excluded.learning_mood,
                daily_journal = excluded.daily_journal,
                streak_days = excluded.streak_days
            "#
        )
        .bind(&profile.id)
        .bind(&profile.username)
        .bind(&profile.profile_photo)
        .bind(&profile.cover_image)
        .bind(&profile.tagline)
        .bind(profile.theme.as_str())
        .bind(&profile.learning_mood)
        .bind(&profile.daily_journal)
        .bind(profile.streak_days)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

fn read_failure(what: &str, e: sqlx::Error) -> AppError {
    warn!("failed to read {}: {}", what, e);
    AppError::RemoteRead(what.to_string())
}

fn write_failure(what: &str, e: sqlx::Error) -> AppError {
    warn!("failed to write {}: {}", what, e);
    AppError::RemoteWrite(what.to_string())
}

fn profile_from_row(row: &SqliteRow) -> Result<Profile, sqlx::Error> {
    let theme: String = row.try_get("theme")?;
    let theme = theme.parse::<Theme>().map_err(|e| sqlx::Error::ColumnDecode {
        index: "theme".to_string(),
        source: e.into(),
    })?;

    Ok(Profile {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        profile_photo: row.try_get("profile_photo")?,
        cover_image: row.try_get("cover_image")?,
        tagline: row.try_get("tagline")?,
        theme,
        learning_mood: row.try_get("learning_mood")?,
        daily_journal: row.try_get("daily_journal")?,
        streak_days: row.try_get("streak_days")?,
    })
}

#[async_trait]
impl DashboardGateway for SqliteGateway {
    async fn fetch_courses(&self, _session: &Session) -> Result<Vec<Course>, AppError> {
        sqlx::query_as::<_, Course>(
            "SELECT id, title, description, category, icon, color FROM courses ORDER BY rowid"
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| read_failure("courses", e))
    }

    async fn fetch_modules(&self, _session: &Session) -> Result<Vec<Module>, AppError> {
        sqlx::query_as::<_, Module>(
            "SELECT id, course_id, title, description, order_index, duration FROM modules ORDER BY order_index ASC, rowid"
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| read_failure("modules", e))
    }

    async fn fetch_completions(&self, session: &Session) -> Result<Vec<Completion>, AppError> {
        sqlx::query_as::<_, Completion>(
            "SELECT user_id, module_id FROM completions WHERE user_id = ?"
        )
        .bind(&session.user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| read_failure("completions", e))
    }

    async fn insert_completions(&self, session: &Session, rows: &[Completion]) -> Result<(), AppError> {
        ensure_own_rows(session, rows)?;
        let mut tx = self.db.begin().await.map_err(|e| write_failure("completions", e))?;

        for row in rows {
            sqlx::query("INSERT INTO completions (user_id, module_id) VALUES (?, ?)")
                .bind(&row.user_id)
                .bind(&row.module_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| write_failure("completions", e))?;
        }

        tx.commit().await.map_err(|e| write_failure("completions", e))
    }

    async fn delete_completion(&self, session: &Session, module_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM completions WHERE user_id = ? AND module_id = ?")
            .bind(&session.user_id)
            .bind(module_id)
            .execute(&self.db)
            .await
            .map_err(|e| write_failure("completions", e))?;
        Ok(())
    }

    async fn fetch_profile(&self, session: &Session) -> Result<Option<Profile>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, profile_photo, cover_image, tagline, theme, learning_mood, daily_journal, streak_days FROM profiles WHERE id = ?"
        )
        .bind(&session.user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| read_failure("profile", e))?;

        row.as_ref()
            .map(profile_from_row)
            .transpose()
            .map_err(|e| read_failure("profile", e))
    }

    async fn update_profile(&self, session: &Session, patch: &ProfilePatch) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET tagline = COALESCE(?1, tagline),
                learning_mood = COALESCE(?2, learning_mood),
                daily_journal = COALESCE(?3, daily_journal),
                theme = COALESCE(?4, theme)
            WHERE id = ?5
            "#
        )
        .bind(&patch.tagline)
        .bind(&patch.learning_mood)
        .bind(&patch.daily_journal)
        .bind(patch.theme.map(|t| t.as_str()))
        .bind(&session.user_id)
        .execute(&self.db)
        .await
        .map_err(|e| write_failure("profile", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
