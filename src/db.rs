use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::PathBuf;

use crate::form::Draft;
use crate::models::{ApplicationStatus, Company, JobApplication, User, WorkType};

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn, path })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobtrack") {
            Ok(proj_dirs.data_dir().join("jobtrack.db"))
        } else {
            // Fallback to current directory
            Ok(PathBuf::from("jobtrack.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS job_applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                company_id INTEGER REFERENCES companies(id),
                position_title TEXT NOT NULL,
                application_date TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'applied' CHECK (status IN ('applied', 'screening', 'interview', 'offer', 'rejected', 'withdrawn')),
                location TEXT,
                work_type TEXT CHECK (work_type IN ('remote', 'hybrid', 'onsite')),
                salary_range TEXT,
                job_description TEXT,
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_companies_user ON companies(user_id);
            CREATE INDEX IF NOT EXISTS idx_applications_user ON job_applications(user_id);
            CREATE INDEX IF NOT EXISTS idx_applications_status ON job_applications(status);
            CREATE INDEX IF NOT EXISTS idx_applications_company ON job_applications(company_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='job_applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'jobtrack init' first."
            ));
        }
        Ok(())
    }

    // --- User operations ---

    pub fn create_user(&self, email: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO users (email) VALUES (?1)", [email])
            .with_context(|| format!("Failed to create account for {}", email))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_user(&self, email: &str) -> Result<Option<User>> {
        let result = self.conn.query_row(
            "SELECT id, email, created_at FROM users WHERE LOWER(email) = LOWER(?1)",
            [email],
            Self::row_to_user,
        );
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let result = self.conn.query_row(
            "SELECT id, email, created_at FROM users WHERE id = ?1",
            [id],
            Self::row_to_user,
        );
        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    // --- Company operations ---

    pub fn list_companies(&self, user_id: i64) -> Result<Vec<Company>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, created_at FROM companies
             WHERE user_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map([user_id], Self::row_to_company)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list companies")
    }

    pub fn find_company(&self, user_id: i64, name: &str) -> Result<Option<Company>> {
        let result = self.conn.query_row(
            "SELECT id, user_id, name, created_at FROM companies
             WHERE user_id = ?1 AND LOWER(name) = LOWER(?2)",
            params![user_id, name],
            Self::row_to_company,
        );
        match result {
            Ok(company) => Ok(Some(company)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn create_company(&self, user_id: i64, name: &str) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO companies (user_id, name) VALUES (?1, ?2)",
                params![user_id, name],
            )
            .with_context(|| format!("Failed to create company '{}'", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn row_to_company(row: &rusqlite::Row) -> rusqlite::Result<Company> {
        Ok(Company {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    // --- Application operations ---

    pub fn list_applications(&self, user_id: i64) -> Result<Vec<JobApplication>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.user_id, a.company_id, c.name, a.position_title,
                    a.application_date, a.status, a.location, a.work_type,
                    a.salary_range, a.job_description, a.notes, a.created_at
             FROM job_applications a
             LEFT JOIN companies c ON a.company_id = c.id
             WHERE a.user_id = ?1
             ORDER BY a.application_date DESC, a.id DESC",
        )?;
        let rows = stmt.query_map([user_id], Self::row_to_application)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list applications")
    }

    pub fn get_application(&self, user_id: i64, id: i64) -> Result<Option<JobApplication>> {
        let result = self.conn.query_row(
            "SELECT a.id, a.user_id, a.company_id, c.name, a.position_title,
                    a.application_date, a.status, a.location, a.work_type,
                    a.salary_range, a.job_description, a.notes, a.created_at
             FROM job_applications a
             LEFT JOIN companies c ON a.company_id = c.id
             WHERE a.user_id = ?1 AND a.id = ?2",
            params![user_id, id],
            Self::row_to_application,
        );
        match result {
            Ok(app) => Ok(Some(app)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a draft, creating its company first when one was named. Both
    /// inserts run in one transaction so a failed application insert does
    /// not leave behind a company with no application.
    pub fn submit_application(&self, user_id: i64, draft: &Draft) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;

        let company_id = match (draft.company_id, draft.new_company_name.trim()) {
            (Some(id), _) => Some(id),
            (None, "") => None,
            (None, name) => {
                tx.execute(
                    "INSERT INTO companies (user_id, name) VALUES (?1, ?2)",
                    params![user_id, name],
                )
                .with_context(|| format!("Failed to create company '{}'", name))?;
                Some(tx.last_insert_rowid())
            }
        };

        tx.execute(
            "INSERT INTO job_applications
                 (user_id, company_id, position_title, application_date, status,
                  location, work_type, salary_range, job_description, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user_id,
                company_id,
                draft.position_title,
                draft.application_date.format("%Y-%m-%d").to_string(),
                draft.status.as_str(),
                blank_to_null(&draft.location),
                draft.work_type.map(|w| w.as_str()),
                blank_to_null(&draft.salary_range),
                blank_to_null(&draft.job_description),
                blank_to_null(&draft.notes),
            ],
        )
        .context("Failed to save application")?;

        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<JobApplication> {
        let date_str: String = row.get(5)?;
        let application_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| conversion_err(5, e))?;
        let status_str: String = row.get(6)?;
        let status: ApplicationStatus = status_str.parse().map_err(|e| conversion_err(6, e))?;
        let work_type = row
            .get::<_, Option<String>>(8)?
            .map(|s| s.parse::<WorkType>())
            .transpose()
            .map_err(|e| conversion_err(8, e))?;

        Ok(JobApplication {
            id: row.get(0)?,
            user_id: row.get(1)?,
            company_id: row.get(2)?,
            company_name: row.get(3)?,
            position_title: row.get(4)?,
            application_date,
            status,
            location: row.get(7)?,
            work_type,
            salary_range: row.get(9)?,
            job_description: row.get(10)?,
            notes: row.get(11)?,
            created_at: row.get(12)?,
        })
    }
}

fn conversion_err(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, err.into())
}

/// Optional free-text form fields come through as empty strings; store NULL.
fn blank_to_null(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
