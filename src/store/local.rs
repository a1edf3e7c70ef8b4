//! The always-available local store: one SQLite database holding the business
//! records, the parent user table, and the outbox of pending operations.
//!
//! Co-locating the outbox with the data means a local mutation and its outbox
//! record share the same durability: they are committed or lost together on
//! crash, so no cross-store atomic protocol is needed.

use crate::error::Result;
use crate::record::{DailyProjectCount, Project, User};
use chrono::{Days, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    img TEXT,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    recorded_on TEXT NOT NULL,
    user_id INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS pending_operations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    payload TEXT,
    created_at TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    retry_count INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_pending_status ON pending_operations(status);
CREATE INDEX IF NOT EXISTS idx_pending_created ON pending_operations(created_at);
";

const PROJECT_COLUMNS: &str =
    "id, name, category, description, img, lat, lng, recorded_on, user_id";

pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(LocalStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(LocalStore {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        f(&conn).map_err(Into::into)
    }

    // --- users (parent entity; full user management lives elsewhere) ---

    pub fn insert_user(&self, user: &User) -> Result<User> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email) VALUES (?1, ?2)",
                params![user.username, user.email],
            )?;
            Ok(User {
                id: conn.last_insert_rowid(),
                username: user.username.clone(),
                email: user.email.clone(),
            })
        })
    }

    pub fn user_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT 1 FROM users WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
        })
    }

    // --- projects ---

    /// Insert a new project; the given `id` is ignored and the stored row's
    /// auto-assigned id is returned on the copy.
    pub fn insert_project(&self, project: &Project) -> Result<Project> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (name, category, description, img, lat, lng, recorded_on, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    project.name,
                    project.category,
                    project.description,
                    project.img,
                    project.lat,
                    project.lng,
                    project.recorded_on.to_string(),
                    project.user_id,
                ],
            )?;
            let mut stored = project.clone();
            stored.id = conn.last_insert_rowid();
            Ok(stored)
        })
    }

    /// Insert a record keeping its pre-assigned id, used when applying a
    /// remote record verbatim during reconciliation.
    pub fn insert_project_with_id(&self, project: &Project) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, name, category, description, img, lat, lng, recorded_on, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    project.id,
                    project.name,
                    project.category,
                    project.description,
                    project.img,
                    project.lat,
                    project.lng,
                    project.recorded_on.to_string(),
                    project.user_id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn update_project(&self, project: &Project) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE projects SET name = ?1, category = ?2, description = ?3, img = ?4,
                 lat = ?5, lng = ?6, recorded_on = ?7, user_id = ?8 WHERE id = ?9",
                params![
                    project.name,
                    project.category,
                    project.description,
                    project.img,
                    project.lat,
                    project.lng,
                    project.recorded_on.to_string(),
                    project.user_id,
                    project.id,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_project(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
                params![id],
                project_from_row,
            )
            .optional()
        })
    }

    pub fn project_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
        })
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.query_projects(
            &format!("SELECT {} FROM projects ORDER BY id", PROJECT_COLUMNS),
            params![],
        )
    }

    pub fn find_by_name(&self, name: &str) -> Result<Vec<Project>> {
        self.query_projects(
            &format!(
                "SELECT {} FROM projects WHERE name LIKE ?1 ORDER BY id",
                PROJECT_COLUMNS
            ),
            params![format!("%{}%", name)],
        )
    }

    pub fn find_by_category(&self, category: &str) -> Result<Vec<Project>> {
        self.query_projects(
            &format!(
                "SELECT {} FROM projects WHERE category = ?1 ORDER BY id",
                PROJECT_COLUMNS
            ),
            params![category],
        )
    }

    pub fn find_by_user(&self, user_id: i64) -> Result<Vec<Project>> {
        self.query_projects(
            &format!(
                "SELECT {} FROM projects WHERE user_id = ?1 ORDER BY id",
                PROJECT_COLUMNS
            ),
            params![user_id],
        )
    }

    pub fn find_by_date(&self, recorded_on: NaiveDate) -> Result<Vec<Project>> {
        self.query_projects(
            &format!(
                "SELECT {} FROM projects WHERE recorded_on = ?1 ORDER BY id",
                PROJECT_COLUMNS
            ),
            params![recorded_on.to_string()],
        )
    }

    pub fn count_by_user(&self, user_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM projects WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
        })
    }

    /// Per-day project counts for a user over the trailing `days`-day window
    /// ending today. Days without activity produce no row.
    pub fn project_stats(&self, user_id: i64, days: u32) -> Result<Vec<DailyProjectCount>> {
        let since = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MIN);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT recorded_on, COUNT(*) FROM projects
                 WHERE user_id = ?1 AND recorded_on >= ?2
                 GROUP BY recorded_on ORDER BY recorded_on",
            )?;
            let rows = stmt.query_map(params![user_id, since.to_string()], |row| {
                let date: String = row.get(0)?;
                let date = date.parse::<NaiveDate>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
                })?;
                Ok(DailyProjectCount {
                    date,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })?;
            rows.collect()
        })
    }

    fn query_projects(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Project>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params, project_from_row)?;
            rows.collect()
        })
    }
}

fn project_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let recorded_on: String = row.get(7)?;
    let recorded_on = recorded_on.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e))
    })?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        img: row.get(4)?,
        lat: row.get(5)?,
        lng: row.get(6)?,
        recorded_on,
        user_id: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project(user_id: i64) -> Project {
        Project {
            id: 0,
            name: "Bridge survey".to_string(),
            category: "topography".to_string(),
            description: "North span".to_string(),
            img: None,
            lat: 16.75,
            lng: -93.12,
            recorded_on: "2025-03-14".parse().unwrap(),
            user_id,
        }
    }

    fn store_with_user() -> (LocalStore, i64) {
        let store = LocalStore::open_in_memory().unwrap();
        let user = store
            .insert_user(&User {
                id: 0,
                username: "ana".to_string(),
                email: "ana@example.com".to_string(),
            })
            .unwrap();
        (store, user.id)
    }

    #[test]
    fn test_insert_assigns_id() {
        let (store, user_id) = store_with_user();
        let a = store.insert_project(&sample_project(user_id)).unwrap();
        let b = store.insert_project(&sample_project(user_id)).unwrap();
        assert!(a.id > 0);
        assert_eq!(b.id, a.id + 1);
    }

    #[test]
    fn test_roundtrip_and_update() {
        let (store, user_id) = store_with_user();
        let mut stored = store.insert_project(&sample_project(user_id)).unwrap();
        assert_eq!(store.get_project(stored.id).unwrap().unwrap(), stored);

        stored.img = Some("https://cdn.example.com/p1.webp".to_string());
        stored.description = "North span, revised".to_string();
        store.update_project(&stored).unwrap();
        assert_eq!(store.get_project(stored.id).unwrap().unwrap(), stored);
    }

    #[test]
    fn test_insert_with_id_keeps_id() {
        let (store, user_id) = store_with_user();
        let mut project = sample_project(user_id);
        project.id = 42;
        store.insert_project_with_id(&project).unwrap();
        assert_eq!(store.get_project(42).unwrap().unwrap(), project);
        // the sequence continues past the explicit id
        let next = store.insert_project(&sample_project(user_id)).unwrap();
        assert!(next.id > 42);
    }

    #[test]
    fn test_delete() {
        let (store, user_id) = store_with_user();
        let stored = store.insert_project(&sample_project(user_id)).unwrap();
        store.delete_project(stored.id).unwrap();
        assert!(store.get_project(stored.id).unwrap().is_none());
        assert!(!store.project_exists(stored.id).unwrap());
    }

    #[test]
    fn test_finders() {
        let (store, user_id) = store_with_user();
        let mut p = sample_project(user_id);
        p.name = "Dam inspection".to_string();
        p.category = "hydrology".to_string();
        store.insert_project(&p).unwrap();
        store.insert_project(&sample_project(user_id)).unwrap();

        assert_eq!(store.find_by_name("inspection").unwrap().len(), 1);
        assert_eq!(store.find_by_name("survey").unwrap().len(), 1);
        assert_eq!(store.find_by_category("hydrology").unwrap().len(), 1);
        assert_eq!(store.find_by_user(user_id).unwrap().len(), 2);
        assert_eq!(
            store
                .find_by_date("2025-03-14".parse().unwrap())
                .unwrap()
                .len(),
            2
        );
        assert_eq!(store.count_by_user(user_id).unwrap(), 2);
        assert_eq!(store.count_by_user(user_id + 1).unwrap(), 0);
    }

    #[test]
    fn test_project_stats_window() {
        let (store, user_id) = store_with_user();
        let today = Utc::now().date_naive();

        let mut p = sample_project(user_id);
        p.recorded_on = today;
        store.insert_project(&p).unwrap();
        store.insert_project(&p).unwrap();
        p.recorded_on = today.checked_sub_days(Days::new(2)).unwrap();
        store.insert_project(&p).unwrap();
        // outside a 7-day window
        p.recorded_on = today.checked_sub_days(Days::new(30)).unwrap();
        store.insert_project(&p).unwrap();

        let daily = store.project_stats(user_id, 7).unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, today.checked_sub_days(Days::new(2)).unwrap());
        assert_eq!(daily[0].count, 1);
        assert_eq!(daily[1].date, today);
        assert_eq!(daily[1].count, 2);

        // widening the window picks up the old record
        let daily = store.project_stats(user_id, 60).unwrap();
        assert_eq!(daily.len(), 3);

        assert!(store.project_stats(user_id + 1, 7).unwrap().is_empty());
    }

    #[test]
    fn test_user_exists() {
        let (store, user_id) = store_with_user();
        assert!(store.user_exists(user_id).unwrap());
        assert!(!store.user_exists(user_id + 99).unwrap());
    }
}
