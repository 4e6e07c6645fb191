use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _)
        if e.code == rusqlite::ErrorCode::ConstraintViolation)
}

const ACTIVITY_SELECT: &str = "SELECT a.id, a.kind, a.created_at, a.updated_at,
        u.id, u.email, u.name, u.image, u.role,
        gh.id, gh.email, gh.host_activity_id
 FROM activities a
 LEFT JOIN users u ON u.activity_id = a.id
 LEFT JOIN ghosts gh ON gh.activity_id = a.id";

struct ActivityRow {
    id: String,
    kind: String,
    created_at: String,
    updated_at: String,
    user: Option<(String, String, Option<String>, Option<String>, String)>,
    ghost: Option<(String, String, String)>,
}

fn activity_from_row(row: &rusqlite::Row) -> rusqlite::Result<ActivityRow> {
    let user = match row.get::<_, Option<String>>(4)? {
        Some(id) => Some((
            id,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
        )),
        None => None,
    };
    let ghost = match row.get::<_, Option<String>>(9)? {
        Some(id) => Some((id, row.get(10)?, row.get(11)?)),
        None => None,
    };
    Ok(ActivityRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        created_at: row.get::<_, String>(2)?,
        updated_at: row.get::<_, String>(3)?,
        user,
        ghost,
    })
}

/// Assembles the tagged actor from an activity row and its satellite.
/// A row whose kind does not match any satellite is treated as absent;
/// the schema and the single-transaction writers make this unreachable.
fn assemble_activity(row: ActivityRow) -> Option<Activity> {
    let actor = match row.kind.as_str() {
        "USER" => {
            let (id, email, name, image, role) = row.user?;
            let role = Role::parse(&role).unwrap_or_else(|| {
                tracing::error!("Invalid role in database for user {}: '{}'", id, role);
                Role::User
            });
            Actor::User(User {
                id,
                email,
                name,
                image,
                role,
            })
        }
        "GHOST" => {
            let (id, email, host_id) = row.ghost?;
            Actor::Ghost(Ghost { id, email, host_id })
        }
        other => {
            tracing::error!("Invalid actor kind in database: '{}'", other);
            return None;
        }
    };

    Some(Activity {
        id: row.id,
        created_at: parse_datetime(&row.created_at),
        updated_at: parse_datetime(&row.updated_at),
        actor,
    })
}

const GOAL_SELECT: &str = "SELECT g.id, g.project_id, g.title, g.description,
        g.owner_activity_id, g.issuer_activity_id, g.state_id, g.priority,
        g.estimate, g.is_key, g.personal, g.private, g.archived,
        g.created_at, g.updated_at
 FROM goals g";

fn goal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        owner_id: row.get(4)?,
        issuer_id: row.get(5)?,
        state_id: row.get(6)?,
        priority: row.get(7)?,
        estimate: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
        is_key: row.get(9)?,
        personal: row.get(10)?,
        private: row.get(11)?,
        archived: row.get(12)?,
        created_at: parse_datetime(&row.get::<_, String>(13)?),
        updated_at: parse_datetime(&row.get::<_, String>(14)?),
    })
}

fn project_from_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        key: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        flow_id: row.get(4)?,
        owner_id: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const PROJECT_COLS: &str =
    "id, key, title, description, flow_id, owner_activity_id, created_at, updated_at";

fn team_from_row(row: &rusqlite::Row) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        owner_id: row.get(3)?,
        parent_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const TEAM_COLS: &str =
    "id, title, description, owner_activity_id, parent_id, created_at, updated_at";

/// (membership table, target column) for a watcher or stargizer set.
fn membership_table(kind: TargetKind, star: bool) -> (&'static str, &'static str) {
    match (kind, star) {
        (TargetKind::Goal, false) => ("goal_watchers", "goal_id"),
        (TargetKind::Goal, true) => ("goal_stargizers", "goal_id"),
        (TargetKind::Project, false) => ("project_watchers", "project_id"),
        (TargetKind::Project, true) => ("project_stargizers", "project_id"),
        (TargetKind::Team, false) => ("team_watchers", "team_id"),
        (TargetKind::Team, true) => ("team_stargizers", "team_id"),
    }
}

fn target_table(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Goal => "goals",
        TargetKind::Project => "projects",
        TargetKind::Team => "teams",
    }
}

fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE id = ?1"),
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

impl SqliteStore {
    fn set_membership(
        &self,
        kind: TargetKind,
        star: bool,
        target_id: &str,
        activity_id: &str,
        desired: bool,
    ) -> Result<()> {
        let (table, column) = membership_table(kind, star);

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !exists(&tx, target_table(kind), target_id)? {
            return Err(Error::NotFound);
        }
        if !exists(&tx, "activities", activity_id)? {
            return Err(Error::NotFound);
        }

        if desired {
            tx.execute(
                &format!("INSERT OR IGNORE INTO {table} ({column}, activity_id) VALUES (?1, ?2)"),
                params![target_id, activity_id],
            )?;
        } else {
            tx.execute(
                &format!("DELETE FROM {table} WHERE {column} = ?1 AND activity_id = ?2"),
                params![target_id, activity_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_membership(
        &self,
        kind: TargetKind,
        star: bool,
        target_id: &str,
    ) -> Result<Vec<Activity>> {
        let (table, column) = membership_table(kind, star);
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{ACTIVITY_SELECT} JOIN {table} m ON m.activity_id = a.id
             WHERE m.{column} = ?1 ORDER BY a.created_at, a.id"
        ))?;

        let rows = stmt.query_map(params![target_id], activity_from_row)?;
        let raw = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raw.into_iter().filter_map(assemble_activity).collect())
    }

    fn goals_by_relation(
        &self,
        conn: &Connection,
        id: &str,
        kind: StoredKind,
        inbound: bool,
    ) -> Result<Vec<Goal>> {
        let sql = match (kind, inbound) {
            // goals this goal blocks: rows (blocks, id, other)
            (StoredKind::Blocks, false) => format!(
                "{GOAL_SELECT} JOIN goal_relations r ON r.b_id = g.id
                 WHERE r.kind = 'blocks' AND r.a_id = ?1 ORDER BY g.id"
            ),
            // goals this goal depends on: rows (blocks, other, id)
            (StoredKind::Blocks, true) => format!(
                "{GOAL_SELECT} JOIN goal_relations r ON r.a_id = g.id
                 WHERE r.kind = 'blocks' AND r.b_id = ?1 ORDER BY g.id"
            ),
            (symmetric, _) => format!(
                "{GOAL_SELECT} JOIN goal_relations r
                    ON g.id = CASE WHEN r.a_id = ?1 THEN r.b_id ELSE r.a_id END
                 WHERE r.kind = '{}' AND (r.a_id = ?1 OR r.b_id = ?1) ORDER BY g.id",
                symmetric.as_str()
            ),
        };

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![id], goal_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // Activity operations

    fn create_activity(&self, activity: &Activity) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let email = activity.email();
        let taken: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM users WHERE email = ?1
                 UNION SELECT 1 FROM ghosts WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(Error::Conflict(format!("email '{email}' is already in use")));
        }

        tx.execute(
            "INSERT INTO activities (id, kind, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                activity.id,
                activity.kind().as_str(),
                format_datetime(&activity.created_at),
                format_datetime(&activity.updated_at),
            ],
        )?;

        match &activity.actor {
            Actor::User(user) => {
                tx.execute(
                    "INSERT INTO users (id, activity_id, email, name, image, role)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        user.id,
                        activity.id,
                        user.email,
                        user.name,
                        user.image,
                        user.role.as_str(),
                    ],
                )?;
            }
            Actor::Ghost(ghost) => {
                tx.execute(
                    "INSERT INTO ghosts (id, activity_id, email, host_activity_id)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![ghost.id, activity.id, ghost.email, ghost.host_id],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_activity(&self, id: &str) -> Result<Option<Activity>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("{ACTIVITY_SELECT} WHERE a.id = ?1"),
                params![id],
                activity_from_row,
            )
            .optional()?;
        Ok(row.and_then(assemble_activity))
    }

    fn get_activity_by_email(&self, email: &str) -> Result<Option<Activity>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                &format!("{ACTIVITY_SELECT} WHERE u.email = ?1 OR gh.email = ?1"),
                params![email],
                activity_from_row,
            )
            .optional()?;
        Ok(row.and_then(assemble_activity))
    }

    fn find_activities(
        &self,
        query: &str,
        kind: Option<ActorKind>,
        sort: SortOrder,
    ) -> Result<Vec<Activity>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "{ACTIVITY_SELECT}
             WHERE (LOWER(COALESCE(u.name, '')) LIKE ?1
                 OR LOWER(COALESCE(u.email, gh.email)) LIKE ?1)"
        );
        if let Some(kind) = kind {
            sql.push_str(&format!(" AND a.kind = '{}'", kind.as_str()));
        }
        sql.push_str(&format!(" ORDER BY a.created_at {}, a.id", sort.as_sql()));

        let pattern = format!("%{}%", query.to_lowercase());
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern], activity_from_row)?;
        let raw = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raw.into_iter().filter_map(assemble_activity).collect())
    }

    fn promote_ghost(&self, activity_id: &str, user: &User) -> Result<Activity> {
        {
            let mut conn = self.conn();
            let tx = conn.transaction()?;

            let kind: Option<String> = tx
                .query_row(
                    "SELECT kind FROM activities WHERE id = ?1",
                    params![activity_id],
                    |row| row.get(0),
                )
                .optional()?;

            match kind.as_deref() {
                None => return Err(Error::NotFound),
                Some("GHOST") => {}
                Some(_) => {
                    return Err(Error::Conflict(
                        "activity is already a registered user".to_string(),
                    ));
                }
            }

            tx.execute("DELETE FROM ghosts WHERE activity_id = ?1", params![activity_id])?;
            tx.execute(
                "INSERT INTO users (id, activity_id, email, name, image, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id,
                    activity_id,
                    user.email,
                    user.name,
                    user.image,
                    user.role.as_str(),
                ],
            )?;
            tx.execute(
                "UPDATE activities SET kind = 'USER', updated_at = ?1 WHERE id = ?2",
                params![format_datetime(&Utc::now()), activity_id],
            )?;

            tx.commit()?;
        }

        self.get_activity(activity_id)?.ok_or(Error::NotFound)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (id, token_hash, token_lookup, is_admin, activity_id,
                                   created_at, expires_at, last_used_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id,
                session.token_hash,
                session.token_lookup,
                session.is_admin,
                session.activity_id,
                format_datetime(&session.created_at),
                session.expires_at.as_ref().map(format_datetime),
                session.last_used_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, activity_id,
                    created_at, expires_at, last_used_at
             FROM sessions WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    is_admin: row.get(3)?,
                    activity_id: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                    expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, activity_id,
                    created_at, expires_at, last_used_at
             FROM sessions ORDER BY created_at, id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Session {
                id: row.get(0)?,
                token_hash: row.get(1)?,
                token_lookup: row.get(2)?,
                is_admin: row.get(3)?,
                activity_id: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_session_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_session(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM sessions WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Flow operations

    fn create_flow(&self, flow: &Flow, states: &[State]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO flows (id, title, created_at) VALUES (?1, ?2, ?3)",
            params![flow.id, flow.title, format_datetime(&flow.created_at)],
        )?;
        for state in states {
            tx.execute(
                "INSERT INTO states (id, flow_id, title, position, terminal)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![state.id, flow.id, state.title, state.position, state.terminal],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict(format!("duplicate state '{}' in flow", state.title))
                } else {
                    Error::from(e)
                }
            })?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_flow(&self, id: &str) -> Result<Option<Flow>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, title, created_at FROM flows WHERE id = ?1",
            params![id],
            |row| {
                Ok(Flow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_flows(&self) -> Result<Vec<Flow>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT id, title, created_at FROM flows ORDER BY created_at, id")?;

        let rows = stmt.query_map([], |row| {
            Ok(Flow {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_flow_states(&self, flow_id: &str) -> Result<Vec<State>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, flow_id, title, position, terminal
             FROM states WHERE flow_id = ?1 ORDER BY position",
        )?;

        let rows = stmt.query_map(params![flow_id], |row| {
            Ok(State {
                id: row.get(0)?,
                flow_id: row.get(1)?,
                title: row.get(2)?,
                position: row.get(3)?,
                terminal: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_state(&self, id: &str) -> Result<Option<State>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, flow_id, title, position, terminal FROM states WHERE id = ?1",
            params![id],
            |row| {
                Ok(State {
                    id: row.get(0)?,
                    flow_id: row.get(1)?,
                    title: row.get(2)?,
                    position: row.get(3)?,
                    terminal: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Tag operations

    fn create_tag(&self, tag: &Tag) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tags (id, title, created_at) VALUES (?1, ?2, ?3)",
                params![tag.id, tag.title, format_datetime(&tag.created_at)],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict(format!("tag '{}' already exists", tag.title))
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_tag(&self, id: &str) -> Result<Option<Tag>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, title, created_at FROM tags WHERE id = ?1",
            params![id],
            |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, title, created_at FROM tags ORDER BY title")?;

        let rows = stmt.query_map([], |row| {
            Ok(Tag {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Project operations

    fn create_project(&self, project: &Project) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO projects (id, key, title, description, flow_id,
                                       owner_activity_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    project.id,
                    project.key,
                    project.title,
                    project.description,
                    project.flow_id,
                    project.owner_id,
                    format_datetime(&project.created_at),
                    format_datetime(&project.updated_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict(format!("project key '{}' already exists", project.key))
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_project_by_key(&self, key: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLS} FROM projects WHERE key = ?1"),
            params![key],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLS} FROM projects ORDER BY created_at, id"
        ))?;

        let rows = stmt.query_map([], project_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_project(&self, project: &Project) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE projects SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                project.title,
                project.description,
                format_datetime(&Utc::now()),
                project.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_project(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Team operations

    fn create_team(&self, team: &Team) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if let Some(parent_id) = &team.parent_id {
            if !exists(&tx, "teams", parent_id)? {
                return Err(Error::NotFound);
            }
        }

        tx.execute(
            "INSERT INTO teams (id, title, description, owner_activity_id, parent_id,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                team.id,
                team.title,
                team.description,
                team.owner_id,
                team.parent_id,
                format_datetime(&team.created_at),
                format_datetime(&team.updated_at),
            ],
        )?;

        // The creator starts out watching their own team
        tx.execute(
            "INSERT OR IGNORE INTO team_watchers (team_id, activity_id) VALUES (?1, ?2)",
            params![team.id, team.owner_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_team(&self, id: &str) -> Result<Option<Team>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TEAM_COLS} FROM teams WHERE id = ?1"),
            params![id],
            team_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEAM_COLS} FROM teams ORDER BY created_at, id"
        ))?;

        let rows = stmt.query_map([], team_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_team_children(&self, id: &str) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEAM_COLS} FROM teams WHERE parent_id = ?1 ORDER BY created_at, id"
        ))?;

        let rows = stmt.query_map(params![id], team_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_team(&self, team: &Team) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE teams SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                team.title,
                team.description,
                format_datetime(&Utc::now()),
                team.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_team_parent(&self, id: &str, parent_id: Option<&str>) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !exists(&tx, "teams", id)? {
            return Err(Error::NotFound);
        }

        if let Some(parent_id) = parent_id {
            if !exists(&tx, "teams", parent_id)? {
                return Err(Error::NotFound);
            }

            // Walk up from the new parent; reaching the team itself would
            // turn the forest into a cycle.
            let mut cursor = Some(parent_id.to_string());
            while let Some(current) = cursor {
                if current == id {
                    return Err(Error::InvalidRelation(
                        "a team cannot be its own ancestor".to_string(),
                    ));
                }
                cursor = tx
                    .query_row(
                        "SELECT parent_id FROM teams WHERE id = ?1",
                        params![current],
                        |row| row.get(0),
                    )
                    .optional()?
                    .flatten();
            }
        }

        tx.execute(
            "UPDATE teams SET parent_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![parent_id, format_datetime(&Utc::now()), id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn delete_team(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM teams WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Team-Project M2M operations

    fn add_team_project(&self, team_id: &str, project_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !exists(&tx, "teams", team_id)? || !exists(&tx, "projects", project_id)? {
            return Err(Error::NotFound);
        }

        tx.execute(
            "INSERT INTO team_projects (team_id, project_id) VALUES (?1, ?2)",
            params![team_id, project_id],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("project is already on the team".to_string())
            } else {
                Error::from(e)
            }
        })?;

        tx.commit()?;
        Ok(())
    }

    fn remove_team_project(&self, team_id: &str, project_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM team_projects WHERE team_id = ?1 AND project_id = ?2",
            params![team_id, project_id],
        )?;
        Ok(rows > 0)
    }

    fn list_team_projects(&self, team_id: &str) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.key, p.title, p.description, p.flow_id,
                    p.owner_activity_id, p.created_at, p.updated_at
             FROM projects p
             JOIN team_projects tp ON tp.project_id = p.id
             WHERE tp.team_id = ?1 ORDER BY p.key",
        )?;

        let rows = stmt.query_map(params![team_id], project_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Goal operations

    fn create_goal(&self, goal: &Goal, tags: &[String], participants: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !exists(&tx, "projects", &goal.project_id)? {
            return Err(Error::NotFound);
        }

        tx.execute(
            "INSERT INTO goals (id, project_id, title, description, owner_activity_id,
                                issuer_activity_id, state_id, priority, estimate,
                                is_key, personal, private, archived, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                goal.id,
                goal.project_id,
                goal.title,
                goal.description,
                goal.owner_id,
                goal.issuer_id,
                goal.state_id,
                goal.priority,
                goal.estimate.as_ref().map(format_datetime),
                goal.is_key,
                goal.personal,
                goal.private,
                goal.archived,
                format_datetime(&goal.created_at),
                format_datetime(&goal.updated_at),
            ],
        )?;

        for tag_id in tags {
            if !exists(&tx, "tags", tag_id)? {
                return Err(Error::NotFound);
            }
            tx.execute(
                "INSERT OR IGNORE INTO goal_tags (goal_id, tag_id) VALUES (?1, ?2)",
                params![goal.id, tag_id],
            )?;
        }

        for activity_id in participants {
            if !exists(&tx, "activities", activity_id)? {
                return Err(Error::NotFound);
            }
            tx.execute(
                "INSERT OR IGNORE INTO goal_participants (goal_id, activity_id) VALUES (?1, ?2)",
                params![goal.id, activity_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn get_goal(&self, id: &str) -> Result<Option<Goal>> {
        let conn = self.conn();
        conn.query_row(
            &format!("{GOAL_SELECT} WHERE g.id = ?1"),
            params![id],
            goal_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_goal(&self, goal: &Goal) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE goals SET title = ?1, description = ?2, owner_activity_id = ?3,
                              priority = ?4, estimate = ?5, is_key = ?6, personal = ?7,
                              private = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                goal.title,
                goal.description,
                goal.owner_id,
                goal.priority,
                goal.estimate.as_ref().map(format_datetime),
                goal.is_key,
                goal.personal,
                goal.private,
                format_datetime(&Utc::now()),
                goal.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_goal_state(&self, goal_id: &str, state_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let flow_id: Option<String> = tx
            .query_row(
                "SELECT p.flow_id FROM goals g JOIN projects p ON p.id = g.project_id
                 WHERE g.id = ?1",
                params![goal_id],
                |row| row.get(0),
            )
            .optional()?;
        let flow_id = flow_id.ok_or(Error::NotFound)?;

        let state_flow: Option<String> = tx
            .query_row(
                "SELECT flow_id FROM states WHERE id = ?1",
                params![state_id],
                |row| row.get(0),
            )
            .optional()?;
        let state_flow = state_flow.ok_or(Error::NotFound)?;

        if state_flow != flow_id {
            return Err(Error::Validation(
                "state does not belong to the project's flow".to_string(),
            ));
        }

        tx.execute(
            "UPDATE goals SET state_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![state_id, format_datetime(&Utc::now()), goal_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn set_goal_archived(&self, id: &str, archived: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE goals SET archived = ?1, updated_at = ?2 WHERE id = ?3",
            params![archived, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_goal(&self, id: &str, policy: DeletePolicy) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !exists(&tx, "goals", id)? {
            return Ok(false);
        }

        let referenced: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM goal_relations WHERE a_id = ?1 OR b_id = ?1 LIMIT 1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        if referenced.is_some() {
            match policy {
                DeletePolicy::Block => return Err(Error::DependencyExists),
                DeletePolicy::Cascade => {
                    tx.execute(
                        "DELETE FROM goal_relations WHERE a_id = ?1 OR b_id = ?1",
                        params![id],
                    )?;
                }
            }
        }

        tx.execute("DELETE FROM goals WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(true)
    }

    fn set_goal_tags(&self, goal_id: &str, tag_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !exists(&tx, "goals", goal_id)? {
            return Err(Error::NotFound);
        }

        tx.execute("DELETE FROM goal_tags WHERE goal_id = ?1", params![goal_id])?;

        for tag_id in tag_ids {
            if !exists(&tx, "tags", tag_id)? {
                return Err(Error::NotFound);
            }
            tx.execute(
                "INSERT OR IGNORE INTO goal_tags (goal_id, tag_id) VALUES (?1, ?2)",
                params![goal_id, tag_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_goal_tags(&self, goal_id: &str) -> Result<Vec<Tag>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.title, t.created_at FROM tags t
             JOIN goal_tags gt ON gt.tag_id = t.id
             WHERE gt.goal_id = ?1 ORDER BY t.title",
        )?;

        let rows = stmt.query_map(params![goal_id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_goal_participants(&self, goal_id: &str, activity_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !exists(&tx, "goals", goal_id)? {
            return Err(Error::NotFound);
        }

        tx.execute(
            "DELETE FROM goal_participants WHERE goal_id = ?1",
            params![goal_id],
        )?;

        for activity_id in activity_ids {
            if !exists(&tx, "activities", activity_id)? {
                return Err(Error::NotFound);
            }
            tx.execute(
                "INSERT OR IGNORE INTO goal_participants (goal_id, activity_id) VALUES (?1, ?2)",
                params![goal_id, activity_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_goal_participants(&self, goal_id: &str) -> Result<Vec<Activity>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{ACTIVITY_SELECT} JOIN goal_participants gp ON gp.activity_id = a.id
             WHERE gp.goal_id = ?1 ORDER BY a.created_at, a.id"
        ))?;

        let rows = stmt.query_map(params![goal_id], activity_from_row)?;
        let raw = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(raw.into_iter().filter_map(assemble_activity).collect())
    }

    // Goal relation operations

    fn link_goals(&self, kind: RelationKind, from_id: &str, to_id: &str) -> Result<()> {
        let edge = StoredEdge::canonicalize(kind, from_id, to_id)?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !exists(&tx, "goals", from_id)? || !exists(&tx, "goals", to_id)? {
            return Err(Error::NotFound);
        }

        tx.execute(
            "INSERT INTO goal_relations (kind, a_id, b_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                edge.kind.as_str(),
                edge.a_id,
                edge.b_id,
                format_datetime(&Utc::now()),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("relation already exists".to_string())
            } else {
                Error::from(e)
            }
        })?;

        tx.commit()?;
        Ok(())
    }

    fn unlink_goals(&self, kind: RelationKind, from_id: &str, to_id: &str) -> Result<()> {
        let edge = StoredEdge::canonicalize(kind, from_id, to_id)?;

        // Removing an edge that is not there is a caller bug, not a no-op
        let rows = self.conn().execute(
            "DELETE FROM goal_relations WHERE kind = ?1 AND a_id = ?2 AND b_id = ?3",
            params![edge.kind.as_str(), edge.a_id, edge.b_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn goal_relations(&self, id: &str) -> Result<GoalRelations> {
        let conn = self.conn();

        if !exists(&conn, "goals", id)? {
            return Err(Error::NotFound);
        }

        Ok(GoalRelations {
            blocks: self.goals_by_relation(&conn, id, StoredKind::Blocks, false)?,
            depends_on: self.goals_by_relation(&conn, id, StoredKind::Blocks, true)?,
            related_to: self.goals_by_relation(&conn, id, StoredKind::Related, false)?,
            connected: self.goals_by_relation(&conn, id, StoredKind::Connected, false)?,
        })
    }

    fn has_relations(&self, id: &str) -> Result<bool> {
        let referenced: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM goal_relations WHERE a_id = ?1 OR b_id = ?1 LIMIT 1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(referenced.is_some())
    }

    // Membership operations

    fn set_watcher(
        &self,
        kind: TargetKind,
        target_id: &str,
        activity_id: &str,
        desired: bool,
    ) -> Result<()> {
        self.set_membership(kind, false, target_id, activity_id, desired)
    }

    fn set_stargizer(
        &self,
        kind: TargetKind,
        target_id: &str,
        activity_id: &str,
        desired: bool,
    ) -> Result<()> {
        self.set_membership(kind, true, target_id, activity_id, desired)
    }

    fn list_watchers(&self, kind: TargetKind, target_id: &str) -> Result<Vec<Activity>> {
        self.list_membership(kind, false, target_id)
    }

    fn list_stargizers(&self, kind: TargetKind, target_id: &str) -> Result<Vec<Activity>> {
        self.list_membership(kind, true, target_id)
    }

    // Search and completion

    fn search_goals(&self, scope: &GoalScope, filter: &GoalFilter) -> Result<(Vec<Goal>, i64)> {
        // An empty text query matches nothing, by product rule
        if filter.query.is_empty() {
            return Ok((Vec::new(), 0));
        }

        let mut where_sql = String::from("g.archived = 0");
        let mut bind: Vec<String> = Vec::new();

        match scope {
            GoalScope::Project(id) => {
                where_sql.push_str(" AND g.project_id = ?");
                bind.push(id.clone());
            }
            GoalScope::Team(id) => {
                where_sql.push_str(
                    " AND g.project_id IN (SELECT project_id FROM team_projects WHERE team_id = ?)",
                );
                bind.push(id.clone());
            }
        }

        let pattern = format!("%{}%", filter.query.to_lowercase());
        where_sql.push_str(" AND (LOWER(g.title) LIKE ? OR LOWER(g.description) LIKE ?)");
        bind.push(pattern.clone());
        bind.push(pattern);

        if !filter.states.is_empty() {
            let marks = vec!["?"; filter.states.len()].join(", ");
            where_sql.push_str(&format!(" AND g.state_id IN ({marks})"));
            bind.extend(filter.states.iter().cloned());
        }

        if !filter.tags.is_empty() {
            let marks = vec!["?"; filter.tags.len()].join(", ");
            where_sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM goal_tags gt
                              WHERE gt.goal_id = g.id AND gt.tag_id IN ({marks}))"
            ));
            bind.extend(filter.tags.iter().cloned());
        }

        if !filter.owners.is_empty() {
            let marks = vec!["?"; filter.owners.len()].join(", ");
            where_sql.push_str(&format!(" AND g.owner_activity_id IN ({marks})"));
            bind.extend(filter.owners.iter().cloned());
        }

        let conn = self.conn();

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM goals g WHERE {where_sql}"),
            params_from_iter(bind.iter()),
            |row| row.get(0),
        )?;

        let page_size = filter.page_size.max(0);
        let offset = filter.offset.max(0);
        let mut stmt = conn.prepare(&format!(
            "{GOAL_SELECT} WHERE {where_sql}
             ORDER BY {} {}, g.id ASC LIMIT {page_size} OFFSET {offset}",
            filter.sort_by.as_sql(),
            filter.sort.as_sql(),
        ))?;

        let rows = stmt.query_map(params_from_iter(bind.iter()), goal_from_row)?;
        let page = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((page, total))
    }

    fn search_projects(&self, query: &str, sort: SortOrder) -> Result<Vec<Project>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLS} FROM projects
             WHERE LOWER(title) LIKE ?1 ORDER BY created_at {}, id",
            sort.as_sql()
        ))?;

        let pattern = format!("%{}%", query.to_lowercase());
        let rows = stmt.query_map(params![pattern], project_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn search_teams(&self, query: &str, sort: SortOrder) -> Result<Vec<Team>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TEAM_COLS} FROM teams
             WHERE LOWER(title) LIKE ?1 ORDER BY created_at {}, id",
            sort.as_sql()
        ))?;

        let pattern = format!("%{}%", query.to_lowercase());
        let rows = stmt.query_map(params![pattern], team_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn project_completion(&self, project_id: &str) -> Result<Option<f64>> {
        let (total, done): (i64, i64) = self.conn().query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN s.terminal = 1 THEN 1 ELSE 0 END), 0)
             FROM goals g LEFT JOIN states s ON s.id = g.state_id
             WHERE g.project_id = ?1 AND g.archived = 0",
            params![project_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if total == 0 {
            return Ok(None);
        }
        Ok(Some(done as f64 / total as f64))
    }

    fn team_completion(&self, team_id: &str) -> Result<Option<f64>> {
        let (total, done): (i64, i64) = self.conn().query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN s.terminal = 1 THEN 1 ELSE 0 END), 0)
             FROM goals g LEFT JOIN states s ON s.id = g.state_id
             WHERE g.archived = 0
               AND g.project_id IN (SELECT project_id FROM team_projects WHERE team_id = ?1)",
            params![team_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if total == 0 {
            return Ok(None);
        }
        Ok(Some(done as f64 / total as f64))
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
