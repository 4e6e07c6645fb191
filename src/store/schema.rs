pub const SCHEMA: &str = r#"
-- Activities wrap every actor. The kind column discriminates which
-- satellite row (users or ghosts) holds the identity; exactly one exists.
CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK (kind IN ('USER', 'GHOST')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    activity_id TEXT NOT NULL UNIQUE REFERENCES activities(id) ON DELETE CASCADE,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    name TEXT,
    image TEXT,
    role TEXT NOT NULL DEFAULT 'USER' CHECK (role IN ('ADMIN', 'USER'))
);

-- Invited, not-yet-registered identities. Destroyed on promotion; the
-- owning activity row survives with the same id.
CREATE TABLE IF NOT EXISTS ghosts (
    id TEXT PRIMARY KEY,
    activity_id TEXT NOT NULL UNIQUE REFERENCES activities(id) ON DELETE CASCADE,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    host_activity_id TEXT NOT NULL REFERENCES activities(id)
);

-- Sessions are auth credentials; non-admin sessions belong to an activity
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- token prefix for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,
    activity_id TEXT REFERENCES activities(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Flows name the state graph a project's goals move through
CREATE TABLE IF NOT EXISTS flows (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS states (
    id TEXT PRIMARY KEY,
    flow_id TEXT NOT NULL REFERENCES flows(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    position INTEGER NOT NULL,
    terminal INTEGER NOT NULL DEFAULT 0,

    UNIQUE (flow_id, title)
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    key TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT,
    flow_id TEXT NOT NULL REFERENCES flows(id),
    owner_activity_id TEXT NOT NULL REFERENCES activities(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Teams form a forest; deleting a team re-roots its children
CREATE TABLE IF NOT EXISTS teams (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    owner_activity_id TEXT NOT NULL REFERENCES activities(id),
    parent_id TEXT REFERENCES teams(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Many-to-many relationship between teams and projects
CREATE TABLE IF NOT EXISTS team_projects (
    team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    PRIMARY KEY (team_id, project_id)
);

CREATE TABLE IF NOT EXISTS goals (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    owner_activity_id TEXT NOT NULL REFERENCES activities(id),
    issuer_activity_id TEXT NOT NULL REFERENCES activities(id),
    state_id TEXT REFERENCES states(id),
    priority TEXT NOT NULL DEFAULT 'Medium',
    estimate TEXT,
    is_key INTEGER NOT NULL DEFAULT 0,
    personal INTEGER NOT NULL DEFAULT 0,
    private INTEGER NOT NULL DEFAULT 0,

    -- Soft delete: archived goals leave listings but keep their edges valid
    archived INTEGER NOT NULL DEFAULT 0,

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Many-to-many relationship between goals and tags
CREATE TABLE IF NOT EXISTS goal_tags (
    goal_id TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (goal_id, tag_id)
);

CREATE TABLE IF NOT EXISTS goal_participants (
    goal_id TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
    activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    PRIMARY KEY (goal_id, activity_id)
);

-- Goal relation edges. A 'blocks' row reads a→b as "a blocks b" and the
-- dependsOn view is the inverse of that same row. Symmetric kinds store
-- the canonical (min, max) pair once, so an edge is never two rows.
CREATE TABLE IF NOT EXISTS goal_relations (
    kind TEXT NOT NULL CHECK (kind IN ('blocks', 'related', 'connected')),
    a_id TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
    b_id TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (kind, a_id, b_id),
    CHECK (a_id <> b_id)
);

-- Watcher and stargizer sets, one join table per collection
CREATE TABLE IF NOT EXISTS goal_watchers (
    goal_id TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
    activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    PRIMARY KEY (goal_id, activity_id)
);

CREATE TABLE IF NOT EXISTS goal_stargizers (
    goal_id TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
    activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    PRIMARY KEY (goal_id, activity_id)
);

CREATE TABLE IF NOT EXISTS project_watchers (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, activity_id)
);

CREATE TABLE IF NOT EXISTS project_stargizers (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    PRIMARY KEY (project_id, activity_id)
);

CREATE TABLE IF NOT EXISTS team_watchers (
    team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    PRIMARY KEY (team_id, activity_id)
);

CREATE TABLE IF NOT EXISTS team_stargizers (
    team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
    activity_id TEXT NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    PRIMARY KEY (team_id, activity_id)
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_users_activity ON users(activity_id);
CREATE INDEX IF NOT EXISTS idx_ghosts_activity ON ghosts(activity_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_lookup ON sessions(token_lookup);
CREATE INDEX IF NOT EXISTS idx_sessions_activity ON sessions(activity_id);
CREATE INDEX IF NOT EXISTS idx_states_flow ON states(flow_id);
CREATE INDEX IF NOT EXISTS idx_projects_flow ON projects(flow_id);
CREATE INDEX IF NOT EXISTS idx_teams_parent ON teams(parent_id);
CREATE INDEX IF NOT EXISTS idx_goals_project ON goals(project_id);
CREATE INDEX IF NOT EXISTS idx_goals_owner ON goals(owner_activity_id);
CREATE INDEX IF NOT EXISTS idx_goals_state ON goals(state_id);
CREATE INDEX IF NOT EXISTS idx_goal_relations_b ON goal_relations(b_id);
CREATE INDEX IF NOT EXISTS idx_goal_tags_tag ON goal_tags(tag_id);
"#;
