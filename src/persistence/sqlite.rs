use super::memory::ProjectGraph;
use super::{PersistenceError, PersistenceResult};
use crate::change_set::ChangeSet;
use crate::graph::{GraphReadError, TaskGraphReader};
use crate::task::{Task, TaskId};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::{Mutex, MutexGuard};

/// Task storage in SQLite: one JSON row per task plus a relation table the
/// reader queries for children and followers.
pub struct SqliteTaskStore {
    connection: Mutex<Connection>,
}

impl SqliteTaskStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                parent_id INTEGER,
                task_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS tasks_parent ON tasks (parent_id);
            CREATE TABLE IF NOT EXISTS relations (
                predecessor_id INTEGER NOT NULL,
                successor_id INTEGER NOT NULL,
                lag INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (predecessor_id, successor_id)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| PersistenceError::Poisoned)
    }

    /// Replaces the stored graph with `tasks`.
    pub fn save_tasks(&self, tasks: &[Task]) -> PersistenceResult<()> {
        super::validate_tasks(tasks)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM relations", [])?;
        tx.execute("DELETE FROM tasks", [])?;
        for task in tasks {
            Self::upsert(&tx, task)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Persists a scheduling result atomically.
    pub fn apply_change_set(&self, changes: &ChangeSet) -> PersistenceResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for update in changes {
            Self::upsert(&tx, &update.task)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_graph(&self) -> PersistenceResult<ProjectGraph> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT task_json FROM tasks ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tasks = Vec::new();
        for json in rows {
            let task: Task = serde_json::from_str(&json?)?;
            tasks.push(task);
        }
        ProjectGraph::from_tasks(tasks)
    }

    fn upsert(tx: &Transaction, task: &Task) -> PersistenceResult<()> {
        let json = serde_json::to_string(task)?;
        tx.execute(
            "INSERT INTO tasks (id, parent_id, task_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET parent_id = excluded.parent_id, task_json = excluded.task_json",
            params![task.id.0, task.parent.map(|id| id.0), json],
        )?;
        tx.execute(
            "DELETE FROM relations WHERE successor_id = ?1",
            params![task.id.0],
        )?;
        let mut stmt = tx.prepare(
            "INSERT INTO relations (predecessor_id, successor_id, lag) VALUES (?1, ?2, ?3)",
        )?;
        for relation in &task.predecessors {
            stmt.execute(params![relation.predecessor.0, task.id.0, relation.lag])?;
        }
        Ok(())
    }

    fn query_ids(&self, sql: &str, id: TaskId) -> PersistenceResult<Vec<TaskId>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![id.0], |row| row.get::<_, i32>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(TaskId(row?));
        }
        Ok(ids)
    }
}

impl TaskGraphReader for SqliteTaskStore {
    fn task(&self, id: TaskId) -> Result<Option<Task>, GraphReadError> {
        let conn = self.lock().map_err(GraphReadError::backend)?;
        let json: Option<String> = conn
            .query_row(
                "SELECT task_json FROM tasks WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(GraphReadError::backend)?;
        json.map(|json| {
            serde_json::from_str(&json).map_err(|err| GraphReadError::Malformed {
                task: id,
                message: err.to_string(),
            })
        })
        .transpose()
    }

    fn children(&self, id: TaskId) -> Result<Vec<TaskId>, GraphReadError> {
        self.query_ids("SELECT id FROM tasks WHERE parent_id = ?1 ORDER BY id ASC", id)
            .map_err(GraphReadError::backend)
    }

    fn followers(&self, id: TaskId) -> Result<Vec<TaskId>, GraphReadError> {
        self.query_ids(
            "SELECT successor_id FROM relations WHERE predecessor_id = ?1 ORDER BY successor_id ASC",
            id,
        )
        .map_err(GraphReadError::backend)
    }
}
