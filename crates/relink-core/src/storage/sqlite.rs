use crate::error::Error;
use rusqlite::Connection;
use tracing::debug;

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database file. A failure to open is a connectivity
    /// problem and is reported as such, distinct from statement errors.
    pub fn open(path: &str) -> Result<Self, Error> {
        let conn = Connection::open(path)
            .map_err(|e| Error::DatabaseUnavailable(format!("cannot open {}: {}", path, e)))?;
        let db = Database { conn };
        db.configure_pragmas()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::DatabaseUnavailable(e.to_string()))?;
        let db = Database { conn };
        db.configure_pragmas()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<(), Error> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, 5s busy timeout)");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
