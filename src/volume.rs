//! In-memory archival volume: a flat namespace of byte-stream members.
//!
//! Members become visible atomically when their writer is closed; an
//! unclosed writer leaves no trace. Child streams are tracked by URN string
//! only, so a volume never holds a pointer back into its children.

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::rc::Rc;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

pub struct Volume {
    urn: String,
    conn: Rc<Connection>,
    children: HashSet<String>,
}

impl Volume {
    pub fn new(urn: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE member (
                 name VARCHAR NOT NULL UNIQUE,
                 content BLOB NOT NULL
             );",
        )?;

        Ok(Volume {
            urn: urn.to_string(),
            conn: Rc::new(conn),
            children: HashSet::new(),
        })
    }

    pub fn urn(&self) -> &str {
        &self.urn
    }

    pub fn add_child(&mut self, urn: &str) {
        self.children.insert(urn.to_string());
    }

    pub fn children(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    pub fn create_member(&self, name: &str) -> Result<MemberWriter> {
        Ok(MemberWriter {
            conn: self.conn.clone(),
            name: name.to_string(),
            buf: Vec::new(),
        })
    }

    pub fn open_member(&self, name: &str) -> Result<Member> {
        let content: Option<Vec<u8>> = self
            .conn
            .prepare_cached("SELECT content FROM member WHERE name = ?")?
            .query_row(params![name], |row| row.get(0))
            .optional()?;

        match content {
            Some(data) => Ok(Member {
                inner: Cursor::new(data),
            }),
            None => Err(Error::NotFound(name.to_string())),
        }
    }
}

/// Buffered writer for one member. Nothing is visible until `close`.
pub struct MemberWriter {
    conn: Rc<Connection>,
    name: String,
    buf: Vec<u8>,
}

impl MemberWriter {
    /// Commit the buffered bytes as the member's content, in one statement.
    pub fn close(self) -> Result<()> {
        self.conn
            .prepare_cached("INSERT OR REPLACE INTO member (name, content) VALUES (?, ?)")?
            .execute(params![self.name, self.buf])?;
        Ok(())
    }
}

impl std::io::Write for MemberWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Positioned read handle over one member's bytes.
pub struct Member {
    inner: Cursor<Vec<u8>>,
}

impl Member {
    pub fn size(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn tell(&self) -> u64 {
        self.inner.position()
    }
}

impl Read for Member {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for Member {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}
