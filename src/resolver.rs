//! Process-wide attribute catalog: `(subject URN, property URN) -> value`
//! tuples, plus the registry of live volumes and the table of stream types.
//!
//! Streams hold only URN strings and resolve their volume through here on
//! demand, which keeps the volume/child relationship acyclic.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::image::ImageStream;
use crate::lexicon;
use crate::volume::Volume;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Urn(String),
    Integer(u64),
}

impl Value {
    pub fn as_urn(&self) -> Option<&str> {
        match self {
            Value::Urn(u) => Some(u),
            Value::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Urn(_) => None,
        }
    }
}

pub struct Resolver {
    conn: Connection,
    volumes: RefCell<HashMap<String, Rc<RefCell<Volume>>>>,
}

impl Resolver {
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE attribute (
                 subject VARCHAR NOT NULL,
                 property VARCHAR NOT NULL,
                 value VARCHAR NOT NULL,
                 kind VARCHAR NOT NULL,
                 UNIQUE(subject, property)
             );",
        )?;

        Ok(Resolver {
            conn,
            volumes: RefCell::new(HashMap::new()),
        })
    }

    /// Idempotent: setting the same tuple twice replaces in place.
    pub fn set(&self, subject: &str, property: &str, value: Value) -> Result<()> {
        let (kind, text) = match value {
            Value::Urn(u) => ("urn", u),
            Value::Integer(i) => ("int", i.to_string()),
        };

        self.conn
            .prepare_cached(
                "INSERT OR REPLACE INTO attribute
                 (subject, property, value, kind)
                 VALUES (?, ?, ?, ?)",
            )?
            .execute(params![subject, property, text, kind])?;
        Ok(())
    }

    pub fn get(&self, subject: &str, property: &str) -> Result<Value> {
        self.get_opt(subject, property)?
            .ok_or_else(|| Error::NotFound(format!("{} {}", subject, property)))
    }

    pub fn get_opt(&self, subject: &str, property: &str) -> Result<Option<Value>> {
        let row: Option<(String, String)> = self
            .conn
            .prepare_cached(
                "SELECT value, kind FROM attribute
                 WHERE subject = ? AND property = ?",
            )?
            .query_row(params![subject, property], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        match row {
            None => Ok(None),
            Some((text, kind)) if kind == "int" => text
                .parse::<u64>()
                .map(|i| Some(Value::Integer(i)))
                .map_err(|_| {
                    Error::io(format!("non-integer attribute {} on {}", property, subject))
                }),
            Some((text, _)) => Ok(Some(Value::Urn(text))),
        }
    }

    /// Hand a live volume to the resolver so streams can reach it by URN.
    pub fn register_volume(&self, volume: Volume) -> Rc<RefCell<Volume>> {
        let urn = volume.urn().to_string();
        let volume = Rc::new(RefCell::new(volume));
        self.volumes.borrow_mut().insert(urn, volume.clone());
        volume
    }

    pub fn volume(&self, urn: &str) -> Result<Rc<RefCell<Volume>>> {
        self.volumes
            .borrow()
            .get(urn)
            .cloned()
            .ok_or_else(|| Error::NotFound(urn.to_string()))
    }
}

type Opener = fn(&Rc<Resolver>, &str) -> Result<ImageStream>;

// Closed set of stream implementations, keyed by type URN.
const OPENERS: &[(&str, Opener)] = &[(lexicon::IMAGE_STREAM_TYPE, ImageStream::open)];

/// Open whatever stream `urn` names, dispatching on its `rdf:type`.
pub fn open_stream(resolver: &Rc<Resolver>, urn: &str) -> Result<ImageStream> {
    let typ = match resolver.get(urn, lexicon::RDF_TYPE)? {
        Value::Urn(t) => t,
        Value::Integer(_) => {
            return Err(Error::io(format!("{} has a non-URN type", urn)));
        }
    };

    for (type_urn, open) in OPENERS {
        if *type_urn == typ {
            return open(resolver, urn);
        }
    }
    Err(Error::NotImplemented(typ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let resolver = Resolver::new().unwrap();

        resolver
            .set("aff4://s", "p:urn", Value::Urn("aff4://other".to_string()))
            .unwrap();
        resolver.set("aff4://s", "p:int", Value::Integer(42)).unwrap();

        assert_eq!(
            resolver.get("aff4://s", "p:urn").unwrap(),
            Value::Urn("aff4://other".to_string())
        );
        assert_eq!(
            resolver.get("aff4://s", "p:int").unwrap(),
            Value::Integer(42)
        );
    }

    #[test]
    fn set_replaces_in_place() {
        let resolver = Resolver::new().unwrap();

        resolver.set("aff4://s", "p", Value::Integer(1)).unwrap();
        resolver.set("aff4://s", "p", Value::Integer(2)).unwrap();

        assert_eq!(resolver.get("aff4://s", "p").unwrap(), Value::Integer(2));
    }

    #[test]
    fn missing_tuple() {
        let resolver = Resolver::new().unwrap();

        assert!(matches!(
            resolver.get("aff4://s", "p"),
            Err(Error::NotFound(_))
        ));
        assert!(resolver.get_opt("aff4://s", "p").unwrap().is_none());
    }

    #[test]
    fn volume_registry() {
        let resolver = Resolver::new().unwrap();
        resolver.register_volume(Volume::new("aff4://volume").unwrap());

        assert!(resolver.volume("aff4://volume").is_ok());
        assert!(matches!(
            resolver.volume("aff4://elsewhere"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn open_unknown_type() {
        let resolver = Rc::new(Resolver::new().unwrap());
        resolver
            .set(
                "aff4://s",
                lexicon::RDF_TYPE,
                Value::Urn("http://aff4.org/Schema#Map".to_string()),
            )
            .unwrap();

        assert!(matches!(
            open_stream(&resolver, "aff4://s"),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn open_untyped_subject() {
        let resolver = Rc::new(Resolver::new().unwrap());
        assert!(matches!(
            open_stream(&resolver, "aff4://s"),
            Err(Error::NotFound(_))
        ));
    }
}
