use chrono::NaiveDateTime;
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Driver,
    Vehicle,
    Trailer,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Driver => "driver",
            EntityKind::Vehicle => "vehicle",
            EntityKind::Trailer => "trailer",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Driver {
    pub external_id: i64,
    pub person_id: String, // code used by the fleet owner, not by the provider
    pub name: String,
    pub language: String,
    pub inactive: bool,
    pub last_modified: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Vehicle {
    pub external_id: i64,
    pub license_plate: String,
    pub group_name: Option<String>,
    pub inactive: bool,
    pub last_modified: NaiveDateTime,
}

/// Trailers carry no freshness stamp upstream; `last_modified` stays at the
/// zero value so an already registered trailer is never rewritten.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Trailer {
    pub external_id: i64,
    pub license_plate: String,
    pub inactive: bool,
    pub last_modified: NaiveDateTime,
}

/// A reference entity as fetched from the provider, keyed by its external ID.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Driver(Driver),
    Vehicle(Vehicle),
    Trailer(Trailer),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Driver(_) => EntityKind::Driver,
            Entity::Vehicle(_) => EntityKind::Vehicle,
            Entity::Trailer(_) => EntityKind::Trailer,
        }
    }

    pub fn external_id(&self) -> i64 {
        match self {
            Entity::Driver(d) => d.external_id,
            Entity::Vehicle(v) => v.external_id,
            Entity::Trailer(t) => t.external_id,
        }
    }

    pub fn last_modified(&self) -> NaiveDateTime {
        match self {
            Entity::Driver(d) => d.last_modified,
            Entity::Vehicle(v) => v.last_modified,
            Entity::Trailer(t) => t.last_modified,
        }
    }
}

impl From<Driver> for Entity {
    fn from(d: Driver) -> Self {
        Entity::Driver(d)
    }
}

impl From<Vehicle> for Entity {
    fn from(v: Vehicle) -> Self {
        Entity::Vehicle(v)
    }
}

impl From<Trailer> for Entity {
    fn from(t: Trailer) -> Self {
        Entity::Trailer(t)
    }
}
