//! Shared fixtures for end-to-end tests

use procmap::memory::{MemoryDatabase, ResultSet};
use procmap::{entity, Column, Direction, Kind, ParameterDescriptor, SqlType, Value};
use std::sync::Arc;

/// Entity exposing `Id` and `Name` only
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub id: i32,
    pub name: String,
}

entity!(Person {
    "Id" => id,
    "Name" => name,
});

/// Database with `usp_People` returning `{Id, Name, Extra}` rows and
/// `usp_Stamp` writing a return value of 7
pub fn people_db() -> Arc<MemoryDatabase> {
    let db = MemoryDatabase::new("memory://people");

    db.define(
        "usp_People",
        vec![ParameterDescriptor::new("@Take", SqlType::of(Kind::I32), Direction::Input)],
        |call| {
            let take = match call.input("Take") {
                Value::I32(n) => *n,
                _ => 0,
            };
            let mut rs = ResultSet::new().columns(vec![
                Column::new("Id", SqlType::of(Kind::I32)),
                Column::new("Name", SqlType::of(Kind::String)),
                Column::new("Extra", SqlType::of(Kind::String)),
            ]);
            for id in 1..=take {
                rs = rs.row(vec![
                    Value::I32(id),
                    Value::String(format!("person-{}", id)),
                    Value::String(format!("extra-{}", id)),
                ]);
            }
            Ok(rs)
        },
    );

    db.define(
        "usp_Stamp",
        vec![ParameterDescriptor::new("@Id", SqlType::of(Kind::I32), Direction::Input)],
        |_| Ok(ResultSet::new().affected(1).returning(7)),
    );

    db
}
