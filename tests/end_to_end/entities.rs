//! Entity capability tables through the full call sequence

use crate::common::people_db;
use procmap::memory::{MemoryDatabase, ResultSet};
use procmap::{
    entity, Column, Direction, Entity, EntityDescriptor, Error, Kind, Mapped, Mapper,
    ParameterDescriptor, PartialParams, ReadOptions, SqlType, Value,
};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq)]
struct Audit {
    modified_by: String,
}

entity!(Audit {
    "ModifiedBy" => modified_by,
});

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Status {
    #[default]
    Draft,
    Active,
    Retired,
}

impl Mapped for Status {
    fn sql_type() -> SqlType {
        SqlType::of(Kind::U8)
    }

    fn from_value(value: Value) -> procmap::Result<Self> {
        match value {
            Value::U8(0) => Ok(Status::Draft),
            Value::U8(1) => Ok(Status::Active),
            Value::U8(2) => Ok(Status::Retired),
            other => Err(Error::cast(other.type_name(), "Status")),
        }
    }

    fn to_value(&self) -> Value {
        Value::U8(*self as u8)
    }

    fn is_enum() -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Document {
    id: i64,
    status: Option<Status>,
    audit: Audit,
}

impl Document {
    fn title(&self) -> String {
        format!("doc-{}", self.id)
    }
}

impl Entity for Document {
    fn describe() -> EntityDescriptor<Self> {
        EntityDescriptor::structured("Document")
            .field("Id", |d: &Document| &d.id, |d: &mut Document| &mut d.id)
            .field("Status", |d: &Document| &d.status, |d: &mut Document| &mut d.status)
            .read_only("Title", |d: &Document| d.title())
            .extend::<Audit, _, _>(|d: &Document| &d.audit, |d: &mut Document| &mut d.audit)
    }
}

fn documents_db() -> Arc<MemoryDatabase> {
    let db = MemoryDatabase::new("memory://docs");
    db.define(
        "usp_Document_Get",
        vec![
            ParameterDescriptor::new("@Id", SqlType::of(Kind::I64), Direction::Input),
            ParameterDescriptor::new("@Title", SqlType::of(Kind::String), Direction::Input),
        ],
        |call| {
            Ok(ResultSet::new()
                .columns(vec![
                    Column::new("Id", SqlType::of(Kind::I64)),
                    Column::new("Status", SqlType::of(Kind::I32)),
                    Column::new("Title", SqlType::of(Kind::String)),
                    Column::new("ModifiedBy", SqlType::of(Kind::String)),
                ])
                .row(vec![
                    call.input("Id").clone(),
                    Value::I32(1),
                    call.input("Title").clone(),
                    Value::from("editor"),
                ]))
        },
    );
    db
}

#[test]
fn inherited_enum_and_read_only_properties() {
    let db = documents_db();
    let mapper = Mapper::default();
    let bag = PartialParams::new();
    let probe = Document {
        id: 4,
        ..Document::default()
    };

    let doc: Document = mapper
        .execute_reader_single(db.connect(), "usp_Document_Get", Some(&bag), Some(&probe), ReadOptions::default())
        .unwrap();

    assert_eq!(doc.id, 4);
    assert_eq!(doc.status, Some(Status::Active));
    assert_eq!(doc.audit.modified_by, "editor");
    // Read-only "Title" fed the parameter but was neither assigned nor bagged
    assert!(bag.get("Title").is_none());
}

#[test]
fn registered_conversion_applies_to_columns() {
    let db = people_db();
    let mapper = Mapper::default();
    mapper.coercion().register(Kind::I32, Kind::String, |v| match v {
        Value::I32(n) => Ok(Value::String(format!("#{}", n))),
        other => Err(Error::cast(other.type_name(), Kind::String)),
    });

    #[derive(Debug, Default)]
    struct Label {
        id: String,
    }
    entity!(Label { "Id" => id });

    let bag = PartialParams::new();
    bag.add_typed("Take", 1i32, Direction::Input);
    let label: Label = mapper
        .execute_reader_single(db.connect(), "usp_People", Some(&bag), None, ReadOptions::default())
        .unwrap();
    assert_eq!(label.id, "#1");
}
