//! Observable guarantees of the caches, the bag and the coercion matrix

use crate::common::{people_db, Person};
use procmap::{Connection, Direction, Kind, Mapper, PartialParams, ReadOptions, SqlType, Value};
use procmap_core::{CoercionMatrix, Entity, TypeCoercion};
use procmap_params::SignatureCache;
use procmap_projection::ProjectionCache;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn coercion_tables_match_declared_relations() {
    let matrix = CoercionMatrix::global();
    let t = SqlType::of;

    assert!(matrix.is_implicit(t(Kind::U8), t(Kind::I32)));
    assert!(!matrix.is_implicit(t(Kind::I32), t(Kind::U8)));
    assert!(matrix.is_explicit(t(Kind::I32), t(Kind::U8)));
    assert!(!matrix.is_implicit(t(Kind::F64), t(Kind::I32)));
    assert!(!matrix.is_explicit(t(Kind::F64), t(Kind::I32)));

    // Nullable wrappers on either side
    assert!(matrix.is_implicit(SqlType::nullable(Kind::U8), SqlType::nullable(Kind::I32)));
    assert!(matrix.is_implicit(t(Kind::U8), SqlType::nullable(Kind::I32)));
    assert!(!matrix.is_implicit(SqlType::nullable(Kind::U8), t(Kind::I32)));
}

#[test]
fn cast_overflow_is_reported() {
    let coercion = TypeCoercion::standard();
    let err = coercion.cast_to(&Value::I32(300), SqlType::of(Kind::U8)).unwrap_err();
    assert!(err.is_overflow());
    assert_eq!(
        coercion.cast_to(&Value::I32(200), SqlType::of(Kind::U8)).unwrap(),
        Value::U8(200)
    );
}

#[test]
fn signature_copies_are_equal_but_independent() {
    let db = people_db();
    let cache = SignatureCache::default();
    let mut conn = db.connect();
    conn.open().unwrap();

    let mut first = cache.parameter_set(&mut conn, "usp_People", true).unwrap();
    let second = cache.parameter_set(&mut conn, "usp_People", true).unwrap();
    assert_eq!(first, second);
    assert_ne!(first.as_ptr(), second.as_ptr());

    first[1].value = Value::I32(10);
    let third = cache.parameter_set(&mut conn, "usp_People", true).unwrap();
    assert_eq!(third[1].value, Value::Null);
    assert_eq!(second[1].value, Value::Null);
    assert_eq!(db.derivations(), 1);
}

#[test]
fn identical_add_keeps_entry_changed_add_replaces() {
    let bag = PartialParams::new();
    bag.add(SqlType::of(Kind::String), "Code", Value::from("a"), Direction::Input);
    let original = bag.get("Code").unwrap();

    bag.add(SqlType::of(Kind::String), "Code", Value::from("a"), Direction::Input);
    assert!(Arc::ptr_eq(&original, &bag.get("Code").unwrap()));

    bag.add(SqlType::of(Kind::String), "Code", Value::from("b"), Direction::Input);
    assert!(!Arc::ptr_eq(&original, &bag.get("Code").unwrap()));
}

#[test]
fn return_value_defaults_to_zero_then_reflects_call() {
    let db = people_db();
    let mapper = Mapper::default();
    let bag = PartialParams::new();
    assert_eq!(bag.return_value(), 0);

    let person = Person {
        id: 1,
        name: "x".into(),
    };
    mapper
        .execute_non_query(db.connect(), "usp_Stamp", Some(&bag), Some(&person))
        .unwrap();
    assert_eq!(bag.return_value(), 7);
}

#[test]
fn unmatched_column_lands_in_bag() {
    let db = people_db();
    let mapper = Mapper::default();
    let bag = PartialParams::new();
    bag.add_typed("Take", 1i32, Direction::Input);

    let person: Person = mapper
        .execute_reader_single(db.connect(), "usp_People", Some(&bag), None, ReadOptions::default())
        .unwrap();

    assert_eq!(
        person,
        Person {
            id: 1,
            name: "person-1".into()
        }
    );
    assert_eq!(bag.get_value("Extra"), Value::from("extra-1"));
}

#[test]
fn single_read_of_zero_rows_is_default_entity() {
    let db = people_db();
    let mapper = Mapper::default();
    let bag = PartialParams::new();
    bag.add_typed("Take", 0i32, Direction::Input);

    let person: Person = mapper
        .execute_reader_single(db.connect(), "usp_People", Some(&bag), None, ReadOptions::default())
        .unwrap();
    assert_eq!(person, Person::default());
}

#[test]
fn concurrent_first_use_keeps_one_projection() {
    const THREADS: usize = 12;

    let db = people_db();
    let mapper = Arc::new(Mapper::default());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = Arc::clone(&db);
            let mapper = Arc::clone(&mapper);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let bag = PartialParams::new();
                bag.add_typed("Take", 2i32, Direction::Input);
                barrier.wait();
                let people: Vec<Person> = mapper
                    .execute_reader::<Person, _>(db.connect(), "usp_People", Some(&bag), None, ReadOptions::default())
                    .unwrap()
                    .collect::<Result<_, _>>()
                    .unwrap();
                assert_eq!(people[1].name, "person-2");
                assert_eq!(bag.get_value("Extra"), Value::from("extra-2"));
                mapper.projections().get::<Person>("usp_People").unwrap().unwrap()
            })
        })
        .collect();

    let seen: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(mapper.projections().len(), 1);
    assert!(seen.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

#[test]
fn standalone_projection_cache_matches_mapper_behavior() {
    let cache = ProjectionCache::new();
    let columns = vec![
        procmap::Column::new("Id", SqlType::of(Kind::I32)),
        procmap::Column::new("Nickname", SqlType::of(Kind::String)),
    ];
    let projection = cache
        .get_or_build("usp_People", &columns, &Person::describe())
        .unwrap();
    assert_eq!(projection.partial_columns(), vec!["Nickname"]);
}
