//! Compiled row-to-entity projection
//!
//! A [`Projection`] resolves, once per result shape, where every column of a
//! row goes: into a writable entity property, or into the partial bag under
//! the column name. Applying it to a row replays those bindings in column
//! order without consulting the entity descriptor again.

use procmap_core::{
    Column, Direction, Entity, EntityDescriptor, Error, Result, Row, Setter, SqlType, TypeCoercion,
    Value,
};
use procmap_params::PartialParams;
use std::fmt;
use tracing::trace;

/// Destination of one result column
enum Binding<E> {
    /// Assign to an entity property after conversion to `target`
    Property {
        index: usize,
        column: String,
        target: SqlType,
        setter: Setter<E>,
    },
    /// Store in the partial bag under the column name
    Partial {
        index: usize,
        column: String,
        sql_type: SqlType,
    },
}

/// Row materializer for one `(procedure, entity type)` pair
pub struct Projection<E> {
    entity: String,
    bindings: Vec<Binding<E>>,
}

impl<E: Entity> Projection<E> {
    /// Resolve every column against the entity's properties
    ///
    /// Matching is by exact, case-sensitive name. Columns naming a property
    /// without a setter are neither assigned nor routed to the bag.
    pub fn build(columns: &[Column], descriptor: &EntityDescriptor<E>) -> Self {
        let mut bindings = Vec::with_capacity(columns.len());

        for (index, column) in columns.iter().enumerate() {
            match descriptor.property(&column.name) {
                Some(property) => {
                    if let Some(setter) = property.setter() {
                        bindings.push(Binding::Property {
                            index,
                            column: column.name.clone(),
                            target: property.assignment_type(),
                            setter: setter.clone(),
                        });
                    }
                }
                None => bindings.push(Binding::Partial {
                    index,
                    column: column.name.clone(),
                    sql_type: column.sql_type,
                }),
            }
        }

        Projection {
            entity: descriptor.name().to_string(),
            bindings,
        }
    }

    /// Materialize one entity from a row
    ///
    /// A column whose value cannot be assigned leaves its property at the
    /// default; the rest of the row is still applied. With `implicit_cast`
    /// unset, values must already be of the property's declared kind.
    pub fn apply(
        &self,
        row: &Row,
        bag: &PartialParams,
        implicit_cast: bool,
        coercion: &TypeCoercion,
    ) -> E {
        let mut entity = E::default();

        for binding in &self.bindings {
            match binding {
                Binding::Property {
                    index,
                    column,
                    target,
                    setter,
                } => {
                    let value = row.get(*index).cloned().unwrap_or(Value::Null);
                    let assigned = convert(value, *target, implicit_cast, coercion)
                        .and_then(|converted| setter(&mut entity, converted));
                    if let Err(e) = assigned {
                        trace!(
                            target: "procmap::projection",
                            entity = %self.entity,
                            column = %column,
                            error = %e,
                            "Column left at default"
                        );
                    }
                }
                Binding::Partial {
                    index,
                    column,
                    sql_type,
                } => {
                    let value = row.get(*index).cloned().unwrap_or(Value::Null);
                    bag.add(*sql_type, column, value, Direction::Output);
                }
            }
        }

        entity
    }
}

impl<E> Projection<E> {
    /// Name of the target entity
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Columns assigned to entity properties, in column order
    pub fn property_columns(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter_map(|b| match b {
                Binding::Property { column, .. } => Some(column.as_str()),
                Binding::Partial { .. } => None,
            })
            .collect()
    }

    /// Columns routed to the partial bag, in column order
    pub fn partial_columns(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter_map(|b| match b {
                Binding::Partial { column, .. } => Some(column.as_str()),
                Binding::Property { .. } => None,
            })
            .collect()
    }

    /// Number of bound columns
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no column is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

fn convert(value: Value, target: SqlType, implicit_cast: bool, coercion: &TypeCoercion) -> Result<Value> {
    if implicit_cast {
        return coercion.cast_to(&value, target);
    }
    if target.accepts(&value) {
        Ok(value)
    } else {
        Err(Error::cast(value.type_name(), target))
    }
}

impl<E> fmt::Debug for Projection<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("entity", &self.entity)
            .field("properties", &self.property_columns())
            .field("partial", &self.partial_columns())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procmap_core::{entity, Kind, Mapped};

    #[derive(Debug, Default, PartialEq)]
    struct Customer {
        id: i32,
        name: String,
    }

    entity!(Customer {
        "Id" => id,
        "Name" => name,
    });

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    enum Tier {
        #[default]
        Basic,
        Gold,
    }

    impl Mapped for Tier {
        fn sql_type() -> SqlType {
            SqlType::of(Kind::I32)
        }

        fn from_value(value: Value) -> Result<Self> {
            match value {
                Value::I32(0) => Ok(Tier::Basic),
                Value::I32(1) => Ok(Tier::Gold),
                other => Err(Error::cast(other.type_name(), "Tier")),
            }
        }

        fn to_value(&self) -> Value {
            Value::I32(*self as i32)
        }

        fn is_enum() -> bool {
            true
        }
    }

    #[derive(Debug, Default)]
    struct Account {
        id: i64,
        tier: Option<Tier>,
        label: String,
    }

    impl Entity for Account {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::structured("Account")
                .field("Id", |a: &Account| &a.id, |a: &mut Account| &mut a.id)
                .field("Tier", |a: &Account| &a.tier, |a: &mut Account| &mut a.tier)
                .read_only("Label", |a: &Account| a.label.clone())
        }
    }

    fn columns(shape: &[(&str, Kind)]) -> Vec<Column> {
        shape.iter()
            .map(|(name, kind)| Column::new(*name, SqlType::of(*kind)))
            .collect()
    }

    #[test]
    fn test_unmatched_column_goes_to_bag() {
        let cols = columns(&[("Id", Kind::I32), ("Name", Kind::String), ("Extra", Kind::String)]);
        let projection = Projection::build(&cols, &Customer::describe());
        assert_eq!(projection.property_columns(), vec!["Id", "Name"]);
        assert_eq!(projection.partial_columns(), vec!["Extra"]);

        let bag = PartialParams::new();
        let row = Row::new(vec![Value::I32(4), Value::from("Ada"), Value::from("vip")]);
        let customer = projection.apply(&row, &bag, true, TypeCoercion::standard());

        assert_eq!(customer, Customer { id: 4, name: "Ada".into() });
        let extra = bag.get("Extra").unwrap();
        assert_eq!(extra.raw_value(), &Value::from("vip"));
        assert_eq!(extra.direction(), Direction::Output);
        assert_eq!(extra.sql_type(), SqlType::of(Kind::String));
    }

    #[test]
    fn test_name_match_is_case_sensitive() {
        let cols = columns(&[("id", Kind::I32)]);
        let projection = Projection::build(&cols, &Customer::describe());
        assert!(projection.property_columns().is_empty());
        assert_eq!(projection.partial_columns(), vec!["id"]);
    }

    #[test]
    fn test_widening_with_implicit_cast() {
        let cols = columns(&[("Id", Kind::I16)]);
        let projection = Projection::build(&cols, &Customer::describe());
        let bag = PartialParams::new();
        let c: Customer = projection.apply(&Row::new(vec![Value::I16(9)]), &bag, true, TypeCoercion::standard());
        assert_eq!(c.id, 9);
    }

    #[test]
    fn test_exact_kind_required_without_implicit_cast() {
        let cols = columns(&[("Id", Kind::I16), ("Name", Kind::String)]);
        let projection = Projection::build(&cols, &Customer::describe());
        let bag = PartialParams::new();
        let row = Row::new(vec![Value::I16(9), Value::from("Bo")]);
        let c: Customer = projection.apply(&row, &bag, false, TypeCoercion::standard());
        assert_eq!(c.id, 0);
        assert_eq!(c.name, "Bo");
    }

    #[test]
    fn test_failed_column_leaves_default_and_continues() {
        let cols = columns(&[("Id", Kind::String), ("Name", Kind::String)]);
        let projection = Projection::build(&cols, &Customer::describe());
        let bag = PartialParams::new();
        let row = Row::new(vec![Value::from("not a number"), Value::from("Cy")]);
        let c: Customer = projection.apply(&row, &bag, true, TypeCoercion::standard());
        assert_eq!(c.id, 0);
        assert_eq!(c.name, "Cy");
        assert!(bag.is_empty());
    }

    #[test]
    fn test_null_into_non_nullable_leaves_default() {
        let cols = columns(&[("Id", Kind::I32)]);
        let projection = Projection::build(&cols, &Customer::describe());
        let bag = PartialParams::new();
        let c: Customer = projection.apply(&Row::new(vec![Value::Null]), &bag, true, TypeCoercion::standard());
        assert_eq!(c.id, 0);
    }

    #[test]
    fn test_nullable_enum_assigned_through_underlying_kind() {
        let cols = columns(&[("Id", Kind::I64), ("Tier", Kind::I16)]);
        let projection = Projection::build(&cols, &Account::describe());
        let bag = PartialParams::new();
        let row = Row::new(vec![Value::I64(1), Value::I16(1)]);
        let a: Account = projection.apply(&row, &bag, true, TypeCoercion::standard());
        assert_eq!(a.tier, Some(Tier::Gold));

        let row = Row::new(vec![Value::I64(2), Value::Null]);
        let a: Account = projection.apply(&row, &bag, true, TypeCoercion::standard());
        assert_eq!(a.tier, None);
    }

    #[test]
    fn test_read_only_property_is_skipped() {
        let cols = columns(&[("Id", Kind::I64), ("Label", Kind::String)]);
        let projection = Projection::build(&cols, &Account::describe());
        assert_eq!(projection.len(), 1);

        let bag = PartialParams::new();
        let row = Row::new(vec![Value::I64(3), Value::from("x")]);
        let a: Account = projection.apply(&row, &bag, true, TypeCoercion::standard());
        assert_eq!(a.label, "");
        assert!(!bag.contains("Label"));
    }

    #[test]
    fn test_registered_conversion_is_used() {
        let coercion = TypeCoercion::new();
        coercion.register(Kind::Bool, Kind::String, |v| {
            Ok(Value::from(if v.as_bool() == Some(true) { "yes" } else { "no" }))
        });
        let cols = columns(&[("Name", Kind::Bool)]);
        let projection = Projection::build(&cols, &Customer::describe());
        let bag = PartialParams::new();
        let c: Customer = projection.apply(&Row::new(vec![Value::Bool(true)]), &bag, true, &coercion);
        assert_eq!(c.name, "yes");
    }
}
