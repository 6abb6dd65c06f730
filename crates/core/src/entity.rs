//! Entity capability tables
//!
//! An entity describes itself once through [`Entity::describe`]: its name,
//! whether it is a structured record or a bare scalar, and an ordered list of
//! [`Property`] entries carrying the exact property name, declared type, a
//! getter and an optional setter. The mapper never inspects an entity any
//! other way.
//!
//! ```
//! use procmap_core::{entity, Entity};
//!
//! #[derive(Debug, Default)]
//! struct Customer {
//!     id: i32,
//!     name: Option<String>,
//! }
//!
//! entity!(Customer {
//!     "Id" => id,
//!     "Name" => name,
//! });
//!
//! let descriptor = Customer::describe();
//! assert!(descriptor.property("Id").is_some());
//! assert!(descriptor.property("id").is_none());
//! ```

use crate::error::{Error, Result};
use crate::mapped::Mapped;
use crate::types::SqlType;
use crate::value::Value;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Reads a property as a value
pub type Getter<E> = Arc<dyn Fn(&E) -> Value + Send + Sync>;

/// Assigns a value of the property's declared type
pub type Setter<E> = Arc<dyn Fn(&mut E, Value) -> Result<()> + Send + Sync>;

/// A default-constructible type the mapper can bind parameters from and
/// materialize rows into
pub trait Entity: Default + Send + Sync + 'static {
    /// Build the capability table for this type
    fn describe() -> EntityDescriptor<Self>;
}

/// Whether an entity is a record with properties or a bare scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Record type with named properties
    Structured,
    /// Primitive value with no properties
    Scalar,
}

/// One bindable property of an entity
pub struct Property<E> {
    name: String,
    sql_type: SqlType,
    is_enum: bool,
    getter: Getter<E>,
    setter: Option<Setter<E>>,
}

impl<E> Property<E> {
    /// Exact property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// Whether the property holds an enum stored as its underlying kind
    pub fn is_enum(&self) -> bool {
        self.is_enum
    }

    /// Type a column value must be converted to before assignment
    ///
    /// Nullable enums are assigned through their underlying enum type.
    pub fn assignment_type(&self) -> SqlType {
        if self.is_enum && self.sql_type.nullable {
            self.sql_type.underlying()
        } else {
            self.sql_type
        }
    }

    /// Current value on an entity
    pub fn get(&self, entity: &E) -> Value {
        (self.getter)(entity)
    }

    /// Setter, when the property is writable
    pub fn setter(&self) -> Option<&Setter<E>> {
        self.setter.as_ref()
    }

    /// Assign a value, failing for read-only properties
    pub fn set(&self, entity: &mut E, value: Value) -> Result<()> {
        match &self.setter {
            Some(setter) => setter(entity, value),
            None => Err(Error::internal(format!(
                "property '{}' has no setter",
                self.name
            ))),
        }
    }
}

impl<E> Clone for Property<E> {
    fn clone(&self) -> Self {
        Property {
            name: self.name.clone(),
            sql_type: self.sql_type,
            is_enum: self.is_enum,
            getter: Arc::clone(&self.getter),
            setter: self.setter.clone(),
        }
    }
}

impl<E> fmt::Debug for Property<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("sql_type", &self.sql_type)
            .field("is_enum", &self.is_enum)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// Capability table for an entity type
pub struct EntityDescriptor<E> {
    name: String,
    kind: EntityKind,
    properties: Vec<Property<E>>,
    index: HashMap<String, usize>,
}

impl<E: 'static> EntityDescriptor<E> {
    /// Empty descriptor for a record type
    pub fn structured(name: impl Into<String>) -> Self {
        Self::with_kind(name, EntityKind::Structured)
    }

    /// Descriptor for a primitive type
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::with_kind(name, EntityKind::Scalar)
    }

    fn with_kind(name: impl Into<String>, kind: EntityKind) -> Self {
        EntityDescriptor {
            name: name.into(),
            kind,
            properties: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a read/write property backed by a field
    pub fn field<T, G, M>(self, name: impl Into<String>, get: G, get_mut: M) -> Self
    where
        T: Mapped + 'static,
        G: Fn(&E) -> &T + Send + Sync + 'static,
        M: Fn(&mut E) -> &mut T + Send + Sync + 'static,
    {
        let getter: Getter<E> = Arc::new(move |e: &E| get(e).to_value());
        let setter: Setter<E> = Arc::new(move |e: &mut E, value: Value| {
            *get_mut(e) = T::from_value(value)?;
            Ok(())
        });
        self.push(Property {
            name: name.into(),
            sql_type: T::sql_type(),
            is_enum: T::is_enum(),
            getter,
            setter: Some(setter),
        })
    }

    /// Add a property that can be read but never assigned from a row
    pub fn read_only<T, G>(self, name: impl Into<String>, get: G) -> Self
    where
        T: Mapped + 'static,
        G: Fn(&E) -> T + Send + Sync + 'static,
    {
        self.push(Property {
            name: name.into(),
            sql_type: T::sql_type(),
            is_enum: T::is_enum(),
            getter: Arc::new(move |e: &E| get(e).to_value()),
            setter: None,
        })
    }

    /// Lift every property of an embedded base entity
    ///
    /// Properties already declared on this descriptor shadow base properties
    /// with the same name.
    pub fn extend<B, G, M>(mut self, get: G, get_mut: M) -> Self
    where
        B: Entity,
        G: Fn(&E) -> &B + Send + Sync + 'static,
        M: Fn(&mut E) -> &mut B + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);
        for base in B::describe().properties {
            if self.index.contains_key(&base.name) {
                continue;
            }
            let read = Arc::clone(&base.getter);
            let get = Arc::clone(&get);
            let getter: Getter<E> = Arc::new(move |e: &E| read(get(e)));
            let setter = base.setter.map(|write| {
                let get_mut = Arc::clone(&get_mut);
                Arc::new(move |e: &mut E, value: Value| write(get_mut(e), value)) as Setter<E>
            });
            self = self.push(Property {
                name: base.name,
                sql_type: base.sql_type,
                is_enum: base.is_enum,
                getter,
                setter,
            });
        }
        self
    }

    fn push(mut self, property: Property<E>) -> Self {
        match self.index.get(&property.name) {
            Some(&i) => self.properties[i] = property,
            None => {
                self.index
                    .insert(property.name.clone(), self.properties.len());
                self.properties.push(property);
            }
        }
        self
    }
}

impl<E> EntityDescriptor<E> {
    /// Entity name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structured or scalar
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Whether rows can be materialized into this entity
    pub fn is_structured(&self) -> bool {
        self.kind == EntityKind::Structured
    }

    /// Look up a property by exact, case-sensitive name
    pub fn property(&self, name: &str) -> Option<&Property<E>> {
        self.index.get(name).map(|&i| &self.properties[i])
    }

    /// All properties in declaration order
    pub fn properties(&self) -> &[Property<E>] {
        &self.properties
    }
}

impl<E> fmt::Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("properties", &self.properties)
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Builds each entity's capability table at most once
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or build the descriptor for `E`
    pub fn describe<E: Entity>(&self) -> Result<Arc<EntityDescriptor<E>>> {
        let type_id = TypeId::of::<E>();
        let entry = self
            .descriptors
            .entry(type_id)
            .or_insert_with(|| Arc::new(E::describe()) as Arc<dyn Any + Send + Sync>);

        // The TypeId key guarantees this succeeds
        entry
            .value()
            .clone()
            .downcast::<EntityDescriptor<E>>()
            .map_err(|_| {
                Error::internal(format!(
                    "descriptor type mismatch for {}",
                    std::any::type_name::<E>()
                ))
            })
    }

    /// Number of described entity types
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing has been described yet
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.descriptors.len())
            .finish()
    }
}

// ============================================================================
// Scalar entities
// ============================================================================

macro_rules! scalar_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn describe() -> EntityDescriptor<Self> {
                    EntityDescriptor::scalar(stringify!($ty))
                }
            }
        )*
    };
}

scalar_entity!(
    bool,
    char,
    i8,
    u8,
    i16,
    u16,
    i32,
    u32,
    i64,
    u64,
    f32,
    f64,
    Decimal,
    String,
    Vec<u8>,
    NaiveDateTime,
    Uuid,
);

/// Implement [`Entity`] for a struct by listing `"PropertyName" => field` pairs
///
/// Every listed field must implement [`Mapped`].
#[macro_export]
macro_rules! entity {
    ($ty:ident { $($prop:literal => $field:ident),* $(,)? }) => {
        impl $crate::Entity for $ty {
            fn describe() -> $crate::EntityDescriptor<Self> {
                $crate::EntityDescriptor::structured(stringify!($ty))
                    $(.field($prop, |e: &$ty| &e.$field, |e: &mut $ty| &mut e.$field))*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kind;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Audit {
        created_by: String,
        version: i32,
    }

    crate::entity!(Audit {
        "CreatedBy" => created_by,
        "Version" => version,
    });

    #[derive(Debug, Default)]
    struct Order {
        id: i64,
        total: Option<Decimal>,
        audit: Audit,
    }

    impl Entity for Order {
        fn describe() -> EntityDescriptor<Self> {
            EntityDescriptor::structured("Order")
                .field("Id", |e: &Order| &e.id, |e: &mut Order| &mut e.id)
                .field("Total", |e: &Order| &e.total, |e: &mut Order| &mut e.total)
                .read_only("HasTotal", |e: &Order| e.total.is_some())
                .extend(|e: &Order| &e.audit, |e: &mut Order| &mut e.audit)
        }
    }

    #[test]
    fn test_exact_name_lookup() {
        let d = Order::describe();
        assert!(d.property("Id").is_some());
        assert!(d.property("ID").is_none());
        assert!(d.property("id").is_none());
    }

    #[test]
    fn test_field_get_and_set() {
        let d = Order::describe();
        let mut order = Order::default();
        let id = d.property("Id").unwrap();
        id.set(&mut order, Value::I64(9)).unwrap();
        assert_eq!(order.id, 9);
        assert_eq!(id.get(&order), Value::I64(9));
        assert_eq!(id.sql_type(), SqlType::of(Kind::I64));
    }

    #[test]
    fn test_setter_rejects_other_kinds() {
        let d = Order::describe();
        let mut order = Order::default();
        let err = d
            .property("Id")
            .unwrap()
            .set(&mut order, Value::I32(9))
            .unwrap_err();
        assert!(err.is_cast());
        assert_eq!(order.id, 0);
    }

    #[test]
    fn test_read_only_property() {
        let d = Order::describe();
        let prop = d.property("HasTotal").unwrap();
        assert!(prop.setter().is_none());
        assert_eq!(prop.get(&Order::default()), Value::Bool(false));
    }

    #[test]
    fn test_extended_base_properties() {
        let d = Order::describe();
        let mut order = Order::default();
        let version = d.property("Version").unwrap();
        version.set(&mut order, Value::I32(3)).unwrap();
        assert_eq!(order.audit.version, 3);
        assert_eq!(
            d.property("CreatedBy").unwrap().get(&order),
            Value::String(String::new())
        );
        assert_eq!(d.properties().len(), 5);
    }

    #[test]
    fn test_scalar_descriptor() {
        let d = <i32 as Entity>::describe();
        assert_eq!(d.kind(), EntityKind::Scalar);
        assert!(!d.is_structured());
        assert!(d.properties().is_empty());
    }

    #[test]
    fn test_registry_describes_once() {
        let registry = EntityRegistry::new();
        let a = registry.describe::<Order>().unwrap();
        let b = registry.describe::<Order>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_nullable_enum_assignment_type() {
        #[derive(Debug, Default, Clone, Copy)]
        enum Flag {
            #[default]
            Off,
        }

        impl Mapped for Flag {
            fn sql_type() -> SqlType {
                SqlType::of(Kind::U8)
            }
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::U8(0) => Ok(Flag::Off),
                    other => Err(Error::cast(other.type_name(), "Flag")),
                }
            }
            fn to_value(&self) -> Value {
                Value::U8(0)
            }
            fn is_enum() -> bool {
                true
            }
        }

        #[derive(Debug, Default)]
        struct Holder {
            flag: Option<Flag>,
        }

        crate::entity!(Holder { "Flag" => flag });

        let d = Holder::describe();
        let prop = d.property("Flag").unwrap();
        assert!(prop.is_enum());
        assert_eq!(prop.sql_type(), SqlType::nullable(Kind::U8));
        assert_eq!(prop.assignment_type(), SqlType::of(Kind::U8));
    }
}
