//! Query orchestration
//!
//! Every entry point runs the same sequence:
//!
//! 1. Open the connection (scoped; closed on every exit path)
//! 2. Fetch a fresh copy of the procedure's signature
//! 3. Resolve each parameter from the bag, then the entity
//! 4. Execute
//! 5. Copy output parameters to the bag, or stream rows through the
//!    cached projection for reads

use crate::config::{MapperConfig, ReadOptions};
use crate::reader::{BagRef, EntityReader};
use crate::scope::ConnectionScope;
use procmap_core::{
    Command, Connection, Direction, Entity, EntityDescriptor, EntityRegistry, Error, Mapped,
    Result, TypeCoercion, Value,
};
use procmap_params::{PartialParams, SignatureCache, RETURN_VALUE_KEY, RETURN_VALUE_PARAMETER};
use procmap_projection::ProjectionCache;
use std::any::type_name;
use std::sync::Arc;
use tracing::debug;

/// Stored procedure mapper
///
/// Owns the signature, projection and entity caches. Construct one and share
/// it (`&Mapper` or `Arc<Mapper>`) across threads; every method takes
/// `&self`.
///
/// ```
/// use procmap_core::{entity, Column, Direction, Kind, ParameterDescriptor, SqlType, Value};
/// use procmap_executor::memory::{MemoryDatabase, ResultSet};
/// use procmap_executor::Mapper;
/// use procmap_params::PartialParams;
///
/// #[derive(Debug, Default)]
/// struct Customer {
///     id: i32,
///     name: String,
/// }
///
/// entity!(Customer { "Id" => id, "Name" => name });
///
/// let db = MemoryDatabase::new("memory://shop");
/// db.define(
///     "usp_GetCustomer",
///     vec![ParameterDescriptor::new("@Id", SqlType::of(Kind::I32), Direction::Input)],
///     |call| {
///         Ok(ResultSet::new()
///             .columns(vec![
///                 Column::new("Id", SqlType::of(Kind::I32)),
///                 Column::new("Name", SqlType::of(Kind::String)),
///             ])
///             .row(vec![call.input("Id").clone(), Value::from("Ada")]))
///     },
/// );
///
/// let mapper = Mapper::default();
/// let bag = PartialParams::new();
/// bag.add_typed("Id", 7i32, Direction::Input);
///
/// let customer: Customer = mapper
///     .execute_reader_single(db.connect(), "usp_GetCustomer", Some(&bag), None, Default::default())
///     .unwrap();
/// assert_eq!(customer.id, 7);
/// assert_eq!(customer.name, "Ada");
/// ```
pub struct Mapper {
    config: MapperConfig,
    signatures: SignatureCache,
    projections: ProjectionCache,
    entities: EntityRegistry,
    coercion: Arc<TypeCoercion>,
}

impl Mapper {
    /// Create a mapper with its own coercion engine
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the config is invalid.
    pub fn new(config: MapperConfig) -> Result<Self> {
        Self::with_coercion(config, Arc::new(TypeCoercion::new()))
    }

    /// Create a mapper sharing a coercion engine
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the config is invalid.
    pub fn with_coercion(config: MapperConfig, coercion: Arc<TypeCoercion>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, coercion))
    }

    fn build(config: MapperConfig, coercion: Arc<TypeCoercion>) -> Self {
        Mapper {
            signatures: SignatureCache::new(config.parameter_prefix),
            projections: ProjectionCache::new(),
            entities: EntityRegistry::new(),
            coercion,
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Coercion engine, for registering conversions
    pub fn coercion(&self) -> &TypeCoercion {
        &self.coercion
    }

    /// Cached procedure signatures
    pub fn signatures(&self) -> &SignatureCache {
        &self.signatures
    }

    /// Cached row projections
    pub fn projections(&self) -> &ProjectionCache {
        &self.projections
    }

    /// Described entity types
    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Read options derived from the configuration
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions::from(&self.config)
    }

    /// Execute a procedure and return the number of affected rows
    ///
    /// Output parameters and the return value are copied to `params`
    /// afterwards; the return value under `ReturnValue`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] when an input parameter is in
    /// neither the bag nor the entity, or whatever the provider reports.
    pub fn execute_non_query<E: Entity, C: Connection>(
        &self,
        connection: C,
        procedure: &str,
        params: Option<&PartialParams>,
        entity: Option<&E>,
    ) -> Result<i64> {
        let descriptor = self.entities.describe::<E>()?;
        let mut scope = ConnectionScope::open(connection)?;
        let bag = BagRef::new(params);

        let mut command = self.prepare(&mut scope, procedure, bag.get(), &descriptor, entity, true)?;
        debug!(target: "procmap::mapper", procedure, mode = "non_query", "Executing stored procedure");
        let affected = scope.execute_non_query(&mut command)?;

        copy_outputs(&command, bag.get());
        Ok(affected)
    }

    /// Execute a procedure and return the first column of the first row
    ///
    /// `Null` or an empty result yields `R::default()`. Output parameters
    /// are copied to `params` as for
    /// [`execute_non_query`](Self::execute_non_query).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cast`] if the scalar is not of `R`'s kind, plus the
    /// errors of [`execute_non_query`](Self::execute_non_query).
    pub fn execute_scalar<E: Entity, R: Mapped + Default, C: Connection>(
        &self,
        connection: C,
        procedure: &str,
        params: Option<&PartialParams>,
        entity: Option<&E>,
    ) -> Result<R> {
        let descriptor = self.entities.describe::<E>()?;
        let mut scope = ConnectionScope::open(connection)?;
        let bag = BagRef::new(params);

        let mut command = self.prepare(&mut scope, procedure, bag.get(), &descriptor, entity, true)?;
        debug!(target: "procmap::mapper", procedure, mode = "scalar", "Executing stored procedure");
        let value = scope.execute_scalar(&mut command)?;

        copy_outputs(&command, bag.get());
        match value {
            Value::Null => Ok(R::default()),
            value => R::from_value(value),
        }
    }

    /// Execute a procedure and map its rows to entities lazily
    ///
    /// The procedure runs before this returns; rows are read as the returned
    /// iterator advances. Output parameters are not copied to the bag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedEntityKind`] for scalar entity types,
    /// before the connection is opened, plus the errors of
    /// [`execute_non_query`](Self::execute_non_query).
    pub fn execute_reader<'a, E: Entity, C: Connection>(
        &'a self,
        connection: C,
        procedure: &str,
        params: Option<&'a PartialParams>,
        entity: Option<&E>,
        options: ReadOptions,
    ) -> Result<EntityReader<'a, E, C>> {
        let descriptor = self.entities.describe::<E>()?;
        if !descriptor.is_structured() {
            return Err(Error::unsupported_entity(type_name::<E>()));
        }

        let mut scope = ConnectionScope::open(connection)?;
        let bag = BagRef::new(params);

        let mut command = self.prepare(
            &mut scope,
            procedure,
            bag.get(),
            &descriptor,
            entity,
            options.include_return_value,
        )?;
        debug!(target: "procmap::mapper", procedure, mode = "reader", "Executing stored procedure");
        let rows = scope.execute_reader(&mut command)?;
        let projection = self
            .projections
            .get_or_build(procedure, rows.columns(), &descriptor)?;

        Ok(EntityReader::new(
            scope,
            rows,
            projection,
            bag,
            &self.coercion,
            options.implicit_cast,
        ))
    }

    /// Execute a procedure and map its first row, or return `E::default()`
    /// when there are no rows
    ///
    /// # Errors
    ///
    /// Same as [`execute_reader`](Self::execute_reader).
    pub fn execute_reader_single<E: Entity, C: Connection>(
        &self,
        connection: C,
        procedure: &str,
        params: Option<&PartialParams>,
        entity: Option<&E>,
        options: ReadOptions,
    ) -> Result<E> {
        let mut reader = self.execute_reader(connection, procedure, params, entity, options)?;
        reader.next().unwrap_or_else(|| Ok(E::default()))
    }

    /// Build the command with every parameter resolved
    fn prepare<E: Entity, C: Connection>(
        &self,
        scope: &mut ConnectionScope<C>,
        procedure: &str,
        bag: &PartialParams,
        descriptor: &EntityDescriptor<E>,
        entity: Option<&E>,
        include_return_value: bool,
    ) -> Result<Command> {
        let fallback;
        let entity = match entity {
            Some(entity) => entity,
            None => {
                fallback = E::default();
                &fallback
            }
        };

        let parameters = self
            .signatures
            .parameter_set(&mut **scope, procedure, include_return_value)?;
        let mut command = scope.create_command(procedure);

        for mut parameter in parameters {
            if parameter.direction != Direction::ReturnValue {
                if let Some(entry) = bag.get(&parameter.name) {
                    parameter.value = entry.raw_value().clone();
                } else if let Some(property) = descriptor.property(&parameter.name) {
                    parameter.value = property.get(entity);
                } else if parameter.direction == Direction::Input {
                    return Err(Error::missing_parameter(parameter.name));
                }
            }
            command.bind(parameter);
        }

        Ok(command)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::build(MapperConfig::default(), Arc::new(TypeCoercion::new()))
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("config", &self.config)
            .field("signatures", &self.signatures.len())
            .field("projections", &self.projections.len())
            .field("entities", &self.entities.len())
            .finish()
    }
}

/// Copy post-execution output values into the bag
fn copy_outputs(command: &Command, bag: &PartialParams) {
    for parameter in command.parameters() {
        if !parameter.direction.is_output() {
            continue;
        }
        let key = if parameter.direction == Direction::ReturnValue
            || parameter.name == RETURN_VALUE_PARAMETER
        {
            RETURN_VALUE_KEY
        } else {
            parameter.name.as_str()
        };
        bag.add(
            parameter.sql_type,
            key,
            parameter.value.clone(),
            parameter.direction,
        );
    }
}
