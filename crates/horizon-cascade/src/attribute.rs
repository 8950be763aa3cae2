//! Style attributes and the attribute registry.
//!
//! An [`Attribute<T>`] names a typed style property (a color, a font size, a
//! padding) together with its default value and an optional validator.
//! Attributes are created once, through an [`AttributeRegistry`], and then
//! shared by every cascade node, view and consumer. Two handles are equal
//! only if they refer to the same registration.
//!
//! # Example
//!
//! ```
//! use horizon_cascade::attribute::AttributeRegistry;
//!
//! let mut registry = AttributeRegistry::new();
//! let opacity = registry
//!     .define("effects", "opacity", 1.0_f32)
//!     .validator(|v| (0.0..=1.0).contains(v))
//!     .register()
//!     .unwrap();
//!
//! assert_eq!(*opacity.default_value(), 1.0);
//! assert!(opacity.validate(&2.0).is_err());
//!
//! let found = registry.lookup::<f32>("effects", "opacity").unwrap();
//! assert_eq!(found, opacity);
//! ```

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::{Error, Result};

/// Bound satisfied by every type that can be stored in an attribute.
pub trait AttributeValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static> AttributeValue for T {}

/// Registry-assigned identity of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttributeId(u32);

impl AttributeId {
    /// The raw index of this attribute in its registry.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

type Validator<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct AttributeData<T> {
    id: AttributeId,
    domain: String,
    name: String,
    default: T,
    validator: Option<Validator<T>>,
}

/// A typed handle to a registered style attribute.
///
/// Cloning is cheap; clones compare equal.
pub struct Attribute<T> {
    data: Arc<AttributeData<T>>,
}

impl<T> Clone for Attribute<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T> PartialEq for Attribute<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T> Eq for Attribute<T> {}

impl<T: fmt::Debug> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("id", &self.data.id)
            .field("domain", &self.data.domain)
            .field("name", &self.data.name)
            .field("default", &self.data.default)
            .field("validated", &self.data.validator.is_some())
            .finish()
    }
}

impl<T: AttributeValue> Attribute<T> {
    /// The registry-assigned identity.
    #[inline]
    pub fn id(&self) -> AttributeId {
        self.data.id
    }

    /// The domain this attribute was registered in.
    pub fn domain(&self) -> &str {
        &self.data.domain
    }

    /// The display name of this attribute.
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// `domain.name`, used in diagnostics.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.data.domain, self.data.name)
    }

    /// The value used when no rule applies.
    pub fn default_value(&self) -> &T {
        &self.data.default
    }

    /// Check `value` against the attribute's validator.
    pub fn validate(&self, value: &T) -> Result<()> {
        match &self.data.validator {
            Some(validator) if !validator(value) => Err(Error::invalid_value(
                self.qualified_name(),
                format!("{value:?} was rejected by the validator"),
            )),
            _ => Ok(()),
        }
    }
}

/// Pending registration returned by [`AttributeRegistry::define`].
#[must_use = "call `register` to add the attribute to the registry"]
pub struct AttributeBuilder<'r, T> {
    registry: &'r mut AttributeRegistry,
    domain: String,
    name: String,
    default: T,
    validator: Option<Validator<T>>,
}

impl<T> fmt::Debug for AttributeBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeBuilder")
            .field("domain", &self.domain)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: AttributeValue> AttributeBuilder<'_, T> {
    /// Reject values for which `validator` returns `false`.
    pub fn validator(mut self, validator: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Register the attribute.
    ///
    /// Fails with [`Error::InvalidArgument`] if the domain already has an
    /// attribute with this name, or with [`Error::InvalidValue`] if the
    /// default value does not pass the validator.
    pub fn register(self) -> Result<Attribute<T>> {
        let Self {
            registry,
            domain,
            name,
            default,
            validator,
        } = self;
        registry.insert(domain, name, default, validator)
    }
}

struct Registration {
    domain: String,
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    handle: Box<dyn Any + Send + Sync>,
}

/// Descriptive data about a registered attribute, independent of its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo<'a> {
    /// The attribute's identity.
    pub id: AttributeId,
    /// Domain the attribute belongs to.
    pub domain: &'a str,
    /// Display name.
    pub name: &'a str,
    /// Rust type name of the value type.
    pub type_name: &'static str,
}

/// The set of all style attributes known to an application.
///
/// Built once at startup and then passed by reference to whatever needs to
/// find an attribute by name (typically the style-sheet loader).
#[derive(Default)]
pub struct AttributeRegistry {
    entries: Vec<Registration>,
    by_name: HashMap<(String, String), AttributeId>,
    domains: BTreeMap<String, Vec<AttributeId>>,
}

impl fmt::Debug for AttributeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeRegistry")
            .field("attributes", &self.entries.len())
            .field("domains", &self.domains.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AttributeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining an attribute in `domain`.
    pub fn define<T: AttributeValue>(
        &mut self,
        domain: impl Into<String>,
        name: impl Into<String>,
        default: T,
    ) -> AttributeBuilder<'_, T> {
        AttributeBuilder {
            registry: self,
            domain: domain.into(),
            name: name.into(),
            default,
            validator: None,
        }
    }

    /// Register an attribute without a validator.
    pub fn register<T: AttributeValue>(
        &mut self,
        domain: impl Into<String>,
        name: impl Into<String>,
        default: T,
    ) -> Result<Attribute<T>> {
        self.define(domain, name, default).register()
    }

    fn insert<T: AttributeValue>(
        &mut self,
        domain: String,
        name: String,
        default: T,
        validator: Option<Validator<T>>,
    ) -> Result<Attribute<T>> {
        let key = (domain, name);
        if self.by_name.contains_key(&key) {
            return Err(Error::invalid_argument(format!(
                "attribute '{}.{}' is already registered",
                key.0, key.1
            )));
        }
        let (domain, name) = key;

        let id = AttributeId(u32::try_from(self.entries.len()).map_err(|_| {
            Error::invalid_argument("attribute registry is full")
        })?);
        let attribute = Attribute {
            data: Arc::new(AttributeData {
                id,
                domain: domain.clone(),
                name: name.clone(),
                default,
                validator,
            }),
        };
        attribute.validate(attribute.default_value())?;

        self.entries.push(Registration {
            domain: domain.clone(),
            name: name.clone(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            handle: Box::new(attribute.clone()),
        });
        self.domains.entry(domain.clone()).or_default().push(id);
        self.by_name.insert((domain, name), id);

        Ok(attribute)
    }

    /// Find an attribute by domain and name.
    ///
    /// Fails with [`Error::TypeMismatch`] when the attribute exists but holds
    /// a different value type.
    pub fn lookup<T: AttributeValue>(&self, domain: &str, name: &str) -> Result<Attribute<T>> {
        let id = self
            .by_name
            .get(&(domain.to_owned(), name.to_owned()))
            .copied()
            .ok_or_else(|| Error::invalid_argument(format!("unknown attribute '{domain}.{name}'")))?;
        self.get(id)
    }

    /// Get a typed handle by identity.
    pub fn get<T: AttributeValue>(&self, id: AttributeId) -> Result<Attribute<T>> {
        let entry = self
            .entries
            .get(id.index())
            .ok_or_else(|| Error::invalid_argument(format!("unknown attribute {id:?}")))?;
        if entry.type_id != TypeId::of::<T>() {
            return Err(Error::type_mismatch(entry.type_name, std::any::type_name::<T>()));
        }
        entry
            .handle
            .downcast_ref::<Attribute<T>>()
            .cloned()
            .ok_or_else(|| Error::type_mismatch(entry.type_name, std::any::type_name::<T>()))
    }

    /// Describe an attribute without knowing its type.
    pub fn info(&self, id: AttributeId) -> Option<AttributeInfo<'_>> {
        self.entries.get(id.index()).map(|entry| AttributeInfo {
            id,
            domain: &entry.domain,
            name: &entry.name,
            type_name: entry.type_name,
        })
    }

    /// All attributes registered in `domain`, in registration order.
    pub fn domain(&self, domain: &str) -> impl Iterator<Item = AttributeInfo<'_>> + '_ {
        self.domains
            .get(domain)
            .into_iter()
            .flatten()
            .filter_map(|id| self.info(*id))
    }

    /// Names of all domains, sorted.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    /// Number of registered attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static_assertions::assert_impl_all!(Attribute<f32>: Send, Sync);
static_assertions::assert_impl_all!(AttributeRegistry: Send, Sync);
