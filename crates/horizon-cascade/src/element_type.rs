//! Runtime element types.
//!
//! Style-sheet rules can be bound to a widget type ("every `Button`"), and
//! bound rules also apply to subtypes. The widget tree is external to the
//! cascade engine, so the type hierarchy is described here explicitly: a
//! [`TypeRegistry`] holds a single-inheritance tree rooted at the universal
//! widget type.
//!
//! # Example
//!
//! ```
//! use horizon_cascade::element_type::TypeRegistry;
//!
//! let mut types = TypeRegistry::new("Widget");
//! let button = types.register("Button", types.universal()).unwrap();
//! let checkbox = types.register("Checkbox", button).unwrap();
//!
//! assert!(types.is_subtype_of(checkbox, button));
//! assert!(!types.is_subtype_of(button, checkbox));
//! assert_eq!(checkbox.depth(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::{Error, Result};

/// Handle to a registered element type.
///
/// The handle carries the type's depth below the universal type, which is
/// all that specificity ordering needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementType {
    id: u32,
    depth: u16,
}

impl ElementType {
    /// Number of inheritance steps from the universal type (which has depth 0).
    #[inline]
    pub fn depth(self) -> u16 {
        self.depth
    }

    /// Returns `true` for the universal widget type.
    #[inline]
    pub fn is_universal(self) -> bool {
        self.depth == 0
    }
}

#[derive(Debug)]
struct TypeEntry {
    name: String,
    parent: Option<ElementType>,
}

/// The hierarchy of element types known to the application.
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    by_name: HashMap<String, ElementType>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("universal", &self.entries[0].name)
            .field("types", &self.entries.len())
            .finish()
    }
}

impl TypeRegistry {
    /// Create a registry whose universal type is called `universal_name`.
    pub fn new(universal_name: impl Into<String>) -> Self {
        let name = universal_name.into();
        let universal = ElementType { id: 0, depth: 0 };
        let mut by_name = HashMap::new();
        by_name.insert(name.clone(), universal);
        Self {
            entries: vec![TypeEntry { name, parent: None }],
            by_name,
        }
    }

    /// The universal widget type every other type derives from.
    pub fn universal(&self) -> ElementType {
        ElementType { id: 0, depth: 0 }
    }

    /// Register `name` as a direct subtype of `parent`.
    pub fn register(&mut self, name: impl Into<String>, parent: ElementType) -> Result<ElementType> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(Error::invalid_argument(format!(
                "element type '{name}' is already registered"
            )));
        }
        self.entry(parent)?;

        let id = u32::try_from(self.entries.len())
            .map_err(|_| Error::invalid_argument("type registry is full"))?;
        let depth = parent
            .depth
            .checked_add(1)
            .ok_or_else(|| Error::invalid_argument("type hierarchy is too deep"))?;
        let ty = ElementType { id, depth };

        self.entries.push(TypeEntry {
            name: name.clone(),
            parent: Some(parent),
        });
        self.by_name.insert(name, ty);
        Ok(ty)
    }

    /// Find a type by name.
    pub fn lookup(&self, name: &str) -> Option<ElementType> {
        self.by_name.get(name).copied()
    }

    /// The name of `ty`, or `"?"` for a handle from another registry.
    pub fn name(&self, ty: ElementType) -> &str {
        self.entry(ty).map(|e| e.name.as_str()).unwrap_or("?")
    }

    /// The direct supertype of `ty`.
    pub fn parent(&self, ty: ElementType) -> Option<ElementType> {
        self.entry(ty).ok().and_then(|e| e.parent)
    }

    /// Returns `true` if `ty` equals `ancestor` or derives from it.
    pub fn is_subtype_of(&self, ty: ElementType, ancestor: ElementType) -> bool {
        if ty.depth < ancestor.depth {
            return false;
        }
        let mut current = Some(ty);
        while let Some(t) = current {
            if t == ancestor {
                return true;
            }
            if t.depth <= ancestor.depth {
                return false;
            }
            current = self.parent(t);
        }
        false
    }

    /// Returns `true` if `ty` derives from `ancestor` and is not equal to it.
    pub fn is_strict_subtype_of(&self, ty: ElementType, ancestor: ElementType) -> bool {
        ty != ancestor && self.is_subtype_of(ty, ancestor)
    }

    /// Number of registered types, including the universal type.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; the universal type is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn entry(&self, ty: ElementType) -> Result<&TypeEntry> {
        self.entries
            .get(ty.id as usize)
            .ok_or_else(|| Error::invalid_argument(format!("unknown element type {ty:?}")))
    }
}
