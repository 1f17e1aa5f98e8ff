//! The Type Lattice (§4.1) and Type Registry (§4.2).

pub mod class;
pub mod registry;
pub mod restriction;
pub mod ty;

pub use class::{BlockParam, ClassDescriptor, ForeignItem, Instantiation, InstantiationKey, MethodDef, Param};
pub use registry::TypeRegistry;
pub use restriction::Restriction;
pub use ty::{Primitive, Ty};
