//! Control-plane layer.
//!
//! Owns the route namespace: address normalization/validation and the route
//! tree with its insert, in-place replace, and flatten semantics. This layer
//! is responsible for sibling-set uniqueness and for preserving descendants
//! across a route redefinition.

pub(crate) mod address;
pub(crate) mod route_tree;
