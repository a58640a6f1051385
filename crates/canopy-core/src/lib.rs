#![forbid(unsafe_code)]

//! Core: cell resolution, row addressing, and hierarchy aggregation.
//!
//! # Role in Canopy
//! `canopy-core` is the data layer. It turns host rows whose cells arrive in
//! several encodings into one canonical aggregated tree that the layout and
//! runtime crates consume.
//!
//! # Primary responsibilities
//! - **Cell**: tagged union over bare scalars, wrapped `{value, formattedValue,
//!   rawValue}` objects and positional group arrays, with one resolver.
//! - **Row / FieldAddress**: config-id-first, field-id-second lookup.
//! - **HierarchyBuilder**: ordered grouping with first-seen sibling order and
//!   a single post-order rollup.
//!
//! # How it fits in the system
//! The runtime (`canopy-runtime`) validates host preconditions, calls
//! [`hierarchy::build`], and materializes the resulting [`TreeNode`] into its
//! interactive arena. Nothing here knows about positions or clicks.

pub mod cell;
pub mod field;
pub mod hierarchy;

pub use cell::{Cell, Scalar, format_number, parse_measure, resolve, resolve_measure};
pub use field::{FieldAddress, FieldRef, Row};
pub use hierarchy::{HierarchyBuilder, ROOT_NAME, TreeNode, build};
