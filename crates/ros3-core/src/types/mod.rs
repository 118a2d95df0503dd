// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message schemas.
//!
//! Every topic carries a [`TypeDescriptor`]. Codecs walk it to lay out bytes
//! (CDR field order and alignment, archive size checks) and nodes compare
//! [`TypeDescriptor::type_hash`] values to reject mismatched bindings.
//!
//! Typed messages implement [`Message`] to supply their descriptor:
//!
//! ```
//! use ros3_core::types::{Message, PrimitiveKind, TypeDescriptor, TypeDescriptorBuilder};
//! use std::sync::{Arc, OnceLock};
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct Battery {
//!     voltage: f32,
//!     percentage: u8,
//! }
//!
//! impl Message for Battery {
//!     fn type_descriptor() -> Arc<TypeDescriptor> {
//!         static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
//!         DESC.get_or_init(|| {
//!             Arc::new(
//!                 TypeDescriptorBuilder::new("demo::Battery")
//!                     .field("voltage", PrimitiveKind::F32)
//!                     .field("percentage", PrimitiveKind::U8)
//!                     .build(),
//!             )
//!         })
//!         .clone()
//!     }
//! }
//! ```

mod builder;
mod descriptor;

pub use builder::{EnumBuilder, TypeDescriptorBuilder};
pub use descriptor::{
    ArrayDescriptor, EnumDescriptor, EnumVariant, FieldDescriptor, PrimitiveKind,
    SequenceDescriptor, TypeDescriptor, TypeKind,
};

use std::sync::Arc;

/// A type that can travel on a topic.
pub trait Message: Send + Sync + 'static {
    /// Schema used by codecs and for topic type checks.
    fn type_descriptor() -> Arc<TypeDescriptor>;
}
