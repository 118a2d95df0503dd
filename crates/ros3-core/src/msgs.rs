// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in robotics messages.
//!
//! [`RobotState`] and [`StringMsg`] travel with the CDR or JSON codecs;
//! [`JointCommand`] is plain old data for the zero-copy archive codec.

use crate::types::{Message, PrimitiveKind, TypeDescriptor, TypeDescriptorBuilder};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Cartesian state of a robot base.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotState {
    /// Metres.
    pub position: [f64; 3],
    /// Metres per second.
    pub velocity: [f64; 3],
    /// Nanoseconds since the UNIX epoch.
    pub timestamp: i64,
}

impl Message for RobotState {
    fn type_descriptor() -> Arc<TypeDescriptor> {
        static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESC.get_or_init(|| {
            Arc::new(
                TypeDescriptorBuilder::new("ros3_msgs::RobotState")
                    .array_field("position", PrimitiveKind::F64, 3)
                    .array_field("velocity", PrimitiveKind::F64, 3)
                    .field("timestamp", PrimitiveKind::I64)
                    .build(),
            )
        })
        .clone()
    }
}

/// Text message, layout-compatible with `std_msgs/String`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StringMsg {
    pub data: String,
}

impl StringMsg {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

impl Message for StringMsg {
    fn type_descriptor() -> Arc<TypeDescriptor> {
        static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESC.get_or_init(|| {
            Arc::new(
                TypeDescriptorBuilder::new("std_msgs::String")
                    .string_field("data")
                    .build(),
            )
        })
        .clone()
    }
}

/// Position/velocity/effort target for one joint.
///
/// `#[repr(C)]` with explicit padding so every byte is initialized.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct JointCommand {
    /// Radians.
    pub position: f64,
    /// Radians per second.
    pub velocity: f64,
    /// Newton metres.
    pub effort: f64,
    pub joint_id: u32,
    pub _pad: u32,
}

impl JointCommand {
    pub fn new(joint_id: u32, position: f64, velocity: f64, effort: f64) -> Self {
        Self {
            position,
            velocity,
            effort,
            joint_id,
            _pad: 0,
        }
    }
}

impl Message for JointCommand {
    fn type_descriptor() -> Arc<TypeDescriptor> {
        static DESC: OnceLock<Arc<TypeDescriptor>> = OnceLock::new();
        DESC.get_or_init(|| {
            Arc::new(
                TypeDescriptorBuilder::new("ros3_msgs::JointCommand")
                    .field("position", PrimitiveKind::F64)
                    .field("velocity", PrimitiveKind::F64)
                    .field("effort", PrimitiveKind::F64)
                    .field("joint_id", PrimitiveKind::U32)
                    .field("_pad", PrimitiveKind::U32)
                    .build(),
            )
        })
        .clone()
    }
}
