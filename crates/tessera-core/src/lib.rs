//! # tessera-core
//!
//! Foundation types and runtime primitives shared by every tessera crate.
//!
//! - **Branded IDs**: [`ids::WindowId`], [`ids::OwnerId`], [`ids::AnnotationId`], ...
//! - **Viewport model**: [`viewport::ViewportState`] with epsilon comparison
//! - **Annotation model**: [`annotation::AnnotationRecord`], [`annotation::Geometry`],
//!   visibility signatures and normalized highlight shapes
//! - **State dispatch**: typed [`dispatch::StateMessage`] values flowing through one
//!   serializing [`dispatch::Dispatcher`] into the reference [`store::AppState`]
//! - **Scheduling**: [`schedule::TaskSlot`] (cancel-and-replace / single-flight timers)
//!   and [`schedule::FrameClock`] (paint-frame boundaries)
//! - **Logging**: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod annotation;
pub mod dispatch;
pub mod ids;
pub mod logging;
pub mod schedule;
pub mod store;
pub mod test_utils;
pub mod viewport;

pub use dispatch::{DispatchReceiver, Dispatcher, StateMessage};
pub use schedule::{FrameClock, FrameSource, TaskSlot};
pub use viewport::ViewportState;
