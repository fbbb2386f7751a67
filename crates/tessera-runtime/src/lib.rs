//! # tessera-runtime
//!
//! Composition root for the tessera managers.
//!
//! [`Runtime::start`] validates settings, builds the context pool, realtime
//! channel, viewport synchronizer and annotation router around one
//! [`Dispatcher`](tessera_core::Dispatcher), and drives a
//! [`FrameClock`](tessera_core::FrameClock) headlessly.
//! [`Runtime::shutdown`] undoes all of it. [`HeadlessPlatform`] is the
//! in-memory context platform used by the `tessera` binary.

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod headless;
pub mod runtime;

pub use errors::RuntimeError;
pub use headless::{HeadlessContext, HeadlessPlatform, HeadlessSurface};
pub use runtime::Runtime;
