//! # lumibulb-domain
//!
//! Pure domain model for controlling a BLE color-changing bulb.
//!
//! ## Responsibilities
//! - **Colors**: hex / RGB conversion and the `rgb(r, g, b)` display form
//! - **Frames**: the bulb's proprietary 10-byte wire encoding
//! - **Named colors**: the closed table spoken phrases resolve against
//! - **Sensor samples**: accelerometer axis readings and their channel mapping
//! - **Connection**: connection states and the fixed device identity
//! - **Speech sessions** and **events** observed by the UI
//! - Error conventions shared by every layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;

pub mod color;
pub mod connection;
pub mod event;
pub mod frame;
pub mod named_color;
pub mod sensor;
pub mod speech;
