//! Virtual device implementations — bulb, speech recognizer, accelerometer.

mod bulb;
mod motion;
mod speech;

pub use bulb::VirtualBulb;
pub use motion::VirtualMotion;
pub use speech::ScriptedSpeech;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock ignoring poisoning: simulated state stays usable after a panicking
/// test thread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
