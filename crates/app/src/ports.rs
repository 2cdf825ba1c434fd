//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside
//! world: the BLE stack, the speech-recognition engine and the
//! accelerometer driver. Callback-style producers push into tokio channels
//! handed to them by the core.

pub mod motion;
pub mod speech;
pub mod transport;

pub use motion::MotionSensor;
pub use speech::{ListenOptions, SpeechRecognizer};
pub use transport::{BulbTransport, LinkEvent};
