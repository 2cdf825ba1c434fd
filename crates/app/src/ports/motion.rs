//! Motion port — the accelerometer driver.

use std::sync::Arc;

use tokio::sync::watch;

use lumibulb_domain::sensor::AxisSample;

/// An accelerometer that streams normalized samples.
///
/// The channel holds a single slot: each reading replaces the previous one,
/// so a slow consumer only ever sees the latest orientation.
pub trait MotionSensor: Send + Sync {
    /// Start publishing readings into `samples`. Dropping the sender ends
    /// the stream.
    fn start_stream(&self, samples: watch::Sender<Option<AxisSample>>);

    /// Stop producing samples.
    fn stop_stream(&self);

    /// Whether the driver is currently streaming.
    fn is_streaming(&self) -> bool;
}

impl<T: MotionSensor> MotionSensor for Arc<T> {
    fn start_stream(&self, samples: watch::Sender<Option<AxisSample>>) {
        (**self).start_stream(samples);
    }

    fn stop_stream(&self) {
        (**self).stop_stream();
    }

    fn is_streaming(&self) -> bool {
        (**self).is_streaming()
    }
}
