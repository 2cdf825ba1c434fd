//! Virtual accelerometer — forwards hand-fed samples.

use std::sync::Mutex;

use tokio::sync::watch;

use lumibulb_app::ports::MotionSensor;
use lumibulb_domain::sensor::AxisSample;

use super::lock;

/// An accelerometer fed through [`tilt`](Self::tilt).
#[derive(Default)]
pub struct VirtualMotion {
    samples: Mutex<Option<watch::Sender<Option<AxisSample>>>>,
}

impl VirtualMotion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish one reading, replacing any the consumer has not picked up
    /// yet. Returns `false` when not streaming.
    pub fn tilt(&self, sample: AxisSample) -> bool {
        let samples = lock(&self.samples);
        samples
            .as_ref()
            .is_some_and(|samples| samples.send(Some(sample)).is_ok())
    }
}

impl MotionSensor for VirtualMotion {
    fn start_stream(&self, samples: watch::Sender<Option<AxisSample>>) {
        *lock(&self.samples) = Some(samples);
        tracing::debug!("virtual accelerometer streaming");
    }

    fn stop_stream(&self) {
        lock(&self.samples).take();
        tracing::debug!("virtual accelerometer stopped");
    }

    fn is_streaming(&self) -> bool {
        lock(&self.samples).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_ignore_tilt_when_not_streaming() {
        let motion = VirtualMotion::new();
        assert!(!motion.is_streaming());
        assert!(!motion.tilt(AxisSample::new(0.0, 0.0, 0.0)));
    }

    #[tokio::test]
    async fn should_forward_samples_while_streaming() {
        let motion = VirtualMotion::new();
        let (tx, mut rx) = watch::channel(None);
        motion.start_stream(tx);

        assert!(motion.tilt(AxisSample::new(1.0, -1.0, 0.0)));

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(AxisSample::new(1.0, -1.0, 0.0)));
    }

    #[test]
    fn should_keep_only_latest_reading_when_consumer_lags() {
        let motion = VirtualMotion::new();
        let (tx, rx) = watch::channel(None);
        motion.start_stream(tx);

        for step in 0..100_i32 {
            assert!(motion.tilt(AxisSample::new(f64::from(step) / 100.0, 0.0, 0.0)));
        }

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), Some(AxisSample::new(0.99, 0.0, 0.0)));
    }

    #[test]
    fn should_stop_forwarding_after_stop() {
        let motion = VirtualMotion::new();
        let (tx, _rx) = watch::channel(None);
        motion.start_stream(tx);
        motion.stop_stream();

        assert!(!motion.is_streaming());
        assert!(!motion.tilt(AxisSample::new(0.0, 0.0, 0.0)));
    }
}
