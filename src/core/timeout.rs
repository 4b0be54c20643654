//! Per-entry deadlines.

use std::time::Duration;

use tokio::sync::oneshot;

use super::error::ConfigError;
use super::spawn::Spawn;

/// Smallest accepted run time, in seconds.
pub const MIN_MAX_TIME_SECS: f64 = 0.001;

/// Validate a requested maximum run time and clamp it to [`MIN_MAX_TIME_SECS`].
///
/// Values too large for a [`Duration`] saturate to [`Duration::MAX`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidMaxTime`] unless `secs` is finite and positive.
pub fn clamp_max_time(secs: f64) -> Result<Duration, ConfigError> {
    if !(secs.is_finite() && secs > 0.0) {
        return Err(ConfigError::InvalidMaxTime(format!(
            "{secs} is not a finite positive number of seconds"
        )));
    }
    Ok(Duration::try_from_secs_f64(secs.max(MIN_MAX_TIME_SECS)).unwrap_or(Duration::MAX))
}

/// Pending deadline of one entry. Dropping it disarms the timer.
#[derive(Debug)]
pub(crate) struct TimeoutHandle {
    _cancel: oneshot::Sender<()>,
}

/// Arm a timer that calls `on_expire` after `duration` unless the returned
/// handle is dropped first.
pub(crate) fn arm<S, F>(spawner: &S, duration: Duration, on_expire: F) -> TimeoutHandle
where
    S: Spawn,
    F: FnOnce() + Send + 'static,
{
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    spawner.spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(duration) => on_expire(),
            _ = cancel_rx => tracing::trace!("timeout disarmed"),
        }
    });
    TimeoutHandle { _cancel: cancel_tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TokioSpawner;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_clamp_floor() {
        assert_eq!(clamp_max_time(1e-9).unwrap(), Duration::from_millis(1));
        assert_eq!(clamp_max_time(1.5).unwrap(), Duration::from_millis(1500));
        assert!(clamp_max_time(-0.5).is_err());
        assert!(clamp_max_time(f64::NAN).is_err());
        assert_eq!(clamp_max_time(1e20).unwrap(), Duration::MAX);
        assert_eq!(clamp_max_time(f64::MAX).unwrap(), Duration::MAX);
    }

    #[tokio::test]
    async fn test_timer_fires() {
        let spawner = TokioSpawner::current().unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let _handle = arm(&spawner, Duration::from_millis(10), move || {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dropped_handle_disarms() {
        let spawner = TokioSpawner::current().unwrap();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = arm(&spawner, Duration::from_millis(30), move || {
            flag.store(true, Ordering::SeqCst);
        });
        drop(handle);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
