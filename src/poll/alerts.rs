//! Clearing a run of mutually exclusive dialogs.

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::geometry::Point;

/// Minimum full sweeps before the timeout is honored, for slow renders.
pub const MIN_SWEEPS: u32 = 2;

/// Runs up to `repeat` clearing rounds and reports whether any dialog was cleared.
///
/// `sweep_and_act` captures once, checks every applicable dialog and acts on
/// the first one found, returning the pointer coordinate it used. A round
/// ends at the first hit, or once at least [`MIN_SWEEPS`] sweeps have run
/// and `timeout` has passed. A round that clears nothing ends the whole run.
pub fn clear_alerts(
    repeat: u32,
    timeout: Duration,
    mut sweep_and_act: impl FnMut() -> Result<Option<Point>>,
) -> Result<bool> {
    let mut cleared_any = false;

    for round in 1..=repeat {
        let start = Instant::now();
        let mut sweeps = 0u32;
        let cleared = loop {
            if let Some(point) = sweep_and_act()? {
                break Some(point);
            }
            sweeps += 1;
            if start.elapsed() > timeout && sweeps >= MIN_SWEEPS {
                break None;
            }
        };

        match cleared {
            Some(point) => {
                crate::log(&format!(
                    "Alert round {}/{}: cleared at ({:.1}, {:.1})",
                    round, repeat, point.x, point.y
                ));
                cleared_any = true;
            }
            None => {
                crate::log(&format!(
                    "Alert round {}/{}: nothing to clear after {} sweeps",
                    round, repeat, sweeps
                ));
                break;
            }
        }
    }

    Ok(cleared_any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_still_sweeps_twice() {
        let mut sweeps = 0;
        let cleared = clear_alerts(1, Duration::ZERO, || {
            sweeps += 1;
            std::thread::sleep(Duration::from_millis(1));
            Ok(None)
        })
        .unwrap();
        assert!(!cleared);
        assert_eq!(sweeps, 2);
    }

    #[test]
    fn test_stops_early_when_round_clears_nothing() {
        let mut calls = 0;
        let cleared = clear_alerts(5, Duration::ZERO, || {
            calls += 1;
            std::thread::sleep(Duration::from_millis(1));
            Ok(if calls == 1 {
                Some(Point::new(1.0, 1.0))
            } else {
                None
            })
        })
        .unwrap();
        assert!(cleared);
        // One hit, then one empty round of two sweeps.
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_repeat_bounds_rounds() {
        let mut calls = 0;
        let cleared = clear_alerts(3, Duration::from_secs(5), || {
            calls += 1;
            Ok(Some(Point::new(0.0, 0.0)))
        })
        .unwrap();
        assert!(cleared);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_zero_repeat_does_nothing() {
        let cleared = clear_alerts(0, Duration::ZERO, || -> Result<Option<Point>> {
            panic!("should not sweep")
        })
        .unwrap();
        assert!(!cleared);
    }
}
