//! Racing several template configurations against shared captures.

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::geometry::MatchResult;

/// The configuration that matched first and its result.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceHit {
    pub index: usize,
    pub result: MatchResult,
}

/// Tries `configs` in list order and stops at the first one that matches.
///
/// List order wins over score: a later configuration with a better match
/// never displaces an earlier hit.
pub fn first_hit<C>(
    configs: &[C],
    mut matcher: impl FnMut(&C) -> Result<MatchResult>,
) -> Result<Option<RaceHit>> {
    for (index, config) in configs.iter().enumerate() {
        let result = matcher(config)?;
        if result.found() {
            return Ok(Some(RaceHit { index, result }));
        }
    }
    Ok(None)
}

/// Repeats `sweep` until it hits or a full sweep ends past `timeout`.
///
/// No interval sleep between sweeps. A miss is `Ok(None)`.
pub fn race(
    timeout: Duration,
    mut sweep: impl FnMut() -> Result<Option<RaceHit>>,
) -> Result<Option<RaceHit>> {
    let start = Instant::now();
    let mut sweeps = 0u32;
    loop {
        if let Some(hit) = sweep()? {
            crate::log(&format!(
                "Race: config #{} matched on sweep {}",
                hit.index,
                sweeps + 1
            ));
            return Ok(Some(hit));
        }
        sweeps += 1;
        if start.elapsed() > timeout {
            crate::log(&format!(
                "Race: no config matched in {} sweeps ({:.2}s)",
                sweeps,
                start.elapsed().as_secs_f64()
            ));
            return Ok(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Payload, Point, Region};

    fn hit(score: f32) -> MatchResult {
        MatchResult::new(vec![Region::from_bounding_box(
            Point::new(0.0, 0.0),
            Point::new(4.0, 4.0),
            Payload::Score(score),
        )])
    }

    #[test]
    fn test_first_hit_prefers_list_order() {
        let configs = ["a", "b", "c"];
        let res = first_hit(&configs, |name| {
            Ok(match *name {
                "a" => MatchResult::not_found(),
                "b" => hit(0.75),
                _ => hit(0.99),
            })
        })
        .unwrap()
        .unwrap();
        assert_eq!(res.index, 1);
        assert_eq!(res.result.regions[0].score(), Some(0.75));
    }

    #[test]
    fn test_first_hit_stops_checking_after_hit() {
        let mut checked = Vec::new();
        let configs = [0, 1, 2];
        first_hit(&configs, |i| {
            checked.push(*i);
            Ok(if *i == 1 { hit(0.9) } else { MatchResult::not_found() })
        })
        .unwrap();
        assert_eq!(checked, vec![0, 1]);
    }

    #[test]
    fn test_race_times_out_with_none() {
        let start = Instant::now();
        let res = race(Duration::from_millis(50), || {
            std::thread::sleep(Duration::from_millis(2));
            Ok(None)
        })
        .unwrap();
        assert!(res.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_race_returns_hit_from_later_sweep() {
        let mut sweeps = 0;
        let res = race(Duration::from_secs(5), || {
            sweeps += 1;
            Ok((sweeps == 3).then(|| RaceHit {
                index: 1,
                result: hit(0.9),
            }))
        })
        .unwrap()
        .unwrap();
        assert_eq!(res.index, 1);
        assert_eq!(sweeps, 3);
    }
}
