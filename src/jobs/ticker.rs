use std::{fmt, time::Duration};

use chrono::{DateTime, Local, TimeZone, Utc};
use cron::Schedule;
use tokio_util::sync::CancellationToken;

use crate::config::DateBasis;

/// Paces a worker loop and owns its shutdown signal.
///
/// Shutdown is only observed between cycles: workers check
/// [`Ticker::is_stopped`] before starting a cycle and [`Ticker::tick`] wakes
/// early when the token is cancelled during the sleep.
#[derive(Debug, Clone)]
pub struct Ticker {
    pace: Pace,
    shutdown: CancellationToken,
}

#[derive(Debug, Clone)]
enum Pace {
    Every(Duration),
    Cron {
        schedule: Box<Schedule>,
        basis: DateBasis,
    },
}

impl Ticker {
    /// Sleep a fixed interval between cycles. The first cycle runs at once.
    pub fn new(interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            pace: Pace::Every(interval),
            shutdown,
        }
    }

    /// Wake at each fire time of `schedule`, read on the `basis` clock.
    /// The first cycle waits for the first fire time.
    pub fn with_schedule(schedule: Schedule, basis: DateBasis, shutdown: CancellationToken) -> Self {
        Self {
            pace: Pace::Cron {
                schedule: Box::new(schedule),
                basis,
            },
            shutdown,
        }
    }

    /// True when the worker should run a cycle before its first tick.
    pub fn runs_immediately(&self) -> bool {
        matches!(self.pace, Pace::Every(_))
    }

    /// True once shutdown has been requested.
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Time left until the next wake, or `None` if the schedule never fires
    /// again.
    pub fn next_delay(&self) -> Option<Duration> {
        match &self.pace {
            Pace::Every(interval) => Some(*interval),
            Pace::Cron { schedule, basis } => match basis {
                DateBasis::Local => delay_after(schedule, Local::now()),
                DateBasis::Utc => delay_after(schedule, Utc::now()),
            },
        }
    }

    /// Sleep until the next wake.
    ///
    /// Returns `false` if shutdown was requested before or during the sleep,
    /// in which case the caller should stop instead of starting a new cycle.
    /// An exhausted schedule also returns `false`.
    pub async fn tick(&self) -> bool {
        let Some(delay) = self.next_delay() else {
            tracing::warn!(schedule = %self, "Schedule has no upcoming fire time");
            return false;
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => !self.shutdown.is_cancelled(),
        }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pace {
            Pace::Every(interval) => write!(f, "every {}s", interval.as_secs()),
            Pace::Cron { schedule, basis } => write!(f, "cron '{schedule}' ({basis:?})"),
        }
    }
}

/// Delay from `now` to the first fire time strictly after it.
fn delay_after<Tz: TimeZone>(schedule: &Schedule, now: DateTime<Tz>) -> Option<Duration> {
    let next = schedule.after(&now).next()?;
    // Rounding can leave the fire time a hair behind `now`; wake at once then.
    Some((next - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use std::{str::FromStr, time::Instant};

    use super::*;

    fn schedule(expr: &str) -> Schedule {
        Schedule::from_str(expr).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_tick_sleeps_for_interval() {
        let ticker = Ticker::new(Duration::from_millis(20), CancellationToken::new());
        let start = Instant::now();
        assert!(ticker.tick().await);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_tick_returns_false_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let ticker = Ticker::new(Duration::from_secs(3600), token);
        assert!(ticker.is_stopped());
        assert!(!ticker.tick().await);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let token = CancellationToken::new();
        let ticker = Ticker::new(Duration::from_secs(3600), token.clone());

        let handle = tokio::spawn(async move { ticker.tick().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let continued = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("tick should wake on cancellation")
            .unwrap();
        assert!(!continued);
    }

    #[test]
    fn test_delay_until_next_daily_fire_time() {
        let daily = schedule("0 0 2 * * *");

        assert_eq!(
            delay_after(&daily, utc("2024-01-01T01:30:00Z")),
            Some(Duration::from_secs(30 * 60))
        );
        // Past today's fire time, so the next one is tomorrow.
        assert_eq!(
            delay_after(&daily, utc("2024-01-01T03:00:00Z")),
            Some(Duration::from_secs(23 * 3600))
        );
    }

    #[test]
    fn test_delay_for_every_minute_schedule() {
        let minutely = schedule("0 */1 * * * *");
        assert_eq!(
            delay_after(&minutely, utc("2024-01-01T00:00:45Z")),
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_exhausted_schedule_has_no_delay() {
        let once = schedule("0 0 0 1 1 * 2000");
        assert_eq!(delay_after(&once, utc("2024-01-01T00:00:00Z")), None);
    }

    #[test]
    fn test_interval_runs_immediately_and_cron_waits() {
        let token = CancellationToken::new();
        assert!(Ticker::new(Duration::from_secs(60), token.clone()).runs_immediately());

        let cron = Ticker::with_schedule(schedule("0 0 2 * * *"), DateBasis::Utc, token);
        assert!(!cron.runs_immediately());
        let delay = cron.next_delay().unwrap();
        assert!(delay <= Duration::from_secs(24 * 3600));
    }

    #[tokio::test]
    async fn test_cron_tick_wakes_at_fire_time() {
        let ticker = Ticker::with_schedule(
            schedule("* * * * * *"),
            DateBasis::Utc,
            CancellationToken::new(),
        );
        let woke = tokio::time::timeout(Duration::from_secs(3), ticker.tick())
            .await
            .expect("every-second schedule should fire");
        assert!(woke);
    }

    #[test]
    fn test_display() {
        let token = CancellationToken::new();
        assert_eq!(
            Ticker::new(Duration::from_secs(300), token.clone()).to_string(),
            "every 300s"
        );
        let cron = Ticker::with_schedule(schedule("0 0 2 * * *"), DateBasis::Utc, token);
        assert!(cron.to_string().contains("0 0 2 * * *"), "{cron}");
    }
}
