use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use futures_util::future::BoxFuture;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::task::JoinHandle;

use crate::persistent::DeliverySchedule;

const STORED_FORMAT: &str = "%H:%M";

lazy_static! {
    static ref TIME_12H: Option<Regex> = Regex::new(r"(?i)^(0?[1-9]|1[0-2]):([0-5][0-9])\s*([AP]M)$").ok();
}

/// Parses `10:30 AM` / `7:45pm` style input.
pub fn parse_time_12h(input: &str) -> Option<NaiveTime> {
    let caps = TIME_12H.as_ref()?.captures(input.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let pm = caps[3].eq_ignore_ascii_case("PM");
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

pub fn format_12h(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

pub fn to_stored(time: NaiveTime) -> String {
    time.format(STORED_FORMAT).to_string()
}

pub fn parse_stored(stored: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(stored, STORED_FORMAT).ok()
}

pub fn timezone(schedule: &DeliverySchedule) -> anyhow::Result<Tz> {
    schedule
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("unknown timezone '{}': {}", schedule.timezone, e))
}

/// First moment strictly after `now` when the wall clock in `now`'s zone shows `at`.
pub fn next_run<Z: TimeZone>(now: &DateTime<Z>, at: NaiveTime) -> Option<DateTime<Z>> {
    let tz = now.timezone();
    let mut day = now.date_naive();
    // a few days are enough to step over any dst gap
    for _ in 0..3 {
        if let Some(candidate) = tz.from_local_datetime(&day.and_time(at)).earliest() {
            if candidate > *now {
                return Some(candidate);
            }
        }
        day = day.checked_add_days(Days::new(1))?;
    }
    None
}

pub type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs a job every day at the time stored in the delivery schedule.
pub struct DailyJob {
    job: Job,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DailyJob {
    pub fn new(job: Job) -> Self {
        Self { job, handle: Mutex::new(None) }
    }

    pub fn is_scheduled(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn cancel(&self) {
        if let Some(handle) = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
    }

    /// Replaces the running timer with one built from the schedule. No time set
    /// means no timer.
    pub fn reschedule(&self, schedule: &DeliverySchedule) -> anyhow::Result<()> {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
            log::info!("removed existing schedule job '{}'", schedule.job_id);
        }
        let Some(stored) = schedule.time.as_deref() else {
            return Ok(());
        };
        let at = parse_stored(stored).ok_or_else(|| anyhow::anyhow!("invalid delivery time '{}'", stored))?;
        let tz = timezone(schedule)?;
        let job = self.job.clone();
        let job_id = schedule.job_id.clone();
        *slot = Some(tokio::spawn(async move {
            loop {
                let now = Utc::now().with_timezone(&tz);
                let Some(next) = next_run(&now, at) else {
                    log::error!("cannot find the next run of '{}'", job_id);
                    return;
                };
                let wait = (next.clone() - now).to_std().unwrap_or_default();
                log::info!("'{}' will run at {}", job_id, next);
                tokio::time::sleep(wait).await;
                job().await;
            }
        }));
        log::info!("scheduled daily report for {} in {}", to_stored(at), tz);
        Ok(())
    }
}

impl Drop for DailyJob {
    fn drop(&mut self) {
        self.cancel();
    }
}
