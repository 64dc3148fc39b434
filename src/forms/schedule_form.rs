use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

/// Fields of the schedule widget on the activity page. All times are UTC.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleForm {
    pub activity_day: Option<String>,
    pub activity_hour: Option<String>,
    pub activity_min: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("day must look like MM/DD/YYYY, got {0:?}")]
    Day(String),
    #[error("hour must be 0-23, got {0:?}")]
    Hour(String),
    #[error("minute must be 0-59, got {0:?}")]
    Minute(String),
}

impl ScheduleForm {
    /// Start time requested by the form.
    ///
    /// No day (missing or blank) unschedules the activity. A day without an
    /// hour means midnight; an hour without minutes means on the hour.
    pub fn start(&self) -> Result<Option<NaiveDateTime>, ScheduleError> {
        let Some(day) = non_blank(self.activity_day.as_deref()) else {
            return Ok(None);
        };
        let date = parse_day(day).ok_or_else(|| ScheduleError::Day(day.to_string()))?;

        let time = match non_blank(self.activity_hour.as_deref()) {
            None => NaiveTime::MIN,
            Some(hour_raw) => {
                let hour = hour_raw
                    .parse::<u32>()
                    .ok()
                    .filter(|h| *h < 24)
                    .ok_or_else(|| ScheduleError::Hour(hour_raw.to_string()))?;
                let minute = match non_blank(self.activity_min.as_deref()) {
                    None => 0,
                    Some(min_raw) => min_raw
                        .parse::<u32>()
                        .ok()
                        .filter(|m| *m < 60)
                        .ok_or_else(|| ScheduleError::Minute(min_raw.to_string()))?,
                };
                NaiveTime::from_hms_opt(hour, minute, 0)
                    .ok_or_else(|| ScheduleError::Hour(hour_raw.to_string()))?
            }
        };

        Ok(Some(date.and_time(time)))
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_day(day: &str) -> Option<NaiveDate> {
    let mut parts = day.split('/');
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let dom = parts.next()?.trim().parse::<u32>().ok()?;
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, dom)
}
