use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    SingleDay(NaiveDate),
    Today,
    Week(NaiveDate),
    UnboundedFuture,
    CompletedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionFilter {
    Incomplete,
    Completed,
}

/// Half-open `[start, end)` selection. Missing bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub completion: CompletionFilter,
}

impl Window {
    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
            completion: CompletionFilter::Incomplete,
        }
    }

    pub fn completed_only() -> Self {
        Self {
            start: None,
            end: None,
            completion: CompletionFilter::Completed,
        }
    }

    pub fn is_time_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// Undated items only belong to windows without time bounds.
    pub fn contains(&self, instant: Option<DateTime<Utc>>) -> bool {
        if self.completion == CompletionFilter::Completed || !self.is_time_bounded() {
            return true;
        }
        let Some(instant) = instant else {
            return false;
        };
        self.start.is_none_or(|start| instant >= start) && self.end.is_none_or(|end| instant < end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSelector {
    timezone: Tz,
}

impl Default for WindowSelector {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl WindowSelector {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn from_timezone_name(name: &str) -> Result<Self, String> {
        let timezone = name
            .trim()
            .parse::<Tz>()
            .map_err(|error| format!("invalid timezone '{name}': {error}"))?;
        Ok(Self::new(timezone))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::MIN);
        if let Some(local) = self.timezone.from_local_datetime(&midnight).earliest() {
            return local.with_timezone(&Utc);
        }
        // Midnight skipped by a DST jump: the day starts at the first valid local minute.
        (1..=180)
            .find_map(|minutes| {
                self.timezone
                    .from_local_datetime(&(midnight + Duration::minutes(minutes)))
                    .earliest()
            })
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }

    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let next = date.succ_opt().unwrap_or(date);
        (self.start_of_day(date), self.start_of_day(next))
    }

    pub fn week_start(&self, date: NaiveDate) -> NaiveDate {
        let offset = u64::from(date.weekday().num_days_from_monday());
        date.checked_sub_days(Days::new(offset))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn resolve(&self, kind: WindowKind, now: DateTime<Utc>) -> Window {
        match kind {
            WindowKind::SingleDay(date) => self.single_day(date),
            WindowKind::Today => self.single_day(self.local_date(now)),
            WindowKind::Week(date) => {
                let monday = self.week_start(date);
                let next_monday = monday
                    .checked_add_days(Days::new(7))
                    .unwrap_or(NaiveDate::MAX);
                Window {
                    start: Some(self.start_of_day(monday)),
                    end: Some(self.start_of_day(next_monday)),
                    completion: CompletionFilter::Incomplete,
                }
            }
            WindowKind::UnboundedFuture => Window::unbounded(),
            WindowKind::CompletedOnly => Window::completed_only(),
        }
    }

    fn single_day(&self, date: NaiveDate) -> Window {
        let (start, end) = self.day_bounds(date);
        Window {
            start: Some(start),
            end: Some(end),
            completion: CompletionFilter::Incomplete,
        }
    }
}
