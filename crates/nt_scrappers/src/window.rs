use chrono::{Days, NaiveDate};

/// The calendar dates one crawl run examines: `today` and the
/// `lookback_days - 1` days before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlWindow {
    pub today: NaiveDate,
    pub lookback_days: u32,
    pub oldest_first: bool,
}

impl CrawlWindow {
    pub fn new(today: NaiveDate, lookback_days: u32, oldest_first: bool) -> Self {
        Self {
            today,
            lookback_days,
            oldest_first,
        }
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = (0..self.lookback_days)
            .filter_map(|back| self.today.checked_sub_days(Days::new(u64::from(back))))
            .collect();
        if self.oldest_first {
            dates.reverse();
        }
        dates
    }
}
