//! KML time primitives, stored as the ISO-8601 text KML carries

/// Precision of a time stamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeResolution {
    Year,
    Month,
    Day,
    Second,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeStamp {
    pub when: String,
}

impl TimeStamp {
    pub fn new(when: impl Into<String>) -> Self {
        Self {
            when: when.into().trim().to_string(),
        }
    }

    /// `gYear`, `gYearMonth`, `date` or `dateTime`, judged by the shape of the text
    pub fn resolution(&self) -> TimeResolution {
        match self.when.len() {
            0..=4 => TimeResolution::Year,
            5..=7 => TimeResolution::Month,
            8..=10 => TimeResolution::Day,
            _ => TimeResolution::Second,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.when.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeSpan {
    pub begin: Option<TimeStamp>,
    pub end: Option<TimeStamp>,
}

impl TimeSpan {
    pub fn is_valid(&self) -> bool {
        self.begin.as_ref().is_some_and(TimeStamp::is_valid)
            || self.end.as_ref().is_some_and(TimeStamp::is_valid)
    }
}
