use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("record has no date field")]
    MissingField,
    #[error("no year token in date field '{0}'")]
    MissingYear(String),
    #[error("non-numeric {component} '{value}' in date field")]
    NotNumeric {
        component: &'static str,
        value: String,
    },
    #[error("{component} {value} is out of range")]
    OutOfRange { component: &'static str, value: u32 },
}

/// Calendar year-month used to group records into monthly bins.
///
/// Displays as a zero-padded `YYYY-MM`, so string order and `Ord` agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A collection date as embedded in a record header: `<prefix> <year>[-<month>[-<day>]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDate {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl CollectionDate {
    /// Parses the header date field.
    ///
    /// The year is the second token of the first `-` segment split on single
    /// spaces, so `" 2009-04-15"` and `"Collected 2009-04-15"` both yield 2009.
    pub fn parse(field: &str) -> Result<Self, DateError> {
        let mut segments = field.split('-');
        let first = segments.next().unwrap_or_default();
        let year = first
            .split(' ')
            .nth(1)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DateError::MissingYear(field.to_string()))?;
        let year = year.parse::<i32>().map_err(|_| DateError::NotNumeric {
            component: "year",
            value: year.to_string(),
        })?;

        let month = segments
            .next()
            .map(|s| Self::parse_component("month", s, 1..=12))
            .transpose()?;
        let day = segments
            .next()
            .map(|s| Self::parse_component("day", s, 1..=31))
            .transpose()?;

        Ok(Self { year, month, day })
    }

    /// Whether the field has a day segment at all. Checked on the raw `-`
    /// segments, before any component is validated.
    pub fn has_day_component(field: &str) -> bool {
        field.split('-').nth(2).is_some()
    }

    fn parse_component(
        component: &'static str,
        value: &str,
        range: std::ops::RangeInclusive<u32>,
    ) -> Result<u32, DateError> {
        let value = value.trim();
        let n = value.parse::<u32>().map_err(|_| DateError::NotNumeric {
            component,
            value: value.to_string(),
        })?;
        if !range.contains(&n) {
            return Err(DateError::OutOfRange {
                component,
                value: n,
            });
        }
        Ok(n)
    }

    /// Only dates with a day component take part in binning.
    pub fn is_complete(&self) -> bool {
        self.month.is_some() && self.day.is_some()
    }

    pub fn month_key(&self) -> Option<MonthKey> {
        self.month.map(|month| MonthKey::new(self.year, month))
    }

    pub fn sort_key(&self) -> Option<(i32, u32, u32)> {
        Some((self.year, self.month?, self.day?))
    }
}

impl fmt::Display for CollectionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{month:02}")?;
            if let Some(day) = self.day {
                write!(f, "-{day:02}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_date_with_leading_space() {
        let date = CollectionDate::parse(" 2009-04-15 ").unwrap();
        assert_eq!(date.year, 2009);
        assert_eq!(date.month, Some(4));
        assert_eq!(date.day, Some(15));
        assert!(date.is_complete());
        assert_eq!(date.sort_key(), Some((2009, 4, 15)));
        assert_eq!(date.to_string(), "2009-04-15");
    }

    #[test]
    fn test_parse_date_with_prefix_word() {
        let date = CollectionDate::parse("Collected 2010-1-5").unwrap();
        assert_eq!(date.month_key(), Some(MonthKey::new(2010, 1)));
        assert_eq!(date.to_string(), "2010-01-05");
    }

    #[test]
    fn test_degraded_dates_are_incomplete() {
        let month_only = CollectionDate::parse(" 2009-11").unwrap();
        assert_eq!(month_only.day, None);
        assert!(!month_only.is_complete());
        assert_eq!(month_only.sort_key(), None);
        assert_eq!(month_only.month_key(), Some(MonthKey::new(2009, 11)));

        let year_only = CollectionDate::parse(" 2009").unwrap();
        assert_eq!(year_only.month, None);
        assert_eq!(year_only.month_key(), None);
    }

    #[test]
    fn test_day_component_is_counted_before_parsing() {
        assert!(CollectionDate::has_day_component(" 2009-04-15"));
        assert!(CollectionDate::has_day_component(" 2009-Apr-x"));
        assert!(!CollectionDate::has_day_component(" 2009-Apr"));
        assert!(!CollectionDate::has_day_component(" 2010"));
        assert!(!CollectionDate::has_day_component(""));
    }

    #[test]
    fn test_malformed_dates() {
        assert!(matches!(
            CollectionDate::parse("2009-04-15"),
            Err(DateError::MissingYear(_))
        ));
        assert!(matches!(
            CollectionDate::parse(" 2009-Apr-15"),
            Err(DateError::NotNumeric { component: "month", .. })
        ));
        assert_eq!(
            CollectionDate::parse(" 2009-13-01"),
            Err(DateError::OutOfRange {
                component: "month",
                value: 13
            })
        );
        assert_eq!(
            CollectionDate::parse(" 2009-04-00"),
            Err(DateError::OutOfRange {
                component: "day",
                value: 0
            })
        );
    }

    #[test]
    fn test_month_key_order_matches_display_order() {
        let mut keys = vec![
            MonthKey::new(2010, 1),
            MonthKey::new(2009, 12),
            MonthKey::new(2009, 4),
            MonthKey::new(2009, 10),
        ];
        let mut as_strings: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        keys.sort();
        as_strings.sort();
        let sorted: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(sorted, as_strings);
        assert_eq!(sorted[0], "2009-04");
    }
}
