use crate::{
    collection_date::{CollectionDate, DateError, MonthKey},
    config::StudyStart,
    error::{ErrorCode, PipelineError},
    sequence_record::{DATE_FIELD, SequenceRecord},
};
use flu_months_protocol::OrderReport;
use itertools::Itertools;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderStats {
    pub total: usize,
    pub retained: usize,
    pub missing_day: usize,
    pub before_study_start: usize,
    pub malformed_date: usize,
}

/// Records sorted by collection date, co-indexed with their month keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedTimeline {
    month_keys: Vec<MonthKey>,
    records: Vec<SequenceRecord>,
    stats: OrderStats,
}

impl OrderedTimeline {
    pub fn month_keys(&self) -> &[MonthKey] {
        &self.month_keys
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SequenceRecord> {
        self.records
    }

    pub fn stats(&self) -> OrderStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn months_with_data(&self) -> usize {
        self.month_keys.iter().dedup().count()
    }

    pub fn to_report(&self, input_path: &str) -> OrderReport {
        OrderReport {
            input_path: input_path.to_string(),
            total_records: self.stats.total,
            retained: self.stats.retained,
            missing_day: self.stats.missing_day,
            before_study_start: self.stats.before_study_start,
            malformed_date: self.stats.malformed_date,
            months_with_data: self.months_with_data(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordOrderer {
    study_start: StudyStart,
    strict_dates: bool,
}

impl RecordOrderer {
    pub fn new(study_start: StudyStart, strict_dates: bool) -> Self {
        Self {
            study_start,
            strict_dates,
        }
    }

    /// `Ok(None)` for a date without a day; its other components are not
    /// validated.
    fn record_date(record: &SequenceRecord) -> Result<Option<CollectionDate>, DateError> {
        let field = record
            .header_field(DATE_FIELD)
            .ok_or(DateError::MissingField)?;
        if !CollectionDate::has_day_component(&field) {
            return Ok(None);
        }
        CollectionDate::parse(&field).map(Some)
    }

    /// Drops undated records and those from the start year before the start
    /// month, then sorts the rest by
    /// `(year, month, day)`. Records sharing a date keep their input order.
    pub fn order(&self, records: Vec<SequenceRecord>) -> Result<OrderedTimeline, PipelineError> {
        let mut stats = OrderStats {
            total: records.len(),
            ..OrderStats::default()
        };
        let mut keyed: Vec<((i32, u32, u32), MonthKey, SequenceRecord)> =
            Vec::with_capacity(records.len());

        for record in records {
            let date = match Self::record_date(&record) {
                Ok(Some(date)) => date,
                Ok(None) => {
                    debug!(id = record.id(), "skipping record without a day");
                    stats.missing_day += 1;
                    continue;
                }
                Err(e) => {
                    if self.strict_dates {
                        return Err(PipelineError::new(
                            ErrorCode::InvalidInput,
                            format!("Bad collection date in record '{}': {e}", record.id()),
                        ));
                    }
                    warn!(id = record.id(), "skipping record: {e}");
                    stats.malformed_date += 1;
                    continue;
                }
            };
            let (Some(sort_key), Some(month_key)) = (date.sort_key(), date.month_key()) else {
                debug!(id = record.id(), date = %date, "skipping record without a day");
                stats.missing_day += 1;
                continue;
            };
            if !self.study_start.admits(month_key) {
                stats.before_study_start += 1;
                continue;
            }
            keyed.push((sort_key, month_key, record));
        }

        keyed.sort_by_key(|(sort_key, _, _)| *sort_key);
        let (month_keys, records): (Vec<MonthKey>, Vec<SequenceRecord>) = keyed
            .into_iter()
            .map(|(_, month_key, record)| (month_key, record))
            .unzip();
        stats.retained = records.len();

        info!("Number of records in this set: {}", stats.retained);
        debug!(
            missing_day = stats.missing_day,
            before_study_start = stats.before_study_start,
            malformed_date = stats.malformed_date,
            "excluded records"
        );

        Ok(OrderedTimeline {
            month_keys,
            records,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, date: &str) -> SequenceRecord {
        SequenceRecord::new(id, Some(format!("| {date} | Original").as_str()), b"ATGTAA")
    }

    fn ids(timeline: &OrderedTimeline) -> Vec<&str> {
        timeline.records().iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_orders_by_full_date_and_keeps_keys_aligned() {
        let records = vec![
            record("c", "2009-06-02"),
            record("a", "2009-04-20"),
            record("d", "2009-10-01"),
            record("b", "2009-06-01"),
        ];
        let timeline = RecordOrderer::default().order(records).unwrap();
        assert_eq!(ids(&timeline), vec!["a", "b", "c", "d"]);
        let keys: Vec<String> = timeline.month_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2009-04", "2009-06", "2009-06", "2009-10"]);
        assert_eq!(timeline.month_keys().len(), timeline.records().len());
        assert_eq!(timeline.stats().retained, 4);
        assert_eq!(timeline.months_with_data(), 3);
    }

    #[test]
    fn test_unpadded_components_sort_chronologically() {
        let records = vec![
            record("late", "2009-10-1"),
            record("early", "2009-9-30"),
            record("earliest", "2009-9-4"),
        ];
        let timeline = RecordOrderer::default().order(records).unwrap();
        assert_eq!(ids(&timeline), vec!["earliest", "early", "late"]);
    }

    #[test]
    fn test_study_start_and_missing_day_boundaries() {
        let records = vec![
            record("first-day", "2009-04-01"),
            record("day-before", "2009-03-31"),
            record("month-only", "2009-05"),
            record("year-only", "2010"),
            record("older-year", "2008-11-12"),
        ];
        let timeline = RecordOrderer::default().order(records).unwrap();
        assert_eq!(ids(&timeline), vec!["older-year", "first-day"]);
        let stats = timeline.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.missing_day, 2);
        assert_eq!(stats.before_study_start, 1);
        assert_eq!(stats.malformed_date, 0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![
            record("x", "2009-07-07"),
            record("y", "2009-07-07"),
            record("w", "2009-07-06"),
            record("z", "2009-07-07"),
        ];
        let timeline = RecordOrderer::default().order(records).unwrap();
        assert_eq!(ids(&timeline), vec!["w", "x", "y", "z"]);
    }

    #[test]
    fn test_reordering_an_ordered_timeline_is_identity() {
        let records = vec![
            record("b", "2009-08-15"),
            record("a", "2009-05-01"),
            record("skip", "2009-05"),
            record("c", "2009-08-15"),
        ];
        let orderer = RecordOrderer::default();
        let first = orderer.order(records).unwrap();
        let second = orderer.order(first.records().to_vec()).unwrap();
        assert_eq!(first.month_keys(), second.month_keys());
        assert_eq!(first.records(), second.records());
    }

    #[test]
    fn test_malformed_dates_are_skipped_unless_strict() {
        let records = vec![
            record("ok", "2009-06-01"),
            record("bad", "2009-June-01"),
            SequenceRecord::new("no-fields", None, b"ATG"),
        ];
        let timeline = RecordOrderer::default().order(records.clone()).unwrap();
        assert_eq!(ids(&timeline), vec!["ok"]);
        assert_eq!(timeline.stats().malformed_date, 2);

        let err = RecordOrderer::new(StudyStart::default(), true)
            .order(records)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.message.contains("bad"));
    }

    #[test]
    fn test_earlier_years_are_kept() {
        let records = vec![
            record("new", "2009-04-01"),
            record("old", "2008-11-12"),
            record("jan", "2009-01-20"),
        ];
        let timeline = RecordOrderer::default().order(records).unwrap();
        assert_eq!(ids(&timeline), vec!["old", "new"]);
        let keys: Vec<String> = timeline.month_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2008-11", "2009-04"]);
        assert_eq!(timeline.stats().before_study_start, 1);
    }

    #[test]
    fn test_dates_without_a_day_are_not_validated() {
        let records = vec![
            record("ok", "2009-06-01"),
            record("word-month", "2009-Apr"),
            record("year-only", "2010"),
        ];
        let timeline = RecordOrderer::new(StudyStart::default(), true)
            .order(records)
            .unwrap();
        assert_eq!(ids(&timeline), vec!["ok"]);
        assert_eq!(timeline.stats().missing_day, 2);
        assert_eq!(timeline.stats().malformed_date, 0);
    }
}
