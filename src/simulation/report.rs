//! Per-person console report
//!
//! Each person's report is built in full before the shared sink is locked, so
//! lines from different workers never interleave.

use chrono::{DateTime, Utc};
use std::fmt;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::person::Person;
use crate::types::LogDetail;

/// Writes one report per recorded person
pub struct ConsoleReporter {
    detail: LogDetail,
    sink: Mutex<Box<dyn Write + Send>>,
}

impl fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleReporter").field("detail", &self.detail).finish()
    }
}

impl ConsoleReporter {
    /// Reporter writing to stdout
    pub fn new(detail: LogDetail) -> Self {
        Self::with_writer(detail, Box::new(io::stdout()))
    }

    /// Reporter writing to `writer`
    pub fn with_writer(detail: LogDetail, writer: Box<dyn Write + Send>) -> Self {
        Self { detail, sink: Mutex::new(writer) }
    }

    /// Configured detail level
    pub fn detail(&self) -> LogDetail {
        self.detail
    }

    /// Render the report for `person` in population slot `slot`
    pub fn render(&self, person: &Person, slot: usize, time: DateTime<Utc>, is_alive: bool) -> String {
        let mut out = String::new();
        let line = format!(
            "{} -- {} ({} y/o {}) {}, {} {}",
            slot + 1,
            person.name(),
            person.age_in_years(time),
            person.gender(),
            person.city(),
            person.state(),
            if is_alive { "" } else { "DECEASED" }
        );
        out.push_str(line.trim_end());
        out.push('\n');

        if self.detail == LogDetail::Detailed {
            out.push_str("ATTRIBUTES\n");
            for (key, value) in &person.attributes {
                let _ = writeln!(out, "  * {} = {}", key, value);
            }
            let _ = writeln!(out, "SYMPTOMS: {}", person.symptom_total());
            let _ = writeln!(out, "{}", person.record.text_summary());
            out.push_str("VITAL SIGNS\n");
            for (name, value) in person.vital_signs() {
                let _ = writeln!(out, "  * {:>25} = {:6.2}", name, value);
            }
            out.push_str("-----\n");
        }
        out
    }

    /// Write the report for `person`; does nothing at [`LogDetail::None`]
    pub fn report(&self, person: &Person, slot: usize, time: DateTime<Utc>, is_alive: bool) -> io::Result<()> {
        if self.detail == LogDetail::None {
            return Ok(());
        }
        let text = self.render(person, slot, time, is_alive);
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(text.as_bytes())?;
        sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::keys;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn person() -> Person {
        let mut person = Person::new(1, 1);
        person.set_attribute(keys::NAME, "Mary Smith");
        person.set_attribute(keys::GENDER, "F");
        person.set_attribute(keys::CITY, "Springfield");
        person.set_attribute(keys::STATE, "Massachusetts");
        person.set_attribute(keys::BIRTHDATE, Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap());
        person.set_vital_sign("Body Height", 165.0);
        person
    }

    #[test]
    fn test_simple_line() {
        let reporter = ConsoleReporter::with_writer(LogDetail::Simple, Box::new(io::sink()));
        let t = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            reporter.render(&person(), 0, t, true),
            "1 -- Mary Smith (30 y/o F) Springfield, Massachusetts\n"
        );
        assert_eq!(
            reporter.render(&person(), 4, t, false),
            "5 -- Mary Smith (30 y/o F) Springfield, Massachusetts DECEASED\n"
        );
    }

    #[test]
    fn test_detailed_report_is_written_once() {
        let buffer = SharedBuffer::default();
        let reporter = ConsoleReporter::with_writer(LogDetail::Detailed, Box::new(buffer.clone()));
        let t = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        reporter.report(&person(), 0, t, true).unwrap();

        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("ATTRIBUTES\n  * birthdate = 1990-01-01 00:00:00"));
        assert!(text.contains("SYMPTOMS: 0"));
        assert!(text.contains("VITAL SIGNS"));
        assert!(text.contains("Body Height = 165.00"));
        assert!(text.ends_with("-----\n"));
    }

    #[test]
    fn test_none_writes_nothing() {
        let buffer = SharedBuffer::default();
        let reporter = ConsoleReporter::with_writer(LogDetail::None, Box::new(buffer.clone()));
        let t = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        reporter.report(&person(), 0, t, true).unwrap();
        assert!(buffer.0.lock().unwrap().is_empty());
    }
}
