//! Daily TSV job reports
//!
//! One file per calendar day, named like `19_October_2026.tsv`, with one row
//! per finished job and one per device skipped for lack of a profile:
//!
//! ```text
//! STATUS   IMEI             MODEL_NAME  CUSTOMIZED_TO  TIME_STAMP
//! PASSED   354567890123456  SM-G991B    XSP            2026-10-19 14:03:27.512094
//! SKIPPED  354567890123464  SM-T220                    2026-10-19 14:05:02.104477
//! ```

use chrono::{DateTime, Local, NaiveDate};
use monitor::{CustomizationJob, Device, JobReport, MonitorError, ReportSink};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

const HEADER: &str = "STATUS\tIMEI\tMODEL_NAME\tCUSTOMIZED_TO\tTIME_STAMP";

const SKIPPED: &str = "SKIPPED";

/// Appends job outcomes to the day's TSV file
pub struct DailyTsvReportSink {
    directory: PathBuf,
    // Serializes appends from concurrent workers
    write: Mutex<()>,
}

impl DailyTsvReportSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            write: Mutex::new(()),
        }
    }

    /// Report file for `date`
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("{}.tsv", date.format("%d_%B_%Y")))
    }

    fn append(&self, timestamp: &DateTime<Local>, row: &str) -> io::Result<PathBuf> {
        let _write = self.write.lock().unwrap_or_else(|e| e.into_inner());

        fs::create_dir_all(&self.directory)?;
        let path = self.file_for(timestamp.date_naive());
        let is_new = !path.exists();

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if is_new {
            writeln!(file, "{}", HEADER)?;
        }
        writeln!(file, "{}", row)?;

        Ok(path)
    }

    fn append_or_report(&self, timestamp: &DateTime<Local>, row: &str) -> monitor::Result<PathBuf> {
        self.append(timestamp, row).map_err(|e| {
            MonitorError::Report(format!(
                "failed to append to {}: {}",
                self.directory.display(),
                e
            ))
        })
    }
}

impl ReportSink for DailyTsvReportSink {
    fn job_started(&self, job: &CustomizationJob) {
        info!(
            serial_no = %job.device.serial_no,
            "Started: {} -> {}", job.device, job.target_profile
        );
    }

    fn job_skipped(&self, device: &Device) -> monitor::Result<()> {
        let timestamp = Local::now();
        let row = format_row(SKIPPED, device, None, &timestamp);
        let path = self.append_or_report(&timestamp, &row)?;
        info!(serial_no = %device.serial_no, "Skipped: {}", device);
        debug!("Recorded {} for {} in {}", SKIPPED, device.serial_no, path.display());
        Ok(())
    }

    fn record(&self, report: &JobReport) -> monitor::Result<()> {
        let row = format_row(
            &report.status.to_string(),
            &report.device,
            Some(report.target_profile.as_str()),
            &report.timestamp,
        );
        let path = self.append_or_report(&report.timestamp, &row)?;
        debug!("Recorded {} for {} in {}", report.status, report.device.serial_no, path.display());
        Ok(())
    }
}

fn format_row(
    status: &str,
    device: &Device,
    customized_to: Option<&str>,
    timestamp: &DateTime<Local>,
) -> String {
    [
        status.to_string(),
        field(device.imei.as_deref()),
        field(device.model_name.as_deref()),
        field(customized_to),
        format_timestamp(timestamp),
    ]
    .join("\t")
}

/// Tabs and newlines would break the row
fn field(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .replace(['\t', '\r', '\n'], " ")
}

fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use monitor::JobStatus;

    fn report(status: JobStatus, day: u32) -> JobReport {
        JobReport {
            device: Device::new("R58M123ABC")
                .with_imei("354567890123456")
                .with_model_name("SM-G991B"),
            status,
            target_profile: "XSP".to_string(),
            timestamp: Local.with_ymd_and_hms(2026, 10, day, 14, 3, 27).unwrap(),
        }
    }

    #[test]
    fn test_file_name() {
        let sink = DailyTsvReportSink::new("/reports");
        let date = NaiveDate::from_ymd_opt(2026, 10, 9).unwrap();
        assert_eq!(
            sink.file_for(date),
            PathBuf::from("/reports/09_October_2026.tsv")
        );
    }

    #[test]
    fn test_rows_are_appended_under_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyTsvReportSink::new(dir.path().join("reports"));

        sink.record(&report(JobStatus::Passed, 19)).unwrap();
        sink.record(&report(JobStatus::Failed, 19)).unwrap();

        let content =
            fs::read_to_string(dir.path().join("reports").join("19_October_2026.tsv")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(
            lines[1],
            "PASSED\t354567890123456\tSM-G991B\tXSP\t2026-10-19 14:03:27.000000"
        );
        assert!(lines[2].starts_with("FAILED\t"));
    }

    #[test]
    fn test_one_file_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyTsvReportSink::new(dir.path());

        sink.record(&report(JobStatus::Passed, 19)).unwrap();
        sink.record(&report(JobStatus::Passed, 20)).unwrap();

        assert!(dir.path().join("19_October_2026.tsv").exists());
        assert!(dir.path().join("20_October_2026.tsv").exists());
    }

    #[test]
    fn test_missing_attributes_and_tabs() {
        let mut report = report(JobStatus::Failed, 19);
        report.device.imei = None;
        report.target_profile = "XSP\tbad".to_string();

        let row = format_row(
            "FAILED",
            &report.device,
            Some(report.target_profile.as_str()),
            &report.timestamp,
        );
        let columns: Vec<&str> = row.split('\t').collect();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[1], "");
        assert_eq!(columns[3], "XSP bad");
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let sink = DailyTsvReportSink::new(blocker.join("reports"));
        assert!(matches!(
            sink.record(&report(JobStatus::Passed, 19)),
            Err(MonitorError::Report(_))
        ));
    }

    #[test]
    fn test_skipped_device_gets_a_row() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DailyTsvReportSink::new(dir.path());
        let device = Device::new("R58M456DEF")
            .with_imei("354567890123464")
            .with_model_name("SM-T220");

        sink.job_skipped(&device).unwrap();

        let path = sink.file_for(Local::now().date_naive());
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], HEADER);
        let columns: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(columns.len(), 5);
        assert_eq!(&columns[..4], ["SKIPPED", "354567890123464", "SM-T220", ""]);
    }
}
