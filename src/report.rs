//! Parsing of the human-readable reports printed by `altool`.
//!
//! `altool --notarization-info` answers with an indented `Label: value` block,
//! not JSON, and which labels appear depends on the submission's state. The
//! parser therefore runs one independent line-anchored match per field and
//! leaves unmatched fields as `None`; it never fails.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// Where a submission stands according to the notarization service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotarizationStatus {
    Invalid,
    InProgress,
    Success,
    /// A status literal this crate does not know, kept verbatim.
    Other(String),
}

impl NotarizationStatus {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "invalid" => Self::Invalid,
            "in progress" => Self::InProgress,
            "success" => Self::Success,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Invalid => "invalid",
            Self::InProgress => "in progress",
            Self::Success => "success",
            Self::Other(s) => s,
        }
    }

    /// Whether the service is still working on the submission.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl fmt::Display for NotarizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NotarizationStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One notarization report, as far as it could be read.
///
/// `status_code` and `status_message` are only reported once the status has
/// left `in progress`; check [`NotarizationInfo::status`] before relying on
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotarizationInfo {
    pub uuid: Option<String>,
    /// Report timestamp, `None` when missing or not in a known format
    pub date: Option<DateTime<Utc>>,
    /// The `Date:` value exactly as reported
    pub date_text: Option<String>,
    pub status: Option<NotarizationStatus>,
    pub log_file_url: Option<String>,
    pub status_code: Option<i32>,
    pub status_message: Option<String>,
}

fn field_pattern(label: &str) -> Regex {
    let pattern = format!(r"(?m)^[ \t]*{}: (.+?)[ \t]*\r?$", regex::escape(label));
    Regex::new(&pattern).unwrap_or_else(|e| panic!("invalid pattern for {label}: {e}"))
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| field_pattern("RequestUUID"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| field_pattern("Date"));
static STATUS_RE: Lazy<Regex> = Lazy::new(|| field_pattern("Status"));
static LOG_URL_RE: Lazy<Regex> = Lazy::new(|| field_pattern("LogFileURL"));
static STATUS_CODE_RE: Lazy<Regex> = Lazy::new(|| field_pattern("Status Code"));
static STATUS_MESSAGE_RE: Lazy<Regex> = Lazy::new(|| field_pattern("Status Message"));

static UPLOAD_UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*RequestUUID = (.+?)[ \t]*\r?$")
        .unwrap_or_else(|e| panic!("invalid upload pattern: {e}"))
});

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse a `--notarization-info` report.
///
/// Fields without a matching line stay `None`. An unknown status literal is
/// passed through as [`NotarizationStatus::Other`], an unreadable date leaves
/// `date` empty but keeps `date_text`, and the literal `(null)` log URL
/// becomes `None`.
#[must_use]
pub fn parse_notarization_info(text: &str) -> NotarizationInfo {
    let mut info = NotarizationInfo::default();

    if let Some(uuid) = capture(&UUID_RE, text) {
        info.uuid = Some(uuid.to_string());
    }
    if let Some(date) = capture(&DATE_RE, text) {
        info.date = parse_report_date(date);
        if info.date.is_none() {
            tracing::debug!(date, "unrecognized date format in notarization report");
        }
        info.date_text = Some(date.to_string());
    }
    if let Some(status) = capture(&STATUS_RE, text) {
        info.status = Some(NotarizationStatus::parse(status));
    }
    if let Some(url) = capture(&LOG_URL_RE, text) {
        info.log_file_url = Some(url.to_string());
    }
    if let Some(code) = capture(&STATUS_CODE_RE, text) {
        info.status_code = parse_leading_int(code);
    }
    if let Some(message) = capture(&STATUS_MESSAGE_RE, text) {
        info.status_message = Some(message.to_string());
    }

    if info.log_file_url.as_deref() == Some("(null)") {
        info.log_file_url = None;
    }

    info
}

/// Extract the request id from `altool --notarize-app` output
/// (`RequestUUID = <id>`).
#[must_use]
pub fn parse_request_uuid(text: &str) -> Option<String> {
    capture(&UPLOAD_UUID_RE, text).map(str::to_string)
}

/// Accepts RFC 3339 and the `2019-05-03 20:51:11 +0000` / `… GMT` forms
/// `altool` prints.
fn parse_report_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z") {
        return Some(date.with_timezone(&Utc));
    }
    let naive = value
        .strip_suffix(" GMT")
        .or_else(|| value.strip_suffix(" UTC"))?;
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|date| date.and_utc())
}

/// Parse an optionally signed run of leading digits, ignoring the rest.
fn parse_leading_int(value: &str) -> Option<i32> {
    let value = value.trim_start();
    let sign_len = usize::from(value.starts_with(['-', '+']));
    let digits = value[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    value[..sign_len + digits].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SUCCESS_REPORT: &str = "\
No errors getting notarization info.

          Date: 2020-01-02T00:00:00Z
          Hash: 6c3e2f
    LogFileURL: https://example.test/log
   RequestUUID: abc-123
        Status: success
   Status Code: 0
Status Message: Package Approved
";

    #[test]
    fn test_parses_complete_report() {
        let info = parse_notarization_info(SUCCESS_REPORT);

        assert_eq!(info.uuid.as_deref(), Some("abc-123"));
        assert_eq!(
            info.date,
            Some(Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(info.date_text.as_deref(), Some("2020-01-02T00:00:00Z"));
        assert_eq!(info.status, Some(NotarizationStatus::Success));
        assert_eq!(info.status_code, Some(0));
        assert_eq!(info.status_message.as_deref(), Some("Package Approved"));
        assert_eq!(info.log_file_url.as_deref(), Some("https://example.test/log"));
    }

    #[test]
    fn test_in_progress_report_leaves_rest_absent() {
        let info = parse_notarization_info("RequestUUID: abc-123\nStatus: in progress\n");

        assert_eq!(
            info,
            NotarizationInfo {
                uuid: Some("abc-123".to_string()),
                status: Some(NotarizationStatus::InProgress),
                ..NotarizationInfo::default()
            }
        );
        assert!(info.status.as_ref().unwrap().is_pending());
    }

    #[test]
    fn test_null_log_url_becomes_none() {
        let info = parse_notarization_info(
            "   RequestUUID: abc-123\n        Status: invalid\n    LogFileURL: (null)\n",
        );
        assert_eq!(info.log_file_url, None);
        assert_eq!(info.status, Some(NotarizationStatus::Invalid));
    }

    #[test]
    fn test_unknown_status_passes_through() {
        let info = parse_notarization_info("Status: queued for review\n");
        assert_eq!(
            info.status,
            Some(NotarizationStatus::Other("queued for review".to_string()))
        );
        assert_eq!(info.status.unwrap().to_string(), "queued for review");
    }

    #[test]
    fn test_status_label_does_not_match_longer_labels() {
        let info = parse_notarization_info("Status Code: 2\nStatus Message: Package Invalid\n");
        assert_eq!(info.status, None);
        assert_eq!(info.status_code, Some(2));
        assert_eq!(info.status_message.as_deref(), Some("Package Invalid"));
    }

    #[test]
    fn test_malformed_values_are_permissive() {
        let info = parse_notarization_info("Date: last tuesday\nStatus Code: n/a\n");
        assert_eq!(info.date, None);
        assert_eq!(info.date_text.as_deref(), Some("last tuesday"));
        assert_eq!(info.status_code, None);
    }

    #[test]
    fn test_empty_and_unrelated_input() {
        assert_eq!(parse_notarization_info(""), NotarizationInfo::default());
        assert_eq!(
            parse_notarization_info("*** Error: Unable to find requested file(s)\n"),
            NotarizationInfo::default()
        );
    }

    #[test]
    fn test_crlf_and_last_line_without_newline() {
        let info = parse_notarization_info("RequestUUID: abc-123\r\nStatus: success");
        assert_eq!(info.uuid.as_deref(), Some("abc-123"));
        assert_eq!(info.status, Some(NotarizationStatus::Success));
    }

    #[test]
    fn test_altool_date_formats() {
        let expected = Utc.with_ymd_and_hms(2019, 5, 3, 20, 51, 11).unwrap();
        assert_eq!(parse_report_date("2019-05-03 20:51:11 +0000"), Some(expected));
        assert_eq!(parse_report_date("2019-05-03 20:51:11 GMT"), Some(expected));
        assert_eq!(parse_report_date("2019-05-03 22:51:11 +0200"), Some(expected));
        assert_eq!(parse_report_date("yesterday"), None);
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(parse_leading_int("0"), Some(0));
        assert_eq!(parse_leading_int("2 (invalid)"), Some(2));
        assert_eq!(parse_leading_int("-1"), Some(-1));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[test]
    fn test_request_uuid_from_upload_output() {
        let output = "2020-01-02 10:00:00.000 altool[123:456] No errors uploading 'Kodegen.zip'.\n\
                      RequestUUID = 2EFE2717-52EF-43A5-96DC-0797E4CA1041\n";
        assert_eq!(
            parse_request_uuid(output).as_deref(),
            Some("2EFE2717-52EF-43A5-96DC-0797E4CA1041")
        );
        assert_eq!(parse_request_uuid("RequestUUID: abc"), None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let info = parse_notarization_info(SUCCESS_REPORT);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["logFileUrl"], "https://example.test/log");
        assert_eq!(json["statusCode"], 0);
        assert_eq!(json["status"], "success");
    }
}
