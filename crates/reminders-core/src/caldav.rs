//! Optional task-list integration: mirrors catalog entries as CalDAV `VTODO`s.

use crate::catalog::ReminderSpec;
use crate::config::CaldavConfig;
use crate::error::{ReminderError, Result};
use chrono::Utc;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::{Method, Url};
use std::sync::OnceLock;
use std::time::Duration;

pub const TASK_CATEGORY: &str = "CSV_Reminders";

/// Narrow capability the orchestrator uses to push reminders to an external
/// task list.
pub trait TaskListSink {
    /// Create a task for `spec` and return the id the list assigned to it.
    fn add_task(&mut self, spec: &ReminderSpec) -> Result<String>;
}

// ---------------------------------------------------------------------------
// CaldavClient
// ---------------------------------------------------------------------------

pub struct CaldavClient {
    config: CaldavConfig,
    client: Client,
    source_label: String,
    /// Resolved on first use.
    list_url: Option<Url>,
}

impl CaldavClient {
    /// `source_label` is recorded on every created task (the catalog path).
    pub fn new(config: CaldavConfig, source_label: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(integration)?;
        Ok(Self {
            config,
            client,
            source_label: source_label.into(),
            list_url: None,
        })
    }

    fn request(&self, method: Method, url: Url) -> reqwest::blocking::RequestBuilder {
        let req = self.client.request(method, url);
        match &self.config.username {
            Some(user) => req.basic_auth(user, self.config.password.as_deref()),
            None => req,
        }
    }

    fn base_url(&self) -> Result<Url> {
        let mut raw = self.config.url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(integration)
    }

    fn list_url(&mut self) -> Result<Url> {
        if let Some(url) = &self.list_url {
            return Ok(url.clone());
        }
        let base = self.base_url()?;
        let url = match &self.config.list_uid {
            Some(uid) => base
                .join(&format!("{}/", uid.trim_matches('/')))
                .map_err(integration)?,
            None => self.discover_list(&base)?,
        };
        tracing::debug!(list = %url, "resolved CalDAV task list");
        self.list_url = Some(url.clone());
        Ok(url)
    }

    fn discover_list(&self, base: &Url) -> Result<Url> {
        let method = Method::from_bytes(b"PROPFIND").map_err(integration)?;
        let resp = self
            .request(method, base.clone())
            .header("Depth", "1")
            .header("Content-Type", "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
            .send()
            .map_err(integration)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ReminderError::Integration(format!(
                "PROPFIND {base} returned {status}"
            )));
        }
        let xml = resp.text().map_err(integration)?;
        let href = pick_task_collection(&xml, base.path())
            .ok_or_else(|| ReminderError::Integration("no task lists found on CalDAV server".into()))?;
        base.join(&href).map_err(integration)
    }
}

impl TaskListSink for CaldavClient {
    fn add_task(&mut self, spec: &ReminderSpec) -> Result<String> {
        let list = self.list_url()?;
        let uid = uuid::Uuid::new_v4().to_string();
        let url = list.join(&format!("{uid}.ics")).map_err(integration)?;
        let body = render_vtodo(&uid, spec, &self.source_label);

        let resp = self
            .request(Method::PUT, url.clone())
            .header("Content-Type", "text/calendar; charset=utf-8")
            .header("If-None-Match", "*")
            .body(body)
            .send()
            .map_err(integration)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ReminderError::Integration(format!(
                "PUT {url} returned {status}"
            )));
        }
        tracing::info!(task = %spec.task_name, uid = %uid, "added task to CalDAV list");
        Ok(uid)
    }
}

fn integration(e: impl std::fmt::Display) -> ReminderError {
    ReminderError::Integration(e.to_string())
}

// ---------------------------------------------------------------------------
// PROPFIND parsing
// ---------------------------------------------------------------------------

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop>
    <d:resourcetype/>
    <d:displayname/>
    <c:supported-calendar-component-set/>
  </d:prop>
</d:propfind>"#;

static RESPONSE_RE: OnceLock<Regex> = OnceLock::new();
static HREF_RE: OnceLock<Regex> = OnceLock::new();

fn response_re() -> &'static Regex {
    RESPONSE_RE.get_or_init(|| {
        Regex::new(r"(?s)<(?:[A-Za-z0-9]+:)?response\b.*?</(?:[A-Za-z0-9]+:)?response>").unwrap()
    })
}

fn href_re() -> &'static Regex {
    HREF_RE.get_or_init(|| {
        Regex::new(r"<(?:[A-Za-z0-9]+:)?href>\s*([^<]+?)\s*</(?:[A-Za-z0-9]+:)?href>").unwrap()
    })
}

/// Pick the first child collection of `base_path` from a multistatus body,
/// preferring collections that advertise `VTODO` support.
fn pick_task_collection(xml: &str, base_path: &str) -> Option<String> {
    let base = base_path.trim_end_matches('/');
    let children: Vec<(String, bool)> = response_re()
        .find_iter(xml)
        .filter_map(|m| {
            let block = m.as_str();
            let href = href_re().captures(block)?.get(1)?.as_str().to_string();
            let path = match Url::parse(&href) {
                Ok(abs) => abs.path().to_string(),
                Err(_) => href.clone(),
            };
            if path.trim_end_matches('/') == base || !path.ends_with('/') {
                return None;
            }
            Some((href, block.contains("VTODO")))
        })
        .collect();

    children
        .iter()
        .find(|(_, todo)| *todo)
        .or_else(|| children.first())
        .map(|(href, _)| href.clone())
}

// ---------------------------------------------------------------------------
// iCalendar rendering
// ---------------------------------------------------------------------------

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

fn render_vtodo(uid: &str, spec: &ReminderSpec, source: &str) -> String {
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let lines = [
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:-//ntfy-csv-reminders//{}//EN", env!("CARGO_PKG_VERSION")),
        "BEGIN:VTODO".to_string(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{stamp}"),
        format!("CREATED:{stamp}"),
        format!("SUMMARY:{}", escape_text(&format!("Reminder: {}", spec.task_name))),
        format!(
            "DESCRIPTION:{}",
            escape_text(&format!("Recurring reminder (every {} days)", spec.interval_days))
        ),
        format!("CATEGORIES:{TASK_CATEGORY}"),
        "STATUS:NEEDS-ACTION".to_string(),
        format!("X-CSV-REMINDER-DAYS:{}", spec.interval_days),
        format!("X-CSV-REMINDER-SOURCE:{}", escape_text(source)),
        "END:VTODO".to_string(),
        "END:VCALENDAR".to_string(),
    ];
    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
