//! Renders an [`ErrorReport`] as Telegram HTML.
//!
//! The output is a sequence of sections separated by blank lines. Sections
//! without content are omitted. When the rendered text exceeds
//! `max_message_chars` it is shrunk in a fixed order: stack trace, metadata,
//! optional context sections from the end, the identifying fields, and
//! finally the message itself. All budgets count rendered characters, so
//! escaping never pushes a section past its limit and text is only ever cut
//! between entities, never inside markup.

use serde_json::Value;

use crate::{
    config::FormattingConfig,
    engine::Fingerprint,
    models::{DeviceInfo, ErrorReport, RequestContext, UserInfo},
};

const TRUNCATION_MARKER: &str = "... (truncated)";

/// Longest fingerprint shown in the footer, in rendered characters.
const MAX_FINGERPRINT_DISPLAY_CHARS: usize = 128;

/// Per-notification values that are not part of the report.
#[derive(Debug, Clone, Copy)]
pub struct NotificationContext<'a> {
    /// Identifier shown in the footer.
    pub error_id: &'a str,
    /// Grouping key shown in the footer.
    pub fingerprint: &'a Fingerprint,
    /// Occurrences swallowed by deduplication since the previous
    /// notification of this fingerprint.
    pub suppressed_since_last: u64,
}

/// Optional sections in the order they are given up when space runs out.
const DROPPABLE: [Droppable; 5] = [
    Droppable::Tags,
    Droppable::Device,
    Droppable::User,
    Droppable::Request,
    Droppable::Application,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Droppable {
    Application,
    Request,
    User,
    Device,
    Tags,
}

/// Current size budget of one render pass.
#[derive(Debug, Clone)]
struct Limits {
    stacktrace: usize,
    metadata: usize,
    dropped: usize,
    fields: Option<usize>,
    message: Option<usize>,
}

impl Limits {
    fn keeps(&self, section: Droppable) -> bool {
        !DROPPABLE[..self.dropped].contains(&section)
    }
}

/// Turns reports into bounded notification text.
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    config: FormattingConfig,
}

impl MessageFormatter {
    /// Creates a formatter with the given size limits.
    pub fn new(config: FormattingConfig) -> Self {
        Self { config }
    }

    /// Renders `report` into Telegram HTML no longer than
    /// `max_message_chars` characters.
    pub fn render(&self, report: &ErrorReport, context: &NotificationContext<'_>) -> String {
        let max = self.config.max_message_chars;
        let has_trace = non_empty(&report.stacktrace).is_some();
        let has_metadata = report.metadata.as_ref().is_some_and(|m| !m.is_empty());
        let longest_field = identifying_fields(report).map(|f| escaped_len(&f)).max().unwrap_or(0);

        let mut limits = Limits {
            stacktrace: self.config.max_stacktrace_chars,
            metadata: self.config.max_metadata_chars,
            dropped: 0,
            fields: None,
            message: None,
        };

        loop {
            let text = self.compose(report, context, &limits);
            let overflow = text.chars().count().saturating_sub(max);
            if overflow == 0 {
                return text;
            }

            if has_trace && limits.stacktrace > 0 {
                limits.stacktrace = limits.stacktrace.saturating_sub(overflow);
            } else if has_metadata && limits.metadata > 0 {
                limits.metadata = limits.metadata.saturating_sub(overflow);
            } else if limits.dropped < DROPPABLE.len() {
                limits.dropped += 1;
            } else if longest_field > 0 && limits.fields != Some(0) {
                let current = limits.fields.unwrap_or(longest_field);
                limits.fields = Some(current.saturating_sub(overflow));
            } else if limits.message != Some(0) {
                let current = limits.message.unwrap_or_else(|| escaped_len(&report.error_message));
                limits.message = Some(current.saturating_sub(overflow));
            } else {
                // Header and footer alone exceed the budget.
                return plain(report, context, max);
            }
        }
    }

    fn compose(
        &self,
        report: &ErrorReport,
        context: &NotificationContext<'_>,
        limits: &Limits,
    ) -> String {
        let mut sections = vec![header(report, context, limits.message)];

        sections.extend(identity(report, limits.fields));
        sections.extend(location(report, limits.fields));
        if limits.stacktrace > 0 {
            sections.extend(non_empty(&report.stacktrace).map(|t| stacktrace(t, limits.stacktrace)));
        }
        if limits.keeps(Droppable::Application) {
            sections.extend(application(report));
        }
        if limits.keeps(Droppable::Request) {
            sections.extend(report.context.as_ref().and_then(request));
        }
        if limits.keeps(Droppable::User) {
            sections.extend(report.user.as_ref().and_then(user));
        }
        if limits.keeps(Droppable::Device) {
            sections.extend(report.device.as_ref().and_then(device));
        }
        if limits.keeps(Droppable::Tags) {
            sections.extend(tags(report));
        }
        if limits.metadata > 0 {
            sections.extend(self.metadata(report, limits.metadata));
        }
        sections.push(footer(report, context));

        sections.join("\n\n")
    }

    fn metadata(&self, report: &ErrorReport, limit: usize) -> Option<String> {
        let metadata = report.metadata.as_ref().filter(|m| !m.is_empty())?;
        let body = metadata
            .iter()
            .take(self.config.max_metadata_entries)
            .map(|(key, value)| format!("  {key}: {}", display_value(value)))
            .collect::<Vec<_>>()
            .join("\n");

        let (mut body, truncated) = escape_within(&body, limit);
        if truncated {
            body.push_str("\n  ");
            body.push_str(TRUNCATION_MARKER);
        }
        Some(format!("<b>Metadata</b>\n<pre>{body}</pre>"))
    }
}

fn header(report: &ErrorReport, context: &NotificationContext<'_>, limit: Option<usize>) -> String {
    let mut lines = vec![
        format!("{} <b>{}</b>", report.severity.indicator(), report.severity.label()),
        format!("<b>Message:</b> {}", shorten(&report.error_message, limit)),
    ];
    match context.suppressed_since_last {
        0 => {}
        1 => lines.push("<i>Occurred 1 more time since the last notification.</i>".to_string()),
        n => lines.push(format!("<i>Occurred {n} more times since the last notification.</i>")),
    }
    lines.join("\n")
}

fn identity(report: &ErrorReport, limit: Option<usize>) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(error_type) = non_empty(&report.error_type) {
        lines.push(format!("<b>Type:</b> <code>{}</code>", shorten(error_type, limit)));
    }
    if let Some(code) = non_empty(&report.error_code) {
        lines.push(format!("<b>Code:</b> <code>{}</code>", shorten(code, limit)));
    }
    join_lines(lines)
}

fn location(report: &ErrorReport, limit: Option<usize>) -> Option<String> {
    location_text(report)
        .map(|text| format!("<b>Location:</b> <code>{}</code>", shorten(&text, limit)))
}

fn location_text(report: &ErrorReport) -> Option<String> {
    let mut parts = Vec::new();
    match (non_empty(&report.file_name), report.line_number) {
        (Some(file), Some(line)) => parts.push(format!("{file}:{line}")),
        (Some(file), None) => parts.push(file.to_string()),
        (None, Some(line)) => parts.push(format!("line {line}")),
        (None, None) => {}
    }
    if let Some(function) = non_empty(&report.function_name) {
        parts.push(format!("in {function}()"));
    }
    if parts.is_empty() { None } else { Some(parts.join(" ")) }
}

/// Raw text of every field shortened in the identifying-fields pass.
fn identifying_fields(report: &ErrorReport) -> impl Iterator<Item = String> + '_ {
    [non_empty(&report.error_type), non_empty(&report.error_code)]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .chain(location_text(report))
}

fn stacktrace(trace: &str, limit: usize) -> String {
    let (mut trace, truncated) = escape_within(trace, limit);
    if truncated {
        trace.push('\n');
        trace.push_str(TRUNCATION_MARKER);
    }
    format!("<b>Stacktrace</b>\n<pre>{trace}</pre>")
}

fn application(report: &ErrorReport) -> Option<String> {
    let fields = [
        ("App", &report.app_name),
        ("Version", &report.app_version),
        ("Env", &report.environment),
        ("Service", &report.service_name),
        ("Component", &report.component),
    ];
    let lines = fields
        .into_iter()
        .filter_map(|(label, value)| {
            non_empty(value).map(|v| format!("  {label}: {}", escape_html(v)))
        })
        .collect();
    join_lines(lines).map(|body| format!("<b>Application</b>\n{body}"))
}

fn request(context: &RequestContext) -> Option<String> {
    let mut lines = Vec::new();
    match (non_empty(&context.request_method), non_empty(&context.request_url)) {
        (Some(method), Some(url)) => {
            lines.push(format!("  {} {}", escape_html(method), escape_html(url)));
        }
        (_, Some(url)) => lines.push(format!("  URL: {}", escape_html(url))),
        (Some(method), None) => lines.push(format!("  Method: {}", escape_html(method))),
        (None, None) => {}
    }
    if let Some(status) = context.response_status {
        lines.push(format!("  Status: {status}"));
    }
    if let Some(params) = context.query_params.as_ref().filter(|p| !p.is_empty()) {
        let params = params.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", ");
        lines.push(format!("  Params: {}", escape_html(&params)));
    }
    join_lines(lines).map(|body| format!("<b>Request</b>\n{body}"))
}

fn user(user: &UserInfo) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(id) = non_empty(&user.user_id) {
        lines.push(format!("  ID: <code>{}</code>", escape_html(id)));
    }
    if let Some(username) = non_empty(&user.username) {
        lines.push(format!("  Username: {}", escape_html(username)));
    }
    if let Some(email) = non_empty(&user.email) {
        lines.push(format!("  Email: {}", escape_html(email)));
    }
    if let Some(session) = non_empty(&user.session_id) {
        lines.push(format!("  Session: <code>{}</code>", escape_html(session)));
    }
    if let Some(ip) = non_empty(&user.ip_address) {
        lines.push(format!("  IP: <code>{}</code>", escape_html(ip)));
    }
    join_lines(lines).map(|body| format!("<b>User</b>\n{body}"))
}

fn device(device: &DeviceInfo) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(host) = non_empty(&device.hostname) {
        lines.push(format!("  Host: <code>{}</code>", escape_html(host)));
    }
    if let Some(os) = non_empty(&device.os) {
        let os = match non_empty(&device.os_version) {
            Some(version) => format!("{os} {version}"),
            None => os.to_string(),
        };
        lines.push(format!("  OS: {}", escape_html(&os)));
    }
    if let Some(ip) = non_empty(&device.ip_address) {
        lines.push(format!("  IP: <code>{}</code>", escape_html(ip)));
    }
    if let Some(arch) = non_empty(&device.architecture) {
        lines.push(format!("  Arch: {}", escape_html(arch)));
    }

    let resources: Vec<String> =
        [("CPU", device.cpu_usage), ("MEM", device.memory_usage), ("DISK", device.disk_usage)]
            .into_iter()
            .filter_map(|(label, value)| value.map(|v| format!("{label} {v:.1}%")))
            .collect();
    if !resources.is_empty() {
        lines.push(format!("  Resources: {}", resources.join(" | ")));
    }

    join_lines(lines).map(|body| format!("<b>Server</b>\n{body}"))
}

fn tags(report: &ErrorReport) -> Option<String> {
    let tags = report.tags.as_ref().filter(|t| !t.is_empty())?;
    let rendered = tags
        .iter()
        .map(|(k, v)| format!("<code>#{}:{}</code>", escape_html(k), escape_html(v)))
        .collect::<Vec<_>>()
        .join(" ");
    Some(format!("<b>Tags:</b> {rendered}"))
}

fn footer(report: &ErrorReport, context: &NotificationContext<'_>) -> String {
    format!(
        "<i>{}</i>\nError ID: <code>{}</code>\nFingerprint: <code>{}</code>",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        escape_html(context.error_id),
        shorten(context.fingerprint.as_str(), Some(MAX_FINGERPRINT_DISPLAY_CHARS)),
    )
}

/// Markup-free rendering used when even the bare header and footer do not
/// fit.
fn plain(report: &ErrorReport, context: &NotificationContext<'_>, max: usize) -> String {
    let text = format!(
        "{} {}\n{}\nError ID: {}",
        report.severity.indicator(),
        report.severity.label(),
        report.error_message,
        context.error_id,
    );
    escape_within(&text, max).0
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_lines(lines: Vec<String>) -> Option<String> {
    if lines.is_empty() { None } else { Some(lines.join("\n")) }
}

/// Treats blank strings like missing ones.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Escapes the characters Telegram's HTML parse mode reserves.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match escaped(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

fn escaped(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        _ => None,
    }
}

/// Length of `text` after [`escape_html`], in characters.
fn escaped_len(text: &str) -> usize {
    text.chars().map(|c| escaped(c).map_or(1, str::len)).sum()
}

/// Escapes `text` up to `budget` rendered characters without splitting an
/// entity. Returns whether anything was left out.
fn escape_within(text: &str, budget: usize) -> (String, bool) {
    let mut out = String::with_capacity(text.len().min(budget));
    let mut used = 0;
    for c in text.chars() {
        let width = escaped(c).map_or(1, str::len);
        if used + width > budget {
            return (out, true);
        }
        match escaped(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
        used += width;
    }
    (out, false)
}

/// Escapes `text`, cut to `limit` rendered characters plus an ellipsis.
fn shorten(text: &str, limit: Option<usize>) -> String {
    let Some(limit) = limit else {
        return escape_html(text);
    };
    let (mut out, truncated) = escape_within(text, limit);
    if truncated {
        out.push('…');
    }
    out
}
