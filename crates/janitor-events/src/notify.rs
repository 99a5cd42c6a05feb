//! Notification destinations: template interpolation, reason filtering, and
//! immediate/batched delivery with per-type payload shaping and truncation.

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::DecisionEvent;

const DEFAULT_TEMPLATE: &str = "Removed {service} queue item id={id} title={title} reason={reason}";
const DISCORD_LIMIT: usize = 1900;
const SLACK_LIMIT: usize = 38_000;

/// Destination wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    /// Discord incoming webhook (`{"content": ...}`).
    Discord,
    /// Slack incoming webhook (`{"text": ...}`).
    Slack,
    /// Arbitrary webhook, optionally receiving raw JSON documents.
    Generic,
}

impl DestinationKind {
    /// Parse a configured `type` string, defaulting unknown values to generic.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "discord" => Self::Discord,
            "slack" => Self::Slack,
            _ => Self::Generic,
        }
    }
}

/// One configured notification target.
#[derive(Debug, Clone)]
pub struct Destination {
    /// Identifying name, used as the batch-queue key.
    pub name: String,
    /// Wire protocol for this destination.
    pub kind: DestinationKind,
    /// Webhook URL.
    pub url: String,
    /// Whether events are queued and flushed once per cycle, rather than sent immediately.
    pub batch: bool,
    /// Reason filter; empty or containing `"*"` matches every reason.
    pub reasons: Vec<String>,
    /// Message template; `{service}`/`{id}`/`{title}`/`{reason}` are substituted.
    pub template: Option<String>,
    /// Whether the template should be parsed and sent as a JSON document rather than a string field.
    pub raw_json: bool,
    /// Extra headers sent with generic-destination requests.
    pub headers: Option<HashMap<String, String>>,
}

impl Destination {
    /// Key used to group batched lines for this destination.
    #[must_use]
    pub fn key(&self) -> String {
        self.name.clone()
    }

    /// Whether `reason` should be delivered to this destination.
    #[must_use]
    pub fn matches_reason(&self, reason: Option<&str>) -> bool {
        if self.reasons.is_empty() || self.reasons.iter().any(|r| r == "*") {
            return true;
        }
        reason.is_some_and(|reason| self.reasons.iter().any(|r| r == reason))
    }

    /// Render this destination's template against `event`.
    #[must_use]
    pub fn format_line(&self, event: &DecisionEvent) -> String {
        let template = self.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        template
            .replace("{service}", &event.service)
            .replace("{id}", &event.id.to_string())
            .replace("{title}", &event.title)
            .replace("{reason}", event.reason.as_deref().unwrap_or("unknown"))
    }

    /// Send one line immediately.
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest` error on request failure; callers log
    /// and continue rather than propagate.
    pub async fn send_immediate(&self, http: &reqwest::Client, line: &str, dry_run: bool) -> reqwest::Result<()> {
        match self.kind {
            DestinationKind::Discord => {
                let content = prefixed(line, dry_run);
                http.post(&self.url).json(&json!({"content": content})).send().await?;
            }
            DestinationKind::Slack => {
                let content = prefixed(line, dry_run);
                http.post(&self.url).json(&json!({"text": content})).send().await?;
            }
            DestinationKind::Generic => {
                let mut request = http.post(&self.url);
                if let Some(headers) = &self.headers {
                    for (key, value) in headers {
                        request = request.header(key, value);
                    }
                }
                let body = if self.raw_json {
                    let mut doc = serde_json::from_str::<Value>(line).unwrap_or_else(|_| json!({"message": line}));
                    if dry_run {
                        if let Value::Object(map) = &mut doc {
                            map.entry("dryRun").or_insert(Value::Bool(true));
                        }
                    }
                    doc
                } else {
                    json!({"message": prefixed(line, dry_run)})
                };
                request.json(&body).send().await?;
            }
        }
        Ok(())
    }

    /// Send a batch of queued lines, applying per-type truncation.
    ///
    /// # Errors
    ///
    /// Returns the underlying `reqwest` error on request failure.
    pub async fn send_batch(&self, http: &reqwest::Client, lines: &[String], dry_run: bool) -> reqwest::Result<()> {
        match self.kind {
            DestinationKind::Discord => {
                let content = truncate(&batched_content(lines, dry_run), DISCORD_LIMIT);
                http.post(&self.url).json(&json!({"content": content})).send().await?;
            }
            DestinationKind::Slack => {
                let content = truncate(&batched_content(lines, dry_run), SLACK_LIMIT);
                http.post(&self.url).json(&json!({"text": content})).send().await?;
            }
            DestinationKind::Generic => {
                let mut request = http.post(&self.url);
                if let Some(headers) = &self.headers {
                    for (key, value) in headers {
                        request = request.header(key, value);
                    }
                }
                let body = if self.raw_json {
                    let events: Vec<Value> = lines
                        .iter()
                        .map(|line| serde_json::from_str(line).unwrap_or_else(|_| json!({"message": line})))
                        .collect();
                    let mut doc = json!({"events": events});
                    if dry_run {
                        if let Value::Object(map) = &mut doc {
                            map.insert("dryRun".to_string(), Value::Bool(true));
                        }
                    }
                    doc
                } else {
                    json!({"message": batched_content(lines, dry_run)})
                };
                request.json(&body).send().await?;
            }
        }
        Ok(())
    }
}

fn prefixed(line: &str, dry_run: bool) -> String {
    if dry_run { format!("[DRY RUN] {line}") } else { line.to_string() }
}

fn batched_content(lines: &[String], dry_run: bool) -> String {
    let joined = lines.join("\n");
    if dry_run { format!("[DRY RUN]\n{joined}") } else { joined }
}

fn truncate(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }
    let truncated: String = content.chars().take(limit).collect();
    format!("{truncated}\n...")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> DecisionEvent {
        DecisionEvent {
            event: "remove".to_string(),
            service: "Sonarr".to_string(),
            id: 101,
            title: "Example".to_string(),
            reason: Some("low_seeders".to_string()),
            notify: true,
        }
    }

    #[test]
    fn default_template_interpolates_all_fields() {
        let destination = Destination {
            name: "discord".to_string(),
            kind: DestinationKind::Discord,
            url: String::new(),
            batch: false,
            reasons: Vec::new(),
            template: None,
            raw_json: false,
            headers: None,
        };
        let line = destination.format_line(&event());
        assert_eq!(line, "Removed Sonarr queue item id=101 title=Example reason=low_seeders");
    }

    #[test]
    fn reason_filter_matches_exact_or_wildcard() {
        let mut destination = Destination {
            name: "d".to_string(),
            kind: DestinationKind::Generic,
            url: String::new(),
            batch: false,
            reasons: vec!["max_age".to_string()],
            template: None,
            raw_json: false,
            headers: None,
        };
        assert!(!destination.matches_reason(Some("low_seeders")));
        destination.reasons = vec!["*".to_string()];
        assert!(destination.matches_reason(Some("low_seeders")));
    }

    #[test]
    fn truncate_respects_limit_and_suffix() {
        let content = "a".repeat(10);
        let truncated = truncate(&content, 5);
        assert_eq!(truncated, "aaaaa\n...");
        assert_eq!(truncate(&content, 20), content);
    }

    #[test]
    fn destination_kind_defaults_unknown_to_generic() {
        assert_eq!(DestinationKind::parse("discord"), DestinationKind::Discord);
        assert_eq!(DestinationKind::parse("bogus"), DestinationKind::Generic);
    }

    #[test]
    fn prefixed_marks_dry_run_lines() {
        assert_eq!(prefixed("removed item", false), "removed item");
        assert_eq!(prefixed("removed item", true), "[DRY RUN] removed item");
    }

    #[test]
    fn batched_content_marks_dry_run_batches() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(batched_content(&lines, false), "a\nb");
        assert_eq!(batched_content(&lines, true), "[DRY RUN]\na\nb");
    }
}
