//! # REST Bridge Command
//!
//! Turns a regex-triggered chat message into a parameterized HTTP call and a
//! formatted reply. Capture groups from the trigger pattern are
//! percent-encoded and substituted positionally into an endpoint template;
//! the JSON response is mapped back into a reply through one or more ordered
//! field-path schemas.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Ordered fallback response schemas
//! - 1.0.0: Initial implementation with single response schema

use anyhow::{anyhow, bail, Context as _, Result};
use log::{debug, info};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::chat::ChatClient;
use crate::commands::trigger::Trigger;
use crate::dispatch::MessageEvent;
use crate::http_cache::HttpTransport;

/// Endpoint template plus the capture-group indices substituted into it.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Template with `%s` placeholders, e.g. `https://xkcd.com/%s/info.0.json`.
    pub template: String,
    /// Capture-group indices, in substitution order. Group 0 is the whole
    /// match.
    #[serde(default)]
    pub groups: Vec<usize>,
}

/// One response candidate: a positional template and the field paths whose
/// resolved values fill it, in declared order.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseSchema {
    pub template: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Either a single hard-required schema or an ordered fallback chain.
#[derive(Debug, Clone)]
enum ResponseSpec {
    /// Every field path must resolve; a missing path is a hard failure.
    Single(ResponseSchema),
    /// Candidates tried in order; the first one whose field paths all
    /// resolve wins.
    Fallback(Vec<ResponseSchema>),
}

#[derive(Debug, Clone, Deserialize)]
struct RestOptions {
    endpoint: EndpointConfig,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    response: Option<ResponseSchema>,
    #[serde(default)]
    responses: Option<Vec<ResponseSchema>>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    disable_cache: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

/// The REST bridge command body.
#[derive(Debug)]
pub struct RestBridge {
    name: String,
    regex: Regex,
    endpoint_template: String,
    endpoint_groups: Vec<usize>,
    method: String,
    headers: HashMap<String, String>,
    response: ResponseSpec,
    error_message: Option<String>,
    transport: HttpTransport,
}

impl RestBridge {
    /// Build a bridge from its options blob and the already-parsed trigger.
    ///
    /// All schema/endpoint/regex mismatches are rejected here so execution
    /// never runs with an undefined substitution.
    pub fn from_options(name: &str, trigger: &Trigger, options: &Value) -> Result<Self> {
        let options: RestOptions = serde_json::from_value(options.clone())
            .with_context(|| format!("invalid rest options for command '{name}'"))?;

        let regex = trigger
            .pattern()
            .ok_or_else(|| anyhow!("rest command '{name}' requires a 'trigger_regex'"))?
            .clone();

        // captures_len counts group 0 (the whole match).
        let group_count = regex.captures_len() - 1;
        if options.endpoint.groups.len() != group_count {
            bail!(
                "command '{name}': endpoint lists {} capture groups but the trigger regex has {}",
                options.endpoint.groups.len(),
                group_count
            );
        }
        for &index in &options.endpoint.groups {
            if index > group_count {
                bail!(
                    "command '{name}': endpoint references capture group {index} but the trigger regex only has {group_count}"
                );
            }
        }
        let endpoint_verbs = count_verbs(&options.endpoint.template)?;
        if endpoint_verbs != options.endpoint.groups.len() {
            bail!(
                "command '{name}': endpoint template '{}' has {endpoint_verbs} placeholders but {} capture groups",
                options.endpoint.template,
                options.endpoint.groups.len()
            );
        }

        let response = match (options.response, options.responses) {
            (Some(_), Some(_)) => {
                bail!("command '{name}': only one of 'response' and 'responses' may be set")
            }
            (Some(single), None) => ResponseSpec::Single(single),
            (None, Some(fallback)) if !fallback.is_empty() => ResponseSpec::Fallback(fallback),
            _ => bail!("command '{name}': one of 'response' or 'responses' is required"),
        };
        for schema in response.candidates() {
            let verbs = count_verbs(&schema.template)?;
            if verbs != schema.fields.len() {
                bail!(
                    "command '{name}': response template '{}' has {verbs} placeholders but {} fields",
                    schema.template,
                    schema.fields.len()
                );
            }
        }

        let transport = HttpTransport::new(!options.disable_cache)?;

        Ok(Self {
            name: name.to_string(),
            regex,
            endpoint_template: options.endpoint.template,
            endpoint_groups: options.endpoint.groups,
            method: options.method,
            headers: options.headers,
            response,
            error_message: options.error_message,
            transport,
        })
    }

    /// Execute the bridge for a matched message.
    ///
    /// On any failure the configured error message (if present) is sent to
    /// the channel and the error is returned for the dispatcher to log.
    pub async fn run(&self, event: &MessageEvent, chat: &dyn ChatClient) -> Result<()> {
        match self.bridge(event).await {
            Ok(reply) => chat.send_text(&event.channel_id, &reply).await,
            Err(e) => {
                if let Some(message) = &self.error_message {
                    if let Err(send_err) = chat.send_text(&event.channel_id, message).await {
                        debug!("failed to deliver error message: {send_err}");
                    }
                }
                Err(e)
            }
        }
    }

    async fn bridge(&self, event: &MessageEvent) -> Result<String> {
        let request_id = Uuid::new_v4();
        let endpoint = self.resolved_endpoint(&event.content)?;

        // Log outbound calls with enough context to spot abuse attempts.
        info!(
            "[{request_id}] command={} method={} endpoint={endpoint} sending HTTP request",
            self.name, self.method
        );
        let response = self
            .transport
            .execute(&self.method, &endpoint, &self.headers)
            .await?;
        info!(
            "[{request_id}] command={} endpoint={endpoint} status={}",
            self.name, response.status
        );
        if response.status >= 400 {
            bail!("request to {endpoint} failed with status {}", response.status);
        }

        let document: Value = serde_json::from_str(&response.body)
            .with_context(|| format!("response from {endpoint} is not valid JSON"))?;
        self.resolve_reply(&document)
    }

    /// Substitute percent-encoded capture groups into the endpoint template.
    ///
    /// The message is guaranteed to match because the trigger matcher already
    /// passed, but the captures call stays fallible rather than panicking.
    fn resolved_endpoint(&self, content: &str) -> Result<String> {
        let captures = self
            .regex
            .captures(content)
            .ok_or_else(|| anyhow!("message no longer matches trigger regex"))?;
        let mut encoded = Vec::with_capacity(self.endpoint_groups.len());
        for &index in &self.endpoint_groups {
            let raw = captures.get(index).map_or("", |m| m.as_str());
            encoded.push(Value::String(urlencoding::encode(raw).into_owned()));
        }
        let values: Vec<&Value> = encoded.iter().collect();
        render_template(&self.endpoint_template, &values)
    }

    /// Pick and render the reply from the decoded JSON document.
    fn resolve_reply(&self, document: &Value) -> Result<String> {
        match &self.response {
            ResponseSpec::Single(schema) => {
                let values = resolve_fields(document, &schema.fields).map_err(|path| {
                    anyhow!("response field '{path}' not found in upstream document")
                })?;
                render_template(&schema.template, &values)
            }
            ResponseSpec::Fallback(candidates) => {
                for schema in candidates {
                    if let Ok(values) = resolve_fields(document, &schema.fields) {
                        return render_template(&schema.template, &values);
                    }
                }
                Err(anyhow!("no response schema matched the upstream document"))
            }
        }
    }
}

impl ResponseSpec {
    fn candidates(&self) -> impl Iterator<Item = &ResponseSchema> {
        match self {
            ResponseSpec::Single(schema) => std::slice::from_ref(schema).iter(),
            ResponseSpec::Fallback(candidates) => candidates.iter(),
        }
    }
}

/// Resolve every field path against the document, in declared order.
///
/// Returns the first unresolvable path as the error so callers can decide
/// between hard failure (single schema) and advancing (fallback).
fn resolve_fields<'a>(document: &'a Value, fields: &'a [String]) -> Result<Vec<&'a Value>, &'a str> {
    fields
        .iter()
        .map(|path| lookup(document, path).ok_or(path.as_str()))
        .collect()
}

/// Walk a dotted/indexed field path into a JSON document.
///
/// Object members are addressed by key, array elements by decimal index:
/// `items.0.title`.
fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Number of substitution placeholders in a printf-style template.
fn count_verbs(template: &str) -> Result<usize> {
    let mut chars = template.chars();
    let mut count = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        match chars.next() {
            Some('s') | Some('d') => count += 1,
            Some('%') => {}
            Some(other) => bail!("unsupported template verb '%{other}'"),
            None => bail!("dangling '%' at end of template"),
        }
    }
    Ok(count)
}

/// Render a positional template, substituting each `%s`/`%d` with the next
/// value. Values are rendered by their native JSON type with no extra
/// rounding or locale formatting; `%%` is a literal percent sign.
fn render_template(template: &str, values: &[&Value]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();
    let mut next = values.iter();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') | Some('d') => {
                let value = next
                    .next()
                    .ok_or_else(|| anyhow!("template '{template}' expects more values"))?;
                out.push_str(&format_value(value));
            }
            Some('%') => out.push('%'),
            Some(other) => bail!("unsupported template verb '%{other}'"),
            None => bail!("dangling '%' at end of template"),
        }
    }
    Ok(out)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
