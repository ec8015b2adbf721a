//! Gmail REST client and message decoding.
//!
//! The client expects an OAuth access token obtained elsewhere; it never runs an
//! authorization flow itself. A missing token or a 401/403 answer surfaces as
//! `Error::Auth`.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{MailClient, MessagePage};
use crate::domain::Message;
use crate::error::{Error, Result};

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users";

const NO_SUBJECT: &str = "No Subject";
const UNKNOWN_SENDER: &str = "Unknown Sender";
const NO_BODY: &str = "No body available";

/// Gmail emits URL-safe base64 both with and without padding.
const BODY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub struct GmailClient {
    http: Client,
    base_url: String,
    user: String,
    token: String,
}

impl GmailClient {
    pub fn new(user: &str, token: Option<&str>) -> Result<Self> {
        let token = token.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
            Error::Auth(
                "no Gmail access token configured (set THOTH_GMAIL_TOKEN or gmail_token)"
                    .to_string(),
            )
        })?;
        let http = Client::builder()
            .user_agent(concat!("thoth/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Mail(e.to_string()))?;
        Ok(Self {
            http,
            base_url: API_BASE.to_string(),
            user: user.to_string(),
            token: token.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .map_err(|e| Error::Mail(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("Gmail answered {status}")));
        }
        if !status.is_success() {
            return Err(Error::Mail(format!("Gmail answered {status} for {url}")));
        }
        response.json::<T>().map_err(|e| Error::Mail(format!("invalid response from {url}: {e}")))
    }
}

impl MailClient for GmailClient {
    fn list_messages(
        &self,
        page_token: Option<&str>,
        since: Option<NaiveDate>,
    ) -> Result<MessagePage> {
        let url = format!("{}/{}/messages", self.base_url, self.user);
        let mut query = Vec::new();
        if let Some(since) = since {
            query.push(("q", since_query(since)));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let listed: ListResponse = self.get_json(&url, &query)?;
        Ok(MessagePage {
            message_ids: listed.messages.into_iter().map(|m| m.id).collect(),
            next_page_token: listed.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    fn get_message(&self, message_id: &str) -> Result<Message> {
        let url = format!("{}/{}/messages/{}", self.base_url, self.user, message_id);
        let raw: GmailMessage = self.get_json(&url, &[("format", "full".to_string())])?;
        Ok(decode_message(raw))
    }
}

pub fn since_query(since: NaiveDate) -> String {
    format!("after:{}", since.format("%Y/%m/%d"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailMessage {
    id: String,
    #[serde(default)]
    label_ids: Vec<String>,
    internal_date: Option<String>,
    #[serde(default)]
    payload: MessagePart,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: PartBody,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartBody {
    data: Option<String>,
}

fn decode_message(raw: GmailMessage) -> Message {
    let payload = &raw.payload;
    let header = |name: &str| {
        payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.trim())
            .filter(|v| !v.is_empty())
    };

    let date = header("Date").and_then(parse_mail_date).or_else(|| {
        raw.internal_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
    });

    let body = if payload.parts.is_empty() {
        payload.body.data.as_deref().and_then(decode_body)
    } else {
        find_plain_text(&payload.parts)
    };

    Message {
        message_id: raw.id.clone(),
        sender: header("From").unwrap_or(UNKNOWN_SENDER).to_string(),
        recipients: header("To").map(split_addresses).unwrap_or_default(),
        subject: header("Subject").unwrap_or(NO_SUBJECT).to_string(),
        body: body.unwrap_or_else(|| NO_BODY.to_string()),
        date,
        labels: raw.label_ids.clone(),
    }
}

/// First `text/plain` part with data, searching nested multiparts depth-first.
fn find_plain_text(parts: &[MessagePart]) -> Option<String> {
    parts.iter().find_map(|part| {
        if part.mime_type.eq_ignore_ascii_case("text/plain") {
            if let Some(text) = part.body.data.as_deref().and_then(decode_body) {
                return Some(text);
            }
        }
        find_plain_text(&part.parts)
    })
}

fn decode_body(data: &str) -> Option<String> {
    let bytes = BODY_ENGINE.decode(data.trim()).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// RFC 2822 dates, tolerating a trailing comment such as `(UTC)`.
fn parse_mail_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = match raw.find(" (") {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    DateTime::parse_from_rfc2822(trimmed.trim()).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Split an address list on commas outside quoted display names.
fn split_addresses(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in raw.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    out.push(current);
    out.into_iter().map(|a| a.trim().to_string()).filter(|a| !a.is_empty()).collect()
}
