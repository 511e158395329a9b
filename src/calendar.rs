use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::domain::{CalendarEvent, EventDraft};

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    /// Stored credentials are missing or expired. Carries the consent URL the
    /// user must visit; recognized by the loop and turned into a structured
    /// re-authentication outcome, never a generic failure.
    #[error("calendar authorization required")]
    AuthRequired { auth_url: String },
    #[error("calendar request failed: {0}")]
    Request(String),
    #[error("calendar API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// External calendar, reached with per-user credentials.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn list_events(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    async fn create_event(
        &self,
        user_id: &str,
        draft: EventDraft,
    ) -> Result<CalendarEvent, CalendarError>;
}

/// Looks up a user's OAuth access token. Token exchange and refresh live
/// with the auth layer, not here.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn access_token(&self, user_id: &str) -> Result<Option<String>, CalendarError>;
}

/// In-memory token store, for tests and the demo.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: impl Into<String>, token: impl Into<String>) {
        let mut tokens = self.tokens.write().await;
        tokens.insert(user_id.into(), token.into());
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn access_token(&self, user_id: &str) -> Result<Option<String>, CalendarError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(user_id).cloned())
    }
}

const CALENDAR_SCOPES: &str = "https://www.googleapis.com/auth/calendar.events \
                               https://www.googleapis.com/auth/calendar.readonly";

/// Google Calendar client over the user's primary calendar.
pub struct GoogleCalendarProvider {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    oauth_client_id: String,
    redirect_uri: String,
}

impl GoogleCalendarProvider {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        oauth_client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://www.googleapis.com".into(),
            tokens,
            oauth_client_id: oauth_client_id.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// URL the user visits to grant calendar access. Offline access with a
    /// forced consent prompt, so a refresh token is always issued.
    pub fn consent_url(&self) -> String {
        let url = reqwest::Url::parse_with_params(
            "https://accounts.google.com/o/oauth2/v2/auth",
            &[
                ("client_id", self.oauth_client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPES),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .expect("static consent URL is well-formed");
        url.into()
    }

    async fn bearer(&self, user_id: &str) -> Result<String, CalendarError> {
        match self.tokens.access_token(user_id).await? {
            Some(token) => Ok(token),
            None => Err(CalendarError::AuthRequired {
                auth_url: self.consent_url(),
            }),
        }
    }

    fn auth_or_api_error(&self, status: u16, body: String) -> CalendarError {
        if status == 401 {
            CalendarError::AuthRequired {
                auth_url: self.consent_url(),
            }
        } else {
            CalendarError::Api { status, body }
        }
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    async fn list_events(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let token = self.bearer(user_id).await?;

        let resp = self
            .client
            .get(format!(
                "{}/calendar/v3/calendars/primary/events",
                self.base_url
            ))
            .bearer_auth(token)
            .query(&[
                ("timeMin", from.to_rfc3339()),
                ("timeMax", to.to_rfc3339()),
                ("singleEvents", "true".into()),
                ("orderBy", "startTime".into()),
            ])
            .send()
            .await
            .map_err(|e| CalendarError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| CalendarError::Request(e.to_string()))?;

        if status != 200 {
            return Err(self.auth_or_api_error(status, text));
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| CalendarError::Request(e.to_string()))?;
        let items = parsed["items"].as_array().cloned().unwrap_or_default();
        Ok(items.iter().filter_map(parse_event).collect())
    }

    async fn create_event(
        &self,
        user_id: &str,
        draft: EventDraft,
    ) -> Result<CalendarEvent, CalendarError> {
        let token = self.bearer(user_id).await?;

        let mut body = json!({
            "summary": draft.summary,
            "start": { "dateTime": draft.start.to_rfc3339() },
            "end": { "dateTime": draft.end.to_rfc3339() },
        });
        if let Some(ref description) = draft.description {
            body["description"] = json!(description);
        }

        let resp = self
            .client
            .post(format!(
                "{}/calendar/v3/calendars/primary/events",
                self.base_url
            ))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| CalendarError::Request(e.to_string()))?;

        if status != 200 {
            return Err(self.auth_or_api_error(status, text));
        }

        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| CalendarError::Request(e.to_string()))?;
        parse_event(&parsed).ok_or_else(|| {
            CalendarError::Request("created event is missing start or end".into())
        })
    }
}

fn parse_event(item: &Value) -> Option<CalendarEvent> {
    Some(CalendarEvent {
        id: item["id"].as_str().unwrap_or_default().to_string(),
        summary: item["summary"].as_str().unwrap_or_default().to_string(),
        description: item["description"].as_str().map(String::from),
        start: parse_when(&item["start"])?,
        end: parse_when(&item["end"])?,
    })
}

/// Google events carry either a `dateTime` or, for all-day events, a bare
/// `date`. All-day boundaries map to midnight UTC.
fn parse_when(when: &Value) -> Option<DateTime<Utc>> {
    if let Some(stamp) = when["dateTime"].as_str() {
        return DateTime::parse_from_rfc3339(stamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }
    let date: NaiveDate = when["date"].as_str()?.parse().ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0)?,
        Utc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(tokens: Arc<dyn TokenStore>) -> GoogleCalendarProvider {
        GoogleCalendarProvider::new(
            tokens,
            "client-123",
            "https://app.example.com/api/auth/google/callback",
        )
    }

    #[test]
    fn consent_url_requests_offline_calendar_access() {
        let url = provider(Arc::new(MemoryTokenStore::new())).consent_url();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("calendar.events"));
        assert!(url.contains("calendar.readonly"));
    }

    #[tokio::test]
    async fn missing_token_is_auth_required() {
        let provider = provider(Arc::new(MemoryTokenStore::new()));
        let err = provider
            .list_events("alice", Utc::now(), Utc::now())
            .await
            .unwrap_err();
        match err {
            CalendarError::AuthRequired { auth_url } => {
                assert!(auth_url.contains("accounts.google.com"));
            }
            other => panic!("expected AuthRequired, got {other:?}"),
        }
    }

    #[test]
    fn parses_timed_and_all_day_events() {
        let timed = json!({
            "id": "e1",
            "summary": "Standup",
            "start": { "dateTime": "2025-03-03T09:00:00Z" },
            "end": { "dateTime": "2025-03-03T09:30:00Z" },
        });
        let event = parse_event(&timed).unwrap();
        assert_eq!(event.summary, "Standup");
        assert_eq!(event.end.signed_duration_since(event.start).num_minutes(), 30);

        let all_day = json!({
            "id": "e2",
            "summary": "Offsite",
            "start": { "date": "2025-03-04" },
            "end": { "date": "2025-03-05" },
        });
        let event = parse_event(&all_day).unwrap();
        assert_eq!(event.start.to_rfc3339(), "2025-03-04T00:00:00+00:00");
    }

    #[test]
    fn event_without_times_is_skipped() {
        let bad = json!({ "id": "e3", "summary": "???" });
        assert!(parse_event(&bad).is_none());
    }
}
