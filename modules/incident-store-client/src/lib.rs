pub mod error;

pub use error::{Result, StoreError};

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use vigil_common::{Incident, IncidentDraft, MediaUpload, VoteDirection};

pub struct IncidentStoreClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl IncidentStoreClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client,
            base_url,
            token: token.map(String::from),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Fetch every incident the store currently knows about.
    pub async fn list_incidents(&self) -> Result<Vec<Incident>> {
        let resp = self.request(Method::GET, &["incidents"]).send().await?;
        let resp = error_for_status(resp).await?;

        let incidents: Vec<Incident> = read_json(resp).await?;
        tracing::debug!(count = incidents.len(), "Fetched incidents");
        Ok(incidents)
    }

    /// Submit a new report. The JSON draft goes in an `incident` part and each
    /// attachment in its own `media` part. Attachments that are not images or
    /// videos are rejected before anything is sent.
    pub async fn create_incident(&self, draft: &IncidentDraft) -> Result<Incident> {
        let mut form = Form::new().text("incident", serde_json::to_string(draft)?);
        for upload in &draft.media {
            form = form.part("media", media_part(upload)?);
        }

        let resp = self
            .request(Method::POST, &["incidents"])
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %message, "Incident draft rejected");
            return Err(StoreError::Validation(message));
        }
        let resp = error_for_status(resp).await?;

        let incident: Incident = read_json(resp).await?;
        tracing::info!(
            incident_id = %incident.id,
            category = %incident.category,
            media = draft.media.len(),
            "Incident created"
        );
        Ok(incident)
    }

    /// Record one vote on an incident.
    pub async fn cast_vote(&self, incident_id: &str, direction: VoteDirection) -> Result<()> {
        let body = serde_json::json!({ "direction": direction });

        let resp = self
            .request(Method::PATCH, &["incidents", incident_id, "votes"])
            .json(&body)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(incident_id.to_string()));
        }
        error_for_status(resp).await?;

        tracing::debug!(incident_id, %direction, "Vote recorded");
        Ok(())
    }

    /// Each segment is percent-encoded, so ids containing `/`, `?` or `#`
    /// stay inside their own path segment.
    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

fn media_part(upload: &MediaUpload) -> Result<Part> {
    if upload.kind().is_none() {
        return Err(StoreError::Validation(format!(
            "{}: unsupported media type {}",
            upload.file_name, upload.content_type
        )));
    }
    Part::bytes(upload.bytes.clone())
        .file_name(upload.file_name.clone())
        .mime_str(&upload.content_type)
        .map_err(|e| {
            StoreError::Validation(format!(
                "{}: invalid content type {}: {e}",
                upload.file_name, upload.content_type
            ))
        })
}

async fn error_for_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp.text().await.unwrap_or_default();
        return Err(StoreError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp)
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let body = resp.text().await?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let client = IncidentStoreClient::new("https://store.example/api/", None).unwrap();
        assert_eq!(client.base_url(), "https://store.example/api");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = IncidentStoreClient::new("not a url", None).err().unwrap();
        assert!(matches!(err, StoreError::InvalidUrl(_)), "got {err:?}");
        assert!(!err.is_transport());
    }

    #[test]
    fn media_part_checks_content_type() {
        let upload = |content_type: &str| MediaUpload {
            file_name: "clip".into(),
            content_type: content_type.into(),
            bytes: vec![0],
        };
        assert!(media_part(&upload("image/png")).is_ok());
        assert!(media_part(&upload("video/mp4")).is_ok());
        assert!(matches!(
            media_part(&upload("application/pdf")),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            media_part(&upload("image/jp{eg")),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn transport_classification() {
        assert!(StoreError::Network("reset".into()).is_transport());
        assert!(StoreError::Parse("eof".into()).is_transport());
        assert!(StoreError::Api { status: 503, message: String::new() }.is_transport());
        assert!(!StoreError::Validation("missing type".into()).is_transport());
        assert!(!StoreError::NotFound("inc-1".into()).is_transport());
    }
}
