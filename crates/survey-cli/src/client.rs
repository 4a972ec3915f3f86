//! HTTP and WebSocket client for the survey server.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use survey_core::models::{
    CreateDroneRequest, CreateMissionRequest, CreateSiteRequest, Drone, Mission, Site,
    TelemetryReply, TelemetryReport,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

/// Client for the survey server REST API.
pub struct SurveyClient {
    base_url: String,
    client: reqwest::Client,
}

/// Open telemetry session for one mission.
pub struct TelemetryStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SurveyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_drone(&self, request: &CreateDroneRequest) -> Result<Drone> {
        self.post("/api/v1/drones", Some(request)).await
    }

    pub async fn get_drone(&self, id: Uuid) -> Result<Drone> {
        self.get(&format!("/api/v1/drones/{id}")).await
    }

    pub async fn create_site(&self, request: &CreateSiteRequest) -> Result<Site> {
        self.post("/api/v1/sites", Some(request)).await
    }

    pub async fn create_mission(&self, request: &CreateMissionRequest) -> Result<Mission> {
        self.post("/api/v1/missions", Some(request)).await
    }

    pub async fn get_mission(&self, id: Uuid) -> Result<Mission> {
        self.get(&format!("/api/v1/missions/{id}")).await
    }

    pub async fn start_mission(&self, id: Uuid) -> Result<Mission> {
        self.post::<(), _>(&format!("/api/v1/missions/{id}/start"), None).await
    }

    pub async fn complete_mission(&self, id: Uuid) -> Result<Mission> {
        self.post::<(), _>(&format!("/api/v1/missions/{id}/complete"), None).await
    }

    pub async fn abort_mission(&self, id: Uuid) -> Result<Mission> {
        self.post::<(), _>(&format!("/api/v1/missions/{id}/abort"), None).await
    }

    /// Open the telemetry socket of an IN_PROGRESS mission.
    pub async fn telemetry(&self, mission_id: Uuid) -> Result<TelemetryStream> {
        let url = build_ws_url(
            &self.base_url,
            &format!("/api/v1/missions/{mission_id}/telemetry"),
        )?;
        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("connecting to {url}"))?;
        Ok(TelemetryStream { socket })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: Option<&B>) -> Result<T> {
        let mut builder = self.client.post(format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        decode(builder.send().await?).await
    }
}

impl TelemetryStream {
    /// Send one report and wait for the server's verdict.
    pub async fn send(&mut self, report: &TelemetryReport) -> Result<TelemetryReply> {
        self.socket
            .send(Message::Text(serde_json::to_string(report)?))
            .await?;

        while let Some(msg) = self.socket.next().await {
            match msg? {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(frame) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    anyhow::bail!("telemetry session closed ({code}): {reason}");
                }
                _ => {}
            }
        }
        anyhow::bail!("telemetry session ended without a reply")
    }

    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }
}

/// Turn an error body `{error: {code, message}}` into an `anyhow` error.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body: serde_json::Value = response.json().await.unwrap_or_default();
    let code = body["error"]["code"].as_str().unwrap_or("UNKNOWN");
    let message = body["error"]["message"].as_str().unwrap_or("no message");
    anyhow::bail!("server returned {status} {code}: {message}")
}

fn build_ws_url(base: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => other,
    }
    .to_string();

    url.set_scheme(&scheme)
        .map_err(|_| anyhow::anyhow!("Invalid base URL scheme"))?;
    url.set_path(path);
    Ok(url)
}
