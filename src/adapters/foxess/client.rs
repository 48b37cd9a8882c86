use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use md5::{Digest, Md5};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::domain::{Device, QuotaSnapshot, RealTimeReading};
use crate::error::ApiError;
use crate::ports::TelemetrySource;

use super::types::{
    AccessCount, DeviceListPage, DeviceListRequest, Envelope, RealTimeRequest, WireRealTimeData,
};

pub const DEFAULT_BASE_URL: &str = "https://www.foxesscloud.com";

const ACCESS_COUNT_PATH: &str = "/op/v0/user/getAccessCount";
const DEVICE_LIST_PATH: &str = "/op/v0/device/list";
const REAL_TIME_PATH: &str = "/op/v1/device/real/query";
const PAGE_SIZE: u32 = 1000;

/// FoxESS Open API client using reqwest
pub struct FoxessClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FoxessClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self::from_reqwest(base_url, api_key, http))
    }

    pub fn from_reqwest(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let timestamp = Utc::now().timestamp_millis();

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("token", &self.api_key)
            .header("signature", signature(path, &self.api_key, timestamp))
            .header("timestamp", timestamp.to_string())
            .header("lang", "en")
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| transport_error(&method, path, source))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| transport_error(&method, path, source))?;
        debug!("{} {} returned {} bytes", method, path, bytes.len());

        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
                path: path.to_string(),
                source,
            })?;
        if envelope.error_number != 0 {
            return Err(ApiError::Upstream {
                errno: envelope.error_number,
                message: envelope.message,
            });
        }

        envelope.result.ok_or_else(|| ApiError::MissingResult {
            path: path.to_string(),
        })
    }
}

#[async_trait]
impl TelemetrySource for FoxessClient {
    async fn get_usage(&self) -> Result<QuotaSnapshot, ApiError> {
        let count: AccessCount = self
            .request::<(), _>(Method::GET, ACCESS_COUNT_PATH, None)
            .await?;
        Ok(QuotaSnapshot::new(count.total, count.remaining))
    }

    async fn list_devices(&self) -> Result<Vec<Device>, ApiError> {
        let mut devices = Vec::new();
        let mut current_page = 1;

        loop {
            let request = DeviceListRequest {
                current_page,
                page_size: PAGE_SIZE,
            };
            let page: DeviceListPage = self
                .request(Method::POST, DEVICE_LIST_PATH, Some(&request))
                .await?;

            let received = page.devices.len();
            devices.extend(page.devices.into_iter().map(Device::from));
            if received == 0 || devices.len() >= page.total {
                break;
            }
            current_page += 1;
        }

        Ok(devices)
    }

    async fn get_real_time_data(
        &self,
        device_ids: &[String],
        variables: &[String],
    ) -> Result<Vec<RealTimeReading>, ApiError> {
        if device_ids.is_empty() {
            return Ok(Vec::new());
        }

        let request = RealTimeRequest {
            serial_numbers: device_ids,
            variables,
        };
        let data: Vec<WireRealTimeData> = self
            .request(Method::POST, REAL_TIME_PATH, Some(&request))
            .await?;

        data.into_iter().map(RealTimeReading::try_from).collect()
    }
}

/// Request signature: hex MD5 of path, key and millisecond timestamp joined
/// by the literal characters `\r\n`.
pub fn signature(path: &str, api_key: &str, timestamp: i64) -> String {
    let term = format!("{}\\r\\n{}\\r\\n{}", path, api_key, timestamp);
    hex::encode(Md5::digest(term.as_bytes()))
}

fn transport_error(method: &Method, path: &str, source: reqwest::Error) -> ApiError {
    ApiError::Transport {
        method: method.to_string(),
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::domain::DeviceStatus;

    async fn setup() -> (MockServer, FoxessClient) {
        let server = MockServer::start().await;
        let client = FoxessClient::from_reqwest(server.uri(), "test-key", reqwest::Client::new());
        (server, client)
    }

    #[test]
    fn test_signature() {
        assert_eq!(
            signature("/op/v0/device/list", "abcdefghij012345689", 1705809089),
            "68a007c2450d6697fbe2990f92000269"
        );
    }

    #[tokio::test]
    async fn test_get_usage() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path(ACCESS_COUNT_PATH))
            .and(header("token", "test-key"))
            .and(header("lang", "en"))
            .and(header_exists("signature"))
            .and(header_exists("timestamp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errno": 0,
                "msg": "success",
                "result": { "total": "1440", "remaining": "1080" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let usage = client.get_usage().await.unwrap();
        assert_eq!(usage, QuotaSnapshot::new(1440.0, 1080.0));
        assert_eq!(usage.percentage_used, 25.0);
    }

    #[tokio::test]
    async fn test_list_devices_follows_pages() {
        let (server, client) = setup().await;

        let device = |sn: &str, status: i64| json!({ "deviceSN": sn, "stationName": "Home", "status": status });

        Mock::given(method("POST"))
            .and(path(DEVICE_LIST_PATH))
            .and(body_json(json!({ "currentPage": 1, "pageSize": 1000 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errno": 0,
                "result": { "currentPage": 1, "pageSize": 1000, "total": 3,
                            "data": [device("X", 1), device("Y", 3)] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(DEVICE_LIST_PATH))
            .and(body_json(json!({ "currentPage": 2, "pageSize": 1000 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errno": 0,
                "result": { "currentPage": 2, "pageSize": 1000, "total": 3,
                            "data": [device("Z", 2)] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let devices = client.list_devices().await.unwrap();
        let ids: Vec<&str> = devices.iter().map(|d| d.serial_number.as_str()).collect();
        assert_eq!(ids, vec!["X", "Y", "Z"]);
        assert_eq!(devices[1].status, DeviceStatus::Offline);
        assert_eq!(devices[2].status, DeviceStatus::Fault);
        assert_eq!(devices[0].station_name.as_deref(), Some("Home"));
    }

    #[tokio::test]
    async fn test_real_time_data() {
        let (server, client) = setup().await;

        Mock::given(method("POST"))
            .and(path(REAL_TIME_PATH))
            .and(body_json(json!({ "sns": ["X"], "variables": ["pvPower"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errno": 0,
                "msg": "success",
                "result": [{
                    "deviceSN": "X",
                    "time": "2024-01-21 12:04:49 CET+0100",
                    "datas": [{ "variable": "pvPower", "unit": "kW", "name": "PVPower", "value": 3.5 }]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let readings = client
            .get_real_time_data(&["X".to_string()], &["pvPower".to_string()])
            .await
            .unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].device_id, "X");
        assert_eq!(readings[0].values[0].value, 3.5);
    }

    #[tokio::test]
    async fn test_real_time_without_devices_makes_no_call() {
        let (server, client) = setup().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let readings = client.get_real_time_data(&[], &[]).await.unwrap();
        assert!(readings.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error_number() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path(ACCESS_COUNT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errno": 40256,
                "msg": "illegal signature"
            })))
            .mount(&server)
            .await;

        match client.get_usage().await {
            Err(ApiError::Upstream { errno, message }) => {
                assert_eq!(errno, 40256);
                assert_eq!(message, "illegal signature");
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path(ACCESS_COUNT_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(matches!(
            client.get_usage().await,
            Err(ApiError::Status { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path(ACCESS_COUNT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        assert!(matches!(client.get_usage().await, Err(ApiError::Decode { .. })));
    }
}
