use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tradegym_domain::repositories::policy::{Policy, PolicyFactory, RunContext};
use tradegym_domain::value_objects::observation::Observation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActRequest {
    pub api_version: String,
    pub run_id: String,
    pub symbol: String,
    pub step: usize,
    pub observation: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActResponse {
    pub action: i64,
    #[serde(default)]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct RemoteCallInfo {
    pub(crate) attempts: u32,
    pub(crate) duration_ms: u64,
    pub(crate) status: Option<u16>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct RemoteCallResult {
    pub(crate) info: RemoteCallInfo,
    pub(crate) response: Option<ActResponse>,
}

/// HTTP client for an out-of-process policy service (`POST {url}/v1/act`).
pub struct RemotePolicyClient {
    pub url: String,
    pub timeout_ms: u64,
    pub api_version: String,
    pub retries: u32,
    client: Client,
}

impl RemotePolicyClient {
    pub fn new(
        url: String,
        timeout_ms: u64,
        api_version: String,
        retries: u32,
    ) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            url,
            timeout_ms,
            api_version,
            retries,
            client,
        })
    }

    pub fn act(&self, request: &ActRequest) -> Result<ActResponse, String> {
        let RemoteCallResult { info, response } = self.act_detailed(request);
        tracing::debug!(
            step = request.step,
            attempts = info.attempts,
            duration_ms = info.duration_ms,
            status = ?info.status,
            "policy call finished"
        );
        match response {
            Some(response) => Ok(response),
            None => Err(info
                .error
                .unwrap_or_else(|| "policy request failed".to_string())),
        }
    }

    /// Transport failures and 5xx responses are retried up to `retries` times.
    /// Any other failure ends the call immediately.
    pub(crate) fn act_detailed(&self, request: &ActRequest) -> RemoteCallResult {
        let endpoint = format!("{}/v1/act", self.url.trim_end_matches('/'));
        let span = tracing::info_span!(
            "infra.policy.act",
            endpoint = %endpoint,
            api_version = %self.api_version,
            run_id = %request.run_id,
            step = request.step,
            timeout_ms = self.timeout_ms,
            retries = self.retries
        );
        let _enter = span.enter();

        let start = Instant::now();
        let mut attempts = 0u32;
        let mut last_status: Option<u16> = None;
        let mut last_error: Option<String> = None;
        let mut last_error_kind: Option<&'static str> = None;

        while attempts <= self.retries {
            attempts += 1;
            if attempts > 1 {
                metrics::counter!("tradegym.infra.policy.retries_total").increment(1);
                tracing::debug!(attempt = attempts, "retrying policy request");
            }

            metrics::counter!("tradegym.infra.policy.requests_total").increment(1);
            let attempt_start = Instant::now();
            match self.client.post(&endpoint).json(request).send() {
                Ok(resp) => {
                    let status = resp.status();
                    last_status = Some(status.as_u16());
                    metrics::histogram!(
                        "tradegym.infra.policy.attempt_ms",
                        "status" => status.as_u16().to_string()
                    )
                    .record(attempt_start.elapsed().as_millis() as f64);

                    if status == StatusCode::OK {
                        match resp.json::<ActResponse>() {
                            Ok(parsed) => {
                                let duration_ms = start.elapsed().as_millis() as u64;
                                metrics::histogram!(
                                    "tradegym.infra.policy.call_ms",
                                    "result" => "ok"
                                )
                                .record(duration_ms as f64);
                                metrics::histogram!("tradegym.infra.policy.attempts")
                                    .record(attempts as f64);
                                return RemoteCallResult {
                                    info: RemoteCallInfo {
                                        attempts,
                                        duration_ms,
                                        status: last_status,
                                        error: None,
                                    },
                                    response: Some(parsed),
                                };
                            }
                            Err(err) => {
                                last_error =
                                    Some(format!("failed to parse policy response: {err}"));
                                last_error_kind = Some("decode");
                                break;
                            }
                        }
                    }

                    last_error = Some(format!("policy http error: status {}", status.as_u16()));
                    last_error_kind = Some("http_status");
                    if status.is_server_error() && attempts <= self.retries {
                        continue;
                    }
                    break;
                }
                Err(err) => {
                    metrics::histogram!("tradegym.infra.policy.attempt_ms", "status" => "err")
                        .record(attempt_start.elapsed().as_millis() as f64);
                    last_error = Some(format!("policy request failed: {err}"));
                    last_error_kind = Some("transport");
                    if attempts <= self.retries {
                        continue;
                    }
                    break;
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let status_label = last_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        let kind = last_error_kind.unwrap_or("unknown");
        metrics::counter!(
            "tradegym.infra.policy.errors_total",
            "kind" => kind,
            "status" => status_label
        )
        .increment(1);
        metrics::histogram!("tradegym.infra.policy.call_ms", "result" => "err")
            .record(duration_ms as f64);
        metrics::histogram!("tradegym.infra.policy.attempts").record(attempts as f64);
        tracing::warn!(
            attempts,
            status = ?last_status,
            error = last_error.as_deref().unwrap_or("unknown"),
            "policy request failed"
        );

        RemoteCallResult {
            info: RemoteCallInfo {
                attempts,
                duration_ms,
                status: last_status,
                error: last_error
                    .or_else(|| Some("policy request failed after retries".to_string())),
            },
            response: None,
        }
    }
}

/// One run's view of the remote service. Tracks the step counter sent with
/// each request.
pub struct RemotePolicy {
    client: Arc<RemotePolicyClient>,
    run_id: String,
    symbol: String,
    step: usize,
}

impl RemotePolicy {
    pub fn new(client: Arc<RemotePolicyClient>, context: &RunContext) -> Self {
        Self {
            client,
            run_id: context.run_id.clone(),
            symbol: context.symbol.clone(),
            step: 0,
        }
    }
}

impl Policy for RemotePolicy {
    fn name(&self) -> &str {
        "remote"
    }

    fn predict(&mut self, observation: &Observation) -> Result<i64, String> {
        let request = ActRequest {
            api_version: self.client.api_version.clone(),
            run_id: self.run_id.clone(),
            symbol: self.symbol.clone(),
            step: self.step,
            observation: observation.as_slice().to_vec(),
        };
        let response = self.client.act(&request)?;
        self.step += 1;
        Ok(response.action)
    }
}

pub struct RemotePolicyFactory {
    client: Arc<RemotePolicyClient>,
}

impl RemotePolicyFactory {
    pub fn new(client: RemotePolicyClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl PolicyFactory for RemotePolicyFactory {
    fn name(&self) -> &str {
        "remote"
    }

    fn create(&self, context: &RunContext) -> Result<Box<dyn Policy + Send>, String> {
        Ok(Box::new(RemotePolicy::new(Arc::clone(&self.client), context)))
    }
}
