pub mod attachment_driven_ports;
pub mod firestore_task_driven_ports;
pub mod identity_driven_ports;

use crate::external_connections;
use anyhow::{Context, anyhow};
use reqwest_middleware::{ClientBuilder, RequestBuilder};
use reqwest_tracing::TracingMiddleware;

/// Data structure which owns clients for connecting to external systems.
/// Allows business logic to be agnostic of the external systems it communicates with
/// so driven adapters can easily be swapped out for other implementations
#[derive(Clone)]
pub struct ExternalConnectivity {
    http_client: reqwest_middleware::ClientWithMiddleware,
    id_token: Option<String>,
}

impl ExternalConnectivity {
    /// Builds the traced HTTP client every backend request goes through
    pub fn new() -> Result<Self, anyhow::Error> {
        let base_client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .context("building the HTTP client")?;
        let http_client = ClientBuilder::new(base_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(ExternalConnectivity {
            http_client,
            id_token: None,
        })
    }
}

impl external_connections::ExternalConnectivity for ExternalConnectivity {
    fn http_client(&self) -> &reqwest_middleware::ClientWithMiddleware {
        &self.http_client
    }

    fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    fn set_id_token(&mut self, id_token: Option<String>) {
        self.id_token = id_token;
    }
}

/// Attaches the signed-in user's credential to a request, if there is one
fn with_credential(
    request: RequestBuilder,
    ext_cxn: &impl external_connections::ExternalConnectivity,
) -> RequestBuilder {
    match ext_cxn.id_token() {
        Some(id_token) => request.bearer_auth(id_token),
        None => request,
    }
}

/// Passes successful responses through and turns anything else into an error carrying the body
async fn success_or_error(response: reqwest::Response) -> Result<reqwest::Response, anyhow::Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("backend responded with {status}: {body}"))
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_owned()
}
