/// Hands driven adapters the clients they need to reach external systems, so business logic
/// stays agnostic of how those systems are contacted.
pub trait ExternalConnectivity {
    /// HTTP client used for every backend request
    fn http_client(&self) -> &reqwest_middleware::ClientWithMiddleware;

    /// Credential of the signed-in user, sent as a bearer token to backends that enforce
    /// per-user access rules
    fn id_token(&self) -> Option<&str>;

    /// Replaces the credential attached to outgoing requests
    fn set_id_token(&mut self, id_token: Option<String>);
}
