//! HTTP client for the Proxmox VE JSON API.
//!
//! One TCP (and TLS) connection per request, driven by a hyper HTTP/1.1
//! client connection, with the whole exchange bounded by the configured
//! timeout. Authentication happens once, on the first call that needs it,
//! and the result is reused for the life of the client.

use std::time::Duration;

use bytes::Bytes;
use http::uri::Authority;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::OnceCell;
use tokio_rustls::TlsConnector;
use tracing::{debug, info};

use distributor_core::config::DEFAULT_PROXMOX_PORT;
use distributor_core::{
    ClusterClient, ClusterError, ClusterFuture, ClusterResult, Credentials, Member, Pool,
    ProxmoxSettings, Scheme, validate_pool_name,
};

use crate::tls;
use crate::wire::{self, Envelope, PoolDetail, PoolEntry, TicketData};

const API_PREFIX: &str = "/api2/json";
const USER_AGENT: &str = concat!("virtualisation-resource-distributor/", env!("CARGO_PKG_VERSION"));

/// Proxmox VE API client.
pub struct ProxmoxClient {
    endpoint: Endpoint,
    credentials: Credentials,
    timeout: Duration,
    tls: Option<TlsConnector>,
    auth: OnceCell<AuthHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    scheme: Scheme,
    /// Host as written in the URI (IPv6 literals keep their brackets).
    host: String,
    port: u16,
}

impl Endpoint {
    fn parse(settings: &ProxmoxSettings) -> ClusterResult<Self> {
        let authority: Authority = settings
            .host
            .parse()
            .map_err(|e| ClusterError::Config(format!("invalid host {:?}: {e}", settings.host)))?;
        Ok(Endpoint {
            scheme: settings.scheme,
            host: authority.host().to_string(),
            port: authority.port_u16().unwrap_or(DEFAULT_PROXMOX_PORT),
        })
    }

    /// Host for socket connects and SNI.
    fn connect_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn url(&self, path: &str) -> String {
        let scheme = match self.scheme {
            Scheme::Https => "https",
            Scheme::Http => "http",
        };
        format!("{scheme}://{}{API_PREFIX}{path}", self.authority())
    }
}

/// Credential attached to every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AuthHeader {
    /// Session ticket from `/access/ticket`, sent as the `PVEAuthCookie`.
    Ticket(String),
    /// Full `PVEAPIToken=...` authorization value.
    Token(String),
}

impl AuthHeader {
    fn apply(&self, builder: http::request::Builder) -> http::request::Builder {
        match self {
            AuthHeader::Ticket(ticket) => {
                builder.header(header::COOKIE, format!("PVEAuthCookie={ticket}"))
            }
            AuthHeader::Token(value) => builder.header(header::AUTHORIZATION, value),
        }
    }
}

/// A fully buffered response.
#[derive(Debug)]
struct RawResponse {
    status: StatusCode,
    /// Non-canonical reason phrase; Proxmox puts its error message here.
    reason: Option<String>,
    body: Bytes,
}

impl RawResponse {
    /// Best available description of a failed response.
    fn message(&self) -> String {
        if let Some(reason) = &self.reason {
            return reason.trim().to_string();
        }
        let body = String::from_utf8_lossy(&self.body);
        let body = body.trim();
        if body.is_empty() {
            self.status.canonical_reason().unwrap_or("").to_string()
        } else {
            body.chars().take(200).collect()
        }
    }

    /// Whether the response says the requested object does not exist.
    ///
    /// Proxmox answers unknown pools with a 500 and a "does not exist"
    /// message rather than a 404.
    fn is_missing(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
            || (self.status == StatusCode::INTERNAL_SERVER_ERROR
                && self.message().contains("does not exist"))
    }

    fn check_status(&self) -> ClusterResult<()> {
        if self.status.is_success() {
            return Ok(());
        }
        Err(match self.status {
            StatusCode::UNAUTHORIZED => ClusterError::Authentication(self.message()),
            status => ClusterError::Status {
                status: status.as_u16(),
                message: self.message(),
            },
        })
    }

    fn into_data<T: DeserializeOwned>(self) -> ClusterResult<T> {
        self.check_status()?;
        let envelope: Envelope<T> = serde_json::from_slice(&self.body)
            .map_err(|e| ClusterError::Malformed(e.to_string()))?;
        Ok(envelope.data)
    }
}

impl ProxmoxClient {
    /// Build a client from the `[proxmox]` settings. No network I/O happens
    /// until the first call.
    pub fn new(settings: &ProxmoxSettings) -> ClusterResult<Self> {
        let endpoint = Endpoint::parse(settings)?;
        let tls = match settings.scheme {
            Scheme::Https => Some(tls::connector(settings)?),
            Scheme::Http => None,
        };
        debug!(url = %endpoint.url(""), "Proxmox client configured");
        Ok(Self {
            endpoint,
            credentials: settings.credentials.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            tls,
            auth: OnceCell::new(),
        })
    }

    async fn auth(&self) -> ClusterResult<&AuthHeader> {
        self.auth.get_or_try_init(|| self.login()).await
    }

    async fn login(&self) -> ClusterResult<AuthHeader> {
        match &self.credentials {
            Credentials::Token { token_id, secret } => {
                Ok(AuthHeader::Token(format!("PVEAPIToken={token_id}={secret}")))
            }
            Credentials::Password { username, password } => {
                let body = serde_json::to_vec(&serde_json::json!({
                    "username": username,
                    "password": password,
                }))
                .map_err(|e| ClusterError::Malformed(e.to_string()))?;

                let response = self
                    .send(Method::POST, "/access/ticket", Some(body), None)
                    .await?;
                if response.status == StatusCode::UNAUTHORIZED {
                    return Err(ClusterError::Authentication(format!(
                        "login rejected for {username}"
                    )));
                }
                let ticket: TicketData = response.into_data()?;
                info!(
                    username = %ticket.username,
                    csrf = ticket.csrf_token.is_some(),
                    "authenticated against Proxmox API"
                );
                Ok(AuthHeader::Ticket(ticket.ticket))
            }
        }
    }

    /// Authenticated `GET` returning the unwrapped `data` field.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClusterResult<T> {
        let auth = self.auth().await?;
        self.send(Method::GET, path, None, Some(auth))
            .await?
            .into_data()
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        auth: Option<&AuthHeader>,
    ) -> ClusterResult<RawResponse> {
        let url = self.endpoint.url(path);

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(format!("{API_PREFIX}{path}"))
            .header(header::HOST, self.endpoint.authority())
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json");
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(auth) = auth {
            builder = auth.apply(builder);
        }
        let request = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| ClusterError::Transport(format!("building {method} {url}: {e}")))?;

        let response = tokio::time::timeout(self.timeout, self.dispatch(request))
            .await
            .map_err(|_| {
                ClusterError::Transport(format!("{method} {url} timed out after {:?}", self.timeout))
            })??;

        debug!(%method, %url, status = %response.status, "Proxmox API request");
        Ok(response)
    }

    async fn dispatch(&self, request: Request<Full<Bytes>>) -> ClusterResult<RawResponse> {
        let stream = TcpStream::connect((self.endpoint.connect_host(), self.endpoint.port))
            .await
            .map_err(|e| {
                ClusterError::Transport(format!("connect to {}: {e}", self.endpoint.authority()))
            })?;

        match &self.tls {
            Some(connector) => {
                let server_name = ServerName::try_from(self.endpoint.connect_host())
                    .map_err(|e| ClusterError::Config(format!("invalid TLS server name: {e}")))?
                    .to_owned();
                let stream = connector
                    .connect(server_name, stream)
                    .await
                    .map_err(|e| ClusterError::Transport(format!("TLS handshake: {e}")))?;
                exchange(TokioIo::new(stream), request).await
            }
            None => exchange(TokioIo::new(stream), request).await,
        }
    }
}

/// Run one request over a fresh HTTP/1.1 connection and buffer the response.
async fn exchange<T>(io: T, request: Request<Full<Bytes>>) -> ClusterResult<RawResponse>
where
    T: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake::<T, Full<Bytes>>(io)
        .await
        .map_err(|e| ClusterError::Transport(format!("HTTP handshake: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "Proxmox connection closed with error");
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| ClusterError::Transport(format!("request failed: {e}")))?;

    let status = response.status();
    let reason = response
        .extensions()
        .get::<hyper::ext::ReasonPhrase>()
        .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned());
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| ClusterError::Transport(format!("reading response body: {e}")))?
        .to_bytes();

    Ok(RawResponse {
        status,
        reason,
        body,
    })
}

/// `/pools?poolid=...` for a validated pool id.
///
/// The query form accepts nested ids (`parent/child`); `/` is the only
/// character a valid id contains that needs escaping.
fn pool_query(pool_name: &str) -> String {
    format!("/pools?poolid={}", pool_name.replace('/', "%2F"))
}

impl ClusterClient for ProxmoxClient {
    fn list_pools(&self) -> ClusterFuture<'_, Vec<Pool>> {
        Box::pin(async move {
            let entries: Vec<PoolEntry> = self.get("/pools").await?;
            debug!(count = entries.len(), "listed pools");
            Ok(entries.into_iter().map(Pool::from).collect())
        })
    }

    fn get_pool_members<'a>(&'a self, pool_name: &'a str) -> ClusterFuture<'a, Vec<Member>> {
        Box::pin(async move {
            validate_pool_name(pool_name)?;
            let auth = self.auth().await?;
            let response = self
                .send(Method::GET, &pool_query(pool_name), None, Some(auth))
                .await?;
            if response.is_missing() {
                return Err(ClusterError::PoolNotFound(pool_name.to_string()));
            }
            let details: Vec<PoolDetail> = response.into_data()?;
            let detail = details
                .into_iter()
                .find(|d| d.poolid.as_deref() == Some(pool_name))
                .ok_or_else(|| ClusterError::PoolNotFound(pool_name.to_string()))?;
            let members = wire::decode_members(pool_name, detail.members)?;
            debug!(pool = pool_name, count = members.len(), "listed pool members");
            Ok(members)
        })
    }
}
