use async_trait::async_trait;
use bytes::Bytes;
use oidc_edge_gate::prelude::*;
use oidc_edge_gate::telemetry::init_tracing;
use pingora_core::server::Server;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::{Error, ErrorType, Result};
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use serde::Deserialize;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyAppConfig {
    gate: GateSettings,
    logging: Option<LoggingConfig>,
    listen_addr: String,
    upstream_addr: String,
    /// Overall budget for one request's trip through the gate.
    invocation_deadline_seconds: Option<u64>,
}

#[derive(Clone)]
struct UpstreamConfig {
    addr: String,
    tls: bool,
    sni: String,
}

struct EdgeGateService {
    gate: Arc<Gate>,
    upstream: UpstreamConfig,
    deadline: Duration,
}

fn internal(context: String) -> Box<Error> {
    let mut err = Error::new(ErrorType::InternalError);
    err.set_context(context);
    err
}

#[async_trait]
impl ProxyHttp for EdgeGateService {
    type CTX = ();
    fn new_ctx(&self) -> Self::CTX {}

    async fn request_filter(&self, session: &mut Session, _ctx: &mut Self::CTX) -> Result<bool> {
        // Only the head matters to the gate; the body stays with the session.
        let head = session.req_header();
        let mut builder = http::Request::builder()
            .method(head.method.clone())
            .uri(head.uri.clone());
        for (name, value) in head.headers.iter() {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(())
            .map_err(|e| internal(format!("Failed to rebuild request head: {}", e)))?;

        match self.gate.handle_within(request, self.deadline).await {
            Outcome::Forward(_) => Ok(false), // Continue to upstream
            Outcome::Respond(response) => {
                let (parts, body) = response.into_parts();
                let mut resp_header = ResponseHeader::build(parts.status.as_u16(), None)?;
                for (name, value) in parts.headers.iter() {
                    resp_header.insert_header(name.as_str().to_string(), value.as_bytes())?;
                }
                let body_bytes = Bytes::from(body);
                resp_header.insert_header("Content-Length", body_bytes.len().to_string())?;
                session.write_response_header(Box::new(resp_header), false).await?;
                session.write_response_body(Some(body_bytes), true).await?;
                Ok(true) // Request handled, stop processing.
            }
        }
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let peer = Box::new(HttpPeer::new(
            &self.upstream.addr,
            self.upstream.tls,
            self.upstream.sni.clone(),
        ));
        Ok(peer)
    }
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/edge_gate.yaml".to_string());
    let config_str = fs::read_to_string(&config_path)
        .map_err(|e| internal(format!("Failed to read config file {}: {:?}", config_path, e)))?;
    let app_config: ProxyAppConfig = serde_yaml::from_str(&config_str)
        .map_err(|e| internal(format!("Failed to parse YAML config from {}: {:?}", config_path, e)))?;

    let log_level = app_config
        .logging
        .as_ref()
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");
    init_tracing(log_level).map_err(|e| internal(format!("Failed to install tracing: {}", e)))?;

    let gate_config = Config::try_from(app_config.gate)
        .map_err(|e| internal(format!("Gate config error: {}", e)))?;
    let gate = Gate::new(gate_config).map_err(|e| internal(format!("Failed to create gate: {}", e)))?;

    let upstream_sni = app_config
        .upstream_addr
        .split(':')
        .next()
        .unwrap_or(&app_config.upstream_addr)
        .to_string();
    let service = EdgeGateService {
        gate: Arc::new(gate),
        upstream: UpstreamConfig {
            addr: app_config.upstream_addr.clone(),
            tls: false,
            sni: upstream_sni,
        },
        deadline: Duration::from_secs(app_config.invocation_deadline_seconds.unwrap_or(25)),
    };

    let mut server = Server::new(None)?;
    server.bootstrap();

    let mut proxy_service = pingora_proxy::http_proxy_service(&server.configuration, service);
    proxy_service.add_tcp(&app_config.listen_addr);

    tracing::info!("Edge gate listening on {}", app_config.listen_addr);
    server.add_service(proxy_service);
    server.run_forever();
}
