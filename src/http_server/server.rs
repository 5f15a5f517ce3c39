//! # HTTP Server
//!
//! Nests every mounted resource under its prefix next to the health route.

use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::health::health_routes;
use crate::config::ServiceConfig;
use crate::routes::MountedResource;

/// HTTP server over the mounted resources
pub struct HttpServer {
    addr: String,
    router: Router,
}

impl HttpServer {
    pub fn with_config(config: &ServiceConfig, mounted: &[MountedResource]) -> Self {
        Self {
            addr: config.socket_addr(),
            router: Self::build_router(config, mounted),
        }
    }

    /// Build the combined router
    fn build_router(config: &ServiceConfig, mounted: &[MountedResource]) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let mut router = Router::new().merge(health_routes());
        for entry in mounted {
            router = router.nest(entry.prefix, entry.resource.clone().router());
        }

        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> &str {
        &self.addr
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process exits
    pub async fn start(self) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(&self.addr).await?;
        tracing::info!(addr = %self.addr, "HTTP server listening");

        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::mount_all;
    use crate::store::MemoryStore;

    #[test]
    fn test_server_with_custom_port() {
        let config = ServiceConfig {
            port: 8080,
            ..ServiceConfig::default()
        };
        let server = HttpServer::with_config(&config, &[]);
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds_with_all_resources() {
        let config = ServiceConfig {
            cors_origins: vec!["https://example.org".to_string()],
            ..ServiceConfig::default()
        };
        let store = MemoryStore::new();
        let mounted = mount_all(&store, &config).unwrap();
        let _router = HttpServer::with_config(&config, &mounted).router();
        assert_eq!(store.names().len(), mounted.len());
    }
}
