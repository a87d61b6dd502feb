use crate::config::RouteConfig;
use crate::error::{GatewayError, Result};
use http::Method;
use matchit::Router as MatchitRouter;
use tracing::warn;

/// A matched route's forwarding and policy attributes.
#[derive(Debug, Clone)]
pub struct Route {
    /// Logical backend service name
    pub service: String,
    /// Allowed HTTP methods
    pub methods: Vec<Method>,
    /// Whether the route bypasses authentication
    pub public: bool,
    /// Named rate-limit policy
    pub policy: String,
}

/// Static route table compiled at startup.
///
/// Patterns use `{param}` for a single segment and `{*rest}` for a trailing
/// wildcard. Static segments always beat templated ones, so
/// `/v1/reports/generate/statistics` wins over `/v1/reports/{id}` no matter
/// the registration order; for identical patterns the first registration
/// wins and later ones are skipped with a warning.
#[derive(Debug, Clone)]
pub struct RouteTable {
    matcher: MatchitRouter<Route>,
    patterns: Vec<String>,
}

impl RouteTable {
    /// Compile the route table from configuration
    pub fn new(routes: &[RouteConfig]) -> Result<Self> {
        let mut matcher = MatchitRouter::new();
        let mut patterns = Vec::new();

        for route_config in routes {
            let methods = route_config
                .methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_uppercase().as_bytes()).map_err(|_| {
                        GatewayError::Config(format!("Invalid HTTP method: {}", m))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let route = Route {
                service: route_config.service.clone(),
                methods,
                public: route_config.public,
                policy: route_config.policy.clone(),
            };

            match matcher.insert(&route_config.path, route) {
                Ok(()) => patterns.push(route_config.path.clone()),
                Err(e) => {
                    // First-registered wins; a later overlapping descriptor
                    // is a config mistake, not a startup failure.
                    warn!(
                        path = %route_config.path,
                        error = %e,
                        "Skipping conflicting route registration"
                    );
                }
            }
        }

        Ok(Self { matcher, patterns })
    }

    /// Match a request path and method to a route.
    ///
    /// An unmatched path yields `ENDPOINT_NOT_FOUND`; a matched path whose
    /// descriptor does not list the method yields `METHOD_NOT_ALLOWED`.
    pub fn match_route(&self, path: &str, method: &Method) -> Result<RouteMatch> {
        let matched = self
            .matcher
            .at(path)
            .map_err(|_| GatewayError::EndpointNotFound(path.to_string()))?;

        let route = matched.value;

        if !route.methods.contains(method) {
            return Err(GatewayError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        Ok(RouteMatch {
            route: route.clone(),
        })
    }

    /// Registered path patterns, in registration order
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Result of matching a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Route,
}
