//! Registration surface and the build step that freezes it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::action::method::{Call, HandlerFn, MethodAction, Reply};
use crate::action::{Action, UnknownVerb, Verb};
use crate::binder::BinderManager;
use crate::config::EngineConfig;
use crate::dispatch::error::HandlerError;
use crate::dispatch::{DispatchSettings, Dispatcher, NotFoundRenderer, Responder, View, ViewResolver};
use crate::interceptor::{Interceptor, InterceptorRegistry};
use crate::param::{Marker, ParamDescriptor};
use crate::registry::engine::Engine;
use crate::routing::routes_file::{load_routes_file, RoutesFileError};
use crate::routing::static_router::InvalidTarget;
use crate::routing::{DuplicateRoute, HttpRouter, StaticRoute, StaticRouter, StaticTarget, Tree};
use crate::rpc::{RpcNamespace, RpcRouter};
use crate::socket::{PushAction, PushEvent, SocketHub};

/// A handler method before it is attached to a route, RPC path or push path.
#[derive(Clone)]
pub struct HandlerDef {
    pub handler_type: String,
    pub method: String,
    pub params: Vec<ParamDescriptor>,
    pub markers: Vec<Marker>,
    /// View named by the verb marker.
    pub view: Option<String>,
    pub handler: HandlerFn,
}

impl HandlerDef {
    pub fn new<F>(handler_type: impl Into<String>, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Call<'_>) -> Result<Reply, HandlerError> + Send + Sync + 'static,
    {
        Self {
            handler_type: handler_type.into(),
            method: method.into(),
            params: Vec::new(),
            markers: Vec::new(),
            view: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// `Type#method`.
    pub fn name(&self) -> String {
        format!("{}#{}", self.handler_type, self.method)
    }
}

impl fmt::Debug for HandlerDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDef")
            .field("name", &self.name())
            .field("params", &self.params.len())
            .field("markers", &self.markers)
            .field("view", &self.view)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{action} declares the source name `{name}` more than once")]
    DuplicateSourceName { action: String, name: String },

    #[error(transparent)]
    DuplicateRoute(#[from] DuplicateRoute),

    #[error("push action on {path} needs a delay greater than zero")]
    InvalidPushDelay { path: String },

    #[error(transparent)]
    RoutesFile(#[from] RoutesFileError),

    #[error(transparent)]
    StaticTarget(#[from] InvalidTarget),

    #[error(transparent)]
    UnknownVerb(#[from] UnknownVerb),
}

struct PushDef {
    path: String,
    delay: Duration,
    event: PushEvent,
    def: HandlerDef,
}

/// Collects everything the engine serves. Consumed by `build`.
pub struct RegistryBuilder {
    binders: BinderManager,
    interceptors: InterceptorRegistry,
    routes: Vec<(Verb, String, HandlerDef)>,
    rpc: Vec<(String, HandlerDef)>,
    pushes: Vec<PushDef>,
    static_routes: Vec<StaticRoute>,
    views: Vec<(String, Arc<dyn View>)>,
    not_found: Option<Arc<dyn NotFoundRenderer>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// Empty registry with the built-in binders, converters and validators.
    pub fn new() -> Self {
        Self {
            binders: BinderManager::with_defaults(),
            interceptors: InterceptorRegistry::new(),
            routes: Vec::new(),
            rpc: Vec::new(),
            pushes: Vec::new(),
            static_routes: Vec::new(),
            views: Vec::new(),
            not_found: None,
        }
    }

    /// Register custom binders, converters and validators.
    pub fn binders_mut(&mut self) -> &mut BinderManager {
        &mut self.binders
    }

    pub fn register_route(&mut self, verb: Verb, pattern: impl Into<String>, def: HandlerDef) -> &mut Self {
        self.routes.push((verb, pattern.into(), def));
        self
    }

    pub fn register_interceptor(&mut self, interceptor: Interceptor) -> &mut Self {
        self.interceptors.register(interceptor);
        self
    }

    /// Apply the aspects of `companions` to every action of `handler_type`.
    pub fn uses_aspects<I, S>(&mut self, handler_type: &str, companions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interceptors.uses_aspects(handler_type, companions);
        self
    }

    /// Add an overload for `path` (`/namespace/method`). Candidates are tried
    /// in registration order.
    pub fn register_rpc_candidate(&mut self, path: impl Into<String>, def: HandlerDef) -> &mut Self {
        self.rpc.push((path.into(), def));
        self
    }

    pub fn register_rpc_namespace(&mut self, namespace: RpcNamespace) -> &mut Self {
        self.rpc.extend(namespace.into_candidates());
        self
    }

    pub fn register_push(
        &mut self,
        path: impl Into<String>,
        delay: Duration,
        event: PushEvent,
        def: HandlerDef,
    ) -> &mut Self {
        self.pushes.push(PushDef {
            path: path.into(),
            delay,
            event,
            def,
        });
        self
    }

    pub fn register_static_route(&mut self, verb: Verb, path: impl Into<String>, target: StaticTarget) -> &mut Self {
        self.static_routes.push(StaticRoute {
            verb,
            path: path.into(),
            target,
        });
        self
    }

    pub fn register_view(&mut self, name: impl Into<String>, view: Arc<dyn View>) -> &mut Self {
        self.views.push((name.into(), view));
        self
    }

    pub fn not_found_renderer(&mut self, renderer: Arc<dyn NotFoundRenderer>) -> &mut Self {
        self.not_found = Some(renderer);
        self
    }

    /// Freeze the registry into an engine.
    pub fn build(self, config: &EngineConfig) -> Result<Engine, RegistryError> {
        let RegistryBuilder {
            binders,
            interceptors,
            routes,
            rpc,
            pushes,
            static_routes,
            views,
            not_found,
        } = self;

        let mut tree = Tree::new();
        for (verb, pattern, def) in routes {
            let action = method_action(&interceptors, verb, &pattern, def)?;
            tracing::debug!(verb = %verb, pattern = %pattern, action = %action.name(), "Registered route");
            tree.insert(verb, &pattern, Action::Method(action))?;
        }

        let mut static_router = StaticRouter::new(config.http.file_cache_size);
        for route in &config.static_routes {
            static_router.add(StaticRoute {
                verb: route.verb.parse()?,
                path: route.path.clone(),
                target: route.target.parse()?,
            });
        }
        if let Some(path) = &config.http.routes_file {
            for route in load_routes_file(path)? {
                static_router.add(route);
            }
        }
        for route in static_routes {
            static_router.add(route);
        }

        let mut rpc_router = RpcRouter::new();
        for (path, def) in rpc {
            let action = method_action(&interceptors, Verb::Post, &path, def)?;
            tracing::debug!(path = %path, action = %action.name(), "Registered RPC candidate");
            rpc_router.add(path, action);
        }

        let mut push_actions = Vec::with_capacity(pushes.len());
        for push in pushes {
            if push.delay.is_zero() {
                return Err(RegistryError::InvalidPushDelay { path: push.path });
            }
            let action = method_action(&interceptors, Verb::Ws, &push.path, push.def)?;
            tracing::debug!(
                path = %push.path,
                action = %action.name(),
                delay_ms = push.delay.as_millis() as u64,
                event = ?push.event,
                "Registered push action"
            );
            push_actions.push(PushAction {
                path: push.path,
                delay: push.delay,
                event: push.event,
                action,
            });
        }

        let mut resolver = ViewResolver::new(config.http.default_view.clone());
        for (name, view) in views {
            resolver.register(name, view);
        }

        tracing::debug!(binders = binders.binder_count(), "Binder registry frozen");

        let settings = DispatchSettings {
            static_cache: config.http.static_cache,
            cache_ttl: Duration::from_secs(config.http.cache_ttl_secs),
        };
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(binders), resolver, settings));
        let sockets = SocketHub::new(dispatcher.clone(), push_actions, config.socket.channel_capacity);
        let responder = not_found.map(Responder::new).unwrap_or_default();

        Ok(Engine::new(
            HttpRouter::new(static_router, tree, config.http.route_cache_size),
            rpc_router,
            dispatcher,
            responder,
            sockets,
            config.rpc.parameter_names_header.clone(),
        ))
    }
}

/// Attach interceptors to `def` and check its source names.
fn method_action(
    interceptors: &InterceptorRegistry,
    verb: Verb,
    pattern: &str,
    def: HandlerDef,
) -> Result<Arc<MethodAction>, RegistryError> {
    let mut seen = HashSet::new();
    for param in def.params.iter().filter(|p| !p.is_context()) {
        if !seen.insert(param.source_name()) {
            return Err(RegistryError::DuplicateSourceName {
                action: def.name(),
                name: param.source_name().to_string(),
            });
        }
    }

    let markers: Vec<&str> = def.markers.iter().map(Marker::name).collect();
    let resolved = interceptors.resolve_for(&def.handler_type, &markers);

    Ok(Arc::new(MethodAction {
        handler_type: def.handler_type,
        method: def.method,
        verb,
        pattern: pattern.to_string(),
        params: def.params,
        markers: def.markers,
        view: def.view,
        interceptors: resolved,
        handler: def.handler,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticRouteConfig;
    use crate::interceptor::AspectKind;
    use crate::param::TypeRef;

    fn noop(handler_type: &str, method: &str) -> HandlerDef {
        HandlerDef::new(handler_type, method, |_call: &mut Call<'_>| Ok(Reply::empty()))
    }

    #[test]
    fn test_duplicate_source_name_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register_route(
            Verb::Get,
            "/users",
            noop("Users", "list")
                .with_param(ParamDescriptor::new("a", TypeRef::int()).with_source("page"))
                .with_param(ParamDescriptor::new("b", TypeRef::int()).with_source("page")),
        );

        assert!(matches!(
            builder.build(&EngineConfig::default()),
            Err(RegistryError::DuplicateSourceName { ref name, .. }) if name == "page"
        ));
    }

    #[test]
    fn test_duplicate_route_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_route(Verb::Get, "/users/{id}", noop("Users", "show"))
            .register_route(Verb::Get, "/users/{key}", noop("Users", "find"));

        assert!(matches!(
            builder.build(&EngineConfig::default()),
            Err(RegistryError::DuplicateRoute(_))
        ));
    }

    #[test]
    fn test_zero_push_delay_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register_push("/clock", Duration::ZERO, PushEvent::Periodic, noop("Clock", "tick"));

        assert!(matches!(
            builder.build(&EngineConfig::default()),
            Err(RegistryError::InvalidPushDelay { .. })
        ));
    }

    #[test]
    fn test_bad_static_route_in_config() {
        let mut config = EngineConfig::default();
        config.static_routes.push(StaticRouteConfig {
            verb: "GET".into(),
            path: "/x".into(),
            target: "somewhere".into(),
        });

        assert!(matches!(
            RegistryBuilder::new().build(&config),
            Err(RegistryError::StaticTarget(_))
        ));
    }

    #[test]
    fn test_interceptors_attached_by_marker() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_interceptor(
                Interceptor::new("Users", "audit", AspectKind::Before, |_call: &mut Call<'_>| {
                    Ok(Reply::empty())
                })
                .only(["Audited"]),
            )
            .register_route(
                Verb::Post,
                "/users",
                noop("Users", "create").with_marker(Marker::new("Audited")),
            )
            .register_route(Verb::Get, "/users", noop("Users", "list"));

        let engine = builder.build(&EngineConfig::default()).unwrap();
        let created = engine.router().route(Verb::Post, "/users");
        let listed = engine.router().route(Verb::Get, "/users");

        assert_eq!(created.as_method().unwrap().interceptors.get(AspectKind::Before).len(), 1);
        assert!(listed.as_method().unwrap().interceptors.is_empty());
    }
}
