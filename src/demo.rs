//! A small sample application served by the binary and driven by the
//! integration tests.
//!
//! ```text
//! GET  /users?limit=&q=        list (limit defaults to 10)
//! GET  /users/{id}             show
//! GET  /users/{id}/profile     profile; only user 1 exists, others are caught as "missing"
//! POST /users                  create (name is required)
//! POST /rpc/calc/add           add(int, int) or add(String, String)
//! WS   /ws/echo                replies {"echo": <message>}
//! WS   /ws/clock               pushes the current time every second
//! ```

use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use crate::action::method::{Call, Model, Reply};
use crate::action::Verb;
use crate::dispatch::error::{HandlerError, NOT_FOUND_EXCEPTION};
use crate::dispatch::view::HTML_VIEW;
use crate::interceptor::{AspectKind, Interceptor};
use crate::param::{Marker, ParamDescriptor, TypeRef, TypeTag};
use crate::registry::{HandlerDef, RegistryBuilder};
use crate::rpc::{RpcMethod, RpcNamespace};
use crate::socket::PushEvent;

pub const USERS: &str = "Users";
pub const CALC: &str = "Calc";

/// Register every sample handler on `builder`.
pub fn register(builder: &mut RegistryBuilder) {
    register_users(builder);
    register_calc(builder);
    register_sockets(builder);
}

fn register_users(builder: &mut RegistryBuilder) {
    builder
        .register_route(
            Verb::Get,
            "/users",
            HandlerDef::new(USERS, "list", |call: &mut Call<'_>| {
                let limit = call.arg(0).as_i64().unwrap_or_default();
                let query = call.arg(1).as_str().map(str::to_string);
                Ok(Reply::json(json!({ "limit": limit, "q": query })))
            })
            .with_param(ParamDescriptor::new("limit", TypeRef::int()).with_default("10"))
            .with_param(ParamDescriptor::new("q", TypeRef::string())),
        )
        .register_route(
            Verb::Get,
            "/users/{id}",
            HandlerDef::new(USERS, "show", |call: &mut Call<'_>| {
                let id = call.arg(0).as_i64().unwrap_or_default();
                Ok(Reply::json(json!({ "id": id })))
            })
            .with_param(ParamDescriptor::new("id", TypeRef::int())),
        )
        .register_route(
            Verb::Get,
            "/users/{id}/profile",
            HandlerDef::new(USERS, "profile", |call: &mut Call<'_>| {
                match call.arg(0).as_i64() {
                    Some(1) => Ok(Reply::json(json!({ "id": 1, "name": "admin" }))),
                    _ => Err(HandlerError::not_found("no such user")),
                }
            })
            .with_param(ParamDescriptor::new("id", TypeRef::int()))
            .with_marker(Marker::new("Lookup")),
        )
        .register_route(
            Verb::Post,
            "/users",
            HandlerDef::new(USERS, "create", |call: &mut Call<'_>| {
                let name = call.arg(0).as_str().unwrap_or_default().to_string();
                Ok(Reply::json(json!({ "created": name })))
            })
            .with_param(ParamDescriptor::new("name", TypeRef::string()).with_marker(Marker::new("Required"))),
        )
        .register_interceptor(
            Interceptor::new(USERS, "missing", AspectKind::Catch, |_call: &mut Call<'_>| {
                Ok(Reply::text("missing"))
            })
            .catching(vec![TypeTag::error(NOT_FOUND_EXCEPTION)])
            .only(["Lookup"])
            .with_view(HTML_VIEW),
        );
}

fn register_calc(builder: &mut RegistryBuilder) {
    let add_ints = HandlerDef::new(CALC, "add", |call: &mut Call<'_>| {
        let a = call.arg(0).as_i64().unwrap_or_default();
        let b = call.arg(1).as_i64().unwrap_or_default();
        Ok(Reply::json(json!(a + b)))
    })
    .with_param(ParamDescriptor::new("a", TypeRef::int()))
    .with_param(ParamDescriptor::new("b", TypeRef::int()));

    let add_strings = HandlerDef::new(CALC, "add", |call: &mut Call<'_>| {
        let a = call.arg(0).as_str().unwrap_or_default();
        let b = call.arg(1).as_str().unwrap_or_default();
        Ok(Reply::json(json!(format!("{a}{b}"))))
    })
    .with_param(ParamDescriptor::new("a", TypeRef::string()))
    .with_param(ParamDescriptor::new("b", TypeRef::string()));

    builder.register_rpc_namespace(
        RpcNamespace::new("calc")
            .method(RpcMethod::new(add_ints).exposed())
            .method(RpcMethod::new(add_strings).exposed()),
    );
}

fn register_sockets(builder: &mut RegistryBuilder) {
    builder
        .register_route(
            Verb::Ws,
            "/echo",
            HandlerDef::new("Echo", "echo", |call: &mut Call<'_>| {
                Ok(Reply::json(json!({ "echo": call.request().body_text() })))
            }),
        )
        .register_push(
            "/clock",
            Duration::from_secs(1),
            PushEvent::Periodic,
            HandlerDef::new("Clock", "tick", |_call: &mut Call<'_>| {
                Ok(Reply::model(Model::Text(Utc::now().to_rfc3339())))
            }),
        );
}
