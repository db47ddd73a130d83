//! Namespace-tagged services and the RPC paths they expose.

use crate::registry::HandlerDef;

/// One method of a namespace.
pub struct RpcMethod {
    pub def: HandlerDef,
    /// Explicitly exposed, independent of `expose_all`.
    pub exposed: bool,
    /// Path name used instead of the method name.
    pub alias: Option<String>,
}

impl RpcMethod {
    pub fn new(def: HandlerDef) -> Self {
        Self {
            def,
            exposed: false,
            alias: None,
        }
    }

    pub fn exposed(mut self) -> Self {
        self.exposed = true;
        self
    }

    pub fn exposed_as(mut self, alias: impl Into<String>) -> Self {
        self.exposed = true;
        self.alias = Some(alias.into());
        self
    }

    pub fn path_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.def.method)
    }
}

pub struct RpcNamespace {
    pub name: String,
    pub expose_all: bool,
    pub methods: Vec<RpcMethod>,
}

impl RpcNamespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expose_all: false,
            methods: Vec::new(),
        }
    }

    pub fn expose_all(mut self) -> Self {
        self.expose_all = true;
        self
    }

    pub fn method(mut self, method: RpcMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// `/namespace/name` for every method reachable over RPC.
    pub fn into_candidates(self) -> Vec<(String, HandlerDef)> {
        let namespace = self.name.trim_matches('/').to_string();
        let expose_all = self.expose_all;

        self.methods
            .into_iter()
            .filter(|m| expose_all || m.exposed)
            .map(|m| (format!("/{}/{}", namespace, m.path_name()), m.def))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::method::{Call, Reply};

    fn def(method: &str) -> HandlerDef {
        HandlerDef::new("Calc", method, |_call: &mut Call<'_>| Ok(Reply::empty()))
    }

    #[test]
    fn test_exposed_methods_only() {
        let paths: Vec<String> = RpcNamespace::new("calc")
            .method(RpcMethod::new(def("add")).exposed())
            .method(RpcMethod::new(def("internal")))
            .method(RpcMethod::new(def("multiply")).exposed_as("mul"))
            .into_candidates()
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec!["/calc/add", "/calc/mul"]);
    }

    #[test]
    fn test_expose_all() {
        let candidates = RpcNamespace::new("/calc/")
            .expose_all()
            .method(RpcMethod::new(def("add")))
            .method(RpcMethod::new(def("sub")))
            .into_candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].0, "/calc/sub");
    }
}
