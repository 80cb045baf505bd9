//! The routing table handed to the message bus.

use serde::Serialize;
use stratus_common::context::AppContext;
use stratus_common::error::Result;

/// Publish/subscribe wiring of a single service.
///
/// Fields are declared in alphabetical order so the serialised keys are too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRoute {
    /// Namespace of the service's internal message names, if translated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Messages the service consumes.
    pub receives: Vec<String>,
    /// Service role.
    pub role: String,
    /// Messages the service publishes.
    pub sends: Vec<String>,
}

/// Builds the route of every service, in role order.
pub fn service_routes(ctx: &AppContext) -> Vec<ServiceRoute> {
    ctx.definition
        .services
        .iter()
        .map(|(role, source)| {
            let messages = ctx.services.get(role).map(|config| &config.messages);
            let namespace = source
                .message_translations
                .first()
                .and_then(|translation| translation.internal.split_whitespace().next())
                .map(str::to_string);
            ServiceRoute {
                namespace,
                receives: distinct(messages.map_or(&[][..], |m| &m.receives)),
                role: role.clone(),
                sends: distinct(messages.map_or(&[][..], |m| &m.sends)),
            }
        })
        .collect()
}

/// Serialises the routing table as a compact JSON array.
///
/// # Errors
///
/// Returns a serialization error if JSON encoding fails.
pub fn compile_routing_table(ctx: &AppContext) -> Result<String> {
    Ok(serde_json::to_string(&service_routes(ctx))?)
}

fn distinct(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use stratus_common::app::{ApplicationDefinition, MessageTranslation, ServiceSource};
    use stratus_common::service::ServiceConfig;

    use super::*;

    fn context() -> AppContext {
        let mut definition = ApplicationDefinition {
            name: "todo-app".into(),
            ..ApplicationDefinition::default()
        };
        let mut services = BTreeMap::new();
        let mut add = |role: &str, sends: &[&str], receives: &[&str], translation: Option<&str>| {
            let _ = definition.services.insert(
                role.into(),
                ServiceSource {
                    location: Some(format!("./{role}")),
                    docker_image: None,
                    message_translations: translation
                        .map(|internal| MessageTranslation {
                            public: "users.list".into(),
                            internal: internal.into(),
                        })
                        .into_iter()
                        .collect(),
                },
            );
            let mut config = ServiceConfig::default();
            config.messages.sends = sends.iter().map(|s| (*s).to_string()).collect();
            config.messages.receives = receives.iter().map(|s| (*s).to_string()).collect();
            let _ = services.insert(role.to_string(), config);
        };
        add("users-service", &["mongo.listed"], &["mongo.list"], Some("mongo list"));
        add("todo-service", &["todo.created", "todo.created"], &["todo.create"], None);
        AppContext::from_parts("/apps/todo", definition, services)
    }

    #[test]
    fn routes_are_sorted_and_keys_alphabetical() {
        let table = compile_routing_table(&context()).expect("compile");
        assert_eq!(
            table,
            r#"[{"receives":["todo.create"],"role":"todo-service","sends":["todo.created"]},{"namespace":"mongo","receives":["mongo.list"],"role":"users-service","sends":["mongo.listed"]}]"#
        );
    }

    #[test]
    fn compiling_twice_is_byte_identical() {
        let ctx = context();
        let first = compile_routing_table(&ctx).expect("first");
        let second = compile_routing_table(&ctx.clone()).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_application_yields_empty_array() {
        let ctx = AppContext::from_parts("/x", ApplicationDefinition::default(), BTreeMap::new());
        assert_eq!(compile_routing_table(&ctx).expect("compile"), "[]");
    }
}
