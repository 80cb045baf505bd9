//! Layered compilation of service environments and their wire encoding.
//!
//! Layers, lowest precedence first:
//!
//! 1. identity (`ROLE`)
//! 2. dependency-injected variables, application scope then service scope
//! 3. declared variables for the active tier
//! 4. secrets
//! 5. endpoints
//!
//! Later layers overwrite earlier ones on key collision.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratus_common::context::{AppContext, Secrets};
use stratus_common::dependency::Lifecycle;
use stratus_common::error::{Result, StratusError};
use stratus_common::mode::BuildMode;

use crate::dependency;
use crate::endpoints::ServiceEndpoints;

/// Environment mapping of a single container.
pub type EnvMap = BTreeMap<String, String>;

/// Compiles the environment of a service for a local run.
///
/// `lookup` resolves declared secrets from the operator's environment.
/// Secrets it cannot resolve are skipped.
///
/// # Errors
///
/// Returns a resolution error for an unknown role.
pub fn compile_local_env(
    ctx: &AppContext,
    role: &str,
    mode: BuildMode,
    endpoints: &ServiceEndpoints,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<EnvMap> {
    let config = ctx.service(role)?;
    let lifecycle = mode.lifecycle();

    let mut env = identity(role);
    for dep in dependency::app_dependencies(ctx, lifecycle)
        .iter()
        .chain(&dependency::service_dependencies(ctx, role, lifecycle))
    {
        env.extend(dep.service_env_variables());
    }
    env.extend(config.local.environment.for_tier(mode.environment));
    for key in &config.local.secrets {
        match lookup(key) {
            Some(value) => {
                let _ = env.insert(key.clone(), value);
            }
            None => tracing::warn!(role, secret = %key, "secret not set in the environment, skipping"),
        }
    }
    env.extend(endpoints.env_for(role));
    Ok(env)
}

/// Compiles the environment of a service for a deploy.
///
/// # Errors
///
/// Returns [`StratusError::SecretMissing`] if a declared secret, or a
/// secret a dependency needs, is absent from `secrets`.
pub fn compile_deploy_env(
    ctx: &AppContext,
    role: &str,
    endpoints: &ServiceEndpoints,
    secrets: &Secrets,
) -> Result<EnvMap> {
    let config = ctx.service(role)?;

    let mut env = identity(role);
    for dep in dependency::app_dependencies(ctx, Lifecycle::Remote)
        .iter()
        .chain(&dependency::service_dependencies(ctx, role, Lifecycle::Remote))
    {
        env.extend(dep.deployment_service_env_variables(secrets)?);
    }
    env.extend(config.remote.environment.clone());
    for key in &config.remote.secrets {
        let value = secrets
            .get(key)
            .ok_or_else(|| StratusError::SecretMissing { key: key.clone() })?;
        let _ = env.insert(key.clone(), value.clone());
    }
    env.extend(endpoints.env_for(role));
    Ok(env)
}

fn identity(role: &str) -> EnvMap {
    BTreeMap::from([("ROLE".to_string(), role.to_string())])
}

#[derive(Debug, Serialize, Deserialize)]
struct EnvPair {
    name: String,
    value: String,
}

/// Encodes an environment for the infra tool: a JSON array of
/// `{name, value}` objects sorted by name, itself encoded as a JSON string.
///
/// # Errors
///
/// Returns a serialization error if JSON encoding fails.
pub fn encode_env_var_string(env: &EnvMap) -> Result<String> {
    let pairs: Vec<EnvPair> = env
        .iter()
        .map(|(name, value)| EnvPair {
            name: name.clone(),
            value: value.clone(),
        })
        .collect();
    let inner = serde_json::to_string(&pairs)?;
    Ok(serde_json::to_string(&inner)?)
}

/// Inverse of [`encode_env_var_string`].
///
/// # Errors
///
/// Returns a serialization error if either decoding pass fails.
pub fn decode_env_var_string(encoded: &str) -> Result<EnvMap> {
    let inner: String = serde_json::from_str(encoded)?;
    let pairs: Vec<EnvPair> = serde_json::from_str(&inner)?;
    Ok(pairs.into_iter().map(|pair| (pair.name, pair.value)).collect())
}

#[cfg(test)]
mod tests {
    use stratus_common::app::{ApplicationDefinition, ServiceSource};
    use stratus_common::dependency::DependencyDescriptor;
    use stratus_common::service::ServiceConfig;

    use super::*;

    fn ctx(web: ServiceConfig) -> AppContext {
        let mut definition = ApplicationDefinition {
            name: "todo-app".into(),
            ..ApplicationDefinition::default()
        };
        let _ = definition.services.insert(
            "web".into(),
            ServiceSource {
                location: Some("./web".into()),
                ..ServiceSource::default()
            },
        );
        definition.local.dependencies.push(DependencyDescriptor::new("exocom", "0.26.1"));
        definition.remote.dependencies.push(DependencyDescriptor::new("exocom", "0.26.1"));
        let services = BTreeMap::from([("web".to_string(), web)]);
        AppContext::from_parts("/apps/todo", definition, services)
    }

    #[test]
    fn local_env_layers_in_order() {
        let mut web = ServiceConfig::default();
        let _ = web.local.environment.default.insert("EXOCOM_HOST".into(), "overridden".into());
        let _ = web.local.environment.development.insert("DEBUG".into(), "1".into());
        let _ = web.local.environment.default.insert("API_KEY".into(), "declared".into());
        web.local.secrets = vec!["API_KEY".into(), "UNSET".into()];
        let ctx = ctx(web);
        let mode = BuildMode::local_development();
        let endpoints = ServiceEndpoints::new(&ctx, mode);

        let env = compile_local_env(&ctx, "web", mode, &endpoints, |key| {
            (key == "API_KEY").then(|| "from-shell".to_string())
        })
        .expect("env");
        assert_eq!(env["ROLE"], "web");
        assert_eq!(env["EXOCOM_HOST"], "overridden");
        assert_eq!(env["DEBUG"], "1");
        assert_eq!(env["API_KEY"], "from-shell");
        assert!(!env.contains_key("UNSET"));
    }

    #[test]
    fn deploy_secret_overrides_declared_value() {
        let mut web = ServiceConfig::default();
        let _ = web.remote.environment.insert("K".into(), "a".into());
        web.remote.secrets = vec!["K".into()];
        let ctx = ctx(web);
        let endpoints = ServiceEndpoints::new(&ctx, BuildMode::deploy_production());
        let secrets = Secrets::from([("K".to_string(), "b".to_string())]);

        let env = compile_deploy_env(&ctx, "web", &endpoints, &secrets).expect("env");
        assert_eq!(env["K"], "b");
        assert_eq!(env["EXOCOM_HOST"], "exocom.todo-app.local");
    }

    #[test]
    fn deploy_fails_on_missing_secret() {
        let mut web = ServiceConfig::default();
        web.remote.secrets = vec!["K".into()];
        let ctx = ctx(web);
        let endpoints = ServiceEndpoints::new(&ctx, BuildMode::deploy_production());
        let err = compile_deploy_env(&ctx, "web", &endpoints, &Secrets::new()).unwrap_err();
        assert!(matches!(err, StratusError::SecretMissing { ref key } if key == "K"));
    }

    #[test]
    fn encoding_is_double_json() {
        let env = EnvMap::from([
            ("ROLE".to_string(), "web".to_string()),
            ("A".to_string(), "x\"y".to_string()),
        ]);
        let encoded = encode_env_var_string(&env).expect("encode");
        assert_eq!(
            encoded,
            r#""[{\"name\":\"A\",\"value\":\"x\\\"y\"},{\"name\":\"ROLE\",\"value\":\"web\"}]""#
        );
        assert_eq!(decode_env_var_string(&encoded).expect("decode"), env);
    }

    #[test]
    fn empty_and_single_entry_round_trip() {
        let empty = EnvMap::new();
        let encoded = encode_env_var_string(&empty).expect("encode");
        assert_eq!(encoded, r#""[]""#);
        assert_eq!(decode_env_var_string(&encoded).expect("decode"), empty);

        let single = EnvMap::from([("ROLE".to_string(), "web".to_string())]);
        let encoded = encode_env_var_string(&single).expect("encode");
        assert_eq!(decode_env_var_string(&encoded).expect("decode"), single);
    }
}
