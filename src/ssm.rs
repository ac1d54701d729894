//! Parameter-store artifact fetcher.
//!
//! The wire client is a capability interface: the control-plane wiring
//! injects a concrete implementation, and any stub honouring the contract
//! is a valid collaborator. This module owns the validation layer on top
//! of the raw request: a fetch fails unless every requested name resolves.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::credentials::IamRoleCredentials;
use crate::error::{Error, Result};

/// Raw result of a parameter-store request.
#[derive(Debug, Clone, Default)]
pub struct ParameterResults {
    /// Name → value for every parameter that resolved.
    pub parameters: HashMap<String, String>,
    /// Names the store did not recognize.
    pub invalid_names: Vec<String>,
}

/// A parameter-store client bound to one region and credential set.
#[async_trait]
pub trait SsmClient: Send + Sync {
    /// Fetches the named parameters in a single request.
    async fn get_parameters(&self, names: &[String]) -> Result<ParameterResults>;
}

/// Factory for parameter-store clients.
///
/// Credentials are bound per call and not retained.
pub trait SsmClientCreator: Send + Sync {
    /// Builds a client for `region` with `credentials`.
    fn client(&self, region: &str, credentials: &IamRoleCredentials) -> Arc<dyn SsmClient>;
}

/// Fetches `names` and returns a complete name → value mapping.
///
/// Fails `ParameterNotFound` listing every name the store did not
/// recognize; no partial mapping is returned in that case.
pub async fn fetch_parameters(
    names: &[String],
    client: &dyn SsmClient,
) -> Result<HashMap<String, String>> {
    let results = client.get_parameters(names).await?;

    if !results.invalid_names.is_empty() {
        return Err(Error::ParameterNotFound {
            names: results.invalid_names,
        });
    }

    debug!(count = results.parameters.len(), "fetched parameters");
    Ok(results.parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSsmClient {
        known: HashMap<String, String>,
    }

    #[async_trait]
    impl SsmClient for StubSsmClient {
        async fn get_parameters(&self, names: &[String]) -> Result<ParameterResults> {
            let mut results = ParameterResults::default();
            for name in names {
                match self.known.get(name) {
                    Some(value) => {
                        results.parameters.insert(name.clone(), value.clone());
                    }
                    None => results.invalid_names.push(name.clone()),
                }
            }
            Ok(results)
        }
    }

    #[tokio::test]
    async fn test_fetch_parameters() {
        let client = StubSsmClient {
            known: HashMap::from([("param".to_string(), "value".to_string())]),
        };

        let params = fetch_parameters(&["param".to_string()], &client)
            .await
            .unwrap();
        assert_eq!(params["param"], "value");
    }

    #[tokio::test]
    async fn test_fetch_parameters_missing_name() {
        let client = StubSsmClient {
            known: HashMap::new(),
        };

        let err = fetch_parameters(&["absent".to_string()], &client)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ParameterNotFound { names } if names == vec!["absent"]));
    }
}
