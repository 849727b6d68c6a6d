//! Runtime assembly.
//!
//! Wires the validator, store, authenticator chain, reconciler and
//! control loop together from a [`ProvostConfig`] and a caller-supplied
//! connector. Construction order follows dependency order; shutdown runs
//! in reverse, stopping the control loop before anything it depends on
//! goes away.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use provost_config::ProvostConfig;
use provost_connector::{AvatarReader, Connector, UriAvatarReader};
use provost_policy::{Store, UserId, Validator};
use provost_reconcile::{Reconciler, StoreDrivenReconciler};
use provost_userauth::{
    CredentialCache, HttpRestVerifier, RestVerifier, UserAuthChecker, UserAuthError,
    UserAuthResult,
};

use crate::error::{ProvostError, ProvostResult};

/// Delegates REST credential verification to the homeserver itself,
/// through the connector, ignoring the policy-supplied endpoint.
///
/// Used when a deployment wants `rest-with-cache-fallback` to mean "ask
/// the live server" instead of a third-party endpoint.
pub struct ConnectorRestVerifier {
    connector: Arc<dyn Connector>,
}

impl ConnectorRestVerifier {
    /// Create a verifier over the given connector.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl RestVerifier for ConnectorRestVerifier {
    async fn verify(
        &self,
        _endpoint: &str,
        user_id: &UserId,
        password: &str,
    ) -> UserAuthResult<bool> {
        self.connector
            .verify_credentials(user_id, password)
            .await
            .map_err(|e| {
                if e.is_unreachable() {
                    UserAuthError::RemoteUnavailable(e.to_string())
                } else {
                    UserAuthError::UnexpectedResponse(e.to_string())
                }
            })
    }
}

/// Builder for the [`Provost`] runtime.
pub struct ProvostBuilder {
    config: ProvostConfig,
    connector: Option<Arc<dyn Connector>>,
    avatar_reader: Option<Arc<dyn AvatarReader>>,
    rest_verifier: Option<Arc<dyn RestVerifier>>,
}

impl ProvostBuilder {
    /// Start building from a validated configuration.
    pub fn new(config: ProvostConfig) -> Self {
        Self {
            config,
            connector: None,
            avatar_reader: None,
            rest_verifier: None,
        }
    }

    /// Supply the homeserver connector (required).
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Supply a custom avatar reader. Defaults to [`UriAvatarReader`].
    #[must_use]
    pub fn avatar_reader(mut self, reader: Arc<dyn AvatarReader>) -> Self {
        self.avatar_reader = Some(reader);
        self
    }

    /// Supply a custom REST verifier. Defaults to an
    /// [`HttpRestVerifier`] with the configured remote timeout.
    #[must_use]
    pub fn rest_verifier(mut self, verifier: Arc<dyn RestVerifier>) -> Self {
        self.rest_verifier = Some(verifier);
        self
    }

    /// Delegate REST credential verification to the homeserver through
    /// the connector instead of the policy-supplied endpoint.
    ///
    /// Call after [`connector`](Self::connector).
    pub fn delegate_rest_to_connector(mut self) -> ProvostResult<Self> {
        let connector = self
            .connector
            .as_ref()
            .ok_or(ProvostError::MissingComponent("connector"))?;
        self.rest_verifier = Some(Arc::new(ConnectorRestVerifier::new(Arc::clone(connector))));
        Ok(self)
    }

    /// Assemble the runtime.
    pub fn build(self) -> ProvostResult<Provost> {
        let connector = self
            .connector
            .ok_or(ProvostError::MissingComponent("connector"))?;

        let validator = Validator::new(self.config.homeserver.domain.clone());
        let store = Arc::new(Store::new(validator));

        let cache = Arc::new(CredentialCache::new(self.config.userauth.cache_capacity));
        let rest_verifier = self.rest_verifier.unwrap_or_else(|| {
            Arc::new(HttpRestVerifier::new(self.config.userauth.remote_timeout()))
        });
        let userauth = Arc::new(UserAuthChecker::standard(rest_verifier, cache)?);

        let avatar_reader = self
            .avatar_reader
            .unwrap_or_else(|| Arc::new(UriAvatarReader::new()));
        let reconciler = Arc::new(Reconciler::new(connector, avatar_reader));
        let reconciliation = StoreDrivenReconciler::new(
            Arc::clone(&store),
            reconciler,
            self.config.reconciliation.retry_interval(),
        );

        Ok(Provost {
            config: self.config,
            store,
            userauth,
            reconciliation,
        })
    }
}

/// The assembled Provost runtime.
///
/// Owns the policy store, the authenticator chain and the reconciliation
/// control loop. Gateway interceptors hold clones of
/// [`store`](Self::store) and [`userauth`](Self::userauth); the policy
/// provider pushes documents through [`store`](Self::store).
pub struct Provost {
    config: ProvostConfig,
    store: Arc<Store>,
    userauth: Arc<UserAuthChecker>,
    reconciliation: StoreDrivenReconciler,
}

impl Provost {
    /// Start building a runtime from configuration.
    pub fn builder(config: ProvostConfig) -> ProvostBuilder {
        ProvostBuilder::new(config)
    }

    /// The policy store.
    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    /// The authenticator chain.
    pub fn userauth(&self) -> Arc<UserAuthChecker> {
        Arc::clone(&self.userauth)
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ProvostConfig {
        &self.config
    }

    /// Start the reconciliation control loop.
    pub fn start(&self) -> ProvostResult<()> {
        self.reconciliation.start()?;
        info!(domain = %self.config.homeserver.domain, "provost started");
        Ok(())
    }

    /// Stop cooperatively: the control loop first, everything else after.
    pub async fn shutdown(&self) {
        self.reconciliation.stop().await;
        info!("provost stopped");
    }
}
