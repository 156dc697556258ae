//! The origin the server hosts: the script route, the worker host and the
//! page the tools fetch through.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use swcache_client::{
    ClientId, HttpNetwork, Network, NetworkConfig, Registrar, Registration, RegistrationError, ScriptSource,
    ServiceWorkerContainer, WorkerHost,
};
use swcache_core::{AppConfig, CacheDb, Error, ServedScript, WorkerConfig, WorkerScript};
use tokio::sync::RwLock;
use url::Url;

/// Serves the current worker script at its configured path.
///
/// The constants can be swapped at runtime, which is how a deploy with a new
/// version token is simulated.
#[derive(Debug)]
pub struct ScriptRoute {
    script: RwLock<WorkerScript>,
}

impl ScriptRoute {
    pub fn new(script: WorkerScript) -> Self {
        Self { script: RwLock::new(script) }
    }

    pub async fn config(&self) -> WorkerConfig {
        self.script.read().await.config().clone()
    }

    pub async fn serve(&self, path: &str) -> Result<Option<ServedScript>, Error> {
        self.script.read().await.serve(path)
    }

    /// Swap in new constants. Returns the ones replaced.
    pub async fn replace(&self, config: WorkerConfig) -> WorkerConfig {
        let mut script = self.script.write().await;
        let previous = script.config().clone();
        *script = WorkerScript::new(script.path().to_string(), config);
        previous
    }
}

#[async_trait]
impl ScriptSource for ScriptRoute {
    async fn load(&self, script_url: &Url) -> Result<Bytes, RegistrationError> {
        let script = self.script.read().await;
        script.load(script_url).await
    }
}

/// Everything the tools need, shared between handler clones.
#[derive(Clone)]
pub struct Site {
    config: Arc<AppConfig>,
    scripts: Arc<ScriptRoute>,
    host: Arc<WorkerHost>,
    page: ClientId,
}

impl Site {
    /// Open the store, build the network from config and load the page.
    pub async fn open(config: AppConfig) -> Result<Self, Error> {
        let storage = CacheDb::open(&config.db_path).await?;
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let network = HttpNetwork::new(NetworkConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            origin: Some(origin),
            ..Default::default()
        })?;
        Self::with_network(config, storage, Arc::new(network)).await
    }

    /// Build the site on an existing store and network, then run the page's
    /// load handler.
    ///
    /// The load handler is awaited: on return the worker is activated and
    /// controls the page. A failed registration is logged by the registrar
    /// and the site comes up uncontrolled.
    pub async fn with_network(config: AppConfig, storage: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        let page_url = origin
            .join(&config.scope)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.scope)))?;

        let scripts = Arc::new(ScriptRoute::new(WorkerScript::new(config.script_path.clone(), config.worker())));
        let host = Arc::new(WorkerHost::new(origin, storage, network, scripts.clone()));
        let page = host.open_client(page_url).await;

        let site = Self { config: Arc::new(config), scripts, host, page };

        let registrar = Registrar::new(site.config.script_path.clone(), site.config.scope.clone());
        registrar.on_load(site.container()).await;

        Ok(site)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scripts(&self) -> &ScriptRoute {
        &self.scripts
    }

    pub fn host(&self) -> &WorkerHost {
        &self.host
    }

    /// The page every tool request is issued from.
    pub fn page(&self) -> ClientId {
        self.page
    }

    /// The worker container, absent when worker support is switched off.
    pub fn container(&self) -> Option<&dyn ServiceWorkerContainer> {
        if self.config.service_workers { Some(&*self.host as &dyn ServiceWorkerContainer) } else { None }
    }

    /// Re-run the update check against the current script.
    pub async fn update(&self) -> Result<Registration, Error> {
        let container = self
            .container()
            .ok_or_else(|| Error::NoWorker("worker support is disabled".into()))?;
        let registration = container.register(&self.config.script_path, &self.config.scope).await?;
        Ok(registration)
    }

    /// Let background store writes finish.
    pub async fn shutdown(&self) {
        let settled = self.host.shutdown().await;
        tracing::debug!(settled, "pending worker tasks settled");
    }
}
