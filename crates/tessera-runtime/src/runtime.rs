//! Runtime lifecycle.
//!
//! [`Runtime`] owns one instance of each manager, the dispatcher consumer
//! and the frame clock. Everything is created in [`Runtime::start`] and torn
//! down in [`Runtime::shutdown`]; nothing is global.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tessera_annotations::AnnotationEventRouter;
use tessera_connection::{ConnectionManager, Connector};
use tessera_core::store::{AppState, run_dispatcher};
use tessera_core::{Dispatcher, FrameClock};
use tessera_pool::{ContextPlatform, ResourcePool};
use tessera_settings::TesseraSettings;
use tessera_views::ViewSynchronizer;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config;
use crate::errors::RuntimeError;

/// Running set of managers sharing one dispatcher.
pub struct Runtime<P: ContextPlatform> {
    settings: TesseraSettings,
    pool: ResourcePool<P>,
    connection: ConnectionManager,
    views: ViewSynchronizer,
    annotations: AnnotationEventRouter,
    frames: FrameClock,
    state: Arc<RwLock<AppState>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<P: ContextPlatform> std::fmt::Debug for Runtime<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl<P: ContextPlatform> Runtime<P> {
    /// Validate `settings`, build every manager, and start the dispatcher
    /// and frame clock. Dials immediately when an endpoint is configured.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        settings: TesseraSettings,
        platform: P,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, RuntimeError> {
        settings.validate()?;

        let cancel = CancellationToken::new();
        let (dispatcher, rx) = Dispatcher::channel();
        let state = Arc::new(RwLock::new(AppState::default()));
        let frames = FrameClock::new();

        let pool = ResourcePool::new(platform, config::pool_config(&settings.pool));
        let connection =
            ConnectionManager::new(connector, config::connection_config(&settings.connection));
        let views = ViewSynchronizer::new(config::sync_config(&settings.sync), dispatcher.clone());
        let annotations = AnnotationEventRouter::new(dispatcher, Arc::new(frames.clone()));

        let (token, device_id) = config::credentials(&settings.connection);
        connection.set_credentials(token, device_id);
        if let Some(endpoint) = settings.connection.endpoint.as_deref() {
            connection.set_endpoint(endpoint)?;
        } else {
            debug!("no endpoint configured, realtime channel stays idle");
        }

        let tasks = vec![
            tokio::spawn(run_dispatcher(rx, state.clone(), cancel.child_token())),
            frames.drive(
                config::frame_interval(&settings.annotations),
                cancel.child_token(),
            ),
        ];

        info!(
            capacity = pool.capacity(),
            sync_enabled = views.is_enabled(),
            "runtime started"
        );

        Ok(Self {
            settings,
            pool,
            connection,
            views,
            annotations,
            frames,
            state,
            cancel,
            tasks: Mutex::new(tasks),
        })
    }

    /// Settings the runtime was started with.
    pub fn settings(&self) -> &TesseraSettings {
        &self.settings
    }

    /// Rendering-context pool.
    pub fn pool(&self) -> &ResourcePool<P> {
        &self.pool
    }

    /// Realtime channel.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Viewport synchronizer.
    pub fn views(&self) -> &ViewSynchronizer {
        &self.views
    }

    /// Annotation event router.
    pub fn annotations(&self) -> &AnnotationEventRouter {
        &self.annotations
    }

    /// Paint-frame clock driving deferred publishes.
    pub fn frames(&self) -> &FrameClock {
        &self.frames
    }

    /// Snapshot of the shared state.
    pub fn state(&self) -> AppState {
        self.state.read().clone()
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Release every context, close the channel, cancel every timer, and
    /// stop the background tasks. Safe to call more than once.
    pub async fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.views.shutdown();
        self.annotations.shutdown();
        self.connection.clear();
        let released = self.pool.release_all();
        self.cancel.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        info!(released, "runtime stopped");
    }
}

impl<P: ContextPlatform> Drop for Runtime<P> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
