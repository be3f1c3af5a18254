use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::Result;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

pub use paperbot_service::{Service, ServiceId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelState {
    Initialized,
    Running,
}

impl Default for KernelState {
    fn default() -> Self {
        KernelState::Initialized
    }
}

/// Service registry and lifecycle runner for the paperbot node.
#[derive(Default)]
pub struct Kernel {
    services: Vec<Arc<dyn Service>>,
    state: Arc<Mutex<KernelState>>,
    service_states: Arc<Mutex<HashMap<ServiceId, String>>>,
}

static TRACING_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

impl Kernel {
    /// Initialize tracing with a compact, env-configurable console format.
    pub fn init_tracing() {
        let _ = Self::init_tracing_with_file(None);
    }

    /// Same as [`Kernel::init_tracing`], plus a daily-rolling file layer when
    /// a log directory is given. The returned guard must outlive the process
    /// body or buffered lines are lost.
    pub fn init_tracing_with_file(log_dir: Option<&Path>) -> Option<WorkerGuard> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .compact();
        let (filter_layer, handle) = reload::Layer::new(env_filter);
        let registry = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer);

        let guard = match log_dir {
            Some(dir) => {
                let appender = tracing_appender::rolling::daily(dir, "paperbot.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
                let _ = tracing::subscriber::set_global_default(registry.with(file_layer));
                Some(guard)
            }
            None => {
                let _ = tracing::subscriber::set_global_default(registry);
                None
            }
        };

        let _ = TRACING_HANDLE.set(handle);
        guard
    }

    pub fn reload_tracing_filter(level: &str) -> Result<()> {
        let filter = EnvFilter::try_new(level)?;
        if let Some(handle) = TRACING_HANDLE.get() {
            handle.reload(filter)?;
        }
        Ok(())
    }

    /// Register a service for lifecycle management.
    pub fn register_service(&mut self, svc: Arc<dyn Service>) {
        let mut guard = self.service_states.lock().unwrap();
        guard.insert(svc.id().clone(), "Registered".to_string());
        drop(guard);
        self.services.push(svc);
    }

    /// Start all registered services in registration order.
    pub async fn start_all(&self) -> Result<()> {
        info!("paperbot kernel started");
        for svc in &self.services {
            info!(service = %svc.id(), "starting service");
            svc.start().await?;
            let mut guard = self.service_states.lock().unwrap();
            guard.insert(svc.id().clone(), "Running".to_string());
        }
        let mut state_guard = self.state.lock().unwrap();
        *state_guard = KernelState::Running;
        Ok(())
    }

    /// Stop all registered services in reverse order. A service that fails
    /// to stop is logged and skipped so the rest still shut down.
    pub async fn stop_all(&self) -> Result<()> {
        for svc in self.services.iter().rev() {
            info!(service = %svc.id(), "stopping service");
            if let Err(err) = svc.stop().await {
                warn!(service = %svc.id(), ?err, "service stop failed");
            }
            let mut guard = self.service_states.lock().unwrap();
            guard.insert(svc.id().clone(), "Stopped".to_string());
        }
        let mut state_guard = self.state.lock().unwrap();
        *state_guard = KernelState::Initialized;
        Ok(())
    }

    pub async fn state(&self) -> KernelState {
        self.state.lock().unwrap().clone()
    }

    /// Snapshot of known service states.
    pub async fn service_states(&self) -> HashMap<ServiceId, String> {
        self.service_states.lock().unwrap().clone()
    }
}
