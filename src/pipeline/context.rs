//! Explicitly constructed service context shared by the orchestrator and the
//! submission facade.

use crate::{
    company::{adapters::memory::InMemoryActionLog, ports::ActionLog},
    configuration::{
        ComponentRegistry, ConfigurationResolver, adapters::memory::InMemoryConfigurationRepository,
        ports::ConfigurationRepository,
    },
    datasource::{
        adapters::memory::{InMemoryDataSourceRepository, InMemoryFrameStore},
        ports::{DataSourceRepository, FrameStore},
    },
    task::{
        adapters::memory::InMemoryTaskRepository, ports::TaskRepository,
        services::TaskLifecycleService,
    },
};
use mockable::Clock;
use std::sync::Arc;

/// Ports and services a pipeline run needs.
///
/// Built once at start-up and cloned into every worker.
pub struct PipelineContext<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    /// Task lifecycle service.
    pub tasks: TaskLifecycleService<dyn TaskRepository, C>,
    /// Data source metadata.
    pub datasources: Arc<dyn DataSourceRepository>,
    /// Stored upload tables.
    pub frames: Arc<dyn FrameStore>,
    /// Company configuration resolver.
    pub configurations: ConfigurationResolver<dyn ConfigurationRepository, C>,
    /// Customer action audit log.
    pub actions: Arc<dyn ActionLog>,
    /// Time source.
    pub clock: Arc<C>,
}

impl<C> Clone for PipelineContext<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
            datasources: Arc::clone(&self.datasources),
            frames: Arc::clone(&self.frames),
            configurations: self.configurations.clone(),
            actions: Arc::clone(&self.actions),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Storage ports wired into a [`PipelineContext`].
pub struct PipelinePorts {
    /// Task storage.
    pub tasks: Arc<dyn TaskRepository>,
    /// Data source metadata storage.
    pub datasources: Arc<dyn DataSourceRepository>,
    /// Upload table storage.
    pub frames: Arc<dyn FrameStore>,
    /// Configuration storage.
    pub configurations: Arc<dyn ConfigurationRepository>,
    /// Customer action log.
    pub actions: Arc<dyn ActionLog>,
}

impl PipelinePorts {
    /// Returns in-memory adapters for every port.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            tasks: Arc::new(InMemoryTaskRepository::new()),
            datasources: Arc::new(InMemoryDataSourceRepository::new()),
            frames: Arc::new(InMemoryFrameStore::new()),
            configurations: Arc::new(InMemoryConfigurationRepository::new()),
            actions: Arc::new(InMemoryActionLog::new()),
        }
    }

    /// Replaces the upload table store.
    #[must_use]
    pub fn with_frame_store(mut self, frames: Arc<dyn FrameStore>) -> Self {
        self.frames = frames;
        self
    }
}

impl<C> PipelineContext<C>
where
    C: Clock + Send + Sync + ?Sized,
{
    /// Wires `ports` and `registry` into a context.
    #[must_use]
    pub fn new(ports: PipelinePorts, registry: ComponentRegistry, clock: Arc<C>) -> Self {
        let PipelinePorts {
            tasks,
            datasources,
            frames,
            configurations,
            actions,
        } = ports;
        Self {
            tasks: TaskLifecycleService::new(tasks, Arc::clone(&clock)),
            datasources,
            frames,
            configurations: ConfigurationResolver::new(
                configurations,
                Arc::new(registry),
                Arc::clone(&clock),
            ),
            actions,
            clock,
        }
    }

    /// Creates a context over in-memory adapters and the built-in components.
    #[must_use]
    pub fn in_memory(clock: Arc<C>) -> Self {
        Self::new(
            PipelinePorts::in_memory(),
            ComponentRegistry::with_defaults(),
            clock,
        )
    }

    /// Sets the horizon of upload-triggered forecasts when a configuration
    /// names none.
    #[must_use]
    pub fn with_forecast_horizon(mut self, days: u32) -> Self {
        self.configurations = self.configurations.with_default_horizon(days);
        self
    }
}
