use super::{ProjectContext, ProjectEnvironment, ProjectError};
use crate::events::DeferredInit;
use camino::Utf8Path;

/// Owns the project context together with the host's deferred-init signal.
///
/// This is the handle the host threads through to anything that needs the
/// active project; there is no process-global project.
pub struct ProjectSession {
    context: ProjectContext,
    deferred_init: DeferredInit<ProjectContext>,
}

impl ProjectSession {
    pub fn new(env: ProjectEnvironment) -> Self {
        Self {
            context: ProjectContext::new(env),
            deferred_init: DeferredInit::new(),
        }
    }

    /// Early phase: open the project (see [`ProjectContext::startup`]).
    pub fn open(&mut self, project_file: &Utf8Path) -> Result<(), ProjectError> {
        self.context.startup(project_file)
    }

    /// Late phase: see [`ProjectContext::initialize`].
    pub fn initialize(&mut self) {
        self.context.initialize(&mut self.deferred_init);
    }

    /// Signal that host startup has finished. Only the first call has any effect.
    pub fn complete_deferred_init(&mut self) -> bool {
        self.deferred_init.fire(&mut self.context)
    }

    /// For other components that need to run after host startup.
    pub fn deferred_init(&mut self) -> &mut DeferredInit<ProjectContext> {
        &mut self.deferred_init
    }

    pub fn context(&self) -> &ProjectContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ProjectContext {
        &mut self.context
    }
}
