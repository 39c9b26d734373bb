use crate::ecs::{Stage, SystemDescriptor, SystemHandle, SystemRegistrationError, World, WorldResult};
use crate::time::StepContext;
use std::collections::HashMap;

/// Boxed system callback.
pub type SystemFn = Box<dyn FnMut(&mut World, &StepContext) -> WorldResult<()>>;

#[derive(Default)]
pub(crate) struct SystemRegistry {
    systems: Vec<RegisteredSystem>,
    name_lookup: HashMap<String, SystemHandle>,
}

impl SystemRegistry {
    pub fn register(
        &mut self,
        descriptor: SystemDescriptor,
        run: SystemFn,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        let name_key = descriptor.name().to_string();
        if let Some(existing) = self.name_lookup.get(&name_key) {
            return Err(SystemRegistrationError::DuplicateName {
                name: name_key,
                existing: *existing,
            });
        }

        let handle = SystemHandle::new(self.systems.len() as u32);
        tracing::debug!(system = %name_key, stage = %descriptor.stage(), handle = %handle, "registered system");
        self.name_lookup.insert(name_key, handle);
        self.systems.push(RegisteredSystem {
            handle,
            descriptor,
            run,
        });

        Ok(handle)
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems
            .get(handle.index() as usize)
            .map(|system| &system.descriptor)
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.name_lookup.get(name).copied()
    }

    /// Systems of `stage` in registration order.
    pub fn stage_mut(&mut self, stage: Stage) -> impl Iterator<Item = &mut RegisteredSystem> {
        self.systems
            .iter_mut()
            .filter(move |system| system.descriptor.stage() == stage)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }
}

pub(crate) struct RegisteredSystem {
    pub handle: SystemHandle,
    pub descriptor: SystemDescriptor,
    pub run: SystemFn,
}
