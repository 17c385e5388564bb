//! A minimal typed container for process-wide dependencies.
//!
//! Long-lived clients (config, connection pools) are registered exactly once
//! during startup and then looked up by type. The container is installed as a
//! whole; registration after installation is impossible, so everything a
//! component injects was constructed before the process started serving.

use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

static GLOBAL: OnceCell<Container> = OnceCell::new();

#[derive(Default)]
pub struct Container {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a value, replacing any previous value of the same type.
    pub fn register<T>(&mut self, value: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        self.entries.insert(TypeId::of::<T>(), value);
    }

    pub fn try_inject<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let entry = self.entries.get(&TypeId::of::<T>())?;
        Some(Arc::downcast(entry.clone()).unwrap())
    }

    /// Installs this container as the process-wide one.
    ///
    /// Panics if a container was already installed.
    pub fn install_global(self) {
        if GLOBAL.set(self).is_err() {
            panic!("global container has already been installed");
        }
    }

    pub fn global() -> &'static Self {
        GLOBAL
            .get()
            .expect("global container has not been installed")
    }
}

/// Looks up a registered value by type, panicking with the type name when it
/// was never registered. Misuse is a startup wiring bug, not a runtime state.
pub fn inject<T>() -> Arc<T>
where
    T: Any + Send + Sync,
{
    match Container::global().try_inject::<T>() {
        Some(value) => value,
        None => panic!("type is not registered: {}", any::type_name::<T>()),
    }
}
