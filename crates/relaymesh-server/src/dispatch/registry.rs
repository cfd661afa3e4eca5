use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;

use relaymesh_core::error::{RelayError, Result};

use crate::dispatch::Context;
use crate::exec::Job;

type Binder<S> = Box<dyn Fn(Context, &[u8]) -> Result<Job<S>> + Send + Sync>;

/// One registered command: decodes its argument shape and binds the handler.
pub struct CommandEntry<S> {
    bind: Binder<S>,
    arg_type: &'static str,
}

impl<S> CommandEntry<S> {
    /// Decode `payload` into the registered shape and produce a runnable job.
    pub fn bind(&self, ctx: Context, payload: &[u8]) -> Result<Job<S>> {
        (self.bind)(ctx, payload)
    }

    pub fn arg_type(&self) -> &'static str {
        self.arg_type
    }
}

/// Service name -> active flag.
///
/// Distinguishes a service that was never announced from one that was seen
/// and is currently down.
#[derive(Default)]
pub struct ServiceTable {
    services: DashMap<String, bool>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_active(&self, name: &str) {
        self.services.insert(name.to_string(), true);
    }

    pub fn mark_inactive(&self, name: &str) {
        self.services.insert(name.to_string(), false);
    }

    /// Flip a known service back to active; unknown names stay unknown.
    pub fn reactivate_if_known(&self, name: &str) -> bool {
        match self.services.get_mut(name) {
            Some(mut active) => {
                *active = true;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.services.get(name).map(|v| *v).unwrap_or(false)
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }
}

/// Message id -> command entry, plus the service table.
pub struct CommandRegistry<S> {
    entries: DashMap<String, CommandEntry<S>>,
    services: Arc<ServiceTable>,
}

impl<S: 'static> Default for CommandRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static> CommandRegistry<S> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            services: Arc::new(ServiceTable::new()),
        }
    }

    /// Bind `id` to `handler` taking argument type `T`.
    ///
    /// A second registration under the same id is logged and ignored.
    pub fn register<T, F>(&self, id: &str, handler: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(&mut S, &Context, T) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let msg_id: Arc<str> = Arc::from(id);
        let bind: Binder<S> = Box::new(move |ctx: Context, payload: &[u8]| {
            let arg: T = serde_json::from_slice(payload)
                .map_err(|e| RelayError::Decode(format!("{msg_id}: {e}")))?;
            let handler = Arc::clone(&handler);
            let job: Job<S> = Box::new(move |state: &mut S| handler(state, &ctx, arg));
            Ok(job)
        });
        let entry = CommandEntry {
            bind,
            arg_type: std::any::type_name::<T>(),
        };

        match self.entries.entry(id.to_string()) {
            Entry::Occupied(existing) => {
                tracing::warn!(
                    msg_id = %id,
                    existing = existing.get().arg_type(),
                    "command already registered, keeping first binding"
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Decode and bind in one step. `None` if `id` is not registered.
    pub fn bind(&self, id: &str, ctx: Context, payload: &[u8]) -> Option<Result<Job<S>>> {
        self.entries.get(id).map(|e| e.value().bind(ctx, payload))
    }

    pub fn registered(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn services(&self) -> &ServiceTable {
        &self.services
    }

    pub fn services_handle(&self) -> Arc<ServiceTable> {
        Arc::clone(&self.services)
    }
}
