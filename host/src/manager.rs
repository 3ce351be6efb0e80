//! Directory of known instances and the operations that change it.
//!
//! The directory is a cache keyed by lower-cased instance name. It is
//! filled lazily: a lookup that misses re-queries the tool, so instances
//! created outside this process are found too. Entries are dropped on
//! delete or [`evict`](InstanceManager::evict). Nothing keeps the cache in
//! sync with changes made by other processes.
//!
//! The manager is `Send` but not internally synchronized; share one across
//! threads behind a `Mutex`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use localdb_core::{
    InstanceInfo, Request, ServerVersion, instance_key, parse_name_list, parse_versions,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::drivers::DriverSource;
use crate::error::{HostError, Result};
use crate::instance::{Instance, StopMode, query_info};
use crate::runner::{CommandRunner, SqlLocalDb};

/// Result of [`InstanceManager::info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Info {
    /// Every instance name, in the tool's order.
    Names(Vec<String>),
    /// One instance's record.
    Instance(InstanceInfo),
}

/// Entry point for discovering, creating and destroying instances.
pub struct InstanceManager {
    runner: Arc<dyn CommandRunner>,
    drivers: Arc<dyn DriverSource>,
    instances: HashMap<String, Instance>,
}

impl InstanceManager {
    pub fn new(runner: Arc<dyn CommandRunner>, drivers: Arc<dyn DriverSource>) -> Self {
        Self {
            runner,
            drivers,
            instances: HashMap::new(),
        }
    }

    /// Manager backed by the real executable and the configured drivers.
    pub fn from_config(config: &HostConfig) -> Self {
        Self::new(
            Arc::new(SqlLocalDb::from_config(config)),
            config.driver_source(),
        )
    }

    /// Runs a request as-is and returns the raw output. The directory is
    /// not touched.
    pub fn execute(&self, request: &Request) -> Result<String> {
        self.runner.run(request)
    }

    /// Looks up an instance, case-insensitively.
    ///
    /// A miss re-queries the tool's instance list. If the tool does not
    /// know the name either, the instance is created when `create` is set,
    /// otherwise `Ok(None)` is returned.
    pub fn get(&mut self, name: &str, create: bool) -> Result<Option<&mut Instance>> {
        let key = instance_key(name);
        if !self.instances.contains_key(&key) {
            let known = self
                .instance_names()?
                .into_iter()
                .find(|listed| instance_key(listed) == key);
            match known {
                Some(listed) => {
                    let instance =
                        Instance::load(&listed, self.runner.clone(), self.drivers.clone())?;
                    debug!(instance = %listed, "Discovered instance");
                    self.instances.insert(key.clone(), instance);
                }
                None if create => return self.create(name, None, false).map(Some),
                None => return Ok(None),
            }
        }
        Ok(self.instances.get_mut(&key))
    }

    /// Creates an instance, optionally pinned to a version and started,
    /// and caches it.
    ///
    /// Errors from the tool are returned unchanged.
    pub fn create(
        &mut self,
        name: &str,
        version: Option<&str>,
        start: bool,
    ) -> Result<&mut Instance> {
        self.runner.run(&Request::Create {
            name: name.to_string(),
            version: version.map(str::to_string),
            start,
        })?;
        let instance = Instance::load(name, self.runner.clone(), self.drivers.clone())?;
        info!(instance = %name, "Created instance");

        Ok(match self.instances.entry(instance_key(name)) {
            Entry::Occupied(mut slot) => {
                slot.insert(instance);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(instance),
        })
    }

    /// Stops and deletes an instance and drops it from the directory.
    ///
    /// The entry is dropped even when stop or delete fails, since the
    /// instance may be partly gone by then.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::KeyNotFound`] without calling the tool when
    /// neither the directory nor the tool knows `name`.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let Some(instance) = self.get(name, false)? else {
            return Err(HostError::KeyNotFound(name.to_string()));
        };
        let actual = instance.name().to_string();

        let outcome = self
            .runner
            .run(&StopMode::Graceful.request(&actual))
            .and_then(|_| self.runner.run(&Request::Delete { name: actual.clone() }));
        self.instances.remove(&instance_key(name));
        info!(instance = %actual, deleted = outcome.is_ok(), "Removed instance from directory");
        outcome.map(|_| ())
    }

    pub fn start(&self, name: &str) -> Result<()> {
        self.runner.run(&Request::Start {
            name: name.to_string(),
        })?;
        Ok(())
    }

    pub fn stop(&self, name: &str, mode: StopMode) -> Result<()> {
        self.runner.run(&mode.request(name))?;
        Ok(())
    }

    pub fn share(&self, name: &str, shared_name: &str, owner: Option<&str>) -> Result<()> {
        self.runner.run(&Request::Share {
            name: name.to_string(),
            shared_name: shared_name.to_string(),
            owner: owner.map(str::to_string),
        })?;
        Ok(())
    }

    pub fn unshare(&self, shared_name: &str) -> Result<()> {
        self.runner.run(&Request::Unshare {
            shared_name: shared_name.to_string(),
        })?;
        Ok(())
    }

    /// Turns SqlLocalDB API tracing on or off.
    pub fn trace(&self, enable: bool) -> Result<()> {
        self.runner.run(&Request::Trace { enable })?;
        Ok(())
    }

    /// Instance names without `name`, one record with it.
    pub fn info(&self, name: Option<&str>) -> Result<Info> {
        match name {
            Some(name) => self.instance_info(name).map(Info::Instance),
            None => self.instance_names().map(Info::Names),
        }
    }

    pub fn instance_names(&self) -> Result<Vec<String>> {
        let output = self.runner.run(&Request::Info { name: None })?;
        Ok(parse_name_list(&output))
    }

    pub fn instance_info(&self, name: &str) -> Result<InstanceInfo> {
        query_info(self.runner.as_ref(), name)
    }

    /// Installed server versions, in the tool's order.
    pub fn versions(&self) -> Result<Vec<ServerVersion>> {
        let output = self.runner.run(&Request::Versions)?;
        Ok(parse_versions(&output))
    }

    /// Rebuilds the directory from every instance the tool reports.
    ///
    /// Returns the number of cached instances.
    pub fn refresh_all(&mut self) -> Result<usize> {
        let mut instances = HashMap::new();
        for name in self.instance_names()? {
            let instance = Instance::load(&name, self.runner.clone(), self.drivers.clone())?;
            instances.insert(instance_key(&name), instance);
        }
        self.instances = instances;
        debug!(count = self.instances.len(), "Refreshed instance directory");
        Ok(self.instances.len())
    }

    /// Instances currently in the directory, in no particular order.
    pub fn cached(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Drops one directory entry without touching the instance.
    pub fn evict(&mut self, name: &str) -> Option<Instance> {
        let evicted = self.instances.remove(&instance_key(name));
        if evicted.is_some() {
            info!(instance = %name, "Evicted instance from directory");
        }
        evicted
    }
}
