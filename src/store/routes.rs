// src/store/routes.rs
//! Route history and the in-progress session snapshot

use super::{get_json, keys, set_json, KeyValueStore};
use crate::{clock::Clock, error::Result, habits::Habit, route::Route, session::SessionSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const EXPORT_VERSION: &str = "1.0.0";
pub const PHOTO_PLACEHOLDER: &str = "[PHOTO_REMOVED]";

/// Route persistence on top of a key-value store.
#[derive(Debug, Clone)]
pub struct RouteBook<S> {
    store: S,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub habits_count: usize,
    pub routes_count: usize,
    pub has_tracking: bool,
}

/// Backup document of all habits and routes. Photo references are
/// replaced with [`PHOTO_PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExport {
    pub export_date: DateTime<Utc>,
    pub version: String,
    pub habits: Vec<Habit>,
    pub routes: Vec<Route>,
}

impl<S: KeyValueStore> RouteBook<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All routes, newest first.
    pub fn list(&self) -> Result<Vec<Route>> {
        Ok(get_json(&self.store, keys::ROUTES)?.unwrap_or_default())
    }

    pub fn add(&self, route: &Route) -> Result<()> {
        let mut routes = self.list()?;
        routes.insert(0, route.clone());
        set_json(&self.store, keys::ROUTES, &routes)?;
        tracing::debug!(route_id = %route.id, total = routes.len(), "Route saved");
        Ok(())
    }

    pub fn get(&self, route_id: &str) -> Result<Option<Route>> {
        Ok(self.list()?.into_iter().find(|r| r.id == route_id))
    }

    /// Delete a route; returns whether it existed.
    pub fn delete(&self, route_id: &str) -> Result<bool> {
        let mut routes = self.list()?;
        let before = routes.len();
        routes.retain(|r| r.id != route_id);
        if routes.len() == before {
            return Ok(false);
        }
        set_json(&self.store, keys::ROUTES, &routes)?;
        Ok(true)
    }

    pub fn save_current(&self, snapshot: &SessionSnapshot) -> Result<()> {
        set_json(&self.store, keys::CURRENT_TRACKING, snapshot)
    }

    pub fn load_current(&self) -> Result<Option<SessionSnapshot>> {
        get_json(&self.store, keys::CURRENT_TRACKING)
    }

    pub fn clear_current(&self) -> Result<()> {
        self.store.remove(keys::CURRENT_TRACKING)
    }

    /// Remove habits, routes and the session snapshot.
    pub fn clear_all(&self) -> Result<()> {
        self.store
            .remove_all(&[keys::HABITS, keys::ROUTES, keys::CURRENT_TRACKING])
    }

    pub fn export(&self, clock: &dyn Clock) -> Result<DataExport> {
        let habits: Vec<Habit> = get_json(&self.store, keys::HABITS)?.unwrap_or_default();
        let routes = self
            .list()?
            .into_iter()
            .map(|route| Route {
                coordinates: route
                    .coordinates
                    .iter()
                    .map(|point| point.without_photo(PHOTO_PLACEHOLDER))
                    .collect(),
                ..route
            })
            .collect();

        Ok(DataExport {
            export_date: clock.now_utc(),
            version: EXPORT_VERSION.to_string(),
            habits,
            routes,
        })
    }

    pub fn info(&self) -> Result<StorageInfo> {
        let habits: Vec<serde_json::Value> =
            get_json(&self.store, keys::HABITS)?.unwrap_or_default();
        Ok(StorageInfo {
            habits_count: habits.len(),
            routes_count: self.list()?.len(),
            has_tracking: self.store.get(keys::CURRENT_TRACKING)?.is_some(),
        })
    }
}
