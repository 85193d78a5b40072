// src/tracker.rs
//! Tracking coordination: provider subscription, session and persistence

use crate::{
    clock::Clock,
    error::{Result, TrackerError},
    geo::GeoPoint,
    provider::{LocationProvider, Subscription},
    route::Route,
    session::{TrackingSession, TrackingStatus},
    store::{keys, KeyValueStore, RouteBook},
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::{sync::mpsc, task::JoinHandle};

/// Owns one tracking session and the subscription feeding it.
pub struct Tracker<P, S> {
    provider: P,
    session: Arc<Mutex<TrackingSession>>,
    routes: RouteBook<S>,
    clock: Arc<dyn Clock>,
    subscription: Option<Subscription>,
    pump: Option<JoinHandle<()>>,
}

impl<P, S> Tracker<P, S>
where
    P: LocationProvider,
    S: KeyValueStore + Clone + 'static,
{
    pub fn new(provider: P, store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            session: Arc::new(Mutex::new(TrackingSession::new())),
            routes: RouteBook::new(store),
            clock,
            subscription: None,
            pump: None,
        }
    }

    pub fn routes(&self) -> &RouteBook<S> {
        &self.routes
    }

    fn session(&self) -> Result<MutexGuard<'_, TrackingSession>> {
        self.session
            .lock()
            .map_err(|_| TrackerError::Other("Tracking session lock poisoned".to_string()))
    }

    pub fn is_tracking(&self) -> bool {
        self.session().map(|s| s.is_active()).unwrap_or(false)
    }

    pub fn status(&self) -> Result<TrackingStatus> {
        Ok(self.session()?.status(self.clock.now()))
    }

    /// Begin a new recording. The session stays idle if the provider
    /// refuses or cannot be subscribed to.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_tracking() {
            return Err(TrackerError::AlreadyTracking);
        }

        if !self.provider.request_capability().await {
            return Err(TrackerError::CapabilityDenied(
                "Location permission not granted".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.provider.subscribe(tx).await?;

        {
            let mut session = self.session()?;
            session.start(self.clock.now())?;
            if let Some(snapshot) = session.snapshot() {
                if let Err(e) = self.routes.save_current(&snapshot) {
                    tracing::warn!(error = %e, "Failed to persist tracking snapshot");
                }
            }
        }

        self.attach(subscription, rx);
        tracing::info!("GPS tracking started");
        Ok(())
    }

    /// Pick up a session that was active when the app last exited.
    /// Returns whether one was restored.
    pub async fn resume(&mut self) -> Result<bool> {
        if self.is_tracking() {
            return Err(TrackerError::AlreadyTracking);
        }

        // Read failures propagate; only undecodable or invalid contents are dropped.
        if self.routes.store().get(keys::CURRENT_TRACKING)?.is_none() {
            return Ok(false);
        }

        let restored = match self
            .routes
            .load_current()
            .and_then(|snapshot| snapshot.map(TrackingSession::restore).transpose())
        {
            Ok(Some(restored)) => restored,
            Ok(None) => return Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable tracking snapshot");
                self.routes.clear_current()?;
                return Ok(false);
            }
        };

        if !self.provider.request_capability().await {
            return Err(TrackerError::CapabilityDenied(
                "Location permission not granted".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.provider.subscribe(tx).await?;

        tracing::info!(
            samples = restored.samples().len(),
            annotations = restored.annotations().len(),
            "Resumed tracking session"
        );
        *self.session()? = restored;
        self.attach(subscription, rx);
        Ok(true)
    }

    /// Apply delivered samples one at a time and keep the snapshot current.
    fn attach(&mut self, subscription: Subscription, mut rx: mpsc::UnboundedReceiver<GeoPoint>) {
        let session = Arc::clone(&self.session);
        let routes = self.routes.clone();

        let pump = tokio::spawn(async move {
            while let Some(point) = rx.recv().await {
                let mut guard = match session.lock() {
                    Ok(guard) => guard,
                    Err(_) => break,
                };
                match guard.append_sample(point) {
                    Ok(total_km) => {
                        tracing::debug!(total_km, samples = guard.samples().len(), "Sample applied");
                        if let Some(snapshot) = guard.snapshot() {
                            if let Err(e) = routes.save_current(&snapshot) {
                                tracing::warn!(error = %e, "Failed to persist tracking snapshot");
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Dropping sample"),
                }
            }
        });

        self.subscription = Some(subscription);
        self.pump = Some(pump);
    }

    /// Stop delivery and wait for samples already queued to be applied.
    async fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                tracing::warn!(error = %e, "Sample pump ended abnormally");
            }
        }
    }

    /// Annotate the current position with a note and/or photo reference.
    pub async fn add_note(&mut self, note: Option<String>, photo_ref: Option<String>) -> Result<GeoPoint> {
        if !self.is_tracking() {
            return Err(TrackerError::NotTracking);
        }

        let fix = self.provider.current_point().await?;
        let annotation = fix.with_note(note, photo_ref);

        {
            let mut session = self.session()?;
            session.append_annotation(annotation.clone())?;
            if let Some(snapshot) = session.snapshot() {
                self.routes.save_current(&snapshot)?;
            }
        }

        tracing::info!(point_id = annotation.id(), "Note point added");
        Ok(annotation)
    }

    /// Finish the recording. The route is returned unsaved; the snapshot
    /// stays until [`Tracker::save_route`] succeeds.
    pub async fn stop(&mut self) -> Result<Route> {
        if !self.is_tracking() {
            return Err(TrackerError::NotTracking);
        }

        self.detach().await;
        let route = self.session()?.stop(self.clock.now())?;
        tracing::info!(
            route_id = %route.id,
            distance_km = route.distance_km,
            duration = %route.duration,
            "GPS tracking stopped"
        );
        Ok(route)
    }

    /// Persist a finished route. On failure the caller still owns `route`
    /// and may retry.
    pub fn save_route(&self, route: &Route) -> Result<()> {
        self.routes.add(route)?;
        self.routes.clear_current()
    }

    /// Stop without keeping anything.
    pub async fn discard(&mut self) -> Result<()> {
        if self.is_tracking() {
            self.detach().await;
            self.session()?.stop(self.clock.now())?;
        }
        self.routes.clear_current()
    }
}
