//! Device position tracking with a significant-movement filter.
//!
//! Geolocation is modelled as an event source: a [`GeolocationSource`] hands
//! out [`PositionStream`] subscriptions that yield readings or failures. The
//! [`LocationTracker`] consumes one subscription, drops readings that moved
//! less than [`SIGNIFICANT_DISTANCE_DEG`] and reports failures as
//! [`LocationError`] messages.

use std::sync::{Arc, Mutex, PoisonError};

use storefinder_core::Coordinate;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::LocationError;

/// Movement threshold in degrees (about 500 m at low latitudes).
///
/// Compared against the planar delta, not a geodesic distance.
pub const SIGNIFICANT_DISTANCE_DEG: f64 = 0.005;

const SOURCE_CHANNEL_CAPACITY: usize = 64;

/// `true` when `a` and `b` are more than [`SIGNIFICANT_DISTANCE_DEG`] apart.
#[must_use]
pub fn significant_change(a: Coordinate, b: Coordinate) -> bool {
    let d_lat = a.lat - b.lat;
    let d_lng = a.lng - b.lng;
    d_lat * d_lat + d_lng * d_lng > SIGNIFICANT_DISTANCE_DEG * SIGNIFICANT_DISTANCE_DEG
}

/// A raw position fix as delivered by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReading {
    pub coords: Coordinate,
    /// Reported accuracy radius in metres, if known.
    pub accuracy_m: Option<f64>,
    /// Epoch milliseconds at which the fix was taken.
    pub timestamp_ms: i64,
}

impl PositionReading {
    #[must_use]
    pub fn new(coords: Coordinate) -> Self {
        Self {
            coords,
            accuracy_m: None,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionEvent {
    Reading(PositionReading),
    Failed(LocationError),
}

/// One subscription to a geolocation source. Dropping it unsubscribes.
#[derive(Debug)]
pub struct PositionStream {
    events: mpsc::Receiver<PositionEvent>,
}

impl PositionStream {
    #[must_use]
    pub fn new(events: mpsc::Receiver<PositionEvent>) -> Self {
        Self { events }
    }

    /// Next event, or `None` once the source has gone away.
    pub async fn next(&mut self) -> Option<PositionEvent> {
        self.events.recv().await
    }
}

/// Host geolocation capability.
pub trait GeolocationSource: Send + Sync {
    /// Starts a position watch.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::NotSupported`] when the host has no geolocation.
    fn subscribe(&self) -> Result<PositionStream, LocationError>;
}

/// A source for hosts without geolocation support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSource;

impl GeolocationSource for UnsupportedSource {
    fn subscribe(&self) -> Result<PositionStream, LocationError> {
        Err(LocationError::NotSupported)
    }
}

/// An in-process source: whatever is passed to [`ChannelSource::emit`] is
/// delivered to every live subscriber.
#[derive(Debug, Default)]
pub struct ChannelSource {
    subscribers: Mutex<Vec<mpsc::Sender<PositionEvent>>>,
}

impl ChannelSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to all subscribers and returns how many received it.
    ///
    /// Closed subscriptions are pruned. A subscriber whose buffer is full
    /// misses this event.
    pub fn emit(&self, event: PositionEvent) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());

        let mut delivered = 0;
        for tx in subscribers.iter() {
            match tx.try_send(event) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("position subscriber is lagging; dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

impl GeolocationSource for ChannelSource {
    fn subscribe(&self) -> Result<PositionStream, LocationError> {
        let (tx, rx) = mpsc::channel(SOURCE_CHANNEL_CAPACITY);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Ok(PositionStream::new(rx))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationTrackState {
    pub current_location: Option<Coordinate>,
    pub location_error: Option<LocationError>,
}

/// Keeps the last significant position and the last location error.
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct LocationTracker {
    state: Arc<watch::Sender<LocationTrackState>>,
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationTracker {
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(LocationTrackState::default());
        Self {
            state: Arc::new(state),
        }
    }

    #[must_use]
    pub fn state(&self) -> LocationTrackState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<LocationTrackState> {
        self.state.subscribe()
    }

    /// Applies one event and returns the reading when it is a significant move.
    pub fn handle(&self, event: PositionEvent) -> Option<PositionReading> {
        match event {
            PositionEvent::Reading(reading) => {
                let mut significant = false;
                self.state.send_if_modified(|state| {
                    significant = state
                        .current_location
                        .is_none_or(|previous| significant_change(reading.coords, previous));
                    if significant {
                        state.current_location = Some(reading.coords);
                        state.location_error = None;
                    }
                    significant
                });
                if significant {
                    tracing::debug!(
                        lat = reading.coords.lat,
                        lng = reading.coords.lng,
                        "significant location change"
                    );
                    Some(reading)
                } else {
                    None
                }
            }
            PositionEvent::Failed(error) => {
                tracing::warn!(error = %error, "error getting location");
                self.state.send_modify(|state| state.location_error = Some(error));
                None
            }
        }
    }

    /// Subscribes to `source` and calls `on_update` for each significant move.
    ///
    /// Returns `None` when the source is unavailable; the error is recorded in
    /// the tracker state and no callback will ever run.
    pub fn track<F>(&self, source: &dyn GeolocationSource, mut on_update: F) -> Option<TrackHandle>
    where
        F: FnMut(PositionReading) + Send + 'static,
    {
        let mut stream = match source.subscribe() {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(error = %error, "geolocation unavailable");
                self.state.send_modify(|state| state.location_error = Some(error));
                return None;
            }
        };

        let tracker = self.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if let Some(reading) = tracker.handle(event) {
                    on_update(reading);
                }
            }
            tracing::debug!("position stream closed");
        });

        Some(TrackHandle { task })
    }
}

/// Running position watch started by [`LocationTracker::track`].
#[derive(Debug)]
pub struct TrackHandle {
    task: JoinHandle<()>,
}

impl TrackHandle {
    /// Stops the watch; the subscription is released.
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    /// Waits until the source closes the subscription.
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

#[cfg(test)]
#[path = "location_test.rs"]
mod tests;
