//! `track` command: follows a position feed on stdin and prints the nearby
//! store list whenever it settles.
//!
//! Each input line is `lat,lng` for a fix or `error:<code>` for a
//! geolocation failure (1 denied, 2 unavailable, 3 timeout). Blank lines and
//! `#` comments are ignored.

use std::time::Duration;

use anyhow::Context;
use storefinder_client::{
    ChannelSource, LocationError, LocationTracker, PositionEvent, PositionReading, StoreAggregator,
};
use storefinder_core::{Coordinate, DEFAULT_CENTER};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

use crate::output;

pub(crate) fn parse_line(line: &str) -> anyhow::Result<Option<PositionEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if let Some(code) = line.strip_prefix("error:") {
        let code: u16 = code
            .trim()
            .parse()
            .with_context(|| format!("invalid error code in {line:?}"))?;
        return Ok(Some(PositionEvent::Failed(LocationError::from_code(code))));
    }

    let (lat, lng) = line
        .split_once(',')
        .with_context(|| format!("expected `lat,lng`, got {line:?}"))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("invalid latitude in {line:?}"))?;
    let lng: f64 = lng
        .trim()
        .parse()
        .with_context(|| format!("invalid longitude in {line:?}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        anyhow::bail!("coordinates out of range in {line:?}");
    }

    Ok(Some(PositionEvent::Reading(PositionReading::new(
        Coordinate::new(lat, lng),
    ))))
}

fn print_current(tracker: &LocationTracker, aggregator: &StoreAggregator) {
    let location = tracker.state();
    output::print_state(
        location.current_location.unwrap_or(DEFAULT_CENTER),
        &aggregator.state(),
        location.location_error.as_ref(),
    );
    println!("---");
}

pub(crate) async fn run_track(aggregator: &StoreAggregator) -> anyhow::Result<()> {
    let source = ChannelSource::new();
    let tracker = LocationTracker::new();

    let fetcher = aggregator.clone();
    let handle = tracker
        .track(&source, move |reading| {
            fetcher.debounced_fetch_nearby(reading.coords);
        })
        .context("position source unavailable")?;

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let printer = {
        let tracker = tracker.clone();
        let aggregator = aggregator.clone();
        let mut updates = aggregator.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let loading = updates.borrow_and_update().loading;
                        if !loading {
                            print_current(&tracker, &aggregator);
                        }
                    }
                    _ = &mut stop_rx => {
                        if updates.has_changed().unwrap_or(false) {
                            print_current(&tracker, &aggregator);
                        }
                        break;
                    }
                }
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let event = match parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "skipping position line");
                continue;
            }
        };

        source.emit(event);
        if let PositionEvent::Failed(error) = event {
            if tracker.state().current_location.is_none() {
                println!("{error} Showing stores around the default location.");
                aggregator.debounced_fetch_nearby(DEFAULT_CENTER);
            }
        }
    }

    // Closing the source ends the watch; then let any pending fetch land.
    drop(source);
    handle.finished().await;
    tokio::time::sleep(aggregator.options().debounce + Duration::from_millis(100)).await;
    let mut settled = aggregator.subscribe();
    settled.wait_for(|state| !state.loading).await?;

    let _ = stop_tx.send(());
    printer.await?;
    Ok(())
}
