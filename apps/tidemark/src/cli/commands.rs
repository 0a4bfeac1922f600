//! # CLI Command Implementations
//!
//! Each command prepares the snapshot store (idempotently) and then runs
//! one engine operation against it.

use chrono::NaiveDate;
use futures::future::join_all;
use tracing::{info, warn};

use tidemark_core::{
    NationProfile, RegionReport, RoleHolder, TidemarkError, UpdateCycle, UpdateEstimate,
    resolve_trigger, role_holders,
};

use crate::dump;
use crate::net::NsClient;

/// Seconds rendered as `H:MM:SS` for update-offset output.
fn fmt_offset(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn cycle_of(minor: bool) -> UpdateCycle {
    if minor {
        UpdateCycle::Minor
    } else {
        UpdateCycle::Major
    }
}

// =============================================================================
// TRIGGER COMMAND
// =============================================================================

/// Resolve and print a trigger region for the target.
pub async fn cmd_trigger(
    client: &NsClient,
    dump_name: &str,
    today: NaiveDate,
    target: &str,
    width: Option<f64>,
    minor: bool,
) -> Result<(), TidemarkError> {
    let store = dump::prepare_store(client, dump_name, today).await?;

    info!(target = %target, "acquiring target data");
    let resolution = resolve_trigger(&store, target, width, cycle_of(minor))?;

    println!(
        "Trigger for {} ({} cycle): {}",
        resolution.target.name,
        cycle_of(minor),
        resolution.trigger.name,
    );
    println!(
        "  target:  nation {} (position {})",
        resolution.target_nation.name, resolution.target_nation.id,
    );
    println!(
        "  trigger: nation {} (position {})",
        resolution.trigger_nation.name, resolution.trigger_nation.id,
    );
    println!(
        "  lead:    {} nations, about {:.1}s at {:.2}s per nation",
        resolution.lead_nations(),
        resolution.lead_nations() as f64 * resolution.time_per_nation,
        resolution.time_per_nation,
    );

    Ok(())
}

// =============================================================================
// SCAN COMMAND
// =============================================================================

/// Reconcile a stored region against live state and print the report.
pub async fn cmd_scan(
    client: &NsClient,
    dump_name: &str,
    today: NaiveDate,
    region: &str,
) -> Result<(), TidemarkError> {
    let store = dump::prepare_store(client, dump_name, today).await?;

    info!(region = %region, "fetching live region state");
    let (stored, live) = tokio::join!(
        async { store.region_by_name(region) },
        client.region(region),
    );
    let stored = stored?.ok_or_else(|| TidemarkError::RegionNotFound(region.to_string()))?;
    let live = live?;

    let holders = role_holders(&live);
    info!(count = holders.len(), "fetching role holder profiles");
    let fetches = join_all(holders.iter().map(|h| client.nation_profile(&h.nation))).await;

    // Output keeps role order regardless of fetch completion order; a
    // failed profile fetch downgrades one line instead of aborting.
    let profiles: Vec<(RoleHolder, Option<NationProfile>)> = holders
        .into_iter()
        .zip(fetches)
        .map(|(holder, fetched)| match fetched {
            Ok(profile) => (holder, Some(profile)),
            Err(error) => {
                warn!(nation = %holder.nation, %error, "profile fetch failed");
                (holder, None)
            }
        })
        .collect();

    let report = RegionReport::assemble(&stored, &live, profiles);
    println!("{report}");

    Ok(())
}

// =============================================================================
// ESTIMATE COMMAND
// =============================================================================

/// Print estimated vs actual update offsets for a region.
pub async fn cmd_estimate(
    client: &NsClient,
    dump_name: &str,
    today: NaiveDate,
    region: &str,
    minor: bool,
) -> Result<(), TidemarkError> {
    let store = dump::prepare_store(client, dump_name, today).await?;

    let stored = store
        .region_by_name(region)?
        .ok_or_else(|| TidemarkError::RegionNotFound(region.to_string()))?;
    let representative = store
        .first_nation_in_region(stored.index)?
        .ok_or_else(|| TidemarkError::RegionNotFound(region.to_string()))?;
    let stats = store.statistics()?.ok_or_else(|| {
        TidemarkError::Storage("no update statistics; ingest a snapshot first".to_string())
    })?;

    let cycle = cycle_of(minor);
    let estimate = UpdateEstimate::for_region(&stored, representative.id, &stats, cycle);

    println!("Update estimate for {} ({} cycle)", stored.name, cycle);
    println!("  estimated: {}", fmt_offset(estimate.estimated));
    println!("  actual:    {}", fmt_offset(estimate.actual));
    println!("  variance:  {:+.1}s", estimate.variance);

    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store contents and derived statistics.
pub async fn cmd_status(
    client: &NsClient,
    dump_name: &str,
    today: NaiveDate,
) -> Result<(), TidemarkError> {
    let store = dump::prepare_store(client, dump_name, today).await?;

    println!("Tidemark Store Status");
    println!("=====================");
    println!("Snapshot: {}", dump_name);
    println!("Regions:  {}", store.region_count()?);
    println!("Nations:  {}", store.nation_count()?);

    if let Some(stats) = store.statistics()? {
        println!();
        println!("Major cycle: {} long, {:.2}s per nation", fmt_offset(stats.major_span), stats.tpn_major);
        println!("Minor cycle: {} long, {:.2}s per nation", fmt_offset(stats.minor_span), stats.tpn_minor);
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
