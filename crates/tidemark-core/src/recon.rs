//! # Live Reconciliation & Report
//!
//! Compares a stored snapshot region against freshly fetched live state
//! and produces a structured raid-assessment report:
//!
//! - Raidability (executive delegate, no password)
//! - Population delta since the snapshot
//! - Per-role-holder influence visibility against population-scaled
//!   thresholds
//!
//! All network input arrives through plain data types ([`LiveRegion`],
//! [`NationProfile`]); assembly and rendering are pure so the whole module
//! is testable without a client.

use serde::{Deserialize, Serialize};

use crate::authority::{self, Authority};
use crate::types::Region;

// =============================================================================
// LIVE INPUT
// =============================================================================

/// Current state of a region as returned by the live API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveRegion {
    pub name: String,
    pub num_nations: u32,
    /// Delegate nation name; `"0"` or empty when the seat is vacant.
    pub delegate: String,
    /// Delegate permission string, e.g. `"XWS"`.
    pub delegate_auth: String,
    pub has_password: bool,
    pub officers: Vec<LiveOfficer>,
}

/// One regional officer as returned by the live API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveOfficer {
    pub nation: String,
    /// Office display name chosen by the region.
    pub office: String,
    /// Permission string for this office.
    pub authority: String,
}

/// Public profile of one nation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationProfile {
    pub wa_member: bool,
    pub endorsements: u32,
    /// Raw influence score.
    pub influence: f64,
    /// Influence tier label, e.g. "Apprentice".
    pub influence_tier: String,
}

// =============================================================================
// ROLE HOLDERS
// =============================================================================

/// The office name the game assigns to the delegate's built-in officer
/// entry; excluded from the officer list since the delegate is reported
/// separately.
const SYSTEM_OFFICE: &str = "WA Delegate";

/// One privileged role holder to assess, in report order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHolder {
    pub nation: String,
    pub office: String,
    /// Permission string for this role.
    pub authority: String,
}

/// The role holders of a live region, delegate first, then officers in
/// fetch order, excluding the built-in system office.
#[must_use]
pub fn role_holders(live: &LiveRegion) -> Vec<RoleHolder> {
    let mut holders = Vec::with_capacity(live.officers.len() + 1);
    if !live.delegate.is_empty() && live.delegate != "0" {
        holders.push(RoleHolder {
            nation: live.delegate.clone(),
            office: "Delegate".to_string(),
            authority: live.delegate_auth.clone(),
        });
    }
    for officer in &live.officers {
        if officer.office == SYSTEM_OFFICE {
            continue;
        }
        holders.push(RoleHolder {
            nation: officer.nation.clone(),
            office: officer.office.clone(),
            authority: officer.authority.clone(),
        });
    }
    holders
}

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Influence thresholds scaled from the live population.
///
/// Below 20x population a nation's activity is fully visible on the public
/// roster; past 40x it becomes partly concealed from casual observers;
/// between the two is a transitional band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityThresholds {
    pub visible: f64,
    pub invisible: f64,
}

impl VisibilityThresholds {
    /// Fixed 20x / 40x multipliers over the live population.
    #[must_use]
    pub fn for_population(num_nations: u32) -> Self {
        Self {
            visible: f64::from(num_nations) * 20.0,
            invisible: f64::from(num_nations) * 40.0,
        }
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// Sign of the population change since the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationTrend {
    Growing,
    Flat,
    Shrinking,
}

impl PopulationTrend {
    /// Classify `stored - live`.
    #[must_use]
    pub fn from_net_change(net_change: i64) -> Self {
        match net_change {
            n if n < 0 => Self::Growing,
            0 => Self::Flat,
            _ => Self::Shrinking,
        }
    }
}

impl std::fmt::Display for PopulationTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Growing => write!(f, "growing"),
            Self::Flat => write!(f, "flat"),
            Self::Shrinking => write!(f, "shrinking"),
        }
    }
}

/// One report line per role holder.
///
/// `profile` is `None` when the profile fetch failed; the line is kept and
/// rendered as unavailable rather than dropped, so the role holder still
/// appears in the assessment.
#[derive(Debug, Clone)]
pub struct RoleReportLine {
    pub nation: String,
    pub office: String,
    pub border_control: bool,
    pub profile: Option<NationProfile>,
    /// Influence at or past the 20x-population mark.
    pub meets_visible: bool,
    /// Influence at or past the 40x-population mark.
    pub meets_invisible: bool,
}

/// The assembled reconciliation report for one region.
#[derive(Debug, Clone)]
pub struct RegionReport {
    pub name: String,
    /// Live delegate holds Executive and the region is not passworded.
    pub raidable: bool,
    pub has_governor: bool,
    pub has_password: bool,
    pub stored_nations: u32,
    pub live_nations: u32,
    /// `stored - live`.
    pub net_change: i64,
    pub trend: PopulationTrend,
    pub thresholds: VisibilityThresholds,
    pub lines: Vec<RoleReportLine>,
}

impl RegionReport {
    /// Assemble the report from stored state, live state and the fetched
    /// profiles, which must be in [`role_holders`] order.
    #[must_use]
    pub fn assemble(
        stored: &Region,
        live: &LiveRegion,
        profiles: Vec<(RoleHolder, Option<NationProfile>)>,
    ) -> Self {
        let delegate_flags = authority::encode(&live.delegate_auth);
        let raidable = authority::has(delegate_flags, Authority::Executive) && !live.has_password;

        let net_change = i64::from(stored.num_nations) - i64::from(live.num_nations);
        let thresholds = VisibilityThresholds::for_population(live.num_nations);

        let lines = profiles
            .into_iter()
            .map(|(holder, profile)| {
                let flags = authority::encode(&holder.authority);
                let influence = profile.as_ref().map(|p| p.influence);
                RoleReportLine {
                    nation: holder.nation,
                    office: holder.office,
                    border_control: authority::has(flags, Authority::BorderControl),
                    meets_visible: influence.is_some_and(|i| i >= thresholds.visible),
                    meets_invisible: influence.is_some_and(|i| i >= thresholds.invisible),
                    profile,
                }
            })
            .collect();

        Self {
            name: stored.name.clone(),
            raidable,
            has_governor: stored.has_governor,
            has_password: live.has_password,
            stored_nations: stored.num_nations,
            live_nations: live.num_nations,
            net_change,
            trend: PopulationTrend::from_net_change(net_change),
            thresholds,
            lines,
        }
    }
}

impl std::fmt::Display for RegionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} - {}",
            self.name,
            if self.raidable { "RAIDABLE" } else { "not raidable" }
        )?;
        writeln!(
            f,
            "  governor: {}  password: {}",
            if self.has_governor { "present" } else { "absent" },
            if self.has_password { "yes" } else { "no" },
        )?;
        writeln!(
            f,
            "  nations: {} -> {} ({}, net {:+})",
            self.stored_nations,
            self.live_nations,
            self.trend,
            -self.net_change,
        )?;
        writeln!(
            f,
            "  influence thresholds: visible {:.0}, invisible {:.0}",
            self.thresholds.visible, self.thresholds.invisible,
        )?;
        for line in &self.lines {
            match &line.profile {
                Some(profile) => {
                    writeln!(
                        f,
                        "  [{}] {} ({}){}{} endorsements={} influence={:.2} visible={} invisible={}",
                        profile.influence_tier,
                        line.nation,
                        line.office,
                        if line.border_control { " [BC]" } else { "" },
                        if profile.wa_member { " [WA]" } else { "" },
                        profile.endorsements,
                        profile.influence,
                        line.meets_visible,
                        line.meets_invisible,
                    )?;
                }
                None => {
                    writeln!(
                        f,
                        "  [?] {} ({}){} - profile unavailable",
                        line.nation,
                        line.office,
                        if line.border_control { " [BC]" } else { "" },
                    )?;
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_region(num_nations: u32) -> Region {
        Region {
            index: 0,
            name: "Test Region".to_string(),
            num_nations,
            delegate: "old_delegate".to_string(),
            delegate_votes: 0,
            delegate_auth: 0,
            founder: String::new(),
            founder_auth: 0,
            factbook: String::new(),
            embassies: Vec::new(),
            last_update: 0.0,
            last_major_update: 0.0,
            last_minor_update: 0.0,
            has_governor: true,
            has_password: false,
            is_frontier: false,
        }
    }

    fn live_region(num_nations: u32, delegate_auth: &str, has_password: bool) -> LiveRegion {
        LiveRegion {
            name: "Test Region".to_string(),
            num_nations,
            delegate: "new_delegate".to_string(),
            delegate_auth: delegate_auth.to_string(),
            has_password,
            officers: Vec::new(),
        }
    }

    fn profile(influence: f64) -> NationProfile {
        NationProfile {
            wa_member: true,
            endorsements: 5,
            influence,
            influence_tier: "Apprentice".to_string(),
        }
    }

    #[test]
    fn thresholds_scale_with_population() {
        let t = VisibilityThresholds::for_population(100);
        assert!((t.visible - 2000.0).abs() < f64::EPSILON);
        assert!((t.invisible - 4000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn influence_exactly_at_thresholds() {
        let live = live_region(100, "X", false);
        let holder = RoleHolder {
            nation: "a".to_string(),
            office: "Delegate".to_string(),
            authority: "X".to_string(),
        };

        // Exactly 20x population: visible, not invisible.
        let report = RegionReport::assemble(
            &stored_region(100),
            &live,
            vec![(holder.clone(), Some(profile(2000.0)))],
        );
        assert!(report.lines[0].meets_visible);
        assert!(!report.lines[0].meets_invisible);

        // Exactly 40x population: both.
        let report = RegionReport::assemble(
            &stored_region(100),
            &live,
            vec![(holder, Some(profile(4000.0)))],
        );
        assert!(report.lines[0].meets_visible);
        assert!(report.lines[0].meets_invisible);
    }

    #[test]
    fn raidable_needs_executive_and_no_password() {
        let stored = stored_region(10);
        assert!(RegionReport::assemble(&stored, &live_region(10, "XB", false), vec![]).raidable);
        assert!(!RegionReport::assemble(&stored, &live_region(10, "WB", false), vec![]).raidable);
        assert!(!RegionReport::assemble(&stored, &live_region(10, "XB", true), vec![]).raidable);
    }

    #[test]
    fn population_trend_classification() {
        // stored 120, live 118: shrinking since the snapshot.
        let report = RegionReport::assemble(&stored_region(120), &live_region(118, "X", false), vec![]);
        assert_eq!(report.net_change, 2);
        assert_eq!(report.trend, PopulationTrend::Shrinking);

        let report = RegionReport::assemble(&stored_region(100), &live_region(103, "X", false), vec![]);
        assert_eq!(report.trend, PopulationTrend::Growing);

        let report = RegionReport::assemble(&stored_region(100), &live_region(100, "X", false), vec![]);
        assert_eq!(report.trend, PopulationTrend::Flat);
    }

    #[test]
    fn role_holders_put_delegate_first_and_skip_system_office() {
        let mut live = live_region(10, "XWS", false);
        live.officers = vec![
            LiveOfficer {
                nation: "new_delegate".to_string(),
                office: "WA Delegate".to_string(),
                authority: "XWS".to_string(),
            },
            LiveOfficer {
                nation: "guard_one".to_string(),
                office: "Guard".to_string(),
                authority: "BC".to_string(),
            },
        ];

        let holders = role_holders(&live);
        assert_eq!(holders.len(), 2);
        assert_eq!(holders[0].nation, "new_delegate");
        assert_eq!(holders[0].office, "Delegate");
        assert_eq!(holders[1].nation, "guard_one");
    }

    #[test]
    fn vacant_delegate_seat_is_not_a_role_holder() {
        let mut live = live_region(10, "", false);
        live.delegate = "0".to_string();
        assert!(role_holders(&live).is_empty());

        live.delegate = String::new();
        assert!(role_holders(&live).is_empty());
    }

    #[test]
    fn failed_profile_fetch_keeps_the_line() {
        let live = live_region(10, "X", false);
        let holder = RoleHolder {
            nation: "gone".to_string(),
            office: "Guard".to_string(),
            authority: "B".to_string(),
        };
        let report = RegionReport::assemble(&stored_region(10), &live, vec![(holder, None)]);

        assert_eq!(report.lines.len(), 1);
        assert!(report.lines[0].profile.is_none());
        assert!(report.lines[0].border_control);
        assert!(!report.lines[0].meets_visible);
        let rendered = report.to_string();
        assert!(rendered.contains("profile unavailable"));
    }

    #[test]
    fn report_renders_role_lines_in_order() {
        let live = live_region(10, "X", false);
        let mk = |name: &str| RoleHolder {
            nation: name.to_string(),
            office: "Guard".to_string(),
            authority: String::new(),
        };
        let report = RegionReport::assemble(
            &stored_region(10),
            &live,
            vec![
                (mk("first"), Some(profile(1.0))),
                (mk("second"), Some(profile(2.0))),
            ],
        );
        let rendered = report.to_string();
        let first = rendered.find("first").expect("first in output");
        let second = rendered.find("second").expect("second in output");
        assert!(first < second);
    }
}
