// crates/magnet-core/src/core/phase.rs
// ============================================================================
// Module: MAGNET Design Phases
// Description: Phase enumeration, ownership tables, and parameter lookup.
// Purpose: Map every parameter path to exactly one owning design phase.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! ## Overview
//! The design process is divided into nine coarse phases. Every parameter path
//! is owned by exactly one phase; ownership is static data with a longest-prefix
//! fallback so that unknown parameters under a known root (`hull.*`) still
//! resolve. The tables here are the canonical definitions consumed by the
//! dependency graph builder.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ParamPath;

// ============================================================================
// SECTION: Phase
// ============================================================================

/// Coarse design stage owning a set of parameter paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Mission definition: vessel type, range, speeds, crew.
    Mission,
    /// Principal hull form dimensions and coefficients.
    HullForm,
    /// Structural scantlings and structural weight.
    Structure,
    /// General arrangement: decks, compartments, tanks.
    Arrangement,
    /// Resistance, powering, and propulsion plant.
    Propulsion,
    /// Weight groups and centers.
    Weight,
    /// Intact stability quantities.
    Stability,
    /// Classification and statutory compliance.
    Compliance,
    /// Production planning quantities.
    Production,
}

/// All phases in canonical pipeline order.
pub const ALL_PHASES: [Phase; 9] = [
    Phase::Mission,
    Phase::HullForm,
    Phase::Structure,
    Phase::Arrangement,
    Phase::Propulsion,
    Phase::Weight,
    Phase::Stability,
    Phase::Compliance,
    Phase::Production,
];

impl Phase {
    /// Returns the canonical snake_case name of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mission => "mission",
            Self::HullForm => "hull_form",
            Self::Structure => "structure",
            Self::Arrangement => "arrangement",
            Self::Propulsion => "propulsion",
            Self::Weight => "weight",
            Self::Stability => "stability",
            Self::Compliance => "compliance",
            Self::Production => "production",
        }
    }

    /// Parses a canonical phase name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        ALL_PHASES.into_iter().find(|phase| phase.as_str() == name)
    }

    /// Returns the phases this phase directly builds upon.
    #[must_use]
    pub const fn upstream(self) -> &'static [Self] {
        match self {
            Self::Mission => &[],
            Self::HullForm => &[Self::Mission],
            Self::Structure => &[Self::HullForm],
            Self::Arrangement => &[Self::HullForm, Self::Structure],
            Self::Propulsion => &[Self::Mission, Self::HullForm],
            Self::Weight => &[Self::Structure, Self::Arrangement, Self::Propulsion],
            Self::Stability => &[Self::HullForm, Self::Weight],
            Self::Compliance => &[Self::Stability],
            Self::Production => &[Self::Compliance],
        }
    }

    /// Returns every phase downstream of this phase in pipeline order.
    #[must_use]
    pub fn downstream(self) -> Vec<Self> {
        ALL_PHASES
            .into_iter()
            .filter(|candidate| *candidate != self && candidate.depends_transitively_on(self))
            .collect()
    }

    /// Returns true when this phase transitively depends on `other`.
    fn depends_transitively_on(self, other: Self) -> bool {
        self.upstream().iter().any(|direct| *direct == other || direct.depends_transitively_on(other))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Ownership Tables
// ============================================================================

/// Parameter paths owned by each phase.
const PHASE_OWNERSHIP: [(Phase, &[&str]); 9] = [
    (Phase::Mission, &[
        "mission.vessel_type",
        "mission.range_nm",
        "mission.crew_count",
        "mission.max_speed_kts",
        "mission.cruise_speed_kts",
    ]),
    (Phase::HullForm, &[
        "hull.loa",
        "hull.lwl",
        "hull.beam",
        "hull.draft",
        "hull.depth",
        "hull.cb",
        "hull.cp",
        "hull.displacement_m3",
        "hull.wetted_surface_m2",
    ]),
    (Phase::Structure, &[
        "structure.frame_spacing_mm",
        "structure.plate_thickness_mm",
        "structure.hull_weight_mt",
    ]),
    (Phase::Arrangement, &[
        "arrangement.deck_count",
        "arrangement.compartment_count",
        "arrangement.tank_volume_m3",
    ]),
    (Phase::Propulsion, &[
        "resistance.total_resistance_kn",
        "propulsion.engine_power_kw",
        "propulsion.propulsor_count",
        "propulsion.fuel_capacity_m3",
    ]),
    (Phase::Weight, &[
        "weight.lightship_weight_mt",
        "weight.deadweight_mt",
        "weight.displacement_mt",
        "weight.vcg_m",
        "weight.lcg_m",
    ]),
    (Phase::Stability, &[
        "stability.km_m",
        "stability.gm_transverse_m",
        "stability.righting_arm_m",
    ]),
    (Phase::Compliance, &[
        "compliance.stability_rule_id",
        "compliance.freeboard_mm",
    ]),
    (Phase::Production, &[
        "production.build_hours",
        "production.material_cost",
    ]),
];

/// Path-prefix fallback for parameters missing from the exact tables.
const PREFIX_OWNERSHIP: [(&str, Phase); 11] = [
    ("mission", Phase::Mission),
    ("hull", Phase::HullForm),
    ("structure", Phase::Structure),
    ("arrangement", Phase::Arrangement),
    ("resistance", Phase::Propulsion),
    ("propulsion", Phase::Propulsion),
    ("loading", Phase::Weight),
    ("weight", Phase::Weight),
    ("stability", Phase::Stability),
    ("compliance", Phase::Compliance),
    ("production", Phase::Production),
];

/// Canonical parameter dependency table: downstream parameter to its direct
/// upstream parameters.
const PARAMETER_DEPENDENCIES: [(&str, &[&str]); 13] = [
    ("hull.displacement_m3", &["hull.loa", "hull.beam", "hull.draft", "hull.cb"]),
    ("hull.wetted_surface_m2", &["hull.lwl", "hull.beam", "hull.draft"]),
    ("structure.hull_weight_mt", &[
        "hull.loa",
        "hull.beam",
        "hull.depth",
        "structure.plate_thickness_mm",
    ]),
    ("resistance.total_resistance_kn", &[
        "hull.displacement_m3",
        "hull.wetted_surface_m2",
        "mission.max_speed_kts",
    ]),
    ("propulsion.engine_power_kw", &[
        "resistance.total_resistance_kn",
        "mission.max_speed_kts",
    ]),
    ("propulsion.fuel_capacity_m3", &[
        "propulsion.engine_power_kw",
        "mission.range_nm",
        "mission.cruise_speed_kts",
    ]),
    ("arrangement.tank_volume_m3", &["propulsion.fuel_capacity_m3"]),
    ("weight.lightship_weight_mt", &[
        "structure.hull_weight_mt",
        "propulsion.engine_power_kw",
    ]),
    ("weight.displacement_mt", &["weight.lightship_weight_mt", "weight.deadweight_mt"]),
    ("stability.km_m", &["hull.beam", "hull.draft", "hull.cb"]),
    ("stability.gm_transverse_m", &["stability.km_m", "weight.vcg_m"]),
    ("stability.righting_arm_m", &["stability.gm_transverse_m"]),
    ("compliance.freeboard_mm", &["hull.depth", "hull.draft"]),
];

// ============================================================================
// SECTION: Lookup Functions
// ============================================================================

/// Resolves the owning phase for a parameter path.
///
/// Lookup is exact-table first, then longest dotted prefix against the
/// fallback table. Unknown roots resolve to `None`.
#[must_use]
pub fn phase_for_parameter(path: &ParamPath) -> Option<Phase> {
    for (phase, parameters) in PHASE_OWNERSHIP {
        if parameters.contains(&path.as_str()) {
            return Some(phase);
        }
    }

    let mut best: Option<(usize, Phase)> = None;
    for (prefix, phase) in PREFIX_OWNERSHIP {
        let matches = path.as_str() == prefix
            || path
                .as_str()
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'));
        if matches {
            let better = best.is_none_or(|(len, _)| prefix.len() > len);
            if better {
                best = Some((prefix.len(), phase));
            }
        }
    }
    best.map(|(_, phase)| phase)
}

/// Returns the parameter paths the exact ownership table assigns to a phase.
#[must_use]
pub fn parameters_for_phase(phase: Phase) -> Vec<ParamPath> {
    PHASE_OWNERSHIP
        .iter()
        .filter(|(owner, _)| *owner == phase)
        .flat_map(|(_, parameters)| parameters.iter().map(|path| ParamPath::new(*path)))
        .collect()
}

/// Returns the canonical parameter dependency table as owned pairs.
#[must_use]
pub fn parameter_dependencies() -> Vec<(ParamPath, Vec<ParamPath>)> {
    PARAMETER_DEPENDENCIES
        .iter()
        .map(|(target, sources)| {
            (
                ParamPath::new(*target),
                sources.iter().map(|source| ParamPath::new(*source)).collect(),
            )
        })
        .collect()
}
