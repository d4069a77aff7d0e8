use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::DAYS_PER_WEEK;
use crate::parser::StructureRecord;
use crate::planner::types::{Faction, Planning};

/// Two targets whose efficiency differs by less than this are ranked by
/// total points instead.
const EFFICIENCY_EPSILON: f64 = 0.1;

/// Structures within this coordinate distance of a route seed join its route.
const ROUTE_RADIUS: f64 = 200.0;

/// One recommended capture target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetPick {
    pub index: usize,
    pub occupation: String,
    pub coordinates: String,
    pub sector: String,
    pub opening_day: u32,
    pub faction_points: u32,
    pub guild_points: u32,
    pub total_points: u32,
    /// Points per opening day; earlier structures score higher.
    pub efficiency: f64,
}

/// Efficiency-ranked target list split into priority tiers: `guilds` picks
/// per tier, the remainder as backups.
#[derive(Debug, Clone, Serialize)]
pub struct PointsPlan {
    pub high: Vec<TargetPick>,
    pub medium: Vec<TargetPick>,
    pub low: Vec<TargetPick>,
    pub total_potential_points: u32,
    pub average_points: u32,
}

fn pick_from(index: usize, structure: &StructureRecord) -> TargetPick {
    let total = structure.faction_value + structure.guild_value;
    // Day 0 only occurs for defensively-parsed garbage rows; treat as day 1
    // so the ratio stays finite
    let day = structure.opening_day.max(1);
    TargetPick {
        index,
        occupation: structure.occupation.clone(),
        coordinates: structure.coordinates(),
        sector: structure.sector.clone(),
        opening_day: structure.opening_day,
        faction_points: structure.faction_value,
        guild_points: structure.guild_value,
        total_points: total,
        efficiency: total as f64 / day as f64,
    }
}

fn open_unplanned<'a>(
    catalog: &'a [StructureRecord],
    plannings: &BTreeMap<usize, Vec<Planning>>,
    week: u32,
) -> impl Iterator<Item = (usize, &'a StructureRecord)> + 'a {
    let horizon = week * DAYS_PER_WEEK;
    let planned: Vec<usize> = plannings.keys().copied().collect();
    catalog
        .iter()
        .enumerate()
        .filter(move |(index, s)| s.opening_day <= horizon && !planned.contains(index))
}

/// Ranks the unplanned structures opening by the end of `week` for `guilds`
/// participating guilds: best points-per-day first, total points breaking
/// near-ties. Returns three picks per guild across the tiers.
pub fn optimize_points(
    catalog: &[StructureRecord],
    plannings: &BTreeMap<usize, Vec<Planning>>,
    week: u32,
    guilds: usize,
) -> PointsPlan {
    let mut picks: Vec<TargetPick> = open_unplanned(catalog, plannings, week)
        .map(|(index, s)| pick_from(index, s))
        .collect();

    picks.sort_by(|a, b| {
        if (b.efficiency - a.efficiency).abs() > EFFICIENCY_EPSILON {
            b.efficiency.partial_cmp(&a.efficiency).unwrap_or(Ordering::Equal)
        } else {
            b.total_points.cmp(&a.total_points)
        }
    });
    picks.truncate(guilds * 3);

    let total: u32 = picks.iter().map(|p| p.total_points).sum();
    let average = if picks.is_empty() {
        0
    } else {
        (total as f64 / picks.len() as f64).round() as u32
    };

    let low = picks.split_off((guilds * 2).min(picks.len()));
    let medium = picks.split_off(guilds.min(picks.len()));
    PointsPlan {
        high: picks,
        medium,
        low,
        total_potential_points: total,
        average_points: average,
    }
}

/// How loaded a guild already is, used to pick a winner for a contested
/// structure.
#[derive(Debug, Clone, Serialize)]
pub struct GuildLoad {
    pub guild: String,
    pub planned_structures: usize,
    pub planned_points: u32,
}

/// One contested structure with every contender's current planning load and
/// the least-loaded guild as the suggested assignee.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictAnalysis {
    pub index: usize,
    pub occupation: String,
    pub coordinates: String,
    pub opening_day: u32,
    pub total_points: u32,
    pub contenders: Vec<GuildLoad>,
    pub suggested_guild: Option<String>,
}

fn guild_loads(
    catalog: &[StructureRecord],
    plannings: &BTreeMap<usize, Vec<Planning>>,
) -> BTreeMap<String, GuildLoad> {
    let mut loads: BTreeMap<String, GuildLoad> = BTreeMap::new();
    for (&index, claims) in plannings {
        let Some(structure) = catalog.get(index) else {
            continue;
        };
        for planning in claims {
            let load = loads
                .entry(planning.guild.clone())
                .or_insert_with(|| GuildLoad {
                    guild: planning.guild.clone(),
                    planned_structures: 0,
                    planned_points: 0,
                });
            load.planned_structures += 1;
            load.planned_points += structure.faction_value + structure.guild_value;
        }
    }
    loads
}

/// Breaks every current conflict down for resolution: the contested
/// structure's value, each contender's overall planning load, and the guild
/// with the fewest planned structures as the suggestion (earliest claimant
/// wins ties).
pub fn analyze_conflicts(
    catalog: &[StructureRecord],
    plannings: &BTreeMap<usize, Vec<Planning>>,
    conflicts: &BTreeMap<usize, Vec<String>>,
) -> Vec<ConflictAnalysis> {
    let loads = guild_loads(catalog, plannings);

    conflicts
        .iter()
        .filter_map(|(&index, guilds)| {
            let structure = catalog.get(index)?;
            let contenders: Vec<GuildLoad> = guilds
                .iter()
                .map(|guild| {
                    loads.get(guild).cloned().unwrap_or_else(|| GuildLoad {
                        guild: guild.clone(),
                        planned_structures: 0,
                        planned_points: 0,
                    })
                })
                .collect();
            let suggested_guild = contenders
                .iter()
                .min_by_key(|c| c.planned_structures)
                .map(|c| c.guild.clone());

            Some(ConflictAnalysis {
                index,
                occupation: structure.occupation.clone(),
                coordinates: structure.coordinates(),
                opening_day: structure.opening_day,
                total_points: structure.faction_value + structure.guild_value,
                contenders,
                suggested_guild,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct FactionProjection {
    pub current: u32,
    pub projected: u32,
    pub additional: u32,
    /// Blend of 60% projected / 40% current, assuming partial success.
    pub realistic: u32,
}

/// Best-case projection if the user's faction captured the top unplanned
/// targets open by the end of `week`.
#[derive(Debug, Clone, Serialize)]
pub struct WhatIfProjection {
    pub north: FactionProjection,
    pub south: FactionProjection,
    pub current_lead: String,
    pub projected_lead: String,
    pub targets: Vec<TargetPick>,
}

fn lead_description(north: u32, south: u32) -> String {
    match north.cmp(&south) {
        Ordering::Greater => format!("North leads by {} points", north - south),
        Ordering::Less => format!("South leads by {} points", south - north),
        Ordering::Equal => "Tied".to_string(),
    }
}

fn projection(current: u32, additional: u32) -> FactionProjection {
    let projected = current + additional;
    FactionProjection {
        current,
        projected,
        additional,
        realistic: (projected as f64 * 0.6 + current as f64 * 0.4).round() as u32,
    }
}

/// Projects faction standings if the user's faction took the two best
/// unplanned structures per guild, ranked by faction value. The opposing
/// faction is assumed unchanged.
pub fn project_what_if(
    catalog: &[StructureRecord],
    plannings: &BTreeMap<usize, Vec<Planning>>,
    current_north: u32,
    current_south: u32,
    user_faction: Faction,
    week: u32,
    guilds: usize,
) -> WhatIfProjection {
    let mut targets: Vec<TargetPick> = open_unplanned(catalog, plannings, week)
        .map(|(index, s)| pick_from(index, s))
        .collect();
    targets.sort_by(|a, b| b.faction_points.cmp(&a.faction_points));
    targets.truncate(guilds * 2);

    let additional: u32 = targets.iter().map(|t| t.faction_points).sum();
    let (north, south) = match user_faction {
        Faction::North => (
            projection(current_north, additional),
            projection(current_south, 0),
        ),
        Faction::South => (
            projection(current_north, 0),
            projection(current_south, additional),
        ),
    };

    WhatIfProjection {
        current_lead: lead_description(current_north, current_south),
        projected_lead: lead_description(north.projected, south.projected),
        north,
        south,
        targets,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteStop {
    pub index: usize,
    pub occupation: String,
    pub coordinates: String,
    pub opening_day: u32,
}

/// A proximity cluster of open structures a single guild can work through,
/// stops ordered by opening day.
#[derive(Debug, Clone, Serialize)]
pub struct RoutePlan {
    pub center: String,
    pub total_points: u32,
    pub stops: Vec<RouteStop>,
}

fn distance(a: &StructureRecord, b: &StructureRecord) -> f64 {
    let dx = a.x as f64 - b.x as f64;
    let dy = a.y as f64 - b.y as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Greedily clusters the structures open by the end of `week` by proximity
/// and returns the `guilds` largest clusters as routes. Planned structures
/// are included; a route is a patrol area, not a claim list.
pub fn plan_routes(catalog: &[StructureRecord], week: u32, guilds: usize) -> Vec<RoutePlan> {
    let horizon = week * DAYS_PER_WEEK;
    let open: Vec<(usize, &StructureRecord)> = catalog
        .iter()
        .enumerate()
        .filter(|(_, s)| s.opening_day <= horizon)
        .collect();

    let mut used = vec![false; open.len()];
    let mut clusters: Vec<Vec<(usize, &StructureRecord)>> = Vec::new();

    for seed in 0..open.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let mut cluster = vec![open[seed]];
        for other in seed + 1..open.len() {
            if !used[other] && distance(open[seed].1, open[other].1) <= ROUTE_RADIUS {
                used[other] = true;
                cluster.push(open[other]);
            }
        }
        clusters.push(cluster);
    }

    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters.truncate(guilds);

    clusters
        .into_iter()
        .map(|mut cluster| {
            let count = cluster.len() as f64;
            let avg_x = cluster.iter().map(|(_, s)| s.x as f64).sum::<f64>() / count;
            let avg_y = cluster.iter().map(|(_, s)| s.y as f64).sum::<f64>() / count;
            let total_points = cluster
                .iter()
                .map(|(_, s)| s.faction_value + s.guild_value)
                .sum();
            cluster.sort_by_key(|(_, s)| s.opening_day);

            RoutePlan {
                center: format!("{}:{}", avg_x.round() as u32, avg_y.round() as u32),
                total_points,
                stops: cluster
                    .into_iter()
                    .map(|(index, s)| RouteStop {
                        index,
                        occupation: s.occupation.clone(),
                        coordinates: s.coordinates(),
                        opening_day: s.opening_day,
                    })
                    .collect(),
            }
        })
        .collect()
}
