use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{EVENT_WEEKS, WEEK_DESCRIPTIONS};
use crate::parser::StructureRecord;
use crate::planner::bonuses::{calculate_lobby_bonuses, is_lobby, structure_bonus, LobbyBonusSummary};
use crate::planner::status::{structure_status, week_of_day};
use crate::planner::types::{Faction, Planning, Priority, StructureStatus};

/// One structure a guild has claimed, as shown in the guild breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimedStructure {
    pub occupation: String,
    pub coordinates: String,
    pub priority: Priority,
    pub faction: String,
    pub is_lobby: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuildStats {
    pub faction_points: u32,
    pub guild_points: u32,
    pub chaos_base: u32,
    pub chaos_percent: f64,
    pub guild_faction: Faction,
    pub lobbies: Vec<String>,
    pub structures: Vec<ClaimedStructure>,
    pub lobby_bonuses: LobbyBonusSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FactionStats {
    pub total_points: u32,
    pub structures_planned: u32,
    pub guilds_involved: BTreeSet<String>,
    pub available_today: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactionBreakdown {
    pub north: FactionStats,
    pub south: FactionStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalStats {
    pub faction_points: u32,
    pub guild_points: u32,
    pub chaos_base: u32,
    pub chaos_percent: f64,
    pub planned_count: usize,
    pub guild_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekBucket {
    pub week: u32,
    pub label: String,
    pub planned: usize,
}

/// Full aggregate view over (catalog, plannings, conflicts) at one instant.
/// Recomputed from scratch on every call; nothing here is cached.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub guilds: BTreeMap<String, GuildStats>,
    pub factions: FactionBreakdown,
    pub totals: TotalStats,
    pub timeline: Vec<WeekBucket>,
    pub structure_types: BTreeMap<String, usize>,
}

pub fn build_stats(
    catalog: &[StructureRecord],
    plannings: &BTreeMap<usize, Vec<Planning>>,
    conflicts: &BTreeMap<usize, Vec<String>>,
    start: Option<NaiveDate>,
    today: NaiveDate,
) -> StatsSnapshot {
    let mut guilds: BTreeMap<String, GuildStats> = BTreeMap::new();
    let mut north = FactionStats::default();
    let mut south = FactionStats::default();
    let mut guild_names: BTreeSet<String> = BTreeSet::new();
    let mut lobby_claims: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let mut total_faction_points = 0u32;
    let mut total_guild_points = 0u32;
    let mut total_chaos_base = 0u32;
    let mut total_chaos_percent = 0f64;

    for (&index, claims) in plannings {
        // Indices with no catalog entry can appear after a catalog refresh;
        // skip them rather than guessing at their values
        let Some(structure) = catalog.get(index) else {
            continue;
        };
        let lobby = is_lobby(&structure.occupation);
        let status = structure_status(
            structure.opening_day,
            true,
            conflicts.contains_key(&index),
            start,
            today,
        );

        for planning in claims {
            guild_names.insert(planning.guild.clone());

            let entry = guilds
                .entry(planning.guild.clone())
                .or_insert_with(|| GuildStats {
                    faction_points: 0,
                    guild_points: 0,
                    chaos_base: 0,
                    chaos_percent: 0.0,
                    guild_faction: planning.guild_faction,
                    lobbies: Vec::new(),
                    structures: Vec::new(),
                    lobby_bonuses: LobbyBonusSummary::default(),
                });

            if !lobby {
                entry.faction_points += structure.faction_value;
                entry.guild_points += structure.guild_value;
                if let Some(bonus) = structure_bonus(&structure.occupation) {
                    entry.chaos_base += bonus.base;
                    entry.chaos_percent += bonus.percent;
                }
                total_faction_points += structure.faction_value;
                total_guild_points += structure.guild_value;
                if let Some(bonus) = structure_bonus(&structure.occupation) {
                    total_chaos_base += bonus.base;
                    total_chaos_percent += bonus.percent;
                }
            } else {
                entry.lobbies.push(structure.occupation.clone());
                lobby_claims
                    .entry(planning.guild.clone())
                    .or_default()
                    .push(structure.occupation.clone());
            }

            entry.structures.push(ClaimedStructure {
                occupation: structure.occupation.clone(),
                coordinates: structure.coordinates(),
                priority: planning.priority,
                faction: structure.faction.clone(),
                is_lobby: lobby,
            });

            let faction_entry = match planning.guild_faction {
                Faction::North => &mut north,
                Faction::South => &mut south,
            };
            if !lobby {
                faction_entry.total_points += structure.faction_value;
            }
            faction_entry.structures_planned += 1;
            faction_entry.guilds_involved.insert(planning.guild.clone());
            if status == StructureStatus::Occupation {
                faction_entry.available_today += 1;
            }
        }
    }

    for (guild, lobbies) in lobby_claims {
        if let Some(entry) = guilds.get_mut(&guild) {
            entry.lobby_bonuses = calculate_lobby_bonuses(&lobbies);
        }
    }

    let timeline = build_timeline(catalog, plannings);
    let structure_types = build_type_distribution(catalog, plannings);

    StatsSnapshot {
        guilds,
        factions: FactionBreakdown { north, south },
        totals: TotalStats {
            faction_points: total_faction_points,
            guild_points: total_guild_points,
            chaos_base: total_chaos_base,
            chaos_percent: total_chaos_percent,
            planned_count: plannings.len(),
            guild_count: guild_names.len(),
        },
        timeline,
        structure_types,
    }
}

/// Counts planned structures per event week of their opening day.
fn build_timeline(
    catalog: &[StructureRecord],
    plannings: &BTreeMap<usize, Vec<Planning>>,
) -> Vec<WeekBucket> {
    let mut buckets: Vec<WeekBucket> = (1..=EVENT_WEEKS)
        .map(|week| WeekBucket {
            week,
            label: WEEK_DESCRIPTIONS[(week - 1) as usize].to_string(),
            planned: 0,
        })
        .collect();

    for &index in plannings.keys() {
        let Some(structure) = catalog.get(index) else {
            continue;
        };
        let week = week_of_day(structure.opening_day);
        if (1..=EVENT_WEEKS).contains(&week) {
            buckets[(week - 1) as usize].planned += 1;
        }
    }

    buckets
}

/// Counts planned structures per normalized type label (first token of the
/// occupation name).
fn build_type_distribution(
    catalog: &[StructureRecord],
    plannings: &BTreeMap<usize, Vec<Planning>>,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for &index in plannings.keys() {
        let Some(structure) = catalog.get(index) else {
            continue;
        };
        let label = structure
            .occupation
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}
