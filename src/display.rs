use chrono::NaiveDate;

use crate::planner::stats::StatsSnapshot;
use crate::planner::PlannerState;

/// Formats a guild name with its faction tag
pub fn format_guild_label(guild: &str, faction: &str) -> String {
    format!("[{}] {}", faction, guild)
}

/// Prints the catalog with derived status, one structure per line
pub fn print_overview(state: &PlannerState, today: NaiveDate) {
    println!("\n=== Eden Structures ({}) ===", state.catalog().len());

    for (index, structure) in state.catalog().iter().enumerate() {
        let status = state.status_of(index, today);
        let planning = state
            .get_planning(index)
            .map(|p| format!(" -> {} on {}", p.guild, p.date))
            .unwrap_or_default();
        println!(
            "  #{:<4} {:<22} {:>9}  day {:>2}  [{}]{}",
            index,
            structure.occupation,
            structure.coordinates(),
            structure.opening_day,
            status.label(),
            planning
        );
    }
}

/// Prints the aggregate statistics snapshot
pub fn print_stats(stats: &StatsSnapshot) {
    println!("\n=== Statistics ===");
    println!(
        "Planned structures: {} across {} guilds",
        stats.totals.planned_count, stats.totals.guild_count
    );
    println!(
        "Totals: {} faction pts, {} guild pts, chaos {}+{}%",
        stats.totals.faction_points,
        stats.totals.guild_points,
        stats.totals.chaos_base,
        stats.totals.chaos_percent
    );
    println!(
        "North: {} pts ({} guilds) | South: {} pts ({} guilds)",
        stats.factions.north.total_points,
        stats.factions.north.guilds_involved.len(),
        stats.factions.south.total_points,
        stats.factions.south.guilds_involved.len()
    );

    if !stats.guilds.is_empty() {
        println!("\nPer guild:");
        for (guild, g) in &stats.guilds {
            println!(
                "  {:<20} {:>5} faction pts, {:>5} guild pts, {} structures, {} lobbies",
                format_guild_label(guild, g.guild_faction.as_str()),
                g.faction_points,
                g.guild_points,
                g.structures.len(),
                g.lobbies.len()
            );
            for warning in &g.lobby_bonuses.duplicate_warnings {
                println!("    ! {}", warning);
            }
        }
    }

    println!("\nTimeline:");
    for bucket in &stats.timeline {
        println!(
            "  Week {} ({}): {} planned",
            bucket.week, bucket.label, bucket.planned
        );
    }
}

/// Prints structures claimed by more than one guild
pub fn print_conflicts(state: &PlannerState) {
    let conflicts = state.conflicts();
    if conflicts.is_empty() {
        println!("\nNo planning conflicts.");
        return;
    }

    println!("\n=== Conflicts ({}) ===", conflicts.len());
    for (index, guilds) in conflicts {
        let occupation = state
            .structure(*index)
            .map(|s| s.occupation.as_str())
            .unwrap_or("unknown structure");
        println!("  #{} {}: {}", index, occupation, guilds.join(", "));
    }
}
