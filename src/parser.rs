use csv::Reader;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// One capturable structure from the Eden catalog. Identified by its position
/// in the loaded list; the catalog is immutable for the session once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureRecord {
    pub occupation: String,
    pub x: u32,
    pub y: u32,
    pub faction: String,
    pub sector: String,
    pub zone: String,
    pub opening_day: u32,
    pub faction_value: u32,
    pub guild_value: u32,
    pub durability: u32,
    pub loyalty: u32,
    pub production: u32,
}

impl StructureRecord {
    pub fn coordinates(&self) -> String {
        format!("{}:{}", self.x, self.y)
    }
}

/// Parses a number, returning 0 if empty or invalid
fn parse_number(value: &str) -> u32 {
    value.trim().parse().unwrap_or(0)
}

/// Loads the structure catalog from a CSV file
pub fn load_structures<P: AsRef<Path>>(csv_path: P) -> Result<Vec<StructureRecord>, PlannerError> {
    let reader = Reader::from_path(csv_path)?;
    parse_structures(reader)
}

/// Loads the structure catalog from raw CSV bytes (admin upload path)
pub fn load_structures_from_bytes(bytes: &[u8]) -> Result<Vec<StructureRecord>, PlannerError> {
    let reader = Reader::from_reader(bytes);
    parse_structures(reader)
}

fn parse_structures<R: Read>(mut reader: Reader<R>) -> Result<Vec<StructureRecord>, PlannerError> {
    let headers = reader.headers()?.clone();

    // Find column indices by header name so column order in the sheet can
    // change without breaking ingestion
    let find = |needle: &str, fallback: usize| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(needle))
            .unwrap_or(fallback)
    };

    let occupation_col = find("Occupation", 0);
    let x_col = find("X", 1);
    let y_col = find("Y", 2);
    let faction_col = find("Faction", 3);
    let sector_col = find("Sector", 4);
    let zone_col = find("Zone", 5);
    let day_col = find("Day", 6);
    let faction_value_col = find("Faction value", 7);
    let guild_value_col = find("Occupation value", 8);
    let durability_col = find("Durability", 9);
    let loyalty_col = find("Loyalty", 10);
    let production_col = find("Production", 11);

    let mut structures = Vec::new();

    for result in reader.records() {
        let record = result?;

        let occupation = record.get(occupation_col).unwrap_or("").trim().to_string();
        if occupation.is_empty() {
            continue; // Skip incomplete rows
        }

        let get = |col: usize| record.get(col).unwrap_or("");

        structures.push(StructureRecord {
            occupation,
            x: parse_number(get(x_col)).min(crate::config::MAP_SIZE),
            y: parse_number(get(y_col)).min(crate::config::MAP_SIZE),
            faction: get(faction_col).trim().to_string(),
            sector: get(sector_col).trim().to_string(),
            zone: get(zone_col).trim().to_string(),
            opening_day: parse_number(get(day_col)),
            faction_value: parse_number(get(faction_value_col)),
            guild_value: parse_number(get(guild_value_col)),
            durability: parse_number(get(durability_col)),
            loyalty: parse_number(get(loyalty_col)),
            production: parse_number(get(production_col)),
        });
    }

    Ok(structures)
}

/// Small built-in catalog for offline/demo mode when no CSV is available
pub fn example_structures() -> Vec<StructureRecord> {
    vec![
        StructureRecord {
            occupation: "Stronghold".to_string(),
            x: 150,
            y: 200,
            faction: "North".to_string(),
            sector: "1".to_string(),
            zone: "1".to_string(),
            opening_day: 1,
            faction_value: 100,
            guild_value: 50,
            durability: 1000,
            loyalty: 500,
            production: 200,
        },
        StructureRecord {
            occupation: "Capitol Lv5".to_string(),
            x: 1402,
            y: 1263,
            faction: "South".to_string(),
            sector: "2".to_string(),
            zone: "2".to_string(),
            opening_day: 7,
            faction_value: 100,
            guild_value: 300,
            durability: 2000,
            loyalty: 1000,
            production: 400,
        },
        StructureRecord {
            occupation: "King Cnut Lobby".to_string(),
            x: 820,
            y: 640,
            faction: "Neutral".to_string(),
            sector: "3".to_string(),
            zone: "2".to_string(),
            opening_day: 14,
            faction_value: 0,
            guild_value: 0,
            durability: 1500,
            loyalty: 800,
            production: 0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_rows() {
        let csv = "Occupation,X,Y,Faction,Sector,Zone,Day,Faction value,Occupation value,Durability,Loyalty,Production\n\
                   Stronghold,150,200,North,1,1,1,100,50,1000,500,200\n\
                   Capitol Lv5,1402,1263,South,2,2,7,100,300,2000,1000,400\n";
        let structures = load_structures_from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(structures.len(), 2);
        assert_eq!(structures[0].occupation, "Stronghold");
        assert_eq!(structures[0].opening_day, 1);
        assert_eq!(structures[1].guild_value, 300);
        assert_eq!(structures[1].coordinates(), "1402:1263");
    }

    #[test]
    fn finds_columns_regardless_of_order() {
        let csv = "Day,Occupation,Faction value,X,Y,Faction,Sector,Zone,Occupation value,Durability,Loyalty,Production\n\
                   3,Small Town Lv2,40,10,20,North,1,1,25,500,100,50\n";
        let structures = load_structures_from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(structures[0].opening_day, 3);
        assert_eq!(structures[0].occupation, "Small Town Lv2");
        assert_eq!(structures[0].faction_value, 40);
        assert_eq!(structures[0].guild_value, 25);
    }

    #[test]
    fn garbage_numerics_default_to_zero() {
        let csv = "Occupation,X,Y,Faction,Sector,Zone,Day,Faction value,Occupation value,Durability,Loyalty,Production\n\
                   Check Point Lv1,abc,,North,1,1,n/a,-5,1e3,,,\n";
        let structures = load_structures_from_bytes(csv.as_bytes()).unwrap();
        let s = &structures[0];
        assert_eq!(s.x, 0);
        assert_eq!(s.y, 0);
        assert_eq!(s.opening_day, 0);
        assert_eq!(s.faction_value, 0);
        assert_eq!(s.guild_value, 0);
    }

    #[test]
    fn skips_rows_without_occupation() {
        let csv = "Occupation,X,Y,Faction,Sector,Zone,Day,Faction value,Occupation value,Durability,Loyalty,Production\n\
                   ,1,2,North,1,1,1,1,1,1,1,1\n\
                   Stronghold,1,2,North,1,1,1,1,1,1,1,1\n";
        let structures = load_structures_from_bytes(csv.as_bytes()).unwrap();
        assert_eq!(structures.len(), 1);
    }
}
