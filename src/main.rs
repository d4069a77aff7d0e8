mod config;
mod display;
mod error;
mod parser;
mod persist;
mod planner;
mod web;

use std::path::PathBuf;

use chrono::Local;

use parser::{example_structures, load_structures};
use persist::{FileStore, MemoryStore};
use planner::PlannerState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Check if we should run in web mode
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "web" {
        let port = args.get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let password = std::env::var("ADMIN_PASSWORD")
            .unwrap_or_else(|_| "admin123".to_string()); // Default password, change this!
        let data_dir = std::env::var("EDEN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        println!("Starting web server on port {}...", port);
        println!("Admin password: {}", password);
        println!("Access the site at http://localhost:{}", port);

        web::start_server(port, password, data_dir).await?;
        return Ok(());
    }

    // CLI mode: load a catalog and print the current plan on stdout
    let mut state = PlannerState::new(Box::new(MemoryStore::new()));
    match args.get(1) {
        Some(csv_path) => {
            println!("Loading structures from {}...", csv_path);
            let structures = load_structures(csv_path)?;
            println!("Loaded {} structures", structures.len());
            state.set_catalog(structures);
        }
        None => {
            println!("No CSV given, using built-in example catalog");
            state.set_catalog(example_structures());
        }
    }

    // Pick up any state a previous web session saved
    let data_dir = std::env::var("EDEN_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    if data_dir.exists() {
        let mut persisted = PlannerState::new(Box::new(FileStore::new(&data_dir)));
        persisted.load_saved();
        let catalog = state.catalog().to_vec();
        persisted.set_catalog(catalog);
        state = persisted;
    }

    let today = Local::now().date_naive();
    println!("Next occupation day: {}", planner::status::next_occupation_day(today));
    display::print_overview(&state, today);
    display::print_stats(&state.stats(today));
    display::print_conflicts(&state);

    state.flush_pending();
    Ok(())
}
