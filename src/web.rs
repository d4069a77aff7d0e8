use actix_files::Files;
use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::EVENT_WEEKS;
use crate::parser::{example_structures, load_structures, load_structures_from_bytes};
use crate::persist::FileStore;
use crate::planner::bus::Subscription;
use crate::planner::simulator::{analyze_conflicts, optimize_points, plan_routes, project_what_if};
use crate::planner::types::{Faction, Favorite, Planning, Priority, Settings};
use crate::planner::validate::{normalize_date, validate_planning};
use crate::planner::PlannerState;

const STATS_CACHE_KEY: &str = "edenStats";

/// Shared server state: the session container behind a mutex, plus the
/// catalog refresh guard (two concurrent uploads must not interleave).
pub struct AppState {
    pub planner: Mutex<PlannerState>,
    pub refresh_in_progress: AtomicBool,
    pub admin_password: String,
    pub catalog_path: PathBuf,
    conflict_listener: Mutex<Option<Subscription>>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Keeps the conflict log listener in line with the notify_conflict setting.
fn sync_conflict_listener(planner: &mut PlannerState, slot: &mut Option<Subscription>) {
    if planner.settings().notify_conflict {
        if slot.is_none() {
            *slot = Some(planner.subscribe("conflicts", |new, _old| {
                log::info!("conflict set changed: {}", new);
            }));
        }
    } else if let Some(sub) = slot.take() {
        planner.unsubscribe(&sub);
    }
}

#[derive(Serialize)]
struct StructureView {
    index: usize,
    occupation: String,
    coordinates: String,
    faction: String,
    sector: String,
    zone: String,
    opening_day: u32,
    faction_value: u32,
    guild_value: u32,
    status: String,
    planning: Option<Planning>,
}

#[derive(Deserialize)]
pub struct PlanningRequest {
    guild: String,
    guild_faction: Option<Faction>,
    date: NaiveDate,
    time: Option<String>,
    banner: Option<String>,
    priority: Option<Priority>,
    notes: Option<String>,
}

impl PlanningRequest {
    fn into_planning(self, default_faction: Faction) -> Planning {
        Planning {
            guild: self.guild,
            guild_faction: self.guild_faction.unwrap_or(default_faction),
            date: self.date,
            time: self.time.unwrap_or_else(|| "00:00".to_string()),
            banner: self.banner.filter(|b| !b.trim().is_empty()),
            priority: self.priority.unwrap_or_default(),
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        }
    }
}

#[derive(Deserialize)]
struct BatchRequest {
    entries: Vec<BatchEntry>,
}

#[derive(Deserialize)]
struct BatchEntry {
    index: usize,
    #[serde(flatten)]
    planning: PlanningRequest,
}

#[derive(Deserialize)]
struct ClearGuildRequest {
    guild: String,
}

#[derive(Deserialize)]
struct ClearRangeRequest {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct ConfigRequest {
    // Absent leaves the start date alone; an explicit null clears it
    #[serde(default, deserialize_with = "present_field")]
    start_date: Option<Option<NaiveDate>>,
    user_faction: Option<Faction>,
    settings: Option<Settings>,
}

fn present_field<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct ImportRequest {
    data: String,
}

#[derive(Deserialize)]
struct SimulateQuery {
    #[serde(rename = "type", default = "default_sim_type")]
    sim_type: String,
    #[serde(default = "default_sim_week")]
    week: u32,
    #[serde(default = "default_sim_guilds")]
    guilds: usize,
}

fn default_sim_type() -> String {
    "points".to_string()
}

fn default_sim_week() -> u32 {
    EVENT_WEEKS
}

fn default_sim_guilds() -> usize {
    5
}

// HTML page handler
async fn index() -> Result<HttpResponse> {
    let html = include_str!("../templates/index.html");
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

// Catalog with derived status per structure
async fn get_structures(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    planner.run_pending();
    let now = today();

    let views: Vec<StructureView> = planner
        .catalog()
        .iter()
        .enumerate()
        .map(|(index, s)| StructureView {
            index,
            occupation: s.occupation.clone(),
            coordinates: s.coordinates(),
            faction: s.faction.clone(),
            sector: s.sector.clone(),
            zone: s.zone.clone(),
            opening_day: s.opening_day,
            faction_value: s.faction_value,
            guild_value: s.guild_value,
            status: planner.status_of(index, now).label().to_string(),
            planning: planner.get_planning(index).cloned(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(views))
}

// Single structure with all claims and conflicting guilds
async fn get_structure(
    path: web::Path<usize>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let index = path.into_inner();
    let mut planner = state.planner.lock().unwrap();
    planner.run_pending();

    let Some(structure) = planner.structure(index).cloned() else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "Unknown structure"})));
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "index": index,
        "structure": structure,
        "status": planner.status_of(index, today()).label(),
        "claims": planner.claims(index),
        "conflicting_guilds": planner.conflicts().get(&index),
    })))
}

// Save or update a planning for one structure
async fn save_planning(
    path: web::Path<usize>,
    req: web::Json<PlanningRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let index = path.into_inner();
    let mut planner = state.planner.lock().unwrap();
    planner.run_pending();

    let mut planning = req.into_inner().into_planning(planner.user_faction());

    // Date problems are auto-corrected, everything else is rejected
    let adjusted = normalize_date(&mut planning);
    let errors = validate_planning(&planning);
    if !errors.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "errors": errors,
        })));
    }

    let action = planner.set_planning(index, planning);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "action": action,
        "adjusted_date": adjusted,
        "conflicting_guilds": planner.conflicts().get(&index),
    })))
}

async fn delete_planning(
    path: web::Path<usize>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let index = path.into_inner();
    let mut planner = state.planner.lock().unwrap();
    planner.run_pending();

    match planner.remove_planning(index) {
        Some(removed) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "removed": removed,
        }))),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": "No planning at that index",
        }))),
    }
}

// Bulk insert that never overwrites existing plannings
async fn batch_add(
    req: web::Json<BatchRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    planner.run_pending();
    let default_faction = planner.user_faction();

    let entries = req
        .into_inner()
        .entries
        .into_iter()
        .map(|entry| {
            let mut planning = entry.planning.into_planning(default_faction);
            normalize_date(&mut planning);
            (entry.index, planning)
        })
        .collect();

    let added = planner.batch_add(entries);
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "added": added})))
}

async fn clear_by_guild(
    req: web::Json<ClearGuildRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    let removed = planner.clear_by_guild(&req.guild);
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "removed": removed})))
}

async fn clear_by_range(
    req: web::Json<ClearRangeRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    let removed = planner.clear_by_date_range(req.start, req.end);
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "removed": removed})))
}

async fn undo(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    let entry = planner.undo();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "applied": entry.is_some(),
        "entry": entry,
        "can_undo": planner.can_undo(),
        "can_redo": planner.can_redo(),
    })))
}

async fn redo(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    let entry = planner.redo();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "applied": entry.is_some(),
        "entry": entry,
        "can_undo": planner.can_undo(),
        "can_redo": planner.can_redo(),
    })))
}

async fn history_info(state: web::Data<AppState>) -> Result<HttpResponse> {
    let planner = state.planner.lock().unwrap();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "can_undo": planner.can_undo(),
        "can_redo": planner.can_redo(),
        "entries": planner.history_len(),
    })))
}

// Stats are recomputed at most once per cache window; any planning or
// config mutation drops the cached snapshot
async fn get_stats(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    planner.run_pending();

    if let Some(cached) = planner.cache_get(STATS_CACHE_KEY) {
        return Ok(HttpResponse::Ok().json(cached));
    }

    let stats = serde_json::to_value(planner.stats(today())).unwrap_or(serde_json::Value::Null);
    let ttl = Duration::from_secs(planner.settings().cache_duration_minutes as u64 * 60);
    planner.cache_set(STATS_CACHE_KEY, stats.clone(), Some(ttl));
    Ok(HttpResponse::Ok().json(stats))
}

// What-if analysis over the current plan; pure reads, nothing is mutated
async fn simulate(
    query: web::Query<SimulateQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    planner.run_pending();
    let q = query.into_inner();

    let result = match q.sim_type.as_str() {
        "points" => serde_json::to_value(optimize_points(
            planner.catalog(),
            planner.plannings(),
            q.week,
            q.guilds,
        )),
        "conflict" => serde_json::to_value(analyze_conflicts(
            planner.catalog(),
            planner.plannings(),
            planner.conflicts(),
        )),
        "whatif" => {
            let stats = planner.stats(today());
            serde_json::to_value(project_what_if(
                planner.catalog(),
                planner.plannings(),
                stats.factions.north.total_points,
                stats.factions.south.total_points,
                planner.user_faction(),
                q.week,
                q.guilds,
            ))
        }
        "route" => serde_json::to_value(plan_routes(planner.catalog(), q.week, q.guilds)),
        other => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Unknown simulation type '{}'", other),
            })));
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "type": q.sim_type,
        "week": q.week,
        "guilds": q.guilds,
        "result": result.unwrap_or(serde_json::Value::Null),
    })))
}

async fn get_plannings(state: web::Data<AppState>) -> Result<HttpResponse> {
    let planner = state.planner.lock().unwrap();
    Ok(HttpResponse::Ok().json(planner.plannings()))
}

async fn get_conflicts(state: web::Data<AppState>) -> Result<HttpResponse> {
    let planner = state.planner.lock().unwrap();
    Ok(HttpResponse::Ok().json(planner.conflicts()))
}

async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse> {
    let planner = state.planner.lock().unwrap();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "start_date": planner.start_date(),
        "user_faction": planner.user_faction(),
        "settings": planner.settings(),
    })))
}

async fn set_config(
    req: web::Json<ConfigRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    planner.run_pending();
    let req = req.into_inner();

    if let Some(date) = req.start_date {
        planner.set_start_date(date);
    }
    if let Some(faction) = req.user_faction {
        planner.set_user_faction(faction);
    }
    if let Some(settings) = req.settings {
        planner.set_settings(settings);
        let mut listener = state.conflict_listener.lock().unwrap();
        sync_conflict_listener(&mut planner, &mut listener);
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

async fn get_share(state: web::Data<AppState>) -> Result<HttpResponse> {
    let planner = state.planner.lock().unwrap();
    match planner.share_payload() {
        Some(data) => Ok(HttpResponse::Ok().json(serde_json::json!({"data": data}))),
        None => Ok(HttpResponse::InternalServerError()
            .json(serde_json::json!({"error": "Failed to encode share data"}))),
    }
}

async fn import_share(
    req: web::Json<ImportRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    if planner.import_share(&req.data) {
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": "Invalid share data"})))
    }
}

async fn toggle_favorite(
    req: web::Json<Favorite>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    let favorited = planner.toggle_favorite(req.into_inner());
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "favorited": favorited})))
}

async fn get_favorites(state: web::Data<AppState>) -> Result<HttpResponse> {
    let planner = state.planner.lock().unwrap();
    Ok(HttpResponse::Ok().json(planner.favorites()))
}

async fn reset_all(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut planner = state.planner.lock().unwrap();
    planner.reset_all();
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

// Admin catalog upload. Guarded against concurrent refreshes: a second
// upload while one is processing is rejected instead of interleaving.
async fn admin_upload(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let password = req
        .headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if password != state.admin_password {
        return Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }

    if state
        .refresh_in_progress
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(HttpResponse::Conflict()
            .json(serde_json::json!({"success": false, "error": "Refresh already in progress"})));
    }

    let response = match load_structures_from_bytes(&body) {
        Ok(structures) if !structures.is_empty() => {
            if let Err(e) = std::fs::write(&state.catalog_path, &body) {
                log::error!("failed to save uploaded catalog: {}", e);
            }
            let mut planner = state.planner.lock().unwrap();
            let count = structures.len();
            planner.set_catalog(structures);
            HttpResponse::Ok().json(serde_json::json!({"success": true, "structures": count}))
        }
        Ok(_) => HttpResponse::BadRequest()
            .json(serde_json::json!({"success": false, "error": "No structures in CSV"})),
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": format!("Failed to parse CSV: {}", e),
        })),
    };

    state.refresh_in_progress.store(false, Ordering::SeqCst);
    Ok(response)
}

pub async fn start_server(
    port: u16,
    admin_password: String,
    data_dir: PathBuf,
) -> std::io::Result<()> {
    let catalog_path = data_dir.join("catalog.csv");

    let mut planner = PlannerState::new(Box::new(FileStore::new(&data_dir)));
    planner.load_saved();
    match load_structures(&catalog_path) {
        Ok(structures) if !structures.is_empty() => {
            log::info!("loaded {} structures from {}", structures.len(), catalog_path.display());
            planner.set_catalog(structures);
        }
        _ => {
            log::info!("no saved catalog, using example data");
            planner.set_catalog(example_structures());
        }
    }

    let mut conflict_listener = None;
    sync_conflict_listener(&mut planner, &mut conflict_listener);

    let app_state = web::Data::new(AppState {
        planner: Mutex::new(planner),
        refresh_in_progress: AtomicBool::new(false),
        admin_password,
        catalog_path,
        conflict_listener: Mutex::new(conflict_listener),
    });

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", "static"))
            .route("/", web::get().to(index))
            .route("/api/structures", web::get().to(get_structures))
            .route("/api/structures/{index}", web::get().to(get_structure))
            .route("/api/plannings", web::get().to(get_plannings))
            .route("/api/planning/batch", web::post().to(batch_add))
            .route("/api/planning/{index}", web::post().to(save_planning))
            .route("/api/planning/{index}", web::delete().to(delete_planning))
            .route("/api/clear/guild", web::post().to(clear_by_guild))
            .route("/api/clear/range", web::post().to(clear_by_range))
            .route("/api/undo", web::post().to(undo))
            .route("/api/redo", web::post().to(redo))
            .route("/api/history", web::get().to(history_info))
            .route("/api/stats", web::get().to(get_stats))
            .route("/api/simulate", web::get().to(simulate))
            .route("/api/conflicts", web::get().to(get_conflicts))
            .route("/api/config", web::get().to(get_config))
            .route("/api/config", web::post().to(set_config))
            .route("/api/share", web::get().to(get_share))
            .route("/api/import", web::post().to(import_share))
            .route("/api/favorites", web::get().to(get_favorites))
            .route("/api/favorites/toggle", web::post().to(toggle_favorite))
            .route("/api/reset", web::post().to(reset_all))
            .route("/api/upload", web::post().to(admin_upload))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    // An absent start_date leaves the configured date alone, while an
    // explicit null clears it
    #[test]
    fn config_request_distinguishes_null_from_absent() {
        let absent: ConfigRequest = serde_json::from_str(r#"{"user_faction": "South"}"#).unwrap();
        assert!(absent.start_date.is_none());

        let cleared: ConfigRequest = serde_json::from_str(r#"{"start_date": null}"#).unwrap();
        assert_eq!(cleared.start_date, Some(None));

        let set: ConfigRequest = serde_json::from_str(r#"{"start_date": "2025-06-01"}"#).unwrap();
        assert_eq!(
            set.start_date,
            Some(NaiveDate::from_ymd_opt(2025, 6, 1))
        );
    }

    #[test]
    fn simulate_query_defaults() {
        let query: SimulateQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.sim_type, "points");
        assert_eq!(query.week, EVENT_WEEKS);
        assert_eq!(query.guilds, 5);
    }
}
