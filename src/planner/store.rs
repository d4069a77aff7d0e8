use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::VERSION;
use crate::parser::StructureRecord;
use crate::persist::{
    decode_share, encode_share, KeyValueStore, SharedState, FACTION_KEY, FAVORITES_KEY,
    PLANNINGS_KEY, SETTINGS_KEY, START_DATE_KEY,
};
use crate::planner::bus::{StateBus, Subscription};
use crate::planner::cache::TtlCache;
use crate::planner::conflicts::detect_conflicts;
use crate::planner::debounce::Debouncer;
use crate::planner::history::History;
use crate::planner::stats::{build_stats, StatsSnapshot};
use crate::planner::status::structure_status;
use crate::planner::types::{
    Faction, Favorite, HistoryAction, HistoryEntry, Planning, Settings, StructureStatus,
};

const SAVE_SETTINGS_JOB: &str = "save_settings";

fn json_of<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The single session state container. Owns the catalog, the planning claims,
/// the derived conflict set, favorites, history, settings, cache and the
/// persistence handle; presentation layers read and mutate exclusively
/// through it.
///
/// Every planning mutation runs the same strictly-ordered sequence:
/// history record, store write, cache invalidation, persistence flush,
/// conflict recompute, subscriber notification. Consumers observing a
/// notification therefore see plannings and conflicts already consistent.
pub struct PlannerState {
    catalog: Vec<StructureRecord>,
    plannings: BTreeMap<usize, Vec<Planning>>,
    conflicts: BTreeMap<usize, Vec<String>>,
    favorites: BTreeSet<Favorite>,
    start_date: Option<NaiveDate>,
    user_faction: Faction,
    settings: Settings,
    history: History,
    cache: TtlCache,
    bus: StateBus,
    debounce: Debouncer,
    store: Box<dyn KeyValueStore>,
}

impl PlannerState {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        PlannerState {
            catalog: Vec::new(),
            plannings: BTreeMap::new(),
            conflicts: BTreeMap::new(),
            favorites: BTreeSet::new(),
            start_date: None,
            user_faction: Faction::North,
            settings: Settings::default(),
            history: History::new(),
            cache: TtlCache::new(),
            bus: StateBus::new(),
            debounce: Debouncer::new(),
            store,
        }
    }

    /// Restores plannings, favorites, event config and settings from the
    /// key-value store. Unreadable entries are skipped; a broken save never
    /// prevents startup.
    pub fn load_saved(&mut self) {
        if let Some(raw) = self.store.get(PLANNINGS_KEY) {
            match serde_json::from_str(&raw) {
                Ok(plannings) => self.plannings = plannings,
                Err(e) => log::error!("ignoring saved plannings: {}", e),
            }
        }
        if let Some(raw) = self.store.get(FAVORITES_KEY) {
            match serde_json::from_str::<Vec<Favorite>>(&raw) {
                Ok(favorites) => self.favorites = favorites.into_iter().collect(),
                Err(e) => log::error!("ignoring saved favorites: {}", e),
            }
        }
        if let Some(raw) = self.store.get(START_DATE_KEY) {
            self.start_date = raw.trim().trim_matches('"').parse().ok();
        }
        if let Some(raw) = self.store.get(FACTION_KEY) {
            if let Some(faction) = Faction::from_loose(&raw) {
                self.user_faction = faction;
            }
        }
        if let Some(raw) = self.store.get(SETTINGS_KEY) {
            match serde_json::from_str(&raw) {
                Ok(settings) => self.settings = settings,
                Err(e) => log::error!("ignoring saved settings: {}", e),
            }
        }
        self.refresh_conflicts();
    }

    // ---- catalog ----

    pub fn set_catalog(&mut self, catalog: Vec<StructureRecord>) {
        self.catalog = catalog;
        self.cache.clear();
        self.refresh_conflicts();
    }

    pub fn catalog(&self) -> &[StructureRecord] {
        &self.catalog
    }

    pub fn structure(&self, index: usize) -> Option<&StructureRecord> {
        self.catalog.get(index)
    }

    // ---- planning mutations ----

    /// Records or updates a claim at `index`. Each call appends one claim, so
    /// a second guild (or a resubmission by the same guild) shows up in the
    /// conflict set rather than silently replacing the first claim.
    pub fn set_planning(&mut self, index: usize, planning: Planning) -> HistoryAction {
        let old = json_of(&self.plannings);

        let claims = self.plannings.entry(index).or_default();
        let action = if claims.is_empty() {
            HistoryAction::Add
        } else {
            HistoryAction::Edit
        };
        self.history.record(HistoryEntry {
            action,
            index,
            previous: claims.last().cloned(),
            new: Some(planning.clone()),
            timestamp: now_ms(),
        });
        claims.push(planning);

        self.finish_mutation(old);
        action
    }

    /// Removes all claims at `index`. No-op when nothing is planned there.
    pub fn remove_planning(&mut self, index: usize) -> Option<Planning> {
        if !self.plannings.contains_key(&index) {
            return None;
        }
        let old = json_of(&self.plannings);

        let claims = self.plannings.remove(&index)?;
        let removed = claims.last().cloned();
        self.history.record(HistoryEntry {
            action: HistoryAction::Remove,
            index,
            previous: removed.clone(),
            new: None,
            timestamp: now_ms(),
        });

        self.finish_mutation(old);
        removed
    }

    /// Current claim for a structure (the most recent one), if any.
    pub fn get_planning(&self, index: usize) -> Option<&Planning> {
        self.plannings.get(&index).and_then(|claims| claims.last())
    }

    /// All claims for a structure in submission order.
    pub fn claims(&self, index: usize) -> &[Planning] {
        self.plannings.get(&index).map_or(&[], |claims| claims.as_slice())
    }

    pub fn plannings(&self) -> &BTreeMap<usize, Vec<Planning>> {
        &self.plannings
    }

    /// Inserts plannings only where no claim exists yet; never overwrites.
    /// One persistence flush for the whole batch, and the batch is not
    /// individually undoable.
    pub fn batch_add(&mut self, entries: Vec<(usize, Planning)>) -> usize {
        let old = json_of(&self.plannings);
        let mut added = 0;

        for (index, planning) in entries {
            if !self.plannings.contains_key(&index) {
                self.plannings.insert(index, vec![planning]);
                added += 1;
            }
        }

        if added > 0 {
            self.finish_mutation(old);
        }
        added
    }

    /// Removes every claim made by `guild`; returns the number removed.
    pub fn clear_by_guild(&mut self, guild: &str) -> usize {
        self.clear_claims(|planning| planning.guild == guild)
    }

    /// Removes every claim dated within [start, end]; returns the number
    /// removed.
    pub fn clear_by_date_range(&mut self, start: NaiveDate, end: NaiveDate) -> usize {
        self.clear_claims(|planning| planning.date >= start && planning.date <= end)
    }

    fn clear_claims<F: Fn(&Planning) -> bool>(&mut self, matches: F) -> usize {
        let old = json_of(&self.plannings);
        let mut removed = 0;

        for claims in self.plannings.values_mut() {
            let before = claims.len();
            claims.retain(|planning| !matches(planning));
            removed += before - claims.len();
        }
        self.plannings.retain(|_, claims| !claims.is_empty());

        if removed > 0 {
            self.finish_mutation(old);
        }
        removed
    }

    /// Shared tail of every planning mutation; see the struct docs for why
    /// this order is fixed.
    fn finish_mutation(&mut self, old: Value) {
        self.cache.clear();
        self.persist_plannings();
        self.refresh_conflicts();
        self.bus.notify("plannings", &json_of(&self.plannings), &old);
    }

    // ---- history ----

    /// Reverts the most recent mutation. Returns the inverted entry, or None
    /// when there is nothing to undo.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.history.undo()?;
        let old = json_of(&self.plannings);

        match entry.action {
            HistoryAction::Add | HistoryAction::Edit => {
                // Drop the claim this entry appended. A non-historied bulk
                // clear may already have removed it; only pop a matching tail
                // so an unrelated claim is never deleted.
                if let Some(claims) = self.plannings.get_mut(&entry.index) {
                    if claims.last() == entry.new.as_ref() {
                        claims.pop();
                    }
                    if claims.is_empty() {
                        self.plannings.remove(&entry.index);
                    }
                }
            }
            HistoryAction::Remove => {
                if let Some(previous) = entry.previous.clone() {
                    self.plannings.entry(entry.index).or_default().push(previous);
                }
            }
        }

        self.finish_mutation(old);
        Some(entry)
    }

    /// Re-applies the most recently undone mutation.
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.history.redo()?;
        let old = json_of(&self.plannings);

        match entry.action {
            HistoryAction::Add | HistoryAction::Edit => {
                if let Some(new) = entry.new.clone() {
                    self.plannings.entry(entry.index).or_default().push(new);
                }
            }
            HistoryAction::Remove => {
                self.plannings.remove(&entry.index);
            }
        }

        self.finish_mutation(old);
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // ---- derived state ----

    pub fn conflicts(&self) -> &BTreeMap<usize, Vec<String>> {
        &self.conflicts
    }

    pub fn status_of(&self, index: usize, today: NaiveDate) -> StructureStatus {
        let Some(structure) = self.catalog.get(index) else {
            return StructureStatus::Locked;
        };
        structure_status(
            structure.opening_day,
            self.plannings.contains_key(&index),
            self.conflicts.contains_key(&index),
            self.start_date,
            today,
        )
    }

    pub fn stats(&self, today: NaiveDate) -> StatsSnapshot {
        build_stats(
            &self.catalog,
            &self.plannings,
            &self.conflicts,
            self.start_date,
            today,
        )
    }

    fn refresh_conflicts(&mut self) {
        let next = detect_conflicts(&self.plannings);
        if next != self.conflicts {
            let old = json_of(&self.conflicts);
            self.conflicts = next;
            self.bus.notify("conflicts", &json_of(&self.conflicts), &old);
        }
    }

    // ---- favorites ----

    /// Adds or removes a favorite; returns true when it is now set.
    pub fn toggle_favorite(&mut self, favorite: Favorite) -> bool {
        let old = json_of(&self.favorites);
        let now_set = if self.favorites.contains(&favorite) {
            self.favorites.remove(&favorite);
            false
        } else {
            self.favorites.insert(favorite);
            true
        };
        self.persist_favorites();
        self.bus.notify("favorites", &json_of(&self.favorites), &old);
        now_set
    }

    pub fn favorites(&self) -> &BTreeSet<Favorite> {
        &self.favorites
    }

    // ---- event config and settings ----

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) {
        let old = json_of(&self.start_date);
        self.start_date = date;
        // Status and stats depend on the start date
        self.cache.clear();
        self.persist_config();
        self.bus.notify("start_date", &json_of(&self.start_date), &old);
    }

    pub fn user_faction(&self) -> Faction {
        self.user_faction
    }

    pub fn set_user_faction(&mut self, faction: Faction) {
        let old = json_of(&self.user_faction);
        self.user_faction = faction;
        self.persist_config();
        self.bus.notify("user_faction", &json_of(&self.user_faction), &old);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Applies new settings immediately; the flush to storage is debounced so
    /// a burst of slider tweaks coalesces into one write.
    pub fn set_settings(&mut self, settings: Settings) {
        let old = json_of(&self.settings);
        self.settings = settings;
        self.debounce.schedule_default(SAVE_SETTINGS_JOB);
        self.bus.notify("settings", &json_of(&self.settings), &old);
    }

    /// Runs any debounced jobs whose window has elapsed. Cheap; called at the
    /// top of every request cycle.
    pub fn run_pending(&mut self) {
        for job in self.debounce.take_due() {
            self.dispatch_job(&job);
        }
    }

    /// Runs all debounced jobs regardless of their window. Called on
    /// shutdown so a trailing settings write is not lost.
    pub fn flush_pending(&mut self) {
        for job in self.debounce.drain() {
            self.dispatch_job(&job);
        }
    }

    fn dispatch_job(&mut self, job: &str) {
        match job {
            SAVE_SETTINGS_JOB => self.persist_settings(),
            other => log::warn!("unknown debounced job '{}'", other),
        }
    }

    #[cfg(test)]
    pub fn settings_save_pending(&self) -> bool {
        self.debounce.is_pending(SAVE_SETTINGS_JOB)
    }

    // ---- cache ----

    pub fn cache_get(&mut self, key: &str) -> Option<Value> {
        self.cache.get(key)
    }

    pub fn cache_set(&mut self, key: &str, value: Value, ttl: Option<Duration>) {
        self.cache.set(key, value, ttl);
    }

    // ---- subscriptions ----

    pub fn subscribe<F>(&mut self, property: &str, callback: F) -> Subscription
    where
        F: Fn(&Value, &Value) + Send + 'static,
    {
        self.bus.subscribe(property, callback)
    }

    pub fn unsubscribe(&mut self, subscription: &Subscription) {
        self.bus.unsubscribe(subscription);
    }

    // ---- bulk state ----

    /// Clears all planning data while keeping the catalog and settings.
    pub fn reset_all(&mut self) {
        let old = json_of(&self.plannings);
        self.plannings.clear();
        self.favorites.clear();
        self.conflicts.clear();
        self.history.clear();
        self.persist_favorites();
        self.finish_mutation(old);
    }

    pub fn export_state(&self) -> SharedState {
        SharedState {
            plannings: self.plannings.clone(),
            eden_start_date: self.start_date,
            user_faction: self.user_faction,
            timestamp: now_ms(),
            version: VERSION.to_string(),
        }
    }

    pub fn import_state(&mut self, shared: SharedState) {
        let old = json_of(&self.plannings);
        self.plannings = shared.plannings;
        self.start_date = shared.eden_start_date;
        self.user_faction = shared.user_faction;
        self.persist_config();
        self.finish_mutation(old);
    }

    /// Produces the base64 payload for a share link.
    pub fn share_payload(&self) -> Option<String> {
        match encode_share(&self.export_state()) {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::error!("failed to encode share payload: {}", e);
                None
            }
        }
    }

    /// Applies a share link payload. Returns false (and applies nothing) when
    /// the payload cannot be decoded.
    pub fn import_share(&mut self, encoded: &str) -> bool {
        match decode_share(encoded) {
            Some(shared) => {
                self.import_state(shared);
                true
            }
            None => false,
        }
    }

    // ---- persistence (best-effort; in-memory state stays authoritative) ----

    fn persist_plannings(&mut self) {
        match serde_json::to_string(&self.plannings) {
            Ok(json) => {
                if let Err(e) = self.store.set(PLANNINGS_KEY, &json) {
                    log::error!("failed to save plannings: {}", e);
                }
            }
            Err(e) => log::error!("failed to serialize plannings: {}", e),
        }
    }

    fn persist_favorites(&mut self) {
        let favorites: Vec<&Favorite> = self.favorites.iter().collect();
        match serde_json::to_string(&favorites) {
            Ok(json) => {
                if let Err(e) = self.store.set(FAVORITES_KEY, &json) {
                    log::error!("failed to save favorites: {}", e);
                }
            }
            Err(e) => log::error!("failed to serialize favorites: {}", e),
        }
    }

    fn persist_config(&mut self) {
        let date = self.start_date.map(|d| d.to_string()).unwrap_or_default();
        if let Err(e) = self.store.set(START_DATE_KEY, &date) {
            log::error!("failed to save start date: {}", e);
        }
        if let Err(e) = self.store.set(FACTION_KEY, self.user_faction.as_str()) {
            log::error!("failed to save faction: {}", e);
        }
    }

    fn persist_settings(&mut self) {
        match serde_json::to_string(&self.settings) {
            Ok(json) => {
                if let Err(e) = self.store.set(SETTINGS_KEY, &json) {
                    log::error!("failed to save settings: {}", e);
                }
            }
            Err(e) => log::error!("failed to serialize settings: {}", e),
        }
    }
}
