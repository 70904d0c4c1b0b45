//! Identity correlation between agent-reported and terminal session ids.
//!
//! Agents report an external id plus their working directory; the terminal
//! side reports pane ids plus the pane's working directory. Two records with
//! the same raw cwd string become a mapping. The mapping is injective both
//! ways and is never overwritten: once either side is mapped it no longer
//! takes part in matching, and only [`IdentityCorrelator::unregister_terminal`]
//! dissolves a pair.
//!
//! Mappings are written through to `session-map.json` as soon as they are
//! made or removed. Unmatched registrations live in memory only and are
//! rebuilt from fresh registrations after a restart.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hud_core::{ExternalId, IdentityMapping, TerminalId};

use crate::persist::{load_json, save_json};

/// On-disk layout of `session-map.json`.
#[derive(Debug, Serialize, Deserialize)]
struct MappingDocument {
    mapping: BTreeMap<ExternalId, TerminalId>,
    updated: DateTime<Utc>,
}

/// A registration waiting for (or holding) a partner.
#[derive(Debug, Clone)]
struct Registration {
    cwd: String,
    /// Registration order, lower matches first
    seq: u64,
}

/// Bidirectional external ↔ terminal id mapping keyed by working directory.
#[derive(Debug, Default)]
pub struct IdentityCorrelator {
    path: Option<PathBuf>,
    externals: HashMap<ExternalId, Registration>,
    terminals: HashMap<TerminalId, Registration>,
    by_external: HashMap<ExternalId, IdentityMapping>,
    by_terminal: HashMap<TerminalId, ExternalId>,
    next_seq: u64,
}

impl IdentityCorrelator {
    /// Creates a correlator that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads confirmed mappings from `path`; missing or corrupt → empty.
    pub fn load(path: &Path) -> Self {
        let mut correlator = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        let Some(doc) = load_json::<MappingDocument>(path) else {
            return correlator;
        };

        for (external_id, terminal_id) in doc.mapping {
            if correlator.by_terminal.contains_key(&terminal_id) {
                warn!(
                    external_id = %external_id,
                    terminal_id = %terminal_id,
                    "Duplicate terminal in session map, skipping"
                );
                continue;
            }
            let mapping = IdentityMapping::new(
                external_id.clone(),
                terminal_id.clone(),
                String::new(),
                doc.updated,
            );
            correlator.by_terminal.insert(terminal_id, external_id.clone());
            correlator.by_external.insert(external_id, mapping);
        }

        info!(
            path = %path.display(),
            mappings = correlator.by_external.len(),
            "Loaded session map"
        );
        correlator
    }

    /// Records an agent's working directory and tries to pair it.
    ///
    /// Returns the partner terminal id, existing or newly matched.
    pub fn register_external(&mut self, external_id: ExternalId, cwd: &str) -> Option<TerminalId> {
        if let Some(existing) = self.lookup_by_external(&external_id) {
            return Some(existing.clone());
        }

        let seq = self.bump_seq();
        self.externals
            .entry(external_id.clone())
            .and_modify(|r| r.cwd = cwd.to_string())
            .or_insert(Registration {
                cwd: cwd.to_string(),
                seq,
            });

        let terminal_id = first_unmapped(&self.terminals, &self.by_terminal, cwd)?;
        self.establish(external_id, terminal_id.clone(), cwd);
        Some(terminal_id)
    }

    /// Records a terminal session's working directory and tries to pair it.
    ///
    /// Returns the partner external id, existing or newly matched.
    pub fn register_terminal(&mut self, terminal_id: TerminalId, cwd: &str) -> Option<ExternalId> {
        if let Some(existing) = self.lookup_by_terminal(&terminal_id) {
            return Some(existing.clone());
        }

        let seq = self.bump_seq();
        self.terminals
            .entry(terminal_id.clone())
            .and_modify(|r| r.cwd = cwd.to_string())
            .or_insert(Registration {
                cwd: cwd.to_string(),
                seq,
            });

        let external_id = first_unmapped(&self.externals, &self.by_external, cwd)?;
        self.establish(external_id.clone(), terminal_id, cwd);
        Some(external_id)
    }

    pub fn lookup_by_external(&self, external_id: &ExternalId) -> Option<&TerminalId> {
        self.by_external.get(external_id).map(|m| &m.terminal_id)
    }

    pub fn lookup_by_terminal(&self, terminal_id: &TerminalId) -> Option<&ExternalId> {
        self.by_terminal.get(terminal_id)
    }

    /// Full mapping record for an external id.
    pub fn mapping(&self, external_id: &ExternalId) -> Option<&IdentityMapping> {
        self.by_external.get(external_id)
    }

    /// Forgets a closed terminal session and, if it was paired, its partner.
    ///
    /// Returns the external id that was unpaired.
    pub fn unregister_terminal(&mut self, terminal_id: &TerminalId) -> Option<ExternalId> {
        self.terminals.remove(terminal_id);

        let external_id = self.by_terminal.remove(terminal_id)?;
        self.by_external.remove(&external_id);
        self.externals.remove(&external_id);

        info!(
            terminal_id = %terminal_id,
            external_id = %external_id,
            "Identity mapping removed"
        );
        self.persist();
        Some(external_id)
    }

    /// Terminal ids that currently hold a mapping.
    pub fn mapped_terminals(&self) -> Vec<TerminalId> {
        self.by_terminal.keys().cloned().collect()
    }

    /// Number of confirmed mappings.
    pub fn len(&self) -> usize {
        self.by_external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_external.is_empty()
    }

    /// Writes the current mappings to disk.
    pub fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let doc = MappingDocument {
            mapping: self
                .by_external
                .iter()
                .map(|(e, m)| (e.clone(), m.terminal_id.clone()))
                .collect(),
            updated: Utc::now(),
        };

        if let Err(e) = save_json(path, &doc) {
            warn!(error = %e, "Failed to save session map");
        }
    }

    fn establish(&mut self, external_id: ExternalId, terminal_id: TerminalId, cwd: &str) {
        info!(
            external_id = %external_id.short(),
            terminal_id = %terminal_id,
            cwd,
            "Identity mapping established"
        );
        self.by_terminal
            .insert(terminal_id.clone(), external_id.clone());
        self.by_external.insert(
            external_id.clone(),
            IdentityMapping::new(external_id, terminal_id, cwd, Utc::now()),
        );
        self.persist();
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Earliest registered, still unmapped id with exactly this cwd.
///
/// An empty cwd never matches: it means the reporter did not know its
/// directory, not that two sessions share one.
fn first_unmapped<K, V>(
    registrations: &HashMap<K, Registration>,
    mapped: &HashMap<K, V>,
    cwd: &str,
) -> Option<K>
where
    K: Clone + Eq + std::hash::Hash,
{
    if cwd.is_empty() {
        debug!("Empty cwd, skipping identity match");
        return None;
    }

    registrations
        .iter()
        .filter(|(id, r)| r.cwd == cwd && !mapped.contains_key(*id))
        .min_by_key(|(_, r)| r.seq)
        .map(|(id, _)| id.clone())
}
