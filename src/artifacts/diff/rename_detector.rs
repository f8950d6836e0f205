//! Rename and copy detection over a tree diff
//!
//! Sources are files deleted or modified by the diff, destinations are added files.
//! Exact content matches are paired first, then the remaining pairs are scored by
//! line similarity. A deleted source becomes a RENAME the first time it is paired
//! and a COPY on every later pairing; a modified source always yields a COPY.

use crate::areas::database::Database;
use crate::artifacts::diff::diff_entry::{ChangeType, DiffEntry};
use crate::artifacts::diff::edit_list::{LineCounts, is_binary};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Result;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

/// Minimum similarity, in percent, for a rename or copy
pub const DEFAULT_RENAME_THRESHOLD: u8 = 50;
/// Largest side of the similarity matrix that is still scored
pub const DEFAULT_RENAME_LIMIT: usize = 1000;
/// Id of the empty blob, which never takes part in pairing
const EMPTY_BLOB_ID: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

#[derive(Debug)]
pub struct RenameDetector<'r> {
    database: &'r Database,
    threshold: u8,
    limit: usize,
}

/// A pairing of entry indices: destination takes its content from source
#[derive(Debug, Clone, Copy)]
struct Pairing {
    source: usize,
    destination: usize,
}

impl<'r> RenameDetector<'r> {
    pub fn new(database: &'r Database, threshold: u8, limit: usize) -> Self {
        RenameDetector {
            database,
            threshold,
            limit,
        }
    }

    /// Rewrite paired additions as renames or copies and drop the consumed deletions
    ///
    /// The relative order of `entries` is kept; a renamed file stays at the position
    /// of its new path.
    pub fn detect(&self, entries: Vec<DiffEntry>) -> Result<Vec<DiffEntry>> {
        let sources = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| Self::is_source(entry))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        let destinations = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| Self::is_destination(entry))
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();

        if sources.is_empty() || destinations.is_empty() {
            return Ok(entries);
        }

        let mut pairings = Self::pair_exact(&entries, &sources, &destinations);
        let paired = pairings
            .iter()
            .map(|pairing| pairing.destination)
            .collect::<HashSet<_>>();
        let remaining = destinations
            .into_iter()
            .filter(|idx| !paired.contains(idx))
            .collect::<Vec<_>>();

        pairings.extend(self.pair_similar(&entries, &sources, &remaining)?);

        tracing::debug!(
            sources = sources.len(),
            pairings = pairings.len(),
            "rename detection finished"
        );

        Ok(Self::apply(entries, pairings))
    }

    fn is_source(entry: &DiffEntry) -> bool {
        matches!(entry.change_type(), ChangeType::Delete | ChangeType::Modify)
            && entry.old_entry().is_some_and(|old| old.is_blob())
    }

    fn is_destination(entry: &DiffEntry) -> bool {
        entry.change_type() == ChangeType::Add && entry.new_entry().is_some_and(|new| new.is_blob())
    }

    fn is_empty_blob(oid: &ObjectId) -> bool {
        oid.as_ref() == EMPTY_BLOB_ID
    }

    /// Pass 1: identical content; deleted sources are preferred over modified ones
    fn pair_exact(entries: &[DiffEntry], sources: &[usize], destinations: &[usize]) -> Vec<Pairing> {
        let mut by_oid = HashMap::<&ObjectId, Vec<usize>>::new();
        for &source in sources {
            if let Some(oid) = entries[source].old_blob_id()
                && !Self::is_empty_blob(oid)
            {
                by_oid.entry(oid).or_default().push(source);
            }
        }

        let mut pairings = Vec::new();
        let mut used = HashSet::new();

        for &destination in destinations {
            let Some(oid) = entries[destination].new_blob_id() else {
                continue;
            };
            let Some(candidates) = by_oid.get(oid) else {
                continue;
            };

            let is_delete = |idx: &&usize| entries[**idx].change_type() == ChangeType::Delete;
            let source = candidates
                .iter()
                .filter(is_delete)
                .find(|idx| !used.contains(*idx))
                .or_else(|| candidates.iter().find(is_delete))
                .or_else(|| candidates.first());

            if let Some(&source) = source {
                used.insert(source);
                pairings.push(Pairing {
                    source,
                    destination,
                });
            }
        }

        pairings
    }

    /// Pass 2: best line similarity at or above the threshold, highest scores first
    fn pair_similar(
        &self,
        entries: &[DiffEntry],
        sources: &[usize],
        destinations: &[usize],
    ) -> Result<Vec<Pairing>> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }

        if sources.len().saturating_mul(destinations.len())
            > self.limit.saturating_mul(self.limit)
        {
            tracing::warn!(
                sources = sources.len(),
                destinations = destinations.len(),
                limit = self.limit,
                "too many files for inexact rename detection, skipping"
            );
            return Ok(Vec::new());
        }

        let source_contents = self.load_comparable(entries, sources, DiffEntry::old_blob_id)?;
        let destination_contents =
            self.load_comparable(entries, destinations, DiffEntry::new_blob_id)?;

        let source_lines = source_contents
            .iter()
            .map(|(idx, content)| (*idx, LineCounts::new(content)))
            .collect::<Vec<_>>();
        let destination_lines = destination_contents
            .iter()
            .map(|(idx, content)| (*idx, LineCounts::new(content)))
            .collect::<Vec<_>>();

        let mut scored = Vec::new();
        for (destination, new_lines) in &destination_lines {
            for (source, old_lines) in &source_lines {
                if old_lines.max_similarity(new_lines) < self.threshold {
                    continue;
                }

                let score = old_lines.similarity(new_lines);
                if score >= self.threshold {
                    scored.push((score, *destination, *source));
                }
            }
        }

        // highest score first, then path order of destination and source
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let mut paired = HashSet::new();
        Ok(scored
            .into_iter()
            .filter(|(_, destination, _)| paired.insert(*destination))
            .map(|(_, destination, source)| Pairing {
                source,
                destination,
            })
            .collect())
    }

    /// Non-empty, non-binary contents of the selected side of `indices`
    fn load_comparable(
        &self,
        entries: &[DiffEntry],
        indices: &[usize],
        side: fn(&DiffEntry) -> Option<&ObjectId>,
    ) -> Result<Vec<(usize, Bytes)>> {
        let mut contents = Vec::new();

        for &idx in indices {
            let Some(oid) = side(&entries[idx]) else {
                continue;
            };
            if Self::is_empty_blob(oid) {
                continue;
            }

            let content = self.database.load_blob_content(oid)?;
            if !content.is_empty() && !is_binary(&content) {
                contents.push((idx, content));
            }
        }

        Ok(contents)
    }

    fn apply(entries: Vec<DiffEntry>, mut pairings: Vec<Pairing>) -> Vec<DiffEntry> {
        // the first pairing in path order of a deleted source is its rename
        pairings.sort_by_key(|pairing| pairing.destination);

        let mut renamed = HashSet::new();
        let mut replacements = HashMap::new();

        for pairing in pairings {
            let source = &entries[pairing.source];
            let destination = &entries[pairing.destination];

            let change_type = if source.change_type() == ChangeType::Delete
                && renamed.insert(pairing.source)
            {
                ChangeType::Rename
            } else {
                ChangeType::Copy
            };

            if let (Some(old_entry), Some(new_entry)) = (source.old_entry(), destination.new_entry())
            {
                replacements.insert(
                    pairing.destination,
                    DiffEntry::moved(
                        change_type,
                        source.path().to_string(),
                        old_entry.clone(),
                        destination.path().to_string(),
                        new_entry.clone(),
                    ),
                );
            }
        }

        entries
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !renamed.contains(idx))
            .map(|(idx, entry)| replacements.remove(&idx).unwrap_or(entry))
            .collect()
    }
}
