//! The hierarchy assembler: groups a flat stream of features into
//! parent/child trees with a bounded lookback window.
//!
//! # Design
//!
//! GTF has no `Parent=` attribute. Relationships are inferred from the
//! identifying attributes the lines declare, `gene_id` and
//! `transcript_id`, following the usual gene → transcript → exon/CDS
//! nesting:
//!
//!  1. A feature that is not a `transcript` and has a `transcript_id`
//!     attaches under the most recent pending anchor for that transcript.
//!
//!  2. Failing that, a feature that is not a `gene` and has a `gene_id`
//!     attaches under the most recent pending anchor for that gene.
//!
//!  3. Otherwise it starts a new top-level *unit* in the pending window.
//!
//! Once placed, a feature becomes the anchor for its `gene_id` if it is a
//! `gene` or the gene has no anchor yet, and likewise for its
//! `transcript_id`. When a key is re-anchored while the old anchor is still
//! pending, the grouping is ambiguous; this is logged and counted, and the
//! newest anchor wins.
//!
//! The window holds at most `buffer_size` units. Pushing one more evicts
//! the oldest, which is emitted as is and never receives further children.
//! A synchronization point drains the whole window, oldest first.
//!
//! Each pending unit keeps its features in a small arena (a `Vec` of nodes
//! holding child indices), which is turned into a nested [`Feature`] tree
//! only on emission. Units are numbered with consecutive serials and only
//! leave the window from the front, so a serial maps straight to a
//! position in the window.

use std::collections::{HashMap, VecDeque};

use log::{debug, warn};

use crate::items::Feature;

/// The default lookback window for streaming parses.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

const GENE_ID: &str = "gene_id";
const TRANSCRIPT_ID: &str = "transcript_id";

/// An identifying attribute value that features can group under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum GroupKey {
    Gene(String),
    Transcript(String),
}

/// Where an anchor lives: unit serial and node index within that unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Anchor {
    serial: u64,
    node: usize,
}

#[derive(Debug)]
struct Node {
    feature: Feature,
    children: Vec<usize>,
}

/// A not-yet-emitted top-level feature and everything attached to it.
#[derive(Debug)]
struct PendingUnit {
    serial: u64,
    nodes: Vec<Node>,
    keys: Vec<GroupKey>,
}

impl PendingUnit {
    fn new(serial: u64, feature: Feature) -> Self {
        Self {
            serial,
            nodes: vec![Node {
                feature,
                children: Vec::new(),
            }],
            keys: Vec::new(),
        }
    }

    /// Attach `feature` under node `parent`, returning the new node's index.
    fn attach(&mut self, parent: usize, feature: Feature) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node {
            feature,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(index);
        index
    }

    /// Build the nested feature tree. Children always have larger indices
    /// than their parents, so walking the arena backwards finishes every
    /// subtree before its parent needs it.
    fn into_feature(self) -> Feature {
        let mut finished: Vec<Option<Feature>> = Vec::with_capacity(self.nodes.len());
        let mut children: Vec<Vec<usize>> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            finished.push(Some(node.feature));
            children.push(node.children);
        }
        for index in (0..finished.len()).rev() {
            let subtrees: Vec<Feature> = children[index]
                .iter()
                .filter_map(|child| finished[*child].take())
                .collect();
            if let Some(feature) = finished[index].as_mut() {
                feature.child_features.extend(subtrees);
            }
        }
        finished
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_default()
    }
}

/// Counters describing what the assembler has done so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub units_emitted: usize,
    pub evictions: usize,
    pub ambiguous_groupings: usize,
}

/// Groups features into trees using a bounded window of pending units.
///
/// The assembler owns every pending feature. Emitted trees are handed to
/// the caller and never touched again. Dropping an assembler without
/// calling [`Assembler::drain()`] drops the features still pending.
#[derive(Debug)]
pub struct Assembler {
    units: VecDeque<PendingUnit>,
    anchors: HashMap<GroupKey, Anchor>,
    next_serial: u64,
    buffer_size: Option<usize>,
    stats: AssemblerStats,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(Some(DEFAULT_BUFFER_SIZE))
    }
}

impl Assembler {
    /// Create a new assembler holding at most `buffer_size` pending units,
    /// or any number of them when `buffer_size` is `None`. A size of zero
    /// is treated as one.
    pub fn new(buffer_size: Option<usize>) -> Self {
        Self {
            units: VecDeque::new(),
            anchors: HashMap::new(),
            next_serial: 0,
            buffer_size: buffer_size.map(|size| size.max(1)),
            stats: AssemblerStats::default(),
        }
    }

    /// The number of top-level units currently pending.
    pub fn pending(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    /// Position of a unit in the window from its serial, if still pending.
    fn position(&self, serial: u64) -> Option<usize> {
        let front = self.units.front()?.serial;
        let offset = serial.checked_sub(front)? as usize;
        (offset < self.units.len()).then_some(offset)
    }

    fn lookup(&self, key: &GroupKey) -> Option<(usize, usize)> {
        let anchor = self.anchors.get(key)?;
        let position = self.position(anchor.serial)?;
        Some((position, anchor.node))
    }

    /// Record `anchor` for `key`, flagging the grouping as ambiguous if a
    /// different pending anchor is being replaced.
    fn set_anchor(&mut self, key: GroupKey, anchor: Anchor, position: usize) {
        if let Some(previous) = self.anchors.get(&key) {
            if *previous != anchor && self.position(previous.serial).is_some() {
                self.stats.ambiguous_groupings += 1;
                warn!(
                    "ambiguous grouping: {:?} is declared again while an earlier declaration is still pending; using the newest",
                    key
                );
            }
        }
        self.units[position].keys.push(key.clone());
        self.anchors.insert(key, anchor);
    }

    /// Add a feature, returning a completed tree if the window overflowed
    /// and its oldest unit was evicted.
    pub fn push(&mut self, feature: Feature) -> Option<Feature> {
        let gene_key = feature
            .attribute(GENE_ID)
            .map(|id| GroupKey::Gene(id.to_string()));
        let transcript_key = feature
            .attribute(TRANSCRIPT_ID)
            .map(|id| GroupKey::Transcript(id.to_string()));
        let is_gene = feature.is_type("gene");
        let is_transcript = feature.is_type("transcript");

        let parent = transcript_key
            .as_ref()
            .filter(|_| !is_transcript)
            .and_then(|key| self.lookup(key))
            .or_else(|| {
                gene_key
                    .as_ref()
                    .filter(|_| !is_gene)
                    .and_then(|key| self.lookup(key))
            });

        let mut evicted = None;
        let (position, node) = match parent {
            Some((position, parent_node)) => {
                let node = self.units[position].attach(parent_node, feature);
                (position, node)
            }
            None => {
                let serial = self.next_serial;
                self.next_serial += 1;
                self.units.push_back(PendingUnit::new(serial, feature));
                if self.buffer_size.map_or(false, |size| self.units.len() > size) {
                    evicted = self.evict_oldest();
                }
                (self.units.len() - 1, 0)
            }
        };

        let anchor = Anchor {
            serial: self.units[position].serial,
            node,
        };
        if let Some(key) = gene_key {
            if is_gene || self.lookup(&key).is_none() {
                self.set_anchor(key, anchor, position);
            }
        }
        if let Some(key) = transcript_key {
            if !is_gene && (is_transcript || self.lookup(&key).is_none()) {
                self.set_anchor(key, anchor, position);
            }
        }
        evicted
    }

    fn evict_oldest(&mut self) -> Option<Feature> {
        let unit = self.pop_front()?;
        self.stats.evictions += 1;
        debug!(
            "lookback window full ({} units), evicting the oldest pending feature",
            self.units.len() + 1
        );
        Some(unit)
    }

    /// Remove the oldest unit, dropping the anchors that point into it.
    fn pop_front(&mut self) -> Option<Feature> {
        let unit = self.units.pop_front()?;
        for key in &unit.keys {
            if self
                .anchors
                .get(key)
                .map_or(false, |anchor| anchor.serial == unit.serial)
            {
                self.anchors.remove(key);
            }
        }
        self.stats.units_emitted += 1;
        Some(unit.into_feature())
    }

    /// Emit every pending unit, oldest first, leaving the window empty.
    /// Used at synchronization points and at the end of input.
    pub fn drain(&mut self) -> Vec<Feature> {
        let mut emitted = Vec::with_capacity(self.units.len());
        while let Some(feature) = self.pop_front() {
            emitted.push(feature);
        }
        if !emitted.is_empty() {
            debug!("flushed {} pending feature trees", emitted.len());
        }
        self.anchors.clear();
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parsers::parse_feature;

    fn feature(feature_type: &str, attributes: &str) -> Feature {
        parse_feature(&format!(
            "ctgA\texample\t{}\t1\t100\t.\t+\t.\t{}",
            feature_type, attributes
        ))
        .unwrap()
    }

    #[test]
    fn test_gene_transcript_exon_nesting() {
        let mut assembler = Assembler::new(None);
        assert!(assembler.push(feature("gene", r#"gene_id "g1";"#)).is_none());
        assembler.push(feature("transcript", r#"gene_id "g1"; transcript_id "t1";"#));
        assembler.push(feature("exon", r#"gene_id "g1"; transcript_id "t1";"#));
        assembler.push(feature("CDS", r#"gene_id "g1"; transcript_id "t1";"#));
        assembler.push(feature("transcript", r#"gene_id "g1"; transcript_id "t2";"#));
        assembler.push(feature("exon", r#"gene_id "g1"; transcript_id "t2";"#));
        assert_eq!(assembler.pending(), 1);

        let trees = assembler.drain();
        assert_eq!(trees.len(), 1);
        let gene = &trees[0];
        assert!(gene.is_type("gene"));
        assert_eq!(gene.child_features.len(), 2);
        let t1 = &gene.child_features[0];
        assert_eq!(t1.attribute("transcript_id"), Some("t1"));
        let types: Vec<&str> = t1
            .child_features
            .iter()
            .map(|f| f.feature_type.as_deref().unwrap())
            .collect();
        assert_eq!(types, vec!["exon", "CDS"]);
        assert_eq!(gene.child_features[1].child_features.len(), 1);
        assert_eq!(gene.tree_size(), 6);
        assert!(assembler.is_empty());
    }

    #[test]
    fn test_exon_only_grouping() {
        // no gene or transcript lines: the first exon anchors the rest
        let mut assembler = Assembler::new(None);
        assembler.push(feature("exon", r#"transcript_id "EDEN.1"; gene_id "EDEN";"#));
        assembler.push(feature("exon", r#"transcript_id "EDEN.1"; gene_id "EDEN";"#));
        assembler.push(feature("exon", r#"transcript_id "EDEN.2"; gene_id "EDEN";"#));
        assembler.push(feature("CDS", r#"transcript_id "EDEN.2"; gene_id "EDEN";"#));
        let trees = assembler.drain();
        assert_eq!(trees.len(), 1);
        let root = &trees[0];
        assert_eq!(root.child_features.len(), 2);
        assert_eq!(root.child_features[1].child_features.len(), 1);
    }

    #[test]
    fn test_unrelated_features_are_separate_units() {
        let mut assembler = Assembler::new(None);
        assembler.push(feature("gene", r#"gene_id "a";"#));
        assembler.push(feature("gene", r#"gene_id "b";"#));
        assembler.push(feature("repeat", "."));
        assert_eq!(assembler.pending(), 3);
        let trees = assembler.drain();
        let ids: Vec<Option<&str>> = trees.iter().map(|f| f.attribute("gene_id")).collect();
        assert_eq!(ids, vec![Some("a"), Some("b"), None]);
    }

    #[test]
    fn test_eviction_bound() {
        let mut assembler = Assembler::new(Some(2));
        assert!(assembler.push(feature("gene", r#"gene_id "a";"#)).is_none());
        assert!(assembler.push(feature("gene", r#"gene_id "b";"#)).is_none());
        let evicted = assembler.push(feature("gene", r#"gene_id "c";"#)).unwrap();
        assert_eq!(evicted.attribute("gene_id"), Some("a"));
        assert_eq!(assembler.pending(), 2);

        // a late child of an evicted unit starts a new unit instead
        assembler.push(feature("transcript", r#"gene_id "a"; transcript_id "a.1";"#));
        assert_eq!(assembler.stats().evictions, 2);
        let remaining = assembler.drain();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].attribute("gene_id"), Some("c"));
        assert!(remaining[1].is_type("transcript"));
        assert_eq!(assembler.stats().units_emitted, 4);
    }

    #[test]
    fn test_children_do_not_count_against_window() {
        let mut assembler = Assembler::new(Some(1));
        assembler.push(feature("gene", r#"gene_id "a";"#));
        for _ in 0..10 {
            assert!(assembler
                .push(feature("exon", r#"gene_id "a"; transcript_id "a.1";"#))
                .is_none());
        }
        assert_eq!(assembler.pending(), 1);
        assert_eq!(assembler.drain()[0].tree_size(), 11);
    }

    #[test]
    fn test_ambiguous_grouping_prefers_newest() {
        let mut assembler = Assembler::new(None);
        assembler.push(feature("gene", r#"gene_id "dup";"#));
        assembler.push(feature("gene", r#"gene_id "dup";"#));
        assembler.push(feature("transcript", r#"gene_id "dup"; transcript_id "t";"#));
        assert_eq!(assembler.stats().ambiguous_groupings, 1);
        let trees = assembler.drain();
        assert_eq!(trees.len(), 2);
        assert!(trees[0].child_features.is_empty());
        assert_eq!(trees[1].child_features.len(), 1);
    }

    #[test]
    fn test_drain_resets_anchors() {
        let mut assembler = Assembler::new(None);
        assembler.push(feature("gene", r#"gene_id "a";"#));
        assert_eq!(assembler.drain().len(), 1);
        assembler.push(feature("transcript", r#"gene_id "a"; transcript_id "a.1";"#));
        let trees = assembler.drain();
        assert_eq!(trees.len(), 1);
        assert!(trees[0].is_type("transcript"));
    }
}
