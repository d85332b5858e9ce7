use bevy::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OverlayTarget
// ---------------------------------------------------------------------------

/// Kind tag for catalog entries. Only `Overlay` targets are paintable.
#[derive(Reflect, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetKind {
    #[default]
    Overlay,
    /// Point annotation; kept in the same catalog but never painted.
    Annotation,
}

/// A named, colored annotation layer on a model.
#[derive(Reflect, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OverlayTarget {
    /// Assigned by the persistence layer; empty until saved.
    #[serde(default)]
    pub id: String,
    pub title: String,
    /// Hex color, `#RRGGBB` or `#RRGGBBAA`.
    pub color: String,
    #[serde(rename = "type", default)]
    pub kind: TargetKind,
    #[serde(default)]
    pub snapshots: Vec<String>,
}

impl OverlayTarget {
    pub fn overlay(title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            color: color.into(),
            kind: TargetKind::Overlay,
            snapshots: Vec::new(),
        }
    }

    pub fn is_overlay(&self) -> bool {
        self.kind == TargetKind::Overlay
    }
}

// ---------------------------------------------------------------------------
// Targets catalog component
// ---------------------------------------------------------------------------

/// Ordered target catalog of a model, with the active selection.
#[derive(Component, Reflect, Serialize, Deserialize, Clone, Debug, Default)]
#[reflect(Component, Default)]
pub struct Targets {
    #[serde(default)]
    pub targets: Vec<OverlayTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_index: Option<usize>,
}

impl Targets {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn active(&self) -> Option<&OverlayTarget> {
        self.active_index.and_then(|i| self.targets.get(i))
    }

    pub fn active_mut(&mut self) -> Option<&mut OverlayTarget> {
        self.active_index.and_then(|i| self.targets.get_mut(i))
    }

    /// The active target, only if it is a paintable overlay.
    pub fn active_overlay(&self) -> Option<&OverlayTarget> {
        self.active().filter(|t| t.is_overlay())
    }

    /// Appends `target` and makes it active. Returns its index.
    pub fn push_active(&mut self, target: OverlayTarget) -> usize {
        self.targets.push(target);
        let index = self.targets.len() - 1;
        self.active_index = Some(index);
        index
    }

    /// Removes the active target and clears the selection.
    pub fn remove_active(&mut self) -> Option<OverlayTarget> {
        let index = self.active_index.take()?;
        (index < self.targets.len()).then(|| self.targets.remove(index))
    }

    /// Sets the active index. Out-of-range indices clear the selection.
    /// Returns whether the selection changed.
    pub fn select(&mut self, index: Option<usize>) -> bool {
        let index = index.filter(|&i| i < self.targets.len());
        let changed = self.active_index != index;
        self.active_index = index;
        changed
    }

    /// Index of the next overlay target after the active one, wrapping.
    pub fn next_overlay(&self) -> Option<usize> {
        let count = self.targets.len();
        let start = self.active_index.map_or(0, |i| i + 1);
        (0..count)
            .map(|offset| (start + offset) % count)
            .find(|&i| self.targets[i].is_overlay())
    }

    pub fn overlay_count(&self) -> usize {
        self.targets.iter().filter(|t| t.is_overlay()).count()
    }
}
