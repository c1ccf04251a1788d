use crate::objects::export::{ExportSnapshot, FlagRecord, TerrainLineRecord, color_to_rgb};
use crate::objects::marker::{Marker, MarkerPlaceholder, MarkerPrototype};
use crate::objects::polyline::Polyline;
use bevy::prelude::*;
use constants::interaction::MIN_POLYLINE_POINTS;

/// Stable identity of a placed object. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Debug, Clone)]
pub enum PlacedKind {
    Marker(Marker),
    Polyline(Polyline),
}

impl PlacedKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlacedKind::Marker(_) => "marker",
            PlacedKind::Polyline(_) => "polyline",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacedObject {
    pub id: ObjectId,
    pub kind: PlacedKind,
    pub highlighted: bool,
}

impl PlacedObject {
    pub fn color(&self) -> Color {
        match &self.kind {
            PlacedKind::Marker(marker) => marker.color(),
            PlacedKind::Polyline(line) => line.color(),
        }
    }

    /// Ray test against the simplified selection surface, not the rendered mesh.
    pub fn ray_hit(&self, ray: &Ray3d) -> Option<f32> {
        match &self.kind {
            PlacedKind::Marker(marker) => marker.ray_hit(ray),
            PlacedKind::Polyline(line) => line.ray_hit(ray),
        }
    }
}

/// Structural change since the last drain, consumed by the visual sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    Added(ObjectId),
    Removed(ObjectId),
    Restyled(ObjectId),
    /// The in-progress line gained or lost points, or was closed.
    DraftChanged,
    /// Only the trailing preview segment moved or toggled.
    DraftPreviewMoved,
}

/// Result of finalising the in-progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    NoDraft,
    Discarded,
    Committed(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit {
    pub id: ObjectId,
    pub distance: f32,
}

/// Owns every committed marker and polyline plus the in-progress line.
///
/// Object positions are stored in terrain-container space. Membership is by
/// [`ObjectId`]; two objects with identical geometry remain distinct entries.
#[derive(Resource, Debug)]
pub struct SpatialObjectRegistry {
    objects: Vec<PlacedObject>,
    draft: Option<Polyline>,
    next_marker: MarkerPrototype,
    marker_placeholder: MarkerPlaceholder,
    active_color: Color,
    next_id: u64,
    changes: Vec<RegistryChange>,
}

impl Default for SpatialObjectRegistry {
    fn default() -> Self {
        Self::new(Color::WHITE)
    }
}

impl SpatialObjectRegistry {
    pub fn new(active_color: Color) -> Self {
        Self {
            objects: Vec::new(),
            draft: None,
            next_marker: MarkerPrototype::new(active_color),
            marker_placeholder: MarkerPlaceholder::default(),
            active_color,
            next_id: 1,
            changes: Vec::new(),
        }
    }

    pub fn objects(&self) -> &[PlacedObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn active_color(&self) -> Color {
        self.active_color
    }

    /// New draw colour for subsequent markers and for the line being drawn.
    pub fn set_active_color(&mut self, color: Color) {
        self.active_color = color;
        self.next_marker.set_color(color);
        if let Some(draft) = self.draft.as_mut() {
            draft.set_color(color);
            self.changes.push(RegistryChange::DraftChanged);
        }
    }

    /// Recolour a single committed object. Returns `false` if it is unknown.
    pub fn set_object_color(&mut self, id: ObjectId, color: Color) -> bool {
        let Some(object) = self.objects.iter_mut().find(|object| object.id == id) else {
            return false;
        };
        match &mut object.kind {
            PlacedKind::Marker(marker) => marker.set_color(color),
            PlacedKind::Polyline(line) => line.set_color(color),
        }
        self.changes.push(RegistryChange::Restyled(id));
        true
    }

    pub fn marker_placeholder(&self) -> MarkerPlaceholder {
        self.marker_placeholder
    }

    pub fn show_marker_placeholder(&mut self, position: Vec3) {
        self.marker_placeholder.show_at(position);
    }

    pub fn hide_marker_placeholder(&mut self) {
        self.marker_placeholder.hide();
    }

    /// Commit a marker built from the current prototype, then start a fresh
    /// prototype so later colour changes never reach this one.
    pub fn place_marker(&mut self, position: Vec3) -> ObjectId {
        let mut marker = self.next_marker.instantiate(position);
        marker.set_color(self.active_color);
        let id = self.insert(PlacedKind::Marker(marker));

        self.marker_placeholder.hide();
        self.next_marker = MarkerPrototype::new(self.active_color);
        id
    }

    pub fn draft(&self) -> Option<&Polyline> {
        self.draft.as_ref()
    }

    pub fn has_draft(&self) -> bool {
        self.draft.is_some()
    }

    /// Start the in-progress line if needed and extend it.
    pub fn append_line_point(&mut self, point: Vec3) {
        let color = self.active_color;
        self.draft
            .get_or_insert_with(|| Polyline::new(color))
            .add_point(point);
        self.changes.push(RegistryChange::DraftChanged);
    }

    pub fn enable_draft_placeholder(&mut self) {
        if let Some(draft) = self.draft.as_mut() {
            draft.enable_placeholder();
            self.changes.push(RegistryChange::DraftPreviewMoved);
        }
    }

    pub fn disable_draft_placeholder(&mut self) {
        if let Some(draft) = self.draft.as_mut() {
            draft.disable_placeholder();
            self.changes.push(RegistryChange::DraftPreviewMoved);
        }
    }

    pub fn update_draft_placeholder(&mut self, preview: Vec3) {
        if let Some(draft) = self.draft.as_mut() {
            draft.update_placeholder(preview);
            self.changes.push(RegistryChange::DraftPreviewMoved);
        }
    }

    /// Close the in-progress line. Lines shorter than two points are dropped
    /// without ever entering the collection.
    pub fn finish_line(&mut self) -> LineOutcome {
        let Some(mut draft) = self.draft.take() else {
            return LineOutcome::NoDraft;
        };
        self.changes.push(RegistryChange::DraftChanged);

        if draft.len() < MIN_POLYLINE_POINTS {
            return LineOutcome::Discarded;
        }

        draft.disable_placeholder();
        LineOutcome::Committed(self.insert(PlacedKind::Polyline(draft)))
    }

    /// Remove by identity. Unknown ids are ignored.
    pub fn remove(&mut self, id: ObjectId) -> Option<PlacedObject> {
        let idx = self.objects.iter().position(|object| object.id == id)?;
        let removed = self.objects.remove(idx);
        self.changes.push(RegistryChange::Removed(id));
        Some(removed)
    }

    /// Closest object whose hit surface the ray crosses.
    pub fn nearest_hit(&self, ray: &Ray3d) -> Option<NearestHit> {
        // Linear scan; swap for a spatial index if scenes grow past ~10^3 objects.
        self.objects
            .iter()
            .filter_map(|object| {
                object.ray_hit(ray).map(|distance| NearestHit {
                    id: object.id,
                    distance,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    pub fn highlighted(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects
            .iter()
            .filter(|object| object.highlighted)
            .map(|object| object.id)
    }

    pub fn is_highlighted(&self, id: ObjectId) -> bool {
        self.get(id).is_some_and(|object| object.highlighted)
    }

    pub fn set_highlight(&mut self, id: ObjectId, highlighted: bool) {
        if let Some(object) = self.objects.iter_mut().find(|object| object.id == id) {
            if object.highlighted != highlighted {
                object.highlighted = highlighted;
                self.changes.push(RegistryChange::Restyled(id));
            }
        }
    }

    pub fn clear_highlights(&mut self) {
        for object in self.objects.iter_mut().filter(|object| object.highlighted) {
            object.highlighted = false;
            self.changes.push(RegistryChange::Restyled(object.id));
        }
    }

    pub fn export_snapshot(&self) -> ExportSnapshot {
        let mut snapshot = ExportSnapshot::default();
        for object in &self.objects {
            match &object.kind {
                PlacedKind::Marker(marker) => snapshot.flags.push(FlagRecord {
                    color: color_to_rgb(marker.color()),
                    position: marker.position().to_array(),
                }),
                PlacedKind::Polyline(line) => snapshot.terrain_lines.push(TerrainLineRecord {
                    color: color_to_rgb(line.color()),
                    points: line.points().iter().map(|p| p.to_array()).collect(),
                }),
            }
        }
        snapshot
    }

    /// Drain pending changes in the order they happened. Draft updates are
    /// collapsed into one trailing entry since the draft is read whole.
    pub fn take_changes(&mut self) -> Vec<RegistryChange> {
        let mut draft = None;
        let mut changes: Vec<RegistryChange> = std::mem::take(&mut self.changes)
            .into_iter()
            .filter(|change| match change {
                RegistryChange::DraftChanged => {
                    draft = Some(RegistryChange::DraftChanged);
                    false
                }
                RegistryChange::DraftPreviewMoved => {
                    draft.get_or_insert(RegistryChange::DraftPreviewMoved);
                    false
                }
                _ => true,
            })
            .collect();
        changes.extend(draft);
        changes
    }

    fn insert(&mut self, kind: PlacedKind) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(PlacedObject {
            id,
            kind,
            highlighted: false,
        });
        self.changes.push(RegistryChange::Added(id));
        id
    }
}
