//! Animation resource assembly: aggregate tracks, keep the running duration,
//! serialize into an internal resource.

use keybake_scene_core::{
    fix_matrix, ArrayBuilder, InternalResource, MapBuilder, NodePath, Property, Value,
};

use crate::source::Action;
use crate::tracks::{
    build_const_interp_value_track, build_linear_interp_value_track, AttributeConvertInfo,
    AttributeKind, Track, TrackInterpolation, TrackKind, ValueMap,
};

/// Serialization step written on every animation resource.
const RESOURCE_STEP: f32 = 0.1;

/// A named collection of tracks plus its derived duration. Serialized into
/// the document exactly once, at the end of the export run.
#[derive(Clone, Debug)]
pub struct AnimationResource {
    pub name: String,
    frame_rate: f32,
    length: f32,
    tracks: Vec<Track>,
}

impl AnimationResource {
    pub fn new(name: &str, frame_rate: f32) -> Self {
        Self {
            name: name.to_string(),
            frame_rate,
            length: 0.0,
            tracks: Vec::new(),
        }
    }

    /// Duration in seconds: max over tracks of last-frame time. Adding a
    /// shorter track never decreases it.
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Append a track, assigning it the next sequential index.
    pub fn add_track(&mut self, track: Track) {
        let track_length = track.frame_end() as f32 / self.frame_rate;
        if track_length > self.length {
            self.length = track_length;
        }
        self.tracks.push(track);
    }

    /// Add a value track with a one-to-one curve mapping. A missing curve is
    /// not an error, just nothing to export.
    pub fn add_simple_value_track(
        &mut self,
        action: &Action,
        source_path: &str,
        path: NodePath,
        map: Option<ValueMap>,
        interpolation: TrackInterpolation,
    ) {
        if let Some(fcurve) = action.find_curve(source_path) {
            let track = match interpolation {
                TrackInterpolation::Nearest => build_const_interp_value_track(path, map, fcurve),
                TrackInterpolation::Linear => build_linear_interp_value_track(path, map, fcurve),
            };
            self.add_track(track);
        }
    }

    /// Walk an attribute mapping table and export every bool/float entry.
    /// Multi-component entries are handled by dedicated exporter paths.
    pub fn add_tracks_via_attr_mapping(
        &mut self,
        action: &Action,
        table: &[AttributeConvertInfo],
        base_path: &NodePath,
    ) {
        for item in table {
            let interpolation = match item.kind {
                AttributeKind::Bool => TrackInterpolation::Nearest,
                AttributeKind::Float => TrackInterpolation::Linear,
                AttributeKind::MultiValue => continue,
            };
            self.add_simple_value_track(
                action,
                &item.source_path,
                base_path.with_subname(&item.target_property),
                item.map,
                interpolation,
            );
        }
    }

    /// Serialize to an internal resource. Linear tracks drop keys whose value
    /// repeats the previous one; nearest tracks keep every authored point.
    pub fn serialize(&self) -> InternalResource {
        let mut resource = InternalResource::new("Animation", &self.name);
        resource.insert("step", Property::Float(RESOURCE_STEP));
        resource.insert("length", Property::Float(self.length));

        for (index, track) in self.tracks.iter().enumerate() {
            let prefix = format!("tracks/{}", index);
            resource.insert(
                &format!("{}/type", prefix),
                Property::Str(track.kind.as_str().to_string()),
            );
            resource.insert(
                &format!("{}/path", prefix),
                Property::Raw(track.path.to_string()),
            );
            resource.insert(
                &format!("{}/interp", prefix),
                Property::Int(track.interpolation as i64),
            );
            let keys = match track.kind {
                TrackKind::Transform => self.transform_keys(track),
                TrackKind::Value => self.value_keys(track),
            };
            resource.insert(&format!("{}/keys", prefix), Property::Raw(keys));
        }

        resource
    }

    fn transform_keys(&self, track: &Track) -> String {
        let mut array = ArrayBuilder::plain();
        for (index, frame) in track.frames.iter().enumerate() {
            if track.interpolation == TrackInterpolation::Linear
                && index > 0
                && track.values[index] == track.values[index - 1]
            {
                // do not export the same keyframe twice
                continue;
            }

            array.push_float(*frame as f32 / self.frame_rate);
            // transition, default 1.0
            array.push_float(1.0);

            let matrix = match &track.values[index] {
                Value::Transform(m) => *m,
                other => panic!("transform track carries non-transform value {:?}", other),
            };
            let fixed = fix_matrix(matrix);
            let (scale, rotation, location) = fixed.to_scale_rotation_translation();

            array.push_float(location.x);
            array.push_float(location.y);
            array.push_float(location.z);
            array.push_float(rotation.x);
            array.push_float(rotation.y);
            array.push_float(rotation.z);
            array.push_float(rotation.w);
            array.push_float(scale.x);
            array.push_float(scale.y);
            array.push_float(scale.z);
        }
        array.build()
    }

    fn value_keys(&self, track: &Track) -> String {
        let mut times = ArrayBuilder::real_pool();
        let mut transitions = ArrayBuilder::real_pool();
        let mut values = ArrayBuilder::plain();

        for (index, frame) in track.frames.iter().enumerate() {
            if track.interpolation == TrackInterpolation::Linear
                && index > 0
                && track.values[index] == track.values[index - 1]
            {
                continue;
            }
            times.push_float(*frame as f32 / self.frame_rate);
            transitions.push_float(1.0);
            values.push(value_literal(&track.values[index]));
        }

        let mut keys = MapBuilder::new();
        keys.insert("times", times.build());
        keys.insert("transitions", transitions.build());
        keys.insert("update", 0);
        keys.insert("values", values.build());
        keys.build()
    }
}

fn value_literal(value: &Value) -> String {
    match value {
        Value::Float(v) => format!("{}", v),
        Value::Bool(b) => format!("{}", b),
        Value::Color([r, g, b]) => format!("Color( {}, {}, {}, 1 )", r, g, b),
        Value::Transform(_) => panic!("transform value in a value track"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    fn path() -> NodePath {
        NodePath::new("Root/AnimationPlayer", "Root/Cube")
    }

    #[test]
    fn duration_is_max_over_tracks() {
        let mut res = AnimationResource::new("walk", 10.0);
        let mut long = Track::new(TrackKind::Value, path().with_subname("a"));
        long.add_frame_data(20, Value::Float(1.0));
        res.add_track(long);
        assert_eq!(res.length(), 2.0);

        let mut short = Track::new(TrackKind::Value, path().with_subname("b"));
        short.add_frame_data(5, Value::Float(1.0));
        res.add_track(short);
        // Shorter track never decreases duration.
        assert_eq!(res.length(), 2.0);
    }

    #[test]
    fn linear_value_keys_coalesce_identical_runs() {
        let mut res = AnimationResource::new("walk", 1.0);
        let mut track = Track::new(TrackKind::Value, path().with_subname("energy"));
        for (frame, v) in [(0, 1.0), (1, 1.0), (2, 1.0), (3, 2.0)] {
            track.add_frame_data(frame, Value::Float(v));
        }
        res.add_track(track);
        let serialized = res.serialize();
        let keys = serialized.get("tracks/0/keys").unwrap().to_string();
        // Frames 1 and 2 repeat the value at 0 and are dropped.
        assert!(keys.contains("PoolRealArray( 0, 3 )"), "keys = {keys}");
    }

    #[test]
    fn nearest_value_keys_keep_repeats() {
        let mut res = AnimationResource::new("walk", 1.0);
        let mut track = Track::new(TrackKind::Value, path().with_subname("negative"));
        track.interpolation = TrackInterpolation::Nearest;
        track.add_frame_data(0, Value::Bool(true));
        track.add_frame_data(4, Value::Bool(true));
        res.add_track(track);
        let serialized = res.serialize();
        let keys = serialized.get("tracks/0/keys").unwrap().to_string();
        assert!(keys.contains("PoolRealArray( 0, 4 )"), "keys = {keys}");
        assert!(keys.contains("[ true, true ]"), "keys = {keys}");
    }

    #[test]
    fn transform_keys_flatten_location_rotation_scale() {
        let mut res = AnimationResource::new("walk", 1.0);
        let mut track = Track::new(TrackKind::Transform, path());
        track.add_frame_data(
            0,
            Value::Transform(Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0))),
        );
        res.add_track(track);
        let serialized = res.serialize();
        assert_eq!(
            serialized.get("tracks/0/type").unwrap().to_string(),
            "\"transform\""
        );
        let keys = serialized.get("tracks/0/keys").unwrap().to_string();
        // Authoring +z becomes document +y after the axis fix.
        assert!(keys.starts_with("[ 0, 1, 0, 3, 0,"), "keys = {keys}");
    }

    #[test]
    fn track_indices_are_sequential() {
        let mut res = AnimationResource::new("walk", 1.0);
        for name in ["a", "b", "c"] {
            let mut track = Track::new(TrackKind::Value, path().with_subname(name));
            track.add_frame_data(0, Value::Float(0.0));
            res.add_track(track);
        }
        let serialized = res.serialize();
        assert!(serialized.get("tracks/0/type").is_some());
        assert!(serialized.get("tracks/1/type").is_some());
        assert!(serialized.get("tracks/2/type").is_some());
        assert!(serialized.get("tracks/3/type").is_none());
    }
}
