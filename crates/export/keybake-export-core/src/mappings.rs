//! Default attribute mapping tables per target node class.
//!
//! Each entry maps one source attribute curve to one target property,
//! optionally through a value transform. Tables are plain data; node-type
//! adapters can register replacements.

use hashbrown::HashMap;

use crate::tracks::{AttributeConvertInfo, AttributeKind, ValueMap};

fn light_common() -> Vec<AttributeConvertInfo> {
    vec![
        AttributeConvertInfo::new("energy", "light_energy", None, AttributeKind::Float),
        AttributeConvertInfo::new(
            "specular_factor",
            "light_specular",
            None,
            AttributeKind::Float,
        ),
        AttributeConvertInfo::new(
            "use_shadow",
            "shadow_enabled",
            Some(ValueMap::GreaterThan(0.0)),
            AttributeKind::Bool,
        ),
        AttributeConvertInfo::new("color", "light_color", None, AttributeKind::MultiValue),
        AttributeConvertInfo::new(
            "shadow_color",
            "shadow_color",
            None,
            AttributeKind::MultiValue,
        ),
    ]
}

/// Built-in tables for the light and camera classes.
pub fn default_attribute_tables() -> HashMap<String, Vec<AttributeConvertInfo>> {
    let mut tables = HashMap::new();

    let mut omni = light_common();
    omni.push(AttributeConvertInfo::new(
        "distance",
        "omni_range",
        None,
        AttributeKind::Float,
    ));
    tables.insert("OmniLight".to_string(), omni);

    let mut spot = light_common();
    spot.push(AttributeConvertInfo::new(
        "distance",
        "spot_range",
        None,
        AttributeKind::Float,
    ));
    // Source spot size is the full cone angle in radians; the target wants
    // the half angle in degrees.
    spot.push(AttributeConvertInfo::new(
        "spot_size",
        "spot_angle",
        Some(ValueMap::HalfAngleDegrees),
        AttributeKind::Float,
    ));
    tables.insert("SpotLight".to_string(), spot);

    tables.insert("DirectionalLight".to_string(), light_common());

    tables.insert(
        "Camera".to_string(),
        vec![
            AttributeConvertInfo::new(
                "ortho_scale",
                "size",
                Some(ValueMap::Scale(0.5)),
                AttributeKind::Float,
            ),
            AttributeConvertInfo::new("clip_start", "near", None, AttributeKind::Float),
            AttributeConvertInfo::new("clip_end", "far", None, AttributeKind::Float),
        ],
    );

    tables
}
