pub mod effect;
pub mod pedalboard;

pub use effect::{effect_schema, EffectIndexStore, EffectSpec, EFFECT_TERM_FIELDS};
pub use pedalboard::{
    pedalboard_schema, PedalboardIndexStore, PedalboardSpec, PEDALBOARD_TERM_FIELDS,
};
