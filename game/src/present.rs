//! The presentation boundary.
//!
//! The game core never draws or plays anything itself. It pushes property
//! changes through a [`Renderer`] and fire-and-forget sounds through a
//! [`CuePlayer`]; neither can report failure back into game state.

use std::cell::RefCell;
use std::rc::Rc;

use chest_engine::Rgb;
use serde::{Deserialize, Serialize};

use crate::chest::ChestId;
use crate::sfx::{Cue, CueOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChestPart {
    /// The whole chest container (position, overall alpha).
    Body,
    ClosedSprite,
    OpenSprite,
    Label,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    Chest(ChestId, ChestPart),
    /// Root of the scene; the screen shake moves it.
    Stage,
    Dark,
    /// Fades the fog as a whole.
    Fog,
    /// One of the drifting fog sprites, back to front.
    FogLayer(u8),
    StartOverlay,
    PlayButton,
    PlayButtonLabel,
    TotalSign,
    BonusPopup,
    TotalPopup,
    /// A falling rock from the bonus rock rain.
    Rock(u8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "prop", content = "value", rename_all = "snake_case")]
pub enum Property {
    X(f32),
    Y(f32),
    Scale(f32),
    Alpha(f32),
    Rotation(f32),
    Tint(Rgb),
    Visible(bool),
    Text(String),
}

pub trait Renderer {
    fn render_property(&mut self, entity: Entity, property: Property);
}

pub trait CuePlayer {
    fn play_cue(&mut self, cue: Cue, options: CueOptions);
    fn stop_cue(&mut self, cue: Cue);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render_property(&mut self, entity: Entity, property: Property) {
        (**self).render_property(entity, property);
    }
}

impl<P: CuePlayer + ?Sized> CuePlayer for Box<P> {
    fn play_cue(&mut self, cue: Cue, options: CueOptions) {
        (**self).play_cue(cue, options);
    }

    fn stop_cue(&mut self, cue: Cue) {
        (**self).stop_cue(cue);
    }
}

/// Drops everything. Useful for pure logic runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl Renderer for Headless {
    fn render_property(&mut self, _entity: Entity, _property: Property) {}
}

impl CuePlayer for Headless {
    fn play_cue(&mut self, _cue: Cue, _options: CueOptions) {}
    fn stop_cue(&mut self, _cue: Cue) {}
}

/// Logs every call at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceLog;

impl Renderer for TraceLog {
    fn render_property(&mut self, entity: Entity, property: Property) {
        tracing::trace!(?entity, ?property, "render");
    }
}

impl CuePlayer for TraceLog {
    fn play_cue(&mut self, cue: Cue, options: CueOptions) {
        tracing::trace!(cue = cue.name(), looped = options.looped, volume = options.volume, "play cue");
    }

    fn stop_cue(&mut self, cue: Cue) {
        tracing::trace!(cue = cue.name(), "stop cue");
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PresentCall {
    Render { entity: Entity, property: Property },
    Play { cue: Cue, options: CueOptions },
    Stop { cue: Cue },
}

/// Captures calls into a shared log. Clones share the same log, so one copy
/// can be handed to the game while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Rc<RefCell<Vec<PresentCall>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PresentCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    pub fn played(&self) -> Vec<Cue> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                PresentCall::Play { cue, .. } => Some(*cue),
                _ => None,
            })
            .collect()
    }

    pub fn stopped(&self) -> Vec<Cue> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                PresentCall::Stop { cue } => Some(*cue),
                _ => None,
            })
            .collect()
    }

    /// Every property pushed to `entity`, oldest first.
    pub fn properties(&self, entity: Entity) -> Vec<Property> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                PresentCall::Render {
                    entity: e,
                    property,
                } if *e == entity => Some(property.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recent text pushed to `entity`, if any.
    pub fn last_text(&self, entity: Entity) -> Option<String> {
        self.properties(entity).into_iter().rev().find_map(|p| match p {
            Property::Text(text) => Some(text),
            _ => None,
        })
    }

    pub fn last_visible(&self, entity: Entity) -> Option<bool> {
        self.properties(entity).into_iter().rev().find_map(|p| match p {
            Property::Visible(v) => Some(v),
            _ => None,
        })
    }

    fn push(&self, call: PresentCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Renderer for Recorder {
    fn render_property(&mut self, entity: Entity, property: Property) {
        self.push(PresentCall::Render { entity, property });
    }
}

impl CuePlayer for Recorder {
    fn play_cue(&mut self, cue: Cue, options: CueOptions) {
        self.push(PresentCall::Play { cue, options });
    }

    fn stop_cue(&mut self, cue: Cue) {
        self.push(PresentCall::Stop { cue });
    }
}
