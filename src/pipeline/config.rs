//! Scope configuration and runtime option updates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::gpu::LineStyle;
use crate::scope::{Afterglow, Routing, DEFAULT_LOOKBACK};

/// Largest supported window.
pub const MAX_SAMPLES: usize = 65_536;
/// Default window length.
pub const DEFAULT_SAMPLES: usize = 4096;
/// Default line half width in normalized device coordinates.
pub const DEFAULT_HALF_WIDTH: f32 = 0.012;

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Sample count {0} is outside 2..={MAX_SAMPLES}")]
    Samples(usize),
    #[error("Line half width must be positive, got {0}")]
    HalfWidth(f32),
    #[error("Afterglow needs 0 <= full < horizon, got {full}..{horizon}")]
    Afterglow { full: f32, horizon: f32 },
    #[error("Invalid color: {0}")]
    Color(String),
    #[error("Unknown live mode '{0}'")]
    LiveMode(String),
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional) into RGBA.
pub fn parse_hex_color(hex: &str) -> Option<[f32; 4]> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|v| v as f32 / 255.0);
    let alpha = if hex.len() == 8 { channel(6)? } else { 1.0 };
    Some([channel(0)?, channel(2)?, channel(4)?, alpha])
}

/// Straight RGBA color with components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "ColorRepr")]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self([r, g, b, a])
    }

    pub fn to_array(self) -> [f32; 4] {
        self.0
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_color(s)
            .map(Self)
            .ok_or_else(|| ConfigError::Color(s.to_string()))
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgba([f32; 4]),
    Rgb([f32; 3]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = ConfigError;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        let rgba = match repr {
            ColorRepr::Hex(text) => return text.parse(),
            ColorRepr::Rgba(rgba) => rgba,
            ColorRepr::Rgb([r, g, b]) => [r, g, b, 1.0],
        };
        if rgba.iter().any(|c| !c.is_finite() || !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Color(format!("{rgba:?}")));
        }
        Ok(Self(rgba))
    }
}

// Floats survive a round trip; hex would quantize to 8 bits per channel.
impl From<Color> for ColorRepr {
    fn from(color: Color) -> Self {
        Self::Rgba(color.0)
    }
}

/// Where live samples come from, if anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LiveRepr", into = "String")]
pub enum LiveMode {
    /// Render a decoded buffer.
    #[default]
    Off,
    /// Live capture with the best strategy the platform supports.
    Auto,
    /// Live capture through pull-based analyser snapshots.
    Analyser,
    /// Live capture through a push-based streaming buffer.
    Streaming,
}

impl LiveMode {
    pub fn is_live(self) -> bool {
        self != Self::Off
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Auto => "auto",
            Self::Analyser => "analyser",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for LiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LiveMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "false" | "none" => Ok(Self::Off),
            "auto" | "true" => Ok(Self::Auto),
            "analyser" | "analyzer" => Ok(Self::Analyser),
            "streaming" | "scriptprocessor" => Ok(Self::Streaming),
            _ => Err(ConfigError::LiveMode(s.to_string())),
        }
    }
}

impl From<bool> for LiveMode {
    fn from(live: bool) -> Self {
        if live {
            Self::Auto
        } else {
            Self::Off
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LiveRepr {
    Flag(bool),
    Name(String),
}

impl TryFrom<LiveRepr> for LiveMode {
    type Error = ConfigError;

    fn try_from(repr: LiveRepr) -> Result<Self, Self::Error> {
        match repr {
            LiveRepr::Flag(flag) => Ok(flag.into()),
            LiveRepr::Name(name) => name.parse(),
        }
    }
}

impl From<LiveMode> for String {
    fn from(mode: LiveMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Configuration for one scope instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Maximum window length in sample pairs.
    pub samples: usize,
    pub swap: bool,
    pub invert: bool,
    pub sweep: bool,
    pub bloom: bool,
    pub live: LiveMode,
    pub color: Color,
    /// Second trace color, used when sweep and swap draw both channels.
    pub secondary_color: Color,
    pub background: Color,
    pub half_width: f32,
    pub intensity: f32,
    pub afterglow: Afterglow,
    /// Output latency compensation in seconds.
    pub lookback: f64,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            swap: false,
            invert: false,
            sweep: false,
            bloom: false,
            live: LiveMode::Off,
            color: Color::rgba(1.0 / 32.0, 1.0, 1.0 / 32.0, 1.0),
            secondary_color: Color::rgba(1.0, 140.0 / 255.0, 1.0 / 32.0, 1.0),
            background: Color::rgba(0.0, 0.0, 0.0, 1.0),
            half_width: DEFAULT_HALF_WIDTH,
            intensity: 1.0,
            afterglow: Afterglow::default(),
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

impl ScopeConfig {
    /// Parse a possibly partial JSON document; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=MAX_SAMPLES).contains(&self.samples) {
            return Err(ConfigError::Samples(self.samples));
        }
        if !(self.half_width.is_finite() && self.half_width > 0.0) {
            return Err(ConfigError::HalfWidth(self.half_width));
        }
        let Afterglow { full, horizon } = self.afterglow;
        if !(full >= 0.0 && full < horizon) {
            return Err(ConfigError::Afterglow { full, horizon });
        }
        Ok(())
    }

    pub fn routing(&self) -> Routing {
        Routing {
            swap: self.swap,
            sweep: self.sweep,
        }
    }

    fn style(&self, color: Color) -> LineStyle {
        LineStyle {
            color: color.to_array(),
            half_width: self.half_width,
            intensity: self.intensity,
            invert: self.invert,
            afterglow: self.afterglow,
        }
    }

    pub fn primary_style(&self) -> LineStyle {
        self.style(self.color)
    }

    pub fn secondary_style(&self) -> LineStyle {
        self.style(self.secondary_color)
    }

    /// Apply runtime option changes.
    pub fn apply(&mut self, patch: &OptionsPatch) {
        if let Some(swap) = patch.swap {
            self.swap = swap;
        }
        if let Some(invert) = patch.invert {
            self.invert = invert;
        }
        if let Some(sweep) = patch.sweep {
            self.sweep = sweep;
        }
        if let Some(bloom) = patch.bloom {
            self.bloom = bloom;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(color) = patch.secondary_color {
            self.secondary_color = color;
        }
        if let Some(color) = patch.background {
            self.background = color;
        }
    }
}

/// Partial set of options that can change while the scope runs.
///
/// None of these touch GPU buffers; switching live mode needs a new scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bloom: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
}

impl OptionsPatch {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
