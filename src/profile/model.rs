use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical profile for overexposed (HDR-like) captures
pub const HDR: &str = "HDR";
/// Canonical profile for normally exposed captures
pub const SDR: &str = "SDR";

/// Binarization algorithm used when adaptive mode is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BinarizerKind {
    #[default]
    #[serde(rename = "MEAN", alias = "mean", alias = "Mean")]
    Mean,
    #[serde(rename = "SAUVOLA", alias = "sauvola", alias = "Sauvola")]
    Sauvola,
    #[serde(rename = "OTSU", alias = "otsu", alias = "Otsu")]
    Otsu,
}

impl FromStr for BinarizerKind {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "adaptive" => Ok(Self::Mean),
            "sauvola" => Ok(Self::Sauvola),
            "otsu" => Ok(Self::Otsu),
            _ => Err(invalid("BINARIZER", s)),
        }
    }
}

impl BinarizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "MEAN",
            Self::Sauvola => "SAUVOLA",
            Self::Otsu => "OTSU",
        }
    }
}

/// 3x3 structuring element for morphology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MorphKernel {
    #[serde(rename = "CROSS", alias = "cross", alias = "Cross")]
    Cross,
    #[default]
    #[serde(rename = "SQUARE", alias = "square", alias = "Square")]
    Square,
}

impl FromStr for MorphKernel {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cross" => Ok(Self::Cross),
            "square" | "rect" => Ok(Self::Square),
            _ => Err(invalid("MORPH_KERNEL", s)),
        }
    }
}

impl MorphKernel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cross => "CROSS",
            Self::Square => "SQUARE",
        }
    }
}

/// Named set of preprocessing knobs.
///
/// Field names on disk are the upper-case keys below; they are part of the
/// hand-editable file format and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "UPSCALE")]
    pub upscale: i32,

    #[serde(rename = "TONEMAP")]
    pub tone_map: bool,
    #[serde(rename = "TONEMAP_P95_LIMIT")]
    pub tone_map_p95_limit: i32,
    #[serde(rename = "TONEMAP_TARGET")]
    pub tone_map_target: i32,
    #[serde(rename = "TONEMAP_MEAN_LIMIT")]
    pub tone_map_mean_limit: i32,
    #[serde(rename = "TONEMAP_GAMMA")]
    pub tone_map_gamma: f64,

    #[serde(rename = "HSV_MASK")]
    pub hsv_mask: bool,
    #[serde(rename = "HSV_SAT_COLOR")]
    pub hsv_sat_color: f64,
    #[serde(rename = "HSV_VAL_COLOR")]
    pub hsv_val_color: f64,
    #[serde(rename = "HSV_SAT_GRAY")]
    pub hsv_sat_gray: f64,
    #[serde(rename = "HSV_VAL_GRAY")]
    pub hsv_val_gray: f64,

    #[serde(rename = "CONTRAST")]
    pub contrast: f64,
    #[serde(rename = "GAMMA")]
    pub gamma: f64,

    #[serde(rename = "ADAPTIVE")]
    pub adaptive: bool,
    #[serde(rename = "BINARIZER")]
    pub binarizer: BinarizerKind,
    #[serde(rename = "ADAPTIVE_WIN")]
    pub adaptive_window: i32,
    #[serde(rename = "ADAPTIVE_BIAS")]
    pub adaptive_bias: f64,
    #[serde(rename = "SAUVOLA_WIN")]
    pub sauvola_window: i32,
    #[serde(rename = "SAUVOLA_K")]
    pub sauvola_k: f64,
    #[serde(rename = "SAUVOLA_R")]
    pub sauvola_r: f64,

    #[serde(rename = "MORPH")]
    pub morph: bool,
    #[serde(rename = "MORPH_KERNEL")]
    pub morph_kernel: MorphKernel,
    #[serde(rename = "MORPH_DILATE")]
    pub morph_dilate: i32,
    #[serde(rename = "MORPH_ERODE")]
    pub morph_erode: i32,

    #[serde(rename = "SHARPEN")]
    pub sharpen: bool,
    #[serde(rename = "INVERT")]
    pub invert: bool,
    #[serde(rename = "AUTO_POLARITY")]
    pub auto_polarity: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self::hdr()
    }
}

impl Profile {
    /// Tuning for bright, bloomed captures
    pub fn hdr() -> Self {
        Self {
            upscale: 2,
            tone_map: true,
            tone_map_p95_limit: 235,
            tone_map_target: 220,
            tone_map_mean_limit: 160,
            tone_map_gamma: 1.3,
            hsv_mask: false,
            hsv_sat_color: 0.35,
            hsv_val_color: 0.45,
            hsv_sat_gray: 0.15,
            hsv_val_gray: 0.60,
            contrast: 1.0,
            gamma: 1.0,
            adaptive: true,
            binarizer: BinarizerKind::Mean,
            adaptive_window: 31,
            adaptive_bias: 56.0,
            sauvola_window: 25,
            sauvola_k: 0.2,
            sauvola_r: 128.0,
            morph: true,
            morph_kernel: MorphKernel::Square,
            morph_dilate: 1,
            morph_erode: 1,
            sharpen: true,
            invert: false,
            auto_polarity: true,
        }
    }

    /// Tuning for normally exposed captures: thin strokes, lower dynamic range
    pub fn sdr() -> Self {
        Self {
            tone_map: false,
            binarizer: BinarizerKind::Sauvola,
            morph: false,
            morph_kernel: MorphKernel::Cross,
            ..Self::hdr()
        }
    }

    /// Built-in construction rule for an arbitrary profile name
    pub fn builtin_for(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case(SDR) {
            Self::sdr()
        } else {
            Self::hdr()
        }
    }

    /// Clamp every knob into its valid domain
    pub fn sanitized(mut self) -> Self {
        let base = Self::hdr();

        self.upscale = self.upscale.clamp(1, 4);

        self.tone_map_p95_limit = self.tone_map_p95_limit.clamp(0, 255);
        self.tone_map_target = self.tone_map_target.clamp(1, 255);
        self.tone_map_mean_limit = self.tone_map_mean_limit.clamp(0, 255);
        self.tone_map_gamma = clamp_f64(self.tone_map_gamma, 1.0, 3.0, base.tone_map_gamma);

        self.hsv_sat_color = clamp_f64(self.hsv_sat_color, 0.0, 1.0, base.hsv_sat_color);
        self.hsv_val_color = clamp_f64(self.hsv_val_color, 0.0, 1.0, base.hsv_val_color);
        self.hsv_sat_gray = clamp_f64(self.hsv_sat_gray, 0.0, 1.0, base.hsv_sat_gray);
        self.hsv_val_gray = clamp_f64(self.hsv_val_gray, 0.0, 1.0, base.hsv_val_gray);

        self.contrast = clamp_f64(self.contrast, 0.1, 4.0, 1.0);
        self.gamma = clamp_f64(self.gamma, 0.1, 5.0, 1.0);

        self.adaptive_window = odd_window(self.adaptive_window);
        self.adaptive_bias = clamp_f64(self.adaptive_bias, 1.0, 128.0, base.adaptive_bias);
        self.sauvola_window = odd_window(self.sauvola_window);
        self.sauvola_k = clamp_f64(self.sauvola_k, 0.0, 1.0, base.sauvola_k);
        self.sauvola_r = clamp_f64(self.sauvola_r, 1.0, 255.0, base.sauvola_r);

        self.morph_dilate = self.morph_dilate.clamp(0, 8);
        self.morph_erode = self.morph_erode.clamp(0, 8);

        self
    }

    /// Binarizer actually used: Otsu whenever adaptive mode is off
    pub fn effective_binarizer(&self) -> BinarizerKind {
        if self.adaptive {
            self.binarizer
        } else {
            BinarizerKind::Otsu
        }
    }

    /// External view of every knob, keyed by its stable identifier
    pub fn knobs(&self) -> Vec<(&'static str, KnobValue)> {
        let Profile {
            upscale,
            tone_map,
            tone_map_p95_limit,
            tone_map_target,
            tone_map_mean_limit,
            tone_map_gamma,
            hsv_mask,
            hsv_sat_color,
            hsv_val_color,
            hsv_sat_gray,
            hsv_val_gray,
            contrast,
            gamma,
            adaptive,
            binarizer,
            adaptive_window,
            adaptive_bias,
            sauvola_window,
            sauvola_k,
            sauvola_r,
            morph,
            morph_kernel,
            morph_dilate,
            morph_erode,
            sharpen,
            invert,
            auto_polarity,
        } = self;

        vec![
            ("UPSCALE", KnobValue::Int(*upscale)),
            ("TONEMAP", KnobValue::Bool(*tone_map)),
            ("TONEMAP_P95_LIMIT", KnobValue::Int(*tone_map_p95_limit)),
            ("TONEMAP_TARGET", KnobValue::Int(*tone_map_target)),
            ("TONEMAP_MEAN_LIMIT", KnobValue::Int(*tone_map_mean_limit)),
            ("TONEMAP_GAMMA", KnobValue::Float(*tone_map_gamma)),
            ("HSV_MASK", KnobValue::Bool(*hsv_mask)),
            ("HSV_SAT_COLOR", KnobValue::Float(*hsv_sat_color)),
            ("HSV_VAL_COLOR", KnobValue::Float(*hsv_val_color)),
            ("HSV_SAT_GRAY", KnobValue::Float(*hsv_sat_gray)),
            ("HSV_VAL_GRAY", KnobValue::Float(*hsv_val_gray)),
            ("CONTRAST", KnobValue::Float(*contrast)),
            ("GAMMA", KnobValue::Float(*gamma)),
            ("ADAPTIVE", KnobValue::Bool(*adaptive)),
            ("BINARIZER", KnobValue::Text(binarizer.as_str())),
            ("ADAPTIVE_WIN", KnobValue::Int(*adaptive_window)),
            ("ADAPTIVE_BIAS", KnobValue::Float(*adaptive_bias)),
            ("SAUVOLA_WIN", KnobValue::Int(*sauvola_window)),
            ("SAUVOLA_K", KnobValue::Float(*sauvola_k)),
            ("SAUVOLA_R", KnobValue::Float(*sauvola_r)),
            ("MORPH", KnobValue::Bool(*morph)),
            ("MORPH_KERNEL", KnobValue::Text(morph_kernel.as_str())),
            ("MORPH_DILATE", KnobValue::Int(*morph_dilate)),
            ("MORPH_ERODE", KnobValue::Int(*morph_erode)),
            ("SHARPEN", KnobValue::Bool(*sharpen)),
            ("INVERT", KnobValue::Bool(*invert)),
            ("AUTO_POLARITY", KnobValue::Bool(*auto_polarity)),
        ]
    }

    /// Set one knob from its textual form. The result is re-clamped.
    pub fn set_knob(&mut self, key: &str, value: &str) -> Result<(), PrepError> {
        let key = key.trim().to_uppercase();
        match key.as_str() {
            "UPSCALE" => self.upscale = parse_int(&key, value)?,
            "TONEMAP" => self.tone_map = parse_bool(&key, value)?,
            "TONEMAP_P95_LIMIT" => self.tone_map_p95_limit = parse_int(&key, value)?,
            "TONEMAP_TARGET" => self.tone_map_target = parse_int(&key, value)?,
            "TONEMAP_MEAN_LIMIT" => self.tone_map_mean_limit = parse_int(&key, value)?,
            "TONEMAP_GAMMA" => self.tone_map_gamma = parse_float(&key, value)?,
            "HSV_MASK" => self.hsv_mask = parse_bool(&key, value)?,
            "HSV_SAT_COLOR" => self.hsv_sat_color = parse_float(&key, value)?,
            "HSV_VAL_COLOR" => self.hsv_val_color = parse_float(&key, value)?,
            "HSV_SAT_GRAY" => self.hsv_sat_gray = parse_float(&key, value)?,
            "HSV_VAL_GRAY" => self.hsv_val_gray = parse_float(&key, value)?,
            "CONTRAST" => self.contrast = parse_float(&key, value)?,
            "GAMMA" => self.gamma = parse_float(&key, value)?,
            "ADAPTIVE" => self.adaptive = parse_bool(&key, value)?,
            "BINARIZER" => self.binarizer = value.parse()?,
            "ADAPTIVE_WIN" => self.adaptive_window = parse_int(&key, value)?,
            "ADAPTIVE_BIAS" => self.adaptive_bias = parse_float(&key, value)?,
            "SAUVOLA_WIN" => self.sauvola_window = parse_int(&key, value)?,
            "SAUVOLA_K" => self.sauvola_k = parse_float(&key, value)?,
            "SAUVOLA_R" => self.sauvola_r = parse_float(&key, value)?,
            "MORPH" => self.morph = parse_bool(&key, value)?,
            "MORPH_KERNEL" => self.morph_kernel = value.parse()?,
            "MORPH_DILATE" => self.morph_dilate = parse_int(&key, value)?,
            "MORPH_ERODE" => self.morph_erode = parse_int(&key, value)?,
            "SHARPEN" => self.sharpen = parse_bool(&key, value)?,
            "INVERT" => self.invert = parse_bool(&key, value)?,
            "AUTO_POLARITY" => self.auto_polarity = parse_bool(&key, value)?,
            _ => return Err(PrepError::UnknownKnob(key)),
        }

        *self = std::mem::take(self).sanitized();
        Ok(())
    }
}

/// Typed value of a single knob in the external view
#[derive(Debug, Clone, PartialEq)]
pub enum KnobValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    Text(&'static str),
}

impl fmt::Display for KnobValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnobValue::Bool(v) => write!(f, "{}", v),
            KnobValue::Int(v) => write!(f, "{}", v),
            KnobValue::Float(v) => write!(f, "{}", v),
            KnobValue::Text(v) => f.write_str(v),
        }
    }
}

/// Force a window size odd and within 3..=255
fn odd_window(size: i32) -> i32 {
    let size = size.clamp(3, 255);
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

fn clamp_f64(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

fn invalid(key: &str, value: &str) -> PrepError {
    PrepError::InvalidKnobValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, PrepError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_int(key: &str, value: &str) -> Result<i32, PrepError> {
    let trimmed = value.trim();
    trimmed
        .parse::<i32>()
        .or_else(|_| trimmed.parse::<f64>().map(|v| v.round() as i32))
        .map_err(|_| invalid(key, value))
}

fn parse_float(key: &str, value: &str) -> Result<f64, PrepError> {
    value.trim().parse::<f64>().map_err(|_| invalid(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_forces_odd_windows() {
        let profile = Profile {
            adaptive_window: 30,
            sauvola_window: 1,
            ..Profile::hdr()
        }
        .sanitized();

        assert_eq!(profile.adaptive_window, 31);
        assert_eq!(profile.sauvola_window, 3);
    }

    #[test]
    fn test_sanitize_clamps_ranges() {
        let profile = Profile {
            upscale: 9,
            adaptive_bias: -4.0,
            sauvola_k: 3.0,
            hsv_val_gray: f64::NAN,
            morph_erode: -1,
            ..Profile::hdr()
        }
        .sanitized();

        assert_eq!(profile.upscale, 4);
        assert_eq!(profile.adaptive_bias, 1.0);
        assert_eq!(profile.sauvola_k, 1.0);
        assert_eq!(profile.hsv_val_gray, Profile::hdr().hsv_val_gray);
        assert_eq!(profile.morph_erode, 0);
    }

    #[test]
    fn test_builtins_are_already_valid() {
        assert_eq!(Profile::hdr().sanitized(), Profile::hdr());
        assert_eq!(Profile::sdr().sanitized(), Profile::sdr());
    }

    #[test]
    fn test_otsu_when_adaptive_disabled() {
        let profile = Profile {
            adaptive: false,
            binarizer: BinarizerKind::Sauvola,
            ..Profile::hdr()
        };
        assert_eq!(profile.effective_binarizer(), BinarizerKind::Otsu);
    }

    #[test]
    fn test_set_knob_parses_and_clamps() {
        let mut profile = Profile::hdr();
        profile.set_knob("adaptive_win", "20").unwrap();
        profile.set_knob("BINARIZER", "sauvola").unwrap();
        profile.set_knob("MORPH", "off").unwrap();

        assert_eq!(profile.adaptive_window, 21);
        assert_eq!(profile.binarizer, BinarizerKind::Sauvola);
        assert!(!profile.morph);
    }

    #[test]
    fn test_enum_knobs_parse_case_insensitively() {
        assert_eq!(" Otsu ".parse::<BinarizerKind>().unwrap(), BinarizerKind::Otsu);
        assert_eq!("adaptive".parse::<BinarizerKind>().unwrap(), BinarizerKind::Mean);
        assert_eq!("RECT".parse::<MorphKernel>().unwrap(), MorphKernel::Square);

        let err = "gaussian".parse::<BinarizerKind>().unwrap_err();
        assert!(matches!(err, PrepError::InvalidKnobValue { ref key, .. } if key == "BINARIZER"));
        assert!("diamond".parse::<MorphKernel>().is_err());
    }

    #[test]
    fn test_set_knob_rejects_unknown_key() {
        let mut profile = Profile::hdr();
        let err = profile.set_knob("NOT_A_KNOB", "1").unwrap_err();
        assert!(matches!(err, PrepError::UnknownKnob(_)));
    }

    #[test]
    fn test_knobs_cover_serialized_keys() {
        let profile = Profile::sdr();
        let json = serde_json::to_value(&profile).unwrap();
        let object = json.as_object().unwrap();
        let knobs = profile.knobs();

        assert_eq!(knobs.len(), object.len());
        for (key, value) in knobs {
            assert!(object.contains_key(key), "missing key {}", key);
            if let KnobValue::Text(text) = value {
                assert_eq!(object[key], serde_json::Value::from(text));
            }
        }
    }
}
