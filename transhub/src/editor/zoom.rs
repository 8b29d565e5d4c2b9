use crate::error::{Error, Result};

/// Allowed zoom scales, snapped to a fixed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    min: f64,
    max: f64,
    step: f64,
}

impl ZoomRange {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && min > 0.0) {
            return Err(Error::InvalidScale(min));
        }
        if !(max.is_finite() && max >= min) {
            return Err(Error::InvalidScale(max));
        }
        if !(step.is_finite() && step > 0.0) {
            return Err(Error::InvalidScale(step));
        }
        Ok(Self { min, max, step })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Clamp into range and snap to the step grid. NaN maps to the minimum.
    pub fn clamp(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min;
        }
        let bounded = scale.clamp(self.min, self.max);
        let steps = ((bounded - self.min) / self.step).round();
        let snapped = (self.min + steps * self.step).min(self.max);
        // Trim float noise such as 1.1000000000000001
        (snapped * 1e6).round() / 1e6
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 2.0,
            step: 0.1,
        }
    }
}

/// Editor behaviour knobs, usually built from the `[editor]` config section.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSettings {
    pub zoom: ZoomRange,
    pub default_zoom: f64,
    /// Table for new fields; the catalog's first table when `None`.
    pub default_table: Option<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            zoom: ZoomRange::default(),
            default_zoom: 1.0,
            default_table: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        let zoom = ZoomRange::default();
        assert_eq!(zoom.clamp(1.0), 1.0);
        assert_eq!(zoom.clamp(0.1), 0.5);
        assert_eq!(zoom.clamp(-3.0), 0.5);
        assert_eq!(zoom.clamp(9.0), 2.0);
        assert_eq!(zoom.clamp(f64::INFINITY), 2.0);
        assert_eq!(zoom.clamp(f64::NAN), 0.5);
    }

    #[test]
    fn test_snaps_to_step() {
        let zoom = ZoomRange::default();
        assert_eq!(zoom.clamp(1.04), 1.0);
        assert_eq!(zoom.clamp(1.06), 1.1);
        assert_eq!(zoom.clamp(1.0 + 0.1), 1.1);
        assert_eq!(zoom.clamp(0.7 + 0.1 + 0.1), 0.9);
    }

    #[test]
    fn test_new_validates() {
        assert!(ZoomRange::new(0.25, 4.0, 0.25).is_ok());
        assert!(matches!(
            ZoomRange::new(0.0, 2.0, 0.1),
            Err(Error::InvalidScale(_))
        ));
        assert!(ZoomRange::new(2.0, 1.0, 0.1).is_err());
        assert!(ZoomRange::new(0.5, 2.0, 0.0).is_err());
    }
}
