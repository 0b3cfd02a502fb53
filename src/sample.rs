use bytemuck::{Pod, Zeroable};

/// Standard gravity in m/s², the magnitude of a device at rest.
pub const GRAVITY: f32 = 9.8;

/// Raw accelerometer reading as delivered by the sensor driver.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable, PartialEq)]
pub struct RawSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub _pad0: u32,
    pub timestamp_ms: i64,
}

impl RawSample {
    pub fn new(x: f32, y: f32, z: f32, timestamp_ms: i64) -> Self {
        Self {
            x,
            y,
            z,
            _pad0: 0,
            timestamp_ms,
        }
    }

    /// Euclidean norm of the acceleration vector.
    #[inline(always)]
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A sample accepted into the sliding window, with its magnitude precomputed.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable, PartialEq)]
pub struct AccelSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub magnitude: f32,
    pub timestamp_ms: i64,
}

impl AccelSample {
    pub fn new(x: f32, y: f32, z: f32, magnitude: f32, timestamp_ms: i64) -> Self {
        Self {
            x,
            y,
            z,
            magnitude,
            timestamp_ms,
        }
    }

    /// Builds a sample whose magnitude is exactly the norm of the vector.
    pub fn from_raw(raw: &RawSample) -> Self {
        Self::new(raw.x, raw.y, raw.z, raw.magnitude(), raw.timestamp_ms)
    }

    /// Builds a sample pointing straight down the z axis with the given magnitude.
    /// Handy for synthetic streams where only the magnitude matters.
    pub fn vertical(magnitude: f32, timestamp_ms: i64) -> Self {
        Self::new(0.0, 0.0, magnitude, magnitude, timestamp_ms)
    }

    /// False for NaN or infinite components and for NaN, infinite or negative magnitudes.
    #[inline(always)]
    pub fn is_well_formed(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
            && self.magnitude.is_finite()
            && self.magnitude >= 0.0
    }
}

impl From<RawSample> for AccelSample {
    fn from(raw: RawSample) -> Self {
        Self::from_raw(&raw)
    }
}

#[cfg(test)]
mod sample_tests {
    use super::*;

    #[test]
    fn test_magnitude_is_euclidean_norm() {
        let raw = RawSample::new(3.0, 4.0, 12.0, 0);
        assert_eq!(raw.magnitude(), 13.0);

        let sample = AccelSample::from(raw);
        assert_eq!(sample.magnitude, 13.0);
        assert_eq!(sample.timestamp_ms, 0);
    }

    #[test]
    fn test_well_formed() {
        assert!(AccelSample::vertical(9.8, 10).is_well_formed());
        assert!(AccelSample::vertical(0.0, 10).is_well_formed());
        assert!(!AccelSample::new(0.0, 0.0, 9.8, -1.0, 10).is_well_formed());
        assert!(!AccelSample::new(f32::NAN, 0.0, 9.8, 9.8, 10).is_well_formed());
        assert!(!AccelSample::new(0.0, 0.0, 9.8, f32::INFINITY, 10).is_well_formed());
    }

    #[test]
    fn test_raw_sample_layout_has_no_implicit_padding() {
        assert_eq!(size_of::<RawSample>(), 24);
        assert_eq!(size_of::<AccelSample>(), 24);
    }
}
