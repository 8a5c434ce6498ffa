//! Derived physical parameters.
//!
//! Quantities the engine needs that are not part of the scene schema. All of
//! them are pure functions of the resolved [`SceneModel`], so the same scene
//! always derives the same parameters.
//!
//! # Time step
//!
//! The global step is `0.01 * dl_min`, where `dl_min` is the smallest
//! element length over all rods. This is an empirical heuristic for explicit
//! rod integration, not a CFL bound; callers that need a tighter guarantee
//! should treat it as a starting point.

use std::f64::consts::PI;

use rodforge_scene::{Material, SceneModel};
use serde::{Deserialize, Serialize};

/// Ratio between time step and smallest element length.
pub const DT_SAFETY_FACTOR: f64 = 0.01;

/// Element length assumed when the scene has no rods.
pub const FALLBACK_ELEMENT_LENGTH: f64 = 0.02;

/// Ceiling applied to the magnitude of a muscle curvature amplitude.
pub const MUSCLE_AMPLITUDE_CEILING: f64 = 0.02;

/// Integration steps between two recorded trajectory samples.
pub const DIAGNOSTIC_STRIDE: u32 = 200;

/// Scene-wide derived parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    /// Integration time step in seconds
    pub time_step: f64,
    /// `floor(duration / time_step)`
    pub total_steps: u64,
    /// Smallest element length the step was derived from
    pub min_element_length: f64,
    /// Simulated time in seconds
    pub duration: f64,
    /// Frame rate recorded in the trajectory metadata
    pub fps: u32,
}

/// Computes [`DerivedParameters`] for a resolved scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterDeriver;

impl ParameterDeriver {
    pub fn derive(&self, scene: &SceneModel) -> DerivedParameters {
        let min_element_length = min_element_length(scene).unwrap_or(FALLBACK_ELEMENT_LENGTH);
        let time_step = stable_time_step(min_element_length);
        let duration = scene.render.duration;
        DerivedParameters {
            time_step,
            total_steps: total_steps(duration, time_step),
            min_element_length,
            duration,
            fps: scene.render.fps,
        }
    }
}

/// `G = E / (nu + 1)`.
pub fn shear_modulus(material: &Material) -> f64 {
    material.youngs_modulus / (material.poisson_ratio + 1.0)
}

/// Smallest `length / element_count` over the scene's rods, or `None` when
/// there are no rods.
pub fn min_element_length(scene: &SceneModel) -> Option<f64> {
    scene
        .objects
        .iter()
        .map(|rod| rod.element_length())
        .fold(None, |min, dl| match min {
            Some(m) if m <= dl => Some(m),
            _ => Some(dl),
        })
}

pub fn stable_time_step(min_element_length: f64) -> f64 {
    DT_SAFETY_FACTOR * min_element_length
}

pub fn total_steps(duration: f64, time_step: f64) -> u64 {
    (duration / time_step).floor() as u64
}

/// `k = 2 * pi / wave_length`.
pub fn wave_number(wave_length: f64) -> f64 {
    2.0 * PI / wave_length
}

/// Magnitude of a requested curvature amplitude, capped at
/// [`MUSCLE_AMPLITUDE_CEILING`].
pub fn clamp_muscle_amplitude(amplitude: f64) -> f64 {
    amplitude.abs().min(MUSCLE_AMPLITUDE_CEILING)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(youngs_modulus: f64, poisson_ratio: f64) -> Material {
        Material {
            name: "test".to_string(),
            density: 1000.0,
            youngs_modulus,
            poisson_ratio,
        }
    }

    #[test]
    fn shear_modulus_divides_by_one_plus_nu() {
        assert_eq!(shear_modulus(&material(3.0e6, 0.5)), 2.0e6);
        assert_eq!(shear_modulus(&material(200e9, 0.25)), 160e9);
    }

    #[test]
    fn time_step_scales_with_element_length() {
        assert!((stable_time_step(0.02) - 0.0002).abs() < 1e-18);
    }

    #[test]
    fn total_steps_floors() {
        assert_eq!(total_steps(1.0, 0.3), 3);
        assert_eq!(total_steps(0.0, 0.1), 0);
    }

    #[test]
    fn amplitude_is_clamped_by_magnitude() {
        assert_eq!(clamp_muscle_amplitude(0.01), 0.01);
        assert_eq!(clamp_muscle_amplitude(-0.01), 0.01);
        assert_eq!(clamp_muscle_amplitude(5.0), MUSCLE_AMPLITUDE_CEILING);
    }

    #[test]
    fn wave_number_of_unit_wave() {
        assert!((wave_number(1.0) - 2.0 * PI).abs() < 1e-12);
        assert!((wave_number(0.5) - 4.0 * PI).abs() < 1e-12);
    }
}
