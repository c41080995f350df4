//! Day/night cycle: scene clock, sun direction and sky colour.

use engine_core::SkyConfig;
use glam::Vec3;
use std::f32::consts::{FRAC_PI_2, TAU};

/// Scene minutes in a day.
const MINUTES_PER_DAY: f32 = 24.0 * 60.0;

/// Sun elevation (direction Y) above which the sky blends from sunset towards day.
const DAY_THRESHOLD: f32 = 0.1;
/// Sun elevation below which the sky is fully night.
const NIGHT_THRESHOLD: f32 = -0.1;

/// Light of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Daylight {
    /// Unit direction towards the sun.
    pub sun_direction: Vec3,
    pub sky_color: Vec3,
}

/// Scene clock advancing at a fixed multiple of real time.
#[derive(Debug, Clone)]
pub struct DayNightCycle {
    /// Scene minutes since midnight of day zero.
    scene_time: f32,
    rate: f32,
    tilt: f32,
    day: Vec3,
    sunset: Vec3,
    night: Vec3,
}

impl DayNightCycle {
    pub fn new(config: &SkyConfig) -> Self {
        Self {
            scene_time: config.start_time,
            rate: config.time_rate,
            tilt: config.sun_tilt,
            day: config.day(),
            sunset: config.sunset(),
            night: config.night(),
        }
    }

    /// Advance by `dt` real seconds and return the new light.
    pub fn advance(&mut self, dt: f32) -> Daylight {
        self.scene_time += dt * self.rate;
        // Keep precision over long sessions; the hour only depends on time mod a day.
        if self.scene_time >= MINUTES_PER_DAY * 64.0 {
            self.scene_time %= MINUTES_PER_DAY;
        }
        self.daylight()
    }

    pub fn scene_time(&self) -> f32 {
        self.scene_time
    }

    /// Hour of day in `[0, 24)`.
    pub fn hour(&self) -> f32 {
        (self.scene_time / 60.0).rem_euclid(24.0)
    }

    /// `HH:MM` of the current hour.
    pub fn clock_text(&self) -> String {
        let hour = self.hour();
        let whole = hour.floor();
        let minute = ((hour - whole) * 60.0).floor() as u32;
        format!("{:02}:{:02}", whole as u32, minute.min(59))
    }

    /// Sun on a circle through the zenith, rising in +X at 06:00, slightly tilted in Z.
    pub fn sun_direction(&self) -> Vec3 {
        let angle = self.hour() / 24.0 * TAU - FRAC_PI_2;
        Vec3::new(angle.cos(), angle.sin(), self.tilt).normalize()
    }

    pub fn daylight(&self) -> Daylight {
        let sun_direction = self.sun_direction();
        Daylight {
            sun_direction,
            sky_color: self.sky_color_for(sun_direction.y),
        }
    }

    /// Piecewise blend night → sunset → day by sun elevation.
    pub fn sky_color_for(&self, sun_height: f32) -> Vec3 {
        if sun_height > DAY_THRESHOLD {
            let t = (sun_height - DAY_THRESHOLD) / (1.0 - DAY_THRESHOLD);
            self.sunset.lerp(self.day, t)
        } else if sun_height > NIGHT_THRESHOLD {
            let t = (sun_height - NIGHT_THRESHOLD) / (DAY_THRESHOLD - NIGHT_THRESHOLD);
            self.night.lerp(self.sunset, t)
        } else {
            self.night
        }
    }
}
