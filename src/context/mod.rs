// Context sampling - what the world looks like right now.
// Scanning the environment is comparatively expensive, so the oracle samples
// at a bounded rate instead of every frame and debounces combat edges.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Immutable view of the environment at one sampling instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub in_combat: bool,
    pub is_daytime: bool,
    pub is_winter: bool,
    pub game_paused: bool,
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self {
            in_combat: false,
            is_daytime: true,
            is_winter: false,
            game_paused: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DangerLevel {
    None,
    Low,
    High,
}

/// Raw host signals before they are reduced to a snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentReading {
    pub hour_of_day: f32,
    pub season: Season,
    pub danger: DangerLevel,
    /// someone is attacking, or fleeing from, something right now
    pub skirmish: bool,
    pub paused: bool,
}

impl EnvironmentReading {
    /// Daytime is `[day_start, day_end)` in hours
    pub fn to_snapshot(&self, day_start: f32, day_end: f32) -> ContextSnapshot {
        ContextSnapshot {
            in_combat: self.danger >= DangerLevel::High || self.skirmish,
            is_daytime: self.hour_of_day >= day_start && self.hour_of_day < day_end,
            is_winter: self.season == Season::Winter,
            game_paused: self.paused,
        }
    }
}

pub trait ContextProvider {
    fn sample(&mut self) -> ContextSnapshot;
}

impl<F> ContextProvider for F
where
    F: FnMut() -> ContextSnapshot,
{
    fn sample(&mut self) -> ContextSnapshot {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatShift {
    Entered,
    Exited,
}

/// Rate-limited sampler with combat edge tracking.
///
/// A combat edge stays pending until the caller acknowledges it, so an edge
/// that arrives mid-fade is picked up on a later tick instead of being lost.
#[derive(Debug, Clone)]
pub struct ContextOracle {
    interval: Duration,
    since_last: Duration,
    sampled_once: bool,
    current: ContextSnapshot,
    acknowledged_combat: bool,
}

impl ContextOracle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            since_last: Duration::ZERO,
            sampled_once: false,
            current: ContextSnapshot::default(),
            acknowledged_combat: false,
        }
    }

    /// Samples the provider if the interval has elapsed (or never sampled).
    /// Returns the fresh snapshot when a sample was taken.
    pub fn poll<P: ContextProvider + ?Sized>(
        &mut self,
        provider: &mut P,
        dt: Duration,
    ) -> Option<ContextSnapshot> {
        self.since_last += dt;
        if self.sampled_once && self.since_last < self.interval {
            return None;
        }

        self.since_last = Duration::ZERO;
        self.sampled_once = true;
        let snapshot = provider.sample();
        if snapshot != self.current {
            debug!("Context changed: {:?} -> {:?}", self.current, snapshot);
        }
        self.current = snapshot;
        Some(snapshot)
    }

    /// Immediate out-of-band sample. The combat edge is acknowledged so no
    /// context transition fires for it.
    pub fn refresh_now<P: ContextProvider + ?Sized>(&mut self, provider: &mut P) -> ContextSnapshot {
        self.current = provider.sample();
        self.sampled_once = true;
        self.since_last = Duration::ZERO;
        self.acknowledged_combat = self.current.in_combat;
        self.current
    }

    pub fn current(&self) -> ContextSnapshot {
        self.current
    }

    pub fn pending_shift(&self) -> Option<CombatShift> {
        match (self.acknowledged_combat, self.current.in_combat) {
            (false, true) => Some(CombatShift::Entered),
            (true, false) => Some(CombatShift::Exited),
            _ => None,
        }
    }

    pub fn acknowledge(&mut self) {
        self.acknowledged_combat = self.current.in_combat;
    }
}

/// Stand-in environment for the driver binary: a day clock plus toggles.
#[derive(Debug, Clone)]
pub struct ClockEnvironment {
    pub hour_of_day: f32,
    pub season: Season,
    pub danger: DangerLevel,
    pub paused: bool,
    hours_per_second: f32,
    day_start: f32,
    day_end: f32,
}

impl ClockEnvironment {
    pub fn new(start_hour: f32, minutes_per_day: f32, day_start: f32, day_end: f32) -> Self {
        let seconds_per_day = (minutes_per_day * 60.0).max(1.0);
        Self {
            hour_of_day: start_hour.rem_euclid(24.0),
            season: Season::Spring,
            danger: DangerLevel::None,
            paused: false,
            hours_per_second: 24.0 / seconds_per_day,
            day_start,
            day_end,
        }
    }

    pub fn advance(&mut self, dt: Duration) {
        if self.paused {
            return;
        }
        self.hour_of_day = (self.hour_of_day + dt.as_secs_f32() * self.hours_per_second).rem_euclid(24.0);
    }

    pub fn toggle_combat(&mut self) {
        self.danger = if self.danger == DangerLevel::High {
            DangerLevel::None
        } else {
            DangerLevel::High
        };
    }

    pub fn toggle_winter(&mut self) {
        self.season = if self.season == Season::Winter {
            Season::Spring
        } else {
            Season::Winter
        };
    }

    pub fn reading(&self) -> EnvironmentReading {
        EnvironmentReading {
            hour_of_day: self.hour_of_day,
            season: self.season,
            danger: self.danger,
            skirmish: false,
            paused: self.paused,
        }
    }
}

impl ContextProvider for ClockEnvironment {
    fn sample(&mut self) -> ContextSnapshot {
        self.reading().to_snapshot(self.day_start, self.day_end)
    }
}
