use std::fmt;
use std::str::FromStr;

use rps_core::{BoundaryMode, Engine, EngineConfig, Kind, Vector2D};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or checking [`SimulationSettings`]
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} must be a finite number greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must be a finite, non-negative number, got {value}")]
    Negative { field: &'static str, value: f32 },
}

/// Simulation tunables as loaded from a settings file.
/// Every field falls back to the engine default when missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    pub agent_count: usize,
    pub width: f32,
    pub height: f32,
    pub agent_radius: f32,
    pub max_speed: f32,
    pub max_force: f32,
    pub vision_radius: f32,
    pub avoid_radius: f32,
    pub edge_margin: f32,
    pub edge_gain: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub chase_weight: f32,
    pub flee_weight: f32,
    pub separation_gain: f32,
    pub boundary: BoundaryMode,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            agent_count: 150,
            width: config.width,
            height: config.height,
            agent_radius: config.agent_radius,
            max_speed: config.max_speed,
            max_force: config.max_force,
            vision_radius: config.vision_radius,
            avoid_radius: config.avoid_radius,
            edge_margin: config.edge_margin,
            edge_gain: config.edge_gain,
            alignment_weight: config.alignment_weight,
            cohesion_weight: config.cohesion_weight,
            chase_weight: config.chase_weight,
            flee_weight: config.flee_weight,
            separation_gain: config.separation_gain,
            boundary: config.boundary,
        }
    }
}

impl SimulationSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (field, value) in [
            ("width", self.width),
            ("height", self.height),
            ("agent_radius", self.agent_radius),
            ("max_speed", self.max_speed),
            ("max_force", self.max_force),
            ("vision_radius", self.vision_radius),
            ("avoid_radius", self.avoid_radius),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SettingsError::NotPositive { field, value });
            }
        }

        for (field, value) in [
            ("edge_margin", self.edge_margin),
            ("edge_gain", self.edge_gain),
            ("alignment_weight", self.alignment_weight),
            ("cohesion_weight", self.cohesion_weight),
            ("chase_weight", self.chase_weight),
            ("flee_weight", self.flee_weight),
            ("separation_gain", self.separation_gain),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::Negative { field, value });
            }
        }

        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            width: self.width,
            height: self.height,
            agent_radius: self.agent_radius,
            max_speed: self.max_speed,
            max_force: self.max_force,
            vision_radius: self.vision_radius,
            avoid_radius: self.avoid_radius,
            edge_margin: self.edge_margin,
            edge_gain: self.edge_gain,
            alignment_weight: self.alignment_weight,
            cohesion_weight: self.cohesion_weight,
            chase_weight: self.chase_weight,
            flee_weight: self.flee_weight,
            separation_gain: self.separation_gain,
            boundary: self.boundary,
        }
    }
}

/// Per-kind head count at a given tick, as shown by a statistics overlay
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PopulationStats {
    pub tick: u64,
    pub rock: usize,
    pub paper: usize,
    pub scissors: usize,
}

impl PopulationStats {
    pub fn from_engine(engine: &Engine) -> Self {
        let [rock, paper, scissors] = engine.census();
        Self {
            tick: engine.tick_count(),
            rock,
            paper,
            scissors,
        }
    }

    pub fn count(&self, kind: Kind) -> usize {
        match kind {
            Kind::Rock => self.rock,
            Kind::Paper => self.paper,
            Kind::Scissors => self.scissors,
        }
    }

    pub fn total(&self) -> usize {
        self.rock + self.paper + self.scissors
    }

    /// The only kind left alive, if the population has collapsed to one.
    pub fn winner(&self) -> Option<Kind> {
        let mut alive = Kind::ALL.into_iter().filter(|&kind| self.count(kind) > 0);
        match (alive.next(), alive.next()) {
            (Some(kind), None) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for PopulationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {}: rock {} | paper {} | scissors {}",
            self.tick, self.rock, self.paper, self.scissors
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SpawnParseError {
    #[error("expected `x,y,kind`, got {0} field(s)")]
    FieldCount(usize),

    #[error("invalid coordinate `{0}`")]
    Coordinate(String),

    #[error("unknown kind `{0}` (use rock/paper/scissors or 1/2/3)")]
    Kind(String),
}

/// Request to drop a new agent into the world between ticks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpawnRequest {
    pub x: f32,
    pub y: f32,
    pub kind: Kind,
}

impl SpawnRequest {
    pub fn new(x: f32, y: f32, kind: Kind) -> Self {
        Self { x, y, kind }
    }

    pub fn position(&self) -> Vector2D {
        Vector2D::new(self.x, self.y)
    }

    pub fn apply(&self, engine: &mut Engine) {
        engine.spawn(self.position(), self.kind);
    }
}

impl FromStr for SpawnRequest {
    type Err = SpawnParseError;

    /// Parses `x,y,kind`, where kind is a name or a `1`/`2`/`3` key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        let &[x, y, kind] = fields.as_slice() else {
            return Err(SpawnParseError::FieldCount(fields.len()));
        };

        let coordinate = |field: &str| {
            field
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| SpawnParseError::Coordinate(field.to_string()))
        };

        let kind = Kind::from_name(kind)
            .or_else(|| kind.parse::<u8>().ok().and_then(Kind::from_key))
            .ok_or_else(|| SpawnParseError::Kind(kind.to_string()))?;

        Ok(Self::new(coordinate(x)?, coordinate(y)?, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = SimulationSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.engine_config(), EngineConfig::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings =
            SimulationSettings::from_json(r#"{"agent_count": 12, "boundary": "repel"}"#).unwrap();
        assert_eq!(settings.agent_count, 12);
        assert_eq!(settings.boundary, BoundaryMode::Repel);
        assert_eq!(settings.max_speed, 2.0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let err = SimulationSettings::from_json(r#"{"max_speed": 0.0}"#).unwrap_err();
        assert!(matches!(err, SettingsError::NotPositive { field: "max_speed", .. }));

        let err = SimulationSettings::from_json(r#"{"flee_weight": -1.0}"#).unwrap_err();
        assert!(matches!(err, SettingsError::Negative { field: "flee_weight", .. }));

        let err = SimulationSettings::from_json(r#"{"width": -5.0}"#).unwrap_err();
        assert!(matches!(err, SettingsError::NotPositive { field: "width", .. }));

        let err = SimulationSettings::from_json("{not json").unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn test_small_world_settings_accepted() {
        let tiny = SimulationSettings {
            width: 150.0,
            height: 150.0,
            ..SimulationSettings::default()
        };
        assert!(tiny.validate().is_ok());

        let wide_avoid = SimulationSettings {
            avoid_radius: 30.0,
            vision_radius: 20.0,
            ..SimulationSettings::default()
        };
        assert!(wide_avoid.validate().is_ok());

        let settings = SimulationSettings::from_json(
            r#"{"width": 60.0, "height": 40.0, "agent_radius": 2.0, "vision_radius": 10.0}"#,
        )
        .unwrap();
        assert_eq!(settings.engine_config().vision_radius, 10.0);
    }

    #[test]
    fn test_stats_winner() {
        let mut stats = PopulationStats {
            tick: 5,
            rock: 3,
            paper: 0,
            scissors: 1,
        };
        assert_eq!(stats.winner(), None);
        assert_eq!(stats.total(), 4);

        stats.scissors = 0;
        assert_eq!(stats.winner(), Some(Kind::Rock));
        assert_eq!(PopulationStats::default().winner(), None);
    }

    #[test]
    fn test_stats_from_engine() {
        let mut engine = Engine::new(EngineConfig::default());
        SpawnRequest::new(10.0, 10.0, Kind::Paper).apply(&mut engine);
        SpawnRequest::new(700.0, 500.0, Kind::Scissors).apply(&mut engine);

        let stats = PopulationStats::from_engine(&engine);
        assert_eq!(stats.count(Kind::Paper), 1);
        assert_eq!(stats.count(Kind::Scissors), 1);
        assert_eq!(stats.to_string(), "tick 0: rock 0 | paper 1 | scissors 1");
    }

    #[test]
    fn test_parse_spawn_request() {
        let request: SpawnRequest = "120, 45.5, scissors".parse().unwrap();
        assert_eq!(request, SpawnRequest::new(120.0, 45.5, Kind::Scissors));

        let request: SpawnRequest = "1,2,2".parse().unwrap();
        assert_eq!(request.kind, Kind::Paper);
    }

    #[test]
    fn test_parse_spawn_request_errors() {
        assert_eq!(
            "1,2".parse::<SpawnRequest>(),
            Err(SpawnParseError::FieldCount(2))
        );
        assert_eq!(
            "x,2,rock".parse::<SpawnRequest>(),
            Err(SpawnParseError::Coordinate("x".to_string()))
        );
        assert_eq!(
            "1,2,lizard".parse::<SpawnRequest>(),
            Err(SpawnParseError::Kind("lizard".to_string()))
        );
    }

    #[test]
    fn test_stats_serialize() {
        let stats = PopulationStats {
            tick: 1,
            rock: 2,
            paper: 3,
            scissors: 4,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["paper"], 3);
    }
}
