#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::vec::Vec;

#[cfg(feature = "std")]
use rand::Rng;

/// A 2D vector used for position, velocity and force
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn magnitude(&self) -> f32 {
        sqrt(self.length_squared())
    }

    /// Unit vector in the same direction, or zero for a zero-length vector.
    pub fn normalize(&self) -> Self {
        self.with_magnitude(1.0)
    }

    /// Scales the whole vector down to `max` magnitude, keeping its direction.
    pub fn limit(&self, max: f32) -> Self {
        if self.length_squared() > max * max {
            self.with_magnitude(max)
        } else {
            *self
        }
    }

    fn with_magnitude(&self, length: f32) -> Self {
        let mag = self.magnitude();
        if mag > 0.0 {
            *self * (length / mag)
        } else {
            Self::zero()
        }
    }

    pub fn distance(&self, other: &Vector2D) -> f32 {
        (*self - *other).magnitude()
    }
}

#[cfg(feature = "std")]
fn sqrt(value: f32) -> f32 {
    value.sqrt()
}

#[cfg(not(feature = "std"))]
fn sqrt(value: f32) -> f32 {
    libm::sqrtf(value)
}

impl core::ops::Add for Vector2D {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl core::ops::Sub for Vector2D {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl core::ops::Mul<f32> for Vector2D {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }
}

impl core::ops::Div<f32> for Vector2D {
    type Output = Self;

    fn div(self, scalar: f32) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
        }
    }
}

impl core::ops::AddAssign for Vector2D {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl core::ops::SubAssign for Vector2D {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

/// The three agent kinds. Each one preys on exactly one other kind:
/// rock beats scissors, scissors beats paper, paper beats rock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Kind {
    Rock,
    Paper,
    Scissors,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Rock, Kind::Paper, Kind::Scissors];

    /// The kind this one chases and converts.
    pub const fn prey(self) -> Kind {
        match self {
            Kind::Rock => Kind::Scissors,
            Kind::Scissors => Kind::Paper,
            Kind::Paper => Kind::Rock,
        }
    }

    /// The kind this one flees from.
    pub const fn predator(self) -> Kind {
        match self {
            Kind::Rock => Kind::Paper,
            Kind::Paper => Kind::Scissors,
            Kind::Scissors => Kind::Rock,
        }
    }

    pub fn beats(self, other: Kind) -> bool {
        self.prey() == other
    }

    /// Position in [`Kind::ALL`], used to index per-kind counters.
    pub const fn index(self) -> usize {
        match self {
            Kind::Rock => 0,
            Kind::Paper => 1,
            Kind::Scissors => 2,
        }
    }

    /// Maps the `1`/`2`/`3` spawn keys to a kind.
    pub fn from_key(key: u8) -> Option<Kind> {
        match key {
            1 => Some(Kind::Rock),
            2 => Some(Kind::Paper),
            3 => Some(Kind::Scissors),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Kind::Rock => "rock",
            Kind::Paper => "paper",
            Kind::Scissors => "scissors",
        }
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl core::fmt::Display for Kind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "std")]
impl rand::distributions::Distribution<Kind> for rand::distributions::Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Kind {
        Kind::ALL[rng.gen_range(0..Kind::ALL.len())]
    }
}

/// What happens to agents that reach the edge of the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BoundaryMode {
    /// Agents leaving one side reappear on the opposite side.
    #[default]
    Wrap,
    /// Agents inside the edge margin are pushed back toward the interior.
    Repel,
}

impl BoundaryMode {
    pub fn toggled(self) -> Self {
        match self {
            BoundaryMode::Wrap => BoundaryMode::Repel,
            BoundaryMode::Repel => BoundaryMode::Wrap,
        }
    }
}

/// A single agent
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    position: Vector2D,
    velocity: Vector2D,
    pending_force: Vector2D,
    kind: Kind,
}

impl Agent {
    pub fn new(position: Vector2D, velocity: Vector2D, kind: Kind) -> Self {
        Self {
            position,
            velocity,
            pending_force: Vector2D::zero(),
            kind,
        }
    }

    /// Uniform position inside the world, velocity components in `±max_speed / 2`.
    #[cfg(feature = "std")]
    pub fn random(config: &EngineConfig) -> Self {
        let mut rng = rand::thread_rng();
        let position = Vector2D::new(
            rng.gen::<f32>() * config.width,
            rng.gen::<f32>() * config.height,
        );
        let velocity = Vector2D::new(
            (rng.gen::<f32>() - 0.5) * config.max_speed,
            (rng.gen::<f32>() - 0.5) * config.max_speed,
        );
        Self::new(position, velocity, rng.gen())
    }

    pub fn position(&self) -> Vector2D {
        self.position
    }

    pub fn velocity(&self) -> Vector2D {
        self.velocity
    }

    pub fn pending_force(&self) -> Vector2D {
        self.pending_force
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Adds `force`, clamped to `max_force` magnitude, to the pending force.
    pub fn apply_force(&mut self, force: Vector2D, max_force: f32) {
        self.pending_force += force.limit(max_force);
    }

    fn integrate(&mut self, max_speed: f32) {
        self.velocity += self.pending_force;
        self.velocity = self.velocity.limit(max_speed);
        self.position += self.velocity;
        self.pending_force = Vector2D::zero();
    }

    fn wrap_edges(&mut self, config: &EngineConfig) {
        let r = config.agent_radius;

        if self.position.x > config.width + r {
            self.position.x = -r;
        }
        if self.position.x < -r {
            self.position.x = config.width + r;
        }

        if self.position.y > config.height + r {
            self.position.y = -r;
        }
        if self.position.y < -r {
            self.position.y = config.height + r;
        }
    }

    // Runs after integration, so the push lands in the next tick's pending force.
    fn repel_edges(&mut self, config: &EngineConfig) {
        let margin = config.edge_margin;
        let gain = config.edge_gain;
        let max_force = config.max_force;

        if self.position.x < margin {
            self.apply_force(Vector2D::new((margin - self.position.x) * gain, 0.0), max_force);
        }
        if self.position.x > config.width - margin {
            let depth = self.position.x - (config.width - margin);
            self.apply_force(Vector2D::new(-depth * gain, 0.0), max_force);
        }

        if self.position.y < margin {
            self.apply_force(Vector2D::new(0.0, (margin - self.position.y) * gain), max_force);
        }
        if self.position.y > config.height - margin {
            let depth = self.position.y - (config.height - margin);
            self.apply_force(Vector2D::new(0.0, -depth * gain), max_force);
        }
    }
}

/// Configuration for the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub width: f32,
    pub height: f32,
    /// Agents closer than twice this distance are in contact.
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
    /// Applied away from the predators' centroid.
    pub flee_weight: f32,
    pub separation_gain: f32,
    pub boundary: BoundaryMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            agent_radius: 20.0,
            max_speed: 2.0,
            max_force: 0.03,
            vision_radius: 200.0,
            avoid_radius: 120.0,
            edge_margin: 100.0,
            edge_gain: 20.0,
            alignment_weight: 0.1,
            cohesion_weight: 0.005,
            chase_weight: 0.02,
            flee_weight: 0.04,
            separation_gain: 4.0,
            boundary: BoundaryMode::Wrap,
        }
    }
}

/// Neighbor aggregation and steering forces
pub mod behavior {
    use super::*;

    /// Sums collected from every agent inside the vision radius.
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct Neighborhood {
        pub position_sum: Vector2D,
        pub count: usize,
        pub velocity_sum: Vector2D,
        pub same_kind: usize,
        pub prey_sum: Vector2D,
        pub prey: usize,
        pub predator_sum: Vector2D,
        pub predators: usize,
        pub separation: Vector2D,
    }

    impl Neighborhood {
        /// Folds `other`, seen at `distance`, into the sums.
        /// The caller has already checked `distance < vision_radius`.
        pub fn observe(
            &mut self,
            agent: &Agent,
            other: &Agent,
            distance: f32,
            config: &EngineConfig,
        ) {
            self.position_sum += other.position;
            self.count += 1;

            if other.kind == agent.kind {
                self.velocity_sum += other.velocity;
                self.same_kind += 1;
            } else if other.kind == agent.kind.prey() {
                self.prey_sum += other.position;
                self.prey += 1;
            } else if agent.kind == other.kind.prey() {
                self.predator_sum += other.position;
                self.predators += 1;
            }

            // Coincident agents have no direction to separate along.
            if distance < config.avoid_radius && distance > 0.0 {
                let offset = other.position - agent.position;
                self.separation -= offset / distance * config.separation_gain;
            }
        }
    }

    /// The five steering forces of one agent for one tick, before clamping.
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct Forces {
        pub alignment: Option<Vector2D>,
        pub chase: Option<Vector2D>,
        pub flee: Option<Vector2D>,
        pub cohesion: Option<Vector2D>,
        pub separation: Option<Vector2D>,
    }

    impl Forces {
        pub fn compute(agent: &Agent, hood: &Neighborhood, config: &EngineConfig) -> Self {
            let mut forces = Forces::default();

            if hood.same_kind > 0 {
                let average = hood.velocity_sum / hood.same_kind as f32;
                forces.alignment = Some(average * config.alignment_weight);
            }

            if hood.count == 0 {
                return forces;
            }

            if hood.prey > 0 {
                let centroid = hood.prey_sum / hood.prey as f32;
                forces.chase = Some((centroid - agent.position) * config.chase_weight);
            }

            if hood.predators > 0 {
                let centroid = hood.predator_sum / hood.predators as f32;
                forces.flee = Some((centroid - agent.position) * -config.flee_weight);
            }

            let centroid = hood.position_sum / hood.count as f32;
            forces.cohesion = Some((centroid - agent.position) * config.cohesion_weight);
            forces.separation = Some(hood.separation);

            forces
        }

        /// Present forces in application order.
        pub fn iter(&self) -> impl Iterator<Item = Vector2D> {
            [
                self.alignment,
                self.chase,
                self.flee,
                self.cohesion,
                self.separation,
            ]
            .into_iter()
            .flatten()
        }
    }
}

/// Owns the population and advances it one tick at a time.
///
/// Agents are updated in index order and each one is written back before the
/// next is scanned, so later agents in a tick observe the new positions,
/// velocities and kinds of earlier ones.
#[derive(Debug, Clone)]
pub struct Engine {
    agents: Vec<Agent>,
    config: EngineConfig,
    ticks: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_agents(config, Vec::new())
    }

    pub fn with_agents(config: EngineConfig, agents: Vec<Agent>) -> Self {
        Self {
            agents,
            config,
            ticks: 0,
        }
    }

    #[cfg(feature = "std")]
    pub fn random(config: EngineConfig, count: usize) -> Self {
        let agents = (0..count).map(|_| Agent::random(&config)).collect();
        log::debug!(
            "created {} random agents in a {}x{} world",
            count,
            config.width,
            config.height
        );
        Self::with_agents(config, agents)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    pub fn boundary_mode(&self) -> BoundaryMode {
        self.config.boundary
    }

    pub fn set_boundary_mode(&mut self, mode: BoundaryMode) {
        if self.config.boundary != mode {
            log::debug!("boundary mode {:?} -> {:?}", self.config.boundary, mode);
        }
        self.config.boundary = mode;
    }

    pub fn toggle_boundary_mode(&mut self) {
        self.set_boundary_mode(self.config.boundary.toggled());
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.config.width = width;
        self.config.height = height;
    }

    /// Appends a motionless agent of `kind` at `position`.
    pub fn spawn(&mut self, position: Vector2D, kind: Kind) {
        self.spawn_agent(Agent::new(position, Vector2D::zero(), kind));
    }

    pub fn spawn_agent(&mut self, agent: Agent) {
        log::debug!(
            "spawned {} at ({:.1}, {:.1}), population {}",
            agent.kind,
            agent.position.x,
            agent.position.y,
            self.agents.len() + 1
        );
        self.agents.push(agent);
    }

    pub fn count_of(&self, kind: Kind) -> usize {
        self.agents.iter().filter(|agent| agent.kind == kind).count()
    }

    /// Agent counts indexed by [`Kind::index`].
    pub fn census(&self) -> [usize; 3] {
        let mut counts = [0; 3];
        for agent in &self.agents {
            counts[agent.kind.index()] += 1;
        }
        counts
    }

    pub fn advance_tick(&mut self) {
        let mut conversions = 0;
        for index in 0..self.agents.len() {
            conversions += self.update_agent(index);
        }
        self.ticks += 1;
        log::trace!("tick {}: {} conversions", self.ticks, conversions);
    }

    fn update_agent(&mut self, index: usize) -> usize {
        let config = self.config;
        let mut agent = self.agents[index].clone();

        let (hood, conversions) = self.scan(index, &agent);

        let forces = behavior::Forces::compute(&agent, &hood, &config);
        for force in forces.iter() {
            agent.apply_force(force, config.max_force);
        }

        agent.integrate(config.max_speed);

        match config.boundary {
            BoundaryMode::Wrap => agent.wrap_edges(&config),
            BoundaryMode::Repel => agent.repel_edges(&config),
        }

        self.agents[index] = agent;
        conversions
    }

    /// Aggregates every other agent in vision and converts prey in contact.
    fn scan(&mut self, index: usize, agent: &Agent) -> (behavior::Neighborhood, usize) {
        let mut hood = behavior::Neighborhood::default();
        let mut conversions = 0;
        let contact = 2.0 * self.config.agent_radius;

        for (other_index, other) in self.agents.iter_mut().enumerate() {
            if other_index == index {
                continue;
            }

            let distance = agent.position.distance(&other.position);
            if distance >= self.config.vision_radius {
                continue;
            }

            hood.observe(agent, other, distance, &self.config);

            if distance < contact && agent.kind.beats(other.kind) {
                log::trace!(
                    "agent {} converted agent {} from {} to {}",
                    index,
                    other_index,
                    other.kind,
                    agent.kind
                );
                other.kind = agent.kind;
                conversions += 1;
            }
        }

        (hood, conversions)
    }
}
