//! The simulated town: a population simulator, the message bus and a hecs world of
//! villager billboards walking between random spots.

use std::collections::HashMap;

use engine_core::{planar_direction, Transform};
use glam::Vec3;
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use villagers::{
    uses_redguard_population, BillboardState, BillboardView, LocationContext, LocationHandle, MessageArg,
    NpcRecord, PersonSpec, PopulationCapController, PopulationSimulator, PreloadReport, Race, Response,
    VarietyEngine, WorldContext,
};

use crate::bus::{EventBus, EventKind, HostEvent};
use crate::config::HostConfig;

/// Cap the host uses until the controller pushes its own.
const DEFAULT_CAP: u32 = 8;
/// One NPC in this many is a guard.
const GUARD_ONE_IN: u32 = 10;
const ARRIVE_DISTANCE: f32 = 1.5;
const CAMERA_HEIGHT: f32 = 1.8;

/// Fallback names when the engine leaves naming to the host.
const HOST_NAMES: &[&str] = &[
    "Aldric", "Brisienna", "Cyrus", "Daine", "Elysana", "Fenwick", "Gondier", "Helseth",
    "Iszara", "Jauffre", "Kirana", "Lhotun", "Mynisera", "Nulfaga", "Orla", "Pelagia",
];

/// The host's population simulator. It only tracks caps and the active count.
#[derive(Debug, Default)]
pub struct SimulatedPopulation {
    caps: HashMap<LocationHandle, u32>,
}

impl SimulatedPopulation {
    pub fn cap(&self, location: LocationHandle) -> u32 {
        self.caps.get(&location).copied().unwrap_or(DEFAULT_CAP)
    }
}

impl PopulationSimulator for SimulatedPopulation {
    fn set_population_cap(&mut self, location: LocationHandle, cap: u32) {
        self.caps.insert(location, cap);
    }
}

/// A walking townsperson.
#[derive(Debug, Clone)]
pub struct Villager {
    pub name: String,
    pub spec: PersonSpec,
    pub billboard: BillboardState,
    pub target: Vec3,
    pub walk_speed: f32,
    /// Seconds left standing at the current spot.
    pub dwell: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TownStats {
    pub villagers: usize,
    pub guards: usize,
    pub cap: u32,
    pub spawned: usize,
    pub despawned: usize,
    pub frame_updates: usize,
    /// UV bytes the renderer would have uploaded for those updates.
    pub uv_bytes: usize,
    pub hours: u64,
}

pub struct Town {
    engine: VarietyEngine,
    controller: PopulationCapController,
    population: SimulatedPopulation,
    bus: EventBus,
    world: World,
    location: LocationContext,
    native_race: Race,
    rng: StdRng,
    time_scale: f64,
    pending_seconds: f64,
    radius: f32,
    camera: Vec3,
    responses: Vec<Response>,
    last_preload: Option<PreloadReport>,
    stats: TownStats,
}

impl Town {
    pub fn new(engine: VarietyEngine, host: &HostConfig) -> Self {
        let controller = PopulationCapController::new(engine.config());
        let clock = engine_core::WorldClock::at(host.start_month, host.start_day, host.start_hour);
        let world = WorldContext::new(host.region, host.climate, clock).with_weather(host.weather);
        let location = LocationContext {
            location: LocationHandle((u64::from(host.region) << 32) | u64::from(host.total_blocks)),
            category: host.category,
            total_blocks: host.total_blocks,
            world,
        };
        let rng = match host.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut bus = EventBus::new();
        bus.subscribe(EventKind::NpcEnabled);
        bus.subscribe(EventKind::HourTick);
        bus.subscribe(EventKind::Transition);
        bus.subscribe(EventKind::ModMessage);

        Self {
            engine,
            controller,
            population: SimulatedPopulation::default(),
            bus,
            world: World::new(),
            location,
            native_race: host.race,
            rng,
            time_scale: host.time_scale as f64,
            pending_seconds: 0.0,
            radius: (host.total_blocks.max(1) as f32).sqrt() * 8.0,
            camera: Vec3::new(0.0, CAMERA_HEIGHT, 0.0),
            responses: Vec::new(),
            last_preload: None,
            stats: TownStats::default(),
        }
    }

    pub fn engine(&self) -> &VarietyEngine {
        &self.engine
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn world_context(&self) -> &WorldContext {
        &self.location.world
    }

    pub fn villagers(&self) -> Vec<Villager> {
        self.world.query::<&Villager>().iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn last_preload(&self) -> Option<PreloadReport> {
        self.last_preload
    }

    pub fn take_responses(&mut self) -> Vec<Response> {
        std::mem::take(&mut self.responses)
    }

    pub fn set_camera(&mut self, position: Vec3) {
        self.camera = position;
    }

    pub fn stats(&self) -> TownStats {
        TownStats {
            villagers: self.active(),
            guards: self.world.query::<&Villager>().iter().filter(|(_, v)| v.spec.is_guard).count(),
            cap: self.population.cap(self.location.location),
            ..self.stats
        }
    }

    /// Player walks in. Caches are warmed for the race drawn here.
    pub fn enter(&mut self) {
        self.bus.publish(HostEvent::Transition);
        self.pump();
        self.refill();
    }

    pub fn send_message(&mut self, name: impl Into<String>, data: MessageArg) {
        self.bus.publish(HostEvent::ModMessage { name: name.into(), data });
        self.pump();
    }

    /// One fixed step of `dt` real seconds.
    pub fn step(&mut self, dt: f32) {
        self.pending_seconds += f64::from(dt) * self.time_scale;
        let whole = self.pending_seconds.floor();
        self.pending_seconds -= whole;
        let hours = self.location.world.clock.advance(whole as u64);
        for _ in 0..hours {
            self.bus.publish(HostEvent::HourTick);
        }
        self.stats.hours += hours;

        self.pump();
        self.refill();
        self.update(dt);
    }

    fn active(&self) -> usize {
        self.world.query::<&Villager>().iter().count()
    }

    fn pump(&mut self) {
        while let Some(event) = self.bus.pop() {
            match event {
                HostEvent::NpcEnabled(mut npc) => {
                    self.controller
                        .on_spawn(&self.location, &mut npc, &mut self.population, &mut self.rng);
                    self.spawn(npc);
                }
                HostEvent::HourTick => {
                    self.controller.on_hour_tick(&self.location, &mut self.population);
                    self.cull();
                }
                HostEvent::Transition => {
                    let race = if uses_redguard_population(&self.location.world, self.engine.config()) {
                        Race::Redguard
                    } else {
                        self.native_race
                    };
                    self.last_preload = Some(self.engine.preload(race, &self.location.world));
                }
                HostEvent::ModMessage { name, data } => {
                    let response = self.engine.handle_message(&name, &data, &self.location.world);
                    log::debug!("{} -> {}: {:?}", name, response.name, response.payload);
                    self.responses.push(response);
                }
            }
        }
    }

    /// Enable NPCs until the simulator's cap is reached.
    fn refill(&mut self) {
        while (self.active() as u32) < self.population.cap(self.location.location) {
            let before = self.active();
            let mut npc = NpcRecord::random(self.native_race, &mut self.rng);
            npc.is_guard = self.rng.gen_ratio(1, GUARD_ONE_IN);
            self.bus.publish(HostEvent::NpcEnabled(npc));
            self.pump();
            if self.active() == before {
                break;
            }
        }
    }

    /// Drop villagers above the cap, townsfolk first.
    fn cull(&mut self) {
        let cap = self.population.cap(self.location.location) as usize;
        let mut villagers: Vec<(Entity, bool)> = self
            .world
            .query::<&Villager>()
            .iter()
            .map(|(e, v)| (e, v.spec.is_guard))
            .collect();
        if villagers.len() <= cap {
            return;
        }
        villagers.sort_by_key(|&(_, guard)| guard);
        let excess = villagers.len() - cap;
        for (entity, _) in villagers.into_iter().take(excess) {
            self.world.despawn(entity).ok();
        }
        self.stats.despawned += excess;
        log::info!("Sent {} villager(s) home, {} remain", excess, cap);
    }

    fn spawn(&mut self, npc: NpcRecord) {
        let spec = PersonSpec::from(&npc);
        let world = self.location.world;
        let billboard = match self.engine.set_person(&spec, &world, &mut self.rng) {
            Ok(billboard) => billboard,
            Err(e) => {
                log::warn!("Skipping NPC: {}", e);
                return;
            }
        };
        let name = self
            .engine
            .generate_name(&world, spec.gender, &mut self.rng)
            .unwrap_or_else(|| HOST_NAMES[self.stats.spawned % HOST_NAMES.len()].to_string());
        let position = random_spot(&mut self.rng, self.radius);
        let villager = Villager {
            name,
            spec,
            billboard,
            target: random_spot(&mut self.rng, self.radius),
            walk_speed: 1.1 + self.rng.gen::<f32>() * 0.5,
            dwell: 0.0,
        };
        log::debug!("{} enters ({:?} {:?}, guard: {})", villager.name, spec.race, spec.gender, spec.is_guard);
        self.world.spawn((Transform::from_position(position), villager));
        self.stats.spawned += 1;
    }

    /// Walk, stand and animate every villager against the current camera.
    fn update(&mut self, dt: f32) {
        let camera = self.camera;
        let radius = self.radius;
        for (_, (transform, villager)) in self.world.query_mut::<(&mut Transform, &mut Villager)>() {
            if villager.dwell > 0.0 {
                villager.dwell -= dt;
                if villager.dwell <= 0.0 {
                    villager.target = random_spot(&mut self.rng, radius);
                    villager.billboard.set_idle(false);
                }
            } else {
                let to_target = villager.target - transform.position;
                let dist_sq = to_target.x * to_target.x + to_target.z * to_target.z;
                if dist_sq < ARRIVE_DISTANCE * ARRIVE_DISTANCE {
                    villager.billboard.set_idle(true);
                    villager.dwell = 4.0 + self.rng.gen::<f32>() * 8.0;
                } else {
                    let dir = planar_direction(transform.position, villager.target);
                    transform.face_planar(dir);
                    transform.translate(dir * villager.walk_speed * dt);
                }
            }

            let view = BillboardView {
                camera_position: camera,
                position: transform.position,
                parent_forward: transform.planar_forward(),
            };
            if let Some(update) = villager.billboard.tick(dt, &view) {
                self.stats.frame_updates += 1;
                self.stats.uv_bytes += update.uv_raw().as_bytes().len();
            }
        }
    }
}

fn random_spot(rng: &mut impl Rng, radius: f32) -> Vec3 {
    Vec3::new(rng.gen_range(-radius..=radius), 0.0, rng.gen_range(-radius..=radius))
}
