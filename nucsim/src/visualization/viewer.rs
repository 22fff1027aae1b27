use bevy::math::primitives::{Cuboid, Sphere};
use bevy::prelude::*;
use tracing::{error, info};

use crate::simulation::engine::SimulationEngine;
use crate::simulation::states::{NVec3, Species};
use crate::visualization::sync::{HandlePools, VisualHandle};

/// Component tagging each sphere with its species and slot within that species
#[derive(Component)]
struct ParticleSlot {
    species: Species,
    index: usize,
}

/// Engine held on the main thread; the backend is not `Send`
struct Simulation(SimulationEngine);

/// Display radius of one particle, in simulation units
const PARTICLE_RADIUS: f32 = 0.5;

/// Reference frame drawn around the origin
const FRAME_SIZE: [f32; 3] = [50.0, 50.0, 4.0];
const FRAME_THICKNESS: f32 = 0.1;

/// Distance of the camera from the origin along +Z
const CAMERA_DISTANCE: f32 = 180.0;

/// Open a window and step `engine` once per rendered frame
pub fn run_viewer(engine: SimulationEngine) {
    let counts = engine.ensemble().counts();
    info!(particles = counts.raw_count(), backend = engine.backend_name(), "starting viewer");

    App::new()
        .insert_non_send_resource(Simulation(engine))
        // logging is already set up by the binary
        .add_plugins(DefaultPlugins.build().disable::<bevy::log::LogPlugin>())
        .add_systems(Startup, setup_scene)
        .add_systems(Update, step_and_sync)
        .run();
}

fn species_color(species: Species) -> Color {
    match species {
        Species::Neutron => Color::srgb(0.7, 0.7, 0.7), // grey
        Species::Proton => Color::srgb(1.0, 0.2, 0.2), // red
        Species::Electron => Color::srgb(0.3, 0.5, 1.0), // blue
    }
}

fn to_screen(r: &NVec3) -> Vec3 {
    Vec3::new(r.x as f32, r.y as f32, r.z as f32)
}

/// Startup system: spawn camera, light, frame, and one sphere per particle
fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    sim: NonSend<Simulation>,
) {
    commands.spawn(Camera3dBundle {
        camera: Camera {
            clear_color: ClearColorConfig::Custom(Color::srgb(0.0, 0.0, 0.0)),
            ..Default::default()
        },
        transform: Transform::from_xyz(0.0, 60.0, CAMERA_DISTANCE).looking_at(Vec3::ZERO, Vec3::Y),
        ..Default::default()
    });

    commands.spawn(PointLightBundle {
        point_light: PointLight {
            intensity: 1500.0,
            range: 1000.0,
            ..Default::default()
        },
        transform: Transform::from_xyz(50.0, 50.0, CAMERA_DISTANCE),
        ..Default::default()
    });

    spawn_frame(&mut commands, &mut meshes, &mut materials);

    // One shared mesh, one material per species
    let mesh = meshes.add(Sphere::new(PARTICLE_RADIUS).mesh());
    let ensemble = sim.0.ensemble();

    for species in Species::ALL {
        let material = materials.add(StandardMaterial {
            base_color: species_color(species),
            unlit: true,
            ..Default::default()
        });

        for (index, r) in ensemble.positions_of(species).iter().enumerate() {
            commands.spawn((
                PbrBundle {
                    mesh: mesh.clone(),
                    material: material.clone(),
                    transform: Transform::from_translation(to_screen(r)),
                    ..Default::default()
                },
                ParticleSlot { species, index },
            ));
        }
    }
}

struct TransformHandle<'w>(Mut<'w, Transform>);

impl VisualHandle for TransformHandle<'_> {
    fn set_translation(&mut self, position: &NVec3) {
        self.0.translation = to_screen(position);
    }
}

/// Per-frame update: advance the engine and move every sphere
fn step_and_sync(
    mut sim: NonSendMut<Simulation>,
    mut query: Query<(&ParticleSlot, &mut Transform)>,
    mut exit: EventWriter<AppExit>,
) {
    let mut tagged: Vec<_> = query.iter_mut().collect();
    tagged.sort_by_key(|(slot, _)| slot.index);

    let mut pools = HandlePools::default();
    for (slot, transform) in tagged {
        pools.pool_mut(slot.species).push(TransformHandle(transform));
    }

    if let Err(e) = sim.0.step(&mut pools) {
        error!("simulation stopped: {e}");
        exit.send(AppExit::error());
    }
}

// =========================================================================================
// Draw the reference frame as twelve thin boxes
// =========================================================================================

fn spawn_frame(commands: &mut Commands, meshes: &mut Assets<Mesh>, materials: &mut Assets<StandardMaterial>) {
    let [sx, sy, sz] = FRAME_SIZE;
    let (hx, hy, hz) = (sx * 0.5, sy * 0.5, sz * 0.5);
    let t = FRAME_THICKNESS;

    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(1.0, 0.0, 0.0), // red
        unlit: true,
        ..Default::default()
    });

    let along_x = meshes.add(Cuboid::new(sx + t, t, t).mesh());
    let along_y = meshes.add(Cuboid::new(t, sy + t, t).mesh());
    let along_z = meshes.add(Cuboid::new(t, t, sz + t).mesh());

    let mut edges: Vec<(Handle<Mesh>, Vec3)> = Vec::with_capacity(12);
    for a in [-1.0, 1.0] {
        for b in [-1.0, 1.0] {
            edges.push((along_x.clone(), Vec3::new(0.0, a * hy, b * hz)));
            edges.push((along_y.clone(), Vec3::new(a * hx, 0.0, b * hz)));
            edges.push((along_z.clone(), Vec3::new(a * hx, b * hy, 0.0)));
        }
    }

    for (mesh, at) in edges {
        commands.spawn(PbrBundle {
            mesh,
            material: material.clone(),
            transform: Transform::from_translation(at),
            ..Default::default()
        });
    }
}
