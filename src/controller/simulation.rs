use std::f32::consts::TAU;

use glam::Vec3;

use crate::controller::input::{InputEvent, InputState, KeyBindings};
use crate::model::{Camera, DroneScene, Lighting};

/// Fixed per-tick step sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Distance moved per tick along each held direction
    pub move_speed: f32,
    /// Radians added to every propeller per tick
    pub spin_step: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.1,
            spin_step: 0.3,
        }
    }
}

/// Owns everything the frame loop mutates. Steps are per tick, not per
/// second: movement speed scales with the display refresh rate.
pub struct Simulation {
    pub scene: DroneScene,
    pub camera: Camera,
    pub lighting: Lighting,
    pub input: InputState,
    pub bindings: KeyBindings,
    pub config: SimConfig,
    ticks: u64,
}

impl Simulation {
    pub fn new(config: SimConfig, width: u32, height: u32) -> Self {
        let scene = DroneScene::build();

        let mut camera = Camera::new(width, height);
        camera.look_at(scene.drone_position());

        Self {
            scene,
            camera,
            lighting: Lighting::default(),
            input: InputState::new(),
            bindings: KeyBindings::default(),
            config,
            ticks: 0,
        }
    }

    pub fn handle_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::FocusLost => tracing::debug!("focus lost, releasing keys"),
            InputEvent::VisibilityChanged { visible } => {
                tracing::debug!(visible, "visibility changed, releasing keys")
            }
            InputEvent::KeyDown(_) | InputEvent::KeyUp(_) => {}
        }
        self.input.process_event(&self.bindings, event);
    }

    pub fn handle_key(&mut self, key: &str, pressed: bool) {
        if let Some(dir) = self.input.apply_key_event(&self.bindings, key, pressed) {
            tracing::trace!(?dir, pressed, "direction key");
        }
    }

    /// Advance one frame: move the drone by every held direction, then spin
    /// the propellers. Spin angles are kept in [0, 2π) so the step never
    /// drops below f32 resolution.
    pub fn tick(&mut self) {
        let step: Vec3 = self
            .input
            .held()
            .map(|dir| dir.axis() * self.config.move_speed)
            .sum();
        self.scene.graph.transform_mut(self.scene.drone).position += step;

        for propeller in self.scene.propellers {
            let rotation = &mut self.scene.graph.transform_mut(propeller).rotation;
            rotation.z = (rotation.z.rem_euclid(TAU) + self.config.spin_step).rem_euclid(TAU);
        }

        self.ticks += 1;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn drone_position(&self) -> Vec3 {
        self.scene.drone_position()
    }

    pub fn propeller_angle(&self) -> f32 {
        self.scene.propeller_angle(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::input::Direction;
    use crate::model::PROPELLER_OFFSETS;

    const EPS: f32 = 1e-5;

    fn sim() -> Simulation {
        Simulation::new(SimConfig::default(), 800, 600)
    }

    fn angles(sim: &Simulation) -> Vec<f32> {
        (0..4).map(|i| sim.scene.propeller_angle(i)).collect()
    }

    /// Distance between two angles on the circle
    fn angle_diff(a: f32, b: f32) -> f32 {
        let d = (a - b).rem_euclid(TAU);
        d.min(TAU - d)
    }

    #[test]
    fn forward_moves_negative_z_only() {
        let mut sim = sim();
        sim.input.forward = true;
        let start = Vec3::new(1.5, -2.0, 3.0);
        sim.scene.graph.transform_mut(sim.scene.drone).position = start;
        sim.tick();
        let pos = sim.drone_position();
        assert!((pos.z - (start.z - 0.1)).abs() < EPS);
        assert_eq!(pos.x, start.x);
        assert_eq!(pos.y, start.y);
    }

    #[test]
    fn every_direction_follows_its_axis() {
        for dir in Direction::ALL {
            let mut sim = sim();
            sim.input.set(dir, true);
            sim.tick();
            assert!(
                sim.drone_position().abs_diff_eq(dir.axis() * 0.1, EPS),
                "{dir:?} moved to {}",
                sim.drone_position()
            );
        }
    }

    #[test]
    fn up_and_right_compose() {
        let mut sim = sim();
        sim.handle_key(" ", true);
        sim.handle_key("d", true);
        sim.tick();
        assert!(sim.drone_position().abs_diff_eq(Vec3::new(0.1, 0.1, 0.0), EPS));
    }

    #[test]
    fn opposite_directions_cancel() {
        let mut sim = sim();
        sim.handle_key("a", true);
        sim.handle_key("d", true);
        for _ in 0..7 {
            sim.tick();
        }
        assert!(sim.drone_position().abs_diff_eq(Vec3::ZERO, EPS));
    }

    #[test]
    fn propellers_spin_regardless_of_input() {
        let mut sim = sim();
        let before = angles(&sim);
        sim.tick();
        for (a, b) in angles(&sim).iter().zip(&before) {
            assert!(angle_diff(*a, b + 0.3) < EPS);
        }

        sim.handle_key("w", true);
        sim.handle_key("Shift", true);
        let before = angles(&sim);
        sim.tick();
        for (a, b) in angles(&sim).iter().zip(&before) {
            assert!(angle_diff(*a, b + 0.3) < EPS);
        }
    }

    #[test]
    fn idle_frames_leave_position() {
        let mut sim = sim();
        let n = 40;
        for _ in 0..n {
            sim.tick();
        }
        assert_eq!(sim.drone_position(), Vec3::ZERO);
        assert!(angle_diff(sim.propeller_angle(), 0.3 * n as f32) < 1e-4);
        assert_eq!(sim.ticks(), n);
    }

    #[test]
    fn hold_forward_then_release() {
        let mut sim = sim();
        assert_eq!(sim.drone_position(), Vec3::ZERO);

        sim.handle_event(&InputEvent::KeyDown("w".into()));
        for _ in 0..10 {
            sim.tick();
        }
        assert!(sim.drone_position().abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), EPS));

        sim.handle_event(&InputEvent::KeyUp("w".into()));
        for _ in 0..5 {
            sim.tick();
        }
        assert!(sim.drone_position().abs_diff_eq(Vec3::new(0.0, 0.0, -1.0), EPS));

        for angle in angles(&sim) {
            assert!(angle_diff(angle, 4.5) < EPS);
        }
    }

    #[test]
    fn propeller_offsets_never_change() {
        let mut sim = sim();
        sim.handle_key("s", true);
        for _ in 0..25 {
            sim.tick();
        }
        assert_eq!(sim.scene.propellers.len(), 4);
        for (p, offset) in sim.scene.propellers.iter().zip(PROPELLER_OFFSETS) {
            let t = sim.scene.graph.transform(*p);
            assert_eq!(t.position, offset);
            assert_eq!(t.rotation.x, std::f32::consts::FRAC_PI_2);
        }
    }

    #[test]
    fn camera_and_ground_stay_put() {
        let mut sim = sim();
        let eye = sim.camera.eye;
        let target = sim.camera.target;
        let ground = *sim.scene.graph.transform(sim.scene.ground);
        sim.handle_key("d", true);
        for _ in 0..10 {
            sim.tick();
        }
        assert_eq!(sim.camera.eye, eye);
        assert_eq!(sim.camera.target, target);
        assert_eq!(*sim.scene.graph.transform(sim.scene.ground), ground);
    }

    #[test]
    fn custom_step_sizes() {
        let mut sim = Simulation::new(SimConfig { move_speed: 0.5, spin_step: 1.0 }, 800, 600);
        sim.handle_key("s", true);
        sim.tick();
        sim.tick();
        assert!(sim.drone_position().abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), EPS));
        assert!(angle_diff(sim.propeller_angle(), 2.0) < EPS);
    }

    #[test]
    fn window_events_release_held_keys() {
        let mut sim = sim();
        sim.handle_event(&InputEvent::KeyDown("w".into()));
        sim.handle_event(&InputEvent::VisibilityChanged { visible: true });
        sim.tick();
        assert_eq!(sim.drone_position(), Vec3::ZERO);

        sim.handle_event(&InputEvent::KeyDown("d".into()));
        sim.handle_event(&InputEvent::FocusLost);
        sim.tick();
        assert_eq!(sim.drone_position(), Vec3::ZERO);
    }

    #[test]
    fn spin_angle_stays_in_one_turn() {
        let mut sim = sim();
        for _ in 0..1000 {
            sim.tick();
            for angle in angles(&sim) {
                assert!((0.0..TAU).contains(&angle), "angle {angle} left [0, 2π)");
            }
        }
        assert!(angle_diff(sim.propeller_angle(), 300.0) < 5e-3);
    }

    #[test]
    fn spin_keeps_advancing_from_a_large_angle() {
        let mut sim = sim();
        for p in sim.scene.propellers {
            sim.scene.graph.transform_mut(p).rotation.z = 8_400_000.0;
        }
        let before = angles(&sim);
        sim.tick();
        for (a, b) in angles(&sim).iter().zip(&before) {
            assert!(angle_diff(*a, b.rem_euclid(TAU) + 0.3) < 1e-3, "stalled at {a}");
        }
        let before = angles(&sim);
        sim.tick();
        for (a, b) in angles(&sim).iter().zip(&before) {
            assert!(angle_diff(*a, b + 0.3) < EPS);
        }
    }
}
