use egui::Context;

use crate::controller::{Direction, Simulation};

/// Build the HUD and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, sim: &Simulation, fps: f32) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_status_window(ctx, sim, fps);
    })
}

fn key_label(key: &str) -> &str {
    match key {
        " " => "Space",
        other => other,
    }
}

fn draw_status_window(ctx: &Context, sim: &Simulation, fps: f32) {
    let pos = sim.drone_position();
    let held: Vec<String> = sim.input.held().map(|d| format!("{d:?}")).collect();

    egui::Window::new("Drone")
        .default_pos([8.0, 8.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {fps:.0}")).small());
            ui.label(egui::RichText::new(format!("Pos: x: {:.1} y: {:.1} z: {:.1}", pos.x, pos.y, pos.z)).small());
            ui.label(egui::RichText::new(format!("Rotor: {:.1} rad", sim.propeller_angle())).small());
            ui.label(egui::RichText::new(format!("Ticks: {}", sim.ticks())).small());
            if !held.is_empty() {
                ui.label(egui::RichText::new(format!("Held: {}", held.join(" "))).small());
            }
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            for dir in Direction::ALL {
                let key = key_label(sim.bindings.key_for(dir));
                ui.label(egui::RichText::new(format!("{key} - {dir:?}")).small());
            }
        });
}
