//! egui debug panel drawn over the canvas.

use std::{cell::RefCell, rc::Rc};

use three_d::*;
use tracing::debug;

use crate::engine::{DebugPanel, PanelFrame};
use crate::params::{ControlFolder, ControlKind, HexColor, ParamChange, ParamValue, SceneParameters};


/// Input events collected by the page listeners and consumed by the panel each frame
pub type SharedEvents = Rc<RefCell<Vec<Event>>>;


pub struct EguiPanel {
    context: Context,
    events: SharedEvents,
    device_pixel_ratio: f32,
    gui: Option<GUI>,
    folders: Vec<ControlFolder>,
    pointer_over_gui: bool,
    drawn: bool,
}

impl EguiPanel {
    pub fn new(context: Context, events: SharedEvents, device_pixel_ratio: f64) -> Self {
        Self {
            context,
            events,
            device_pixel_ratio: device_pixel_ratio as f32,
            gui: None,
            folders: Vec::new(),
            pointer_over_gui: false,
            drawn: false,
        }
    }
}

impl DebugPanel for EguiPanel {
    fn build(&mut self, folders: &[ControlFolder]) {
        self.gui = Some(GUI::new(&self.context));
        self.folders = folders.to_vec();
        debug!("EguiPanel::build(): {} folders", self.folders.len());
    }

    fn poll(&mut self, frame: &PanelFrame, params: &SceneParameters) -> Vec<ParamChange> {
        let mut events = std::mem::take(&mut *self.events.borrow_mut());
        let gui = match self.gui.as_mut() {
            Some(gui) => gui,
            None => return Vec::new(),
        };

        let dpr = self.device_pixel_ratio;
        let viewport = Viewport::new_at_origo(
            (frame.width as f32 * dpr).round() as u32,
            (frame.height as f32 * dpr).round() as u32,
        );
        let folders = &self.folders;
        let mut changes = Vec::new();
        let mut pointer_over_gui = false;

        gui.update(&mut events, frame.time_ms, viewport, dpr, |gui_context| {
            pointer_over_gui = gui_context.is_using_pointer() || gui_context.is_pointer_over_area();

            if let Some(progress) = frame.progress {
                egui::Window::new("Loading...")
                    .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                    .show(gui_context, |ui| {
                        let progress_bar = egui::ProgressBar::new(progress)
                            .show_percentage()
                            .animate(true);
                        ui.add(progress_bar);
                    });
            }

            egui::Window::new("Scene")
                .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
                .resizable(false)
                .show(gui_context, |ui| {
                    for folder in folders.iter() {
                        ui.collapsing(folder.name, |ui| {
                            for control in folder.controls.iter() {
                                let edited = match (control.kind, params.get(control.key)) {
                                    (ControlKind::Slider { min, max, step }, ParamValue::Number(mut v)) => {
                                        let slider = egui::Slider::new(&mut v, min..=max)
                                            .step_by(step as f64)
                                            .text(control.label);
                                        ui.add(slider).changed().then_some(ParamValue::Number(v))
                                    },
                                    (ControlKind::Color, ParamValue::Color(c)) => {
                                        let mut rgb = c.rgb();
                                        let response = ui.horizontal(|ui| {
                                            let r = ui.color_edit_button_srgb(&mut rgb);
                                            ui.label(control.label);
                                            r
                                        });
                                        response.inner.changed().then(|| {
                                            ParamValue::Color(HexColor::from_rgb(rgb[0], rgb[1], rgb[2]))
                                        })
                                    },
                                    _ => None,
                                };
                                if let Some(value) = edited {
                                    changes.push(ParamChange { key: control.key, value });
                                }
                            }
                        });
                    }
                });
        });

        self.pointer_over_gui = pointer_over_gui;
        self.drawn = true;
        changes
    }

    fn render_overlay(&mut self) {
        if let (Some(gui), true) = (self.gui.as_ref(), self.drawn) {
            gui.render();
        }
        self.drawn = false;
    }

    fn wants_pointer(&self) -> bool {
        self.gui.is_some() && self.pointer_over_gui
    }

    fn destroy(&mut self) {
        if self.gui.take().is_some() {
            debug!("EguiPanel::destroy()");
        }
        self.folders.clear();
        self.pointer_over_gui = false;
        self.drawn = false;
        self.events.borrow_mut().clear();
    }

    fn is_destroyed(&self) -> bool {
        self.gui.is_none()
    }
}
