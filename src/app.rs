use std::path::PathBuf;
use std::sync::Arc;

use egui::{Slider, TextureHandle, TextureOptions};

use crate::color;
use crate::config::CanvasConfig;
use crate::event::CanvasEvent;
use crate::export::{self, DEFAULT_EXPORT_NAME};
use crate::input::InputHandler;
use crate::persistence::{
    ClientError, DrawingId, FileStore, LoadResponse, PendingRequest, PersistenceClient, SaveResponse,
    VersionResponse,
};
use crate::session::Session;
use crate::tools::{MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH, ToolKind, ToolState};

/// How long a save/load notice stays on screen, in seconds
const NOTICE_SECS: f64 = 1.5;
const DEFAULT_TITLE: &str = "Untitled Drawing";

#[derive(Default)]
struct PendingRequests {
    create: Vec<PendingRequest<DrawingId>>,
    save: Vec<PendingRequest<SaveResponse>>,
    load: Vec<PendingRequest<LoadResponse>>,
    version: Vec<PendingRequest<VersionResponse>>,
}

impl PendingRequests {
    fn is_empty(&self) -> bool {
        self.create.is_empty() && self.save.is_empty() && self.load.is_empty() && self.version.is_empty()
    }
}

/// Collect the results that are ready, keeping the rest pending.
fn drain_ready<T>(pending: &mut Vec<PendingRequest<T>>) -> Vec<Result<T, ClientError>> {
    let mut ready = Vec::new();
    pending.retain_mut(|request| match request.poll() {
        Some(result) => {
            ready.push(result);
            false
        }
        None => true,
    });
    ready
}

pub struct SketchApp {
    session: Session,
    input: InputHandler,
    client: PersistenceClient,
    drawing_id: Option<DrawingId>,
    title: String,
    texture: Option<TextureHandle>,
    pending: PendingRequests,
    notice: Option<(String, f64)>,
    export_path: PathBuf,
}

impl SketchApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>, config: CanvasConfig) -> Self {
        let tools = cc
            .storage
            .and_then(|storage| eframe::get_value::<ToolState>(storage, eframe::APP_KEY))
            .unwrap_or_else(|| config.tool_state());

        let store = Arc::new(FileStore::new(config.store_dir.clone()));
        let mut app = Self::with_client(config, tools, PersistenceClient::new(store));
        if app.drawing_id.is_some() {
            app.load();
        }
        app
    }

    fn with_client(config: CanvasConfig, tools: ToolState, client: PersistenceClient) -> Self {
        let surface = config.surface();
        let surface_size = egui::vec2(surface.width() as f32, surface.height() as f32);
        Self {
            session: Session::new(surface, tools),
            input: InputHandler::new(egui::Rect::NOTHING, surface_size),
            client,
            drawing_id: config.drawing_id,
            title: DEFAULT_TITLE.to_owned(),
            texture: None,
            pending: PendingRequests::default(),
            notice: None,
            export_path: PathBuf::from(DEFAULT_EXPORT_NAME),
        }
    }

    fn show_notice(&mut self, ctx: &egui::Context, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        let now = ctx.input(|i| i.time);
        self.notice = Some((message, now + NOTICE_SECS));
    }

    fn save(&mut self, ctx: &egui::Context) {
        match self.client.save(self.drawing_id, self.session.save_request(false)) {
            Ok(request) => self.pending.save.push(request),
            Err(err) => self.show_notice(ctx, err.to_string()),
        }
    }

    fn load(&mut self) {
        match self.client.load(self.drawing_id) {
            Ok(request) => self.pending.load.push(request),
            // Nothing to load without a drawing; not worth a notice.
            Err(err) => log::debug!("Skipping load: {err}"),
        }
    }

    fn create_version(&mut self, ctx: &egui::Context) {
        match self.client.create_version(self.drawing_id) {
            Ok(request) => self.pending.version.push(request),
            Err(err) => self.show_notice(ctx, err.to_string()),
        }
    }

    fn create_drawing(&mut self) {
        let surface = self.session.surface();
        let request = self
            .client
            .create(DEFAULT_TITLE.to_owned(), surface.width(), surface.height());
        self.pending.create.push(request);
    }

    fn export(&mut self, ctx: &egui::Context) {
        match export::save_png(self.session.surface(), &self.export_path) {
            Ok(()) => self.show_notice(ctx, format!("Exported {}", self.export_path.display())),
            Err(err) => {
                log::error!("Export failed: {err}");
                self.show_notice(ctx, "Export failed");
            }
        }
    }

    fn poll_requests(&mut self, ctx: &egui::Context) {
        for result in drain_ready(&mut self.pending.create) {
            match result {
                Ok(id) => {
                    // A new drawing starts on a blank canvas.
                    self.drawing_id = Some(id);
                    self.title = DEFAULT_TITLE.to_owned();
                    self.session.clear_all();
                    self.show_notice(ctx, "New drawing created");
                }
                Err(_) => self.show_notice(ctx, "Failed to create drawing."),
            }
        }

        for result in drain_ready(&mut self.pending.save) {
            match result {
                Ok(SaveResponse { success: true, .. }) => self.show_notice(ctx, "Saved!"),
                Ok(SaveResponse { error, .. }) => {
                    let reason = error.unwrap_or_else(|| "Unknown error".to_owned());
                    self.show_notice(ctx, format!("Save failed: {reason}"));
                }
                Err(_) => self.show_notice(ctx, "Save failed"),
            }
        }

        // A load that lands after local edits replaces them.
        for result in drain_ready(&mut self.pending.load) {
            match result {
                Ok(response) => {
                    if let Some(title) = response.title {
                        self.title = title;
                    }
                    self.session.load_canvas_data(response.canvas_data.as_ref());
                }
                Err(_) => self.show_notice(ctx, "Load failed"),
            }
        }

        for result in drain_ready(&mut self.pending.version) {
            match result {
                Ok(VersionResponse {
                    success: true,
                    new_drawing_id: Some(id),
                }) => {
                    self.drawing_id = Some(id);
                    self.show_notice(ctx, "New version created");
                    self.load();
                }
                _ => self.show_notice(ctx, "Failed to create new version."),
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        let mut events = Vec::new();

        ui.horizontal_wrapped(|ui| {
            let current = self.session.tools().tool();
            for tool in ToolKind::all() {
                let label = match tool {
                    ToolKind::Brush => "🖌 Brush",
                    ToolKind::Eraser => "⌫ Eraser",
                };
                if ui.selectable_label(current == tool, label).clicked() {
                    events.push(CanvasEvent::SelectTool(tool));
                }
            }

            ui.separator();

            let mut brush_color = color::to_color32(self.session.tools().color());
            ui.label("Color:");
            if egui::color_picker::color_edit_button_srgba(ui, &mut brush_color, egui::color_picker::Alpha::Opaque)
                .changed()
            {
                events.push(CanvasEvent::SetColor(color::from_color32(brush_color)));
            }

            let mut width = self.session.tools().width();
            ui.label("Size:");
            if ui.add(Slider::new(&mut width, MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH)).changed() {
                events.push(CanvasEvent::SetWidth(width));
            }

            ui.separator();

            if ui.add_enabled(self.session.log().can_undo(), egui::Button::new("Undo")).clicked() {
                events.push(CanvasEvent::Undo);
            }
            if ui.add_enabled(self.session.log().can_redo(), egui::Button::new("Redo")).clicked() {
                events.push(CanvasEvent::Redo);
            }
            if ui.button("Clear").clicked() {
                events.push(CanvasEvent::Clear);
            }

            ui.separator();

            if ui.button("Save").clicked() {
                self.save(&ctx);
            }
            if ui.button("New Version").clicked() {
                self.create_version(&ctx);
            }
            if ui.button("New Drawing").clicked() {
                self.create_drawing();
            }
            if ui.button("Export PNG").clicked() {
                self.export(&ctx);
            }
        });

        for event in events {
            self.session.handle_event(event);
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        let surface = self.session.surface();
        let size = egui::vec2(surface.width() as f32, surface.height() as f32);
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());
        self.input.set_canvas_rect(rect);

        for event in self.input.process_input(&ctx) {
            self.session.handle_event(event);
        }

        let dirty = self.session.take_dirty();
        if let Some(texture) = &mut self.texture {
            if dirty {
                texture.set(self.session.surface().to_color_image(), TextureOptions::NEAREST);
            }
        } else {
            let image = self.session.surface().to_color_image();
            self.texture = Some(ctx.load_texture("canvas", image, TextureOptions::NEAREST));
        }
        let Some(texture) = &self.texture else {
            return;
        };

        ui.painter().image(
            texture.id(),
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }
}

impl eframe::App for SketchApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self.session.tools());
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_requests(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(&self.title);
                if let Some(id) = self.drawing_id {
                    ui.weak(id.to_string());
                }
            });
            self.toolbar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| self.canvas(ui));
        });

        let now = ctx.input(|i| i.time);
        if self.notice.as_ref().is_some_and(|(_, expires_at)| now >= *expires_at) {
            self.notice = None;
        }
        if let Some((message, _)) = &self.notice {
            egui::Area::new(egui::Id::new("save_notice"))
                .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -16.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| ui.label(message.as_str()));
                });
            ctx.request_repaint();
        }

        if !self.pending.is_empty() {
            ctx.request_repaint();
        }
    }
}
