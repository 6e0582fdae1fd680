use eframe::egui;
use single_instance::NotifierHandler;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;

use crate::auth::authorization_url;
use crate::auth::client_id_label;

pub const WINDOW_TITLE: &str = "APS Shell Demo";
pub const APP_ID: &str = "DAS.APSShellDemo";

#[derive(Debug, PartialEq, Clone)]
pub enum AppMessage {
    /// Forwarded by a secondary instance, usually the OAuth callback
    Notified(String),
    NameLost,
}

/// Hands notifier events over to the GUI thread.
///
/// The egui context is only known once the window exists, events arriving
/// before that wait in the channel until the first frame.
pub struct GuiNotifier {
    sender: Sender<AppMessage>,
    context: Arc<OnceLock<egui::Context>>,
}

impl GuiNotifier {
    pub fn new(sender: Sender<AppMessage>, context: Arc<OnceLock<egui::Context>>) -> Self {
        Self { sender, context }
    }

    fn send(&self, message: AppMessage) {
        if self.sender.send(message).is_err() {
            log::warn!("Window has exited, dropping notifier event");
            return;
        }
        if let Some(ctx) = self.context.get() {
            ctx.request_repaint();
        }
    }
}

impl NotifierHandler for GuiNotifier {
    fn message_received(&self, message: String) {
        self.send(AppMessage::Notified(message));
    }

    fn name_lost(&self) {
        self.send(AppMessage::NameLost);
    }
}

pub struct ShellDemoWindow {
    receiver: Receiver<AppMessage>,
    client_id: Option<String>,
    label: String,
}

impl ShellDemoWindow {
    pub fn new(receiver: Receiver<AppMessage>, client_id: Option<String>) -> Self {
        let label = client_id_label(client_id.as_deref());
        Self {
            receiver,
            client_id,
            label,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Applies one message, returns true if the window should close
    fn handle_app_message(&mut self, message: AppMessage) -> bool {
        match message {
            AppMessage::Notified(text) => {
                log::info!("Received message from another instance");
                log::trace!("Message: {}", text);
                self.label = text;
                false
            }
            AppMessage::NameLost => {
                log::warn!("Notifier name lost, closing the window");
                true
            }
        }
    }

    /// Drains pending messages, returns true if the window should close
    fn drain_messages(&mut self) -> bool {
        let mut close = false;
        while let Ok(message) = self.receiver.try_recv() {
            close |= self.handle_app_message(message);
        }
        close
    }

    fn open_authorization_page(&self) {
        let url = authorization_url(self.client_id.as_deref());
        log::debug!("Opening authorization page {}", url);
        if let Err(e) = open::that(&url) {
            log::error!("Failed to open browser: {}", e);
        }
    }
}

impl eframe::App for ShellDemoWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.drain_messages() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).inner_margin(egui::Margin::same(5)))
            .show(ctx, |ui| {
                ui.spacing_mut().item_spacing.y = 5.0;
                if ui.button("Do Auth!").clicked() {
                    self.open_authorization_page();
                }
                ui.label(self.label());
            });
    }
}

pub fn native_options() -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_app_id(APP_ID)
            .with_inner_size([360.0, 80.0]),
        ..Default::default()
    }
}
