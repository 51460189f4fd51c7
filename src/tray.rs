use anyhow::{Context, Result};
use log::error;
use tray_icon::{
    menu::{CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem},
    TrayIcon, TrayIconBuilder,
};

use crate::constants::indicator::{IDLE_LABEL, IDLE_TOOLTIP};
use crate::icon::IconFace;
use crate::indicator::{Rendering, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayMenuEvent {
    ToggleNinja,
    Exit,
}

/// The tray icon, its tooltip and the two-item context menu.
pub struct TrayApp {
    tray_icon: TrayIcon,
    ninja_item: CheckMenuItem,
    exit_item: MenuItem,
}

impl TrayApp {
    pub fn new() -> Result<Self> {
        let menu = Menu::new();

        let ninja_item = CheckMenuItem::new("Ninja mode", true, false, None);
        let exit_item = MenuItem::new("Exit TARCA", true, None);

        menu.append(&ninja_item)?;
        menu.append(&PredefinedMenuItem::separator())?;
        menu.append(&exit_item)?;

        let idle = to_tray_icon(&IconFace::Label(IDLE_LABEL.to_string()))?;

        let tray_icon = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip(IDLE_TOOLTIP)
            .with_icon(idle)
            .build()
            .context("Failed to create tray icon")?;

        Ok(TrayApp {
            tray_icon,
            ninja_item,
            exit_item,
        })
    }

    pub fn poll_event(&self) -> Option<TrayMenuEvent> {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            let id = event.id();

            if id == self.ninja_item.id() {
                return Some(TrayMenuEvent::ToggleNinja);
            } else if id == self.exit_item.id() {
                return Some(TrayMenuEvent::Exit);
            }
        }
        None
    }
}

fn to_tray_icon(face: &IconFace) -> Result<tray_icon::Icon> {
    let img = face.render();
    let (width, height) = img.dimensions();
    tray_icon::Icon::from_rgba(img.into_raw(), width, height)
        .context("Failed to create tray icon image")
}

impl Surface for TrayApp {
    fn present(&mut self, rendering: &Rendering) {
        match to_tray_icon(&rendering.face) {
            Ok(icon) => {
                if let Err(e) = self.tray_icon.set_icon(Some(icon)) {
                    error!("❌ Failed to update tray icon: {}", e);
                }
            }
            Err(e) => error!("❌ {:#}", e),
        }

        if let Err(e) = self.tray_icon.set_tooltip(Some(&rendering.tooltip)) {
            error!("❌ Failed to update tray tooltip: {}", e);
        }
    }

    fn set_ninja_checked(&mut self, checked: bool) {
        self.ninja_item.set_checked(checked);
    }
}
