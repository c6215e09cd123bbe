use anyhow::Result;
use tray_icon::menu::{Menu, MenuId, MenuItem, PredefinedMenuItem};

use crate::model::MenuAction;

const MENU_ID_SHOW: &str = "show";
const MENU_ID_HIDE: &str = "hide";
const MENU_ID_QUIT: &str = "quit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuEntry {
    Item {
        id: &'static str,
        label: &'static str,
        action: MenuAction,
    },
    Separator,
}

/// Tray context menu: Show, separator, Quit. Linux trays (appindicator)
/// report no icon clicks, so the menu also carries Hide there.
pub fn main_menu_spec() -> Vec<MenuEntry> {
    let mut spec = vec![MenuEntry::Item {
        id: MENU_ID_SHOW,
        label: "Show",
        action: MenuAction::Show,
    }];
    if cfg!(target_os = "linux") {
        spec.push(MenuEntry::Item {
            id: MENU_ID_HIDE,
            label: "Hide",
            action: MenuAction::Hide,
        });
    }
    spec.push(MenuEntry::Separator);
    spec.push(MenuEntry::Item {
        id: MENU_ID_QUIT,
        label: "Quit",
        action: MenuAction::Quit,
    });
    spec
}

/// Builds a native menu preserving entry order and separator placement.
pub fn build_menu(spec: &[MenuEntry]) -> Result<Menu> {
    let menu = Menu::new();
    for entry in spec {
        match entry {
            MenuEntry::Item { id, label, .. } => {
                let item = MenuItem::with_id(*id, *label, true, None);
                menu.append(&item)?;
            }
            MenuEntry::Separator => menu.append(&PredefinedMenuItem::separator())?,
        }
    }
    Ok(menu)
}

pub fn parse_menu_action(spec: &[MenuEntry], id: &MenuId) -> Option<MenuAction> {
    spec.iter().find_map(|entry| match entry {
        MenuEntry::Item {
            id: item_id,
            action,
            ..
        } if id.0 == *item_id => Some(*action),
        _ => None,
    })
}
