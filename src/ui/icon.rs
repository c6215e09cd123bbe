use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use log::debug;
use png::Decoder;

use crate::model::TrayState;

// Embedded at compile time so the binary runs without an install tree
static ICON_LOADING: &[u8] = include_bytes!("../../assets/tray-loading.png");
static ICON_IDLE: &[u8] = include_bytes!("../../assets/tray-idle.png");
static ICON_ALERT: &[u8] = include_bytes!("../../assets/tray-alert.png");
static ICON_APP: &[u8] = include_bytes!("../../assets/app-icon.png");

const APP_ICON_FILE_NAME: &str = "app-icon.png";

/// Decoded RGBA pixels.
#[derive(Debug)]
pub struct RgbaImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Resolves icon assets by purpose.
pub struct IconSet;

impl IconSet {
    pub fn tray_bytes(state: TrayState) -> &'static [u8] {
        match state {
            TrayState::Loading => ICON_LOADING,
            TrayState::Idle => ICON_IDLE,
            TrayState::Alert => ICON_ALERT,
        }
    }

    pub fn tray_icon(state: TrayState) -> Result<tray_icon::Icon> {
        let image = decode_png(Self::tray_bytes(state))?;
        tray_icon::Icon::from_rgba(image.rgba, image.width, image.height)
            .map_err(|e| anyhow!("failed to create tray icon: {e}"))
    }

    pub fn window_icon() -> Result<tao::window::Icon> {
        let image = decode_png(ICON_APP)?;
        tao::window::Icon::from_rgba(image.rgba, image.width, image.height)
            .map_err(|e| anyhow!("failed to create window icon: {e}"))
    }

    #[cfg(target_os = "windows")]
    pub fn badge_overlay() -> Result<tao::window::Icon> {
        let image = decode_png(ICON_ALERT)?;
        tao::window::Icon::from_rgba(image.rgba, image.width, image.height)
            .map_err(|e| anyhow!("failed to create badge overlay: {e}"))
    }

    /// File path of the application icon for native notifiers. An `assets`
    /// directory next to the executable wins; otherwise the embedded copy is
    /// written into the data directory once.
    pub fn notification_icon_path() -> Result<PathBuf> {
        if let Some(path) = bundled_asset(APP_ICON_FILE_NAME) {
            return Ok(path);
        }
        let path = crate::config::data_dir().join(APP_ICON_FILE_NAME);
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("failed to create icon directory")?;
            }
            fs::write(&path, ICON_APP).context("failed to write notification icon")?;
            debug!("Wrote notification icon to {}", path.display());
        }
        Ok(path)
    }
}

fn bundled_asset(filename: &str) -> Option<PathBuf> {
    let exe_path = env::current_exe().ok()?;
    let path = exe_path.parent()?.join("assets").join(filename);
    path.exists().then_some(path)
}

pub fn decode_png(png_data: &[u8]) -> Result<RgbaImage> {
    let decoder = Decoder::new(png_data);
    let mut reader = decoder
        .read_info()
        .map_err(|e| anyhow!("failed to read PNG header: {e}"))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| anyhow!("failed to decode PNG: {e}"))?;

    let width = info.width;
    let height = info.height;
    let pixels = &buf[..info.buffer_size()];

    let rgba = match info.color_type {
        png::ColorType::Rgba => pixels.to_vec(),
        png::ColorType::Rgb => {
            let mut rgba = Vec::with_capacity((width * height * 4) as usize);
            for chunk in pixels.chunks(3) {
                rgba.extend_from_slice(chunk);
                rgba.push(255);
            }
            rgba
        }
        png::ColorType::GrayscaleAlpha => {
            let mut rgba = Vec::with_capacity((width * height * 4) as usize);
            for chunk in pixels.chunks(2) {
                rgba.extend_from_slice(&[chunk[0], chunk[0], chunk[0], chunk[1]]);
            }
            rgba
        }
        png::ColorType::Grayscale => {
            let mut rgba = Vec::with_capacity((width * height * 4) as usize);
            for &gray in pixels {
                rgba.extend_from_slice(&[gray, gray, gray, 255]);
            }
            rgba
        }
        png::ColorType::Indexed => {
            return Err(anyhow!("indexed PNG not supported for icons"));
        }
    };

    Ok(RgbaImage {
        rgba,
        width,
        height,
    })
}
