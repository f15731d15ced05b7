//! Settings and command line arguments.
//!
//! Settings are read from a JSON file. Every field has a default, so a file only needs the values
//! it changes and a missing file means "all defaults".

use std::{
    fs,
    path::{Path, PathBuf},
};

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::{abs::PolygonMode, render::ShaderPaths, render::camera::Camera};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// One of `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
    pub window: WindowSettings,
    pub camera: CameraSettings,
    pub render: RenderSettings,
    pub shaders: ShaderSettings,
    pub skybox: SkyboxSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowSettings::default(),
            camera: CameraSettings::default(),
            render: RenderSettings::default(),
            shaders: ShaderSettings::default(),
            skybox: SkyboxSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "skyview".to_string(),
            width: 1600,
            height: 900,
            fullscreen: false,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: [f32; 3],
    /// Degrees.
    pub yaw: f32,
    /// Degrees.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub speed: f32,
    pub sensitivity: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        use crate::render::camera::{PITCH, SENSITIVITY, SPEED, YAW, ZOOM};
        Self {
            position: [0.0, 0.0, -0.25],
            yaw: YAW,
            pitch: PITCH,
            fov: ZOOM,
            speed: SPEED,
            sensitivity: SENSITIVITY,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl CameraSettings {
    /// Builds a camera with these settings.
    pub fn build(&self) -> Camera {
        let mut camera = Camera::with_orientation(Vec3::from(self.position), self.yaw, self.pitch);
        camera.set_zoom(self.fov);
        camera.speed = self.speed;
        camera.sensitivity = self.sensitivity;
        camera.near = self.near;
        camera.far = self.far;
        camera
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// RGBA, each in `0.0..=1.0`.
    pub clear_color: [f32; 4],
    /// Start in wireframe mode.
    pub wireframe: bool,
    pub crosshair: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.45, 0.55, 0.60, 1.0],
            wireframe: false,
            crosshair: true,
        }
    }
}

impl RenderSettings {
    pub fn clear_color(&self) -> Vec4 {
        Vec4::from(self.clear_color)
    }

    pub fn polygon_mode(&self) -> PolygonMode {
        if self.wireframe {
            PolygonMode::Line
        } else {
            PolygonMode::Fill
        }
    }
}

/// Shader files to use instead of the built-in ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderSettings {
    pub scene: Option<ShaderPaths>,
    pub skybox: Option<ShaderPaths>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyboxSettings {
    /// Face images ordered +X, -X, +Y, -Y, +Z, -Z.
    pub faces: [PathBuf; 6],
}

impl Default for SkyboxSettings {
    fn default() -> Self {
        let dir = Path::new("assets/skyboxes/ocean");
        Self {
            faces: ["right", "left", "top", "bottom", "front", "back"]
                .map(|name| dir.join(format!("{name}.jpg"))),
        }
    }
}

impl Settings {
    /// Where settings are looked for when no path is given.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("skyview").join("settings.json"))
    }

    pub fn from_json(s: &str) -> Result<Self, String> {
        serde_json::from_str(s).map_err(|e| format!("failed to parse settings: {e}"))
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("failed to serialize settings: {e}"))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read settings {}: {e}", path.display()))?;
        Self::from_json(&content).map_err(|e| format!("{}: {e}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .map_err(|e| format!("failed to write settings {}: {e}", path.display()))
    }

    /// Loads `path` if given. Otherwise loads the file at [`default_path`](Self::default_path),
    /// falling back to the defaults when there is none.
    ///
    /// A file that was asked for explicitly must load. A broken file at the default location is
    /// reported and ignored.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Ok(Self::load(&path).unwrap_or_else(|e| {
                eprintln!("{e}, using default settings");
                Self::default()
            })),
            _ => Ok(Self::default()),
        }
    }

    /// The configured log level, `info` if it is unknown.
    pub fn log_level(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

/// What the binary was asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    /// Render this many frames without a window, then exit.
    pub headless: Option<u64>,
    /// Print the effective settings as JSON and exit.
    pub print_settings: bool,
    pub help: bool,
    pub settings: Option<PathBuf>,
}

pub const USAGE: &str = "usage: skyview [--headless <frames>] [--print-settings] [settings.json]";

impl Args {
    /// Parses the arguments after the program name.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--headless" => {
                    let frames = args
                        .next()
                        .ok_or_else(|| "--headless needs a frame count".to_string())?;
                    let frames = frames
                        .parse()
                        .map_err(|e| format!("invalid frame count {frames:?}: {e}"))?;
                    parsed.headless = Some(frames);
                }
                "--print-settings" => parsed.print_settings = true,
                "-h" | "--help" => parsed.help = true,
                flag if flag.starts_with('-') => return Err(format!("unknown option {flag}")),
                path => {
                    if parsed.settings.is_some() {
                        return Err(format!("unexpected argument {path}"));
                    }
                    parsed.settings = Some(PathBuf::from(path));
                }
            }
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, String> {
        Args::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{ "window": { "width": 800 }, "render": { "wireframe": true } }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.window.width, 800);
        assert_eq!(settings.window.height, 900);
        assert_eq!(settings.render.polygon_mode(), PolygonMode::Line);
        assert_eq!(settings.render.clear_color(), Vec4::new(0.45, 0.55, 0.60, 1.0));
        assert_eq!(settings.skybox, SkyboxSettings::default());
    }

    #[test]
    fn test_default_skybox_is_ocean() {
        let faces = SkyboxSettings::default().faces;
        assert_eq!(faces[0], Path::new("assets/skyboxes/ocean/right.jpg"));
        assert_eq!(faces[5], Path::new("assets/skyboxes/ocean/back.jpg"));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("skyview-settings-{}", std::process::id()))
            .join("settings.json");
        let mut settings = Settings::default();
        settings.camera.fov = 30.0;
        settings.shaders.scene = Some(ShaderPaths {
            vertex: "a.vs".into(),
            fragment: "a.fs".into(),
        });
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
        assert_eq!(Settings::load_or_default(Some(&path)).unwrap(), settings);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        assert!(Settings::load_or_default(Some(Path::new("/nonexistent/skyview.json"))).is_err());
    }

    #[test]
    fn test_camera_from_settings() {
        let mut settings = CameraSettings::default();
        settings.fov = 200.0;
        settings.speed = 5.0;
        let camera = settings.build();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, -0.25));
        assert_eq!(camera.zoom(), 45.0);
        assert_eq!(camera.speed, 5.0);
    }

    #[test]
    fn test_log_level() {
        let mut settings = Settings::default();
        assert_eq!(settings.log_level(), log::LevelFilter::Info);
        settings.log_level = "loud".to_string();
        assert_eq!(settings.log_level(), log::LevelFilter::Info);
        settings.log_level = "debug".to_string();
        assert_eq!(settings.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(args(&[]).unwrap(), Args::default());

        let parsed = args(&["--headless", "120", "my.json"]).unwrap();
        assert_eq!(parsed.headless, Some(120));
        assert_eq!(parsed.settings, Some(PathBuf::from("my.json")));

        assert!(args(&["--headless"]).is_err());
        assert!(args(&["--headless", "many"]).is_err());
        assert!(args(&["--fast"]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
    }
}
