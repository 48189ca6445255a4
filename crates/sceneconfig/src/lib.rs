use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level viewer configuration. Every key is optional.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub fullscreen: bool,
    pub resolution: Resolution,
    pub group_size: GroupSize,
    pub assets: Assets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Local work-group size of the raymarch compute shader.
///
/// Only the dispatch count is derived from this value. The shader declares
/// its own `local_size_x`/`local_size_y` (32×32 in the bundled
/// `raymarch_base.comp`), and the two must agree or the image is only
/// partly covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GroupSize {
    pub x: u32,
    pub y: u32,
}

impl Default for GroupSize {
    fn default() -> Self {
        Self::BUNDLED
    }
}

impl GroupSize {
    /// Local size declared by the bundled base shader.
    pub const BUNDLED: GroupSize = GroupSize { x: 32, y: 32 };

    /// Number of work groups needed to cover a `width`×`height` image.
    pub fn dispatch_for(&self, width: u32, height: u32) -> (u32, u32) {
        (width.div_ceil(self.x), height.div_ceil(self.y))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Assets {
    pub folder: PathBuf,
    pub copy_program: CopyProgram,
    pub raymarch_program: RaymarchProgram,
}

impl Default for Assets {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("resources"),
            copy_program: CopyProgram::default(),
            raymarch_program: RaymarchProgram::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CopyProgram {
    pub vertex_shader_filename: PathBuf,
    pub fragment_shader_filename: PathBuf,
}

impl Default for CopyProgram {
    fn default() -> Self {
        Self {
            vertex_shader_filename: PathBuf::from("base_vertex.vert"),
            fragment_shader_filename: PathBuf::from("copy.frag"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RaymarchProgram {
    pub base_file: PathBuf,
    pub library_file: PathBuf,
    pub scene_file: PathBuf,
    pub main_file: PathBuf,
    #[serde(
        deserialize_with = "deserialize_interval",
        serialize_with = "serialize_interval"
    )]
    pub scene_reload_interval: Duration,
}

impl Default for RaymarchProgram {
    fn default() -> Self {
        Self {
            base_file: PathBuf::from("raymarch_base.comp"),
            library_file: PathBuf::from("raymarch_library.comp"),
            scene_file: PathBuf::from("raymarch_scene.comp"),
            main_file: PathBuf::from("raymarch_main.comp"),
            scene_reload_interval: default_reload_interval(),
        }
    }
}

fn default_reload_interval() -> Duration {
    Duration::from_millis(500)
}

/// Accepts a bare number of milliseconds or a humantime string such as `"250ms"`.
fn deserialize_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("an interval in milliseconds or a human-readable duration")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_millis(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_millis(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v / 1000.0))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_interval<S>(interval: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*interval).to_string())
}

impl ViewerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, parsing it as JSON when the extension says so and TOML otherwise.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    /// Like [`ViewerConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(
                path = %path.display(),
                "configuration not found; using defaults"
            );
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "resolution must be non-zero, got {}x{}",
                self.resolution.width, self.resolution.height
            )));
        }

        if self.group_size.x == 0 || self.group_size.y == 0 {
            return Err(ConfigError::Invalid(format!(
                "group_size must be non-zero, got {}x{}",
                self.group_size.x, self.group_size.y
            )));
        }

        if self.group_size != GroupSize::BUNDLED {
            tracing::warn!(
                x = self.group_size.x,
                y = self.group_size.y,
                "group_size differs from the bundled shader's 32x32 local size; \
                 the base shader's layout must be changed to match"
            );
        }

        let program = &self.assets.raymarch_program;
        if program.scene_reload_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "assets.raymarch_program.scene_reload_interval must be greater than zero".into(),
            ));
        }

        let files = [
            ("assets.copy_program.vertex_shader_filename", &self.assets.copy_program.vertex_shader_filename),
            ("assets.copy_program.fragment_shader_filename", &self.assets.copy_program.fragment_shader_filename),
            ("assets.raymarch_program.base_file", &program.base_file),
            ("assets.raymarch_program.library_file", &program.library_file),
            ("assets.raymarch_program.scene_file", &program.scene_file),
            ("assets.raymarch_program.main_file", &program.main_file),
        ];
        for (key, file) in files {
            if file.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("{key} may not be empty")));
            }
        }

        Ok(())
    }

    pub fn asset_path(&self, file: &Path) -> PathBuf {
        self.assets.folder.join(file)
    }

    pub fn base_path(&self) -> PathBuf {
        self.asset_path(&self.assets.raymarch_program.base_file)
    }

    pub fn library_path(&self) -> PathBuf {
        self.asset_path(&self.assets.raymarch_program.library_file)
    }

    pub fn scene_path(&self) -> PathBuf {
        self.asset_path(&self.assets.raymarch_program.scene_file)
    }

    pub fn main_path(&self) -> PathBuf {
        self.asset_path(&self.assets.raymarch_program.main_file)
    }

    pub fn vertex_shader_path(&self) -> PathBuf {
        self.asset_path(&self.assets.copy_program.vertex_shader_filename)
    }

    pub fn fragment_shader_path(&self) -> PathBuf {
        self.asset_path(&self.assets.copy_program.fragment_shader_filename)
    }

    pub fn scene_reload_interval(&self) -> Duration {
        self.assets.raymarch_program.scene_reload_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
fullscreen = true

[resolution]
width = 1920
height = 1080

[group_size]
x = 16

[assets]
folder = "scenes"

[assets.raymarch_program]
scene_file = "terrain.comp"
scene_reload_interval = "250ms"
"#;

    #[test]
    fn parses_sample_config_and_fills_defaults() {
        let config = ViewerConfig::from_toml_str(SAMPLE).expect("parse config");
        assert!(config.fullscreen);
        assert_eq!(config.resolution, Resolution { width: 1920, height: 1080 });
        assert_eq!(config.group_size, GroupSize { x: 16, y: 32 });
        assert_eq!(config.scene_path(), PathBuf::from("scenes/terrain.comp"));
        assert_eq!(config.main_path(), PathBuf::from("scenes/raymarch_main.comp"));
        assert_eq!(config.scene_reload_interval(), Duration::from_millis(250));
    }

    #[test]
    fn default_group_size_matches_bundled_shader() {
        let base = include_str!("../../../resources/raymarch_base.comp");
        assert!(base.contains("local_size_x = 32, local_size_y = 32"));
        assert_eq!(GroupSize::default(), GroupSize::BUNDLED);
        assert_eq!(GroupSize::BUNDLED.dispatch_for(1280, 720), (40, 23));
    }

    #[test]
    fn empty_document_matches_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.resolution, Resolution { width: 1280, height: 720 });
        assert_eq!(config.scene_reload_interval(), Duration::from_millis(500));
        assert_eq!(config.vertex_shader_path(), PathBuf::from("resources/base_vertex.vert"));
    }

    #[test]
    fn accepts_json_layout_with_millisecond_interval() {
        let config = ViewerConfig::from_json_str(
            r#"{
                "resolution": { "width": 800, "height": 600 },
                "assets": {
                    "copy_program": { "fragment_shader_filename": "post.frag" },
                    "raymarch_program": { "scene_reload_interval": 750 }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.resolution.width, 800);
        assert_eq!(config.fragment_shader_path(), PathBuf::from("resources/post.frag"));
        assert_eq!(config.scene_reload_interval(), Duration::from_millis(750));
    }

    #[test]
    fn rejects_zero_group_size_and_interval() {
        let err = ViewerConfig::from_toml_str("[group_size]\nx = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ViewerConfig::from_toml_str(
            "[assets.raymarch_program]\nscene_reload_interval = 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_interval() {
        let err = ViewerConfig::from_toml_str(
            "[assets.raymarch_program]\nscene_reload_interval = \"soon\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn load_picks_format_from_extension() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("config.json");
        fs::write(&json, r#"{ "fullscreen": true }"#).unwrap();
        assert!(ViewerConfig::load(&json).unwrap().fullscreen);

        let toml_path = dir.path().join("config.toml");
        fs::write(&toml_path, "fullscreen = true\n").unwrap();
        assert!(ViewerConfig::load(&toml_path).unwrap().fullscreen);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ViewerConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn serialized_config_round_trips() {
        let config = ViewerConfig::from_toml_str(SAMPLE).unwrap();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("scene_reload_interval = \"250ms\""));
        assert_eq!(ViewerConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn dispatch_covers_partial_groups() {
        let groups = GroupSize { x: 32, y: 32 };
        assert_eq!(groups.dispatch_for(1280, 720), (40, 23));
        assert_eq!(groups.dispatch_for(1, 1), (1, 1));
    }
}
