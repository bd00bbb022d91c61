use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub scratch: ScratchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub model: String,
    pub languages: String,
    pub data_path: Option<String>,
    pub correct_orientation: bool,
    pub concurrency: EngineConcurrency,
    pub workers: usize,
    /// Detection timeout applied by the request handler. `0` disables it.
    pub timeout_secs: u64,
    pub preprocess: bool,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScratchConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub sweep_on_start: bool,
    /// Minimum age of a prefixed file before the startup sweep removes it.
    /// Younger files may belong to another live instance.
    pub stale_after_secs: u64,
}

/// How the OCR adapter schedules calls into the shared engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EngineConcurrency {
    /// At most one engine call runs at a time.
    Serialized,
    /// Calls go straight to the engine, which must tolerate parallel use.
    Concurrent,
}

impl FromStr for EngineConcurrency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serialized" | "serial" | "exclusive" => Ok(Self::Serialized),
            "concurrent" | "parallel" | "shared" => Ok(Self::Concurrent),
            other => Err(format!(
                "unknown concurrency mode '{other}' (expected 'serialized' or 'concurrent')"
            )),
        }
    }
}

impl fmt::Display for EngineConcurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialized => write!(f, "serialized"),
            Self::Concurrent => write!(f, "concurrent"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT` without logging, since this runs before tracing is
    /// initialized. Unknown values mean pretty output.
    pub fn from_env() -> Self {
        env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::Pretty)
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: "local/tesseract".to_string(),
            languages: "eng".to_string(),
            data_path: None,
            correct_orientation: true,
            concurrency: EngineConcurrency::Serialized,
            workers: 1,
            timeout_secs: 60,
            preprocess: true,
            max_image_dimension: 4096,
            min_image_dimension: 1,
        }
    }
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: env::temp_dir().join("scanline"),
            prefix: "upload_".to_string(),
            sweep_on_start: true,
            stale_after_secs: 3600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let ocr_defaults = OcrConfig::default();
        let scratch_defaults = ScratchConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("SCANLINE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("SCANLINE_PORT", 8000),
                max_upload_bytes: parse_env_or("SCANLINE_MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or(ocr_defaults.model),
                languages: env::var("OCR_LANGUAGES").unwrap_or(ocr_defaults.languages),
                data_path: env::var("OCR_DATA_PATH").ok().filter(|p| !p.is_empty()),
                correct_orientation: parse_env_or(
                    "OCR_CORRECT_ORIENTATION",
                    ocr_defaults.correct_orientation,
                ),
                concurrency: parse_env_or("OCR_CONCURRENCY", ocr_defaults.concurrency),
                workers: parse_env_or("OCR_WORKERS", ocr_defaults.workers).max(1),
                timeout_secs: parse_env_or("OCR_TIMEOUT", ocr_defaults.timeout_secs),
                preprocess: parse_env_or("OCR_PREPROCESS", ocr_defaults.preprocess),
                max_image_dimension: parse_env_or(
                    "OCR_MAX_DIMENSION",
                    ocr_defaults.max_image_dimension,
                ),
                min_image_dimension: parse_env_or(
                    "OCR_MIN_DIMENSION",
                    ocr_defaults.min_image_dimension,
                ),
            },
            scratch: ScratchConfig {
                dir: env::var("SCRATCH_DIR")
                    .ok()
                    .filter(|d| !d.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or(scratch_defaults.dir),
                prefix: env::var("SCRATCH_PREFIX")
                    .ok()
                    .filter(|p| !p.is_empty())
                    .unwrap_or(scratch_defaults.prefix),
                sweep_on_start: parse_env_or(
                    "SCRATCH_SWEEP_ON_START",
                    scratch_defaults.sweep_on_start,
                ),
                stale_after_secs: parse_env_or(
                    "SCRATCH_STALE_AFTER",
                    scratch_defaults.stale_after_secs,
                ),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Mutex;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const OCR_VARS: &[&str] = &[
        "OCR_MODEL",
        "OCR_LANGUAGES",
        "OCR_DATA_PATH",
        "OCR_CORRECT_ORIENTATION",
        "OCR_CONCURRENCY",
        "OCR_WORKERS",
        "OCR_TIMEOUT",
        "OCR_PREPROCESS",
    ];

    fn clear(vars: &[&str]) {
        for var in vars {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_ocr_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear(OCR_VARS);

        let config = Config::default();
        assert_eq!(config.ocr.model, "local/tesseract");
        assert_eq!(config.ocr.languages, "eng");
        assert!(config.ocr.data_path.is_none());
        assert!(config.ocr.correct_orientation);
        assert_eq!(config.ocr.concurrency, EngineConcurrency::Serialized);
        assert_eq!(config.ocr.workers, 1);
        assert_eq!(config.ocr.timeout_secs, 60);
        assert!(config.ocr.preprocess);
    }

    #[test]
    #[serial]
    fn test_ocr_config_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("OCR_LANGUAGES", "eng+deu");
        std::env::set_var("OCR_CORRECT_ORIENTATION", "false");
        std::env::set_var("OCR_CONCURRENCY", "concurrent");
        std::env::set_var("OCR_WORKERS", "4");
        std::env::set_var("OCR_TIMEOUT", "0");

        let config = Config::default();
        assert_eq!(config.ocr.languages, "eng+deu");
        assert!(!config.ocr.correct_orientation);
        assert_eq!(config.ocr.concurrency, EngineConcurrency::Concurrent);
        assert_eq!(config.ocr.workers, 4);
        assert_eq!(config.ocr.timeout_secs, 0);

        clear(OCR_VARS);
    }

    #[test]
    #[serial]
    fn test_invalid_concurrency_falls_back_to_serialized() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("OCR_CONCURRENCY", "whenever");
        let config = Config::default();
        assert_eq!(config.ocr.concurrency, EngineConcurrency::Serialized);
        std::env::remove_var("OCR_CONCURRENCY");
    }

    #[test]
    #[serial]
    fn test_zero_workers_is_clamped() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("OCR_WORKERS", "0");
        let config = Config::default();
        assert_eq!(config.ocr.workers, 1);
        std::env::remove_var("OCR_WORKERS");
    }

    #[test]
    #[serial]
    fn test_scratch_config_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("SCRATCH_DIR", "/srv/scanline/scratch");
        std::env::set_var("SCRATCH_PREFIX", "img_");
        std::env::set_var("SCRATCH_SWEEP_ON_START", "false");
        std::env::set_var("SCRATCH_STALE_AFTER", "120");

        let config = Config::default();
        assert_eq!(config.scratch.dir, PathBuf::from("/srv/scanline/scratch"));
        assert_eq!(config.scratch.prefix, "img_");
        assert!(!config.scratch.sweep_on_start);
        assert_eq!(config.scratch.stale_after_secs, 120);

        clear(&[
            "SCRATCH_DIR",
            "SCRATCH_PREFIX",
            "SCRATCH_SWEEP_ON_START",
            "SCRATCH_STALE_AFTER",
        ]);
    }

    #[test]
    #[serial]
    fn test_empty_scratch_prefix_uses_default() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("SCRATCH_PREFIX", "");
        let config = Config::default();
        assert_eq!(config.scratch.prefix, "upload_");
        std::env::remove_var("SCRATCH_PREFIX");
    }

    #[test]
    #[serial]
    fn test_parse_env_or_valid_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("__TEST_PARSE_PORT", "8080");
        let result: u16 = parse_env_or("__TEST_PARSE_PORT", 3000);
        assert_eq!(result, 8080);
        std::env::remove_var("__TEST_PARSE_PORT");
    }

    #[test]
    #[serial]
    fn test_parse_env_or_invalid_value_uses_default() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("__TEST_PARSE_FLAG", "maybe");
        let result: bool = parse_env_or("__TEST_PARSE_FLAG", true);
        assert!(result);
        std::env::remove_var("__TEST_PARSE_FLAG");
    }

    #[test]
    fn test_concurrency_round_trips_through_display() {
        for mode in [EngineConcurrency::Serialized, EngineConcurrency::Concurrent] {
            assert_eq!(mode.to_string().parse::<EngineConcurrency>(), Ok(mode));
        }
    }

    #[test]
    #[serial]
    fn test_log_format_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("LOG_FORMAT", "json");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        std::env::set_var("LOG_FORMAT", "yaml");
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);

        std::env::remove_var("LOG_FORMAT");
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
