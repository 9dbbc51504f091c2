//! Configuration management

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_EXCLUDED_TASK_PREFIX: &str = "Deposit useless items into the chest at";

/// Which embedding backend feeds the similarity index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Hashed bag-of-words vectors computed in-process
    Local,
    /// Ollama `/api/embeddings`
    Ollama,
    /// OpenAI-compatible hosted `/embeddings`
    OpenAi,
}

impl FromStr for EmbeddingBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            _ => Err(ConfigError::InvalidValue {
                key: "EMBEDDING_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

/// Which chat-completion backend answers prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionBackend {
    Ollama,
    OpenAi,
}

impl FromStr for CompletionBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            _ => Err(ConfigError::InvalidValue {
                key: "COMPLETION_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

/// How image parts are shaped in a chat request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// `{"type": "image_url", "image_url": "data:image/png;base64,..."}`
    Inline,
    /// `{"type": "image_url", "image_url": {"url": "data:...", "detail": "high"}}`
    Nested,
}

impl ImageEncoding {
    /// Backend capability default
    pub fn for_backend(backend: CompletionBackend) -> Self {
        match backend {
            CompletionBackend::Ollama => Self::Inline,
            CompletionBackend::OpenAi => Self::Nested,
        }
    }
}

impl FromStr for ImageEncoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "nested" => Ok(Self::Nested),
            _ => Err(ConfigError::InvalidValue {
                key: "IMAGE_ENCODING",
                value: s.to_string(),
            }),
        }
    }
}

/// Critic judgment source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticMode {
    Auto,
    Manual,
}

impl FromStr for CriticMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(ConfigError::InvalidValue {
                key: "CRITIC_MODE",
                value: s.to_string(),
            }),
        }
    }
}

/// Skill store settings
#[derive(Debug, Clone)]
pub struct SkillStoreConfig {
    /// Checkpoint root; the store lives under `{ckpt_dir}/skill`
    pub ckpt_dir: PathBuf,
    /// Load the registry from the checkpoint instead of starting empty
    pub resume: bool,
    /// Configured top-k for retrieval
    pub retrieval_top_k: usize,
    /// Extension for code artifacts (without the dot)
    pub code_extension: String,
    /// Tasks starting with this prefix never enter the library
    pub excluded_task_prefix: String,
    /// Extra procedure sources appended to `programs()`
    pub control_primitives: Vec<String>,
}

impl Default for SkillStoreConfig {
    fn default() -> Self {
        Self {
            ckpt_dir: PathBuf::from("ckpt"),
            resume: false,
            retrieval_top_k: 5,
            code_extension: "js".to_string(),
            excluded_task_prefix: DEFAULT_EXCLUDED_TASK_PREFIX.to_string(),
            control_primitives: Vec::new(),
        }
    }
}

/// Frame injection settings
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub enabled: bool,
    pub images_path: Option<PathBuf>,
    pub image_count: usize,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            images_path: None,
            image_count: 1,
        }
    }
}

/// Full runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub store: SkillStoreConfig,
    pub vision: VisionConfig,

    pub embedding_backend: EmbeddingBackend,
    /// Embedding model name (backend default when unset)
    pub embedding_model: Option<String>,

    pub completion_backend: CompletionBackend,
    pub completion_model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub image_encoding: ImageEncoding,

    pub ollama_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,

    pub critic_mode: CriticMode,
    pub critic_max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: SkillStoreConfig::default(),
            vision: VisionConfig::default(),
            embedding_backend: EmbeddingBackend::Local,
            embedding_model: None,
            completion_backend: CompletionBackend::OpenAi,
            completion_model: "gpt-4.1".to_string(),
            temperature: 0.0,
            request_timeout: Duration::from_secs(120),
            image_encoding: ImageEncoding::Nested,
            ollama_url: "http://localhost:11434".to_string(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            critic_mode: CriticMode::Auto,
            critic_max_retries: 5,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (env, test maps)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let ckpt_dir = lookup("SKILL_CKPT_DIR")
            .map(|v| PathBuf::from(shellexpand::tilde(&v).into_owned()))
            .unwrap_or(defaults.store.ckpt_dir);

        let resume = parse_bool(lookup("SKILL_RESUME"), false);

        let retrieval_top_k = parse_num(
            "SKILL_RETRIEVAL_TOP_K",
            lookup("SKILL_RETRIEVAL_TOP_K"),
            defaults.store.retrieval_top_k,
        )?;

        let code_extension = lookup("SKILL_CODE_EXTENSION")
            .map(|v| v.trim_start_matches('.').to_string())
            .unwrap_or(defaults.store.code_extension);

        let control_primitives = match lookup("SKILL_CONTROL_PRIMITIVES_DIR") {
            Some(dir) => load_control_primitives(
                Path::new(shellexpand::tilde(&dir).as_ref()),
                &code_extension,
            )?,
            None => defaults.store.control_primitives,
        };

        let excluded_task_prefix = lookup("SKILL_EXCLUDED_TASK_PREFIX")
            .unwrap_or(defaults.store.excluded_task_prefix);

        let embedding_backend = match lookup("EMBEDDING_BACKEND") {
            Some(v) => v.parse()?,
            None => defaults.embedding_backend,
        };

        let completion_backend = match lookup("COMPLETION_BACKEND") {
            Some(v) => v.parse()?,
            None => defaults.completion_backend,
        };

        let image_encoding = match lookup("IMAGE_ENCODING") {
            Some(v) => v.parse()?,
            None => ImageEncoding::for_backend(completion_backend),
        };

        let temperature = parse_num(
            "COMPLETION_TEMPERATURE",
            lookup("COMPLETION_TEMPERATURE"),
            defaults.temperature,
        )?;

        let timeout_secs = parse_num(
            "COMPLETION_TIMEOUT_SECS",
            lookup("COMPLETION_TIMEOUT_SECS"),
            defaults.request_timeout.as_secs(),
        )?;

        let vision = VisionConfig {
            enabled: parse_bool(lookup("VISION_ENABLED"), false),
            images_path: lookup("VISION_IMAGES_PATH")
                .map(|v| PathBuf::from(shellexpand::tilde(&v).into_owned())),
            image_count: parse_num(
                "VISION_IMAGE_COUNT",
                lookup("VISION_IMAGE_COUNT"),
                defaults.vision.image_count,
            )?,
        };

        if vision.enabled && vision.images_path.is_none() {
            return Err(ConfigError::Missing("VISION_IMAGES_PATH"));
        }

        let critic_mode = match lookup("CRITIC_MODE") {
            Some(v) => v.parse()?,
            None => defaults.critic_mode,
        };

        let critic_max_retries = parse_num(
            "CRITIC_MAX_RETRIES",
            lookup("CRITIC_MAX_RETRIES"),
            defaults.critic_max_retries,
        )?;

        Ok(Self {
            store: SkillStoreConfig {
                ckpt_dir,
                resume,
                retrieval_top_k,
                code_extension,
                excluded_task_prefix,
                control_primitives,
            },
            vision,
            embedding_backend,
            embedding_model: lookup("EMBEDDING_MODEL"),
            completion_backend,
            completion_model: lookup("COMPLETION_MODEL").unwrap_or(defaults.completion_model),
            temperature,
            request_timeout: Duration::from_secs(timeout_secs),
            image_encoding,
            ollama_url: lookup("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            openai_api_key: lookup("OPENAI_API_KEY"),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            critic_mode,
            critic_max_retries,
        })
    }
}

/// Sources of every `*.{extension}` file in `dir`, in file-name order
fn load_control_primitives(dir: &Path, extension: &str) -> Result<Vec<String>, ConfigError> {
    let unreadable = |path: &Path, source| ConfigError::Unreadable {
        key: "SKILL_CONTROL_PRIMITIVES_DIR",
        path: path.to_path_buf(),
        source,
    };

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| unreadable(dir, e))? {
        let path = entry.map_err(|e| unreadable(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();

    files
        .iter()
        .map(|path| std::fs::read_to_string(path).map_err(|e| unreadable(path, e)))
        .collect()
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    value
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "y"))
        .unwrap_or(default)
}

fn parse_num<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: v }),
        None => Ok(default),
    }
}
