mod settings;

pub use settings::{
    ChatDefaults, InferenceConfig, LoggingConfig, Settings, StorageBackend, StorageConfig,
};
