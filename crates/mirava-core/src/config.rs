//! Shared configuration types for mirror management
//!
//! These types are shared across crates. The config file is loaded by the
//! `mirava` binary, but these types define the mirror layout consumed by
//! [`MirrorRegistry::from_config`](crate::MirrorRegistry::from_config).

use serde::{Deserialize, Serialize};

/// One mirror of an upstream type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Identifier used for reset and the `X-Served-By` header
    pub name: String,
    /// Base URL of the mirror
    pub url: String,
    /// Lower = tried first
    #[serde(default = "default_priority")]
    pub priority: i32,
}

/// An upstream type and its mirrors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MirrorTypeConfig {
    /// Upstream type name, e.g. "docker" or "pypi"
    pub name: String,
    /// Canonical upstream used when every mirror fails
    #[serde(default)]
    pub official_url: Option<String>,
    #[serde(default)]
    pub mirrors: Vec<MirrorConfig>,
}

impl MirrorConfig {
    pub fn new(name: &str, url: &str, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            priority,
        }
    }
}

/// Priority given to mirrors registered without one
pub fn default_priority() -> i32 {
    50
}

/// Built-in upstream types: the container registry and the package index
pub fn default_mirror_types() -> Vec<MirrorTypeConfig> {
    vec![
        MirrorTypeConfig {
            name: "docker".to_string(),
            official_url: Some("https://registry-1.docker.io".to_string()),
            mirrors: vec![
                MirrorConfig::new("runflare", "https://mirror-docker.runflare.com", 0),
                MirrorConfig::new("ustc", "https://docker.mirrors.ustc.edu.cn", 1),
                MirrorConfig::new("netease", "https://hub-mirror.c.163.com", 2),
                MirrorConfig::new("gcr", "https://mirror.gcr.io", 3),
            ],
        },
        MirrorTypeConfig {
            name: "pypi".to_string(),
            official_url: Some("https://pypi.org/simple".to_string()),
            mirrors: vec![
                MirrorConfig::new("runflare-pypi", "https://mirror-pypi.runflare.com/simple", 0),
                MirrorConfig::new("tsinghua", "https://pypi.tuna.tsinghua.edu.cn/simple", 1),
                MirrorConfig::new("aliyun", "https://mirrors.aliyun.com/pypi/simple", 2),
            ],
        },
    ]
}
