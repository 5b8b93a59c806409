// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Fresh id embedding the entity's config id.
            pub fn generate(config_id: &str) -> Self {
                Self(format!(concat!($prefix, "_{}_{}"), config_id, Uuid::new_v4()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(DataNodeId, "DATANODE");
entity_id!(TaskId, "TASK");
entity_id!(SequenceId, "SEQUENCE");
entity_id!(
    /// `JOB_<task config id>_<uuid>`.
    JobId,
    "JOB"
);

/// How jobs are executed.
///
/// - `Development`: every job runs synchronously on the submitting thread.
/// - `Standalone`: jobs run on a bounded worker pool when more than one
///   worker is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobExecutionMode {
    #[default]
    Development,
    Standalone,
}

impl FromStr for JobExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(JobExecutionMode::Development),
            "standalone" => Ok(JobExecutionMode::Standalone),
            other => Err(format!(
                "invalid mode: {other} (expected \"development\" or \"standalone\")"
            )),
        }
    }
}
