//! TOML-backed content store.
//!
//! Templates and user settings live in `templates.toml` under the data
//! directory; a commented default file is created on first open. Saved
//! memories append to `memories.toml`.

use std::path::PathBuf;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use carenudge_core::storage::data_dir;
use carenudge_core::{ContentStore, NudgeCategory, NudgeTemplate, TimeWindow, UserSettings};

/// Wrapper for serializing templates and settings to TOML.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TemplatesFile {
    #[serde(default)]
    settings: Option<UserSettings>,
    #[serde(default)]
    templates: Vec<NudgeTemplate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoriesFile {
    #[serde(default)]
    memories: Vec<SavedMemory>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedMemory {
    template_id: String,
    saved_at: chrono::DateTime<Utc>,
}

/// Content store reading from the local templates file.
pub struct TomlContentStore {
    path: PathBuf,
    memories_path: PathBuf,
}

impl TomlContentStore {
    /// Open the store, creating a default templates file if needed.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = data_dir()?;
        let path = dir.join("templates.toml");

        if !path.exists() {
            std::fs::write(
                &path,
                r#"# carenudge templates and user settings

[settings]
daily_max = 3

[[templates]]
id = "tpl-breathing-01"
title = "A quiet breath"
body = "Breathe in slowly for four counts, then out for six."
category = "calming"
audio_url = "https://cdn.example/audio/breathing-01.ogg"
is_active = true

[[templates]]
id = "tpl-gratitude-01"
title = "One good thing"
body = "Think of one small thing that went well today."
category = "gratitude"
is_active = true

[[templates]]
id = "tpl-memory-01"
title = "A fond memory"
body = "Picture a place you loved visiting. What did it smell like?"
category = "memory"
audio_url = "https://cdn.example/audio/memory-01.ogg"
is_active = true
"#,
            )?;
        }

        Ok(Self {
            path,
            memories_path: dir.join("memories.toml"),
        })
    }

    /// Store with explicit paths (tests).
    pub fn with_paths(path: PathBuf, memories_path: PathBuf) -> Self {
        Self {
            path,
            memories_path,
        }
    }

    fn load(&self) -> TemplatesFile {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return TemplatesFile::default();
        };
        toml::from_str(&content).unwrap_or_default()
    }
}

impl ContentStore for TomlContentStore {
    fn template_by_id(&self, id: &str) -> Option<NudgeTemplate> {
        self.load().templates.into_iter().find(|t| t.id == id)
    }

    /// Deterministic daily pick: eligible templates rotate by day of year,
    /// so the nudge varies across days but repeated calls within a day
    /// agree.
    fn random_for_window(
        &self,
        _window: TimeWindow,
        categories: Option<&[NudgeCategory]>,
    ) -> Option<NudgeTemplate> {
        let eligible: Vec<NudgeTemplate> = self
            .load()
            .templates
            .into_iter()
            .filter(|t| {
                t.is_active
                    && categories
                        .map(|cats| cats.contains(&t.category))
                        .unwrap_or(true)
            })
            .collect();
        if eligible.is_empty() {
            return None;
        }
        let index = Utc::now().ordinal() as usize % eligible.len();
        eligible.into_iter().nth(index)
    }

    fn user_settings(&self) -> Option<UserSettings> {
        self.load().settings
    }

    fn save_memory(
        &self,
        template_id: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut file: MemoriesFile = std::fs::read_to_string(&self.memories_path)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default();
        file.memories.push(SavedMemory {
            template_id: template_id.to_string(),
            saved_at: Utc::now(),
        });
        std::fs::write(&self.memories_path, toml::to_string_pretty(&file)?)?;
        Ok(())
    }
}
