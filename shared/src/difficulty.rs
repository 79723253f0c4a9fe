//! Difficulty levels of a game and the level the user picked.
//! The choice is remembered in an injected `SettingsStore`.

use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::settings::SettingsStore;

const SETTINGS_GROUP: &str = "Difficulty";
const SETTINGS_KEY: &str = "Level";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardLevel {
    Custom,
    RidiculouslyEasy,
    VeryEasy,
    Easy,
    Medium,
    Hard,
    VeryHard,
    ExtremelyHard,
    Impossible,
}

impl StandardLevel {
    /// Every standard level, easiest first
    pub const ALL: [StandardLevel; 8] = [
        StandardLevel::RidiculouslyEasy,
        StandardLevel::VeryEasy,
        StandardLevel::Easy,
        StandardLevel::Medium,
        StandardLevel::Hard,
        StandardLevel::VeryHard,
        StandardLevel::ExtremelyHard,
        StandardLevel::Impossible,
    ];

    pub fn hardness(self) -> i32 {
        match self {
            StandardLevel::Custom => -1,
            StandardLevel::RidiculouslyEasy => 10,
            StandardLevel::VeryEasy => 20,
            StandardLevel::Easy => 30,
            StandardLevel::Medium => 40,
            StandardLevel::Hard => 50,
            StandardLevel::VeryHard => 60,
            StandardLevel::ExtremelyHard => 70,
            StandardLevel::Impossible => 80,
        }
    }

    /// Stable key stored in the settings. Also used as the title.
    pub fn key(self) -> Option<&'static str> {
        let key = match self {
            StandardLevel::Custom => return None,
            StandardLevel::RidiculouslyEasy => "Ridiculously Easy",
            StandardLevel::VeryEasy => "Very Easy",
            StandardLevel::Easy => "Easy",
            StandardLevel::Medium => "Medium",
            StandardLevel::Hard => "Hard",
            StandardLevel::VeryHard => "Very Hard",
            StandardLevel::ExtremelyHard => "Extremely Hard",
            StandardLevel::Impossible => "Impossible",
        };
        Some(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyLevel {
    hardness: i32,
    standard_level: StandardLevel,
    key: String,
    title: String,
}

impl DifficultyLevel {
    /// A level of the standard scale, `None` for `StandardLevel::Custom`
    pub fn standard(level: StandardLevel) -> Option<Self> {
        let key = level.key()?;
        Some(Self {
            hardness: level.hardness(),
            standard_level: level,
            key: key.to_string(),
            title: key.to_string(),
        })
    }

    pub fn custom(hardness: i32, key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            hardness,
            standard_level: StandardLevel::Custom,
            key: key.into(),
            title: title.into(),
        }
    }

    pub fn hardness(&self) -> i32 {
        self.hardness
    }

    pub fn standard_level(&self) -> StandardLevel {
        self.standard_level
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DifficultyError {
    #[error("Levels cannot be added once a level is selected")]
    LevelsFrozen,

    #[error("StandardLevel::Custom has no standard definition")]
    CustomNotStandard,

    #[error("Difficulty level {key} already exists")]
    DuplicateKey { key: String },

    #[error("No difficulty level {key}")]
    UnknownLevel { key: String },

    #[error("No difficulty levels defined")]
    NoLevels,
}

/// Changes reported to `Difficulty` listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DifficultyEvent {
    /// The user picked a level. Also reported with the unchanged level when
    /// a change is refused, so a level picker can reset itself.
    Selected(String),
    /// The current level changed
    Changed(String),
    EditableChanged(bool),
    GameRunningChanged(bool),
}

type Listener = Box<dyn FnMut(&DifficultyEvent) + Send>;
type Confirmation = Box<dyn FnMut(&DifficultyLevel, &DifficultyLevel) -> bool + Send>;

/// Ordered set of difficulty levels with a current selection.
///
/// Levels are added first; the first call to `current_level` restores the
/// stored choice and freezes the set. Changing the level while a game is
/// running asks the confirmation callback, since it ends the game.
pub struct Difficulty {
    levels: Vec<DifficultyLevel>,
    current: Option<usize>,
    editable: bool,
    game_running: bool,
    settings: Arc<dyn SettingsStore>,
    listeners: Vec<Listener>,
    confirmation: Option<Confirmation>,
}

impl Difficulty {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            levels: Vec::new(),
            current: None,
            editable: true,
            game_running: false,
            settings,
            listeners: Vec::new(),
            confirmation: None,
        }
    }

    // Levels

    /// Adds a level, keeping the levels sorted by hardness. A level is put
    /// before existing levels of equal hardness.
    pub fn add_level(&mut self, level: DifficultyLevel) -> Result<(), DifficultyError> {
        if self.current.is_some() {
            return Err(DifficultyError::LevelsFrozen);
        }
        if self.index_of(level.key()).is_some() {
            return Err(DifficultyError::DuplicateKey {
                key: level.key().to_string(),
            });
        }
        let index = self
            .levels
            .iter()
            .position(|existing| existing.hardness() >= level.hardness())
            .unwrap_or(self.levels.len());
        self.levels.insert(index, level);
        Ok(())
    }

    /// Adds the standard levels from `from` to `to`, both included
    pub fn add_standard_level_range(
        &mut self,
        from: StandardLevel,
        to: StandardLevel,
    ) -> Result<(), DifficultyError> {
        if from == StandardLevel::Custom || to == StandardLevel::Custom {
            return Err(DifficultyError::CustomNotStandard);
        }
        for level in StandardLevel::ALL {
            if level < from || level > to {
                continue;
            }
            if let Some(level) = DifficultyLevel::standard(level) {
                self.add_level(level)?;
            }
        }
        Ok(())
    }

    /// Levels sorted by hardness, easiest first
    pub fn levels(&self) -> &[DifficultyLevel] {
        &self.levels
    }

    /// The selected level. The first call restores the level stored in the
    /// settings, or picks the easiest one.
    pub fn current_level(&mut self) -> Result<&DifficultyLevel, DifficultyError> {
        let index = self.current_index()?;
        Ok(&self.levels[index])
    }

    fn current_index(&mut self) -> Result<usize, DifficultyError> {
        if let Some(index) = self.current {
            return Ok(index);
        }
        if self.levels.is_empty() {
            return Err(DifficultyError::NoLevels);
        }
        let stored = self.settings.read(SETTINGS_GROUP, SETTINGS_KEY);
        let index = stored
            .as_deref()
            .and_then(|key| self.index_of(key))
            .unwrap_or(0);
        debug!("Difficulty level {} restored", self.levels[index].key());
        self.current = Some(index);
        Ok(index)
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.levels.iter().position(|level| level.key() == key)
    }

    /// Switches to the level with `key`. Returns whether the level changed.
    pub fn select(&mut self, key: &str) -> Result<bool, DifficultyError> {
        let index = self
            .index_of(key)
            .ok_or_else(|| DifficultyError::UnknownLevel {
                key: key.to_string(),
            })?;
        let current = self.current_index()?;
        if current == index {
            return Ok(false);
        }

        if self.game_running {
            let confirmed = match &mut self.confirmation {
                Some(confirm) => confirm(&self.levels[current], &self.levels[index]),
                None => true,
            };
            if !confirmed {
                info!("Difficulty change to {} refused during a game", key);
                let current_key = self.levels[current].key().to_string();
                self.emit(DifficultyEvent::Selected(current_key));
                return Ok(false);
            }
        }

        self.current = Some(index);
        debug!("Difficulty level changed to {}", key);
        self.emit(DifficultyEvent::Selected(key.to_string()));
        self.emit(DifficultyEvent::Changed(key.to_string()));
        Ok(true)
    }

    /// Writes the selected level to the settings. Also done on drop.
    pub fn save(&self) {
        if let Some(index) = self.current {
            self.settings
                .write(SETTINGS_GROUP, SETTINGS_KEY, self.levels[index].key());
        }
    }

    // State

    /// Whether the user may change the level
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn set_editable(&mut self, editable: bool) {
        if self.editable == editable {
            return;
        }
        self.editable = editable;
        self.emit(DifficultyEvent::EditableChanged(editable));
    }

    pub fn is_game_running(&self) -> bool {
        self.game_running
    }

    pub fn set_game_running(&mut self, game_running: bool) {
        if self.game_running == game_running {
            return;
        }
        self.game_running = game_running;
        self.emit(DifficultyEvent::GameRunningChanged(game_running));
    }

    // Callbacks

    pub fn on_event(&mut self, listener: impl FnMut(&DifficultyEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Decides whether a level change may end the running game. Called with
    /// the current and the requested level. Without one, changes are allowed.
    pub fn set_confirmation(
        &mut self,
        confirm: impl FnMut(&DifficultyLevel, &DifficultyLevel) -> bool + Send + 'static,
    ) {
        self.confirmation = Some(Box::new(confirm));
    }

    fn emit(&mut self, event: DifficultyEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

impl Drop for Difficulty {
    fn drop(&mut self) {
        self.save();
    }
}

impl std::fmt::Debug for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Difficulty")
            .field("levels", &self.levels)
            .field("current", &self.current)
            .field("editable", &self.editable)
            .field("game_running", &self.game_running)
            .finish()
    }
}
