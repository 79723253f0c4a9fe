/// Tests for Difficulty error handling

use std::sync::Arc;

use kgame_shared::{Difficulty, DifficultyError, DifficultyLevel, MemorySettings, StandardLevel};

#[test]
fn test_select_unknown_level_keeps_current() {
    let mut difficulty = Difficulty::new(Arc::new(MemorySettings::new()));
    difficulty
        .add_standard_level_range(StandardLevel::VeryEasy, StandardLevel::Medium)
        .unwrap();

    let err = difficulty.select("Impossible").unwrap_err();
    assert_eq!(err.to_string(), "No difficulty level Impossible");
    assert_eq!(difficulty.current_level().unwrap().key(), "Very Easy");
}

#[test]
fn test_select_without_levels_fails() {
    let mut difficulty = Difficulty::new(Arc::new(MemorySettings::new()));
    assert_eq!(
        difficulty.select("Easy"),
        Err(DifficultyError::UnknownLevel {
            key: "Easy".to_string()
        })
    );
    assert_eq!(difficulty.current_level().err(), Some(DifficultyError::NoLevels));
}

#[test]
fn test_levels_frozen_after_first_use() {
    let mut difficulty = Difficulty::new(Arc::new(MemorySettings::new()));
    difficulty
        .add_level(DifficultyLevel::custom(1, "one", "One"))
        .unwrap();
    difficulty.current_level().unwrap();

    let err = difficulty
        .add_level(DifficultyLevel::custom(2, "two", "Two"))
        .unwrap_err();
    assert_eq!(err, DifficultyError::LevelsFrozen);
    assert_eq!(difficulty.levels().len(), 1);
}
