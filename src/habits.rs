// src/habits.rs
//! Daily habits and their completion state

use crate::{
    error::{Result, TrackerError},
    store::{get_json, keys, set_json, KeyValueStore},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: u64,
    pub name: String,
    pub completed: bool,
    pub streak: u32,
}

/// What the daily reset needs from the habit list.
pub trait HabitsCollaborator {
    fn list_habits(&self) -> Result<Vec<Habit>>;
    fn set_all_incomplete(&self, habits: &[Habit]) -> Result<()>;
}

/// Habit list persisted as JSON in a key-value store.
#[derive(Debug, Clone)]
pub struct HabitBook<S> {
    store: S,
}

impl<S: KeyValueStore> HabitBook<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Habit>> {
        Ok(get_json(&self.store, keys::HABITS)?.unwrap_or_default())
    }

    fn save(&self, habits: &[Habit]) -> Result<()> {
        set_json(&self.store, keys::HABITS, habits)
    }

    /// Add a habit; ids are one past the current maximum.
    pub fn add(&self, name: &str) -> Result<Habit> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::Other("Habit name is required".to_string()));
        }

        let mut habits = self.list()?;
        let habit = Habit {
            id: habits.iter().map(|h| h.id).max().unwrap_or(0) + 1,
            name: name.to_string(),
            completed: false,
            streak: 0,
        };
        habits.push(habit.clone());
        self.save(&habits)?;
        Ok(habit)
    }

    /// Flip completion. Completing extends the streak; un-completing
    /// leaves it alone.
    pub fn toggle(&self, habit_id: u64) -> Result<Habit> {
        let mut habits = self.list()?;
        let habit = habits
            .iter_mut()
            .find(|h| h.id == habit_id)
            .ok_or_else(|| TrackerError::Other(format!("Habit {} not found", habit_id)))?;

        if !habit.completed {
            habit.streak += 1;
        }
        habit.completed = !habit.completed;
        let updated = habit.clone();

        self.save(&habits)?;
        Ok(updated)
    }

    pub fn delete(&self, habit_id: u64) -> Result<bool> {
        let mut habits = self.list()?;
        let before = habits.len();
        habits.retain(|h| h.id != habit_id);
        if habits.len() == before {
            return Ok(false);
        }
        self.save(&habits)?;
        Ok(true)
    }

    pub fn stats(&self) -> Result<HabitStats> {
        Ok(HabitStats::from_habits(&self.list()?))
    }
}

impl<S: KeyValueStore> HabitsCollaborator for HabitBook<S> {
    fn list_habits(&self) -> Result<Vec<Habit>> {
        self.list()
    }

    fn set_all_incomplete(&self, habits: &[Habit]) -> Result<()> {
        let reset: Vec<Habit> = habits
            .iter()
            .map(|h| Habit { completed: false, ..h.clone() })
            .collect();
        self.save(&reset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStats {
    pub total: usize,
    pub completed: usize,
    pub completion_percent: f64,
    pub longest_streak: u32,
}

impl HabitStats {
    pub fn from_habits(habits: &[Habit]) -> Self {
        let total = habits.len();
        let completed = habits.iter().filter(|h| h.completed).count();
        let completion_percent = if total > 0 {
            completed as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total,
            completed,
            completion_percent,
            longest_streak: habits.iter().map(|h| h.streak).max().unwrap_or(0),
        }
    }
}
