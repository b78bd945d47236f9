use std::iter::Sum;
use std::ops::{Add, AddAssign};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

mod resolver;

pub use resolver::{normalize_label, FoodMatch, MatchKind};

/// Calories, protein, carbs and fat. Used both for a single serving of a
/// reference food and for any sum of logged items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl MacroTotals {
    pub const ZERO: MacroTotals = MacroTotals {
        calories: 0.0,
        protein_g: 0.0,
        carbs_g: 0.0,
        fat_g: 0.0,
    };

    pub fn scaled(self, servings: u32) -> Self {
        let k = f64::from(servings);
        Self {
            calories: self.calories * k,
            protein_g: self.protein_g * k,
            carbs_g: self.carbs_g * k,
            fat_g: self.fat_g * k,
        }
    }
}

impl Add for MacroTotals {
    type Output = MacroTotals;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for MacroTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.calories += rhs.calories;
        self.protein_g += rhs.protein_g;
        self.carbs_g += rhs.carbs_g;
        self.fat_g += rhs.fat_g;
    }
}

impl Sum for MacroTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(MacroTotals::ZERO, Add::add)
    }
}

/// One reference food, per serving of `serving_unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub key: String,
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub serving_unit: String,
}

impl NutritionRecord {
    pub fn macros(&self) -> MacroTotals {
        MacroTotals {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
        }
    }
}

// key, name, kcal, protein, carbs, fat, serving
const BUILTIN: &[(&str, &str, f64, f64, f64, f64, &str)] = &[
    ("apple", "Apple", 95.0, 0.5, 25.0, 0.3, "1 medium"),
    ("banana", "Banana", 105.0, 1.3, 27.0, 0.4, "1 medium"),
    ("orange", "Orange", 62.0, 1.2, 15.4, 0.2, "1 medium"),
    ("chicken breast", "Chicken Breast", 165.0, 31.0, 0.0, 3.6, "100 g"),
    ("salmon", "Salmon", 208.0, 20.0, 0.0, 13.0, "100 g"),
    ("egg", "Egg", 78.0, 6.3, 0.6, 5.3, "1 large"),
    ("white rice", "White Rice", 205.0, 4.3, 45.0, 0.4, "1 cup cooked"),
    ("broccoli", "Broccoli", 55.0, 3.7, 11.0, 0.6, "1 cup"),
    ("whole wheat bread", "Whole Wheat Bread", 81.0, 4.0, 13.8, 1.1, "1 slice"),
    ("pasta", "Pasta", 221.0, 8.1, 43.0, 1.3, "1 cup cooked"),
    ("avocado", "Avocado", 240.0, 3.0, 12.8, 22.0, "1 whole"),
    ("greek yogurt", "Greek Yogurt", 100.0, 17.0, 6.0, 0.7, "170 g"),
];

lazy_static! {
    static ref REFERENCE_TABLE: NutritionTable = NutritionTable::builtin();
}

/// The process-wide reference table, built on first use.
pub fn reference_table() -> &'static NutritionTable {
    &REFERENCE_TABLE
}

/// Ordered reference foods.
///
/// Definition order matters: the substring passes of [`NutritionTable::resolve`]
/// return the first record in this order, so reordering entries changes
/// which food an ambiguous label resolves to.
#[derive(Debug, Clone)]
pub struct NutritionTable {
    records: Vec<NutritionRecord>,
}

impl NutritionTable {
    pub fn builtin() -> Self {
        let records = BUILTIN
            .iter()
            .map(
                |&(key, name, calories, protein_g, carbs_g, fat_g, serving_unit)| NutritionRecord {
                    key: key.to_string(),
                    name: name.to_string(),
                    calories,
                    protein_g,
                    carbs_g,
                    fat_g,
                    serving_unit: serving_unit.to_string(),
                },
            )
            .collect();
        Self { records }
    }

    pub fn from_records(records: Vec<NutritionRecord>) -> Self {
        Self { records }
    }

    /// Exact lookup by canonical key.
    pub fn get(&self, key: &str) -> Option<&NutritionRecord> {
        self.records.iter().find(|r| r.key == key)
    }

    pub fn records(&self) -> impl Iterator<Item = &NutritionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
