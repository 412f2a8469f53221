//! Dishes and the menu customers order from.

use crate::fixed::{Fixed64, Seconds};
use crate::id::DishId;
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};

/// Errors raised while building dishes or menus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MenuError {
    #[error("dish '{name}' has non-positive prep time {prep_time}")]
    NonPositivePrepTime { name: String, prep_time: Fixed64 },
    #[error("dish '{name}' has difficulty {difficulty}, expected 1..=5")]
    InvalidDifficulty { name: String, difficulty: u8 },
    #[error("a menu needs at least one dish")]
    Empty,
}

/// A dish that can be ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    /// Whole currency units.
    pub price: u32,
    /// 1 (trivial) to 5 (hardest).
    pub difficulty: u8,
    /// Seconds of kitchen work to go from 0 to 100 progress. Always > 0.
    prep_time: Seconds,
}

impl Dish {
    /// Build a dish, rejecting a non-positive prep time or an out-of-range
    /// difficulty.
    pub fn new(
        name: impl Into<String>,
        price: u32,
        difficulty: u8,
        prep_time: Seconds,
    ) -> Result<Self, MenuError> {
        let dish = Self {
            name: name.into(),
            price,
            difficulty,
            prep_time,
        };
        dish.validate()?;
        Ok(dish)
    }

    /// Re-check the invariants of [`Dish::new`], e.g. on a decoded dish.
    pub fn validate(&self) -> Result<(), MenuError> {
        if self.prep_time <= Fixed64::ZERO {
            return Err(MenuError::NonPositivePrepTime {
                name: self.name.clone(),
                prep_time: self.prep_time,
            });
        }
        if !(1..=5).contains(&self.difficulty) {
            return Err(MenuError::InvalidDifficulty {
                name: self.name.clone(),
                difficulty: self.difficulty,
            });
        }
        Ok(())
    }

    pub fn prep_time(&self) -> Seconds {
        self.prep_time
    }
}

/// The fixed list of dishes served during a phase. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    dishes: Vec<Dish>,
}

impl Menu {
    pub fn new(dishes: Vec<Dish>) -> Result<Self, MenuError> {
        let menu = Self { dishes };
        menu.validate()?;
        Ok(menu)
    }

    pub fn validate(&self) -> Result<(), MenuError> {
        if self.dishes.is_empty() {
            return Err(MenuError::Empty);
        }
        self.dishes.iter().try_for_each(Dish::validate)
    }

    pub fn dishes(&self) -> &[Dish] {
        &self.dishes
    }

    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }

    pub fn get(&self, id: DishId) -> Option<&Dish> {
        self.dishes.get(id.0 as usize)
    }

    /// Choose a dish uniformly at random.
    pub fn choose(&self, rng: &mut SimRng) -> (DishId, &Dish) {
        let i = rng.index(self.dishes.len());
        (DishId(i as u32), &self.dishes[i])
    }
}

impl Default for Menu {
    /// The house menu.
    fn default() -> Self {
        let dish = |name: &str, difficulty, price, prep: u32| Dish {
            name: name.to_string(),
            price,
            difficulty,
            prep_time: Fixed64::from_num(prep),
        };
        Self {
            dishes: vec![
                dish("Simple Burger", 1, 10, 4),
                dish("Vegetable Soup", 2, 15, 6),
                dish("Tropical Salad", 1, 8, 3),
                dish("Grilled Steak", 3, 20, 7),
                dish("Gourmet Pizza", 4, 25, 10),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_prep_time_rejected() {
        let err = Dish::new("Air", 1, 1, Fixed64::ZERO).unwrap_err();
        assert!(matches!(err, MenuError::NonPositivePrepTime { .. }));
    }

    #[test]
    fn negative_prep_time_rejected() {
        let err = Dish::new("Time Travel", 1, 1, Fixed64::from_num(-2)).unwrap_err();
        assert!(matches!(err, MenuError::NonPositivePrepTime { .. }));
    }

    #[test]
    fn difficulty_out_of_range_rejected() {
        let err = Dish::new("Souffle", 30, 6, Fixed64::from_num(12)).unwrap_err();
        assert_eq!(
            err,
            MenuError::InvalidDifficulty {
                name: "Souffle".into(),
                difficulty: 6
            }
        );
    }

    #[test]
    fn validate_rechecks_a_dish_built_in_place() {
        let dish = Dish {
            name: "Air".into(),
            price: 1,
            difficulty: 1,
            prep_time: Fixed64::ZERO,
        };
        assert!(matches!(
            dish.validate(),
            Err(MenuError::NonPositivePrepTime { .. })
        ));
        let menu = Menu { dishes: vec![dish] };
        assert!(matches!(
            menu.validate(),
            Err(MenuError::NonPositivePrepTime { .. })
        ));
        Menu::default().validate().unwrap();
    }

    #[test]
    fn empty_menu_rejected() {
        assert_eq!(Menu::new(vec![]).unwrap_err(), MenuError::Empty);
    }

    #[test]
    fn default_menu_has_five_dishes() {
        let menu = Menu::default();
        assert_eq!(menu.len(), 5);
        assert_eq!(menu.get(DishId(0)).unwrap().price, 10);
        assert_eq!(menu.get(DishId(4)).unwrap().prep_time(), Fixed64::from_num(10));
        assert!(menu.get(DishId(5)).is_none());
    }

    #[test]
    fn choose_covers_every_dish() {
        let menu = Menu::default();
        let mut rng = SimRng::new(5);
        let mut seen = [false; 5];
        for _ in 0..500 {
            let (id, dish) = menu.choose(&mut rng);
            assert_eq!(menu.get(id), Some(dish));
            seen[id.0 as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
