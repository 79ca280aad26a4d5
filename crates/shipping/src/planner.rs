//! Greedy first-fit parcel planning.
//!
//! Units are packed heaviest first. Each unit goes into the first open
//! parcel that stays within the weight ceiling and whose bounding box stays
//! within the size ceilings; otherwise a new parcel is opened. The result
//! depends only on the input order and the limits.

use common::{Dimensions, ItemId};
use serde::Serialize;

use crate::profile::{ParcelLimits, within};

/// A cart line as seen by the planner.
#[derive(Debug, Clone, PartialEq)]
pub struct PackingLine {
    pub item_id: ItemId,
    pub weight_kg: f64,
    pub dimensions: Dimensions,
    pub quantity: u32,
}

impl PackingLine {
    pub fn new(
        item_id: impl Into<ItemId>,
        weight_kg: f64,
        dimensions: Dimensions,
        quantity: u32,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            weight_kg,
            dimensions,
            quantity,
        }
    }
}

/// Outer box of a parcel.
///
/// Units are laid flat with their sides sorted longest first and stacked
/// along their shortest side: length and width are the maxima of the two
/// longer sides, height is the sum of the shortest ones.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BoundingBox {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

impl BoundingBox {
    fn of(dimensions: &Dimensions) -> Self {
        let [long, mid, short] = dimensions.sorted_sides();
        Self {
            length_cm: long,
            width_cm: mid,
            height_cm: short,
        }
    }

    /// The box after stacking a unit of `dimensions` on top.
    fn stacked_with(&self, dimensions: &Dimensions) -> Self {
        let [long, mid, short] = dimensions.sorted_sides();
        Self {
            length_cm: self.length_cm.max(long),
            width_cm: self.width_cm.max(mid),
            height_cm: self.height_cm + short,
        }
    }

    pub fn longest_side(&self) -> f64 {
        self.length_cm.max(self.width_cm).max(self.height_cm)
    }

    pub fn sum_of_sides(&self) -> f64 {
        self.length_cm + self.width_cm + self.height_cm
    }

    fn fits(&self, limits: &ParcelLimits) -> bool {
        within(self.longest_side(), limits.max_side_cm)
            && within(self.sum_of_sides(), limits.max_sum_of_sides_cm)
    }
}

/// Units of one item inside a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelContent {
    pub item_id: ItemId,
    pub quantity: u32,
}

/// One physical package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parcel {
    pub weight_kg: f64,
    pub bounding_box: BoundingBox,
    /// Items in the order their first unit was placed.
    pub contents: Vec<ParcelContent>,
}

impl Parcel {
    fn open(item_id: &ItemId, weight_kg: f64, dimensions: &Dimensions) -> Self {
        Self {
            weight_kg,
            bounding_box: BoundingBox::of(dimensions),
            contents: vec![ParcelContent {
                item_id: item_id.clone(),
                quantity: 1,
            }],
        }
    }

    fn try_add(
        &mut self,
        item_id: &ItemId,
        weight_kg: f64,
        dimensions: &Dimensions,
        limits: &ParcelLimits,
    ) -> bool {
        let weight = self.weight_kg + weight_kg;
        let bounding_box = self.bounding_box.stacked_with(dimensions);
        if !within(weight, limits.max_weight_kg) || !bounding_box.fits(limits) {
            return false;
        }

        self.weight_kg = weight;
        self.bounding_box = bounding_box;
        match self.contents.iter_mut().find(|c| &c.item_id == item_id) {
            Some(content) => content.quantity += 1,
            None => self.contents.push(ParcelContent {
                item_id: item_id.clone(),
                quantity: 1,
            }),
        }
        true
    }

    /// Number of units in the parcel.
    pub fn unit_count(&self) -> u32 {
        self.contents.iter().map(|c| c.quantity).sum()
    }
}

/// Parcels for one carrier format, in the order they were opened.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParcelPlan {
    pub parcels: Vec<Parcel>,
}

impl ParcelPlan {
    pub fn parcel_count(&self) -> usize {
        self.parcels.len()
    }

    pub fn total_weight_kg(&self) -> f64 {
        self.parcels.iter().map(|p| p.weight_kg).sum()
    }
}

/// Why a single unit can never be packed under some limits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfeasibleReason {
    TooHeavy { weight_kg: f64, max_weight_kg: f64 },
    TooLarge { longest_side_cm: f64, sum_of_sides_cm: f64 },
}

/// A unit that alone exceeds the limits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Infeasible {
    pub item_id: ItemId,
    pub reason: InfeasibleReason,
}

/// Packs `lines` into parcels satisfying `limits`.
pub fn plan(lines: &[PackingLine], limits: &ParcelLimits) -> Result<ParcelPlan, Infeasible> {
    let mut units: Vec<&PackingLine> = lines
        .iter()
        .flat_map(|line| std::iter::repeat_n(line, line.quantity as usize))
        .collect();
    // Stable: equal weights keep their declared order.
    units.sort_by(|a, b| b.weight_kg.total_cmp(&a.weight_kg));

    let mut parcels: Vec<Parcel> = Vec::new();
    for unit in units {
        check_unit(unit, limits)?;

        let placed = parcels
            .iter_mut()
            .any(|parcel| parcel.try_add(&unit.item_id, unit.weight_kg, &unit.dimensions, limits));
        if !placed {
            parcels.push(Parcel::open(&unit.item_id, unit.weight_kg, &unit.dimensions));
        }
    }

    Ok(ParcelPlan { parcels })
}

fn check_unit(unit: &PackingLine, limits: &ParcelLimits) -> Result<(), Infeasible> {
    if !within(unit.weight_kg, limits.max_weight_kg) {
        return Err(Infeasible {
            item_id: unit.item_id.clone(),
            reason: InfeasibleReason::TooHeavy {
                weight_kg: unit.weight_kg,
                max_weight_kg: limits.max_weight_kg,
            },
        });
    }
    if !BoundingBox::of(&unit.dimensions).fits(limits) {
        return Err(Infeasible {
            item_id: unit.item_id.clone(),
            reason: InfeasibleReason::TooLarge {
                longest_side_cm: unit.dimensions.longest_side(),
                sum_of_sides_cm: unit.dimensions.sum_of_sides(),
            },
        });
    }
    Ok(())
}
