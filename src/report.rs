//! Read path over reconciled tours, feeding the per-driver reports.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{Store, StoreResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverReport {
    pub driver_id: i64,
    pub name: String,
    pub person_code: String,
    pub license_plates: Vec<String>,
    pub tours: usize,
    pub driven_km: f64,
    pub panic_brakes: i64,
    pub fuel_consumption: f64,
    pub cruise_control_ratio: f64,
    pub coasting_ratio: f64,
    pub countries: Vec<String>,
}

#[derive(Default)]
struct Totals {
    tours: usize,
    vehicles: BTreeSet<i64>,
    distance: f64,
    panic_brakes: i64,
    fuel: f64,
    cruise_distance: f64,
    coasting_distance: f64,
    countries: BTreeSet<String>,
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}

/// One report per driver with closed tours inside `[from, to]`. An empty
/// `drivers` list selects every driver.
pub async fn driver_reports(
    store: &dyn Store,
    from: NaiveDateTime,
    to: NaiveDateTime,
    drivers: &[i64],
) -> StoreResult<Vec<DriverReport>> {
    let tours = store.closed_tours_between(from, to, drivers).await?;

    let mut totals: BTreeMap<i64, Totals> = BTreeMap::new();
    let mut driver_of: HashMap<Uuid, i64> = HashMap::new();
    for tour in &tours {
        let Some(driver_id) = tour.driver_id else {
            continue;
        };
        let t = totals.entry(driver_id).or_default();
        t.tours += 1;
        t.vehicles.insert(tour.vehicle_id);
        driver_of.insert(tour.tour_id, driver_id);
    }
    if totals.is_empty() {
        return Ok(Vec::new());
    }

    let tour_ids: Vec<Uuid> = driver_of.keys().copied().collect();
    for eco in store.eco_reports_for(&tour_ids).await? {
        let Some(t) = driver_of.get(&eco.tour_id).and_then(|d| totals.get_mut(d)) else {
            continue;
        };
        t.panic_brakes += i64::from(eco.number_of_panic_brakes);
        t.fuel += eco.fuel_consumption;
        if eco.distance > 0.0 {
            t.distance += eco.distance;
            t.cruise_distance += eco.distance_on_cruise_control;
            t.coasting_distance += eco.distance_coasting;
        }
    }
    for activity in store.activity_reports_for(&tour_ids).await? {
        if activity.country_code.is_empty() {
            continue;
        }
        if let Some(t) = driver_of.get(&activity.tour_id).and_then(|d| totals.get_mut(d)) {
            t.countries.insert(activity.country_code);
        }
    }

    let driver_ids: Vec<i64> = totals.keys().copied().collect();
    let names: HashMap<i64, _> = store
        .drivers_by_ids(&driver_ids)
        .await?
        .into_iter()
        .map(|d| (d.external_id, d))
        .collect();
    let vehicle_ids: Vec<i64> = totals
        .values()
        .flat_map(|t| t.vehicles.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let plates: HashMap<i64, String> = store
        .vehicles_by_ids(&vehicle_ids)
        .await?
        .into_iter()
        .map(|v| (v.external_id, v.license_plate))
        .collect();

    Ok(totals
        .into_iter()
        .map(|(driver_id, t)| {
            let driver = names.get(&driver_id);
            DriverReport {
                driver_id,
                name: driver.map(|d| d.name.clone()).unwrap_or_default(),
                person_code: driver.map(|d| d.person_id.clone()).unwrap_or_default(),
                license_plates: t
                    .vehicles
                    .iter()
                    .filter_map(|v| plates.get(v).cloned())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                tours: t.tours,
                driven_km: t.distance.floor(),
                panic_brakes: t.panic_brakes,
                fuel_consumption: t.fuel,
                cruise_control_ratio: ratio(t.cruise_distance, t.distance),
                coasting_ratio: ratio(t.coasting_distance, t.distance),
                countries: t.countries.into_iter().collect(),
            }
        })
        .collect())
}
