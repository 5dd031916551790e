//! Mapping from raw provider records to storage rows.

use uuid::Uuid;

use super::{parse_timestamp_or_zero, RawActivityRecord, RawDriver, RawEcoRecord, RawTrailer, RawVehicle};
use crate::models::{DriverEcoMonitorReport, Driver, Trailer, TruckActivityReport, Vehicle};

impl RawDriver {
    pub fn to_driver(&self) -> Driver {
        Driver {
            external_id: self.external_id,
            person_id: self.person_code.clone(),
            name: self.name.clone(),
            language: self.language.clone(),
            inactive: self.inactive,
            last_modified: parse_timestamp_or_zero(&self.modified),
        }
    }
}

impl RawVehicle {
    pub fn to_vehicle(&self) -> Vehicle {
        Vehicle {
            external_id: self.external_id,
            license_plate: self.license_plate.clone(),
            group_name: self.group.clone(),
            inactive: self.inactive,
            last_modified: parse_timestamp_or_zero(&self.modified),
        }
    }
}

impl RawTrailer {
    pub fn to_trailer(&self) -> Trailer {
        Trailer {
            external_id: self.external_id,
            license_plate: self.license_plate.clone(),
            inactive: false,
            last_modified: Default::default(),
        }
    }
}

impl RawActivityRecord {
    pub fn to_report(&self, tour_id: Uuid, vehicle_id: i64) -> TruckActivityReport {
        TruckActivityReport {
            tour_id,
            vehicle_id,
            km_begin: self.km_begin,
            km_end: self.km_end,
            consumption: self.consumption,
            loaded_status: self.loaded_status.clone(),
            activity: self.activity.clone(),
            speed_avg: self.speed_avg,
            longitude: self.longitude,
            latitude: self.latitude,
            address_info: self.address_info.clone(),
            country_code: self.country_code.clone(),
            reference: self.reference.clone(),
            start_time: parse_timestamp_or_zero(&self.begin),
            end_time: parse_timestamp_or_zero(&self.end),
        }
    }
}

impl RawEcoRecord {
    pub fn to_report(&self, tour_id: Uuid, driver_id: i64) -> DriverEcoMonitorReport {
        DriverEcoMonitorReport {
            tour_id,
            driver_id,
            distance: self.distance,
            duration_driving: self.duration_driving,
            fuel_consumption: self.fuel_consumption,
            fuel_consumption_average: self.fuel_consumption_average,
            rpm_average: self.rpm_average,
            emission_average: self.emission_average,
            speed_average: self.speed_average,
            fuel_consumption_idling: self.fuel_consumption_idling,
            duration_idling: self.duration_idling,
            number_idling: self.number_idling,
            duration_over_speeding: self.duration_over_speeding,
            number_over_speeding: self.number_over_speeding,
            distance_coasting: self.distance_coasting,
            duration_coasting: self.duration_coasting,
            number_of_stops: self.number_of_stops,
            number_of_brakes: self.number_of_brakes,
            number_of_panic_brakes: self.number_of_panic_brakes,
            number_of_harsh_accelerations: self.number_of_harsh_accelerations,
            number_of_gear_changes: self.number_of_gear_changes,
            distance_on_cruise_control: self.distance_on_cruise_control,
            duration_on_cruise_control: self.duration_on_cruise_control,
            start_time: parse_timestamp_or_zero(&self.begin),
            end_time: parse_timestamp_or_zero(&self.end),
        }
    }
}
