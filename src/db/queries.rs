pub const SELECT_DRIVER_LAST_MODIFIED: &str = r#"
SELECT last_modified FROM drivers WHERE external_id = $1;
"#;

pub const SELECT_VEHICLE_LAST_MODIFIED: &str = r#"
SELECT last_modified FROM vehicles WHERE external_id = $1;
"#;

pub const SELECT_TRAILER_LAST_MODIFIED: &str = r#"
SELECT last_modified FROM trailers WHERE external_id = $1;
"#;

pub const INSERT_DRIVER: &str = r#"
INSERT INTO drivers (external_id, person_id, name, language, inactive, last_modified)
VALUES ($1, $2, $3, $4, $5, $6);
"#;

pub const UPDATE_DRIVER: &str = r#"
UPDATE drivers
SET person_id = $2,
    name = $3,
    language = $4,
    inactive = $5,
    last_modified = $6
WHERE external_id = $1;
"#;

pub const INSERT_VEHICLE: &str = r#"
INSERT INTO vehicles (external_id, license_plate, group_name, inactive, last_modified)
VALUES ($1, $2, $3, $4, $5);
"#;

pub const UPDATE_VEHICLE: &str = r#"
UPDATE vehicles
SET license_plate = $2,
    group_name = $3,
    inactive = $4,
    last_modified = $5
WHERE external_id = $1;
"#;

pub const INSERT_TRAILER: &str = r#"
INSERT INTO trailers (external_id, license_plate, inactive, last_modified)
VALUES ($1, $2, $3, $4);
"#;

pub const UPDATE_TRAILER: &str = r#"
UPDATE trailers
SET license_plate = $2,
    inactive = $3,
    last_modified = $4
WHERE external_id = $1;
"#;

const TOUR_COLUMNS: &str = "tour_id, vehicle_id, driver_id, trailer_id, destination_longitude, destination_latitude, status, start_time, end_time, last_import, updated_at";

pub fn select_tours(filter: &str) -> String {
    format!("SELECT {} FROM tours {}", TOUR_COLUMNS, filter)
}

pub const WHERE_OPEN_TOUR: &str = "WHERE vehicle_id = $1 AND end_time IS NULL LIMIT 1";

pub const WHERE_TOUR_ID: &str = "WHERE tour_id = $1";

pub const WHERE_TOUR_DUE: &str =
    "WHERE end_time IS NULL OR end_time >= $1 ORDER BY start_time ASC, tour_id ASC";

pub const ORDER_ALL_TOURS: &str = "ORDER BY start_time ASC, tour_id ASC";

pub const WHERE_CLOSED_BETWEEN: &str = "WHERE start_time >= $1 AND end_time IS NOT NULL AND end_time <= $2 ORDER BY driver_id ASC, start_time ASC";

pub const WHERE_CLOSED_BETWEEN_FOR_DRIVERS: &str = "WHERE start_time >= $1 AND end_time IS NOT NULL AND end_time <= $2 AND driver_id = ANY($3) ORDER BY driver_id ASC, start_time ASC";

pub const COUNT_TOURS_FOR_VEHICLE: &str = r#"
SELECT COUNT(*) FROM tours WHERE vehicle_id = $1;
"#;

pub const CLOSE_TOUR: &str = r#"
UPDATE tours
SET end_time = $2,
    updated_at = $2
WHERE tour_id = $1 AND end_time IS NULL;
"#;

pub const INSERT_TOUR: &str = r#"
INSERT INTO tours (
    tour_id, vehicle_id, driver_id, trailer_id,
    destination_longitude, destination_latitude, status,
    start_time, end_time, last_import, updated_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11);
"#;

pub const UPDATE_TOUR_STATUS: &str = r#"
UPDATE tours
SET status = $2,
    updated_at = $3
WHERE tour_id = $1;
"#;

pub const UPDATE_TOUR_LAST_IMPORT: &str = r#"
UPDATE tours SET last_import = $2 WHERE tour_id = $1;
"#;

// (xmax = 0) only holds for a row created by this statement
pub const UPSERT_ACTIVITY_REPORT: &str = r#"
INSERT INTO truck_activity_reports (
    tour_id, vehicle_id, km_begin, km_end, consumption, loaded_status, activity,
    speed_avg, longitude, latitude, address_info, country_code, reference,
    start_time, end_time
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
ON CONFLICT (tour_id, start_time) DO UPDATE
SET vehicle_id = EXCLUDED.vehicle_id,
    km_begin = EXCLUDED.km_begin,
    km_end = EXCLUDED.km_end,
    consumption = EXCLUDED.consumption,
    loaded_status = EXCLUDED.loaded_status,
    activity = EXCLUDED.activity,
    speed_avg = EXCLUDED.speed_avg,
    longitude = EXCLUDED.longitude,
    latitude = EXCLUDED.latitude,
    address_info = EXCLUDED.address_info,
    country_code = EXCLUDED.country_code,
    reference = EXCLUDED.reference,
    end_time = EXCLUDED.end_time
RETURNING (xmax = 0) AS inserted;
"#;

pub const UPSERT_ECO_REPORT: &str = r#"
INSERT INTO driver_eco_monitor_reports (
    tour_id, driver_id, distance, duration_driving, fuel_consumption,
    fuel_consumption_average, rpm_average, emission_average, speed_average,
    fuel_consumption_idling, duration_idling, number_idling,
    duration_over_speeding, number_over_speeding, distance_coasting,
    duration_coasting, number_of_stops, number_of_brakes, number_of_panic_brakes,
    number_of_harsh_accelerations, number_of_gear_changes,
    distance_on_cruise_control, duration_on_cruise_control, start_time, end_time
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
)
ON CONFLICT (tour_id, start_time) DO UPDATE
SET driver_id = EXCLUDED.driver_id,
    distance = EXCLUDED.distance,
    duration_driving = EXCLUDED.duration_driving,
    fuel_consumption = EXCLUDED.fuel_consumption,
    fuel_consumption_average = EXCLUDED.fuel_consumption_average,
    rpm_average = EXCLUDED.rpm_average,
    emission_average = EXCLUDED.emission_average,
    speed_average = EXCLUDED.speed_average,
    fuel_consumption_idling = EXCLUDED.fuel_consumption_idling,
    duration_idling = EXCLUDED.duration_idling,
    number_idling = EXCLUDED.number_idling,
    duration_over_speeding = EXCLUDED.duration_over_speeding,
    number_over_speeding = EXCLUDED.number_over_speeding,
    distance_coasting = EXCLUDED.distance_coasting,
    duration_coasting = EXCLUDED.duration_coasting,
    number_of_stops = EXCLUDED.number_of_stops,
    number_of_brakes = EXCLUDED.number_of_brakes,
    number_of_panic_brakes = EXCLUDED.number_of_panic_brakes,
    number_of_harsh_accelerations = EXCLUDED.number_of_harsh_accelerations,
    number_of_gear_changes = EXCLUDED.number_of_gear_changes,
    distance_on_cruise_control = EXCLUDED.distance_on_cruise_control,
    duration_on_cruise_control = EXCLUDED.duration_on_cruise_control,
    end_time = EXCLUDED.end_time
RETURNING (xmax = 0) AS inserted;
"#;

pub const SELECT_ACTIVITY_REPORTS_FOR_TOURS: &str = r#"
SELECT tour_id, vehicle_id, km_begin, km_end, consumption, loaded_status, activity,
       speed_avg, longitude, latitude, address_info, country_code, reference,
       start_time, end_time
FROM truck_activity_reports
WHERE tour_id = ANY($1)
ORDER BY tour_id, start_time;
"#;

pub const SELECT_ECO_REPORTS_FOR_TOURS: &str = r#"
SELECT tour_id, driver_id, distance, duration_driving, fuel_consumption,
       fuel_consumption_average, rpm_average, emission_average, speed_average,
       fuel_consumption_idling, duration_idling, number_idling,
       duration_over_speeding, number_over_speeding, distance_coasting,
       duration_coasting, number_of_stops, number_of_brakes, number_of_panic_brakes,
       number_of_harsh_accelerations, number_of_gear_changes,
       distance_on_cruise_control, duration_on_cruise_control, start_time, end_time
FROM driver_eco_monitor_reports
WHERE tour_id = ANY($1)
ORDER BY tour_id, start_time;
"#;

pub const SELECT_DRIVERS_BY_IDS: &str = r#"
SELECT external_id, person_id, name, language, inactive, last_modified
FROM drivers
WHERE external_id = ANY($1)
ORDER BY external_id;
"#;

pub const SELECT_VEHICLES_BY_IDS: &str = r#"
SELECT external_id, license_plate, group_name, inactive, last_modified
FROM vehicles
WHERE external_id = ANY($1)
ORDER BY external_id;
"#;

pub const SELECT_RETRY_ENTRY: &str = r#"
SELECT id, tour_id, report_kind, import_from, import_to, reason, trial
FROM retry_queue_entries
WHERE tour_id = $1 AND report_kind = $2;
"#;

pub const INSERT_RETRY_ENTRY: &str = r#"
INSERT INTO retry_queue_entries (tour_id, report_kind, import_from, import_to, reason, trial)
VALUES ($1, $2, $3, $4, $5, 0)
ON CONFLICT (tour_id, report_kind) DO UPDATE
SET trial = retry_queue_entries.trial + 1,
    import_from = LEAST(retry_queue_entries.import_from, EXCLUDED.import_from),
    import_to = GREATEST(retry_queue_entries.import_to, EXCLUDED.import_to),
    reason = EXCLUDED.reason;
"#;

pub const BUMP_RETRY_ENTRY: &str = r#"
UPDATE retry_queue_entries
SET trial = trial + 1,
    import_from = LEAST(import_from, $2),
    import_to = GREATEST(import_to, $3),
    reason = $4
WHERE id = $1;
"#;

pub const SELECT_RETRY_ENTRIES_BEFORE: &str = r#"
SELECT id, tour_id, report_kind, import_from, import_to, reason, trial
FROM retry_queue_entries
WHERE import_from < $1
ORDER BY import_from ASC, id ASC;
"#;

pub const DELETE_RETRY_ENTRY: &str = r#"
DELETE FROM retry_queue_entries WHERE id = $1;
"#;
