use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use reqwest::header::CONTENT_TYPE;
use roxmltree::{Document, Node};
use tracing::debug;

use super::{
    FeedError, FeedNotice, FeedResponse, RawActivityRecord, RawDriver, RawEcoRecord, RawTrailer,
    RawVehicle, TelematicsFeed,
};
use crate::models::Window;

const NAMESPACE: &str = "http://transics.org";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Credentials sent inside every request.
#[derive(Debug, Clone)]
pub struct Login {
    pub dispatcher: String,
    pub password: String,
    pub system_nr: String,
    pub integrator: String,
    pub language: String,
}

/// SOAP/XML client of the TX-TANGO web service.
pub struct SoapFeed {
    client: reqwest::Client,
    endpoint: String,
    login: Login,
}

impl SoapFeed {
    pub fn new(endpoint: &str, login: Login, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            login,
        })
    }

    fn login_block(&self) -> String {
        format!(
            "<Login><DateTime>{}</DateTime><Version>1</Version><Dispatcher>{}</Dispatcher>\
             <Password>{}</Password><SystemNr>{}</SystemNr><ApplicationName /><ApplicationVersion />\
             <PcName /><Integrator>{}</Integrator><Language>{}</Language></Login>",
            format_date(Utc::now().naive_utc()),
            escape(&self.login.dispatcher),
            escape(&self.login.password),
            escape(&self.login.system_nr),
            escape(&self.login.integrator),
            escape(&self.login.language),
        )
    }

    fn envelope(&self, operation: &str, selection: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <{op} xmlns="{ns}">{login}{selection}</{op}>
  </soap:Body>
</soap:Envelope>"#,
            op = operation,
            ns = NAMESPACE,
            login = self.login_block(),
            selection = selection,
        )
    }

    async fn call(&self, operation: &str, selection: &str) -> Result<String, FeedError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}/{}\"", NAMESPACE, operation))
            .body(self.envelope(operation, selection))
            .send()
            .await?;

        let status = response.status();
        debug!("{} answered {}", operation, status);
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

fn range_selection(window: &Window) -> String {
    format!(
        "<StartDate>{}</StartDate><EndDate>{}</EndDate>",
        format_date(window.start),
        format_date(window.end)
    )
}

#[async_trait]
impl TelematicsFeed for SoapFeed {
    async fn fetch_drivers(&self) -> Result<FeedResponse<RawDriver>, FeedError> {
        let body = self
            .call(
                "Get_Drivers_V9",
                "<DriverSelection><IncludeContactInfo>false</IncludeContactInfo>\
                 <IncludeGroups>false</IncludeGroups><IncludeInactiveDrivers>true</IncludeInactiveDrivers>\
                 <IncludeLastVehicleInfo>false</IncludeLastVehicleInfo><IncludeLicenseInfo>false</IncludeLicenseInfo>\
                 <IncludeTachoCardInfo>false</IncludeTachoCardInfo><IncludeUpdateDates>true</IncludeUpdateDates>\
                 <IncludeHRInfo>false</IncludeHRInfo></DriverSelection>",
            )
            .await?;
        parse_response(&body, "Get_Drivers_V9Result", "InterfacePersonResult_V9", driver_from)
    }

    async fn fetch_vehicles(&self) -> Result<FeedResponse<RawVehicle>, FeedError> {
        let body = self
            .call(
                "Get_Vehicles_V13",
                "<VehicleSelection><Identifiers /><IncludePosition>false</IncludePosition>\
                 <IncludeActivity>false</IncludeActivity><IncludeDrivers>true</IncludeDrivers>\
                 <IncludeObcInfo>false</IncludeObcInfo><IncludeETAInfo>true</IncludeETAInfo>\
                 <IncludeTemperatureInfo>false</IncludeTemperatureInfo><IncludeInfoFields>false</IncludeInfoFields>\
                 <IncludeUpdateDates>true</IncludeUpdateDates><IncludeInactive>true</IncludeInactive>\
                 <IncludeCompanyCardInfo>false</IncludeCompanyCardInfo><IncludeVehicleProfile>false</IncludeVehicleProfile>\
                 <IncludeNextStopInfo>false</IncludeNextStopInfo><DiagnosticFilter />\
                 <IncludeExtraTruckInfo>false</IncludeExtraTruckInfo><IncludeGroups>true</IncludeGroups>\
                 </VehicleSelection>",
            )
            .await?;
        parse_response(&body, "Get_Vehicles_V13Result", "InterfaceVehicleResult_V13", vehicle_from)
    }

    async fn fetch_activity_report(
        &self,
        vehicle_id: i64,
        window: Window,
    ) -> Result<FeedResponse<RawActivityRecord>, FeedError> {
        let selection = format!(
            "<ActivityReportSelection><Vehicles><IdentifierVehicle>\
             <IdentifierVehicleType>TRANSICS_ID</IdentifierVehicleType><Id>{}</Id>\
             </IdentifierVehicle></Vehicles><DateTimeRangeSelection>\
             <DateTypeSelection>STARTED</DateTypeSelection>{}</DateTimeRangeSelection>\
             </ActivityReportSelection>",
            vehicle_id,
            range_selection(&window)
        );
        let body = self.call("Get_ActivityReport_V11", &selection).await?;
        parse_response(
            &body,
            "Get_ActivityReport_V11Result",
            "ActivityReportItem_V11",
            activity_from,
        )
    }

    async fn fetch_eco_report(
        &self,
        driver_id: i64,
        window: Window,
    ) -> Result<FeedResponse<RawEcoRecord>, FeedError> {
        let selection = format!(
            "<EcoMonitorReportSelection><Drivers><Identifier>\
             <IdentifierType>TRANSICS_ID</IdentifierType><Id>{}</Id>\
             </Identifier></Drivers><DateTimeRangeSelection>{}</DateTimeRangeSelection>\
             <IncludeRecordsWithoutDriver>false</IncludeRecordsWithoutDriver>\
             </EcoMonitorReportSelection>",
            driver_id,
            range_selection(&window)
        );
        let body = self.call("Get_EcoMonitor_Report_V4", &selection).await?;
        parse_response(
            &body,
            "Get_EcoMonitor_Report_V4Result",
            "EcoMonitorReportItem_V3",
            eco_from,
        )
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn parse_response<T>(
    body: &str,
    result_tag: &str,
    item_tag: &str,
    map: fn(&Node) -> T,
) -> Result<FeedResponse<T>, FeedError> {
    let doc = Document::parse(body).map_err(|e| FeedError::Malformed(e.to_string()))?;
    let result = doc
        .descendants()
        .find(|n| is(n, result_tag))
        .ok_or_else(|| FeedError::Malformed(format!("missing {}", result_tag)))?;

    Ok(FeedResponse {
        items: result
            .descendants()
            .filter(|n| is(n, item_tag))
            .map(|n| map(&n))
            .collect(),
        error: notice(&result, &["Errors", "Error"], "ErrorCode"),
        warning: notice(&result, &["Warnings", "Warning"], "WarningCode"),
    })
}

fn notice(result: &Node, path: &[&str], code_tag: &str) -> Option<FeedNotice> {
    let node = find(result, path)?;
    let code = text(&node, &[code_tag]);
    if code.is_empty() {
        return None;
    }
    let explanation = format!("{}Explenation", code_tag);
    let mut message = text(&node, &[explanation.as_str()]);
    if message.is_empty() {
        message = text(&node, &["Value"]);
    }
    Some(FeedNotice { code, message })
}

fn is(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn find<'a, 'input>(node: &Node<'a, 'input>, path: &[&str]) -> Option<Node<'a, 'input>> {
    let mut current = *node;
    for name in path {
        current = current.children().find(|c| is(c, name))?;
    }
    Some(current)
}

fn text(node: &Node, path: &[&str]) -> String {
    find(node, path)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn number<T: FromStr + Default>(node: &Node, path: &[&str]) -> T {
    text(node, path).parse().unwrap_or_default()
}

fn flag(node: &Node, path: &[&str]) -> bool {
    matches!(text(node, path).as_str(), "true" | "1")
}

fn positive_id(node: &Node, path: &[&str]) -> Option<i64> {
    Some(number::<i64>(node, path)).filter(|id| *id > 0)
}

fn driver_from(node: &Node) -> RawDriver {
    RawDriver {
        external_id: number(node, &["PersonTransicsId"]),
        person_code: text(node, &["PersonId"]),
        name: text(node, &["FormattedName"]),
        language: text(node, &["Languages", "WorkingLanguage"]),
        inactive: flag(node, &["Inactive"]),
        modified: text(node, &["UpdateDatesList", "UpdateDatesItem", "DateLastUpdate"]),
    }
}

fn vehicle_from(node: &Node) -> RawVehicle {
    let trailer = positive_id(node, &["Trailer", "TransicsID"]).map(|external_id| RawTrailer {
        external_id,
        license_plate: text(node, &["Trailer", "LicensePlate"]),
    });
    let group = Some(text(
        node,
        &["Groups", "TxConnectGroups", "ConnectGroups", "ConnectGroup", "SubGroup"],
    ))
    .filter(|g| !g.is_empty());

    RawVehicle {
        external_id: number(node, &["VehicleTransicsID"]),
        license_plate: text(node, &["LicensePlate"]),
        inactive: flag(node, &["Inactive"]),
        modified: text(node, &["Modified"]),
        group,
        driver_id: positive_id(node, &["Driver", "TransicsID"]),
        trailer,
        eta_status: text(node, &["ETAInfo", "ETAStatus"]),
        destination_longitude: number(node, &["ETAInfo", "PositionDestination", "Longitude"]),
        destination_latitude: number(node, &["ETAInfo", "PositionDestination", "Latitude"]),
    }
}

fn activity_from(node: &Node) -> RawActivityRecord {
    RawActivityRecord {
        begin: text(node, &["BeginDate"]),
        end: text(node, &["EndDate"]),
        km_begin: number(node, &["KmBegin"]),
        km_end: number(node, &["KmEnd"]),
        consumption: number(node, &["Consumption"]),
        loaded_status: text(node, &["LoadedStatus"]),
        activity: text(node, &["Activity", "Name"]),
        speed_avg: number(node, &["SpeedAvg"]),
        longitude: number(node, &["Position", "Longitude"]),
        latitude: number(node, &["Position", "Latitude"]),
        address_info: text(node, &["Position", "AddressInfo"]),
        country_code: text(node, &["Position", "CountryCode"]),
        reference: text(node, &["Reference"]),
    }
}

fn eco_from(node: &Node) -> RawEcoRecord {
    RawEcoRecord {
        begin: text(node, &["BeginDate"]),
        end: text(node, &["EndDate"]),
        distance: number(node, &["DataResult", "Distance"]),
        duration_driving: number(node, &["DataResult", "DurationDriving"]),
        fuel_consumption: number(node, &["DataResult", "FuelConsumption"]),
        fuel_consumption_average: number(node, &["DataResult", "FuelConsumptionAverage"]),
        rpm_average: number(node, &["DataResult", "RpmAverage"]),
        emission_average: number(node, &["DataResult", "Co2EmissionAverage"]),
        speed_average: number(node, &["DataResult", "SpeedAverage"]),
        fuel_consumption_idling: number(node, &["IdlingResult", "FuelConsumptionIdling"]),
        duration_idling: number(node, &["IdlingResult", "DurationIdling"]),
        number_idling: number(node, &["IdlingResult", "NumberOfLongIdling"]),
        duration_over_speeding: number(node, &["OverSpeedingResult", "DurationOverSpeeding"]),
        number_over_speeding: number(node, &["OverSpeedingResult", "NumberOfOverSpeeding"]),
        distance_coasting: number(node, &["CoastingResult", "DistanceCoasting"]),
        duration_coasting: number(node, &["CoastingResult", "DurationCoasting"]),
        number_of_stops: number(node, &["AnticipationResult", "NumberOfStops"]),
        number_of_brakes: number(node, &["AnticipationResult", "NumberOfBrakes"]),
        number_of_panic_brakes: number(node, &["AnticipationResult", "NumberOfPanicBrakes"]),
        number_of_harsh_accelerations: number(
            node,
            &["AnticipationResult", "NumberOfHarshAccelerations"],
        ),
        number_of_gear_changes: number(node, &["GearingResult", "NumberOfGearChanges"]),
        distance_on_cruise_control: number(node, &["CruisingResult", "DistanceOnCruiseControl"]),
        duration_on_cruise_control: number(node, &["CruisingResult", "DurationOnCruiseControl"]),
    }
}

fn format_date(at: NaiveDateTime) -> String {
    at.format(DATE_FORMAT).to_string()
}
