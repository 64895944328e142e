//! Typed session log entities
//!
//! These structures are the validated form of an RGS session log. They are
//! only ever built by the validator and are not mutated afterwards. Float
//! fields are `Option<f64>`: `None` is the absent marker, which is also what a
//! NaN in the input becomes.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Node;

// ============================================================================
// Log file description
// ============================================================================

/// One label/data pair in a display legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendItem {
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "Data")]
    pub data: String,
}

/// One protocol value mapping entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingItem {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Desc")]
    pub description: String,
    #[serde(rename = "Mapping")]
    pub mapping: String,
}

/// Grouped mapping entries with a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolLegendData {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "ProtocolMapping")]
    pub mappings: Vec<MappingItem>,
}

/// A named custom legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProtocolLegend {
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "Data")]
    pub data: ProtocolLegendData,
}

/// Top-level description block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFileDescription {
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Legend")]
    pub legend: Vec<LegendItem>,
    #[serde(rename = "CustomProtocolLegend")]
    pub custom_legend: Vec<CustomProtocolLegend>,
}

// ============================================================================
// Header
// ============================================================================

/// Versioning metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RgsVersion {
    pub rgs_version: String,
    pub rgs_mode: String,
    pub irc_version: String,
    pub log_file_specification_version: String,
    pub time_zone: String,
}

/// Protocol identity and mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProtocolInfo {
    pub protocol_version: String,
    pub protocol_name: String,
    #[serde(rename = "ProtocolID")]
    pub protocol_id: i64,
    pub tracking_device: String,
    pub protocol_mode: String,
    pub condition: String,
}

/// `IsPrescribedAsRoutine` arrives either as text or as a boolean and is
/// kept in whichever form it came
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutineFlag {
    Flag(bool),
    Text(String),
}

impl RoutineFlag {
    /// Best-effort boolean reading; text is matched case-insensitively
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RoutineFlag::Flag(b) => Some(*b),
            RoutineFlag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
        }
    }
}

/// Session identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionInfo {
    #[serde(rename = "SessionID")]
    pub session_id: i64,
    #[serde(rename = "PatientID")]
    pub patient_id: i64,
    pub is_prescribed_as_routine: RoutineFlag,
    pub session_date: String,
    pub local_session_time: String,
}

impl SessionInfo {
    /// Parse `SessionDate` in any of the date layouts RGS installations write
    pub fn parsed_session_date(&self) -> Option<NaiveDate> {
        const FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y"];
        let date = self.session_date.trim();
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
    }
}

/// Per-user prediction model snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserModel {
    pub predicted_performance: String,
    pub difficulty_parameters: Vec<String>,
    pub user_weights: Vec<Option<f64>>,
    pub default_weights: Vec<Option<f64>>,
}

/// Session header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Header {
    pub rgs_info: RgsVersion,
    pub protocol_info: ProtocolInfo,
    pub session_info: SessionInfo,
    /// User models keyed by user name
    #[serde(rename = "IRC")]
    pub irc_models: IndexMap<String, Vec<UserModel>>,
    pub common_events: Vec<String>,
    pub protocol_events: Vec<String>,
    pub object_events: Vec<String>,
}

// ============================================================================
// Data
// ============================================================================

/// A single time point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub t: i64,
}

/// A scored event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub t: i64,
    pub value: i64,
}

/// Adaptive-difficulty algorithm state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlgorithmDescription {
    pub method: String,
    pub prediction_target: Option<f64>,
    pub min_prediction_acceptance_threshold: Option<f64>,
    pub max_prediction_acceptance_threshold: Option<f64>,
    pub predicted: Option<f64>,
    pub obtained: i64,
}

/// One difficulty axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DifficultyParameters {
    pub key: String,
    pub value: Option<f64>,
    pub mapping: Option<f64>,
}

/// Per-user outcome snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SuccessRate {
    pub algorithm_description: AlgorithmDescription,
    pub difficulty_parameters: Vec<DifficultyParameters>,
}

/// A difficulty recompute event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrcComputeDifficulty {
    pub t: i64,
    #[serde(rename = "Performances")]
    pub performances: IndexMap<String, SuccessRate>,
}

/// Session lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommonEvents {
    pub protocol_start: Timestamp,
    /// Kept as written; producers have not settled on an entry shape
    pub protocol_paused: Vec<Node>,
    pub protocol_aborted: IndexMap<String, Node>,
    pub protocol_finished: Timestamp,
    pub register_score: Vec<Score>,
    pub irc_compute_difficulty: Vec<IrcComputeDifficulty>,
}

/// Protocol progress events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProtocolEvents {
    pub start_new_series: Vec<Score>,
    pub start_new_level: Vec<Score>,
}

/// An in-session object interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEvent {
    pub t: i64,
    pub id: i64,
    pub value: Option<String>,
    #[serde(rename = "X")]
    pub x: Option<f64>,
    #[serde(rename = "Y")]
    pub y: Option<f64>,
    #[serde(rename = "Z")]
    pub z: Option<f64>,
}

/// A tracked 3-D point at time `t`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub t: i64,
    #[serde(rename = "X")]
    pub x: Option<f64>,
    #[serde(rename = "Y")]
    pub y: Option<f64>,
    #[serde(rename = "Z")]
    pub z: Option<f64>,
}

/// Ordered positions for one tracked entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSeries {
    #[serde(rename = "Position")]
    pub positions: Vec<Position>,
}

/// Session payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Data {
    pub common_events: CommonEvents,
    pub protocol_events: ProtocolEvents,
    /// Object interaction streams keyed by object name
    pub object_events: IndexMap<String, Vec<ObjectEvent>>,
    /// Raw tracker positions keyed by tracked entity
    pub tracking_raw: IndexMap<String, PositionSeries>,
    pub kinematics: IndexMap<String, PositionSeries>,
}

/// Root document of an RGS session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLogFile {
    #[serde(rename = "LogFileDescription")]
    pub description: LogFileDescription,
    #[serde(rename = "Header")]
    pub header: Header,
    #[serde(rename = "Data")]
    pub data: Data,
}

impl RawLogFile {
    /// Condensed overview of the session for reports
    pub fn summary(&self) -> LogSummary {
        let session = &self.header.session_info;
        let protocol = &self.header.protocol_info;
        let common = &self.data.common_events;

        LogSummary {
            session_id: session.session_id,
            patient_id: session.patient_id,
            protocol_id: protocol.protocol_id,
            protocol_name: protocol.protocol_name.clone(),
            session_date: session.parsed_session_date(),
            prescribed_as_routine: session.is_prescribed_as_routine.as_bool(),
            protocol_duration: common
                .protocol_finished
                .t
                .saturating_sub(common.protocol_start.t),
            registered_scores: common.register_score.len(),
            difficulty_recomputes: common.irc_compute_difficulty.len(),
            irc_users: self.header.irc_models.len(),
            object_streams: self.data.object_events.len(),
            object_events: self.data.object_events.values().map(Vec::len).sum(),
            tracked_entities: self.data.tracking_raw.len(),
            tracked_positions: self
                .data
                .tracking_raw
                .values()
                .map(|s| s.positions.len())
                .sum(),
            kinematic_entities: self.data.kinematics.len(),
        }
    }
}

/// Overview of a validated session log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub session_id: i64,
    pub patient_id: i64,
    pub protocol_id: i64,
    pub protocol_name: String,
    pub session_date: Option<NaiveDate>,
    pub prescribed_as_routine: Option<bool>,
    /// `ProtocolFinished.t - ProtocolStart.t`, in the log's time unit
    pub protocol_duration: i64,
    pub registered_scores: usize,
    pub difficulty_recomputes: usize,
    pub irc_users: usize,
    pub object_streams: usize,
    pub object_events: usize,
    pub tracked_entities: usize,
    pub tracked_positions: usize,
    pub kinematic_entities: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(date: &str, flag: RoutineFlag) -> SessionInfo {
        SessionInfo {
            session_id: 1,
            patient_id: 2,
            is_prescribed_as_routine: flag,
            session_date: date.to_string(),
            local_session_time: "10:00".to_string(),
        }
    }

    #[test]
    fn test_parsed_session_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 14);
        for date in ["2023-03-14", "14-03-2023", "14/03/2023", " 14.03.2023 "] {
            let info = session(date, RoutineFlag::Flag(true));
            assert_eq!(info.parsed_session_date(), expected, "format {}", date);
        }
        assert_eq!(
            session("March 14th", RoutineFlag::Flag(true)).parsed_session_date(),
            None
        );
    }

    #[test]
    fn test_routine_flag_serializes_verbatim() {
        let text = serde_json::to_string(&RoutineFlag::Text("true".into())).unwrap();
        let flag = serde_json::to_string(&RoutineFlag::Flag(true)).unwrap();
        assert_eq!(text, "\"true\"");
        assert_eq!(flag, "true");
    }

    #[test]
    fn test_routine_flag_as_bool() {
        assert_eq!(RoutineFlag::Text("Yes".into()).as_bool(), Some(true));
        assert_eq!(RoutineFlag::Text("0".into()).as_bool(), Some(false));
        assert_eq!(RoutineFlag::Text("sometimes".into()).as_bool(), None);
        assert_eq!(RoutineFlag::Flag(false).as_bool(), Some(false));
    }

    #[test]
    fn test_session_info_field_names() {
        let value = serde_json::to_value(session("2023-03-14", RoutineFlag::Flag(false))).unwrap();
        let object = value.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
        for key in [
            "SessionID",
            "PatientID",
            "IsPrescribedAsRoutine",
            "SessionDate",
            "LocalSessionTime",
        ] {
            assert!(keys.contains(&key), "missing key {}", key);
        }
    }

    #[test]
    fn test_absent_float_serializes_as_null() {
        let event = ObjectEvent {
            t: 1,
            id: 5,
            value: None,
            x: None,
            y: Some(0.0),
            z: Some(0.0),
        };
        let value = serde_json::to_value(event).unwrap();
        assert!(value["X"].is_null());
        assert!(value["value"].is_null());
        assert_eq!(value["Y"], 0.0);
    }
}
