//! RGS session log schema
//!
//! Declared bottom-up, leaves first. Field order within each entity is the
//! order in which the validator checks them.

use std::sync::{Arc, OnceLock};

use super::descriptor::{EntitySchema, FieldSpec, FieldType};

/// Identifier published with the JSON Schema rendering
pub const SCHEMA_ID: &str = "https://rgs-tools.org/schemas/rgs.session_log.v1.json";

/// The root `RawLogFile` schema, built on first use
pub fn session_log_schema() -> &'static EntitySchema {
    static SCHEMA: OnceLock<Arc<EntitySchema>> = OnceLock::new();
    SCHEMA.get_or_init(build)
}

fn string_list() -> FieldType {
    FieldType::sequence_of(FieldType::String)
}

fn build() -> Arc<EntitySchema> {
    use FieldSpec as F;
    use FieldType as T;

    // LogFileDescription
    let legend_item = EntitySchema::new(
        "LegendItem",
        vec![F::required("Label", T::String), F::required("Data", T::String)],
    );
    let mapping_item = EntitySchema::new(
        "MappingItem",
        vec![
            F::required("Key", T::String),
            F::required("Desc", T::String),
            F::required("Mapping", T::String),
        ],
    );
    let protocol_legend_data = EntitySchema::new(
        "ProtocolLegendData",
        vec![
            F::required("Description", T::String),
            F::required("ProtocolMapping", T::sequence_of(T::entity(&mapping_item))),
        ],
    );
    let custom_protocol_legend = EntitySchema::new(
        "CustomProtocolLegend",
        vec![
            F::required("Label", T::String),
            F::required("Data", T::entity(&protocol_legend_data)),
        ],
    );
    let description = EntitySchema::new(
        "LogFileDescription",
        vec![
            F::required("Description", T::String),
            F::required("Legend", T::sequence_of(T::entity(&legend_item))),
            F::required(
                "CustomProtocolLegend",
                T::sequence_of(T::entity(&custom_protocol_legend)),
            ),
        ],
    );

    // Header
    let rgs_version = EntitySchema::new(
        "RgsVersion",
        vec![
            F::required("RgsVersion", T::String),
            F::required("RgsMode", T::String),
            F::required("IrcVersion", T::String),
            F::required("LogFileSpecificationVersion", T::String),
            F::required("TimeZone", T::String),
        ],
    );
    let protocol_info = EntitySchema::new(
        "ProtocolInfo",
        vec![
            F::required("ProtocolVersion", T::String),
            F::required("ProtocolName", T::String),
            F::required("ProtocolID", T::Integer),
            F::required("TrackingDevice", T::String),
            F::required("ProtocolMode", T::String),
            F::required("Condition", T::String),
        ],
    );
    let session_info = EntitySchema::new(
        "SessionInfo",
        vec![
            F::required("SessionID", T::Integer),
            F::required("PatientID", T::Integer),
            F::required("IsPrescribedAsRoutine", T::StringOrBool),
            F::required("SessionDate", T::String),
            F::required("LocalSessionTime", T::String),
        ],
    );
    let user_model = EntitySchema::new(
        "UserModel",
        vec![
            F::required("PredictedPerformance", T::String),
            F::required("DifficultyParameters", string_list()),
            F::required("UserWeights", T::sequence_of(T::Float)),
            F::required("DefaultWeights", T::sequence_of(T::Float)),
        ],
    );
    let header = EntitySchema::new(
        "Header",
        vec![
            F::required("RgsInfo", T::entity(&rgs_version)),
            F::required("ProtocolInfo", T::entity(&protocol_info)),
            F::required("SessionInfo", T::entity(&session_info)),
            F::required("IRC", T::mapping_of(T::sequence_of(T::entity(&user_model)))),
            F::required("CommonEvents", string_list()),
            F::required("ProtocolEvents", string_list()),
            F::required("ObjectEvents", string_list()),
        ],
    );

    // Data
    let timestamp = EntitySchema::new("Timestamp", vec![F::required("t", T::Integer)]);
    let score = EntitySchema::new(
        "Score",
        vec![F::required("t", T::Integer), F::required("value", T::Integer)],
    );
    let algorithm_description = EntitySchema::new(
        "AlgorithmDescription",
        vec![
            F::required("Method", T::String),
            F::required("PredictionTarget", T::Float),
            F::optional("MinPredictionAcceptanceThreshold", T::Float),
            F::optional("MaxPredictionAcceptanceThreshold", T::Float),
            F::required("Predicted", T::Float),
            F::required("Obtained", T::Integer),
        ],
    );
    let difficulty_parameters = EntitySchema::new(
        "DifficultyParameters",
        vec![
            F::required("Key", T::String),
            F::required("Value", T::Float),
            F::required("Mapping", T::Float),
        ],
    );
    let success_rate = EntitySchema::new(
        "SuccessRate",
        vec![
            F::required("AlgorithmDescription", T::entity(&algorithm_description)),
            F::required(
                "DifficultyParameters",
                T::sequence_of(T::entity(&difficulty_parameters)),
            ),
        ],
    );
    let irc_compute_difficulty = EntitySchema::new(
        "IrcComputeDifficulty",
        vec![
            F::required("t", T::Integer),
            F::required("Performances", T::mapping_of(T::entity(&success_rate))),
        ],
    );
    let common_events = EntitySchema::new(
        "CommonEvents",
        vec![
            F::required("ProtocolStart", T::entity(&timestamp)),
            F::required("ProtocolPaused", T::AnySequence),
            F::required("ProtocolAborted", T::AnyMapping),
            F::required("ProtocolFinished", T::entity(&timestamp)),
            F::required("RegisterScore", T::sequence_of(T::entity(&score))),
            F::required(
                "IrcComputeDifficulty",
                T::sequence_of(T::entity(&irc_compute_difficulty)),
            ),
        ],
    );
    let protocol_events = EntitySchema::new(
        "ProtocolEvents",
        vec![
            F::required("StartNewSeries", T::sequence_of(T::entity(&score))),
            F::required("StartNewLevel", T::sequence_of(T::entity(&score))),
        ],
    );
    let object_event = EntitySchema::new(
        "ObjectEvent",
        vec![
            F::required("t", T::Integer),
            F::required("id", T::Integer),
            F::optional("value", T::String),
            F::required("X", T::Float),
            F::required("Y", T::Float),
            F::required("Z", T::Float),
        ],
    );
    let position = EntitySchema::new(
        "Position",
        vec![
            F::required("t", T::Integer),
            F::required("X", T::Float),
            F::required("Y", T::Float),
            F::required("Z", T::Float),
        ],
    );
    let position_series = EntitySchema::new(
        "PositionSeries",
        vec![F::required("Position", T::sequence_of(T::entity(&position)))],
    );
    let data = EntitySchema::new(
        "Data",
        vec![
            F::required("CommonEvents", T::entity(&common_events)),
            F::required("ProtocolEvents", T::entity(&protocol_events)),
            F::required(
                "ObjectEvents",
                T::mapping_of(T::sequence_of(T::entity(&object_event))),
            ),
            F::required("TrackingRaw", T::mapping_of(T::entity(&position_series))),
            F::required("Kinematics", T::mapping_of(T::entity(&position_series))),
        ],
    );

    EntitySchema::new(
        "RawLogFile",
        vec![
            F::required("LogFileDescription", T::entity(&description)),
            F::required("Header", T::entity(&header)),
            F::required("Data", T::entity(&data)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_field_order() {
        let schema = session_log_schema();
        let names: Vec<&str> = schema.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["LogFileDescription", "Header", "Data"]);
    }

    #[test]
    fn test_every_entity_reachable() {
        let names = session_log_schema().entity_names();
        for expected in [
            "LegendItem",
            "MappingItem",
            "ProtocolLegendData",
            "CustomProtocolLegend",
            "LogFileDescription",
            "RgsVersion",
            "ProtocolInfo",
            "SessionInfo",
            "UserModel",
            "Header",
            "Timestamp",
            "Score",
            "AlgorithmDescription",
            "DifficultyParameters",
            "SuccessRate",
            "IrcComputeDifficulty",
            "CommonEvents",
            "ProtocolEvents",
            "ObjectEvent",
            "Position",
            "PositionSeries",
            "Data",
        ] {
            assert!(names.contains(&expected), "missing entity {}", expected);
        }
        assert_eq!(names[0], "RawLogFile");
        assert_eq!(names.len(), 23);
    }

    #[test]
    fn test_optional_fields() {
        let json_schema = session_log_schema().to_json_schema(SCHEMA_ID);
        let algorithm = &json_schema["$defs"]["AlgorithmDescription"];
        let required = algorithm["required"].as_array().unwrap();
        assert!(!required.iter().any(|r| r == "MinPredictionAcceptanceThreshold"));
        assert!(required.iter().any(|r| r == "Predicted"));

        let object_event = &json_schema["$defs"]["ObjectEvent"];
        let required = object_event["required"].as_array().unwrap();
        assert!(!required.iter().any(|r| r == "value"));
    }
}
