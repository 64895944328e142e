//! Shared fixtures for unit tests

use crate::decode;
use crate::types::RawLogFile;
use crate::validator;
use crate::value::Node;

pub(crate) const SAMPLE_LOG_JSON: &str = r#"{
    "LogFileDescription": {
        "Description": "RGS session log",
        "Legend": [
            { "Label": "Hand", "Data": "Right hand position" }
        ],
        "CustomProtocolLegend": [
            {
                "Label": "Targets",
                "Data": {
                    "Description": "Target colours",
                    "ProtocolMapping": [
                        { "Key": "1", "Desc": "red", "Mapping": "distractor" },
                        { "Key": "2", "Desc": "green", "Mapping": "target" }
                    ]
                }
            }
        ]
    },
    "Header": {
        "RgsInfo": {
            "RgsVersion": "3.2.1",
            "RgsMode": "Clinic",
            "IrcVersion": "1.4",
            "LogFileSpecificationVersion": "2.0",
            "TimeZone": "Europe/Madrid"
        },
        "ProtocolInfo": {
            "ProtocolVersion": "1",
            "ProtocolName": "Spheroids",
            "ProtocolID": 12,
            "TrackingDevice": "Kinect",
            "ProtocolMode": "Unilateral",
            "Condition": "Stroke"
        },
        "SessionInfo": {
            "SessionID": 4711,
            "PatientID": 99,
            "IsPrescribedAsRoutine": "false",
            "SessionDate": "2023-03-14",
            "LocalSessionTime": "10:15:00"
        },
        "IRC": {
            "user42": [
                {
                    "PredictedPerformance": "high",
                    "DifficultyParameters": ["d1"],
                    "UserWeights": [0.2, 0.8],
                    "DefaultWeights": [0.5, 0.5]
                }
            ]
        },
        "CommonEvents": ["ProtocolStart", "ProtocolFinished", "RegisterScore"],
        "ProtocolEvents": ["StartNewSeries", "StartNewLevel"],
        "ObjectEvents": ["cam1"]
    },
    "Data": {
        "CommonEvents": {
            "ProtocolStart": { "t": 1000 },
            "ProtocolPaused": [],
            "ProtocolAborted": {},
            "ProtocolFinished": { "t": 61000 },
            "RegisterScore": [
                { "t": 2000, "value": 1 },
                { "t": 3000, "value": 2 }
            ],
            "IrcComputeDifficulty": [
                {
                    "t": 30000,
                    "Performances": {
                        "user42": {
                            "AlgorithmDescription": {
                                "Method": "logistic",
                                "PredictionTarget": 0.7,
                                "MinPredictionAcceptanceThreshold": 0.6,
                                "MaxPredictionAcceptanceThreshold": 0.8,
                                "Predicted": 0.65,
                                "Obtained": 1
                            },
                            "DifficultyParameters": [
                                { "Key": "speed", "Value": 1.5, "Mapping": 0.3 }
                            ]
                        }
                    }
                }
            ]
        },
        "ProtocolEvents": {
            "StartNewSeries": [ { "t": 1000, "value": 1 } ],
            "StartNewLevel": [ { "t": 1500, "value": 1 } ]
        },
        "ObjectEvents": {
            "cam1": [
                { "t": 1, "id": 5, "value": "spawn", "X": 1.0, "Y": 0.0, "Z": 0.0 },
                { "t": 2, "id": 5, "X": 1.5, "Y": 0.25, "Z": -0.5 }
            ]
        },
        "TrackingRaw": {
            "RightHand": {
                "Position": [
                    { "t": 1, "X": 0.1, "Y": 0.2, "Z": 0.3 },
                    { "t": 2, "X": 0.15, "Y": 0.25, "Z": 0.35 }
                ]
            }
        },
        "Kinematics": {
            "RightHand": {
                "Position": [
                    { "t": 1, "X": 0.0, "Y": 0.0, "Z": 0.0 }
                ]
            }
        }
    }
}"#;

pub(crate) fn sample_log_node() -> Node {
    decode::from_str(SAMPLE_LOG_JSON).expect("sample log decodes")
}

pub(crate) fn sample_log() -> RawLogFile {
    validator::parse(&sample_log_node()).expect("sample log is valid")
}
