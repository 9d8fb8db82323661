use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of vital sign measurement. Fixed vocabulary: readings the analysis
/// collaborator reports outside this set are dropped rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VitalType {
    Glucose,
    HeartRate,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    Temperature,
    Spo2,
    Weight,
    UrineOutput,
}

impl VitalType {
    pub fn as_str(self) -> &'static str {
        match self {
            VitalType::Glucose => "glucose",
            VitalType::HeartRate => "heart_rate",
            VitalType::BloodPressureSystolic => "blood_pressure_systolic",
            VitalType::BloodPressureDiastolic => "blood_pressure_diastolic",
            VitalType::Temperature => "temperature",
            VitalType::Spo2 => "spo2",
            VitalType::Weight => "weight",
            VitalType::UrineOutput => "urine_output",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "glucose" => Some(VitalType::Glucose),
            "heart_rate" => Some(VitalType::HeartRate),
            "blood_pressure_systolic" => Some(VitalType::BloodPressureSystolic),
            "blood_pressure_diastolic" => Some(VitalType::BloodPressureDiastolic),
            "temperature" => Some(VitalType::Temperature),
            "spo2" => Some(VitalType::Spo2),
            "weight" => Some(VitalType::Weight),
            "urine_output" => Some(VitalType::UrineOutput),
            _ => None,
        }
    }

    /// Parse a type tag from the analysis collaborator, which is not
    /// consistent about casing. Unknown tags yield `None` and the reading
    /// is discarded upstream.
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::from_str(s.trim().to_ascii_lowercase().as_str())
    }

    /// Default unit for this vital type.
    pub fn default_unit(self) -> &'static str {
        match self {
            VitalType::Glucose => "mg/dL",
            VitalType::HeartRate => "bpm",
            VitalType::BloodPressureSystolic => "mmHg",
            VitalType::BloodPressureDiastolic => "mmHg",
            VitalType::Temperature => "°C",
            VitalType::Spo2 => "%",
            VitalType::Weight => "kg",
            VitalType::UrineOutput => "mL",
        }
    }
}

/// A single vital sign reading.
///
/// No identity beyond value + timestamp. Readings are never mutated or
/// deleted, only appended — the vitals sequence is a ledger, not a snapshot,
/// so repeated identical readings from repeated messages are all retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalReading {
    pub vital_type: VitalType,
    pub value: f64,
    pub unit: String,
    pub recorded_at: NaiveDateTime,
}

impl VitalReading {
    /// A reading stamped now — used for vitals extracted at analysis
    /// completion, which carry no source timestamp of their own.
    pub fn now(vital_type: VitalType, value: f64, unit: impl Into<String>) -> Self {
        Self {
            vital_type,
            value,
            unit: unit.into(),
            recorded_at: Utc::now().naive_utc(),
        }
    }
}
