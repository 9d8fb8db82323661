pub mod enums;
pub mod insight;
pub mod message;
pub mod patient;
pub mod vital_sign;

pub use enums::{ContentKind, RiskLevel, SenderRole};
pub use insight::ClinicalInsight;
pub use message::Message;
pub use patient::PatientRecord;
pub use vital_sign::{VitalReading, VitalType};
