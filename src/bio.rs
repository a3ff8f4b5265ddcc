//! Company bio record and its text encoding.
//!
//! The profile table has a single `bio` column. Employers store three things
//! in it: either a free "about" text or a vision/mission pair, plus optional
//! company metadata. On the wire this becomes
//!
//! ```text
//! VISI:\n<vision>\n\nMISI:\n<mission>\n\nCOMPANY_METADATA:{"industry":"..","size":".."}
//! ```
//!
//! Any user text containing one of the markers is rejected, so every record
//! produced here decodes back to itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::utils::json::{classify_nullable, NullableValue};
use crate::validation::{check_len, limits};

pub const VISION_MARKER: &str = "VISI:";
pub const MISSION_MARKER: &str = "MISI:";
pub const METADATA_MARKER: &str = "COMPANY_METADATA:";

const MARKERS: [&str; 3] = [VISION_MARKER, MISSION_MARKER, METADATA_MARKER];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Summary {
    About(String),
    VisionMission {
        vision: Option<String>,
        mission: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl CompanyMetadata {
    pub fn is_empty(&self) -> bool {
        self.industry.is_none() && self.size.is_none()
    }

    fn parse(raw: &str) -> Option<Self> {
        let object: Map<String, Value> = serde_json::from_str(raw.trim()).ok()?;
        let field = |name: &str| match classify_nullable(object.get(name)) {
            Ok(NullableValue::String(value)) => Ok(non_empty(&value)),
            Ok(NullableValue::Null | NullableValue::Omitted) => Ok(None),
            Err(err) => Err(err),
        };
        match (field("industry"), field("size")) {
            (Ok(industry), Ok(size)) => Some(Self { industry, size }),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(error = %err, "ignoring malformed company metadata");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompanyBio {
    pub summary: Option<Summary>,
    pub metadata: CompanyMetadata,
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn clean(field: &str, text: Option<&str>, max: usize) -> AppResult<Option<String>> {
    let Some(text) = text.and_then(non_empty) else {
        return Ok(None);
    };
    if let Some(marker) = MARKERS.iter().find(|marker| text.contains(*marker)) {
        return Err(AppError::bad_request(format!(
            "{field} must not contain the reserved text \"{marker}\""
        )));
    }
    check_len(field, &text, max)?;
    Ok(Some(text))
}

impl CompanyBio {
    /// Parses a stored bio. Text in front of a `VISI:` marker is dropped.
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        let (head, metadata) = match raw.split_once(METADATA_MARKER) {
            Some((head, tail)) => (head, CompanyMetadata::parse(tail).unwrap_or_default()),
            None => (raw, CompanyMetadata::default()),
        };

        let summary = match head.split_once(VISION_MARKER) {
            Some((_, rest)) => {
                let (vision, mission) = match rest.split_once(MISSION_MARKER) {
                    Some((vision, mission)) => (non_empty(vision), non_empty(mission)),
                    None => (non_empty(rest), None),
                };
                (vision.is_some() || mission.is_some())
                    .then_some(Summary::VisionMission { vision, mission })
            }
            None => non_empty(head).map(Summary::About),
        };

        Self { summary, metadata }
    }

    /// Renders the stored form; an empty record is stored as null.
    pub fn encode(&self) -> Option<String> {
        let primary = match &self.summary {
            Some(Summary::About(text)) => Some(text.clone()),
            Some(Summary::VisionMission { vision, mission }) => Some(format!(
                "{VISION_MARKER}\n{}\n\n{MISSION_MARKER}\n{}",
                vision.as_deref().unwrap_or_default(),
                mission.as_deref().unwrap_or_default()
            )),
            None => None,
        };

        if self.metadata.is_empty() {
            return primary;
        }

        // Serializing two optional strings cannot fail.
        let json = serde_json::to_string(&self.metadata).unwrap_or_else(|_| "{}".to_string());
        Some(match primary {
            Some(primary) => format!("{primary}\n\n{METADATA_MARKER}{json}"),
            None => format!("{METADATA_MARKER}{json}"),
        })
    }

    pub fn about(&self) -> Option<&str> {
        match &self.summary {
            Some(Summary::About(text)) => Some(text),
            _ => None,
        }
    }

    pub fn vision(&self) -> Option<&str> {
        match &self.summary {
            Some(Summary::VisionMission { vision, .. }) => vision.as_deref(),
            _ => None,
        }
    }

    pub fn mission(&self) -> Option<&str> {
        match &self.summary {
            Some(Summary::VisionMission { mission, .. }) => mission.as_deref(),
            _ => None,
        }
    }

    /// Sets the about text, replacing any vision/mission.
    pub fn with_about(mut self, about: &str) -> AppResult<Self> {
        let about = clean("About", Some(about), limits::BIO)?
            .ok_or_else(|| AppError::bad_request("About is required"))?;
        self.summary = Some(Summary::About(about));
        Ok(self)
    }

    pub fn without_about(mut self) -> Self {
        if matches!(self.summary, Some(Summary::About(_))) {
            self.summary = None;
        }
        self
    }

    /// Sets vision and mission, replacing any about text.
    pub fn with_vision_mission(mut self, vision: Option<&str>, mission: Option<&str>) -> AppResult<Self> {
        let vision = clean("Vision", vision, limits::VISION)?;
        let mission = clean("Mission", mission, limits::MISSION)?;
        if vision.is_none() && mission.is_none() {
            return Err(AppError::bad_request(
                "at least one of vision or mission is required",
            ));
        }
        self.summary = Some(Summary::VisionMission { vision, mission });
        Ok(self)
    }

    pub fn without_vision_mission(mut self) -> Self {
        if matches!(self.summary, Some(Summary::VisionMission { .. })) {
            self.summary = None;
        }
        self
    }

    /// Replaces both metadata fields, as the company form submits them together.
    /// A field passed as `None` is cleared.
    pub fn with_metadata(mut self, industry: Option<&str>, size: Option<&str>) -> AppResult<Self> {
        let industry = clean("Industry", industry, limits::METADATA_FIELD)?;
        let size = clean("Company size", size, limits::METADATA_FIELD)?;
        self.metadata = CompanyMetadata { industry, size };
        Ok(self)
    }

    pub fn without_metadata(mut self) -> Self {
        self.metadata = CompanyMetadata::default();
        self
    }
}
