//! Meeting context model.
//!
//! # Responsibility
//! - Define the plan + meeting scope that check-ins and quorum belong to.
//! - Define the prompt result shape used when a clerk opens a meeting.
//!
//! # Invariants
//! - `MeetingContext` is immutable; switching meetings creates a new one.
//! - `quorum_total` is never negative.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Kind of meeting being held.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MeetingType {
    /// Annual general meeting.
    Agm,
    /// Extraordinary general meeting.
    Egm,
    /// Strata committee meeting; quorum counts committee members.
    Scm,
    /// Free-form meeting type typed in by the clerk.
    Other(String),
}

impl MeetingType {
    /// Parses the meeting-type picker value.
    ///
    /// Known codes are case-insensitive. Anything else is kept verbatim
    /// (trimmed) as `Other`. Blank input is rejected.
    pub fn parse(value: &str) -> Result<Self, MeetingSelectionError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(MeetingSelectionError::MissingMeetingType);
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "AGM" => Ok(Self::Agm),
            "EGM" => Ok(Self::Egm),
            "SCM" => Ok(Self::Scm),
            _ => Ok(Self::Other(trimmed.to_string())),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Agm => "AGM",
            Self::Egm => "EGM",
            Self::Scm => "SCM",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Caption for the quorum-total input and badge.
    pub fn quorum_total_label(&self) -> &'static str {
        match self {
            Self::Scm => "Number of Committee Members",
            Self::Agm | Self::Egm | Self::Other(_) => "Number of Financial Units",
        }
    }
}

/// Result of an interactive prompt: a value, or the user backed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome<T> {
    Submitted(T),
    Cancelled,
}

/// Meeting metadata gathered from the clerk when a meeting is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingDetails {
    pub meeting_type: MeetingType,
    pub quorum_total: i64,
}

/// Scope in which lot numbers are unique and quorum is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingContext {
    plan_id: String,
    meeting_id: String,
    meeting_date: String,
    meeting_type: MeetingType,
    quorum_total: i64,
}

impl MeetingContext {
    /// Builds a validated meeting context.
    ///
    /// # Errors
    /// - Blank plan, meeting id or date.
    /// - Negative quorum total.
    pub fn new(
        plan_id: impl Into<String>,
        meeting_id: impl Into<String>,
        meeting_date: impl Into<String>,
        meeting_type: MeetingType,
        quorum_total: i64,
    ) -> Result<Self, MeetingSelectionError> {
        let plan_id = plan_id.into().trim().to_string();
        let meeting_id = meeting_id.into().trim().to_string();
        let meeting_date = meeting_date.into().trim().to_string();
        if plan_id.is_empty() {
            return Err(MeetingSelectionError::MissingPlan);
        }
        if meeting_id.is_empty() {
            return Err(MeetingSelectionError::MissingMeetingId);
        }
        if meeting_date.is_empty() {
            return Err(MeetingSelectionError::MissingMeetingDate);
        }
        if let MeetingType::Other(name) = &meeting_type {
            if name.trim().is_empty() {
                return Err(MeetingSelectionError::MissingMeetingType);
            }
        }
        if quorum_total < 0 {
            return Err(MeetingSelectionError::InvalidQuorumTotal(quorum_total));
        }

        Ok(Self {
            plan_id,
            meeting_id,
            meeting_date,
            meeting_type,
            quorum_total,
        })
    }

    /// Builds a context whose id is derived from plan and date.
    ///
    /// The derived id matches the remote upsert key, so reopening the same
    /// meeting after a restart shows entries queued before the restart.
    pub fn for_date(
        plan_id: impl Into<String>,
        meeting_date: impl Into<String>,
        details: MeetingDetails,
    ) -> Result<Self, MeetingSelectionError> {
        let plan_id = plan_id.into();
        let meeting_date = meeting_date.into();
        let meeting_id = meeting_key(&plan_id, &meeting_date);
        Self::new(
            plan_id,
            meeting_id,
            meeting_date,
            details.meeting_type,
            details.quorum_total,
        )
    }

    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn meeting_id(&self) -> &str {
        &self.meeting_id
    }

    pub fn meeting_date(&self) -> &str {
        &self.meeting_date
    }

    pub fn meeting_type(&self) -> &MeetingType {
        &self.meeting_type
    }

    pub fn quorum_total(&self) -> i64 {
        self.quorum_total
    }
}

/// Derives the local meeting id for a plan + date pair.
pub fn meeting_key(plan_id: &str, meeting_date: &str) -> String {
    format!("{}:{}", plan_id.trim(), meeting_date.trim())
}

/// Errors raised while opening a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingSelectionError {
    MissingPlan,
    MissingMeetingId,
    MissingMeetingDate,
    MissingMeetingType,
    InvalidQuorumTotal(i64),
}

impl Display for MeetingSelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPlan => write!(f, "a strata plan must be selected"),
            Self::MissingMeetingId => write!(f, "meeting id must not be empty"),
            Self::MissingMeetingDate => write!(f, "meeting date must not be empty"),
            Self::MissingMeetingType => write!(f, "Please specify a meeting type."),
            Self::InvalidQuorumTotal(value) => {
                write!(f, "quorum total must not be negative, got {value}")
            }
        }
    }
}

impl Error for MeetingSelectionError {}

#[cfg(test)]
mod tests {
    use super::{MeetingContext, MeetingDetails, MeetingSelectionError, MeetingType};

    #[test]
    fn parse_recognizes_codes_and_keeps_other_text() {
        assert_eq!(MeetingType::parse(" agm ").unwrap(), MeetingType::Agm);
        assert_eq!(MeetingType::parse("SCM").unwrap(), MeetingType::Scm);
        assert_eq!(
            MeetingType::parse(" Budget review ").unwrap(),
            MeetingType::Other("Budget review".to_string())
        );
        assert_eq!(
            MeetingType::parse("  "),
            Err(MeetingSelectionError::MissingMeetingType)
        );
    }

    #[test]
    fn committee_meetings_relabel_quorum_total() {
        assert_eq!(
            MeetingType::Scm.quorum_total_label(),
            "Number of Committee Members"
        );
        assert_eq!(
            MeetingType::Agm.quorum_total_label(),
            "Number of Financial Units"
        );
    }

    #[test]
    fn for_date_derives_meeting_id_and_validates_total() {
        let context = MeetingContext::for_date(
            "SP100",
            "2026-10-19",
            MeetingDetails {
                meeting_type: MeetingType::Agm,
                quorum_total: 40,
            },
        )
        .unwrap();
        assert_eq!(context.meeting_id(), "SP100:2026-10-19");
        assert_eq!(context.quorum_total(), 40);

        let err = MeetingContext::for_date(
            "SP100",
            "2026-10-19",
            MeetingDetails {
                meeting_type: MeetingType::Agm,
                quorum_total: -1,
            },
        )
        .unwrap_err();
        assert_eq!(err, MeetingSelectionError::InvalidQuorumTotal(-1));
    }
}
