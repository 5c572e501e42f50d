//! Check-in form use-case.
//!
//! # Responsibility
//! - Turn the clerk's selection (owners, company representative, proxy) into
//!   a queue-ready `NewSubmission` for the active meeting.
//!
//! # Invariants
//! - Owner names are trimmed, blanks dropped and duplicates collapsed while
//!   keeping selection order.
//! - Company lots carry the company in `rep_name` and the representative in
//!   `owner_name`; proxies carry the proxy holder in `rep_name`.

use crate::model::meeting::MeetingContext;
use crate::model::submission::{
    LotNumber, NewSubmission, SubmissionValidationError, NO_REPRESENTATIVE,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Separator used when several co-owners attend together.
pub const OWNER_NAME_SEPARATOR: &str = " & ";

/// Who is attending for the lot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendeeSelection {
    /// One or more owners in person.
    Owners { names: Vec<String> },
    /// A representative for a company-owned lot.
    Company {
        company_name: String,
        representative: String,
    },
    /// A proxy holder voting for the named owners.
    Proxy {
        owner_names: Vec<String>,
        proxy_holder: String,
    },
}

/// Submitted check-in form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInRequest {
    pub lot: LotNumber,
    pub selection: AttendeeSelection,
    pub is_financial: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInError {
    NoOwnerSelected,
    MissingCompanyName,
    MissingRepresentative,
    MissingProxyHolder,
    Validation(SubmissionValidationError),
}

impl Display for CheckInError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOwnerSelected => write!(f, "select at least one owner"),
            Self::MissingCompanyName => write!(f, "company name is required"),
            Self::MissingRepresentative => write!(f, "company representative name is required"),
            Self::MissingProxyHolder => write!(f, "proxy holder name is required"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CheckInError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SubmissionValidationError> for CheckInError {
    fn from(value: SubmissionValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Builds the queue payload for `request` within `context`.
pub fn build_submission(
    context: &MeetingContext,
    request: &CheckInRequest,
) -> Result<NewSubmission, CheckInError> {
    let (owner_name, rep_name, is_proxy) = match &request.selection {
        AttendeeSelection::Owners { names } => {
            let owner_name = join_owner_names(names).ok_or(CheckInError::NoOwnerSelected)?;
            (owner_name, NO_REPRESENTATIVE.to_string(), false)
        }
        AttendeeSelection::Company {
            company_name,
            representative,
        } => {
            let company_name = required(company_name).ok_or(CheckInError::MissingCompanyName)?;
            let representative =
                required(representative).ok_or(CheckInError::MissingRepresentative)?;
            (representative, company_name, false)
        }
        AttendeeSelection::Proxy {
            owner_names,
            proxy_holder,
        } => {
            let proxy_holder = required(proxy_holder).ok_or(CheckInError::MissingProxyHolder)?;
            let owner_name =
                join_owner_names(owner_names).ok_or(CheckInError::NoOwnerSelected)?;
            (owner_name, proxy_holder, true)
        }
    };

    let submission = NewSubmission {
        id: None,
        plan_id: context.plan_id().to_string(),
        meeting_id: context.meeting_id().to_string(),
        lot: request.lot,
        owner_name,
        rep_name,
        is_financial: request.is_financial,
        is_proxy,
    };
    submission.validate()?;
    Ok(submission)
}

/// Joins selected owner names, or `None` when nothing usable was selected.
pub fn join_owner_names(names: &[String]) -> Option<String> {
    let mut unique: Vec<&str> = Vec::new();
    for name in names.iter().map(|name| name.trim()) {
        if !name.is_empty() && !unique.contains(&name) {
            unique.push(name);
        }
    }
    if unique.is_empty() {
        None
    } else {
        Some(unique.join(OWNER_NAME_SEPARATOR))
    }
}

fn required(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{build_submission, join_owner_names, AttendeeSelection, CheckInError, CheckInRequest};
    use crate::model::meeting::{MeetingContext, MeetingType};

    fn context() -> MeetingContext {
        MeetingContext::new("SP42", "SP42:2026-10-19", "2026-10-19", MeetingType::Agm, 20).unwrap()
    }

    #[test]
    fn join_owner_names_dedups_and_skips_blanks() {
        let names = vec![
            " John Smith ".to_string(),
            String::new(),
            "Jane Doe".to_string(),
            "John Smith".to_string(),
        ];
        assert_eq!(
            join_owner_names(&names).as_deref(),
            Some("John Smith & Jane Doe")
        );
        assert_eq!(join_owner_names(&[" ".to_string()]), None);
    }

    #[test]
    fn company_selection_puts_company_in_rep_name() {
        let request = CheckInRequest {
            lot: 12,
            selection: AttendeeSelection::Company {
                company_name: "ACME PTY LTD".to_string(),
                representative: " Sam Rep ".to_string(),
            },
            is_financial: true,
        };
        let submission = build_submission(&context(), &request).unwrap();
        assert_eq!(submission.owner_name, "Sam Rep");
        assert_eq!(submission.rep_name, "ACME PTY LTD");
        assert!(!submission.is_proxy);
        assert_eq!(submission.meeting_id, "SP42:2026-10-19");
    }

    #[test]
    fn proxy_selection_requires_holder_and_owner() {
        let missing_holder = CheckInRequest {
            lot: 3,
            selection: AttendeeSelection::Proxy {
                owner_names: vec!["Jane Doe".to_string()],
                proxy_holder: "  ".to_string(),
            },
            is_financial: false,
        };
        assert_eq!(
            build_submission(&context(), &missing_holder),
            Err(CheckInError::MissingProxyHolder)
        );

        let proxy = CheckInRequest {
            lot: 3,
            selection: AttendeeSelection::Proxy {
                owner_names: vec!["Jane Doe".to_string()],
                proxy_holder: "Pat Proxy".to_string(),
            },
            is_financial: false,
        };
        let submission = build_submission(&context(), &proxy).unwrap();
        assert!(submission.is_proxy);
        assert_eq!(submission.rep_name, "Pat Proxy");
    }

    #[test]
    fn owners_selection_requires_a_name() {
        let request = CheckInRequest {
            lot: 1,
            selection: AttendeeSelection::Owners { names: Vec::new() },
            is_financial: false,
        };
        assert_eq!(
            build_submission(&context(), &request),
            Err(CheckInError::NoOwnerSelected)
        );
    }
}
