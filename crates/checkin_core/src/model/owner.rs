//! Owner directory reference data.
//!
//! Raw strings come straight from the external owners directory and are only
//! interpreted by `identity::owner_classifier`.

use crate::model::submission::LotNumber;
use serde::{Deserialize, Serialize};

/// Raw contact strings for one lot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerContactInfo {
    /// "Main contact" column, often salutation + initials + surname.
    pub main_contact_raw: Option<String>,
    /// Name as registered on the title.
    pub title_name_raw: Option<String>,
    /// Street unit number shown next to the lot.
    pub unit_number: Option<String>,
}

/// One lot's row in a plan's owners directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerDirectoryEntry {
    pub lot: LotNumber,
    pub contact: OwnerContactInfo,
}
